// mini_oms/src/error.rs
use anyhow::Error as AnyhowError;
use thiserror::Error;
use uuid::Uuid;

use crate::store::StoreError;

/// Classification handed to the presentation layer, which maps each kind to
/// its own external representation (status codes, messages).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  Validation,
  NotFound,
  Conflict,
  Authorization,
  Infrastructure,
}

#[derive(Debug, Error)]
pub enum OmsError {
  #[error("Validation failed: {message}")]
  Validation { message: String },

  #[error("{entity} not found: {id}")]
  NotFound { entity: &'static str, id: Uuid },

  #[error("Insufficient stock for product: {product_name} (requested {requested}, available {available})")]
  InsufficientStock {
    product_id: Uuid,
    product_name: String,
    requested: i32,
    available: i32,
  },

  #[error("Payment {payment_id} is already live for order {order_id}")]
  PaymentAlreadyExists { order_id: Uuid, payment_id: Uuid },

  #[error("Payment already verified: {payment_id}")]
  PaymentAlreadyVerified { payment_id: Uuid },

  #[error("Cannot {action} {entity} {id} while it is '{status}'")]
  InvalidTransition {
    entity: &'static str,
    id: Uuid,
    status: String,
    action: &'static str,
  },

  #[error("Actor {actor_id} is not allowed to act on order {order_id}")]
  Unauthorized { actor_id: Uuid, order_id: Uuid },

  #[error("Configuration error: {0}")]
  Config(String),

  #[error("Infrastructure failure during {context}. Source: {source}")]
  Infrastructure {
    context: String,
    #[source]
    source: AnyhowError,
  },
}

impl OmsError {
  pub fn validation(message: impl Into<String>) -> Self {
    OmsError::Validation { message: message.into() }
  }

  pub fn not_found(entity: &'static str, id: Uuid) -> Self {
    OmsError::NotFound { entity, id }
  }

  pub fn infrastructure(context: impl Into<String>, source: impl Into<AnyhowError>) -> Self {
    OmsError::Infrastructure {
      context: context.into(),
      source: source.into(),
    }
  }

  pub fn kind(&self) -> ErrorKind {
    match self {
      OmsError::Validation { .. } => ErrorKind::Validation,
      OmsError::NotFound { .. } => ErrorKind::NotFound,
      OmsError::InsufficientStock { .. }
      | OmsError::PaymentAlreadyExists { .. }
      | OmsError::PaymentAlreadyVerified { .. }
      | OmsError::InvalidTransition { .. } => ErrorKind::Conflict,
      OmsError::Unauthorized { .. } => ErrorKind::Authorization,
      OmsError::Config(_) | OmsError::Infrastructure { .. } => ErrorKind::Infrastructure,
    }
  }

  pub fn is_conflict(&self) -> bool {
    self.kind() == ErrorKind::Conflict
  }
}

impl From<StoreError> for OmsError {
  fn from(err: StoreError) -> Self {
    OmsError::Infrastructure {
      context: "store operation".to_string(),
      source: AnyhowError::new(err),
    }
  }
}

impl From<AnyhowError> for OmsError {
  fn from(err: AnyhowError) -> Self {
    OmsError::Infrastructure {
      context: "external operation".to_string(),
      source: err,
    }
  }
}

pub type OmsResult<T, E = OmsError> = std::result::Result<T, E>;
