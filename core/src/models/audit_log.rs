// mini_oms/src/models/audit_log.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Immutable record of who did what to which entity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditLogEntry {
  pub id: Uuid,
  pub actor_id: Uuid,
  pub action: String,
  pub entity_name: String,
  pub entity_id: Uuid,
  pub details: String,
  pub created_at: DateTime<Utc>,
}

impl AuditLogEntry {
  pub fn new(
    actor_id: Uuid,
    action: impl Into<String>,
    entity_name: impl Into<String>,
    entity_id: Uuid,
    details: impl Into<String>,
  ) -> Self {
    Self {
      id: Uuid::new_v4(),
      actor_id,
      action: action.into(),
      entity_name: entity_name.into(),
      entity_id,
      details: details.into(),
      created_at: Utc::now(),
    }
  }
}
