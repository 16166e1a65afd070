// mini_oms/src/config.rs

use crate::error::{OmsError, OmsResult};
use crate::models::OrderStatus;
use dotenvy::dotenv;
use std::env;

pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 10;
pub const DEFAULT_NUMBER_GENERATION_ATTEMPTS: u32 = 5;

/// `paid` and `success` are spellings older rows may still carry.
pub const LEGACY_REVENUE_STATUSES: [&str; 2] = ["paid", "success"];

/// Order statuses whose totals count towards revenue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevenueStatusSet(Vec<String>);

impl RevenueStatusSet {
  pub fn new<I, S>(statuses: I) -> OmsResult<Self>
  where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
  {
    let mut normalized: Vec<String> = Vec::new();
    for status in statuses {
      let status = status.as_ref().trim().to_lowercase();
      if !status.is_empty() && !normalized.contains(&status) {
        normalized.push(status);
      }
    }
    if normalized.is_empty() {
      return Err(OmsError::Config("revenue status set must not be empty".to_string()));
    }
    Ok(Self(normalized))
  }

  pub fn contains(&self, status: &str) -> bool {
    self.0.iter().any(|s| s == status)
  }

  pub fn counts(&self, status: OrderStatus) -> bool {
    self.contains(status.as_str())
  }

  pub fn as_slice(&self) -> &[String] {
    &self.0
  }
}

impl Default for RevenueStatusSet {
  fn default() -> Self {
    let canonical = [OrderStatus::Processing.as_str(), OrderStatus::Completed.as_str()];
    Self(
      canonical
        .iter()
        .chain(LEGACY_REVENUE_STATUSES.iter())
        .map(|s| s.to_string())
        .collect(),
    )
  }
}

#[derive(Debug, Clone)]
pub struct OmsConfig {
  /// Only needed by `PgStore`; the in-memory store runs without it.
  pub database_url: Option<String>,
  pub db_max_connections: u32,
  pub revenue_statuses: RevenueStatusSet,
  /// How many order/payment numbers are tried before a collision is
  /// reported as an infrastructure failure.
  pub number_generation_attempts: u32,
}

impl Default for OmsConfig {
  fn default() -> Self {
    Self {
      database_url: None,
      db_max_connections: DEFAULT_DB_MAX_CONNECTIONS,
      revenue_statuses: RevenueStatusSet::default(),
      number_generation_attempts: DEFAULT_NUMBER_GENERATION_ATTEMPTS,
    }
  }
}

impl OmsConfig {
  pub fn from_env() -> OmsResult<Self> {
    dotenv().ok(); // Load .env file if present

    let get_env = |var_name: &str| env::var(var_name).ok().filter(|v| !v.trim().is_empty());

    let database_url = get_env("DATABASE_URL");

    let db_max_connections = match get_env("DB_MAX_CONNECTIONS") {
      Some(raw) => raw
        .parse::<u32>()
        .map_err(|e| OmsError::Config(format!("Invalid DB_MAX_CONNECTIONS: {}", e)))?,
      None => DEFAULT_DB_MAX_CONNECTIONS,
    };
    if db_max_connections == 0 {
      return Err(OmsError::Config("DB_MAX_CONNECTIONS must be at least 1".to_string()));
    }

    let revenue_statuses = match get_env("REVENUE_STATUSES") {
      Some(raw) => RevenueStatusSet::new(raw.split(','))?,
      None => RevenueStatusSet::default(),
    };

    let number_generation_attempts = match get_env("NUMBER_GENERATION_ATTEMPTS") {
      Some(raw) => raw
        .parse::<u32>()
        .map_err(|e| OmsError::Config(format!("Invalid NUMBER_GENERATION_ATTEMPTS: {}", e)))?,
      None => DEFAULT_NUMBER_GENERATION_ATTEMPTS,
    };
    if number_generation_attempts == 0 {
      return Err(OmsError::Config("NUMBER_GENERATION_ATTEMPTS must be at least 1".to_string()));
    }

    tracing::info!(
      db_configured = database_url.is_some(),
      db_max_connections,
      revenue_statuses = ?revenue_statuses.as_slice(),
      number_generation_attempts,
      "OMS configuration loaded."
    );

    Ok(Self {
      database_url,
      db_max_connections,
      revenue_statuses,
      number_generation_attempts,
    })
  }

  pub fn require_database_url(&self) -> OmsResult<&str> {
    self
      .database_url
      .as_deref()
      .ok_or_else(|| OmsError::Config("Missing environment variable 'DATABASE_URL'".to_string()))
  }
}
