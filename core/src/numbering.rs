// mini_oms/src/numbering.rs

//! Human-readable business numbers: `<PREFIX>-YYYYMMDD-HHMMSS-NNNN`.
//!
//! Uniqueness is enforced by the store, not here. Callers regenerate on a
//! collision up to `OmsConfig::number_generation_attempts` times.

use chrono::{DateTime, Utc};
use rand::Rng;

pub const ORDER_NUMBER_PREFIX: &str = "ORD";
pub const PAYMENT_NUMBER_PREFIX: &str = "PAY";

pub trait NumberGenerator: Send + Sync {
  fn generate(&self, prefix: &str, at: DateTime<Utc>) -> String;
}

/// Date/time component plus a four digit random suffix.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomSuffixGenerator;

impl NumberGenerator for RandomSuffixGenerator {
  fn generate(&self, prefix: &str, at: DateTime<Utc>) -> String {
    let suffix: u16 = rand::thread_rng().gen_range(0..10_000);
    format_number(prefix, at, suffix)
  }
}

pub fn format_number(prefix: &str, at: DateTime<Utc>, suffix: u16) -> String {
  format!("{}-{}-{:04}", prefix, at.format("%Y%m%d-%H%M%S"), suffix)
}
