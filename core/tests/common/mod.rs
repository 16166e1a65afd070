// tests/common/mod.rs
#![allow(dead_code)] // Each test binary uses a different subset.

use chrono::{DateTime, Utc};
use mini_oms::numbering::{format_number, NumberGenerator};
use mini_oms::{MemoryStore, Oms, OmsConfig, Product, Store};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::Level;

// --- Helper for Tracing Setup (call once per test run if needed) ---
use once_cell::sync::Lazy;
static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer() // Important for tests to capture output
    .try_init()
    .ok(); // Allow multiple initializations in tests (ok if fails)
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}

pub fn rupiah(amount: i64) -> Decimal {
  Decimal::new(amount, 0)
}

pub fn memory_oms() -> Oms<MemoryStore> {
  setup_tracing();
  Oms::in_memory(OmsConfig::default())
}

pub async fn seed_product<S: Store>(store: &S, name: &str, price: i64, stock: i32) -> Product {
  let product = Product::new(name, rupiah(price), stock);
  store.insert_product(&product).await.expect("seed product");
  product
}

pub async fn stock_of<S: Store>(store: &S, product: &Product) -> i32 {
  store
    .find_product(product.id)
    .await
    .expect("read product")
    .expect("product exists")
    .stock
}

/// Hands out scripted suffixes in order, then keeps repeating the last one.
/// Counts calls so tests can see how often a number was regenerated.
pub struct ScriptedNumbers {
  suffixes: Mutex<VecDeque<u16>>,
  last: Mutex<u16>,
  calls: AtomicUsize,
}

impl ScriptedNumbers {
  pub fn new(suffixes: impl IntoIterator<Item = u16>) -> Arc<Self> {
    Arc::new(Self {
      suffixes: Mutex::new(suffixes.into_iter().collect()),
      last: Mutex::new(0),
      calls: AtomicUsize::new(0),
    })
  }

  /// Always the same number: every insert after the first collides.
  pub fn constant() -> Arc<Self> {
    Self::new([7])
  }

  pub fn calls(&self) -> usize {
    self.calls.load(Ordering::SeqCst)
  }
}

impl NumberGenerator for ScriptedNumbers {
  fn generate(&self, prefix: &str, _at: DateTime<Utc>) -> String {
    self.calls.fetch_add(1, Ordering::SeqCst);
    let suffix = match self.suffixes.lock().pop_front() {
      Some(next) => {
        *self.last.lock() = next;
        next
      }
      None => *self.last.lock(),
    };
    // A fixed timestamp so equal suffixes always collide.
    let fixed = DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap_or_else(Utc::now);
    format_number(prefix, fixed, suffix)
  }
}
