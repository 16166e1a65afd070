// mini_oms/src/state.rs
use crate::config::OmsConfig;
use crate::error::OmsResult;
use crate::numbering::{NumberGenerator, RandomSuffixGenerator};
use crate::store::{MemoryStore, PgStore, Store};
use crate::workflow::{OrderWorkflow, PaymentWorkflow};
use std::sync::Arc;
use tracing::{event, Level};

/// The wired core handed to a presentation layer: both workflows sharing
/// one store handle and one configuration.
#[derive(Clone)]
pub struct Oms<S: Store> {
  pub store: S,
  pub config: Arc<OmsConfig>,
  pub orders: OrderWorkflow<S>,
  pub payments: PaymentWorkflow<S>,
}

impl<S: Store> Oms<S> {
  pub fn new(store: S, config: OmsConfig) -> Self {
    Self::with_number_generator(store, config, Arc::new(RandomSuffixGenerator))
  }

  pub fn with_number_generator(store: S, config: OmsConfig, numbers: Arc<dyn NumberGenerator>) -> Self {
    let config = Arc::new(config);
    Self {
      orders: OrderWorkflow::new(store.clone(), Arc::clone(&config), Arc::clone(&numbers)),
      payments: PaymentWorkflow::new(store.clone(), Arc::clone(&config), numbers),
      store,
      config,
    }
  }
}

impl Oms<MemoryStore> {
  pub fn in_memory(config: OmsConfig) -> Self {
    Self::new(MemoryStore::new(), config)
  }
}

impl Oms<PgStore> {
  /// Connects to `DATABASE_URL`, applies migrations and wires the workflows.
  pub async fn connect(config: OmsConfig) -> OmsResult<Self> {
    let store = PgStore::connect(&config).await?;
    store.migrate().await?;
    event!(Level::INFO, "Database migrations applied.");
    Ok(Self::new(store, config))
  }
}
