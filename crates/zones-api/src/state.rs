//! # Application State
//!
//! Shared state handed to every route handler: the store, the batch
//! coordinator, and the loaded configuration.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use zones_batch::BatchContainment;
use zones_store::ZoneStore;

use crate::config::AppConfig;

/// Shared application state. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ZoneStore>,
    pub batch: Arc<dyn BatchContainment>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn ZoneStore>,
        batch: Arc<dyn BatchContainment>,
        config: AppConfig,
    ) -> Self {
        Self {
            store,
            batch,
            config: Arc::new(config),
        }
    }

    /// Deadline applied to every batch request.
    pub fn batch_timeout(&self) -> Duration {
        self.config.batch_timeout()
    }
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
