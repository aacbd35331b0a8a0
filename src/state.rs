use std::sync::Arc;

use crate::config::AppConfig;
use crate::database::Store;
use crate::services::Services;

/// Shared handler state: configuration, the store, and the services over it
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn Store>,
    pub services: Services,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn Store>) -> Self {
        let services = Services::new(store.clone(), &config);
        Self {
            config: Arc::new(config),
            store,
            services,
        }
    }
}
