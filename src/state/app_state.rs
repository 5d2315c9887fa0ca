use std::sync::Arc;

use crate::client::Backend;
use crate::config::AppConfig;

/// Shared by every worker.
#[derive(Clone)]
pub struct AppState {
    pub backend: Arc<dyn Backend>,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(backend: Arc<dyn Backend>, config: AppConfig) -> Self {
        Self { backend, config }
    }
}

#[cfg(test)]
pub(crate) fn test_state(backend: Arc<dyn Backend>) -> actix_web::web::Data<AppState> {
    actix_web::web::Data::new(AppState::new(backend, crate::config::test_config()))
}
