use harvest_core::ContentStorage;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<dyn ContentStorage>,
}

impl AppState {
    pub fn new(storage: Arc<dyn ContentStorage>) -> Self {
        Self { storage }
    }
}
