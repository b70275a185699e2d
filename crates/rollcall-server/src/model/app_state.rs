//! Shared application state handed to every handler

use std::sync::Arc;

use rollcall_registry::RegistryService;

/// State shared across HTTP workers
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<RegistryService>,
}

impl AppState {
    pub fn new(registry: Arc<RegistryService>) -> Self {
        Self { registry }
    }
}
