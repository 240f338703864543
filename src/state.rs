use std::sync::Arc;

use crate::translate::Translator;

/// Shared, read-only service context handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub translator: Arc<dyn Translator>,
}

impl AppState {
    pub fn new(translator: Arc<dyn Translator>) -> Self {
        Self { translator }
    }
}
