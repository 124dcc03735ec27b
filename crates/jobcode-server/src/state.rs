use jobcode_core::reconcile::EventSink;
use std::sync::Arc;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub sink: Arc<dyn EventSink>,
}

impl AppState {
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self { sink }
    }
}
