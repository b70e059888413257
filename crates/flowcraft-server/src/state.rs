use crate::configuration::AccessPolicy;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub policy: Arc<AccessPolicy>,
}

impl AppState {
    pub fn new(policy: AccessPolicy) -> Self {
        Self {
            policy: Arc::new(policy),
        }
    }
}
