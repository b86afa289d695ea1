//! Application state

use crate::config::Config;
use docflow::DocumentWorkflow;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Workflow with both store handles
    pub workflow: DocumentWorkflow,

    /// Server configuration
    pub config: Config,
}
