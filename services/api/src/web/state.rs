//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::generation::{ContentGenerator, JobQueue};
use campus_ai_core::{FileStorage, ResourceRepository};
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub resources: Arc<dyn ResourceRepository>,
    pub storage: Arc<dyn FileStorage>,
    pub generator: Arc<ContentGenerator>,
    pub jobs: Arc<JobQueue>,
}
