//! Application state for the warden server.

use std::sync::Arc;

use warden_core::{GovernancePipeline, RecommendationEngine};

/// Shared application state, cloned into each request handler.
#[derive(Clone)]
pub struct AppState {
    /// The governance pipeline every request goes through.
    pub pipeline: Arc<GovernancePipeline>,

    /// The recommendation engine, scanning the pipeline's audit trail.
    pub engine: Arc<RecommendationEngine>,
}

impl AppState {
    /// Create application state from shared pipeline and engine handles.
    pub fn new(pipeline: Arc<GovernancePipeline>, engine: Arc<RecommendationEngine>) -> Self {
        Self { pipeline, engine }
    }
}
