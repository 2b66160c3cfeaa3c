//! Tests for the router builder.

use std::sync::Arc;

use warden_core::test_utils::MockBackend;
use warden_core::{GovernancePipeline, RecommendationEngine};

use crate::router::WardenRouter;

fn pipeline() -> GovernancePipeline {
    GovernancePipeline::builder()
        .backend(MockBackend::new())
        .build()
        .unwrap()
}

#[test]
fn test_builder_accepts_owned_and_shared_pipelines() {
    let _ = WardenRouter::new(pipeline()).build();
    let _ = WardenRouter::from_arc(Arc::new(pipeline())).build();
}

#[test]
fn test_builder_fluent_api() {
    let engine = Arc::new(RecommendationEngine::new());
    let _ = WardenRouter::new(pipeline())
        .engine(engine)
        .with_cors()
        .build();
}

#[test]
fn test_build_nested() {
    let _ = WardenRouter::new(pipeline()).build_nested("/api");
}

#[test]
fn test_app_state_construction() {
    use crate::state::AppState;

    let state = AppState::new(
        Arc::new(pipeline()),
        Arc::new(RecommendationEngine::new()),
    );
    // State is Clone; handlers receive their own copy per request.
    let _ = state.clone();
}
