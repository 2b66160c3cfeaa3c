//! Router builder for the warden HTTP endpoints.

use std::sync::Arc;

use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use warden_core::{GovernancePipeline, RecommendationEngine};

use crate::handlers;
use crate::state::AppState;

/// Builder for the warden governance API.
///
/// # Example
///
/// ```rust,no_run
/// use warden_core::{GovernancePipeline, HelperProcessBackend};
/// use warden_server::WardenRouter;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pipeline = GovernancePipeline::builder()
///     .backend(HelperProcessBackend::new("/usr/local/bin/cua-helper"))
///     .build()?;
///
/// let app = WardenRouter::new(pipeline).build();
///
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```
pub struct WardenRouter {
    pipeline: Arc<GovernancePipeline>,
    engine: Arc<RecommendationEngine>,
    cors: bool,
}

impl WardenRouter {
    /// Create a router builder around a pipeline.
    ///
    /// The pipeline is wrapped in an `Arc` for sharing across handlers; a
    /// default [`RecommendationEngine`] is attached.
    pub fn new(pipeline: GovernancePipeline) -> Self {
        Self::from_arc(Arc::new(pipeline))
    }

    /// Create a router builder from an existing `Arc<GovernancePipeline>`.
    ///
    /// Use this when other parts of the application share the pipeline.
    pub fn from_arc(pipeline: Arc<GovernancePipeline>) -> Self {
        Self {
            pipeline,
            engine: Arc::new(RecommendationEngine::new()),
            cors: false,
        }
    }

    /// Use a specific recommendation engine instead of the default.
    pub fn engine(mut self, engine: Arc<RecommendationEngine>) -> Self {
        self.engine = engine;
        self
    }

    /// Allow cross-origin requests (permissive CORS, for dashboards served
    /// from a different origin).
    pub fn with_cors(mut self) -> Self {
        self.cors = true;
        self
    }

    /// Build the router with all endpoints.
    ///
    /// Returns an axum `Router` that can be served directly or merged with
    /// other routes.
    pub fn build(self) -> Router {
        let state = AppState::new(self.pipeline, self.engine);

        let mut router = Router::new()
            .route("/health", get(handlers::health))
            .route("/capabilities", get(handlers::capabilities))
            .route("/roles", get(handlers::roles))
            .route("/users", get(handlers::users))
            .route(
                "/users/:id/roles",
                get(handlers::user_roles).post(handlers::assign_role),
            )
            .route("/users/:id/roles/:role", delete(handlers::remove_role))
            .route("/users/:id/capabilities", post(handlers::grant_capability))
            .route(
                "/users/:id/capabilities/:capability",
                delete(handlers::revoke_capability),
            )
            .route("/execute", post(handlers::execute))
            .route("/audit", get(handlers::audit_query))
            .route("/audit/recent", get(handlers::audit_recent))
            .route("/audit/stream", get(handlers::audit_stream))
            .route("/recommendations", get(handlers::recommendations))
            .route(
                "/recommendations/generate",
                post(handlers::generate_recommendations),
            )
            .route(
                "/recommendations/:id/apply",
                post(handlers::apply_recommendation),
            )
            .route(
                "/recommendations/:id/dismiss",
                post(handlers::dismiss_recommendation),
            );

        if self.cors {
            router = router.layer(CorsLayer::permissive());
        }

        router.layer(TraceLayer::new_for_http()).with_state(state)
    }

    /// Build the router nested under a prefix path.
    ///
    /// Useful when integrating with an existing application router.
    pub fn build_nested(self, prefix: impl Into<String>) -> Router {
        Router::new().nest(&prefix.into(), self.build())
    }
}

#[cfg(test)]
#[path = "router_tests.rs"]
mod tests;
