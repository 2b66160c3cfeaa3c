//! HTTP API for the warden governance pipeline.
//!
//! This crate exposes the pipeline over REST plus a live SSE audit stream:
//! execute governed actions, manage user roles and capability grants, query
//! the audit trail, and drive the recommendation lifecycle.
//!
//! # Example
//!
//! ```rust,no_run
//! use warden_core::{GovernancePipeline, HelperProcessBackend};
//! use warden_server::WardenRouter;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pipeline = GovernancePipeline::builder()
//!     .backend(HelperProcessBackend::new("/usr/local/bin/cua-helper"))
//!     .build()?;
//!
//! let app = WardenRouter::new(pipeline).with_cors().build();
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod handlers;
pub mod router;
pub mod state;

// Re-exports
pub use error::{ServerError, ServerResult};
pub use handlers::{AssignRoleRequest, ExecuteRequest, GrantCapabilityRequest};
pub use router::WardenRouter;
pub use state::AppState;
