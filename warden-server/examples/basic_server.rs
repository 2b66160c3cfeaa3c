//! Basic warden server example.
//!
//! Serves the governance API over HTTP with the default desktop automation
//! vocabulary and a helper-process backend.
//!
//! Run with:
//! ```sh
//! cargo run -p warden-server --example basic_server
//! ```
//!
//! Test with curl:
//! ```sh
//! curl -X POST http://localhost:3000/users/alice/roles \
//!   -H "Content-Type: application/json" \
//!   -d '{"role": "operator"}'
//!
//! curl -X POST http://localhost:3000/execute \
//!   -H "Content-Type: application/json" \
//!   -d '{"action": {"type": "screenshot", "params": {}}, "user_id": "alice"}'
//!
//! curl -N http://localhost:3000/audit/stream
//! ```

use warden_core::{GovernancePipeline, HelperProcessBackend};
use warden_server::WardenRouter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,warden_core=debug".into()),
        )
        .init();

    // Build the pipeline around the desktop automation helper
    let pipeline = GovernancePipeline::builder()
        .backend(HelperProcessBackend::new("/usr/local/bin/cua-helper"))
        .build()?;

    // Build the router with all governance endpoints
    let app = WardenRouter::new(pipeline).with_cors().build();

    // Start the server
    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
    println!("Server running at http://localhost:3000");
    println!("Execute endpoint: POST http://localhost:3000/execute");
    println!("Live audit stream: GET http://localhost:3000/audit/stream");

    axum::serve(listener, app).await?;

    Ok(())
}
