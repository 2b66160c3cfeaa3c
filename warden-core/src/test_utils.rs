//! Test doubles for pipeline and server tests.
//!
//! Available to downstream crates' tests through the `test-utils` feature.

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;

use crate::action::Action;
use crate::backend::{ActionBackend, BackendResponse};

/// Scripted [`ActionBackend`] that records every call.
///
/// Responses are served from a queue; once the queue is empty the backend
/// falls back to a generic success. Use [`failing`](MockBackend::failing)
/// for an always-failing backend and
/// [`with_delay`](MockBackend::with_delay) to simulate a slow one.
pub struct MockBackend {
    responses: Mutex<std::collections::VecDeque<BackendResponse>>,
    calls: Mutex<Vec<Action>>,
    fallback: BackendResponse,
    delay: Option<Duration>,
    healthy: bool,
}

impl MockBackend {
    /// A backend that succeeds on every call.
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(std::collections::VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            fallback: BackendResponse::ok(json!({"ok": true})),
            delay: None,
            healthy: true,
        }
    }

    /// A backend that fails every call with the given message.
    pub fn failing(error: impl Into<String>) -> Self {
        let mut backend = Self::new();
        backend.fallback = BackendResponse::err(error);
        backend
    }

    /// Queue one scripted response, served before the fallback.
    pub fn with_response(self, response: BackendResponse) -> Self {
        self.responses.lock().push_back(response);
        self
    }

    /// Sleep this long before responding.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Report unhealthy from `health_check`.
    pub fn unhealthy(mut self) -> Self {
        self.healthy = false;
        self
    }

    /// Every action this backend has been asked to execute, in order.
    pub fn calls(&self) -> Vec<Action> {
        self.calls.lock().clone()
    }

    /// How many times the backend has been called.
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ActionBackend for MockBackend {
    async fn execute(&self, action: &Action) -> BackendResponse {
        self.calls.lock().push(action.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }

    async fn health_check(&self) -> bool {
        self.healthy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_responses_then_fallback() {
        let backend = MockBackend::new().with_response(BackendResponse::err("scripted"));

        let first = backend.execute(&Action::bare("click")).await;
        assert!(!first.success);

        let second = backend.execute(&Action::bare("click")).await;
        assert!(second.success);
        assert_eq!(backend.call_count(), 2);
    }

    #[tokio::test]
    async fn test_failing_backend() {
        let backend = MockBackend::failing("boom");
        let resp = backend.execute(&Action::bare("click")).await;
        assert_eq!(resp.error.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn test_records_calls_in_order() {
        let backend = MockBackend::new();
        backend.execute(&Action::bare("screenshot")).await;
        backend.execute(&Action::bare("click")).await;

        let calls = backend.calls();
        assert_eq!(calls[0].action_type, "screenshot");
        assert_eq!(calls[1].action_type, "click");
    }

    #[tokio::test]
    async fn test_health_flag() {
        assert!(MockBackend::new().health_check().await);
        assert!(!MockBackend::new().unhealthy().health_check().await);
    }
}
