//! The execution backend contract.
//!
//! The pipeline treats the backend as an opaque remote call: it neither
//! interprets `data` nor retries on its own. Retry and backoff, if any,
//! belong inside a backend adapter.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::action::Action;

/// What the backend reports for one executed action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendResponse {
    /// Whether the action ran successfully.
    pub success: bool,

    /// Backend-defined payload, passed through verbatim.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    /// Error message on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BackendResponse {
    /// A successful response with a payload.
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// A failed response.
    pub fn err(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }
}

/// An action execution backend.
#[async_trait]
pub trait ActionBackend: Send + Sync {
    /// Execute one action. Failures are reported in the response, not as a
    /// Rust error: the backend's error surface is part of its contract.
    async fn execute(&self, action: &Action) -> BackendResponse;

    /// Whether the backend is currently able to execute actions.
    async fn health_check(&self) -> bool;
}

/// Backend that drives a desktop-automation helper executable.
///
/// Each action type maps to one helper invocation:
///
/// | Action | Argv |
/// |---|---|
/// | `screenshot` | `screenshot <output>` |
/// | `click` | `click <x> <y> <button>` |
/// | `move` | `move <x> <y>` |
/// | `scroll` | `scroll <x> <y> <delta>` |
/// | `type` | `type <text>` |
/// | `key` | `key <shortcut>` |
///
/// `wait` is handled in-process without spawning the helper.
pub struct HelperProcessBackend {
    helper: PathBuf,
}

impl HelperProcessBackend {
    /// Create a backend driving the helper at the given path.
    pub fn new(helper: impl Into<PathBuf>) -> Self {
        Self {
            helper: helper.into(),
        }
    }

    fn argv(action: &Action) -> Result<Vec<String>, String> {
        let p = &action.params;
        match action.action_type.as_str() {
            "screenshot" => {
                let output = str_param(p, "output").unwrap_or("/tmp/screenshot.png");
                Ok(vec!["screenshot".into(), output.into()])
            }
            "click" => Ok(vec![
                "click".into(),
                int_param(p, "x")?.to_string(),
                int_param(p, "y")?.to_string(),
                str_param(p, "button").unwrap_or("left").into(),
            ]),
            "move" => Ok(vec![
                "move".into(),
                int_param(p, "x")?.to_string(),
                int_param(p, "y")?.to_string(),
            ]),
            "scroll" => Ok(vec![
                "scroll".into(),
                int_param(p, "x")?.to_string(),
                int_param(p, "y")?.to_string(),
                int_param(p, "delta")?.to_string(),
            ]),
            "type" => Ok(vec![
                "type".into(),
                str_param(p, "text")
                    .ok_or_else(|| "missing parameter: text".to_string())?
                    .into(),
            ]),
            "key" => Ok(vec![
                "key".into(),
                str_param(p, "shortcut")
                    .ok_or_else(|| "missing parameter: shortcut".to_string())?
                    .into(),
            ]),
            other => Err(format!("unsupported action type: {}", other)),
        }
    }
}

fn int_param(params: &Value, name: &str) -> Result<i64, String> {
    params
        .get(name)
        .and_then(Value::as_i64)
        .ok_or_else(|| format!("missing parameter: {}", name))
}

fn str_param<'a>(params: &'a Value, name: &str) -> Option<&'a str> {
    params.get(name).and_then(Value::as_str)
}

#[async_trait]
impl ActionBackend for HelperProcessBackend {
    async fn execute(&self, action: &Action) -> BackendResponse {
        if action.action_type == "wait" {
            let ms = action
                .params
                .get("ms")
                .and_then(Value::as_u64)
                .unwrap_or(1000);
            tokio::time::sleep(Duration::from_millis(ms)).await;
            return BackendResponse::ok(serde_json::json!({ "waited_ms": ms }));
        }

        let args = match Self::argv(action) {
            Ok(args) => args,
            Err(e) => return BackendResponse::err(e),
        };
        debug!(helper = %self.helper.display(), ?args, "spawning helper");

        match tokio::process::Command::new(&self.helper)
            .args(&args)
            .output()
            .await
        {
            Ok(output) if output.status.success() => {
                let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
                BackendResponse::ok(serde_json::json!({ "output": stdout }))
            }
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
                BackendResponse::err(if stderr.is_empty() {
                    format!("helper exited with {}", output.status)
                } else {
                    stderr
                })
            }
            Err(e) => BackendResponse::err(format!(
                "helper not runnable at {}: {}",
                self.helper.display(),
                e
            )),
        }
    }

    async fn health_check(&self) -> bool {
        self.helper.exists()
    }
}
