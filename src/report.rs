//! Optional fire-and-forget error reporting.
//!
//! When a reporting DSN is configured, unexpected errors are POSTed to it
//! from a spawned task so the client response is never delayed on the
//! tracker being slow or down.

use serde_json::json;
use tracing::debug;

#[derive(Clone, Default)]
pub struct ErrorReporter {
    dsn: Option<String>,
}

impl ErrorReporter {
    pub fn new(dsn: Option<String>) -> Self {
        Self { dsn }
    }

    pub fn report(&self, context: &str, error: &str) {
        let Some(dsn) = self.dsn.clone() else {
            return;
        };
        let payload = json!({
            "service": "breakwater",
            "context": context,
            "error": error,
        });
        tokio::spawn(async move {
            let client = reqwest::Client::new();
            if let Err(e) = client.post(&dsn).json(&payload).send().await {
                debug!(error = %e, "Error report delivery failed");
            }
        });
    }
}
