//! Error reporting around top-level actions.
//!
//! An action runs with an [`ActionContext`] it can attach properties to.
//! When the action fails the error is reported together with those
//! properties and then returned unchanged to the caller.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use log::{debug, error};
use uuid::Uuid;

/// Properties collected while an action runs.
#[derive(Debug, Clone)]
pub struct ActionContext {
    action: String,
    correlation_id: Uuid,
    properties: Arc<Mutex<BTreeMap<String, String>>>,
}

impl ActionContext {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            correlation_id: Uuid::new_v4(),
            properties: Arc::new(Mutex::new(BTreeMap::new())),
        }
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    pub fn set_property(&self, key: impl Into<String>, value: impl Into<String>) {
        self.properties
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.into(), value.into());
    }

    pub fn property(&self, key: &str) -> Option<String> {
        self.properties
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }

    pub fn properties(&self) -> BTreeMap<String, String> {
        self.properties
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

/// Receives failed actions.
pub trait ErrorReporter: Send + Sync {
    fn report(&self, context: &ActionContext, error: &(dyn std::error::Error + 'static));

    /// Called for actions that completed without error.
    fn record(&self, _context: &ActionContext) {}
}

/// Reports through the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogErrorReporter;

impl ErrorReporter for LogErrorReporter {
    fn report(&self, context: &ActionContext, error: &(dyn std::error::Error + 'static)) {
        error!(
            "{} failed [{}]: {} {:?}",
            context.action(),
            context.correlation_id(),
            error,
            context.properties()
        );
    }

    fn record(&self, context: &ActionContext) {
        debug!(
            "{} succeeded [{}] {:?}",
            context.action(),
            context.correlation_id(),
            context.properties()
        );
    }
}

/// Run `body` as `action`, reporting a failure before returning it.
pub async fn call_with_telemetry_and_error_handling<T, E, F, Fut>(
    reporter: &dyn ErrorReporter,
    action: &str,
    body: F,
) -> Result<T, E>
where
    F: FnOnce(ActionContext) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::error::Error + 'static,
{
    let context = ActionContext::new(action);
    let started = Instant::now();

    let result = body(context.clone()).await;

    context.set_property("duration_ms", started.elapsed().as_millis().to_string());
    match &result {
        Ok(_) => {
            context.set_property("result", "Succeeded");
            reporter.record(&context);
        }
        Err(e) => {
            context.set_property("result", "Failed");
            reporter.report(&context, e);
        }
    }

    result
}
