use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::functions::error::FunctionsResult;

/// The callable-function surface.
#[async_trait]
pub trait FirebaseFunctions: Send + Sync {
    /// Invokes a named function with an optional JSON payload.
    ///
    /// With a `timeout`, a call still running when the deadline passes is
    /// cancelled and reported as a deadline-exceeded error.
    async fn call(
        &self,
        name: &str,
        data: Option<Value>,
        timeout: Option<Duration>,
    ) -> FunctionsResult<Option<Value>>;
}
