use std::collections::BTreeMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use log::debug;
use serde_json::Value;

use crate::functions::api::FirebaseFunctions;
use crate::functions::error::{deadline_exceeded, internal_error, not_found, FunctionsResult};

type Handler =
    Arc<dyn Fn(Option<Value>) -> BoxFuture<'static, FunctionsResult<Option<Value>>> + Send + Sync>;

/// In-memory callable-function registry.
///
/// Handlers registered under a name run in-process when called; there is no
/// network hop, but the deadline contract is honored.
#[derive(Clone, Default)]
pub struct LocalFunctions {
    handlers: Arc<Mutex<BTreeMap<String, Handler>>>,
}

impl LocalFunctions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) the handler for a function name.
    pub fn register<F, Fut>(&self, name: impl Into<String>, handler: F) -> FunctionsResult<()>
    where
        F: Fn(Option<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = FunctionsResult<Option<Value>>> + Send + 'static,
    {
        let mut handlers = self.lock()?;
        handlers.insert(name.into(), Arc::new(move |data| handler(data).boxed()));
        Ok(())
    }

    fn lock(&self) -> FunctionsResult<MutexGuard<'_, BTreeMap<String, Handler>>> {
        self.handlers
            .lock()
            .map_err(|_| internal_error("Function registry lock poisoned"))
    }
}

#[async_trait]
impl FirebaseFunctions for LocalFunctions {
    async fn call(
        &self,
        name: &str,
        data: Option<Value>,
        timeout: Option<Duration>,
    ) -> FunctionsResult<Option<Value>> {
        let handler = {
            let handlers = self.lock()?;
            handlers
                .get(name)
                .cloned()
                .ok_or_else(|| not_found(format!("No function registered under '{name}'")))?
        };
        debug!("calling function {name}");
        let invocation = handler(data);
        match timeout {
            Some(deadline) => tokio::time::timeout(deadline, invocation)
                .await
                .map_err(|_| {
                    deadline_exceeded(format!(
                        "Function '{name}' exceeded its {}ms deadline",
                        deadline.as_millis()
                    ))
                })?,
            None => invocation.await,
        }
    }
}
