use crate::handle::{SdkHandle, SdkSlot, StubSdk};
use crate::script::ScriptDirective;
use async_trait::async_trait;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("Failed to load Formbricks SDK: {0}")]
    Failed(String),
    #[error("Formbricks SDK loading timed out after {0:?}")]
    TimedOut(Duration),
    #[error("Formbricks SDK loaded but exposed no instance")]
    HandleMissing,
}

/// Injects the SDK script into the host and reports the load/error signal.
///
/// One call is one injection. Implementations publish the SDK handle into
/// their [`SdkSlot`] as a side effect of a successful load.
#[async_trait]
pub trait AssetLoader: Send + Sync {
    async fn inject(&self, directive: &ScriptDirective) -> Result<(), LoadError>;
}

/// Runs one injection, bounded by `timeout` from the moment of injection.
pub async fn load_with_timeout(
    loader: &dyn AssetLoader,
    directive: &ScriptDirective,
    timeout: Duration,
) -> Result<(), LoadError> {
    debug!(src = %directive.src, ?timeout, "injecting formbricks script");
    match tokio::time::timeout(timeout, loader.inject(directive)).await {
        Ok(result) => result,
        Err(_) => Err(LoadError::TimedOut(timeout)),
    }
}

/// Turns a fetched bundle into a live SDK instance.
pub trait ScriptRuntime: Send + Sync {
    fn evaluate(&self, src: &Url, body: &[u8]) -> anyhow::Result<Arc<dyn SdkHandle>>;
}

/// Runtime that accepts any non-empty bundle and yields a fresh [`StubSdk`].
#[derive(Clone, Default)]
pub struct StubRuntime;

impl ScriptRuntime for StubRuntime {
    fn evaluate(&self, src: &Url, body: &[u8]) -> anyhow::Result<Arc<dyn SdkHandle>> {
        if body.is_empty() {
            anyhow::bail!("empty bundle at {src}");
        }
        info!(%src, bytes = body.len(), "evaluated formbricks bundle (stub)");
        Ok(Arc::new(StubSdk::new()))
    }
}

/// Fetches the bundle over HTTP and hands it to a [`ScriptRuntime`].
#[derive(Clone)]
pub struct HttpAssetLoader {
    client: reqwest::Client,
    runtime: Arc<dyn ScriptRuntime>,
    slot: SdkSlot,
}

impl HttpAssetLoader {
    pub fn new(runtime: Arc<dyn ScriptRuntime>, slot: SdkSlot) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self {
            client,
            runtime,
            slot,
        })
    }
}

#[async_trait]
impl AssetLoader for HttpAssetLoader {
    async fn inject(&self, directive: &ScriptDirective) -> Result<(), LoadError> {
        let url = Url::parse(&directive.src)
            .map_err(|err| LoadError::Failed(format!("invalid script src {}: {err}", directive.src)))?;
        let resp = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|err| LoadError::Failed(format!("request to {url} failed: {err}")))?;
        let status = resp.status();
        if !status.is_success() {
            warn!(%url, %status, "formbricks bundle request rejected");
            return Err(LoadError::Failed(format!("{url} returned {status}")));
        }
        let body = resp
            .bytes()
            .await
            .map_err(|err| LoadError::Failed(format!("reading {url} failed: {err}")))?;
        let handle = self
            .runtime
            .evaluate(&url, &body)
            .map_err(|err| LoadError::Failed(err.to_string()))?;
        self.slot.publish(handle);
        Ok(())
    }
}

/// Loader for hosts with the SDK linked in: publishes a prepared handle on injection.
pub struct StaticAssetLoader {
    handle: Arc<dyn SdkHandle>,
    slot: SdkSlot,
    injected: Mutex<Vec<ScriptDirective>>,
}

impl StaticAssetLoader {
    pub fn new(handle: Arc<dyn SdkHandle>, slot: SdkSlot) -> Self {
        Self {
            handle,
            slot,
            injected: Mutex::new(Vec::new()),
        }
    }

    pub fn injections(&self) -> Vec<ScriptDirective> {
        self.injected
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl AssetLoader for StaticAssetLoader {
    async fn inject(&self, directive: &ScriptDirective) -> Result<(), LoadError> {
        self.injected
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(directive.clone());
        self.slot.publish(self.handle.clone());
        Ok(())
    }
}
