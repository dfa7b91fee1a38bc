use crate::assets::{AssetLoader, LoadError, load_with_timeout};
use crate::config::LoaderConfig;
use crate::handle::{SdkError, SdkHandle, SdkMethod, SdkSlot, invoke_handle};
use crate::queue::{PendingQueue, ReplaySummary, replay};
use crate::script::ScriptDirective;
use crate::setup::{SetupArgs, ValidationError, validate_setup_args};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Lifecycle {
    Uninitialized,
    Initializing,
    Ready,
}

pub(crate) enum Phase {
    Uninitialized,
    Initializing,
    Ready(Arc<dyn SdkHandle>),
}

impl Phase {
    fn lifecycle(&self) -> Lifecycle {
        match self {
            Phase::Uninitialized => Lifecycle::Uninitialized,
            Phase::Initializing => Lifecycle::Initializing,
            Phase::Ready(_) => Lifecycle::Ready,
        }
    }
}

pub(crate) struct LoaderState {
    pub(crate) phase: Phase,
    pub(crate) queue: PendingQueue,
}

/// What a bootstrap attempt ended with.
#[derive(Debug, Clone, PartialEq)]
pub enum BootstrapOutcome {
    Ready { replay: ReplaySummary },
    AlreadyInitializing,
    AlreadyReady,
    Invalid(ValidationError),
    LoadFailed(LoadError),
    SetupFailed(SdkError),
}

pub(crate) struct Inner {
    pub(crate) config: LoaderConfig,
    pub(crate) assets: Arc<dyn AssetLoader>,
    pub(crate) slot: SdkSlot,
    pub(crate) state: Mutex<LoaderState>,
}

impl Inner {
    pub(crate) fn state(&self) -> MutexGuard<'_, LoaderState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Loader context: lifecycle, pending calls and the collaborators used to bootstrap.
///
/// Cheap to clone; clones share the same state.
#[derive(Clone)]
pub struct FormbricksLoader {
    pub(crate) inner: Arc<Inner>,
}

impl FormbricksLoader {
    pub fn new(config: LoaderConfig, assets: Arc<dyn AssetLoader>, slot: SdkSlot) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                assets,
                slot,
                state: Mutex::new(LoaderState {
                    phase: Phase::Uninitialized,
                    queue: PendingQueue::default(),
                }),
            }),
        }
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.inner.config
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.inner.state().phase.lifecycle()
    }

    /// Number of calls waiting for bootstrap.
    pub fn pending(&self) -> usize {
        self.inner.state().queue.len()
    }

    /// Loads the SDK, runs its `setup` and replays the queue.
    ///
    /// Failures are logged and reported in the outcome; the loader is left
    /// retryable in every case except `Ready`.
    pub async fn bootstrap(&self, args: Vec<Value>) -> BootstrapOutcome {
        let setup = {
            let mut state = self.inner.state();
            match state.phase {
                Phase::Initializing => {
                    warn!("Formbricks is already initializing");
                    return BootstrapOutcome::AlreadyInitializing;
                }
                Phase::Ready(_) => {
                    debug!("Formbricks is already set up");
                    return BootstrapOutcome::AlreadyReady;
                }
                Phase::Uninitialized => {}
            }
            let setup = match validate_setup_args(&args) {
                Ok(setup) => setup,
                Err(err) => {
                    error!(error = %err, "Formbricks setup rejected: {err}");
                    return BootstrapOutcome::Invalid(err);
                }
            };
            state.phase = Phase::Initializing;
            setup
        };

        let _guard = InitializingGuard {
            inner: self.inner.as_ref(),
        };

        let handle = match self.acquire_sdk(&setup).await {
            Ok(handle) => handle,
            Err(err) => {
                error!(error = %err, app_url = %setup.app_url, "Failed to load Formbricks SDK");
                return BootstrapOutcome::LoadFailed(err);
            }
        };

        let setup_method = SdkMethod::Setup.as_str();
        if let Err(err) = invoke_handle(handle.as_ref(), setup_method, setup.to_call_args()).await {
            error!(error = %err, "Formbricks setup failed");
            return BootstrapOutcome::SetupFailed(err);
        }

        let summary = self.commit(handle).await;
        info!(
            environment_id = %setup.environment_id,
            dispatched = summary.dispatched,
            skipped = summary.skipped,
            failed = summary.failed,
            "Formbricks ready"
        );
        BootstrapOutcome::Ready { replay: summary }
    }

    async fn acquire_sdk(&self, setup: &SetupArgs) -> Result<Arc<dyn SdkHandle>, LoadError> {
        if let Some(handle) = self.inner.slot.current() {
            debug!("Formbricks SDK already present; skipping script injection");
            return Ok(handle);
        }
        let directive = ScriptDirective::for_app(&setup.app_url, &self.inner.config.bundle_file);
        load_with_timeout(
            self.inner.assets.as_ref(),
            &directive,
            self.inner.config.load_timeout,
        )
        .await?;
        self.inner.slot.current().ok_or(LoadError::HandleMissing)
    }

    /// Drains the queue, then flips to `Ready` under the same lock that saw it empty,
    /// so no direct call can overtake an older queued one. Each replayed call is
    /// bounded, so a stalled SDK method cannot hold the loader in `Initializing`.
    async fn commit(&self, handle: Arc<dyn SdkHandle>) -> ReplaySummary {
        let ready = handle.clone();
        replay(handle.as_ref(), self.inner.config.replay_call_timeout, || {
            let mut state = self.inner.state();
            let next = state.queue.pop();
            if next.is_none() {
                state.phase = Phase::Ready(ready.clone());
            }
            next
        })
        .await
    }
}

impl fmt::Debug for FormbricksLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state();
        f.debug_struct("FormbricksLoader")
            .field("lifecycle", &state.phase.lifecycle())
            .field("pending", &state.queue.len())
            .field("config", &self.inner.config)
            .finish()
    }
}

/// Releases the `Initializing` phase when a bootstrap attempt ends without
/// reaching `Ready`, including when its future is dropped mid-flight.
struct InitializingGuard<'a> {
    inner: &'a Inner,
}

impl Drop for InitializingGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.inner.state();
        if matches!(state.phase, Phase::Initializing) {
            state.phase = Phase::Uninitialized;
        }
    }
}
