//! Deferred loader for the Formbricks browser SDK.
//!
//! [`Formbricks`] can be used before the SDK bundle is available. Calls made
//! early are queued; the first `setup` call loads the bundle, runs the SDK's own
//! setup and replays the queue in arrival order.

pub mod assets;
pub mod config;
pub mod handle;
pub mod loader;
pub mod proxy;
pub mod queue;
pub mod routing;
pub mod script;
pub mod setup;

pub use assets::{
    AssetLoader, HttpAssetLoader, LoadError, ScriptRuntime, StaticAssetLoader, StubRuntime,
};
pub use config::LoaderConfig;
pub use handle::{SdkError, SdkHandle, SdkMethod, SdkSlot, StubSdk};
pub use loader::{BootstrapOutcome, FormbricksLoader, Lifecycle};
pub use proxy::{Formbricks, InitConfig, TrackProperties};
pub use queue::{PendingCall, ReplaySummary};
pub use script::ScriptDirective;
pub use setup::{SetupArgs, ValidationError};
