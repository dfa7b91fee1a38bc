use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SdkError {
    #[error("Method {0} does not exist on formbricks")]
    MissingMethod(String),
    #[error("{method} failed: {message}")]
    Rejected { method: String, message: String },
}

/// Methods the hosted SDK documents. Anything else goes through the generic path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SdkMethod {
    Setup,
    /// Replaced by `Setup`; still exposed by the SDK.
    Init,
    Track,
    SetEmail,
    SetAttribute,
    SetAttributes,
    SetLanguage,
    SetUserId,
    SetNonce,
    Logout,
    RegisterRouteChange,
}

impl SdkMethod {
    pub const ALL: [SdkMethod; 11] = [
        SdkMethod::Setup,
        SdkMethod::Init,
        SdkMethod::Track,
        SdkMethod::SetEmail,
        SdkMethod::SetAttribute,
        SdkMethod::SetAttributes,
        SdkMethod::SetLanguage,
        SdkMethod::SetUserId,
        SdkMethod::SetNonce,
        SdkMethod::Logout,
        SdkMethod::RegisterRouteChange,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SdkMethod::Setup => "setup",
            SdkMethod::Init => "init",
            SdkMethod::Track => "track",
            SdkMethod::SetEmail => "setEmail",
            SdkMethod::SetAttribute => "setAttribute",
            SdkMethod::SetAttributes => "setAttributes",
            SdkMethod::SetLanguage => "setLanguage",
            SdkMethod::SetUserId => "setUserId",
            SdkMethod::SetNonce => "setNonce",
            SdkMethod::Logout => "logout",
            SdkMethod::RegisterRouteChange => "registerRouteChange",
        }
    }
}

impl fmt::Display for SdkMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Runtime instance exposed by the loaded SDK bundle.
///
/// Methods are addressed by name; the loader never knows their implementations.
#[async_trait]
pub trait SdkHandle: Send + Sync {
    fn has_method(&self, method: &str) -> bool;
    async fn call(&self, method: &str, args: Vec<Value>) -> Result<Value, SdkError>;
}

/// Checks the method exists before calling it.
pub async fn invoke_handle(
    handle: &dyn SdkHandle,
    method: &str,
    args: Vec<Value>,
) -> Result<Value, SdkError> {
    if !handle.has_method(method) {
        return Err(SdkError::MissingMethod(method.to_string()));
    }
    handle.call(method, args).await
}

/// Shared slot the asset loader publishes the SDK handle into once the bundle has run.
///
/// The loader itself only reads from it.
#[derive(Clone, Default)]
pub struct SdkSlot {
    inner: Arc<RwLock<Option<Arc<dyn SdkHandle>>>>,
}

impl SdkSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Slot for a host page that shipped the SDK itself.
    pub fn preloaded(handle: Arc<dyn SdkHandle>) -> Self {
        let slot = Self::new();
        slot.publish(handle);
        slot
    }

    pub fn publish(&self, handle: Arc<dyn SdkHandle>) {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Some(handle);
    }

    pub fn current(&self) -> Option<Arc<dyn SdkHandle>> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_present(&self) -> bool {
        self.current().is_some()
    }
}

impl fmt::Debug for SdkSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SdkSlot")
            .field("present", &self.is_present())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedCall {
    pub method: String,
    pub args: Vec<Value>,
}

/// In-memory handle that records every call and logs it.
///
/// Exposes the documented method set unless told otherwise.
pub struct StubSdk {
    methods: HashSet<String>,
    rejections: HashMap<String, String>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl Default for StubSdk {
    fn default() -> Self {
        Self {
            methods: SdkMethod::ALL
                .iter()
                .map(|m| m.as_str().to_string())
                .collect(),
            rejections: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl StubSdk {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_method(mut self, method: &str) -> Self {
        self.methods.insert(method.to_string());
        self
    }

    pub fn without_method(mut self, method: &str) -> Self {
        self.methods.remove(method);
        self
    }

    /// Every call to `method` is recorded and then rejected with `message`.
    pub fn rejecting(mut self, method: &str, message: &str) -> Self {
        self.rejections
            .insert(method.to_string(), message.to_string());
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn calls_to(&self, method: &str) -> Vec<Vec<Value>> {
        self.calls()
            .into_iter()
            .filter(|c| c.method == method)
            .map(|c| c.args)
            .collect()
    }
}

#[async_trait]
impl SdkHandle for StubSdk {
    fn has_method(&self, method: &str) -> bool {
        self.methods.contains(method)
    }

    async fn call(&self, method: &str, args: Vec<Value>) -> Result<Value, SdkError> {
        let rendered = Value::Array(args.clone());
        info!(%method, args = %rendered, "formbricks sdk call (stub)");
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedCall {
                method: method.to_string(),
                args,
            });
        if let Some(message) = self.rejections.get(method) {
            return Err(SdkError::Rejected {
                method: method.to_string(),
                message: message.clone(),
            });
        }
        Ok(Value::Null)
    }
}
