use crate::handle::{SdkError, SdkHandle, SdkMethod, invoke_handle};
use crate::loader::{FormbricksLoader, Phase};
use crate::queue::PendingCall;
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, warn};

pub enum RouteDecision {
    Direct(Arc<dyn SdkHandle>, Vec<Value>),
    Bootstrap(Vec<Value>),
    Queued,
}

impl FormbricksLoader {
    /// Entry point for every call made through the proxy.
    ///
    /// Once ready, calls go straight to the SDK and its result or error is
    /// returned unchanged. Before that, `setup` starts the bootstrap and any
    /// other call is queued; both resolve to `Value::Null`.
    pub async fn route(&self, method: &str, args: Vec<Value>) -> Result<Value, SdkError> {
        match self.decide(method, args) {
            RouteDecision::Direct(handle, args) => {
                let result = invoke_handle(handle.as_ref(), method, args).await;
                if let Err(SdkError::MissingMethod(_)) = &result {
                    error!(%method, "Method {method} does not exist on formbricks");
                }
                result
            }
            RouteDecision::Bootstrap(args) => {
                self.bootstrap(args).await;
                Ok(Value::Null)
            }
            RouteDecision::Queued => Ok(Value::Null),
        }
    }

    /// Queues the call under the state lock when it cannot run yet.
    fn decide(&self, method: &str, args: Vec<Value>) -> RouteDecision {
        let mut state = self.inner.state();
        if let Phase::Ready(handle) = &state.phase {
            return RouteDecision::Direct(handle.clone(), args);
        }
        if method == SdkMethod::Setup.as_str() {
            return RouteDecision::Bootstrap(args);
        }
        let call = PendingCall::new(method, args);
        warn!(
            %method,
            call_id = %call.id,
            pending = state.queue.len() + 1,
            "Formbricks not initialized; call queued for later execution"
        );
        state.queue.push(call);
        RouteDecision::Queued
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::StaticAssetLoader;
    use crate::config::LoaderConfig;
    use crate::handle::{SdkSlot, StubSdk};
    use crate::loader::Lifecycle;
    use serde_json::json;
    use tracing_test::traced_test;

    fn loader_with(sdk: Arc<StubSdk>) -> FormbricksLoader {
        let slot = SdkSlot::new();
        let assets = Arc::new(StaticAssetLoader::new(sdk, slot.clone()));
        FormbricksLoader::new(LoaderConfig::default(), assets, slot)
    }

    fn setup_args() -> Vec<Value> {
        vec![json!({"appUrl": "https://a", "environmentId": "e"})]
    }

    #[tokio::test]
    #[traced_test]
    async fn calls_before_setup_are_queued() {
        let sdk = Arc::new(StubSdk::new());
        let loader = loader_with(sdk.clone());
        let result = loader.route("track", vec![json!("x")]).await;
        assert_eq!(result, Ok(Value::Null));
        assert_eq!(loader.pending(), 1);
        assert_eq!(loader.lifecycle(), Lifecycle::Uninitialized);
        assert!(sdk.calls().is_empty());
        assert!(logs_contain("queued for later execution"));
    }

    #[tokio::test]
    async fn setup_replays_queue_in_order() {
        let sdk = Arc::new(StubSdk::new());
        let loader = loader_with(sdk.clone());
        loader.route("track", vec![json!("x")]).await.unwrap();
        loader.route("setUserId", vec![json!("u1")]).await.unwrap();
        loader.route("setup", setup_args()).await.unwrap();

        assert_eq!(loader.lifecycle(), Lifecycle::Ready);
        assert_eq!(loader.pending(), 0);
        let methods: Vec<_> = sdk.calls().into_iter().map(|c| c.method).collect();
        assert_eq!(methods, vec!["setup", "track", "setUserId"]);
    }

    #[tokio::test]
    async fn ready_calls_forward_arguments_and_results() {
        let sdk = Arc::new(StubSdk::new().rejecting("logout", "no session"));
        let loader = loader_with(sdk.clone());
        loader.route("setup", setup_args()).await.unwrap();

        assert_eq!(
            loader.route("setUserId", vec![json!("u1")]).await,
            Ok(Value::Null)
        );
        assert_eq!(sdk.calls_to("setUserId"), vec![vec![json!("u1")]]);

        let err = loader.route("logout", vec![]).await.unwrap_err();
        assert_eq!(
            err,
            SdkError::Rejected {
                method: "logout".into(),
                message: "no session".into()
            }
        );
    }

    #[tokio::test]
    #[traced_test]
    async fn ready_call_to_missing_method_is_rejected() {
        let loader = loader_with(Arc::new(StubSdk::new()));
        loader.route("setup", setup_args()).await.unwrap();
        let err = loader.route("doesNotExist", vec![]).await.unwrap_err();
        assert_eq!(err, SdkError::MissingMethod("doesNotExist".into()));
        assert!(logs_contain("Method doesNotExist does not exist on formbricks"));
    }

    #[tokio::test]
    async fn invalid_setup_resolves_without_error() {
        let sdk = Arc::new(StubSdk::new());
        let loader = loader_with(sdk.clone());
        let result = loader
            .route("setup", vec![json!({"appUrl": "", "environmentId": "env1"})])
            .await;
        assert_eq!(result, Ok(Value::Null));
        assert_eq!(loader.lifecycle(), Lifecycle::Uninitialized);
        assert!(sdk.calls().is_empty());
    }

    #[tokio::test]
    async fn setup_after_ready_goes_to_sdk() {
        let sdk = Arc::new(StubSdk::new());
        let loader = loader_with(sdk.clone());
        loader.route("setup", setup_args()).await.unwrap();
        loader.route("setup", setup_args()).await.unwrap();
        assert_eq!(sdk.calls_to("setup").len(), 2);
    }
}
