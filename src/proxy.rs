use crate::handle::{SdkError, SdkMethod};
use crate::loader::{FormbricksLoader, Lifecycle};
use crate::setup::SetupArgs;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::BTreeMap;

/// Config accepted by the deprecated `init`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitConfig {
    pub api_host: String,
    pub environment_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackProperties {
    pub hidden_fields: BTreeMap<String, Value>,
}

/// Caller-facing SDK object. Usable before the SDK has loaded: every method
/// forwards to [`FormbricksLoader::route`].
#[derive(Clone, Debug)]
pub struct Formbricks {
    loader: FormbricksLoader,
}

impl Formbricks {
    pub fn new(loader: FormbricksLoader) -> Self {
        Self { loader }
    }

    pub fn loader(&self) -> &FormbricksLoader {
        &self.loader
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.loader.lifecycle()
    }

    pub async fn setup(&self, config: &SetupArgs) -> Result<(), SdkError> {
        self.call(SdkMethod::Setup, config.to_call_args()).await
    }

    #[deprecated(note = "use `setup` instead")]
    pub async fn init(&self, config: &InitConfig) -> Result<(), SdkError> {
        self.call(SdkMethod::Init, vec![to_value(config)]).await
    }

    pub async fn track(
        &self,
        code: &str,
        properties: Option<&TrackProperties>,
    ) -> Result<(), SdkError> {
        let mut args = vec![json!(code)];
        if let Some(properties) = properties {
            args.push(to_value(properties));
        }
        self.call(SdkMethod::Track, args).await
    }

    pub async fn set_email(&self, email: &str) -> Result<(), SdkError> {
        self.call(SdkMethod::SetEmail, vec![json!(email)]).await
    }

    pub async fn set_attribute(&self, key: &str, value: &str) -> Result<(), SdkError> {
        self.call(SdkMethod::SetAttribute, vec![json!(key), json!(value)])
            .await
    }

    pub async fn set_attributes(
        &self,
        attributes: &BTreeMap<String, String>,
    ) -> Result<(), SdkError> {
        self.call(SdkMethod::SetAttributes, vec![json!(attributes)])
            .await
    }

    pub async fn set_language(&self, language: &str) -> Result<(), SdkError> {
        self.call(SdkMethod::SetLanguage, vec![json!(language)]).await
    }

    pub async fn set_user_id(&self, user_id: &str) -> Result<(), SdkError> {
        self.call(SdkMethod::SetUserId, vec![json!(user_id)]).await
    }

    /// `None` clears the nonce.
    pub async fn set_nonce(&self, nonce: Option<&str>) -> Result<(), SdkError> {
        self.call(SdkMethod::SetNonce, vec![json!(nonce)]).await
    }

    pub async fn logout(&self) -> Result<(), SdkError> {
        self.call(SdkMethod::Logout, Vec::new()).await
    }

    pub async fn register_route_change(&self) -> Result<(), SdkError> {
        self.call(SdkMethod::RegisterRouteChange, Vec::new()).await
    }

    /// Untyped path for SDK methods this crate does not know about.
    pub async fn invoke(&self, method: &str, args: Vec<Value>) -> Result<Value, SdkError> {
        self.loader.route(method, args).await
    }

    async fn call(&self, method: SdkMethod, args: Vec<Value>) -> Result<(), SdkError> {
        self.loader.route(method.as_str(), args).await.map(|_| ())
    }
}

fn to_value<T: Serialize>(value: &T) -> Value {
    // Plain structs with string keys always serialise.
    serde_json::to_value(value).unwrap_or(Value::Null)
}
