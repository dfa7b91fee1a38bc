use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("setup expects a config object as its first argument")]
    NotAnObject,
    #[error("appUrl is required")]
    MissingAppUrl,
    #[error("environmentId is required")]
    MissingEnvironmentId,
}

/// Normalised arguments for the SDK's own `setup`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupArgs {
    pub app_url: String,
    pub environment_id: String,
    /// Any further keys the caller passed; forwarded to the SDK untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
    /// Positional arguments after the config object, passed through in order.
    #[serde(skip)]
    pub trailing: Vec<Value>,
}

impl SetupArgs {
    pub fn new(app_url: impl Into<String>, environment_id: impl Into<String>) -> Self {
        Self {
            app_url: app_url.into(),
            environment_id: environment_id.into(),
            extra: Map::new(),
            trailing: Vec::new(),
        }
    }

    /// Argument list handed to the SDK's `setup`.
    pub fn to_call_args(&self) -> Vec<Value> {
        let mut object = self.extra.clone();
        object.insert("appUrl".into(), Value::String(self.app_url.clone()));
        object.insert(
            "environmentId".into(),
            Value::String(self.environment_id.clone()),
        );
        let mut args = Vec::with_capacity(1 + self.trailing.len());
        args.push(Value::Object(object));
        args.extend(self.trailing.iter().cloned());
        args
    }
}

/// Validates the raw argument list of a `setup` call.
pub fn validate_setup_args(args: &[Value]) -> Result<SetupArgs, ValidationError> {
    let Some(Value::Object(object)) = args.first() else {
        return Err(ValidationError::NotAnObject);
    };

    let app_url = object
        .get("appUrl")
        .and_then(Value::as_str)
        .map(|url| url.trim_end_matches('/'))
        .filter(|url| !url.is_empty())
        .ok_or(ValidationError::MissingAppUrl)?;

    let environment_id = object
        .get("environmentId")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .ok_or(ValidationError::MissingEnvironmentId)?;

    let extra = object
        .iter()
        .filter(|(key, _)| key.as_str() != "appUrl" && key.as_str() != "environmentId")
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    Ok(SetupArgs {
        app_url: app_url.to_string(),
        environment_id: environment_id.to_string(),
        extra,
        trailing: args[1..].to_vec(),
    })
}
