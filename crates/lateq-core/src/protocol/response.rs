use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Success,
    Error,
}

/// One response line.
///
/// `cargo` is the empty string when there is no payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub result: Outcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default = "empty_cargo")]
    pub cargo: Value,
}

fn empty_cargo() -> Value {
    Value::String(String::new())
}

impl Response {
    /// Success without payload.
    pub fn ok() -> Self {
        Self {
            result: Outcome::Success,
            message: None,
            cargo: empty_cargo(),
        }
    }

    /// Success carrying `cargo`.
    pub fn success(cargo: impl Serialize) -> Self {
        match serde_json::to_value(cargo) {
            Ok(cargo) => Self {
                result: Outcome::Success,
                message: None,
                cargo,
            },
            Err(e) => Self::error(format!("failed to encode response: {e}")),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            result: Outcome::Error,
            message: Some(message.into()),
            cargo: empty_cargo(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.result == Outcome::Success
    }

    /// Serialized form, without the trailing newline.
    pub fn to_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
