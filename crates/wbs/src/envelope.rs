use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Error;

pub const CONFIGURATION_MISSING: u16 = 601;
pub const ALREADY_INITIALIZED: u16 = 602;
pub const NOT_INITIALIZED: u16 = 603;
pub const TRANSPORT_FAILED: u16 = 604;
pub const KEY_NOT_FOUND: u16 = 605;
pub const MALFORMED_RESPONSE: u16 = 606;

/// Uniform result of every client operation.
///
/// `status_code` is always set. `payload` or `answer` appear only on success,
/// `error` only on failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub status_code: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

impl Envelope {
    pub fn status(status_code: u16) -> Self {
        Self {
            status_code,
            payload: None,
            answer: None,
            error: None,
        }
    }

    pub fn with_payload(status_code: u16, payload: Value) -> Self {
        Self {
            payload: Some(payload),
            ..Self::status(status_code)
        }
    }

    pub fn with_answer(status_code: u16, answer: Value) -> Self {
        Self {
            answer: Some(answer),
            ..Self::status(status_code)
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub(crate) fn from_result(result: crate::Result<Envelope>) -> Self {
        result.unwrap_or_else(Envelope::from)
    }
}

impl From<Error> for Envelope {
    fn from(err: Error) -> Self {
        Self {
            error: Some(err.to_value()),
            ..Self::status(err.status_code())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_omits_error_field() {
        let envelope = Envelope::with_payload(200, json!({"x": 1}));
        assert!(envelope.is_success());
        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({"status_code": 200, "payload": {"x": 1}})
        );
    }

    #[test]
    fn test_failure_carries_only_error() {
        let envelope = Envelope::from(Error::NotInitialized);
        assert!(!envelope.is_success());
        assert!(envelope.payload.is_none());
        assert!(envelope.answer.is_none());
        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({"status_code": 603, "error": "Init required"})
        );
    }
}
