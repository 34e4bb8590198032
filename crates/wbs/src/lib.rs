//! CoreAuto WBS client
//!
//! Lets an automation step authenticate against the CoreAuto workflow API,
//! fetch the event payload of the current run, read and write step payloads,
//! and pull secrets from the keystore. Every operation returns an [`Envelope`].

pub mod batch;
pub mod client;
pub mod config;
pub mod envelope;
pub mod keystore;
pub mod session;

use serde_json::Value;
use thiserror::Error;

pub use batch::BatchClient;
pub use client::WbsClient;
pub use config::{SessionConfig, Variant};
pub use envelope::Envelope;
pub use session::{Session, SessionState};

#[derive(Debug, Error)]
pub enum Error {
    #[error("Environment variables {0} should be defined")]
    ConfigurationMissing(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("init already called")]
    AlreadyInitialized,
    #[error("Init required")]
    NotInitialized,
    #[error("authentication failed with status {status}")]
    AuthenticationFailed { status: u16, body: Value },
    #[error("request failed with status {status}")]
    RequestFailed { status: u16, body: Value },
    #[error("inaccessible")]
    ResponseUnparseable { status: u16 },
    #[error("{0} not found")]
    KeyNotFound(String),
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl Error {
    /// Status code carried by the envelope for this failure.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::ConfigurationMissing(_) | Error::InvalidConfiguration(_) => {
                envelope::CONFIGURATION_MISSING
            }
            Error::AlreadyInitialized => envelope::ALREADY_INITIALIZED,
            Error::NotInitialized => envelope::NOT_INITIALIZED,
            Error::Transport(_) => envelope::TRANSPORT_FAILED,
            Error::KeyNotFound(_) => envelope::KEY_NOT_FOUND,
            Error::MalformedResponse(_) => envelope::MALFORMED_RESPONSE,
            Error::AuthenticationFailed { status, .. }
            | Error::RequestFailed { status, .. }
            | Error::ResponseUnparseable { status } => *status,
        }
    }

    /// Value placed in the envelope's `error` field. Remote failures carry the
    /// service's own JSON body; everything else is the display message.
    pub fn to_value(&self) -> Value {
        match self {
            Error::AuthenticationFailed { body, .. } | Error::RequestFailed { body, .. } => {
                body.clone()
            }
            other => Value::String(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_local_failures_use_reserved_codes() {
        assert_eq!(Error::ConfigurationMissing("ENV".into()).status_code(), 601);
        assert_eq!(Error::AlreadyInitialized.status_code(), 602);
        assert_eq!(Error::NotInitialized.status_code(), 603);
        assert_eq!(Error::KeyNotFound("c".into()).status_code(), 605);
        assert_eq!(Error::MalformedResponse("no token".into()).status_code(), 606);
    }

    #[test]
    fn test_remote_failures_keep_http_status() {
        let err = Error::RequestFailed {
            status: 404,
            body: json!({"message": "no such action"}),
        };
        assert_eq!(err.status_code(), 404);
        assert_eq!(err.to_value(), json!({"message": "no such action"}));

        let err = Error::ResponseUnparseable { status: 502 };
        assert_eq!(err.status_code(), 502);
        assert_eq!(err.to_value(), json!("inaccessible"));
    }

    #[test]
    fn test_messages_match_wire_contract() {
        assert_eq!(Error::AlreadyInitialized.to_string(), "init already called");
        assert_eq!(Error::NotInitialized.to_string(), "Init required");
        assert_eq!(Error::KeyNotFound("c".into()).to_string(), "c not found");
    }
}
