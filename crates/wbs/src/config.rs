use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const ENV_VAR: &str = "ENV";
pub const ACTION_ID_VAR: &str = "ACTIONID";
pub const ACCESS_CODE_VAR: &str = "CA_ACCESS_CODE";
pub const BASE_URL_VAR: &str = "CA_WBS_URL";
pub const STEP_NAME_VAR: &str = "STEPNAME";
pub const TIMEOUT_VAR: &str = "CA_WBS_TIMEOUT";

/// Which operation set a session exposes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Variant {
    /// Event and step payloads plus keystore; needs action and step identity.
    #[default]
    Full,
    /// Keystore only.
    Batch,
}

impl Variant {
    pub fn required_vars(&self) -> &'static [&'static str] {
        match self {
            Variant::Full => &[
                ENV_VAR,
                ACTION_ID_VAR,
                ACCESS_CODE_VAR,
                BASE_URL_VAR,
                STEP_NAME_VAR,
            ],
            Variant::Batch => &[ENV_VAR, ACCESS_CODE_VAR, BASE_URL_VAR],
        }
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    pub environment: Option<String>,
    pub action_id: Option<String>,
    pub access_code: Option<String>,
    pub base_url: Option<String>,
    pub step_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

// The access code never reaches the logs.
impl std::fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionConfig")
            .field("environment", &self.environment)
            .field("action_id", &self.action_id)
            .field("access_code", &self.access_code.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("step_name", &self.step_name)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl SessionConfig {
    pub fn load() -> crate::Result<Self> {
        // Load environment variables from .env file if it exists
        let _ = dotenvy::dotenv();

        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds a config from any name -> value source.
    pub fn from_lookup<F>(lookup: F) -> crate::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let timeout_secs = match lookup(TIMEOUT_VAR).filter(|v| !v.trim().is_empty()) {
            Some(raw) => Some(raw.trim().parse::<u64>().map_err(|_| {
                crate::Error::InvalidConfiguration(format!(
                    "{} must be a whole number of seconds, got {:?}",
                    TIMEOUT_VAR, raw
                ))
            })?),
            None => None,
        };

        Ok(SessionConfig {
            environment: lookup(ENV_VAR),
            action_id: lookup(ACTION_ID_VAR),
            access_code: lookup(ACCESS_CODE_VAR),
            base_url: lookup(BASE_URL_VAR),
            step_name: lookup(STEP_NAME_VAR),
            timeout_secs,
        })
    }

    /// Checks every value the variant needs is present and non-empty.
    pub fn validate(&self, variant: Variant) -> crate::Result<()> {
        let complete = variant.required_vars().iter().all(|name| {
            self.value_of(name)
                .map(|v| !v.is_empty())
                .unwrap_or(false)
        });

        if complete {
            Ok(())
        } else {
            Err(crate::Error::ConfigurationMissing(
                variant.required_vars().join(", "),
            ))
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    fn value_of(&self, name: &str) -> Option<&str> {
        match name {
            ENV_VAR => self.environment.as_deref(),
            ACTION_ID_VAR => self.action_id.as_deref(),
            ACCESS_CODE_VAR => self.access_code.as_deref(),
            BASE_URL_VAR => self.base_url.as_deref(),
            STEP_NAME_VAR => self.step_name.as_deref(),
            _ => None,
        }
    }
}

/// Strips surrounding slashes and whitespace from the API root.
pub fn normalize_base_url(raw: &str) -> String {
    raw.trim_matches(|c: char| c == '/' || c.is_whitespace())
        .to_string()
}
