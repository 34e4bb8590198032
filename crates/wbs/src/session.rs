//! Session lifecycle shared by the full and batch clients.
//!
//! A [`Session`] starts [`SessionState::Uninitialized`] and moves to
//! [`SessionState::Initialized`] after one successful authentication call.
//! Every resource request matches on the state before touching the network.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Response};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::config::{normalize_base_url, SessionConfig, Variant};
use crate::keystore::{ensure_keys_present, normalize_key_list};
use crate::{Error, Result};

const ENVIRONMENT_HEADER: &str = "environment";

#[derive(Debug, Clone)]
pub enum SessionState {
    Uninitialized,
    Initialized {
        /// API root with surrounding slashes and whitespace removed.
        base_url: String,
        headers: HeaderMap,
    },
}

/// Which error a failing HTTP status turns into.
#[derive(Debug, Clone, Copy)]
enum Stage {
    Authentication,
    Request,
}

pub struct Session {
    variant: Variant,
    config: SessionConfig,
    http: Client,
    state: SessionState,
    init_attempted: bool,
}

impl Session {
    pub fn new(variant: Variant, config: SessionConfig) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| Error::InvalidConfiguration(format!("HTTP client: {}", e)))?;

        Ok(Self {
            variant,
            config,
            http,
            state: SessionState::Uninitialized,
            init_attempted: false,
        })
    }

    pub fn variant(&self) -> Variant {
        self.variant
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_initialized(&self) -> bool {
        matches!(self.state, SessionState::Initialized { .. })
    }

    /// Authenticates with the access code and stores the bearer token.
    ///
    /// Returns the HTTP status of the authentication call. Only one attempt is
    /// allowed per session; later calls fail with [`Error::AlreadyInitialized`].
    pub async fn init(&mut self) -> Result<u16> {
        self.config.validate(self.variant)?;

        if self.init_attempted || self.is_initialized() {
            return Err(Error::AlreadyInitialized);
        }

        let base_url = normalize_base_url(self.config.base_url.as_deref().unwrap_or_default());
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            HeaderName::from_static(ENVIRONMENT_HEADER),
            header_value(self.config.environment.as_deref().unwrap_or_default())?,
        );

        let url = format!("{}/v1/auth/apicode", base_url);
        let body = json!({ "apiCode": self.config.access_code.as_deref().unwrap_or_default() });
        info!("Authenticating against {} (variant: {:?})", base_url, self.variant);

        self.init_attempted = true;
        let response = self
            .http
            .post(&url)
            .headers(headers.clone())
            .json(&body)
            .send()
            .await?;
        let (status, body) = read_json(check_status(response, Stage::Authentication).await?).await?;

        let token = body
            .get("token")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::MalformedResponse("missing field `token`".to_string()))?;
        let mut bearer = header_value(&format!("Bearer {}", token))?;
        bearer.set_sensitive(true);
        headers.insert(AUTHORIZATION, bearer);

        self.state = SessionState::Initialized { base_url, headers };
        info!("Session initialized");
        Ok(status)
    }

    /// GET an API path and return the status and the parsed JSON body.
    pub(crate) async fn get_json(&self, path: &str) -> Result<(u16, Value)> {
        let (base_url, headers) = self.authorized()?;
        debug!("GET {}", path);

        let response = self
            .http
            .get(format!("{}{}", base_url, path))
            .headers(headers.clone())
            .send()
            .await?;
        read_json(check_status(response, Stage::Request).await?).await
    }

    /// POST a JSON body to an API path and return the status. The response
    /// body on success is ignored.
    pub(crate) async fn post_json(&self, path: &str, body: &Value) -> Result<u16> {
        let (base_url, headers) = self.authorized()?;
        debug!("POST {}", path);

        let response = self
            .http
            .post(format!("{}{}", base_url, path))
            .headers(headers.clone())
            .json(body)
            .send()
            .await?;
        let response = check_status(response, Stage::Request).await?;
        Ok(response.status().as_u16())
    }

    /// Fetches keystore entries for a comma separated key list.
    ///
    /// The call only succeeds when every requested key is in the answer.
    pub async fn keystore(&self, key_list: &str) -> Result<(u16, Value)> {
        let keys = normalize_key_list(key_list);
        let (status, answer) = self.get_json(&format!("/v1/keystore/{}", keys)).await?;
        ensure_keys_present(&keys, &answer)?;
        Ok((status, answer))
    }

    fn authorized(&self) -> Result<(&str, &HeaderMap)> {
        match &self.state {
            SessionState::Initialized { base_url, headers } => Ok((base_url.as_str(), headers)),
            SessionState::Uninitialized => Err(Error::NotInitialized),
        }
    }
}

/// Removes `field` from a JSON object body.
pub(crate) fn take_field(body: Value, field: &str) -> Result<Value> {
    match body {
        Value::Object(mut fields) => fields
            .remove(field)
            .ok_or_else(|| Error::MalformedResponse(format!("missing field `{}`", field))),
        _ => Err(Error::MalformedResponse(format!(
            "expected a JSON object with field `{}`",
            field
        ))),
    }
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|_| Error::InvalidConfiguration("header value contains illegal characters".to_string()))
}

/// Turns statuses >= 400 into errors, attaching the JSON error body when the
/// service sent one.
async fn check_status(response: Response, stage: Stage) -> Result<Response> {
    let status = response.status().as_u16();
    if status < 400 {
        return Ok(response);
    }

    let bytes = response.bytes().await?;
    let body = match serde_json::from_slice::<Value>(&bytes) {
        Ok(body) => body,
        Err(_) => {
            warn!("Request failed with status {} and a non-JSON body", status);
            return Err(Error::ResponseUnparseable { status });
        }
    };

    warn!("Request failed with status {}", status);
    Err(match stage {
        Stage::Authentication => Error::AuthenticationFailed { status, body },
        Stage::Request => Error::RequestFailed { status, body },
    })
}

async fn read_json(response: Response) -> Result<(u16, Value)> {
    let status = response.status().as_u16();
    let bytes = response.bytes().await?;
    let body = serde_json::from_slice(&bytes)
        .map_err(|e| Error::MalformedResponse(format!("invalid JSON body: {}", e)))?;
    Ok((status, body))
}
