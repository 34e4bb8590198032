//! Full client for steps running inside an action.

use serde_json::{json, Value};
use tracing::info;

use crate::config::{SessionConfig, Variant};
use crate::envelope::Envelope;
use crate::session::{take_field, Session};
use crate::Result;

/// Client for a workflow step: event payload, step payloads and keystore.
pub struct WbsClient {
    session: Session,
}

impl WbsClient {
    pub fn new(config: SessionConfig) -> Result<Self> {
        Ok(Self {
            session: Session::new(Variant::Full, config)?,
        })
    }

    /// Reads configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::new(SessionConfig::load()?)
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn is_initialized(&self) -> bool {
        self.session.is_initialized()
    }

    pub async fn init(&mut self) -> Envelope {
        Envelope::from_result(self.session.init().await.map(Envelope::status))
    }

    /// Payload of the event that triggered the current action.
    pub async fn event_payload(&self) -> Envelope {
        Envelope::from_result(self.try_event_payload().await)
    }

    /// Stores `payload` under the current step.
    pub async fn put_step_payload(&self, payload: Value) -> Envelope {
        Envelope::from_result(self.try_put_step_payload(payload).await)
    }

    /// Payload previously stored by `step_name` in the current action.
    pub async fn step_payload(&self, step_name: &str) -> Envelope {
        Envelope::from_result(self.try_step_payload(step_name).await)
    }

    pub async fn keystore(&self, key_list: &str) -> Envelope {
        Envelope::from_result(
            self.session
                .keystore(key_list)
                .await
                .map(|(status, answer)| Envelope::with_answer(status, answer)),
        )
    }

    async fn try_event_payload(&self) -> Result<Envelope> {
        let path = format!("/v1/rtevent/{}", self.action_id());
        let (status, body) = self.session.get_json(&path).await?;
        Ok(Envelope::with_payload(status, take_field(body, "payload")?))
    }

    async fn try_put_step_payload(&self, payload: Value) -> Result<Envelope> {
        let body = json!({
            "actionId": self.action_id(),
            "stepname": self.step_name(),
            "payload": payload,
        });
        let status = self.session.post_json("/v1/rtstep/payload", &body).await?;
        info!("Stored payload for step {}", self.step_name());
        Ok(Envelope::status(status))
    }

    async fn try_step_payload(&self, step_name: &str) -> Result<Envelope> {
        let path = format!("/v1/rtstep/payload/{}/{}", self.action_id(), step_name);
        let (status, body) = self.session.get_json(&path).await?;
        Ok(Envelope::with_payload(status, take_field(body, "payload")?))
    }

    // Both are validated as non-empty by init, which gates every caller.
    fn action_id(&self) -> &str {
        self.session.config().action_id.as_deref().unwrap_or_default()
    }

    fn step_name(&self) -> &str {
        self.session.config().step_name.as_deref().unwrap_or_default()
    }
}
