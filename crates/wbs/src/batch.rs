//! Batch client: authentication and keystore access for jobs that run outside
//! an action.

use crate::config::{SessionConfig, Variant};
use crate::envelope::Envelope;
use crate::session::Session;
use crate::Result;

pub struct BatchClient {
    session: Session,
}

impl BatchClient {
    pub fn new(config: SessionConfig) -> Result<Self> {
        Ok(Self {
            session: Session::new(Variant::Batch, config)?,
        })
    }

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

    /// Credentials for a comma separated key list, e.g. `"db_host,db_user"`.
    pub async fn keystore(&self, key_list: &str) -> Envelope {
        Envelope::from_result(
            self.session
                .keystore(key_list)
                .await
                .map(|(status, answer)| Envelope::with_answer(status, answer)),
        )
    }
}
