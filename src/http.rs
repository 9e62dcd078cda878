//! Blocking HTTP plumbing shared by the statistics and inference clients.
//!
//! Both clients talk through [`Transport`] so they can be driven by a scripted
//! transport in tests; the real one is a `ureq` agent with a global timeout.

use std::time::Duration;

use bevy::log;
use ureq::Agent;

use crate::types::FetchError;

/// Status and raw body of an HTTP exchange. Non-2xx answers are replies too:
/// the inference APIs put their error objects in them.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

impl HttpReply {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        HttpReply {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json(&self) -> Result<serde_json::Value, FetchError> {
        Ok(serde_json::from_str(&self.body)?)
    }
}

pub trait Transport: Send + Sync {
    fn get(&self, url: &str, query: &[(String, String)]) -> Result<HttpReply, FetchError>;

    fn post_json(
        &self,
        url: &str,
        bearer: Option<&str>,
        body: &serde_json::Value,
    ) -> Result<HttpReply, FetchError>;
}

#[derive(Clone)]
pub struct UreqTransport {
    agent: Agent,
}

impl UreqTransport {
    pub fn new(timeout: Duration) -> Self {
        let config = Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build();
        let agent: Agent = config.into();
        UreqTransport { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        UreqTransport::new(Duration::from_secs(30))
    }
}

impl Transport for UreqTransport {
    fn get(&self, url: &str, query: &[(String, String)]) -> Result<HttpReply, FetchError> {
        // The query carries the API key, so only the path is logged.
        log::debug!("GET {url} ({} params)", query.len());
        let mut request = self.agent.get(url);
        for (key, value) in query {
            request = request.query(key, value);
        }
        let mut response = request.call()?;
        let status = response.status().as_u16();
        let body = response.body_mut().read_to_string()?;
        Ok(HttpReply { status, body })
    }

    fn post_json(
        &self,
        url: &str,
        bearer: Option<&str>,
        body: &serde_json::Value,
    ) -> Result<HttpReply, FetchError> {
        log::debug!("POST {url}");
        let mut request = self
            .agent
            .post(url)
            .header("Content-Type", "application/json");
        if let Some(token) = bearer {
            request = request.header("Authorization", format!("Bearer {token}"));
        }
        let mut response = request.send(serde_json::to_string(body)?)?;
        let status = response.status().as_u16();
        let text = response.body_mut().read_to_string()?;
        Ok(HttpReply { status, body: text })
    }
}
