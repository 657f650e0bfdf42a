use std::time::Duration;

use crate::error::EngineError;
use crate::protocol::{GameTime, SessionId, StateSnapshot};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Read-mostly REST collaborator: bootstraps initial state before the
/// socket is up, backstops it while the socket is down, and carries
/// the retrieve calls of the leave-location flow.
#[derive(Debug, Clone)]
pub struct StatusApi {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl StatusApi {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            token: token.into(),
        }
    }

    pub async fn status(&self) -> Result<StateSnapshot, EngineError> {
        let snapshot = self
            .http
            .get(self.url("/fishing/status/"))
            .timeout(REQUEST_TIMEOUT)
            .bearer_auth(&self.token)
            .send()
            .await?
            .error_for_status()?
            .json::<StateSnapshot>()
            .await?;
        Ok(snapshot)
    }

    pub async fn game_time(&self) -> Result<GameTime, EngineError> {
        let time = self
            .http
            .get(self.url("/fishing/time/"))
            .timeout(REQUEST_TIMEOUT)
            .bearer_auth(&self.token)
            .send()
            .await?
            .error_for_status()?
            .json::<GameTime>()
            .await?;
        Ok(time)
    }

    /// Pull a rod out over REST. The leave flow uses this rather than
    /// the socket, which may already be torn down.
    pub async fn retrieve_rod(&self, session_id: SessionId) -> Result<(), EngineError> {
        self.http
            .post(self.url("/fishing/retrieve/"))
            .timeout(REQUEST_TIMEOUT)
            .bearer_auth(&self.token)
            .json(&serde_json::json!({ "session_id": session_id }))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joins_without_double_slash() {
        let api = StatusApi::new("http://localhost:8000/", "t");
        assert_eq!(
            api.url("/fishing/status/"),
            "http://localhost:8000/fishing/status/"
        );
        let api = StatusApi::new("http://localhost:8000", "t");
        assert_eq!(api.url("/fishing/time/"), "http://localhost:8000/fishing/time/");
    }
}
