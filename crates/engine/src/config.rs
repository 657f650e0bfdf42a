use std::time::Duration;

/// Engine tuning knobs. `ws_url` is the fishing endpoint without the
/// token query parameter; `api_url` is the REST base used for
/// bootstrap and the leave flow.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub ws_url: String,
    pub api_url: String,
    pub token: String,
    pub reconnect_base: Duration,
    pub reconnect_max: Duration,
    pub connect_timeout: Duration,
    pub command_timeout: Duration,
    pub status_poll_interval: Duration,
    pub event_capacity: usize,
}

impl EngineConfig {
    pub fn new(
        ws_url: impl Into<String>,
        api_url: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            ws_url: ws_url.into(),
            api_url: api_url.into(),
            token: token.into(),
            reconnect_base: Duration::from_secs(3),
            reconnect_max: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            command_timeout: Duration::from_secs(10),
            status_poll_interval: Duration::from_secs(15),
            event_capacity: 256,
        }
    }

    pub fn socket_url(&self) -> String {
        let sep = if self.ws_url.contains('?') { '&' } else { '?' };
        format!("{}{}token={}", self.ws_url, sep, self.token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_socket_url_carries_token() {
        let config = EngineConfig::new("ws://localhost/ws/fishing/", "http://localhost", "abc");
        assert_eq!(config.socket_url(), "ws://localhost/ws/fishing/?token=abc");

        let config = EngineConfig::new("ws://localhost/ws?v=2", "http://localhost", "abc");
        assert_eq!(config.socket_url(), "ws://localhost/ws?v=2&token=abc");
    }
}
