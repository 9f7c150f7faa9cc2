use std::time::Duration;

use thiserror::Error;
use url::Url;

/// The API URL uses a scheme that cannot anchor a derived WebSocket URL.
#[derive(Debug, Error)]
#[error("cannot derive a websocket url from {0}")]
pub struct ConfigError(pub Url);

/// Connection settings shared by the REST client and the update listener.
///
/// `new` derives the WebSocket endpoint from the HTTP one by swapping the
/// scheme, which matches how the service hosts both on the same port. Use
/// `with_ws_url` when the push endpoint lives elsewhere.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL for the REST endpoints, e.g. `http://127.0.0.1:8000`.
    pub api_url: Url,
    /// Base URL for the push endpoint, e.g. `ws://127.0.0.1:8000`.
    pub ws_url: Url,
    /// Per-request timeout for REST calls.
    pub request_timeout: Duration,
    /// Timeout for completing the WebSocket handshake.
    pub handshake_timeout: Duration,
    /// Pause before redialing a dropped update subscription.
    pub reconnect_delay: Duration,
}

impl ClientConfig {
    pub fn new(api_url: Url) -> Result<Self, ConfigError> {
        let mut ws_url = api_url.clone();
        let scheme = match api_url.scheme() {
            "https" => "wss",
            _ => "ws",
        };
        ws_url
            .set_scheme(scheme)
            .map_err(|()| ConfigError(api_url.clone()))?;
        Ok(Self {
            api_url,
            ws_url,
            request_timeout: Duration::from_secs(10),
            handshake_timeout: Duration::from_secs(10),
            reconnect_delay: Duration::from_secs(5),
        })
    }

    pub fn with_ws_url(mut self, ws_url: Url) -> Self {
        self.ws_url = ws_url;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }
}
