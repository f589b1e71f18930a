//! Startup reachability check against the hosted backend
use reqwest::Client as HttpClient;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::config::{AuthProviderKind, Config};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Connectivity {
    /// The backend answered with a status below 500
    Reachable { status: u16 },
    /// Network is up but the backend answered with a server error
    ServerError { status: u16 },
    NetworkError(String),
    TimedOut,
}

impl Connectivity {
    pub fn from_status(status: u16) -> Self {
        if (200..500).contains(&status) {
            Connectivity::Reachable { status }
        } else {
            Connectivity::ServerError { status }
        }
    }

    pub fn is_reachable(&self) -> bool {
        matches!(self, Connectivity::Reachable { .. })
    }

    /// Operator-facing explanation
    pub fn message(&self) -> String {
        match self {
            Connectivity::Reachable { status } => {
                format!("Backend reachable (status {})", status)
            }
            Connectivity::ServerError { status } => {
                format!("Backend answered with server error (status {})", status)
            }
            Connectivity::NetworkError(detail) => format!(
                "Cannot connect to the backend. Check the network connection, VPN and firewall settings ({})",
                detail
            ),
            Connectivity::TimedOut => "Connection timed out. The backend is taking too long to respond"
                .to_string(),
        }
    }
}

/// Issues a HEAD request to the backend REST root, raced against `timeout`
pub async fn probe(
    http_client: &HttpClient,
    backend_url: &str,
    api_key: &str,
    timeout: Duration,
) -> Connectivity {
    let url = format!("{}/rest/v1/", backend_url.trim_end_matches('/'));
    let request = http_client.head(&url).header("apikey", api_key).send();

    match tokio::time::timeout(timeout, request).await {
        Err(_) => Connectivity::TimedOut,
        Ok(Err(e)) if e.is_timeout() => Connectivity::TimedOut,
        Ok(Err(e)) => Connectivity::NetworkError(e.to_string()),
        Ok(Ok(response)) => Connectivity::from_status(response.status().as_u16()),
    }
}

/// Spawns the probe when the hosted backend is configured
///
/// The result is only logged; it never gates requests. The caller aborts the
/// handle on shutdown.
pub fn spawn_probe(config: &Config) -> Option<JoinHandle<()>> {
    if config.auth_provider != AuthProviderKind::Hosted {
        return None;
    }

    let backend_url = config.backend_url.clone()?;
    let api_key = config.backend_api_key.clone()?;
    let timeout = Duration::from_secs(config.connectivity_timeout_secs);

    Some(tokio::spawn(async move {
        let result = probe(&HttpClient::new(), &backend_url, &api_key, timeout).await;

        if result.is_reachable() {
            tracing::info!(backend_url = %backend_url, "{}", result.message());
        } else {
            tracing::warn!(backend_url = %backend_url, "{}", result.message());
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert!(Connectivity::from_status(200).is_reachable());
        assert!(Connectivity::from_status(401).is_reachable());
        assert!(Connectivity::from_status(404).is_reachable());
        assert!(!Connectivity::from_status(500).is_reachable());
        assert!(!Connectivity::from_status(503).is_reachable());
        assert!(!Connectivity::from_status(101).is_reachable());
    }

    #[test]
    fn test_timeout_message() {
        assert!(Connectivity::TimedOut.message().contains("timed out"));
    }

    #[test]
    fn test_mock_auth_skips_probe() {
        assert!(spawn_probe(&Config::default()).is_none());
    }

    #[tokio::test]
    async fn test_invalid_url_is_network_error() {
        let result = probe(
            &HttpClient::new(),
            "not a url",
            "anon-key",
            Duration::from_secs(1),
        )
        .await;
        assert!(matches!(result, Connectivity::NetworkError(_)));
    }
}
