use crate::config::RemoteConfig;
use crate::{Result, RigError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One action forwarded to the remote execution endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WireRequest {
    pub action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locator_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

/// Endpoint reply. `value` carries query results (visibility, text) so the
/// remote path can answer everything the local path can.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireResponse {
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub value: Option<serde_json::Value>,
}

/// HTTP client for the remote action endpoint. Owns nothing but the
/// connection; session state lives on the remote side.
pub struct RemoteClient {
    http: reqwest::Client,
    endpoint: String,
    timeout_ms: u64,
}

impl RemoteClient {
    pub fn new(config: &RemoteConfig) -> Result<Self> {
        url::Url::parse(&config.endpoint).map_err(|e| {
            RigError::Config(format!(
                "invalid remote endpoint '{}': {}",
                config.endpoint, e
            ))
        })?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| RigError::RemoteTransport(e.to_string()))?;

        Ok(Self {
            http,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            timeout_ms: config.timeout_ms,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// POSTs the action and parses the structured reply. Transport failures,
    /// timeouts, and malformed replies map to distinct errors; a well-formed
    /// `{success:false}` is returned to the caller, not raised here.
    pub async fn send(&self, request: &WireRequest) -> Result<WireResponse> {
        tracing::debug!(action = %request.action, "sending remote action");

        let response = self
            .http
            .post(format!("{}/action", self.endpoint))
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RigError::Timeout {
                        what: format!("remote '{}' action", request.action),
                        ms: self.timeout_ms,
                    }
                } else {
                    RigError::RemoteTransport(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(RigError::RemoteProtocol(format!(
                "unexpected status {}",
                status
            )));
        }

        response
            .json::<WireResponse>()
            .await
            .map_err(|e| RigError::RemoteProtocol(format!("malformed response: {}", e)))
    }

    /// Best-effort readiness probe. Never raises.
    pub async fn health_check(&self) -> bool {
        match self.http.get(format!("{}/health", self.endpoint)).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::warn!("remote health check failed: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_request_serializes_camel_case() {
        let request = WireRequest {
            action: "click".into(),
            locator_key: Some("signInBtn".into()),
            value: None,
            timeout: None,
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("\"locatorKey\":\"signInBtn\""));
        assert!(!json.contains("value"));
        assert!(!json.contains("timeout"));
    }

    #[test]
    fn test_wire_response_minimal_shape() {
        // The documented shape has no value field; it must still parse.
        let response: WireResponse =
            serde_json::from_str(r#"{"success":false,"error":"timeout"}"#).unwrap();
        assert!(!response.success);
        assert_eq!(response.error.as_deref(), Some("timeout"));
        assert!(response.value.is_none());
    }

    #[test]
    fn test_wire_response_with_value() {
        let response: WireResponse =
            serde_json::from_str(r#"{"success":true,"value":"Welcome"}"#).unwrap();
        assert!(response.success);
        assert_eq!(response.value.unwrap().as_str(), Some("Welcome"));
    }

    #[test]
    fn test_client_rejects_bad_endpoint() {
        let config = RemoteConfig {
            endpoint: "not a url".into(),
            timeout_ms: 1000,
        };
        assert!(RemoteClient::new(&config).is_err());
    }

    #[test]
    fn test_client_trims_trailing_slash() {
        let config = RemoteConfig {
            endpoint: "http://localhost:8080/".into(),
            timeout_ms: 1000,
        };
        let client = RemoteClient::new(&config).unwrap();
        assert_eq!(client.endpoint(), "http://localhost:8080");
    }
}
