use super::{ActionExecutor, ActionKind, Outcome, PreparedAction};
use crate::remote::{RemoteClient, WireRequest};
use crate::session::WorkerId;
use crate::{Result, RigError};

/// Forwards actions to the remote execution endpoint. Sessions and
/// diagnostics live on the remote side; only the wire exchange happens here.
pub struct RemoteExecutor {
    client: RemoteClient,
}

impl RemoteExecutor {
    pub fn new(client: RemoteClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &RemoteClient {
        &self.client
    }
}

#[async_trait::async_trait]
impl ActionExecutor for RemoteExecutor {
    async fn execute(&self, _worker: &WorkerId, action: &PreparedAction) -> Result<Outcome> {
        let request = WireRequest {
            action: action.request.kind.wire_name().to_string(),
            locator_key: action.request.locator_key.clone(),
            value: action.request.value.clone(),
            timeout: Some(action.timeout_ms),
        };

        let response = self.client.send(&request).await?;

        if !response.success {
            return Err(RigError::RemoteRejected(
                response
                    .error
                    .unwrap_or_else(|| "unspecified failure".to_string()),
            ));
        }

        Ok(match action.request.kind {
            ActionKind::IsDisplayed => Outcome::Displayed(
                response
                    .value
                    .as_ref()
                    .and_then(|v| v.as_bool())
                    .unwrap_or(false),
            ),
            ActionKind::GetText => Outcome::Text(
                response
                    .value
                    .as_ref()
                    .and_then(|v| v.as_str())
                    .map(String::from),
            ),
            ActionKind::Screenshot => Outcome::Artifact(None),
            _ => Outcome::Done,
        })
    }
}
