use crate::session::{SessionStore, WorkerId};
use crate::{Result, RigError};
use chromiumoxide::cdp::browser_protocol::page::{
    CaptureScreenshotFormat, CaptureScreenshotParams,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

/// Reference to a captured diagnostic artifact.
#[derive(Debug, Clone, Serialize)]
pub struct ArtifactRef {
    pub id: Uuid,
    pub label: String,
    pub path: PathBuf,
    pub created_at: DateTime<Utc>,
}

/// Diagnostic sink invoked when an action fails. Infallible by contract:
/// a sink that cannot capture logs the reason and returns `None`, so it can
/// never mask the failure that triggered it.
#[async_trait::async_trait]
pub trait FailureSink: Send + Sync {
    async fn capture(&self, worker: &WorkerId, label: &str) -> Option<ArtifactRef>;
}

/// Sink used when capture is disabled, and in remote mode where the
/// endpoint owns diagnostics.
pub struct NullSink;

#[async_trait::async_trait]
impl FailureSink for NullSink {
    async fn capture(&self, _worker: &WorkerId, _label: &str) -> Option<ArtifactRef> {
        None
    }
}

/// Captures the failing worker's current page as a PNG under the artifact
/// directory, named `{label}_{timestamp}.png`.
pub struct ScreenshotSink {
    sessions: Arc<SessionStore>,
    dir: PathBuf,
}

impl ScreenshotSink {
    pub fn new(sessions: Arc<SessionStore>, dir: PathBuf) -> Self {
        Self { sessions, dir }
    }

    async fn try_capture(&self, worker: &WorkerId, label: &str) -> Result<ArtifactRef> {
        let session = self.sessions.get(worker).await?;

        let params = CaptureScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .build();

        let bytes = session
            .page()
            .screenshot(params)
            .await
            .map_err(|e| RigError::Screenshot(e.to_string()))?;

        std::fs::create_dir_all(&self.dir)?;

        let created_at = Utc::now();
        let stamp = created_at.format("%Y%m%d_%H%M%S");
        let path = self
            .dir
            .join(format!("{}_{}.png", sanitize_label(label), stamp));
        std::fs::write(&path, &bytes)?;

        Ok(ArtifactRef {
            id: Uuid::new_v4(),
            label: label.to_string(),
            path,
            created_at,
        })
    }
}

#[async_trait::async_trait]
impl FailureSink for ScreenshotSink {
    async fn capture(&self, worker: &WorkerId, label: &str) -> Option<ArtifactRef> {
        match self.try_capture(worker, label).await {
            Ok(artifact) => {
                tracing::info!(label, path = %artifact.path.display(), "failure screenshot saved");
                Some(artifact)
            }
            Err(e) => {
                tracing::warn!(label, "failure capture skipped: {}", e);
                None
            }
        }
    }
}

pub(crate) fn sanitize_label(label: &str) -> String {
    label
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}
