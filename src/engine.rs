use crate::config::EngineConfig;
use crate::{Result, RigError};
use chromiumoxide::{Browser, BrowserConfig};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// CDP-speaking browser family the engine layer can drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    #[default]
    Chromium,
    Chrome,
    Edge,
}

impl std::str::FromStr for EngineKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "chromium" => Ok(Self::Chromium),
            "chrome" => Ok(Self::Chrome),
            "edge" => Ok(Self::Edge),
            _ => Err(format!("Invalid engine kind: {}", s)),
        }
    }
}

impl std::fmt::Display for EngineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Chromium => f.write_str("chromium"),
            Self::Chrome => f.write_str("chrome"),
            Self::Edge => f.write_str("edge"),
        }
    }
}

/// Shared handle to the one running engine. Cheap to clone; read-only for
/// everyone except the `Engine` that minted it.
#[derive(Clone, Debug)]
pub struct EngineHandle {
    kind: EngineKind,
    headless: bool,
    browser: Arc<Browser>,
}

impl EngineHandle {
    pub fn kind(&self) -> EngineKind {
        self.kind
    }

    pub fn headless(&self) -> bool {
        self.headless
    }

    pub fn browser(&self) -> &Arc<Browser> {
        &self.browser
    }
}

#[derive(Default)]
struct EngineState {
    handle: Option<EngineHandle>,
    event_loop: Option<JoinHandle<()>>,
}

/// Owns the single browser engine instance for the process. `start` and
/// `stop` are mutually exclusive behind one lock; both are idempotent.
pub struct Engine {
    config: EngineConfig,
    state: Mutex<EngineState>,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            state: Mutex::new(EngineState::default()),
        }
    }

    /// First-call-wins: a second `start` logs and returns the existing handle.
    pub async fn start(&self) -> Result<EngineHandle> {
        let mut state = self.state.lock().await;

        if let Some(ref handle) = state.handle {
            tracing::warn!("engine already started, ignoring start request");
            return Ok(handle.clone());
        }

        let executable = match self.config.browser_path {
            Some(ref path) => path.clone(),
            None => crate::utils::find_engine_executable(self.config.kind)?,
        };

        let mut builder = BrowserConfig::builder()
            .chrome_executable(&executable)
            .request_timeout(Duration::from_secs(crate::timeouts::secs::CDP_REQUEST))
            .arg("--no-first-run")
            .arg("--no-default-browser-check");

        if self.config.headless {
            builder = builder.arg("--headless=new");
        }

        let browser_config = builder
            .build()
            .map_err(RigError::EngineStart)?;

        let launch_timeout = Duration::from_secs(self.config.launch_timeout_secs);
        let (browser, mut handler) =
            tokio::time::timeout(launch_timeout, Browser::launch(browser_config))
                .await
                .map_err(|_| {
                    RigError::EngineStart(format!(
                        "launch timed out after {}s",
                        self.config.launch_timeout_secs
                    ))
                })?
                .map_err(|e| RigError::EngineStart(e.to_string()))?;

        let event_loop = tokio::spawn(async move { while handler.next().await.is_some() {} });

        let handle = EngineHandle {
            kind: self.config.kind,
            headless: self.config.headless,
            browser: Arc::new(browser),
        };

        state.handle = Some(handle.clone());
        state.event_loop = Some(event_loop);

        tracing::info!(
            kind = %self.config.kind,
            headless = self.config.headless,
            "browser engine started"
        );

        Ok(handle)
    }

    /// Idempotent teardown. Dropping the browser kills the child process;
    /// the CDP event loop is aborted afterwards.
    pub async fn stop(&self) {
        let mut state = self.state.lock().await;

        if let Some(handle) = state.handle.take() {
            drop(handle);
            if let Some(task) = state.event_loop.take() {
                task.abort();
            }
            tracing::info!("browser engine stopped");
        } else {
            tracing::debug!("engine stop requested but engine not running");
        }
    }

    pub async fn handle(&self) -> Result<EngineHandle> {
        self.state
            .lock()
            .await
            .handle
            .clone()
            .ok_or(RigError::EngineNotStarted)
    }

    pub async fn is_started(&self) -> bool {
        self.state.lock().await.handle.is_some()
    }
}
