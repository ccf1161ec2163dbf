pub mod local;
pub mod remote;

pub use local::LocalExecutor;
pub use remote::RemoteExecutor;

use crate::capture::FailureSink;
use crate::config::DispatchMode;
use crate::locator::{LocatorEntry, LocatorRegistry};
use crate::session::WorkerId;
use crate::{Result, RigError};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ActionKind {
    Click,
    Type,
    Select,
    WaitVisible,
    IsDisplayed,
    GetText,
    Screenshot,
    Navigate,
}

impl ActionKind {
    /// Name used on the remote action protocol.
    pub fn wire_name(&self) -> &'static str {
        match self {
            Self::Click => "click",
            Self::Type => "type",
            Self::Select => "select",
            Self::WaitVisible => "wait",
            Self::IsDisplayed => "isDisplayed",
            Self::GetText => "getText",
            Self::Screenshot => "screenshot",
            Self::Navigate => "navigate",
        }
    }

    /// Locator-keyed kinds resolve through the registry before executing.
    /// `screenshot` targets a label and `navigate` a URL.
    pub fn requires_locator(&self) -> bool {
        !matches!(self, Self::Screenshot | Self::Navigate)
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// One action invocation as handed to the dispatcher. Ephemeral.
#[derive(Debug, Clone)]
pub struct ActionRequest {
    pub kind: ActionKind,
    pub locator_key: Option<String>,
    pub value: Option<String>,
    pub timeout_ms: Option<u64>,
}

/// Request plus the resolved locator entry and effective timeout, ready for
/// an executor.
#[derive(Debug, Clone)]
pub struct PreparedAction {
    pub request: ActionRequest,
    pub entry: Option<LocatorEntry>,
    pub timeout_ms: u64,
}

impl PreparedAction {
    pub fn entry(&self) -> Result<&LocatorEntry> {
        self.entry
            .as_ref()
            .ok_or_else(|| RigError::Engine("locator entry missing for locator-keyed action".into()))
    }

    pub fn value(&self) -> Result<&str> {
        self.request
            .value
            .as_deref()
            .ok_or_else(|| RigError::Engine("action value missing".into()))
    }
}

/// Kind-specific success payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Done,
    Displayed(bool),
    Text(Option<String>),
    Artifact(Option<PathBuf>),
}

/// The one seam between the dispatcher and an execution path. Exactly two
/// implementations exist; the choice is made once, at construction.
#[async_trait::async_trait]
pub trait ActionExecutor: Send + Sync {
    async fn execute(&self, worker: &WorkerId, action: &PreparedAction) -> Result<Outcome>;
}

/// Routes every UI action through locator resolution, the mode-chosen
/// executor, and failure capture. Callers observe identical error semantics
/// regardless of dispatch mode.
pub struct Dispatcher {
    mode: DispatchMode,
    executor: Box<dyn ActionExecutor>,
    registry: Arc<LocatorRegistry>,
    sink: Arc<dyn FailureSink>,
    default_timeout_ms: u64,
}

impl Dispatcher {
    pub fn new(
        mode: DispatchMode,
        executor: Box<dyn ActionExecutor>,
        registry: Arc<LocatorRegistry>,
        sink: Arc<dyn FailureSink>,
        default_timeout_ms: u64,
    ) -> Self {
        Self {
            mode,
            executor,
            registry,
            sink,
            default_timeout_ms,
        }
    }

    pub fn mode(&self) -> DispatchMode {
        self.mode
    }

    pub async fn click(&self, worker: &WorkerId, key: &str) -> Result<()> {
        self.run(
            worker,
            ActionRequest {
                kind: ActionKind::Click,
                locator_key: Some(key.to_string()),
                value: None,
                timeout_ms: None,
            },
        )
        .await
        .map(drop)
    }

    pub async fn type_text(&self, worker: &WorkerId, key: &str, text: &str) -> Result<()> {
        self.run(
            worker,
            ActionRequest {
                kind: ActionKind::Type,
                locator_key: Some(key.to_string()),
                value: Some(text.to_string()),
                timeout_ms: None,
            },
        )
        .await
        .map(drop)
    }

    pub async fn select(&self, worker: &WorkerId, key: &str, value: &str) -> Result<()> {
        self.run(
            worker,
            ActionRequest {
                kind: ActionKind::Select,
                locator_key: Some(key.to_string()),
                value: Some(value.to_string()),
                timeout_ms: None,
            },
        )
        .await
        .map(drop)
    }

    pub async fn wait_visible(
        &self,
        worker: &WorkerId,
        key: &str,
        timeout_ms: Option<u64>,
    ) -> Result<()> {
        self.run(
            worker,
            ActionRequest {
                kind: ActionKind::WaitVisible,
                locator_key: Some(key.to_string()),
                value: None,
                timeout_ms,
            },
        )
        .await
        .map(drop)
    }

    /// Query operation: `false` when the element legitimately does not exist.
    pub async fn is_displayed(&self, worker: &WorkerId, key: &str) -> Result<bool> {
        let outcome = self
            .run(
                worker,
                ActionRequest {
                    kind: ActionKind::IsDisplayed,
                    locator_key: Some(key.to_string()),
                    value: None,
                    timeout_ms: None,
                },
            )
            .await?;

        match outcome {
            Outcome::Displayed(displayed) => Ok(displayed),
            _ => Ok(false),
        }
    }

    /// Query operation: `None` when the element legitimately does not exist.
    pub async fn get_text(&self, worker: &WorkerId, key: &str) -> Result<Option<String>> {
        let outcome = self
            .run(
                worker,
                ActionRequest {
                    kind: ActionKind::GetText,
                    locator_key: Some(key.to_string()),
                    value: None,
                    timeout_ms: None,
                },
            )
            .await?;

        match outcome {
            Outcome::Text(text) => Ok(text),
            _ => Ok(None),
        }
    }

    /// Returns the artifact path in local mode; the remote endpoint stores
    /// its own artifacts and returns nothing.
    pub async fn screenshot(&self, worker: &WorkerId, label: &str) -> Result<Option<PathBuf>> {
        let outcome = self
            .run(
                worker,
                ActionRequest {
                    kind: ActionKind::Screenshot,
                    locator_key: None,
                    value: Some(label.to_string()),
                    timeout_ms: None,
                },
            )
            .await?;

        match outcome {
            Outcome::Artifact(path) => Ok(path),
            _ => Ok(None),
        }
    }

    pub async fn navigate(&self, worker: &WorkerId, url: &str) -> Result<()> {
        self.run(
            worker,
            ActionRequest {
                kind: ActionKind::Navigate,
                locator_key: None,
                value: Some(url.to_string()),
                timeout_ms: Some(crate::timeouts::secs::NAVIGATION * 1000),
            },
        )
        .await
        .map(drop)
    }

    /// RESOLVE -> EXECUTE -> on failure CAPTURE -> PROPAGATE.
    async fn run(&self, worker: &WorkerId, request: ActionRequest) -> Result<Outcome> {
        let kind = request.kind;
        let target = request
            .locator_key
            .clone()
            .or_else(|| request.value.clone())
            .unwrap_or_default();

        match self.run_inner(worker, request).await {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                let label = format!("{}_failure_{}", kind, target);
                if let Some(artifact) = self.sink.capture(worker, &label).await {
                    tracing::debug!(label = %label, path = %artifact.path.display(), "diagnostic captured");
                }
                Err(wrap_cause(kind, target, err))
            }
        }
    }

    async fn run_inner(&self, worker: &WorkerId, request: ActionRequest) -> Result<Outcome> {
        let entry = if request.kind.requires_locator() {
            let key = request.locator_key.as_deref().unwrap_or("");
            Some(self.registry.resolve(key)?.clone())
        } else {
            None
        };

        let timeout_ms = request.timeout_ms.unwrap_or(self.default_timeout_ms);
        let prepared = PreparedAction {
            request,
            entry,
            timeout_ms,
        };

        tracing::debug!(kind = %prepared.request.kind, mode = %self.mode, "dispatching action");
        self.executor.execute(worker, &prepared).await
    }
}

/// Resolution and session errors are fatal to the current test and pass
/// through untouched; everything else wraps into the uniform `Action` shape.
fn wrap_cause(kind: ActionKind, key: String, err: RigError) -> RigError {
    match err {
        e @ (RigError::UnknownLocator(_)
        | RigError::SessionNotFound(_)
        | RigError::DuplicateSession(_)
        | RigError::EngineNotStarted) => e,
        cause => RigError::Action {
            kind,
            key,
            cause: Box::new(cause),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{ArtifactRef, NullSink};
    use std::sync::Mutex;

    struct StubExecutor {
        outcome: fn() -> Result<Outcome>,
        seen: Arc<Mutex<Vec<PreparedAction>>>,
    }

    impl StubExecutor {
        fn new(outcome: fn() -> Result<Outcome>) -> Self {
            Self {
                outcome,
                seen: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    #[async_trait::async_trait]
    impl ActionExecutor for StubExecutor {
        async fn execute(&self, _worker: &WorkerId, action: &PreparedAction) -> Result<Outcome> {
            self.seen.lock().unwrap().push(action.clone());
            (self.outcome)()
        }
    }

    struct RecordingSink {
        labels: Mutex<Vec<String>>,
    }

    #[async_trait::async_trait]
    impl FailureSink for RecordingSink {
        async fn capture(&self, _worker: &WorkerId, label: &str) -> Option<ArtifactRef> {
            self.labels.lock().unwrap().push(label.to_string());
            None
        }
    }

    fn registry() -> Arc<LocatorRegistry> {
        Arc::new(LocatorRegistry::parse("signInBtn=id:go\nuserField=name:user").unwrap())
    }

    fn dispatcher(outcome: fn() -> Result<Outcome>) -> Dispatcher {
        Dispatcher::new(
            DispatchMode::Local,
            Box::new(StubExecutor::new(outcome)),
            registry(),
            Arc::new(NullSink),
            5_000,
        )
    }

    #[tokio::test]
    async fn test_unknown_locator_passes_through_unwrapped() {
        let d = dispatcher(|| Ok(Outcome::Done));
        let worker = WorkerId::from("w1");

        match d.click(&worker, "missing").await.unwrap_err() {
            RigError::UnknownLocator(key) => assert_eq!(key, "missing"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_engine_and_remote_causes_share_action_shape() {
        let worker = WorkerId::from("w1");

        let local = dispatcher(|| Err(RigError::Engine("element detached".into())));
        let remote = dispatcher(|| Err(RigError::RemoteRejected("timeout".into())));

        let local_err = local.click(&worker, "signInBtn").await.unwrap_err();
        let remote_err = remote.click(&worker, "signInBtn").await.unwrap_err();

        for err in [&local_err, &remote_err] {
            match err {
                RigError::Action { kind, key, .. } => {
                    assert_eq!(*kind, ActionKind::Click);
                    assert_eq!(key, "signInBtn");
                }
                other => panic!("unexpected error: {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_session_error_passes_through_unwrapped() {
        let d = dispatcher(|| Err(RigError::SessionNotFound(WorkerId::from("w1"))));
        let worker = WorkerId::from("w1");

        let err = d.click(&worker, "signInBtn").await.unwrap_err();
        assert!(matches!(err, RigError::SessionNotFound(_)));
    }

    #[tokio::test]
    async fn test_failure_invokes_capture_with_derived_label() {
        let sink = Arc::new(RecordingSink {
            labels: Mutex::new(Vec::new()),
        });
        let d = Dispatcher::new(
            DispatchMode::Local,
            Box::new(StubExecutor::new(|| {
                Err(RigError::ElementNotFound("signInBtn".into()))
            })),
            registry(),
            sink.clone(),
            5_000,
        );

        d.click(&WorkerId::from("w1"), "signInBtn").await.unwrap_err();

        let labels = sink.labels.lock().unwrap();
        assert_eq!(labels.as_slice(), ["click_failure_signInBtn"]);
    }

    #[tokio::test]
    async fn test_success_does_not_capture() {
        let sink = Arc::new(RecordingSink {
            labels: Mutex::new(Vec::new()),
        });
        let d = Dispatcher::new(
            DispatchMode::Local,
            Box::new(StubExecutor::new(|| Ok(Outcome::Done))),
            registry(),
            sink.clone(),
            5_000,
        );

        d.click(&WorkerId::from("w1"), "signInBtn").await.unwrap();
        assert!(sink.labels.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_query_outcome_extraction() {
        let d = dispatcher(|| Ok(Outcome::Displayed(true)));
        assert!(d.is_displayed(&WorkerId::from("w1"), "signInBtn").await.unwrap());

        let d = dispatcher(|| Ok(Outcome::Text(Some("Welcome".into()))));
        assert_eq!(
            d.get_text(&WorkerId::from("w1"), "signInBtn").await.unwrap(),
            Some("Welcome".into())
        );

        let d = dispatcher(|| Ok(Outcome::Text(None)));
        assert_eq!(
            d.get_text(&WorkerId::from("w1"), "signInBtn").await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_default_timeout_applied_and_resolution_attached() {
        let executor = StubExecutor::new(|| Ok(Outcome::Done));
        let seen = executor.seen.clone();
        let d = Dispatcher::new(
            DispatchMode::Local,
            Box::new(executor),
            registry(),
            Arc::new(NullSink),
            7_000,
        );

        d.click(&WorkerId::from("w1"), "signInBtn").await.unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].timeout_ms, 7_000);
        // The dispatcher owns resolution: executors receive the entry.
        let entry = seen[0].entry.as_ref().unwrap();
        assert_eq!(entry.value, "go");
    }

    #[tokio::test]
    async fn test_wire_names() {
        assert_eq!(ActionKind::Click.wire_name(), "click");
        assert_eq!(ActionKind::WaitVisible.wire_name(), "wait");
        assert_eq!(ActionKind::IsDisplayed.wire_name(), "isDisplayed");
        assert_eq!(ActionKind::GetText.wire_name(), "getText");
        assert!(ActionKind::Click.requires_locator());
        assert!(!ActionKind::Navigate.requires_locator());
        assert!(!ActionKind::Screenshot.requires_locator());
    }
}
