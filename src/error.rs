use crate::dispatch::ActionKind;
use crate::session::WorkerId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RigError {
    #[error("failed to start browser engine: {0}")]
    EngineStart(String),

    #[error("browser engine not started")]
    EngineNotStarted,

    #[error("session already open for worker '{0}'")]
    DuplicateSession(WorkerId),

    #[error("no session for worker '{0}'")]
    SessionNotFound(WorkerId),

    #[error("invalid locator source (line {line}): {reason}")]
    RegistryLoad { line: usize, reason: String },

    #[error("unknown locator key: {0}")]
    UnknownLocator(String),

    #[error("{kind} failed on '{key}': {cause}")]
    Action {
        kind: ActionKind,
        key: String,
        #[source]
        cause: Box<RigError>,
    },

    #[error("element not found: {0}")]
    ElementNotFound(String),

    #[error("remote transport error: {0}")]
    RemoteTransport(String),

    #[error("remote protocol error: {0}")]
    RemoteProtocol(String),

    #[error("remote endpoint rejected action: {0}")]
    RemoteRejected(String),

    #[error("{what} timed out after {ms}ms")]
    Timeout { what: String, ms: u64 },

    #[error("screenshot failed: {0}")]
    Screenshot(String),

    #[error("engine operation failed: {0}")]
    Engine(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),
}

impl RigError {
    /// True for timeouts, including a timeout buried inside an `Action` wrap,
    /// so retry policies can separate transient slowness from real failures.
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::Action { cause, .. } => cause.is_timeout(),
            _ => false,
        }
    }

    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::EngineStart(_) => vec![
                "Ensure a Chromium-family browser is installed".into(),
                "Set [engine].browser_path or UIRIG_BROWSER_PATH explicitly".into(),
            ],
            Self::EngineNotStarted => vec![
                "Call Harness::start() before opening sessions".into(),
            ],
            Self::UnknownLocator(key) => vec![
                format!("Check that '{}' exists in the locator file", key),
                "Validate the file with: uirig locators <file>".into(),
            ],
            Self::RemoteTransport(_) => vec![
                "Check that the remote endpoint is reachable".into(),
                "Probe it with: uirig health".into(),
            ],
            Self::Timeout { .. } => vec![
                "Increase [dispatch].action_timeout_ms".into(),
                "Check network connectivity and page load state".into(),
            ],
            Self::Config(_) => vec![
                "Check configuration file syntax".into(),
                "Show the effective config with: uirig config show".into(),
            ],
            _ => vec!["Run with --verbose for more details".into()],
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            Self::EngineStart(_) | Self::EngineNotStarted => 3,
            Self::Timeout { .. } => 4,
            Self::ElementNotFound(_) | Self::UnknownLocator(_) => 5,
            Self::Io(_) | Self::Screenshot(_) => 6,
            Self::Config(_) | Self::TomlDe(_) | Self::TomlSer(_) | Self::RegistryLoad { .. } => 7,
            Self::RemoteTransport(_) | Self::RemoteProtocol(_) | Self::RemoteRejected(_) => 8,
            Self::Action { cause, .. } => cause.exit_code(),
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_timeout_direct() {
        let err = RigError::Timeout {
            what: "click".into(),
            ms: 5000,
        };
        assert!(err.is_timeout());
        assert!(!RigError::EngineNotStarted.is_timeout());
    }

    #[test]
    fn test_is_timeout_through_action_wrap() {
        let err = RigError::Action {
            kind: ActionKind::Click,
            key: "signInBtn".into(),
            cause: Box::new(RigError::Timeout {
                what: "click".into(),
                ms: 5000,
            }),
        };
        assert!(err.is_timeout());

        let err = RigError::Action {
            kind: ActionKind::Click,
            key: "signInBtn".into(),
            cause: Box::new(RigError::ElementNotFound("signInBtn".into())),
        };
        assert!(!err.is_timeout());
    }

    #[test]
    fn test_action_display_carries_kind_key_and_cause() {
        let err = RigError::Action {
            kind: ActionKind::Click,
            key: "signInBtn".into(),
            cause: Box::new(RigError::RemoteRejected("timeout".into())),
        };
        let msg = err.to_string();
        assert!(msg.contains("click"));
        assert!(msg.contains("signInBtn"));
        assert!(msg.contains("timeout"));
    }

    #[test]
    fn test_exit_code_follows_action_cause() {
        let err = RigError::Action {
            kind: ActionKind::Type,
            key: "userField".into(),
            cause: Box::new(RigError::Timeout {
                what: "type".into(),
                ms: 100,
            }),
        };
        assert_eq!(err.exit_code(), 4);
    }
}
