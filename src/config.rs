use crate::engine::EngineKind;
use crate::{Result, RigError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where actions execute: against the locally-owned engine or a remote
/// execution endpoint. Read once at dispatcher construction; later config
/// changes never reach a constructed dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DispatchMode {
    #[default]
    Local,
    Remote,
}

impl std::str::FromStr for DispatchMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "remote" => Ok(Self::Remote),
            _ => Err(format!("Invalid dispatch mode: {}", s)),
        }
    }
}

impl std::fmt::Display for DispatchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local => f.write_str("local"),
            Self::Remote => f.write_str("remote"),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub locators: LocatorConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub kind: EngineKind,
    #[serde(default = "default_headless")]
    pub headless: bool,
    pub browser_path: Option<PathBuf>,
    #[serde(default = "default_launch_timeout")]
    pub launch_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DispatchConfig {
    #[serde(default)]
    pub mode: DispatchMode,
    #[serde(default = "default_action_timeout")]
    pub action_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RemoteConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_remote_timeout")]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CaptureConfig {
    #[serde(default = "default_capture_on_failure")]
    pub on_failure: bool,
    #[serde(default = "default_capture_dir")]
    pub dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct LocatorConfig {
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct OutputConfig {
    #[serde(default)]
    pub json_pretty: bool,
}

fn default_headless() -> bool {
    true
}
fn default_launch_timeout() -> u64 {
    crate::timeouts::secs::ENGINE_LAUNCH
}
fn default_action_timeout() -> u64 {
    crate::timeouts::ms::ACTION
}
fn default_endpoint() -> String {
    "http://localhost:8080".to_string()
}
fn default_remote_timeout() -> u64 {
    crate::timeouts::ms::REMOTE_REQUEST
}
fn default_capture_on_failure() -> bool {
    true
}
fn default_capture_dir() -> PathBuf {
    PathBuf::from("artifacts/failures")
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            kind: EngineKind::default(),
            headless: default_headless(),
            browser_path: None,
            launch_timeout_secs: default_launch_timeout(),
        }
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            mode: DispatchMode::default(),
            action_timeout_ms: default_action_timeout(),
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            timeout_ms: default_remote_timeout(),
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            on_failure: default_capture_on_failure(),
            dir: default_capture_dir(),
        }
    }
}

pub fn default_config_path() -> Result<PathBuf> {
    default_config_dir().map(|p| p.join("config.toml"))
}

pub fn default_config_dir() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|p| p.join("uirig"))
        .ok_or_else(|| RigError::Config("Could not determine config directory".into()))
}

impl Config {
    /// Layered load: user config file, then the project-local `.uirig.toml`,
    /// then environment variables.
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        let global_path = default_config_path()?;
        if global_path.exists() {
            let content = std::fs::read_to_string(&global_path)?;
            config = toml::from_str(&content)?;
        }

        let project_path = PathBuf::from(".uirig.toml");
        if project_path.exists() {
            let content = std::fs::read_to_string(&project_path)?;
            let project_config: Config = toml::from_str(&content)?;
            let present: toml::Value = toml::from_str(&content)?;
            config = config.merge(project_config, &present);
        }

        config.load_from_env();

        Ok(config)
    }

    pub fn load_with_overrides(&self, cli: ConfigOverrides) -> Self {
        let mut config = self.clone();

        if let Some(mode) = cli.mode {
            config.dispatch.mode = mode;
        }
        if let Some(endpoint) = cli.endpoint {
            config.remote.endpoint = endpoint;
        }
        if let Some(headless) = cli.headless {
            config.engine.headless = headless;
        }
        if let Some(kind) = cli.engine {
            config.engine.kind = kind;
        }
        if let Some(path) = cli.browser_path {
            config.engine.browser_path = Some(path);
        }
        if let Some(timeout) = cli.timeout_ms {
            config.dispatch.action_timeout_ms = timeout;
        }
        if let Some(path) = cli.locators {
            config.locators.path = Some(path);
        }
        if let Some(json_pretty) = cli.json_pretty {
            config.output.json_pretty = json_pretty;
        }

        config
    }

    /// Section-level overlay: the project file replaces only the sections it
    /// actually contains.
    fn merge(mut self, other: Config, present: &toml::Value) -> Self {
        if present.get("engine").is_some() {
            self.engine = other.engine;
        }
        if present.get("dispatch").is_some() {
            self.dispatch = other.dispatch;
        }
        if present.get("remote").is_some() {
            self.remote = other.remote;
        }
        if present.get("capture").is_some() {
            self.capture = other.capture;
        }
        if present.get("locators").is_some() {
            self.locators = other.locators;
        }
        if present.get("output").is_some() {
            self.output = other.output;
        }
        self
    }

    fn load_from_env(&mut self) {
        if let Ok(mode) = std::env::var("UIRIG_MODE")
            && let Ok(mode) = mode.parse()
        {
            self.dispatch.mode = mode;
        }
        if let Ok(endpoint) = std::env::var("UIRIG_REMOTE_ENDPOINT") {
            self.remote.endpoint = endpoint;
        }
        if let Ok(headless) = std::env::var("UIRIG_HEADLESS") {
            self.engine.headless = headless == "true" || headless == "1";
        }
        if let Ok(kind) = std::env::var("UIRIG_ENGINE")
            && let Ok(kind) = kind.parse()
        {
            self.engine.kind = kind;
        }
        if let Ok(timeout) = std::env::var("UIRIG_TIMEOUT_MS")
            && let Ok(timeout) = timeout.parse()
        {
            self.dispatch.action_timeout_ms = timeout;
        }
        if let Ok(path) = std::env::var("UIRIG_BROWSER_PATH") {
            self.engine.browser_path = Some(PathBuf::from(path));
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.dispatch.action_timeout_ms == 0 {
            return Err(RigError::Config(
                "action_timeout_ms must be greater than 0".into(),
            ));
        }

        if self.remote.timeout_ms == 0 {
            return Err(RigError::Config("remote timeout_ms must be greater than 0".into()));
        }

        if self.engine.launch_timeout_secs == 0 {
            return Err(RigError::Config(
                "launch_timeout_secs must be greater than 0".into(),
            ));
        }

        if self.dispatch.mode == DispatchMode::Remote {
            url::Url::parse(&self.remote.endpoint).map_err(|e| {
                RigError::Config(format!(
                    "invalid remote endpoint '{}': {}",
                    self.remote.endpoint, e
                ))
            })?;
        }

        if let Some(ref path) = self.engine.browser_path
            && !path.exists()
        {
            return Err(RigError::Config(format!(
                "Browser path does not exist: {}",
                path.display()
            )));
        }

        if let Some(ref path) = self.locators.path
            && !path.exists()
        {
            return Err(RigError::Config(format!(
                "Locator file does not exist: {}",
                path.display()
            )));
        }

        Ok(())
    }

    pub fn summary(&self) -> String {
        format!(
            r#"Engine:
  Kind: {}
  Headless: {}
  Browser Path: {}
  Launch Timeout: {}s

Dispatch:
  Mode: {}
  Action Timeout: {}ms

Remote:
  Endpoint: {}
  Timeout: {}ms

Capture:
  On Failure: {}
  Directory: {}

Locators:
  File: {}
"#,
            self.engine.kind,
            self.engine.headless,
            self.engine
                .browser_path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "auto-detect".into()),
            self.engine.launch_timeout_secs,
            self.dispatch.mode,
            self.dispatch.action_timeout_ms,
            self.remote.endpoint,
            self.remote.timeout_ms,
            self.capture.on_failure,
            self.capture.dir.display(),
            self.locators
                .path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "none".into()),
        )
    }
}

#[derive(Debug, Default)]
pub struct ConfigOverrides {
    pub mode: Option<DispatchMode>,
    pub endpoint: Option<String>,
    pub headless: Option<bool>,
    pub engine: Option<EngineKind>,
    pub browser_path: Option<PathBuf>,
    pub timeout_ms: Option<u64>,
    pub locators: Option<PathBuf>,
    pub json_pretty: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.dispatch.mode, DispatchMode::Local);
        assert!(config.engine.headless);
        assert_eq!(config.dispatch.action_timeout_ms, 10_000);
        assert_eq!(config.remote.endpoint, "http://localhost:8080");
        assert!(config.capture.on_failure);
    }

    #[test]
    fn test_config_validate_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_config_validate_zero_timeout() {
        let mut config = Config::default();
        config.dispatch.action_timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validate_bad_endpoint_in_remote_mode() {
        let mut config = Config::default();
        config.remote.endpoint = "not a url".into();
        // Local mode does not touch the endpoint.
        assert!(config.validate().is_ok());

        config.dispatch.mode = DispatchMode::Remote;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_load_with_overrides() {
        let config = Config::default();
        let overrides = ConfigOverrides {
            mode: Some(DispatchMode::Remote),
            endpoint: Some("http://remote:9000".into()),
            headless: Some(false),
            timeout_ms: Some(2_000),
            ..Default::default()
        };

        let result = config.load_with_overrides(overrides);
        assert_eq!(result.dispatch.mode, DispatchMode::Remote);
        assert_eq!(result.remote.endpoint, "http://remote:9000");
        assert!(!result.engine.headless);
        assert_eq!(result.dispatch.action_timeout_ms, 2_000);
    }

    #[test]
    fn test_dispatch_mode_parse() {
        assert_eq!("local".parse::<DispatchMode>().unwrap(), DispatchMode::Local);
        assert_eq!("REMOTE".parse::<DispatchMode>().unwrap(), DispatchMode::Remote);
        assert!("hybrid".parse::<DispatchMode>().is_err());
    }

    #[test]
    fn test_merge_replaces_only_present_sections() {
        let mut base = Config::default();
        base.dispatch.action_timeout_ms = 20_000;
        base.remote.endpoint = "http://remote:9000".into();

        let project_toml = "[dispatch]\nmode = \"remote\"\n";
        let project: Config = toml::from_str(project_toml).unwrap();
        let present: toml::Value = toml::from_str(project_toml).unwrap();

        let merged = base.merge(project, &present);
        // The [dispatch] section was replaced wholesale.
        assert_eq!(merged.dispatch.mode, DispatchMode::Remote);
        assert_eq!(merged.dispatch.action_timeout_ms, 10_000);
        // Untouched sections survive.
        assert_eq!(merged.remote.endpoint, "http://remote:9000");
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        assert!(toml_str.contains("[engine]"));
        assert!(toml_str.contains("[dispatch]"));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.dispatch.mode, config.dispatch.mode);
        assert_eq!(parsed.remote.endpoint, config.remote.endpoint);
    }
}
