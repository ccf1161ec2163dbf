use crate::capture::{FailureSink, NullSink, ScreenshotSink};
use crate::config::{Config, DispatchMode};
use crate::dispatch::{ActionExecutor, Dispatcher, LocalExecutor, RemoteExecutor};
use crate::engine::Engine;
use crate::locator::LocatorRegistry;
use crate::remote::RemoteClient;
use crate::session::SessionStore;
use crate::Result;
use std::sync::Arc;

/// The process-wide context object: one engine, one session store, one
/// registry, one dispatcher, wired from a validated config and passed by
/// reference instead of living in globals.
pub struct Harness {
    config: Arc<Config>,
    registry: Arc<LocatorRegistry>,
    engine: Arc<Engine>,
    sessions: Arc<SessionStore>,
    dispatcher: Dispatcher,
}

impl Harness {
    pub fn new(config: Config) -> Result<Self> {
        let registry = match config.locators.path {
            Some(ref path) => LocatorRegistry::load(path)?,
            None => LocatorRegistry::empty(),
        };
        Self::with_registry(config, registry)
    }

    /// Builds the harness around an already-loaded registry. The dispatch
    /// mode is read here, once; it cannot change for the life of the harness.
    pub fn with_registry(config: Config, registry: LocatorRegistry) -> Result<Self> {
        config.validate()?;

        let config = Arc::new(config);
        let registry = Arc::new(registry);
        let engine = Arc::new(Engine::new(config.engine.clone()));
        let sessions = Arc::new(SessionStore::new(engine.clone()));

        let (executor, sink): (Box<dyn ActionExecutor>, Arc<dyn FailureSink>) =
            match config.dispatch.mode {
                DispatchMode::Local => {
                    let executor =
                        LocalExecutor::new(sessions.clone(), config.capture.dir.clone());
                    let sink: Arc<dyn FailureSink> = if config.capture.on_failure {
                        Arc::new(ScreenshotSink::new(
                            sessions.clone(),
                            config.capture.dir.clone(),
                        ))
                    } else {
                        Arc::new(NullSink)
                    };
                    (Box::new(executor), sink)
                }
                DispatchMode::Remote => {
                    // The endpoint owns sessions and diagnostics in remote mode.
                    let client = RemoteClient::new(&config.remote)?;
                    (Box::new(RemoteExecutor::new(client)), Arc::new(NullSink))
                }
            };

        let dispatcher = Dispatcher::new(
            config.dispatch.mode,
            executor,
            registry.clone(),
            sink,
            config.dispatch.action_timeout_ms,
        );

        tracing::info!(mode = %config.dispatch.mode, "harness constructed");

        Ok(Self {
            config,
            registry,
            engine,
            sessions,
            dispatcher,
        })
    }

    /// Starts the engine. A no-op in remote mode, where no local browser is
    /// needed, and on repeat calls (first-call-wins).
    pub async fn start(&self) -> Result<()> {
        if self.config.dispatch.mode == DispatchMode::Local {
            self.engine.start().await?;
        }
        Ok(())
    }

    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    pub fn registry(&self) -> &Arc<LocatorRegistry> {
        &self.registry
    }

    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Ordered teardown: every session is force-invalidated before the
    /// engine stops, so a late caller sees `SessionNotFound` rather than a
    /// dangling handle.
    pub async fn shutdown(&self) {
        self.sessions.close_all().await;
        self.engine.stop().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RigError;
    use crate::session::WorkerId;

    fn local_config() -> Config {
        Config::default()
    }

    #[tokio::test]
    async fn test_open_before_start_fails() {
        let harness =
            Harness::with_registry(local_config(), LocatorRegistry::empty()).unwrap();
        let err = harness
            .sessions()
            .open(&WorkerId::from("w1"))
            .await
            .unwrap_err();
        assert!(matches!(err, RigError::EngineNotStarted));
    }

    #[tokio::test]
    async fn test_shutdown_is_idempotent_without_start() {
        let harness =
            Harness::with_registry(local_config(), LocatorRegistry::empty()).unwrap();
        harness.shutdown().await;
        harness.shutdown().await;
        assert!(!harness.engine().is_started().await);
    }

    #[tokio::test]
    async fn test_remote_mode_start_skips_engine() {
        let mut config = Config::default();
        config.dispatch.mode = DispatchMode::Remote;

        let harness = Harness::with_registry(config, LocatorRegistry::empty()).unwrap();
        harness.start().await.unwrap();
        assert!(!harness.engine().is_started().await);
        assert_eq!(harness.dispatcher().mode(), DispatchMode::Remote);
    }

    #[test]
    fn test_invalid_config_rejected_at_construction() {
        let mut config = Config::default();
        config.dispatch.action_timeout_ms = 0;
        assert!(Harness::with_registry(config, LocatorRegistry::empty()).is_err());
    }
}
