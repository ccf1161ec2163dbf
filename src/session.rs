use crate::engine::Engine;
use crate::{Result, RigError};
use chromiumoxide::Page;
use chromiumoxide::cdp::browser_protocol::browser::BrowserContextId;
use chromiumoxide::cdp::browser_protocol::target::{
    CloseTargetParams, CreateBrowserContextParams, CreateTargetParams, DisposeBrowserContextParams,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;

/// Logical identity of a test worker. Passed explicitly through the call
/// chain; never derived from OS thread identity, so the rig works the same
/// under task schedulers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WorkerId(String);

impl WorkerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for WorkerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for WorkerId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for WorkerId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// One worker's isolated browsing state: a dedicated browser context plus
/// its page. Never shared across workers.
#[derive(Debug)]
pub struct Session {
    worker: WorkerId,
    context_id: BrowserContextId,
    page: Arc<Page>,
    opened_at: Instant,
}

impl Session {
    pub fn worker(&self) -> &WorkerId {
        &self.worker
    }

    pub fn context_id(&self) -> &BrowserContextId {
        &self.context_id
    }

    pub fn page(&self) -> &Arc<Page> {
        &self.page
    }

    pub fn opened_at(&self) -> Instant {
        self.opened_at
    }
}

/// Worker-keyed map with the store's access discipline: structural changes
/// are synchronized, one worker's entry is invisible to every other key.
/// Generic so the invariants are testable without a browser.
pub(crate) struct SessionMap<T> {
    inner: RwLock<HashMap<WorkerId, T>>,
}

impl<T: Clone> SessionMap<T> {
    pub(crate) fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }

    pub(crate) async fn insert_new(&self, worker: &WorkerId, value: T) -> Result<()> {
        let mut map = self.inner.write().await;
        if map.contains_key(worker) {
            return Err(RigError::DuplicateSession(worker.clone()));
        }
        map.insert(worker.clone(), value);
        Ok(())
    }

    pub(crate) async fn get(&self, worker: &WorkerId) -> Result<T> {
        self.inner
            .read()
            .await
            .get(worker)
            .cloned()
            .ok_or_else(|| RigError::SessionNotFound(worker.clone()))
    }

    pub(crate) async fn contains(&self, worker: &WorkerId) -> bool {
        self.inner.read().await.contains_key(worker)
    }

    pub(crate) async fn remove(&self, worker: &WorkerId) -> Option<T> {
        self.inner.write().await.remove(worker)
    }

    pub(crate) async fn drain(&self) -> Vec<(WorkerId, T)> {
        self.inner.write().await.drain().collect()
    }

    pub(crate) async fn len(&self) -> usize {
        self.inner.read().await.len()
    }
}

/// Per-worker session lifecycle, backed by the shared engine. At most one
/// live session per worker; lookups never cross worker boundaries.
pub struct SessionStore {
    engine: Arc<Engine>,
    sessions: SessionMap<Arc<Session>>,
}

impl SessionStore {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self {
            engine,
            sessions: SessionMap::new(),
        }
    }

    /// Creates an isolated browser context and page for `worker`. The engine
    /// must already be started; a worker must close before reopening.
    pub async fn open(&self, worker: &WorkerId) -> Result<Arc<Session>> {
        let handle = self.engine.handle().await?;

        if self.sessions.contains(worker).await {
            return Err(RigError::DuplicateSession(worker.clone()));
        }

        let browser = handle.browser();

        let created = browser
            .execute(CreateBrowserContextParams::default())
            .await
            .map_err(|e| RigError::Engine(format!("Failed to create browser context: {}", e)))?;
        let context_id = created.browser_context_id.clone();

        let target_params = CreateTargetParams::builder()
            .url("about:blank")
            .browser_context_id(context_id.clone())
            .build()
            .map_err(|e| RigError::Engine(format!("Failed to build target params: {}", e)))?;

        let page = match browser.new_page(target_params).await {
            Ok(page) => Arc::new(page),
            Err(e) => {
                // Context without a page is useless; dispose before bailing.
                browser
                    .execute(DisposeBrowserContextParams::new(context_id.clone()))
                    .await
                    .ok();
                return Err(RigError::Engine(format!("Failed to create page: {}", e)));
            }
        };

        let session = Arc::new(Session {
            worker: worker.clone(),
            context_id: context_id.clone(),
            page,
            opened_at: Instant::now(),
        });

        if let Err(e) = self.sessions.insert_new(worker, session.clone()).await {
            // Lost a race against a concurrent open for the same worker.
            browser
                .execute(DisposeBrowserContextParams::new(context_id))
                .await
                .ok();
            return Err(e);
        }

        tracing::info!(worker = %worker, "session opened");
        Ok(session)
    }

    pub async fn get(&self, worker: &WorkerId) -> Result<Arc<Session>> {
        self.sessions.get(worker).await
    }

    /// Idempotent. Teardown errors are logged and swallowed; the suite
    /// continues regardless.
    pub async fn close(&self, worker: &WorkerId) {
        match self.sessions.remove(worker).await {
            Some(session) => {
                self.dispose(&session).await;
                tracing::info!(worker = %worker, "session closed");
            }
            None => {
                tracing::debug!(worker = %worker, "close requested without an open session");
            }
        }
    }

    /// Force-invalidates every session. Any later `get` fails with
    /// `SessionNotFound` instead of touching a dangling handle.
    pub async fn close_all(&self) {
        let drained = self.sessions.drain().await;
        let count = drained.len();

        for (worker, session) in drained {
            self.dispose(&session).await;
            tracing::debug!(worker = %worker, "session invalidated");
        }

        if count > 0 {
            tracing::info!(count, "all sessions closed");
        }
    }

    pub async fn open_count(&self) -> usize {
        self.sessions.len().await
    }

    async fn dispose(&self, session: &Session) {
        // Engine already gone means the contexts died with it.
        let Ok(handle) = self.engine.handle().await else {
            return;
        };
        let browser = handle.browser();

        let target_id = session.page.target_id().clone();
        if let Err(e) = browser.execute(CloseTargetParams::new(target_id)).await {
            tracing::warn!(worker = %session.worker, "failed to close page target: {}", e);
        }

        if let Err(e) = browser
            .execute(DisposeBrowserContextParams::new(session.context_id.clone()))
            .await
        {
            tracing::warn!(worker = %session.worker, "failed to dispose browser context: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;

    #[tokio::test]
    async fn test_open_requires_started_engine() {
        let engine = Arc::new(Engine::new(EngineConfig::default()));
        let store = SessionStore::new(engine);

        let err = store.open(&WorkerId::from("w1")).await.unwrap_err();
        assert!(matches!(err, RigError::EngineNotStarted));
    }

    #[tokio::test]
    async fn test_get_without_open_fails() {
        let engine = Arc::new(Engine::new(EngineConfig::default()));
        let store = SessionStore::new(engine);

        match store.get(&WorkerId::from("w1")).await.unwrap_err() {
            RigError::SessionNotFound(worker) => assert_eq!(worker.as_str(), "w1"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_map_rejects_duplicate_worker() {
        let map: SessionMap<u32> = SessionMap::new();
        let w1 = WorkerId::from("w1");

        map.insert_new(&w1, 1).await.unwrap();
        let err = map.insert_new(&w1, 2).await.unwrap_err();
        assert!(matches!(err, RigError::DuplicateSession(_)));

        // The original value survives the rejected insert.
        assert_eq!(map.get(&w1).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_map_isolates_workers() {
        let map: SessionMap<u32> = SessionMap::new();
        let w1 = WorkerId::from("w1");
        let w2 = WorkerId::from("w2");

        map.insert_new(&w1, 1).await.unwrap();
        map.insert_new(&w2, 2).await.unwrap();

        assert_eq!(map.get(&w1).await.unwrap(), 1);
        assert_eq!(map.get(&w2).await.unwrap(), 2);

        map.remove(&w2).await;
        assert_eq!(map.get(&w1).await.unwrap(), 1);
        assert!(matches!(
            map.get(&w2).await.unwrap_err(),
            RigError::SessionNotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_map_concurrent_inserts_stay_isolated() {
        let map: Arc<SessionMap<usize>> = Arc::new(SessionMap::new());

        let mut handles = Vec::new();
        for i in 0..8 {
            let map = map.clone();
            handles.push(tokio::spawn(async move {
                let worker = WorkerId::from(format!("w{}", i));
                map.insert_new(&worker, i).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(map.len().await, 8);
        for i in 0..8 {
            let worker = WorkerId::from(format!("w{}", i));
            assert_eq!(map.get(&worker).await.unwrap(), i);
        }
    }

    #[tokio::test]
    async fn test_map_remove_is_idempotent() {
        let map: SessionMap<u32> = SessionMap::new();
        let w1 = WorkerId::from("w1");

        map.insert_new(&w1, 1).await.unwrap();
        assert!(map.remove(&w1).await.is_some());
        assert!(map.remove(&w1).await.is_none());
    }

    #[tokio::test]
    async fn test_map_drain_invalidates_everything() {
        let map: SessionMap<u32> = SessionMap::new();
        map.insert_new(&WorkerId::from("w1"), 1).await.unwrap();
        map.insert_new(&WorkerId::from("w2"), 2).await.unwrap();

        let drained = map.drain().await;
        assert_eq!(drained.len(), 2);
        assert_eq!(map.len().await, 0);
        assert!(matches!(
            map.get(&WorkerId::from("w1")).await.unwrap_err(),
            RigError::SessionNotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_store_close_without_session_is_noop() {
        let engine = Arc::new(Engine::new(EngineConfig::default()));
        let store = SessionStore::new(engine);

        store.close(&WorkerId::from("w1")).await;
        assert_eq!(store.open_count().await, 0);
    }
}
