use super::{ActionExecutor, ActionKind, Outcome, PreparedAction};
use crate::js;
use crate::locator::{LocatorEntry, Selector};
use crate::session::{SessionStore, WorkerId};
use crate::timeouts::ms;
use crate::{Result, RigError};
use chromiumoxide::cdp::browser_protocol::page::{
    CaptureScreenshotFormat, CaptureScreenshotParams, NavigateParams,
};
use chromiumoxide::{element::Element, page::Page};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Executes actions against the calling worker's own session. Elements
/// reached through CSS-renderable locators use CDP element handles; XPath
/// locators go through evaluated JS.
pub struct LocalExecutor {
    sessions: Arc<SessionStore>,
    artifact_dir: PathBuf,
}

impl LocalExecutor {
    pub fn new(sessions: Arc<SessionStore>, artifact_dir: PathBuf) -> Self {
        Self {
            sessions,
            artifact_dir,
        }
    }
}

#[async_trait::async_trait]
impl ActionExecutor for LocalExecutor {
    async fn execute(&self, worker: &WorkerId, action: &PreparedAction) -> Result<Outcome> {
        let session = self.sessions.get(worker).await?;
        let page = session.page().clone();
        let limit = Duration::from_millis(action.timeout_ms);

        match action.request.kind {
            ActionKind::Click => {
                let entry = action.entry()?;
                bounded("click", limit, click(&page, entry)).await?;
                Ok(Outcome::Done)
            }
            ActionKind::Type => {
                let entry = action.entry()?;
                let text = action.value()?;
                bounded("type", limit, type_text(&page, entry, text)).await?;
                Ok(Outcome::Done)
            }
            ActionKind::Select => {
                let entry = action.entry()?;
                let value = action.value()?;
                bounded("select", limit, select_option(&page, entry, value)).await?;
                Ok(Outcome::Done)
            }
            ActionKind::WaitVisible => {
                let entry = action.entry()?;
                wait_visible(&page, entry, limit).await?;
                Ok(Outcome::Done)
            }
            ActionKind::IsDisplayed => {
                let entry = action.entry()?;
                let displayed = bounded("isDisplayed", limit, is_displayed(&page, entry)).await?;
                Ok(Outcome::Displayed(displayed))
            }
            ActionKind::GetText => {
                let entry = action.entry()?;
                let text = bounded("getText", limit, get_text(&page, entry)).await?;
                Ok(Outcome::Text(text))
            }
            ActionKind::Screenshot => {
                let label = action.value()?;
                let path = bounded(
                    "screenshot",
                    limit,
                    screenshot(&page, &self.artifact_dir, label),
                )
                .await?;
                Ok(Outcome::Artifact(Some(path)))
            }
            ActionKind::Navigate => {
                let url = action.value()?;
                bounded("navigate", limit, navigate(&page, url)).await?;
                Ok(Outcome::Done)
            }
        }
    }
}

/// Bounds an engine operation so a hung page surfaces as `Timeout`, never as
/// an indistinct element failure.
async fn bounded<T>(
    what: &str,
    limit: Duration,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(RigError::Timeout {
            what: what.to_string(),
            ms: limit.as_millis() as u64,
        }),
    }
}

async fn find_css(page: &Page, css: &str, key: &str) -> Result<Element> {
    page.find_element(css).await.map_err(|e| {
        if e.to_string().contains("No node") {
            RigError::ElementNotFound(key.to_string())
        } else {
            RigError::Engine(format!("Element lookup failed: {}", e))
        }
    })
}

async fn eval_found(page: &Page, script: String, key: &str) -> Result<()> {
    let result = page
        .evaluate(script)
        .await
        .map_err(|e| RigError::Engine(format!("Evaluation failed: {}", e)))?;

    let value: serde_json::Value = result
        .into_value()
        .map_err(|e| RigError::Engine(format!("Failed to parse result: {}", e)))?;

    if value.get("found").and_then(|v| v.as_bool()).unwrap_or(false) {
        Ok(())
    } else {
        Err(RigError::ElementNotFound(key.to_string()))
    }
}

async fn click(page: &Page, entry: &LocatorEntry) -> Result<()> {
    match entry.selector() {
        Selector::Css(css) => {
            let element = find_css(page, &css, &entry.key).await?;
            element
                .click()
                .await
                .map_err(|e| RigError::Engine(format!("Click failed: {}", e)))?;
            Ok(())
        }
        Selector::Xpath(_) => eval_found(page, js::click_element(entry), &entry.key).await,
    }
}

async fn type_text(page: &Page, entry: &LocatorEntry, text: &str) -> Result<()> {
    match entry.selector() {
        Selector::Css(css) => {
            let element = find_css(page, &css, &entry.key).await?;

            element
                .click()
                .await
                .map_err(|e| RigError::Engine(format!("Focus failed: {}", e)))?;

            page.evaluate(js::clear_value(entry))
                .await
                .map_err(|e| RigError::Engine(format!("Clear failed: {}", e)))?;

            element
                .type_str(text)
                .await
                .map_err(|e| RigError::Engine(format!("Type failed: {}", e)))?;
            Ok(())
        }
        Selector::Xpath(_) => eval_found(page, js::fill_element(entry, text), &entry.key).await,
    }
}

async fn select_option(page: &Page, entry: &LocatorEntry, value: &str) -> Result<()> {
    let result = page
        .evaluate(js::select_option(entry, value))
        .await
        .map_err(|e| RigError::Engine(format!("Evaluation failed: {}", e)))?;

    let outcome: serde_json::Value = result
        .into_value()
        .map_err(|e| RigError::Engine(format!("Failed to parse result: {}", e)))?;

    let found = outcome.get("found").and_then(|v| v.as_bool()).unwrap_or(false);
    if !found {
        return Err(RigError::ElementNotFound(entry.key.clone()));
    }

    let selected = outcome
        .get("selected")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);
    if !selected {
        return Err(RigError::Engine(format!(
            "option '{}' not present in '{}'",
            value, entry.key
        )));
    }

    Ok(())
}

async fn wait_visible(page: &Page, entry: &LocatorEntry, limit: Duration) -> Result<()> {
    let deadline = tokio::time::Instant::now() + limit;

    loop {
        if is_displayed(page, entry).await? {
            return Ok(());
        }

        if tokio::time::Instant::now() >= deadline {
            return Err(RigError::Timeout {
                what: format!("wait for visibility of '{}'", entry.key),
                ms: limit.as_millis() as u64,
            });
        }

        tokio::time::sleep(Duration::from_millis(ms::POLL_INTERVAL)).await;
    }
}

async fn is_displayed(page: &Page, entry: &LocatorEntry) -> Result<bool> {
    let result = page
        .evaluate(js::visibility_check(entry))
        .await
        .map_err(|e| RigError::Engine(format!("Evaluation failed: {}", e)))?;

    Ok(result.into_value::<bool>().unwrap_or(false))
}

async fn get_text(page: &Page, entry: &LocatorEntry) -> Result<Option<String>> {
    let result = page
        .evaluate(js::text_content(entry))
        .await
        .map_err(|e| RigError::Engine(format!("Evaluation failed: {}", e)))?;

    let value: serde_json::Value = result.into_value().unwrap_or(serde_json::Value::Null);
    Ok(value.as_str().map(|s| s.to_string()))
}

async fn screenshot(page: &Page, dir: &Path, label: &str) -> Result<PathBuf> {
    let params = CaptureScreenshotParams::builder()
        .format(CaptureScreenshotFormat::Png)
        .build();

    let bytes = page
        .screenshot(params)
        .await
        .map_err(|e| RigError::Screenshot(e.to_string()))?;

    std::fs::create_dir_all(dir)?;

    let stamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
    let path = dir.join(format!(
        "{}_{}.png",
        crate::capture::sanitize_label(label),
        stamp
    ));
    std::fs::write(&path, &bytes)?;

    Ok(path)
}

async fn navigate(page: &Page, url: &str) -> Result<()> {
    let params = NavigateParams::builder()
        .url(url)
        .build()
        .map_err(|e| RigError::Engine(format!("Failed to build navigate params: {}", e)))?;

    page.execute(params)
        .await
        .map_err(|e| RigError::Engine(format!("Navigation failed: {}", e)))?;

    wait_for_ready(page).await
}

async fn wait_for_ready(page: &Page) -> Result<()> {
    // The caller's timeout bounds this loop.
    loop {
        let state = page
            .evaluate(js::READY_STATE)
            .await
            .ok()
            .and_then(|r| r.into_value::<String>().ok());

        if matches!(state.as_deref(), Some("complete") | Some("interactive")) {
            return Ok(());
        }

        tokio::time::sleep(Duration::from_millis(ms::POLL_INTERVAL)).await;
    }
}
