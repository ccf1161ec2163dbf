use crate::engine::EngineKind;
use crate::{Result, RigError};
use std::path::PathBuf;

pub fn find_engine_executable(kind: EngineKind) -> Result<PathBuf> {
    if let Some(path) = find_in_standard_locations(kind) {
        return Ok(path);
    }

    if let Some(path) = find_in_path(kind) {
        return Ok(path);
    }

    Err(RigError::EngineStart(format!(
        "Could not find a {} executable. Set [engine].browser_path or UIRIG_BROWSER_PATH",
        kind
    )))
}

#[cfg(target_os = "macos")]
fn find_in_standard_locations(kind: EngineKind) -> Option<PathBuf> {
    let paths: &[&str] = match kind {
        EngineKind::Chromium => &["/Applications/Chromium.app/Contents/MacOS/Chromium"],
        EngineKind::Chrome => &[
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "/Applications/Google Chrome Canary.app/Contents/MacOS/Google Chrome Canary",
        ],
        EngineKind::Edge => &["/Applications/Microsoft Edge.app/Contents/MacOS/Microsoft Edge"],
    };

    first_existing(paths)
}

#[cfg(target_os = "linux")]
fn find_in_standard_locations(kind: EngineKind) -> Option<PathBuf> {
    let paths: &[&str] = match kind {
        EngineKind::Chromium => &[
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
            "/snap/bin/chromium",
        ],
        EngineKind::Chrome => &["/usr/bin/google-chrome", "/usr/bin/google-chrome-stable"],
        EngineKind::Edge => &["/usr/bin/microsoft-edge", "/usr/bin/microsoft-edge-stable"],
    };

    first_existing(paths)
}

#[cfg(target_os = "windows")]
fn find_in_standard_locations(kind: EngineKind) -> Option<PathBuf> {
    let paths: &[&str] = match kind {
        EngineKind::Chromium => &[r"C:\Program Files\Chromium\Application\chrome.exe"],
        EngineKind::Chrome => &[
            r"C:\Program Files\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
        ],
        EngineKind::Edge => &[
            r"C:\Program Files (x86)\Microsoft\Edge\Application\msedge.exe",
            r"C:\Program Files\Microsoft\Edge\Application\msedge.exe",
        ],
    };

    first_existing(paths)
}

#[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
fn find_in_standard_locations(_kind: EngineKind) -> Option<PathBuf> {
    None
}

fn first_existing(paths: &[&str]) -> Option<PathBuf> {
    for path in paths {
        let p = PathBuf::from(path);
        if p.exists() {
            return Some(p);
        }
    }
    None
}

fn find_in_path(kind: EngineKind) -> Option<PathBuf> {
    let binaries: &[&str] = match kind {
        EngineKind::Chromium => {
            if cfg!(windows) {
                &["chromium.exe", "chrome.exe"]
            } else {
                &["chromium", "chromium-browser", "chrome"]
            }
        }
        EngineKind::Chrome => {
            if cfg!(windows) {
                &["chrome.exe"]
            } else {
                &["google-chrome", "google-chrome-stable", "chrome"]
            }
        }
        EngineKind::Edge => {
            if cfg!(windows) {
                &["msedge.exe"]
            } else {
                &["microsoft-edge", "microsoft-edge-stable"]
            }
        }
    };

    for binary in binaries {
        if let Ok(path) = which::which(binary) {
            return Some(path);
        }
    }

    None
}
