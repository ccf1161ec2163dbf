use super::Cli;
use super::commands::{Command, ConfigCommand};
use crate::config::{Config, DispatchMode};
use crate::harness::Harness;
use crate::locator::{LocatorEntry, LocatorRegistry};
use crate::output::{self, OutputFormatter};
use crate::remote::RemoteClient;
use crate::session::WorkerId;
use crate::{Result, RigError};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

pub async fn dispatch(mut cli: Cli, config: Arc<Config>) -> Result<()> {
    let command = match cli.command.take() {
        Some(cmd) => cmd,
        None => {
            eprintln!("No command provided. Use --help for usage.");
            std::process::exit(1);
        }
    };

    let as_json = cli.json;
    let pretty = config.output.json_pretty;

    match command {
        Command::Locators { file } => {
            let result = handle_locators(file, &config)?;
            output::print_output(&result, as_json, pretty)
        }
        Command::Health => {
            let result = handle_health(&config).await?;
            output::print_output(&result, as_json, pretty)
        }
        Command::Config { subcommand } => handle_config_command(subcommand, &config),
        Command::Smoke { url, label } => {
            let result = handle_smoke(&url, &label, &config).await?;
            output::print_output(&result, as_json, pretty)
        }
    }
}

#[derive(Debug, Serialize)]
struct LocatorList {
    path: PathBuf,
    count: usize,
    entries: Vec<LocatorEntry>,
}

impl OutputFormatter for LocatorList {
    fn format_text(&self) -> String {
        use crate::output::text;
        let mut out = text::success(&format!(
            "{} locators loaded from {}",
            self.count,
            self.path.display()
        ));
        for entry in &self.entries {
            out.push('\n');
            out.push_str(&text::key_value(
                &entry.key,
                &format!("{}:{}", entry.strategy, entry.value),
            ));
        }
        out
    }

    fn format_json(&self, pretty: bool) -> Result<String> {
        output::to_json(self, pretty)
    }
}

fn handle_locators(file: Option<PathBuf>, config: &Config) -> Result<LocatorList> {
    let path = file
        .or_else(|| config.locators.path.clone())
        .ok_or_else(|| {
            RigError::Config("no locator file given and [locators].path not set".into())
        })?;

    let registry = LocatorRegistry::load(&path)?;

    let mut entries: Vec<LocatorEntry> = registry.entries().cloned().collect();
    entries.sort_by(|a, b| a.key.cmp(&b.key));

    Ok(LocatorList {
        path,
        count: entries.len(),
        entries,
    })
}

#[derive(Debug, Serialize)]
struct HealthReport {
    endpoint: String,
    healthy: bool,
}

impl OutputFormatter for HealthReport {
    fn format_text(&self) -> String {
        use crate::output::text;
        if self.healthy {
            text::success(&format!("Remote endpoint healthy: {}", self.endpoint))
        } else {
            text::error(&format!("Remote endpoint unhealthy: {}", self.endpoint))
        }
    }

    fn format_json(&self, pretty: bool) -> Result<String> {
        output::to_json(self, pretty)
    }
}

async fn handle_health(config: &Config) -> Result<HealthReport> {
    let client = RemoteClient::new(&config.remote)?;
    let healthy = client.health_check().await;

    Ok(HealthReport {
        endpoint: client.endpoint().to_string(),
        healthy,
    })
}

fn handle_config_command(subcommand: ConfigCommand, config: &Config) -> Result<()> {
    match subcommand {
        ConfigCommand::Show => {
            println!("{}", config.summary());
            Ok(())
        }
        ConfigCommand::Path => {
            println!("{}", crate::config::default_config_path()?.display());
            Ok(())
        }
    }
}

#[derive(Debug, Serialize)]
struct SmokeReport {
    url: String,
    mode: DispatchMode,
    artifact: Option<PathBuf>,
    elapsed_ms: u64,
}

impl OutputFormatter for SmokeReport {
    fn format_text(&self) -> String {
        use crate::output::text;
        let mut out = text::success(&format!("Smoke flow passed: {}", self.url));
        out.push('\n');
        out.push_str(&text::key_value("Mode", &self.mode.to_string()));
        out.push('\n');
        out.push_str(&text::key_value("Elapsed", &format!("{}ms", self.elapsed_ms)));
        if let Some(ref path) = self.artifact {
            out.push('\n');
            out.push_str(&text::key_value("Screenshot", &path.display().to_string()));
        }
        out
    }

    fn format_json(&self, pretty: bool) -> Result<String> {
        output::to_json(self, pretty)
    }
}

/// Exercises the whole stack once: engine start, session open, navigate,
/// screenshot, teardown.
async fn handle_smoke(url: &str, label: &str, config: &Config) -> Result<SmokeReport> {
    let harness = Harness::new(config.clone())?;
    harness.start().await?;

    let worker = WorkerId::from("smoke");
    let result = run_smoke(&harness, &worker, url, label).await;

    harness.shutdown().await;
    result
}

async fn run_smoke(
    harness: &Harness,
    worker: &WorkerId,
    url: &str,
    label: &str,
) -> Result<SmokeReport> {
    let start = std::time::Instant::now();
    let mode = harness.dispatcher().mode();

    if mode == DispatchMode::Local {
        harness.sessions().open(worker).await?;
    }

    let dispatcher = harness.dispatcher();
    dispatcher.navigate(worker, url).await?;
    let artifact = dispatcher.screenshot(worker, label).await?;

    if mode == DispatchMode::Local {
        harness.sessions().close(worker).await;
    }

    Ok(SmokeReport {
        url: url.to_string(),
        mode,
        artifact,
        elapsed_ms: start.elapsed().as_millis() as u64,
    })
}
