pub mod commands;
pub mod dispatch;

use crate::config::{Config, ConfigOverrides, DispatchMode};
use crate::engine::EngineKind;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "uirig")]
#[command(version, about = "Page-object UI test rig")]
#[command(
    long_about = "Per-worker browser sessions with dual-mode (local/remote) action dispatch"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<commands::Command>,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, help = "Dispatch mode: local, remote")]
    pub mode: Option<DispatchMode>,

    #[arg(long, global = true, help = "Remote execution endpoint URL")]
    pub endpoint: Option<String>,

    #[arg(long, global = true, help = "Run the engine in headless mode")]
    pub headless: Option<bool>,

    #[arg(long, global = true, help = "Engine kind: chromium, chrome, edge")]
    pub engine: Option<EngineKind>,

    #[arg(long, global = true, help = "Path to the browser executable")]
    pub browser_path: Option<PathBuf>,

    #[arg(long, global = true, help = "Action timeout in milliseconds")]
    pub timeout_ms: Option<u64>,

    #[arg(long, global = true, help = "Path to the locator file")]
    pub locators: Option<PathBuf>,
}

pub async fn run() -> crate::Result<()> {
    let cli = Cli::parse();

    let config = if let Some(config_path) = &cli.config {
        let content = std::fs::read_to_string(config_path)?;
        toml::from_str(&content)?
    } else {
        Config::load()?
    };

    let overrides = ConfigOverrides {
        mode: cli.mode,
        endpoint: cli.endpoint.clone(),
        headless: cli.headless,
        engine: cli.engine,
        browser_path: cli.browser_path.clone(),
        timeout_ms: cli.timeout_ms,
        locators: cli.locators.clone(),
        json_pretty: Some(cli.json),
    };

    let config = Arc::new(config.load_with_overrides(overrides));
    config.validate()?;

    dispatch::dispatch(cli, config).await
}
