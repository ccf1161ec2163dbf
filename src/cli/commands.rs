use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    #[command(about = "Validate and list a locator file")]
    Locators {
        #[arg(help = "Locator file (defaults to [locators].path from config)")]
        file: Option<PathBuf>,
    },

    #[command(about = "Probe the remote execution endpoint")]
    Health,

    #[command(about = "Configuration management")]
    Config {
        #[command(subcommand)]
        subcommand: ConfigCommand,
    },

    #[command(about = "Run an end-to-end smoke flow: navigate and screenshot")]
    Smoke {
        #[arg(help = "URL to navigate to")]
        url: String,
        #[arg(long, default_value = "smoke", help = "Screenshot label")]
        label: String,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommand {
    #[command(about = "Show the effective configuration")]
    Show,
    #[command(about = "Print the user config file path")]
    Path,
}
