mod dispatch;
mod prompt;
mod render;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use onekey_core::ReleaseSource;
use tracing_subscriber::filter::{EnvFilter, LevelFilter};

use crate::dispatch::run_cli;
use crate::render::{current_output_style, TerminalRenderer};

#[derive(Parser, Debug)]
#[command(name = "frps-onekey")]
#[command(about = "Install and manage the frps reverse proxy server", long_about = None)]
#[command(version)]
struct Cli {
    /// Re-anchor every installed path under this directory.
    #[arg(long, global = true)]
    root: Option<PathBuf>,
    #[arg(long, global = true)]
    settings: Option<PathBuf>,
    #[arg(long, global = true, value_enum)]
    source: Option<SourceArg>,
    /// Accept defaults and confirmations without prompting.
    #[arg(short, long, global = true)]
    yes: bool,
    #[arg(long, global = true)]
    plain: bool,
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Commands {
    Install,
    Uninstall,
    Update,
    Config,
    Start,
    Stop,
    Restart,
    Status,
    Version,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum SourceArg {
    Github,
    Gitee,
}

impl From<SourceArg> for ReleaseSource {
    fn from(value: SourceArg) -> Self {
        match value {
            SourceArg::Github => ReleaseSource::Github,
            SourceArg::Gitee => ReleaseSource::Gitee,
        }
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        _ => LevelFilter::DEBUG,
    };
    let filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let renderer = TerminalRenderer::from_style(current_output_style(cli.plain));

    match run_cli(cli, renderer) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            renderer.print_error(&format!("{err:#}"));
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests;
