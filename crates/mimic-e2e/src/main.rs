//! # mimic-e2e
//!
//! Binary entry point for the scenario runner.
//!
//! - `mimic-e2e run [--filter <substr>] [--format table|json]` runs the
//!   scenarios and exits non-zero if any failed
//! - `mimic-e2e list` prints the available scenarios

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use mimic_core::MockConfig;
use mimic_e2e::{all_scenarios, reporter, ScenarioRunner};
use std::io::{stdout, IsTerminal};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Color output mode for terminal display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ColorMode {
    /// Automatically detect if stdout is a TTY
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl ColorMode {
    fn should_use_colors(self) -> bool {
        match self {
            ColorMode::Always => true,
            ColorMode::Never => false,
            ColorMode::Auto => stdout().is_terminal(),
        }
    }
}

/// Output format for run results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table format
    #[default]
    Table,
    /// JSON format for programmatic access
    Json,
}

/// Mimic scenario runner
#[derive(Parser, Debug)]
#[command(name = "mimic-e2e", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to configuration file (optional)
    #[arg(short, long, default_value = "mimic.yml", global = true)]
    config: PathBuf,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Color output mode (auto, always, never)
    #[arg(long, value_enum, default_value_t = ColorMode::Auto, global = true)]
    color: ColorMode,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the scenarios (default if no subcommand given)
    Run(RunArgs),

    /// List available scenarios
    List,
}

/// Arguments for the run subcommand.
#[derive(Parser, Debug, Default)]
struct RunArgs {
    /// Only run scenarios whose id contains this string
    #[arg(long)]
    filter: Option<String>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Initialize logging; RUST_LOG takes precedence
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    colored::control::set_override(cli.color.should_use_colors());

    match cli.command {
        Some(Commands::List) => {
            list_command();
            Ok(ExitCode::SUCCESS)
        }
        Some(Commands::Run(args)) => run_command(&cli.config, cli.verbose, args).await,
        None => run_command(&cli.config, cli.verbose, RunArgs::default()).await,
    }
}

fn load_config(path: &Path) -> Result<MockConfig> {
    let config = if path.exists() {
        debug!(path = %path.display(), "Loading config");
        MockConfig::from_file(path).with_context(|| format!("Failed to load config from {}", path.display()))?
    } else {
        MockConfig::default()
    };
    config
        .with_env_overrides()
        .context("Invalid environment override")
}

fn list_command() {
    let scenarios = all_scenarios();
    let rows = scenarios.iter().map(|s| (s.id(), s.tier(), s.description()));
    print!("{}", reporter::render_list(rows));
}

async fn run_command(config_path: &Path, verbose: bool, args: RunArgs) -> Result<ExitCode> {
    info!("Mimic scenario runner v{}", env!("CARGO_PKG_VERSION"));
    let config = load_config(config_path)?;
    debug!(mode = %config.default_mode, "Using default mock mode");

    let runner = ScenarioRunner::new(config).with_filter(args.filter);
    let summary = runner.run_all(&all_scenarios()).await;

    match args.format {
        OutputFormat::Json => {
            let json = reporter::render_json(&summary).context("Failed to serialize results")?;
            println!("{json}");
        }
        OutputFormat::Table => {
            print!("{}", reporter::render_table(&summary, verbose));
        }
    }

    Ok(if summary.all_passed() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
