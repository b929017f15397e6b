mod config;
mod scenario;

use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use modelink_connect::ConnectorRegistry;
use modelink_core::metamodel::{ALL_KINDS, kind_by_name, model_element};
use modelink_session::Session;

use config::Config;
use scenario::{Runner, Scenario};

/// Diagram model editing with connection-aware lines
#[derive(Parser, Debug)]
#[command(name = "modelink")]
#[command(version, about, long_about = None)]
struct Args {
    /// Config file to use instead of the default location
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a scenario and print a JSON report
    Run {
        /// Scenario file
        #[arg(value_name = "SCENARIO")]
        scenario: PathBuf,

        /// Write the undo history here when done
        #[arg(long, value_name = "FILE")]
        history: Option<PathBuf>,
    },
    /// Show which connector joins a line kind to a target kind
    Check {
        #[arg(value_name = "TARGET_KIND")]
        target: String,
        #[arg(value_name = "LINE_KIND")]
        line: String,
    },
    /// List the known kinds
    Kinds,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    // RUST_LOG wins over the configured filter
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match args.command {
        Command::Run { scenario, history } => run(&config, &scenario, history),
        Command::Check { target, line } => check(&target, &line),
        Command::Kinds => {
            kinds();
            Ok(())
        }
    }
}

fn run(config: &Config, path: &Path, history: Option<PathBuf>) -> Result<()> {
    let scenario = Scenario::load(path)?;
    let mut runner = Runner::new(Session::new(config.session_options()));
    runner.run(&scenario)?;

    let report = serde_json::to_string_pretty(&runner.report())?;
    println!("{}", report);

    if let Some(history) = history {
        runner.session().history().save_to(&history)?;
        info!(path = ?history, "history saved");
    }
    Ok(())
}

fn check(target: &str, line: &str) -> Result<()> {
    let target = kind_by_name(target).ok_or_else(|| anyhow!("Unknown kind {}", target))?;
    let line = kind_by_name(line).ok_or_else(|| anyhow!("Unknown kind {}", line))?;
    let registry = ConnectorRegistry::with_defaults();
    let factory = registry.resolve(target, line);
    println!(
        "{} -> {}: {} ({})",
        line,
        target,
        factory.name(),
        if registry.can_connect(target, line) { "can connect" } else { "can not connect" }
    );
    Ok(())
}

fn kinds() {
    for kind in ALL_KINDS {
        let parent = kind.parent().map(|p| p.name()).unwrap_or("-");
        match model_element(kind) {
            Some(element) => println!("{:<40} {:<24} presents {}", kind.name(), parent, element),
            None => println!("{:<40} {}", kind.name(), parent),
        }
    }
}
