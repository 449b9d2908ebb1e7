//! Pub/Sub harness - verifies broker delivery guarantees against deployed apps.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use harness_config_and_utils::{init_logging, Config};
use pubsub_delivery_harness::{run_all, RunReport, ScenarioKind, TestEnvironment};
use tracing::{error, info};

/// Pub/Sub harness command-line interface.
#[derive(Parser)]
#[command(name = "pubsub-harness")]
#[command(about = "Failure-injection harness for pub/sub delivery guarantees")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// JSON configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error). Overrides the config file
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Publisher app base URL
    #[arg(long, global = true)]
    publisher_url: Option<String>,

    /// Subscriber app base URL
    #[arg(long, global = true)]
    subscriber_url: Option<String>,

    /// Protocol to exercise the subscriber with; repeat for several
    #[arg(long = "protocol", global = true)]
    protocols: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run preflight checks, then the scenarios
    Run {
        /// Scenario to run (repeatable). Defaults to all, in standard order
        #[arg(long = "scenario", value_parser = parse_scenario)]
        scenarios: Vec<ScenarioKind>,

        /// Write the JSON run report to this file
        #[arg(long)]
        report: Option<PathBuf>,

        /// Seed for message offsets, to reproduce a run
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Only check that both apps are reachable and publishing works
    Probe,
    /// List scenario kinds
    Scenarios,
}

const EXIT_SCENARIO_FAILED: u8 = 1;
const EXIT_FATAL: u8 = 2;

fn parse_scenario(slug: &str) -> Result<ScenarioKind, String> {
    ScenarioKind::from_slug(slug).ok_or_else(|| {
        let known: Vec<_> = ScenarioKind::ALL.iter().map(|k| k.slug()).collect();
        format!("unknown scenario '{slug}', expected one of: {}", known.join(", "))
    })
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("pubsub-harness: {e}");
            ExitCode::from(EXIT_FATAL)
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode, Box<dyn std::error::Error>> {
    if let Commands::Scenarios = cli.command {
        for kind in ScenarioKind::ALL {
            println!("{:<16} {}", kind.slug(), kind.config().name);
        }
        return Ok(ExitCode::SUCCESS);
    }

    // Load configuration, then apply flags on top
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }
    if let Some(url) = cli.publisher_url {
        config.publisher_url = url;
    }
    if let Some(url) = cli.subscriber_url {
        config.subscriber_url = url;
    }
    if !cli.protocols.is_empty() {
        config.protocols = cli.protocols;
    }

    init_logging(&config.log_level)?;

    match cli.command {
        Commands::Run {
            scenarios,
            report,
            seed,
        } => {
            let env = TestEnvironment::from_config(&config, seed)?;
            let kinds = if scenarios.is_empty() {
                ScenarioKind::ALL.to_vec()
            } else {
                scenarios
            };

            let run_report = run_all(&env, &kinds).await;
            for line in run_report.summary_lines() {
                println!("{line}");
            }
            if let Some(path) = report {
                run_report.write_json(&path)?;
                info!(path = %path.display(), "Run report written");
            }
            if let Some(reason) = &run_report.aborted {
                println!("run aborted: {reason}");
            }
            Ok(ExitCode::from(exit_status(&run_report)))
        }
        Commands::Probe => {
            let env = TestEnvironment::from_config(&config, None)?;
            match env.setup().await {
                Ok(()) => {
                    println!("publisher and subscriber ready");
                    Ok(ExitCode::SUCCESS)
                }
                Err(e) => {
                    error!(error = %e, "Probe failed");
                    println!("probe failed: {e}");
                    Ok(ExitCode::from(EXIT_FATAL))
                }
            }
        }
        Commands::Scenarios => Ok(ExitCode::SUCCESS),
    }
}

fn exit_status(report: &RunReport) -> u8 {
    if report.aborted.is_some() {
        EXIT_FATAL
    } else if report.failed_count() > 0 {
        EXIT_SCENARIO_FAILED
    } else {
        0
    }
}
