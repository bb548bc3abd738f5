//! CLI for the Warden access policy engine.
//!
//! Pipeline: load scenario -> replay events -> report final state.

mod replay;
mod scenario;

use clap::{Parser, Subcommand};
use replay::{Replay, SinkSpec};
use std::path::PathBuf;
use std::time::Instant;
use warden_policy::report::StateReport;

#[derive(Parser, Debug)]
#[command(name = "warden", version, about = "Access policy engine scenario replayer")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replay a scenario of lifecycle events, decisions and listener traffic.
    Replay {
        #[arg(short, long, env = "WARDEN_SCENARIO")]
        scenario: PathBuf,

        /// Print the final state report as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,

        /// Listener output: "ndjson" writes NDJSON to stdout,
        /// "ndjson:/path/to/file" writes to file. Default: log only.
        #[arg(long)]
        sink: Option<String>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Replay {
            scenario,
            json,
            sink,
        } => {
            let t0 = Instant::now();
            tracing::info!(scenario = %scenario.display(), "starting replay");

            // 1. Load scenario.
            let events = scenario::load(&scenario)?;
            tracing::info!(events = events.len(), "loaded scenario");

            // 2. Replay.
            let sink = SinkSpec::parse(sink.as_deref())?;
            let streams_to_stdout = sink == SinkSpec::NdjsonStdout;
            let mut replay = Replay::new(sink)?;
            let stats = replay.run(&events)?;
            tracing::info!(
                events = stats.events,
                checks = stats.checks,
                subscriptions = stats.subscriptions,
                deliveries = stats.deliveries,
                elapsed_ms = t0.elapsed().as_millis(),
                "replay complete"
            );

            // 3. Report.
            let state = replay.service().snapshot()?;
            state.validate()?;
            let report = StateReport::build(&state);

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else if streams_to_stdout {
                // Keep stdout pure NDJSON.
                eprint!("{}", report.render());
            } else {
                print!("{}", report.render());
            }
        }
    }

    Ok(())
}
