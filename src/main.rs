use anyhow::Result;
use bluesky_client::BlueskyClient;
use operator_console::Prompter;
use skyprune::{exit_status, needs_report, Pipeline, RunOutcome};
use skyprune_core::{AppConfig, CoreError, ErrorExt, ErrorReporter};
use std::io::{self, BufReader};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn,audit=off")),
        )
        .with_writer(io::stderr)
        .init();

    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            e.log_error();
            println!("\n✗ {}", e.user_friendly_message());
            return ExitCode::FAILURE;
        }
    };
    tracing::debug!("Loaded configuration: {:?}", config);

    let pipeline = tokio::spawn(run(config));

    tokio::select! {
        joined = pipeline => match joined {
            Ok(result) => {
                if let Err(e) = &result {
                    report_failure(e);
                }
                ExitCode::from(exit_status(&result))
            }
            Err(e) => {
                tracing::debug!("Pipeline task failed: {}", e);
                println!("\n✗ Unexpected error: {}", e);
                ExitCode::FAILURE
            }
        },
        _ = tokio::signal::ctrl_c() => {
            println!("\n\n✓ Operation cancelled by user.");
            // A prompt may still be blocked on stdin, so skip runtime shutdown.
            std::process::exit(0);
        }
    }
}

async fn run(config: AppConfig) -> Result<RunOutcome> {
    let client = BlueskyClient::new(&config)?;
    let prompter = Prompter::new(BufReader::new(io::stdin()), io::stdout());
    let mut pipeline = Pipeline::new(&config, prompter, client);
    let outcome = pipeline.run().await?;
    tracing::debug!("Run finished: {:?}", outcome);
    Ok(outcome)
}

fn report_failure(error: &anyhow::Error) {
    if !needs_report(error) {
        return;
    }
    if let Some(core) = error.downcast_ref::<CoreError>() {
        ErrorReporter::new().report_error(core);
    }
    println!("\n✗ Unexpected error: {:#}", error);
}
