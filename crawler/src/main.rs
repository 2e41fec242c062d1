mod cli;

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::Parser;
use cli::Cli;
use crawler::{Config, Crawler};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const SUCCESS: u8 = 0;
const FAILURE: u8 = 1;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();

            return ExitCode::from(parse_status(&err));
        }
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "crawler=info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    ExitCode::from(run_status(run(Config::from(cli)).await))
}

/// Exit status of an unparsable command line: asking for help or version is not a failure.
fn parse_status(err: &clap::Error) -> u8 {
    match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => SUCCESS,
        _ => FAILURE,
    }
}

/// Exit status of a crawl, only errors preventing the crawl from running at all are failures.
fn run_status(result: Result<()>) -> u8 {
    match result {
        Ok(()) => SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            FAILURE
        }
    }
}

async fn run(config: Config) -> Result<()> {
    let output = config.output.clone();

    let crawler = Crawler::start(config)
        .await
        .with_context(|| format!("cannot start crawling into `{}`", output.display()))?;

    let summary = crawler.join().await?;

    summary
        .sink
        .into_inner()
        .sync_all()
        .await
        .with_context(|| format!("cannot sync `{}`", output.display()))?;

    let stats = summary.stats;
    tracing::info!(
        "{} image(s) written to `{}` ({} fetch failure(s), {} skipped url(s), {} write failure(s)).",
        stats.lines_written,
        output.display(),
        stats.fetch_failures,
        stats.skipped_urls,
        stats.write_failures,
    );

    Ok(())
}
