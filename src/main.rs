use anyhow::Result;
use clap::error::ErrorKind;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use yt_transcript::cli::{Cli, OutputFormat};
use yt_transcript::config::Config;
use yt_transcript::fetcher::{TranscriptFetcher, TranscriptResult};
use yt_transcript::output;
use yt_transcript::provider::youtube::YoutubeProvider;

const MISSING_VIDEO_ID: &str = "Video ID not specified";

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    let cli = match Cli::try_parse_args(std::env::args_os()) {
        Ok(cli) => cli,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            err.print()?;
            return Ok(ExitCode::SUCCESS);
        }
        Err(err) => {
            let result = TranscriptResult::failure(usage_error_message(&err));
            output::print_to_console(&result, OutputFormat::Json)?;
            return Ok(ExitCode::from(2));
        }
    };

    // Logs go to stderr; stdout carries nothing but the result
    let default_filter = if cli.verbose {
        "yt_transcript=debug"
    } else {
        "yt_transcript=warn"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Process-level errors are always JSON, whatever --format says
    let Some(video_id) = cli.video_id.as_deref() else {
        output::print_to_console(&TranscriptResult::failure(MISSING_VIDEO_ID), OutputFormat::Json)?;
        return Ok(ExitCode::FAILURE);
    };

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(err) => {
            tracing::error!("Invalid configuration: {:#}", err);
            let result = TranscriptResult::failure(format!("Configuration error: {:#}", err));
            output::print_to_console(&result, OutputFormat::Json)?;
            return Ok(ExitCode::from(2));
        }
    };

    let result = match YoutubeProvider::new(&config.http, &config.transcript) {
        Ok(provider) => {
            TranscriptFetcher::new(provider)
                .with_languages(config.transcript.languages.clone())
                .fetch(video_id)
                .await
        }
        Err(err) => {
            tracing::error!("Failed to set up transcript provider: {}", err);
            TranscriptResult::retrieval_error(err)
        }
    };

    output::print_to_console(&result, cli.format)?;

    Ok(ExitCode::SUCCESS)
}

/// Merge the config file with command line overrides
fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load(cli.config.as_deref())?;

    if cli.preserve_formatting {
        config.transcript.preserve_formatting = true;
    }

    match &cli.languages {
        Some(languages) => config.with_languages(languages.clone()),
        None => Ok(config),
    }
}

/// First line of a clap error without its "error: " prefix
fn usage_error_message(err: &clap::Error) -> String {
    let rendered = err.render().to_string();
    let first_line = rendered.lines().next().unwrap_or_default();
    format!(
        "Invalid arguments: {}",
        first_line.strip_prefix("error: ").unwrap_or(first_line)
    )
}
