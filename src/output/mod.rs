use anyhow::Result;

use crate::cli::OutputFormat;
use crate::fetcher::TranscriptResult;

/// Render a result as the single-line JSON object the CLI prints
pub fn format_as_json(result: &TranscriptResult) -> Result<String> {
    Ok(serde_json::to_string(result)?)
}

/// Render caption text only, one entry per line
pub fn format_as_text(result: &TranscriptResult) -> Option<String> {
    result.plain_text()
}

/// Print a result to stdout in the requested format.
///
/// In text mode a failure has no transcript to print, so its message goes to
/// stderr instead.
pub fn print_to_console(result: &TranscriptResult, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", format_as_json(result)?),
        OutputFormat::Text => match (format_as_text(result), result) {
            (Some(text), _) => println!("{}", text),
            (None, TranscriptResult::Failure { message }) => eprintln!("{}", message),
            (None, TranscriptResult::Success { .. }) => {}
        },
    }

    Ok(())
}
