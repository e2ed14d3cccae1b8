//! yt-transcript - fetch YouTube subtitles and normalize them to JSON
//!
//! This library asks a transcript provider for a video's captions in a preferred
//! language, falls back to whatever track the video does have, and reduces every
//! failure to a short user-facing message.

pub mod cli;
pub mod config;
pub mod fetcher;
pub mod output;
pub mod provider;

pub use cli::{Cli, OutputFormat};
pub use config::Config;
pub use fetcher::{TranscriptEntry, TranscriptFetcher, TranscriptRequest, TranscriptResult};
pub use provider::{youtube::YoutubeProvider, TranscriptProvider};

/// Result type used by the application plumbing
pub type Result<T> = anyhow::Result<T>;

/// Failures reported by a transcript provider.
///
/// The display text is what the fetcher classifies, so wording matters: it keeps
/// the keywords ("disabled", "no transcript", "not found", "unavailable") the
/// user-facing messages are derived from.
#[derive(thiserror::Error, Debug)]
pub enum TranscriptError {
    #[error("Subtitles are disabled for this video ({video_id})")]
    TranscriptsDisabled { video_id: String },

    #[error("No transcripts were found for any of the requested language codes: {requested}")]
    NoTranscriptFound { video_id: String, requested: String },

    #[error("The video {video_id} is unavailable")]
    VideoUnavailable { video_id: String },

    #[error("Invalid video id {0}: pass the video id, not the URL")]
    InvalidVideoId(String),

    #[error("YouTube is blocking requests from this IP address")]
    IpBlocked,

    #[error("YouTube is blocking requests from this IP address: {0}")]
    RequestBlocked(String),

    #[error("The video {0} is age-restricted and requires authentication")]
    AgeRestricted(String),

    #[error("The video is unplayable: {reason}{}", format_subreasons(.subreasons))]
    VideoUnplayable {
        reason: String,
        subreasons: Vec<String>,
    },

    #[error("Failed to automatically give consent to saving cookies for {0}")]
    ConsentCookie(String),

    #[error("The requested transcript requires a PO token")]
    PoTokenRequired,

    #[error("YouTube data could not be parsed: {0}")]
    DataUnparsable(String),

    #[error("Request to YouTube failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Invalid request URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Malformed timedtext document: {0}")]
    MalformedTimedText(#[from] quick_xml::DeError),
}

fn format_subreasons(subreasons: &[String]) -> String {
    if subreasons.is_empty() {
        String::new()
    } else {
        format!(" ({})", subreasons.join("; "))
    }
}
