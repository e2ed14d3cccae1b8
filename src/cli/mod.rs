use clap::{CommandFactory, Parser, ValueEnum};
use std::ffi::OsString;
use std::path::PathBuf;

/// Length of a YouTube video id
const VIDEO_ID_LEN: usize = 11;

#[derive(Parser, Debug)]
#[command(
    name = "get-transcript",
    about = "Fetch YouTube subtitles and print them as JSON",
    version,
    long_about = "Fetches the subtitles of a YouTube video, preferring the configured languages and falling back to any available track. The result is printed to stdout as {\"success\": true, \"transcript\": [...]} or {\"success\": false, \"error\": \"...\"}."
)]
pub struct Cli {
    /// YouTube video id (not the full URL)
    #[arg(value_name = "VIDEO_ID")]
    pub video_id: Option<String>,

    /// Comma separated language codes in order of preference (overrides config)
    #[arg(short, long, value_name = "CODES", value_delimiter = ',')]
    pub languages: Option<Vec<String>>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    pub format: OutputFormat,

    /// Keep inline formatting tags such as <b> and <i>
    #[arg(long)]
    pub preserve_formatting: bool,

    /// Path to a YAML config file
    #[arg(short, long, value_name = "FILE", env = "YT_TRANSCRIPT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging on stderr
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Parse arguments, accepting a video id that starts with a hyphen
    pub fn try_parse_args<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        Self::try_parse_from(normalize_args(args.into_iter().map(Into::into).collect()))
    }
}

/// Move a hyphen-leading video id behind `--` so clap reads it as the positional.
///
/// A token counts as a video id when it has the id's shape, is not one of our
/// own long flags, and is not the value of a preceding option.
pub fn normalize_args(mut args: Vec<OsString>) -> Vec<OsString> {
    if args.iter().any(|arg| arg == "--") {
        return args;
    }

    let command = Cli::command();
    let position = (1..args.len()).find(|&i| {
        let Some(token) = args[i].to_str() else {
            return false;
        };
        let previous = args[i - 1].to_str().unwrap_or_default();
        looks_like_hyphen_video_id(&command, token) && !takes_value(&command, previous)
    });

    if let Some(index) = position {
        let video_id = args.remove(index);
        args.push(OsString::from("--"));
        args.push(video_id);
    }

    args
}

fn looks_like_hyphen_video_id(command: &clap::Command, token: &str) -> bool {
    token.len() == VIDEO_ID_LEN
        && token.starts_with('-')
        && token
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
        && !command
            .get_arguments()
            .filter_map(|arg| arg.get_long())
            .any(|long| token.strip_prefix("--") == Some(long))
}

fn takes_value(command: &clap::Command, token: &str) -> bool {
    command
        .get_arguments()
        .filter(|arg| !arg.is_positional() && arg.get_action().takes_values())
        .any(|arg| {
            arg.get_long().is_some_and(|long| token.strip_prefix("--") == Some(long))
                || arg.get_short().is_some_and(|short| token == format!("-{short}"))
        })
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON object with success flag and timed entries
    Json,
    /// Caption text only, one line per entry
    Text,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Text => write!(f, "text"),
        }
    }
}
