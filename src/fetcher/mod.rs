use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

use crate::config::TranscriptConfig;
use crate::provider::{FetchedTranscript, TranscriptProvider};

pub const SUBTITLES_DISABLED: &str = "Subtitles are disabled for this video";
pub const VIDEO_UNAVAILABLE: &str = "Video is unavailable";
pub const NO_TRANSCRIPTS_FOUND: &str = "No transcripts found";
pub const NO_AVAILABLE_SUBTITLES: &str = "No available subtitles found";
pub const RETRIEVAL_ERROR_PREFIX: &str = "Transcript retrieval error: ";

/// Video plus the ordered language preference for one invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptRequest {
    pub video_id: String,
    pub languages: Vec<String>,
}

impl TranscriptRequest {
    pub fn new(video_id: impl Into<String>, languages: Vec<String>) -> Self {
        Self {
            video_id: video_id.into(),
            languages,
        }
    }
}

/// One subtitle line in playback order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub text: String,

    /// Start offset in seconds
    pub start: f64,

    /// Duration in seconds
    pub duration: f64,
}

/// Outcome of a fetch. Serializes to the `{"success": ..}` JSON contract.
#[derive(Debug, Clone, PartialEq)]
pub enum TranscriptResult {
    Success { entries: Vec<TranscriptEntry> },
    Failure { message: String },
}

impl TranscriptResult {
    pub fn failure(message: impl Into<String>) -> Self {
        Self::Failure {
            message: message.into(),
        }
    }

    /// Failure carrying an unrecognised provider message
    pub fn retrieval_error(detail: impl std::fmt::Display) -> Self {
        Self::failure(format!("{RETRIEVAL_ERROR_PREFIX}{detail}"))
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Caption text joined by newlines, `None` on failure
    pub fn plain_text(&self) -> Option<String> {
        match self {
            Self::Success { entries } => Some(
                entries
                    .iter()
                    .map(|entry| entry.text.as_str())
                    .collect::<Vec<_>>()
                    .join("\n"),
            ),
            Self::Failure { .. } => None,
        }
    }
}

impl From<FetchedTranscript> for TranscriptResult {
    fn from(transcript: FetchedTranscript) -> Self {
        let entries = transcript
            .snippets
            .into_iter()
            .map(|snippet| TranscriptEntry {
                text: snippet.text,
                start: snippet.start,
                duration: snippet.duration,
            })
            .collect();

        Self::Success { entries }
    }
}

impl Serialize for TranscriptResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("TranscriptResult", 2)?;
        match self {
            Self::Success { entries } => {
                state.serialize_field("success", &true)?;
                state.serialize_field("transcript", entries)?;
            }
            Self::Failure { message } => {
                state.serialize_field("success", &false)?;
                state.serialize_field("error", message)?;
            }
        }
        state.end()
    }
}

/// What a provider failure means for the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    SubtitlesDisabled,
    /// No transcript in the requested languages; try the listing fallback
    NotFound,
    Unavailable,
}

/// Checked top to bottom against the lowercased error text; first hit wins.
const CLASSIFICATION: &[(&[&str], FailureClass)] = &[
    (&["disabled"], FailureClass::SubtitlesDisabled),
    (&["no transcript", "not found"], FailureClass::NotFound),
    (&["unavailable"], FailureClass::Unavailable),
];

/// Classify a provider error message, `None` when nothing matches.
pub fn classify(message: &str) -> Option<FailureClass> {
    let lowered = message.to_lowercase();
    CLASSIFICATION
        .iter()
        .find(|(needles, _)| needles.iter().any(|needle| lowered.contains(needle)))
        .map(|(_, class)| *class)
}

/// Fetches a transcript and reduces every failure to a [`TranscriptResult`]
pub struct TranscriptFetcher<P> {
    provider: P,
    languages: Vec<String>,
}

impl<P: TranscriptProvider> TranscriptFetcher<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            languages: TranscriptConfig::default().languages,
        }
    }

    pub fn with_languages(mut self, languages: Vec<String>) -> Self {
        self.languages = languages;
        self
    }

    pub fn languages(&self) -> &[String] {
        &self.languages
    }

    /// Fetch subtitles for `video_id` using the configured language preference
    pub async fn fetch(&self, video_id: &str) -> TranscriptResult {
        let request = TranscriptRequest::new(video_id, self.languages.clone());
        self.fetch_request(&request).await
    }

    pub async fn fetch_request(&self, request: &TranscriptRequest) -> TranscriptResult {
        tracing::info!(
            "Fetching transcript for {} from {} (languages: {})",
            request.video_id,
            self.provider.provider_name(),
            request.languages.join(", ")
        );

        let error = match self
            .provider
            .fetch(&request.video_id, &request.languages)
            .await
        {
            Ok(transcript) => {
                tracing::debug!(
                    "Got {} snippet(s) in '{}'",
                    transcript.snippets.len(),
                    transcript.language_code
                );
                return transcript.into();
            }
            Err(error) => error,
        };

        let message = error.to_string();
        match classify(&message) {
            Some(FailureClass::SubtitlesDisabled) => {
                tracing::info!("Subtitles disabled for {}", request.video_id);
                TranscriptResult::failure(SUBTITLES_DISABLED)
            }
            Some(FailureClass::NotFound) => {
                tracing::info!(
                    "No preferred transcript for {}, falling back to any available one",
                    request.video_id
                );
                self.fetch_any(&request.video_id).await
            }
            Some(FailureClass::Unavailable) => {
                tracing::info!("Video {} is unavailable", request.video_id);
                TranscriptResult::failure(VIDEO_UNAVAILABLE)
            }
            None => {
                tracing::warn!("Transcript retrieval failed for {}: {}", request.video_id, message);
                TranscriptResult::retrieval_error(message)
            }
        }
    }

    /// Fallback path: take the first transcript the video lists, whatever the language
    async fn fetch_any(&self, video_id: &str) -> TranscriptResult {
        let list = match self.provider.list(video_id).await {
            Ok(list) => list,
            Err(error) => {
                tracing::warn!("Listing transcripts for {} failed: {}", video_id, error);
                return TranscriptResult::failure(NO_TRANSCRIPTS_FOUND);
            }
        };

        let Some(track) = list.iter().next() else {
            return TranscriptResult::failure(NO_AVAILABLE_SUBTITLES);
        };

        tracing::debug!("Falling back to '{}' ({})", track.language_code, track.language);

        match self.provider.fetch_track(track).await {
            Ok(transcript) => transcript.into(),
            Err(error) => {
                tracing::warn!("Fetching fallback transcript for {} failed: {}", video_id, error);
                TranscriptResult::failure(NO_TRANSCRIPTS_FOUND)
            }
        }
    }
}
