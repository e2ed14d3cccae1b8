use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod timedtext;
pub mod youtube;

use crate::TranscriptError;

/// One caption line as delivered by the provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSnippet {
    pub text: String,

    /// Start offset in seconds
    pub start: f64,

    /// Duration in seconds
    pub duration: f64,
}

/// A caption track the video offers, not yet downloaded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptTrack {
    pub video_id: String,

    /// Timedtext download URL
    pub url: String,

    /// Human readable language name, e.g. "English (auto-generated)"
    pub language: String,

    pub language_code: String,

    /// Automatic speech recognition track rather than uploaded captions
    pub is_generated: bool,

    pub is_translatable: bool,
}

/// Downloaded transcript with the metadata of the track it came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchedTranscript {
    pub video_id: String,
    pub language: String,
    pub language_code: String,
    pub is_generated: bool,
    pub snippets: Vec<TranscriptSnippet>,
}

impl FetchedTranscript {
    pub fn from_track(track: &TranscriptTrack, snippets: Vec<TranscriptSnippet>) -> Self {
        Self {
            video_id: track.video_id.clone(),
            language: track.language.clone(),
            language_code: track.language_code.clone(),
            is_generated: track.is_generated,
            snippets,
        }
    }
}

/// Every caption track available for a video.
///
/// Manually created tracks always come before generated ones, both when
/// iterating and when resolving a language preference.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TranscriptList {
    pub video_id: String,
    pub manually_created: Vec<TranscriptTrack>,
    pub generated: Vec<TranscriptTrack>,
}

impl TranscriptList {
    pub fn new(video_id: impl Into<String>, tracks: Vec<TranscriptTrack>) -> Self {
        let (generated, manually_created): (Vec<_>, Vec<_>) = tracks.into_iter().partition(|t| t.is_generated);
        Self {
            video_id: video_id.into(),
            manually_created,
            generated,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &TranscriptTrack> {
        self.manually_created.iter().chain(self.generated.iter())
    }

    pub fn len(&self) -> usize {
        self.manually_created.len() + self.generated.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resolve the first language code that has a track
    pub fn find_transcript(&self, languages: &[String]) -> Result<&TranscriptTrack, TranscriptError> {
        languages
            .iter()
            .find_map(|code| {
                self.manually_created
                    .iter()
                    .chain(self.generated.iter())
                    .find(|track| &track.language_code == code)
            })
            .ok_or_else(|| TranscriptError::NoTranscriptFound {
                video_id: self.video_id.clone(),
                requested: languages.join(", "),
            })
    }
}

/// Source of caption data for a video.
///
/// Implementations own their network session; callers must not share one
/// provider across concurrent requests.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TranscriptProvider: Send + Sync {
    /// Fetch the best matching transcript for an ordered language preference
    async fn fetch(
        &self,
        video_id: &str,
        languages: &[String],
    ) -> Result<FetchedTranscript, TranscriptError>;

    /// List every transcript the video offers, regardless of language
    async fn list(&self, video_id: &str) -> Result<TranscriptList, TranscriptError>;

    /// Download one listed track
    async fn fetch_track(&self, track: &TranscriptTrack) -> Result<FetchedTranscript, TranscriptError>;

    /// Name of the provider, used in logs
    fn provider_name(&self) -> &'static str;
}
