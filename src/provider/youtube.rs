use async_trait::async_trait;
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE, COOKIE};
use reqwest::{Client, Response, StatusCode};
use serde_json::{json, Value};
use std::sync::LazyLock;
use std::time::Duration;
use url::Url;

use super::{timedtext, FetchedTranscript, TranscriptList, TranscriptProvider, TranscriptTrack};
use crate::config::{HttpConfig, TranscriptConfig};
use crate::TranscriptError;

const WATCH_URL: &str = "https://www.youtube.com/watch";
const INNERTUBE_PLAYER_URL: &str = "https://www.youtube.com/youtubei/v1/player";
const INNERTUBE_CLIENT_NAME: &str = "ANDROID";
const INNERTUBE_CLIENT_VERSION: &str = "20.10.38";

const CONSENT_FORM_MARKER: &str = r#"action="https://consent.youtube.com/s""#;
const RECAPTCHA_MARKER: &str = r#"class="g-recaptcha""#;

const BOT_CHECK_REASON: &str = "Sign in to confirm you're not a bot";
const AGE_RESTRICTED_REASON: &str = "This video may be inappropriate for some users.";
const UNAVAILABLE_REASON: &str = "This video is unavailable";

static CONSENT_VALUE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"name="v" value="(.*?)""#).unwrap());

static API_KEY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""INNERTUBE_API_KEY":\s*"([a-zA-Z0-9_-]+)""#).unwrap());

/// Transcript provider backed by YouTube's InnerTube player API
pub struct YoutubeProvider {
    client: Client,
    preserve_formatting: bool,
}

impl YoutubeProvider {
    pub fn new(http: &HttpConfig, transcript: &TranscriptConfig) -> Result<Self, TranscriptError> {
        let mut headers = HeaderMap::new();
        if let Ok(value) = HeaderValue::from_str(&http.accept_language) {
            headers.insert(ACCEPT_LANGUAGE, value);
        } else {
            tracing::warn!("Ignoring invalid Accept-Language value: {}", http.accept_language);
        }

        let mut builder = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(http.timeout_secs));

        if let Some(user_agent) = &http.user_agent {
            builder = builder.user_agent(user_agent.as_str());
        }

        Ok(Self {
            client: builder.build()?,
            preserve_formatting: transcript.preserve_formatting,
        })
    }

    /// Load the watch page, accepting the cookie consent form when YouTube shows it
    async fn fetch_video_html(&self, video_id: &str) -> Result<String, TranscriptError> {
        let html = self.fetch_html(video_id, None).await?;
        if !html.contains(CONSENT_FORM_MARKER) {
            return Ok(html);
        }

        tracing::debug!("Consent form returned for {}, retrying with consent cookie", video_id);
        let consent = extract_consent_value(&html)
            .ok_or_else(|| TranscriptError::ConsentCookie(video_id.to_string()))?;

        let html = self.fetch_html(video_id, Some(&consent)).await?;
        if html.contains(CONSENT_FORM_MARKER) {
            return Err(TranscriptError::ConsentCookie(video_id.to_string()));
        }

        Ok(html)
    }

    async fn fetch_html(&self, video_id: &str, consent: Option<&str>) -> Result<String, TranscriptError> {
        let url = Url::parse_with_params(WATCH_URL, &[("v", video_id)])?;

        let mut request = self.client.get(url);
        if let Some(consent) = consent {
            request = request.header(COOKIE, format!("CONSENT=YES+{consent}"));
        }

        let html = check_status(request.send().await?)?.text().await?;
        Ok(html)
    }

    async fn fetch_innertube_data(&self, video_id: &str, api_key: &str) -> Result<Value, TranscriptError> {
        let url = Url::parse_with_params(INNERTUBE_PLAYER_URL, &[("key", api_key)])?;
        let body = json!({
            "context": {
                "client": {
                    "clientName": INNERTUBE_CLIENT_NAME,
                    "clientVersion": INNERTUBE_CLIENT_VERSION,
                }
            },
            "videoId": video_id,
        });

        tracing::debug!("Requesting InnerTube player data for {}", video_id);

        let response = self.client.post(url).json(&body).send().await?;
        let data = check_status(response)?.json::<Value>().await?;

        Ok(data)
    }
}

#[async_trait]
impl TranscriptProvider for YoutubeProvider {
    async fn fetch(
        &self,
        video_id: &str,
        languages: &[String],
    ) -> Result<FetchedTranscript, TranscriptError> {
        let list = self.list(video_id).await?;
        let track = list.find_transcript(languages)?;

        tracing::debug!(
            "Selected {} track '{}' for {}",
            if track.is_generated { "generated" } else { "manual" },
            track.language_code,
            video_id
        );

        self.fetch_track(track).await
    }

    async fn list(&self, video_id: &str) -> Result<TranscriptList, TranscriptError> {
        let html = self.fetch_video_html(video_id).await?;
        let api_key = extract_innertube_api_key(&html)?;
        let data = self.fetch_innertube_data(video_id, &api_key).await?;
        let captions = extract_captions_json(&data, video_id)?;
        let list = build_transcript_list(video_id, captions)?;

        tracing::debug!("{} lists {} transcript(s)", video_id, list.len());
        Ok(list)
    }

    async fn fetch_track(&self, track: &TranscriptTrack) -> Result<FetchedTranscript, TranscriptError> {
        if track.url.contains("&exp=xpe") {
            return Err(TranscriptError::PoTokenRequired);
        }

        let response = self.client.get(&track.url).send().await?;
        let body = check_status(response)?.text().await?;

        let snippets = timedtext::parse(&body, self.preserve_formatting)?;
        Ok(FetchedTranscript::from_track(track, snippets))
    }

    fn provider_name(&self) -> &'static str {
        "YouTube"
    }
}

/// Reject error statuses, treating rate limiting as an IP block
fn check_status(response: Response) -> Result<Response, TranscriptError> {
    reject_rate_limited(response.status())?;
    Ok(response.error_for_status()?)
}

fn reject_rate_limited(status: StatusCode) -> Result<(), TranscriptError> {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(TranscriptError::IpBlocked);
    }
    Ok(())
}

fn extract_consent_value(html: &str) -> Option<String> {
    CONSENT_VALUE_PATTERN
        .captures(html)
        .map(|caps| caps[1].to_string())
}

fn extract_innertube_api_key(html: &str) -> Result<String, TranscriptError> {
    if let Some(caps) = API_KEY_PATTERN.captures(html) {
        return Ok(caps[1].to_string());
    }

    if html.contains(RECAPTCHA_MARKER) {
        return Err(TranscriptError::IpBlocked);
    }

    Err(TranscriptError::DataUnparsable(
        "INNERTUBE_API_KEY missing from watch page".to_string(),
    ))
}

/// Check the player response's playability and return the caption track renderer
fn extract_captions_json<'a>(data: &'a Value, video_id: &str) -> Result<&'a Value, TranscriptError> {
    assert_playability(&data["playabilityStatus"], video_id)?;

    let renderer = &data["captions"]["playerCaptionsTracklistRenderer"];
    if renderer.is_null() || renderer.get("captionTracks").is_none() {
        return Err(TranscriptError::TranscriptsDisabled {
            video_id: video_id.to_string(),
        });
    }

    Ok(renderer)
}

fn assert_playability(status: &Value, video_id: &str) -> Result<(), TranscriptError> {
    let Some(state) = status["status"].as_str() else {
        return Ok(());
    };
    if state == "OK" {
        return Ok(());
    }

    let reason = status["reason"].as_str().unwrap_or_default();

    match (state, reason) {
        ("LOGIN_REQUIRED", BOT_CHECK_REASON) => Err(TranscriptError::RequestBlocked(reason.to_string())),
        ("LOGIN_REQUIRED", AGE_RESTRICTED_REASON) => Err(TranscriptError::AgeRestricted(video_id.to_string())),
        ("ERROR", UNAVAILABLE_REASON) => {
            if video_id.starts_with("http://") || video_id.starts_with("https://") {
                Err(TranscriptError::InvalidVideoId(video_id.to_string()))
            } else {
                Err(TranscriptError::VideoUnavailable {
                    video_id: video_id.to_string(),
                })
            }
        }
        _ => {
            let subreasons: Vec<String> = status["errorScreen"]["playerErrorMessageRenderer"]["subreason"]["runs"]
                .as_array()
                .map(|runs| {
                    runs.iter()
                        .filter_map(|run| run["text"].as_str())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default();

            Err(TranscriptError::VideoUnplayable {
                reason: reason.to_string(),
                subreasons,
            })
        }
    }
}

fn build_transcript_list(video_id: &str, renderer: &Value) -> Result<TranscriptList, TranscriptError> {
    let tracks = renderer["captionTracks"]
        .as_array()
        .ok_or_else(|| TranscriptError::DataUnparsable("captionTracks is not a list".to_string()))?;

    let tracks = tracks
        .iter()
        .map(|caption| parse_track(video_id, caption))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(TranscriptList::new(video_id, tracks))
}

fn parse_track(video_id: &str, caption: &Value) -> Result<TranscriptTrack, TranscriptError> {
    let base_url = caption["baseUrl"]
        .as_str()
        .ok_or_else(|| TranscriptError::DataUnparsable("caption track without baseUrl".to_string()))?;
    let language_code = caption["languageCode"]
        .as_str()
        .ok_or_else(|| TranscriptError::DataUnparsable("caption track without languageCode".to_string()))?;

    let language = caption["name"]["runs"][0]["text"]
        .as_str()
        .or_else(|| caption["name"]["simpleText"].as_str())
        .unwrap_or(language_code);

    Ok(TranscriptTrack {
        video_id: video_id.to_string(),
        url: base_url.replace("&fmt=srv3", ""),
        language: language.to_string(),
        language_code: language_code.to_string(),
        is_generated: caption["kind"].as_str() == Some("asr"),
        is_translatable: caption["isTranslatable"].as_bool().unwrap_or(false),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player_response() -> Value {
        json!({
            "playabilityStatus": { "status": "OK" },
            "captions": {
                "playerCaptionsTracklistRenderer": {
                    "captionTracks": [
                        {
                            "baseUrl": "https://www.youtube.com/api/timedtext?v=vid&lang=en&kind=asr&fmt=srv3",
                            "name": { "runs": [{ "text": "English (auto-generated)" }] },
                            "languageCode": "en",
                            "kind": "asr",
                            "isTranslatable": true
                        },
                        {
                            "baseUrl": "https://www.youtube.com/api/timedtext?v=vid&lang=ja",
                            "name": { "simpleText": "Japanese" },
                            "languageCode": "ja"
                        }
                    ]
                }
            }
        })
    }

    #[test]
    fn test_build_transcript_list() {
        let data = player_response();
        let captions = extract_captions_json(&data, "vid").unwrap();
        let list = build_transcript_list("vid", captions).unwrap();

        assert_eq!(list.len(), 2);
        let first = list.iter().next().unwrap();
        assert_eq!(first.language_code, "ja");
        assert_eq!(first.language, "Japanese");
        assert!(!first.is_generated);
        assert!(!first.is_translatable);

        let generated = &list.generated[0];
        assert_eq!(generated.language, "English (auto-generated)");
        assert_eq!(
            generated.url,
            "https://www.youtube.com/api/timedtext?v=vid&lang=en&kind=asr"
        );
        assert!(generated.is_translatable);
    }

    #[test]
    fn test_missing_caption_tracks_means_disabled() {
        let data = json!({ "playabilityStatus": { "status": "OK" } });
        let err = extract_captions_json(&data, "vid").unwrap_err();
        assert!(matches!(err, TranscriptError::TranscriptsDisabled { .. }));

        let data = json!({
            "playabilityStatus": { "status": "OK" },
            "captions": { "playerCaptionsTracklistRenderer": { "audioTracks": [] } }
        });
        let err = extract_captions_json(&data, "vid").unwrap_err();
        assert!(matches!(err, TranscriptError::TranscriptsDisabled { .. }));
    }

    #[test]
    fn test_playability_errors() {
        let unavailable = json!({ "status": "ERROR", "reason": UNAVAILABLE_REASON });
        assert!(matches!(
            assert_playability(&unavailable, "vid"),
            Err(TranscriptError::VideoUnavailable { .. })
        ));
        assert!(matches!(
            assert_playability(&unavailable, "https://youtu.be/vid"),
            Err(TranscriptError::InvalidVideoId(_))
        ));

        let bot = json!({ "status": "LOGIN_REQUIRED", "reason": BOT_CHECK_REASON });
        assert!(matches!(
            assert_playability(&bot, "vid"),
            Err(TranscriptError::RequestBlocked(_))
        ));

        let age = json!({ "status": "LOGIN_REQUIRED", "reason": AGE_RESTRICTED_REASON });
        assert!(matches!(
            assert_playability(&age, "vid"),
            Err(TranscriptError::AgeRestricted(_))
        ));
    }

    #[test]
    fn test_unplayable_collects_subreasons() {
        let status = json!({
            "status": "UNPLAYABLE",
            "reason": "Private video",
            "errorScreen": {
                "playerErrorMessageRenderer": {
                    "subreason": { "runs": [{ "text": "Sign in if you've been granted access" }] }
                }
            }
        });

        match assert_playability(&status, "vid") {
            Err(TranscriptError::VideoUnplayable { reason, subreasons }) => {
                assert_eq!(reason, "Private video");
                assert_eq!(subreasons, vec!["Sign in if you've been granted access".to_string()]);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_missing_status_is_playable() {
        assert!(assert_playability(&Value::Null, "vid").is_ok());
    }

    #[test]
    fn test_extract_innertube_api_key() {
        let html = r#"<script>ytcfg.set({"INNERTUBE_API_KEY": "AIzaSy-abc_123","OTHER":1})</script>"#;
        assert_eq!(extract_innertube_api_key(html).unwrap(), "AIzaSy-abc_123");

        let blocked = r#"<div class="g-recaptcha"></div>"#;
        assert!(matches!(
            extract_innertube_api_key(blocked),
            Err(TranscriptError::IpBlocked)
        ));

        assert!(matches!(
            extract_innertube_api_key("<html></html>"),
            Err(TranscriptError::DataUnparsable(_))
        ));
    }

    #[test]
    fn test_extract_consent_value() {
        let html = r#"<form action="https://consent.youtube.com/s"><input type="hidden" name="v" value="cb.20210328-17-p0.de+FX+119"></form>"#;
        assert_eq!(
            extract_consent_value(html).as_deref(),
            Some("cb.20210328-17-p0.de+FX+119")
        );
        assert_eq!(extract_consent_value("<form></form>"), None);
    }

    #[test]
    fn test_too_many_requests_means_ip_blocked() {
        assert!(matches!(
            reject_rate_limited(StatusCode::TOO_MANY_REQUESTS),
            Err(TranscriptError::IpBlocked)
        ));
        assert!(reject_rate_limited(StatusCode::OK).is_ok());
        // Other errors are left to error_for_status
        assert!(reject_rate_limited(StatusCode::NOT_FOUND).is_ok());

        let message = TranscriptError::IpBlocked.to_string().to_lowercase();
        assert!(!message.contains("not found") && !message.contains("no transcript"));
    }

    #[test]
    fn test_track_without_base_url_is_unparsable() {
        let renderer = json!({ "captionTracks": [{ "languageCode": "en" }] });
        assert!(matches!(
            build_transcript_list("vid", &renderer),
            Err(TranscriptError::DataUnparsable(_))
        ));
    }

    #[tokio::test]
    async fn test_po_token_tracks_are_rejected_before_any_request() {
        let provider = YoutubeProvider::new(&HttpConfig::default(), &TranscriptConfig::default()).unwrap();
        let track = TranscriptTrack {
            video_id: "vid".into(),
            url: "https://www.youtube.com/api/timedtext?v=vid&lang=en&exp=xpe".into(),
            language: "English".into(),
            language_code: "en".into(),
            is_generated: false,
            is_translatable: false,
        };

        assert!(matches!(
            provider.fetch_track(&track).await,
            Err(TranscriptError::PoTokenRequired)
        ));
    }
}
