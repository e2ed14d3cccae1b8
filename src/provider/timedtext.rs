use quick_xml::escape::resolve_html5_entity;
use regex::{Captures, Regex};
use serde::Deserialize;
use std::sync::LazyLock;

use super::TranscriptSnippet;
use crate::TranscriptError;

/// Tags kept when formatting is preserved
const FORMATTING_TAGS: &[&str] = &[
    "strong", "em", "b", "i", "mark", "small", "del", "ins", "sub", "sup",
];

static TAG_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"</?([A-Za-z][A-Za-z0-9]*)\b[^>]*>").unwrap());

static ENTITY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&(#[0-9]+|#[xX][0-9a-fA-F]+|[A-Za-z][A-Za-z0-9]*);").unwrap());

/// YouTube timedtext document: `<transcript><text start=".." dur="..">..</text></transcript>`
#[derive(Debug, Deserialize)]
struct TimedText {
    #[serde(rename = "text", default)]
    lines: Vec<TimedTextLine>,
}

#[derive(Debug, Deserialize)]
struct TimedTextLine {
    #[serde(rename = "@start")]
    start: f64,
    #[serde(rename = "@dur", default)]
    duration: f64,
    #[serde(rename = "$text", default)]
    text: Option<String>,
}

/// Parse a timedtext XML body into snippets, in document order.
pub fn parse(xml: &str, preserve_formatting: bool) -> Result<Vec<TranscriptSnippet>, TranscriptError> {
    let document: TimedText = quick_xml::de::from_str(xml)?;

    let snippets = document
        .lines
        .into_iter()
        .filter_map(|line| {
            let raw = line.text.filter(|t| !t.is_empty())?;
            Some(TranscriptSnippet {
                text: clean_text(&raw, preserve_formatting),
                start: line.start,
                duration: line.duration,
            })
        })
        .collect();

    Ok(snippets)
}

// Caption text arrives escaped twice; the XML parser undoes the first layer.
fn clean_text(raw: &str, preserve_formatting: bool) -> String {
    let unescaped = unescape_entities(raw);

    TAG_PATTERN.replace_all(&unescaped, |caps: &Captures| {
        let name = caps[1].to_ascii_lowercase();
        if preserve_formatting && FORMATTING_TAGS.contains(&name.as_str()) {
            caps[0].to_string()
        } else {
            String::new()
        }
    })
    .into_owned()
}

/// Decode every recognizable entity; a bare `&` or unknown name stays literal.
fn unescape_entities(text: &str) -> String {
    ENTITY_PATTERN
        .replace_all(text, |caps: &Captures| {
            let entity = &caps[1];
            let decoded = match entity.strip_prefix('#') {
                Some(number) => decode_char_reference(number).map(String::from),
                None => resolve_html5_entity(entity).map(str::to_string),
            };
            decoded.unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

fn decode_char_reference(number: &str) -> Option<char> {
    let code = match number.strip_prefix(['x', 'X']) {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None => number.parse().ok()?,
    };
    char::from_u32(code).filter(|c| *c != '\0')
}
