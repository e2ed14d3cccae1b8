use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config file looked up in the working directory before the user config dir
const LOCAL_CONFIG_FILE: &str = "yt-transcript.yaml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Transcript selection settings
    pub transcript: TranscriptConfig,

    /// HTTP client settings for the provider
    pub http: HttpConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptConfig {
    /// Language codes in order of preference
    pub languages: Vec<String>,

    /// Keep inline formatting tags such as <b> and <i> in caption text
    pub preserve_formatting: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Per-request timeout in seconds
    pub timeout_secs: u64,

    /// Accept-Language header sent to YouTube
    pub accept_language: String,

    /// Optional User-Agent override
    pub user_agent: Option<String>,
}

impl Default for TranscriptConfig {
    fn default() -> Self {
        Self {
            languages: ["ja", "ja-JP", "en", "en-US"]
                .iter()
                .map(|code| code.to_string())
                .collect(),
            preserve_formatting: false,
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            accept_language: "en-US".to_string(),
            user_agent: None,
        }
    }
}

impl Config {
    /// Load configuration from an explicit path, the local file, the user config
    /// dir, or fall back to defaults when none of them exist.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => Self::discover(),
        };

        let Some(path) = path else {
            tracing::debug!("No config file found, using defaults");
            return Ok(Self::default());
        };

        Self::load_from(&path)
    }

    /// Load and validate a specific config file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs_err::read_to_string(path).context("Failed to read config file")?;

        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        config.validate()?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Find the first existing config file
    fn discover() -> Option<PathBuf> {
        let local_config = PathBuf::from(LOCAL_CONFIG_FILE);
        if local_config.exists() {
            return Some(local_config);
        }

        dirs::config_dir()
            .map(|dir| dir.join("yt-transcript").join("config.yaml"))
            .filter(|path| path.exists())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.transcript.languages.is_empty() {
            anyhow::bail!("transcript.languages must list at least one language code");
        }

        if self.transcript.languages.iter().any(|code| code.trim().is_empty()) {
            anyhow::bail!("transcript.languages must not contain blank codes");
        }

        if self.http.timeout_secs == 0 {
            anyhow::bail!("http.timeout_secs must be greater than zero");
        }

        Ok(())
    }

    /// Replace the language preference, e.g. from the command line
    pub fn with_languages(mut self, languages: Vec<String>) -> Result<Self> {
        self.transcript.languages = languages;
        self.validate()?;
        Ok(self)
    }
}
