use crate::errors::{DomError, Result};
use crate::types::{Politeness, ScrollBlock, Viewport};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub focus: FocusConfig,
    pub scroll: ScrollConfig,
    pub announce: AnnounceConfig,
    pub host: HostConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FocusConfig {
    /// Add `tabindex="-1"` to elements that cannot take focus on their own.
    pub make_focusable: bool,
    pub prevent_scroll: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrollConfig {
    /// Downgrade smooth scrolling to instant when the user prefers reduced motion.
    pub respect_reduced_motion: bool,
    pub block: ScrollBlock,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnounceConfig {
    pub politeness: Politeness,
    pub clear_after_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    pub headless: bool,
    pub viewport: Viewport,
    pub user_agent: Option<String>,
    pub args: Vec<String>,
    pub timeout_ms: u64,
}

impl Config {
    pub fn from_json_str(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
            .map_err(|e| DomError::Config(format!("{}: {}", path.display(), e)))
    }
}

impl Default for FocusConfig {
    fn default() -> Self {
        Self {
            make_focusable: true,
            prevent_scroll: false,
        }
    }
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            respect_reduced_motion: true,
            block: ScrollBlock::Start,
        }
    }
}

impl Default for AnnounceConfig {
    fn default() -> Self {
        Self {
            politeness: Politeness::Polite,
            clear_after_ms: 1000,
        }
    }
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            headless: true,
            viewport: Viewport::default(),
            user_agent: None,
            args: vec![],
            timeout_ms: 30000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = Config::from_json_str(r#"{ "scroll": { "block": "center" } }"#).unwrap();

        assert_eq!(config.scroll.block, ScrollBlock::Center);
        assert!(config.scroll.respect_reduced_motion);
        assert!(config.focus.make_focusable);
        assert_eq!(config.announce.clear_after_ms, 1000);
        assert_eq!(config.host.viewport.width, 1280);
    }

    #[test]
    fn test_assertive_politeness_parses() {
        let config =
            Config::from_json_str(r#"{ "announce": { "politeness": "assertive" } }"#).unwrap();
        assert_eq!(config.announce.politeness, Politeness::Assertive);
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        assert!(Config::from_json_str("{ focus: ").is_err());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = Config::from_json_file("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, DomError::Io(_)));
    }
}
