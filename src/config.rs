//! Configuration loading and management

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::capture::AudioInputMode;
use crate::transcript::ActionSpec;

const DEFAULT_PLACEHOLDER: &str = "Enter a message...";

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the Unix domain socket for IPC
    pub socket_path: PathBuf,

    /// Directory for runtime data
    pub data_dir: PathBuf,

    /// Defaults for widgets attached without their own configuration
    pub widget: WidgetConfig,
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> Result<Self> {
        let home = std::env::var("HOME").context("HOME is not set")?;
        let data_dir = PathBuf::from(&home)
            .join(".local")
            .join("share")
            .join("chat-widget-engine");

        let socket_path = match std::env::var_os("CHAT_WIDGET_SOCKET") {
            Some(path) => PathBuf::from(path),
            None => data_dir.join("daemon.sock"),
        };

        Ok(Self {
            socket_path,
            data_dir,
            widget: WidgetConfig::from_env(),
        })
    }

    /// Ensure data directory exists
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)
            .with_context(|| format!("failed to create {}", self.data_dir.display()))?;
        Ok(())
    }
}

/// Static per-widget configuration, read once at attach time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WidgetConfig {
    /// Icon applied to assistant messages that carry none
    pub icon_assistant: Option<String>,

    /// Container default for message action enablement
    pub message_actions: ActionSpec,

    pub audio_input: AudioInputMode,

    /// Input placeholder text
    pub placeholder: String,

    /// URL of the embedding page, used to tell external links apart
    pub page_origin: Option<String>,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            icon_assistant: None,
            message_actions: ActionSpec::None,
            audio_input: AudioInputMode::Disabled,
            placeholder: DEFAULT_PLACEHOLDER.to_string(),
            page_origin: None,
        }
    }
}

impl WidgetConfig {
    /// Defaults overridden from `CHAT_WIDGET_*` variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(icon) = lookup("CHAT_WIDGET_ICON").filter(|s| !s.trim().is_empty()) {
            config.icon_assistant = Some(icon);
        }
        if let Some(actions) = lookup("CHAT_WIDGET_ACTIONS") {
            config.message_actions = ActionSpec::parse(&actions);
        }
        if let Some(mode) = lookup("CHAT_WIDGET_AUDIO_INPUT") {
            config.audio_input = AudioInputMode::parse(&mode);
        }
        if let Some(placeholder) = lookup("CHAT_WIDGET_PLACEHOLDER") {
            config.placeholder = placeholder;
        }
        config.page_origin = lookup("CHAT_WIDGET_ORIGIN");
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::ActionKind;

    #[test]
    fn test_config_load() {
        let config = Config::load().unwrap();
        assert!(config.data_dir.to_string_lossy().contains("chat-widget-engine"));
    }

    #[test]
    fn test_widget_config_from_lookup() {
        let config = WidgetConfig::from_lookup(|key| match key {
            "CHAT_WIDGET_ICON" => Some("<svg/>".into()),
            "CHAT_WIDGET_ACTIONS" => Some("copy,share".into()),
            "CHAT_WIDGET_AUDIO_INPUT" => Some("raw".into()),
            _ => None,
        });
        assert_eq!(config.icon_assistant.as_deref(), Some("<svg/>"));
        assert!(config.message_actions.resolve().contains(ActionKind::Share));
        assert_eq!(config.audio_input, AudioInputMode::Raw);
        assert_eq!(config.placeholder, DEFAULT_PLACEHOLDER);
    }

    #[test]
    fn test_widget_config_deserializes_with_defaults() {
        let config: WidgetConfig =
            serde_json::from_str(r#"{"message_actions":"all","audio_input":"transcribe"}"#).unwrap();
        assert_eq!(config.message_actions, ActionSpec::All);
        assert_eq!(config.audio_input, AudioInputMode::Transcribe);
        assert_eq!(config.icon_assistant, None);
    }
}
