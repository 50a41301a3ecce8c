//! Configuration management

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::application::errors::ConfigError;
use crate::application::messaging::DispatchOptions;

/// Bot configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Config {
    pub bot: BotConfig,
    pub telegram: TelegramConfig,
    pub dispatch: DispatchConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct BotConfig {
    pub name: String,
    pub database: PathBuf,
    /// Telegram ids seeded as owners at boot
    pub owners: Vec<i64>,
    pub notify_unknown_commands: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct TelegramConfig {
    pub token: Option<String>,
    /// Long-poll timeout in seconds
    pub poll_timeout: u64,
    pub debug: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct DispatchConfig {
    pub concurrent: bool,
    pub handler_timeout_seconds: Option<u64>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: "crewbot".to_string(),
            database: PathBuf::from("crewbot.db"),
            owners: Vec::new(),
            notify_unknown_commands: true,
        }
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            token: None,
            poll_timeout: 60,
            debug: false,
        }
    }
}

impl Config {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path)
            .map_err(|e| ConfigError::Parse(format!("Failed to read config: {}", e)))?;

        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(content)
            .map_err(|e| ConfigError::Parse(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        serde_yaml::to_string(self)
            .map_err(|e| ConfigError::Parse(format!("Failed to serialize config: {}", e)))
    }

    /// Apply `BOT_TOKEN`, `BOT_DATABASE` and `BOT_DEBUG`
    pub fn apply_env(&mut self) {
        if let Ok(token) = std::env::var("BOT_TOKEN") {
            if !token.trim().is_empty() {
                self.telegram.token = Some(token.trim().to_string());
            }
        }

        if let Ok(path) = std::env::var("BOT_DATABASE") {
            if !path.is_empty() {
                self.bot.database = PathBuf::from(path);
            }
        }

        if let Ok(debug) = std::env::var("BOT_DEBUG") {
            self.telegram.debug = matches!(debug.to_lowercase().as_str(), "1" | "true" | "yes");
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.bot.name.trim().is_empty() {
            return Err(ConfigError::MissingField("bot.name".to_string()));
        }
        if self.telegram.poll_timeout == 0 {
            return Err(ConfigError::InvalidValue(
                "telegram.poll-timeout must be positive".to_string(),
            ));
        }
        if self.dispatch.handler_timeout_seconds == Some(0) {
            return Err(ConfigError::InvalidValue(
                "dispatch.handler-timeout-seconds must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn dispatch_options(&self) -> DispatchOptions {
        DispatchOptions {
            notify_unknown: self.bot.notify_unknown_commands,
            concurrent: self.dispatch.concurrent,
            handler_timeout: self.dispatch.handler_timeout_seconds.map(Duration::from_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config = Config::from_yaml(
            r#"
bot:
  owners: [42]
telegram:
  token: "123:abc"
dispatch:
  handler-timeout-seconds: 5
"#,
        )
        .unwrap();

        assert_eq!(config.bot.name, "crewbot");
        assert_eq!(config.bot.owners, vec![42]);
        assert_eq!(config.telegram.token.as_deref(), Some("123:abc"));
        assert_eq!(config.telegram.poll_timeout, 60);

        let options = config.dispatch_options();
        assert!(options.notify_unknown);
        assert!(!options.concurrent);
        assert_eq!(options.handler_timeout, Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            Config::from_yaml("telegram:\n  poll-timeout: 0\n"),
            Err(ConfigError::InvalidValue(_))
        ));
        assert!(matches!(
            Config::from_yaml("bot:\n  name: \"\"\n"),
            Err(ConfigError::MissingField(_))
        ));
        assert!(matches!(Config::from_yaml("bot: ["), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_default_config_serializes() {
        let yaml = Config::default().to_yaml().unwrap();
        assert!(yaml.contains("notify-unknown-commands: true"));
        assert!(Config::from_yaml(&yaml).is_ok());
    }
}
