use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt;
use std::time::Duration;

use crate::errors::ConfigurationError;
use crate::models::tool::ToolDefinition;

pub const DEFAULT_TEMPERATURE: f64 = 0.0;
pub const DEFAULT_MAX_TOKENS: u32 = 4000;
pub const DEFAULT_RECEIVE_TIMEOUT_MS: u64 = 300_000;
pub const DEFAULT_RETRY_COUNT: u32 = 3;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 1000;

/// Options a caller may pass with a single call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CallOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receive_timeout: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_delay: Option<u64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,
}

impl CallOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build options from an untyped map; unknown keys are ignored
    pub fn from_map(options: &Map<String, Value>) -> Result<Self, ConfigurationError> {
        serde_json::from_value(Value::Object(options.clone()))
            .map_err(|e| ConfigurationError::new(format!("invalid call options: {}", e)))
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_top_p(mut self, top_p: f64) -> Self {
        self.top_p = Some(top_p);
        self
    }

    pub fn with_receive_timeout(mut self, receive_timeout_ms: u64) -> Self {
        self.receive_timeout = Some(receive_timeout_ms);
        self
    }

    pub fn with_retry_count(mut self, retry_count: u32) -> Self {
        self.retry_count = Some(retry_count);
        self
    }

    pub fn with_retry_delay(mut self, retry_delay_ms: u64) -> Self {
        self.retry_delay = Some(retry_delay_ms);
        self
    }

    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }
}

/// Values an adapter prefers over the global defaults
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProviderDefaults {
    pub max_tokens: Option<u32>,
}

/// Settings resolved for one call; immutable once built
#[derive(Clone, PartialEq)]
pub struct Config {
    pub model: String,
    pub temperature: f64,
    pub max_tokens: Option<u32>,
    pub top_p: Option<f64>,
    pub tools: Vec<ToolDefinition>,
    /// Milliseconds
    pub receive_timeout: u64,
    pub retry_count: u32,
    /// Milliseconds
    pub retry_delay: u64,
    pub host: String,
    pub api_key: String,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("top_p", &self.top_p)
            .field("tools", &self.tools)
            .field("receive_timeout", &self.receive_timeout)
            .field("retry_count", &self.retry_count)
            .field("retry_delay", &self.retry_delay)
            .field("host", &self.host)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl Config {
    /// Resolve options against provider and global defaults, then validate
    ///
    /// The credential is left empty; adapters attach it with [`Config::with_api_key`].
    pub fn new(
        model: &str,
        options: &CallOptions,
        defaults: &ProviderDefaults,
        host: &str,
    ) -> Result<Self, ConfigurationError> {
        if model.trim().is_empty() {
            return Err(ConfigurationError::new("model is required"));
        }

        let temperature = options
            .temperature
            .unwrap_or(DEFAULT_TEMPERATURE);
        if !temperature.is_finite() || temperature < 0.0 {
            return Err(ConfigurationError::new(format!(
                "temperature must be >= 0, got {}",
                temperature
            )));
        }

        let max_tokens = options
            .max_tokens
            .or(defaults.max_tokens)
            .or(Some(DEFAULT_MAX_TOKENS));
        if max_tokens == Some(0) {
            return Err(ConfigurationError::new("max_tokens must be > 0"));
        }

        let top_p = options.top_p;
        if let Some(top_p) = top_p {
            if !(0.0..=1.0).contains(&top_p) {
                return Err(ConfigurationError::new(format!(
                    "top_p must be between 0 and 1, got {}",
                    top_p
                )));
            }
        }

        let mut names = HashSet::new();
        for tool in &options.tools {
            if tool.name.is_empty() {
                return Err(ConfigurationError::new("tool name must not be empty"));
            }
            if !names.insert(tool.name.as_str()) {
                return Err(ConfigurationError::new(format!(
                    "Duplicate tool name: {}",
                    tool.name
                )));
            }
        }

        Ok(Self {
            model: model.to_string(),
            temperature,
            max_tokens,
            top_p,
            tools: options.tools.clone(),
            receive_timeout: options
                .receive_timeout
                .unwrap_or(DEFAULT_RECEIVE_TIMEOUT_MS),
            retry_count: options.retry_count.unwrap_or(DEFAULT_RETRY_COUNT),
            retry_delay: options.retry_delay.unwrap_or(DEFAULT_RETRY_DELAY_MS),
            host: host.trim_end_matches('/').to_string(),
            api_key: String::new(),
        })
    }

    pub fn with_api_key<S: Into<String>>(mut self, api_key: S) -> Self {
        self.api_key = api_key.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.receive_timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn resolve(options: CallOptions) -> Result<Config, ConfigurationError> {
        Config::new("openai/gpt-4o", &options, &ProviderDefaults::default(), "https://x/")
    }

    #[test]
    fn test_global_defaults() {
        let config = resolve(CallOptions::new()).unwrap();
        assert_eq!(config.temperature, 0.0);
        assert_eq!(config.max_tokens, Some(4000));
        assert_eq!(config.top_p, None);
        assert_eq!(config.receive_timeout, 300_000);
        assert_eq!(config.retry_count, 3);
        assert_eq!(config.retry_delay, 1000);
        assert_eq!(config.host, "https://x");
        assert_eq!(config.timeout(), Duration::from_secs(300));
    }

    #[test]
    fn test_precedence() {
        let defaults = ProviderDefaults {
            max_tokens: Some(4096),
        };
        let config = Config::new("m", &CallOptions::new(), &defaults, "h").unwrap();
        assert_eq!(config.max_tokens, Some(4096));

        let config = Config::new(
            "m",
            &CallOptions::new().with_max_tokens(64).with_temperature(0.9),
            &defaults,
            "h",
        )
        .unwrap();
        assert_eq!(config.temperature, 0.9);
        assert_eq!(config.max_tokens, Some(64));
    }

    #[test]
    fn test_explicit_timing_options() {
        let config = resolve(
            CallOptions::new()
                .with_receive_timeout(1500)
                .with_retry_count(0)
                .with_retry_delay(250),
        )
        .unwrap();
        assert_eq!(config.timeout(), Duration::from_millis(1500));
        assert_eq!(config.retry_count, 0);
        assert_eq!(config.retry_delay, 250);
    }

    #[test]
    fn test_validation_failures() {
        assert_eq!(
            Config::new("", &CallOptions::new(), &ProviderDefaults::default(), "h").unwrap_err(),
            ConfigurationError::new("model is required")
        );
        assert!(resolve(CallOptions::new().with_temperature(-0.1))
            .unwrap_err()
            .to_string()
            .contains("temperature"));
        assert!(resolve(CallOptions::new().with_max_tokens(0))
            .unwrap_err()
            .to_string()
            .contains("max_tokens"));
        assert!(resolve(CallOptions::new().with_top_p(1.5))
            .unwrap_err()
            .to_string()
            .contains("top_p"));
    }

    #[test]
    fn test_duplicate_tool_names() {
        let tool = ToolDefinition::new("lookup", "Look it up", json!({"type": "object"}));
        let err = resolve(CallOptions::new().with_tools(vec![tool.clone(), tool])).unwrap_err();
        assert!(err.to_string().contains("Duplicate tool name"));
    }

    #[test]
    fn test_from_map() {
        let options = json!({
            "temperature": 0.5,
            "max_tokens": 100,
            "tools": [{"name": "f"}],
            "unknown": true
        });
        let options = CallOptions::from_map(options.as_object().unwrap()).unwrap();
        assert_eq!(options.temperature, Some(0.5));
        assert_eq!(options.max_tokens, Some(100));
        assert_eq!(options.tools[0].name, "f");

        let bad = json!({"max_tokens": "lots"});
        assert!(CallOptions::from_map(bad.as_object().unwrap()).is_err());
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = resolve(CallOptions::new()).unwrap().with_api_key("sk-secret");
        let debug = format!("{:?}", config);
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("<redacted>"));
    }
}
