use anyhow::Result;
use config::{Config, Environment};
use serde::Deserialize;

use crate::providers::anthropic::ANTHROPIC_HOST;
use crate::providers::factory::ProviderType;
use crate::providers::google::GOOGLE_HOST;
use crate::providers::groq::GROQ_HOST;
use crate::providers::openai::OPENAI_HOST;

pub const ENV_PREFIX: &str = "SWITCHBOARD";

fn default_openai_host() -> String {
    OPENAI_HOST.to_string()
}

fn default_anthropic_host() -> String {
    ANTHROPIC_HOST.to_string()
}

fn default_google_host() -> String {
    GOOGLE_HOST.to_string()
}

fn default_groq_host() -> String {
    GROQ_HOST.to_string()
}

/// Base URLs for each vendor, e.g. `SWITCHBOARD_OPENAI_HOST`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Settings {
    #[serde(default = "default_openai_host")]
    pub openai_host: String,
    #[serde(default = "default_anthropic_host")]
    pub anthropic_host: String,
    #[serde(default = "default_google_host")]
    pub google_host: String,
    #[serde(default = "default_groq_host")]
    pub groq_host: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            openai_host: default_openai_host(),
            anthropic_host: default_anthropic_host(),
            google_host: default_google_host(),
            groq_host: default_groq_host(),
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::load(Environment::with_prefix(ENV_PREFIX))
    }

    fn load(environment: Environment) -> Result<Self> {
        let config = Config::builder().add_source(environment).build()?;

        let settings: Settings = config.try_deserialize()?;
        Ok(settings)
    }

    pub fn host(&self, provider: ProviderType) -> &str {
        match provider {
            ProviderType::OpenAi => &self.openai_host,
            ProviderType::Anthropic => &self.anthropic_host,
            ProviderType::Google => &self.google_host,
            ProviderType::Groq => &self.groq_host,
        }
    }

    pub fn with_host<S: Into<String>>(mut self, provider: ProviderType, host: S) -> Self {
        let host = host.into();
        match provider {
            ProviderType::OpenAi => self.openai_host = host,
            ProviderType::Anthropic => self.anthropic_host = host,
            ProviderType::Google => self.google_host = host,
            ProviderType::Groq => self.groq_host = host,
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn environment(vars: &[(&str, &str)]) -> Environment {
        let source: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Environment::with_prefix(ENV_PREFIX).source(Some(source))
    }

    #[test]
    fn test_defaults_without_environment() {
        let settings = Settings::load(environment(&[])).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.host(ProviderType::Groq), "https://api.groq.com");
    }

    #[test]
    fn test_host_override_from_environment() {
        let settings = Settings::load(environment(&[
            ("SWITCHBOARD_ANTHROPIC_HOST", "http://localhost:8080"),
            ("UNRELATED_OPENAI_HOST", "http://ignored"),
        ]))
        .unwrap();
        assert_eq!(settings.host(ProviderType::Anthropic), "http://localhost:8080");
        assert_eq!(settings.host(ProviderType::OpenAi), OPENAI_HOST);
    }

    #[test]
    fn test_with_host() {
        let settings = Settings::default().with_host(ProviderType::Google, "http://proxy");
        assert_eq!(settings.host(ProviderType::Google), "http://proxy");
    }
}
