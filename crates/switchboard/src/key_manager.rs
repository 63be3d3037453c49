use std::collections::HashMap;
use std::env;

#[cfg(test)]
use mockall::automock;

use crate::providers::factory::ProviderType;

/// Source of per-provider API credentials, consulted at call time
pub trait KeyStore: Send + Sync {
    fn api_key(&self, provider: ProviderType) -> Option<String>;
}

#[cfg_attr(test, automock)]
pub trait Environment: Send + Sync {
    fn get_var(&self, key: &str) -> Result<String, env::VarError>;
}

// Implement the trait for the actual environment
pub struct RealEnvironment;

impl Environment for RealEnvironment {
    fn get_var(&self, key: &str) -> Result<String, env::VarError> {
        env::var(key)
    }
}

/// Environment variables consulted for a provider, in order
pub fn env_var_names(provider: ProviderType) -> &'static [&'static str] {
    match provider {
        ProviderType::OpenAi => &["OPENAI_API_KEY"],
        ProviderType::Anthropic => &["ANTHROPIC_API_KEY"],
        ProviderType::Google => &["GEMINI_API_KEY", "GOOGLE_API_KEY"],
        ProviderType::Groq => &["GROQ_API_KEY"],
    }
}

/// Reads credentials from process environment variables
pub struct EnvKeyStore<E: Environment = RealEnvironment> {
    env: E,
}

impl EnvKeyStore<RealEnvironment> {
    pub fn new() -> Self {
        Self {
            env: RealEnvironment,
        }
    }
}

impl Default for EnvKeyStore<RealEnvironment> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Environment> EnvKeyStore<E> {
    pub fn with_environment(env: E) -> Self {
        Self { env }
    }
}

impl<E: Environment> KeyStore for EnvKeyStore<E> {
    fn api_key(&self, provider: ProviderType) -> Option<String> {
        env_var_names(provider)
            .iter()
            .filter_map(|name| self.env.get_var(name).ok())
            .find(|value| !value.trim().is_empty())
    }
}

/// Fixed in-memory credentials
#[derive(Debug, Clone, Default)]
pub struct StaticKeyStore {
    keys: HashMap<ProviderType, String>,
}

impl StaticKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key<S: Into<String>>(mut self, provider: ProviderType, key: S) -> Self {
        self.keys.insert(provider, key.into());
        self
    }
}

impl KeyStore for StaticKeyStore {
    fn api_key(&self, provider: ProviderType) -> Option<String> {
        self.keys
            .get(&provider)
            .filter(|key| !key.trim().is_empty())
            .cloned()
    }
}
