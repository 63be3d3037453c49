use std::sync::Arc;
use strum_macros::{Display, EnumIter, EnumString};
use tracing::debug;

use super::{
    anthropic::AnthropicProvider, base::Provider, google::GoogleProvider, groq::GroqProvider,
    http::HttpClient, openai::OpenAiProvider,
};
use crate::errors::RegistryError;
use crate::key_manager::KeyStore;
use crate::settings::Settings;

#[derive(EnumIter, EnumString, Display, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[strum(serialize_all = "lowercase")]
pub enum ProviderType {
    OpenAi,
    Anthropic,
    Google,
    Groq,
}

impl ProviderType {
    /// Name used as the model-string prefix and in error reports
    pub fn name(&self) -> &'static str {
        match self {
            ProviderType::OpenAi => "openai",
            ProviderType::Anthropic => "anthropic",
            ProviderType::Google => "google",
            ProviderType::Groq => "groq",
        }
    }
}

/// Split `"provider/model"` on the first `/` and look the provider up
pub fn resolve(model: &str) -> Result<(ProviderType, &str), RegistryError> {
    let (prefix, bare_model) = model
        .split_once('/')
        .ok_or_else(|| RegistryError::InvalidModelFormat(model.to_string()))?;

    let provider_type = prefix
        .parse::<ProviderType>()
        .map_err(|_| RegistryError::UnknownProvider(prefix.to_string()))?;

    debug!(provider = provider_type.name(), model = bare_model, "resolved model");
    Ok((provider_type, bare_model))
}

pub fn get_provider(
    provider_type: ProviderType,
    client: Arc<dyn HttpClient>,
    keys: Arc<dyn KeyStore>,
    settings: &Settings,
) -> Box<dyn Provider> {
    let host = settings.host(provider_type).to_string();
    match provider_type {
        ProviderType::OpenAi => Box::new(OpenAiProvider::new(client, keys, host)),
        ProviderType::Anthropic => Box::new(AnthropicProvider::new(client, keys, host)),
        ProviderType::Google => Box::new(GoogleProvider::new(client, keys, host)),
        ProviderType::Groq => Box::new(GroqProvider::new(client, keys, host)),
    }
}
