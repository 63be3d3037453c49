use anyhow::Result;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use crate::errors::{CompleteError, Error};
use crate::key_manager::{EnvKeyStore, KeyStore};
use crate::models::message::Message;
use crate::models::validate::validate_messages;
use crate::providers::configs::CallOptions;
use crate::providers::factory::{get_provider, resolve};
use crate::providers::http::{HttpClient, ReqwestClient};
use crate::settings::Settings;

/// Routes `"provider/model"` calls to the matching adapter
///
/// Holds no per-call state, so one instance can serve concurrent callers.
#[derive(Clone)]
pub struct Switchboard {
    client: Arc<dyn HttpClient>,
    keys: Arc<dyn KeyStore>,
    settings: Settings,
}

impl Switchboard {
    pub fn new(client: Arc<dyn HttpClient>, keys: Arc<dyn KeyStore>, settings: Settings) -> Self {
        Self {
            client,
            keys,
            settings,
        }
    }

    /// Reqwest transport, keys from the process environment and host settings
    /// from `SWITCHBOARD_*` variables
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(
            Arc::new(ReqwestClient::new()),
            Arc::new(EnvKeyStore::new()),
            Settings::from_env()?,
        ))
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Run one completion from untyped caller messages
    pub async fn complete(
        &self,
        model: &str,
        messages: &[Value],
        options: CallOptions,
    ) -> Result<Message, CompleteError> {
        self.run(model, Input::Raw(messages), &options).await
    }

    /// Same pipeline for messages that are already canonical
    pub async fn complete_messages(
        &self,
        model: &str,
        messages: &[Message],
        options: CallOptions,
    ) -> Result<Message, CompleteError> {
        self.run(model, Input::Typed(messages), &options).await
    }

    async fn run(
        &self,
        model: &str,
        input: Input<'_>,
        options: &CallOptions,
    ) -> Result<Message, CompleteError> {
        let (provider_type, _) = resolve(model)?;
        let provider = get_provider(
            provider_type,
            self.client.clone(),
            self.keys.clone(),
            &self.settings,
        );

        let config = provider.init(model, options)?;

        let validated;
        let messages = match input {
            Input::Typed(messages) => messages,
            Input::Raw(raw) => {
                validated = validate_messages(raw)
                    .map_err(|err| Error::from_validation(provider.name(), err))?;
                validated.as_slice()
            }
        };

        let request = provider.format_request(&config, messages)?;
        let response = provider.call(&config, request).await?;
        let message = provider.parse_response(response)?;

        debug!(
            provider = provider.name(),
            tool_calls = message.tool_calls().len(),
            "completion finished"
        );
        Ok(message)
    }
}

enum Input<'a> {
    Raw(&'a [Value]),
    Typed(&'a [Message]),
}
