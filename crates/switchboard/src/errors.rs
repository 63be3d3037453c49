use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum_macros::{Display, EnumString};
use thiserror::Error;

/// Category of a failed provider call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
pub enum ErrorKind {
    #[strum(serialize = "validation_error")]
    #[serde(rename = "validation_error")]
    Validation,
    #[strum(serialize = "provider_error")]
    #[serde(rename = "provider_error")]
    Provider,
    #[strum(serialize = "network_error")]
    #[serde(rename = "network_error")]
    Network,
    #[strum(serialize = "authentication_error")]
    #[serde(rename = "authentication_error")]
    Authentication,
    #[strum(serialize = "configuration_error")]
    #[serde(rename = "configuration_error")]
    Configuration,
}

/// A malformed message or message list
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct ValidationError(pub String);

impl ValidationError {
    pub fn new<S: Into<String>>(message: S) -> Self {
        Self(message.into())
    }
}

/// Bad call options or missing deployment setup
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct ConfigurationError(pub String);

impl ConfigurationError {
    pub fn new<S: Into<String>>(message: S) -> Self {
        Self(message.into())
    }
}

/// Failure to map a `"provider/model"` string onto an adapter
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("invalid_model_format: expected \"provider/model\", got \"{0}\"")]
    InvalidModelFormat(String),

    #[error("unknown_provider: {0}")]
    UnknownProvider(String),
}

/// Error raised once a provider has been selected
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[error("{kind} ({provider}): {message}")]
pub struct Error {
    pub kind: ErrorKind,
    pub message: String,
    pub provider: String,
    pub details: Map<String, Value>,
}

impl Error {
    pub fn new<P: Into<String>, M: Into<String>>(kind: ErrorKind, provider: P, message: M) -> Self {
        Self {
            kind,
            message: message.into(),
            provider: provider.into(),
            details: Map::new(),
        }
    }

    pub fn validation<P: Into<String>, M: Into<String>>(provider: P, message: M) -> Self {
        Self::new(ErrorKind::Validation, provider, message)
    }

    pub fn configuration<P: Into<String>, M: Into<String>>(provider: P, message: M) -> Self {
        Self::new(ErrorKind::Configuration, provider, message)
    }

    pub fn provider<P: Into<String>, M: Into<String>>(provider: P, message: M) -> Self {
        Self::new(ErrorKind::Provider, provider, message)
    }

    pub fn network<P: Into<String>, M: Into<String>>(provider: P, message: M) -> Self {
        Self::new(ErrorKind::Network, provider, message)
    }

    pub fn authentication<P: Into<String>, M: Into<String>>(provider: P, message: M) -> Self {
        Self::new(ErrorKind::Authentication, provider, message)
    }

    /// Attach a detail entry, replacing any previous value under `key`
    pub fn with_detail<K: Into<String>, V: Into<Value>>(mut self, key: K, value: V) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    /// Upstream HTTP status, when the error came from a response
    pub fn status(&self) -> Option<u16> {
        self.details
            .get("status")
            .and_then(Value::as_u64)
            .and_then(|status| u16::try_from(status).ok())
    }

    /// Build a validation error tagged with the provider that was selected
    pub fn from_validation<P: Into<String>>(provider: P, err: ValidationError) -> Self {
        Self::validation(provider, err.0)
    }

    pub fn from_configuration<P: Into<String>>(provider: P, err: ConfigurationError) -> Self {
        Self::configuration(provider, err.0)
    }
}

/// Terminal error from [`crate::Switchboard::complete`]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompleteError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Provider(#[from] Error),
}

impl CompleteError {
    /// The provider error, if a provider was ever selected
    pub fn as_provider_error(&self) -> Option<&Error> {
        match self {
            CompleteError::Provider(err) => Some(err),
            CompleteError::Registry(_) => None,
        }
    }
}

pub type ProviderResult<T> = Result<T, Error>;
