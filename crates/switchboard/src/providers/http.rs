use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

/// A POST the transport should perform
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub json: Value,
    pub headers: Vec<(String, String)>,
    pub timeout: Duration,
}

/// Whatever the upstream answered, success or not
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    /// Decoded JSON body; a non-JSON body is carried as a JSON string
    pub body: Value,
}

impl HttpResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body,
        }
    }
}

/// Failure below the HTTP layer: no response was received
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("transport failure: {reason}")]
pub struct TransportError {
    pub reason: String,
}

impl TransportError {
    pub fn new<S: Into<String>>(reason: S) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// The network capability the adapters delegate to
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn post(&self, url: &str, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Default transport backed by reqwest
#[derive(Debug, Clone, Default)]
pub struct ReqwestClient {
    client: Client,
}

impl ReqwestClient {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn post(&self, url: &str, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = self
            .client
            .post(url)
            .timeout(request.timeout)
            .json(&request.json);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| TransportError::new(e.without_url().to_string()))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();

        let text = response
            .text()
            .await
            .map_err(|e| TransportError::new(e.without_url().to_string()))?;
        let body = serde_json::from_str(&text).unwrap_or(Value::String(text));

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
