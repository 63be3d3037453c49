use async_trait::async_trait;
use std::sync::Mutex;

use super::http::{HttpClient, HttpRequest, HttpResponse, TransportError};

/// A mock transport that returns pre-configured responses and records every request
pub struct MockHttpClient {
    responses: Mutex<Vec<Result<HttpResponse, TransportError>>>,
    requests: Mutex<Vec<(String, HttpRequest)>>,
}

impl MockHttpClient {
    /// Create a new mock transport with a sequence of responses
    pub fn new(responses: Vec<Result<HttpResponse, TransportError>>) -> Self {
        Self {
            responses: Mutex::new(responses),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Every `(url, request)` seen so far, in order
    pub fn requests(&self) -> Vec<(String, HttpRequest)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpClient for MockHttpClient {
    async fn post(&self, url: &str, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests
            .lock()
            .unwrap()
            .push((url.to_string(), request));

        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Err(TransportError::new("no more mock responses configured"))
        } else {
            responses.remove(0)
        }
    }
}
