use crate::authentication::TokenSource;
use crate::error::{from_reqwest_error, transport_error_from_status, VertexError};
use genmedia_jobs::{OperationEndpoints, Transport, TransportError};
use log::trace;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::Method;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Addresses one publisher model on the Vertex AI REST API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexEndpoint {
    pub api_host: String,
    pub api_version: String,
    pub project_id: String,
    pub location: String,
    pub model: String,
}

impl VertexEndpoint {
    pub fn new(
        project_id: impl Into<String>,
        location: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        let location = location.into();
        Self {
            api_host: format!("https://{location}-aiplatform.googleapis.com"),
            api_version: "v1".to_string(),
            project_id: project_id.into(),
            location,
            model: model.into(),
        }
    }

    pub fn with_api_host(mut self, api_host: impl Into<String>) -> Self {
        self.api_host = api_host.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn model_url(&self) -> String {
        format!(
            "{}/{}/projects/{}/locations/{}/publishers/google/models/{}",
            self.api_host, self.api_version, self.project_id, self.location, self.model
        )
    }

    pub fn predict_long_running(&self) -> String {
        format!("{}:predictLongRunning", self.model_url())
    }

    pub fn fetch_predict_operation(&self) -> String {
        format!("{}:fetchPredictOperation", self.model_url())
    }

    pub fn predict(&self) -> String {
        format!("{}:predict", self.model_url())
    }

    pub fn generate_content(&self) -> String {
        format!("{}:generateContent", self.model_url())
    }

    pub fn operations(&self) -> OperationEndpoints {
        OperationEndpoints::new(self.predict_long_running(), self.fetch_predict_operation())
    }
}

/// Authenticated JSON-over-HTTPS transport for Vertex AI and Cloud Storage.
#[derive(Clone)]
pub struct VertexTransport {
    client: Client,
    tokens: Arc<dyn TokenSource>,
}

impl VertexTransport {
    pub fn new(tokens: Arc<dyn TokenSource>, timeout: Duration) -> Result<Self, VertexError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| from_reqwest_error("Failed to create HTTP client", err))?;
        Ok(Self { client, tokens })
    }

    pub fn http(&self) -> &Client {
        &self.client
    }

    /// Starts a request carrying a fresh bearer token.
    pub fn authorized(&self, method: Method, url: &str) -> Result<RequestBuilder, TransportError> {
        let token = self.tokens.access_token()?;
        Ok(self
            .client
            .request(method, url)
            .header("Authorization", format!("Bearer {token}")))
    }

    pub fn post_json(&self, url: &str, payload: &Value) -> Result<Value, TransportError> {
        trace!("POST {url}");

        let response = self
            .authorized(Method::POST, url)?
            .header("Content-Type", "application/json")
            .json(payload)
            .send()
            .map_err(|err| from_reqwest_error("Request failed", err))?;

        parse_response(response)
    }
}

impl Transport for VertexTransport {
    fn start_operation(&self, endpoint: &str, payload: &Value) -> Result<Value, TransportError> {
        self.post_json(endpoint, payload)
    }

    fn check_operation(&self, endpoint: &str, payload: &Value) -> Result<Value, TransportError> {
        self.post_json(endpoint, payload)
    }
}

pub(crate) fn parse_response(response: Response) -> Result<Value, TransportError> {
    let status = response.status();
    if status.is_success() {
        response
            .json::<Value>()
            .map_err(|err| from_reqwest_error("Failed to decode response body", err))
    } else {
        let error_body = response
            .text()
            .map_err(|err| from_reqwest_error("Failed to receive error response body", err))?;
        Err(transport_error_from_status(status, error_body))
    }
}

/// Passes successful responses through, for callers that read raw bytes.
pub(crate) fn require_success(response: Response) -> Result<Response, TransportError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        let body = response
            .text()
            .map_err(|err| from_reqwest_error("Failed to receive error response body", err))?;
        Err(transport_error_from_status(status, body))
    }
}
