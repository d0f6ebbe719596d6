use log::{ debug, info };
use reqwest::{ redirect, Client as HttpClient, Response, header::{ HeaderMap, HeaderValue, CONTENT_TYPE, AUTHORIZATION } };

use super::ChatCompletionRequest;
use crate::error::RelayError;
use crate::llm::UpstreamConfig;

/// Issues chat completion requests against an OpenAI-compatible endpoint
/// (OpenRouter by default). One `send` is exactly one POST; nothing is retried.
pub struct OpenRouterChatClient {
    http: HttpClient,
    config: UpstreamConfig,
}

impl OpenRouterChatClient {
    pub fn new(config: UpstreamConfig) -> Result<Self, RelayError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        // No overall request timeout: generation can legitimately take minutes.
        // Redirects are not followed; a 3xx is a rejection like any other non-2xx.
        let http = HttpClient::builder()
            .default_headers(headers)
            .redirect(redirect::Policy::none())
            .build()
            .map_err(RelayError::ClientInit)?;

        Ok(Self { http, config })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn request_headers(&self) -> Result<HeaderMap, RelayError> {
        let token = self.config.credentials
            .bearer_token()
            .ok_or_else(|| RelayError::MissingCredential(self.config.credentials.describe()))?;

        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", token)).map_err(
            |_| RelayError::InvalidCredential
        )?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        if let Some(title) = &self.config.title {
            if let Ok(value) = HeaderValue::from_str(title) {
                headers.insert("x-title", value);
            }
        }
        Ok(headers)
    }

    /// Sends the request and returns the upstream response once its status is
    /// known to be a success. The body has not been read yet.
    pub async fn send(&self, req: &ChatCompletionRequest) -> Result<Response, RelayError> {
        // Resolve the credential before touching the network.
        let headers = self.request_headers()?;

        debug!("POST {} model={} messages={}", self.config.url, req.model, req.messages.len());
        let resp = self.http
            .post(&self.config.url)
            .headers(headers)
            .json(req)
            .send().await
            .map_err(RelayError::Dispatch)?;

        let status = resp.status();
        if !status.is_success() {
            info!("Upstream rejected request with status {}", status);
            return Err(RelayError::UpstreamStatus(status));
        }
        Ok(resp)
    }
}
