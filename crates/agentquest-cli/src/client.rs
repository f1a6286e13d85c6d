use agentquest_protocol::{
    AgentProfile, ApiErrorBody, ClaimView, LoginRequest, LoginResponse, MissionView,
    SubmitClaimRequest,
};
use anyhow::{Context, Result};
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

/// Non-2xx answer from the API, carrying the server's error message.
#[derive(Debug, thiserror::Error)]
#[error("server returned {status}: {message}")]
pub struct ApiFailure {
    pub status: StatusCode,
    pub message: String,
}

impl ApiFailure {
    fn from_body(status: StatusCode, body: &str) -> Self {
        let message = match serde_json::from_str::<ApiErrorBody>(body) {
            Ok(envelope) => envelope.error,
            Err(_) if body.trim().is_empty() => status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string(),
            Err(_) => body.trim().to_string(),
        };
        Self { status, message }
    }
}

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: &str, token: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let request = match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };
        let response = request
            .send()
            .await
            .with_context(|| format!("could not reach {}", self.base_url))?;
        let status = response.status();
        debug!(%status, url = %response.url(), "api response");

        if status.is_success() {
            return response.json().await.context("decoding api response");
        }
        let body = response.text().await.unwrap_or_default();
        Err(ApiFailure::from_body(status, &body).into())
    }

    pub async fn login(&self, request: &LoginRequest) -> Result<LoginResponse> {
        self.send(self.http.post(self.url("/api/auth/login")).json(request)).await
    }

    pub async fn missions(&self) -> Result<Vec<MissionView>> {
        self.send(self.http.get(self.url("/api/missions"))).await
    }

    pub async fn submit_claim(&self, request: &SubmitClaimRequest) -> Result<ClaimView> {
        self.send(self.http.post(self.url("/api/claims")).json(request)).await
    }

    pub async fn profile(&self, wallet: &str) -> Result<AgentProfile> {
        self.send(self.http.get(self.url("/api/agents/profile")).query(&[("wallet", wallet)]))
            .await
    }
}
