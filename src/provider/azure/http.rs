//! Authenticated JSON requests against Azure REST endpoints.

use super::auth::bearer_token;
use crate::provider::{ApiError, ApiResult};
use anyhow::{Context, Result};
use azure_core::credentials::TokenCredential;
use reqwest::{Client, Method, Response, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

/// Azure error envelope: `{"error": {"code": "...", "message": "..."}}`
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

pub(crate) struct RestClient {
    http: Client,
    credential: Arc<dyn TokenCredential>,
    scope: &'static str,
}

impl std::fmt::Debug for RestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestClient")
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

impl RestClient {
    pub(crate) fn new(credential: Arc<dyn TokenCredential>, scope: &'static str) -> Result<Self> {
        // rustls is selected through reqwest features
        let http = Client::builder()
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self {
            http,
            credential,
            scope,
        })
    }

    /// Send a request; any non-2xx status becomes an [`ApiError`]
    pub(crate) async fn send(
        &self,
        method: Method,
        url: Url,
        body: Option<&serde_json::Value>,
    ) -> ApiResult<Response> {
        let token = bearer_token(self.credential.as_ref(), self.scope).await?;
        debug!("{method} {url}");

        let mut request = self
            .http
            .request(method, url)
            .header("Authorization", format!("Bearer {token}"));
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ApiError::transport(format!("Request failed: {e}")))?;
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status().as_u16();
        let text = response.text().await.unwrap_or_default();
        Err(parse_error(status, &text))
    }

    /// GET a JSON document; 404 is `Ok(None)`
    pub(crate) async fn get_json<T: DeserializeOwned>(&self, url: Url) -> ApiResult<Option<T>> {
        match self.send(Method::GET, url, None).await {
            Ok(response) => decode(response).await.map(Some),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub(crate) async fn send_json<T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        body: Option<&serde_json::Value>,
    ) -> ApiResult<T> {
        let response = self.send(method, url, body).await?;
        decode(response).await
    }

    /// Send a request whose response body is ignored
    pub(crate) async fn send_empty(
        &self,
        method: Method,
        url: Url,
        body: Option<&serde_json::Value>,
    ) -> ApiResult<()> {
        self.send(method, url, body).await.map(|_| ())
    }

    /// Unauthenticated GET returning the status code, for reachability probes
    pub(crate) async fn probe(&self, url: Url) -> ApiResult<u16> {
        self.http
            .get(url)
            .send()
            .await
            .map(|response| response.status().as_u16())
            .map_err(|e| ApiError::transport(format!("Request failed: {e}")))
    }
}

/// Build a URL and append `api-version`
pub(crate) fn api_url(url: &str, api_version: &str) -> ApiResult<Url> {
    let mut url = Url::parse(url)
        .map_err(|e| ApiError::transport(format!("Invalid URL {url:?}: {e}")))?;
    url.query_pairs_mut().append_pair("api-version", api_version);
    Ok(url)
}

async fn decode<T: DeserializeOwned>(response: Response) -> ApiResult<T> {
    let status = response.status().as_u16();
    let text = response
        .text()
        .await
        .map_err(|e| ApiError::transport(format!("Failed to read response body: {e}")))?;
    // Some 2xx responses (202, 204) have no body
    let text = if text.trim().is_empty() { "null" } else { text.as_str() };
    serde_json::from_str(text).map_err(|e| {
        ApiError::new(
            Some(status),
            None,
            format!("Failed to parse response body: {e}"),
        )
    })
}

fn parse_error(status: u16, text: &str) -> ApiError {
    match serde_json::from_str::<ErrorResponse>(text) {
        Ok(ErrorResponse { error }) => ApiError::new(
            Some(status),
            error.code,
            error.message.unwrap_or_else(|| "no error message".to_string()),
        ),
        Err(_) if text.is_empty() => ApiError::new(Some(status), None, "empty response body"),
        Err(_) => ApiError::new(Some(status), None, text.to_string()),
    }
}
