use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client, Method, StatusCode,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error};

use shared_config::AppConfig;

/// Errors surfaced by the database REST gateway.
///
/// `Conflict` is its own variant because the appointments table carries a
/// partial unique index on (doctor_id, date, time) for scheduled rows; a 409
/// from the gateway is the authoritative "slot already taken" signal and
/// callers need to tell it apart from ordinary API failures.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("row conflict: {0}")]
    Conflict(String),

    #[error("authentication rejected by gateway: {0}")]
    Auth(String),

    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("gateway error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

pub struct GatewayClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl GatewayClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.gateway_url.clone(),
            api_key: config.gateway_api_key.clone(),
        }
    }

    fn get_headers(&self, auth_token: Option<&str>) -> HeaderMap {
        let mut headers = HeaderMap::new();

        if let Ok(value) = HeaderValue::from_str(&self.api_key) {
            headers.insert("apikey", value);
        }
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(token) = auth_token {
            if let Ok(value) = HeaderValue::from_str(&format!("Bearer {}", token)) {
                headers.insert(AUTHORIZATION, value);
            }
        }

        headers
    }

    pub async fn request<T>(
        &self,
        method: Method,
        path: &str,
        auth_token: Option<&str>,
        body: Option<Value>,
    ) -> Result<T, DbError>
    where
        T: DeserializeOwned,
    {
        self.request_inner(method, path, auth_token, body, false)
            .await
    }

    /// Same as `request`, but asks the gateway to echo the affected rows back
    /// (PostgREST `Prefer: return=representation`). Used by writes that need
    /// the stored row, e.g. inserts returning generated ids.
    pub async fn request_returning<T>(
        &self,
        method: Method,
        path: &str,
        auth_token: Option<&str>,
        body: Option<Value>,
    ) -> Result<T, DbError>
    where
        T: DeserializeOwned,
    {
        self.request_inner(method, path, auth_token, body, true)
            .await
    }

    async fn request_inner<T>(
        &self,
        method: Method,
        path: &str,
        auth_token: Option<&str>,
        body: Option<Value>,
        return_representation: bool,
    ) -> Result<T, DbError>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making request to {}", url);

        let mut headers = self.get_headers(auth_token);
        if return_representation {
            headers.insert("Prefer", HeaderValue::from_static("return=representation"));
        }

        let mut req = self.client.request(method, &url).headers(headers);

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("Gateway error ({}): {}", status, error_text);

            return Err(match status {
                StatusCode::CONFLICT => DbError::Conflict(error_text),
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => DbError::Auth(error_text),
                StatusCode::NOT_FOUND => DbError::NotFound(error_text),
                _ => DbError::Api {
                    status: status.as_u16(),
                    message: error_text,
                },
            });
        }

        let data = response.json::<T>().await?;
        Ok(data)
    }

    pub fn get_base_url(&self) -> &str {
        &self.base_url
    }
}
