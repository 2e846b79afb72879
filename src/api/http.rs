use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;

use crate::error::ApiError;
use crate::session::{Ack, SessionRecord};
use crate::settings::ApiSettings;

use super::{Preset, PresetSource, SessionSink};

/// JSON-over-HTTP client for the study backend.
#[derive(Clone)]
pub struct HttpApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpApi {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("study-guardian/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Transport(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_settings(settings: &ApiSettings) -> Result<Self, ApiError> {
        Self::new(settings.base_url.clone(), Duration::from_secs(settings.timeout_secs))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

async fn error_for_status(response: reqwest::Response) -> ApiError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    ApiError::Status { status, body }
}

#[async_trait]
impl SessionSink for HttpApi {
    async fn submit(&self, record: &SessionRecord) -> Result<Ack, ApiError> {
        let response = self
            .client
            .post(self.url("sessions"))
            .header("Idempotency-Key", record.idempotency_key.to_string())
            .json(record)
            .send()
            .await
            .map_err(|e| ApiError::Transport(format!("failed to submit session: {e}")))?;

        match response.status() {
            StatusCode::CONFLICT => Ok(Ack::Duplicate),
            status if status.is_success() => Ok(Ack::Accepted),
            _ => Err(error_for_status(response).await),
        }
    }
}

#[async_trait]
impl PresetSource for HttpApi {
    async fn fetch_presets(&self) -> Result<Vec<Preset>, ApiError> {
        let response = self
            .client
            .get(self.url("presets"))
            .send()
            .await
            .map_err(|e| ApiError::Transport(format!("failed to fetch presets: {e}")))?;

        if !response.status().is_success() {
            return Err(error_for_status(response).await);
        }

        response
            .json::<Vec<Preset>>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }
}
