//! Boundary with the study backend.

pub mod http;
pub mod preset;

use async_trait::async_trait;

use crate::error::ApiError;
use crate::session::{Ack, SessionRecord};

pub use http::HttpApi;
pub use preset::Preset;

/// Accepts finished session records. Implementations must treat the record's
/// idempotency key as the identity of the record.
#[async_trait]
pub trait SessionSink: Send + Sync {
    async fn submit(&self, record: &SessionRecord) -> Result<Ack, ApiError>;
}

#[async_trait]
pub trait PresetSource: Send + Sync {
    async fn fetch_presets(&self) -> Result<Vec<Preset>, ApiError>;
}
