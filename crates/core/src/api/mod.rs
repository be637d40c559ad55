#![allow(missing_docs)]

//! Remote session API.
//!
//! The backend is optional. [`connect`] returns a [`SessionSync`] that is
//! either wired to [`HttpSessionApi`] or explicitly disabled, so the
//! session and roster logic never know which one they talk to.

pub mod http;
pub mod sync;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{config::ApiConfig, models::TableConfig};

pub use http::HttpSessionApi;
pub use sync::SessionSync;

/// Remote API error.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("request rejected: {0}")]
    Rejected(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Running totals sent on update and end.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionUpdate {
    pub session_id: String,
    pub total_cost: f64,
    pub carambolas: u32,
    pub entry_count: u32,
}

/// Body of `POST api/sessions/start`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartSessionRequest {
    pub table_id: String,
    /// Epoch milliseconds.
    pub start_time: i64,
    pub player_names: Vec<String>,
}

/// Body of `PUT api/sessions/update` and `POST api/sessions/end`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateSessionRequest {
    pub session_id: String,
    /// Epoch milliseconds; only set when ending.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<i64>,
    pub total_cost: f64,
    pub carambolas: u32,
    pub entry_count: u32,
}

/// Body of `POST api/players/score`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerScoreRequest {
    pub session_id: String,
    pub player_id: String,
    pub score: u32,
}

/// Response to every session operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionResponse {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub data: Option<SessionData>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    pub session_id: String,
    pub table_id: String,
    pub start_time: i64,
    #[serde(default)]
    pub end_time: Option<i64>,
    pub total_cost: f64,
}

/// Response to `GET api/tables/{id}/config`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigResponse {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<ConfigData>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigData {
    pub table_id: String,
    pub table_name: String,
    pub camera_url: String,
    pub price_per_minute: f64,
    pub is_active: bool,
}

impl From<ConfigData> for TableConfig {
    fn from(data: ConfigData) -> Self {
        Self {
            table_id: data.table_id,
            camera_url: data.camera_url,
            price_per_minute: data.price_per_minute,
            table_name: data.table_name,
            is_active: data.is_active,
        }
    }
}

impl UpdateSessionRequest {
    pub fn new(update: &SessionUpdate, end_time: Option<DateTime<Utc>>) -> Self {
        Self {
            session_id: update.session_id.clone(),
            end_time: end_time.map(|at| at.timestamp_millis()),
            total_cost: update.total_cost,
            carambolas: update.carambolas,
            entry_count: update.entry_count,
        }
    }
}

/// Operations the table terminal can report to a backend.
#[async_trait]
pub trait SessionApi: Send + Sync {
    async fn start_session(
        &self,
        table_id: &str,
        start_time: DateTime<Utc>,
        player_names: &[String],
    ) -> Result<SessionResponse, ApiError>;

    async fn update_session(&self, update: &SessionUpdate) -> Result<SessionResponse, ApiError>;

    async fn end_session(
        &self,
        update: &SessionUpdate,
        end_time: DateTime<Utc>,
    ) -> Result<SessionResponse, ApiError>;

    async fn update_player_score(
        &self,
        session_id: &str,
        player_id: &str,
        score: u32,
    ) -> Result<SessionResponse, ApiError>;

    async fn table_config(&self, table_id: &str) -> Result<TableConfig, ApiError>;
}

/// Build the sync dispatcher described by `config`.
pub fn connect(config: &ApiConfig) -> Result<SessionSync> {
    if !config.enabled {
        return Ok(SessionSync::disabled());
    }
    let api = HttpSessionApi::new(config)?;
    Ok(SessionSync::new(std::sync::Arc::new(api)))
}
