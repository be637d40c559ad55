//! JSON-over-HTTP implementation of [`SessionApi`].

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::{config::ApiConfig, models::TableConfig};

use super::{
    ApiError, ConfigResponse, PlayerScoreRequest, SessionApi, SessionResponse, SessionUpdate,
    StartSessionRequest, UpdateSessionRequest,
};

/// JSON-over-HTTP backend.
#[derive(Debug, Clone)]
pub struct HttpSessionApi {
    client: Client,
    base_url: String,
}

impl HttpSessionApi {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        decode_response(status, &body)
    }
}

/// Map a status and body to a typed response. Non-2xx statuses are
/// rejections; bodies that do not parse are invalid responses.
fn decode_response<T: DeserializeOwned>(status: StatusCode, body: &[u8]) -> Result<T, ApiError> {
    if !status.is_success() {
        let reason = status.canonical_reason().unwrap_or("unknown status");
        return Err(ApiError::Rejected(format!("{} {reason}", status.as_u16())));
    }
    serde_json::from_slice(body).map_err(|err| ApiError::InvalidResponse(err.to_string()))
}

fn table_config_from(response: ConfigResponse) -> Result<TableConfig, ApiError> {
    match response.data {
        Some(data) if response.success => Ok(data.into()),
        _ => Err(ApiError::Rejected(
            response
                .message
                .unwrap_or_else(|| "table config unavailable".to_string()),
        )),
    }
}

#[async_trait]
impl SessionApi for HttpSessionApi {
    async fn start_session(
        &self,
        table_id: &str,
        start_time: DateTime<Utc>,
        player_names: &[String],
    ) -> Result<SessionResponse, ApiError> {
        let body = StartSessionRequest {
            table_id: table_id.to_string(),
            start_time: start_time.timestamp_millis(),
            player_names: player_names.to_vec(),
        };
        debug!(table_id, "POST api/sessions/start");
        self.send(self.client.post(self.url("api/sessions/start")).json(&body))
            .await
    }

    async fn update_session(&self, update: &SessionUpdate) -> Result<SessionResponse, ApiError> {
        let body = UpdateSessionRequest::new(update, None);
        debug!(session_id = %update.session_id, "PUT api/sessions/update");
        self.send(self.client.put(self.url("api/sessions/update")).json(&body))
            .await
    }

    async fn end_session(
        &self,
        update: &SessionUpdate,
        end_time: DateTime<Utc>,
    ) -> Result<SessionResponse, ApiError> {
        let body = UpdateSessionRequest::new(update, Some(end_time));
        debug!(session_id = %update.session_id, "POST api/sessions/end");
        self.send(self.client.post(self.url("api/sessions/end")).json(&body))
            .await
    }

    async fn update_player_score(
        &self,
        session_id: &str,
        player_id: &str,
        score: u32,
    ) -> Result<SessionResponse, ApiError> {
        let body = PlayerScoreRequest {
            session_id: session_id.to_string(),
            player_id: player_id.to_string(),
            score,
        };
        debug!(session_id, player_id, score, "POST api/players/score");
        self.send(self.client.post(self.url("api/players/score")).json(&body))
            .await
    }

    async fn table_config(&self, table_id: &str) -> Result<TableConfig, ApiError> {
        let url = self.url(&format!("api/tables/{table_id}/config"));
        debug!(table_id, "GET api/tables/{{id}}/config");
        let response: ConfigResponse = self.send(self.client.get(url)).await?;
        table_config_from(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn urls_join_without_double_slash() {
        let api = HttpSessionApi::new(&ApiConfig {
            enabled: true,
            base_url: "http://pos.local:8080/".to_string(),
            timeout_secs: 1,
        })
        .unwrap();
        assert_eq!(
            api.url("api/sessions/start"),
            "http://pos.local:8080/api/sessions/start"
        );
    }

    #[test]
    fn error_status_is_a_rejection() {
        let result = decode_response::<SessionResponse>(StatusCode::BAD_GATEWAY, b"{}");
        match result {
            Err(ApiError::Rejected(message)) => assert_eq!(message, "502 Bad Gateway"),
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[test]
    fn unparsable_body_is_an_invalid_response() {
        let result = decode_response::<SessionResponse>(StatusCode::OK, b"<html>oops</html>");
        assert!(matches!(result, Err(ApiError::InvalidResponse(_))));

        let result = decode_response::<SessionResponse>(StatusCode::OK, br#"{"message":"x"}"#);
        assert!(matches!(result, Err(ApiError::InvalidResponse(_))));
    }

    #[test]
    fn success_body_decodes() {
        let body = serde_json::to_vec(&json!({"success": true, "session_id": "srv-1"})).unwrap();
        let response: SessionResponse = decode_response(StatusCode::CREATED, &body).unwrap();
        assert!(response.success);
        assert_eq!(response.session_id.as_deref(), Some("srv-1"));
    }

    #[test]
    fn unsuccessful_config_is_rejected_with_its_message() {
        let response = ConfigResponse {
            success: false,
            message: Some("unknown table".to_string()),
            data: None,
        };
        match table_config_from(response) {
            Err(ApiError::Rejected(message)) => assert_eq!(message, "unknown table"),
            other => panic!("expected rejection, got {other:?}"),
        }

        let response = ConfigResponse {
            success: true,
            message: None,
            data: None,
        };
        assert!(matches!(
            table_config_from(response),
            Err(ApiError::Rejected(message)) if message == "table config unavailable"
        ));
    }
}
