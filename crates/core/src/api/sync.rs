//! Background dispatch of session events to the optional backend.

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::{sync::watch, task::JoinHandle};
use tracing::{debug, info, warn};

use crate::{
    models::{PlayerId, SessionId, TableConfig},
    session::SessionSummary,
};

use super::{ApiError, SessionApi, SessionResponse, SessionUpdate};

/// What the backend said about the id of the current session.
#[derive(Debug, Clone, PartialEq, Eq)]
enum RemoteSession {
    /// `start_session` has not answered yet.
    Pending,
    /// The backend issued its own id.
    Assigned(String),
    /// No id came back; the local id is used.
    Local,
}

/// Fire-and-forget reporting of session events to an optional backend.
///
/// Each dispatch spawns a task on the current Tokio runtime. Outcomes are
/// only logged, they never feed back into session state. Calls made after
/// a start wait for its answer so they can carry the backend's session id.
/// Spawned tasks are tracked until [`SessionSync::flush`] awaits them. A
/// disabled sync dispatches nothing.
#[derive(Clone)]
pub struct SessionSync {
    api: Option<Arc<dyn SessionApi>>,
    remote: Arc<Mutex<Option<watch::Receiver<RemoteSession>>>>,
    tasks: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl SessionSync {
    pub fn new(api: Arc<dyn SessionApi>) -> Self {
        Self::with_api(Some(api))
    }

    /// No backend configured.
    pub fn disabled() -> Self {
        Self::with_api(None)
    }

    fn with_api(api: Option<Arc<dyn SessionApi>>) -> Self {
        Self {
            api,
            remote: Arc::new(Mutex::new(None)),
            tasks: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.api.is_some()
    }

    /// Number of dispatched calls that have not finished yet.
    pub fn pending(&self) -> usize {
        let mut tasks = self.tasks.lock();
        tasks.retain(|task| !task.is_finished());
        tasks.len()
    }

    /// Report a new session. Later calls use the id the backend returns,
    /// falling back to the local one.
    pub fn session_started(
        &self,
        table_id: &str,
        started_at: DateTime<Utc>,
        player_names: Vec<String>,
    ) -> bool {
        let Some(api) = self.api.clone() else {
            return false;
        };
        let (tx, rx) = watch::channel(RemoteSession::Pending);
        *self.remote.lock() = Some(rx);
        let table_id = table_id.to_string();
        self.track(tokio::spawn(async move {
            let result = api.start_session(&table_id, started_at, &player_names).await;
            let remote = match &result {
                Ok(response) if response.success => remote_session_id(response)
                    .map(RemoteSession::Assigned)
                    .unwrap_or(RemoteSession::Local),
                _ => RemoteSession::Local,
            };
            tx.send_replace(remote);
            report("start_session", result);
        }))
    }

    pub fn session_updated(&self, mut update: SessionUpdate) -> bool {
        let Some(api) = self.api.clone() else {
            return false;
        };
        let remote = self.remote.lock().clone();
        self.track(tokio::spawn(async move {
            let local_id = std::mem::take(&mut update.session_id);
            update.session_id = resolve_session_id(remote, local_id).await;
            let result = api.update_session(&update).await;
            report("update_session", result);
        }))
    }

    pub fn session_ended(&self, summary: &SessionSummary) -> bool {
        let Some(api) = self.api.clone() else {
            return false;
        };
        let remote = self.remote.lock().clone();
        let local_id = summary.session_id.to_string();
        let ended_at = summary.ended_at;
        let (total_cost, carambolas, entry_count) =
            (summary.total_cost, summary.carambolas, summary.entry_count);
        self.track(tokio::spawn(async move {
            let update = SessionUpdate {
                session_id: resolve_session_id(remote, local_id).await,
                total_cost,
                carambolas,
                entry_count,
            };
            let result = api.end_session(&update, ended_at).await;
            report("end_session", result);
        }))
    }

    pub fn score_changed(&self, session_id: SessionId, player_id: PlayerId, score: u32) -> bool {
        let Some(api) = self.api.clone() else {
            return false;
        };
        let remote = self.remote.lock().clone();
        self.track(tokio::spawn(async move {
            let session_id = resolve_session_id(remote, session_id.to_string()).await;
            let result = api
                .update_player_score(&session_id, &player_id.to_string(), score)
                .await;
            report("update_player_score", result);
        }))
    }

    /// Fetch the backend's view of a table's configuration. `None` when
    /// disabled or when the call fails.
    pub async fn fetch_table_config(&self, table_id: &str) -> Option<TableConfig> {
        let api = self.api.as_ref()?;
        match api.table_config(table_id).await {
            Ok(config) => {
                info!(table_id, table_name = %config.table_name, "remote table config received");
                Some(config)
            }
            Err(err) => {
                warn!(table_id, "remote table config unavailable: {err}");
                None
            }
        }
    }

    /// Wait for every dispatched call to finish, up to `timeout`. Returns
    /// `false` if some were still running when time ran out.
    pub async fn flush(&self, timeout: Duration) -> bool {
        let tasks = std::mem::take(&mut *self.tasks.lock());
        if tasks.is_empty() {
            return true;
        }
        let count = tasks.len();
        let all = async {
            for task in tasks {
                if let Err(err) = task.await {
                    warn!("remote call task failed: {err}");
                }
            }
        };
        match tokio::time::timeout(timeout, all).await {
            Ok(()) => {
                debug!(count, "remote calls flushed");
                true
            }
            Err(_) => {
                warn!(count, ?timeout, "gave up waiting for remote calls");
                false
            }
        }
    }

    fn track(&self, task: JoinHandle<()>) -> bool {
        let mut tasks = self.tasks.lock();
        tasks.retain(|task| !task.is_finished());
        tasks.push(task);
        true
    }
}

impl std::fmt::Debug for SessionSync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionSync")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

fn remote_session_id(response: &SessionResponse) -> Option<String> {
    response
        .session_id
        .clone()
        .or_else(|| response.data.as_ref().map(|data| data.session_id.clone()))
        .filter(|id| !id.is_empty())
}

async fn resolve_session_id(
    remote: Option<watch::Receiver<RemoteSession>>,
    local_id: String,
) -> String {
    let Some(mut remote) = remote else {
        return local_id;
    };
    let resolved = match remote.wait_for(|state| *state != RemoteSession::Pending).await {
        Ok(state) => match &*state {
            RemoteSession::Assigned(id) => id.clone(),
            RemoteSession::Pending | RemoteSession::Local => local_id,
        },
        // The start task was dropped before answering.
        Err(_) => local_id,
    };
    resolved
}

fn report(operation: &'static str, result: Result<SessionResponse, ApiError>) {
    match result {
        Ok(response) if response.success => {
            debug!(operation, remote_session = ?response.session_id, "remote call succeeded");
        }
        Ok(response) => {
            warn!(
                operation,
                message = response.message.as_deref().unwrap_or(""),
                "remote call reported failure"
            );
        }
        Err(err) => warn!(operation, "remote call failed: {err}"),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::api::SessionData;
    use async_trait::async_trait;

    /// Records every call it receives, optionally after a delay.
    #[derive(Default)]
    pub(crate) struct RecordingApi {
        pub(crate) calls: Mutex<Vec<String>>,
        /// Session id carried by each update, end and score call.
        pub(crate) session_ids: Mutex<Vec<String>>,
        pub(crate) server_id: Option<String>,
        pub(crate) table: Option<TableConfig>,
        pub(crate) delay: Duration,
    }

    impl RecordingApi {
        pub(crate) fn slow(delay: Duration) -> Self {
            Self {
                delay,
                ..Self::default()
            }
        }

        async fn record(
            &self,
            call: String,
            session_id: Option<&str>,
        ) -> Result<SessionResponse, ApiError> {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.calls.lock().push(call);
            if let Some(id) = session_id {
                self.session_ids.lock().push(id.to_string());
            }
            Ok(SessionResponse {
                success: true,
                message: None,
                session_id: None,
                data: None,
            })
        }
    }

    #[async_trait]
    impl SessionApi for RecordingApi {
        async fn start_session(
            &self,
            table_id: &str,
            start_time: DateTime<Utc>,
            player_names: &[String],
        ) -> Result<SessionResponse, ApiError> {
            let mut response = self
                .record(format!("start {table_id} {}", player_names.join(",")), None)
                .await?;
            response.data = self.server_id.clone().map(|session_id| SessionData {
                session_id,
                table_id: table_id.to_string(),
                start_time: start_time.timestamp_millis(),
                end_time: None,
                total_cost: 0.0,
            });
            Ok(response)
        }

        async fn update_session(
            &self,
            update: &SessionUpdate,
        ) -> Result<SessionResponse, ApiError> {
            self.record(
                format!("update {} {}", update.carambolas, update.entry_count),
                Some(&update.session_id),
            )
            .await
        }

        async fn end_session(
            &self,
            update: &SessionUpdate,
            _end_time: DateTime<Utc>,
        ) -> Result<SessionResponse, ApiError> {
            self.record(format!("end {}", update.session_id), Some(&update.session_id))
                .await
        }

        async fn update_player_score(
            &self,
            session_id: &str,
            _player_id: &str,
            score: u32,
        ) -> Result<SessionResponse, ApiError> {
            self.record(format!("score {score}"), Some(session_id)).await
        }

        async fn table_config(&self, _table_id: &str) -> Result<TableConfig, ApiError> {
            self.table
                .clone()
                .ok_or_else(|| ApiError::Rejected("table config unavailable".to_string()))
        }
    }

    const FLUSH: Duration = Duration::from_secs(5);

    #[tokio::test]
    async fn disabled_sync_dispatches_nothing() {
        let sync = SessionSync::disabled();
        assert!(!sync.is_enabled());
        assert!(!sync.session_started("table_1", Utc::now(), Vec::new()));
        assert!(!sync.score_changed(SessionId::new(), PlayerId::new(), 3));
        assert!(sync.fetch_table_config("table_1").await.is_none());
        assert!(sync.flush(FLUSH).await);
    }

    #[tokio::test]
    async fn enabled_sync_reaches_the_api() {
        let api = Arc::new(RecordingApi::default());
        let sync = SessionSync::new(api.clone());

        assert!(sync.session_started("table_1", Utc::now(), vec!["Jugador 1".to_string()]));
        let session_id = SessionId::new();
        assert!(sync.score_changed(session_id, PlayerId::new(), 5));
        assert!(sync.flush(FLUSH).await);

        assert_eq!(
            api.calls.lock().clone(),
            vec!["start table_1 Jugador 1", "score 5"]
        );
        assert_eq!(api.session_ids.lock().clone(), vec![session_id.to_string()]);
        assert_eq!(sync.pending(), 0);
    }

    #[tokio::test]
    async fn later_calls_carry_the_server_session_id() {
        let api = Arc::new(RecordingApi {
            server_id: Some("srv-42".to_string()),
            ..RecordingApi::default()
        });
        let sync = SessionSync::new(api.clone());
        let local = SessionId::new();

        sync.session_started("table_1", Utc::now(), Vec::new());
        sync.score_changed(local, PlayerId::new(), 2);
        sync.session_updated(SessionUpdate {
            session_id: local.to_string(),
            total_cost: 5.0,
            carambolas: 1,
            entry_count: 0,
        });
        assert!(sync.flush(FLUSH).await);

        assert_eq!(api.session_ids.lock().clone(), vec!["srv-42", "srv-42"]);
    }

    #[test]
    fn response_id_prefers_top_level_then_data() {
        let mut response = SessionResponse {
            success: true,
            message: None,
            session_id: Some("top".to_string()),
            data: Some(SessionData {
                session_id: "nested".to_string(),
                table_id: "table_1".to_string(),
                start_time: 0,
                end_time: None,
                total_cost: 0.0,
            }),
        };
        assert_eq!(remote_session_id(&response).as_deref(), Some("top"));
        response.session_id = None;
        assert_eq!(remote_session_id(&response).as_deref(), Some("nested"));
        response.data = None;
        assert_eq!(remote_session_id(&response), None);
    }

    #[tokio::test(start_paused = true)]
    async fn flush_waits_for_slow_calls() {
        let api = Arc::new(RecordingApi::slow(Duration::from_millis(50)));
        let sync = SessionSync::new(api.clone());
        sync.session_started("table_1", Utc::now(), Vec::new());
        assert_eq!(sync.pending(), 1);

        assert!(sync.flush(FLUSH).await);
        assert_eq!(api.calls.lock().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn flush_gives_up_after_timeout() {
        let api = Arc::new(RecordingApi::slow(Duration::from_secs(60)));
        let sync = SessionSync::new(api.clone());
        sync.session_started("table_1", Utc::now(), Vec::new());

        assert!(!sync.flush(Duration::from_millis(100)).await);
        assert!(api.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn table_config_is_fetched_when_available() {
        let api = Arc::new(RecordingApi {
            table: Some(TableConfig {
                table_name: "Mesa 7".to_string(),
                ..TableConfig::default()
            }),
            ..RecordingApi::default()
        });
        let sync = SessionSync::new(api);
        let config = sync.fetch_table_config("table_1").await.expect("config");
        assert_eq!(config.table_name, "Mesa 7");

        let sync = SessionSync::new(Arc::new(RecordingApi::default()));
        assert!(sync.fetch_table_config("table_1").await.is_none());
    }
}
