#![allow(missing_docs)]

//! One table screen: session timer, roster, camera panel and settings
//! composed behind a single event entry point.

use std::{sync::Arc, time::Duration};

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::{
    api::{SessionSync, SessionUpdate},
    camera::CameraPanel,
    clock::Clock,
    models::{PlayerId, SessionId},
    roster::Roster,
    session::{SessionSnapshot, SessionTick, SessionTimer},
    settings::TableSettings,
};

/// Discrete operator actions.
#[derive(Debug, Clone, PartialEq)]
pub enum TableEvent {
    AdjustScore { player: PlayerId, delta: i32 },
    AddPlayer,
    RemovePlayer,
    ResetScores,
    IncrementCarambolas,
    DecrementCarambolas,
    IncrementEntryCount,
    DecrementEntryCount,
    SetPricePerMinute(f64),
    CloseSession,
    /// Start over after the previous session was closed.
    NewSession,
}

/// Owns all state for one table screen. Dropping it cancels the session
/// ticker.
pub struct TableController {
    settings: TableSettings,
    timer: SessionTimer,
    roster: Roster,
    camera: CameraPanel,
    sync: SessionSync,
}

impl TableController {
    /// Build the screen state and auto-start a session for the configured
    /// table. Must be called from within a Tokio runtime.
    pub fn new(
        settings: TableSettings,
        sync: SessionSync,
        clock: Arc<dyn Clock>,
        tick_tx: mpsc::Sender<SessionTick>,
        tick_period: Duration,
    ) -> Self {
        let mut timer = SessionTimer::new(clock, tick_tx, tick_period);
        if !timer.set_price_per_minute(settings.price_per_minute()) {
            warn!(
                price = settings.price_per_minute(),
                "configured price per minute is invalid, keeping default"
            );
        }
        let mut camera = CameraPanel::new();
        camera.set_url(settings.camera_url());

        let mut controller = Self {
            settings,
            timer,
            roster: Roster::new(),
            camera,
            sync,
        };
        controller.start_session();
        controller
    }

    fn start_session(&mut self) -> SessionId {
        let table_id = self.settings.table_id();
        let names = self.roster.player_names();
        let id = self.timer.start(table_id.as_str(), &names);
        if let Some(started_at) = self.timer.snapshot().started_at {
            self.sync.session_started(&table_id, started_at, names);
        }
        id
    }

    /// Apply one operator event. Returns whether any state changed.
    pub fn handle(&mut self, event: TableEvent) -> bool {
        match event {
            TableEvent::AdjustScore { player, delta } => self.adjust_score(player, delta),
            TableEvent::AddPlayer => self.roster.add_player().is_some(),
            TableEvent::RemovePlayer => self.roster.remove_player().is_some(),
            TableEvent::ResetScores => {
                let had_scores = self.roster.players().iter().any(|p| p.score > 0);
                self.roster.reset_scores();
                had_scores
            }
            TableEvent::IncrementCarambolas => {
                let before = self.timer.carambolas();
                let changed = self.timer.increment_carambolas() != before;
                self.push_update(changed)
            }
            TableEvent::DecrementCarambolas => {
                let before = self.timer.carambolas();
                let changed = self.timer.decrement_carambolas() != before;
                self.push_update(changed)
            }
            TableEvent::IncrementEntryCount => {
                let before = self.timer.entry_count();
                let changed = self.timer.increment_entry_count() != before;
                self.push_update(changed)
            }
            TableEvent::DecrementEntryCount => {
                let before = self.timer.entry_count();
                let changed = self.timer.decrement_entry_count() != before;
                self.push_update(changed)
            }
            TableEvent::SetPricePerMinute(rate) => {
                if !self.timer.set_price_per_minute(rate) {
                    return false;
                }
                if let Err(err) = self.settings.save_price_per_minute(rate) {
                    warn!("failed to persist price per minute: {err:#}");
                }
                self.push_update(true)
            }
            TableEvent::CloseSession => match self.timer.end() {
                Some(summary) => {
                    self.sync.session_ended(&summary);
                    true
                }
                None => false,
            },
            TableEvent::NewSession => {
                if self.timer.is_active() {
                    return false;
                }
                self.timer.reset_counters();
                self.roster.reset_scores();
                let id = self.start_session();
                info!(session_id = %id, "new session after close");
                true
            }
        }
    }

    /// Close the session if it is still running, then wait up to `timeout`
    /// for outstanding remote calls. Returns `false` if some were still
    /// running when time ran out.
    pub async fn shutdown(&mut self, timeout: Duration) -> bool {
        if self.handle(TableEvent::CloseSession) {
            info!("session closed on shutdown");
        }
        self.sync.flush(timeout).await
    }

    /// Forward a ticker message to the session timer.
    pub fn on_tick(&mut self, tick: &SessionTick) -> bool {
        self.timer.tick(tick)
    }

    pub fn settings(&self) -> &TableSettings {
        &self.settings
    }

    pub fn timer(&self) -> &SessionTimer {
        &self.timer
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn camera(&self) -> &CameraPanel {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut CameraPanel {
        &mut self.camera
    }

    pub fn session(&self) -> SessionSnapshot {
        self.timer.snapshot()
    }

    fn adjust_score(&mut self, player: PlayerId, delta: i32) -> bool {
        let before = self.roster.get_player(&player).map(|p| p.score);
        let Some(score) = self.roster.update_score(&player, delta) else {
            return false;
        };
        if before == Some(score) {
            return false;
        }
        if let Some(session_id) = self.timer.session_id().filter(|_| self.timer.is_active()) {
            self.sync.score_changed(session_id, player, score);
        }
        true
    }

    fn push_update(&self, changed: bool) -> bool {
        if !changed || !self.timer.is_active() {
            return changed;
        }
        if let Some(session_id) = self.timer.session_id() {
            self.sync.session_updated(SessionUpdate {
                session_id: session_id.to_string(),
                total_cost: self.timer.total_cost(),
                carambolas: self.timer.carambolas(),
                entry_count: self.timer.entry_count(),
            });
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        api::sync::tests::RecordingApi, camera::CameraState, clock::ManualClock,
        preferences::Preferences, session::DEFAULT_TICK_PERIOD,
    };
    use chrono::Utc;

    struct Harness {
        controller: TableController,
        clock: ManualClock,
        api: Arc<RecordingApi>,
        _ticks: mpsc::Receiver<SessionTick>,
    }

    const FLUSH: Duration = Duration::from_secs(5);

    fn harness(preferences: Preferences) -> Harness {
        harness_with(preferences, RecordingApi::default())
    }

    fn harness_with(preferences: Preferences, api: RecordingApi) -> Harness {
        let clock = ManualClock::new(Utc::now());
        let api = Arc::new(api);
        let (tx, rx) = mpsc::channel(16);
        let controller = TableController::new(
            TableSettings::in_memory(preferences),
            SessionSync::new(api.clone()),
            Arc::new(clock.clone()),
            tx,
            DEFAULT_TICK_PERIOD,
        );
        Harness {
            controller,
            clock,
            api,
            _ticks: rx,
        }
    }

    impl Harness {
        async fn settle(&self) {
            assert!(self.controller.sync.flush(FLUSH).await);
        }
    }

    #[tokio::test]
    async fn creation_auto_starts_session() {
        let h = harness(Preferences::default());
        let session = h.controller.session();
        assert!(session.active);
        assert_eq!(session.table_id.as_deref(), Some("table_1"));
        assert_eq!(h.controller.roster().len(), 2);
        assert_eq!(h.controller.camera().state(), CameraState::Loading);

        h.settle().await;
        assert_eq!(
            h.api.calls.lock().clone(),
            vec!["start table_1 Jugador 1,Jugador 2"]
        );
    }

    #[tokio::test]
    async fn configured_price_drives_cost() {
        let mut h = harness(Preferences {
            price_per_minute: 3.0,
            ..Preferences::default()
        });
        let id = h.controller.session().session_id.unwrap();
        h.clock.advance(chrono::Duration::minutes(4));
        assert!(h.controller.on_tick(&SessionTick { session_id: id }));
        assert_eq!(h.controller.session().cost_display, "$12.00");

        assert!(h.controller.handle(TableEvent::SetPricePerMinute(10.0)));
        assert_eq!(h.controller.session().cost_display, "$40.00");
        assert_eq!(h.controller.settings().price_per_minute(), 10.0);
        assert!(!h.controller.handle(TableEvent::SetPricePerMinute(-1.0)));
    }

    #[tokio::test]
    async fn score_events_are_clamped_and_synced() {
        let mut h = harness(Preferences::default());
        let player = h.controller.roster().players()[1].id;

        assert!(!h.controller.handle(TableEvent::AdjustScore { player, delta: -1 }));
        assert!(h.controller.handle(TableEvent::AdjustScore { player, delta: 5 }));
        assert!(h.controller.handle(TableEvent::AdjustScore { player, delta: -1 }));
        assert!(!h.controller.handle(TableEvent::AdjustScore {
            player: PlayerId::new(),
            delta: 1
        }));
        assert_eq!(h.controller.roster().get_player(&player).unwrap().score, 4);

        h.settle().await;
        let calls = h.api.calls.lock().clone();
        assert_eq!(&calls[1..], ["score 5", "score 4"]);
    }

    #[tokio::test]
    async fn roster_events_respect_bounds() {
        let mut h = harness(Preferences::default());
        for _ in 0..4 {
            assert!(h.controller.handle(TableEvent::AddPlayer));
        }
        assert!(!h.controller.handle(TableEvent::AddPlayer));
        for _ in 0..4 {
            assert!(h.controller.handle(TableEvent::RemovePlayer));
        }
        assert!(!h.controller.handle(TableEvent::RemovePlayer));
        assert_eq!(h.controller.roster().len(), 2);
    }

    #[tokio::test]
    async fn close_then_new_session() {
        let mut h = harness(Preferences::default());
        let first = h.controller.session().session_id.unwrap();
        let player = h.controller.roster().players()[0].id;
        h.controller.handle(TableEvent::AdjustScore { player, delta: 3 });
        assert!(h.controller.handle(TableEvent::IncrementCarambolas));
        assert!(!h.controller.handle(TableEvent::DecrementEntryCount));

        assert!(!h.controller.handle(TableEvent::NewSession));
        assert!(h.controller.handle(TableEvent::CloseSession));
        assert!(!h.controller.handle(TableEvent::CloseSession));
        assert!(!h.controller.session().active);

        h.clock.advance(chrono::Duration::minutes(1));
        assert!(!h.controller.on_tick(&SessionTick { session_id: first }));

        assert!(h.controller.handle(TableEvent::NewSession));
        let session = h.controller.session();
        assert!(session.active);
        assert_ne!(session.session_id, Some(first));
        assert_eq!(session.carambolas, 0);
        assert_eq!(session.elapsed_display, "00:00");
        assert!(h.controller.roster().players().iter().all(|p| p.score == 0));

        h.settle().await;
        let calls = h.api.calls.lock().clone();
        assert!(calls.contains(&format!("end {first}")));
        assert_eq!(calls.iter().filter(|c| c.starts_with("start")).count(), 2);
    }

    #[tokio::test]
    async fn counter_updates_are_pushed_while_active() {
        let mut h = harness(Preferences::default());
        h.controller.handle(TableEvent::IncrementCarambolas);
        h.controller.handle(TableEvent::IncrementEntryCount);
        h.controller.handle(TableEvent::CloseSession);
        h.controller.handle(TableEvent::IncrementCarambolas);

        h.settle().await;
        let calls = h.api.calls.lock().clone();
        let updates: Vec<_> = calls.iter().filter(|c| c.starts_with("update")).collect();
        assert_eq!(updates, ["update 1 0", "update 1 1"]);
    }

    #[tokio::test]
    async fn score_sync_uses_the_server_session_id() {
        let mut h = harness_with(
            Preferences::default(),
            RecordingApi {
                server_id: Some("srv-42".to_string()),
                ..RecordingApi::default()
            },
        );
        let player = h.controller.roster().players()[0].id;
        h.controller.handle(TableEvent::AdjustScore { player, delta: 1 });
        h.controller.handle(TableEvent::IncrementCarambolas);
        h.controller.handle(TableEvent::CloseSession);

        h.settle().await;
        assert_eq!(
            h.api.session_ids.lock().clone(),
            vec!["srv-42", "srv-42", "srv-42"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_waits_for_the_close_report() {
        let mut h = harness_with(
            Preferences::default(),
            RecordingApi::slow(Duration::from_millis(50)),
        );
        assert!(h.controller.handle(TableEvent::CloseSession));
        assert!(h.controller.shutdown(FLUSH).await);

        let calls = h.api.calls.lock().clone();
        assert_eq!(calls.len(), 2);
        assert!(calls[1].starts_with("end "));
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_closes_an_active_session() {
        let mut h = harness_with(
            Preferences::default(),
            RecordingApi::slow(Duration::from_millis(50)),
        );
        let id = h.controller.session().session_id.unwrap();
        assert!(h.controller.shutdown(FLUSH).await);

        assert!(!h.controller.session().active);
        assert!(h.api.calls.lock().contains(&format!("end {id}")));
    }
}
