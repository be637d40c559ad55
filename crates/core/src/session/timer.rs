#![allow(missing_docs)]

use std::{sync::Arc, time::Duration as StdDuration};

use chrono::{DateTime, Duration, Utc};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::{
    clock::Clock,
    format::{format_currency, format_elapsed},
    models::{SessionId, DEFAULT_PRICE_PER_MINUTE},
    signal::{Observer, Signal},
    ticker::Ticker,
};

use super::models::{SessionSnapshot, SessionSummary, SessionTick};

/// Cadence of elapsed/cost recomputation while a session is active.
pub const DEFAULT_TICK_PERIOD: StdDuration = StdDuration::from_secs(1);

#[derive(Debug, Clone)]
struct ActiveSession {
    id: SessionId,
    table_id: String,
    started_at: DateTime<Utc>,
}

/// Owns one table session: start time, elapsed time, accrued cost and the
/// two operator counters.
///
/// Ticks are produced by a [`Ticker`] that posts [`SessionTick`] messages to
/// the channel given at construction; whoever drains that channel hands
/// them back through [`SessionTimer::tick`].
pub struct SessionTimer {
    clock: Arc<dyn Clock>,
    tick_tx: mpsc::Sender<SessionTick>,
    tick_period: StdDuration,
    ticker: Option<Ticker>,
    session: Option<ActiveSession>,
    elapsed: Duration,
    total_cost: f64,
    session_id: Signal<Option<SessionId>>,
    active: Signal<bool>,
    price_per_minute: Signal<f64>,
    elapsed_display: Signal<String>,
    cost_display: Signal<String>,
    carambolas: Signal<u32>,
    entry_count: Signal<u32>,
}

impl SessionTimer {
    pub fn new(
        clock: Arc<dyn Clock>,
        tick_tx: mpsc::Sender<SessionTick>,
        tick_period: StdDuration,
    ) -> Self {
        Self {
            clock,
            tick_tx,
            tick_period,
            ticker: None,
            session: None,
            elapsed: Duration::zero(),
            total_cost: 0.0,
            session_id: Signal::new(None),
            active: Signal::new(false),
            price_per_minute: Signal::new(DEFAULT_PRICE_PER_MINUTE),
            elapsed_display: Signal::new(format_elapsed(Duration::zero())),
            cost_display: Signal::new(format_currency(0.0)),
            carambolas: Signal::new(0),
            entry_count: Signal::new(0),
        }
    }

    /// Begin a new session and install the recurring tick.
    ///
    /// Must be called from within a Tokio runtime. Any running ticker is
    /// cancelled first. `initial_players` is only used for logging here;
    /// remote registration happens in the caller.
    pub fn start(&mut self, table_id: impl Into<String>, initial_players: &[String]) -> SessionId {
        self.ticker = None;

        let id = SessionId::new();
        let table_id = table_id.into();
        let started_at = self.clock.now();
        info!(session_id = %id, table_id = %table_id, players = initial_players.len(), "session started");

        self.session = Some(ActiveSession {
            id,
            table_id,
            started_at,
        });
        self.session_id.set(Some(id));
        self.active.set(true);
        self.elapsed = Duration::zero();
        self.publish();

        self.ticker = Some(Ticker::spawn(
            self.tick_period,
            self.tick_tx.clone(),
            move || SessionTick { session_id: id },
        ));
        id
    }

    /// Apply one tick. Returns `false` when the tick is stale: the session
    /// ended or the tick was scheduled for an earlier session.
    pub fn tick(&mut self, tick: &SessionTick) -> bool {
        if !self.is_active() {
            return false;
        }
        let Some(session) = self.session.as_ref() else {
            return false;
        };
        if session.id != tick.session_id {
            debug!(stale = %tick.session_id, current = %session.id, "ignoring stale tick");
            return false;
        }

        let elapsed = self.clock.now() - session.started_at;
        self.elapsed = elapsed.max(Duration::zero());
        self.publish();
        true
    }

    /// Stop the session and freeze elapsed time and cost.
    ///
    /// Returns `None` when there is no session or it already ended.
    pub fn end(&mut self) -> Option<SessionSummary> {
        let was_active = self.active.get();
        self.active.set(false);
        self.ticker = None;

        let session = self.session.as_ref()?;
        if !was_active {
            return None;
        }

        let summary = SessionSummary {
            session_id: session.id,
            table_id: session.table_id.clone(),
            started_at: session.started_at,
            ended_at: self.clock.now(),
            elapsed: self.elapsed,
            total_cost: self.total_cost,
            carambolas: self.carambolas.get(),
            entry_count: self.entry_count.get(),
        };
        info!(
            session_id = %summary.session_id,
            elapsed = %format_elapsed(summary.elapsed),
            cost = %format_currency(summary.total_cost),
            "session ended"
        );
        Some(summary)
    }

    /// Change the rate and republish cost from the stored elapsed time.
    /// Rates that are not finite and positive are ignored.
    pub fn set_price_per_minute(&mut self, rate: f64) -> bool {
        if !rate.is_finite() || rate <= 0.0 {
            debug!(rate, "ignoring invalid price per minute");
            return false;
        }
        self.price_per_minute.set(rate);
        self.publish();
        true
    }

    pub fn increment_carambolas(&mut self) -> u32 {
        increment(&self.carambolas)
    }

    pub fn decrement_carambolas(&mut self) -> u32 {
        decrement(&self.carambolas)
    }

    pub fn increment_entry_count(&mut self) -> u32 {
        increment(&self.entry_count)
    }

    pub fn decrement_entry_count(&mut self) -> u32 {
        decrement(&self.entry_count)
    }

    pub fn reset_counters(&mut self) {
        self.carambolas.set(0);
        self.entry_count.set(0);
    }

    pub fn is_active(&self) -> bool {
        self.active.get()
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.session.as_ref().map(|session| session.id)
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn total_cost(&self) -> f64 {
        self.total_cost
    }

    pub fn price_per_minute(&self) -> f64 {
        self.price_per_minute.get()
    }

    pub fn carambolas(&self) -> u32 {
        self.carambolas.get()
    }

    pub fn entry_count(&self) -> u32 {
        self.entry_count.get()
    }

    pub fn elapsed_display(&self) -> String {
        self.elapsed_display.get()
    }

    pub fn cost_display(&self) -> String {
        self.cost_display.get()
    }

    pub fn observe_session_id(&self) -> Observer<Option<SessionId>> {
        self.session_id.observe()
    }

    pub fn observe_active(&self) -> Observer<bool> {
        self.active.observe()
    }

    pub fn observe_elapsed(&self) -> Observer<String> {
        self.elapsed_display.observe()
    }

    pub fn observe_total_cost(&self) -> Observer<String> {
        self.cost_display.observe()
    }

    pub fn observe_price_per_minute(&self) -> Observer<f64> {
        self.price_per_minute.observe()
    }

    pub fn observe_carambolas(&self) -> Observer<u32> {
        self.carambolas.observe()
    }

    pub fn observe_entry_count(&self) -> Observer<u32> {
        self.entry_count.observe()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.session_id(),
            table_id: self.session.as_ref().map(|s| s.table_id.clone()),
            started_at: self.session.as_ref().map(|s| s.started_at),
            active: self.is_active(),
            elapsed: self.elapsed,
            elapsed_display: self.elapsed_display(),
            total_cost: self.total_cost,
            cost_display: self.cost_display(),
            price_per_minute: self.price_per_minute(),
            carambolas: self.carambolas(),
            entry_count: self.entry_count(),
        }
    }

    fn publish(&mut self) {
        let minutes = self.elapsed.num_milliseconds() as f64 / 60_000.0;
        self.total_cost = minutes * self.price_per_minute.get();
        self.elapsed_display.set(format_elapsed(self.elapsed));
        self.cost_display.set(format_currency(self.total_cost));
    }
}

fn increment(counter: &Signal<u32>) -> u32 {
    counter.update(|value| {
        *value = value.saturating_add(1);
        true
    });
    counter.get()
}

fn decrement(counter: &Signal<u32>) -> u32 {
    counter.update(|value| {
        if *value == 0 {
            return false;
        }
        *value -= 1;
        true
    });
    counter.get()
}
