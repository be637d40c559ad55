#![warn(clippy::all, missing_docs)]

//! Core logic for the billiard table terminal.
//!
//! This crate hosts the session timer and cost accrual, the player roster,
//! table settings and preferences, the camera panel state, and the optional
//! remote session API used by the terminal UI and any future frontends.

pub mod api;
pub mod camera;
pub mod clock;
pub mod config;
pub mod controller;
pub mod format;
pub mod models;
pub mod preferences;
pub mod roster;
pub mod session;
pub mod settings;
pub mod signal;
pub mod ticker;

pub use config::AppConfig;
pub use controller::{TableController, TableEvent};
pub use models::{Player, PlayerId, SessionId, TableConfig};
pub use roster::Roster;
pub use session::{SessionSnapshot, SessionSummary, SessionTick, SessionTimer};
pub use settings::TableSettings;
