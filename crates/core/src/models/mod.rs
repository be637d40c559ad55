#![allow(missing_docs)]

//! Shared domain models.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default table identifier used until the operator configures one.
pub const DEFAULT_TABLE_ID: &str = "table_1";
/// Placeholder camera stream URL.
pub const DEFAULT_CAMERA_URL: &str = "http://192.168.0.12:8080/video";
/// Default play rate in currency units per minute.
pub const DEFAULT_PRICE_PER_MINUTE: f64 = 5.0;
/// Default display name for the table.
pub const DEFAULT_TABLE_NAME: &str = "Mesa 1";

/// Opaque player identifier, unique for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(Uuid);

impl PlayerId {
    /// Generate a fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PlayerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Opaque session identifier assigned when a session starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Generate a fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Display color for a player card, as plain RGB.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl PlayerColor {
    /// Palette indexed by creation order.
    pub const PALETTE: [PlayerColor; 6] = [
        PlayerColor::rgb(0xFF, 0xFF, 0xFF), // white
        PlayerColor::rgb(0xFF, 0xD7, 0x00), // gold
        PlayerColor::rgb(0x90, 0xEE, 0x90), // light green
        PlayerColor::rgb(0xAD, 0xD8, 0xE6), // light blue
        PlayerColor::rgb(0xFF, 0xB6, 0xC1), // light pink
        PlayerColor::rgb(0xDD, 0xA0, 0xDD), // plum
    ];

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Color for the player created at `index`; indices past the palette
    /// fall back to the first entry.
    pub fn for_index(index: usize) -> Self {
        Self::PALETTE
            .get(index)
            .copied()
            .unwrap_or(Self::PALETTE[0])
    }

    /// Hex notation, e.g. `#FFD700`.
    pub fn hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

/// A player seated at the table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    /// Stable identifier assigned at creation.
    pub id: PlayerId,
    /// Display name, e.g. `Jugador 3`.
    pub name: String,
    /// Current score, never negative.
    pub score: u32,
    /// Card color picked from the creation-order palette.
    pub color: PlayerColor,
}

impl Player {
    /// Create the player occupying roster position `index` (zero based).
    pub fn numbered(index: usize) -> Self {
        Self {
            id: PlayerId::new(),
            name: default_player_name(index),
            score: 0,
            color: PlayerColor::for_index(index),
        }
    }
}

/// Default name for the player at roster position `index` (zero based).
pub fn default_player_name(index: usize) -> String {
    format!("Jugador {}", index + 1)
}

/// Configuration describing the table this terminal operates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableConfig {
    pub table_id: String,
    pub camera_url: String,
    pub price_per_minute: f64,
    pub table_name: String,
    pub is_active: bool,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            table_id: DEFAULT_TABLE_ID.to_string(),
            camera_url: DEFAULT_CAMERA_URL.to_string(),
            price_per_minute: DEFAULT_PRICE_PER_MINUTE,
            table_name: DEFAULT_TABLE_NAME.to_string(),
            is_active: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_falls_back_to_first_color() {
        assert_eq!(PlayerColor::for_index(1).hex(), "#FFD700");
        assert_eq!(PlayerColor::for_index(5), PlayerColor::PALETTE[5]);
        assert_eq!(PlayerColor::for_index(6), PlayerColor::PALETTE[0]);
        assert_eq!(PlayerColor::for_index(42), PlayerColor::PALETTE[0]);
    }

    #[test]
    fn numbered_players_use_one_based_names() {
        let player = Player::numbered(2);
        assert_eq!(player.name, "Jugador 3");
        assert_eq!(player.score, 0);
        assert_eq!(player.color, PlayerColor::PALETTE[2]);
        assert_ne!(player.id, Player::numbered(2).id);
    }
}
