//! Ordered, bounded player roster.

use tracing::debug;

use crate::{
    models::{Player, PlayerId},
    signal::{Observer, Signal},
};

/// Fewest players a roster may hold.
pub const MIN_PLAYERS: usize = 2;
/// Most players a roster may hold.
pub const MAX_PLAYERS: usize = 6;

/// Players at the table in seating order.
///
/// The player count always stays within [`MIN_PLAYERS`]..=[`MAX_PLAYERS`].
/// Out-of-bounds requests and unknown ids are absorbed silently; the return
/// values only tell the caller whether anything changed.
#[derive(Debug)]
pub struct Roster {
    players: Signal<Vec<Player>>,
}

impl Roster {
    /// Create a roster with the two initial players.
    pub fn new() -> Self {
        let mut roster = Self {
            players: Signal::new(Vec::new()),
        };
        roster.initialize();
        roster
    }

    /// Replace the roster with `Jugador 1` and `Jugador 2`.
    pub fn initialize(&mut self) {
        let players = (0..MIN_PLAYERS).map(Player::numbered).collect();
        self.players.set(players);
    }

    /// Append the next numbered player, unless the roster is full.
    pub fn add_player(&mut self) -> Option<PlayerId> {
        let mut added = None;
        self.players.update(|players| {
            if players.len() >= MAX_PLAYERS {
                return false;
            }
            let player = Player::numbered(players.len());
            debug!(player = %player.name, "player added");
            added = Some(player.id);
            players.push(player);
            true
        });
        added
    }

    /// Remove the most recently added player, unless only the minimum remain.
    pub fn remove_player(&mut self) -> Option<Player> {
        let mut removed = None;
        self.players.update(|players| {
            if players.len() <= MIN_PLAYERS {
                return false;
            }
            removed = players.pop();
            removed.is_some()
        });
        if let Some(player) = removed.as_ref() {
            debug!(player = %player.name, "player removed");
        }
        removed
    }

    /// Add `delta` to a player's score, clamping at zero. Returns the new
    /// score, or `None` for an unknown id.
    pub fn update_score(&mut self, player_id: &PlayerId, delta: i32) -> Option<u32> {
        let mut new_score = None;
        self.players.update(|players| {
            let Some(player) = players.iter_mut().find(|p| p.id == *player_id) else {
                return false;
            };
            let score = (i64::from(player.score) + i64::from(delta)).clamp(0, i64::from(u32::MAX));
            let score = score as u32;
            new_score = Some(score);
            if score == player.score {
                return false;
            }
            player.score = score;
            true
        });
        new_score
    }

    /// Zero every score, keeping names, colors and order.
    pub fn reset_scores(&mut self) {
        self.players.update(|players| {
            let mut changed = false;
            for player in players.iter_mut().filter(|p| p.score != 0) {
                player.score = 0;
                changed = true;
            }
            changed
        });
    }

    /// Look up a player by id.
    pub fn get_player(&self, player_id: &PlayerId) -> Option<Player> {
        self.players
            .with(|players| players.iter().find(|p| p.id == *player_id).cloned())
    }

    /// Current players in seating order.
    pub fn players(&self) -> Vec<Player> {
        self.players.get()
    }

    /// Names in seating order.
    pub fn player_names(&self) -> Vec<String> {
        self.players
            .with(|players| players.iter().map(|p| p.name.clone()).collect())
    }

    /// Number of players.
    pub fn len(&self) -> usize {
        self.players.with(Vec::len)
    }

    /// Never true after construction.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Split for a two-column display; the left side takes the extra player
    /// when the count is odd.
    pub fn halves(&self) -> (Vec<Player>, Vec<Player>) {
        self.players.with(|players| {
            let split = players.len().div_ceil(2);
            (players[..split].to_vec(), players[split..].to_vec())
        })
    }

    /// Subscribe to roster changes.
    pub fn observe(&self) -> Observer<Vec<Player>> {
        self.players.observe()
    }
}

impl Default for Roster {
    fn default() -> Self {
        Self::new()
    }
}
