//! Shared domain models.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Maximum number of characters kept from a player name.
pub const MAX_NAME_LEN: usize = 20;

/// Number of round slots a player can hold; higher indices are rejected.
pub const MAX_ROUNDS: usize = 1000;

/// Opaque identifier of a player, unique for the lifetime of an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(pub(crate) u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}", self.0)
    }
}

/// Opaque identifier of an archived game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordId(pub(crate) u64);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "g{}", self.0)
    }
}

/// A participant in the current game together with their per-round scores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    /// Stable identifier assigned on creation.
    pub id: PlayerId,
    /// Trimmed display name, at most [`MAX_NAME_LEN`] characters.
    pub name: String,
    /// One slot per round; `None` marks a round without an entry.
    pub scores: Vec<Option<i64>>,
}

impl Player {
    pub(crate) fn new(id: PlayerId, name: String) -> Self {
        Self {
            id,
            name,
            scores: Vec::new(),
        }
    }

    /// Sum of every recorded score, absent rounds counting as zero.
    pub fn total(&self) -> i64 {
        self.scores
            .iter()
            .map(|score| score.unwrap_or_default())
            .fold(0_i64, i64::saturating_add)
    }

    /// Score recorded for the given zero-based round, if any.
    pub fn score(&self, round_index: usize) -> Option<i64> {
        self.scores.get(round_index).copied().flatten()
    }

    /// Whether any round slot exists for this player.
    pub fn has_scores(&self) -> bool {
        !self.scores.is_empty()
    }

    /// Store `value` for a round, growing with absent slots. Returns `false`
    /// without touching the scores when `round_index` is not below [`MAX_ROUNDS`].
    pub(crate) fn set_score(&mut self, round_index: usize, value: i64) -> bool {
        let Some(len) = round_index.checked_add(1).filter(|len| *len <= MAX_ROUNDS) else {
            return false;
        };
        if self.scores.len() < len {
            self.scores.resize(len, None);
        }
        self.scores[round_index] = Some(value);
        true
    }
}

/// Trim a raw name and cap it at [`MAX_NAME_LEN`] characters.
///
/// Returns `None` when nothing but whitespace remains.
pub fn normalize_name(raw: &str) -> Option<String> {
    let capped: String = raw.trim().chars().take(MAX_NAME_LEN).collect();
    let trimmed = capped.trim_end();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Snapshot of a finished game kept in the history log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRecord {
    /// Identifier of the archived game.
    pub id: RecordId,
    /// Date the game was archived, formatted for display.
    pub date: String,
    /// Raw archive date.
    pub archived_on: NaiveDate,
    /// Independent copy of the roster at archive time.
    pub players: Vec<Player>,
    /// Name of the player with the lowest total.
    pub winner: String,
    /// Total of the winning player.
    pub winner_total: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_skips_absent_rounds() {
        let mut player = Player::new(PlayerId(1), "Ana".to_string());
        player.set_score(0, 10);
        player.set_score(3, 5);
        assert_eq!(player.scores, vec![Some(10), None, None, Some(5)]);
        assert_eq!(player.total(), 15);
        assert_eq!(player.score(1), None);
        assert_eq!(player.score(9), None);
    }

    #[test]
    fn set_score_keeps_later_entries() {
        let mut player = Player::new(PlayerId(1), "Ana".to_string());
        player.set_score(4, 2);
        player.set_score(1, 6);
        assert_eq!(player.scores, vec![None, Some(6), None, None, Some(2)]);
        assert_eq!(player.total(), 8);
    }

    #[test]
    fn set_score_rejects_out_of_range_rounds() {
        let mut player = Player::new(PlayerId(1), "Ana".to_string());
        assert!(player.set_score(MAX_ROUNDS - 1, 1));
        assert_eq!(player.scores.len(), MAX_ROUNDS);

        let mut player = Player::new(PlayerId(1), "Ana".to_string());
        assert!(!player.set_score(MAX_ROUNDS, 1));
        assert!(!player.set_score(usize::MAX, 1));
        assert!(player.scores.is_empty());
    }

    #[test]
    fn normalize_name_trims_and_caps() {
        assert_eq!(normalize_name("  Lea  ").as_deref(), Some("Lea"));
        assert_eq!(normalize_name("   "), None);
        assert_eq!(normalize_name(""), None);
        let long = normalize_name("abcdefghijklmnopqrstuvwxyz").unwrap();
        assert_eq!(long, "abcdefghijklmnopqrst");
        let accented = normalize_name("éééééééééééééééééééééé").unwrap();
        assert_eq!(accented.chars().count(), MAX_NAME_LEN);
    }
}
