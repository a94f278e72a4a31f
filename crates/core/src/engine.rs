//! Score-state engine: roster, rounds, totals, ranks and archived games.

use std::fmt::Write as _;

use chrono::{Local, NaiveDate};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    config::AppConfig,
    history::History,
    models::{normalize_name, GameRecord, Player, PlayerId, RecordId, MAX_ROUNDS},
    notify::{Notification, NotificationSender},
};

/// Largest roster a game accepts.
pub const MAX_PLAYERS: usize = 8;

const FALLBACK_DATE_FORMAT: &str = "%d/%m/%Y";

/// Reasons a player could not be added.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AddPlayerRejected {
    /// Name was empty once surrounding whitespace was removed.
    #[error("player name is empty")]
    EmptyName,
    /// The roster already holds [`MAX_PLAYERS`] players.
    #[error("roster already holds {} players", MAX_PLAYERS)]
    RosterFull,
}

/// Reasons a game could not be finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FinishRejected {
    /// No players are on the roster.
    #[error("no players in the game")]
    EmptyRoster,
    /// Nobody has a recorded score yet.
    #[error("no scores have been entered")]
    NoScores,
}

/// Parse a raw score field, falling back to zero.
///
/// Leading whitespace and a single `+`/`-` sign are accepted, followed by the
/// longest run of ASCII digits; anything after the digits is ignored. Input
/// without digits yields `0`. Values outside the `i64` range saturate.
pub fn parse_score_input(raw: &str) -> i64 {
    let text = raw.trim_start();
    let (negative, digits) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };

    let mut value: i64 = 0;
    let mut seen_digit = false;
    for byte in digits.bytes().take_while(u8::is_ascii_digit) {
        seen_digit = true;
        let digit = i64::from(byte - b'0');
        value = value.saturating_mul(10);
        value = if negative {
            value.saturating_sub(digit)
        } else {
            value.saturating_add(digit)
        };
    }

    if seen_digit {
        value
    } else {
        0
    }
}

/// Complete mutable state of a scoring session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    roster: Vec<Player>,
    current_round: u32,
    history: History,
    next_player_id: u64,
    next_record_id: u64,
}

impl SessionState {
    fn new(history_limit: Option<usize>) -> Self {
        Self {
            roster: Vec::new(),
            current_round: 1,
            history: History::with_limit(history_limit),
            next_player_id: 1,
            next_record_id: 1,
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new(None)
    }
}

/// Owns the roster, round counter and archive of a scoring session.
#[derive(Debug)]
pub struct ScoreEngine {
    state: SessionState,
    date_format: String,
    notifier: Option<NotificationSender>,
}

impl Default for ScoreEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ScoreEngine {
    /// Engine with default settings and no notification channel.
    pub fn new() -> Self {
        Self {
            state: SessionState::default(),
            date_format: FALLBACK_DATE_FORMAT.to_string(),
            notifier: None,
        }
    }

    /// Engine honouring the history cap and date format from `config`.
    pub fn with_config(config: &AppConfig) -> Self {
        Self {
            state: SessionState::new(config.history_limit),
            date_format: config.date_format.clone(),
            notifier: None,
        }
    }

    /// Attach the channel receiving user-facing notifications.
    pub fn with_notifier(mut self, sender: NotificationSender) -> Self {
        self.notifier = Some(sender);
        self
    }

    /// Snapshot-comparable view of the whole session.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Players in insertion order.
    pub fn roster(&self) -> &[Player] {
        &self.state.roster
    }

    /// Look up a player on the roster.
    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.state.roster.iter().find(|player| player.id == id)
    }

    /// 1-based round currently being entered; also the number of table rows.
    pub fn current_round(&self) -> u32 {
        self.state.current_round
    }

    /// Archived games, newest first.
    pub fn history(&self) -> &History {
        &self.state.history
    }

    /// Whether [`ScoreEngine::add_player`] would accept `name` right now.
    pub fn can_add_player(&self, name: &str) -> Result<(), AddPlayerRejected> {
        if normalize_name(name).is_none() {
            return Err(AddPlayerRejected::EmptyName);
        }
        if self.state.roster.len() >= MAX_PLAYERS {
            return Err(AddPlayerRejected::RosterFull);
        }
        Ok(())
    }

    /// Append a player named `name` (trimmed, capped at 20 characters).
    pub fn add_player(&mut self, name: &str) -> Result<Player, AddPlayerRejected> {
        self.can_add_player(name)?;
        let name = normalize_name(name).ok_or(AddPlayerRejected::EmptyName)?;

        let id = PlayerId(self.state.next_player_id);
        self.state.next_player_id += 1;
        let player = Player::new(id, name);
        self.state.roster.push(player.clone());

        info!(player = %player.name, %id, roster = self.state.roster.len(), "Player added");
        self.notify(Notification::player_added(&player.name));
        Ok(player)
    }

    /// Remove a player, keeping the order of the others. Returns whether one was removed.
    pub fn remove_player(&mut self, id: PlayerId) -> bool {
        let before = self.state.roster.len();
        self.state.roster.retain(|player| player.id != id);
        let removed = self.state.roster.len() != before;
        if removed {
            info!(%id, roster = self.state.roster.len(), "Player removed");
        }
        removed
    }

    /// Record `raw` (coerced by [`parse_score_input`]) for a zero-based round.
    ///
    /// Returns `false` and changes nothing when no player has `id` or when
    /// `round_index` is not below [`MAX_ROUNDS`].
    pub fn update_score(&mut self, id: PlayerId, round_index: usize, raw: &str) -> bool {
        let value = parse_score_input(raw);
        let Some(player) = self.state.roster.iter_mut().find(|player| player.id == id) else {
            return false;
        };
        if !player.set_score(round_index, value) {
            warn!(%id, round_index, "Score round out of range");
            return false;
        }
        debug!(%id, round_index, value, total = player.total(), "Score updated");
        true
    }

    /// Open the next round. Returns `false` and leaves state untouched when the roster is empty.
    pub fn add_round(&mut self) -> bool {
        if self.state.roster.is_empty() {
            return false;
        }
        self.state.current_round += 1;
        let round = self.state.current_round;
        info!(round, "Round started");
        self.notify(Notification::round_started(round));
        true
    }

    /// Archive the current game dated today.
    ///
    /// The caller is responsible for scheduling [`ScoreEngine::reset_game`]
    /// once the celebration delay has elapsed.
    pub fn finish_game(&mut self) -> Result<GameRecord, FinishRejected> {
        self.finish_game_on(Local::now().date_naive())
    }

    /// Archive the current game with an explicit archive date.
    pub fn finish_game_on(&mut self, date: NaiveDate) -> Result<GameRecord, FinishRejected> {
        if self.state.roster.is_empty() {
            return Err(FinishRejected::EmptyRoster);
        }
        if !self.state.roster.iter().any(Player::has_scores) {
            return Err(FinishRejected::NoScores);
        }
        let winner = self.winner().ok_or(FinishRejected::EmptyRoster)?;
        let winner_name = winner.name.clone();
        let winner_total = winner.total();

        let record = GameRecord {
            id: RecordId(self.state.next_record_id),
            date: self.format_date(date),
            archived_on: date,
            players: self.state.roster.clone(),
            winner: winner_name,
            winner_total,
        };
        self.state.next_record_id += 1;
        self.state.history.push_front(record.clone());

        info!(
            record = %record.id,
            winner = %record.winner,
            total = record.winner_total,
            players = record.players.len(),
            "Game archived"
        );
        self.notify(Notification::game_finished(
            &record.winner,
            record.winner_total,
        ));
        Ok(record)
    }

    /// Clear the roster and return to round 1. History is kept.
    pub fn reset_game(&mut self) {
        self.state.roster.clear();
        self.state.current_round = 1;
        info!(archived = self.state.history.len(), "Game reset");
    }

    /// Current leader: lowest total, earliest roster position on ties.
    pub fn winner(&self) -> Option<&Player> {
        self.state.roster.iter().min_by_key(|player| player.total())
    }

    /// Roster ordered by ascending total; ties keep roster order.
    pub fn standings(&self) -> Vec<&Player> {
        let mut sorted: Vec<&Player> = self.state.roster.iter().collect();
        sorted.sort_by_key(|player| player.total());
        sorted
    }

    /// 1-based rank of the player with `id`, or `None` when not on the roster.
    pub fn rank_of(&self, id: PlayerId) -> Option<usize> {
        self.standings()
            .iter()
            .position(|player| player.id == id)
            .map(|index| index + 1)
    }

    /// 1-based rank of `player`; `0` when the player is not on the roster.
    pub fn player_rank(&self, player: &Player) -> usize {
        self.rank_of(player.id).unwrap_or(0)
    }

    fn format_date(&self, date: NaiveDate) -> String {
        let mut formatted = String::new();
        if write!(formatted, "{}", date.format(&self.date_format)).is_err() {
            formatted = date.format(FALLBACK_DATE_FORMAT).to_string();
        }
        formatted
    }

    fn notify(&self, notification: Notification) {
        if let Some(sender) = &self.notifier {
            if sender.send(notification).is_err() {
                debug!("Notification receiver dropped");
            }
        }
    }
}
