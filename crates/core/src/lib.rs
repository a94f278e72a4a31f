#![warn(clippy::all, missing_docs)]

//! Core domain logic for Tally, a card game score keeper.
//!
//! This crate hosts the score engine, the data models it operates on,
//! the archive of finished games, the notification channel and the
//! configuration shared with the terminal UI.

pub mod config;
pub mod engine;
pub mod history;
pub mod models;
pub mod notify;

pub use config::AppConfig;
pub use engine::{
    parse_score_input, AddPlayerRejected, FinishRejected, ScoreEngine, SessionState, MAX_PLAYERS,
};
pub use history::History;
pub use models::{GameRecord, Player, PlayerId, RecordId};
pub use notify::{Notification, NotificationKind};
