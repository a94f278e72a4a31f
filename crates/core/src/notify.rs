//! User-facing notifications emitted by the engine.

use tokio::sync::mpsc;

/// Which engine event produced a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    /// A player joined the roster.
    PlayerAdded,
    /// A new round became editable.
    RoundStarted,
    /// A game was archived and a winner named.
    GameFinished,
}

/// Title/description pair shown to the user as feedback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Event that triggered the notification.
    pub kind: NotificationKind,
    /// Short headline.
    pub title: String,
    /// Longer human-readable detail.
    pub description: String,
}

impl Notification {
    pub(crate) fn player_added(name: &str) -> Self {
        Self {
            kind: NotificationKind::PlayerAdded,
            title: "Player added".to_string(),
            description: format!("{name} joined the game"),
        }
    }

    pub(crate) fn round_started(round: u32) -> Self {
        Self {
            kind: NotificationKind::RoundStarted,
            title: "New round".to_string(),
            description: format!("Round {round} started"),
        }
    }

    pub(crate) fn game_finished(winner: &str, total: i64) -> Self {
        Self {
            kind: NotificationKind::GameFinished,
            title: "Game over!".to_string(),
            description: format!("{winner} wins the game with {total} points!"),
        }
    }
}

/// Sending half handed to the engine.
pub type NotificationSender = mpsc::UnboundedSender<Notification>;
/// Receiving half drained by the presentation layer.
pub type NotificationReceiver = mpsc::UnboundedReceiver<Notification>;

/// Create a connected notification channel.
pub fn channel() -> (NotificationSender, NotificationReceiver) {
    mpsc::unbounded_channel()
}
