//! Log of archived games, most recent first.

use std::collections::VecDeque;

use crate::models::GameRecord;

/// Number of archived games surfaced to the presentation layer by default.
pub const DEFAULT_DISPLAY_COUNT: usize = 5;

/// In-memory archive of finished games.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct History {
    records: VecDeque<GameRecord>,
    limit: Option<usize>,
}

impl History {
    /// Create an archive that drops its oldest entries beyond `limit`.
    pub fn with_limit(limit: Option<usize>) -> Self {
        Self {
            records: VecDeque::new(),
            limit,
        }
    }

    /// Insert a record as the newest entry.
    pub fn push_front(&mut self, record: GameRecord) {
        self.records.push_front(record);
        if let Some(limit) = self.limit {
            self.records.truncate(limit);
        }
    }

    /// The `count` most recent records, newest first.
    pub fn recent(&self, count: usize) -> impl Iterator<Item = &GameRecord> {
        self.records.iter().take(count)
    }

    /// All records, newest first.
    pub fn iter(&self) -> impl Iterator<Item = &GameRecord> {
        self.records.iter()
    }

    /// Most recently archived record.
    pub fn latest(&self) -> Option<&GameRecord> {
        self.records.front()
    }

    /// Number of archived games.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no game has been archived yet.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RecordId;
    use chrono::NaiveDate;

    fn record(id: u64) -> GameRecord {
        GameRecord {
            id: RecordId(id),
            date: "01/01/2026".to_string(),
            archived_on: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            players: Vec::new(),
            winner: format!("winner {id}"),
            winner_total: 0,
        }
    }

    #[test]
    fn newest_first() {
        let mut history = History::default();
        for id in 1..=7 {
            history.push_front(record(id));
        }
        let recent: Vec<_> = history.recent(DEFAULT_DISPLAY_COUNT).map(|r| r.id).collect();
        assert_eq!(
            recent,
            vec![RecordId(7), RecordId(6), RecordId(5), RecordId(4), RecordId(3)]
        );
        assert_eq!(history.len(), 7);
        assert_eq!(history.latest().map(|r| r.id), Some(RecordId(7)));
    }

    #[test]
    fn limit_drops_oldest() {
        let mut history = History::with_limit(Some(2));
        history.push_front(record(1));
        history.push_front(record(2));
        history.push_front(record(3));
        let ids: Vec<_> = history.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![RecordId(3), RecordId(2)]);
    }
}
