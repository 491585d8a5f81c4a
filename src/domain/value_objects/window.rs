use chrono::{DateTime, TimeDelta, Utc};

use crate::domain::entities::alert::AlertId;

/// Half-open time range `[start, end)` over stored alerts.
///
/// `through` optionally caps the row ids affected, so an update issued after
/// a read only touches rows that read could see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub through: Option<AlertId>,
}

impl AlertWindow {
    #[must_use]
    pub const fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start,
            end,
            through: None,
        }
    }

    /// The `period` immediately preceding `end`.
    #[must_use]
    pub fn trailing(end: DateTime<Utc>, period: TimeDelta) -> Self {
        Self::new(end - period, end)
    }

    /// Restrict the window to rows with id `<= id`.
    #[must_use]
    pub fn through(mut self, id: AlertId) -> Self {
        self.through = Some(id);
        self
    }

    #[must_use]
    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        self.start <= timestamp && timestamp < self.end
    }

    /// Whether a row with this id and timestamp falls inside the window.
    #[must_use]
    pub fn admits(&self, id: AlertId, timestamp: DateTime<Utc>) -> bool {
        self.contains(timestamp) && self.through.map_or(true, |max| id <= max)
    }
}
