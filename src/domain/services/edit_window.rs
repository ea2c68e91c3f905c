//! Message edit time window.
//!
//! A sender may edit a message for `base` after creating it. Messages created
//! on one of the `extended_weekdays` (evaluated in the configured UTC offset)
//! get an additional `extension` on top of that.

use chrono::{DateTime, Datelike, Duration, FixedOffset, Offset, Utc, Weekday};

pub const DEFAULT_EDIT_WINDOW_MINUTES: i64 = 15;
pub const DEFAULT_WEEKDAY_EXTENSION_MINUTES: i64 = 120;

/// Window lengths that cannot be represented as a duration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("edit window of {base_minutes}+{extension_minutes} minutes is out of range")]
pub struct EditWindowError {
    pub base_minutes: i64,
    pub extension_minutes: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditWindow {
    base: Duration,
    extended: Duration,
    extended_weekdays: Vec<Weekday>,
    offset: FixedOffset,
}

impl EditWindow {
    /// Build a window policy. Negative lengths count as zero and an
    /// out-of-range offset falls back to UTC.
    pub fn new(
        base_minutes: i64,
        extension_minutes: i64,
        extended_weekdays: Vec<Weekday>,
        utc_offset_minutes: i32,
    ) -> Result<Self, EditWindowError> {
        let out_of_range = || EditWindowError {
            base_minutes,
            extension_minutes,
        };
        let base = Duration::try_minutes(base_minutes.max(0)).ok_or_else(out_of_range)?;
        let extended = Duration::try_minutes(extension_minutes.max(0))
            .and_then(|extension| base.checked_add(&extension))
            .ok_or_else(out_of_range)?;

        let offset = utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .unwrap_or_else(|| Utc.fix());

        Ok(Self {
            base,
            extended,
            extended_weekdays,
            offset,
        })
    }

    /// Total time allowed for editing a message created at `created_at`.
    pub fn allowed_for(&self, created_at: DateTime<Utc>) -> Duration {
        let weekday = created_at.with_timezone(&self.offset).weekday();
        if self.extended_weekdays.contains(&weekday) {
            self.extended
        } else {
            self.base
        }
    }

    /// Whether an edit at `now` is still permitted. The boundary instant is.
    pub fn permits(&self, created_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(created_at) <= self.allowed_for(created_at)
    }
}

impl Default for EditWindow {
    fn default() -> Self {
        Self {
            base: Duration::minutes(DEFAULT_EDIT_WINDOW_MINUTES),
            extended: Duration::minutes(DEFAULT_EDIT_WINDOW_MINUTES + DEFAULT_WEEKDAY_EXTENSION_MINUTES),
            extended_weekdays: vec![Weekday::Sat, Weekday::Sun],
            offset: Utc.fix(),
        }
    }
}
