//! # Retention Policy
//!
//! Decides which snapshots of a stage fall outside its retention window.
//!
//! The window is anchored at the latest snapshot (greatest
//! `(timestamp, version)`), not at the wall clock:
//!
//! ```text
//! boundary = latest.timestamp - window
//! evict    = { s | s.timestamp < boundary }
//! ```
//!
//! Months and years are calendar units: one month before March 31 is the last
//! day of February. The latest snapshot is never evicted, and a stage without
//! a rule, or without snapshots, plans nothing.

use crate::store::StageFile;
use chrono::{Months, NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};

// =============================================================================
// RULE
// =============================================================================

/// A relative time window, e.g. `{ days = 30 }`.
///
/// Every unit defaults to zero. A rule with every unit at zero keeps
/// everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetentionRule {
    pub years: i32,
    pub months: i32,
    pub weeks: i64,
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
}

impl RetentionRule {
    /// Window of `days` days.
    #[must_use]
    pub fn days(days: i64) -> Self {
        Self {
            days,
            ..Self::default()
        }
    }

    /// Window of `months` calendar months.
    #[must_use]
    pub fn months(months: i32) -> Self {
        Self {
            months,
            ..Self::default()
        }
    }

    /// True when every unit is zero.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// True when any unit is below zero.
    #[must_use]
    pub fn has_negative_unit(&self) -> bool {
        self.years < 0
            || self.months < 0
            || [self.weeks, self.days, self.hours, self.minutes, self.seconds]
                .iter()
                .any(|unit| *unit < 0)
    }

    /// Subtract the window from `anchor`.
    ///
    /// Calendar units apply first, then the fixed-length ones. Returns `None`
    /// when the result leaves the representable date range.
    #[must_use]
    pub fn boundary(&self, anchor: NaiveDateTime) -> Option<NaiveDateTime> {
        let months = i64::from(self.years)
            .checked_mul(12)?
            .checked_add(i64::from(self.months))?;
        let shifted = if months >= 0 {
            anchor.checked_sub_months(Months::new(u32::try_from(months).ok()?))?
        } else {
            anchor.checked_add_months(Months::new(u32::try_from(-months).ok()?))?
        };

        let fixed = TimeDelta::try_weeks(self.weeks)?
            .checked_add(&TimeDelta::try_days(self.days)?)?
            .checked_add(&TimeDelta::try_hours(self.hours)?)?
            .checked_add(&TimeDelta::try_minutes(self.minutes)?)?
            .checked_add(&TimeDelta::try_seconds(self.seconds)?)?;
        shifted.checked_sub_signed(fixed)
    }
}

// =============================================================================
// PLAN
// =============================================================================

/// Outcome of applying a rule to one stage listing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RetentionPlan {
    /// Cutoff timestamp; `None` when nothing was evaluated.
    pub boundary: Option<NaiveDateTime>,
    /// Snapshots strictly older than the boundary, oldest first.
    pub evict: Vec<StageFile>,
}

impl RetentionPlan {
    /// True when nothing is to be evicted.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.evict.is_empty()
    }
}

/// Stateless planner over a stage listing.
#[derive(Debug, Clone, Copy, Default)]
pub struct RetentionPolicy;

impl RetentionPolicy {
    /// Plan which of `files` fall outside `rule`.
    #[must_use]
    pub fn plan(rule: Option<&RetentionRule>, files: &[StageFile]) -> RetentionPlan {
        let Some(rule) = rule.filter(|rule| !rule.is_empty()) else {
            return RetentionPlan::default();
        };
        let Some(latest) = files.iter().max_by(|a, b| a.cmp_latest(b)) else {
            return RetentionPlan::default();
        };
        let Some(anchor) = latest.tokens.timestamp else {
            tracing::debug!(file = %latest.filename, "latest snapshot has no timestamp, skipping retention");
            return RetentionPlan::default();
        };
        let Some(boundary) = rule.boundary(anchor) else {
            tracing::warn!(%anchor, ?rule, "retention window leaves the date range, skipping");
            return RetentionPlan::default();
        };

        let mut evict: Vec<StageFile> = files
            .iter()
            .filter(|file| file.filename != latest.filename)
            .filter(|file| file.tokens.timestamp.is_some_and(|ts| ts < boundary))
            .cloned()
            .collect();
        evict.sort_by(StageFile::cmp_latest);

        RetentionPlan {
            boundary: Some(boundary),
            evict,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
