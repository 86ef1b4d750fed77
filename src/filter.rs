use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::models::ActivityRecord;

/// Quick ranges offered next to the date pickers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatePreset {
    #[serde(alias = "hoy")]
    Today,
    #[serde(rename = "last_7_days", alias = "7d")]
    Last7Days,
    #[serde(rename = "last_30_days", alias = "30d")]
    Last30Days,
    #[serde(alias = "todo")]
    All,
}

/// Inclusive calendar-day range in UTC. Open ends are unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        Self { from, to }.normalized()
    }

    pub fn from_preset(preset: DatePreset, today: NaiveDate) -> Self {
        match preset {
            DatePreset::All => Self::default(),
            DatePreset::Today => Self::new(Some(today), Some(today)),
            DatePreset::Last7Days => Self::new(Some(today - Duration::days(6)), Some(today)),
            DatePreset::Last30Days => Self::new(Some(today - Duration::days(29)), Some(today)),
        }
    }

    /// Swaps the bounds when they were entered backwards.
    pub fn normalized(self) -> Self {
        match (self.from, self.to) {
            (Some(from), Some(to)) if from > to => Self {
                from: Some(to),
                to: Some(from),
            },
            _ => self,
        }
    }

    pub fn is_unbounded(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }

    /// With no bounds everything passes, undated rows included. Any bound
    /// requires a date.
    pub fn contains(&self, date: Option<DateTime<Utc>>) -> bool {
        if self.is_unbounded() {
            return true;
        }
        let Some(day) = date.map(|d| d.date_naive()) else {
            return false;
        };
        self.from.map_or(true, |from| day >= from) && self.to.map_or(true, |to| day <= to)
    }
}

/// Which activity rows a view shows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivityFilter {
    /// Keep only rows this person owns (not rows where they are backup).
    pub owner: Option<String>,
    pub range: DateRange,
}

impl ActivityFilter {
    pub fn owned_by(email: &str) -> Self {
        Self {
            owner: Some(email.trim().to_lowercase()),
            range: DateRange::default(),
        }
    }

    pub fn with_range(mut self, range: DateRange) -> Self {
        self.range = range.normalized();
        self
    }

    pub fn matches(&self, activity: &ActivityRecord) -> bool {
        let owner_ok = self.owner.as_deref().map_or(true, |owner| {
            activity.owner_email.trim().to_lowercase() == owner.trim().to_lowercase()
        });
        owner_ok && self.range.contains(activity.date)
    }

    pub fn apply(&self, activities: &[ActivityRecord]) -> Vec<ActivityRecord> {
        activities
            .iter()
            .filter(|a| self.matches(a))
            .cloned()
            .collect()
    }
}
