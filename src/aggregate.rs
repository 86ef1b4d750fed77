//! Keyed sums over activity snapshots.
//!
//! Every breakdown chart is `group_sum` with a different key/value
//! projection.

use std::collections::HashMap;

use crate::models::{ActivityRecord, AggregatedBucket, Initiative};
use crate::period::{monthly_minutes, weekly_minutes};

/// Bucket label for records whose key is blank.
pub const MISSING_KEY: &str = "(sin dato)";

/// Bucket label for records with no tool listed.
pub const MISSING_TOOL: &str = "(sin herramienta)";

/// Separators accepted between tools in the free-text tools column.
pub const TOOL_SEPARATORS: [char; 4] = [',', ';', '|', '/'];

/// Non-finite and negative measures count as zero.
pub fn clamp_measure(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

/// Sums `value` per trimmed `key`, largest bucket first.
///
/// Ties keep the order in which their keys were first seen.
pub fn group_sum<T, K, V>(records: &[T], key: K, value: V) -> Vec<AggregatedBucket>
where
    K: Fn(&T) -> String,
    V: Fn(&T) -> f64,
{
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut buckets: Vec<AggregatedBucket> = Vec::new();

    for record in records {
        let raw_key = key(record);
        let trimmed = raw_key.trim();
        let label = if trimmed.is_empty() { MISSING_KEY } else { trimmed };
        let amount = clamp_measure(value(record));

        match index.get(label) {
            Some(&i) => buckets[i].value += amount,
            None => {
                index.insert(label.to_string(), buckets.len());
                buckets.push(AggregatedBucket {
                    key: label.to_string(),
                    value: amount,
                });
            }
        }
    }

    // sort_by is stable, so equal totals stay in first-seen order
    buckets.sort_by(|a, b| b.value.total_cmp(&a.value));
    buckets
}

/// Splits a tools column into trimmed, non-empty tokens.
pub fn tool_tokens(tools: &str) -> Vec<&str> {
    tools
        .split(TOOL_SEPARATORS)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect()
}

/// First listed tool, used as the tool breakdown key.
pub fn primary_tool(tools: &str) -> Option<&str> {
    tool_tokens(tools).into_iter().next()
}

pub fn by_category(activities: &[ActivityRecord]) -> Vec<AggregatedBucket> {
    group_sum(activities, |a| a.category.clone(), |a| a.minutes)
}

pub fn by_periodicity(activities: &[ActivityRecord]) -> Vec<AggregatedBucket> {
    group_sum(activities, |a| a.periodicity.clone(), |a| a.minutes)
}

pub fn by_activity(activities: &[ActivityRecord]) -> Vec<AggregatedBucket> {
    group_sum(activities, |a| a.name.clone(), |a| a.minutes)
}

pub fn by_primary_tool(activities: &[ActivityRecord]) -> Vec<AggregatedBucket> {
    group_sum(
        activities,
        |a| primary_tool(&a.tools).unwrap_or(MISSING_TOOL).to_string(),
        |a| a.minutes,
    )
}

/// Weekly-normalized minutes per initiative.
///
/// Rows are grouped by initiative id, so two initiatives sharing a name stay
/// separate buckets. Activities without an initiative are left out.
/// Activities pointing at an initiative missing from `initiatives` are
/// labelled `"ID {id}"`.
pub fn by_initiative_weekly(
    initiatives: &[Initiative],
    activities: &[ActivityRecord],
) -> Vec<AggregatedBucket> {
    let names = initiative_names(initiatives);
    let linked: Vec<(i64, &ActivityRecord)> = activities
        .iter()
        .filter_map(|a| Some((a.initiative_id?, a)))
        .collect();

    group_sum(
        &linked,
        |(id, _)| id.to_string(),
        |(_, a)| weekly_minutes(a.minutes, &a.periodicity),
    )
    .into_iter()
    .map(|bucket| {
        let name = bucket
            .key
            .parse::<i64>()
            .ok()
            .and_then(|id| names.get(&id).cloned())
            .unwrap_or_else(|| format!("ID {}", bucket.key));
        AggregatedBucket {
            key: name,
            value: bucket.value,
        }
    })
    .collect()
}

pub(crate) fn initiative_names(initiatives: &[Initiative]) -> HashMap<i64, String> {
    initiatives
        .iter()
        .map(|ini| (ini.id, ini.display_name()))
        .collect()
}

pub fn total_minutes(activities: &[ActivityRecord]) -> f64 {
    activities.iter().map(|a| clamp_measure(a.minutes)).sum()
}

pub fn total_weekly_minutes(activities: &[ActivityRecord]) -> f64 {
    activities
        .iter()
        .map(|a| weekly_minutes(clamp_measure(a.minutes), &a.periodicity))
        .sum()
}

pub fn total_monthly_minutes(activities: &[ActivityRecord]) -> f64 {
    activities
        .iter()
        .map(|a| monthly_minutes(clamp_measure(a.minutes), &a.periodicity))
        .sum()
}
