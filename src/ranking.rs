//! Impact-ordered automation candidates and Pareto series.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::aggregate::{clamp_measure, initiative_names, primary_tool};
use crate::models::{ActivityRecord, AggregatedBucket, Initiative};
use crate::period::weekly_minutes;
use crate::scoring::{self, ScoringProfile};

/// Size of the "top candidates" list.
pub const TOP_CANDIDATES: usize = 5;

/// A full 44 hour work week, drawn as the reference line on Pareto charts.
pub const WEEKLY_WORKLOAD_MINUTES: f64 = 44.0 * 60.0;

/// Label for blank profile fields on a candidate.
pub const UNSPECIFIED: &str = "Sin especificar";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub name: String,
    /// Weekly-normalized minutes.
    pub minutes: f64,
    pub score: u8,
    /// `minutes * score / 100`
    pub impact: f64,
    pub category: String,
    pub periodicity: String,
    pub primary_tool: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParetoSeries {
    pub labels: Vec<String>,
    pub values: Vec<f64>,
    pub cumulative_pct: Vec<f64>,
}

/// Pareto series plus the reference line and y-axis ceiling for the chart.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParetoChart {
    #[serde(flatten)]
    pub series: ParetoSeries,
    pub threshold: f64,
    pub axis_max: f64,
}

struct Group<'a> {
    name: String,
    minutes: f64,
    heaviest: Option<(&'a ActivityRecord, f64)>,
    initiative: Option<&'a Initiative>,
}

/// Ranks initiatives by `weekly minutes * score / 100`, highest first.
///
/// The initiative's own category/periodicity/tools are scored when it has
/// any; otherwise the profile of its heaviest activity stands in.
pub fn rank_candidates(
    initiatives: &[Initiative],
    activities: &[ActivityRecord],
    limit: usize,
) -> Vec<Candidate> {
    let names = initiative_names(initiatives);
    let by_id: HashMap<i64, &Initiative> = initiatives.iter().map(|i| (i.id, i)).collect();

    let mut order: Vec<i64> = Vec::new();
    let mut groups: HashMap<i64, Group<'_>> = HashMap::new();

    for activity in activities {
        let Some(id) = activity.initiative_id else {
            continue;
        };
        let weekly = weekly_minutes(clamp_measure(activity.minutes), &activity.periodicity);

        let group = groups.entry(id).or_insert_with(|| {
            order.push(id);
            Group {
                name: names.get(&id).cloned().unwrap_or_else(|| format!("ID {id}")),
                minutes: 0.0,
                heaviest: None,
                initiative: by_id.get(&id).copied(),
            }
        });
        group.minutes += weekly;
        if group.heaviest.map_or(true, |(_, m)| weekly > m) {
            group.heaviest = Some((activity, weekly));
        }
    }

    let mut candidates: Vec<Candidate> = order
        .into_iter()
        .filter_map(|id| groups.remove(&id))
        .map(|group| {
            let profile = group_profile(&group);
            let score = scoring::score(&profile);
            Candidate {
                impact: group.minutes * f64::from(score) / 100.0,
                name: group.name,
                minutes: group.minutes,
                score,
                category: label_or_unspecified(&profile.category),
                periodicity: label_or_unspecified(&profile.periodicity),
                primary_tool: primary_tool(&profile.tools)
                    .unwrap_or(UNSPECIFIED)
                    .to_string(),
            }
        })
        .collect();

    candidates.sort_by(|a, b| b.impact.total_cmp(&a.impact));
    candidates.truncate(limit);
    candidates
}

fn group_profile(group: &Group<'_>) -> ScoringProfile {
    match group.initiative.map(Initiative::profile) {
        Some(profile) if !profile.is_blank() => profile,
        _ => group
            .heaviest
            .map(|(activity, _)| activity.profile())
            .unwrap_or_default(),
    }
}

fn label_or_unspecified(text: &str) -> String {
    let text = text.trim();
    if text.is_empty() {
        UNSPECIFIED.to_string()
    } else {
        text.to_string()
    }
}

/// Cumulative-percentage overlay for already sorted buckets.
pub fn pareto(buckets: &[AggregatedBucket]) -> ParetoSeries {
    let labels: Vec<String> = buckets.iter().map(|b| b.key.clone()).collect();
    let values: Vec<f64> = buckets.iter().map(|b| b.value).collect();
    let total: f64 = values.iter().sum();

    let mut running = 0.0;
    let cumulative_pct = values
        .iter()
        .map(|v| {
            running += v;
            if total > 0.0 {
                round2(running / total * 100.0)
            } else {
                0.0
            }
        })
        .collect();

    ParetoSeries {
        labels,
        values,
        cumulative_pct,
    }
}

pub fn pareto_chart(buckets: &[AggregatedBucket], threshold: f64) -> ParetoChart {
    let series = pareto(buckets);
    let max_bar = series.values.iter().copied().fold(0.0, f64::max);

    ParetoChart {
        axis_max: threshold.max((max_bar * 1.2).ceil()),
        threshold,
        series,
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
