use serde::{Deserialize, Serialize};

use crate::aggregate::{
    by_activity, by_category, by_initiative_weekly, by_periodicity, by_primary_tool,
    total_minutes, total_monthly_minutes, total_weekly_minutes,
};
use crate::config::DashboardConfig;
use crate::filter::ActivityFilter;
use crate::models::{ActivityRecord, ChartSeries, Initiative, QueryResult};
use crate::period::Periodicity;
use crate::ranking::{pareto_chart, rank_candidates, Candidate, ParetoChart, TOP_CANDIDATES, WEEKLY_WORKLOAD_MINUTES};
use crate::session::SessionContext;


/// Chart knobs shared by every projection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProjectionSettings {
    pub workload_threshold_minutes: f64,
    pub top_candidates: usize,
}

impl Default for ProjectionSettings {
    fn default() -> Self {
        Self {
            workload_threshold_minutes: WEEKLY_WORKLOAD_MINUTES,
            top_candidates: TOP_CANDIDATES,
        }
    }
}

impl From<&DashboardConfig> for ProjectionSettings {
    fn from(config: &DashboardConfig) -> Self {
        Self {
            workload_threshold_minutes: config.workload_threshold_minutes,
            top_candidates: config.top_candidates,
        }
    }
}

/// What the backend returned for one view.
#[derive(Debug, Clone, Default)]
pub struct ActivitySnapshot {
    pub initiatives: Vec<Initiative>,
    pub activities: Vec<ActivityRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Kpis {
    pub total_minutes: f64,
    pub total_cost: f64,
    pub avg_automation_pct: f64,
    pub activity_count: usize,
    pub weekly_load_minutes: f64,
    pub monthly_load_minutes: f64,
    /// Rows whose periodicity is a real recurrence (not ad hoc, not unknown).
    pub recurring_activity_count: usize,
    /// Initiatives in the snapshot that are neither closed nor cancelled.
    pub active_initiatives: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryShare {
    pub category: String,
    pub minutes: f64,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Breakdowns {
    pub by_type: ChartSeries,
    pub by_periodicity: ChartSeries,
    pub by_tool: ChartSeries,
    pub type_shares: Vec<CategoryShare>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub viewing: String,
    pub kpis: Kpis,
    pub breakdowns: Breakdowns,
    pub pareto_by_activity: ParetoChart,
    pub pareto_by_initiative: ParetoChart,
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParetoViews {
    pub by_activity: ParetoChart,
    pub by_initiative: ParetoChart,
}

/// Derives every dashboard figure from one filtered snapshot.
/// Nothing is cached: each call recomputes from the rows.
pub struct ActivityProjector {
    session: SessionContext,
    initiatives: Vec<Initiative>,
    activities: Vec<ActivityRecord>,
    settings: ProjectionSettings,
}

impl ActivityProjector {
    pub fn new(
        session: SessionContext,
        snapshot: ActivitySnapshot,
        filter: ActivityFilter,
        settings: ProjectionSettings,
    ) -> Self {
        Self {
            session,
            initiatives: snapshot.initiatives,
            activities: filter.apply(&snapshot.activities),
            settings,
        }
    }

    /// Rows left after filtering.
    pub fn activities(&self) -> &[ActivityRecord] {
        &self.activities
    }

    pub fn kpis(&self) -> Kpis {
        let count = self.activities.len();
        let total_cost = self.activities.iter().map(|a| a.cost).sum();
        let avg_automation_pct = if count > 0 {
            let sum: f64 = self
                .activities
                .iter()
                .map(|a| a.automation_pct)
                .filter(|p| p.is_finite())
                .sum();
            round1(sum / count as f64)
        } else {
            0.0
        };

        Kpis {
            total_minutes: total_minutes(&self.activities),
            total_cost,
            avg_automation_pct,
            activity_count: count,
            weekly_load_minutes: total_weekly_minutes(&self.activities),
            monthly_load_minutes: total_monthly_minutes(&self.activities),
            recurring_activity_count: self
                .activities
                .iter()
                .filter(|a| Periodicity::classify(&a.periodicity).is_recurring())
                .count(),
            active_initiatives: self.initiatives.iter().filter(|i| i.is_active()).count(),
        }
    }

    pub fn breakdowns(&self) -> Breakdowns {
        let by_type = by_category(&self.activities);
        let total: f64 = by_type.iter().map(|b| b.value).sum();

        let type_shares = by_type
            .iter()
            .map(|b| CategoryShare {
                category: b.key.clone(),
                minutes: b.value,
                percentage: if total > 0.0 {
                    round2(b.value / total * 100.0)
                } else {
                    0.0
                },
            })
            .collect();

        Breakdowns {
            by_type: by_type.into(),
            by_periodicity: by_periodicity(&self.activities).into(),
            by_tool: by_primary_tool(&self.activities).into(),
            type_shares,
        }
    }

    /// Minutes per activity name, as logged.
    pub fn pareto_by_activity(&self) -> ParetoChart {
        pareto_chart(
            &by_activity(&self.activities),
            self.settings.workload_threshold_minutes,
        )
    }

    /// Weekly-normalized minutes per initiative.
    pub fn pareto_by_initiative(&self) -> ParetoChart {
        pareto_chart(
            &by_initiative_weekly(&self.initiatives, &self.activities),
            self.settings.workload_threshold_minutes,
        )
    }

    pub fn candidates(&self) -> Vec<Candidate> {
        self.top_candidates(self.settings.top_candidates)
    }

    pub fn top_candidates(&self, limit: usize) -> Vec<Candidate> {
        rank_candidates(&self.initiatives, &self.activities, limit)
    }

    pub fn summary(&self) -> DashboardSummary {
        DashboardSummary {
            viewing: self.session.viewed_email().to_string(),
            kpis: self.kpis(),
            breakdowns: self.breakdowns(),
            pareto_by_activity: self.pareto_by_activity(),
            pareto_by_initiative: self.pareto_by_initiative(),
            candidates: self.candidates(),
        }
    }

    /// Free-text query routed to one projection by keyword.
    pub fn query(&self, query: &str) -> QueryResult {
        let q = query.to_lowercase();

        let (result_type, data) = if q.contains("ratio") || q.contains("breakdown") {
            ("breakdowns", serde_json::to_value(self.breakdowns()))
        } else if q.contains("pareto") {
            (
                "pareto",
                serde_json::to_value(ParetoViews {
                    by_activity: self.pareto_by_activity(),
                    by_initiative: self.pareto_by_initiative(),
                }),
            )
        } else if q.contains("candidate") || q.contains("score") {
            ("candidates", serde_json::to_value(self.candidates()))
        } else {
            ("summary", serde_json::to_value(self.summary()))
        };

        QueryResult {
            query: query.to_string(),
            result_type: result_type.to_string(),
            data: data.unwrap_or_default(),
        }
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
