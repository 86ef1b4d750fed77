//! Recurrence labels ("periodicidad") and their weekly/monthly multipliers.
//!
//! Labels are free text typed by users ("DIARIO", "Semanal", "a pedido", ...),
//! so classification is a case-insensitive substring match tried in a fixed
//! order. The first pattern that matches wins.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Average weeks per month used by every monthly conversion.
pub const WEEKS_PER_MONTH: f64 = 4.33;

/// Working days counted for a daily activity.
pub const WORKDAYS_PER_WEEK: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Periodicity {
    Daily,
    Weekly,
    Biweekly,
    Monthly,
    Bimonthly,
    Quarterly,
    Semiannual,
    Annual,
    /// On demand / one-off. Not a recurring load.
    AdHoc,
    Unknown,
}

static PATTERNS: Lazy<Vec<(Regex, Periodicity)>> = Lazy::new(|| {
    [
        (r"diar", Periodicity::Daily),
        (r"semanal|weekly|semana", Periodicity::Weekly),
        (r"quincenal", Periodicity::Biweekly),
        (r"mensual|month", Periodicity::Monthly),
        (r"bimestral", Periodicity::Bimonthly),
        (r"trimestral", Periodicity::Quarterly),
        (r"semestral", Periodicity::Semiannual),
        (r"anual|año", Periodicity::Annual),
        (
            r"ad-hoc|ad hoc|adhoc|puntual|eventual|pedido|demanda",
            Periodicity::AdHoc,
        ),
    ]
    .into_iter()
    .map(|(pattern, period)| (Regex::new(pattern).unwrap(), period))
    .collect()
});

impl Periodicity {
    pub fn classify(label: &str) -> Self {
        let label = label.trim().to_lowercase();
        PATTERNS
            .iter()
            .find(|(re, _)| re.is_match(&label))
            .map(|(_, period)| *period)
            .unwrap_or(Periodicity::Unknown)
    }

    /// Occurrences per week.
    ///
    /// `Quarterly` returns 1/3, the same value as its month factor, not 1/13.
    /// Published dashboard numbers depend on it.
    pub fn week_factor(self) -> f64 {
        match self {
            Periodicity::Daily => WORKDAYS_PER_WEEK,
            Periodicity::Weekly => 1.0,
            Periodicity::Biweekly => 0.5,
            Periodicity::Monthly => 1.0 / WEEKS_PER_MONTH,
            Periodicity::Bimonthly => 1.0 / (2.0 * WEEKS_PER_MONTH),
            Periodicity::Quarterly => 1.0 / 3.0,
            Periodicity::Semiannual => 1.0 / 6.0,
            Periodicity::Annual => 1.0 / 52.0,
            Periodicity::AdHoc | Periodicity::Unknown => 0.0,
        }
    }

    /// Occurrences per month.
    pub fn month_factor(self) -> f64 {
        match self {
            Periodicity::Daily => WORKDAYS_PER_WEEK * WEEKS_PER_MONTH,
            Periodicity::Weekly => WEEKS_PER_MONTH,
            Periodicity::Biweekly => 2.0,
            Periodicity::Monthly => 1.0,
            Periodicity::Bimonthly => 0.5,
            Periodicity::Quarterly => 1.0 / 3.0,
            Periodicity::Semiannual => 1.0 / 6.0,
            Periodicity::Annual => 1.0 / 12.0,
            Periodicity::AdHoc | Periodicity::Unknown => 0.0,
        }
    }

    pub fn is_recurring(self) -> bool {
        !matches!(self, Periodicity::AdHoc | Periodicity::Unknown)
    }
}

pub fn week_factor(label: &str) -> f64 {
    Periodicity::classify(label).week_factor()
}

pub fn month_factor(label: &str) -> f64 {
    Periodicity::classify(label).month_factor()
}

/// Recurring weekly load of one activity, rounded to the minute.
pub fn weekly_minutes(minutes_per_occurrence: f64, label: &str) -> f64 {
    (minutes_per_occurrence * week_factor(label)).round()
}

/// Recurring monthly load of one activity, rounded to the minute.
pub fn monthly_minutes(minutes_per_occurrence: f64, label: &str) -> f64 {
    (minutes_per_occurrence * month_factor(label)).round()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_daily_labels() {
        for label in ["DIARIO", "diaria", "Diario (L-V)", "  diar  "] {
            assert_eq!(week_factor(label), 5.0, "{label}");
            assert_eq!(month_factor(label), 5.0 * 4.33, "{label}");
        }
    }

    #[test]
    fn test_classify_priority_order() {
        assert_eq!(Periodicity::classify("SEMANAL"), Periodicity::Weekly);
        assert_eq!(Periodicity::classify("cada semana"), Periodicity::Weekly);
        assert_eq!(Periodicity::classify("QUINCENAL"), Periodicity::Biweekly);
        assert_eq!(Periodicity::classify("Mensual"), Periodicity::Monthly);
        assert_eq!(Periodicity::classify("monthly"), Periodicity::Monthly);
        assert_eq!(Periodicity::classify("Bimestral"), Periodicity::Bimonthly);
        assert_eq!(Periodicity::classify("TRIMESTRAL"), Periodicity::Quarterly);
        assert_eq!(Periodicity::classify("semestral"), Periodicity::Semiannual);
        assert_eq!(Periodicity::classify("Anual"), Periodicity::Annual);
        assert_eq!(Periodicity::classify("una vez al año"), Periodicity::Annual);
        assert_eq!(Periodicity::classify("A PEDIDO"), Periodicity::AdHoc);
        assert_eq!(Periodicity::classify("Puntual"), Periodicity::AdHoc);
        assert_eq!(Periodicity::classify(""), Periodicity::Unknown);
        assert_eq!(Periodicity::classify("cuando llueve"), Periodicity::Unknown);
    }

    #[test]
    fn test_non_recurring_factors_are_zero() {
        for label in ["ad-hoc", "eventual", "bajo demanda", "???"] {
            assert_eq!(week_factor(label), 0.0);
            assert_eq!(month_factor(label), 0.0);
        }
        assert!(!Periodicity::AdHoc.is_recurring());
        assert!(Periodicity::Annual.is_recurring());
    }

    #[test]
    fn test_quarterly_week_factor_keeps_legacy_one_third() {
        // Dimensionally this should be 1/13; the published dashboards use 1/3.
        assert_eq!(week_factor("trimestral"), 1.0 / 3.0);
        assert_eq!(month_factor("trimestral"), 1.0 / 3.0);
        assert_eq!(weekly_minutes(90.0, "trimestral"), 30.0);
    }

    #[test]
    fn test_weekly_and_monthly_minutes_round() {
        assert_eq!(weekly_minutes(30.0, "DIARIO"), 150.0);
        assert_eq!(monthly_minutes(30.0, "DIARIO"), 650.0); // 649.5
        assert_eq!(weekly_minutes(60.0, "mensual"), 14.0); // 13.86
        assert_eq!(monthly_minutes(45.0, "semanal"), 195.0); // 194.85
        assert_eq!(weekly_minutes(120.0, "a pedido"), 0.0);
    }
}
