//! Automation-opportunity score.
//!
//! score = round(min(1, frequency*0.5 + type*0.3 + tool*0.2) * 100)
//!
//! The weight tables are product heuristics shown to end users; keep them
//! exactly as they are.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::aggregate::tool_tokens;
use crate::period::Periodicity;

const FREQUENCY_SHARE: f64 = 0.5;
const TYPE_SHARE: f64 = 0.3;
const TOOL_SHARE: f64 = 0.2;

/// Weight used when a label matches nothing.
pub const DEFAULT_WEIGHT: f64 = 0.6;

/// The three free-text fields the scorer looks at.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoringProfile {
    pub category: String,
    pub periodicity: String,
    pub tools: String,
}

impl ScoringProfile {
    pub fn is_blank(&self) -> bool {
        self.category.trim().is_empty()
            && self.periodicity.trim().is_empty()
            && self.tools.trim().is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub frequency_weight: f64,
    pub type_weight: f64,
    pub tool_weight: f64,
    pub score: u8,
}

static TYPE_WEIGHTS: Lazy<Vec<(Regex, f64)>> = Lazy::new(|| {
    compile(&[
        (r"etl|elt|report|consolid|valida|carga|load|ingest", 1.0),
        (
            r"soporte|support|incidente|incident|operaci|operation|monitor",
            0.8,
        ),
        (r"sql|query|consulta|excel", 0.85),
        (r"desarrollo|develop|diseño|diseno|design|model", 0.5),
        (r"análisis|analisis|analysis|analy", 0.45),
    ])
});

static TOOL_WEIGHTS: Lazy<Vec<(Regex, f64)>> = Lazy::new(|| {
    compile(&[
        (r"excel|csv|outlook|e-mail|email|correo|word", 1.0),
        (r"sharepoint|forms|power ?apps", 0.7),
        (
            r"sql|postgres|mysql|oracle|teradata|bigquery|snowflake|redshift",
            0.8,
        ),
        (r"power ?bi|tableau|qlik|looker", 0.6),
        (
            r"python|rpa|uipath|automation anywhere|power automate|selenium|airflow",
            0.5,
        ),
    ])
});

fn compile(table: &[(&str, f64)]) -> Vec<(Regex, f64)> {
    table
        .iter()
        .map(|(pattern, weight)| (Regex::new(pattern).unwrap(), *weight))
        .collect()
}

fn lookup(table: &[(Regex, f64)], text: &str) -> Option<f64> {
    let text = text.trim().to_lowercase();
    table
        .iter()
        .find(|(re, _)| re.is_match(&text))
        .map(|(_, weight)| *weight)
}

/// Best weight among every pattern that matches, for fields where one token
/// can name several tools ("SharePoint SQL").
fn lookup_max(table: &[(Regex, f64)], text: &str) -> Option<f64> {
    let text = text.trim().to_lowercase();
    table
        .iter()
        .filter(|(re, _)| re.is_match(&text))
        .map(|(_, weight)| *weight)
        .reduce(f64::max)
}

/// How often the work recurs: daily work is the best candidate.
pub fn frequency_weight(periodicity: &str) -> f64 {
    match Periodicity::classify(periodicity) {
        Periodicity::Daily => 1.0,
        Periodicity::Weekly => 0.9,
        Periodicity::Biweekly => 0.8,
        Periodicity::Monthly => 0.7,
        Periodicity::Bimonthly => 0.55,
        Periodicity::Quarterly => 0.5,
        Periodicity::Semiannual => 0.4,
        Periodicity::Annual => 0.35,
        Periodicity::AdHoc => 0.3,
        Periodicity::Unknown => DEFAULT_WEIGHT,
    }
}

pub fn type_weight(category: &str) -> f64 {
    lookup(&TYPE_WEIGHTS, category).unwrap_or(DEFAULT_WEIGHT)
}

/// Highest weight among the listed tools; tools nobody recognises are
/// ignored, and a list with no recognised tool gets the default.
pub fn tool_weight(tools: &str) -> f64 {
    tool_tokens(tools)
        .into_iter()
        .filter_map(|token| lookup_max(&TOOL_WEIGHTS, token))
        .reduce(f64::max)
        .unwrap_or(DEFAULT_WEIGHT)
}

pub fn breakdown(profile: &ScoringProfile) -> ScoreBreakdown {
    let frequency = frequency_weight(&profile.periodicity);
    let kind = type_weight(&profile.category);
    let tool = tool_weight(&profile.tools);

    let raw = frequency * FREQUENCY_SHARE + kind * TYPE_SHARE + tool * TOOL_SHARE;
    let score = (raw.min(1.0) * 100.0).round().clamp(0.0, 100.0) as u8;

    ScoreBreakdown {
        frequency_weight: frequency,
        type_weight: kind,
        tool_weight: tool,
        score,
    }
}

/// Opportunity score in `0..=100`.
pub fn score(profile: &ScoringProfile) -> u8 {
    breakdown(profile).score
}
