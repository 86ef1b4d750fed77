use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::scoring::ScoringProfile;

/// Query result envelope
#[derive(Debug, Serialize, Deserialize)]
pub struct QueryResult {
    pub query: String,
    pub result_type: String,
    pub data: Value,
}

/// API Response
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub status: String,
    pub message: String,
    pub data: Option<Value>,
}

/// Logged activity ("actividad"), one row of `actividades_por_correo`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawActivity")]
pub struct ActivityRecord {
    #[serde(rename = "id_actividad")]
    pub id: i64,
    #[serde(rename = "id_iniciativa")]
    pub initiative_id: Option<i64>,
    #[serde(rename = "id_historia")]
    pub story_id: Option<i64>,
    #[serde(rename = "nombre_actividad")]
    pub name: String,
    #[serde(rename = "descripcion")]
    pub description: String,
    #[serde(rename = "tipo_actividad")]
    pub category: String,
    #[serde(rename = "periodicidad")]
    pub periodicity: String,
    /// Cost of one occurrence, never negative.
    #[serde(rename = "carga_minutos")]
    pub minutes: f64,
    #[serde(rename = "herramientas")]
    pub tools: String,
    #[serde(rename = "fecha")]
    pub date: Option<DateTime<Utc>>,
    #[serde(rename = "correo_electronico")]
    pub owner_email: String,
    #[serde(rename = "correo_electronico_buckup")]
    pub backup_email: String,
    #[serde(rename = "costo_operativo")]
    pub cost: f64,
    #[serde(rename = "porcentaje_automatizacion")]
    pub automation_pct: f64,
}

impl ActivityRecord {
    pub fn profile(&self) -> ScoringProfile {
        ScoringProfile {
            category: self.category.clone(),
            periodicity: self.periodicity.clone(),
            tools: self.tools.clone(),
        }
    }
}

/// Backend rows disagree on column names between endpoints, so every field
/// goes through a lenient intermediate.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawActivity {
    id_actividad: Value,
    id_iniciativa: Value,
    id_historia: Value,
    nombre_actividad: Value,
    descripcion: Value,
    tipo_actividad: Value,
    periodicidad: Value,
    carga_minutos: Value,
    tiempo_empleado_minutos: Value,
    herramientas: Value,
    herramienta: Value,
    fecha: Value,
    correo_electronico: Value,
    correo_responsable: Value,
    correo_electronico_buckup: Value,
    costo_operativo: Value,
    porcentaje_automatizacion: Value,
}

impl From<RawActivity> for ActivityRecord {
    fn from(raw: RawActivity) -> Self {
        let minutes = first_present(&raw.carga_minutos, &raw.tiempo_empleado_minutos);
        let tools = first_present(&raw.herramientas, &raw.herramienta);
        let owner = first_present(&raw.correo_electronico, &raw.correo_responsable);

        Self {
            id: as_id(&raw.id_actividad).unwrap_or_default(),
            initiative_id: as_id(&raw.id_iniciativa),
            story_id: as_id(&raw.id_historia),
            name: as_text(&raw.nombre_actividad),
            description: as_text(&raw.descripcion),
            category: as_text(&raw.tipo_actividad),
            periodicity: as_text(&raw.periodicidad),
            minutes: parse_minutes(minutes),
            tools: as_text(tools),
            date: raw.fecha.as_str().and_then(parse_activity_date),
            owner_email: as_text(owner),
            backup_email: as_text(&raw.correo_electronico_buckup),
            cost: parse_minutes(&raw.costo_operativo),
            automation_pct: as_number(&raw.porcentaje_automatizacion).unwrap_or(0.0),
        }
    }
}

/// Tracked initiative ("iniciativa").
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawInitiative")]
pub struct Initiative {
    #[serde(rename = "id_iniciativa")]
    pub id: i64,
    #[serde(rename = "nombre_iniciativa")]
    pub name: String,
    #[serde(rename = "descripcion_iniciativa")]
    pub description: String,
    #[serde(rename = "estado_iniciativa")]
    pub state: String,
    #[serde(rename = "aprobacion")]
    pub approval: Option<String>,
    /// Last known progress, 0-100. Recomputed from stories when available.
    #[serde(rename = "avance")]
    pub progress: u8,
    #[serde(rename = "correo_electronico")]
    pub owner_email: String,
    #[serde(rename = "tipo_actividad")]
    pub category: String,
    #[serde(rename = "periodicidad")]
    pub periodicity: String,
    #[serde(rename = "carga_minutos")]
    pub minutes: f64,
    #[serde(rename = "herramientas")]
    pub tools: String,
}

impl Initiative {
    /// Label used wherever the initiative is a grouping key.
    pub fn display_name(&self) -> String {
        let name = self.name.trim();
        if name.is_empty() {
            format!("ID {}", self.id)
        } else {
            name.to_string()
        }
    }

    pub fn is_approved(&self) -> bool {
        let approval = self
            .approval
            .as_deref()
            .unwrap_or_default()
            .trim()
            .to_lowercase();
        approval == "aprobado" || approval == "aprobada"
    }

    /// Anything not closed, finished or cancelled counts as active.
    pub fn is_active(&self) -> bool {
        !INACTIVE_STATE.is_match(&self.state.to_lowercase())
    }

    pub fn profile(&self) -> ScoringProfile {
        ScoringProfile {
            category: self.category.clone(),
            periodicity: self.periodicity.clone(),
            tools: self.tools.clone(),
        }
    }
}

static INACTIVE_STATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"cerrad|finalizad|completad|cancelad|hecha|closed|done").unwrap());

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawInitiative {
    id_iniciativa: Value,
    nombre_iniciativa: Value,
    descripcion_iniciativa: Value,
    descripcion: Value,
    estado_iniciativa: Value,
    aprobacion: Value,
    avance: Value,
    correo_electronico: Value,
    tipo_actividad: Value,
    periodicidad: Value,
    carga_minutos: Value,
    herramientas: Value,
}

impl From<RawInitiative> for Initiative {
    fn from(raw: RawInitiative) -> Self {
        let approval = as_text(&raw.aprobacion);
        let progress = as_number(&raw.avance)
            .map(|p| p.round().clamp(0.0, 100.0) as u8)
            .unwrap_or(0);

        Self {
            id: as_id(&raw.id_iniciativa).unwrap_or_default(),
            name: as_text(&raw.nombre_iniciativa),
            description: as_text(first_present(&raw.descripcion_iniciativa, &raw.descripcion)),
            state: as_text(&raw.estado_iniciativa),
            approval: (!approval.is_empty()).then_some(approval),
            progress,
            owner_email: as_text(&raw.correo_electronico),
            category: as_text(&raw.tipo_actividad),
            periodicity: as_text(&raw.periodicidad),
            minutes: parse_minutes(&raw.carga_minutos),
            tools: as_text(&raw.herramientas),
        }
    }
}

/// User story ("historia") under an initiative.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawStory")]
pub struct Story {
    #[serde(rename = "id_historia")]
    pub id: i64,
    #[serde(rename = "id_iniciativa")]
    pub initiative_id: Option<i64>,
    #[serde(rename = "nombre_historia")]
    pub name: String,
    #[serde(rename = "estado")]
    pub state: String,
}

impl Story {
    pub fn with_state(state: &str) -> Self {
        Self {
            state: state.to_string(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawStory {
    id_historia: Value,
    id_iniciativa: Value,
    nombre_historia: Value,
    estado: Value,
}

impl From<RawStory> for Story {
    fn from(raw: RawStory) -> Self {
        Self {
            id: as_id(&raw.id_historia).unwrap_or_default(),
            initiative_id: as_id(&raw.id_iniciativa),
            name: as_text(&raw.nombre_historia),
            state: as_text(&raw.estado),
        }
    }
}

/// Row of `subordinados_de`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Subordinate {
    #[serde(rename = "nombre", default)]
    pub name: String,
    #[serde(rename = "correo_electronico", default)]
    pub email: String,
}

/// Supervisor columns of a `colaborador` row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Supervisors {
    #[serde(rename = "correo_jefe_inmediato", default)]
    pub primary: Option<String>,
    #[serde(rename = "correo_jefe_inmediato_2", default)]
    pub secondary: Option<String>,
}

/// One bucket of a breakdown chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedBucket {
    pub key: String,
    pub value: f64,
}

/// Parallel label/value arrays for bar, pie and doughnut charts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartSeries {
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

impl From<Vec<AggregatedBucket>> for ChartSeries {
    fn from(buckets: Vec<AggregatedBucket>) -> Self {
        let (labels, values) = buckets.into_iter().map(|b| (b.key, b.value)).unzip();
        Self { labels, values }
    }
}

/// Single choke point for minute/cost coercion: non-numeric, non-finite and
/// negative values all become 0.
pub fn parse_minutes(raw: &Value) -> f64 {
    match as_number(raw) {
        Some(v) if v.is_finite() && v > 0.0 => v,
        _ => 0.0,
    }
}

/// Parses the date formats the backend has been seen to emit.
pub fn parse_activity_date(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // Flask's default JSON date format
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

fn first_present<'a>(primary: &'a Value, fallback: &'a Value) -> &'a Value {
    if primary.is_null() {
        fallback
    } else {
        primary
    }
}

fn as_number(raw: &Value) -> Option<f64> {
    match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn as_id(raw: &Value) -> Option<i64> {
    match raw {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_text(raw: &Value) -> String {
    match raw {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}
