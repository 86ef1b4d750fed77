//! HTTP surface: chart-ready projections for the dashboard front end.
//!
//! Every request fetches a fresh snapshot from the backend; nothing is kept
//! between requests.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::backend::{BackendClient, DataFetcher, StorySource};
use crate::config::Config;
use crate::error::FetchError;
use crate::filter::{ActivityFilter, DatePreset, DateRange};
use crate::models::{ApiResponse, QueryResult, Story};
use crate::progress::{ProgressReconciler, ReconcileScope};
use crate::projections::{ActivityProjector, ActivitySnapshot, ProjectionSettings};
use crate::session::{can_approve, story_access, view_options, SessionContext, ViewOption};

#[derive(Clone)]
pub struct AppState {
    pub backend: Arc<BackendClient>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(backend: BackendClient, config: Config) -> Self {
        Self {
            backend: Arc::new(backend),
            config: Arc::new(config),
        }
    }

    fn settings(&self) -> ProjectionSettings {
        ProjectionSettings::from(&self.config.dashboard)
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/projections/summary", get(get_summary))
        .route("/projections/breakdowns", get(get_breakdowns))
        .route("/projections/pareto", get(get_pareto))
        .route("/projections/candidates", get(get_candidates))
        .route("/initiatives/:id/projections", get(get_initiative_projections))
        .route("/initiatives/:id/stories", get(get_initiative_stories))
        .route("/query", post(handle_query))
        .route("/reconcile", post(handle_reconcile))
        .route("/session/view-options", get(get_view_options))
        .route("/session/can-approve", get(get_can_approve))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Query string shared by the projection endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct ViewParams {
    pub email: Option<String>,
    pub view_as: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub preset: Option<DatePreset>,
    /// Pareto grouping: `activity` or `initiative`
    pub by: Option<String>,
    pub limit: Option<usize>,
}

impl ViewParams {
    fn session(&self) -> Result<SessionContext, StatusCode> {
        let email = required(self.email.as_deref())?;
        Ok(SessionContext::new(email).viewing(self.view_as.as_deref()))
    }

    /// A preset wins over explicit bounds.
    fn range(&self) -> Result<DateRange, StatusCode> {
        if let Some(preset) = self.preset {
            return Ok(DateRange::from_preset(preset, Utc::now().date_naive()));
        }
        Ok(DateRange::new(
            parse_day(self.from.as_deref())?,
            parse_day(self.to.as_deref())?,
        ))
    }
}

fn required(value: Option<&str>) -> Result<&str, StatusCode> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(StatusCode::BAD_REQUEST),
    }
}

fn parse_day(raw: Option<&str>) -> Result<Option<NaiveDate>, StatusCode> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| StatusCode::BAD_REQUEST),
    }
}

fn backend_error(context: &str, e: FetchError) -> StatusCode {
    warn!(error = %e, "{context}");
    e.status_code()
}

/// Owner-scoped projector for the person the session is viewing.
async fn load_view(state: &AppState, params: &ViewParams) -> Result<ActivityProjector, StatusCode> {
    let session = params.session()?;
    let range = params.range()?;
    let viewed = session.viewed_email().to_string();

    let (initiatives, activities) = tokio::try_join!(
        state.backend.initiatives_by_owner(&viewed),
        state.backend.activities_by_owner(&viewed),
    )
    .map_err(|e| backend_error("snapshot fetch failed", e))?;

    info!(
        viewed = %viewed,
        initiatives = initiatives.len(),
        activities = activities.len(),
        "loaded snapshot"
    );

    Ok(ActivityProjector::new(
        session,
        ActivitySnapshot {
            initiatives,
            activities,
        },
        ActivityFilter::owned_by(&viewed).with_range(range),
        state.settings(),
    ))
}

async fn root() -> &'static str {
    "Initiative Insights API v0.1.0"
}

async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

async fn get_summary(
    State(state): State<AppState>,
    Query(params): Query<ViewParams>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let projector = load_view(&state, &params).await?;
    Ok(Json(to_json(projector.summary())?))
}

async fn get_breakdowns(
    State(state): State<AppState>,
    Query(params): Query<ViewParams>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let projector = load_view(&state, &params).await?;
    Ok(Json(serde_json::json!({
        "kpis": projector.kpis(),
        "breakdowns": projector.breakdowns(),
    })))
}

async fn get_pareto(
    State(state): State<AppState>,
    Query(params): Query<ViewParams>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let projector = load_view(&state, &params).await?;
    let chart = match params.by.as_deref().unwrap_or("activity") {
        "activity" => projector.pareto_by_activity(),
        "initiative" => projector.pareto_by_initiative(),
        _ => return Err(StatusCode::BAD_REQUEST),
    };
    Ok(Json(to_json(chart)?))
}

async fn get_candidates(
    State(state): State<AppState>,
    Query(params): Query<ViewParams>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let projector = load_view(&state, &params).await?;
    let candidates = match params.limit {
        Some(limit) => projector.top_candidates(limit),
        None => projector.candidates(),
    };

    Ok(Json(serde_json::json!({
        "count": candidates.len(),
        "candidates": candidates,
    })))
}

/// Analytics for a single initiative: every activity logged against it,
/// whoever logged it.
async fn get_initiative_projections(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(params): Query<ViewParams>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let range = params.range()?;
    let email = params.email.as_deref().map(str::trim).unwrap_or_default();

    let activities = state
        .backend
        .activities_by_initiative(id)
        .await
        .map_err(|e| backend_error("initiative activities fetch failed", e))?;

    // Owner's list only supplies the initiative's display name.
    let initiatives = if email.is_empty() {
        Vec::new()
    } else {
        state
            .backend
            .initiatives_by_owner(email)
            .await
            .map_err(|e| backend_error("initiatives fetch failed", e))?
            .into_iter()
            .filter(|i| i.id == id)
            .collect()
    };

    let projector = ActivityProjector::new(
        SessionContext::new(email),
        ActivitySnapshot {
            initiatives,
            activities,
        },
        ActivityFilter::default().with_range(range),
        state.settings(),
    );
    Ok(Json(to_json(projector.summary())?))
}

async fn get_initiative_stories(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(params): Query<ViewParams>,
) -> Result<Json<Vec<Story>>, StatusCode> {
    let session = params.session()?;
    let initiatives = state
        .backend
        .initiatives_by_owner(session.viewed_email())
        .await
        .map_err(|e| backend_error("initiatives fetch failed", e))?;

    let initiative = initiatives
        .iter()
        .find(|i| i.id == id)
        .ok_or(StatusCode::NOT_FOUND)?;

    if let Err(e) = story_access(initiative) {
        info!(initiative_id = id, "{e}");
        return Err(StatusCode::FORBIDDEN);
    }

    let stories = state
        .backend
        .stories_for(id)
        .await
        .map_err(|e| backend_error("stories fetch failed", e))?;
    Ok(Json(stories))
}

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    pub email: String,
    #[serde(default)]
    pub view_as: Option<String>,
}

/// Handle free-text queries
async fn handle_query(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResult>, StatusCode> {
    let params = ViewParams {
        email: Some(request.email),
        view_as: request.view_as,
        ..Default::default()
    };
    let projector = load_view(&state, &params).await?;
    Ok(Json(projector.query(&request.query)))
}

#[derive(Debug, Deserialize)]
pub struct ReconcileRequest {
    pub email: String,
}

/// Recomputes progress for the owner's initiatives and waits for the
/// resulting write-backs. A dropped request aborts the pending writes.
async fn handle_reconcile(
    State(state): State<AppState>,
    Json(request): Json<ReconcileRequest>,
) -> Result<Json<ApiResponse>, StatusCode> {
    let email = required(Some(request.email.as_str()))?;
    let initiatives = state
        .backend
        .initiatives_by_owner(email)
        .await
        .map_err(|e| backend_error("initiatives fetch failed", e))?;

    let reconciler = ProgressReconciler::new(Arc::clone(&state.backend), Arc::clone(&state.backend));
    let mut scope = ReconcileScope::new();
    let mut outcomes = reconciler.reconcile_all(&initiatives, &mut scope).await;
    scope.settle().await;
    outcomes.sort_by_key(|o| o.initiative_id());

    Ok(Json(ApiResponse {
        status: "success".to_string(),
        message: format!("Reconciled {} initiatives", outcomes.len()),
        data: Some(to_json(outcomes)?),
    }))
}

#[derive(Debug, Deserialize)]
pub struct EmailParams {
    pub email: Option<String>,
    pub owner: Option<String>,
}

async fn get_view_options(
    State(state): State<AppState>,
    Query(params): Query<EmailParams>,
) -> Result<Json<Vec<ViewOption>>, StatusCode> {
    let session = SessionContext::new(required(params.email.as_deref())?);
    let subordinates = state
        .backend
        .subordinates_of(&session.email)
        .await
        .map_err(|e| backend_error("subordinates fetch failed", e))?;

    Ok(Json(view_options(&session, &subordinates)))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalCheck {
    pub owner: String,
    pub can_approve: bool,
}

async fn get_can_approve(
    State(state): State<AppState>,
    Query(params): Query<EmailParams>,
) -> Result<Json<ApprovalCheck>, StatusCode> {
    let session = SessionContext::new(required(params.email.as_deref())?);
    let owner = required(params.owner.as_deref())?;
    let supervisors = state
        .backend
        .supervisors_of(owner)
        .await
        .map_err(|e| backend_error("supervisors fetch failed", e))?;

    Ok(Json(ApprovalCheck {
        owner: owner.to_string(),
        can_approve: can_approve(
            &session,
            owner,
            supervisors.as_ref(),
            &state.config.access.admin_email,
        ),
    }))
}

fn to_json<T: Serialize>(value: T) -> Result<serde_json::Value, StatusCode> {
    serde_json::to_value(value).map_err(|e| {
        warn!(error = %e, "failed to serialize response");
        StatusCode::INTERNAL_SERVER_ERROR
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_from_params() {
        let params = ViewParams {
            from: Some("2025-10-14".into()),
            to: Some("2025-10-01".into()),
            ..Default::default()
        };
        let range = params.range().unwrap();
        assert_eq!(range.from, NaiveDate::from_ymd_opt(2025, 10, 1));
        assert_eq!(range.to, NaiveDate::from_ymd_opt(2025, 10, 14));
    }

    #[test]
    fn test_bad_date_is_bad_request() {
        let params = ViewParams {
            from: Some("14/10/2025".into()),
            ..Default::default()
        };
        assert_eq!(params.range().unwrap_err(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_missing_email_is_bad_request() {
        let params = ViewParams {
            email: Some("  ".into()),
            ..Default::default()
        };
        assert_eq!(params.session().unwrap_err(), StatusCode::BAD_REQUEST);
    }
}
