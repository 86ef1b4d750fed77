mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use initiative_insights::create_router;

use common::{app_state, FakeBackend};

async fn send(fake: FakeBackend, request: Request<Body>) -> (StatusCode, Value) {
    let app = create_router(app_state(fake).await);
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

async fn get(uri: &str) -> (StatusCode, Value) {
    send(
        FakeBackend::default(),
        Request::builder().uri(uri).body(Body::empty()).unwrap(),
    )
    .await
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_health() {
    let (status, body) = get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_summary_keeps_only_owned_rows() {
    let (status, body) = get("/projections/summary?email=ana@corp.com").await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(body["viewing"], "ana@corp.com");
    assert_eq!(body["kpis"]["activityCount"], 2);
    assert_eq!(body["kpis"]["totalMinutes"], 50.0);
    assert_eq!(body["kpis"]["weeklyLoadMinutes"], 150.0);

    let candidates = body["candidates"].as_array().unwrap();
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0]["name"], "Cierre diario");
    assert_eq!(candidates[0]["minutes"], 150.0);
    assert_eq!(candidates[0]["score"], 90);
    assert_eq!(candidates[0]["impact"], 135.0);
    assert_eq!(candidates[0]["primaryTool"], "Python");
}

#[tokio::test]
async fn test_date_range_drops_undated_rows() {
    let (status, body) = get("/projections/breakdowns?email=ana@corp.com&from=2025-10-31&to=2025-10-01").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["kpis"]["activityCount"], 1);
    assert_eq!(body["breakdowns"]["byType"]["labels"], json!(["ETL/ELT"]));
    assert_eq!(body["breakdowns"]["byTool"]["labels"], json!(["Python"]));
}

#[tokio::test]
async fn test_preset_overrides_explicit_bounds() {
    // "todo" clears the range even though `from` alone would drop every row
    let (status, body) =
        get("/projections/breakdowns?email=ana@corp.com&preset=todo&from=2099-01-01").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["kpis"]["activityCount"], 2);

    // a bounded preset drops the undated row; the 2025-10-14 row is long past
    let (status, body) = get("/projections/breakdowns?email=ana@corp.com&preset=7d").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["kpis"]["activityCount"], 0);

    let (status, body) = get("/projections/summary?email=ana@corp.com&preset=last_30_days").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["kpis"]["activityCount"], 0);

    assert_eq!(
        get("/projections/summary?email=ana@corp.com&preset=ayer").await.0,
        StatusCode::BAD_REQUEST
    );
}

#[tokio::test]
async fn test_pareto_by_initiative() {
    let (status, body) = get("/projections/pareto?email=ana@corp.com&by=initiative").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["labels"], json!(["Cierre diario"]));
    assert_eq!(body["values"], json!([150.0]));
    assert_eq!(body["cumulativePct"], json!([100.0]));
    assert_eq!(body["threshold"], 2640.0);
    assert_eq!(body["axisMax"], 2640.0);
}

#[tokio::test]
async fn test_pareto_by_activity_uses_logged_minutes() {
    let (_, body) = get("/projections/pareto?email=ana@corp.com").await;
    assert_eq!(body["labels"], json!(["Cuadre de caja", "Reunión de equipo"]));
    assert_eq!(body["values"], json!([30.0, 20.0]));
    assert_eq!(body["cumulativePct"], json!([60.0, 100.0]));
}

#[tokio::test]
async fn test_bad_params_are_rejected() {
    assert_eq!(get("/projections/summary").await.0, StatusCode::BAD_REQUEST);
    assert_eq!(
        get("/projections/summary?email=ana@corp.com&from=14-10-2025").await.0,
        StatusCode::BAD_REQUEST
    );
    assert_eq!(
        get("/projections/pareto?email=ana@corp.com&by=tool").await.0,
        StatusCode::BAD_REQUEST
    );
    assert_eq!(
        get("/projections/candidates?email=ana@corp.com&limit=many").await.0,
        StatusCode::BAD_REQUEST
    );
}

#[tokio::test]
async fn test_backend_failure_is_bad_gateway() {
    let (status, _) = get("/projections/summary?email=boom@corp.com").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_unknown_owner_gets_empty_dashboard() {
    let (status, body) = get("/projections/candidates?email=ghost@corp.com").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 0);
    assert_eq!(body["candidates"], json!([]));
}

#[tokio::test]
async fn test_initiative_projection_includes_every_owner() {
    let (status, body) = get("/initiatives/1/projections?email=ana@corp.com").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["kpis"]["activityCount"], 2);
    assert_eq!(body["paretoByInitiative"]["labels"], json!(["Cierre diario"]));
}

#[tokio::test]
async fn test_stories_need_approval() {
    assert_eq!(
        get("/initiatives/2/stories?email=ana@corp.com").await.0,
        StatusCode::FORBIDDEN
    );
    assert_eq!(
        get("/initiatives/99/stories?email=ana@corp.com").await.0,
        StatusCode::NOT_FOUND
    );

    let (status, body) = get("/initiatives/1/stories?email=ana@corp.com").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_query_routes_by_keyword() {
    let (status, body) = send(
        FakeBackend::default(),
        post_json("/query", json!({"query": "pareto", "email": "ana@corp.com"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["query"], "pareto");
    assert_eq!(body["result_type"], "pareto");
    assert_eq!(body["data"]["byInitiative"]["labels"], json!(["Cierre diario"]));
}

#[tokio::test]
async fn test_reconcile_writes_changed_progress() {
    let fake = FakeBackend::default();
    let (status, body) = send(
        fake.clone(),
        post_json("/reconcile", json!({"email": "ana@corp.com"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(
        body["data"],
        json!([
            {
                "outcome": "updated",
                "initiative_id": 1,
                "patch": {"estado_iniciativa": "Abierta", "avance": 50}
            },
            {"outcome": "no_stories", "initiative_id": 2}
        ])
    );

    assert_eq!(
        fake.recorded_writes(),
        vec![(1, json!({"estado_iniciativa": "Abierta", "avance": 50}))]
    );
}

#[tokio::test]
async fn test_view_options() {
    let (status, body) = get("/session/view-options?email=jefe@corp.com").await;
    assert_eq!(status, StatusCode::OK);

    let values: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o["value"].as_str().unwrap())
        .collect();
    assert_eq!(values, vec!["jefe@corp.com", "ana@corp.com", "bo@corp.com"]);
    assert_eq!(body[0]["label"], "Yo • jefe@corp.com");
}

#[tokio::test]
async fn test_can_approve() {
    let (_, body) = get("/session/can-approve?email=jefe@corp.com&owner=ana@corp.com").await;
    assert_eq!(body["canApprove"], true);

    let (_, body) = get("/session/can-approve?email=bo@corp.com&owner=ana@corp.com").await;
    assert_eq!(body["canApprove"], false);

    let (_, body) = get("/session/can-approve?email=admin@hubai.com&owner=ana@corp.com").await;
    assert_eq!(body["canApprove"], true);

    // no supervisor on record: owner approves their own
    let (_, body) = get("/session/can-approve?email=bo@corp.com&owner=bo@corp.com").await;
    assert_eq!(body["canApprove"], true);

    let (status, _) = get("/session/can-approve?email=bo@corp.com").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
