//! In-process stand-in for the initiatives REST backend.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, put},
    Json, Router,
};
use serde_json::{json, Value};

use initiative_insights::{AppState, BackendClient, Config};

#[derive(Clone, Default)]
pub struct FakeBackend {
    pub writes: Arc<Mutex<Vec<(i64, Value)>>>,
}

impl FakeBackend {
    pub fn recorded_writes(&self) -> Vec<(i64, Value)> {
        self.writes.lock().unwrap().clone()
    }
}

/// Serves the fake on an ephemeral port and returns its base URL.
pub async fn spawn_backend(fake: FakeBackend) -> String {
    let router = Router::new()
        .route("/api/iniciativas_por_correo/:email", get(initiatives))
        .route("/api/actividades_por_correo/:email", get(activities))
        .route("/api/actividades_por_iniciativa/:id", get(initiative_activities))
        .route("/api/historias_usuario/:id", get(stories))
        .route("/api/subordinados_de/:email", get(subordinates))
        .route("/api/colaborador/:email", get(collaborator))
        .route("/api/iniciativas/:id", put(update_initiative))
        .with_state(fake);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

pub fn client(base_url: &str) -> BackendClient {
    BackendClient::new(base_url, Duration::from_secs(5)).unwrap()
}

pub async fn app_state(fake: FakeBackend) -> AppState {
    let base_url = spawn_backend(fake).await;
    AppState::new(client(&base_url), Config::default())
}

/// Canned failure modes keyed by email.
fn canned(email: &str) -> Option<Response> {
    match email {
        "null@corp.com" => Some(Json(Value::Null).into_response()),
        "boom@corp.com" => Some(StatusCode::INTERNAL_SERVER_ERROR.into_response()),
        "garbage@corp.com" => Some((StatusCode::OK, "<html>oops</html>").into_response()),
        _ => None,
    }
}

async fn initiatives(Path(email): Path<String>) -> Response {
    if let Some(resp) = canned(&email) {
        return resp;
    }
    if email != "ana@corp.com" {
        return StatusCode::NOT_FOUND.into_response();
    }
    Json(json!([
        {
            "id_iniciativa": 1,
            "nombre_iniciativa": "Cierre diario",
            "estado_iniciativa": "Abierta",
            "aprobacion": "Aprobado",
            "avance": 0,
            "correo_electronico": "ana@corp.com"
        },
        {
            "id_iniciativa": 2,
            "nombre_iniciativa": "Tablero comercial",
            "estado_iniciativa": "Abierta",
            "aprobacion": "Pendiente",
            "avance": null,
            "correo_electronico": "ana@corp.com"
        }
    ]))
    .into_response()
}

fn cuadre_row() -> Value {
    json!({
        "id_actividad": 10,
        "id_iniciativa": 1,
        "nombre_actividad": "Cuadre de caja",
        "tipo_actividad": "ETL/ELT",
        "periodicidad": "DIARIO",
        "carga_minutos": 30,
        "herramientas": "Python",
        "fecha": "2025-10-14",
        "correo_electronico": "ana@corp.com",
        "costo_operativo": 12.5,
        "porcentaje_automatizacion": 40
    })
}

/// Row where ana is only the backup.
fn backup_row() -> Value {
    json!({
        "id_actividad": 11,
        "id_iniciativa": 1,
        "nombre_actividad": "Soporte a cierre",
        "tipo_actividad": "Soporte",
        "periodicidad": "semanal",
        "carga_minutos": "100",
        "herramientas": "Excel",
        "fecha": "Tue, 14 Oct 2025 00:00:00 GMT",
        "correo_electronico": "bo@corp.com",
        "correo_electronico_buckup": "ana@corp.com"
    })
}

async fn activities(Path(email): Path<String>) -> Response {
    if let Some(resp) = canned(&email) {
        return resp;
    }
    if email != "ana@corp.com" {
        return StatusCode::NOT_FOUND.into_response();
    }
    Json(json!([
        cuadre_row(),
        backup_row(),
        {
            "id_actividad": 12,
            "id_iniciativa": null,
            "nombre_actividad": "Reunión de equipo",
            "tipo_actividad": "Reunión",
            "periodicidad": "A PEDIDO",
            "carga_minutos": 20,
            "herramientas": null,
            "fecha": null,
            "correo_electronico": "ANA@corp.com"
        }
    ]))
    .into_response()
}

async fn initiative_activities(Path(id): Path<i64>) -> Response {
    match id {
        1 => Json(json!([cuadre_row(), backup_row()])).into_response(),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn stories(Path(id): Path<i64>) -> Response {
    match id {
        1 => Json(json!([
            {"id_historia": 100, "id_iniciativa": 1, "nombre_historia": "Extraer", "estado": "Cerrada"},
            {"id_historia": 101, "id_iniciativa": 1, "nombre_historia": "Cargar", "estado": "Pendiente"}
        ]))
        .into_response(),
        _ => Json(json!([])).into_response(),
    }
}

async fn subordinates(Path(email): Path<String>) -> Response {
    if email != "jefe@corp.com" {
        return StatusCode::NOT_FOUND.into_response();
    }
    Json(json!([
        {"nombre": "Ana", "correo_electronico": "ana@corp.com"},
        {"nombre": "Ana (duplicada)", "correo_electronico": "ANA@corp.com"},
        {"nombre": "Bo", "correo_electronico": "bo@corp.com"}
    ]))
    .into_response()
}

async fn collaborator(Path(email): Path<String>) -> Response {
    if email != "ana@corp.com" {
        return StatusCode::NOT_FOUND.into_response();
    }
    Json(json!([
        {"correo_electronico": "ana@corp.com", "correo_jefe_inmediato": "jefe@corp.com", "correo_jefe_inmediato_2": null}
    ]))
    .into_response()
}

async fn update_initiative(
    State(fake): State<FakeBackend>,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Json<Value> {
    fake.writes.lock().unwrap().push((id, body));
    Json(json!({"message": "ok"}))
}
