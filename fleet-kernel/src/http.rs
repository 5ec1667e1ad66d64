/**
 * API REST FLEET - Serveur HTTP du kernel
 *
 * RÔLE :
 * Expose la flotte simulée (data centers → racks → serveurs → conteneurs)
 * et les commandes opérateur sur serveurs et conteneurs.
 *
 * FONCTIONNEMENT :
 * - Serveur Axum, état unique `AppState` (store + health)
 * - Routes : /health, /system/health, /api/datacenters, /api/servers, /api/containers
 * - Chaque lecture de /api/datacenters fait avancer la simulation d'un pas
 * - Erreurs métier (FleetError) converties en 404 / 400 / 500 via `ApiError`
 */

use crate::state::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use fleet_sim::stats::{overview, FleetOverview};
use fleet_sim::{ActionOutcome, Container, ContainerAction, DataCenter, FleetError, Server, ServerAction};
use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::{debug, error, warn};

/// Erreur HTTP portant une `FleetError`.
#[derive(Debug)]
pub struct ApiError(pub FleetError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            FleetError::NotFound { .. } => StatusCode::NOT_FOUND,
            FleetError::Validation(_) => StatusCode::BAD_REQUEST,
            FleetError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<FleetError> for ApiError {
    fn from(err: FleetError) -> Self {
        Self(err)
    }
}

// Corps JSON illisible ou mal typé : toujours 400, jamais 415/422.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(FleetError::Validation(format!("malformed body: {}", rejection.body_text())))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %self.0, "request failed");
        } else {
            debug!(error = %self.0, %status, "request rejected");
        }
        let body = Json(serde_json::json!({ "success": false, "message": self.0.to_string() }));
        (status, body).into_response()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerActionResponse {
    pub success: bool,
    pub message: String,
    pub action: String,
    pub server_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerActionResponse {
    pub success: bool,
    pub message: String,
    pub action: String,
    pub container_id: String,
    pub container: Container,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateContainerRequest {
    pub server_id: Option<String>,
    pub image: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ContainerSpec {
    pub image: Option<String>,
    pub name: Option<String>,
}

pub fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/system/health", get(get_system_health))
        .route("/api/datacenters", get(get_datacenters))
        .route("/api/datacenters/summary", get(get_summary))
        .route("/api/servers", get(get_servers))
        .route("/api/servers/{id}/containers", post(create_container_on_server))
        .route("/api/servers/{id}/{action}", post(server_action))
        .route("/api/containers", post(create_container))
        .route("/api/containers/{id}", delete(remove_container))
        .route("/api/containers/{id}/{action}", post(container_action))
        .with_state(app_state)
}

// GET /health (liveness)
async fn health() -> Json<serde_json::Value> {
    let timestamp = OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default();
    Json(serde_json::json!({ "status": "OK", "timestamp": timestamp }))
}

// GET /system/health
async fn get_system_health(State(app): State<AppState>) -> Json<crate::health::KernelHealth> {
    Json(app.health.get_health(&app.store))
}

// GET /api/datacenters (évolue ou régénère la flotte)
async fn get_datacenters(State(app): State<AppState>) -> Json<Vec<DataCenter>> {
    Json(app.store.get_current().data_centers)
}

// GET /api/datacenters/summary (sans faire évoluer, sauf flotte vide)
async fn get_summary(State(app): State<AppState>) -> Json<FleetOverview> {
    let summary = match app.store.read(overview) {
        Some(summary) => summary,
        None => overview(&app.store.get_current()),
    };
    Json(summary)
}

// GET /api/servers (liste à plat, fait évoluer comme /api/datacenters)
async fn get_servers(State(app): State<AppState>) -> Json<Vec<Server>> {
    let fleet = app.store.get_current();
    Json(fleet.servers().cloned().collect())
}

// POST /api/servers/{id}/{start|stop|restart}
async fn server_action(
    State(app): State<AppState>,
    Path((id, action)): Path<(String, String)>,
) -> Result<Json<ServerActionResponse>, ApiError> {
    let action: ServerAction = action.parse()?;
    let outcome = app.store.server_action(&id, action)?;
    let message = match outcome {
        ActionOutcome::Done => format!("Server {id} {action} completed"),
        ActionOutcome::RestartPending => format!("Server {id} restart initiated"),
    };
    Ok(Json(ServerActionResponse { success: true, message, action: action.to_string(), server_id: id }))
}

// POST /api/containers/{id}/{start|stop|pause|remove}
async fn container_action(
    State(app): State<AppState>,
    Path((id, action)): Path<(String, String)>,
) -> Result<Json<ContainerActionResponse>, ApiError> {
    let action: ContainerAction = action.parse()?;
    run_container_action(&app, id, action)
}

// DELETE /api/containers/{id}
async fn remove_container(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ContainerActionResponse>, ApiError> {
    run_container_action(&app, id, ContainerAction::Remove)
}

fn run_container_action(
    app: &AppState,
    id: String,
    action: ContainerAction,
) -> Result<Json<ContainerActionResponse>, ApiError> {
    let container = app.store.container_action(&id, action)?;
    Ok(Json(ContainerActionResponse {
        success: true,
        message: format!("Container {id} {action} completed"),
        action: action.to_string(),
        container_id: id,
        container,
    }))
}

// POST /api/containers {serverId, image?, name?}
async fn create_container(
    State(app): State<AppState>,
    payload: Result<Json<CreateContainerRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Container>), ApiError> {
    let Json(req) = payload?;
    let Some(server_id) = req.server_id.filter(|id| !id.trim().is_empty()) else {
        warn!("container creation without serverId");
        return Err(FleetError::Validation("serverId is required".into()).into());
    };
    let container = app.store.create_container(&server_id, req.image, req.name)?;
    Ok((StatusCode::CREATED, Json(container)))
}

// POST /api/servers/{id}/containers {image?, name?}
async fn create_container_on_server(
    State(app): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<ContainerSpec>, JsonRejection>,
) -> Result<(StatusCode, Json<Container>), ApiError> {
    let Json(spec) = payload?;
    let container = app.store.create_container(&id, spec.image, spec.name)?;
    Ok((StatusCode::CREATED, Json(container)))
}
