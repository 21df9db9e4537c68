// src/handlers/buildings.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::rbac::{AdminRole, RequireRole},
    models::{
        activity::MessageResponse,
        building::{BuildingListing, CreateBuildingPayload, UpdateBuildingPayload},
    },
};

// GET /api/buildings (público)
#[utoipa::path(
    get,
    path = "/api/buildings",
    tag = "Buildings",
    responses((status = 200, description = "Prédios com o incorporador", body = Vec<BuildingListing>))
)]
pub async fn list(State(app_state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let buildings = app_state.building_service.list().await?;
    Ok(Json(buildings))
}

// POST /api/buildings
#[utoipa::path(
    post,
    path = "/api/buildings",
    tag = "Buildings",
    request_body = CreateBuildingPayload,
    responses(
        (status = 201, description = "Prédio criado", body = BuildingListing),
        (status = 400, description = "Nome ou incorporador inválido")
    ),
    security(("api_jwt" = []))
)]
pub async fn create(
    State(app_state): State<AppState>,
    _admin: RequireRole<AdminRole>,
    Json(payload): Json<CreateBuildingPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let building = app_state.building_service.create(payload).await?;
    Ok((StatusCode::CREATED, Json(building)))
}

// PUT /api/buildings/{id}
#[utoipa::path(
    put,
    path = "/api/buildings/{id}",
    tag = "Buildings",
    request_body = UpdateBuildingPayload,
    params(("id" = Uuid, Path, description = "ID do prédio")),
    responses(
        (status = 200, description = "Prédio atualizado", body = BuildingListing),
        (status = 400, description = "Troca de incorporador recusada"),
        (status = 404, description = "Prédio não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn update(
    State(app_state): State<AppState>,
    _admin: RequireRole<AdminRole>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateBuildingPayload>,
) -> Result<impl IntoResponse, AppError> {
    let building = app_state.building_service.update(id, payload).await?;
    Ok(Json(building))
}

// DELETE /api/buildings/{id}
#[utoipa::path(
    delete,
    path = "/api/buildings/{id}",
    tag = "Buildings",
    params(("id" = Uuid, Path, description = "ID do prédio")),
    responses((status = 200, description = "Prédio removido", body = MessageResponse)),
    security(("api_jwt" = []))
)]
pub async fn delete(
    State(app_state): State<AppState>,
    _admin: RequireRole<AdminRole>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    app_state.building_service.delete(id).await?;
    Ok(Json(MessageResponse::new("Building deleted successfully")))
}

// POST /api/buildings/seed
#[utoipa::path(
    post,
    path = "/api/buildings/seed",
    tag = "Buildings",
    responses((status = 200, description = "Prédios de exemplo garantidos", body = MessageResponse)),
    security(("api_jwt" = []))
)]
pub async fn seed(
    State(app_state): State<AppState>,
    _admin: RequireRole<AdminRole>,
) -> Result<impl IntoResponse, AppError> {
    app_state.building_service.seed().await?;
    Ok(Json(MessageResponse::new("Database seeded with dummy Dubai buildings")))
}
