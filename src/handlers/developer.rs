// src/handlers/developer.rs

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::rbac::{DeveloperRole, RequireRole},
    models::building::{Building, BuildingSummary, SummaryQuery},
};

// GET /api/developer/buildings
#[utoipa::path(
    get,
    path = "/api/developer/buildings",
    tag = "Developer",
    responses((status = 200, description = "Prédios do incorporador", body = Vec<Building>)),
    security(("api_jwt" = []))
)]
pub async fn buildings(
    State(app_state): State<AppState>,
    developer: RequireRole<DeveloperRole>,
) -> Result<impl IntoResponse, AppError> {
    let buildings = app_state
        .building_service
        .developer_buildings(developer.user().id)
        .await?;
    Ok(Json(buildings))
}

// GET /api/developer/buildings/{id}/summary
#[utoipa::path(
    get,
    path = "/api/developer/buildings/{id}/summary",
    tag = "Developer",
    params(
        ("id" = Uuid, Path, description = "ID do prédio"),
        SummaryQuery
    ),
    responses(
        (status = 200, description = "Resumo mensal do prédio", body = BuildingSummary),
        (status = 404, description = "Prédio não pertence ao incorporador")
    ),
    security(("api_jwt" = []))
)]
pub async fn building_summary(
    State(app_state): State<AppState>,
    developer: RequireRole<DeveloperRole>,
    Path(id): Path<Uuid>,
    Query(query): Query<SummaryQuery>,
) -> Result<impl IntoResponse, AppError> {
    let summary = app_state
        .building_service
        .developer_summary(developer.user().id, id, query.month.as_deref())
        .await?;
    Ok(Json(summary))
}
