// src/handlers/cleaner.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::rbac::{CleanerRole, RequireRole},
    models::wash::{
        BuildingClient, BuildingClientsQuery, CleanerScheduleEntry, RecordWashPayload, Schedule,
        ScheduleQuery, UpdateScheduleStatusPayload, WashRecord,
    },
};

// GET /api/cleaner/building-clients
#[utoipa::path(
    get,
    path = "/api/cleaner/building-clients",
    tag = "Cleaner",
    params(BuildingClientsQuery),
    responses(
        (status = 200, description = "Clientes com lavagem devida ou pendente", body = Vec<BuildingClient>),
        (status = 400, description = "buildingName ausente")
    ),
    security(("api_jwt" = []))
)]
pub async fn building_clients(
    State(app_state): State<AppState>,
    _cleaner: RequireRole<CleanerRole>,
    Query(query): Query<BuildingClientsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let building_name = query
        .building_name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| AppError::BadRequest("Building name is required".to_string()))?;

    let clients = app_state.wash_service.building_clients(building_name).await?;
    Ok(Json(clients))
}

// POST /api/cleaner/record-wash
#[utoipa::path(
    post,
    path = "/api/cleaner/record-wash",
    tag = "Cleaner",
    request_body = RecordWashPayload,
    responses(
        (status = 201, description = "Lavagem registrada", body = WashRecord),
        (status = 400, description = "Carro não pôde ser determinado"),
        (status = 404, description = "Cliente não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn record_wash(
    State(app_state): State<AppState>,
    cleaner: RequireRole<CleanerRole>,
    Json(payload): Json<RecordWashPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let record = app_state.wash_service.record_wash(cleaner.user(), payload).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

// GET /api/cleaner/today-washes
#[utoipa::path(
    get,
    path = "/api/cleaner/today-washes",
    tag = "Cleaner",
    responses((status = 200, description = "Lavagens do lavador hoje", body = Vec<WashRecord>)),
    security(("api_jwt" = []))
)]
pub async fn today_washes(
    State(app_state): State<AppState>,
    cleaner: RequireRole<CleanerRole>,
) -> Result<impl IntoResponse, AppError> {
    let washes = app_state.wash_service.today_washes(cleaner.user().id).await?;
    Ok(Json(washes))
}

// GET /api/cleaner/schedule
#[utoipa::path(
    get,
    path = "/api/cleaner/schedule",
    tag = "Cleaner",
    params(ScheduleQuery),
    responses((status = 200, description = "Agenda do lavador", body = Vec<CleanerScheduleEntry>)),
    security(("api_jwt" = []))
)]
pub async fn schedule(
    State(app_state): State<AppState>,
    cleaner: RequireRole<CleanerRole>,
    Query(query): Query<ScheduleQuery>,
) -> Result<impl IntoResponse, AppError> {
    let entries = app_state
        .wash_service
        .cleaner_schedule(cleaner.user().id, query.date)
        .await?;
    Ok(Json(entries))
}

// PUT /api/cleaner/status/{schedule_id}
#[utoipa::path(
    put,
    path = "/api/cleaner/status/{schedule_id}",
    tag = "Cleaner",
    request_body = UpdateScheduleStatusPayload,
    params(("schedule_id" = Uuid, Path, description = "ID do agendamento")),
    responses(
        (status = 200, description = "Agendamento atualizado", body = Schedule),
        (status = 404, description = "Agendamento não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_status(
    State(app_state): State<AppState>,
    _cleaner: RequireRole<CleanerRole>,
    Path(schedule_id): Path<Uuid>,
    Json(payload): Json<UpdateScheduleStatusPayload>,
) -> Result<impl IntoResponse, AppError> {
    let schedule = app_state
        .wash_service
        .update_schedule_status(schedule_id, payload.status)
        .await?;
    Ok(Json(schedule))
}
