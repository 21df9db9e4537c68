// src/handlers/client.rs

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
    middleware::auth::AuthenticatedUser,
    models::{
        activity::{ContactPayload, DeletionRequestPayload, FeedbackPayload, MessageResponse, PushTokenPayload},
        car::{CarView, SubscribedCar, UpdateCarPayload},
        catalog::SubscriptionPlan,
        dashboard::ClientDashboard,
        subscription::{
            ConfirmSubscriptionPayload, ConfirmedSubscription, SubscribePayload, SubscribeResponse,
            SubscriptionActionPayload, SubscriptionActionResponse, SubscriptionDetail,
        },
        wash::{CarFilterQuery, MonthlySchedule, MonthlyScheduleQuery, Schedule, WashHistoryEntry},
    },
};

// =============================================================================
//  ÁREA 1: PAINEL E AGENDA
// =============================================================================

// GET /api/client/dashboard
#[utoipa::path(
    get,
    path = "/api/client/dashboard",
    tag = "Client",
    params(CarFilterQuery),
    responses((status = 200, description = "Painel do cliente", body = ClientDashboard)),
    security(("api_jwt" = []))
)]
pub async fn dashboard(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Query(query): Query<CarFilterQuery>,
) -> Result<impl IntoResponse, AppError> {
    let dashboard = app_state.client_service.dashboard(&user, query.car_id).await?;
    Ok(Json(dashboard))
}

// GET /api/client/monthly-schedule
#[utoipa::path(
    get,
    path = "/api/client/monthly-schedule",
    tag = "Client",
    params(MonthlyScheduleQuery),
    responses(
        (status = 200, description = "Calendário do mês", body = MonthlySchedule),
        (status = 400, description = "carId ausente"),
        (status = 404, description = "Carro não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn monthly_schedule(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Query(query): Query<MonthlyScheduleQuery>,
) -> Result<impl IntoResponse, AppError> {
    let schedule = app_state.wash_service.monthly_schedule(&user, query).await?;
    Ok(Json(schedule))
}

// GET /api/client/wash-history
#[utoipa::path(
    get,
    path = "/api/client/wash-history",
    tag = "Client",
    params(CarFilterQuery),
    responses((status = 200, description = "Lavagens registradas", body = Vec<WashHistoryEntry>)),
    security(("api_jwt" = []))
)]
pub async fn wash_history(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Query(query): Query<CarFilterQuery>,
) -> Result<impl IntoResponse, AppError> {
    let history = app_state.wash_service.wash_history(&user, query.car_id).await?;
    Ok(Json(history))
}

// GET /api/client/history
#[utoipa::path(
    get,
    path = "/api/client/history",
    tag = "Client",
    params(CarFilterQuery),
    responses((status = 200, description = "Agendamentos do cliente", body = Vec<Schedule>)),
    security(("api_jwt" = []))
)]
pub async fn schedule_history(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Query(query): Query<CarFilterQuery>,
) -> Result<impl IntoResponse, AppError> {
    let history = app_state.wash_service.schedule_history(&user, query.car_id).await?;
    Ok(Json(history))
}

// =============================================================================
//  ÁREA 2: CARROS
// =============================================================================

// GET /api/client/cars
#[utoipa::path(
    get,
    path = "/api/client/cars",
    tag = "Client",
    responses((status = 200, description = "Carros do cliente", body = Vec<CarView>)),
    security(("api_jwt" = []))
)]
pub async fn list_cars(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<impl IntoResponse, AppError> {
    let cars = app_state.client_service.list_cars(&user).await?;
    Ok(Json(cars))
}

// GET /api/client/cars/{car_id}
#[utoipa::path(
    get,
    path = "/api/client/cars/{car_id}",
    tag = "Client",
    params(("car_id" = Uuid, Path, description = "ID do carro")),
    responses(
        (status = 200, description = "Carro", body = CarView),
        (status = 404, description = "Carro não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_car(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(car_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let car = app_state.client_service.get_car(&user, car_id).await?;
    Ok(Json(car))
}

// PUT /api/client/cars/{car_id}
#[utoipa::path(
    put,
    path = "/api/client/cars/{car_id}",
    tag = "Client",
    request_body = UpdateCarPayload,
    params(("car_id" = Uuid, Path, description = "ID do carro")),
    responses(
        (status = 200, description = "Carro atualizado", body = CarView),
        (status = 404, description = "Carro não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_car(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(car_id): Path<Uuid>,
    Json(payload): Json<UpdateCarPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let car = app_state.client_service.update_car(&user, car_id, payload).await?;
    Ok(Json(car))
}

// DELETE /api/client/cars/{car_id}
#[utoipa::path(
    delete,
    path = "/api/client/cars/{car_id}",
    tag = "Client",
    params(("car_id" = Uuid, Path, description = "ID do carro")),
    responses(
        (status = 200, description = "Carro removido", body = MessageResponse),
        (status = 400, description = "Assinatura ainda ativa"),
        (status = 404, description = "Carro não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_car(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(car_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    app_state.client_service.delete_car(&user, car_id).await?;
    Ok(Json(MessageResponse::new("Car deleted successfully")))
}

// GET /api/client/subscribed-cars
#[utoipa::path(
    get,
    path = "/api/client/subscribed-cars",
    tag = "Client",
    responses((status = 200, description = "Carros com assinatura viva", body = Vec<SubscribedCar>)),
    security(("api_jwt" = []))
)]
pub async fn subscribed_cars(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<impl IntoResponse, AppError> {
    let cars = app_state.client_service.subscribed_cars(&user).await?;
    Ok(Json(cars))
}

// =============================================================================
//  ÁREA 3: ASSINATURAS
// =============================================================================

// GET /api/client/subscription-plans
#[utoipa::path(
    get,
    path = "/api/client/subscription-plans",
    tag = "Client",
    responses((status = 200, description = "Planos disponíveis", body = Vec<SubscriptionPlan>)),
    security(("api_jwt" = []))
)]
pub async fn subscription_plans(State(app_state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let plans = app_state.client_service.list_plans().await?;
    Ok(Json(plans))
}

// POST /api/client/subscribe
#[utoipa::path(
    post,
    path = "/api/client/subscribe",
    tag = "Client",
    request_body = SubscribePayload,
    responses(
        (status = 200, description = "Assinatura criada no processador", body = SubscribeResponse),
        (status = 409, description = "Carro já possui assinatura viva"),
        (status = 502, description = "Falha no processador")
    ),
    security(("api_jwt" = []))
)]
pub async fn subscribe(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(payload): Json<SubscribePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let response = app_state.billing_service.subscribe(&user, payload).await?;
    Ok(Json(response))
}

// POST /api/client/subscribe/confirm
#[utoipa::path(
    post,
    path = "/api/client/subscribe/confirm",
    tag = "Client",
    request_body = ConfirmSubscriptionPayload,
    responses(
        (status = 201, description = "Assinatura gravada", body = ConfirmedSubscription),
        (status = 200, description = "Assinatura já confirmada", body = ConfirmedSubscription),
        (status = 403, description = "Assinatura de outro cliente"),
        (status = 409, description = "Assinatura ainda não ativa")
    ),
    security(("api_jwt" = []))
)]
pub async fn confirm_subscription(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(payload): Json<ConfirmSubscriptionPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let (created, subscription) = app_state.billing_service.confirm(&user, payload).await?;
    let status = if created { StatusCode::CREATED } else { StatusCode::OK };
    Ok((status, Json(ConfirmedSubscription { subscription })))
}

// PUT /api/client/subscription/{id}
#[utoipa::path(
    put,
    path = "/api/client/subscription/{id}",
    tag = "Client",
    request_body = SubscriptionActionPayload,
    params(("id" = Uuid, Path, description = "ID da assinatura")),
    responses(
        (status = 200, description = "Assinatura atualizada", body = SubscriptionActionResponse),
        (status = 400, description = "Ação inválida"),
        (status = 404, description = "Assinatura não encontrada"),
        (status = 409, description = "Cancelada no processador")
    ),
    security(("api_jwt" = []))
)]
pub async fn subscription_action(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<SubscriptionActionPayload>,
) -> Result<impl IntoResponse, AppError> {
    let response = app_state
        .subscription_service
        .client_action(&user, id, &payload.action)
        .await?;
    Ok(Json(response))
}

// GET /api/client/subscription/{id}/status
#[utoipa::path(
    get,
    path = "/api/client/subscription/{id}/status",
    tag = "Client",
    params(("id" = Uuid, Path, description = "ID da assinatura")),
    responses(
        (status = 200, description = "Assinatura sincronizada", body = SubscriptionDetail),
        (status = 404, description = "Assinatura não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn subscription_status(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let detail = app_state.subscription_service.status_check(&user, id).await?;
    Ok(Json(detail))
}

// =============================================================================
//  ÁREA 4: FEEDBACK, CONTATO E CONTA
// =============================================================================

// POST /api/client/feedback
#[utoipa::path(
    post,
    path = "/api/client/feedback",
    tag = "Client",
    request_body = FeedbackPayload,
    responses((status = 201, description = "Avaliação registrada", body = MessageResponse)),
    security(("api_jwt" = []))
)]
pub async fn feedback(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(payload): Json<FeedbackPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    app_state.client_service.submit_feedback(&user, payload).await?;
    Ok((StatusCode::CREATED, Json(MessageResponse::new("Review submitted successfully"))))
}

// POST /api/client/save-push-token
#[utoipa::path(
    post,
    path = "/api/client/save-push-token",
    tag = "Client",
    request_body = PushTokenPayload,
    responses((status = 200, description = "Token salvo", body = MessageResponse)),
    security(("api_jwt" = []))
)]
pub async fn save_push_token(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(payload): Json<PushTokenPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    app_state.client_service.save_push_token(&user, &payload.token).await?;
    Ok(Json(MessageResponse::new("Push token saved")))
}

// POST /api/client/contact
#[utoipa::path(
    post,
    path = "/api/client/contact",
    tag = "Client",
    request_body = ContactPayload,
    responses((status = 200, description = "Mensagem registrada", body = MessageResponse)),
    security(("api_jwt" = []))
)]
pub async fn contact(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(payload): Json<ContactPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    app_state.client_service.contact(&user, payload).await?;
    Ok(Json(MessageResponse::new("Message received. We will contact you shortly.")))
}

// POST /api/client/account-deletion-request (público)
#[utoipa::path(
    post,
    path = "/api/client/account-deletion-request",
    tag = "Client",
    request_body = DeletionRequestPayload,
    responses(
        (status = 201, description = "Pedido registrado", body = MessageResponse),
        (status = 400, description = "Identificação incompleta"),
        (status = 403, description = "Conta não é de cliente"),
        (status = 404, description = "Usuário não encontrado")
    )
)]
pub async fn account_deletion_request(
    State(app_state): State<AppState>,
    Json(payload): Json<DeletionRequestPayload>,
) -> Result<impl IntoResponse, AppError> {
    app_state.client_service.request_deletion(payload).await?;
    Ok((StatusCode::CREATED, Json(MessageResponse::new("Deletion request submitted."))))
}
