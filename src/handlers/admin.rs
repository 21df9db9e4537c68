// src/handlers/admin.rs

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
    middleware::rbac::{AdminRole, RequireRole},
    models::{
        activity::{ActivityLog, ContactView, MessageResponse, Notification, ReviewView},
        auth::{User, UserRole},
        catalog::{SubscriptionPlan, UpdatePlanPayload, UpsertPlanPayload},
        dashboard::{
            ActiveSubscriptionListing, AdminDashboard, AdminDashboardQuery, CarTypeCounts, CreateStaffPayload,
            CustomerView, UpdateStaffPayload,
        },
        subscription::{AdminSubscriptionPayload, AdminSubscriptionResponse},
    },
};

type Admin = RequireRole<AdminRole>;

// =============================================================================
//  ÁREA 1: PAINEL
// =============================================================================

// GET /api/admin/dashboard
#[utoipa::path(
    get,
    path = "/api/admin/dashboard",
    tag = "Admin",
    params(AdminDashboardQuery),
    responses(
        (status = 200, description = "Indicadores do painel", body = AdminDashboard),
        (status = 404, description = "Prédio não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn dashboard(
    State(app_state): State<AppState>,
    _admin: Admin,
    Query(query): Query<AdminDashboardQuery>,
) -> Result<impl IntoResponse, AppError> {
    let dashboard = app_state
        .admin_service
        .dashboard(query.building_id.as_deref())
        .await?;
    Ok(Json(dashboard))
}

// GET /api/admin/building-car-types/{building_id}
#[utoipa::path(
    get,
    path = "/api/admin/building-car-types/{building_id}",
    tag = "Admin",
    params(("building_id" = String, Path, description = "ID do prédio ou `all`")),
    responses((status = 200, description = "Carros por categoria", body = CarTypeCounts)),
    security(("api_jwt" = []))
)]
pub async fn building_car_types(
    State(app_state): State<AppState>,
    _admin: Admin,
    Path(building_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let counts = app_state.admin_service.building_car_types(&building_id).await?;
    Ok(Json(counts))
}

// =============================================================================
//  ÁREA 2: EQUIPE
// =============================================================================

async fn create_staff(
    app_state: &AppState,
    role: UserRole,
    payload: CreateStaffPayload,
) -> Result<(StatusCode, Json<User>), AppError> {
    payload.validate()?;
    let user = app_state.admin_service.create_staff(role, payload).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

async fn update_staff(
    app_state: &AppState,
    role: UserRole,
    id: Uuid,
    payload: UpdateStaffPayload,
) -> Result<Json<User>, AppError> {
    payload.validate()?;
    let user = app_state.admin_service.update_staff(role, id, payload).await?;
    Ok(Json(user))
}

// GET /api/admin/cleaners
#[utoipa::path(
    get,
    path = "/api/admin/cleaners",
    tag = "Admin",
    responses((status = 200, description = "Lavadores", body = Vec<User>)),
    security(("api_jwt" = []))
)]
pub async fn list_cleaners(State(app_state): State<AppState>, _admin: Admin) -> Result<impl IntoResponse, AppError> {
    let cleaners = app_state.admin_service.list_staff(UserRole::Cleaner).await?;
    Ok(Json(cleaners))
}

// POST /api/admin/cleaners
#[utoipa::path(
    post,
    path = "/api/admin/cleaners",
    tag = "Admin",
    request_body = CreateStaffPayload,
    responses(
        (status = 201, description = "Lavador criado", body = User),
        (status = 400, description = "Usuário já existe")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_cleaner(
    State(app_state): State<AppState>,
    _admin: Admin,
    Json(payload): Json<CreateStaffPayload>,
) -> Result<impl IntoResponse, AppError> {
    create_staff(&app_state, UserRole::Cleaner, payload).await
}

// PUT /api/admin/cleaners/{id}
#[utoipa::path(
    put,
    path = "/api/admin/cleaners/{id}",
    tag = "Admin",
    request_body = UpdateStaffPayload,
    params(("id" = Uuid, Path, description = "ID do lavador")),
    responses(
        (status = 200, description = "Lavador atualizado", body = User),
        (status = 404, description = "Lavador não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_cleaner(
    State(app_state): State<AppState>,
    _admin: Admin,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStaffPayload>,
) -> Result<impl IntoResponse, AppError> {
    update_staff(&app_state, UserRole::Cleaner, id, payload).await
}

// DELETE /api/admin/cleaners/{id}
#[utoipa::path(
    delete,
    path = "/api/admin/cleaners/{id}",
    tag = "Admin",
    params(("id" = Uuid, Path, description = "ID do lavador")),
    responses(
        (status = 200, description = "Lavador removido", body = MessageResponse),
        (status = 404, description = "Lavador não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_cleaner(
    State(app_state): State<AppState>,
    _admin: Admin,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    app_state.admin_service.delete_staff(UserRole::Cleaner, id).await?;
    Ok(Json(MessageResponse::new("Cleaner removed successfully")))
}

// GET /api/admin/developers
#[utoipa::path(
    get,
    path = "/api/admin/developers",
    tag = "Admin",
    responses((status = 200, description = "Incorporadores", body = Vec<User>)),
    security(("api_jwt" = []))
)]
pub async fn list_developers(State(app_state): State<AppState>, _admin: Admin) -> Result<impl IntoResponse, AppError> {
    let developers = app_state.admin_service.list_staff(UserRole::Developer).await?;
    Ok(Json(developers))
}

// POST /api/admin/developers
#[utoipa::path(
    post,
    path = "/api/admin/developers",
    tag = "Admin",
    request_body = CreateStaffPayload,
    responses(
        (status = 201, description = "Incorporador criado", body = User),
        (status = 400, description = "Usuário já existe")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_developer(
    State(app_state): State<AppState>,
    _admin: Admin,
    Json(payload): Json<CreateStaffPayload>,
) -> Result<impl IntoResponse, AppError> {
    create_staff(&app_state, UserRole::Developer, payload).await
}

// PUT /api/admin/developers/{id}
#[utoipa::path(
    put,
    path = "/api/admin/developers/{id}",
    tag = "Admin",
    request_body = UpdateStaffPayload,
    params(("id" = Uuid, Path, description = "ID do incorporador")),
    responses(
        (status = 200, description = "Incorporador atualizado", body = User),
        (status = 404, description = "Incorporador não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_developer(
    State(app_state): State<AppState>,
    _admin: Admin,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStaffPayload>,
) -> Result<impl IntoResponse, AppError> {
    update_staff(&app_state, UserRole::Developer, id, payload).await
}

// DELETE /api/admin/developers/{id}
#[utoipa::path(
    delete,
    path = "/api/admin/developers/{id}",
    tag = "Admin",
    params(("id" = Uuid, Path, description = "ID do incorporador")),
    responses(
        (status = 200, description = "Incorporador removido", body = MessageResponse),
        (status = 404, description = "Incorporador não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_developer(
    State(app_state): State<AppState>,
    _admin: Admin,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    app_state.admin_service.delete_staff(UserRole::Developer, id).await?;
    Ok(Json(MessageResponse::new("Developer removed successfully")))
}

// =============================================================================
//  ÁREA 3: CLIENTES E ASSINATURAS
// =============================================================================

// GET /api/admin/customers
#[utoipa::path(
    get,
    path = "/api/admin/customers",
    tag = "Admin",
    responses((status = 200, description = "Clientes com assinatura e carro principal", body = Vec<CustomerView>)),
    security(("api_jwt" = []))
)]
pub async fn customers(State(app_state): State<AppState>, _admin: Admin) -> Result<impl IntoResponse, AppError> {
    let customers = app_state.admin_service.customers().await?;
    Ok(Json(customers))
}

// PUT /api/admin/customers/{id}/subscription
#[utoipa::path(
    put,
    path = "/api/admin/customers/{id}/subscription",
    tag = "Admin",
    request_body = AdminSubscriptionPayload,
    params(("id" = Uuid, Path, description = "ID do cliente")),
    responses((status = 200, description = "Resultado da alteração", body = AdminSubscriptionResponse)),
    security(("api_jwt" = []))
)]
pub async fn update_customer_subscription(
    State(app_state): State<AppState>,
    _admin: Admin,
    Path(id): Path<Uuid>,
    Json(payload): Json<AdminSubscriptionPayload>,
) -> Result<impl IntoResponse, AppError> {
    let response = app_state.subscription_service.admin_update(id, payload).await?;
    Ok(Json(response))
}

// DELETE /api/admin/subscriptions/{id}
#[utoipa::path(
    delete,
    path = "/api/admin/subscriptions/{id}",
    tag = "Admin",
    params(("id" = String, Path, description = "ID da assinatura")),
    responses((status = 200, description = "Resultado da remoção", body = AdminSubscriptionResponse)),
    security(("api_jwt" = []))
)]
pub async fn delete_subscription(
    State(app_state): State<AppState>,
    _admin: Admin,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    // ID malformado responde 200 com `success: false`, como os demais casos
    let Ok(id) = Uuid::parse_str(id.trim()) else {
        return Ok(Json(AdminSubscriptionResponse {
            success: false,
            message: "Invalid subscription id".to_string(),
            subscription: None,
        }));
    };
    let response = app_state.subscription_service.admin_delete(id).await?;
    Ok(Json(response))
}

// GET /api/admin/subscriptions
#[utoipa::path(
    get,
    path = "/api/admin/subscriptions",
    tag = "Admin",
    responses((status = 200, description = "Assinaturas ativas", body = Vec<ActiveSubscriptionListing>)),
    security(("api_jwt" = []))
)]
pub async fn active_subscriptions(State(app_state): State<AppState>, _admin: Admin) -> Result<impl IntoResponse, AppError> {
    let listings = app_state.admin_service.active_subscriptions().await?;
    Ok(Json(listings))
}

// =============================================================================
//  ÁREA 4: PLANOS
// =============================================================================

// GET /api/admin/subscription-plans
#[utoipa::path(
    get,
    path = "/api/admin/subscription-plans",
    tag = "Admin",
    responses((status = 200, description = "Planos cadastrados", body = Vec<SubscriptionPlan>)),
    security(("api_jwt" = []))
)]
pub async fn list_plans(State(app_state): State<AppState>, _admin: Admin) -> Result<impl IntoResponse, AppError> {
    let plans = app_state.admin_service.list_plans().await?;
    Ok(Json(plans))
}

// POST /api/admin/subscription-plans
#[utoipa::path(
    post,
    path = "/api/admin/subscription-plans",
    tag = "Admin",
    request_body = UpsertPlanPayload,
    responses(
        (status = 201, description = "Plano criado ou substituído", body = SubscriptionPlan),
        (status = 400, description = "Dados inválidos")
    ),
    security(("api_jwt" = []))
)]
pub async fn upsert_plan(
    State(app_state): State<AppState>,
    _admin: Admin,
    Json(payload): Json<UpsertPlanPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let plan = app_state.admin_service.upsert_plan(payload).await?;
    Ok((StatusCode::CREATED, Json(plan)))
}

// PUT /api/admin/subscription-plans/{id}
#[utoipa::path(
    put,
    path = "/api/admin/subscription-plans/{id}",
    tag = "Admin",
    request_body = UpdatePlanPayload,
    params(("id" = Uuid, Path, description = "ID do plano")),
    responses(
        (status = 200, description = "Plano atualizado", body = SubscriptionPlan),
        (status = 404, description = "Plano não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_plan(
    State(app_state): State<AppState>,
    _admin: Admin,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdatePlanPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let plan = app_state.admin_service.update_plan(id, payload).await?;
    Ok(Json(plan))
}

// DELETE /api/admin/subscription-plans/{id}
#[utoipa::path(
    delete,
    path = "/api/admin/subscription-plans/{id}",
    tag = "Admin",
    params(("id" = Uuid, Path, description = "ID do plano")),
    responses(
        (status = 200, description = "Plano removido", body = MessageResponse),
        (status = 404, description = "Plano não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_plan(
    State(app_state): State<AppState>,
    _admin: Admin,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    app_state.admin_service.delete_plan(id).await?;
    Ok(Json(MessageResponse::new("Plan deleted successfully")))
}

// =============================================================================
//  ÁREA 5: ATIVIDADES, NOTIFICAÇÕES E MENSAGENS
// =============================================================================

// GET /api/admin/activities
#[utoipa::path(
    get,
    path = "/api/admin/activities",
    tag = "Admin",
    responses((status = 200, description = "Últimas atividades", body = Vec<ActivityLog>)),
    security(("api_jwt" = []))
)]
pub async fn activities(State(app_state): State<AppState>, _admin: Admin) -> Result<impl IntoResponse, AppError> {
    let logs = app_state.admin_service.activities().await?;
    Ok(Json(logs))
}

// GET /api/admin/notifications
#[utoipa::path(
    get,
    path = "/api/admin/notifications",
    tag = "Admin",
    responses((status = 200, description = "Notificações não lidas", body = Vec<Notification>)),
    security(("api_jwt" = []))
)]
pub async fn notifications(State(app_state): State<AppState>, _admin: Admin) -> Result<impl IntoResponse, AppError> {
    let notifications = app_state.admin_service.notifications().await?;
    Ok(Json(notifications))
}

// PUT /api/admin/notifications/{id}/read
#[utoipa::path(
    put,
    path = "/api/admin/notifications/{id}/read",
    tag = "Admin",
    params(("id" = Uuid, Path, description = "ID da notificação")),
    responses((status = 200, description = "Notificação lida", body = MessageResponse)),
    security(("api_jwt" = []))
)]
pub async fn mark_notification_read(
    State(app_state): State<AppState>,
    _admin: Admin,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    app_state.admin_service.mark_notification_read(id).await?;
    Ok(Json(MessageResponse::new("Notification marked as read")))
}

// GET /api/admin/reviews
#[utoipa::path(
    get,
    path = "/api/admin/reviews",
    tag = "Admin",
    responses((status = 200, description = "Avaliações dos clientes", body = Vec<ReviewView>)),
    security(("api_jwt" = []))
)]
pub async fn reviews(State(app_state): State<AppState>, _admin: Admin) -> Result<impl IntoResponse, AppError> {
    let reviews = app_state.admin_service.reviews().await?;
    Ok(Json(reviews))
}

// GET /api/admin/contacts
#[utoipa::path(
    get,
    path = "/api/admin/contacts",
    tag = "Admin",
    responses((status = 200, description = "Mensagens de contato", body = Vec<ContactView>)),
    security(("api_jwt" = []))
)]
pub async fn contacts(State(app_state): State<AppState>, _admin: Admin) -> Result<impl IntoResponse, AppError> {
    let contacts = app_state.admin_service.contacts().await?;
    Ok(Json(contacts))
}
