// src/handlers/payment.rs

use axum::{extract::State, response::IntoResponse, Json};
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::subscription::{PaymentIntentPayload, PaymentIntentResponse},
};

// POST /api/payment/create-payment-intent
#[utoipa::path(
    post,
    path = "/api/payment/create-payment-intent",
    tag = "Payment",
    request_body = PaymentIntentPayload,
    responses(
        (status = 200, description = "Intenção de pagamento criada (ou simulada)", body = PaymentIntentResponse),
        (status = 400, description = "Valor inválido")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_payment_intent(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    Json(payload): Json<PaymentIntentPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let response = app_state.billing_service.create_payment_intent(payload).await?;
    Ok(Json(response))
}
