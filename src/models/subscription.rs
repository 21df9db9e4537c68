// src/models/subscription.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::car::CarType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "subscription_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    OnHold,
    Cancelled,
    Inactive,
}

impl SubscriptionStatus {
    /// Ativa ou pausada: ocupa o carro e bloqueia nova assinatura.
    pub fn is_live(self) -> bool {
        matches!(self, SubscriptionStatus::Active | SubscriptionStatus::OnHold)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "status_action", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum StatusAction {
    Create,
    Hold,
    Unhold,
    Cancel,
    StripeSync,
    StripeConfirm,
    StripeCancelledSync,
    SystemCancelNewSub,
    AdminActivate,
    AdminHold,
    AdminCancel,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: Uuid,
    pub user_id: Uuid,
    pub car_id: Option<Uuid>,
    pub plan_id: Uuid,
    pub status: SubscriptionStatus,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub stripe_subscription_id: Option<String>,
    pub plan_type: String,
    pub plan_car_type: CarType,
    pub plan_price: Decimal,
    pub plan_features: Vec<String>,
    pub plan_wash_frequency: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusHistoryEntry {
    #[serde(skip_serializing)]
    pub subscription_id: Uuid,
    pub status: SubscriptionStatus,
    pub action: StatusAction,
    #[serde(rename = "timestamp")]
    pub created_at: DateTime<Utc>,
}

/// Assinatura com o histórico de status, como exposta pela API.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionDetail {
    #[serde(flatten)]
    pub subscription: Subscription,
    pub status_history: Vec<StatusHistoryEntry>,
}

/// Alterações aplicadas a uma assinatura local após falar com o processador.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalStatusUpdate {
    pub status: SubscriptionStatus,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    /// `Some` quando o status muda e o histórico deve crescer.
    pub history_action: Option<StatusAction>,
}

// Dados para inserir uma assinatura confirmada
#[derive(Debug, Clone)]
pub struct NewSubscriptionRecord {
    pub user_id: Uuid,
    pub car_id: Uuid,
    pub plan_id: Uuid,
    pub status: SubscriptionStatus,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub stripe_subscription_id: String,
    pub plan_type: String,
    pub plan_car_type: CarType,
    pub plan_price: Decimal,
    pub plan_features: Vec<String>,
    pub plan_wash_frequency: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubscribePayload {
    pub plan_id: Uuid,
    pub car_id: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeResponse {
    pub stripe_subscription_id: String,
    pub customer_id: String,
    pub customer_ephemeral_key_secret: String,
    pub payment_intent_client_secret: Option<String>,
    pub setup_intent_client_secret: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmSubscriptionPayload {
    pub plan_id: Uuid,
    pub car_id: Uuid,
    #[validate(length(min = 1, message = "Missing required fields"))]
    pub stripe_subscription_id: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ConfirmedSubscription {
    pub subscription: SubscriptionDetail,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SubscriptionActionPayload {
    /// `activate` (ou `unhold`), `hold`, `cancel`
    pub action: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminSubscriptionPayload {
    /// `active`, `on_hold`, `cancelled`
    pub status: String,
    pub car_id: Option<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SubscriptionActionResponse {
    pub message: String,
    pub subscription: SubscriptionDetail,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AdminSubscriptionResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription: Option<SubscriptionDetail>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct PaymentIntentPayload {
    #[validate(range(min = 1, message = "Amount must be positive"))]
    pub amount: i64,
    pub currency: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentIntentSummary {
    pub id: String,
    pub client_secret: Option<String>,
    pub amount: i64,
    pub currency: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntentResponse {
    pub payment_intent: PaymentIntentSummary,
    pub is_mock: bool,
}
