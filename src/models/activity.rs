// src/models/activity.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::auth::UserRole;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "activity_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Subscription,
    WashStatus,
    CleanerAdded,
    CleanerUpdated,
    CustomerAdded,
    DeveloperAdded,
    DeveloperUpdated,
    DeveloperDeleted,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLog {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    pub message: String,
    pub user_id: Option<Uuid>,
    pub license_plate: Option<String>,
    pub building_name: Option<String>,
    pub status: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Contexto opcional gravado junto da atividade.
#[derive(Debug, Clone, Default)]
pub struct ActivityContext {
    pub user_id: Option<Uuid>,
    pub license_plate: Option<String>,
    pub building_name: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,
    pub recipient_role: UserRole,
    pub title: String,
    pub message: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReviewView {
    pub id: Uuid,
    pub client_id: Uuid,
    pub schedule_id: Option<Uuid>,
    pub rating: i16,
    pub comment: String,
    pub created_at: DateTime<Utc>,
    pub client_name: Option<String>,
    pub client_email: Option<String>,
    pub client_phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContactView {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub subject: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub user_name: Option<String>,
    pub user_email: Option<String>,
    pub user_phone: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackPayload {
    pub schedule_id: Option<Uuid>,
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: i16,
    #[serde(default)]
    pub comment: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ContactPayload {
    #[validate(length(min = 1, message = "Subject is required"))]
    pub subject: String,
    #[validate(length(min = 1, message = "Message is required"))]
    pub message: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct PushTokenPayload {
    #[validate(length(min = 1, message = "userId and token are required"))]
    pub token: String,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct DeletionRequestPayload {
    pub username: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub secret_question: Option<String>,
    pub secret_answer: Option<String>,
    pub note: Option<String>,
    pub source: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}
