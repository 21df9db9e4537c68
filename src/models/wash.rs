// src/models/wash.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::models::{
    auth::{User, WashPattern},
    car::{CarSummary, CarView},
    subscription::SubscriptionStatus,
};

/// Status de lavagem de um cliente (painel do lavador) ou de um dia (calendário).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum WashStatus {
    Washed,
    Scheduled,
    Pending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "schedule_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ScheduleStatus {
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
}

// Registro imutável de uma lavagem feita
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WashRecord {
    pub id: Uuid,
    pub client_id: Uuid,
    pub car_id: Option<Uuid>,
    pub cleaner_id: Uuid,
    pub washed_at: DateTime<Utc>,
    pub wash_for_date: Option<DateTime<Utc>>,
    pub wash_time: String,
    pub created_at: DateTime<Utc>,
}

impl WashRecord {
    /// Dia ao qual a lavagem é creditada.
    pub fn credited_at(&self) -> DateTime<Utc> {
        self.wash_for_date.unwrap_or(self.washed_at)
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    pub id: Uuid,
    pub client_id: Uuid,
    pub car_id: Option<Uuid>,
    pub cleaner_id: Option<Uuid>,
    pub scheduled_date: DateTime<Utc>,
    pub start_time: Option<String>,
    pub status: ScheduleStatus,
    pub created_at: DateTime<Utc>,
}

// Agenda do lavador com dados do cliente e do carro
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CleanerScheduleEntry {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub schedule: Schedule,
    pub client_name: String,
    pub client_phone: String,
    pub car_make: Option<String>,
    pub car_model: Option<String>,
    pub car_license_plate: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BuildingClient {
    #[serde(flatten)]
    pub client: User,
    pub status: WashStatus,
    pub car_photo_url: Option<String>,
    pub car_details: CarSummary,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEntry {
    /// YYYY-MM-DD
    pub date: String,
    /// "Mar 7"
    pub display_date: String,
    /// "Thu"
    pub day_name: String,
    pub status: WashStatus,
    pub scheduled_time: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MonthlySchedule {
    pub car: CarView,
    pub wash_days: WashPattern,
    pub entries: Vec<CalendarEntry>,
    /// Mês 0..=11
    pub month: u32,
    pub year: i32,
    pub status: SubscriptionStatus,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WashHistoryEntry {
    #[serde(flatten)]
    pub record: WashRecord,
    pub car: Option<CarView>,
    /// Carro da lavagem (explícito ou inferido)
    pub resolved_car_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecordWashPayload {
    pub client_id: Uuid,
    pub car_id: Option<Uuid>,
    /// Dia agendado que esta lavagem completa (lavagem pendente feita com atraso).
    pub wash_for_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateScheduleStatusPayload {
    pub status: ScheduleStatus,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct BuildingClientsQuery {
    pub building_name: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ScheduleQuery {
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyScheduleQuery {
    pub car_id: Option<Uuid>,
    pub month: Option<String>,
    pub year: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct CarFilterQuery {
    pub car_id: Option<Uuid>,
}
