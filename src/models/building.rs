// src/models/building.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Building {
    pub id: Uuid,
    pub name: String,
    pub developer_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

// Prédio com o incorporador responsável (LEFT JOIN em users)
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BuildingListing {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub building: Building,
    pub developer_name: Option<String>,
    pub developer_email: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateBuildingPayload {
    #[validate(length(min = 1, message = "Building name is required"))]
    pub name: String,
    pub developer_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBuildingPayload {
    pub name: Option<String>,
    /// Qualquer valor aqui é recusado: o incorporador é fixo após a criação.
    #[schema(value_type = Option<String>)]
    pub developer_id: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct SummaryQuery {
    /// Mês 1..=12 do ano corrente
    pub month: Option<String>,
}

#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BuildingClientRow {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub building_name: Option<String>,
}

#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BuildingCarRow {
    pub id: Uuid,
    pub client_id: Uuid,
    pub make: String,
    pub model: String,
    pub color: String,
    pub license_plate: String,
    #[serde(rename = "type")]
    pub car_type: crate::models::car::CarType,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BuildingRef {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BuildingTotals {
    pub clients: usize,
    pub cars: usize,
    pub monthly_revenue: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BuildingSummary {
    pub building: BuildingRef,
    pub totals: BuildingTotals,
    pub clients: Vec<BuildingClientRow>,
    pub cars: Vec<BuildingCarRow>,
    /// "March 2024"
    pub month_label: String,
}
