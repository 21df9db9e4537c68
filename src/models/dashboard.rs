// src/models/dashboard.rs

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::models::{
    auth::User,
    car::{CarType, CarView},
    subscription::SubscriptionDetail,
    wash::Schedule,
};

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClientDashboard {
    pub car: Option<CarView>,
    pub subscription: Option<SubscriptionDetail>,
    pub next_wash: Option<Schedule>,
    pub last_wash: Option<Schedule>,
    pub selected_car_id: Option<Uuid>,
}

/// Contagem de carros por categoria.
#[derive(Debug, Default, Serialize, ToSchema)]
pub struct CarTypeCounts {
    pub hatchback: i64,
    pub sedan: i64,
    #[serde(rename = "mid-suv")]
    pub mid_suv: i64,
    #[serde(rename = "large-suv")]
    pub large_suv: i64,
}

impl CarTypeCounts {
    pub fn from_rows(rows: &[(CarType, i64)]) -> Self {
        let mut counts = Self::default();
        for (car_type, total) in rows {
            match car_type {
                CarType::Hatchback => counts.hatchback += total,
                CarType::Sedan => counts.sedan += total,
                CarType::MidSuv => counts.mid_suv += total,
                CarType::LargeSuv => counts.large_suv += total,
            }
        }
        counts
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RevenueDataset {
    pub data: Vec<Decimal>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RevenueData {
    pub current_month: Decimal,
    pub past_month: Decimal,
    pub labels: Vec<String>,
    pub datasets: Vec<RevenueDataset>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ActivityFeedEntry {
    pub id: Uuid,
    pub text: String,
    pub date: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminDashboard {
    pub active_subscriptions: i64,
    pub total_cleaners: i64,
    pub car_types: CarTypeCounts,
    pub recent_registrations: i64,
    pub revenue_data: RevenueData,
    pub activity_log: Vec<ActivityFeedEntry>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct AdminDashboardQuery {
    /// Id do prédio ou `all`
    pub building_id: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PrimaryCarSummary {
    pub make: String,
    pub model: String,
    #[serde(rename = "type")]
    pub car_type: CarType,
    pub license_plate: String,
    pub color: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CustomerView {
    #[serde(flatten)]
    pub customer: User,
    pub subscription: Option<SubscriptionDetail>,
    pub car_photo_url: Option<String>,
    pub cars: Vec<CarView>,
    pub primary_car_summary: Option<PrimaryCarSummary>,
}

// Cadastro de lavadores e incorporadores pelo admin
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateStaffPayload {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(length(min = 3, message = "Username must be at least 3 characters"))]
    pub username: String,
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    #[validate(length(min = 1, message = "Phone is required"))]
    pub phone: String,
    pub building_assigned: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStaffPayload {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: Option<String>,
    #[validate(length(min = 3, message = "Username must be at least 3 characters"))]
    pub username: Option<String>,
    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub building_assigned: Option<String>,
    /// Em branco mantém a senha atual
    pub password: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActiveSubscriptionListing {
    #[serde(flatten)]
    pub subscription: SubscriptionDetail,
    pub user: Option<User>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn car_type_counts_fill_missing_categories_with_zero() {
        let counts = CarTypeCounts::from_rows(&[(CarType::Sedan, 3), (CarType::LargeSuv, 1)]);
        let json = serde_json::to_value(&counts).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "hatchback": 0, "sedan": 3, "mid-suv": 0, "large-suv": 1 })
        );
    }
}
