// src/models/car.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::subscription::Subscription;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "car_type", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum CarType {
    Hatchback,
    Sedan,
    MidSuv,
    LargeSuv,
}

impl CarType {
    pub const ALL: [CarType; 4] = [
        CarType::Hatchback,
        CarType::Sedan,
        CarType::MidSuv,
        CarType::LargeSuv,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CarType::Hatchback => "hatchback",
            CarType::Sedan => "sedan",
            CarType::MidSuv => "mid-suv",
            CarType::LargeSuv => "large-suv",
        }
    }

    /// Aceita os rótulos livres do app ("SUV-large", "sedan/mid-SUV", "hatchback-small"...).
    /// Qualquer coisa irreconhecível vira sedan.
    pub fn normalize(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return CarType::Sedan;
        };
        let value = raw.to_lowercase().replace('_', "-");

        if value.contains("hatch") {
            CarType::Hatchback
        } else if value.contains("suv-large") || value.contains("suvlarge") {
            CarType::LargeSuv
        } else if value.contains("large") && value.contains("suv") {
            CarType::LargeSuv
        } else if value.contains("mid") && value.contains("suv") {
            CarType::MidSuv
        } else if value.contains("suv") {
            CarType::MidSuv
        } else {
            CarType::Sedan
        }
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Car {
    pub id: Uuid,
    pub client_id: Uuid,
    pub make: String,
    pub model: String,
    pub year: i32,
    #[serde(rename = "type")]
    pub car_type: CarType,
    pub license_plate: String,
    pub color: String,
    pub photo: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Resumo do carro mostrado para o lavador.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CarSummary {
    pub id: Uuid,
    pub make: String,
    pub model: String,
    pub color: String,
    pub license_plate: String,
    #[serde(rename = "type")]
    pub car_type: CarType,
}

impl From<&Car> for CarSummary {
    fn from(car: &Car) -> Self {
        Self {
            id: car.id,
            make: car.make.clone(),
            model: car.model.clone(),
            color: car.color.clone(),
            license_plate: car.license_plate.clone(),
            car_type: car.car_type,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CarView {
    #[serde(flatten)]
    pub car: Car,
    pub photo_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription: Option<Subscription>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubscribedCar {
    pub car: CarView,
    pub subscription: Subscription,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCarPayload {
    pub client_id: Option<Uuid>,
    #[validate(length(min = 1, message = "Make is required"))]
    pub make: String,
    #[validate(length(min = 1, message = "Model is required"))]
    pub model: String,
    #[validate(length(min = 4, message = "Year must be 4 digits"))]
    pub year: String,
    #[serde(rename = "type")]
    #[validate(length(min = 1, message = "Type is required"))]
    pub car_type: String,
    #[validate(length(min = 1, message = "License plate is required"))]
    pub license_plate: String,
    #[validate(length(min = 1, message = "Color is required"))]
    pub color: String,
    pub photo: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCarPayload {
    #[validate(length(min = 1, message = "Make is required"))]
    pub make: Option<String>,
    #[validate(length(min = 1, message = "Model is required"))]
    pub model: Option<String>,
    #[validate(range(min = 1900, max = 2100, message = "Invalid year"))]
    pub year: Option<i32>,
    #[serde(rename = "type")]
    pub car_type: Option<String>,
    #[validate(length(min = 1, message = "License plate is required"))]
    pub license_plate: Option<String>,
    #[validate(length(min = 1, message = "Color is required"))]
    pub color: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CarCreatedResponse {
    pub message: String,
    pub car: Car,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_form_car_types_are_normalised() {
        assert_eq!(CarType::normalize(Some("SUV-large")), CarType::LargeSuv);
        assert_eq!(CarType::normalize(Some("large_suv")), CarType::LargeSuv);
        assert_eq!(CarType::normalize(Some("sedan/mid-SUV")), CarType::MidSuv);
        assert_eq!(CarType::normalize(Some("hatchback-small")), CarType::Hatchback);
        assert_eq!(CarType::normalize(Some("SUV")), CarType::MidSuv);
        assert_eq!(CarType::normalize(Some("coupe")), CarType::Sedan);
        assert_eq!(CarType::normalize(None), CarType::Sedan);
    }

    #[test]
    fn car_type_serialises_kebab_case() {
        assert_eq!(serde_json::to_string(&CarType::MidSuv).unwrap(), "\"mid-suv\"");
    }
}
