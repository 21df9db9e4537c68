// src/models/catalog.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::models::car::CarType;

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionPlan {
    pub id: Uuid,
    pub car_type: CarType,
    pub plan_type: String,
    pub price: Decimal,
    pub features: Vec<String>,
    pub wash_frequency: String,
    pub stripe_product_id: Option<String>,
    pub stripe_price_id: Option<String>,
    pub stripe_currency: String,
    pub stripe_unit_amount: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn validate_positive_price(price: &Decimal) -> Result<(), ValidationError> {
    if *price <= Decimal::ZERO {
        let mut err = ValidationError::new("range");
        err.message = Some("Price must be greater than zero".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpsertPlanPayload {
    pub car_type: CarType,
    #[validate(length(min = 1, message = "Plan type is required"))]
    pub plan_type: String,
    #[validate(custom(function = "validate_positive_price"))]
    pub price: Decimal,
    #[serde(default)]
    pub features: Vec<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePlanPayload {
    #[validate(custom(function = "validate_positive_price"))]
    pub price: Decimal,
    #[serde(default)]
    pub features: Vec<String>,
}

// Linha da tabela car_brands
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CarBrandRow {
    pub id: Uuid,
    pub name: String,
    pub logo_file: Option<String>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CarModelRow {
    pub brand_id: Uuid,
    pub name: String,
    pub car_type: Option<CarType>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CarModelView {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub car_type: Option<CarType>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CarBrandView {
    pub id: Uuid,
    pub name: String,
    pub models: Vec<CarModelView>,
    pub logo_url: Option<String>,
}
