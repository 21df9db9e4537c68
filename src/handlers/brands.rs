// src/handlers/brands.rs

use axum::{extract::State, response::IntoResponse, Json};

use crate::{common::error::AppError, config::AppState, models::catalog::CarBrandView};

// GET /api/brands
#[utoipa::path(
    get,
    path = "/api/brands",
    tag = "Brands",
    responses((status = 200, description = "Catálogo de marcas e modelos", body = Vec<CarBrandView>))
)]
pub async fn list(State(app_state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let brands = app_state.building_service.brands().await?;
    Ok(Json(brands))
}
