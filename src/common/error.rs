// src/common/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::payments::GatewayError;

// Todo erro visível ao usuário sai como `{ "message": ... }`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation failed")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("{0}")]
    BadRequest(String),

    #[error("User already exists")]
    UserAlreadyExists,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Access denied. No token provided.")]
    MissingToken,

    #[error("Invalid token.")]
    InvalidToken,

    #[error("Token expired.")]
    TokenExpired,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Stripe is not configured on the server.")]
    ProcessorNotConfigured,

    // Mensagem do processador repassada sem alteração
    #[error("{0}")]
    Processor(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("{0}")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Bcrypt error: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("JWT error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

impl From<GatewayError> for AppError {
    fn from(err: GatewayError) -> Self {
        AppError::Processor(err.message())
    }
}

impl AppError {
    pub fn not_found(what: &str) -> Self {
        AppError::NotFound(format!("{} not found", what))
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) | AppError::BadRequest(_) | AppError::UserAlreadyExists => {
                StatusCode::BAD_REQUEST
            }
            AppError::InvalidCredentials => StatusCode::BAD_REQUEST,
            AppError::MissingToken | AppError::TokenExpired => StatusCode::UNAUTHORIZED,
            AppError::InvalidToken => StatusCode::BAD_REQUEST,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Processor(_) => StatusCode::BAD_GATEWAY,
            AppError::ProcessorNotConfigured
            | AppError::DatabaseError(_)
            | AppError::InternalServerError(_)
            | AppError::BcryptError(_)
            | AppError::JwtError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if let AppError::ValidationError(errors) = &self {
            let details: Vec<_> = errors
                .field_errors()
                .into_iter()
                .flat_map(|(field, field_errors)| {
                    field_errors.iter().map(move |e| {
                        let message = e
                            .message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| format!("{} is invalid", field));
                        json!({ "field": field.to_string(), "message": message })
                    })
                })
                .collect();
            let first = details
                .first()
                .and_then(|d| d["message"].as_str())
                .unwrap_or("Validation failed")
                .to_string();
            let body = Json(json!({
                "message": "Validation failed",
                "errors": details,
                "error": first,
            }));
            return (status, body).into_response();
        }

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("Erro interno do servidor: {}", self);
        }

        let body = Json(json!({ "message": self.to_string() }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn processor_messages_pass_through_as_bad_gateway() {
        let err = AppError::Processor("No such subscription: 'sub_123'".into());
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(err.to_string(), "No such subscription: 'sub_123'");
    }

    #[test]
    fn taxonomy_maps_to_http_statuses() {
        assert_eq!(AppError::not_found("Car").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::not_found("Car").to_string(), "Car not found");
        assert_eq!(
            AppError::Forbidden("Unauthorized car selection".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(AppError::Conflict("x".into()).status_code(), StatusCode::CONFLICT);
        assert_eq!(AppError::TokenExpired.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AppError::ProcessorNotConfigured.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
