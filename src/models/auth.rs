// src/models/auth.rs

use chrono::{DateTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Client,
    Cleaner,
    Admin,
    Developer,
}

impl UserRole {
    /// Clientes e lavadores usam o app no dia a dia e recebem tokens sem expiração.
    pub fn token_expires(self) -> bool {
        matches!(self, UserRole::Admin | UserRole::Developer)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "user_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Active,
    Inactive,
}

/// Rodízio semanal de lavagem de um cliente.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "wash_pattern", rename_all = "snake_case")]
pub enum WashPattern {
    #[default]
    #[serde(rename = "Mon,Wed,Fri")]
    MonWedFri,
    #[serde(rename = "Tue,Thu,Sat")]
    TueThuSat,
}

impl WashPattern {
    pub fn weekdays(self) -> [Weekday; 3] {
        match self {
            WashPattern::MonWedFri => [Weekday::Mon, Weekday::Wed, Weekday::Fri],
            WashPattern::TueThuSat => [Weekday::Tue, Weekday::Thu, Weekday::Sat],
        }
    }

    pub fn includes(self, day: Weekday) -> bool {
        self.weekdays().contains(&day)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WashPattern::MonWedFri => "Mon,Wed,Fri",
            WashPattern::TueThuSat => "Tue,Thu,Sat",
        }
    }

    /// `existing_clients` = clientes já cadastrados no prédio. Ciclo de 120: 50 MWF, 70 TTS.
    pub fn for_registration(existing_clients: i64) -> Self {
        if existing_clients.rem_euclid(120) < 50 {
            WashPattern::MonWedFri
        } else {
            WashPattern::TueThuSat
        }
    }
}

// Representa um usuário vindo do banco de dados
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub username: String,
    pub email: String,

    #[serde(skip_serializing)]
    #[schema(ignore)]
    pub password_hash: String,

    pub phone: String,
    pub role: UserRole,
    pub building_assigned: Option<String>,
    pub building_name: Option<String>,
    pub floor_number: Option<String>,
    pub parking_slot: Option<String>,
    pub wash_days: Option<WashPattern>,

    #[serde(skip_serializing)]
    #[schema(ignore)]
    pub push_token: Option<String>,

    pub stripe_customer_id: Option<String>,
    pub secret_question: Option<String>,

    #[serde(skip_serializing)]
    #[schema(ignore)]
    pub secret_answer_hash: Option<String>,

    pub status: UserStatus,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn pattern(&self) -> WashPattern {
        self.wash_days.unwrap_or_default()
    }
}

// Dados para inserir um usuário (senha já com hash)
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub phone: String,
    pub role: UserRole,
    pub building_assigned: Option<String>,
    pub building_name: Option<String>,
    pub floor_number: Option<String>,
    pub parking_slot: Option<String>,
    pub wash_days: Option<WashPattern>,
    pub secret_question: Option<String>,
    pub secret_answer_hash: Option<String>,
}

// Versão resumida devolvida no login/registro
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthUserSummary {
    pub id: Uuid,
    pub name: String,
    pub username: String,
    pub email: String,
    pub role: UserRole,
    pub building_assigned: Option<String>,
    pub building_name: Option<String>,
    pub floor_number: Option<String>,
    pub parking_slot: Option<String>,
}

impl From<&User> for AuthUserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            role: user.role,
            building_assigned: user.building_assigned.clone(),
            building_name: user.building_name.clone(),
            floor_number: user.floor_number.clone(),
            parking_slot: user.parking_slot.clone(),
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterUserPayload {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(length(min = 3, message = "Username must be at least 3 characters"))]
    pub username: String,
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    #[validate(length(min = 10, message = "Phone number must be at least 10 digits"))]
    pub phone: String,
    pub role: Option<UserRole>,
    pub building_name: Option<String>,
    pub floor_number: Option<String>,
    pub parking_slot: Option<String>,
    pub admin_secret_code: Option<String>,
    pub building_assigned: Option<String>,
    pub secret_question: Option<String>,
    pub secret_answer: Option<String>,
}

impl RegisterUserPayload {
    pub fn resolved_role(&self) -> UserRole {
        self.role.unwrap_or(UserRole::Client)
    }

    /// Clientes precisam informar prédio, andar e vaga.
    pub fn validate_client_details(&self) -> Result<(), validator::ValidationError> {
        let filled = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        if self.resolved_role() == UserRole::Client
            && !(filled(&self.building_name) && filled(&self.floor_number) && filled(&self.parking_slot))
        {
            let mut err = validator::ValidationError::new("building_details");
            err.message = Some("Building details are required for clients".into());
            return Err(err);
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginUserPayload {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ForgotPasswordPayload {
    #[validate(length(min = 1, message = "Username, email, phone, and new password are required"))]
    pub username: String,
    #[validate(length(min = 1, message = "Username, email, phone, and new password are required"))]
    pub email: String,
    #[validate(length(min = 1, message = "Username, email, phone, and new password are required"))]
    pub phone: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub new_password: String,
}

// Resposta de autenticação com o token
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub message: String,
    pub token: String,
    pub user: AuthUserSummary,
}

// Estrutura de dados ("claims") dentro do JWT
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub role: UserRole,
    pub iat: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_rotation_cycles_every_120_clients() {
        assert_eq!(WashPattern::for_registration(0), WashPattern::MonWedFri);
        assert_eq!(WashPattern::for_registration(49), WashPattern::MonWedFri);
        assert_eq!(WashPattern::for_registration(50), WashPattern::TueThuSat);
        assert_eq!(WashPattern::for_registration(119), WashPattern::TueThuSat);
        assert_eq!(WashPattern::for_registration(120), WashPattern::MonWedFri);
    }

    #[test]
    fn wash_pattern_uses_legacy_wire_format() {
        let json = serde_json::to_string(&WashPattern::TueThuSat).unwrap();
        assert_eq!(json, "\"Tue,Thu,Sat\"");
        let parsed: WashPattern = serde_json::from_str("\"Mon,Wed,Fri\"").unwrap();
        assert_eq!(parsed, WashPattern::MonWedFri);
    }

    #[test]
    fn client_registration_requires_building_details() {
        let payload = RegisterUserPayload {
            name: "Ana".into(),
            username: "ana".into(),
            email: "ana@example.com".into(),
            password: "secret1".into(),
            phone: "0501234567".into(),
            role: None,
            building_name: Some("Marina Pinnacle".into()),
            floor_number: None,
            parking_slot: Some("B2-14".into()),
            admin_secret_code: None,
            building_assigned: None,
            secret_question: None,
            secret_answer: None,
        };
        assert!(payload.validate_client_details().is_err());
    }
}
