// src/services/auth.rs

use bcrypt::{hash, verify};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{ActivityRepository, UserRepository},
    models::{
        activity::{ActivityContext, ActivityKind},
        auth::{
            AuthResponse, AuthUserSummary, Claims, ForgotPasswordPayload, LoginUserPayload, NewUser,
            RegisterUserPayload, User, UserRole, WashPattern,
        },
    },
};

// 99º cadastro num prédio dispara o alerta para o admin
const HIGH_REGISTRATION_MARK: i64 = 98;

pub(crate) async fn hash_password(plain: String) -> Result<String, AppError> {
    let hashed = tokio::task::spawn_blocking(move || hash(&plain, bcrypt::DEFAULT_COST))
        .await
        .map_err(|e| anyhow::anyhow!("Falha na task de hashing: {}", e))??;
    Ok(hashed)
}

pub(crate) async fn verify_password(plain: String, hashed: String) -> Result<bool, AppError> {
    let valid = tokio::task::spawn_blocking(move || verify(&plain, &hashed))
        .await
        .map_err(|e| anyhow::anyhow!("Falha na task de verificação de senha: {}", e))??;
    Ok(valid)
}

/// Admin e developer recebem tokens de 1 dia; client e cleaner, sem expiração.
pub fn encode_token(secret: &str, user_id: Uuid, role: UserRole, now: DateTime<Utc>) -> Result<String, AppError> {
    let claims = Claims {
        sub: user_id,
        role,
        iat: now.timestamp(),
        exp: role.token_expires().then(|| (now + Duration::days(1)).timestamp()),
    };
    Ok(encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_ref()))?)
}

pub fn decode_token(secret: &str, token: &str, now: DateTime<Utc>) -> Result<Claims, AppError> {
    let mut validation = Validation::default();
    validation.validate_exp = false;
    validation.required_spec_claims.clear();

    let claims = decode::<Claims>(token, &DecodingKey::from_secret(secret.as_ref()), &validation)
        .map_err(|_| AppError::InvalidToken)?
        .claims;

    if claims.role.token_expires() {
        match claims.exp {
            Some(exp) if exp > now.timestamp() => {}
            _ => return Err(AppError::TokenExpired),
        }
    }
    Ok(claims)
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

#[derive(Clone)]
pub struct AuthService {
    user_repo: UserRepository,
    activity_repo: ActivityRepository,
    jwt_secret: String,
    admin_secret_code: Option<String>,
    pool: PgPool,
}

impl AuthService {
    pub fn new(
        user_repo: UserRepository,
        activity_repo: ActivityRepository,
        jwt_secret: String,
        admin_secret_code: Option<String>,
        pool: PgPool,
    ) -> Self {
        Self { user_repo, activity_repo, jwt_secret, admin_secret_code, pool }
    }

    fn check_secret_code(&self, provided: Option<&str>) -> Result<(), AppError> {
        match (self.admin_secret_code.as_deref(), provided) {
            (Some(expected), Some(given)) if expected == given => Ok(()),
            _ => Err(AppError::BadRequest("Invalid admin secret code".into())),
        }
    }

    pub async fn register(&self, payload: RegisterUserPayload) -> Result<AuthResponse, AppError> {
        payload.validate_client_details().map_err(|e| {
            AppError::BadRequest(e.message.map(|m| m.to_string()).unwrap_or_else(|| "Invalid request".into()))
        })?;

        if self
            .user_repo
            .exists_username_or_email(&payload.username, &payload.email)
            .await?
        {
            return Err(AppError::UserAlreadyExists);
        }

        let role = payload.resolved_role();
        match role {
            UserRole::Developer => {
                return Err(AppError::BadRequest("Developer accounts must be created by an admin.".into()));
            }
            UserRole::Cleaner | UserRole::Admin => self.check_secret_code(payload.admin_secret_code.as_deref())?,
            UserRole::Client => {}
        }

        let password_hash = hash_password(payload.password.clone()).await?;
        let secret_answer_hash = match non_blank(&payload.secret_answer) {
            Some(answer) => Some(hash_password(answer.to_lowercase()).await?),
            None => None,
        };

        let building_name = non_blank(&payload.building_name).filter(|_| role == UserRole::Client);

        // --- INÍCIO DA TRANSAÇÃO ---
        let mut tx = self.pool.begin().await?;

        let mut wash_days = None;
        if let Some(building) = &building_name {
            let existing = self.user_repo.count_clients_in_building(&mut *tx, building).await?;
            wash_days = Some(WashPattern::for_registration(existing));

            if existing == HIGH_REGISTRATION_MARK {
                let message = format!(
                    "Number of registration in {} is done please register a new cleaner as soon as possible.",
                    building
                );
                self.activity_repo
                    .notify(&mut *tx, UserRole::Admin, "High Registration Alert", &message)
                    .await?;
                tracing::info!("🏢 Alerta de cadastros no prédio {}", building);
            }
        }

        let new_user = NewUser {
            name: payload.name.trim().to_string(),
            username: payload.username.trim().to_string(),
            email: payload.email.trim().to_string(),
            password_hash,
            phone: payload.phone.trim().to_string(),
            role,
            building_assigned: non_blank(&payload.building_assigned).filter(|_| role == UserRole::Cleaner),
            building_name,
            floor_number: non_blank(&payload.floor_number).filter(|_| role == UserRole::Client),
            parking_slot: non_blank(&payload.parking_slot).filter(|_| role == UserRole::Client),
            wash_days,
            secret_question: non_blank(&payload.secret_question),
            secret_answer_hash,
        };
        let user = self.user_repo.create_user(&mut *tx, &new_user).await?;

        tx.commit().await?;
        // --- FIM DA TRANSAÇÃO ---

        if user.role == UserRole::Client {
            self.activity_repo
                .log(
                    ActivityKind::CustomerAdded,
                    &format!("New Customer Registered: {}", user.name),
                    ActivityContext {
                        user_id: Some(user.id),
                        building_name: user.building_name.clone(),
                        ..Default::default()
                    },
                )
                .await;
        }

        let token = encode_token(&self.jwt_secret, user.id, user.role, Utc::now())?;
        Ok(AuthResponse {
            message: "User registered successfully".into(),
            token,
            user: AuthUserSummary::from(&user),
        })
    }

    pub async fn login(&self, payload: LoginUserPayload) -> Result<AuthResponse, AppError> {
        let user = self
            .user_repo
            .find_by_username(payload.username.trim())
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        if !verify_password(payload.password, user.password_hash.clone()).await? {
            return Err(AppError::InvalidCredentials);
        }

        let token = encode_token(&self.jwt_secret, user.id, user.role, Utc::now())?;
        Ok(AuthResponse {
            message: "Login successful".into(),
            token,
            user: AuthUserSummary::from(&user),
        })
    }

    pub async fn forgot_password(&self, payload: ForgotPasswordPayload) -> Result<(), AppError> {
        let user = self
            .user_repo
            .find_for_password_reset(payload.username.trim(), payload.email.trim(), payload.phone.trim())
            .await?
            .ok_or_else(|| AppError::BadRequest("User not found or details do not match".into()))?;

        let password_hash = hash_password(payload.new_password).await?;
        self.user_repo.update_password(user.id, &password_hash).await?;
        tracing::info!("🔑 Senha redefinida para o usuário {}", user.id);
        Ok(())
    }

    pub async fn validate_token(&self, token: &str) -> Result<User, AppError> {
        let claims = decode_token(&self.jwt_secret, token, Utc::now())?;

        self.user_repo
            .find_by_id(claims.sub)
            .await?
            .ok_or(AppError::InvalidToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    #[test]
    fn client_tokens_never_expire() {
        let issued = Utc::now() - Duration::days(400);
        let token = encode_token(SECRET, Uuid::new_v4(), UserRole::Client, issued).unwrap();
        let claims = decode_token(SECRET, &token, Utc::now()).unwrap();
        assert_eq!(claims.role, UserRole::Client);
        assert!(claims.exp.is_none());
    }

    #[test]
    fn admin_tokens_expire_after_a_day() {
        let issued = Utc::now();
        let id = Uuid::new_v4();
        let token = encode_token(SECRET, id, UserRole::Admin, issued).unwrap();

        let claims = decode_token(SECRET, &token, issued + Duration::hours(23)).unwrap();
        assert_eq!(claims.sub, id);

        let err = decode_token(SECRET, &token, issued + Duration::days(1)).unwrap_err();
        assert!(matches!(err, AppError::TokenExpired));
    }

    #[test]
    fn expiring_role_without_exp_is_rejected() {
        let claims = Claims { sub: Uuid::new_v4(), role: UserRole::Developer, iat: 0, exp: None };
        let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET.as_ref())).unwrap();
        let err = decode_token(SECRET, &token, Utc::now()).unwrap_err();
        assert!(matches!(err, AppError::TokenExpired));
    }

    #[test]
    fn wrong_secret_is_an_invalid_token() {
        let token = encode_token(SECRET, Uuid::new_v4(), UserRole::Cleaner, Utc::now()).unwrap();
        let err = decode_token("other", &token, Utc::now()).unwrap_err();
        assert!(matches!(err, AppError::InvalidToken));
        assert!(matches!(decode_token(SECRET, "garbage", Utc::now()), Err(AppError::InvalidToken)));
    }
}
