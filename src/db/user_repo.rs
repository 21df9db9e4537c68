// src/db/user_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        auth::{NewUser, User, UserRole},
        dashboard::UpdateStaffPayload,
    },
};

// O repositório de usuários, responsável por todas as interações com a tabela 'users'
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn find_by_username_ci(&self, username: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE LOWER(username) = LOWER($1)")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    // Compara apenas os dígitos do telefone
    pub async fn find_by_phone_digits(&self, digits: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE regexp_replace(phone, '\\D', '', 'g') = $1 LIMIT 1",
        )
        .bind(digits)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    pub async fn exists_username_or_email(&self, username: &str, email: &str) -> Result<bool, AppError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM users WHERE email = $1 OR username = $2)",
        )
        .bind(email)
        .bind(username)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    pub async fn find_for_password_reset(
        &self,
        username: &str,
        email: &str,
        phone: &str,
    ) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE username = $1 AND email = $2 AND phone = $3",
        )
        .bind(username)
        .bind(email)
        .bind(phone)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    /// Clientes já cadastrados no prédio; usado para escolher o rodízio.
    pub async fn count_clients_in_building<'e, E>(&self, executor: E, building_name: &str) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM users WHERE role = 'client' AND building_name = $1",
        )
        .bind(building_name)
        .fetch_one(executor)
        .await?;
        Ok(count)
    }

    pub async fn create_user<'e, E>(&self, executor: E, new: &NewUser) -> Result<User, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (
                name, username, email, password_hash, phone, role,
                building_assigned, building_name, floor_number, parking_slot,
                wash_days, secret_question, secret_answer_hash
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING *
            "#,
        )
        .bind(&new.name)
        .bind(&new.username)
        .bind(&new.email)
        .bind(&new.password_hash)
        .bind(&new.phone)
        .bind(new.role)
        .bind(&new.building_assigned)
        .bind(&new.building_name)
        .bind(&new.floor_number)
        .bind(&new.parking_slot)
        .bind(new.wash_days)
        .bind(&new.secret_question)
        .bind(&new.secret_answer_hash)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            // Violação de chave única (email ou username) vira um erro amigável
            if let Some(db_err) = e.as_database_error() {
                if db_err.is_unique_violation() {
                    return AppError::UserAlreadyExists;
                }
            }
            e.into()
        })
    }

    pub async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET password_hash = $1 WHERE id = $2")
            .bind(password_hash)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn set_push_token(&self, id: Uuid, token: &str) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET push_token = $1 WHERE id = $2")
            .bind(token)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn set_stripe_customer_id(&self, id: Uuid, customer_id: &str) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET stripe_customer_id = $1 WHERE id = $2")
            .bind(customer_id)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Usuários de um papel; `building` filtra clientes por `building_name` e lavadores por `building_assigned`.
    pub async fn list_by_role(&self, role: UserRole, building: Option<&str>) -> Result<Vec<User>, AppError> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT * FROM users
            WHERE role = $1
              AND ($2::text IS NULL
                   OR (role = 'client' AND building_name = $2)
                   OR (role <> 'client' AND building_assigned = $2))
            ORDER BY created_at DESC
            "#,
        )
        .bind(role)
        .bind(building)
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    pub async fn list_clients_in_buildings(&self, buildings: &[String]) -> Result<Vec<User>, AppError> {
        let users = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE role = 'client' AND building_name = ANY($1) ORDER BY name",
        )
        .bind(buildings)
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    pub async fn count_by_role(&self, role: UserRole, building: Option<&str>) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM users
            WHERE role = $1
              AND ($2::text IS NULL
                   OR (role = 'client' AND building_name = $2)
                   OR (role <> 'client' AND building_assigned = $2))
            "#,
        )
        .bind(role)
        .bind(building)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    pub async fn update_staff<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        role: UserRole,
        changes: &UpdateStaffPayload,
        password_hash: Option<&str>,
    ) -> Result<Option<User>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET
                name = COALESCE($3, name),
                username = COALESCE($4, username),
                email = COALESCE($5, email),
                phone = COALESCE($6, phone),
                building_assigned = COALESCE($7, building_assigned),
                password_hash = COALESCE($8, password_hash)
            WHERE id = $1 AND role = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(role)
        .bind(&changes.name)
        .bind(&changes.username)
        .bind(&changes.email)
        .bind(&changes.phone)
        .bind(&changes.building_assigned)
        .bind(password_hash)
        .fetch_optional(executor)
        .await
        .map_err(|e| {
            if let Some(db_err) = e.as_database_error() {
                if db_err.is_unique_violation() {
                    return AppError::UserAlreadyExists;
                }
            }
            e.into()
        })?;
        Ok(user)
    }

    pub async fn delete_with_role<'e, E>(&self, executor: E, id: Uuid, role: UserRole) -> Result<Option<User>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let user = sqlx::query_as::<_, User>("DELETE FROM users WHERE id = $1 AND role = $2 RETURNING *")
            .bind(id)
            .bind(role)
            .fetch_optional(executor)
            .await?;
        Ok(user)
    }
}
