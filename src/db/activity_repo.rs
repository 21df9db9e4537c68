// src/db/activity_repo.rs
//
// Atividades, notificações do admin, avaliações e mensagens de contato.

use sqlx::{Executor, PgPool, Postgres};
use tracing::warn;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        activity::{ActivityContext, ActivityKind, ActivityLog, ContactView, Notification, ReviewView},
        auth::UserRole,
    },
};

#[derive(Clone)]
pub struct ActivityRepository {
    pool: PgPool,
}

impl ActivityRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert_activity<'e, E>(
        &self,
        executor: E,
        kind: ActivityKind,
        message: &str,
        ctx: &ActivityContext,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            INSERT INTO activity_logs (kind, message, user_id, license_plate, building_name, status)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(kind)
        .bind(message)
        .bind(ctx.user_id)
        .bind(&ctx.license_plate)
        .bind(&ctx.building_name)
        .bind(&ctx.status)
        .execute(executor)
        .await?;
        Ok(())
    }

    /// Registro de atividade que nunca derruba a operação principal.
    pub async fn log(&self, kind: ActivityKind, message: &str, ctx: ActivityContext) {
        match self.insert_activity(&self.pool, kind, message, &ctx).await {
            Ok(()) => tracing::info!("Atividade registrada: {:?} - {}", kind, message),
            Err(e) => warn!("Falha ao registrar atividade {:?}: {}", kind, e),
        }
    }

    pub async fn recent(&self, limit: i64) -> Result<Vec<ActivityLog>, AppError> {
        let logs = sqlx::query_as::<_, ActivityLog>(
            "SELECT * FROM activity_logs ORDER BY created_at DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(logs)
    }

    pub async fn notify<'e, E>(&self, executor: E, role: UserRole, title: &str, message: &str) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("INSERT INTO notifications (recipient_role, title, message) VALUES ($1, $2, $3)")
            .bind(role)
            .bind(title)
            .bind(message)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn unread_for(&self, role: UserRole) -> Result<Vec<Notification>, AppError> {
        let notifications = sqlx::query_as::<_, Notification>(
            "SELECT * FROM notifications WHERE recipient_role = $1 AND NOT read ORDER BY created_at DESC",
        )
        .bind(role)
        .fetch_all(&self.pool)
        .await?;
        Ok(notifications)
    }

    pub async fn mark_read(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("UPDATE notifications SET read = TRUE WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn create_review(
        &self,
        client_id: Uuid,
        schedule_id: Option<Uuid>,
        rating: i16,
        comment: &str,
    ) -> Result<Uuid, AppError> {
        let id = sqlx::query_scalar::<_, Uuid>(
            "INSERT INTO reviews (client_id, schedule_id, rating, comment) VALUES ($1, $2, $3, $4) RETURNING id",
        )
        .bind(client_id)
        .bind(schedule_id)
        .bind(rating)
        .bind(comment)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    pub async fn list_reviews(&self) -> Result<Vec<ReviewView>, AppError> {
        let reviews = sqlx::query_as::<_, ReviewView>(
            r#"
            SELECT r.*, u.name AS client_name, u.email AS client_email, u.phone AS client_phone
            FROM reviews r
            LEFT JOIN users u ON u.id = r.client_id
            ORDER BY r.created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(reviews)
    }

    pub async fn create_contact<'e, E>(
        &self,
        executor: E,
        user_id: Option<Uuid>,
        subject: &str,
        message: &str,
    ) -> Result<Uuid, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let id = sqlx::query_scalar::<_, Uuid>(
            "INSERT INTO contact_messages (user_id, subject, message) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(user_id)
        .bind(subject)
        .bind(message)
        .fetch_one(executor)
        .await?;
        Ok(id)
    }

    pub async fn list_contacts(&self) -> Result<Vec<ContactView>, AppError> {
        let contacts = sqlx::query_as::<_, ContactView>(
            r#"
            SELECT m.*, u.name AS user_name, u.email AS user_email, u.phone AS user_phone
            FROM contact_messages m
            LEFT JOIN users u ON u.id = m.user_id
            ORDER BY m.created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(contacts)
    }
}
