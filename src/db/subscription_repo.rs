// src/db/subscription_repo.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::subscription::{
        LocalStatusUpdate, NewSubscriptionRecord, StatusAction, StatusHistoryEntry, Subscription,
        SubscriptionDetail, SubscriptionStatus,
    },
};

#[derive(Clone)]
pub struct SubscriptionRepository {
    pool: PgPool,
}

impl SubscriptionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Subscription>, AppError> {
        let sub = sqlx::query_as::<_, Subscription>("SELECT * FROM subscriptions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(sub)
    }

    pub async fn find_by_stripe_id(&self, stripe_id: &str) -> Result<Option<Subscription>, AppError> {
        let sub = sqlx::query_as::<_, Subscription>(
            "SELECT * FROM subscriptions WHERE stripe_subscription_id = $1",
        )
        .bind(stripe_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(sub)
    }

    /// Assinatura mais recente do usuário para o carro. `live_only` restringe a active/on_hold.
    pub async fn latest_for_car(&self, user_id: Uuid, car_id: Uuid, live_only: bool) -> Result<Option<Subscription>, AppError> {
        let sub = sqlx::query_as::<_, Subscription>(
            r#"
            SELECT * FROM subscriptions
            WHERE user_id = $1 AND car_id = $2
              AND (NOT $3 OR status IN ('active', 'on_hold'))
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .bind(car_id)
        .bind(live_only)
        .fetch_optional(&self.pool)
        .await?;
        Ok(sub)
    }

    // Assinaturas antigas sem carro associado
    pub async fn latest_live_unassigned(&self, user_id: Uuid) -> Result<Option<Subscription>, AppError> {
        let sub = sqlx::query_as::<_, Subscription>(
            r#"
            SELECT * FROM subscriptions
            WHERE user_id = $1 AND car_id IS NULL AND status IN ('active', 'on_hold')
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(sub)
    }

    pub async fn latest_live_for_user(&self, user_id: Uuid) -> Result<Option<Subscription>, AppError> {
        let sub = sqlx::query_as::<_, Subscription>(
            r#"
            SELECT * FROM subscriptions
            WHERE user_id = $1 AND status IN ('active', 'on_hold')
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(sub)
    }

    pub async fn latest_for_user(&self, user_id: Uuid) -> Result<Option<Subscription>, AppError> {
        let sub = sqlx::query_as::<_, Subscription>(
            "SELECT * FROM subscriptions WHERE user_id = $1 ORDER BY created_at DESC LIMIT 1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(sub)
    }

    /// Assinatura ativa mais recente de cada usuário.
    pub async fn latest_active_by_users(&self, user_ids: &[Uuid]) -> Result<Vec<Subscription>, AppError> {
        let subs = sqlx::query_as::<_, Subscription>(
            r#"
            SELECT DISTINCT ON (user_id) * FROM subscriptions
            WHERE user_id = ANY($1) AND status = 'active'
            ORDER BY user_id, created_at DESC
            "#,
        )
        .bind(user_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(subs)
    }

    /// Todas as assinaturas dos usuários, da mais nova para a mais antiga.
    pub async fn list_by_users(&self, user_ids: &[Uuid]) -> Result<Vec<Subscription>, AppError> {
        let subs = sqlx::query_as::<_, Subscription>(
            "SELECT * FROM subscriptions WHERE user_id = ANY($1) ORDER BY created_at DESC",
        )
        .bind(user_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(subs)
    }

    pub async fn list_by_status(&self, status: SubscriptionStatus) -> Result<Vec<Subscription>, AppError> {
        let subs = sqlx::query_as::<_, Subscription>(
            "SELECT * FROM subscriptions WHERE status = $1 ORDER BY created_at DESC",
        )
        .bind(status)
        .fetch_all(&self.pool)
        .await?;
        Ok(subs)
    }

    pub async fn count_by_status(&self, status: SubscriptionStatus, user_ids: Option<&[Uuid]>) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM subscriptions WHERE status = $1 AND ($2::uuid[] IS NULL OR user_id = ANY($2))",
        )
        .bind(status)
        .bind(user_ids)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    /// Soma dos preços das assinaturas criadas na janela.
    pub async fn revenue_created_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        user_ids: Option<&[Uuid]>,
    ) -> Result<Decimal, AppError> {
        let total = sqlx::query_scalar::<_, Decimal>(
            r#"
            SELECT COALESCE(SUM(plan_price), 0) FROM subscriptions
            WHERE created_at >= $1 AND created_at <= $2
              AND ($3::uuid[] IS NULL OR user_id = ANY($3))
            "#,
        )
        .bind(start)
        .bind(end)
        .bind(user_ids)
        .fetch_one(&self.pool)
        .await?;
        Ok(total)
    }

    /// Soma dos preços das assinaturas que cobrem algum dia da janela.
    pub async fn revenue_overlapping(
        &self,
        user_ids: &[Uuid],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Decimal, AppError> {
        let total = sqlx::query_scalar::<_, Decimal>(
            r#"
            SELECT COALESCE(SUM(plan_price), 0) FROM subscriptions
            WHERE user_id = ANY($1)
              AND start_date <= $3
              AND (end_date IS NULL OR end_date >= $2)
            "#,
        )
        .bind(user_ids)
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await?;
        Ok(total)
    }

    pub async fn insert<'e, E>(&self, executor: E, new: &NewSubscriptionRecord) -> Result<Subscription, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sub = sqlx::query_as::<_, Subscription>(
            r#"
            INSERT INTO subscriptions (
                user_id, car_id, plan_id, status, start_date, end_date, stripe_subscription_id,
                plan_type, plan_car_type, plan_price, plan_features, plan_wash_frequency
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING *
            "#,
        )
        .bind(new.user_id)
        .bind(new.car_id)
        .bind(new.plan_id)
        .bind(new.status)
        .bind(new.start_date)
        .bind(new.end_date)
        .bind(&new.stripe_subscription_id)
        .bind(&new.plan_type)
        .bind(new.plan_car_type)
        .bind(new.plan_price)
        .bind(&new.plan_features)
        .bind(&new.plan_wash_frequency)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            if let Some(db_err) = e.as_database_error() {
                if db_err.is_unique_violation() {
                    return AppError::Conflict("Subscription already confirmed".into());
                }
            }
            e.into()
        })?;
        Ok(sub)
    }

    /// Aplica status e período vindos do processador. Datas ausentes mantêm o valor atual.
    pub async fn apply_update<'e, E>(&self, executor: E, id: Uuid, update: &LocalStatusUpdate) -> Result<Subscription, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sub = sqlx::query_as::<_, Subscription>(
            r#"
            UPDATE subscriptions SET
                status = $2,
                start_date = COALESCE($3, start_date),
                end_date = COALESCE($4, end_date)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(update.status)
        .bind(update.start_date)
        .bind(update.end_date)
        .fetch_one(executor)
        .await?;
        Ok(sub)
    }

    pub async fn append_history<'e, E>(
        &self,
        executor: E,
        subscription_id: Uuid,
        status: SubscriptionStatus,
        action: StatusAction,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            "INSERT INTO subscription_status_history (subscription_id, status, action) VALUES ($1, $2, $3)",
        )
        .bind(subscription_id)
        .bind(status)
        .bind(action)
        .execute(executor)
        .await?;
        Ok(())
    }

    /// Cancela as assinaturas vivas do carro (exceto a nova) e devolve as afetadas.
    pub async fn cancel_live_for_car<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
        car_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<Subscription>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let subs = sqlx::query_as::<_, Subscription>(
            r#"
            UPDATE subscriptions SET status = 'cancelled', end_date = $3
            WHERE user_id = $1 AND car_id = $2 AND status IN ('active', 'on_hold')
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(car_id)
        .bind(now)
        .fetch_all(executor)
        .await?;
        Ok(subs)
    }

    pub async fn delete<'e, E>(&self, executor: E, id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("DELETE FROM subscriptions WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn history_for(&self, subscription_ids: &[Uuid]) -> Result<Vec<StatusHistoryEntry>, AppError> {
        let entries = sqlx::query_as::<_, StatusHistoryEntry>(
            r#"
            SELECT subscription_id, status, action, created_at
            FROM subscription_status_history
            WHERE subscription_id = ANY($1)
            ORDER BY id ASC
            "#,
        )
        .bind(subscription_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }

    /// Junta o histórico a cada assinatura.
    pub async fn with_history(&self, subs: Vec<Subscription>) -> Result<Vec<SubscriptionDetail>, AppError> {
        let ids: Vec<Uuid> = subs.iter().map(|s| s.id).collect();
        let mut history = self.history_for(&ids).await?;

        Ok(subs
            .into_iter()
            .map(|subscription| {
                let (mine, rest): (Vec<_>, Vec<_>) =
                    history.drain(..).partition(|h| h.subscription_id == subscription.id);
                history = rest;
                SubscriptionDetail { subscription, status_history: mine }
            })
            .collect())
    }

    pub async fn detail(&self, subscription: Subscription) -> Result<SubscriptionDetail, AppError> {
        let status_history = self.history_for(&[subscription.id]).await?;
        Ok(SubscriptionDetail { subscription, status_history })
    }
}
