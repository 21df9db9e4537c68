// src/db/plan_repo.rs

use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{car::CarType, catalog::SubscriptionPlan},
};

#[derive(Clone)]
pub struct PlanRepository {
    pool: PgPool,
}

impl PlanRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_all(&self) -> Result<Vec<SubscriptionPlan>, AppError> {
        let plans = sqlx::query_as::<_, SubscriptionPlan>(
            "SELECT * FROM subscription_plans ORDER BY car_type, plan_type",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(plans)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<SubscriptionPlan>, AppError> {
        let plan = sqlx::query_as::<_, SubscriptionPlan>("SELECT * FROM subscription_plans WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(plan)
    }

    pub async fn count<'e, E>(&self, executor: E) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM subscription_plans")
            .fetch_one(executor)
            .await?;
        Ok(count)
    }

    /// Cria ou atualiza o plano identificado por (categoria, tipo).
    pub async fn upsert<'e, E>(
        &self,
        executor: E,
        car_type: CarType,
        plan_type: &str,
        price: Decimal,
        features: &[String],
        wash_frequency: &str,
    ) -> Result<SubscriptionPlan, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let plan = sqlx::query_as::<_, SubscriptionPlan>(
            r#"
            INSERT INTO subscription_plans (car_type, plan_type, price, features, wash_frequency)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (car_type, plan_type) DO UPDATE SET
                price = EXCLUDED.price,
                features = EXCLUDED.features,
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(car_type)
        .bind(plan_type)
        .bind(price)
        .bind(features)
        .bind(wash_frequency)
        .fetch_one(executor)
        .await?;
        Ok(plan)
    }

    pub async fn update(&self, id: Uuid, price: Decimal, features: &[String]) -> Result<Option<SubscriptionPlan>, AppError> {
        let plan = sqlx::query_as::<_, SubscriptionPlan>(
            r#"
            UPDATE subscription_plans SET price = $2, features = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(price)
        .bind(features)
        .fetch_optional(&self.pool)
        .await?;
        Ok(plan)
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM subscription_plans WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn set_product(&self, id: Uuid, product_id: &str) -> Result<(), AppError> {
        sqlx::query("UPDATE subscription_plans SET stripe_product_id = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(product_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn set_price(&self, id: Uuid, price_id: &str, currency: &str, unit_amount: i64) -> Result<SubscriptionPlan, AppError> {
        let plan = sqlx::query_as::<_, SubscriptionPlan>(
            r#"
            UPDATE subscription_plans SET
                stripe_price_id = $2,
                stripe_currency = $3,
                stripe_unit_amount = $4,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(price_id)
        .bind(currency)
        .bind(unit_amount)
        .fetch_one(&self.pool)
        .await?;
        Ok(plan)
    }
}
