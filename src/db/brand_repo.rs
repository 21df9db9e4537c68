// src/db/brand_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        car::CarType,
        catalog::{CarBrandRow, CarModelRow},
    },
};

#[derive(Clone)]
pub struct BrandRepository {
    pool: PgPool,
}

impl BrandRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_brands(&self) -> Result<Vec<CarBrandRow>, AppError> {
        let brands = sqlx::query_as::<_, CarBrandRow>(
            "SELECT id, name, logo_file FROM car_brands ORDER BY name ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(brands)
    }

    pub async fn list_models(&self) -> Result<Vec<CarModelRow>, AppError> {
        let models = sqlx::query_as::<_, CarModelRow>(
            "SELECT brand_id, name, car_type FROM car_models ORDER BY brand_id, position ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(models)
    }

    pub async fn upsert_brand<'e, E>(&self, executor: E, name: &str, logo_file: Option<&str>) -> Result<Uuid, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO car_brands (name, logo_file) VALUES ($1, $2)
            ON CONFLICT (name) DO UPDATE SET logo_file = COALESCE(EXCLUDED.logo_file, car_brands.logo_file)
            RETURNING id
            "#,
        )
        .bind(name)
        .bind(logo_file)
        .fetch_one(executor)
        .await?;
        Ok(id)
    }

    pub async fn upsert_model<'e, E>(
        &self,
        executor: E,
        brand_id: Uuid,
        name: &str,
        car_type: Option<CarType>,
        position: i32,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            INSERT INTO car_models (brand_id, name, car_type, position) VALUES ($1, $2, $3, $4)
            ON CONFLICT (brand_id, name) DO UPDATE SET car_type = EXCLUDED.car_type, position = EXCLUDED.position
            "#,
        )
        .bind(brand_id)
        .bind(name)
        .bind(car_type)
        .bind(position)
        .execute(executor)
        .await?;
        Ok(())
    }
}
