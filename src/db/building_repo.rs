// src/db/building_repo.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::building::{Building, BuildingListing},
};

const LISTING_SELECT: &str = r#"
    SELECT b.*, d.name AS developer_name, d.email AS developer_email
    FROM buildings b
    LEFT JOIN users d ON d.id = b.developer_id
"#;

#[derive(Clone)]
pub struct BuildingRepository {
    pool: PgPool,
}

impl BuildingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_with_developer(&self) -> Result<Vec<BuildingListing>, AppError> {
        let sql = format!("{} ORDER BY b.name ASC", LISTING_SELECT);
        let buildings = sqlx::query_as::<_, BuildingListing>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(buildings)
    }

    pub async fn listing_by_id(&self, id: Uuid) -> Result<Option<BuildingListing>, AppError> {
        let sql = format!("{} WHERE b.id = $1", LISTING_SELECT);
        let building = sqlx::query_as::<_, BuildingListing>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(building)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Building>, AppError> {
        let building = sqlx::query_as::<_, Building>("SELECT * FROM buildings WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(building)
    }

    pub async fn exists_by_name(&self, name: &str) -> Result<bool, AppError> {
        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM buildings WHERE name = $1)")
            .bind(name)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    pub async fn list_by_developer(&self, developer_id: Uuid) -> Result<Vec<Building>, AppError> {
        let buildings = sqlx::query_as::<_, Building>(
            "SELECT * FROM buildings WHERE developer_id = $1 ORDER BY name ASC",
        )
        .bind(developer_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(buildings)
    }

    pub async fn find_for_developer(&self, id: Uuid, developer_id: Uuid) -> Result<Option<Building>, AppError> {
        let building = sqlx::query_as::<_, Building>(
            "SELECT * FROM buildings WHERE id = $1 AND developer_id = $2",
        )
        .bind(id)
        .bind(developer_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(building)
    }

    pub async fn create(&self, name: &str, developer_id: Uuid) -> Result<Building, AppError> {
        sqlx::query_as::<_, Building>(
            "INSERT INTO buildings (name, developer_id) VALUES ($1, $2) RETURNING *",
        )
        .bind(name)
        .bind(developer_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let Some(db_err) = e.as_database_error() {
                if db_err.is_unique_violation() {
                    return AppError::BadRequest("Building already exists".into());
                }
            }
            e.into()
        })
    }

    pub async fn rename(&self, id: Uuid, name: Option<&str>) -> Result<bool, AppError> {
        let result = sqlx::query("UPDATE buildings SET name = COALESCE($2, name) WHERE id = $1")
            .bind(id)
            .bind(name)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        sqlx::query("DELETE FROM buildings WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Garante que cada nome exista, sem alterar os existentes.
    pub async fn ensure_names(&self, names: &[&str]) -> Result<(), AppError> {
        for name in names {
            sqlx::query("INSERT INTO buildings (name) VALUES ($1) ON CONFLICT (name) DO NOTHING")
                .bind(name)
                .execute(&self.pool)
                .await?;
        }
        Ok(())
    }
}
