// src/db/car_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        building::BuildingCarRow,
        car::{Car, CarType},
    },
};

// Dados já normalizados para inserir um carro
#[derive(Debug, Clone)]
pub struct NewCar {
    pub client_id: Uuid,
    pub make: String,
    pub model: String,
    pub year: i32,
    pub car_type: CarType,
    pub license_plate: String,
    pub color: String,
    pub photo: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct CarChanges {
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    pub car_type: Option<CarType>,
    pub license_plate: Option<String>,
    pub color: Option<String>,
}

#[derive(Clone)]
pub struct CarRepository {
    pool: PgPool,
}

impl CarRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Car>, AppError> {
        let car = sqlx::query_as::<_, Car>("SELECT * FROM cars WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(car)
    }

    /// Carros do cliente, do mais antigo para o mais novo.
    pub async fn list_by_client(&self, client_id: Uuid) -> Result<Vec<Car>, AppError> {
        let cars = sqlx::query_as::<_, Car>("SELECT * FROM cars WHERE client_id = $1 ORDER BY created_at ASC")
            .bind(client_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(cars)
    }

    pub async fn list_by_clients(&self, client_ids: &[Uuid]) -> Result<Vec<Car>, AppError> {
        let cars = sqlx::query_as::<_, Car>(
            "SELECT * FROM cars WHERE client_id = ANY($1) ORDER BY created_at ASC",
        )
        .bind(client_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(cars)
    }

    pub async fn list_rows_by_clients(&self, client_ids: &[Uuid]) -> Result<Vec<BuildingCarRow>, AppError> {
        let rows = sqlx::query_as::<_, BuildingCarRow>(
            r#"
            SELECT id, client_id, make, model, color, license_plate, car_type
            FROM cars WHERE client_id = ANY($1)
            ORDER BY created_at ASC
            "#,
        )
        .bind(client_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn create_car<'e, E>(&self, executor: E, new: &NewCar) -> Result<Car, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let car = sqlx::query_as::<_, Car>(
            r#"
            INSERT INTO cars (client_id, make, model, year, car_type, license_plate, color, photo)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(new.client_id)
        .bind(&new.make)
        .bind(&new.model)
        .bind(new.year)
        .bind(new.car_type)
        .bind(&new.license_plate)
        .bind(&new.color)
        .bind(&new.photo)
        .fetch_one(executor)
        .await?;
        Ok(car)
    }

    pub async fn update_car(&self, id: Uuid, client_id: Uuid, changes: &CarChanges) -> Result<Option<Car>, AppError> {
        let car = sqlx::query_as::<_, Car>(
            r#"
            UPDATE cars SET
                make = COALESCE($3, make),
                model = COALESCE($4, model),
                year = COALESCE($5, year),
                car_type = COALESCE($6, car_type),
                license_plate = COALESCE($7, license_plate),
                color = COALESCE($8, color)
            WHERE id = $1 AND client_id = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(client_id)
        .bind(&changes.make)
        .bind(&changes.model)
        .bind(changes.year)
        .bind(changes.car_type)
        .bind(&changes.license_plate)
        .bind(&changes.color)
        .fetch_optional(&self.pool)
        .await?;
        Ok(car)
    }

    pub async fn delete_car<'e, E>(&self, executor: E, id: Uuid, client_id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM cars WHERE id = $1 AND client_id = $2")
            .bind(id)
            .bind(client_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Carros por categoria entre os clientes de um prédio (ou de todos).
    pub async fn count_by_type(&self, building_name: Option<&str>) -> Result<Vec<(CarType, i64)>, AppError> {
        let rows = sqlx::query_as::<_, (CarType, i64)>(
            r#"
            SELECT c.car_type, COUNT(*)
            FROM cars c
            JOIN users u ON u.id = c.client_id
            WHERE u.role = 'client' AND ($1::text IS NULL OR u.building_name = $1)
            GROUP BY c.car_type
            "#,
        )
        .bind(building_name)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
