// src/db/wash_repo.rs

use chrono::{DateTime, Utc};
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::{clock::DayWindow, error::AppError},
    models::wash::{CleanerScheduleEntry, Schedule, ScheduleStatus, WashRecord},
};

#[derive(Debug, Clone)]
pub struct NewWashRecord {
    pub client_id: Uuid,
    pub car_id: Option<Uuid>,
    pub cleaner_id: Uuid,
    pub washed_at: DateTime<Utc>,
    pub wash_for_date: Option<DateTime<Utc>>,
    pub wash_time: String,
}

// Lavagens (wash_records) e agendamentos (schedules)
#[derive(Clone)]
pub struct WashRepository {
    pool: PgPool,
}

impl WashRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Lavagens feitas ou creditadas dentro da janela.
    pub async fn records_for_clients(&self, client_ids: &[Uuid], window: DayWindow) -> Result<Vec<WashRecord>, AppError> {
        let records = sqlx::query_as::<_, WashRecord>(
            r#"
            SELECT * FROM wash_records
            WHERE client_id = ANY($1)
              AND ((washed_at BETWEEN $2 AND $3) OR (wash_for_date BETWEEN $2 AND $3))
            ORDER BY washed_at ASC
            "#,
        )
        .bind(client_ids)
        .bind(window.start)
        .bind(window.end)
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }

    pub async fn history_for_client(&self, client_id: Uuid) -> Result<Vec<WashRecord>, AppError> {
        let records = sqlx::query_as::<_, WashRecord>(
            "SELECT * FROM wash_records WHERE client_id = $1 ORDER BY washed_at DESC",
        )
        .bind(client_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }

    pub async fn records_by_cleaner(&self, cleaner_id: Uuid, window: DayWindow) -> Result<Vec<WashRecord>, AppError> {
        let records = sqlx::query_as::<_, WashRecord>(
            r#"
            SELECT * FROM wash_records
            WHERE cleaner_id = $1 AND washed_at BETWEEN $2 AND $3
            ORDER BY washed_at DESC
            "#,
        )
        .bind(cleaner_id)
        .bind(window.start)
        .bind(window.end)
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }

    pub async fn insert_record<'e, E>(&self, executor: E, new: &NewWashRecord) -> Result<WashRecord, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let record = sqlx::query_as::<_, WashRecord>(
            r#"
            INSERT INTO wash_records (client_id, car_id, cleaner_id, washed_at, wash_for_date, wash_time)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(new.client_id)
        .bind(new.car_id)
        .bind(new.cleaner_id)
        .bind(new.washed_at)
        .bind(new.wash_for_date)
        .bind(&new.wash_time)
        .fetch_one(executor)
        .await?;
        Ok(record)
    }

    pub async fn schedules_for_client(&self, client_id: Uuid, window: DayWindow) -> Result<Vec<Schedule>, AppError> {
        let schedules = sqlx::query_as::<_, Schedule>(
            r#"
            SELECT * FROM schedules
            WHERE client_id = $1 AND scheduled_date BETWEEN $2 AND $3
            ORDER BY scheduled_date ASC, created_at ASC
            "#,
        )
        .bind(client_id)
        .bind(window.start)
        .bind(window.end)
        .fetch_all(&self.pool)
        .await?;
        Ok(schedules)
    }

    pub async fn next_schedule(
        &self,
        client_id: Uuid,
        car_id: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Result<Option<Schedule>, AppError> {
        let schedule = sqlx::query_as::<_, Schedule>(
            r#"
            SELECT * FROM schedules
            WHERE client_id = $1 AND status = 'scheduled' AND scheduled_date >= $2
              AND ($3::uuid IS NULL OR car_id = $3)
            ORDER BY scheduled_date ASC
            LIMIT 1
            "#,
        )
        .bind(client_id)
        .bind(now)
        .bind(car_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(schedule)
    }

    pub async fn last_completed_schedule(&self, client_id: Uuid, car_id: Option<Uuid>) -> Result<Option<Schedule>, AppError> {
        let schedule = sqlx::query_as::<_, Schedule>(
            r#"
            SELECT * FROM schedules
            WHERE client_id = $1 AND status = 'completed'
              AND ($2::uuid IS NULL OR car_id = $2)
            ORDER BY scheduled_date DESC
            LIMIT 1
            "#,
        )
        .bind(client_id)
        .bind(car_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(schedule)
    }

    pub async fn schedules_for_client_all(&self, client_id: Uuid, car_id: Option<Uuid>) -> Result<Vec<Schedule>, AppError> {
        let schedules = sqlx::query_as::<_, Schedule>(
            r#"
            SELECT * FROM schedules
            WHERE client_id = $1 AND ($2::uuid IS NULL OR car_id = $2)
            ORDER BY scheduled_date DESC
            "#,
        )
        .bind(client_id)
        .bind(car_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(schedules)
    }

    /// Agenda do lavador num dia, com cliente e carro.
    pub async fn cleaner_schedule(&self, cleaner_id: Uuid, window: DayWindow) -> Result<Vec<CleanerScheduleEntry>, AppError> {
        let entries = sqlx::query_as::<_, CleanerScheduleEntry>(
            r#"
            SELECT
                s.*,
                u.name AS client_name,
                u.phone AS client_phone,
                c.make AS car_make,
                c.model AS car_model,
                c.license_plate AS car_license_plate
            FROM schedules s
            JOIN users u ON u.id = s.client_id
            LEFT JOIN cars c ON c.id = s.car_id
            WHERE s.cleaner_id = $1 AND s.scheduled_date BETWEEN $2 AND $3
            ORDER BY s.start_time ASC NULLS LAST
            "#,
        )
        .bind(cleaner_id)
        .bind(window.start)
        .bind(window.end)
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }

    pub async fn update_schedule_status(&self, id: Uuid, status: ScheduleStatus) -> Result<Option<Schedule>, AppError> {
        let schedule = sqlx::query_as::<_, Schedule>(
            "UPDATE schedules SET status = $2 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(status)
        .fetch_optional(&self.pool)
        .await?;
        Ok(schedule)
    }
}
