// src/services/wash_service.rs
//
// Lado "banco" da agenda: carrega clientes, carros, assinaturas e lavagens e
// entrega tudo já no fuso local para as regras de `wash_schedule`.

use std::collections::{HashMap, HashSet};

use chrono::{Duration, NaiveDate};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::{clock::LocalClock, error::AppError},
    db::{wash_repo::NewWashRecord, ActivityRepository, CarRepository, SubscriptionRepository, UserRepository, WashRepository},
    models::{
        activity::{ActivityContext, ActivityKind},
        auth::{User, UserRole},
        car::{Car, CarSummary},
        subscription::{Subscription, SubscriptionStatus},
        wash::{
            BuildingClient, CleanerScheduleEntry, MonthlySchedule, MonthlyScheduleQuery, RecordWashPayload,
            Schedule, ScheduleStatus, WashHistoryEntry, WashRecord,
        },
    },
    services::{
        media::PublicUrls,
        wash_schedule::{self, CalendarInput, CarMatcher, CompletionEvent, MonthRef},
    },
};

// Janela de lavagens considerada no painel do lavador
const LOOKBACK_DAYS: i64 = 7;

#[derive(Clone)]
pub struct WashService {
    user_repo: UserRepository,
    car_repo: CarRepository,
    subscription_repo: SubscriptionRepository,
    wash_repo: WashRepository,
    activity_repo: ActivityRepository,
    clock: LocalClock,
    urls: PublicUrls,
    pool: PgPool,
}

fn cars_by_client(cars: Vec<Car>) -> HashMap<Uuid, Vec<Car>> {
    let mut map: HashMap<Uuid, Vec<Car>> = HashMap::new();
    for car in cars {
        map.entry(car.client_id).or_default().push(car);
    }
    map
}

impl WashService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        user_repo: UserRepository,
        car_repo: CarRepository,
        subscription_repo: SubscriptionRepository,
        wash_repo: WashRepository,
        activity_repo: ActivityRepository,
        clock: LocalClock,
        urls: PublicUrls,
        pool: PgPool,
    ) -> Self {
        Self { user_repo, car_repo, subscription_repo, wash_repo, activity_repo, clock, urls, pool }
    }

    /// Clientes do prédio com assinatura ativa que precisam de atenção hoje.
    pub async fn building_clients(&self, building_name: &str) -> Result<Vec<BuildingClient>, AppError> {
        let clients = self
            .user_repo
            .list_clients_in_buildings(&[building_name.to_string()])
            .await?;
        if clients.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = clients.iter().map(|c| c.id).collect();

        let mut cars = cars_by_client(self.car_repo.list_by_clients(&ids).await?);
        let subscriptions: HashMap<Uuid, Subscription> = self
            .subscription_repo
            .latest_active_by_users(&ids)
            .await?
            .into_iter()
            .map(|s| (s.user_id, s))
            .collect();

        let today = self.clock.today();
        let window = self
            .clock
            .range_window(today - Duration::days(LOOKBACK_DAYS), today);
        let records = self.wash_repo.records_for_clients(&ids, window).await?;

        let mut result = Vec::new();
        for client in clients {
            let Some(subscription) = subscriptions.get(&client.id) else {
                continue;
            };
            let client_cars = cars.remove(&client.id).unwrap_or_default();
            let car = subscription
                .car_id
                .and_then(|id| client_cars.iter().find(|c| c.id == id))
                .or_else(|| match client_cars.as_slice() {
                    [only] => Some(only),
                    _ => None,
                });
            let Some(car) = car else {
                continue;
            };

            let matcher = CarMatcher::new(car.id, client_cars.len());
            let washed_days: HashSet<NaiveDate> = records
                .iter()
                .filter(|r| r.client_id == client.id && matcher.matches(r.car_id))
                .flat_map(|r| [self.clock.local_date(r.washed_at), self.clock.local_date(r.credited_at())])
                .collect();

            let subscribed_on = self.clock.local_date(subscription.created_at);
            let Some(status) = wash_schedule::resolve_status(client.pattern(), today, subscribed_on, &washed_days)
            else {
                continue;
            };

            result.push(BuildingClient {
                car_photo_url: self.urls.car_photo(car.photo.as_deref()),
                car_details: CarSummary::from(car),
                status,
                client,
            });
        }
        Ok(result)
    }

    pub async fn record_wash(&self, cleaner: &User, payload: RecordWashPayload) -> Result<WashRecord, AppError> {
        let client = self
            .user_repo
            .find_by_id(payload.client_id)
            .await?
            .filter(|u| u.role == UserRole::Client)
            .ok_or_else(|| AppError::not_found("Client"))?;

        let cars = self.car_repo.list_by_client(client.id).await?;
        let car = match payload.car_id {
            Some(car_id) => cars
                .iter()
                .find(|c| c.id == car_id)
                .ok_or_else(|| AppError::BadRequest("Car does not belong to this client".into()))?,
            None => match cars.as_slice() {
                [only] => only,
                [] => return Err(AppError::BadRequest("Client has no registered car".into())),
                _ => return Err(AppError::BadRequest("carId is required for clients with multiple cars".into())),
            },
        };

        let now = self.clock.now();
        let new = NewWashRecord {
            client_id: client.id,
            car_id: Some(car.id),
            cleaner_id: cleaner.id,
            washed_at: now,
            wash_for_date: payload.wash_for_date.map(|day| self.clock.start_of_day(day)),
            wash_time: self.clock.wash_time(now),
        };
        let record = self.wash_repo.insert_record(&self.pool, &new).await?;

        self.activity_repo
            .log(
                ActivityKind::WashStatus,
                &format!("Wash Status Updated ({})", car.license_plate),
                ActivityContext {
                    user_id: Some(client.id),
                    license_plate: Some(car.license_plate.clone()),
                    building_name: client.building_name.clone(),
                    status: Some("completed".into()),
                },
            )
            .await;

        tracing::info!("🧽 Lavagem registrada: cliente {} carro {} por {}", client.id, car.id, cleaner.id);
        Ok(record)
    }

    pub async fn today_washes(&self, cleaner_id: Uuid) -> Result<Vec<WashRecord>, AppError> {
        let window = self.clock.day_window(self.clock.today());
        self.wash_repo.records_by_cleaner(cleaner_id, window).await
    }

    pub async fn cleaner_schedule(&self, cleaner_id: Uuid, date: Option<NaiveDate>) -> Result<Vec<CleanerScheduleEntry>, AppError> {
        let day = date.unwrap_or_else(|| self.clock.today());
        self.wash_repo.cleaner_schedule(cleaner_id, self.clock.day_window(day)).await
    }

    pub async fn update_schedule_status(&self, schedule_id: Uuid, status: ScheduleStatus) -> Result<Schedule, AppError> {
        self.wash_repo
            .update_schedule_status(schedule_id, status)
            .await?
            .ok_or_else(|| AppError::not_found("Schedule"))
    }

    pub async fn monthly_schedule(&self, user: &User, query: MonthlyScheduleQuery) -> Result<MonthlySchedule, AppError> {
        let car_id = query
            .car_id
            .ok_or_else(|| AppError::BadRequest("carId is required".into()))?;

        let cars = self.car_repo.list_by_client(user.id).await?;
        let car = cars
            .iter()
            .find(|c| c.id == car_id)
            .cloned()
            .ok_or_else(|| AppError::not_found("Car"))?;

        let subscription = match self.subscription_repo.latest_for_car(user.id, car_id, true).await? {
            Some(sub) => Some(sub),
            None => self.subscription_repo.latest_for_car(user.id, car_id, false).await?,
        };
        let subscription = match subscription {
            None if cars.len() == 1 => self.subscription_repo.latest_live_unassigned(user.id).await?,
            other => other,
        };

        let today = self.clock.today();
        let month = MonthRef::parse(query.month.as_deref(), query.year.as_deref(), today);
        let status = subscription
            .as_ref()
            .map(|s| s.status)
            .unwrap_or(SubscriptionStatus::Inactive);

        let mut schedule = MonthlySchedule {
            car: self.urls.car_view(car, None),
            wash_days: user.pattern(),
            entries: Vec::new(),
            month: month.month0,
            year: month.year,
            status,
        };

        let Some(subscription) = subscription.filter(|s| s.status.is_live()) else {
            return Ok(schedule);
        };
        let (Some(first), Some(last)) = (month.first_day(), month.last_day()) else {
            return Ok(schedule);
        };

        let hold_boundary = if subscription.status == SubscriptionStatus::OnHold {
            let history = self.subscription_repo.history_for(&[subscription.id]).await?;
            let boundary = history
                .iter()
                .rev()
                .find(|h| h.status == SubscriptionStatus::OnHold)
                .map(|h| self.clock.local_date(h.created_at))
                .unwrap_or(today);
            Some(boundary)
        } else {
            None
        };

        let window = self.clock.range_window(first, last);
        let schedules = self.wash_repo.schedules_for_client(user.id, window).await?;
        let records = self.wash_repo.records_for_clients(&[user.id], window).await?;

        let mut events: Vec<CompletionEvent> = schedules
            .into_iter()
            .filter(|s| s.car_id == Some(car_id))
            .map(|s| {
                let day = self.clock.local_date(s.scheduled_date);
                if s.status == ScheduleStatus::Completed {
                    CompletionEvent::ScheduleCompleted { day, start_time: s.start_time }
                } else {
                    CompletionEvent::ScheduleSlot { day, start_time: s.start_time }
                }
            })
            .collect();
        events.extend(
            records
                .into_iter()
                .filter(|r| wash_schedule::resolve_record_car(r.car_id, r.washed_at, &cars) == Some(car_id))
                .map(|r| CompletionEvent::Washed {
                    day: self.clock.local_date(r.credited_at()),
                    wash_time: Some(r.wash_time).filter(|t| !t.is_empty()),
                }),
        );

        schedule.entries = wash_schedule::build_month(&CalendarInput {
            pattern: user.pattern(),
            month,
            today,
            active_start: self.clock.local_date(subscription.start_date),
            hold_boundary,
            events: &events,
        });
        Ok(schedule)
    }

    pub async fn wash_history(&self, user: &User, car_id: Option<Uuid>) -> Result<Vec<WashHistoryEntry>, AppError> {
        let cars = self.car_repo.list_by_client(user.id).await?;
        let records = self.wash_repo.history_for_client(user.id).await?;

        let entries = records
            .into_iter()
            .filter_map(|record| {
                let resolved = wash_schedule::resolve_record_car(record.car_id, record.washed_at, &cars);
                if car_id.is_some() && resolved != car_id {
                    return None;
                }
                let car = resolved
                    .and_then(|id| cars.iter().find(|c| c.id == id))
                    .map(|c| self.urls.car_view(c.clone(), None));
                Some(WashHistoryEntry { record, car, resolved_car_id: resolved })
            })
            .collect();
        Ok(entries)
    }

    /// Agendamentos do cliente, do mais recente ao mais antigo.
    pub async fn schedule_history(&self, user: &User, car_id: Option<Uuid>) -> Result<Vec<Schedule>, AppError> {
        self.wash_repo.schedules_for_client_all(user.id, car_id).await
    }
}
