// src/services/admin_service.rs

use std::collections::HashMap;

use chrono::{Datelike, Months, NaiveDate};
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::{error, info};
use uuid::Uuid;

use crate::{
    common::{clock::LocalClock, error::AppError},
    db::{
        ActivityRepository, BuildingRepository, CarRepository, PlanRepository, SubscriptionRepository, UserRepository,
    },
    models::{
        activity::{ActivityContext, ActivityKind, ActivityLog, ContactView, Notification, ReviewView},
        auth::{NewUser, User, UserRole},
        catalog::{SubscriptionPlan, UpdatePlanPayload, UpsertPlanPayload},
        dashboard::{
            ActiveSubscriptionListing, ActivityFeedEntry, AdminDashboard, CarTypeCounts, CreateStaffPayload,
            CustomerView, PrimaryCarSummary, RevenueData, RevenueDataset, UpdateStaffPayload,
        },
        subscription::{Subscription, SubscriptionStatus},
    },
    services::{auth::hash_password, billing_service::BillingService, media::PublicUrls, seed::WASH_FREQUENCY},
};

const FEED_SIZE: i64 = 5;
const ACTIVITY_PAGE: i64 = 20;
const RECENT_REGISTRATIONS_CAP: i64 = 5;

/// Tipo exibido no feed do painel.
pub fn feed_kind(kind: ActivityKind) -> &'static str {
    match kind {
        ActivityKind::WashStatus => "success",
        _ => "info",
    }
}

/// Primeiro dia do mês anterior e último dia do mês anterior.
pub fn previous_month(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let first_current = today.with_day(1).unwrap_or(today);
    let first_previous = first_current
        .checked_sub_months(Months::new(1))
        .unwrap_or(first_current);
    let last_previous = first_current.pred_opt().unwrap_or(first_previous);
    (first_previous, last_previous)
}

// Assinatura principal: a primeira viva, senão a mais recente
fn primary_subscription(subs: &[Subscription]) -> Option<&Subscription> {
    subs.iter().find(|s| s.status.is_live()).or_else(|| subs.first())
}

#[derive(Clone)]
pub struct AdminService {
    user_repo: UserRepository,
    car_repo: CarRepository,
    subscription_repo: SubscriptionRepository,
    plan_repo: PlanRepository,
    building_repo: BuildingRepository,
    activity_repo: ActivityRepository,
    billing: BillingService,
    clock: LocalClock,
    urls: PublicUrls,
    pool: PgPool,
}

impl AdminService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        user_repo: UserRepository,
        car_repo: CarRepository,
        subscription_repo: SubscriptionRepository,
        plan_repo: PlanRepository,
        building_repo: BuildingRepository,
        activity_repo: ActivityRepository,
        billing: BillingService,
        clock: LocalClock,
        urls: PublicUrls,
        pool: PgPool,
    ) -> Self {
        Self {
            user_repo,
            car_repo,
            subscription_repo,
            plan_repo,
            building_repo,
            activity_repo,
            billing,
            clock,
            urls,
            pool,
        }
    }

    // `all` (ou ausente) significa todos os prédios
    async fn building_filter(&self, building_id: Option<&str>) -> Result<Option<String>, AppError> {
        let Some(raw) = building_id.map(str::trim).filter(|b| !b.is_empty() && *b != "all") else {
            return Ok(None);
        };
        let id = Uuid::parse_str(raw).map_err(|_| AppError::not_found("Building"))?;
        let building = self
            .building_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("Building"))?;
        Ok(Some(building.name))
    }

    pub async fn dashboard(&self, building_id: Option<&str>) -> Result<AdminDashboard, AppError> {
        let building = self.building_filter(building_id).await?;
        let client_ids: Option<Vec<Uuid>> = match &building {
            Some(name) => Some(
                self.user_repo
                    .list_clients_in_buildings(&[name.clone()])
                    .await?
                    .into_iter()
                    .map(|u| u.id)
                    .collect(),
            ),
            None => None,
        };
        let ids = client_ids.as_deref();
        let building = building.as_deref();

        let active_subscriptions = self
            .subscription_repo
            .count_by_status(SubscriptionStatus::Active, ids)
            .await?;
        let total_cleaners = self.user_repo.count_by_role(UserRole::Cleaner, building).await?;
        let car_types = CarTypeCounts::from_rows(&self.car_repo.count_by_type(building).await?);
        let recent_registrations = self
            .user_repo
            .count_by_role(UserRole::Client, building)
            .await?
            .min(RECENT_REGISTRATIONS_CAP);

        let today = self.clock.today();
        let month_start = self.clock.start_of_day(today.with_day(1).unwrap_or(today));
        let current_month = self
            .subscription_repo
            .revenue_created_between(month_start, self.clock.now(), ids)
            .await?;
        let (prev_first, prev_last) = previous_month(today);
        let prev = self.clock.range_window(prev_first, prev_last);
        let past_month = self
            .subscription_repo
            .revenue_created_between(prev.start, prev.end, ids)
            .await?;

        let activity_log = self
            .activity_repo
            .recent(FEED_SIZE)
            .await?
            .into_iter()
            .map(|log| ActivityFeedEntry {
                id: log.id,
                text: log.message,
                date: self
                    .clock
                    .local_datetime(log.created_at)
                    .format("%-m/%-d/%Y, %-I:%M:%S %p")
                    .to_string(),
                kind: feed_kind(log.kind).to_string(),
            })
            .collect();

        Ok(AdminDashboard {
            active_subscriptions,
            total_cleaners,
            car_types,
            recent_registrations,
            revenue_data: revenue_data(current_month, past_month),
            activity_log,
        })
    }

    pub async fn building_car_types(&self, building_id: &str) -> Result<CarTypeCounts, AppError> {
        let building = self.building_filter(Some(building_id)).await?;
        let rows = self.car_repo.count_by_type(building.as_deref()).await?;
        Ok(CarTypeCounts::from_rows(&rows))
    }

    // =========================================================================
    //  EQUIPE (LAVADORES E INCORPORADORES)
    // =========================================================================

    pub async fn list_staff(&self, role: UserRole) -> Result<Vec<User>, AppError> {
        self.user_repo.list_by_role(role, None).await
    }

    pub async fn create_staff(&self, role: UserRole, payload: CreateStaffPayload) -> Result<User, AppError> {
        let username = payload.username.trim().to_string();
        let email = payload.email.trim().to_string();
        if self.user_repo.exists_username_or_email(&username, &email).await? {
            return Err(AppError::UserAlreadyExists);
        }

        let new_user = NewUser {
            name: payload.name.trim().to_string(),
            username,
            email,
            password_hash: hash_password(payload.password).await?,
            phone: payload.phone.trim().to_string(),
            role,
            building_assigned: payload
                .building_assigned
                .map(|b| b.trim().to_string())
                .filter(|b| !b.is_empty() && role == UserRole::Cleaner),
            building_name: None,
            floor_number: None,
            parking_slot: None,
            wash_days: None,
            secret_question: None,
            secret_answer_hash: None,
        };
        let user = self.user_repo.create_user(&self.pool, &new_user).await?;

        let (kind, label) = match role {
            UserRole::Cleaner => (ActivityKind::CleanerAdded, "New Cleaner Added"),
            _ => (ActivityKind::DeveloperAdded, "New Developer Added"),
        };
        self.activity_repo
            .log(
                kind,
                &format!("{}: {}", label, user.name),
                ActivityContext {
                    user_id: Some(user.id),
                    building_name: user.building_assigned.clone(),
                    ..Default::default()
                },
            )
            .await;
        Ok(user)
    }

    pub async fn update_staff(&self, role: UserRole, id: Uuid, payload: UpdateStaffPayload) -> Result<User, AppError> {
        let password_hash = match payload.password.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
            Some(password) => Some(hash_password(password.to_string()).await?),
            None => None,
        };

        let user = self
            .user_repo
            .update_staff(&self.pool, id, role, &payload, password_hash.as_deref())
            .await?
            .ok_or_else(|| AppError::not_found(staff_label(role)))?;

        let (kind, label) = match role {
            UserRole::Cleaner => (ActivityKind::CleanerUpdated, "Cleaner Updated"),
            _ => (ActivityKind::DeveloperUpdated, "Developer Updated"),
        };
        self.activity_repo
            .log(
                kind,
                &format!("{}: {}", label, user.name),
                ActivityContext {
                    user_id: Some(user.id),
                    building_name: user.building_assigned.clone(),
                    ..Default::default()
                },
            )
            .await;
        Ok(user)
    }

    pub async fn delete_staff(&self, role: UserRole, id: Uuid) -> Result<(), AppError> {
        let user = self
            .user_repo
            .delete_with_role(&self.pool, id, role)
            .await?
            .ok_or_else(|| AppError::not_found(staff_label(role)))?;

        if role == UserRole::Developer {
            self.activity_repo
                .log(
                    ActivityKind::DeveloperDeleted,
                    &format!("Developer Removed: {}", user.name),
                    ActivityContext { user_id: Some(user.id), ..Default::default() },
                )
                .await;
        }
        info!("🗑️ {} {} removido", staff_label(role), user.id);
        Ok(())
    }

    // =========================================================================
    //  CLIENTES E ASSINATURAS
    // =========================================================================

    pub async fn customers(&self) -> Result<Vec<CustomerView>, AppError> {
        let customers = self.user_repo.list_by_role(UserRole::Client, None).await?;
        let ids: Vec<Uuid> = customers.iter().map(|c| c.id).collect();

        let mut subs_by_user: HashMap<Uuid, Vec<Subscription>> = HashMap::new();
        for sub in self.subscription_repo.list_by_users(&ids).await? {
            subs_by_user.entry(sub.user_id).or_default().push(sub);
        }
        let mut cars_by_user: HashMap<Uuid, Vec<_>> = HashMap::new();
        for car in self.car_repo.list_by_clients(&ids).await?.into_iter().rev() {
            cars_by_user.entry(car.client_id).or_default().push(car);
        }

        let mut views = Vec::with_capacity(customers.len());
        for customer in customers {
            let subs = subs_by_user.remove(&customer.id).unwrap_or_default();
            let cars: Vec<_> = cars_by_user
                .remove(&customer.id)
                .unwrap_or_default()
                .into_iter()
                .map(|car| {
                    let sub = subs.iter().find(|s| s.car_id == Some(car.id)).cloned();
                    self.urls.car_view(car, sub)
                })
                .collect();

            let primary_car_summary = cars.first().map(|view| PrimaryCarSummary {
                make: view.car.make.clone(),
                model: view.car.model.clone(),
                car_type: view.car.car_type,
                license_plate: view.car.license_plate.clone(),
                color: view.car.color.clone(),
            });
            let car_photo_url = cars.first().and_then(|view| view.photo_url.clone());
            let subscription = match primary_subscription(&subs) {
                Some(sub) => Some(self.subscription_repo.detail(sub.clone()).await?),
                None => None,
            };

            views.push(CustomerView {
                customer,
                subscription,
                car_photo_url,
                cars,
                primary_car_summary,
            });
        }
        Ok(views)
    }

    pub async fn active_subscriptions(&self) -> Result<Vec<ActiveSubscriptionListing>, AppError> {
        let subs = self.subscription_repo.list_by_status(SubscriptionStatus::Active).await?;
        let details = self.subscription_repo.with_history(subs).await?;

        let mut listings = Vec::with_capacity(details.len());
        for detail in details {
            let user = self.user_repo.find_by_id(detail.subscription.user_id).await?;
            listings.push(ActiveSubscriptionListing { subscription: detail, user });
        }
        Ok(listings)
    }

    // =========================================================================
    //  PLANOS
    // =========================================================================

    pub async fn list_plans(&self) -> Result<Vec<SubscriptionPlan>, AppError> {
        self.plan_repo.list_all().await
    }

    // Falha de sincronização com o processador não impede a gravação do plano
    async fn with_pricing(&self, plan: SubscriptionPlan) -> SubscriptionPlan {
        let fallback = plan.clone();
        match self.billing.ensure_plan_pricing(plan).await {
            Ok(synced) => synced,
            Err(err) => {
                error!(plan_id = %fallback.id, error = %err, "Sincronização de preço do plano falhou");
                fallback
            }
        }
    }

    pub async fn upsert_plan(&self, payload: UpsertPlanPayload) -> Result<SubscriptionPlan, AppError> {
        let plan_type = payload.plan_type.trim().to_lowercase();
        let plan = self
            .plan_repo
            .upsert(&self.pool, payload.car_type, &plan_type, payload.price, &payload.features, WASH_FREQUENCY)
            .await?;
        Ok(self.with_pricing(plan).await)
    }

    pub async fn update_plan(&self, id: Uuid, payload: UpdatePlanPayload) -> Result<SubscriptionPlan, AppError> {
        let plan = self
            .plan_repo
            .update(id, payload.price, &payload.features)
            .await?
            .ok_or_else(|| AppError::not_found("Plan"))?;
        Ok(self.with_pricing(plan).await)
    }

    pub async fn delete_plan(&self, id: Uuid) -> Result<(), AppError> {
        if !self.plan_repo.delete(id).await? {
            return Err(AppError::not_found("Plan"));
        }
        Ok(())
    }

    // =========================================================================
    //  ATIVIDADES, NOTIFICAÇÕES, AVALIAÇÕES E CONTATOS
    // =========================================================================

    pub async fn activities(&self) -> Result<Vec<ActivityLog>, AppError> {
        self.activity_repo.recent(ACTIVITY_PAGE).await
    }

    pub async fn notifications(&self) -> Result<Vec<Notification>, AppError> {
        self.activity_repo.unread_for(UserRole::Admin).await
    }

    pub async fn mark_notification_read(&self, id: Uuid) -> Result<(), AppError> {
        self.activity_repo.mark_read(id).await?;
        Ok(())
    }

    pub async fn reviews(&self) -> Result<Vec<ReviewView>, AppError> {
        self.activity_repo.list_reviews().await
    }

    pub async fn contacts(&self) -> Result<Vec<ContactView>, AppError> {
        self.activity_repo.list_contacts().await
    }
}

fn staff_label(role: UserRole) -> &'static str {
    match role {
        UserRole::Cleaner => "Cleaner",
        _ => "Developer",
    }
}

fn revenue_data(current_month: Decimal, past_month: Decimal) -> RevenueData {
    RevenueData {
        current_month,
        past_month,
        labels: vec!["Current Month".into(), "Past Month".into()],
        datasets: vec![RevenueDataset { data: vec![current_month, past_month] }],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::car::CarType;
    use chrono::Utc;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sub(status: SubscriptionStatus) -> Subscription {
        Subscription {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            car_id: None,
            plan_id: Uuid::new_v4(),
            status,
            start_date: Utc::now(),
            end_date: None,
            stripe_subscription_id: None,
            plan_type: "basic".into(),
            plan_car_type: CarType::Sedan,
            plan_price: Decimal::new(120, 0),
            plan_features: Vec::new(),
            plan_wash_frequency: WASH_FREQUENCY.into(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn previous_month_handles_year_boundary() {
        assert_eq!(previous_month(day(2024, 1, 15)), (day(2023, 12, 1), day(2023, 12, 31)));
        assert_eq!(previous_month(day(2024, 3, 31)), (day(2024, 2, 1), day(2024, 2, 29)));
    }

    #[test]
    fn primary_subscription_prefers_live_ones() {
        let subs = vec![sub(SubscriptionStatus::Cancelled), sub(SubscriptionStatus::OnHold)];
        assert_eq!(primary_subscription(&subs).map(|s| s.status), Some(SubscriptionStatus::OnHold));

        let cancelled = vec![sub(SubscriptionStatus::Cancelled)];
        assert_eq!(primary_subscription(&cancelled).map(|s| s.status), Some(SubscriptionStatus::Cancelled));
        assert!(primary_subscription(&[]).is_none());
    }

    #[test]
    fn wash_activity_is_highlighted_in_feed() {
        assert_eq!(feed_kind(ActivityKind::WashStatus), "success");
        assert_eq!(feed_kind(ActivityKind::CustomerAdded), "info");
    }

    #[test]
    fn revenue_chart_lists_both_months() {
        let data = revenue_data(Decimal::new(300, 0), Decimal::new(150, 0));
        assert_eq!(data.labels, vec!["Current Month", "Past Month"]);
        assert_eq!(data.datasets[0].data, vec![Decimal::new(300, 0), Decimal::new(150, 0)]);
    }
}
