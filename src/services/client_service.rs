// src/services/client_service.rs
//
// Operações do app do cliente: painel, carros, feedback e pedidos de contato.

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::{
    common::{clock::LocalClock, error::AppError},
    db::{
        car_repo::{CarChanges, NewCar},
        ActivityRepository, CarRepository, PlanRepository, SubscriptionRepository, UserRepository, WashRepository,
    },
    models::{
        activity::{ContactPayload, DeletionRequestPayload, FeedbackPayload},
        auth::{User, UserRole},
        car::{Car, CarCreatedResponse, CarType, CarView, CreateCarPayload, SubscribedCar, UpdateCarPayload},
        catalog::SubscriptionPlan,
        dashboard::ClientDashboard,
        subscription::{Subscription, SubscriptionStatus},
    },
    services::{auth::verify_password, media::PublicUrls, subscription_service::SubscriptionService},
};

pub const DELETION_SUBJECT: &str = "ACCOUNT DELETION REQUEST";

/// Só os dígitos do telefone.
pub fn phone_digits(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

fn trimmed(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_owned)
}

/// Dados do pedido de exclusão já normalizados.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct DeletionIdentity {
    pub username: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub secret_question: Option<String>,
    pub secret_answer: Option<String>,
    pub note: Option<String>,
    pub source: Option<String>,
}

impl DeletionIdentity {
    pub fn normalize(payload: &DeletionRequestPayload) -> Self {
        Self {
            username: trimmed(payload.username.as_deref()),
            email: trimmed(payload.email.as_deref()).map(|e| e.to_lowercase()),
            phone: payload
                .phone
                .as_deref()
                .map(phone_digits)
                .filter(|p| !p.is_empty()),
            secret_question: trimmed(payload.secret_question.as_deref()),
            secret_answer: trimmed(payload.secret_answer.as_deref()).map(|a| a.to_lowercase()),
            note: trimmed(payload.note.as_deref()),
            source: trimmed(payload.source.as_deref()),
        }
    }

    pub fn has_identifier(&self) -> bool {
        self.username.is_some() || self.email.is_some() || self.phone.is_some()
    }
}

/// Corpo da mensagem gravada para a equipe de suporte.
pub fn deletion_message(
    identity: &DeletionIdentity,
    user: &User,
    verified: bool,
    live_subscriptions: i64,
    submitted_at: DateTime<Utc>,
) -> String {
    [
        DELETION_SUBJECT.to_string(),
        format!("Submitted at: {}", submitted_at.to_rfc3339_opts(SecondsFormat::Millis, true)),
        format!("Source: {}", identity.source.as_deref().unwrap_or("app")),
        format!("Username: {}", identity.username.as_deref().unwrap_or(&user.username)),
        format!("Email: {}", identity.email.as_deref().unwrap_or(&user.email)),
        format!("Phone: {}", identity.phone.as_deref().unwrap_or(&user.phone)),
        format!(
            "Secret question provided: {}",
            if identity.secret_question.is_some() { "Yes" } else { "No" }
        ),
        format!("Verification status: {}", if verified { "verified" } else { "unverified" }),
        format!("Active subscriptions: {}", live_subscriptions),
        format!("Notes: {}", identity.note.as_deref().unwrap_or("N/A")),
    ]
    .join("\n")
}

#[derive(Clone)]
pub struct ClientService {
    user_repo: UserRepository,
    car_repo: CarRepository,
    subscription_repo: SubscriptionRepository,
    wash_repo: WashRepository,
    activity_repo: ActivityRepository,
    plan_repo: PlanRepository,
    subscriptions: SubscriptionService,
    clock: LocalClock,
    urls: PublicUrls,
    pool: PgPool,
}

impl ClientService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        user_repo: UserRepository,
        car_repo: CarRepository,
        subscription_repo: SubscriptionRepository,
        wash_repo: WashRepository,
        activity_repo: ActivityRepository,
        plan_repo: PlanRepository,
        subscriptions: SubscriptionService,
        clock: LocalClock,
        urls: PublicUrls,
        pool: PgPool,
    ) -> Self {
        Self {
            user_repo,
            car_repo,
            subscription_repo,
            wash_repo,
            activity_repo,
            plan_repo,
            subscriptions,
            clock,
            urls,
            pool,
        }
    }

    /// Assinatura exibida para o carro. Com um único carro, vale também a
    /// assinatura viva sem carro vinculado.
    async fn subscription_for_car(
        &self,
        user_id: Uuid,
        car_id: Uuid,
        car_count: usize,
        live_only: bool,
    ) -> Result<Option<Subscription>, AppError> {
        if let Some(sub) = self.subscription_repo.latest_for_car(user_id, car_id, live_only).await? {
            return Ok(Some(sub));
        }
        if car_count == 1 {
            return self.subscription_repo.latest_live_unassigned(user_id).await;
        }
        Ok(None)
    }

    async fn owned_car(&self, user: &User, car_id: Uuid) -> Result<Car, AppError> {
        self.car_repo
            .find_by_id(car_id)
            .await?
            .filter(|c| c.client_id == user.id)
            .ok_or_else(|| AppError::not_found("Car"))
    }

    pub async fn dashboard(&self, user: &User, car_id: Option<Uuid>) -> Result<ClientDashboard, AppError> {
        let cars = self.car_repo.list_by_client(user.id).await?;
        let car = car_id
            .and_then(|id| cars.iter().find(|c| c.id == id))
            .or_else(|| cars.iter().max_by_key(|c| c.created_at))
            .cloned();

        let subscription = match &car {
            Some(car) => self.subscription_for_car(user.id, car.id, cars.len(), true).await?,
            None => self.subscription_repo.latest_live_for_user(user.id).await?,
        };
        let subscription = match subscription {
            Some(sub) => Some(self.subscriptions.sync_quietly(sub).await),
            None => None,
        };
        let subscription = match subscription {
            Some(sub) => Some(self.subscription_repo.detail(sub).await?),
            None => None,
        };

        let selected = car.as_ref().map(|c| c.id);
        let next_wash = self.wash_repo.next_schedule(user.id, selected, self.clock.now()).await?;
        let last_wash = self.wash_repo.last_completed_schedule(user.id, selected).await?;

        Ok(ClientDashboard {
            car: car.map(|c| self.urls.car_view(c, None)),
            subscription,
            next_wash,
            last_wash,
            selected_car_id: selected,
        })
    }

    /// Carros do cliente, do mais novo ao mais antigo, com a última assinatura de cada um.
    pub async fn list_cars(&self, user: &User) -> Result<Vec<CarView>, AppError> {
        let mut cars = self.car_repo.list_by_client(user.id).await?;
        cars.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let count = cars.len();

        let mut views = Vec::with_capacity(count);
        for car in cars {
            let subscription = self.subscription_for_car(user.id, car.id, count, false).await?;
            views.push(self.urls.car_view(car, subscription));
        }
        Ok(views)
    }

    pub async fn get_car(&self, user: &User, car_id: Uuid) -> Result<CarView, AppError> {
        let car = self.owned_car(user, car_id).await?;
        let count = self.car_repo.list_by_client(user.id).await?.len();
        let subscription = self.subscription_for_car(user.id, car.id, count, false).await?;
        Ok(self.urls.car_view(car, subscription))
    }

    pub async fn subscribed_cars(&self, user: &User) -> Result<Vec<SubscribedCar>, AppError> {
        let cars = self.car_repo.list_by_client(user.id).await?;
        let count = cars.len();

        let mut result = Vec::new();
        for car in cars {
            if let Some(subscription) = self.subscription_for_car(user.id, car.id, count, true).await? {
                result.push(SubscribedCar {
                    car: self.urls.car_view(car, None),
                    subscription,
                });
            }
        }
        Ok(result)
    }

    pub async fn create_car(&self, user: &User, payload: CreateCarPayload) -> Result<CarCreatedResponse, AppError> {
        if payload.client_id.is_some_and(|id| id != user.id) {
            return Err(AppError::Forbidden("Unauthorized to create car for this user".into()));
        }
        let year = payload
            .year
            .trim()
            .parse::<i32>()
            .map_err(|_| AppError::BadRequest("Invalid year".into()))?;

        let new = NewCar {
            client_id: user.id,
            make: payload.make.trim().to_string(),
            model: payload.model.trim().to_string(),
            year,
            car_type: CarType::normalize(Some(&payload.car_type)),
            license_plate: payload.license_plate.trim().to_string(),
            color: payload.color.trim().to_string(),
            photo: payload.photo.filter(|p| !p.is_empty()),
        };
        let car = self.car_repo.create_car(&self.pool, &new).await?;
        info!("🚗 Carro {} cadastrado para o cliente {}", car.id, user.id);

        Ok(CarCreatedResponse {
            message: "Car created successfully".into(),
            car,
        })
    }

    pub async fn update_car(&self, user: &User, car_id: Uuid, payload: UpdateCarPayload) -> Result<CarView, AppError> {
        let changes = CarChanges {
            make: payload.make.map(|m| m.trim().to_string()),
            model: payload.model.map(|m| m.trim().to_string()),
            year: payload.year,
            car_type: payload.car_type.map(|t| CarType::normalize(Some(&t))),
            license_plate: payload.license_plate.map(|p| p.trim().to_string()),
            color: payload.color.map(|c| c.trim().to_string()),
        };
        let car = self
            .car_repo
            .update_car(car_id, user.id, &changes)
            .await?
            .ok_or_else(|| AppError::not_found("Car"))?;
        Ok(self.urls.car_view(car, None))
    }

    pub async fn delete_car(&self, user: &User, car_id: Uuid) -> Result<(), AppError> {
        let car = self.owned_car(user, car_id).await?;
        let count = self.car_repo.list_by_client(user.id).await?.len();

        let subscription = self.subscription_for_car(user.id, car.id, count, false).await?;
        if subscription.is_some_and(|s| s.status.is_live()) {
            return Err(AppError::BadRequest("Car cannot be deleted while subscription is active".into()));
        }

        if !self.car_repo.delete_car(&self.pool, car.id, user.id).await? {
            return Err(AppError::not_found("Car"));
        }
        info!("🗑️ Carro {} removido pelo cliente {}", car.id, user.id);
        Ok(())
    }

    pub async fn list_plans(&self) -> Result<Vec<SubscriptionPlan>, AppError> {
        self.plan_repo.list_all().await
    }

    pub async fn submit_feedback(&self, user: &User, payload: FeedbackPayload) -> Result<Uuid, AppError> {
        self.activity_repo
            .create_review(user.id, payload.schedule_id, payload.rating, payload.comment.trim())
            .await
    }

    pub async fn save_push_token(&self, user: &User, token: &str) -> Result<(), AppError> {
        self.user_repo.set_push_token(user.id, token.trim()).await
    }

    pub async fn contact(&self, user: &User, payload: ContactPayload) -> Result<(), AppError> {
        let sender = Some(user.name.trim()).filter(|n| !n.is_empty()).unwrap_or("a client");
        let subject = payload.subject.trim();

        // --- INÍCIO DA TRANSAÇÃO ---
        let mut tx = self.pool.begin().await?;
        self.activity_repo
            .create_contact(&mut *tx, Some(user.id), subject, payload.message.trim())
            .await?;
        self.activity_repo
            .notify(
                &mut *tx,
                UserRole::Admin,
                "New Contact Message",
                &format!("New contact message from {}: {}", sender, subject),
            )
            .await?;
        tx.commit().await?;
        // --- FIM DA TRANSAÇÃO ---

        Ok(())
    }

    async fn find_deletion_target(&self, identity: &DeletionIdentity) -> Result<Option<User>, AppError> {
        if let Some(email) = &identity.email {
            if let Some(user) = self.user_repo.find_by_email(email).await? {
                return Ok(Some(user));
            }
        }
        if let Some(username) = &identity.username {
            if let Some(user) = self.user_repo.find_by_username_ci(username).await? {
                return Ok(Some(user));
            }
        }
        if let Some(phone) = &identity.phone {
            return self.user_repo.find_by_phone_digits(phone).await;
        }
        Ok(None)
    }

    /// Pedido público de exclusão de conta. Vira uma mensagem de contato para o suporte.
    pub async fn request_deletion(&self, payload: DeletionRequestPayload) -> Result<(), AppError> {
        let identity = DeletionIdentity::normalize(&payload);
        if !identity.has_identifier() {
            return Err(AppError::BadRequest("Username, email, or phone is required.".into()));
        }
        let (Some(question), Some(answer)) = (&identity.secret_question, &identity.secret_answer) else {
            return Err(AppError::BadRequest("Secret question and answer are required.".into()));
        };

        let user = self
            .find_deletion_target(&identity)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found.".into()))?;
        if user.role != UserRole::Client {
            return Err(AppError::Forbidden("Only client accounts can request deletion.".into()));
        }

        let question_matches = user.secret_question.as_deref().map(str::trim) == Some(question.as_str());
        let verified = match (&user.secret_answer_hash, question_matches) {
            (Some(hash), true) => verify_password(answer.clone(), hash.clone()).await?,
            _ => false,
        };

        let ids = [user.id];
        let live = self
            .subscription_repo
            .count_by_status(SubscriptionStatus::Active, Some(&ids))
            .await?
            + self
                .subscription_repo
                .count_by_status(SubscriptionStatus::OnHold, Some(&ids))
                .await?;

        let message = deletion_message(&identity, &user, verified, live, self.clock.now());
        self.activity_repo
            .create_contact(&self.pool, Some(user.id), DELETION_SUBJECT, &message)
            .await?;

        info!("📨 Pedido de exclusão registrado para {} (verificado: {})", user.id, verified);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::auth::UserStatus;
    use chrono::TimeZone;

    fn user() -> User {
        User {
            id: Uuid::new_v4(),
            name: "Sara".into(),
            username: "sara".into(),
            email: "sara@example.com".into(),
            password_hash: String::new(),
            phone: "+971 50 123 4567".into(),
            role: UserRole::Client,
            building_assigned: None,
            building_name: Some("Marina Gate".into()),
            floor_number: None,
            parking_slot: None,
            wash_days: None,
            push_token: None,
            stripe_customer_id: None,
            secret_question: Some("Pet name?".into()),
            secret_answer_hash: None,
            status: UserStatus::Active,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn phone_keeps_only_digits() {
        assert_eq!(phone_digits("+971 (50) 123-4567"), "971501234567");
        assert_eq!(phone_digits("abc"), "");
    }

    #[test]
    fn identity_is_normalized() {
        let payload = DeletionRequestPayload {
            username: Some("  Sara ".into()),
            email: Some(" SARA@Example.com ".into()),
            phone: Some("--".into()),
            secret_question: Some(" Pet name? ".into()),
            secret_answer: Some(" Rex ".into()),
            note: Some("   ".into()),
            source: None,
        };
        let identity = DeletionIdentity::normalize(&payload);
        assert_eq!(identity.username.as_deref(), Some("Sara"));
        assert_eq!(identity.email.as_deref(), Some("sara@example.com"));
        assert_eq!(identity.phone, None);
        assert_eq!(identity.secret_question.as_deref(), Some("Pet name?"));
        assert_eq!(identity.secret_answer.as_deref(), Some("rex"));
        assert_eq!(identity.note, None);
        assert!(identity.has_identifier());
        assert!(!DeletionIdentity::default().has_identifier());
    }

    #[test]
    fn deletion_message_falls_back_to_stored_details() {
        let identity = DeletionIdentity {
            email: Some("sara@example.com".into()),
            secret_question: Some("Pet name?".into()),
            secret_answer: Some("rex".into()),
            ..Default::default()
        };
        let at = Utc.with_ymd_and_hms(2024, 3, 4, 10, 0, 0).unwrap();
        let message = deletion_message(&identity, &user(), true, 2, at);
        let lines: Vec<&str> = message.lines().collect();

        assert_eq!(lines[0], DELETION_SUBJECT);
        assert_eq!(lines[1], "Submitted at: 2024-03-04T10:00:00.000Z");
        assert_eq!(lines[2], "Source: app");
        assert_eq!(lines[3], "Username: sara");
        assert_eq!(lines[5], "Phone: +971 50 123 4567");
        assert_eq!(lines[6], "Secret question provided: Yes");
        assert_eq!(lines[7], "Verification status: verified");
        assert_eq!(lines[8], "Active subscriptions: 2");
        assert_eq!(lines[9], "Notes: N/A");
    }
}
