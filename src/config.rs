// src/config.rs

use std::{env, sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    common::clock::LocalClock,
    db::{
        ActivityRepository, BrandRepository, BuildingRepository, CarRepository, PlanRepository,
        SubscriptionRepository, UserRepository, WashRepository,
    },
    payments::{stripe_client::StripeClient, PaymentGateway},
    services::{
        admin_service::AdminService, auth::AuthService, billing_service::BillingService,
        building_service::BuildingService, client_service::ClientService, media::PublicUrls,
        seed::Startup, subscription_service::SubscriptionService, wash_service::WashService,
    },
};

/// Variáveis de ambiente lidas uma única vez na inicialização.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,
    pub admin_secret_code: Option<String>,
    pub stripe_secret_key: Option<String>,
    pub stripe_currency: String,
    pub public_base_url: String,
    pub wash_utc_offset_minutes: i32,
    pub db_max_connections: u32,
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parsed<T: std::str::FromStr>(key: &str, default: T) -> anyhow::Result<T>
where
    T::Err: std::fmt::Display,
{
    match optional(key) {
        Some(raw) => raw
            .parse()
            .map_err(|e| anyhow::anyhow!("{} inválido ({}): {}", key, raw, e)),
        None => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL deve ser definida")?,
            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET deve ser definido")?,
            server_addr: optional("SERVER_ADDR").unwrap_or_else(|| "0.0.0.0:5000".into()),
            admin_secret_code: optional("ADMIN_SECRET_CODE"),
            stripe_secret_key: optional("STRIPE_SECRET_KEY"),
            stripe_currency: optional("STRIPE_CURRENCY")
                .unwrap_or_else(|| "aed".into())
                .to_lowercase(),
            public_base_url: optional("PUBLIC_BASE_URL").unwrap_or_else(|| "http://localhost:5000".into()),
            wash_utc_offset_minutes: parsed("WASH_UTC_OFFSET_MINUTES", 240)?,
            db_max_connections: parsed("DB_MAX_CONNECTIONS", 5)?,
        })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub auth_service: AuthService,
    pub client_service: ClientService,
    pub wash_service: WashService,
    pub billing_service: BillingService,
    pub subscription_service: SubscriptionService,
    pub admin_service: AdminService,
    pub building_service: BuildingService,
}

impl AppState {
    /// Conecta, migra e semeia antes de devolver o estado.
    pub async fn new(config: &Config) -> anyhow::Result<Self> {
        let db_pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&config.database_url)
            .await
            .context("Falha ao conectar ao banco de dados")?;
        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        sqlx::migrate!()
            .run(&db_pool)
            .await
            .context("Falha ao rodar as migrações do banco de dados")?;
        tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

        let clock = LocalClock::from_offset_minutes(config.wash_utc_offset_minutes)
            .context("WASH_UTC_OFFSET_MINUTES fora do intervalo")?;
        let urls = PublicUrls::new(config.public_base_url.clone());

        let gateway: Option<Arc<dyn PaymentGateway>> = config
            .stripe_secret_key
            .as_deref()
            .and_then(StripeClient::from_secret_key)
            .map(|client| Arc::new(client) as Arc<dyn PaymentGateway>);
        if gateway.is_none() {
            tracing::warn!("⚠️ STRIPE_SECRET_KEY ausente ou inválida: cobrança desativada");
        }

        // --- Monta o gráfico de dependências ---
        let user_repo = UserRepository::new(db_pool.clone());
        let car_repo = CarRepository::new(db_pool.clone());
        let plan_repo = PlanRepository::new(db_pool.clone());
        let subscription_repo = SubscriptionRepository::new(db_pool.clone());
        let wash_repo = WashRepository::new(db_pool.clone());
        let activity_repo = ActivityRepository::new(db_pool.clone());
        let building_repo = BuildingRepository::new(db_pool.clone());
        let brand_repo = BrandRepository::new(db_pool.clone());

        Startup::new(plan_repo.clone(), brand_repo.clone(), db_pool.clone())
            .seed()
            .await
            .context("Falha ao semear dados de referência")?;

        let auth_service = AuthService::new(
            user_repo.clone(),
            activity_repo.clone(),
            config.jwt_secret.clone(),
            config.admin_secret_code.clone(),
            db_pool.clone(),
        );
        let subscription_service =
            SubscriptionService::new(subscription_repo.clone(), gateway.clone(), clock, db_pool.clone());
        let billing_service = BillingService::new(
            gateway,
            user_repo.clone(),
            car_repo.clone(),
            plan_repo.clone(),
            subscription_repo.clone(),
            activity_repo.clone(),
            config.stripe_currency.clone(),
            clock,
            db_pool.clone(),
        );
        let client_service = ClientService::new(
            user_repo.clone(),
            car_repo.clone(),
            subscription_repo.clone(),
            wash_repo.clone(),
            activity_repo.clone(),
            plan_repo.clone(),
            subscription_service.clone(),
            clock,
            urls.clone(),
            db_pool.clone(),
        );
        let wash_service = WashService::new(
            user_repo.clone(),
            car_repo.clone(),
            subscription_repo.clone(),
            wash_repo,
            activity_repo.clone(),
            clock,
            urls.clone(),
            db_pool.clone(),
        );
        let admin_service = AdminService::new(
            user_repo.clone(),
            car_repo.clone(),
            subscription_repo.clone(),
            plan_repo,
            building_repo.clone(),
            activity_repo,
            billing_service.clone(),
            clock,
            urls.clone(),
            db_pool.clone(),
        );
        let building_service = BuildingService::new(
            building_repo,
            user_repo,
            car_repo,
            subscription_repo,
            brand_repo,
            clock,
            urls,
        );

        Ok(Self {
            db_pool,
            auth_service,
            client_service,
            wash_service,
            billing_service,
            subscription_service,
            admin_service,
            building_service,
        })
    }
}
