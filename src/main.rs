// src/main.rs

use axum::{
    middleware as axum_middleware,
    routing::{delete, get, post, put},
    Router,
};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod payments;
mod services;

use crate::config::{AppState, Config};
use crate::docs::ApiDoc;
use crate::middleware::auth::auth_guard;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    // Sem configuração ou banco a aplicação não deve iniciar.
    let config = Config::from_env().expect("Falha ao ler a configuração do ambiente.");
    let app_state = AppState::new(&config)
        .await
        .expect("Falha ao inicializar o estado da aplicação.");

    let app = router(app_state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let listener = TcpListener::bind(&config.server_addr)
        .await
        .expect("Falha ao iniciar o listener TCP");
    tracing::info!("🚀 Servidor escutando em {}", config.server_addr);
    axum::serve(listener, app)
        .await
        .expect("Erro no servidor Axum");
}

fn router(app_state: AppState) -> Router {
    let guard = || axum_middleware::from_fn_with_state(app_state.clone(), auth_guard);

    // --- Auth: cadastro e login públicos, perfil protegido ---
    let auth_routes = Router::new()
        .route("/profile", get(handlers::auth::profile))
        .route("/create-car", post(handlers::auth::create_car))
        .layer(guard())
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login))
        .route("/forgot-password", post(handlers::auth::forgot_password));

    let client_routes = Router::new()
        .route("/dashboard", get(handlers::client::dashboard))
        .route("/monthly-schedule", get(handlers::client::monthly_schedule))
        .route("/wash-history", get(handlers::client::wash_history))
        .route("/history", get(handlers::client::schedule_history))
        .route("/cars", get(handlers::client::list_cars))
        .route(
            "/cars/{car_id}",
            get(handlers::client::get_car)
                .put(handlers::client::update_car)
                .delete(handlers::client::delete_car),
        )
        .route("/subscribed-cars", get(handlers::client::subscribed_cars))
        .route("/feedback", post(handlers::client::feedback))
        .route("/save-push-token", post(handlers::client::save_push_token))
        .route("/subscribe", post(handlers::client::subscribe))
        .route("/subscribe/confirm", post(handlers::client::confirm_subscription))
        .route("/subscription/{id}", put(handlers::client::subscription_action))
        .route("/subscription/{id}/status", get(handlers::client::subscription_status))
        .route("/subscription-plans", get(handlers::client::subscription_plans))
        .route("/contact", post(handlers::client::contact))
        .layer(guard())
        .route("/account-deletion-request", post(handlers::client::account_deletion_request));

    let cleaner_routes = Router::new()
        .route("/building-clients", get(handlers::cleaner::building_clients))
        .route("/record-wash", post(handlers::cleaner::record_wash))
        .route("/today-washes", get(handlers::cleaner::today_washes))
        .route("/schedule", get(handlers::cleaner::schedule))
        .route("/status/{schedule_id}", put(handlers::cleaner::update_status))
        .layer(guard());

    let admin_routes = Router::new()
        .route("/dashboard", get(handlers::admin::dashboard))
        .route("/building-car-types/{building_id}", get(handlers::admin::building_car_types))
        .route(
            "/cleaners",
            get(handlers::admin::list_cleaners).post(handlers::admin::create_cleaner),
        )
        .route(
            "/cleaners/{id}",
            put(handlers::admin::update_cleaner).delete(handlers::admin::delete_cleaner),
        )
        .route(
            "/developers",
            get(handlers::admin::list_developers).post(handlers::admin::create_developer),
        )
        .route(
            "/developers/{id}",
            put(handlers::admin::update_developer).delete(handlers::admin::delete_developer),
        )
        .route("/customers", get(handlers::admin::customers))
        .route("/customers/{id}/subscription", put(handlers::admin::update_customer_subscription))
        .route("/subscriptions", get(handlers::admin::active_subscriptions))
        .route("/subscriptions/{id}", delete(handlers::admin::delete_subscription))
        .route(
            "/subscription-plans",
            get(handlers::admin::list_plans).post(handlers::admin::upsert_plan),
        )
        .route(
            "/subscription-plans/{id}",
            put(handlers::admin::update_plan).delete(handlers::admin::delete_plan),
        )
        .route("/activities", get(handlers::admin::activities))
        .route("/notifications", get(handlers::admin::notifications))
        .route("/notifications/{id}/read", put(handlers::admin::mark_notification_read))
        .route("/reviews", get(handlers::admin::reviews))
        .route("/contacts", get(handlers::admin::contacts))
        .layer(guard());

    let developer_routes = Router::new()
        .route("/buildings", get(handlers::developer::buildings))
        .route("/buildings/{id}/summary", get(handlers::developer::building_summary))
        .layer(guard());

    // Listagem pública; escrita só para admin
    let building_routes = Router::new()
        .route("/", post(handlers::buildings::create))
        .route("/seed", post(handlers::buildings::seed))
        .route(
            "/{id}",
            put(handlers::buildings::update).delete(handlers::buildings::delete),
        )
        .route_layer(guard())
        .route("/", get(handlers::buildings::list));

    let payment_routes = Router::new()
        .route("/create-payment-intent", post(handlers::payment::create_payment_intent))
        .layer(guard());

    Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .route("/api/brands", get(handlers::brands::list))
        .nest("/api/auth", auth_routes)
        .nest("/api/client", client_routes)
        .nest("/api/cleaner", cleaner_routes)
        .nest("/api/admin", admin_routes)
        .nest("/api/developer", developer_routes)
        .nest("/api/buildings", building_routes)
        .nest("/api/payment", payment_routes)
        .with_state(app_state)
}
