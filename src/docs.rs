// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Auth ---
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::forgot_password,
        handlers::auth::profile,
        handlers::auth::create_car,

        // --- Client ---
        handlers::client::dashboard,
        handlers::client::monthly_schedule,
        handlers::client::wash_history,
        handlers::client::schedule_history,
        handlers::client::list_cars,
        handlers::client::get_car,
        handlers::client::update_car,
        handlers::client::delete_car,
        handlers::client::subscribed_cars,
        handlers::client::subscription_plans,
        handlers::client::subscribe,
        handlers::client::confirm_subscription,
        handlers::client::subscription_action,
        handlers::client::subscription_status,
        handlers::client::feedback,
        handlers::client::save_push_token,
        handlers::client::contact,
        handlers::client::account_deletion_request,

        // --- Cleaner ---
        handlers::cleaner::building_clients,
        handlers::cleaner::record_wash,
        handlers::cleaner::today_washes,
        handlers::cleaner::schedule,
        handlers::cleaner::update_status,

        // --- Admin ---
        handlers::admin::dashboard,
        handlers::admin::building_car_types,
        handlers::admin::list_cleaners,
        handlers::admin::create_cleaner,
        handlers::admin::update_cleaner,
        handlers::admin::delete_cleaner,
        handlers::admin::list_developers,
        handlers::admin::create_developer,
        handlers::admin::update_developer,
        handlers::admin::delete_developer,
        handlers::admin::customers,
        handlers::admin::update_customer_subscription,
        handlers::admin::delete_subscription,
        handlers::admin::active_subscriptions,
        handlers::admin::list_plans,
        handlers::admin::upsert_plan,
        handlers::admin::update_plan,
        handlers::admin::delete_plan,
        handlers::admin::activities,
        handlers::admin::notifications,
        handlers::admin::mark_notification_read,
        handlers::admin::reviews,
        handlers::admin::contacts,

        // --- Developer ---
        handlers::developer::buildings,
        handlers::developer::building_summary,

        // --- Buildings e Brands ---
        handlers::buildings::list,
        handlers::buildings::create,
        handlers::buildings::update,
        handlers::buildings::delete,
        handlers::buildings::seed,
        handlers::brands::list,

        // --- Payment ---
        handlers::payment::create_payment_intent,
    ),
    components(
        schemas(
            // --- Auth ---
            models::auth::UserRole,
            models::auth::UserStatus,
            models::auth::WashPattern,
            models::auth::User,
            models::auth::AuthUserSummary,
            models::auth::RegisterUserPayload,
            models::auth::LoginUserPayload,
            models::auth::ForgotPasswordPayload,
            models::auth::AuthResponse,

            // --- Cars ---
            models::car::CarType,
            models::car::Car,
            models::car::CarSummary,
            models::car::CarView,
            models::car::SubscribedCar,
            models::car::CreateCarPayload,
            models::car::UpdateCarPayload,
            models::car::CarCreatedResponse,

            // --- Subscriptions ---
            models::subscription::SubscriptionStatus,
            models::subscription::StatusAction,
            models::subscription::Subscription,
            models::subscription::StatusHistoryEntry,
            models::subscription::SubscriptionDetail,
            models::subscription::SubscribePayload,
            models::subscription::SubscribeResponse,
            models::subscription::ConfirmSubscriptionPayload,
            models::subscription::ConfirmedSubscription,
            models::subscription::SubscriptionActionPayload,
            models::subscription::SubscriptionActionResponse,
            models::subscription::AdminSubscriptionPayload,
            models::subscription::AdminSubscriptionResponse,
            models::subscription::PaymentIntentPayload,
            models::subscription::PaymentIntentSummary,
            models::subscription::PaymentIntentResponse,

            // --- Washes ---
            models::wash::WashStatus,
            models::wash::ScheduleStatus,
            models::wash::WashRecord,
            models::wash::Schedule,
            models::wash::CleanerScheduleEntry,
            models::wash::BuildingClient,
            models::wash::CalendarEntry,
            models::wash::MonthlySchedule,
            models::wash::WashHistoryEntry,
            models::wash::RecordWashPayload,
            models::wash::UpdateScheduleStatusPayload,

            // --- Buildings e catálogo ---
            models::building::Building,
            models::building::BuildingListing,
            models::building::CreateBuildingPayload,
            models::building::UpdateBuildingPayload,
            models::building::BuildingClientRow,
            models::building::BuildingCarRow,
            models::building::BuildingRef,
            models::building::BuildingTotals,
            models::building::BuildingSummary,
            models::catalog::SubscriptionPlan,
            models::catalog::UpsertPlanPayload,
            models::catalog::UpdatePlanPayload,
            models::catalog::CarModelView,
            models::catalog::CarBrandView,

            // --- Dashboard ---
            models::dashboard::ClientDashboard,
            models::dashboard::CarTypeCounts,
            models::dashboard::RevenueDataset,
            models::dashboard::RevenueData,
            models::dashboard::ActivityFeedEntry,
            models::dashboard::AdminDashboard,
            models::dashboard::PrimaryCarSummary,
            models::dashboard::CustomerView,
            models::dashboard::CreateStaffPayload,
            models::dashboard::UpdateStaffPayload,
            models::dashboard::ActiveSubscriptionListing,

            // --- Atividades ---
            models::activity::ActivityKind,
            models::activity::ActivityLog,
            models::activity::Notification,
            models::activity::ReviewView,
            models::activity::ContactView,
            models::activity::FeedbackPayload,
            models::activity::ContactPayload,
            models::activity::PushTokenPayload,
            models::activity::DeletionRequestPayload,
            models::activity::MessageResponse,
        )
    ),
    tags(
        (name = "Auth", description = "Autenticação, registro e perfil"),
        (name = "Client", description = "Painel, carros, agenda e assinaturas do cliente"),
        (name = "Cleaner", description = "Fila do prédio e registro de lavagens"),
        (name = "Admin", description = "Equipe, clientes, planos e indicadores"),
        (name = "Developer", description = "Prédios do incorporador"),
        (name = "Buildings", description = "Cadastro de prédios"),
        (name = "Brands", description = "Catálogo de marcas e modelos"),
        (name = "Payment", description = "Intenções de pagamento avulsas")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        );
    }
}
