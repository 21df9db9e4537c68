pub mod admin_service;
pub mod auth;
pub mod billing_service;
pub mod building_service;
pub mod client_service;
pub mod media;
pub mod seed;
pub mod subscription_service;
pub mod subscription_state;
pub mod wash_schedule;
pub mod wash_service;
