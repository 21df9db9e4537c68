pub mod activity;
pub mod auth;
pub mod building;
pub mod car;
pub mod catalog;
pub mod dashboard;
pub mod subscription;
pub mod wash;
