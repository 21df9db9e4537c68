pub mod admin;
pub mod auth;
pub mod brands;
pub mod buildings;
pub mod cleaner;
pub mod client;
pub mod developer;
pub mod payment;
