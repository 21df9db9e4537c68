// src/middleware/rbac.rs

use std::marker::PhantomData;

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::{
    common::error::AppError,
    models::auth::{User, UserRole},
};

/// 1. O Trait que define o papel exigido por uma rota
pub trait RoleDef: Send + Sync + 'static {
    fn role() -> UserRole;
    fn denied() -> &'static str;
}

/// 2. O Extractor (Guardião). Depende do `auth_guard` ter rodado antes.
pub struct RequireRole<T>(pub User, pub PhantomData<T>);

impl<T> RequireRole<T> {
    pub fn user(&self) -> &User {
        &self.0
    }
}

impl<T, S> FromRequestParts<S> for RequireRole<T>
where
    T: RoleDef,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = parts
            .extensions
            .get::<User>()
            .cloned()
            .ok_or(AppError::MissingToken)?;

        if user.role != T::role() {
            return Err(AppError::Forbidden(T::denied().to_string()));
        }

        Ok(RequireRole(user, PhantomData))
    }
}

// ---
// DEFINIÇÃO DOS PAPÉIS (TIPOS)
// ---

pub struct CleanerRole;
impl RoleDef for CleanerRole {
    fn role() -> UserRole { UserRole::Cleaner }
    fn denied() -> &'static str { "Access denied. Cleaner role required." }
}

pub struct AdminRole;
impl RoleDef for AdminRole {
    fn role() -> UserRole { UserRole::Admin }
    fn denied() -> &'static str { "Access denied. Admin role required." }
}

pub struct DeveloperRole;
impl RoleDef for DeveloperRole {
    fn role() -> UserRole { UserRole::Developer }
    fn denied() -> &'static str { "Access denied. Developer role required." }
}
