// src/middleware/tenancy.rs

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::{common::error::AppError, models::identity::Session};

/// A empresa da sessão. Nunca vem do cliente: é sempre a do token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TenantContext(pub i64);

impl<S> FromRequestParts<S> for TenantContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Session>()
            .map(|session| TenantContext(session.company_id))
            .ok_or(AppError::InvalidToken)
    }
}
