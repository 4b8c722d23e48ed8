// src/middleware/rbac.rs

use axum::{extract::FromRequestParts, http::request::Parts};
use std::marker::PhantomData;

use crate::{common::error::AppError, models::identity::Session};

/// 1. O Trait que define um papel
pub trait RoleDef: Send + Sync + 'static {
    fn name() -> &'static str;
    fn allows(session: &Session) -> bool;
}

/// 2. O Extractor (Guardião)
pub struct RequireRole<T>(pub PhantomData<T>);

impl<T, S> FromRequestParts<S> for RequireRole<T>
where
    T: RoleDef,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Session>()
            .ok_or(AppError::InvalidToken)?;

        if !T::allows(session) {
            tracing::warn!(
                account_id = session.account_id,
                role = T::name(),
                "Acesso negado: papel exigido ausente"
            );
            return Err(AppError::Forbidden);
        }

        Ok(RequireRole(PhantomData))
    }
}

// ---
// DEFINIÇÃO DOS PAPÉIS (TIPOS)
// ---

pub struct AdminRole;
impl RoleDef for AdminRole {
    fn name() -> &'static str { "admin" }
    fn allows(session: &Session) -> bool { session.is_admin }
}

pub struct EmployeeRole;
impl RoleDef for EmployeeRole {
    fn name() -> &'static str { "employee" }
    fn allows(session: &Session) -> bool { session.employee_id.is_some() }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(is_admin: bool, employee_id: Option<i64>) -> Session {
        Session {
            account_id: 1,
            company_id: 1,
            is_admin,
            employee_id,
            display_name: "x".into(),
        }
    }

    #[test]
    fn roles_follow_session_flags() {
        assert!(AdminRole::allows(&session(true, None)));
        assert!(!AdminRole::allows(&session(false, Some(3))));
        assert!(EmployeeRole::allows(&session(false, Some(3))));
        assert!(!EmployeeRole::allows(&session(true, None)));
    }
}
