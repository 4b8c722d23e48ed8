// src/models/identity.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::common::error::AppError;

/// Nome exibido para qualquer conta de administrador.
pub const ADMIN_DISPLAY_NAME: &str = "Адміністратор";

// ---
// 1. Company (o tenant raiz)
// ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub id: i64,
    #[schema(example = "Acme")]
    pub name: String,
    pub created_at: DateTime<Utc>,
}

// ---
// 2. Account (credenciais)
// ---
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: i64,
    #[schema(example = "380501112233")]
    pub login: String,

    #[serde(skip_serializing)] // IMPORTANTE para segurança
    #[schema(ignore)]
    pub password_hash: String,

    pub is_admin: bool,
    pub company_id: i64,
    pub created_at: DateTime<Utc>,
}

// ---
// 3. Employee (o funcionário; phone_number == Account.login)
// ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub id: i64,
    pub name: String,
    pub surname: String,
    pub middle_name: Option<String>,
    pub phone_number: String,
    pub photo_path: Option<String>,
    #[schema(ignore)]
    pub company_id: i64,
}

impl Employee {
    /// "sobrenome nome patronímico", sem espaços sobrando quando falta o patronímico.
    pub fn display_name(&self) -> String {
        [Some(self.surname.as_str()), Some(self.name.as_str()), self.middle_name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|part| !part.trim().is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

// ---
// 4. Session (contexto imutável por requisição)
// ---
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub account_id: i64,
    pub company_id: i64,
    pub is_admin: bool,
    pub employee_id: Option<i64>,
    pub display_name: String,
}

impl Session {
    pub fn employee_id(&self) -> Result<i64, AppError> {
        self.employee_id.ok_or(AppError::Forbidden)
    }

    /// Rejeita acesso a linhas de outra empresa.
    pub fn ensure_company(&self, owner_company_id: i64) -> Result<(), AppError> {
        if self.company_id == owner_company_id {
            Ok(())
        } else {
            tracing::warn!(
                account_id = self.account_id,
                company_id = self.company_id,
                owner_company_id,
                "Tentativa de acesso entre empresas bloqueada"
            );
            Err(AppError::Forbidden)
        }
    }
}

// Estrutura de dados ("claims") dentro do JWT
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64, // Subject (ID da conta)
    pub company_id: i64,
    pub is_admin: bool,
    pub employee_id: Option<i64>,
    pub name: String,
    pub exp: usize, // Expiration time (quando o token expira)
    pub iat: usize, // Issued At (quando o token foi criado)
}

impl From<&Claims> for Session {
    fn from(claims: &Claims) -> Self {
        Session {
            account_id: claims.sub,
            company_id: claims.company_id,
            is_admin: claims.is_admin,
            employee_id: claims.employee_id,
            display_name: claims.name.clone(),
        }
    }
}

// ---
// Payloads
// ---

// Dados para registro de uma nova empresa
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterPayload {
    #[validate(length(min = 1, max = 128, message = "O nome da empresa é obrigatório."))]
    #[schema(example = "Acme")]
    pub company_name: String,
    #[validate(length(min = 1, max = 20, message = "O telefone é obrigatório."))]
    #[schema(example = "111")]
    pub phone: String,
    #[validate(length(min = 1, message = "A senha é obrigatória."))]
    pub password: String,
}

// Dados para login
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginPayload {
    #[validate(length(min = 1, message = "O login é obrigatório."))]
    pub login: String,
    #[validate(length(min = 1, message = "A senha é obrigatória."))]
    pub password: String,
}

// Resposta de autenticação com o token
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    pub session: Session,
}

/// Dados de um novo funcionário (a foto chega à parte no multipart).
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewEmployee {
    #[validate(length(min = 1, max = 100, message = "O nome é obrigatório."))]
    pub name: String,
    #[validate(length(min = 1, max = 100, message = "O sobrenome é obrigatório."))]
    pub surname: String,
    #[validate(length(max = 100))]
    pub middle_name: Option<String>,
    #[validate(length(min = 1, max = 20, message = "O telefone é obrigatório."))]
    pub phone_number: String,
    #[validate(length(min = 1, message = "A senha é obrigatória."))]
    pub password: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn employee(middle: Option<&str>) -> Employee {
        Employee {
            id: 1,
            name: "Ivan".into(),
            surname: "Petrenko".into(),
            middle_name: middle.map(str::to_string),
            phone_number: "222".into(),
            photo_path: None,
            company_id: 1,
        }
    }

    #[test]
    fn display_name_is_surname_name_middle() {
        assert_eq!(employee(Some("Ivanovych")).display_name(), "Petrenko Ivan Ivanovych");
        assert_eq!(employee(None).display_name(), "Petrenko Ivan");
        assert_eq!(employee(Some(" ")).display_name(), "Petrenko Ivan");
    }

    #[test]
    fn session_rejects_other_company() {
        let session = Session {
            account_id: 1,
            company_id: 10,
            is_admin: true,
            employee_id: None,
            display_name: ADMIN_DISPLAY_NAME.into(),
        };
        assert!(session.ensure_company(10).is_ok());
        assert!(matches!(session.ensure_company(11), Err(AppError::Forbidden)));
        assert!(matches!(session.employee_id(), Err(AppError::Forbidden)));
    }

    #[test]
    fn register_payload_requires_all_fields() {
        let payload = RegisterPayload {
            company_name: "".into(),
            phone: "111".into(),
            password: "".into(),
        };
        let errors = payload.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("company_name"));
        assert!(fields.contains_key("password"));
        assert!(!fields.contains_key("phone"));
    }
}
