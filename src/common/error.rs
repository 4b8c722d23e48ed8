// src/common/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

use crate::{
    common::i18n::I18nStore,
    middleware::i18n::Locale,
    models::{
        operation::ComponentRef,
        task::{BlockingTask, TaskStatus},
    },
};

// Nosso tipo de erro, com `thiserror` para melhor ergonomia.
#[derive(Debug, Error)]
pub enum AppError {
    // --- Validação (culpa do cliente, sem retry) ---
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Entrada inválida: {0}")]
    InvalidInput(String),

    #[error("Parâmetro ausente: {0}")]
    MissingParameter(&'static str),

    // --- Duplicidade ---
    #[error("Empresa já existe")]
    DuplicateCompanyName,

    #[error("Login já existe")]
    DuplicateLogin,

    #[error("Produto já existe")]
    DuplicateProductName,

    #[error("Nome já existe: {0}")]
    DuplicateName(String),

    // --- Não encontrado ---
    #[error("Recurso não encontrado: {0}")]
    ResourceNotFound(String),

    #[error("Componente não encontrado: {0}")]
    ComponentNotFound(ComponentRef),

    // --- Autorização ---
    #[error("Credenciais inválidas")]
    InvalidCredentials,

    #[error("Token inválido")]
    InvalidToken,

    #[error("Acesso negado")]
    Forbidden,

    // --- Conflitos do fluxo de tarefas ---
    #[error("Transição inválida: {action} a partir de {from:?}")]
    InvalidTransition {
        from: TaskStatus,
        action: &'static str,
    },

    #[error("Funcionário já possui a tarefa aberta {0}")]
    ActiveTaskExists(i64),

    #[error("Produto {0} está em uso")]
    ProductInUse(i64),

    #[error("Tarefa {} bloqueia o funcionário", .0.task_id)]
    TaskRequired(BlockingTask),

    #[error("Operação {0} possui tarefas")]
    OperationInUse(i64),

    #[error("Funcionário {0} possui tarefas abertas")]
    EmployeeHasOpenTasks(i64),

    // --- Infraestrutura ---
    #[error("Erro de banco de dados: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Erro no armazenamento de arquivos: {0}")]
    BlobStoreError(#[from] std::io::Error),

    #[error("Erro de upload: {0}")]
    MultipartError(#[from] axum::extract::multipart::MultipartError),

    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de Bcrypt: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

impl AppError {
    /// Código estável usado como chave no catálogo de mensagens.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::InvalidInput(_) => "INVALID_INPUT",
            AppError::MissingParameter(_) => "MISSING_PARAMETER",
            AppError::DuplicateCompanyName => "DUPLICATE_COMPANY_NAME",
            AppError::DuplicateLogin => "DUPLICATE_LOGIN",
            AppError::DuplicateProductName => "DUPLICATE_PRODUCT_NAME",
            AppError::DuplicateName(_) => "DUPLICATE_NAME",
            AppError::ResourceNotFound(_) => "RESOURCE_NOT_FOUND",
            AppError::ComponentNotFound(_) => "COMPONENT_NOT_FOUND",
            AppError::InvalidCredentials => "INVALID_CREDENTIALS",
            AppError::InvalidToken => "INVALID_TOKEN",
            AppError::Forbidden => "FORBIDDEN",
            AppError::InvalidTransition { .. } => "INVALID_TRANSITION",
            AppError::ActiveTaskExists(_) => "ACTIVE_TASK_EXISTS",
            AppError::ProductInUse(_) => "PRODUCT_IN_USE",
            AppError::TaskRequired(_) => "TASK_REQUIRED",
            AppError::OperationInUse(_) => "OPERATION_IN_USE",
            AppError::EmployeeHasOpenTasks(_) => "EMPLOYEE_HAS_OPEN_TASKS",
            AppError::DatabaseError(e) if is_transient(e) => "STORE_UNAVAILABLE",
            AppError::MultipartError(_) => "INVALID_UPLOAD",
            _ => "INTERNAL_SERVER_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_)
            | AppError::InvalidInput(_)
            | AppError::MissingParameter(_)
            | AppError::MultipartError(_) => StatusCode::BAD_REQUEST,

            AppError::DuplicateCompanyName
            | AppError::DuplicateLogin
            | AppError::DuplicateProductName
            | AppError::DuplicateName(_)
            | AppError::InvalidTransition { .. }
            | AppError::ActiveTaskExists(_)
            | AppError::ProductInUse(_)
            | AppError::OperationInUse(_)
            | AppError::TaskRequired(_)
            | AppError::EmployeeHasOpenTasks(_) => StatusCode::CONFLICT,

            AppError::ResourceNotFound(_) | AppError::ComponentNotFound(_) => StatusCode::NOT_FOUND,

            AppError::InvalidCredentials | AppError::InvalidToken => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,

            AppError::DatabaseError(e) if is_transient(e) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Argumentos posicionais interpolados na mensagem traduzida ({0}, {1}).
    fn message_args(&self) -> Vec<String> {
        match self {
            AppError::InvalidInput(reason) => vec![reason.clone()],
            AppError::MissingParameter(name) => vec![name.to_string()],
            AppError::DuplicateName(name) => vec![name.clone()],
            AppError::ResourceNotFound(what) => vec![what.clone()],
            AppError::ComponentNotFound(component) => vec![component.to_string()],
            AppError::InvalidTransition { from, action } => {
                vec![action.to_string(), from.label().to_string()]
            }
            AppError::ActiveTaskExists(id)
            | AppError::ProductInUse(id)
            | AppError::OperationInUse(id)
            | AppError::EmployeeHasOpenTasks(id) => vec![id.to_string()],
            AppError::TaskRequired(blocking) => vec![blocking.task_id.to_string()],
            _ => vec![],
        }
    }

    fn details(&self) -> Option<Value> {
        match self {
            AppError::ValidationError(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .map(|e| {
                            e.message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| e.code.to_string())
                        })
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                Some(json!(details))
            }
            AppError::ActiveTaskExists(task_id) => Some(json!({ "taskId": task_id })),
            AppError::TaskRequired(blocking) => Some(json!(blocking)),
            _ => None,
        }
    }

    /// Converte o erro de domínio na resposta HTTP traduzida.
    pub fn to_api_error(&self, locale: &Locale, i18n: &I18nStore) -> ApiError {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(code = self.code(), "Erro Interno do Servidor: {}", self);
        }

        ApiError {
            status,
            error: i18n.translate(&locale.0, self.code(), &self.message_args()),
            details: self.details(),
        }
    }
}

/// Erros de conectividade/bloqueio que merecem uma nova tentativa.
pub fn is_transient(error: &sqlx::Error) -> bool {
    match error {
        sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::Tls(_) => true,
        sqlx::Error::Database(db_err) => matches!(
            db_err.code().as_deref(),
            // serialization_failure, deadlock_detected, lock_not_available
            Some("40001") | Some("40P01") | Some("55P03")
        ),
        _ => false,
    }
}

/// Nome da constraint única violada, se for o caso.
pub fn unique_violation(error: &sqlx::Error) -> Option<&str> {
    match error {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => db_err.constraint(),
        _ => None,
    }
}

/// Nome obrigatório, sem espaços nas pontas.
pub fn required_name(name: &str) -> Result<&str, AppError> {
    let name = name.trim();
    if name.is_empty() {
        Err(AppError::MissingParameter("name"))
    } else {
        Ok(name)
    }
}

// A resposta de erro que sai na API.
#[derive(Debug, Serialize)]
pub struct ApiError {
    #[serde(skip)]
    pub status: StatusCode,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status;
        (status, Json(self)).into_response()
    }
}

// Fallback sem idioma (usado por middlewares que não têm o Locale).
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.to_api_error(&Locale::default(), &I18nStore::default())
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workflow_conflicts_map_to_409() {
        let err = AppError::InvalidTransition {
            from: TaskStatus::Done,
            action: "finish",
        };
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(err.code(), "INVALID_TRANSITION");
        assert_eq!(AppError::ActiveTaskExists(3).status(), StatusCode::CONFLICT);
    }

    #[test]
    fn authorization_errors_do_not_leak_detail() {
        let api = AppError::InvalidCredentials
            .to_api_error(&Locale("en".into()), &I18nStore::default());
        assert_eq!(api.status, StatusCode::UNAUTHORIZED);
        assert!(!api.error.to_lowercase().contains("password is wrong"));
        assert!(api.details.is_none());
        assert_eq!(AppError::Forbidden.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn blank_names_are_missing() {
        assert!(matches!(required_name("   "), Err(AppError::MissingParameter("name"))));
        assert_eq!(required_name("  Bloco A ").unwrap(), "Bloco A");
    }

    #[test]
    fn pool_timeout_is_transient_and_surfaces_as_503() {
        let err = AppError::DatabaseError(sqlx::Error::PoolTimedOut);
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.code(), "STORE_UNAVAILABLE");
        assert!(!is_transient(&sqlx::Error::RowNotFound));
    }

    #[test]
    fn active_task_conflict_carries_task_id() {
        let api = AppError::ActiveTaskExists(42)
            .to_api_error(&Locale("en".into()), &I18nStore::default());
        assert_eq!(api.details, Some(json!({ "taskId": 42 })));
        assert!(api.error.contains("42"));
    }

    #[test]
    fn task_required_points_to_the_blocking_screen() {
        let err = AppError::TaskRequired(BlockingTask {
            task_id: 7,
            screen: crate::models::task::BlockingScreen::Alarm,
        });
        let api = err.to_api_error(&Locale("uk".into()), &I18nStore::default());
        assert_eq!(api.status, StatusCode::CONFLICT);
        assert_eq!(api.details, Some(json!({ "taskId": 7, "screen": "alarm" })));
    }
}
