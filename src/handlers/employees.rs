// src/handlers/employees.rs

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        i18n::Locale,
        rbac::{AdminRole, RequireRole},
        tenancy::TenantContext,
    },
    models::{
        identity::{Employee, NewEmployee},
        operation::UploadedFile,
    },
};

/// Campos de texto + foto opcional do formulário de funcionário.
async fn read_employee_form(mut multipart: Multipart) -> Result<(NewEmployee, Option<UploadedFile>), AppError> {
    let mut payload = NewEmployee::default();
    let mut photo = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();

        if name == "photo" {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let bytes = field.bytes().await?;
            if !file_name.is_empty() && !bytes.is_empty() {
                photo = Some(UploadedFile { file_name, bytes: bytes.to_vec() });
            }
            continue;
        }

        let value = field.text().await?;
        let value = value.trim().to_string();
        match name.as_str() {
            "name" => payload.name = value,
            "surname" => payload.surname = value,
            "middleName" | "middle_name" => {
                payload.middle_name = Some(value).filter(|v| !v.is_empty())
            }
            "phoneNumber" | "phone_number" => payload.phone_number = value,
            "password" => payload.password = value,
            other => tracing::debug!(field = other, "Campo desconhecido ignorado"),
        }
    }

    Ok((payload, photo))
}

// POST /api/admin/employees
#[utoipa::path(
    post,
    path = "/api/admin/employees",
    tag = "Employees",
    request_body(content_type = "multipart/form-data", description = "name, surname, middleName?, phoneNumber, password, photo?"),
    responses(
        (status = 201, description = "Funcionário e conta criados", body = Employee),
        (status = 400, description = "Campos inválidos"),
        (status = 409, description = "Login já existe")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_employee(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequireRole<AdminRole>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale, &app_state.i18n_store);

    let (payload, photo) = read_employee_form(multipart).await.map_err(to_api)?;
    let employee = app_state
        .employee_service
        .create(tenant.0, payload, photo)
        .await
        .map_err(to_api)?;

    Ok((StatusCode::CREATED, Json(employee)))
}

// GET /api/admin/employees
#[utoipa::path(
    get,
    path = "/api/admin/employees",
    tag = "Employees",
    responses((status = 200, description = "Funcionários da empresa", body = Vec<Employee>)),
    security(("api_jwt" = []))
)]
pub async fn list_employees(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequireRole<AdminRole>,
) -> Result<impl IntoResponse, ApiError> {
    let employees = app_state
        .employee_service
        .list(tenant.0)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(employees))
}

// DELETE /api/admin/employees/{employee_id}
#[utoipa::path(
    delete,
    path = "/api/admin/employees/{employee_id}",
    tag = "Employees",
    params(("employee_id" = i64, Path, description = "ID do funcionário")),
    responses(
        (status = 204, description = "Funcionário, conta e foto removidos"),
        (status = 404, description = "Funcionário não encontrado"),
        (status = 409, description = "Funcionário com tarefas não concluídas")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_employee(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(session): AuthenticatedUser,
    _guard: RequireRole<AdminRole>,
    Path(employee_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .employee_service
        .delete(&session, employee_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}
