// src/handlers/tasks.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    handlers::operations::{file_response, parse_category},
    middleware::{
        auth::AuthenticatedUser,
        i18n::Locale,
        rbac::{AdminRole, EmployeeRole, RequireRole},
        tenancy::TenantContext,
    },
    models::{
        operation::OperationDetail,
        task::{
            ActiveAlarm, AdminTask, AdminTaskBoard, AdminTaskQuery, Alarm, AssignTaskPayload,
            EmployeeHome, RaiseAlarmPayload, Task,
        },
    },
};

// =========================================================================
//  ADMIN
// =========================================================================

// POST /api/admin/admin-tasks?adminTaskId=&productId=
#[utoipa::path(
    post,
    path = "/api/admin/admin-tasks",
    tag = "Tasks",
    params(AdminTaskQuery),
    responses(
        (status = 200, description = "aTask existente ou recém-criado", body = AdminTask),
        (status = 400, description = "Nenhum parâmetro informado"),
        (status = 404, description = "aTask ou produto não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_or_create_admin_task(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(session): AuthenticatedUser,
    _guard: RequireRole<AdminRole>,
    Query(query): Query<AdminTaskQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let admin_task = app_state
        .task_service
        .get_or_create_admin_task(&session, query.admin_task_id, query.product_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(admin_task))
}

// GET /api/admin/admin-tasks
#[utoipa::path(
    get,
    path = "/api/admin/admin-tasks",
    tag = "Tasks",
    responses((status = 200, description = "aTasks da empresa", body = Vec<AdminTask>)),
    security(("api_jwt" = []))
)]
pub async fn list_admin_tasks(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequireRole<AdminRole>,
) -> Result<impl IntoResponse, ApiError> {
    let admin_tasks = app_state
        .task_service
        .list_admin_tasks(tenant.0)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(admin_tasks))
}

// GET /api/admin/admin-tasks/{admin_task_id}
#[utoipa::path(
    get,
    path = "/api/admin/admin-tasks/{admin_task_id}",
    tag = "Tasks",
    params(("admin_task_id" = i64, Path, description = "ID do aTask")),
    responses(
        (status = 200, description = "aTask com todas as suas tarefas", body = AdminTaskBoard),
        (status = 404, description = "aTask não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn admin_task_board(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(session): AuthenticatedUser,
    _guard: RequireRole<AdminRole>,
    Path(admin_task_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let board = app_state
        .task_service
        .board(&session, admin_task_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(board))
}

// DELETE /api/admin/admin-tasks/{admin_task_id}
#[utoipa::path(
    delete,
    path = "/api/admin/admin-tasks/{admin_task_id}",
    tag = "Tasks",
    params(("admin_task_id" = i64, Path, description = "ID do aTask")),
    responses(
        (status = 204, description = "aTask, tarefas e alarmes removidos"),
        (status = 404, description = "aTask não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_admin_task(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(session): AuthenticatedUser,
    _guard: RequireRole<AdminRole>,
    Path(admin_task_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .task_service
        .delete_admin_task(&session, admin_task_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}

// POST /api/admin/tasks
#[utoipa::path(
    post,
    path = "/api/admin/tasks",
    tag = "Tasks",
    request_body = AssignTaskPayload,
    responses(
        (status = 200, description = "Tarefa criada ou responsável trocado", body = Task),
        (status = 400, description = "Componente ou operação fora do produto do aTask"),
        (status = 404, description = "aTask, operação ou funcionário não encontrado"),
        (status = 409, description = "Funcionário já possui tarefa aberta")
    ),
    security(("api_jwt" = []))
)]
pub async fn assign_task(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(session): AuthenticatedUser,
    _guard: RequireRole<AdminRole>,
    Json(payload): Json<AssignTaskPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let task = app_state
        .task_service
        .assign_task(&session, payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(task))
}

// GET /api/admin/alarms
#[utoipa::path(
    get,
    path = "/api/admin/alarms",
    tag = "Tasks",
    responses((status = 200, description = "Alarmes ativos da empresa", body = Vec<ActiveAlarm>)),
    security(("api_jwt" = []))
)]
pub async fn list_active_alarms(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequireRole<AdminRole>,
) -> Result<impl IntoResponse, ApiError> {
    let alarms = app_state
        .task_service
        .active_alarms(tenant.0)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(alarms))
}

// POST /api/admin/tasks/{task_id}/resolve-alarm
#[utoipa::path(
    post,
    path = "/api/admin/tasks/{task_id}/resolve-alarm",
    tag = "Tasks",
    params(("task_id" = i64, Path, description = "ID da tarefa")),
    responses(
        (status = 200, description = "Tarefa de volta ao trabalho (ou inalterada)", body = Task),
        (status = 404, description = "Tarefa não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn admin_resolve_alarm(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(session): AuthenticatedUser,
    _guard: RequireRole<AdminRole>,
    Path(task_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let task = app_state
        .task_service
        .resolve_alarm(&session, task_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(task))
}

// =========================================================================
//  FUNCIONÁRIO
// =========================================================================

// GET /api/employee/home
#[utoipa::path(
    get,
    path = "/api/employee/home",
    tag = "Employee tasks",
    responses(
        (status = 200, description = "Redirecionamento para a tarefa aberta ou lista de tarefas", body = EmployeeHome)
    ),
    security(("api_jwt" = []))
)]
pub async fn employee_home(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(session): AuthenticatedUser,
    _guard: RequireRole<EmployeeRole>,
) -> Result<impl IntoResponse, ApiError> {
    let home = app_state
        .task_service
        .employee_home(&session)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(home))
}

// POST /api/employee/tasks/{task_id}/start
#[utoipa::path(
    post,
    path = "/api/employee/tasks/{task_id}/start",
    tag = "Employee tasks",
    params(("task_id" = i64, Path, description = "ID da tarefa")),
    responses(
        (status = 200, description = "Tarefa em trabalho", body = Task),
        (status = 409, description = "Transição inválida ou outra tarefa aberta")
    ),
    security(("api_jwt" = []))
)]
pub async fn start_task(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(session): AuthenticatedUser,
    _guard: RequireRole<EmployeeRole>,
    Path(task_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let task = app_state
        .task_service
        .start(&session, task_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(task))
}

// POST /api/employee/tasks/{task_id}/finish
#[utoipa::path(
    post,
    path = "/api/employee/tasks/{task_id}/finish",
    tag = "Employee tasks",
    params(("task_id" = i64, Path, description = "ID da tarefa")),
    responses(
        (status = 200, description = "Tarefa concluída", body = Task),
        (status = 409, description = "Transição inválida")
    ),
    security(("api_jwt" = []))
)]
pub async fn finish_task(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(session): AuthenticatedUser,
    _guard: RequireRole<EmployeeRole>,
    Path(task_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let task = app_state
        .task_service
        .finish(&session, task_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(task))
}

// POST /api/employee/tasks/{task_id}/alarm
#[utoipa::path(
    post,
    path = "/api/employee/tasks/{task_id}/alarm",
    tag = "Employee tasks",
    params(("task_id" = i64, Path, description = "ID da tarefa")),
    request_body = RaiseAlarmPayload,
    responses(
        (status = 201, description = "Alarme registrado", body = Alarm),
        (status = 400, description = "Texto ausente"),
        (status = 409, description = "Transição inválida")
    ),
    security(("api_jwt" = []))
)]
pub async fn raise_alarm(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(session): AuthenticatedUser,
    _guard: RequireRole<EmployeeRole>,
    Path(task_id): Path<i64>,
    Json(payload): Json<RaiseAlarmPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale, &app_state.i18n_store);

    payload.validate().map_err(|e| to_api(e.into()))?;
    let alarm = app_state
        .task_service
        .raise_alarm(&session, task_id, &payload.text)
        .await
        .map_err(to_api)?;

    Ok((StatusCode::CREATED, Json(alarm)))
}

// POST /api/employee/tasks/{task_id}/resolve-alarm
#[utoipa::path(
    post,
    path = "/api/employee/tasks/{task_id}/resolve-alarm",
    tag = "Employee tasks",
    params(("task_id" = i64, Path, description = "ID da tarefa")),
    responses(
        (status = 200, description = "Tarefa de volta ao trabalho (ou inalterada)", body = Task),
        (status = 403, description = "Tarefa de outro funcionário")
    ),
    security(("api_jwt" = []))
)]
pub async fn resolve_alarm(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(session): AuthenticatedUser,
    _guard: RequireRole<EmployeeRole>,
    Path(task_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let task = app_state
        .task_service
        .resolve_alarm(&session, task_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(task))
}

// GET /api/employee/tasks/{task_id}/instruction
#[utoipa::path(
    get,
    path = "/api/employee/tasks/{task_id}/instruction",
    tag = "Employee tasks",
    params(("task_id" = i64, Path, description = "ID da tarefa")),
    responses(
        (status = 200, description = "Operação da tarefa com a instrução", body = OperationDetail),
        (status = 404, description = "Tarefa não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn task_instruction(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(session): AuthenticatedUser,
    _guard: RequireRole<EmployeeRole>,
    Path(task_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let detail = app_state
        .task_service
        .task_instruction(&session, task_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(detail))
}

// GET /api/employee/tasks/{task_id}/files/{category}/{file_name}
#[utoipa::path(
    get,
    path = "/api/employee/tasks/{task_id}/files/{category}/{file_name}",
    tag = "Employee tasks",
    params(
        ("task_id" = i64, Path, description = "ID da tarefa"),
        ("category" = String, Path, description = "photo | video | text"),
        ("file_name" = String, Path, description = "Nome do arquivo")
    ),
    responses(
        (status = 200, description = "Conteúdo do arquivo", content_type = "application/octet-stream"),
        (status = 404, description = "Arquivo não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn task_instruction_file(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(session): AuthenticatedUser,
    _guard: RequireRole<EmployeeRole>,
    Path((task_id, category, file_name)): Path<(i64, String, String)>,
) -> Result<Response, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale, &app_state.i18n_store);

    let category = parse_category(&category).map_err(to_api)?;
    let bytes = app_state
        .task_service
        .task_instruction_file(&session, task_id, category, &file_name)
        .await
        .map_err(to_api)?;

    Ok(file_response(&file_name, bytes))
}
