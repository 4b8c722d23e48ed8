// src/handlers/catalogs.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use validator::Validate;

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
        catalog::{CatalogItem, CatalogKind},
        product::NamePayload,
    },
};

fn parse_kind(raw: &str) -> Result<CatalogKind, AppError> {
    raw.parse().map_err(AppError::InvalidInput)
}

// POST /api/admin/catalogs/{kind}
#[utoipa::path(
    post,
    path = "/api/admin/catalogs/{kind}",
    tag = "Catalogs",
    params(("kind" = String, Path, description = "locations | materials | tools")),
    request_body = NamePayload,
    responses(
        (status = 201, description = "Item criado", body = CatalogItem),
        (status = 400, description = "Catálogo ou nome inválido"),
        (status = 409, description = "Nome já existe na empresa")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_item(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequireRole<AdminRole>,
    Path(kind): Path<String>,
    Json(payload): Json<NamePayload>,
) -> Result<impl IntoResponse, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale, &app_state.i18n_store);

    let kind = parse_kind(&kind).map_err(to_api)?;
    payload.validate().map_err(|e| to_api(e.into()))?;

    let item = app_state
        .catalog_service
        .create(kind, tenant.0, &payload.name)
        .await
        .map_err(to_api)?;

    Ok((StatusCode::CREATED, Json(item)))
}

// GET /api/admin/catalogs/{kind}
#[utoipa::path(
    get,
    path = "/api/admin/catalogs/{kind}",
    tag = "Catalogs",
    params(("kind" = String, Path, description = "locations | materials | tools")),
    responses((status = 200, description = "Itens do catálogo, por nome", body = Vec<CatalogItem>)),
    security(("api_jwt" = []))
)]
pub async fn list_items(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequireRole<AdminRole>,
    Path(kind): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale, &app_state.i18n_store);

    let kind = parse_kind(&kind).map_err(to_api)?;
    let items = app_state
        .catalog_service
        .list(kind, tenant.0)
        .await
        .map_err(to_api)?;

    Ok(Json(items))
}

// DELETE /api/admin/catalogs/{kind}/{id}
#[utoipa::path(
    delete,
    path = "/api/admin/catalogs/{kind}/{id}",
    tag = "Catalogs",
    params(
        ("kind" = String, Path, description = "locations | materials | tools"),
        ("id" = i64, Path, description = "ID do item")
    ),
    responses(
        (status = 204, description = "Item e vínculos com operações removidos"),
        (status = 404, description = "Item não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_item(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(session): AuthenticatedUser,
    _guard: RequireRole<AdminRole>,
    Path((kind, id)): Path<(String, i64)>,
) -> Result<impl IntoResponse, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale, &app_state.i18n_store);

    let kind = parse_kind(&kind).map_err(to_api)?;
    app_state
        .catalog_service
        .delete(&session, kind, id)
        .await
        .map_err(to_api)?;

    Ok(StatusCode::NO_CONTENT)
}
