// src/handlers/products.rs

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
        operation::{ComponentDescriptor, ComponentRef, Operation},
        product::{Block, DeletedTree, Detail, NamePayload, Product, ProductTree},
    },
};

/// `"detail:12"` vindo da rota.
pub(crate) fn parse_component(raw: &str) -> Result<ComponentRef, AppError> {
    raw.parse().map_err(AppError::InvalidInput)
}

// POST /api/admin/products
#[utoipa::path(
    post,
    path = "/api/admin/products",
    tag = "Products",
    request_body = NamePayload,
    responses(
        (status = 201, description = "Produto criado", body = Product),
        (status = 409, description = "Produto já existe na empresa")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_product(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequireRole<AdminRole>,
    Json(payload): Json<NamePayload>,
) -> Result<impl IntoResponse, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale, &app_state.i18n_store);

    payload.validate().map_err(|e| to_api(e.into()))?;
    let product = app_state
        .product_service
        .create_product(tenant.0, &payload.name)
        .await
        .map_err(to_api)?;

    Ok((StatusCode::CREATED, Json(product)))
}

// GET /api/admin/products
#[utoipa::path(
    get,
    path = "/api/admin/products",
    tag = "Products",
    responses((status = 200, description = "Produtos da empresa", body = Vec<Product>)),
    security(("api_jwt" = []))
)]
pub async fn list_products(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequireRole<AdminRole>,
) -> Result<impl IntoResponse, ApiError> {
    let products = app_state
        .product_service
        .list_products(tenant.0)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(products))
}

// GET /api/admin/products/{product_id}
#[utoipa::path(
    get,
    path = "/api/admin/products/{product_id}",
    tag = "Products",
    params(("product_id" = i64, Path, description = "ID do produto")),
    responses(
        (status = 200, description = "Produto com blocos e detalhes", body = ProductTree),
        (status = 404, description = "Produto não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn product_tree(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(session): AuthenticatedUser,
    _guard: RequireRole<AdminRole>,
    Path(product_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let tree = app_state
        .product_service
        .tree(&session, product_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(tree))
}

// DELETE /api/admin/products/{product_id}
#[utoipa::path(
    delete,
    path = "/api/admin/products/{product_id}",
    tag = "Products",
    params(("product_id" = i64, Path, description = "ID do produto")),
    responses(
        (status = 200, description = "Linhas removidas por tabela", body = DeletedTree),
        (status = 404, description = "Produto não encontrado"),
        (status = 409, description = "Produto referenciado por operações ou aTasks")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_product(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(session): AuthenticatedUser,
    _guard: RequireRole<AdminRole>,
    Path(product_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let deleted = app_state
        .product_service
        .delete_product(&session, product_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(deleted))
}

// POST /api/admin/products/{product_id}/blocks
#[utoipa::path(
    post,
    path = "/api/admin/products/{product_id}/blocks",
    tag = "Products",
    params(("product_id" = i64, Path, description = "ID do produto")),
    request_body = NamePayload,
    responses(
        (status = 201, description = "Bloco criado", body = Block),
        (status = 404, description = "Produto não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn add_block(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(session): AuthenticatedUser,
    _guard: RequireRole<AdminRole>,
    Path(product_id): Path<i64>,
    Json(payload): Json<NamePayload>,
) -> Result<impl IntoResponse, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale, &app_state.i18n_store);

    payload.validate().map_err(|e| to_api(e.into()))?;
    let block = app_state
        .product_service
        .add_block(&session, product_id, &payload.name)
        .await
        .map_err(to_api)?;

    Ok((StatusCode::CREATED, Json(block)))
}

// POST /api/admin/blocks/{block_id}/details
#[utoipa::path(
    post,
    path = "/api/admin/blocks/{block_id}/details",
    tag = "Products",
    params(("block_id" = i64, Path, description = "ID do bloco")),
    request_body = NamePayload,
    responses(
        (status = 201, description = "Detalhe criado", body = Detail),
        (status = 404, description = "Bloco não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn add_detail(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(session): AuthenticatedUser,
    _guard: RequireRole<AdminRole>,
    Path(block_id): Path<i64>,
    Json(payload): Json<NamePayload>,
) -> Result<impl IntoResponse, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale, &app_state.i18n_store);

    payload.validate().map_err(|e| to_api(e.into()))?;
    let detail = app_state
        .product_service
        .add_detail(&session, block_id, &payload.name)
        .await
        .map_err(to_api)?;

    Ok((StatusCode::CREATED, Json(detail)))
}

// GET /api/admin/components/{component}
#[utoipa::path(
    get,
    path = "/api/admin/components/{component}",
    tag = "Products",
    params(("component" = String, Path, description = "tipo:id, ex.: detail:12")),
    responses(
        (status = 200, description = "Componente resolvido", body = ComponentDescriptor),
        (status = 404, description = "Componente não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn resolve_component(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(session): AuthenticatedUser,
    _guard: RequireRole<AdminRole>,
    Path(component): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale, &app_state.i18n_store);

    let component = parse_component(&component).map_err(to_api)?;
    let descriptor = app_state
        .product_service
        .resolve_component(&session, component)
        .await
        .map_err(to_api)?;

    Ok(Json(descriptor))
}

// GET /api/admin/components/{component}/dependency-candidates
#[utoipa::path(
    get,
    path = "/api/admin/components/{component}/dependency-candidates",
    tag = "Products",
    params(("component" = String, Path, description = "tipo:id, ex.: detail:12")),
    responses(
        (status = 200, description = "Nós irmãos do mesmo nível", body = Vec<ComponentDescriptor>),
        (status = 404, description = "Componente não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn dependency_candidates(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(session): AuthenticatedUser,
    _guard: RequireRole<AdminRole>,
    Path(component): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale, &app_state.i18n_store);

    let component = parse_component(&component).map_err(to_api)?;
    let candidates = app_state
        .product_service
        .dependency_candidates(&session, component)
        .await
        .map_err(to_api)?;

    Ok(Json(candidates))
}

// GET /api/admin/components/{component}/operations
#[utoipa::path(
    get,
    path = "/api/admin/components/{component}/operations",
    tag = "Products",
    params(("component" = String, Path, description = "tipo:id, ex.: detail:12")),
    responses(
        (status = 200, description = "Operações do componente", body = Vec<Operation>),
        (status = 404, description = "Componente não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_operations(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(session): AuthenticatedUser,
    _guard: RequireRole<AdminRole>,
    Path(component): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale, &app_state.i18n_store);

    let component = parse_component(&component).map_err(to_api)?;
    let operations = app_state
        .operation_service
        .list_for_component(&session, component)
        .await
        .map_err(to_api)?;

    Ok(Json(operations))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_path_segment_is_type_and_id() {
        assert_eq!(parse_component("block:4").unwrap(), ComponentRef::Block(4));
        assert!(matches!(parse_component("4"), Err(AppError::InvalidInput(_))));
    }
}
