// src/lib.rs

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod common;
pub mod config;
pub mod db;
pub mod docs;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use crate::{
    config::AppState,
    docs::ApiDoc,
    middleware::{auth::auth_guard, task_guard::task_required},
};

/// Monta todas as rotas da API sobre o estado já construído.
pub fn build_router(app_state: AppState) -> Router {
    // Rotas públicas
    let auth_routes = Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login));

    let session_routes = Router::new()
        .route("/me", get(handlers::auth::me))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let admin_routes = Router::new()
        .route("/employees"
               ,post(handlers::employees::create_employee)
               .get(handlers::employees::list_employees)
        )
        .route("/employees/{employee_id}", axum::routing::delete(handlers::employees::delete_employee))
        .route("/catalogs/{kind}"
               ,post(handlers::catalogs::create_item)
               .get(handlers::catalogs::list_items)
        )
        .route("/catalogs/{kind}/{id}", axum::routing::delete(handlers::catalogs::delete_item))
        .route("/products"
               ,post(handlers::products::create_product)
               .get(handlers::products::list_products)
        )
        .route("/products/{product_id}"
               ,get(handlers::products::product_tree)
               .delete(handlers::products::delete_product)
        )
        .route("/products/{product_id}/blocks", post(handlers::products::add_block))
        .route("/blocks/{block_id}/details", post(handlers::products::add_detail))
        .route("/components/{component}", get(handlers::products::resolve_component))
        .route("/components/{component}/dependency-candidates", get(handlers::products::dependency_candidates))
        .route("/components/{component}/operations", get(handlers::products::list_operations))
        .route("/operations", post(handlers::operations::create_operation))
        .route("/operations/{operation_id}"
               ,get(handlers::operations::operation_detail)
               .put(handlers::operations::update_operation)
               .delete(handlers::operations::delete_operation)
        )
        .route("/operations/{operation_id}/files/{category}/{file_name}", get(handlers::operations::instruction_file))
        .route("/admin-tasks"
               ,post(handlers::tasks::get_or_create_admin_task)
               .get(handlers::tasks::list_admin_tasks)
        )
        .route("/admin-tasks/{admin_task_id}"
               ,get(handlers::tasks::admin_task_board)
               .delete(handlers::tasks::delete_admin_task)
        )
        .route("/tasks", post(handlers::tasks::assign_task))
        .route("/tasks/{task_id}/resolve-alarm", post(handlers::tasks::admin_resolve_alarm))
        .route("/alarms", get(handlers::tasks::list_active_alarms))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    // Toda ação sobre uma tarefa passa pela guarda "uma tarefa aberta por vez"
    let employee_task_routes = Router::new()
        .route("/tasks/{task_id}/start", post(handlers::tasks::start_task))
        .route("/tasks/{task_id}/finish", post(handlers::tasks::finish_task))
        .route("/tasks/{task_id}/alarm", post(handlers::tasks::raise_alarm))
        .route("/tasks/{task_id}/resolve-alarm", post(handlers::tasks::resolve_alarm))
        .route("/tasks/{task_id}/instruction", get(handlers::tasks::task_instruction))
        .route("/tasks/{task_id}/files/{category}/{file_name}", get(handlers::tasks::task_instruction_file))
        .route_layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            task_required,
        ));

    let employee_routes = Router::new()
        .route("/home", get(handlers::tasks::employee_home))
        .merge(employee_task_routes)
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let notification_routes = Router::new()
        .route("/alarm", get(handlers::notifications::check_alarm))
        .route("/ws", get(handlers::notifications::alarm_socket))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api/auth", auth_routes.merge(session_routes))
        .nest("/api/admin", admin_routes)
        .nest("/api/employee", employee_routes)
        .nest("/api/notifications", notification_routes)
        .merge(SwaggerUi::new("/docs").url("/api/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    use super::*;
    use crate::{
        common::blob_store::FsBlobStore,
        config::Config,
        models::identity::Session,
        services::auth::TokenCodec,
    };

    const SECRET: &str = "router-test-secret";

    // A pool é preguiçosa: as rotas testadas aqui nunca chegam ao banco.
    fn test_router(blob_root: &std::path::Path) -> Router {
        let config = Config {
            database_url: "postgres://localhost:1/unused".into(),
            jwt_secret: SECRET.into(),
            bind_addr: "127.0.0.1:0".into(),
            blob_root: blob_root.display().to_string(),
            db_max_connections: 1,
            db_acquire_timeout: std::time::Duration::from_millis(200),
            token_ttl: chrono::Duration::hours(1),
        };
        let pool = PgPoolOptions::new()
            .acquire_timeout(config.db_acquire_timeout)
            .connect_lazy(&config.database_url)
            .unwrap();
        let blobs = Arc::new(FsBlobStore::new(blob_root));
        build_router(AppState::from_parts(pool, config, blobs))
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_is_public() {
        let dir = tempfile::tempdir().unwrap();
        let response = test_router(dir.path())
            .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"OK");
    }

    #[tokio::test]
    async fn protected_routes_require_a_token() {
        let dir = tempfile::tempdir().unwrap();
        let router = test_router(dir.path());

        for uri in ["/api/admin/products", "/api/employee/home", "/api/notifications/alarm", "/api/auth/me"] {
            let response = router
                .clone()
                .oneshot(Request::get(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
        }
    }

    #[tokio::test]
    async fn malformed_token_is_rejected_with_localized_message() {
        let dir = tempfile::tempdir().unwrap();
        let response = test_router(dir.path())
            .oneshot(
                Request::get("/api/admin/products")
                    .header(header::AUTHORIZATION, "Bearer not-a-jwt")
                    .header(header::ACCEPT_LANGUAGE, "uk-UA,uk;q=0.9")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let json = body_json(response).await;
        assert_eq!(json["error"], "Токен автентифікації недійсний або відсутній.");
    }

    #[tokio::test]
    async fn register_validates_before_touching_the_store() {
        let dir = tempfile::tempdir().unwrap();
        let response = test_router(dir.path())
            .oneshot(
                Request::post("/api/auth/register")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"companyName":"","phone":"111","password":""}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn openapi_document_is_served() {
        let dir = tempfile::tempdir().unwrap();
        let response = test_router(dir.path())
            .oneshot(Request::get("/api/openapi.json").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert!(json["paths"]["/api/admin/tasks"].is_object());
    }

    #[test]
    fn token_codec_matches_router_secret() {
        let codec = TokenCodec::new(SECRET, chrono::Duration::hours(1));
        let session = Session {
            account_id: 1,
            company_id: 1,
            is_admin: true,
            employee_id: None,
            display_name: "x".into(),
        };
        let token = codec.issue(&session).unwrap();
        assert_eq!(Session::from(&codec.decode(&token).unwrap()), session);
    }
}
