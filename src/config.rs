// src/config.rs

use std::{env, sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    common::{
        blob_store::{BlobStore, FsBlobStore},
        i18n::I18nStore,
    },
    db::{
        AccountRepository, CatalogRepository, CompanyRepository, EmployeeRepository,
        OperationRepository, ProductRepository, TaskRepository,
    },
    services::{
        auth::{AuthService, TokenCodec},
        catalog_service::CatalogService,
        employee_service::EmployeeService,
        notification::AlarmNotifier,
        operation_service::OperationService,
        product_service::ProductService,
        task_service::TaskService,
    },
};

/// Configuração lida do ambiente (com suporte a `.env`).
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub bind_addr: String,
    pub blob_root: String,
    pub db_max_connections: u32,
    pub db_acquire_timeout: Duration,
    pub token_ttl: chrono::Duration,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL deve ser definida")?,
            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET deve ser definido")?,
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            blob_root: env::var("BLOB_ROOT").unwrap_or_else(|_| "./storage".to_string()),
            db_max_connections: parse_var("DB_MAX_CONNECTIONS", 5)?,
            db_acquire_timeout: Duration::from_secs(parse_var("DB_ACQUIRE_TIMEOUT_SECS", 3)?),
            token_ttl: chrono::Duration::hours(parse_var("TOKEN_TTL_HOURS", 168)?),
        })
    }
}

fn parse_var<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{name} inválida: '{raw}'")),
        Err(_) => Ok(default),
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub config: Arc<Config>,
    pub i18n_store: I18nStore,
    pub blob_store: Arc<dyn BlobStore>,
    pub notifier: AlarmNotifier,

    pub auth_service: AuthService,
    pub employee_service: EmployeeService,
    pub catalog_service: CatalogService,
    pub product_service: ProductService,
    pub operation_service: OperationService,
    pub task_service: TaskService,
}

impl AppState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        // Conecta ao banco de dados, usando '?' para propagar erros
        let db_pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .acquire_timeout(config.db_acquire_timeout)
            .connect(&config.database_url)
            .await
            .context("Falha ao conectar ao banco de dados")?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        let blob_store: Arc<dyn BlobStore> = Arc::new(FsBlobStore::new(&config.blob_root));
        Ok(Self::from_parts(db_pool, config, blob_store))
    }

    /// Monta o gráfico de dependências sobre uma pool já criada.
    pub fn from_parts(db_pool: PgPool, config: Config, blob_store: Arc<dyn BlobStore>) -> Self {
        let notifier = AlarmNotifier::new();

        let account_repo = AccountRepository::new(db_pool.clone());
        let company_repo = CompanyRepository::new(db_pool.clone());
        let employee_repo = EmployeeRepository::new(db_pool.clone());
        let catalog_repo = CatalogRepository::new(db_pool.clone());
        let product_repo = ProductRepository::new(db_pool.clone());
        let operation_repo = OperationRepository::new(db_pool.clone());
        let task_repo = TaskRepository::new(db_pool.clone());

        let auth_service = AuthService::new(
            account_repo.clone(),
            company_repo,
            employee_repo.clone(),
            TokenCodec::new(config.jwt_secret.clone(), config.token_ttl),
            db_pool.clone(),
        );
        let employee_service = EmployeeService::new(
            employee_repo.clone(),
            account_repo,
            blob_store.clone(),
            db_pool.clone(),
        );
        let catalog_service = CatalogService::new(catalog_repo, db_pool.clone());
        let product_service = ProductService::new(product_repo.clone(), db_pool.clone());
        let operation_service = OperationService::new(
            operation_repo,
            product_repo,
            product_service.clone(),
            catalog_service.clone(),
            blob_store.clone(),
            db_pool.clone(),
        );
        let task_service = TaskService::new(
            task_repo,
            employee_repo,
            product_service.clone(),
            operation_service.clone(),
            notifier.clone(),
            db_pool.clone(),
        );

        Self {
            db_pool,
            config: Arc::new(config),
            i18n_store: I18nStore::new(),
            blob_store,
            notifier,
            auth_service,
            employee_service,
            catalog_service,
            product_service,
            operation_service,
            task_service,
        }
    }
}
