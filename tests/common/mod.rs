// tests/common/mod.rs

#![allow(dead_code)]

use std::sync::Arc;

use sqlx::PgPool;
use tempfile::TempDir;

use shopfloor::{
    common::blob_store::FsBlobStore,
    config::{AppState, Config},
    models::{
        identity::{Employee, NewEmployee, Session},
        operation::{ComponentRef, InstructionUploads, NewOperation, Operation, OperationLinks, UploadedFile},
        product::{Block, Detail, Product},
    },
};

pub const PASSWORD: &str = "segredo-123";

/// Estado completo sobre a base do `#[sqlx::test]` e um diretório de blobs temporário.
pub struct Harness {
    pub state: AppState,
    pub blobs: TempDir,
}

pub fn harness(pool: PgPool) -> Harness {
    let blobs = tempfile::tempdir().unwrap();
    let config = Config {
        database_url: String::new(),
        jwt_secret: "scenario-secret".into(),
        bind_addr: "127.0.0.1:0".into(),
        blob_root: blobs.path().display().to_string(),
        db_max_connections: 5,
        db_acquire_timeout: std::time::Duration::from_secs(3),
        token_ttl: chrono::Duration::hours(1),
    };
    let store = Arc::new(FsBlobStore::new(blobs.path()));
    Harness {
        state: AppState::from_parts(pool, config, store),
        blobs,
    }
}

impl Harness {
    pub async fn admin(&self, company: &str, phone: &str) -> Session {
        self.state
            .auth_service
            .register(company, phone, PASSWORD)
            .await
            .unwrap();
        self.login(phone).await
    }

    pub async fn login(&self, login: &str) -> Session {
        let (_token, session) = self
            .state
            .auth_service
            .authenticate(login, PASSWORD)
            .await
            .unwrap();
        session
    }

    pub async fn hire(&self, admin: &Session, phone: &str, photo: Option<UploadedFile>) -> (Employee, Session) {
        let payload = NewEmployee {
            name: "Ivan".into(),
            surname: "Petrenko".into(),
            middle_name: None,
            phone_number: phone.into(),
            password: PASSWORD.into(),
        };
        let employee = self
            .state
            .employee_service
            .create(admin.company_id, payload, photo)
            .await
            .unwrap();
        let session = self.login(phone).await;
        (employee, session)
    }

    /// Produto com um bloco e um detalhe.
    pub async fn product(&self, admin: &Session, name: &str) -> (Product, Block, Detail) {
        let products = &self.state.product_service;
        let product = products.create_product(admin.company_id, name).await.unwrap();
        let block = products.add_block(admin, product.id, "Bloco").await.unwrap();
        let detail = products.add_detail(admin, block.id, "Detalhe").await.unwrap();
        (product, block, detail)
    }

    pub async fn operation(&self, admin: &Session, component: ComponentRef, photos: &[&str]) -> Operation {
        let files = InstructionUploads {
            photos: photos.iter().map(|name| upload(name, b"img")).collect(),
            ..Default::default()
        };
        self.state
            .operation_service
            .create(
                admin,
                NewOperation {
                    name: "Soldagem".into(),
                    component,
                    links: OperationLinks::default(),
                    files,
                },
            )
            .await
            .unwrap()
    }

    pub async fn count(&self, sql: &str) -> i64 {
        sqlx::query_scalar(sql).fetch_one(&self.state.db_pool).await.unwrap()
    }
}

pub fn upload(name: &str, bytes: &[u8]) -> UploadedFile {
    UploadedFile { file_name: name.into(), bytes: bytes.to_vec() }
}
