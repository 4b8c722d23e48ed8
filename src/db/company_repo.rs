// src/db/company_repo.rs

use sqlx::{Executor, PgPool, Postgres};

use crate::{
    common::error::{unique_violation, AppError},
    models::identity::Company,
};

#[derive(Clone)]
pub struct CompanyRepository {
    pool: PgPool,
}

impl CompanyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn name_exists(&self, name: &str) -> Result<bool, AppError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM companies WHERE name = $1)",
        )
            .bind(name)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    pub async fn create_company<'e, E>(&self, executor: E, name: &str) -> Result<Company, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Company>(
            r#"
            INSERT INTO companies (name)
            VALUES ($1)
            RETURNING id, name, created_at
            "#,
        )
            .bind(name)
            .fetch_one(executor)
            .await
            .map_err(|e| match unique_violation(&e) {
                Some("companies_name_key") => AppError::DuplicateCompanyName,
                _ => e.into(),
            })
    }
}
