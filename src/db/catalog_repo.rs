// src/db/catalog_repo.rs

use sqlx::{Executor, PgPool, Postgres};

use crate::{
    common::error::{unique_violation, AppError},
    models::catalog::{CatalogItem, CatalogKind},
};

// As três tabelas têm o mesmo formato; o nome vem sempre de `CatalogKind`, nunca do cliente.
#[derive(Clone)]
pub struct CatalogRepository {
    pool: PgPool,
}

impl CatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_item<'e, E>(
        &self,
        executor: E,
        kind: CatalogKind,
        company_id: i64,
        name: &str,
    ) -> Result<CatalogItem, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            "INSERT INTO {} (name, company_id) VALUES ($1, $2) RETURNING id, name, company_id",
            kind.table()
        );
        sqlx::query_as::<_, CatalogItem>(&sql)
            .bind(name)
            .bind(company_id)
            .fetch_one(executor)
            .await
            .map_err(|e| match unique_violation(&e) {
                Some(_) => AppError::DuplicateName(name.to_string()),
                None => e.into(),
            })
    }

    pub async fn list(&self, kind: CatalogKind, company_id: i64) -> Result<Vec<CatalogItem>, AppError> {
        let sql = format!(
            "SELECT id, name, company_id FROM {} WHERE company_id = $1 ORDER BY name",
            kind.table()
        );
        let items = sqlx::query_as::<_, CatalogItem>(&sql)
            .bind(company_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(items)
    }

    pub async fn find(&self, kind: CatalogKind, id: i64) -> Result<Option<CatalogItem>, AppError> {
        let sql = format!("SELECT id, name, company_id FROM {} WHERE id = $1", kind.table());
        let item = sqlx::query_as::<_, CatalogItem>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(item)
    }

    /// Quantos dos `ids` existem e pertencem à empresa.
    pub async fn count_owned<'e, E>(
        &self,
        executor: E,
        kind: CatalogKind,
        company_id: i64,
        ids: &[i64],
    ) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            "SELECT COUNT(*) FROM {} WHERE company_id = $1 AND id = ANY($2)",
            kind.table()
        );
        let count = sqlx::query_scalar::<_, i64>(&sql)
            .bind(company_id)
            .bind(ids)
            .fetch_one(executor)
            .await?;
        Ok(count)
    }

    pub async fn delete_links<'e, E>(&self, executor: E, kind: CatalogKind, id: i64) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let (table, column) = kind.link_table();
        let sql = format!("DELETE FROM {table} WHERE {column} = $1");
        let result = sqlx::query(&sql).bind(id).execute(executor).await?;
        Ok(result.rows_affected())
    }

    pub async fn delete_item<'e, E>(&self, executor: E, kind: CatalogKind, id: i64) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!("DELETE FROM {} WHERE id = $1", kind.table());
        let result = sqlx::query(&sql).bind(id).execute(executor).await?;
        Ok(result.rows_affected())
    }
}
