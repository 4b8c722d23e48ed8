// src/services/catalog_service.rs

use sqlx::PgPool;

use crate::{
    common::error::AppError,
    db::CatalogRepository,
    models::{
        catalog::{CatalogItem, CatalogKind},
        identity::Session,
    },
};

#[derive(Clone)]
pub struct CatalogService {
    repo: CatalogRepository,
    pool: PgPool,
}

impl CatalogService {
    pub fn new(repo: CatalogRepository, pool: PgPool) -> Self {
        Self { repo, pool }
    }

    pub async fn create(&self, kind: CatalogKind, company_id: i64, name: &str) -> Result<CatalogItem, AppError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::MissingParameter("name"));
        }
        let item = self.repo.create_item(&self.pool, kind, company_id, name).await?;
        tracing::info!(catalog = kind.table(), id = item.id, company_id, "Item de catálogo criado");
        Ok(item)
    }

    pub async fn list(&self, kind: CatalogKind, company_id: i64) -> Result<Vec<CatalogItem>, AppError> {
        self.repo.list(kind, company_id).await
    }

    /// Remove o item e os vínculos com operações.
    pub async fn delete(&self, session: &Session, kind: CatalogKind, id: i64) -> Result<(), AppError> {
        let item = self
            .repo
            .find(kind, id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound(format!("{} {id}", kind.table())))?;
        session.ensure_company(item.company_id)?;

        let mut tx = self.pool.begin().await?;
        let links = self.repo.delete_links(&mut *tx, kind, id).await?;
        self.repo.delete_item(&mut *tx, kind, id).await?;
        tx.commit().await?;

        tracing::info!(catalog = kind.table(), id, links, "Item de catálogo excluído");
        Ok(())
    }

    /// Confere que todos os ids existem e são da empresa.
    pub async fn ensure_owned<'e, E>(
        &self,
        executor: E,
        kind: CatalogKind,
        company_id: i64,
        ids: &[i64],
    ) -> Result<(), AppError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        if ids.is_empty() {
            return Ok(());
        }
        let mut unique = ids.to_vec();
        unique.sort_unstable();
        unique.dedup();

        let found = self.repo.count_owned(executor, kind, company_id, &unique).await?;
        if found != unique.len() as i64 {
            return Err(AppError::InvalidInput(format!(
                "{} inexistente ou de outra empresa",
                kind.table()
            )));
        }
        Ok(())
    }
}
