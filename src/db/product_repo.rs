// src/db/product_repo.rs

use sqlx::{Executor, PgPool, Postgres};

use crate::{
    common::error::{unique_violation, AppError},
    models::{
        operation::{ComponentDescriptor, ComponentKind, ComponentRef},
        product::{Block, Detail, Product},
    },
};

#[derive(Clone)]
pub struct ProductRepository {
    pool: PgPool,
}

impl ProductRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // --- Produtos ---

    pub async fn name_exists(&self, company_id: i64, name: &str) -> Result<bool, AppError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM products WHERE company_id = $1 AND name = $2)",
        )
            .bind(company_id)
            .bind(name)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    pub async fn create_product(&self, company_id: i64, name: &str) -> Result<Product, AppError> {
        sqlx::query_as::<_, Product>(
            "INSERT INTO products (name, company_id) VALUES ($1, $2) RETURNING *",
        )
            .bind(name)
            .bind(company_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match unique_violation(&e) {
                Some("products_company_name_key") => AppError::DuplicateProductName,
                _ => e.into(),
            })
    }

    pub async fn find_product(&self, id: i64) -> Result<Option<Product>, AppError> {
        let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(product)
    }

    pub async fn lock_product<'e, E>(&self, executor: E, id: i64) -> Result<Option<Product>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(product)
    }

    pub async fn list_products(&self, company_id: i64) -> Result<Vec<Product>, AppError> {
        let products = sqlx::query_as::<_, Product>(
            "SELECT * FROM products WHERE company_id = $1 ORDER BY name",
        )
            .bind(company_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(products)
    }

    // --- Blocos e detalhes ---

    pub async fn create_block(&self, product_id: i64, name: &str) -> Result<Block, AppError> {
        let block = sqlx::query_as::<_, Block>(
            "INSERT INTO blocks (name, product_id) VALUES ($1, $2) RETURNING *",
        )
            .bind(name)
            .bind(product_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(block)
    }

    pub async fn create_detail(&self, block_id: i64, name: &str) -> Result<Detail, AppError> {
        let detail = sqlx::query_as::<_, Detail>(
            "INSERT INTO details (name, block_id) VALUES ($1, $2) RETURNING *",
        )
            .bind(name)
            .bind(block_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(detail)
    }

    pub async fn list_blocks(&self, product_id: i64) -> Result<Vec<Block>, AppError> {
        let blocks = sqlx::query_as::<_, Block>(
            "SELECT * FROM blocks WHERE product_id = $1 ORDER BY id",
        )
            .bind(product_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(blocks)
    }

    pub async fn list_details_for_product(&self, product_id: i64) -> Result<Vec<Detail>, AppError> {
        let details = sqlx::query_as::<_, Detail>(
            r#"
            SELECT d.* FROM details d
            JOIN blocks b ON b.id = d.block_id
            WHERE b.product_id = $1
            ORDER BY d.id
            "#,
        )
            .bind(product_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(details)
    }

    // --- Referência polimórfica ---

    /// O único ponto que resolve (tipo, id) para um nó da hierarquia.
    pub async fn resolve_component<'e, E>(
        &self,
        executor: E,
        component: ComponentRef,
    ) -> Result<Option<ComponentDescriptor>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let descriptor = sqlx::query_as::<_, ComponentDescriptor>(
            r#"
            SELECT kind, id, name, product_id, parent_id, company_id
            FROM component_index
            WHERE kind = $1 AND id = $2
            "#,
        )
            .bind(component.kind())
            .bind(component.id())
            .fetch_optional(executor)
            .await?;
        Ok(descriptor)
    }

    /// Quantas das referências existem dentro da árvore do produto.
    pub async fn count_in_product<'e, E>(
        &self,
        executor: E,
        product_id: i64,
        refs: &[ComponentRef],
    ) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let (ids, kinds) = unzip_refs(refs);
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM UNNEST($2::BIGINT[], $3::TEXT[]) AS r(id, kind)
            JOIN component_index c
              ON c.id = r.id AND c.kind = r.kind::component_kind
            WHERE c.product_id = $1
            "#,
        )
            .bind(product_id)
            .bind(ids)
            .bind(kinds)
            .fetch_one(executor)
            .await?;
        Ok(count)
    }

    /// Irmãos no mesmo nível: outros blocos do produto ou outros detalhes do bloco.
    pub async fn siblings(&self, descriptor: &ComponentDescriptor) -> Result<Vec<ComponentDescriptor>, AppError> {
        let Some(parent_id) = descriptor.parent_id else {
            return Ok(Vec::new());
        };

        let siblings = sqlx::query_as::<_, ComponentDescriptor>(
            r#"
            SELECT kind, id, name, product_id, parent_id, company_id
            FROM component_index
            WHERE kind = $1 AND parent_id = $2 AND id <> $3
            ORDER BY id
            "#,
        )
            .bind(descriptor.kind)
            .bind(parent_id)
            .bind(descriptor.id)
            .fetch_all(&self.pool)
            .await?;
        Ok(siblings)
    }

    /// Verdadeiro se alguma operação está presa à árvore, alguma dependência aponta
    /// para um nó dela ou algum aTask aponta para o produto.
    pub async fn is_referenced<'e, E>(&self, executor: E, product_id: i64) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let referenced = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM operations o
                JOIN component_index c ON c.kind = o.component_kind AND c.id = o.component_id
                WHERE c.product_id = $1
            ) OR EXISTS (
                SELECT 1 FROM dependent_components dc
                JOIN component_index c ON c.kind = dc.component_kind AND c.id = dc.component_id
                WHERE c.product_id = $1
            ) OR EXISTS (
                SELECT 1 FROM admin_tasks WHERE product_id = $1
            )
            "#,
        )
            .bind(product_id)
            .fetch_one(executor)
            .await?;
        Ok(referenced)
    }

    pub async fn delete_details_of_product<'e, E>(&self, executor: E, product_id: i64) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            "DELETE FROM details WHERE block_id IN (SELECT id FROM blocks WHERE product_id = $1)",
        )
            .bind(product_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete_blocks_of_product<'e, E>(&self, executor: E, product_id: i64) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM blocks WHERE product_id = $1")
            .bind(product_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete_product<'e, E>(&self, executor: E, product_id: i64) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(product_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }
}

/// Separa as referências em dois arrays paralelos para `UNNEST`.
pub(crate) fn unzip_refs(refs: &[ComponentRef]) -> (Vec<i64>, Vec<String>) {
    refs.iter()
        .map(|r| (r.id(), sql_kind(r.kind()).to_string()))
        .unzip()
}

fn sql_kind(kind: ComponentKind) -> &'static str {
    match kind {
        ComponentKind::Product => "PRODUCT",
        ComponentKind::Block => "BLOCK",
        ComponentKind::Detail => "DETAIL",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unzip_keeps_pairs_aligned_with_enum_labels() {
        let (ids, kinds) = unzip_refs(&[ComponentRef::Block(4), ComponentRef::Detail(9)]);
        assert_eq!(ids, vec![4, 9]);
        assert_eq!(kinds, vec!["BLOCK", "DETAIL"]);
    }
}
