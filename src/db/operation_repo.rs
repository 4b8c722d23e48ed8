// src/db/operation_repo.rs

use sqlx::{Executor, FromRow, PgPool, Postgres};

use crate::{
    common::error::AppError,
    db::product_repo::unzip_refs,
    models::operation::{ComponentKind, ComponentRef, Instruction, Operation},
};

#[derive(FromRow)]
struct DependencyRow {
    component_id: i64,
    component_kind: ComponentKind,
}

#[derive(Clone)]
pub struct OperationRepository {
    pool: PgPool,
}

impl OperationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    //  OPERAÇÃO
    // =========================================================================

    pub async fn create_operation<'e, E>(
        &self,
        executor: E,
        company_id: i64,
        name: &str,
        component: ComponentRef,
    ) -> Result<Operation, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let operation = sqlx::query_as::<_, Operation>(
            r#"
            INSERT INTO operations (name, component_id, component_kind, company_id)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
            .bind(name)
            .bind(component.id())
            .bind(component.kind())
            .bind(company_id)
            .fetch_one(executor)
            .await?;
        Ok(operation)
    }

    pub async fn find_operation(&self, id: i64) -> Result<Option<Operation>, AppError> {
        let operation = sqlx::query_as::<_, Operation>("SELECT * FROM operations WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(operation)
    }

    /// Trava a operação para que edições concorrentes não intercalem o "limpa e reconstrói".
    pub async fn lock_operation<'e, E>(&self, executor: E, id: i64) -> Result<Option<Operation>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let operation = sqlx::query_as::<_, Operation>("SELECT * FROM operations WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(operation)
    }

    pub async fn list_for_component(&self, component: ComponentRef) -> Result<Vec<Operation>, AppError> {
        let operations = sqlx::query_as::<_, Operation>(
            r#"
            SELECT * FROM operations
            WHERE component_kind = $1 AND component_id = $2
            ORDER BY id
            "#,
        )
            .bind(component.kind())
            .bind(component.id())
            .fetch_all(&self.pool)
            .await?;
        Ok(operations)
    }

    pub async fn rename<'e, E>(&self, executor: E, id: i64, name: &str) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE operations SET name = $2 WHERE id = $1")
            .bind(id)
            .bind(name)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn count_tasks<'e, E>(&self, executor: E, id: i64) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM tasks WHERE operation_id = $1")
            .bind(id)
            .fetch_one(executor)
            .await?;
        Ok(count)
    }

    pub async fn delete_operation<'e, E>(&self, executor: E, id: i64) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM operations WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    // =========================================================================
    //  VÍNCULOS (localização, ferramentas, materiais, dependências)
    // =========================================================================

    /// Apaga as quatro famílias de vínculos numa única instrução.
    pub async fn clear_links<'e, E>(&self, executor: E, operation_id: i64) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            WITH l AS (DELETE FROM locations_for_operation WHERE operation_id = $1),
                 t AS (DELETE FROM tools_for_operation WHERE operation_id = $1),
                 m AS (DELETE FROM materials_for_operation WHERE operation_id = $1)
            DELETE FROM dependent_components WHERE operation_id = $1
            "#,
        )
            .bind(operation_id)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn insert_location<'e, E>(&self, executor: E, operation_id: i64, location_id: i64) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("INSERT INTO locations_for_operation (location_id, operation_id) VALUES ($1, $2)")
            .bind(location_id)
            .bind(operation_id)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn insert_tools<'e, E>(&self, executor: E, operation_id: i64, tool_ids: &[i64]) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            "INSERT INTO tools_for_operation (tool_id, operation_id) SELECT UNNEST($1::BIGINT[]), $2",
        )
            .bind(tool_ids)
            .bind(operation_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn insert_materials<'e, E>(&self, executor: E, operation_id: i64, material_ids: &[i64]) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            "INSERT INTO materials_for_operation (material_id, operation_id) SELECT UNNEST($1::BIGINT[]), $2",
        )
            .bind(material_ids)
            .bind(operation_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    /// Grava as dependências na ordem recebida.
    pub async fn insert_dependencies<'e, E>(
        &self,
        executor: E,
        operation_id: i64,
        refs: &[ComponentRef],
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let (ids, kinds) = unzip_refs(refs);
        let result = sqlx::query(
            r#"
            INSERT INTO dependent_components (component_id, component_kind, operation_id)
            SELECT r.id, r.kind::component_kind, $3
            FROM UNNEST($1::BIGINT[], $2::TEXT[]) WITH ORDINALITY AS r(id, kind, ord)
            ORDER BY r.ord
            "#,
        )
            .bind(ids)
            .bind(kinds)
            .bind(operation_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn location_id(&self, operation_id: i64) -> Result<Option<i64>, AppError> {
        let id = sqlx::query_scalar::<_, i64>(
            "SELECT location_id FROM locations_for_operation WHERE operation_id = $1 ORDER BY id LIMIT 1",
        )
            .bind(operation_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(id)
    }

    pub async fn tool_ids(&self, operation_id: i64) -> Result<Vec<i64>, AppError> {
        let ids = sqlx::query_scalar::<_, i64>(
            "SELECT tool_id FROM tools_for_operation WHERE operation_id = $1 ORDER BY id",
        )
            .bind(operation_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }

    pub async fn material_ids(&self, operation_id: i64) -> Result<Vec<i64>, AppError> {
        let ids = sqlx::query_scalar::<_, i64>(
            "SELECT material_id FROM materials_for_operation WHERE operation_id = $1 ORDER BY id",
        )
            .bind(operation_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }

    pub async fn dependencies(&self, operation_id: i64) -> Result<Vec<ComponentRef>, AppError> {
        let rows = sqlx::query_as::<_, DependencyRow>(
            r#"
            SELECT component_id, component_kind FROM dependent_components
            WHERE operation_id = $1
            ORDER BY id
            "#,
        )
            .bind(operation_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(|row| ComponentRef::new(row.component_kind, row.component_id))
            .collect())
    }

    // =========================================================================
    //  INSTRUÇÃO
    // =========================================================================

    pub async fn find_instruction<'e, E>(&self, executor: E, operation_id: i64) -> Result<Option<Instruction>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let instruction = sqlx::query_as::<_, Instruction>(
            "SELECT * FROM instructions WHERE operation_id = $1",
        )
            .bind(operation_id)
            .fetch_optional(executor)
            .await?;
        Ok(instruction)
    }

    pub async fn create_instruction<'e, E>(
        &self,
        executor: E,
        operation_id: i64,
        photo_path: &str,
        video_path: &str,
        text_path: &str,
    ) -> Result<Instruction, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let instruction = sqlx::query_as::<_, Instruction>(
            r#"
            INSERT INTO instructions (operation_id, photo_path, video_path, text_path)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
            .bind(operation_id)
            .bind(photo_path)
            .bind(video_path)
            .bind(text_path)
            .fetch_one(executor)
            .await?;
        Ok(instruction)
    }

    pub async fn delete_instruction<'e, E>(&self, executor: E, operation_id: i64) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM instructions WHERE operation_id = $1")
            .bind(operation_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }
}
