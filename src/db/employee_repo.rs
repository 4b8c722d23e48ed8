// src/db/employee_repo.rs

use sqlx::{Executor, PgPool, Postgres};

use crate::{
    common::error::AppError,
    models::identity::{Employee, NewEmployee},
};

#[derive(Clone)]
pub struct EmployeeRepository {
    pool: PgPool,
}

impl EmployeeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_employee<'e, E>(
        &self,
        executor: E,
        company_id: i64,
        payload: &NewEmployee,
        photo_path: Option<&str>,
    ) -> Result<Employee, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let employee = sqlx::query_as::<_, Employee>(
            r#"
            INSERT INTO employees (name, surname, middle_name, phone_number, photo_path, company_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
            .bind(&payload.name)
            .bind(&payload.surname)
            .bind(payload.middle_name.as_deref())
            .bind(&payload.phone_number)
            .bind(photo_path)
            .bind(company_id)
            .fetch_one(executor)
            .await?;
        Ok(employee)
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Employee>, AppError> {
        let employee = sqlx::query_as::<_, Employee>("SELECT * FROM employees WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(employee)
    }

    /// Trava a linha até o fim da transação (exclusão x nova atribuição).
    pub async fn lock_employee<'e, E>(&self, executor: E, id: i64) -> Result<Option<Employee>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let employee = sqlx::query_as::<_, Employee>("SELECT * FROM employees WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(employee)
    }

    /// O funcionário ligado a uma conta (phone_number == login).
    pub async fn find_by_phone(
        &self,
        company_id: i64,
        phone_number: &str,
    ) -> Result<Option<Employee>, AppError> {
        let employee = sqlx::query_as::<_, Employee>(
            r#"
            SELECT * FROM employees
            WHERE company_id = $1 AND phone_number = $2
            ORDER BY id
            LIMIT 1
            "#,
        )
            .bind(company_id)
            .bind(phone_number)
            .fetch_optional(&self.pool)
            .await?;
        Ok(employee)
    }

    pub async fn list_for_company(&self, company_id: i64) -> Result<Vec<Employee>, AppError> {
        let employees = sqlx::query_as::<_, Employee>(
            "SELECT * FROM employees WHERE company_id = $1 ORDER BY surname, name, id",
        )
            .bind(company_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(employees)
    }

    /// Tarefas ainda não concluídas (inclui as não iniciadas).
    pub async fn count_unfinished_tasks<'e, E>(&self, executor: E, employee_id: i64) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM tasks WHERE responsible_id = $1 AND status <> 'DONE'",
        )
            .bind(employee_id)
            .fetch_one(executor)
            .await?;
        Ok(count)
    }

    pub async fn delete_employee<'e, E>(&self, executor: E, id: i64) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM employees WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }
}
