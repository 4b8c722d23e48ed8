// src/db/account_repo.rs

use sqlx::{Executor, PgPool, Postgres};

use crate::{
    common::error::{unique_violation, AppError},
    models::identity::Account,
};

// O repositório de contas, responsável pela tabela 'accounts'
#[derive(Clone)]
pub struct AccountRepository {
    pool: PgPool,
}

impl AccountRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // Busca uma conta pelo login (global, não por empresa)
    pub async fn find_by_login(&self, login: &str) -> Result<Option<Account>, AppError> {
        let account = sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE login = $1")
            .bind(login)
            .fetch_optional(&self.pool)
            .await?;
        Ok(account)
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Account>, AppError> {
        let account = sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(account)
    }

    pub async fn login_exists<'e, E>(&self, executor: E, login: &str) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM accounts WHERE login = $1)",
        )
            .bind(login)
            .fetch_one(executor)
            .await?;
        Ok(exists)
    }

    // Cria a conta; login repetido vira DuplicateLogin
    pub async fn create_account<'e, E>(
        &self,
        executor: E,
        login: &str,
        password_hash: &str,
        is_admin: bool,
        company_id: i64,
    ) -> Result<Account, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Account>(
            r#"
            INSERT INTO accounts (login, password_hash, is_admin, company_id)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
            .bind(login)
            .bind(password_hash)
            .bind(is_admin)
            .bind(company_id)
            .fetch_one(executor)
            .await
            .map_err(|e| match unique_violation(&e) {
                Some("accounts_login_key") => AppError::DuplicateLogin,
                _ => e.into(),
            })
    }

    /// Remove a conta de funcionário cujo login é o telefone informado.
    pub async fn delete_employee_account<'e, E>(
        &self,
        executor: E,
        company_id: i64,
        login: &str,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            "DELETE FROM accounts WHERE company_id = $1 AND login = $2 AND NOT is_admin",
        )
            .bind(company_id)
            .bind(login)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }
}
