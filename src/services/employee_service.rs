// src/services/employee_service.rs

use std::sync::Arc;

use sqlx::PgPool;
use validator::Validate;

use crate::{
    common::{
        blob_store::{sanitize_file_name, BlobCategory, BlobStore},
        error::AppError,
    },
    db::{AccountRepository, EmployeeRepository},
    models::{
        identity::{Employee, NewEmployee, Session},
        operation::UploadedFile,
    },
    services::auth::hash_password,
};

#[derive(Clone)]
pub struct EmployeeService {
    employee_repo: EmployeeRepository,
    account_repo: AccountRepository,
    blobs: Arc<dyn BlobStore>,
    pool: PgPool,
}

impl EmployeeService {
    pub fn new(
        employee_repo: EmployeeRepository,
        account_repo: AccountRepository,
        blobs: Arc<dyn BlobStore>,
        pool: PgPool,
    ) -> Self {
        Self { employee_repo, account_repo, blobs, pool }
    }

    pub async fn list(&self, company_id: i64) -> Result<Vec<Employee>, AppError> {
        self.employee_repo.list_for_company(company_id).await
    }

    /// Funcionário + conta (login = telefone) numa transação; a foto vai antes para o store.
    pub async fn create(
        &self,
        company_id: i64,
        payload: NewEmployee,
        photo: Option<UploadedFile>,
    ) -> Result<Employee, AppError> {
        payload.validate()?;

        if self.account_repo.login_exists(&self.pool, &payload.phone_number).await? {
            return Err(AppError::DuplicateLogin);
        }

        let password_hash = hash_password(&payload.password).await?;

        let photo_path = match photo {
            Some(file) => Some(self.store_photo(file).await?),
            None => None,
        };

        match self.insert(company_id, &payload, &password_hash, photo_path.as_deref()).await {
            Ok(employee) => {
                tracing::info!(company_id, employee_id = employee.id, "Funcionário criado");
                Ok(employee)
            }
            Err(e) => {
                if let Some(dir) = photo_path.as_deref() {
                    self.discard_dir(dir).await;
                }
                Err(e)
            }
        }
    }

    async fn insert(
        &self,
        company_id: i64,
        payload: &NewEmployee,
        password_hash: &str,
        photo_path: Option<&str>,
    ) -> Result<Employee, AppError> {
        let mut tx = self.pool.begin().await?;

        let employee = self
            .employee_repo
            .create_employee(&mut *tx, company_id, payload, photo_path)
            .await?;
        self.account_repo
            .create_account(&mut *tx, &payload.phone_number, password_hash, false, company_id)
            .await?;

        tx.commit().await?;
        Ok(employee)
    }

    /// Recusa enquanto houver tarefa não concluída; depois remove conta e foto.
    pub async fn delete(&self, session: &Session, employee_id: i64) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        let employee = self
            .employee_repo
            .lock_employee(&mut *tx, employee_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound(format!("employee {employee_id}")))?;
        session.ensure_company(employee.company_id)?;

        let unfinished = self
            .employee_repo
            .count_unfinished_tasks(&mut *tx, employee_id)
            .await?;
        if unfinished > 0 {
            return Err(AppError::EmployeeHasOpenTasks(employee_id));
        }

        let accounts = self
            .account_repo
            .delete_employee_account(&mut *tx, employee.company_id, &employee.phone_number)
            .await?;
        self.employee_repo.delete_employee(&mut *tx, employee_id).await?;

        tx.commit().await?;

        tracing::info!(employee_id, accounts, "Funcionário excluído");

        if let Some(dir) = employee.photo_path.as_deref() {
            self.discard_dir(dir).await;
        }
        Ok(())
    }

    async fn store_photo(&self, file: UploadedFile) -> Result<String, AppError> {
        let name = sanitize_file_name(&file.file_name)
            .ok_or_else(|| AppError::InvalidInput(format!("nome de arquivo '{}'", file.file_name)))?;

        let dir = self.blobs.create_dir(BlobCategory::EmployeePhotos).await?;
        if let Err(e) = self.blobs.write_file(&dir, &name, &file.bytes).await {
            self.discard_dir(&dir).await;
            return Err(e.into());
        }
        Ok(dir)
    }

    async fn discard_dir(&self, dir: &str) {
        if let Err(e) = self.blobs.remove_dir(dir).await {
            tracing::warn!(dir, error = %e, "Falha ao remover diretório de blob");
        }
    }
}
