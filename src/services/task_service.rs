// src/services/task_service.rs

use chrono::Utc;
use sqlx::PgPool;

use crate::{
    common::{
        blob_store::BlobCategory,
        db_utils::retry_transient,
        error::{unique_violation, AppError},
    },
    db::{EmployeeRepository, TaskRepository},
    models::{
        identity::Session,
        operation::OperationDetail,
        task::{
            blocking_condition, ActiveAlarm, AdminTask, AdminTaskBoard, Alarm, AlarmStatus,
            AssignTaskPayload, BlockingTask, EmployeeHome, Task, TaskAction, TaskStatus,
        },
    },
    services::{
        notification::AlarmNotifier, operation_service::OperationService,
        product_service::ProductService,
    },
};

const ONE_OPEN_TASK_INDEX: &str = "tasks_one_open_per_employee";

#[derive(Clone)]
pub struct TaskService {
    repo: TaskRepository,
    employee_repo: EmployeeRepository,
    products: ProductService,
    operations: OperationService,
    notifier: AlarmNotifier,
    pool: PgPool,
}

impl TaskService {
    pub fn new(
        repo: TaskRepository,
        employee_repo: EmployeeRepository,
        products: ProductService,
        operations: OperationService,
        notifier: AlarmNotifier,
        pool: PgPool,
    ) -> Self {
        Self { repo, employee_repo, products, operations, notifier, pool }
    }

    // =========================================================================
    //  ADMIN: rodadas de atribuição
    // =========================================================================

    /// Busca o aTask informado ou cria um novo para o produto.
    pub async fn get_or_create_admin_task(
        &self,
        session: &Session,
        admin_task_id: Option<i64>,
        product_id: Option<i64>,
    ) -> Result<AdminTask, AppError> {
        match (admin_task_id, product_id) {
            (Some(id), _) => self.admin_task(session, id).await,
            (None, Some(product_id)) => {
                self.products.product(session, product_id).await?;
                let admin_task = self.repo.create_admin_task(session.company_id, product_id).await?;
                tracing::info!(admin_task_id = admin_task.id, product_id, "aTask criado");
                Ok(admin_task)
            }
            (None, None) => Err(AppError::MissingParameter("adminTaskId|productId")),
        }
    }

    pub async fn admin_task(&self, session: &Session, id: i64) -> Result<AdminTask, AppError> {
        let admin_task = self
            .repo
            .find_admin_task(&self.pool, id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound(format!("admin task {id}")))?;
        session.ensure_company(admin_task.company_id)?;
        Ok(admin_task)
    }

    pub async fn list_admin_tasks(&self, company_id: i64) -> Result<Vec<AdminTask>, AppError> {
        self.repo.list_admin_tasks(company_id).await
    }

    pub async fn board(&self, session: &Session, admin_task_id: i64) -> Result<AdminTaskBoard, AppError> {
        let admin_task = self.admin_task(session, admin_task_id).await?;
        let tasks = self.repo.views_of_admin_task(admin_task_id).await?;
        Ok(AdminTaskBoard { admin_task, tasks })
    }

    /// Alarmes, tarefas e o aTask, nessa ordem e na mesma transação.
    pub async fn delete_admin_task(&self, session: &Session, admin_task_id: i64) -> Result<(), AppError> {
        self.admin_task(session, admin_task_id).await?;

        let mut tx = self.pool.begin().await?;
        let alarms = self.repo.delete_alarms_of_admin_task(&mut *tx, admin_task_id).await?;
        let tasks = self.repo.delete_tasks_of_admin_task(&mut *tx, admin_task_id).await?;
        self.repo.delete_admin_task(&mut *tx, admin_task_id).await?;
        tx.commit().await?;

        tracing::info!(admin_task_id, tasks, alarms, "aTask excluído");
        if alarms > 0 {
            self.publish_company_status(session.company_id).await;
        }
        Ok(())
    }

    /// Upsert pela chave natural: reatribuir não mexe em status nem horários.
    pub async fn assign_task(&self, session: &Session, payload: AssignTaskPayload) -> Result<Task, AppError> {
        let admin_task = self.admin_task(session, payload.admin_task_id).await?;
        let component = payload.component();

        let descriptor = self.products.resolve_component(session, component).await?;
        if descriptor.product_id != admin_task.product_id {
            return Err(AppError::InvalidInput(format!(
                "{component} não pertence ao produto {}",
                admin_task.product_id
            )));
        }

        let operation = self.operations.operation(session, payload.operation_id).await?;
        let operation_target = self.products.resolve_component(session, operation.component()).await?;
        if operation_target.product_id != admin_task.product_id {
            return Err(AppError::InvalidInput(format!(
                "operação {} não pertence ao produto {}",
                operation.id, admin_task.product_id
            )));
        }

        let mut tx = self.pool.begin().await?;

        let employee = self
            .employee_repo
            .lock_employee(&mut *tx, payload.employee_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound(format!("employee {}", payload.employee_id)))?;
        session.ensure_company(employee.company_id)?;

        let upserted = self
            .repo
            .upsert_task(
                &mut *tx,
                session.company_id,
                admin_task.id,
                component,
                operation.id,
                employee.id,
            )
            .await;

        let task = match upserted {
            Ok(task) => task,
            Err(AppError::DatabaseError(e)) if unique_violation(&e) == Some(ONE_OPEN_TASK_INDEX) => {
                drop(tx);
                return Err(self.active_task_conflict(employee.id).await);
            }
            Err(e) => return Err(e),
        };

        tx.commit().await?;

        tracing::info!(
            task_id = task.id,
            admin_task_id = admin_task.id,
            employee_id = employee.id,
            status = ?task.status,
            "Tarefa atribuída"
        );
        Ok(task)
    }

    pub async fn active_alarms(&self, company_id: i64) -> Result<Vec<ActiveAlarm>, AppError> {
        self.repo.active_alarms(company_id).await
    }

    /// `checkAlarm`: alguma tarefa da empresa está em alarme?
    pub async fn alarm_status(&self, company_id: i64) -> Result<AlarmStatus, AppError> {
        let alarm = retry_transient("company_has_alarm", || self.repo.company_has_alarm(company_id)).await?;
        Ok(AlarmStatus { alarm })
    }

    // =========================================================================
    //  FUNCIONÁRIO
    // =========================================================================

    /// Tarefa que obriga o funcionário a voltar a ela (alarme antes de "em trabalho").
    pub async fn blocking_task(&self, employee_id: i64) -> Result<Option<BlockingTask>, AppError> {
        let open = retry_transient("open_tasks_of_employee", || {
            self.repo.open_tasks_of_employee(employee_id)
        })
        .await?;
        Ok(blocking_condition(&open))
    }

    pub async fn employee_home(&self, session: &Session) -> Result<EmployeeHome, AppError> {
        let employee_id = session.employee_id()?;

        if let Some(blocking) = self.blocking_task(employee_id).await? {
            return Ok(EmployeeHome::Redirect { blocking });
        }

        let tasks = self.repo.unfinished_views_of_employee(employee_id).await?;
        Ok(EmployeeHome::Tasks { tasks })
    }

    pub async fn task_instruction(&self, session: &Session, task_id: i64) -> Result<OperationDetail, AppError> {
        let task = self.own_task(session, task_id).await?;
        self.operations.detail(session, task.operation_id).await
    }

    pub async fn task_instruction_file(
        &self,
        session: &Session,
        task_id: i64,
        category: BlobCategory,
        file_name: &str,
    ) -> Result<Vec<u8>, AppError> {
        let task = self.own_task(session, task_id).await?;
        self.operations
            .read_instruction_file(session, task.operation_id, category, file_name)
            .await
    }

    /// NotActive -> InProgress, desde que não haja outra tarefa aberta.
    pub async fn start(&self, session: &Session, task_id: i64) -> Result<Task, AppError> {
        let employee_id = session.employee_id()?;
        let mut tx = self.pool.begin().await?;

        let task = self.lock_own_task(&mut tx, session, task_id).await?;
        transition(&task, TaskAction::Start)?;

        if let Some(open_id) = self.repo.other_open_task(&mut *tx, employee_id, task_id).await? {
            return Err(AppError::ActiveTaskExists(open_id));
        }

        let task = match self.repo.set_started(&mut *tx, task_id, Utc::now()).await {
            Ok(task) => task,
            Err(AppError::DatabaseError(e)) if unique_violation(&e) == Some(ONE_OPEN_TASK_INDEX) => {
                drop(tx);
                return Err(self.active_task_conflict(employee_id).await);
            }
            Err(e) => return Err(e),
        };

        tx.commit().await?;
        tracing::info!(task_id, employee_id, "Tarefa iniciada");
        Ok(task)
    }

    /// InProgress -> Done. Done é terminal.
    pub async fn finish(&self, session: &Session, task_id: i64) -> Result<Task, AppError> {
        let mut tx = self.pool.begin().await?;

        let task = self.lock_own_task(&mut tx, session, task_id).await?;
        transition(&task, TaskAction::Finish)?;
        let task = self.repo.set_finished(&mut *tx, task_id, Utc::now()).await?;

        tx.commit().await?;
        tracing::info!(task_id, employee_id = task.responsible_id, "Tarefa concluída");
        Ok(task)
    }

    /// Um alarme por tarefa; levantar de novo substitui o texto.
    pub async fn raise_alarm(&self, session: &Session, task_id: i64, text: &str) -> Result<Alarm, AppError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AppError::MissingParameter("text"));
        }

        let mut tx = self.pool.begin().await?;

        let task = self.lock_own_task(&mut tx, session, task_id).await?;
        transition(&task, TaskAction::RaiseAlarm)?;

        let alarm = self.repo.upsert_alarm(&mut *tx, task_id, text).await?;
        if task.status != TaskStatus::Alarm {
            self.repo.set_status(&mut *tx, task_id, TaskStatus::Alarm).await?;
        }

        tx.commit().await?;

        tracing::warn!(task_id, alarm_id = alarm.id, employee_id = task.responsible_id, "Alarme levantado");
        self.notifier.publish(task.company_id, true);
        Ok(alarm)
    }

    /// Alarm -> InProgress. Sem alarme, nada muda. Permitido ao dono da tarefa e a admins da empresa.
    pub async fn resolve_alarm(&self, session: &Session, task_id: i64) -> Result<Task, AppError> {
        let mut tx = self.pool.begin().await?;

        let task = self
            .repo
            .lock_task(&mut *tx, task_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound(format!("task {task_id}")))?;
        session.ensure_company(task.company_id)?;
        if !session.is_admin && session.employee_id != Some(task.responsible_id) {
            return Err(AppError::Forbidden);
        }

        if task.status != TaskStatus::Alarm {
            return Ok(task);
        }
        transition(&task, TaskAction::ResolveAlarm)?;

        self.repo.delete_alarm(&mut *tx, task_id).await?;
        let task = self.repo.set_status(&mut *tx, task_id, TaskStatus::InProgress).await?;

        tx.commit().await?;

        tracing::info!(task_id, account_id = session.account_id, "Alarme resolvido");
        self.publish_company_status(task.company_id).await;
        Ok(task)
    }

    // =========================================================================
    //  AUXILIARES
    // =========================================================================

    async fn own_task(&self, session: &Session, task_id: i64) -> Result<Task, AppError> {
        let task = self
            .repo
            .find_task(task_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound(format!("task {task_id}")))?;
        ensure_owner(session, &task)?;
        Ok(task)
    }

    async fn lock_own_task(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        session: &Session,
        task_id: i64,
    ) -> Result<Task, AppError> {
        let task = self
            .repo
            .lock_task(&mut **tx, task_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound(format!("task {task_id}")))?;
        ensure_owner(session, &task)?;
        Ok(task)
    }

    async fn active_task_conflict(&self, employee_id: i64) -> AppError {
        match self.blocking_task(employee_id).await {
            Ok(Some(blocking)) => AppError::ActiveTaskExists(blocking.task_id),
            Ok(None) => AppError::ActiveTaskExists(0),
            Err(e) => e,
        }
    }

    async fn publish_company_status(&self, company_id: i64) {
        match self.alarm_status(company_id).await {
            Ok(status) => self.notifier.publish(company_id, status.alarm),
            Err(e) => tracing::warn!(company_id, error = %e, "Falha ao recalcular estado de alarme"),
        }
    }
}

fn ensure_owner(session: &Session, task: &Task) -> Result<(), AppError> {
    session.ensure_company(task.company_id)?;
    if session.employee_id()? != task.responsible_id {
        tracing::warn!(
            task_id = task.id,
            account_id = session.account_id,
            "Tarefa de outro funcionário"
        );
        return Err(AppError::Forbidden);
    }
    Ok(())
}

fn transition(task: &Task, action: TaskAction) -> Result<TaskStatus, AppError> {
    task.status.next(action).ok_or(AppError::InvalidTransition {
        from: task.status,
        action: action.as_str(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::operation::ComponentKind;

    fn task(status: TaskStatus, responsible_id: i64) -> Task {
        Task {
            id: 1,
            component_id: 1,
            component_kind: ComponentKind::Detail,
            operation_id: 1,
            responsible_id,
            status,
            company_id: 10,
            admin_task_id: 1,
            start_time: None,
            end_time: None,
        }
    }

    fn employee_session(employee_id: i64, company_id: i64) -> Session {
        Session {
            account_id: 99,
            company_id,
            is_admin: false,
            employee_id: Some(employee_id),
            display_name: "x".into(),
        }
    }

    #[test]
    fn finishing_a_done_task_is_an_invalid_transition() {
        let err = transition(&task(TaskStatus::Done, 5), TaskAction::Finish).unwrap_err();
        assert!(matches!(
            err,
            AppError::InvalidTransition { from: TaskStatus::Done, action: "finish" }
        ));
    }

    #[test]
    fn starting_a_not_active_task_moves_it_in_progress() {
        let next = transition(&task(TaskStatus::NotActive, 5), TaskAction::Start).unwrap();
        assert_eq!(next, TaskStatus::InProgress);
    }

    #[test]
    fn only_the_responsible_employee_owns_the_task() {
        let t = task(TaskStatus::InProgress, 5);
        assert!(ensure_owner(&employee_session(5, 10), &t).is_ok());
        assert!(matches!(ensure_owner(&employee_session(6, 10), &t), Err(AppError::Forbidden)));
        assert!(matches!(ensure_owner(&employee_session(5, 11), &t), Err(AppError::Forbidden)));
    }
}
