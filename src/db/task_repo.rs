// src/db/task_repo.rs

use chrono::{DateTime, Utc};
use sqlx::{Executor, PgPool, Postgres};

use crate::{
    common::error::AppError,
    models::{
        operation::ComponentRef,
        task::{ActiveAlarm, AdminTask, Alarm, Task, TaskStatus, TaskView},
    },
};

// Tarefa + nomes resolvidos. O funcionário pode já ter sido excluído (LEFT JOIN).
const TASK_VIEW_SELECT: &str = r#"
    SELECT t.*,
           o.name AS operation_name,
           c.name AS component_name,
           NULLIF(concat_ws(' ', e.surname, e.name, e.middle_name), '') AS responsible_name
    FROM tasks t
    JOIN operations o ON o.id = t.operation_id
    LEFT JOIN component_index c ON c.kind = t.component_kind AND c.id = t.component_id
    LEFT JOIN employees e ON e.id = t.responsible_id
"#;

#[derive(Clone)]
pub struct TaskRepository {
    pool: PgPool,
}

impl TaskRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    //  ADMIN TASKS (rodadas de atribuição)
    // =========================================================================

    pub async fn create_admin_task(&self, company_id: i64, product_id: i64) -> Result<AdminTask, AppError> {
        let admin_task = sqlx::query_as::<_, AdminTask>(
            "INSERT INTO admin_tasks (product_id, company_id) VALUES ($1, $2) RETURNING *",
        )
            .bind(product_id)
            .bind(company_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(admin_task)
    }

    pub async fn find_admin_task<'e, E>(&self, executor: E, id: i64) -> Result<Option<AdminTask>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let admin_task = sqlx::query_as::<_, AdminTask>("SELECT * FROM admin_tasks WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(admin_task)
    }

    pub async fn list_admin_tasks(&self, company_id: i64) -> Result<Vec<AdminTask>, AppError> {
        let admin_tasks = sqlx::query_as::<_, AdminTask>(
            "SELECT * FROM admin_tasks WHERE company_id = $1 ORDER BY created_at DESC, id DESC",
        )
            .bind(company_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(admin_tasks)
    }

    pub async fn delete_alarms_of_admin_task<'e, E>(&self, executor: E, id: i64) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            "DELETE FROM alarms WHERE task_id IN (SELECT id FROM tasks WHERE admin_task_id = $1)",
        )
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete_tasks_of_admin_task<'e, E>(&self, executor: E, id: i64) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM tasks WHERE admin_task_id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete_admin_task<'e, E>(&self, executor: E, id: i64) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM admin_tasks WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    // =========================================================================
    //  TAREFAS
    // =========================================================================

    /// Insere ou reatribui pela chave natural; status e horários não mudam na reatribuição.
    pub async fn upsert_task<'e, E>(
        &self,
        executor: E,
        company_id: i64,
        admin_task_id: i64,
        component: ComponentRef,
        operation_id: i64,
        responsible_id: i64,
    ) -> Result<Task, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let task = sqlx::query_as::<_, Task>(
            r#"
            INSERT INTO tasks (component_id, component_kind, operation_id, responsible_id, company_id, admin_task_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT ON CONSTRAINT tasks_natural_key
            DO UPDATE SET responsible_id = EXCLUDED.responsible_id
            RETURNING *
            "#,
        )
            .bind(component.id())
            .bind(component.kind())
            .bind(operation_id)
            .bind(responsible_id)
            .bind(company_id)
            .bind(admin_task_id)
            .fetch_one(executor)
            .await?;
        Ok(task)
    }

    pub async fn find_task(&self, id: i64) -> Result<Option<Task>, AppError> {
        let task = sqlx::query_as::<_, Task>("SELECT * FROM tasks WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(task)
    }

    /// `SELECT ... FOR UPDATE`: serializa início/fim/alarme na mesma tarefa.
    pub async fn lock_task<'e, E>(&self, executor: E, id: i64) -> Result<Option<Task>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let task = sqlx::query_as::<_, Task>("SELECT * FROM tasks WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(task)
    }

    pub async fn open_tasks_of_employee(&self, employee_id: i64) -> Result<Vec<Task>, AppError> {
        let tasks = sqlx::query_as::<_, Task>(
            r#"
            SELECT * FROM tasks
            WHERE responsible_id = $1 AND status IN ('IN_PROGRESS', 'ALARM')
            ORDER BY id
            "#,
        )
            .bind(employee_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(tasks)
    }

    /// A tarefa aberta do funcionário, excluindo `except_task_id`.
    pub async fn other_open_task<'e, E>(
        &self,
        executor: E,
        employee_id: i64,
        except_task_id: i64,
    ) -> Result<Option<i64>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT id FROM tasks
            WHERE responsible_id = $1 AND id <> $2 AND status IN ('IN_PROGRESS', 'ALARM')
            LIMIT 1
            "#,
        )
            .bind(employee_id)
            .bind(except_task_id)
            .fetch_optional(executor)
            .await?;
        Ok(id)
    }

    pub async fn unfinished_views_of_employee(&self, employee_id: i64) -> Result<Vec<TaskView>, AppError> {
        let sql = format!("{TASK_VIEW_SELECT} WHERE t.responsible_id = $1 AND t.status <> 'DONE' ORDER BY t.id");
        let tasks = sqlx::query_as::<_, TaskView>(&sql)
            .bind(employee_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(tasks)
    }

    pub async fn views_of_admin_task(&self, admin_task_id: i64) -> Result<Vec<TaskView>, AppError> {
        let sql = format!("{TASK_VIEW_SELECT} WHERE t.admin_task_id = $1 ORDER BY t.id");
        let tasks = sqlx::query_as::<_, TaskView>(&sql)
            .bind(admin_task_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(tasks)
    }

    pub async fn set_started<'e, E>(&self, executor: E, id: i64, at: DateTime<Utc>) -> Result<Task, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let task = sqlx::query_as::<_, Task>(
            "UPDATE tasks SET status = 'IN_PROGRESS', start_time = $2 WHERE id = $1 RETURNING *",
        )
            .bind(id)
            .bind(at)
            .fetch_one(executor)
            .await?;
        Ok(task)
    }

    pub async fn set_finished<'e, E>(&self, executor: E, id: i64, at: DateTime<Utc>) -> Result<Task, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let task = sqlx::query_as::<_, Task>(
            "UPDATE tasks SET status = 'DONE', end_time = $2 WHERE id = $1 RETURNING *",
        )
            .bind(id)
            .bind(at)
            .fetch_one(executor)
            .await?;
        Ok(task)
    }

    pub async fn set_status<'e, E>(&self, executor: E, id: i64, status: TaskStatus) -> Result<Task, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let task = sqlx::query_as::<_, Task>("UPDATE tasks SET status = $2 WHERE id = $1 RETURNING *")
            .bind(id)
            .bind(status)
            .fetch_one(executor)
            .await?;
        Ok(task)
    }

    // =========================================================================
    //  ALARMES
    // =========================================================================

    /// Um alarme por tarefa: levantar de novo substitui o texto.
    pub async fn upsert_alarm<'e, E>(&self, executor: E, task_id: i64, text: &str) -> Result<Alarm, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let alarm = sqlx::query_as::<_, Alarm>(
            r#"
            INSERT INTO alarms (task_id, text)
            VALUES ($1, $2)
            ON CONFLICT ON CONSTRAINT alarms_task_key
            DO UPDATE SET text = EXCLUDED.text, created_at = NOW()
            RETURNING *
            "#,
        )
            .bind(task_id)
            .bind(text)
            .fetch_one(executor)
            .await?;
        Ok(alarm)
    }

    pub async fn delete_alarm<'e, E>(&self, executor: E, task_id: i64) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM alarms WHERE task_id = $1")
            .bind(task_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    /// Existe alguma tarefa em alarme sob algum aTask da empresa?
    pub async fn company_has_alarm(&self, company_id: i64) -> Result<bool, AppError> {
        let alarm = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM tasks t
                JOIN admin_tasks a ON a.id = t.admin_task_id
                WHERE a.company_id = $1 AND t.status = 'ALARM'
            )
            "#,
        )
            .bind(company_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(alarm)
    }

    pub async fn active_alarms(&self, company_id: i64) -> Result<Vec<ActiveAlarm>, AppError> {
        let alarms = sqlx::query_as::<_, ActiveAlarm>(
            r#"
            SELECT al.id AS alarm_id,
                   al.task_id,
                   al.text,
                   al.created_at,
                   o.name AS operation_name,
                   NULLIF(concat_ws(' ', e.surname, e.name, e.middle_name), '') AS responsible_name
            FROM alarms al
            JOIN tasks t ON t.id = al.task_id
            JOIN operations o ON o.id = t.operation_id
            LEFT JOIN employees e ON e.id = t.responsible_id
            WHERE t.company_id = $1 AND t.status = 'ALARM'
            ORDER BY al.created_at
            "#,
        )
            .bind(company_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(alarms)
    }
}
