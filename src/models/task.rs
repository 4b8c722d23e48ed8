// src/models/task.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::models::operation::{ComponentKind, ComponentRef};

// --- Enums ---

/// Estado de uma tarefa. `Done` é terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "task_status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    NotActive,
    InProgress,
    Alarm,
    Done,
}

/// Ações do funcionário/admin que movem o estado.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskAction {
    Start,
    Finish,
    RaiseAlarm,
    ResolveAlarm,
}

impl TaskAction {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskAction::Start => "start",
            TaskAction::Finish => "finish",
            TaskAction::RaiseAlarm => "raise an alarm on",
            TaskAction::ResolveAlarm => "resolve the alarm of",
        }
    }
}

impl TaskStatus {
    /// Rótulo exibido na interface.
    pub fn label(self) -> &'static str {
        match self {
            TaskStatus::NotActive => "Не активне",
            TaskStatus::InProgress => "У роботі",
            TaskStatus::Alarm => "Alarm",
            TaskStatus::Done => "Завершене",
        }
    }

    /// Em trabalho ou em alarme: ocupa o funcionário.
    pub fn is_open(self) -> bool {
        matches!(self, TaskStatus::InProgress | TaskStatus::Alarm)
    }

    /// Próximo estado para `action`, ou `None` se a transição não existe.
    ///
    /// NotActive -> InProgress -> {Alarm <-> InProgress} -> Done.
    /// Levantar alarme numa tarefa já em alarme mantém `Alarm` (o texto é substituído);
    /// resolver quando não há alarme não muda nada.
    pub fn next(self, action: TaskAction) -> Option<TaskStatus> {
        use TaskAction::*;
        use TaskStatus::*;

        match (self, action) {
            (NotActive, Start) => Some(InProgress),
            (InProgress, Finish) => Some(Done),
            (InProgress | Alarm, RaiseAlarm) => Some(Alarm),
            (Alarm, ResolveAlarm) => Some(InProgress),
            (status, ResolveAlarm) => Some(status),
            _ => None,
        }
    }
}

// --- Entidades ---

/// Uma rodada de atribuição para um produto.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminTask {
    pub id: i64,
    pub product_id: i64,
    #[schema(ignore)]
    pub company_id: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: i64,
    pub component_id: i64,
    pub component_kind: ComponentKind,
    pub operation_id: i64,
    pub responsible_id: i64,
    pub status: TaskStatus,
    #[schema(ignore)]
    pub company_id: i64,
    pub admin_task_id: i64,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

impl Task {
    pub fn component(&self) -> ComponentRef {
        ComponentRef::new(self.component_kind, self.component_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Alarm {
    pub id: i64,
    pub task_id: i64,
    #[schema(example = "Falta material na bancada 3")]
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// Tarefa com os nomes resolvidos para as listagens.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TaskView {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub task: Task,
    pub operation_name: String,
    pub component_name: Option<String>,
    pub responsible_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActiveAlarm {
    pub alarm_id: i64,
    pub task_id: i64,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub operation_name: String,
    pub responsible_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminTaskBoard {
    #[serde(flatten)]
    pub admin_task: AdminTask,
    pub tasks: Vec<TaskView>,
}

/// Resposta do `checkAlarm`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AlarmStatus {
    pub alarm: bool,
}

// --- Payloads ---

/// `getOrCreateAdminTask`: um dos dois é esperado; se vierem ambos vale o `adminTaskId`.
#[derive(Debug, Clone, Copy, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct AdminTaskQuery {
    pub admin_task_id: Option<i64>,
    pub product_id: Option<i64>,
}

#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssignTaskPayload {
    pub admin_task_id: i64,
    pub component_id: i64,
    pub component_type: ComponentKind,
    pub operation_id: i64,
    pub employee_id: i64,
}

impl AssignTaskPayload {
    pub fn component(&self) -> ComponentRef {
        ComponentRef::new(self.component_type, self.component_id)
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RaiseAlarmPayload {
    #[validate(length(min = 1, max = 2000, message = "Descreva o problema."))]
    #[schema(example = "Falta material na bancada 3")]
    pub text: String,
}

// --- Guarda "uma tarefa ativa por vez" ---

/// Para onde o funcionário deve ser levado antes de qualquer outra ação.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum BlockingScreen {
    Alarm,
    Instruction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BlockingTask {
    pub task_id: i64,
    pub screen: BlockingScreen,
}

/// Uma tarefa em alarme tem precedência sobre uma tarefa em trabalho.
pub fn blocking_condition(tasks: &[Task]) -> Option<BlockingTask> {
    let alarm = tasks.iter().find(|t| t.status == TaskStatus::Alarm);
    if let Some(t) = alarm {
        return Some(BlockingTask {
            task_id: t.id,
            screen: BlockingScreen::Alarm,
        });
    }

    tasks
        .iter()
        .find(|t| t.status == TaskStatus::InProgress)
        .map(|t| BlockingTask {
            task_id: t.id,
            screen: BlockingScreen::Instruction,
        })
}

/// A tela inicial do funcionário: ou um redirecionamento, ou a lista de tarefas abertas.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum EmployeeHome {
    Redirect { blocking: BlockingTask },
    Tasks { tasks: Vec<TaskView> },
}
