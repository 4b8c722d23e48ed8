// tests/task_workflow.rs

mod common;

use sqlx::PgPool;

use shopfloor::{
    common::error::AppError,
    models::{
        identity::Session,
        operation::{ComponentKind, ComponentRef},
        task::{AssignTaskPayload, BlockingScreen, EmployeeHome, TaskStatus},
    },
};

use common::{harness, Harness};

struct Floor {
    admin: Session,
    employee_id: i64,
    employee: Session,
    admin_task_id: i64,
    detail_id: i64,
    operation_id: i64,
}

async fn floor(h: &Harness) -> Floor {
    let admin = h.admin("Acme", "111").await;
    let (employee, session) = h.hire(&admin, "222", None).await;
    let (product, _block, detail) = h.product(&admin, "Bomba").await;
    let operation = h.operation(&admin, ComponentRef::Detail(detail.id), &[]).await;
    let admin_task = h
        .state
        .task_service
        .get_or_create_admin_task(&admin, None, Some(product.id))
        .await
        .unwrap();

    Floor {
        admin,
        employee_id: employee.id,
        employee: session,
        admin_task_id: admin_task.id,
        detail_id: detail.id,
        operation_id: operation.id,
    }
}

fn assignment(f: &Floor, employee_id: i64) -> AssignTaskPayload {
    AssignTaskPayload {
        admin_task_id: f.admin_task_id,
        component_id: f.detail_id,
        component_type: ComponentKind::Detail,
        operation_id: f.operation_id,
        employee_id,
    }
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn reassigning_updates_the_same_task(pool: PgPool) {
    let h = harness(pool);
    let f = floor(&h).await;
    let (other, _) = h.hire(&f.admin, "333", None).await;

    let first = h.state.task_service.assign_task(&f.admin, assignment(&f, f.employee_id)).await.unwrap();
    let second = h.state.task_service.assign_task(&f.admin, assignment(&f, other.id)).await.unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(second.responsible_id, other.id);
    assert_eq!(second.status, TaskStatus::NotActive);
    assert_eq!(h.count("SELECT COUNT(*) FROM tasks").await, 1);

    // Com ambos os parâmetros vale o aTask existente.
    let same = h
        .state
        .task_service
        .get_or_create_admin_task(&f.admin, Some(f.admin_task_id), Some(12345))
        .await
        .unwrap();
    assert_eq!(same.id, f.admin_task_id);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn start_and_finish_stamp_the_clock(pool: PgPool) {
    let h = harness(pool);
    let f = floor(&h).await;
    let task = h.state.task_service.assign_task(&f.admin, assignment(&f, f.employee_id)).await.unwrap();
    let tasks = &h.state.task_service;

    assert!(matches!(
        tasks.finish(&f.employee, task.id).await,
        Err(AppError::InvalidTransition { from: TaskStatus::NotActive, .. })
    ));

    let started = tasks.start(&f.employee, task.id).await.unwrap();
    assert_eq!(started.status, TaskStatus::InProgress);
    assert!(started.start_time.is_some());
    assert!(started.end_time.is_none());

    assert_eq!(
        tasks.blocking_task(f.employee_id).await.unwrap().map(|b| (b.task_id, b.screen)),
        Some((task.id, BlockingScreen::Instruction))
    );

    let done = tasks.finish(&f.employee, task.id).await.unwrap();
    assert_eq!(done.status, TaskStatus::Done);
    assert!(done.end_time.unwrap() >= done.start_time.unwrap());

    assert!(matches!(
        tasks.start(&f.employee, task.id).await,
        Err(AppError::InvalidTransition { from: TaskStatus::Done, .. })
    ));
    assert!(tasks.blocking_task(f.employee_id).await.unwrap().is_none());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn only_one_open_task_per_employee(pool: PgPool) {
    let h = harness(pool);
    let f = floor(&h).await;
    let second_op = h.operation(&f.admin, ComponentRef::Detail(f.detail_id), &[]).await;

    let first = h.state.task_service.assign_task(&f.admin, assignment(&f, f.employee_id)).await.unwrap();
    let second = h
        .state
        .task_service
        .assign_task(&f.admin, AssignTaskPayload { operation_id: second_op.id, ..assignment(&f, f.employee_id) })
        .await
        .unwrap();

    h.state.task_service.start(&f.employee, first.id).await.unwrap();
    assert!(matches!(
        h.state.task_service.start(&f.employee, second.id).await,
        Err(AppError::ActiveTaskExists(id)) if id == first.id
    ));

    match h.state.task_service.employee_home(&f.employee).await.unwrap() {
        EmployeeHome::Redirect { blocking } => assert_eq!(blocking.task_id, first.id),
        EmployeeHome::Tasks { .. } => panic!("expected a redirect"),
    }

    let instruction = h.state.task_service.task_instruction(&f.employee, first.id).await.unwrap();
    assert_eq!(instruction.operation.id, f.operation_id);
    assert_eq!(instruction.component.id, f.detail_id);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn alarm_round_trip_leaves_no_alarm_behind(pool: PgPool) {
    let h = harness(pool);
    let f = floor(&h).await;
    let mut events = h.state.notifier.subscribe();
    let tasks = &h.state.task_service;

    let task = tasks.assign_task(&f.admin, assignment(&f, f.employee_id)).await.unwrap();
    assert!(matches!(
        tasks.raise_alarm(&f.employee, task.id, "sem peça").await,
        Err(AppError::InvalidTransition { from: TaskStatus::NotActive, .. })
    ));

    tasks.start(&f.employee, task.id).await.unwrap();
    tasks.raise_alarm(&f.employee, task.id, "sem peça").await.unwrap();
    let replaced = tasks.raise_alarm(&f.employee, task.id, "sem parafuso").await.unwrap();
    assert_eq!(replaced.text, "sem parafuso");
    assert_eq!(h.count("SELECT COUNT(*) FROM alarms").await, 1);

    assert!(tasks.alarm_status(f.admin.company_id).await.unwrap().alarm);
    let active = tasks.active_alarms(f.admin.company_id).await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].responsible_name.as_deref(), Some("Petrenko Ivan"));

    assert_eq!(
        tasks.blocking_task(f.employee_id).await.unwrap().map(|b| b.screen),
        Some(BlockingScreen::Alarm)
    );

    let resolved = tasks.resolve_alarm(&f.admin, task.id).await.unwrap();
    assert_eq!(resolved.status, TaskStatus::InProgress);
    assert_eq!(h.count("SELECT COUNT(*) FROM alarms").await, 0);
    assert!(!tasks.alarm_status(f.admin.company_id).await.unwrap().alarm);

    // Resolver de novo não muda nada.
    let again = tasks.resolve_alarm(&f.employee, task.id).await.unwrap();
    assert_eq!(again.status, TaskStatus::InProgress);

    let published: Vec<bool> = std::iter::from_fn(|| events.try_recv().ok())
        .map(|event| event.status.alarm)
        .collect();
    assert_eq!(published, vec![true, true, false]);

    // Concluir sai de InProgress: o estado de alarme não muda e nada é publicado.
    tasks.finish(&f.employee, task.id).await.unwrap();
    assert!(events.try_recv().is_err());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn deleting_an_admin_task_takes_tasks_and_alarms(pool: PgPool) {
    let h = harness(pool);
    let f = floor(&h).await;
    let tasks = &h.state.task_service;

    let task = tasks.assign_task(&f.admin, assignment(&f, f.employee_id)).await.unwrap();
    tasks.start(&f.employee, task.id).await.unwrap();
    tasks.raise_alarm(&f.employee, task.id, "quebrou").await.unwrap();

    tasks.delete_admin_task(&f.admin, f.admin_task_id).await.unwrap();

    assert_eq!(h.count("SELECT COUNT(*) FROM admin_tasks").await, 0);
    assert_eq!(h.count("SELECT COUNT(*) FROM tasks").await, 0);
    assert_eq!(h.count("SELECT COUNT(*) FROM alarms").await, 0);
    assert!(!tasks.alarm_status(f.admin.company_id).await.unwrap().alarm);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn employees_with_unfinished_work_cannot_be_removed(pool: PgPool) {
    let h = harness(pool);
    let f = floor(&h).await;
    let tasks = &h.state.task_service;

    let task = tasks.assign_task(&f.admin, assignment(&f, f.employee_id)).await.unwrap();
    assert!(matches!(
        h.state.employee_service.delete(&f.admin, f.employee_id).await,
        Err(AppError::EmployeeHasOpenTasks(_))
    ));

    tasks.start(&f.employee, task.id).await.unwrap();
    tasks.finish(&f.employee, task.id).await.unwrap();
    h.state.employee_service.delete(&f.admin, f.employee_id).await.unwrap();

    // A tarefa concluída continua, sem nome de responsável.
    let board = tasks.board(&f.admin, f.admin_task_id).await.unwrap();
    assert_eq!(board.tasks.len(), 1);
    assert_eq!(board.tasks[0].task.status, TaskStatus::Done);
    assert_eq!(board.tasks[0].responsible_name, None);
}
