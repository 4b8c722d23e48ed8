// src/middleware/task_guard.rs

use axum::{
    extract::{RawPathParams, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::i18n::Locale,
    models::{identity::Session, task::BlockingTask},
};

/// Roda antes de cada ação protegida do funcionário: se existe uma tarefa em alarme
/// ou em trabalho, só requisições para essa mesma tarefa passam.
pub async fn task_required(
    State(app_state): State<AppState>,
    locale: Locale,
    path_params: RawPathParams,
    request: Request,
    next: Next,
) -> Response {
    let Some(employee_id) = request
        .extensions()
        .get::<Session>()
        .and_then(|session| session.employee_id)
    else {
        return next.run(request).await;
    };

    let target = target_task_id(&path_params);

    match app_state.task_service.blocking_task(employee_id).await {
        Ok(Some(blocking)) if !allows(&blocking, target) => {
            tracing::debug!(employee_id, task_id = blocking.task_id, "Ação bloqueada pela tarefa aberta");
            AppError::TaskRequired(blocking)
                .to_api_error(&locale, &app_state.i18n_store)
                .into_response()
        }
        Ok(_) => next.run(request).await,
        Err(e) => e.to_api_error(&locale, &app_state.i18n_store).into_response(),
    }
}

fn target_task_id(params: &RawPathParams) -> Option<i64> {
    params
        .iter()
        .find(|(key, _)| *key == "task_id")
        .and_then(|(_, value)| value.parse().ok())
}

fn allows(blocking: &BlockingTask, target: Option<i64>) -> bool {
    target == Some(blocking.task_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::task::BlockingScreen;

    #[test]
    fn only_the_blocking_task_is_reachable() {
        let blocking = BlockingTask { task_id: 5, screen: BlockingScreen::Instruction };
        assert!(allows(&blocking, Some(5)));
        assert!(!allows(&blocking, Some(6)));
        assert!(!allows(&blocking, None));
    }
}
