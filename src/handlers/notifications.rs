// src/handlers/notifications.rs

use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    Json,
};
use futures_util::{
    stream::{SplitSink, SplitStream},
    SinkExt, StreamExt,
};
use tokio::{sync::broadcast, time::Instant};

use crate::{
    common::error::ApiError,
    config::AppState,
    middleware::{
        i18n::Locale,
        rbac::{AdminRole, RequireRole},
        tenancy::TenantContext,
    },
    models::task::AlarmStatus,
    services::{notification::CompanyAlarmEvent, task_service::TaskService},
};

const PING_INTERVAL: Duration = Duration::from_secs(30);
const PONG_TIMEOUT: Duration = Duration::from_secs(60);

// GET /api/notifications/alarm
#[utoipa::path(
    get,
    path = "/api/notifications/alarm",
    tag = "Notifications",
    responses((status = 200, description = "Existe alguma tarefa em alarme na empresa?", body = AlarmStatus)),
    security(("api_jwt" = []))
)]
pub async fn check_alarm(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequireRole<AdminRole>,
) -> Result<impl IntoResponse, ApiError> {
    let status = app_state
        .task_service
        .alarm_status(tenant.0)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(status))
}

// GET /api/notifications/ws
#[utoipa::path(
    get,
    path = "/api/notifications/ws",
    tag = "Notifications",
    responses(
        (status = 101, description = "WebSocket: envia {alarm} agora e a cada mudança na empresa")
    ),
    security(("api_jwt" = []))
)]
pub async fn alarm_socket(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    _guard: RequireRole<AdminRole>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    // Assina antes do upgrade para não perder eventos entre o estado inicial e o loop.
    let rx = app_state.notifier.subscribe();
    let tasks = app_state.task_service.clone();
    ws.on_upgrade(move |socket| handle_socket(socket, tasks, tenant.0, rx))
}

async fn handle_socket(
    socket: WebSocket,
    tasks: TaskService,
    company_id: i64,
    rx: broadcast::Receiver<CompanyAlarmEvent>,
) {
    let (mut sender, receiver) = socket.split();

    if send_current_status(&mut sender, &tasks, company_id).await.is_err() {
        return;
    }

    tracing::debug!(company_id, "Socket de alarme conectado");
    run_socket_loop(sender, receiver, rx, tasks, company_id).await;
    tracing::debug!(company_id, "Socket de alarme encerrado");
}

async fn send_current_status(
    sender: &mut SplitSink<WebSocket, Message>,
    tasks: &TaskService,
    company_id: i64,
) -> Result<(), ()> {
    match tasks.alarm_status(company_id).await {
        Ok(status) => send_status(sender, status).await,
        Err(e) => {
            tracing::error!(company_id, error = %e, "Falha ao ler o estado de alarme");
            Err(())
        }
    }
}

async fn send_status(sender: &mut SplitSink<WebSocket, Message>, status: AlarmStatus) -> Result<(), ()> {
    let json = serde_json::to_string(&status).map_err(|_| ())?;
    sender.send(Message::Text(json.into())).await.map_err(|_| ())
}

/// Encaminha os eventos da empresa, com ping/pong para detectar conexões mortas.
async fn run_socket_loop(
    mut sender: SplitSink<WebSocket, Message>,
    mut receiver: SplitStream<WebSocket>,
    mut rx: broadcast::Receiver<CompanyAlarmEvent>,
    tasks: TaskService,
    company_id: i64,
) {
    let mut ping_interval = tokio::time::interval(PING_INTERVAL);
    ping_interval.tick().await;

    let mut last_pong = Instant::now();
    let mut awaiting_pong = false;

    loop {
        tokio::select! {
            _ = ping_interval.tick() => {
                if awaiting_pong && last_pong.elapsed() > PONG_TIMEOUT {
                    break;
                }
                if sender.send(Message::Ping(Default::default())).await.is_err() {
                    break;
                }
                awaiting_pong = true;
            }

            result = rx.recv() => {
                match result {
                    Ok(event) if event.company_id == company_id => {
                        if send_status(&mut sender, event.status).await.is_err() {
                            break;
                        }
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Closed) => break,
                    // Eventos perdidos: reenvia o estado atual.
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::debug!(company_id, skipped, "Socket de alarme atrasado");
                        if send_current_status(&mut sender, &tasks, company_id).await.is_err() {
                            break;
                        }
                    }
                }
            }

            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Pong(_))) => {
                        last_pong = Instant::now();
                        awaiting_pong = false;
                    }
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    let _ = sender.send(Message::Close(None)).await;
}
