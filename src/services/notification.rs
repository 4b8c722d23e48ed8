// src/services/notification.rs

use serde::Serialize;
use tokio::sync::broadcast;

use crate::models::task::AlarmStatus;

const CHANNEL_CAPACITY: usize = 64;

/// Mudança no estado de alarme de uma empresa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyAlarmEvent {
    pub company_id: i64,
    #[serde(flatten)]
    pub status: AlarmStatus,
}

/// A ponte de notificação: o fluxo de tarefas publica, as sessões de admin assinam.
#[derive(Clone)]
pub struct AlarmNotifier {
    tx: broadcast::Sender<CompanyAlarmEvent>,
}

impl Default for AlarmNotifier {
    fn default() -> Self {
        let (tx, _rx) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }
}

impl AlarmNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sem assinantes não é erro.
    pub fn publish(&self, company_id: i64, alarm: bool) {
        let event = CompanyAlarmEvent { company_id, status: AlarmStatus { alarm } };
        let receivers = self.tx.send(event).unwrap_or(0);
        tracing::debug!(company_id, alarm, receivers, "Estado de alarme publicado");
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CompanyAlarmEvent> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let notifier = AlarmNotifier::new();
        let mut rx = notifier.subscribe();

        notifier.publish(4, true);

        let event = rx.recv().await.unwrap();
        assert_eq!(event.company_id, 4);
        assert!(event.status.alarm);
    }

    #[test]
    fn publishing_without_subscribers_is_fine() {
        AlarmNotifier::new().publish(1, false);
    }

    #[test]
    fn event_serializes_flat() {
        let event = CompanyAlarmEvent { company_id: 2, status: AlarmStatus { alarm: true } };
        assert_eq!(
            serde_json::to_value(event).unwrap(),
            serde_json::json!({ "companyId": 2, "alarm": true })
        );
    }
}
