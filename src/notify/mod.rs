use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

pub const CATEGORY_TRANSPORT: &str = "transport";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub target_user_id: Uuid,
    pub title: String,
    pub message: String,
    pub category: String,
}

impl Notification {
    pub fn transport(target_user_id: Uuid, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            target_user_id,
            title: title.into(),
            message: message.into(),
            category: CATEGORY_TRANSPORT.to_string(),
        }
    }
}

pub struct NotificationHub {
    tx: broadcast::Sender<Notification>,
}

impl NotificationHub {
    pub fn new(buffer_size: usize) -> Self {
        let (tx, _unused_rx) = broadcast::channel(buffer_size);
        Self { tx }
    }

    pub fn publish(&self, notification: Notification) {
        if let Err(err) = self.tx.send(notification) {
            tracing::debug!(error = %err, "notification dropped: no subscribers");
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_without_subscribers_does_not_panic() {
        let hub = NotificationHub::new(8);
        hub.publish(Notification::transport(Uuid::new_v4(), "t", "m"));
    }

    #[tokio::test]
    async fn subscribers_receive_published_notifications() {
        let hub = NotificationHub::new(8);
        let mut rx = hub.subscribe();

        let target = Uuid::new_v4();
        hub.publish(Notification::transport(target, "Tracking update", "moved"));

        let got = rx.recv().await.expect("notification");
        assert_eq!(got.target_user_id, target);
        assert_eq!(got.category, CATEGORY_TRANSPORT);
    }
}
