use std::{collections::HashMap, sync::Arc};

use tokio::sync::{Mutex, broadcast};

use crate::models::ChatEvent;

const CHANNEL_CAPACITY: usize = 64;

/// In-process fan-out of chat events, one broadcast channel per conversation.
#[derive(Clone)]
pub struct ChatHub {
    topics: Arc<Mutex<HashMap<i32, broadcast::Sender<ChatEvent>>>>,
    capacity: usize,
}

impl Default for ChatHub {
    fn default() -> Self {
        Self::with_capacity(CHANNEL_CAPACITY)
    }
}

impl ChatHub {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            topics: Arc::new(Mutex::new(HashMap::new())),
            capacity,
        }
    }

    pub async fn subscribe(&self, conversation_id: i32) -> broadcast::Receiver<ChatEvent> {
        let mut topics = self.topics.lock().await;

        match topics.get(&conversation_id) {
            Some(tx) => tx.subscribe(),
            None => {
                let (tx, rx) = broadcast::channel(self.capacity);
                topics.insert(conversation_id, tx);
                rx
            }
        }
    }

    /// Returns how many live subscribers the event reached.
    pub async fn publish(&self, conversation_id: i32, event: ChatEvent) -> usize {
        let topics = self.topics.lock().await;

        let Some(tx) = topics.get(&conversation_id) else {
            return 0;
        };

        tx.send(event).unwrap_or(0)
    }

    /// Drops the conversation's channel once its last receiver is gone.
    /// Call after dropping the receiver returned by `subscribe`.
    pub async fn release(&self, conversation_id: i32) {
        let mut topics = self.topics.lock().await;

        if let Some(tx) = topics.get(&conversation_id) {
            if tx.receiver_count() == 0 {
                topics.remove(&conversation_id);
            }
        }
    }

    pub async fn active_conversations(&self) -> usize {
        self.topics.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ReadReceipt;
    use chrono::Utc;

    fn receipt(conversation_id: i32, count: u64) -> ChatEvent {
        ChatEvent::Read(ReadReceipt {
            conversation_id,
            reader_id: 1,
            read_at: Utc::now(),
            count,
        })
    }

    #[tokio::test]
    async fn events_reach_every_subscriber_of_the_conversation() {
        let hub = ChatHub::default();
        let mut a = hub.subscribe(1).await;
        let mut b = hub.subscribe(1).await;
        let mut other = hub.subscribe(2).await;

        assert_eq!(hub.publish(1, receipt(1, 3)).await, 2);

        for rx in [&mut a, &mut b] {
            match rx.recv().await.unwrap() {
                ChatEvent::Read(r) => assert_eq!(r.count, 3),
                ChatEvent::Message(_) => panic!("unexpected message event"),
            }
        }
        assert!(other.try_recv().is_err());
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_a_no_op() {
        let hub = ChatHub::default();
        assert_eq!(hub.publish(9, receipt(9, 1)).await, 0);
        assert_eq!(hub.active_conversations().await, 0);
    }

    #[tokio::test]
    async fn channel_is_released_after_last_receiver() {
        let hub = ChatHub::default();
        let a = hub.subscribe(5).await;
        let b = hub.subscribe(5).await;

        drop(a);
        hub.release(5).await;
        assert_eq!(hub.active_conversations().await, 1);

        drop(b);
        hub.release(5).await;
        assert_eq!(hub.active_conversations().await, 0);
    }

    #[tokio::test]
    async fn slow_receiver_lags_instead_of_blocking() {
        let hub = ChatHub::with_capacity(2);
        let mut rx = hub.subscribe(1).await;

        for n in 0..5 {
            hub.publish(1, receipt(1, n)).await;
        }

        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Lagged(3))
        ));
        match rx.recv().await.unwrap() {
            ChatEvent::Read(r) => assert_eq!(r.count, 3),
            ChatEvent::Message(_) => panic!("unexpected message event"),
        }
    }
}
