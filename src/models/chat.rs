use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::pagination::Page;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Conversation {
    pub id: i32,
    pub customer_id: i32,
    pub shop_id: i32,
    pub create_at: DateTime<Utc>,
    pub update_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub delete_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ChatMessage {
    pub id: i32,
    pub conversation_id: i32,
    pub sender_id: i32,
    pub content: String,
    pub read_at: Option<DateTime<Utc>>,
    pub create_at: DateTime<Utc>,
    pub update_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub delete_at: Option<DateTime<Utc>>,
}

/// A conversation row joined with its shop owner, used for participant checks.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ConversationParticipants {
    pub id: i32,
    pub customer_id: i32,
    pub shop_id: i32,
    pub shop_owner_id: i32,
}

impl ConversationParticipants {
    pub fn includes(&self, user_id: i32) -> bool {
        self.customer_id == user_id || self.shop_owner_id == user_id
    }
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct ConversationSummary {
    pub id: i32,
    pub customer_id: i32,
    pub customer_name: String,
    pub shop_id: i32,
    pub shop_name: String,
    pub last_message: Option<String>,
    pub last_message_at: Option<DateTime<Utc>>,
    pub unread_count: i64,
    pub update_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct OpenConversationRequest {
    pub shop_id: i32,
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReadReceipt {
    pub conversation_id: i32,
    pub reader_id: i32,
    pub read_at: DateTime<Utc>,
    pub count: u64,
}

/// Frames pushed to every subscriber of a conversation.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ChatEvent {
    Message(ChatMessage),
    Read(ReadReceipt),
}

/// Frames accepted from a connected socket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientFrame {
    Message { content: String },
    Read,
}

#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl MessageQuery {
    pub fn page(&self) -> Page {
        Page::new(self.page, self.limit)
    }
}
