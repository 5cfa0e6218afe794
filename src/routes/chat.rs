use axum::{
    Extension, Json,
    extract::{
        Path, Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio::sync::broadcast::error::RecvError;

use crate::{
    AppState,
    error::{AppError, Result},
    models::{
        ChatEvent, ChatMessage, ClientFrame, Conversation, ConversationParticipants,
        ConversationSummary, MessageQuery, OpenConversationRequest, ReadReceipt,
        SendMessageRequest,
    },
    queries::{chat_queries, shop_queries},
    utils::{extractors::extract_user_id, jwt::Claims, pagination::Paginated},
};

const MAX_MESSAGE_CHARS: usize = 2000;

pub async fn open_conversation(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<OpenConversationRequest>,
) -> Result<Json<Conversation>> {
    let user_id = extract_user_id(&claims)?;

    let shop = shop_queries::find_by_id(&state.db, payload.shop_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Shop with id {} not found", payload.shop_id)))?;

    if shop.owner_id == user_id {
        return Err(AppError::BadRequest(
            "You cannot open a conversation with your own shop".to_string(),
        ));
    }

    let conversation = chat_queries::open_conversation(&state.db, user_id, shop.id).await?;

    Ok(Json(conversation))
}

pub async fn list_conversations(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<ConversationSummary>>> {
    let user_id = extract_user_id(&claims)?;
    let conversations = chat_queries::list_for_user(&state.db, user_id).await?;

    Ok(Json(conversations))
}

pub async fn get_messages(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i32>,
    Query(params): Query<MessageQuery>,
) -> Result<Json<Paginated<ChatMessage>>> {
    let user_id = extract_user_id(&claims)?;
    require_participant(&state, id, user_id).await?;

    let messages = chat_queries::list_messages(&state.db, id, params.page()).await?;

    Ok(Json(messages))
}

pub async fn send_message(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i32>,
    Json(payload): Json<SendMessageRequest>,
) -> Result<Json<ChatMessage>> {
    let user_id = extract_user_id(&claims)?;
    require_participant(&state, id, user_id).await?;

    let message = post_message(&state, id, user_id, &payload.content).await?;

    Ok(Json(message))
}

pub async fn mark_read(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i32>,
) -> Result<Json<ReadReceipt>> {
    let user_id = extract_user_id(&claims)?;
    require_participant(&state, id, user_id).await?;

    let receipt = read_all(&state, id, user_id).await?;

    Ok(Json(receipt))
}

pub async fn chat_socket(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i32>,
) -> Result<Response> {
    let user_id = extract_user_id(&claims)?;
    require_participant(&state, id, user_id).await?;

    Ok(ws.on_upgrade(move |socket| run_socket(socket, state, id, user_id)))
}

async fn run_socket(socket: WebSocket, state: AppState, conversation_id: i32, user_id: i32) {
    let mut events = state.chat_hub.subscribe(conversation_id).await;
    let (mut sender, mut receiver) = socket.split();

    tracing::info!("User {} joined conversation {}", user_id, conversation_id);

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => {
                    let text = match serde_json::to_string(&event) {
                        Ok(text) => text,
                        Err(e) => {
                            tracing::error!("Failed to encode chat event: {}", e);
                            continue;
                        }
                    };
                    if sender.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(
                        "Socket of user {} in conversation {} skipped {} events",
                        user_id,
                        conversation_id,
                        skipped
                    );
                }
                Err(RecvError::Closed) => break,
            },
            frame = receiver.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    if let Err(e) = handle_frame(&state, conversation_id, user_id, text.as_str()).await {
                        let reply = json!({ "type": "error", "message": frame_error(e) }).to_string();
                        if sender.send(Message::Text(reply.into())).await.is_err() {
                            break;
                        }
                    }
                }
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    drop(events);
    state.chat_hub.release(conversation_id).await;

    tracing::info!("User {} left conversation {}", user_id, conversation_id);
}

async fn handle_frame(state: &AppState, conversation_id: i32, user_id: i32, text: &str) -> Result<()> {
    let frame: ClientFrame = serde_json::from_str(text)
        .map_err(|e| AppError::BadRequest(format!("Invalid frame: {}", e)))?;

    match frame {
        ClientFrame::Message { content } => {
            post_message(state, conversation_id, user_id, &content).await?;
        }
        ClientFrame::Read => {
            read_all(state, conversation_id, user_id).await?;
        }
    }

    Ok(())
}

fn frame_error(err: AppError) -> String {
    match err {
        AppError::BadRequest(msg)
        | AppError::NotFound(msg)
        | AppError::Conflict(msg)
        | AppError::Unauthorized(msg)
        | AppError::Forbidden(msg) => msg,
        other => {
            tracing::error!("Chat frame failed: {}", other);
            "Internal server error".to_string()
        }
    }
}

async fn require_participant(
    state: &AppState,
    conversation_id: i32,
    user_id: i32,
) -> Result<ConversationParticipants> {
    let participants = chat_queries::find_participants(&state.db, conversation_id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("Conversation with id {} not found", conversation_id))
        })?;

    if !participants.includes(user_id) {
        return Err(AppError::Forbidden(
            "You are not a participant of this conversation".to_string(),
        ));
    }

    Ok(participants)
}

async fn post_message(
    state: &AppState,
    conversation_id: i32,
    sender_id: i32,
    content: &str,
) -> Result<ChatMessage> {
    let content = message_content(content)?;
    let message = chat_queries::insert_message(&state.db, conversation_id, sender_id, content).await?;

    state
        .chat_hub
        .publish(conversation_id, ChatEvent::Message(message.clone()))
        .await;

    Ok(message)
}

async fn read_all(state: &AppState, conversation_id: i32, reader_id: i32) -> Result<ReadReceipt> {
    let read_at = Utc::now();
    let count = chat_queries::mark_read(&state.db, conversation_id, reader_id, read_at).await?;

    let receipt = ReadReceipt {
        conversation_id,
        reader_id,
        read_at,
        count,
    };

    if count > 0 {
        state
            .chat_hub
            .publish(conversation_id, ChatEvent::Read(receipt.clone()))
            .await;
    }

    Ok(receipt)
}

fn message_content(raw: &str) -> Result<&str> {
    let content = raw.trim();

    if content.is_empty() {
        return Err(AppError::BadRequest("Message cannot be empty".to_string()));
    }

    if content.chars().count() > MAX_MESSAGE_CHARS {
        return Err(AppError::BadRequest(format!(
            "Message cannot exceed {} characters",
            MAX_MESSAGE_CHARS
        )));
    }

    Ok(content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_is_trimmed() {
        assert_eq!(message_content("  hello ").unwrap(), "hello");
    }

    #[test]
    fn blank_content_is_rejected() {
        assert!(matches!(message_content("   "), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn length_is_counted_in_characters() {
        let at_limit = "é".repeat(MAX_MESSAGE_CHARS);
        assert!(message_content(&at_limit).is_ok());

        let over = "a".repeat(MAX_MESSAGE_CHARS + 1);
        assert!(matches!(message_content(&over), Err(AppError::BadRequest(_))));
    }
}
