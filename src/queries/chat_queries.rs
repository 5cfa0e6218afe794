use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::{
    error::Result,
    models::{ChatMessage, Conversation, ConversationParticipants, ConversationSummary},
    utils::pagination::{Page, Paginated},
};

/// Returns the existing conversation for the pair, creating it on first contact.
pub async fn open_conversation(pool: &PgPool, customer_id: i32, shop_id: i32) -> Result<Conversation> {
    let conversation = sqlx::query_as::<_, Conversation>(
        "INSERT INTO conversations (customer_id, shop_id)
         VALUES ($1, $2)
         ON CONFLICT (customer_id, shop_id) DO UPDATE SET customer_id = EXCLUDED.customer_id
         RETURNING *",
    )
    .bind(customer_id)
    .bind(shop_id)
    .fetch_one(pool)
    .await?;

    Ok(conversation)
}

/// Participants of a live conversation; `None` once it or its shop is removed.
pub async fn find_participants(
    pool: &PgPool,
    conversation_id: i32,
) -> Result<Option<ConversationParticipants>> {
    let participants = sqlx::query_as::<_, ConversationParticipants>(
        "SELECT c.id, c.customer_id, c.shop_id, s.owner_id AS shop_owner_id
         FROM conversations c
         INNER JOIN shops s ON s.id = c.shop_id
         WHERE c.id = $1 AND c.delete_at IS NULL AND s.delete_at IS NULL",
    )
    .bind(conversation_id)
    .fetch_optional(pool)
    .await?;

    Ok(participants)
}

/// Live conversations where the user is the customer or owns the shop.
pub async fn list_for_user(pool: &PgPool, user_id: i32) -> Result<Vec<ConversationSummary>> {
    let summaries = sqlx::query_as::<_, ConversationSummary>(
        r#"
        SELECT
            c.id,
            c.customer_id,
            u.name AS customer_name,
            c.shop_id,
            s.name AS shop_name,
            last.content AS last_message,
            last.create_at AS last_message_at,
            (
                SELECT COUNT(*)
                FROM chat_messages m
                WHERE m.conversation_id = c.id
                  AND m.sender_id != $1
                  AND m.read_at IS NULL
                  AND m.delete_at IS NULL
            )::bigint AS unread_count,
            c.update_at
        FROM conversations c
        INNER JOIN shops s ON s.id = c.shop_id
        INNER JOIN users u ON u.id = c.customer_id
        LEFT JOIN LATERAL (
            SELECT content, create_at
            FROM chat_messages
            WHERE conversation_id = c.id AND delete_at IS NULL
            ORDER BY create_at DESC, id DESC
            LIMIT 1
        ) last ON TRUE
        WHERE (c.customer_id = $1 OR s.owner_id = $1)
          AND c.delete_at IS NULL
          AND s.delete_at IS NULL
        ORDER BY c.update_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(summaries)
}

pub async fn list_messages(
    pool: &PgPool,
    conversation_id: i32,
    page: Page,
) -> Result<Paginated<ChatMessage>> {
    let total: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM chat_messages WHERE conversation_id = $1 AND delete_at IS NULL",
    )
    .bind(conversation_id)
    .fetch_one(pool)
    .await?;

    let messages = sqlx::query_as::<_, ChatMessage>(
        "SELECT * FROM chat_messages
         WHERE conversation_id = $1 AND delete_at IS NULL
         ORDER BY create_at DESC, id DESC
         LIMIT $2 OFFSET $3",
    )
    .bind(conversation_id)
    .bind(page.limit)
    .bind(page.skip())
    .fetch_all(pool)
    .await?;

    Ok(Paginated::new(messages, total, page))
}

pub async fn insert_message(
    pool: &PgPool,
    conversation_id: i32,
    sender_id: i32,
    content: &str,
) -> Result<ChatMessage> {
    let mut tx = pool.begin().await?;

    let message = sqlx::query_as::<_, ChatMessage>(
        "INSERT INTO chat_messages (conversation_id, sender_id, content)
         VALUES ($1, $2, $3)
         RETURNING *",
    )
    .bind(conversation_id)
    .bind(sender_id)
    .bind(content)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query("UPDATE conversations SET update_at = NOW() WHERE id = $1")
        .bind(conversation_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(message)
}

/// Marks everything the other party sent as read; returns how many rows changed.
pub async fn mark_read(
    pool: &PgPool,
    conversation_id: i32,
    reader_id: i32,
    read_at: DateTime<Utc>,
) -> Result<u64> {
    let result = sqlx::query(
        "UPDATE chat_messages SET read_at = $1, update_at = NOW()
         WHERE conversation_id = $2 AND sender_id != $3
           AND read_at IS NULL AND delete_at IS NULL",
    )
    .bind(read_at)
    .bind(conversation_id)
    .bind(reader_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}
