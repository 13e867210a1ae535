use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use tokio::sync::Mutex;
use uuid::Uuid;

use toolshare_core::domain::listing::UserId;
use toolshare_core::domain::rental::ChatId;
use toolshare_core::messaging::{MessageContext, MessageTemplate, MessagingError, SystemMessenger};

use super::listing::format_timestamp;
use super::{decode_error, RepositoryError};
use crate::DbPool;

#[derive(Clone, Debug, PartialEq)]
pub struct SentMessage {
    pub chat_id: ChatId,
    pub template: MessageTemplate,
    pub context: MessageContext,
    pub from: UserId,
    pub to: UserId,
}

/// Appends system messages to the `chat_message` table.
pub struct SqlSystemMessenger {
    pool: DbPool,
}

impl SqlSystemMessenger {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Messages in a chat, oldest first.
    pub async fn list_for_chat(
        &self,
        chat_id: &ChatId,
    ) -> Result<Vec<SentMessage>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT chat_id, template_key, context_json, sender_id, recipient_id
             FROM chat_message WHERE chat_id = ? ORDER BY created_at ASC, rowid ASC",
        )
        .bind(&chat_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let chat_id: String = row.try_get("chat_id").map_err(decode_error)?;
                let template_key: String = row.try_get("template_key").map_err(decode_error)?;
                let context_json: String = row.try_get("context_json").map_err(decode_error)?;
                let sender_id: String = row.try_get("sender_id").map_err(decode_error)?;
                let recipient_id: String = row.try_get("recipient_id").map_err(decode_error)?;

                let template = MessageTemplate::parse(&template_key).ok_or_else(|| {
                    RepositoryError::Decode(format!("unknown message template `{template_key}`"))
                })?;
                let context: serde_json::Map<String, serde_json::Value> =
                    serde_json::from_str(&context_json).map_err(decode_error)?;

                Ok(SentMessage {
                    chat_id: ChatId(chat_id),
                    template,
                    context: MessageContext::from(context),
                    from: UserId(sender_id),
                    to: UserId(recipient_id),
                })
            })
            .collect()
    }
}

#[async_trait]
impl SystemMessenger for SqlSystemMessenger {
    async fn send_system_message(
        &self,
        chat_id: &ChatId,
        template: MessageTemplate,
        context: MessageContext,
        from: &UserId,
        to: &UserId,
    ) -> Result<(), MessagingError> {
        let context_json = serde_json::to_string(&context.into_value())
            .map_err(|error| MessagingError::Delivery(error.to_string()))?;

        sqlx::query(
            "INSERT INTO chat_message
                 (id, chat_id, template_key, context_json, sender_id, recipient_id, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&chat_id.0)
        .bind(template.key())
        .bind(context_json)
        .bind(&from.0)
        .bind(&to.0)
        .bind(format_timestamp(&Utc::now()))
        .execute(&self.pool)
        .await
        .map_err(|error| MessagingError::Delivery(error.to_string()))?;

        Ok(())
    }
}

/// Records messages in memory instead of delivering them.
#[derive(Default)]
pub struct InMemorySystemMessenger {
    sent: Mutex<Vec<SentMessage>>,
}

impl InMemorySystemMessenger {
    pub async fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl SystemMessenger for InMemorySystemMessenger {
    async fn send_system_message(
        &self,
        chat_id: &ChatId,
        template: MessageTemplate,
        context: MessageContext,
        from: &UserId,
        to: &UserId,
    ) -> Result<(), MessagingError> {
        self.sent.lock().await.push(SentMessage {
            chat_id: chat_id.clone(),
            template,
            context,
            from: from.clone(),
            to: to.clone(),
        });
        Ok(())
    }
}
