//! Chat message write transport.

use async_trait::async_trait;

use super::client::ApiClient;
use super::traits::MutationTransport;
use crate::Result;
use crate::types::{ChatMessage, NewMessage};

/// Sends messages into one conversation on behalf of one sender.
pub struct MessageSender {
    client: ApiClient,
    conversation_id: String,
    sender_id: String,
}

impl MessageSender {
    pub fn new(
        client: ApiClient,
        conversation_id: impl Into<String>,
        sender_id: impl Into<String>,
    ) -> Self {
        Self {
            client,
            conversation_id: conversation_id.into(),
            sender_id: sender_id.into(),
        }
    }

    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }
}

#[async_trait]
impl MutationTransport for MessageSender {
    type Output = ChatMessage;

    async fn send(&self, content: &str) -> Result<ChatMessage> {
        self.client
            .send_message(&NewMessage {
                content,
                conversation_id: &self.conversation_id,
                sender_id: &self.sender_id,
            })
            .await
    }
}
