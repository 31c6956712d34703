//! wchat: group chats, one conversation per topic (`group:thread`, thread `0` outside topics).

use async_trait::async_trait;
use chatsim_core::{ConversationId, CoreError, Handler, HandlerResponse, Message, Result};
use tracing::{debug, instrument};

use crate::settings::{ConversationSettings, WChatSettings};

use super::routes::ChatRoutes;

pub struct WChatHandler {
    settings: WChatSettings,
    routes: ChatRoutes,
}

impl WChatHandler {
    pub fn new(settings: WChatSettings, routes: ChatRoutes) -> Self {
        Self { settings, routes }
    }
}

#[async_trait]
impl Handler for WChatHandler {
    #[instrument(skip(self, message), fields(chat_id = message.chat.id, thread_id = ?message.thread_id))]
    async fn handle(&self, message: &Message) -> Result<HandlerResponse> {
        if !message.chat.is_group() || message.user.is_bot {
            return Ok(HandlerResponse::Continue);
        }

        let conversation = ConversationId::topic(message.chat.id, message.thread_id);
        let enabled = self
            .settings
            .is_enabled(&conversation)
            .await
            .map_err(|e| CoreError::Storage(e.to_string()))?;
        if !enabled {
            debug!(topic = %conversation, "wchat not enabled for topic");
            return Ok(HandlerResponse::Continue);
        }

        Ok(self.routes.route(conversation, message))
    }
}
