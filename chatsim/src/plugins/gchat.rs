//! gchat: private one-to-one chats, one conversation per user.

use async_trait::async_trait;
use chatsim_core::{ConversationId, CoreError, Handler, HandlerResponse, Message, MessageKind, Result};
use tracing::{debug, instrument};

use crate::settings::{ConversationSettings, GChatSettings};

use super::followup::FollowUpState;
use super::routes::ChatRoutes;

pub struct GChatHandler {
    owner_id: i64,
    settings: GChatSettings,
    follow_ups: FollowUpState,
    routes: ChatRoutes,
}

impl GChatHandler {
    pub fn new(owner_id: i64, settings: GChatSettings, follow_ups: FollowUpState, routes: ChatRoutes) -> Self {
        Self {
            owner_id,
            settings,
            follow_ups,
            routes,
        }
    }
}

#[async_trait]
impl Handler for GChatHandler {
    #[instrument(skip(self, message), fields(user_id = message.user.id))]
    async fn handle(&self, message: &Message) -> Result<HandlerResponse> {
        if !message.chat.is_private() || message.user.is_bot || message.user.id == self.owner_id {
            return Ok(HandlerResponse::Continue);
        }

        let conversation = ConversationId::User(message.user.id);
        let enabled = self
            .settings
            .is_enabled(&conversation)
            .await
            .map_err(|e| CoreError::Storage(e.to_string()))?;
        if !enabled {
            debug!("gchat not enabled for user");
            return Ok(HandlerResponse::Continue);
        }

        if message.kind == MessageKind::Text {
            self.follow_ups
                .touch(message.user.id, message.created_at.timestamp())
                .await
                .map_err(|e| CoreError::Storage(e.to_string()))?;
        }

        Ok(self.routes.route(conversation, message))
    }
}
