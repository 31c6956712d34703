//! Shared routing of an accepted chat message into the text batcher, the photo batcher or the
//! sticker responder.

use std::sync::Arc;

use chatsim_core::{ConversationId, HandlerResponse, Message, MessageKind};
use tracing::debug;

use crate::batcher::ConversationBatcher;
use crate::pipeline::{PhotoItem, TextItem};

use super::stickers::StickerResponder;

#[derive(Clone)]
pub struct ChatRoutes {
    pub text: ConversationBatcher<TextItem>,
    pub photos: ConversationBatcher<PhotoItem>,
    pub stickers: Arc<StickerResponder>,
}

impl ChatRoutes {
    /// `Stop` when the message was queued or answered; `Continue` for kinds the chat plugins
    /// do not handle.
    pub fn route(&self, conversation: ConversationId, message: &Message) -> HandlerResponse {
        let author = message.user.display_name().to_string();
        let target = message.reply_target();
        match &message.kind {
            MessageKind::Text => {
                let Some(text) = message.text() else {
                    return HandlerResponse::Continue;
                };
                let scheduled = self.text.on_message(
                    conversation.clone(),
                    TextItem {
                        text: text.to_string(),
                        author,
                        target,
                    },
                );
                debug!(conversation = %conversation, scheduled, "Text queued");
                HandlerResponse::Stop
            }
            MessageKind::Photo { file_id } => {
                let scheduled = self.photos.on_message(
                    conversation.clone(),
                    PhotoItem {
                        file_id: file_id.clone(),
                        caption: message.content.trim().to_string(),
                        author,
                        target,
                        message_id: message.id.clone(),
                    },
                );
                debug!(conversation = %conversation, scheduled, "Photo queued");
                HandlerResponse::Stop
            }
            MessageKind::Sticker => {
                self.stickers.respond(target, message.id.clone());
                HandlerResponse::Stop
            }
            MessageKind::Other => HandlerResponse::Continue,
        }
    }
}
