use chatsim_core::{Chat, Message, MessageDirection, MessageKind, ToCoreMessage, ToCoreUser, User};

/// Telegram user to core user.
pub struct TelegramUserWrapper<'a>(pub &'a teloxide::types::User);

impl<'a> ToCoreUser for TelegramUserWrapper<'a> {
    fn to_core(&self) -> User {
        User {
            id: self.0.id.0 as i64,
            username: self.0.username.clone(),
            first_name: Some(self.0.first_name.clone()),
            last_name: self.0.last_name.clone(),
            is_bot: self.0.is_bot,
        }
    }
}

/// Telegram message to core message.
pub struct TelegramMessageWrapper<'a>(pub &'a teloxide::types::Message);

impl<'a> ToCoreMessage for TelegramMessageWrapper<'a> {
    fn to_core(&self) -> Message {
        let (kind, content) = self.kind_and_content();
        Message {
            id: self.0.id.to_string(),
            user: self
                .0
                .from
                .as_ref()
                .map(|u| TelegramUserWrapper(u).to_core())
                .unwrap_or_else(|| User {
                    id: 0,
                    username: None,
                    first_name: None,
                    last_name: None,
                    is_bot: false,
                }),
            chat: Chat {
                id: self.0.chat.id.0,
                chat_type: chat_type(&self.0.chat).to_string(),
            },
            thread_id: self.thread_id(),
            content,
            kind,
            direction: MessageDirection::Incoming,
            created_at: self.0.date,
        }
    }
}

fn chat_type(chat: &teloxide::types::Chat) -> &'static str {
    if chat.is_private() {
        "private"
    } else if chat.is_supergroup() {
        "supergroup"
    } else if chat.is_group() {
        "group"
    } else {
        "channel"
    }
}

impl<'a> TelegramMessageWrapper<'a> {
    /// Forum topic thread; replies in non-forum groups carry a thread id too, which is ignored.
    fn thread_id(&self) -> Option<i32> {
        if !self.0.is_topic_message {
            return None;
        }
        self.0.thread_id.map(|thread| thread.0 .0)
    }

    fn kind_and_content(&self) -> (MessageKind, String) {
        if let Some(text) = self.0.text() {
            return (MessageKind::Text, text.to_string());
        }
        let caption = self.0.caption().unwrap_or("").to_string();
        if let Some(largest) = self.0.photo().and_then(|sizes| sizes.last()) {
            return (
                MessageKind::Photo {
                    file_id: largest.file.id.0.clone(),
                },
                caption,
            );
        }
        if self.0.sticker().is_some() {
            return (MessageKind::Sticker, String::new());
        }
        (MessageKind::Other, caption)
    }
}
