//! # Operator commands
//!
//! Owner-only commands behind the configured prefix (default `.`). Replies go to the chat the
//! command came from. Messages from anyone else, or without a known command, pass through to
//! the chat plugins.
//!
//! | command | arguments |
//! |---|---|
//! | `gchat`, `gc` | `on\|off\|del\|all [user_id]` |
//! | `role` | `[user_id] [role text]` |
//! | `setgkey`, `setwkey` | `[add <key>\|set <n>\|del <n>]` |
//! | `wchat`, `wc` | `on\|off\|del [thread_id]`, `all` |
//! | `wrole` | `group [role]`, `topic [thread_id] [role]` |
//! | `followup`, `fp` | `on\|off\|all [user_id]` |
//! | `el`, `elevenlabs` | `<text>` |
//! | `set_el`, `set_elevenlabs` | `add_key <k>`, `del_key <n>`, `set_key <n>`, `voice_id\|stability\|similarity_boost <value>` |

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use chatsim_core::{Bot, ConversationId, Handler, HandlerResponse, Message, Result};
use llm_client::mask_token;
use storage::{KvStore, KvStoreExt};
use tracing::{info, instrument, warn};

use crate::credentials::{CredentialRotator, ELEVENLABS_NAMESPACE};
use crate::settings::{GChatSettings, WChatSettings};
use crate::voice::{
    load_voice_settings, remove_audio, SpeechSynthesizer, SIMILARITY_BOOST_FIELD,
    STABILITY_FIELD, VOICE_ID_FIELD,
};

use super::followup::FollowUpState;

/// Everything the commands read or change.
#[derive(Clone)]
pub struct CommandContext {
    pub store: Arc<dyn KvStore>,
    pub bot: Arc<dyn Bot>,
    pub gchat: GChatSettings,
    pub gchat_keys: CredentialRotator,
    pub wchat: WChatSettings,
    pub wchat_keys: CredentialRotator,
    pub follow_ups: FollowUpState,
    pub elevenlabs_keys: CredentialRotator,
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
}

pub struct CommandHandler {
    owner_id: i64,
    prefix: String,
    ctx: CommandContext,
}

/// Parsed invocation: command name plus whitespace-separated arguments.
struct Invocation<'a> {
    name: String,
    args: Vec<&'a str>,
    message: &'a Message,
}

impl Invocation<'_> {
    fn arg(&self, index: usize) -> Option<&str> {
        self.args.get(index).copied()
    }

    /// Arguments from `index` on, joined by single spaces; `None` when empty.
    fn rest(&self, index: usize) -> Option<String> {
        let rest = self.args.get(index..).unwrap_or_default().join(" ");
        (!rest.is_empty()).then_some(rest)
    }

    /// Numeric id argument, or the chat the command was sent in.
    fn id_or_chat(&self, index: usize) -> i64 {
        self.arg(index)
            .and_then(parse_id)
            .unwrap_or(self.message.chat.id)
    }
}

fn parse_id(raw: &str) -> Option<i64> {
    if raw.starts_with('-') || raw.chars().all(|c| c.is_ascii_digit()) {
        raw.parse().ok()
    } else {
        None
    }
}

fn enabled(flag: bool) -> &'static str {
    if flag {
        "enabled"
    } else {
        "disabled"
    }
}

impl CommandHandler {
    pub fn new(owner_id: i64, prefix: impl Into<String>, ctx: CommandContext) -> Self {
        Self {
            owner_id,
            prefix: prefix.into(),
            ctx,
        }
    }

    fn parse<'a>(&self, message: &'a Message) -> Option<Invocation<'a>> {
        let text = message.text()?;
        let body = text.strip_prefix(self.prefix.as_str())?;
        let mut words = body.split_whitespace();
        let name = words.next()?.to_lowercase();
        Some(Invocation {
            name,
            args: words.collect(),
            message,
        })
    }

    /// `None` for unknown commands. `Some(None)` when handled without a text reply.
    async fn dispatch(&self, inv: &Invocation<'_>) -> Option<anyhow::Result<Option<String>>> {
        let result = match inv.name.as_str() {
            "gchat" | "gc" => self.gchat(inv).await.map(Some),
            "role" => self.role(inv).await.map(Some),
            "setgkey" => key_command(&self.ctx.gchat_keys, "setgkey", &self.prefix, inv)
                .await
                .map(Some),
            "wchat" | "wc" => self.wchat(inv).await.map(Some),
            "wrole" => self.wrole(inv).await.map(Some),
            "setwkey" => key_command(&self.ctx.wchat_keys, "setwkey", &self.prefix, inv)
                .await
                .map(Some),
            "followup" | "fp" => self.followup(inv).await.map(Some),
            "el" | "elevenlabs" => self.speak(inv).await,
            "set_el" | "set_elevenlabs" => self.set_elevenlabs(inv).await.map(Some),
            _ => return None,
        };
        Some(result)
    }

    async fn gchat(&self, inv: &Invocation<'_>) -> anyhow::Result<String> {
        let user_id = inv.id_or_chat(1);
        let settings = &self.ctx.gchat;
        Ok(match inv.arg(0).map(str::to_lowercase).as_deref() {
            Some("on") => {
                settings.enable(user_id).await?;
                format!("gchat is enabled for user {}.", user_id)
            }
            Some("off") => {
                settings.disable(user_id).await?;
                format!("gchat is disabled for user {}.", user_id)
            }
            Some("del") => {
                settings
                    .history()
                    .clear(&ConversationId::User(user_id))
                    .await?;
                format!("Chat history deleted for user {}.", user_id)
            }
            Some("all") => {
                let all = settings.toggle_all().await?;
                format!("gchat is now {} for all users.", enabled(all))
            }
            _ => format!("Usage: {}gchat on|off|del|all [user_id]", self.prefix),
        })
    }

    async fn role(&self, inv: &Invocation<'_>) -> anyhow::Result<String> {
        let (user_id, role) = match inv.arg(0).and_then(parse_id) {
            Some(id) => (id, inv.rest(1)),
            None => (inv.message.chat.id, inv.rest(0)),
        };
        let stored = self.ctx.gchat.set_role(user_id, role.as_deref()).await?;
        Ok(match role {
            Some(_) => format!("Role set for user {}.\nNew role: {}", user_id, stored),
            None => format!("Role reset to default for user {}.", user_id),
        })
    }

    async fn wchat(&self, inv: &Invocation<'_>) -> anyhow::Result<String> {
        let chat = &inv.message.chat;
        if !chat.is_group() {
            return Ok(format!("Use {}wchat inside a group.", self.prefix));
        }
        let settings = &self.ctx.wchat;
        let command = inv.arg(0).map(str::to_lowercase);
        if command.as_deref() == Some("all") {
            let all = settings.toggle_group(chat.id).await?;
            return Ok(format!(
                "wchat is now {} for all topics in this group.",
                enabled(all)
            ));
        }

        let thread = match inv.arg(1) {
            Some(raw) => match raw.parse::<i32>() {
                Ok(thread) if thread >= 0 => thread,
                _ => {
                    return Ok(format!(
                        "Invalid thread ID: {}. Please provide a numeric thread ID.",
                        raw
                    ))
                }
            },
            None => inv.message.thread_id.unwrap_or(0),
        };
        let topic = ConversationId::topic(chat.id, Some(thread));

        Ok(match command.as_deref() {
            Some("on") => {
                settings.enable_topic(&topic).await?;
                format!("wchat is enabled for topic {}.", topic)
            }
            Some("off") => {
                settings.disable_topic(&topic).await?;
                format!("wchat is disabled for topic {}.", topic)
            }
            Some("del") => {
                settings.history().clear(&topic).await?;
                format!("Chat history deleted for topic {}.", topic)
            }
            _ => format!(
                "Usage: {p}wchat on|off|del [thread_id] or {p}wchat all",
                p = self.prefix
            ),
        })
    }

    async fn wrole(&self, inv: &Invocation<'_>) -> anyhow::Result<String> {
        let chat = &inv.message.chat;
        if !chat.is_group() {
            return Ok(format!("Use {}wrole inside a group.", self.prefix));
        }
        let settings = &self.ctx.wchat;
        Ok(match inv.arg(0).map(str::to_lowercase).as_deref() {
            Some("group") => {
                let role = inv.rest(1);
                settings.set_group_role(chat.id, role.as_deref()).await?;
                match role {
                    Some(role) => format!("Role set for group {}.\nNew role: {}", chat.id, role),
                    None => format!("Role reset to default for group {}.", chat.id),
                }
            }
            Some("topic") => {
                let (thread, role) = match inv.arg(1).and_then(|s| s.parse::<i32>().ok()) {
                    Some(thread) if thread >= 0 => (thread, inv.rest(2)),
                    _ => (inv.message.thread_id.unwrap_or(0), inv.rest(1)),
                };
                let topic = ConversationId::topic(chat.id, Some(thread));
                let stored = settings.set_topic_role(&topic, role.as_deref()).await?;
                match role {
                    Some(_) => format!("Role set for topic {}.\nNew role: {}", topic, stored),
                    None => format!("Role reset to group's role for topic {}.", topic),
                }
            }
            _ => format!(
                "Usage: {p}wrole group [role] or {p}wrole topic [thread_id] [role]",
                p = self.prefix
            ),
        })
    }

    async fn followup(&self, inv: &Invocation<'_>) -> anyhow::Result<String> {
        let user_id = inv.id_or_chat(1);
        let state = &self.ctx.follow_ups;
        Ok(match inv.arg(0).map(str::to_lowercase).as_deref() {
            Some("on") => {
                state.enable(user_id).await?;
                format!("Follow-ups enabled for {}", user_id)
            }
            Some("off") => {
                state.disable(user_id).await?;
                format!("Follow-ups disabled for {}", user_id)
            }
            Some("all") => {
                let all = state.toggle_all().await?;
                format!("Global follow-ups {}", enabled(all))
            }
            _ => format!("Usage: {}followup on|off|all [user_id]", self.prefix),
        })
    }

    /// Synthesizes the text and sends it as a voice note into this chat.
    async fn speak(&self, inv: &Invocation<'_>) -> anyhow::Result<Option<String>> {
        let Some(text) = inv.rest(0) else {
            return Ok(Some(format!("Usage: {}el <text>", self.prefix)));
        };
        let path = self.ctx.synthesizer.synthesize(&text).await?;
        let sent = self
            .ctx
            .bot
            .send_voice(&inv.message.reply_target(), &path)
            .await;
        remove_audio(&path).await;
        sent.context("Failed to send voice note")?;
        Ok(None)
    }

    async fn set_elevenlabs(&self, inv: &Invocation<'_>) -> anyhow::Result<String> {
        let keys = &self.ctx.elevenlabs_keys;
        let store = self.ctx.store.as_ref();
        let action = inv.arg(0).map(str::to_lowercase);
        let value = inv.rest(1);

        let Some(action) = action else {
            return self.elevenlabs_overview().await;
        };
        Ok(match (action.as_str(), value) {
            ("add_key", Some(key)) => {
                if keys.add(&key).await? {
                    format!("Added new key (Total: {})", keys.list().await?.len())
                } else {
                    "Key already exists".to_string()
                }
            }
            ("del_key", Some(raw)) => match raw.parse::<usize>() {
                Ok(position) => match keys.delete(position).await? {
                    Some(deleted) => format!("Deleted key: {}", mask_token(&deleted)),
                    None => "Invalid key number".to_string(),
                },
                Err(_) => "Invalid key number".to_string(),
            },
            ("set_key", Some(raw)) => {
                let activated = match raw.parse::<usize>() {
                    Ok(position) => keys.set_active(position).await?.then_some(position),
                    Err(_) => None,
                };
                match activated {
                    Some(position) => format!("Active key set to #{}", position),
                    None => "Invalid key number".to_string(),
                }
            }
            (field @ (STABILITY_FIELD | SIMILARITY_BOOST_FIELD), Some(raw)) => {
                match raw.parse::<f64>() {
                    Ok(v) if (0.0..=1.0).contains(&v) => {
                        store.set(ELEVENLABS_NAMESPACE, field, &v).await?;
                        format!("Updated {} to {}", field, v)
                    }
                    _ => "Value must be a number between 0 and 1".to_string(),
                }
            }
            (VOICE_ID_FIELD, Some(voice_id)) => {
                store
                    .set(ELEVENLABS_NAMESPACE, VOICE_ID_FIELD, &voice_id)
                    .await?;
                format!("Updated {} to {}", VOICE_ID_FIELD, voice_id)
            }
            (_, None) => "Invalid command format".to_string(),
            _ => "Invalid parameter".to_string(),
        })
    }

    async fn elevenlabs_overview(&self) -> anyhow::Result<String> {
        let snapshot = self.ctx.elevenlabs_keys.snapshot().await?;
        let settings = load_voice_settings(self.ctx.store.as_ref()).await?;
        let keys = snapshot
            .keys
            .iter()
            .enumerate()
            .map(|(i, key)| {
                let current = if i == snapshot.index { " (current)" } else { "" };
                format!("{}. {}{}", i + 1, mask_token(key), current)
            })
            .collect::<Vec<_>>()
            .join("\n");
        Ok(format!(
            "ElevenLabs configuration\n\nAPI keys ({}):\n{}\n\nParameters:\nvoice_id: {}\nstability: {}\nsimilarity_boost: {}\n\nCommands:\n{p}set_el add_key <key>\n{p}set_el del_key <num>\n{p}set_el set_key <num>\n{p}set_el voice_id|stability|similarity_boost <value>",
            snapshot.keys.len(),
            keys,
            settings.voice_id,
            settings.stability,
            settings.similarity_boost,
            p = self.prefix
        ))
    }
}

/// `setgkey` / `setwkey`: list, add, activate or delete Gemini keys of one profile.
async fn key_command(
    keys: &CredentialRotator,
    name: &str,
    prefix: &str,
    inv: &Invocation<'_>,
) -> anyhow::Result<String> {
    let sub = inv.arg(0).map(str::to_lowercase);
    let value = inv.arg(1);
    Ok(match (sub.as_deref(), value) {
        (Some("add"), Some(key)) => {
            if keys.add(key).await? {
                "New Gemini API key added successfully!".to_string()
            } else {
                "Gemini API key already present.".to_string()
            }
        }
        (Some("set"), Some(raw)) => {
            let activated = match raw.parse::<usize>() {
                Ok(position) => keys.set_active(position).await?,
                Err(_) => false,
            };
            if activated {
                format!("Current Gemini API key set to key {}.", raw)
            } else {
                format!("Invalid key index: {}.", raw)
            }
        }
        (Some("del"), Some(raw)) => match raw.parse::<usize>() {
            Ok(position) => match keys.delete(position).await? {
                Some(_) => format!("Gemini API key {} deleted successfully!", position),
                None => format!("Invalid key index: {}.", raw),
            },
            Err(_) => format!("Invalid key index: {}.", raw),
        },
        (Some(_), _) => format!("Usage: {}{} [add <key>|set <n>|del <n>]", prefix, name),
        (None, _) => {
            let snapshot = keys.snapshot().await?;
            let list = snapshot
                .keys
                .iter()
                .enumerate()
                .map(|(i, key)| format!("{}. {}", i + 1, mask_token(key)))
                .collect::<Vec<_>>()
                .join("\n");
            let current = snapshot
                .current()
                .map(mask_token)
                .unwrap_or_else(|| "None".to_string());
            format!("Gemini API keys:\n\n{}\n\nCurrent key: {}", list, current)
        }
    })
}

#[async_trait]
impl Handler for CommandHandler {
    #[instrument(skip(self, message), fields(user_id = message.user.id, chat_id = message.chat.id))]
    async fn handle(&self, message: &Message) -> Result<HandlerResponse> {
        if message.user.id != self.owner_id {
            return Ok(HandlerResponse::Continue);
        }
        let Some(inv) = self.parse(message) else {
            return Ok(HandlerResponse::Continue);
        };
        let Some(result) = self.dispatch(&inv).await else {
            return Ok(HandlerResponse::Continue);
        };

        info!(command = %inv.name, "step: command handled");
        Ok(match result {
            Ok(Some(reply)) => HandlerResponse::Reply(reply),
            Ok(None) => HandlerResponse::Stop,
            Err(e) => {
                warn!(command = %inv.name, error = %e, "Command failed");
                HandlerResponse::Reply(format!("Error in `{}` command: {:#}", inv.name, e))
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_id_accepts_signed_numbers_only() {
        assert_eq!(parse_id("123"), Some(123));
        assert_eq!(parse_id("-100123"), Some(-100123));
        assert_eq!(parse_id("pirate"), None);
        assert_eq!(parse_id("12ab"), None);
    }
}
