//! Shared fixtures for chatsim integration tests: a recording bot, a scripted LLM and a
//! synthesizer stub, plus an app wired over an in-memory store.

#![allow(dead_code)]

use std::collections::{BTreeMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chatsim::components::{build_app, App, BotComponents};
use chatsim::config::{BaseConfig, BotConfig, ChatConfig};
use chatsim::voice::{SpeechSynthesizer, VoiceError};
use chatsim_core::{
    Bot, Chat, CoreError, Message, MessageDirection, MessageKind, ReplyTarget, User,
};
use chrono::Utc;
use llm_client::{EnvLlmConfig, GenerateRequest, LlmClient, LlmError, Part};
use serde_json::Value;
use storage::{InMemoryKvStore, KvStore, StorageError};
use tts_client::TtsConfig;

pub const OWNER_ID: i64 = 1;
pub const USER_ID: i64 = 7;
pub const GROUP_ID: i64 = -100500;

/// Everything the bot was asked to do, in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotEvent {
    Message { target: ReplyTarget, text: String },
    Reply { target: ReplyTarget, message_id: String, text: String },
    Typing { target: ReplyTarget },
    Voice { target: ReplyTarget, path: PathBuf },
    Download { file_id: String },
}

#[derive(Default)]
pub struct MockBot {
    events: Mutex<Vec<BotEvent>>,
    fail_voice: bool,
}

impl MockBot {
    pub fn failing_voice() -> Self {
        Self {
            fail_voice: true,
            ..Default::default()
        }
    }

    pub fn events(&self) -> Vec<BotEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Text messages sent to `chat_id`, in order.
    pub fn messages_to(&self, chat_id: i64) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                BotEvent::Message { target, text } if target.chat_id == chat_id => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn typing_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, BotEvent::Typing { .. }))
            .count()
    }

    fn record(&self, event: BotEvent) {
        self.events.lock().unwrap().push(event);
    }
}

#[async_trait]
impl Bot for MockBot {
    async fn send_message(&self, target: &ReplyTarget, text: &str) -> chatsim_core::Result<()> {
        self.record(BotEvent::Message {
            target: *target,
            text: text.to_string(),
        });
        Ok(())
    }

    async fn reply_to(
        &self,
        target: &ReplyTarget,
        message_id: &str,
        text: &str,
    ) -> chatsim_core::Result<()> {
        self.record(BotEvent::Reply {
            target: *target,
            message_id: message_id.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }

    async fn send_typing(&self, target: &ReplyTarget) -> chatsim_core::Result<()> {
        self.record(BotEvent::Typing { target: *target });
        Ok(())
    }

    async fn send_voice(&self, target: &ReplyTarget, audio: &Path) -> chatsim_core::Result<()> {
        if self.fail_voice {
            return Err(CoreError::Bot("voice upload rejected".to_string()));
        }
        self.record(BotEvent::Voice {
            target: *target,
            path: audio.to_path_buf(),
        });
        Ok(())
    }

    async fn download_file(&self, file_id: &str) -> chatsim_core::Result<Vec<u8>> {
        self.record(BotEvent::Download {
            file_id: file_id.to_string(),
        });
        Ok(format!("bytes-of-{}", file_id).into_bytes())
    }
}

/// One recorded generation call.
#[derive(Debug, Clone)]
pub struct LlmCall {
    pub api_key: String,
    pub request: GenerateRequest,
}

impl LlmCall {
    pub fn prompt(&self) -> String {
        self.request
            .parts
            .iter()
            .filter_map(|p| match p {
                Part::Text(text) => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn image_count(&self) -> usize {
        self.request
            .parts
            .iter()
            .filter(|p| matches!(p, Part::InlineData { .. }))
            .count()
    }
}

/// Replays scripted results; once the script runs out every call gets `fallback`.
pub struct MockLlm {
    script: Mutex<VecDeque<Result<String, LlmError>>>,
    fallback: String,
    calls: Mutex<Vec<LlmCall>>,
}

impl MockLlm {
    pub fn replying(fallback: &str) -> Self {
        Self::scripted(Vec::new(), fallback)
    }

    pub fn scripted(script: Vec<Result<String, LlmError>>, fallback: &str) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback: fallback.to_string(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<LlmCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmClient for MockLlm {
    async fn generate(&self, api_key: &str, request: &GenerateRequest) -> Result<String, LlmError> {
        self.calls.lock().unwrap().push(LlmCall {
            api_key: api_key.to_string(),
            request: request.clone(),
        });
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(self.fallback.clone()))
    }
}

pub fn rate_limited() -> LlmError {
    LlmError::Api {
        status: 429,
        message: "Resource has been exhausted".to_string(),
    }
}

/// Writes a small file per call into `dir`, or fails when `dir` is `None`.
pub struct MockSynthesizer {
    dir: Option<PathBuf>,
    texts: Mutex<Vec<String>>,
}

impl MockSynthesizer {
    pub fn writing_to(dir: &Path) -> Self {
        Self {
            dir: Some(dir.to_path_buf()),
            texts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            dir: None,
            texts: Mutex::new(Vec::new()),
        }
    }

    pub fn texts(&self) -> Vec<String> {
        self.texts.lock().unwrap().clone()
    }
}

#[async_trait]
impl SpeechSynthesizer for MockSynthesizer {
    async fn synthesize(&self, text: &str) -> Result<PathBuf, VoiceError> {
        let n = {
            let mut texts = self.texts.lock().unwrap();
            texts.push(text.to_string());
            texts.len()
        };
        let Some(dir) = &self.dir else {
            return Err(VoiceError::NoCredentials);
        };
        let path = dir.join(format!("voice-{}.mp3", n));
        std::fs::write(&path, b"ID3")?;
        Ok(path)
    }
}

/// In-memory store whose next read, once armed, takes `delay`.
pub struct SlowStore {
    inner: InMemoryKvStore,
    delay: Duration,
    armed: AtomicBool,
}

impl SlowStore {
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: InMemoryKvStore::new(),
            delay,
            armed: AtomicBool::new(false),
        }
    }

    pub fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl KvStore for SlowStore {
    async fn get_value(&self, namespace: &str, key: &str) -> Result<Option<Value>, StorageError> {
        if self.armed.swap(false, Ordering::SeqCst) {
            tokio::time::sleep(self.delay).await;
        }
        self.inner.get_value(namespace, key).await
    }

    async fn set_value(&self, namespace: &str, key: &str, value: Value) -> Result<(), StorageError> {
        self.inner.set_value(namespace, key, value).await
    }

    async fn remove(&self, namespace: &str, key: &str) -> Result<bool, StorageError> {
        self.inner.remove(namespace, key).await
    }

    async fn get_collection(&self, namespace: &str) -> Result<BTreeMap<String, Value>, StorageError> {
        self.inner.get_collection(namespace).await
    }
}

pub fn test_config() -> BotConfig {
    BotConfig {
        base: BaseConfig {
            bot_token: "test_token".to_string(),
            telegram_api_url: None,
            log_file: "logs/test.log".to_string(),
            database_url: ":memory:".to_string(),
            owner_id: OWNER_ID,
            operator_chat_id: OWNER_ID,
            command_prefix: ".".to_string(),
            media_dir: "./data/media".to_string(),
        },
        chat: ChatConfig::default(),
        llm: EnvLlmConfig {
            gemini_api_key: None,
            gemini_base_url: "http://127.0.0.1:9".to_string(),
            gemini_model: "test-model".to_string(),
        },
        tts: TtsConfig {
            elevenlabs_api_key: None,
            elevenlabs_base_url: "http://127.0.0.1:9".to_string(),
        },
    }
}

/// App over an in-memory store, plus handles to the mocks.
pub struct Harness {
    pub app: App,
    pub store: Arc<dyn KvStore>,
    pub bot: Arc<MockBot>,
    pub llm: Arc<MockLlm>,
    pub synthesizer: Arc<MockSynthesizer>,
}

impl Harness {
    pub fn new(bot: MockBot, llm: MockLlm, synthesizer: MockSynthesizer) -> Self {
        Self::with_config(test_config(), bot, llm, synthesizer)
    }

    pub fn with_config(
        config: BotConfig,
        bot: MockBot,
        llm: MockLlm,
        synthesizer: MockSynthesizer,
    ) -> Self {
        Self::build(config, Arc::new(InMemoryKvStore::new()), bot, llm, synthesizer)
    }

    pub fn with_store(
        store: Arc<dyn KvStore>,
        bot: MockBot,
        llm: MockLlm,
        synthesizer: MockSynthesizer,
    ) -> Self {
        Self::build(test_config(), store, bot, llm, synthesizer)
    }

    fn build(
        config: BotConfig,
        store: Arc<dyn KvStore>,
        bot: MockBot,
        llm: MockLlm,
        synthesizer: MockSynthesizer,
    ) -> Self {
        let bot = Arc::new(bot);
        let llm = Arc::new(llm);
        let synthesizer = Arc::new(synthesizer);
        let components = BotComponents {
            store: store.clone(),
            bot: bot.clone(),
            llm: llm.clone(),
            synthesizer: synthesizer.clone(),
        };
        let app = build_app(&config, &components);
        Self {
            app,
            store,
            bot,
            llm,
            synthesizer,
        }
    }
}

fn user(id: i64, first_name: &str) -> User {
    User {
        id,
        username: None,
        first_name: Some(first_name.to_string()),
        last_name: None,
        is_bot: false,
    }
}

fn message(
    id: &str,
    from: User,
    chat: Chat,
    thread_id: Option<i32>,
    content: &str,
    kind: MessageKind,
) -> Message {
    Message {
        id: id.to_string(),
        user: from,
        chat,
        thread_id,
        content: content.to_string(),
        kind,
        direction: MessageDirection::Incoming,
        created_at: Utc::now(),
    }
}

fn private_chat(id: i64) -> Chat {
    Chat {
        id,
        chat_type: "private".to_string(),
    }
}

fn group_chat() -> Chat {
    Chat {
        id: GROUP_ID,
        chat_type: "supergroup".to_string(),
    }
}

/// Text from `user_id` in their private chat with the bot.
pub fn private_text(user_id: i64, text: &str) -> Message {
    message(
        "m1",
        user(user_id, "Ann"),
        private_chat(user_id),
        None,
        text,
        MessageKind::Text,
    )
}

pub fn private_sticker(user_id: i64) -> Message {
    message(
        "s1",
        user(user_id, "Ann"),
        private_chat(user_id),
        None,
        "",
        MessageKind::Sticker,
    )
}

/// Text from `user_id` inside a topic of the test group.
pub fn group_text(user_id: i64, thread_id: Option<i32>, text: &str) -> Message {
    message(
        "g1",
        user(user_id, "Bob"),
        group_chat(),
        thread_id,
        text,
        MessageKind::Text,
    )
}

pub fn group_photo(id: &str, thread_id: i32, file_id: &str, caption: &str) -> Message {
    message(
        id,
        user(USER_ID, "Bob"),
        group_chat(),
        Some(thread_id),
        caption,
        MessageKind::Photo {
            file_id: file_id.to_string(),
        },
    )
}
