//! Component factory: builds BotComponents from config and wires them into the handler chain.
//! Isolates assembly logic from the runner; tests call [`build_app`] with mock components.

use anyhow::{Context, Result};
use chatsim_core::Bot as CoreBot;
use llm_client::{GeminiClient, LlmClient};
use std::sync::Arc;
use storage::{KvStore, SqliteKvStore};
use teloxide::prelude::*;
use tracing::{error, info, instrument};
use tts_client::ElevenLabsClient;

use crate::batcher::{ConversationBatcher, DebounceConfig};
use crate::chain::HandlerChain;
use crate::config::{BotConfig, ChatConfig};
use crate::credentials::CredentialRotator;
use crate::generator::ResponseGenerator;
use crate::history::HistoryStore;
use crate::notify::{BotOperatorNotifier, OperatorNotifier};
use crate::pacer::TypingPacer;
use crate::pipeline::{PhotoPipeline, TextPipeline};
use crate::plugins::{
    ChatRoutes, CommandContext, CommandHandler, FollowUpService, FollowUpState, GChatHandler, StickerResponder,
    WChatHandler,
};
use crate::settings::{
    ConversationSettings, GChatSettings, WChatSettings, GCHAT_COLLECTION, WCHAT_COLLECTION,
};
use crate::voice::{ElevenLabsSynthesizer, SpeechSynthesizer, VoiceDelivery};

/// External dependencies: store, transport, generation and speech services.
#[derive(Clone)]
pub struct BotComponents {
    pub store: Arc<dyn KvStore>,
    pub bot: Arc<dyn CoreBot>,
    pub llm: Arc<dyn LlmClient>,
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
}

/// Wired application: the chain plus handles tests and the runner need.
pub struct App {
    pub chain: HandlerChain,
    pub follow_ups: Arc<FollowUpService>,
    pub gchat: GChatSettings,
    pub wchat: WChatSettings,
    pub gchat_keys: CredentialRotator,
    pub wchat_keys: CredentialRotator,
}

/// Creates the teloxide Bot, honouring TELEGRAM_API_URL.
pub fn create_teloxide_bot(config: &BotConfig) -> Bot {
    let bot = Bot::new(config.bot_token());
    match config.telegram_api_url() {
        Some(url_str) => match reqwest::Url::parse(url_str) {
            Ok(url) => bot.set_api_url(url),
            Err(e) => {
                error!(error = %e, url = %url_str, "Invalid TELEGRAM_API_URL, using default");
                bot
            }
        },
        None => bot,
    }
}

/// Builds production components: SQLite store, Telegram adapter, Gemini and ElevenLabs clients.
#[instrument(skip(config, teloxide_bot))]
pub async fn build_bot_components(config: &BotConfig, teloxide_bot: Bot) -> Result<BotComponents> {
    let store: Arc<dyn KvStore> = Arc::new(
        SqliteKvStore::new(config.database_url())
            .await
            .map_err(|e| {
                error!(error = %e, database_url = %config.database_url(), "Failed to initialize store");
                anyhow::anyhow!("Failed to initialize store: {}", e)
            })?,
    );
    let bot: Arc<dyn CoreBot> = Arc::new(crate::telegram::TelegramBotAdapter::new(teloxide_bot));
    let llm: Arc<dyn LlmClient> = Arc::new(GeminiClient::from_config(&config.llm));
    let synthesizer: Arc<dyn SpeechSynthesizer> = Arc::new(ElevenLabsSynthesizer::new(
        ElevenLabsClient::new(config.tts.elevenlabs_base_url.clone()),
        store.clone(),
        config.media_dir(),
    ));
    info!(model = %config.llm.gemini_model, "Components built");

    Ok(BotComponents {
        store,
        bot,
        llm,
        synthesizer,
    })
}

/// Stores GEMINI_API_KEY / ELEVENLABS_API_KEY into empty credential sets.
pub async fn seed_credentials(config: &BotConfig, store: Arc<dyn KvStore>) -> Result<()> {
    if let Some(key) = config.llm.gemini_api_key.as_deref() {
        for namespace in [GCHAT_COLLECTION, WCHAT_COLLECTION] {
            let seeded = CredentialRotator::gemini(store.clone(), namespace)
                .seed_if_empty(key)
                .await
                .with_context(|| format!("Failed to seed Gemini key into {}", namespace))?;
            if seeded {
                info!(namespace, "Seeded Gemini key");
            }
        }
    }
    if let Some(key) = config.tts.elevenlabs_api_key.as_deref() {
        if CredentialRotator::elevenlabs(store)
            .seed_if_empty(key)
            .await
            .context("Failed to seed ElevenLabs key")?
        {
            info!("Seeded ElevenLabs key");
        }
    }
    Ok(())
}

/// Shared per-process services handed to each profile.
struct Shared {
    bot: Arc<dyn CoreBot>,
    notifier: Arc<dyn OperatorNotifier>,
    pacer: Arc<TypingPacer>,
    voice: Arc<VoiceDelivery>,
    stickers: Arc<StickerResponder>,
}

fn chat_routes(
    names: (&'static str, &'static str),
    debounce: DebounceConfig,
    settings: Arc<dyn ConversationSettings>,
    generator: Arc<ResponseGenerator>,
    chat: &ChatConfig,
    shared: &Shared,
) -> ChatRoutes {
    let text = TextPipeline::new(
        shared.bot.clone(),
        settings.clone(),
        generator.clone(),
        shared.pacer.clone(),
        shared.voice.clone(),
        chat.chat_policy(),
    );
    let photos = PhotoPipeline::new(shared.bot.clone(), settings, generator, chat.photo_policy());
    ChatRoutes {
        text: ConversationBatcher::new(names.0, debounce, Arc::new(text), shared.notifier.clone()),
        photos: ConversationBatcher::new(
            names.1,
            DebounceConfig::photos(),
            Arc::new(photos),
            shared.notifier.clone(),
        ),
        stickers: shared.stickers.clone(),
    }
}

/// Builds the handler chain (commands → gchat → wchat) and the follow-up service.
pub fn build_app(config: &BotConfig, components: &BotComponents) -> App {
    let chat = config.chat();
    let store = components.store.clone();
    let notifier: Arc<dyn OperatorNotifier> = Arc::new(BotOperatorNotifier::new(
        components.bot.clone(),
        config.operator_chat_id(),
    ));
    let shared = Shared {
        bot: components.bot.clone(),
        notifier: notifier.clone(),
        pacer: Arc::new(TypingPacer::new(components.bot.clone(), chat.pacing())),
        voice: Arc::new(VoiceDelivery::new(
            components.bot.clone(),
            components.synthesizer.clone(),
        )),
        stickers: Arc::new(StickerResponder::new(components.bot.clone(), notifier.clone())),
    };

    let gchat_history = HistoryStore::new(store.clone(), GCHAT_COLLECTION, chat.history_max_entries);
    let gchat = GChatSettings::new(store.clone(), chat.gchat_role.clone(), gchat_history.clone());
    let gchat_keys = CredentialRotator::gemini(store.clone(), GCHAT_COLLECTION);
    let gchat_routes = chat_routes(
        ("gchat", "gchat photos"),
        DebounceConfig::gchat(),
        Arc::new(gchat.clone()),
        Arc::new(ResponseGenerator::new(
            components.llm.clone(),
            gchat_keys.clone(),
            gchat_history,
        )),
        chat,
        &shared,
    );

    let wchat_history = HistoryStore::new(store.clone(), WCHAT_COLLECTION, chat.history_max_entries);
    let wchat = WChatSettings::new(store.clone(), chat.wchat_role.clone(), wchat_history.clone());
    let wchat_keys = CredentialRotator::gemini(store.clone(), WCHAT_COLLECTION);
    let wchat_routes = chat_routes(
        ("wchat", "wchat photos"),
        DebounceConfig::wchat(),
        Arc::new(wchat.clone()),
        Arc::new(ResponseGenerator::new(
            components.llm.clone(),
            wchat_keys.clone(),
            wchat_history,
        )),
        chat,
        &shared,
    );

    let follow_up_state = FollowUpState::new(store.clone());
    let follow_ups = Arc::new(FollowUpService::new(
        follow_up_state.clone(),
        gchat.clone(),
        components.bot.clone(),
        notifier,
        chat.follow_up_interval(),
        chat.follow_up_threshold(),
        chat.follow_up_message.clone(),
    ));

    let commands = CommandHandler::new(
        config.owner_id(),
        config.command_prefix(),
        CommandContext {
            store: store.clone(),
            bot: components.bot.clone(),
            gchat: gchat.clone(),
            gchat_keys: gchat_keys.clone(),
            wchat: wchat.clone(),
            wchat_keys: wchat_keys.clone(),
            follow_ups: follow_up_state.clone(),
            elevenlabs_keys: CredentialRotator::elevenlabs(store),
            synthesizer: components.synthesizer.clone(),
        },
    );

    let chain = HandlerChain::new()
        .add_handler(Arc::new(commands))
        .add_handler(Arc::new(GChatHandler::new(
            config.owner_id(),
            gchat.clone(),
            follow_up_state,
            gchat_routes,
        )))
        .add_handler(Arc::new(WChatHandler::new(wchat.clone(), wchat_routes)));

    App {
        chain,
        follow_ups,
        gchat,
        wchat,
        gchat_keys,
        wchat_keys,
    }
}
