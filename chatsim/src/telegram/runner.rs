//! REPL runner: converts teloxide messages to core messages and passes them to the
//! HandlerChain. A `Reply` response is sent back to the chat (and topic) it came from.

use crate::chain::HandlerChain;
use anyhow::Result;
use chatsim_core::{Bot as CoreBot, HandlerResponse, Message, ToCoreMessage};
use std::sync::Arc;
use teloxide::prelude::*;
use tracing::{error, info, instrument};

use super::adapters::TelegramMessageWrapper;

/// Runs one message through the chain and sends a `Reply` response back to its origin.
///
/// Callers await this per message: messages of one chat must reach the batchers in arrival
/// order. Chat handlers only enqueue, generation runs in the batchers' own tasks.
pub async fn dispatch(chain: &HandlerChain, responder: &dyn CoreBot, message: &Message) {
    match chain.handle(message).await {
        Ok(HandlerResponse::Reply(text)) => {
            if let Err(e) = responder.send_message(&message.reply_target(), &text).await {
                error!(error = %e, chat_id = message.chat.id, "Failed to send reply");
            }
        }
        Ok(_) => {}
        Err(e) => {
            error!(error = %e, user_id = message.user.id, "Handler chain failed");
        }
    }
}

/// Starts the REPL with the given teloxide Bot and HandlerChain. teloxide delivers the updates
/// of one chat sequentially; each is dispatched before the next is taken.
#[instrument(skip(bot, handler_chain, responder))]
pub async fn run_repl(
    bot: teloxide::Bot,
    handler_chain: HandlerChain,
    responder: Arc<dyn CoreBot>,
) -> Result<()> {
    if let Ok(me) = bot.get_me().await {
        if let Some(username) = &me.user.username {
            info!(username = %username, "Bot connected");
        }
    }

    let chain = handler_chain;
    teloxide::repl(bot, move |_bot: Bot, msg: teloxide::types::Message| {
        let chain = chain.clone();
        let responder = Arc::clone(&responder);

        async move {
            let core_msg = TelegramMessageWrapper(&msg).to_core();
            info!(
                user_id = core_msg.user.id,
                chat_id = core_msg.chat.id,
                thread_id = ?core_msg.thread_id,
                kind = ?core_msg.kind,
                "Received message"
            );

            dispatch(&chain, responder.as_ref(), &core_msg).await;
            Ok(())
        }
    })
    .await;

    Ok(())
}
