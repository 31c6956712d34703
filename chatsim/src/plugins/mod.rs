//! Chat plugins and operator commands, each a [`chatsim_core::Handler`] in the chain.

pub mod commands;
pub mod followup;
pub mod gchat;
mod routes;
pub mod stickers;
pub mod wchat;

pub use commands::{CommandContext, CommandHandler};
pub use followup::{FollowUpService, FollowUpState};
pub use gchat::GChatHandler;
pub use routes::ChatRoutes;
pub use stickers::{StickerResponder, SMILEYS};
pub use wchat::WChatHandler;
