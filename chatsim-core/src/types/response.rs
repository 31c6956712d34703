//! Handler chain result type.

/// Handler result for the chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerResponse {
    /// Pass to next handler.
    Continue,
    /// Message consumed; stop the chain without a direct reply.
    Stop,
    /// Stop the chain; the runner sends this text back to the originating chat.
    Reply(String),
}
