use async_trait::async_trait;

use crate::{
    domain::{ChatId, MessageRef, UpdateId},
    messaging::types::{InboundUpdate, InlineKeyboard, MessagingCapabilities},
    Result,
};

/// Outbound side of the messenger.
#[async_trait]
pub trait MessagingPort: Send + Sync {
    fn capabilities(&self) -> MessagingCapabilities;

    async fn send_html(&self, chat_id: ChatId, html: &str) -> Result<MessageRef>;

    async fn send_inline_keyboard(
        &self,
        chat_id: ChatId,
        html: &str,
        keyboard: InlineKeyboard,
    ) -> Result<MessageRef>;

    /// Clear the client-side "loading" state of a pressed button.
    async fn answer_callback_query(&self, callback_id: &str, text: Option<&str>) -> Result<()>;
}

/// Inbound side of the messenger: a long-poll batch fetch.
///
/// `offset` is the first update id the caller still wants (`None` on first poll).
/// Implementations block for up to `timeout_secs` when no updates are pending.
#[async_trait]
pub trait UpdateSource: Send + Sync {
    async fn fetch(&self, offset: Option<i64>, timeout_secs: u32) -> Result<Vec<InboundUpdate>>;

    /// Tell the server every update below `offset` is consumed, without waiting
    /// for new ones. Once this returns, those updates are never redelivered, even
    /// to a fresh process.
    async fn commit(&self, offset: i64) -> Result<()>;
}

/// Helper for adapters: offset to request after `last_seen`.
pub fn next_offset(last_seen: Option<UpdateId>) -> Option<i64> {
    last_seen.map(UpdateId::next)
}
