//! `getUpdates` long-polling as an [`UpdateSource`].

use async_trait::async_trait;
use teloxide::{
    prelude::*,
    types::{Update, UpdateKind},
};

use rcb_core::{
    domain::{ChatId, UpdateId, UserId},
    errors::Error,
    messaging::{
        port::UpdateSource,
        types::{CallbackQuery, InboundEvent, InboundUpdate, TextMessage},
    },
    Result,
};

use crate::map_err;

pub struct TelegramUpdateSource {
    bot: Bot,
}

impl TelegramUpdateSource {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl UpdateSource for TelegramUpdateSource {
    async fn fetch(&self, offset: Option<i64>, timeout_secs: u32) -> Result<Vec<InboundUpdate>> {
        let mut req = self.bot.get_updates().timeout(timeout_secs);
        if let Some(offset) = offset {
            let offset = i32::try_from(offset)
                .map_err(|_| Error::Transport(format!("update offset out of range: {offset}")))?;
            req = req.offset(offset);
        }

        let updates = req.await.map_err(map_err)?;
        Ok(updates.into_iter().map(to_inbound).collect())
    }

    async fn commit(&self, offset: i64) -> Result<()> {
        let offset = i32::try_from(offset)
            .map_err(|_| Error::Transport(format!("update offset out of range: {offset}")))?;
        // Anything returned here is newer than `offset` and comes back on the next fetch.
        self.bot
            .get_updates()
            .offset(offset)
            .limit(1)
            .timeout(0)
            .await
            .map_err(map_err)?;
        Ok(())
    }
}

/// Reduce a Telegram update to the events the router understands.
pub fn to_inbound(update: Update) -> InboundUpdate {
    let id = UpdateId(i64::from(update.id));
    let event = match update.kind {
        UpdateKind::Message(msg) => match msg.text() {
            Some(text) => InboundEvent::Text(TextMessage {
                chat_id: ChatId(msg.chat.id.0),
                user_id: msg.from().map(|u| UserId(u.id.0 as i64)),
                username: msg.from().and_then(|u| u.username.clone()),
                text: text.to_string(),
            }),
            None => InboundEvent::Other,
        },
        UpdateKind::CallbackQuery(q) => {
            let user_id = q.from.id.0 as i64;
            InboundEvent::Callback(CallbackQuery {
                // Private chat ids equal the user id; inline-mode callbacks carry no message.
                chat_id: ChatId(q.message.as_ref().map_or(user_id, |m| m.chat.id.0)),
                user_id: Some(UserId(user_id)),
                username: q.from.username.clone(),
                callback_id: q.id,
                data: q.data.unwrap_or_default(),
            })
        }
        _ => InboundEvent::Other,
    };
    InboundUpdate { id, event }
}
