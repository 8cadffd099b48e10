use crate::domain::{ChatId, UpdateId, UserId};

/// One inbound event, identified by a strictly increasing update id.
#[derive(Clone, Debug)]
pub struct InboundUpdate {
    pub id: UpdateId,
    pub event: InboundEvent,
}

#[derive(Clone, Debug)]
pub enum InboundEvent {
    Text(TextMessage),
    Callback(CallbackQuery),
    /// Any update kind the bot does not act on. It still advances the offset.
    Other,
}

#[derive(Clone, Debug)]
pub struct TextMessage {
    pub chat_id: ChatId,
    pub user_id: Option<UserId>,
    pub username: Option<String>,
    pub text: String,
}

#[derive(Clone, Debug)]
pub struct CallbackQuery {
    pub chat_id: ChatId,
    pub user_id: Option<UserId>,
    pub username: Option<String>,
    pub callback_id: String,
    pub data: String,
}

impl InboundEvent {
    /// `(chat, sender, token)` for events the router can act on.
    pub fn parts(&self) -> Option<(ChatId, Option<UserId>, &str)> {
        match self {
            Self::Text(m) => Some((m.chat_id, m.user_id, m.text.as_str())),
            Self::Callback(q) => Some((q.chat_id, q.user_id, q.data.as_str())),
            Self::Other => None,
        }
    }

    pub fn callback_id(&self) -> Option<&str> {
        match self {
            Self::Callback(q) => Some(q.callback_id.as_str()),
            _ => None,
        }
    }

    pub fn username(&self) -> Option<&str> {
        match self {
            Self::Text(m) => m.username.as_deref(),
            Self::Callback(q) => q.username.as_deref(),
            Self::Other => None,
        }
    }
}

/// Inline keyboard: rows of buttons, each echoing back `callback_data` on press.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InlineKeyboard {
    pub rows: Vec<Vec<InlineButton>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InlineButton {
    pub label: String,
    pub callback_data: String,
}

impl InlineButton {
    pub fn new(label: impl Into<String>, callback_data: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            callback_data: callback_data.into(),
        }
    }
}

impl InlineKeyboard {
    pub fn new(rows: Vec<Vec<InlineButton>>) -> Self {
        Self { rows }
    }

    pub fn buttons(&self) -> impl Iterator<Item = &InlineButton> {
        self.rows.iter().flatten()
    }

    pub fn button_count(&self) -> usize {
        self.rows.iter().map(Vec::len).sum()
    }
}

/// Limits of a messenger implementation.
#[derive(Clone, Copy, Debug)]
pub struct MessagingCapabilities {
    pub max_message_len: usize,
}
