//! In-memory fakes shared by unit tests.

use std::sync::{
    atomic::{AtomicBool, AtomicI32, AtomicUsize, Ordering},
    Mutex,
};

use async_trait::async_trait;

use crate::{
    domain::{ChatId, MessageId, MessageRef},
    errors::Error,
    messaging::{
        port::MessagingPort,
        types::{InlineKeyboard, MessagingCapabilities},
    },
    Result,
};

#[derive(Clone, Debug, PartialEq)]
pub enum Sent {
    Html {
        chat_id: ChatId,
        html: String,
    },
    Keyboard {
        chat_id: ChatId,
        html: String,
        keyboard: InlineKeyboard,
    },
}

#[derive(Default)]
pub struct RecordingMessenger {
    sent: Mutex<Vec<Sent>>,
    acks: Mutex<Vec<(String, Option<String>)>>,
    fail_acks: AtomicBool,
    failing_sends: AtomicUsize,
    next_id: AtomicI32,
}

impl RecordingMessenger {
    pub fn replies(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn acks(&self) -> Vec<(String, Option<String>)> {
        self.acks.lock().unwrap().clone()
    }

    pub fn fail_acks(&self) {
        self.fail_acks.store(true, Ordering::SeqCst);
    }

    /// Make the next `n` sends fail with a transport error.
    pub fn fail_sends(&self, n: usize) {
        self.failing_sends.store(n, Ordering::SeqCst);
    }

    fn check_send(&self) -> Result<()> {
        let failing = self.failing_sends.load(Ordering::SeqCst);
        if failing > 0 {
            self.failing_sends.store(failing - 1, Ordering::SeqCst);
            return Err(Error::Transport("bad gateway".to_string()));
        }
        Ok(())
    }

    fn record(&self, chat_id: ChatId, sent: Sent) -> MessageRef {
        self.sent.lock().unwrap().push(sent);
        MessageRef {
            chat_id,
            message_id: MessageId(self.next_id.fetch_add(1, Ordering::SeqCst)),
        }
    }
}

#[async_trait]
impl MessagingPort for RecordingMessenger {
    fn capabilities(&self) -> MessagingCapabilities {
        MessagingCapabilities {
            max_message_len: 4096,
        }
    }

    async fn send_html(&self, chat_id: ChatId, html: &str) -> Result<MessageRef> {
        self.check_send()?;
        Ok(self.record(
            chat_id,
            Sent::Html {
                chat_id,
                html: html.to_string(),
            },
        ))
    }

    async fn send_inline_keyboard(
        &self,
        chat_id: ChatId,
        html: &str,
        keyboard: InlineKeyboard,
    ) -> Result<MessageRef> {
        self.check_send()?;
        Ok(self.record(
            chat_id,
            Sent::Keyboard {
                chat_id,
                html: html.to_string(),
                keyboard,
            },
        ))
    }

    async fn answer_callback_query(&self, callback_id: &str, text: Option<&str>) -> Result<()> {
        if self.fail_acks.load(Ordering::SeqCst) {
            return Err(Error::Transport("callback query is too old".to_string()));
        }
        self.acks
            .lock()
            .unwrap()
            .push((callback_id.to_string(), text.map(str::to_string)));
        Ok(())
    }
}
