//! Command router: authorization, classification and the confirm/cancel flow.
//!
//! The router is stateless. A pending power action exists only as the
//! `confirm_<action>` token on the "yes" button it sends out, and is decoded
//! when that button's callback comes back.

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    actions::ActionExecutor,
    command::Command,
    domain::{ChatId, UserId},
    formatting::split_preformatted,
    messaging::{
        port::MessagingPort,
        types::{InboundUpdate, InlineKeyboard},
    },
    poller::UpdateHandler,
    presentation,
    reports::HostReports,
    security::is_authorized,
    Result,
};

pub struct CommandRouter {
    owner: UserId,
    label: String,
    safe_limit: usize,
    messenger: Arc<dyn MessagingPort>,
    reports: Arc<dyn HostReports>,
    executor: Arc<dyn ActionExecutor>,
}

impl CommandRouter {
    pub fn new(
        owner: UserId,
        label: impl Into<String>,
        messenger: Arc<dyn MessagingPort>,
        reports: Arc<dyn HostReports>,
        executor: Arc<dyn ActionExecutor>,
    ) -> Self {
        let safe_limit = messenger.capabilities().max_message_len;
        Self {
            owner,
            label: label.into(),
            safe_limit,
            messenger,
            reports,
            executor,
        }
    }

    /// Cap reply chunks below the transport maximum.
    pub fn with_safe_limit(mut self, limit: usize) -> Self {
        self.safe_limit = limit.min(self.messenger.capabilities().max_message_len);
        self
    }

    pub async fn route(&self, update: &InboundUpdate) -> Result<()> {
        let Some((chat_id, user_id, token)) = update.event.parts() else {
            return Ok(());
        };
        let authorized = is_authorized(user_id, self.owner);

        // Button presses are always acknowledged, whatever happens next.
        if let Some(callback_id) = update.event.callback_id() {
            let text = (!authorized).then_some("Unauthorized");
            if let Err(e) = self.messenger.answer_callback_query(callback_id, text).await {
                tracing::warn!(update_id = update.id.0, "failed to answer callback: {e}");
            }
        }

        if !authorized {
            tracing::warn!(
                update_id = update.id.0,
                user_id = user_id.map(|u| u.0),
                username = update.event.username().unwrap_or("unknown"),
                "rejected unauthorized sender"
            );
            self.messenger.send_html(chat_id, presentation::DENIED).await?;
            return Ok(());
        }

        let Some(cmd) = Command::parse(token) else {
            tracing::debug!(update_id = update.id.0, "ignoring unrecognized token");
            return Ok(());
        };

        if cmd.is_confirmation() && update.event.callback_id().is_none() {
            tracing::warn!(update_id = update.id.0, "ignoring typed confirmation token");
            return Ok(());
        }

        tracing::info!(update_id = update.id.0, command = ?cmd, "dispatching command");
        self.dispatch(chat_id, cmd).await
    }

    async fn dispatch(&self, chat_id: ChatId, cmd: Command) -> Result<()> {
        match cmd {
            Command::Start | Command::Help => {
                self.messenger
                    .send_inline_keyboard(
                        chat_id,
                        &presentation::help_text(&self.label),
                        presentation::main_keyboard(),
                    )
                    .await?;
            }
            Command::Status => {
                let report = self.reports.status().await;
                self.send_report(chat_id, &report, presentation::main_keyboard())
                    .await?;
            }
            Command::Health => {
                let report = self.reports.health().await;
                self.send_report(chat_id, &report, presentation::main_keyboard())
                    .await?;
            }
            Command::Top => {
                let report = self.reports.top().await;
                self.send_report(chat_id, &report, presentation::main_keyboard())
                    .await?;
            }
            Command::Uptime => {
                let uptime = self.reports.uptime().await;
                self.messenger
                    .send_html(chat_id, &presentation::uptime_text(&self.label, &uptime))
                    .await?;
            }
            Command::Request(action) => {
                self.messenger
                    .send_inline_keyboard(
                        chat_id,
                        &presentation::confirm_prompt(action, &self.label),
                        presentation::confirm_keyboard(action),
                    )
                    .await?;
            }
            Command::Confirm(action) => {
                // The operator already confirmed; a lost acknowledgment must not block it.
                if let Err(e) = self
                    .messenger
                    .send_html(chat_id, &presentation::executing(action))
                    .await
                {
                    tracing::warn!(%action, "failed to send executing notice: {e}");
                }
                tracing::warn!(%action, "executing confirmed power action");
                self.executor.execute(action).await?;
            }
            Command::Cancel => {
                let text = format!(
                    "{}\n\n{}",
                    presentation::cancelled(),
                    presentation::help_text(&self.label)
                );
                self.messenger
                    .send_inline_keyboard(chat_id, &text, presentation::main_keyboard())
                    .await?;
            }
        }
        Ok(())
    }

    /// Unsolicited "I'm up" notice to the operator, followed by a diagnostics
    /// report. Both are best-effort and independent of each other.
    pub async fn announce_startup(&self, hostname: &str, timestamp: &str) {
        let chat_id = ChatId(self.owner.0);

        let notice = presentation::startup_notice(&self.label, hostname, timestamp);
        if let Err(e) = self.messenger.send_html(chat_id, &notice).await {
            tracing::warn!("startup notification failed: {e}");
        }

        let report = self.reports.health().await;
        for chunk in split_preformatted(&report, self.safe_limit) {
            if let Err(e) = self.messenger.send_html(chat_id, &chunk).await {
                tracing::warn!("startup diagnostics failed: {e}");
                return;
            }
        }
    }

    /// Send a preformatted report; the keyboard rides on the last chunk.
    async fn send_report(
        &self,
        chat_id: ChatId,
        report: &str,
        keyboard: InlineKeyboard,
    ) -> Result<()> {
        let mut chunks = split_preformatted(report, self.safe_limit);
        let last = chunks.pop().unwrap_or_default();
        for chunk in chunks {
            self.messenger.send_html(chat_id, &chunk).await?;
        }
        self.messenger
            .send_inline_keyboard(chat_id, &last, keyboard)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl UpdateHandler for CommandRouter {
    async fn handle(&self, update: &InboundUpdate) -> Result<()> {
        self.route(update).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    };

    use super::*;
    use crate::{
        command::PowerAction,
        domain::UpdateId,
        messaging::types::{CallbackQuery, InboundEvent, TextMessage},
        testing::{RecordingMessenger, Sent},
    };

    const OWNER: UserId = UserId(1001);
    const CHAT: ChatId = ChatId(1001);

    #[derive(Default)]
    struct CountingReports {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl HostReports for CountingReports {
        async fn status(&self) -> String {
            self.calls.fetch_add(1, Ordering::SeqCst);
            "CPU   [██░░] 50.0%".to_string()
        }
        async fn health(&self) -> String {
            self.calls.fetch_add(1, Ordering::SeqCst);
            "/dev/sda: PASSED".to_string()
        }
        async fn top(&self) -> String {
            self.calls.fetch_add(1, Ordering::SeqCst);
            "1 postgres".to_string()
        }
        async fn uptime(&self) -> String {
            self.calls.fetch_add(1, Ordering::SeqCst);
            "1d 2h 3m".to_string()
        }
    }

    #[derive(Default)]
    struct RecordingExecutor {
        executed: Mutex<Vec<PowerAction>>,
    }

    #[async_trait]
    impl ActionExecutor for RecordingExecutor {
        async fn execute(&self, action: PowerAction) -> Result<()> {
            self.executed.lock().unwrap().push(action);
            Ok(())
        }
    }

    struct Harness {
        router: CommandRouter,
        messenger: Arc<RecordingMessenger>,
        reports: Arc<CountingReports>,
        executor: Arc<RecordingExecutor>,
    }

    fn harness() -> Harness {
        let messenger = Arc::new(RecordingMessenger::default());
        let reports = Arc::new(CountingReports::default());
        let executor = Arc::new(RecordingExecutor::default());
        let router = CommandRouter::new(
            OWNER,
            "nas",
            messenger.clone(),
            reports.clone(),
            executor.clone(),
        );
        Harness {
            router,
            messenger,
            reports,
            executor,
        }
    }

    impl Harness {
        fn executed(&self) -> Vec<PowerAction> {
            self.executor.executed.lock().unwrap().clone()
        }
    }

    fn text(id: i64, user: i64, text: &str) -> InboundUpdate {
        InboundUpdate {
            id: UpdateId(id),
            event: InboundEvent::Text(TextMessage {
                chat_id: ChatId(user),
                user_id: Some(UserId(user)),
                username: Some("op".to_string()),
                text: text.to_string(),
            }),
        }
    }

    fn press(id: i64, user: i64, data: &str) -> InboundUpdate {
        InboundUpdate {
            id: UpdateId(id),
            event: InboundEvent::Callback(CallbackQuery {
                chat_id: ChatId(user),
                user_id: Some(UserId(user)),
                username: None,
                callback_id: format!("cb-{id}"),
                data: data.to_string(),
            }),
        }
    }

    #[tokio::test]
    async fn strangers_get_exactly_the_denial() {
        let h = harness();
        for token in ["/status", "/health", "/top", "/uptime", "/reboot", "/help"] {
            h.router.route(&text(1, 666, token)).await.unwrap();
        }
        h.router
            .route(&press(2, 666, &PowerAction::Reboot.confirm_token()))
            .await
            .unwrap();

        let sent = h.messenger.replies();
        assert_eq!(sent.len(), 7);
        assert!(sent
            .iter()
            .all(|s| matches!(s, Sent::Html { chat_id, html } if *chat_id == ChatId(666) && html == presentation::DENIED)));
        assert_eq!(h.reports.calls.load(Ordering::SeqCst), 0);
        assert!(h.executed().is_empty());
        assert_eq!(
            h.messenger.acks(),
            vec![("cb-2".to_string(), Some("Unauthorized".to_string()))]
        );
    }

    #[tokio::test]
    async fn missing_sender_is_denied() {
        let h = harness();
        let update = InboundUpdate {
            id: UpdateId(1),
            event: InboundEvent::Text(TextMessage {
                chat_id: CHAT,
                user_id: None,
                username: None,
                text: "/status".to_string(),
            }),
        };
        h.router.route(&update).await.unwrap();
        assert_eq!(h.messenger.replies().len(), 1);
        assert_eq!(h.reports.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn help_shows_command_list_and_main_keyboard() {
        let h = harness();
        h.router.route(&text(1, OWNER.0, "/help")).await.unwrap();

        let sent = h.messenger.replies();
        assert_eq!(sent.len(), 1);
        let Sent::Keyboard { html, keyboard, .. } = &sent[0] else {
            panic!("expected keyboard reply, got {sent:?}");
        };
        assert!(html.contains("/status") && html.contains("/suspend"));
        assert_eq!(keyboard.button_count(), 6);
        assert_eq!(keyboard, &presentation::main_keyboard());
    }

    #[tokio::test]
    async fn reports_come_with_the_main_keyboard() {
        let h = harness();
        h.router.route(&text(1, OWNER.0, "/status")).await.unwrap();
        h.router.route(&text(2, OWNER.0, "/health")).await.unwrap();
        h.router.route(&text(3, OWNER.0, "/top")).await.unwrap();

        let sent = h.messenger.replies();
        assert_eq!(sent.len(), 3);
        for s in &sent {
            let Sent::Keyboard { html, keyboard, .. } = s else {
                panic!("expected keyboard reply, got {s:?}");
            };
            assert!(html.starts_with("<pre>"));
            assert_eq!(keyboard.button_count(), 6);
        }
        assert_eq!(h.reports.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn uptime_is_plain_text() {
        let h = harness();
        h.router.route(&text(1, OWNER.0, "/uptime")).await.unwrap();
        let sent = h.messenger.replies();
        assert!(matches!(&sent[..], [Sent::Html { html, .. }] if html.contains("1d 2h 3m")));
    }

    #[tokio::test]
    async fn power_command_alone_never_executes() {
        let h = harness();
        for action in PowerAction::ALL {
            h.router
                .route(&text(1, OWNER.0, &action.request_token()))
                .await
                .unwrap();
            h.router
                .route(&press(2, OWNER.0, &action.request_token()))
                .await
                .unwrap();
        }
        assert!(h.executed().is_empty());
        assert_eq!(h.messenger.replies().len(), 6);
    }

    #[tokio::test]
    async fn shutdown_confirm_flow() {
        let h = harness();

        h.router.route(&text(1, OWNER.0, "/shutdown")).await.unwrap();
        let sent = h.messenger.replies();
        let Sent::Keyboard { html, keyboard, .. } = &sent[0] else {
            panic!("expected confirmation keyboard");
        };
        assert!(html.contains("shutdown"));
        let yes = keyboard.buttons().next().unwrap().callback_data.clone();
        assert_eq!(yes, "confirm_shutdown");
        assert!(h.executed().is_empty());

        h.router.route(&press(2, OWNER.0, &yes)).await.unwrap();
        let sent = h.messenger.replies();
        assert!(matches!(&sent[1], Sent::Html { html, .. } if html.contains("Executing") && html.contains("shutdown")));
        assert_eq!(h.executed(), vec![PowerAction::Shutdown]);
        assert_eq!(h.messenger.acks(), vec![("cb-2".to_string(), None)]);
    }

    #[tokio::test]
    async fn pressing_no_routes_to_help_without_executing() {
        let h = harness();
        h.router.route(&text(1, OWNER.0, "/reboot")).await.unwrap();
        let sent = h.messenger.replies();
        let Sent::Keyboard { keyboard, .. } = &sent[0] else {
            panic!("expected confirmation keyboard");
        };
        let no = keyboard.buttons().nth(1).unwrap().callback_data.clone();

        h.router.route(&press(2, OWNER.0, &no)).await.unwrap();
        h.router.route(&press(3, OWNER.0, "cancel")).await.unwrap();

        assert!(h.executed().is_empty());
        let sent = h.messenger.replies();
        assert!(matches!(&sent[1], Sent::Keyboard { html, .. } if html.contains("/status")));
        assert!(matches!(&sent[2], Sent::Keyboard { html, .. } if html.contains("Cancelled")));
    }

    #[tokio::test]
    async fn typed_confirmation_is_ignored() {
        let h = harness();
        h.router
            .route(&text(1, OWNER.0, "confirm_reboot"))
            .await
            .unwrap();
        assert!(h.executed().is_empty());
        assert!(h.messenger.replies().is_empty());
    }

    #[tokio::test]
    async fn unknown_tokens_are_silently_dropped() {
        let h = harness();
        h.router.route(&text(1, OWNER.0, "hello?")).await.unwrap();
        h.router.route(&press(2, OWNER.0, "/format")).await.unwrap();
        assert!(h.messenger.replies().is_empty());
        // The button press is still acknowledged.
        assert_eq!(h.messenger.acks().len(), 1);
    }

    #[tokio::test]
    async fn failed_callback_ack_does_not_block_the_reply() {
        let h = harness();
        h.messenger.fail_acks();
        h.router.route(&press(1, OWNER.0, "/help")).await.unwrap();
        assert_eq!(h.messenger.replies().len(), 1);
    }

    #[tokio::test]
    async fn long_reports_are_split_and_keyboard_goes_last() {
        struct LongReports;

        #[async_trait]
        impl HostReports for LongReports {
            async fn status(&self) -> String {
                (0..100).map(|i| format!("row {i:03}")).collect::<Vec<_>>().join("\n")
            }
            async fn health(&self) -> String {
                String::new()
            }
            async fn top(&self) -> String {
                String::new()
            }
            async fn uptime(&self) -> String {
                String::new()
            }
        }

        let messenger = Arc::new(RecordingMessenger::default());
        let router = CommandRouter::new(
            OWNER,
            "nas",
            messenger.clone(),
            Arc::new(LongReports),
            Arc::new(RecordingExecutor::default()),
        )
        .with_safe_limit(200);

        router.route(&text(1, OWNER.0, "/status")).await.unwrap();
        let sent = messenger.replies();
        assert!(sent.len() > 1);
        assert!(sent[..sent.len() - 1]
            .iter()
            .all(|s| matches!(s, Sent::Html { html, .. } if html.len() <= 200)));
        assert!(matches!(sent.last(), Some(Sent::Keyboard { .. })));
    }

    #[tokio::test]
    async fn startup_sends_notice_then_diagnostics_to_owner() {
        let h = harness();
        h.router
            .announce_startup("nas-01.lan", "2026-10-17 08:00:00")
            .await;

        let sent = h.messenger.replies();
        assert_eq!(sent.len(), 2);
        let Sent::Html { chat_id, html } = &sent[0] else {
            panic!("notice should be plain html");
        };
        assert_eq!(*chat_id, CHAT);
        assert!(html.contains("nas"));
        assert!(html.contains("nas-01.lan"));
        assert!(html.contains("2026-10-17 08:00:00"));
        assert!(matches!(&sent[1], Sent::Html { chat_id, html }
            if *chat_id == CHAT && html.contains("/dev/sda: PASSED")));
        assert_eq!(h.reports.calls.load(Ordering::SeqCst), 1);
        assert!(h.executed().is_empty());
    }

    #[tokio::test]
    async fn startup_diagnostics_survive_a_failed_notice() {
        let h = harness();
        h.messenger.fail_sends(1);
        h.router.announce_startup("nas-01.lan", "now").await;

        let sent = h.messenger.replies();
        assert_eq!(sent.len(), 1);
        assert!(matches!(&sent[0], Sent::Html { html, .. } if html.contains("PASSED")));
    }
}
