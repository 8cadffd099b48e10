//! Reply texts and keyboards.

use crate::{
    command::PowerAction,
    formatting::escape_html,
    messaging::types::{InlineButton, InlineKeyboard},
};

pub const DENIED: &str = "⛔ Unauthorized. This bot serves a single operator.";

pub fn help_text(label: &str) -> String {
    format!(
        "🤖 <b>{}</b> remote control\n\n\
         /status - CPU, RAM, disk, temperature, network\n\
         /health - disk usage and SMART health\n\
         /top - top 5 processes by memory\n\
         /uptime - time since boot\n\
         /reboot - restart the host\n\
         /shutdown - power off the host\n\
         /suspend - suspend the host\n\
         /help - this message\n\n\
         <i>Power commands ask for confirmation first.</i>",
        escape_html(label)
    )
}

/// Six-button main menu, two per row.
pub fn main_keyboard() -> InlineKeyboard {
    InlineKeyboard::new(vec![
        vec![
            InlineButton::new("📊 Status", "/status"),
            InlineButton::new("🩺 Health", "/health"),
        ],
        vec![
            InlineButton::new("🔝 Top", "/top"),
            InlineButton::new("🔄 Reboot", PowerAction::Reboot.request_token()),
        ],
        vec![
            InlineButton::new("⏻ Shutdown", PowerAction::Shutdown.request_token()),
            InlineButton::new("💤 Suspend", PowerAction::Suspend.request_token()),
        ],
    ])
}

/// Yes/no prompt. "Yes" carries the pending action; "No" goes back to the menu.
pub fn confirm_keyboard(action: PowerAction) -> InlineKeyboard {
    InlineKeyboard::new(vec![vec![
        InlineButton::new("✅ Yes", action.confirm_token()),
        InlineButton::new("❌ No", "/help"),
    ]])
}

pub fn confirm_prompt(action: PowerAction, label: &str) -> String {
    format!(
        "⚠️ Are you sure you want to <b>{action}</b> {}?",
        escape_html(label)
    )
}

pub fn executing(action: PowerAction) -> String {
    format!("⏳ Executing <b>{action}</b>...")
}

pub fn cancelled() -> &'static str {
    "❎ Cancelled."
}

pub fn uptime_text(label: &str, uptime: &str) -> String {
    format!("⏱️ {} up {}", escape_html(label), escape_html(uptime))
}

pub fn startup_notice(label: &str, hostname: &str, timestamp: &str) -> String {
    format!(
        "🟢 <b>{}</b> bot started\nHost: <code>{}</code>\nTime: {}",
        escape_html(label),
        escape_html(hostname),
        escape_html(timestamp)
    )
}
