//! The bot's fixed command vocabulary and the confirmation token codec.

use std::fmt;

const CONFIRM_PREFIX: &str = "confirm_";
pub const CANCEL_TOKEN: &str = "cancel";

/// Destructive host operations gated behind a confirmation round-trip.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PowerAction {
    Reboot,
    Shutdown,
    Suspend,
}

impl PowerAction {
    pub const ALL: [PowerAction; 3] = [Self::Reboot, Self::Shutdown, Self::Suspend];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Reboot => "reboot",
            Self::Shutdown => "shutdown",
            Self::Suspend => "suspend",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.as_str() == s)
    }

    /// Callback token carried by the "yes" button. The pending action lives only here.
    pub fn confirm_token(self) -> String {
        format!("{CONFIRM_PREFIX}{}", self.as_str())
    }

    pub fn request_token(self) -> String {
        format!("/{}", self.as_str())
    }
}

impl fmt::Display for PowerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Status,
    Health,
    Top,
    Uptime,
    /// First step: ask the operator to confirm.
    Request(PowerAction),
    /// Second step: decoded from a `confirm_<action>` token.
    Confirm(PowerAction),
    Cancel,
}

impl Command {
    /// Parse message text or callback data. Unknown tokens yield `None`.
    pub fn parse(token: &str) -> Option<Self> {
        let token = token.trim();

        if let Some(action) = token.strip_prefix(CONFIRM_PREFIX) {
            return PowerAction::parse(action.trim()).map(Self::Confirm);
        }
        if token.eq_ignore_ascii_case(CANCEL_TOKEN) {
            return Some(Self::Cancel);
        }

        let name = parse_command_name(token)?;
        let cmd = match name.as_str() {
            "start" => Self::Start,
            "help" => Self::Help,
            "status" => Self::Status,
            "health" => Self::Health,
            "top" => Self::Top,
            "uptime" => Self::Uptime,
            other => Self::Request(PowerAction::parse(other)?),
        };
        Some(cmd)
    }

    pub fn is_confirmation(self) -> bool {
        matches!(self, Self::Confirm(_))
    }
}

/// Extract the lowercased name of a slash command.
///
/// Telegram may send `/cmd@botname arg1 ...`; the bot suffix and arguments are ignored.
fn parse_command_name(text: &str) -> Option<String> {
    let first = text.split_whitespace().next()?;
    let name = first.strip_prefix('/')?.split('@').next()?.to_lowercase();
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}
