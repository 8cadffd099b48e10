/// Core error type for the bot.
///
/// Adapter crates map their specific errors into this type so the update loop
/// can tell transient transport failures from fatal configuration problems.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("{tool}: {reason}")]
    Tool { tool: String, reason: String },

    #[error("external error: {0}")]
    External(String),
}

impl Error {
    pub fn tool(tool: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Tool {
            tool: tool.into(),
            reason: reason.into(),
        }
    }

    /// Configuration errors are the only ones that stop the process.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_config_errors_are_fatal() {
        assert!(Error::Config("TELEGRAM_BOT_TOKEN missing".into()).is_fatal());
        assert!(!Error::Transport("connection reset".into()).is_fatal());
        assert!(!Error::External("boom".into()).is_fatal());

        let spawn = crate::tools::spawn_error(
            "smartctl",
            std::io::Error::from(std::io::ErrorKind::NotFound),
        );
        assert!(!spawn.is_fatal());
        assert_eq!(spawn.to_string(), "smartctl: not installed");
    }
}
