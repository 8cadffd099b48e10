use std::{env, fmt, fs, path::Path, sync::OnceLock, time::Duration};

use regex::Regex;

use crate::{
    domain::UserId,
    errors::Error,
    telemetry::{host_name, DEFAULT_SENSOR_PRIORITY},
    Result,
};

/// Typed configuration, loaded once at startup and immutable afterwards.
///
/// Three values are required by deployment (token, operator id, label); the rest
/// are tunables with defaults.
#[derive(Clone)]
pub struct Config {
    // Core
    pub telegram_bot_token: String,
    pub allowed_user: UserId,
    pub host_label: String,

    // Update loop
    pub poll_timeout_secs: u32,
    pub retry_cooldown: Duration,

    // Host operations
    pub action_delay: Duration,
    pub smartctl_use_sudo: bool,
    pub temperature_sensors: Vec<String>,

    // Telegram limits
    pub telegram_safe_limit: usize,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("telegram_bot_token", &"<redacted>")
            .field("allowed_user", &self.allowed_user)
            .field("host_label", &self.host_label)
            .field("poll_timeout_secs", &self.poll_timeout_secs)
            .field("retry_cooldown", &self.retry_cooldown)
            .field("action_delay", &self.action_delay)
            .field("smartctl_use_sudo", &self.smartctl_use_sudo)
            .field("temperature_sensors", &self.temperature_sensors)
            .field("telegram_safe_limit", &self.telegram_safe_limit)
            .finish()
    }
}

impl Config {
    /// Load from the process environment, after merging `.env` (if present).
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));
        Self::from_lookup(env_str)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).and_then(non_empty);

        // Required
        let telegram_bot_token = get("TELEGRAM_BOT_TOKEN").ok_or_else(|| {
            Error::Config("TELEGRAM_BOT_TOKEN environment variable is required".to_string())
        })?;
        if !token_re().is_match(&telegram_bot_token) {
            return Err(Error::Config(
                "TELEGRAM_BOT_TOKEN is malformed (expected <bot id>:<secret>)".to_string(),
            ));
        }

        let raw_user = get("TELEGRAM_ALLOWED_USER").ok_or_else(|| {
            Error::Config("TELEGRAM_ALLOWED_USER environment variable is required".to_string())
        })?;
        let allowed_user = raw_user.parse::<i64>().map(UserId).map_err(|_| {
            Error::Config(format!(
                "TELEGRAM_ALLOWED_USER must be a numeric Telegram user id, got {raw_user:?}"
            ))
        })?;

        let host_label = get("HOST_LABEL")
            .or_else(host_name)
            .unwrap_or_else(|| "host".to_string());

        // Update loop
        let poll_timeout_secs = parse_or(&get, "POLL_TIMEOUT_SECS", 30u32)?;
        let retry_cooldown = Duration::from_secs(parse_or(&get, "RETRY_COOLDOWN_SECS", 15u64)?);

        // Host operations
        let action_delay = Duration::from_millis(parse_or(&get, "ACTION_DELAY_MS", 1000u64)?);
        let smartctl_use_sudo = match get("SMARTCTL_USE_SUDO") {
            Some(v) => parse_bool(&v).ok_or_else(|| {
                Error::Config(format!("SMARTCTL_USE_SUDO must be a boolean, got {v:?}"))
            })?,
            None => true,
        };
        let temperature_sensors =
            parse_csv_lower(get("TEMPERATURE_SENSORS")).unwrap_or_else(default_sensors);

        // Telegram hard limit is 4096; leave room for markup.
        let telegram_safe_limit =
            parse_or(&get, "TELEGRAM_SAFE_LIMIT", 4000usize)?.clamp(200, 4096);

        Ok(Self {
            telegram_bot_token,
            allowed_user,
            host_label,
            poll_timeout_secs,
            retry_cooldown,
            action_delay,
            smartctl_use_sudo,
            temperature_sensors,
            telegram_safe_limit,
        })
    }
}

fn default_sensors() -> Vec<String> {
    DEFAULT_SENSOR_PRIORITY.iter().map(|s| s.to_string()).collect()
}

fn token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d+:[A-Za-z0-9_-]{20,}$").expect("valid regex"))
}

fn parse_or<T: std::str::FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T> {
    match get(key) {
        Some(v) => v
            .parse::<T>()
            .map_err(|_| Error::Config(format!("{key} has an invalid value: {v:?}"))),
        None => Ok(default),
    }
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        env::set_var(key, unquote(v.trim()));
    }
}

/// Strip optional surrounding quotes.
fn unquote(val: &str) -> &str {
    if val.len() >= 2
        && ((val.starts_with('"') && val.ends_with('"'))
            || (val.starts_with('\'') && val.ends_with('\'')))
    {
        return &val[1..val.len() - 1];
    }
    val
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_csv_lower(v: Option<String>) -> Option<Vec<String>> {
    let out = v?
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>();
    if out.is_empty() {
        None
    } else {
        Some(out)
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}
