//! Process wiring: build the bot, verify credentials, phone home, run the loop.

use std::{sync::Arc, time::Duration};

use anyhow::Context;
use teloxide::{prelude::*, types::Me};
use tokio_util::sync::CancellationToken;

use rcb_core::{
    actions::SystemActionExecutor,
    config::Config,
    diagnostics::{Diagnostics, SmartctlHealth},
    messaging::port::MessagingPort,
    poller::{Poller, PollerConfig},
    reports::{timestamp, HostInspector, HostReports},
    router::CommandRouter,
    telemetry::{host_name, SensorTemperature},
    tools::{SystemToolRunner, ToolRunner},
};

use crate::{map_err, updates::TelegramUpdateSource, TelegramMessenger};

/// Extra HTTP time on top of the server-side long-poll window.
const HTTP_GRACE: Duration = Duration::from_secs(15);

pub async fn run_polling(cfg: Arc<Config>, shutdown: CancellationToken) -> anyhow::Result<()> {
    let bot = build_bot(&cfg)?;

    let Some(me) = identify(&bot, &cfg, &shutdown).await? else {
        return Ok(());
    };
    tracing::info!(
        bot = %me.username(),
        label = %cfg.host_label,
        allowed_user = cfg.allowed_user.0,
        "rcb started"
    );

    let messenger: Arc<dyn MessagingPort> = Arc::new(TelegramMessenger::new(bot.clone()));

    let tools: Arc<dyn ToolRunner> = Arc::new(SystemToolRunner);
    let disks = Arc::new(SmartctlHealth::new(tools.clone(), cfg.smartctl_use_sudo));
    let reports: Arc<dyn HostReports> = Arc::new(HostInspector::new(
        cfg.host_label.clone(),
        Arc::new(SensorTemperature::new(cfg.temperature_sensors.clone())),
        Diagnostics::new(tools, disks),
    ));

    let router = Arc::new(
        CommandRouter::new(
            cfg.allowed_user,
            cfg.host_label.clone(),
            messenger,
            reports,
            SystemActionExecutor::shared(cfg.action_delay),
        )
        .with_safe_limit(cfg.telegram_safe_limit),
    );

    let hostname = host_name().unwrap_or_else(|| "unknown".to_string());
    router.announce_startup(&hostname, &timestamp()).await;

    let mut poller = Poller::new(
        Arc::new(TelegramUpdateSource::new(bot)),
        router,
        PollerConfig {
            timeout_secs: cfg.poll_timeout_secs,
            retry_cooldown: cfg.retry_cooldown,
        },
    );
    poller.run(shutdown).await;

    Ok(())
}

/// Bot whose HTTP timeout outlasts the long-poll window.
fn build_bot(cfg: &Config) -> anyhow::Result<Bot> {
    let client = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .timeout(Duration::from_secs(u64::from(cfg.poll_timeout_secs)) + HTTP_GRACE)
        .tcp_nodelay(true)
        .build()
        .context("failed to build HTTP client")?;
    Ok(Bot::with_client(cfg.telegram_bot_token.clone(), client))
}

/// `getMe` until it succeeds. A rejected token is fatal; network trouble is retried
/// with the usual cooldown. Returns `None` if shutdown was requested meanwhile.
async fn identify(
    bot: &Bot,
    cfg: &Config,
    shutdown: &CancellationToken,
) -> anyhow::Result<Option<Me>> {
    loop {
        let res = tokio::select! {
            biased;
            _ = shutdown.cancelled() => return Ok(None),
            r = bot.get_me().send() => r,
        };

        match res.map_err(map_err) {
            Ok(me) => return Ok(Some(me)),
            Err(e) if e.is_fatal() => return Err(e.into()),
            Err(e) => {
                tracing::warn!(
                    "startup check failed: {e}; retrying in {}s",
                    cfg.retry_cooldown.as_secs()
                );
                tokio::select! {
                    biased;
                    _ = shutdown.cancelled() => return Ok(None),
                    _ = tokio::time::sleep(cfg.retry_cooldown) => {}
                }
            }
        }
    }
}
