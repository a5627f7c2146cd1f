use std::sync::Arc;
use std::time::Duration;

use seedwatch_config::{AppConfig, LogFormatName};
use seedwatch_fsops::CompletionPipeline;
use seedwatch_qbittorrent::QbittorrentClient;
use seedwatch_telegram::{TelegramBot, TelegramChannel, wait_for_start_command};
use seedwatch_telemetry::{GlobalContextGuard, LogFormat, LoggingConfig, Metrics};
use seedwatch_torrent_core::{JobSource, NotificationChannel};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::error::{AppError, AppResult};
use crate::host::SystemHostProbe;
use crate::monitor::{ActivityMonitor, PipelineDispatcher};

const STARTED_TEXT: &str = "Bot iniciado com sucesso!";
const CONNECT_FAILED_TEXT: &str = "Erro ao conectar ao qBittorrent.";

/// Entry point for the seedwatch boot sequence.
///
/// Loads the configuration, installs logging, optionally waits for `/start` from any chat,
/// logs in to qBittorrent and polls until Ctrl-C.
///
/// # Errors
///
/// Returns an error if configuration or logging setup fails, if the bot cannot receive the
/// `/start` command, or if the qBittorrent login is refused.
pub async fn run_app() -> AppResult<()> {
    let config = AppConfig::from_env().map_err(|err| AppError::config("config.from_env", err))?;
    let logging = logging_config(&config);
    seedwatch_telemetry::init_logging(&logging)
        .map_err(|err| AppError::telemetry("telemetry.init", err))?;
    let _context = GlobalContextGuard::new("monitor");

    info!("seedwatch bootstrap starting");
    Box::pin(run_with(config)).await
}

async fn run_with(config: AppConfig) -> AppResult<()> {
    let metrics = Metrics::new().map_err(|err| AppError::telemetry("telemetry.metrics", err))?;

    let bot = Arc::new(
        TelegramBot::new(&config.telegram, config.http_timeout)
            .map_err(|err| AppError::channel("telegram.new", err))?,
    );
    let status: Arc<dyn NotificationChannel> = Arc::new(TelegramChannel::new(
        Arc::clone(&bot),
        config.telegram.status_chat_id.clone(),
    ));
    let files: Arc<dyn NotificationChannel> = Arc::new(TelegramChannel::new(
        Arc::clone(&bot),
        config.telegram.file_chat_id.clone(),
    ));

    if config.monitor.require_start_command {
        await_start_command(&bot).await?;
    }

    let source: Arc<dyn JobSource> =
        match QbittorrentClient::connect(config.qbittorrent.clone(), config.http_timeout).await {
            Ok(client) => Arc::new(client),
            Err(err) => {
                error!(error = %err, host = %config.qbittorrent.host, "qBittorrent login failed");
                if let Err(notify) = status.send_message(CONNECT_FAILED_TEXT).await {
                    warn!(error = %notify, "connection failure notice not delivered");
                }
                return Err(AppError::job_source("qbittorrent.connect", err));
            }
        };

    let pipeline = CompletionPipeline::new(
        files,
        config.pipeline.scratch_dir.clone(),
        config.pipeline.part_size_bytes,
        metrics.clone(),
    );
    let monitor = ActivityMonitor::new(
        source,
        status,
        Arc::new(SystemHostProbe::default()),
        Arc::new(PipelineDispatcher::new(pipeline)),
        metrics.clone(),
        &config.monitor,
    );

    info!(
        interval_secs = config.monitor.poll_interval.as_secs(),
        idle_timeout_secs = config.monitor.idle_timeout.as_secs(),
        "starting job monitor"
    );
    let poller = spawn_poll_loop(monitor, config.monitor.poll_interval);

    let signal = tokio::signal::ctrl_c().await;
    info!("shutdown requested");
    poller.abort();
    if let Err(err) = poller.await
        && !err.is_cancelled()
    {
        warn!(error = %err, "poll loop join failed");
    }

    match metrics.render() {
        Ok(exposition) => debug!(metrics = %exposition, "final metrics"),
        Err(err) => warn!(error = %err, "metrics rendering failed"),
    }
    signal.map_err(|source| AppError::Signal { source })?;
    info!("seedwatch shutdown complete");
    Ok(())
}

/// Block until `/start` arrives from any chat, then answer in that chat.
async fn await_start_command(bot: &TelegramBot) -> AppResult<()> {
    let command = wait_for_start_command(bot)
        .await
        .map_err(|err| AppError::channel("telegram.wait_for_start", err))?;
    let chat_id = command.chat.id.to_string();
    if let Err(err) = bot.send_message(&chat_id, STARTED_TEXT).await {
        warn!(error = %err, chat_id = %chat_id, "start acknowledgement failed");
    }
    Ok(())
}

/// Poll on a fixed period. The first pass runs immediately and a pass always finishes before the
/// next tick is taken.
fn spawn_poll_loop(mut monitor: ActivityMonitor, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            monitor.poll().await;
        }
    })
}

fn logging_config(config: &AppConfig) -> LoggingConfig<'_> {
    let format = config.log_format.map_or_else(LogFormat::infer, |name| match name {
        LogFormatName::Json => LogFormat::Json,
        LogFormatName::Pretty => LogFormat::Pretty,
    });
    LoggingConfig {
        level: &config.log_level,
        format,
        ..LoggingConfig::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seedwatch_config::{
        MonitorSettings, PipelineSettings, QbittorrentConfig, Secret, TelegramConfig,
    };
    use httpmock::prelude::*;
    use seedwatch_fsops::CompletionRequest;
    use serde_json::json;
    use seedwatch_test_support::fixtures::downloading;
    use seedwatch_test_support::mocks::{FixedHostProbe, RecordingChannel, ScriptedJobSource};
    use seedwatch_torrent_core::HostSample;
    use std::path::PathBuf;

    use crate::monitor::CompletionDispatcher;

    struct Ignore;

    impl CompletionDispatcher for Ignore {
        fn dispatch(&self, _request: CompletionRequest) {}
    }

    fn config(log_format: Option<LogFormatName>) -> anyhow::Result<AppConfig> {
        Ok(AppConfig {
            telegram: TelegramConfig {
                bot_token: Secret::new("123:abc"),
                status_chat_id: "-1001".to_string(),
                file_chat_id: "-1002".to_string(),
                api_url: "https://api.telegram.org".parse()?,
            },
            qbittorrent: QbittorrentConfig {
                host: "http://localhost:8080".parse()?,
                username: "admin".to_string(),
                password: Secret::new("adminadmin"),
            },
            monitor: MonitorSettings {
                poll_interval: Duration::from_secs(7),
                idle_timeout: Duration::from_secs(15),
                downloads_root: PathBuf::from("/downloads"),
                require_start_command: false,
            },
            pipeline: PipelineSettings {
                part_size_bytes: 2 * 1024 * 1024 * 1024,
                scratch_dir: PathBuf::from("/tmp"),
            },
            log_format,
            log_level: "debug".to_string(),
            http_timeout: None,
        })
    }

    #[test]
    fn logging_config_follows_configured_format() -> anyhow::Result<()> {
        let json = config(Some(LogFormatName::Json))?;
        let logging = logging_config(&json);
        assert_eq!(logging.format, LogFormat::Json);
        assert_eq!(logging.level, "debug");

        let inferred = config(None)?;
        assert_eq!(logging_config(&inferred).format, LogFormat::infer());
        Ok(())
    }

    #[tokio::test]
    async fn start_is_acknowledged_in_the_commanding_chat() -> anyhow::Result<()> {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/bot123:abc/getMe");
            then.status(200)
                .json_body(json!({"ok": true, "result": {"id": 1, "username": "seedbot"}}));
        });
        server.mock(|when, then| {
            when.method(POST)
                .path("/bot123:abc/getUpdates")
                .json_body(json!({"timeout": 30, "allowed_updates": ["message", "channel_post"]}));
            then.status(200).json_body(json!({
                "ok": true,
                "result": [
                    {"update_id": 3, "message": {"message_id": 9, "chat": {"id": 4242}, "text": "/start"}}
                ]
            }));
        });
        server.mock(|when, then| {
            when.method(POST)
                .path("/bot123:abc/getUpdates")
                .json_body(json!({"offset": 4, "timeout": 0, "allowed_updates": ["message", "channel_post"]}));
            then.status(200).json_body(json!({"ok": true, "result": []}));
        });
        let reply = server.mock(|when, then| {
            when.method(POST)
                .path("/bot123:abc/sendMessage")
                .json_body(json!({"chat_id": "4242", "text": STARTED_TEXT}));
            then.status(200).json_body(json!({
                "ok": true,
                "result": {"message_id": 10, "chat": {"id": 4242}, "text": STARTED_TEXT}
            }));
        });

        let mut telegram = config(None)?.telegram;
        telegram.status_chat_id = "@seedwatch_status".to_string();
        telegram.api_url = server.base_url().parse()?;
        let bot = TelegramBot::new(&telegram, None)?;

        await_start_command(&bot).await?;

        reply.assert();
        Ok(())
    }

    #[tokio::test]
    async fn poll_loop_runs_immediately_and_keeps_ticking() -> anyhow::Result<()> {
        let source = Arc::new(ScriptedJobSource::new());
        source.push_jobs(vec![downloading("Movie", 0.2)]);
        let channel = Arc::new(RecordingChannel::new());
        let settings = config(None)?.monitor;
        let monitor = ActivityMonitor::new(
            source.clone(),
            channel.clone(),
            Arc::new(FixedHostProbe::new(HostSample::default())),
            Arc::new(Ignore),
            Metrics::new()?,
            &settings,
        );

        let poller = spawn_poll_loop(monitor, Duration::from_millis(20));
        tokio::time::sleep(Duration::from_millis(150)).await;
        poller.abort();
        assert!(poller.await.is_err_and(|err| err.is_cancelled()));

        assert!(source.list_calls() >= 2);
        assert_eq!(channel.sent_texts().len(), 1);
        Ok(())
    }
}
