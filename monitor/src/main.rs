mod config;

use std::sync::Arc;

use anyhow::Context;
use common::logger::init_logger;
use market::source::binance::BINANCE_SPOT_BASE;
use market::source::mexc::MEXC_CONTRACT_BASE;
use market::source::{BinanceSpotSource, MexcFuturesSource, PriceSource};
use notifier::{LogSink, NotificationSink, TELEGRAM_API_BASE, TelegramSink};
use scheduler::MonitorScheduler;
use tokio::sync::watch;

use config::{AppConfig, Venue};

fn build_source(cfg: &AppConfig) -> anyhow::Result<Arc<dyn PriceSource>> {
    let timeout = cfg.monitor.fetch_timeout;
    let source: Arc<dyn PriceSource> = match cfg.venue {
        Venue::Mexc => Arc::new(MexcFuturesSource::new(MEXC_CONTRACT_BASE, cfg.interval, timeout)?),
        Venue::Binance => Arc::new(BinanceSpotSource::new(BINANCE_SPOT_BASE, cfg.interval, timeout)?),
    };
    Ok(source)
}

fn build_sink(cfg: &AppConfig) -> anyhow::Result<Arc<dyn NotificationSink>> {
    let Some(creds) = &cfg.telegram else {
        tracing::warn!("TELEGRAM_TOKEN / TELEGRAM_CHAT_ID not set; alerts go to the log only");
        return Ok(Arc::new(LogSink));
    };

    let sink = TelegramSink::new(
        TELEGRAM_API_BASE,
        creds.token.clone(),
        creds.chat_id.clone(),
        cfg.monitor.fetch_timeout,
    )?;
    Ok(Arc::new(sink))
}

/// Installs the shutdown handlers and returns a future that resolves on
/// Ctrl-C or SIGTERM. Handlers are live as soon as this returns.
#[cfg(unix)]
fn shutdown_signal() -> std::io::Result<impl Future<Output = std::io::Result<()>>> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut term = signal(SignalKind::terminate())?;
    Ok(async move {
        tokio::select! {
            res = tokio::signal::ctrl_c() => res,
            _ = term.recv() => Ok(()),
        }
    })
}

#[cfg(not(unix))]
fn shutdown_signal() -> std::io::Result<impl Future<Output = std::io::Result<()>>> {
    Ok(tokio::signal::ctrl_c())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let is_production = std::env::var("APP_ENV").unwrap_or_default() == "production";
    init_logger("monitor", is_production);

    let cfg = AppConfig::from_env().context("invalid configuration")?;

    tracing::info!(
        venue = ?cfg.venue,
        interval = ?cfg.interval,
        instruments = cfg.monitor.instruments.len(),
        period = cfg.monitor.rolling_period,
        threshold = cfg.monitor.z_threshold,
        telegram = cfg.telegram.is_some(),
        "starting z-spread monitor"
    );

    let source = build_source(&cfg)?;
    let sink = build_sink(&cfg)?;
    let monitor = MonitorScheduler::new(cfg.monitor.clone(), source, sink)?;

    let shutdown = shutdown_signal()?;
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(monitor.run(shutdown_rx));

    shutdown.await?;
    tracing::info!("Shutdown signal received");

    // the loop finishes its current cycle before returning
    let _ = shutdown_tx.send(true);
    handle.await?;

    Ok(())
}

#[cfg(all(test, unix))]
mod tests {
    use std::process::Command;
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn sigterm_resolves_shutdown() {
        let shutdown = shutdown_signal().unwrap();

        let status = Command::new("kill")
            .args(["-TERM", &std::process::id().to_string()])
            .status()
            .unwrap();
        assert!(status.success());

        tokio::time::timeout(Duration::from_secs(5), shutdown)
            .await
            .expect("SIGTERM should end the wait")
            .unwrap();
    }
}
