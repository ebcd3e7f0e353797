use anyhow::{bail, Context, Result};
use klines_rs::config::{FetchConfig, ResampleConfig};
use klines_rs::fetch::{Fetcher, TracingObserver};
use klines_rs::resample::resample_file;
use tokio::sync::watch;
use tracing::{error, info, warn};

// Kline downloader
// `fetch` downloads every configured timeframe, `resample` derives coarser
// timeframes from a 1-minute CSV. Settings come from KLINES_* / RESAMPLE_*
// environment variables or a .env file.

const USAGE: &str = "usage: kline_downloader [fetch|resample]";

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_logging();

    let mode = std::env::args().nth(1).unwrap_or_else(|| "fetch".to_string());
    match mode.as_str() {
        "fetch" => fetch().await,
        "resample" => resample(),
        "-h" | "--help" => {
            println!("{USAGE}");
            Ok(())
        }
        other => bail!("unknown mode {other:?}\n{USAGE}"),
    }
}

/// `RUST_LOG` filter, default `info`. `KLINES_LOG_FORMAT=json` for JSON lines.
fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match std::env::var("KLINES_LOG_FORMAT").as_deref() {
        Ok("json") => builder.json().init(),
        _ => builder.init(),
    }
}

async fn fetch() -> Result<()> {
    let config = FetchConfig::from_env().context("Failed to load fetch configuration")?;

    let separator = "=".repeat(60);
    info!("{}", separator);
    info!(
        "{} {} klines, {} timeframes",
        config.exchange.name(),
        config.symbol,
        config.timeframes.len()
    );
    info!("{}", separator);

    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, saving data fetched so far");
            let _ = stop_tx.send(true);
        }
    });

    let fetcher = Fetcher::connect(config)
        .context("Failed to create fetcher")?
        .with_stop_signal(stop_rx);
    let summary = fetcher
        .download_all(&mut TracingObserver)
        .await
        .context("Download failed")?;

    for report in &summary.reports {
        info!("{}", report.format());
    }
    info!("{}", summary.format());

    if summary.failed() > 0 {
        error!("{} timeframes did not complete", summary.failed());
    }
    Ok(())
}

fn resample() -> Result<()> {
    let config = ResampleConfig::from_env().context("Failed to load resample configuration")?;
    let summary = resample_file(&config)
        .with_context(|| format!("Failed to resample {}", config.input.display()))?;

    info!("{}", summary.format());
    if summary.failed() > 0 {
        error!("{} targets could not be written", summary.failed());
    }
    Ok(())
}
