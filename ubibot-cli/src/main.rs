use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use futures_util::future::join_all;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use ubibot_core::{setup, Reading, ReadingView, SensorConfig};

/// Poll a Ubibot channel and print its temperature, humidity and light readings.
#[derive(Debug, Parser)]
#[command(name = "ubibot", version, about)]
struct Cli {
    /// Path to config.json (defaults to <config dir>/ubibot/config.json)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print one round of readings and exit
    #[arg(long)]
    once: bool,

    /// Seconds between rounds of readings
    #[arg(long, default_value_t = 60)]
    poll_seconds: u64,
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let config = match SensorConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            error!(error = %err, "failed to load configuration");
            return ExitCode::FAILURE;
        }
    };
    info!(
        channel = %config.channel,
        refresh_interval = config.refresh_interval,
        "starting ubibot poller"
    );

    let views = match setup(&config).await {
        Ok(views) => views,
        Err(err) => {
            error!(error = %err, "failed to set up channel");
            return ExitCode::FAILURE;
        }
    };

    if cli.once {
        print_round(&views).await;
        return ExitCode::SUCCESS;
    }

    let mut ticker = tokio::time::interval(Duration::from_secs(cli.poll_seconds.max(1)));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown requested");
                break;
            }
            _ = ticker.tick() => print_round(&views).await,
        }
    }
    ExitCode::SUCCESS
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

async fn print_round(views: &[ReadingView]) {
    let readings = join_all(views.iter().map(|view| view.current_value())).await;
    for (view, reading) in views.iter().zip(readings) {
        println!("{}", format_reading(view, reading));
    }
}

fn format_reading(view: &ReadingView, reading: Reading) -> String {
    let name = view.display_name();
    match reading {
        Reading::Available(value) => format!("{name}: {value} {}", view.unit()),
        Reading::Unavailable(reason) => format!("{name}: unavailable ({reason})"),
    }
}
