use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use colored::Colorize;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use webspecs::application::config::AppConfig;
use webspecs::application::services::digest::{DigestScheduler, DigestSettings};
use webspecs::application::services::live_loop::LiveLoop;
use webspecs::domain::ports::clock::SystemClock;
use webspecs::domain::ports::collector::StaticInfoProvider;
use webspecs::infrastructure::collectors::static_info::SysinfoStaticInfo;
use webspecs::infrastructure::collectors::sysinfo_collector::SysinfoSampler;
use webspecs::infrastructure::live::broadcast::BroadcastSink;
use webspecs::infrastructure::notifications::smtp::{SmtpMailer, SmtpSettings};
use webspecs::infrastructure::persistence::sqlite_store::SqliteStore;
use webspecs::infrastructure::persistence::threshold_file::ThresholdFileStore;
use webspecs::presentation::cli::app::{Cli, Commands, ThresholdAction};
use webspecs::presentation::cli::commands::daemon::{run_daemon, shutdown_signal};
use webspecs::presentation::cli::commands::digest::run_digest;
use webspecs::presentation::cli::commands::sample::run_sample;
use webspecs::presentation::cli::commands::subscriptions::{run_relay, run_subscribe};
use webspecs::presentation::cli::commands::thresholds::{run_extend, run_patch, run_show};
use webspecs::presentation::http::AppState;

/// CPU usage needs two refreshes some time apart to be meaningful.
const CPU_WARMUP: Duration = Duration::from_millis(500);

fn print_banner(bind: &str) {
    println!("{}", "━".repeat(40).cyan());
    println!("{}", "  webspecs: host metrics monitor".bold().cyan());
    println!("  listening on {}", bind.bold());
    println!("{}", "━".repeat(40).cyan());
}

fn setup_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn digest_scheduler(config: &AppConfig, store: &Arc<SqliteStore>) -> DigestScheduler {
    let mailer = SmtpMailer::new(SmtpSettings {
        host: config.mail.smtp_host.clone(),
        port: config.mail.smtp_port,
        starttls: config.mail.starttls,
        timeout: config.mail.timeout(),
    });
    DigestScheduler::new(
        store.clone(),
        store.clone(),
        Arc::new(mailer),
        Arc::new(SystemClock),
        DigestSettings {
            period: config.general.digest_interval(),
            send_timeout: config.mail.timeout(),
            policy: config.mail.delivery,
        },
    )
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_tracing(cli.verbose);

    let config = if let Some(ref path) = cli.config {
        AppConfig::load_from(path)?
    } else {
        AppConfig::load()?
    };

    // Manual DI: main.rs is the only place that knows concrete types
    let thresholds = Arc::new(
        ThresholdFileStore::new(&config.thresholds.path, config.thresholds.ratio_default)
            .context("Failed to open threshold file")?,
    );

    match cli.command {
        Some(Commands::Sample { json }) => {
            let sampler = SysinfoSampler::new();
            tokio::time::sleep(CPU_WARMUP).await;
            run_sample(&sampler, thresholds.as_ref(), json)?;
        }
        Some(Commands::Thresholds { action }) => match action {
            ThresholdAction::Show => run_show(thresholds.as_ref())?,
            ThresholdAction::Patch { changes } => {
                run_patch(thresholds.as_ref(), &changes)?;
            }
            ThresholdAction::Extend => {
                let sampler = SysinfoSampler::new();
                tokio::time::sleep(CPU_WARMUP).await;
                run_extend(thresholds.as_ref(), &sampler)?;
            }
        },
        Some(Commands::Subscribe { email }) => {
            let store = SqliteStore::new(&config.database.path)?;
            run_subscribe(&store, &email)?;
        }
        Some(Commands::Relay { sender, credential }) => {
            let store = SqliteStore::new(&config.database.path)?;
            run_relay(&store, &sender, &credential)?;
        }
        Some(Commands::Digest) => {
            let store = Arc::new(SqliteStore::new(&config.database.path)?);
            run_digest(&digest_scheduler(&config, &store)).await?;
        }
        Some(Commands::Daemon { bind }) => {
            run(&config, thresholds, bind).await?;
        }
        None => run(&config, thresholds, None).await?,
    }

    Ok(())
}

async fn run(
    config: &AppConfig,
    thresholds: Arc<ThresholdFileStore>,
    bind: Option<String>,
) -> anyhow::Result<()> {
    let bind = bind.unwrap_or_else(|| config.server.bind.clone());
    let store = Arc::new(SqliteStore::new(&config.database.path)?);
    let sink = BroadcastSink::new(config.server.live_capacity);

    let live = Arc::new(LiveLoop::new(
        Arc::new(SysinfoSampler::new()),
        store.clone(),
        thresholds.clone(),
        store.clone(),
        Arc::new(sink.clone()),
        config.general.sample_interval(),
    ));
    let digest = Arc::new(digest_scheduler(config, &store));
    let state = AppState {
        thresholds,
        subscriptions: store,
        live: sink,
        static_info: Arc::new(SysinfoStaticInfo.static_info()),
    };

    let listener = TcpListener::bind(&bind)
        .await
        .with_context(|| format!("Cannot listen on {bind}"))?;
    print_banner(&bind);
    tracing::info!(
        sample_secs = config.general.sample_interval().as_secs(),
        digest_secs = config.general.digest_interval().as_secs(),
        "Daemon started"
    );

    tokio::time::sleep(CPU_WARMUP).await;
    run_daemon(live, digest, state, listener, shutdown_signal()).await
}
