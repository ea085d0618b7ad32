use argo_feed::config::Config;
use argo_feed::error::AppError;
use argo_feed::models::DataSourceResult;
use argo_feed::render::{to_render_points, RenderPoint};
use argo_feed::service::DataService;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_CONFIG_PATH: &str = "config/config.yaml";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Report {
    result: DataSourceResult,
    render_points: Vec<RenderPoint>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Logs go to stderr so stdout carries only the JSON report
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,argo_feed=debug,reqwest=warn")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("ARGO feed starting...");

    let config_path =
        std::env::var("ARGO_FEED_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let config = Config::load(&config_path).map_err(|e| {
        anyhow::anyhow!(
            "Failed to load configuration from {}: {}\n\n\
             Make sure:\n\
             1. The config file exists (or set ARGO_FEED_CONFIG)\n\
             2. All referenced environment variables are set (check .env.example)\n\
             3. Create a .env file if needed",
            config_path,
            e
        )
    })?;
    info!(
        "Configuration loaded: {} primary, {} secondary, alternative {}",
        config.sources.primary.len(),
        config.sources.secondary.len(),
        if config.sources.alternative.is_some() { "enabled" } else { "disabled" }
    );

    let service = DataService::new(&config)?;

    // Set up cancellation signal
    let (cancel_tx, cancel_rx) = watch::channel(false);

    // Spawn signal handler
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = cancel_tx.send(true);
    });

    let result = match service
        .fetch_cancellable(config.query.time_range, config.query.region, cancel_rx)
        .await
    {
        Ok(result) => result,
        Err(AppError::Cancelled) => {
            info!("Fetch abandoned, exiting");
            return Ok(());
        }
        Err(e) => {
            error!("Fetch failed: {}", e);
            return Err(e.into());
        }
    };

    let mut rng = match config.synthetic.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let render_points = to_render_points(
        &result.records,
        &config.render.parameter,
        config.render.point_budget,
        &mut rng,
    );
    info!(
        "Prepared {} render points (budget {})",
        render_points.len(),
        config.render.point_budget
    );

    let report = Report {
        result,
        render_points,
    };
    serde_json::to_writer_pretty(std::io::stdout().lock(), &report)?;
    println!();

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, cancelling fetch");
        }
        _ = terminate => {
            info!("Received SIGTERM, cancelling fetch");
        }
    }
}
