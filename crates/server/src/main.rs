use clap::Parser;
use retrieval_core::config;
use retrieval_core::index::HnswConfig;
use retrieval_core::{Index, IndexKind, IndexOptions};
use retrieval_server::api::create_router;
use retrieval_server::api::handlers::AppState;
use retrieval_server::api::metrics;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "retrieval-server",
    about = "Build a k-NN index from a feature file and serve it over HTTP"
)]
struct Args {
    /// Feature file of length-prefixed records
    #[arg(short, long)]
    input: PathBuf,

    /// Index strategy: flat, binary or hnsw
    #[arg(short = 't', long, default_value = "flat")]
    index_type: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = config::DEFAULT_PORT,
          value_parser = clap::value_parser!(u16).range(1..))]
    port: u16,

    /// Worker threads used for bucket scans
    #[arg(long, default_value_t = config::DEFAULT_WORKER_THREADS)]
    workers: usize,

    /// Signature capacity in bits (binary index)
    #[arg(long, default_value_t = config::DEFAULT_SIGNATURE_BITS)]
    signature_bits: usize,

    /// Expected feature dimension (default: taken from the first record)
    #[arg(long)]
    dimension: Option<usize>,

    /// Maximum number of records the hnsw index accepts
    #[arg(long, default_value_t = config::HNSW_DEFAULT_MAX_ELEMENTS)]
    hnsw_max_elements: usize,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("retrieval_server=info".parse()?)
                .add_directive("retrieval_core=info".parse()?),
        )
        .init();

    let args = Args::parse();
    let kind: IndexKind = args.index_type.parse()?;
    let options = IndexOptions {
        dimension: args.dimension,
        workers: args.workers,
        signature_bits: args.signature_bits,
        finalize_on_search: true,
        hnsw: HnswConfig {
            max_elements: args.hnsw_max_elements,
            ..HnswConfig::default()
        },
    };

    let index = Arc::new(Index::new(kind, options)?);
    let input = args.input.clone();
    let builder = Arc::clone(&index);
    let count = tokio::task::spawn_blocking(move || -> retrieval_core::Result<usize> {
        let count = builder.build_from_path(&input)?;
        builder.finalize();
        Ok(count)
    })
    .await??;
    tracing::info!(
        index_type = %kind,
        records = count,
        dimension = ?index.dimension(),
        "index ready"
    );

    let prometheus_handle =
        metrics_exporter_prometheus::PrometheusBuilder::new().install_recorder()?;
    metrics::set_records_total(index.total_count());

    let state = AppState {
        index,
        prometheus_handle,
        start_time: Instant::now(),
    };
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("listening on {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received SIGINT"),
        _ = terminate => tracing::info!("Received SIGTERM"),
    }
}
