//! `prodtraced`: the product traceability server binary.
//!
//! Usage:
//!   prodtraced -c <context-name-or-path> [--listen <addr>]
//!
//! The context name resolves to `/etc/prodtrace/<name>.toml`.
//! If a path with `/` or `.` is given, it's used directly.

mod bootstrap;
mod config;
mod routes;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use prodtrace_core::Module;
use tracing::info;

use config::ServerConfig;

/// Product traceability server.
#[derive(Parser, Debug)]
#[command(name = "prodtraced", about = "Product traceability server")]
struct Cli {
    /// Context name or path to config file.
    #[arg(short = 'c', long = "config", required = true)]
    config: String,

    /// Listen address (overrides default 0.0.0.0:8080).
    #[arg(long = "listen", default_value = "0.0.0.0:8080")]
    listen: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    // Load server configuration.
    let config_path = ServerConfig::resolve_path(&cli.config);
    info!("Loading configuration from {}", config_path.display());
    let server_config = ServerConfig::load(&config_path)?;

    // Verify configuration is valid.
    bootstrap::verify_config(&server_config)?;

    // Initialize storage.
    let data_dir = PathBuf::from(&server_config.storage.data_dir);
    std::fs::create_dir_all(&data_dir)?;

    let core_config = prodtrace_core::ServiceConfig {
        data_dir: Some(data_dir),
        sqlite_path: server_config.storage.sqlite_path.as_ref().map(PathBuf::from),
        blob_dir: server_config.storage.blob_dir.as_ref().map(PathBuf::from),
        listen: cli.listen.clone(),
    };

    let sql: Arc<dyn prodtrace_sql::SQLStore> = Arc::new(
        prodtrace_sql::SqliteStore::open(&core_config.resolve_sqlite_path())
            .map_err(|e| anyhow::anyhow!("failed to open SQL store: {}", e))?,
    );
    let blob: Arc<dyn prodtrace_blob::BlobStore> = Arc::new(
        prodtrace_blob::FileStore::open(&core_config.resolve_blob_dir())
            .map_err(|e| anyhow::anyhow!("failed to open blob store: {}", e))?,
    );

    let settings = trace::TraceSettings {
        base_url: server_config.code.base_url.trim().to_string(),
        code_dir: server_config.code.dir.trim().to_string(),
        max_id_attempts: server_config.ingest.max_id_attempts,
    };
    let service = trace::TraceService::new(sql, blob, settings)
        .map_err(|e| anyhow::anyhow!("failed to initialize trace service: {}", e))?;
    let trace_module = trace::TraceModule::new(service);
    info!("Trace module initialized");

    let module_routes = vec![(trace_module.name(), trace_module.routes())];
    let app = routes::build_router(module_routes);

    // Start server. Peer addresses feed the scan log.
    let listener = tokio::net::TcpListener::bind(&core_config.listen).await?;
    info!("prodtraced listening on {}", core_config.listen);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
