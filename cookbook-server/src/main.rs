use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use cookbook_server::{
    catalog::Catalog,
    config::Config,
    database::Database,
    routes::{router, AppState},
    storage::MediaStorage,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
struct Args {
    /// Path to the YAML configuration file
    #[clap(long, default_value = "config.yml")]
    config: String,

    /// The address and optionally port to bind to, overriding the config file
    #[clap(long)]
    address: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Parse command line arguments
    let args = Args::parse();
    let config = Config::load(&args.config).context("Loading configuration")?;

    // initialize tracing
    let log_dir = match &config.logging.directory {
        Some(dir) => dir.clone(),
        None => std::env::current_dir()?,
    };
    let file_appender = tracing_appender::rolling::daily(log_dir, "access.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .json()
        .with_writer(non_blocking)
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // connect to the database
    let db = Database::connect(&config.database.path)
        .await
        .context("Connecting to database")?;

    let app = router(AppState {
        catalog: Catalog::new(Arc::new(db)),
        media: MediaStorage::new(config.media.root.clone()),
    });

    let address = args.address.unwrap_or(config.server.address);

    // In development, use HTTP. In production, use HTTPS.
    if let Some(tls) = &config.server.tls {
        rustls::crypto::ring::default_provider()
            .install_default()
            .map_err(|_| anyhow::anyhow!("Failed to install rustls crypto provider"))?;
        let tls_config =
            axum_server::tls_rustls::RustlsConfig::from_pem_file(&tls.cert_path, &tls.key_path)
                .await
                .context("Loading TLS certificate")?;

        let addr = address.parse()?;
        tracing::info!("Listening on {} (TLS)", addr);
        axum_server::bind_rustls(addr, tls_config)
            .serve(app.into_make_service())
            .await
            .context("Starting TLS server")?;
    } else {
        let listener = tokio::net::TcpListener::bind(&address).await?;
        tracing::info!("Listening on {}", address);
        axum::serve(listener, app).await?;
    }
    Ok(())
}
