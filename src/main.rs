use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use sqlx::PgPool;
use tracing_subscriber::EnvFilter;

use monk_crud::config::config;
use monk_crud::crud::{Crud, ResourceConfig};
use monk_crud::database::{manager::DatabaseManager, pg_store::PgDocumentStore};
use monk_crud::handlers::app;
use monk_crud::hashing::SecretHasher;
use monk_crud::store::{DocumentStore, MemoryStore};

#[derive(Parser)]
#[command(name = "monk-crud")]
#[command(about = "Serve config-driven CRUD resources over HTTP")]
#[command(version)]
struct Cli {
    /// Resource config file (YAML), repeat for several resources
    #[arg(short, long = "resource", required = true)]
    resources: Vec<PathBuf>,

    /// Port to listen on (overrides MONK_API_PORT / PORT)
    #[arg(short, long)]
    port: Option<u16>,

    /// Postgres URL (overrides DATABASE_URL)
    #[arg(long)]
    database_url: Option<String>,

    /// Keep documents in process memory even when a database URL is configured
    #[arg(long, conflicts_with = "database_url")]
    in_memory: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let settings = config();
    tracing::info!("Starting monk-crud in {:?} mode", settings.environment);

    let database_url = if cli.in_memory {
        None
    } else {
        cli.database_url.clone().or_else(|| settings.database.url.clone())
    };

    let pool = match database_url {
        Some(url) => Some(
            DatabaseManager::connect(&url, &settings.database)
                .await
                .context("failed to connect to database")?,
        ),
        None => {
            tracing::info!("No database configured, documents are kept in memory");
            None
        }
    };

    // One salt for the whole process
    let hasher = Arc::new(SecretHasher::new());

    let mut cruds = Vec::with_capacity(cli.resources.len());
    for path in &cli.resources {
        let resource = ResourceConfig::from_yaml_file(path)
            .with_context(|| format!("failed to load resource config {}", path.display()))?;
        let store = open_store(pool.as_ref(), &resource.collection).await?;
        cruds.push(Crud::new(resource, store, hasher.clone()));
    }

    let port = cli.port.unwrap_or(settings.api.port);
    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("monk-crud listening on http://{}", bind_addr);

    axum::serve(listener, app(cruds, pool)).await.context("server")?;
    Ok(())
}

async fn open_store(pool: Option<&PgPool>, collection: &str) -> Result<Arc<dyn DocumentStore>> {
    match pool {
        Some(pool) => {
            let store = PgDocumentStore::new(pool.clone(), collection)?;
            store
                .ensure_table()
                .await
                .with_context(|| format!("failed to prepare table for {}", collection))?;
            Ok(Arc::new(store))
        }
        None => Ok(Arc::new(MemoryStore::new())),
    }
}
