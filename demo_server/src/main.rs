//! Demo server: serves the generated REST API and its OpenAPI document.
//!
//! Run from repo root: `cargo run -p demo-server`
//!
//! With `METADATA_FILE` set, entities come from that JSON file and rows live in memory.
//! Otherwise the tables of `DATABASE_SCHEMA` (default `public`) in `DATABASE_URL` are exposed.

use sql_openapi::{build, load_metadata_file, ApiConfig, Mapper, MemoryMapper, PgMapper};
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("sql_openapi=info,demo_server=info")),
        )
        .init();

    let config = ApiConfig::from_env()?;
    let mapper: Arc<dyn Mapper> = match std::env::var("METADATA_FILE") {
        Ok(path) => {
            let metadata = load_metadata_file(&path).await?;
            tracing::info!(path = %path, entities = metadata.len(), "using in-memory store");
            Arc::new(MemoryMapper::new(metadata))
        }
        Err(_) => {
            let database_url =
                std::env::var("DATABASE_URL").unwrap_or_else(|_| "postgres://localhost/postgres".into());
            let schema = std::env::var("DATABASE_SCHEMA").unwrap_or_else(|_| "public".into());
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(5)
                .connect(&database_url)
                .await?;
            Arc::new(PgMapper::connect(pool, &schema).await?)
        }
    };

    let app = build(mapper, config).await?;
    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:3000".into());
    let listener = TcpListener::bind(&bind_addr).await?;
    tracing::info!("listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
