use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use crate::app::app;
use crate::config::AppConfig;
use crate::database::{DatabaseManager, MemoryStore, PgStore, Store};
use crate::state::AppState;

#[derive(Parser)]
#[command(name = "form-builder-api")]
#[command(about = "Form builder backend: forms, fields and collected responses")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the HTTP server")]
    Serve {
        #[arg(long, help = "Port to listen on (overrides API_PORT)")]
        port: Option<u16>,

        #[arg(long, help = "Use the in-memory store instead of Postgres")]
        memory: bool,
    },

    #[command(about = "Create tables and indexes in the configured database")]
    Migrate,
}

pub async fn run(cli: Cli, config: AppConfig) -> anyhow::Result<()> {
    match cli.command {
        Commands::Serve { port, memory } => serve(config, port, memory).await,
        Commands::Migrate => {
            let pool = DatabaseManager::connect(&config.database).await?;
            DatabaseManager::migrate(&pool).await?;
            Ok(())
        }
    }
}

async fn serve(mut config: AppConfig, port: Option<u16>, memory: bool) -> anyhow::Result<()> {
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("invalid configuration: {}", e))?;
    if let Some(port) = port {
        config.api.port = port;
    }

    let store: Arc<dyn Store> = if memory {
        warn!("Using in-memory store; data is lost on exit");
        Arc::new(MemoryStore::new())
    } else {
        let pool = DatabaseManager::connect(&config.database).await?;
        DatabaseManager::migrate(&pool).await?;
        Arc::new(PgStore::new(pool))
    };

    let bind_addr = format!("0.0.0.0:{}", config.api.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    info!(
        "Form builder API listening on http://{} ({:?})",
        bind_addr, config.environment
    );

    axum::serve(listener, app(AppState::new(config, store)))
        .await
        .context("server error")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_serve_flags() {
        let cli = Cli::try_parse_from(["form-builder-api", "serve", "--port", "9000", "--memory"])
            .unwrap();
        match cli.command {
            Commands::Serve { port, memory } => {
                assert_eq!(port, Some(9000));
                assert!(memory);
            }
            Commands::Migrate => panic!("expected serve"),
        }
    }

    #[test]
    fn parses_migrate() {
        let cli = Cli::try_parse_from(["form-builder-api", "migrate"]).unwrap();
        assert!(matches!(cli.command, Commands::Migrate));
    }
}
