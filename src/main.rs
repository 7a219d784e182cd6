//! Royal Worker - Backend service for the Royal Paints website
//!
//! Connects to NATS and serves the admin panel and public site: blog and
//! careers content, message templates, customer records with spreadsheet
//! import, and the contact/quote inbox.

mod admin;
mod auth;
mod cli;
mod config;
mod db;
mod handlers;
mod services;
mod types;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::{Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs directory - LOGS_DIR env var or ./logs
    let logs_dir = std::env::var("LOGS_DIR").unwrap_or_else(|_| "logs".to_string());
    std::fs::create_dir_all(&logs_dir).ok();

    // daily rotation
    let file_appender = RollingFileAppender::new(Rotation::DAILY, &logs_dir, "worker.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,royal_worker=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer()) // stdout
        .with(tracing_subscriber::fmt::layer().with_writer(non_blocking).with_ansi(false)) // file
        .init();

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve().await,
        Command::Migrate => {
            let pool = connect_database().await?;
            db::run_migrations(&pool).await?;
            info!("Database migrations complete");
            Ok(())
        }
        Command::CreateAdmin { email } => {
            let pool = connect_database().await?;
            db::run_migrations(&pool).await?;
            admin::create_admin_interactive(&pool, &email).await
        }
    }
}

/// Database only, for the maintenance subcommands that need no JWT secret
async fn connect_database() -> Result<sqlx::PgPool> {
    dotenvy::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let pool = db::create_pool(&database_url).await?;
    info!("Connected to PostgreSQL");
    Ok(pool)
}

async fn serve() -> Result<()> {
    info!("Starting Royal Worker...");

    let config = config::Config::from_env()?;
    info!("Configuration loaded");

    let pool = db::create_pool(&config.database_url).await?;
    info!("Connected to PostgreSQL");

    db::run_migrations(&pool).await?;
    info!("Database migrations complete");

    admin::ensure_admin_from_env(&pool).await;

    // Optional NATS_USER/NATS_PASSWORD auth
    let nats_client = match (std::env::var("NATS_USER"), std::env::var("NATS_PASSWORD")) {
        (Ok(user), Ok(password)) if !user.is_empty() => {
            async_nats::ConnectOptions::new()
                .user_and_password(user, password)
                .connect(&config.nats_url)
                .await?
        }
        _ => async_nats::connect(&config.nats_url).await?,
    };
    info!("Connected to NATS at {}", config.nats_url);

    if let Err(e) = handlers::start_handlers(nats_client, pool, &config).await {
        error!("Handler error: {}", e);
        return Err(e);
    }

    Ok(())
}
