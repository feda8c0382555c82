// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! dotvault server binary.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use dotvault_server::{auth_middleware, create_app_state, create_router};
use dotvault_server_config::{LogFormat, ServerConfig};
use dotvault_server_db::{ApiKeyRepository, OwnerId, ProjectRepository, SqlitePool};
use tokio::sync::broadcast;
use tower_http::{
	cors::{Any, CorsLayer},
	trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

/// dotvault server - encrypted, versioned .env storage.
#[derive(Parser, Debug)]
#[command(name = "dotvault-server", about = "Encrypted env file server", version)]
struct Args {
	/// TOML config file, instead of DOTVAULT_SERVER_CONFIG or /etc/dotvault/server.toml
	#[arg(long, global = true)]
	config: Option<PathBuf>,

	#[command(subcommand)]
	command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Run the HTTP server (default)
	Serve,
	/// Show version information
	Version,
	/// Create a project owned by `owner`
	CreateProject {
		#[arg(long)]
		owner: Uuid,
		#[arg(long)]
		name: String,
	},
	/// Create an API key for `owner` and print it once
	CreateApiKey {
		#[arg(long)]
		owner: Uuid,
		#[arg(long)]
		name: String,
	},
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let args = Args::parse();

	if let Some(Command::Version) = args.command {
		println!("dotvault-server version: {}", env!("CARGO_PKG_VERSION"));
		return Ok(());
	}

	// Load .env file if present
	dotenvy::dotenv().ok();

	let config = match &args.config {
		Some(path) => dotvault_server_config::load_config_with_file(path),
		None => dotvault_server_config::load_config(),
	}
	.context("loading configuration")?;
	init_tracing(&config);

	let pool = dotvault_server_db::create_pool(&config.database.url, config.database.max_connections)
		.await
		.context("opening database")?;
	dotvault_server_db::run_migrations(&pool)
		.await
		.context("running migrations")?;

	match args.command {
		Some(Command::CreateProject { owner, name }) => create_project(&pool, owner, &name).await,
		Some(Command::CreateApiKey { owner, name }) => create_api_key(&pool, owner, &name).await,
		Some(Command::Serve) | Some(Command::Version) | None => serve(pool, &config).await,
	}
}

fn init_tracing(config: &ServerConfig) {
	let filter = tracing_subscriber::EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| config.logging.level.clone().into());
	let registry = tracing_subscriber::registry().with(filter);

	match config.logging.format {
		LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
		LogFormat::Json => registry
			.with(tracing_subscriber::fmt::layer().json())
			.init(),
	}
}

async fn serve(pool: SqlitePool, config: &ServerConfig) -> anyhow::Result<()> {
	tracing::info!(
		host = %config.http.host,
		port = config.http.port,
		database = %config.database.url,
		"starting dotvault-server"
	);

	let state = create_app_state(pool, config).context("building application state")?;

	let (shutdown_tx, _) = broadcast::channel(1);
	let sweeper = dotvault_server_ratelimit::spawn_sweeper(
		state.limiter.clone(),
		config.rate_limit.sweep_interval(),
		shutdown_tx.subscribe(),
	);

	let app = create_router(state)
		.layer(TraceLayer::new_for_http())
		.layer(
			CorsLayer::new()
				.allow_origin(Any)
				.allow_methods(Any)
				.allow_headers(Any),
		);

	let addr = config.socket_addr();
	tracing::info!(%addr, "listening");
	let listener = tokio::net::TcpListener::bind(&addr)
		.await
		.with_context(|| format!("binding {addr}"))?;

	tokio::select! {
		result = axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()) => {
			if let Err(e) = result {
				tracing::error!(error = %e, "Server error");
			}
		}
		_ = tokio::signal::ctrl_c() => {
			tracing::info!("Received shutdown signal");
		}
	}

	let _ = shutdown_tx.send(());
	if let Err(e) = sweeper.await {
		tracing::warn!(error = %e, "rate limit sweeper did not stop cleanly");
	}

	tracing::info!("Server shutdown complete");
	Ok(())
}

async fn create_project(pool: &SqlitePool, owner: Uuid, name: &str) -> anyhow::Result<()> {
	let project = ProjectRepository::new(pool.clone())
		.create_project(&OwnerId::new(owner), name)
		.await
		.context("creating project")?;
	println!("{}", project.id);
	Ok(())
}

async fn create_api_key(pool: &SqlitePool, owner: Uuid, name: &str) -> anyhow::Result<()> {
	let token = auth_middleware::generate_token();
	let id = ApiKeyRepository::new(pool.clone())
		.create_api_key(
			&OwnerId::new(owner),
			name,
			&auth_middleware::hash_token(token.expose()),
		)
		.await
		.context("creating API key")?;

	eprintln!("API key {id} created. Store the key below; it will not be shown again.");
	println!("{}", token.expose());
	Ok(())
}
