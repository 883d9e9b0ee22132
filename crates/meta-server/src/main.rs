// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Meta-data server binary.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use meta_server::{bootstrap, create_app_state, create_router, jobs};
use tower_http::{
	cors::{Any, CorsLayer},
	trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Meta-data server with role-based access control.
#[derive(Parser, Debug)]
#[command(name = "meta-server", about = "Meta-data server", version)]
struct Args {
	/// Config file to use instead of the system one
	#[arg(long, env = "META_SERVER_CONFIG")]
	config: Option<PathBuf>,

	#[command(subcommand)]
	command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Show version information
	Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let args = Args::parse();

	if let Some(Command::Version) = args.command {
		println!("meta-server version: {}", env!("CARGO_PKG_VERSION"));
		return Ok(());
	}

	// Load .env file if present
	dotenvy::dotenv().ok();

	let config = match &args.config {
		Some(path) => meta_server_config::load_config_with_file(path)?,
		None => meta_server_config::load_config()?,
	};

	tracing_subscriber::registry()
		.with(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| config.logging.level.clone().into()),
		)
		.with(tracing_subscriber::fmt::layer())
		.init();

	tracing::info!(
		host = %config.http.host,
		port = config.http.port,
		database = %config.database.url,
		"starting meta-server"
	);

	let pool = meta_server_db::create_pool(&config.database.url).await?;
	if config.database.auto_migrate {
		meta_server_db::run_migrations(&pool).await?;
	}

	let state = create_app_state(pool, &config).await?;
	if let Err(e) = bootstrap(&state).await {
		if !config.authz.bootstrap_mode {
			return Err(e.into());
		}
		tracing::error!(error = %e, "policy bootstrap failed; continuing in bootstrap mode");
	}

	let cleanup = jobs::spawn_cleanup(
		state.clone(),
		Duration::from_secs(config.auth.session_cleanup_interval_secs),
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
	let listener = tokio::net::TcpListener::bind(&addr).await?;

	tokio::select! {
		result = axum::serve(listener, app) => {
			if let Err(e) = result {
				tracing::error!(error = %e, "server error");
			}
		}
		_ = tokio::signal::ctrl_c() => {
			tracing::info!("received shutdown signal");
		}
	}

	cleanup.abort();
	tracing::info!("server shutdown complete");
	Ok(())
}
