mod config;
mod error;
mod rewrite;
mod router;
mod server;
mod usecase;
#[cfg(test)]
mod test_util;

use config::Configuration;
use env_logger::Env;
use error::StartupError;
use log::{error, info};
use std::{process, sync::Arc};
use tokio::task;

use usecase::proxy::{self, AppState};

// Use Jemalloc only for musl-64 bits platforms
#[cfg(all(target_env = "musl", target_pointer_width = "64"))]
#[global_allocator]
static ALLOC: jemallocator::Jemalloc = jemallocator::Jemalloc;

#[tokio::main]
async fn main() {
	dotenv::dotenv().ok();

	let config = Configuration::load();

	// RUST_LOG wins over the configured level
	let log_level = config
		.as_ref()
		.map(|config| config.log_level.as_str())
		.unwrap_or("info");
	env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

	if let Err(e) = run(config).await {
		error!("{}", e);
		process::exit(1);
	}
}

async fn run(config: Result<Configuration, error::ConfigError>) -> Result<(), StartupError> {
	let config = config?;
	let client = proxy::build_client();

	// Validate every server before any of them starts accepting requests
	let mut states = Vec::with_capacity(config.http.servers.len());
	for server in &config.http.servers {
		let addr = server.socket_addr()?;
		let state = AppState::from_config(server, client.clone(), config.access_log)?;
		states.push((addr, Arc::new(state)));
	}

	let bound = server::bind_all(states, server::shutdown_signal)?;

	let mut server_tasks = Vec::with_capacity(bound.len());
	for (state, local_addr, server) in bound {
		let name = state.name.clone();
		for rule in state.router.rules() {
			info!("{}: proxying {} -> {}", name, rule.match_prefix(), rule.origin());
		}
		info!("{}: listening on http://{}", name, local_addr);

		server_tasks.push(task::spawn(async move {
			if let Err(e) = server.await {
				error!("{}: server error: {}", name, e);
			}
		}));
	}

	for result in futures::future::join_all(server_tasks).await {
		if let Err(e) = result {
			error!("server task failed: {}", e);
		}
	}
	info!("shut down");
	Ok(())
}
