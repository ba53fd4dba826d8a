use std::{convert::Infallible, future::Future, net::SocketAddr, sync::Arc};

use hyper::{
	server::conn::AddrStream,
	service::{make_service_fn, service_fn},
	Server,
};

use crate::{
	error::StartupError,
	usecase::proxy::{self, AppState},
};

/// Binds `addr` and returns the bound address together with the server
/// future. The future resolves after `shutdown` fires and open connections
/// drain.
pub fn bind(
	addr: SocketAddr,
	state: Arc<AppState>,
	shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(SocketAddr, impl Future<Output = Result<(), hyper::Error>> + Send), StartupError> {
	let make_svc = make_service_fn(move |conn: &AddrStream| {
		let state = Arc::clone(&state);
		let remote_addr = conn.remote_addr();
		async move {
			Ok::<_, Infallible>(service_fn(move |req| {
				proxy::dispatch(req, Arc::clone(&state), remote_addr)
			}))
		}
	});

	let server = Server::try_bind(&addr)
		.map_err(|source| StartupError::Bind { addr, source })?
		.serve(make_svc);
	let local_addr = server.local_addr();

	Ok((local_addr, server.with_graceful_shutdown(shutdown)))
}

/// Binds every server before any of them runs, so one bad address aborts
/// startup while nothing is serving yet.
pub fn bind_all<F>(
	servers: Vec<(SocketAddr, Arc<AppState>)>,
	shutdown: impl Fn() -> F,
) -> Result<
	Vec<(
		Arc<AppState>,
		SocketAddr,
		impl Future<Output = Result<(), hyper::Error>> + Send,
	)>,
	StartupError,
>
where
	F: Future<Output = ()> + Send + 'static,
{
	let mut bound = Vec::with_capacity(servers.len());
	for (addr, state) in servers {
		let (local_addr, server) = bind(addr, Arc::clone(&state), shutdown())?;
		bound.push((state, local_addr, server));
	}
	Ok(bound)
}

/// Resolves on Ctrl-C.
pub async fn shutdown_signal() {
	if let Err(e) = tokio::signal::ctrl_c().await {
		log::error!("failed to listen for shutdown signal: {}", e);
		std::future::pending::<()>().await;
	}
}
