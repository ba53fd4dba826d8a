use std::{io, net::SocketAddr, path::PathBuf, time::Duration};

use hyper::{header, http::HeaderValue, Body, Response, StatusCode};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("failed to read config file {path}: {source}")]
	Read { path: PathBuf, source: io::Error },
	#[error("config is not well-formatted JSON: {0}")]
	Parse(#[from] serde_json::Error),
	#[error("config defines no servers")]
	NoServers,
	#[error("invalid match prefix `{prefix}`: must start with '/'")]
	InvalidPrefix { prefix: String },
	#[error("invalid target origin `{origin}` for prefix `{prefix}`: {reason}")]
	InvalidTarget {
		prefix: String,
		origin: String,
		reason: String,
	},
	#[error("invalid request header `{name}` for prefix `{prefix}`")]
	InvalidHeader { prefix: String, name: String },
	#[error("invalid timeout for prefix `{prefix}`: must be at least one second")]
	InvalidTimeout { prefix: String },
	#[error("invalid listen address `{listen}` for server `{server}`")]
	InvalidListen { server: String, listen: String },
}

#[derive(Debug, Error)]
pub enum StartupError {
	#[error(transparent)]
	Config(#[from] ConfigError),
	#[error("failed to bind {addr}: {source}")]
	Bind { addr: SocketAddr, source: hyper::Error },
}

/// Failure while forwarding a matched request upstream.
#[derive(Debug, Error)]
pub enum ProxyError {
	#[error("failed to build upstream request: {0}")]
	Request(#[from] hyper::http::Error),
	#[error("upstream request failed: {0}")]
	Upstream(#[from] hyper::Error),
	#[error("upstream did not respond within {0:?}")]
	Timeout(Duration),
}

impl ProxyError {
	pub fn status(&self) -> StatusCode {
		match self {
			ProxyError::Request(_) => StatusCode::INTERNAL_SERVER_ERROR,
			ProxyError::Upstream(_) => StatusCode::BAD_GATEWAY,
			ProxyError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
		}
	}

	pub fn into_response(self) -> Response<Body> {
		plain_response(self.status())
	}
}

// Response with the status's canonical reason as a text body
pub fn plain_response(status: StatusCode) -> Response<Body> {
	let reason = status.canonical_reason().unwrap_or("Error");
	let mut response = Response::new(Body::from(reason));
	*response.status_mut() = status;
	response.headers_mut().insert(
		header::CONTENT_TYPE,
		HeaderValue::from_static("text/plain; charset=utf-8"),
	);
	response
}
