use crate::{
	config,
	error::{ConfigError, ProxyError},
	router::{ProxyRule, Router},
};

use hyper::{
	client::HttpConnector,
	header,
	http::{HeaderName, HeaderValue},
	Body, Client, HeaderMap, Request, Response,
};
use hyper_rustls::HttpsConnector;
use log::{debug, warn};

use std::{convert::Infallible, net::SocketAddr, path::PathBuf, sync::Arc, time::Instant};

use super::{
	static_file::serve_static_files,
	stream::{AccessEntry, MeteredStream},
};

pub type HttpClient = Client<HttpsConnector<HttpConnector>, Body>;

/// Everything a server needs to answer requests; shared read-only.
pub struct AppState {
	pub name: String,
	pub root: PathBuf,
	pub router: Router,
	pub client: HttpClient,
	pub access_log: bool,
}

impl AppState {
	pub fn from_config(
		server: &config::Server,
		client: HttpClient,
		access_log: bool,
	) -> Result<Self, ConfigError> {
		Ok(Self {
			name: server.name.clone(),
			root: PathBuf::from(&server.root),
			router: Router::from_config(&server.proxies)?,
			client,
			access_log,
		})
	}
}

/// One client for every server and rule, so upstream connections are pooled.
pub fn build_client() -> HttpClient {
	let https = hyper_rustls::HttpsConnectorBuilder::new()
		.with_webpki_roots()
		.https_or_http()
		.enable_http1()
		.build();

	// A canceled request is reported, never resent on another connection
	Client::builder()
		.retry_canceled_requests(false)
		.build::<_, Body>(https)
}

// Entry point for every inbound request: forward it when a rule matches,
// otherwise serve it from the local root.
pub async fn dispatch(
	req: Request<Body>,
	state: Arc<AppState>,
	remote_addr: SocketAddr,
) -> Result<Response<Body>, Infallible> {
	let started = Instant::now();
	let method = req.method().clone();
	let path = req.uri().path().to_string();

	let (response, upstream) = match state.router.route(&path) {
		Some(rule) => {
			debug!("{} matched proxy prefix {}", path, rule.match_prefix());
			let response = match proxy_request(req, &state.client, rule).await {
				Ok(response) => response,
				Err(e) => {
					warn!("{} {} -> {}: {}", method, path, rule.origin(), e);
					e.into_response()
				}
			};
			(response, Some(rule.origin()))
		}
		None => (serve_static_files(&path, &state.root, &method).await, None),
	};

	if !state.access_log {
		return Ok(response);
	}

	let entry = AccessEntry {
		remote_addr,
		method,
		path,
		status: response.status(),
		upstream,
		started,
	};
	let (parts, body) = response.into_parts();
	let body = Body::wrap_stream(MeteredStream::new(body, entry));
	Ok(Response::from_parts(parts, body))
}

// Forwards a single request to the rule's upstream. No retries.
pub async fn proxy_request(
	req: Request<Body>,
	client: &HttpClient,
	rule: &ProxyRule,
) -> Result<Response<Body>, ProxyError> {
	let (parts, body) = req.into_parts();
	let uri = rule.upstream_uri(&parts.uri)?;

	let mut request = Request::builder()
		.method(parts.method)
		.uri(uri)
		.body(body)?;

	// Copy the original headers, minus the connection-scoped ones
	let headers: &mut HeaderMap<HeaderValue> = request.headers_mut();
	*headers = parts.headers;
	strip_hop_by_hop(headers);

	if rule.change_origin() {
		headers.insert(header::HOST, rule.host_header().clone());
	}

	for (name, value) in rule.request_headers() {
		headers.insert(name.clone(), value.clone());
	}

	debug!("forwarding to {}", request.uri());

	let res = tokio::time::timeout(rule.timeout(), client.request(request))
		.await
		.map_err(|_| ProxyError::Timeout(rule.timeout()))??;

	let (mut parts, body) = res.into_parts();
	strip_hop_by_hop(&mut parts.headers);

	Ok(Response::from_parts(parts, body))
}

fn strip_hop_by_hop(headers: &mut HeaderMap<HeaderValue>) {
	let listed: Vec<HeaderName> = headers
		.get_all(header::CONNECTION)
		.iter()
		.filter_map(|value| value.to_str().ok())
		.flat_map(|value| value.split(','))
		.filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
		.collect();

	let fixed = [
		header::CONNECTION,
		HeaderName::from_static("keep-alive"),
		header::PROXY_AUTHENTICATE,
		header::PROXY_AUTHORIZATION,
		header::TE,
		header::TRAILER,
		header::TRANSFER_ENCODING,
		header::UPGRADE,
	];

	for name in listed.iter().chain(fixed.iter()) {
		headers.remove(name);
	}
}
