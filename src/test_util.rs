use std::{
	convert::Infallible,
	future::Future,
	net::{SocketAddr, TcpListener},
	ops::Deref,
	path::{Path, PathBuf},
	sync::atomic::{AtomicUsize, Ordering},
};

use hyper::{
	header,
	server::conn::AddrStream,
	service::{make_service_fn, service_fn},
	Body, Request, Response, Server,
};
use serde_json::json;

static TEMP_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Starts a loopback upstream server running `handler` and returns its address.
pub async fn spawn_upstream<F, Fut>(handler: F) -> SocketAddr
where
	F: Fn(Request<Body>) -> Fut + Clone + Send + Sync + 'static,
	Fut: Future<Output = Response<Body>> + Send + 'static,
{
	let make_svc = make_service_fn(move |_conn: &AddrStream| {
		let handler = handler.clone();
		async move {
			Ok::<_, Infallible>(service_fn(move |req| {
				let handler = handler.clone();
				async move { Ok::<_, Infallible>(handler(req).await) }
			}))
		}
	});

	let server = Server::bind(&SocketAddr::from(([127, 0, 0, 1], 0))).serve(make_svc);
	let addr = server.local_addr();
	tokio::spawn(server);
	addr
}

/// Replies with a JSON description of the request it received.
pub async fn echo(req: Request<Body>) -> Response<Body> {
	let (parts, body) = req.into_parts();
	let body = hyper::body::to_bytes(body).await.unwrap_or_default();
	let get = |name: header::HeaderName| {
		parts
			.headers
			.get(name)
			.and_then(|value| value.to_str().ok())
			.map(str::to_string)
	};

	let payload = json!({
		"method": parts.method.as_str(),
		"path": parts.uri.path(),
		"query": parts.uri.query(),
		"host": get(header::HOST),
		"x_request_source": get(header::HeaderName::from_static("x-request-source")),
		"x_custom": get(header::HeaderName::from_static("x-custom")),
		"proxy_authorization": get(header::PROXY_AUTHORIZATION),
		"body": String::from_utf8_lossy(&body),
	});
	Response::new(Body::from(payload.to_string()))
}

/// A loopback port with nothing listening on it.
pub fn unused_port() -> u16 {
	let listener = TcpListener::bind("127.0.0.1:0").unwrap();
	listener.local_addr().unwrap().port()
}

/// A fresh, empty directory under the system temp dir, removed on drop.
pub struct TempRoot(PathBuf);

impl Deref for TempRoot {
	type Target = Path;

	fn deref(&self) -> &Path {
		&self.0
	}
}

impl Drop for TempRoot {
	fn drop(&mut self) {
		let _ = std::fs::remove_dir_all(&self.0);
	}
}

pub fn temp_root(name: &str) -> TempRoot {
	let id = TEMP_COUNTER.fetch_add(1, Ordering::SeqCst);
	let root = std::env::temp_dir().join(format!(
		"devserver-proxy-{}-{}-{}",
		std::process::id(),
		name,
		id
	));
	let _ = std::fs::remove_dir_all(&root);
	std::fs::create_dir_all(&root).unwrap();
	TempRoot(root)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_temp_root_is_removed_on_drop() {
		let root = temp_root("cleanup");
		std::fs::create_dir_all(root.join("static")).unwrap();
		std::fs::write(root.join("static/app.css"), "body{}").unwrap();
		let path = root.to_path_buf();
		assert!(path.exists());

		drop(root);
		assert!(!path.exists());
	}
}
