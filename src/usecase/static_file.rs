use std::path::{Path, PathBuf};

use hyper::{header, http::HeaderValue, Body, Method, Response, StatusCode};
use mime_guess::from_path;
use tokio::fs::read;

use crate::error::plain_response;

// List of web file extensions
const WEB_EXTENSIONS: [&str; 16] = [
	".html", ".js", ".mjs", ".css", ".map", ".png", ".jpg", ".jpeg", ".gif", ".svg", ".ico",
	".json", ".webp", ".woff", ".woff2", ".mp3",
];

// Serves the built frontend from `root`. Asset paths map to files, anything
// else gets `index.html` so client-side routes resolve.
pub async fn serve_static_files(path: &str, root: &Path, method: &Method) -> Response<Body> {
	if method != Method::GET && method != Method::HEAD {
		let mut response = plain_response(StatusCode::METHOD_NOT_ALLOWED);
		response
			.headers_mut()
			.insert(header::ALLOW, HeaderValue::from_static("GET, HEAD"));
		return response;
	}

	let relative = path.trim_start_matches('/');
	if relative.split('/').any(|segment| segment == "..") {
		return plain_response(StatusCode::FORBIDDEN);
	}

	let file_path: PathBuf = if WEB_EXTENSIONS.iter().any(|ext| path.ends_with(ext)) {
		root.join(relative)
	} else {
		root.join("index.html")
	};

	match read(&file_path).await {
		Ok(bytes) => {
			let mime_type = from_path(&file_path).first_or_octet_stream();
			let length = bytes.len();
			let body = if method == Method::HEAD {
				Body::empty()
			} else {
				Body::from(bytes)
			};

			let mut response = Response::new(body);
			let headers = response.headers_mut();
			if let Ok(value) = HeaderValue::from_str(mime_type.as_ref()) {
				headers.insert(header::CONTENT_TYPE, value);
			}
			headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
			response
		}
		Err(e) => {
			log::debug!("failed to read file {}: {}", file_path.display(), e);
			plain_response(StatusCode::NOT_FOUND)
		}
	}
}
