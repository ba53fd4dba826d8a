use std::{
	net::SocketAddr,
	pin::Pin,
	task::{Context, Poll},
	time::Instant,
};

use bytes::Bytes;
use futures::Stream;
use hyper::{Method, StatusCode};
use pin_project::{pin_project, pinned_drop};

/// Request facts recorded for the access log line.
#[derive(Debug, Clone)]
pub struct AccessEntry {
	pub remote_addr: SocketAddr,
	pub method: Method,
	pub path: String,
	pub status: StatusCode,
	pub upstream: Option<String>,
	pub started: Instant,
}

impl AccessEntry {
	fn log(&self, bytes: u64, outcome: &str) {
		let upstream = self.upstream.as_deref().unwrap_or("-");
		log::info!(
			target: "access",
			"{} \"{} {}\" {} {} {}ms {} {}",
			self.remote_addr,
			self.method,
			self.path,
			self.status.as_u16(),
			bytes,
			self.started.elapsed().as_millis(),
			upstream,
			outcome
		);
	}
}

/// Passes body chunks through unchanged while counting them, and writes the
/// access log line once the body ends or is dropped.
#[pin_project(PinnedDrop)]
pub struct MeteredStream<S> {
	#[pin]
	inner: S,
	bytes: u64,
	entry: Option<AccessEntry>,
}

impl<S> MeteredStream<S> {
	pub fn new(inner: S, entry: AccessEntry) -> Self {
		Self {
			inner,
			bytes: 0,
			entry: Some(entry),
		}
	}
}

impl<S> Stream for MeteredStream<S>
where
	S: Stream<Item = Result<Bytes, hyper::Error>>,
{
	type Item = Result<Bytes, hyper::Error>;

	fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
		let this = self.project();
		match futures::ready!(this.inner.poll_next(cx)) {
			Some(Ok(chunk)) => {
				*this.bytes += chunk.len() as u64;
				Poll::Ready(Some(Ok(chunk)))
			}
			Some(Err(e)) => {
				log::warn!("error while streaming response body: {}", e);
				if let Some(entry) = this.entry.take() {
					entry.log(*this.bytes, "failed");
				}
				Poll::Ready(Some(Err(e)))
			}
			None => {
				if let Some(entry) = this.entry.take() {
					entry.log(*this.bytes, "done");
				}
				Poll::Ready(None)
			}
		}
	}
}

#[pinned_drop]
impl<S> PinnedDrop for MeteredStream<S> {
	fn drop(self: Pin<&mut Self>) {
		let this = self.project();
		// caller went away before the body finished
		if let Some(entry) = this.entry.take() {
			entry.log(*this.bytes, "aborted");
		}
	}
}
