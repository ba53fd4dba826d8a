//! Prefix matching and path rewriting for proxy rules.
//!
//! Both functions are pure and total so the routing rule can be checked
//! without any networking.

use crate::config::PrefixMatch;

/// Whether `path` falls under `prefix`.
///
/// The comparison is case-sensitive and anchored at the start of the path.
/// In [`PrefixMatch::Segment`] mode the prefix must end on a path segment
/// boundary, so `/api` matches `/api` and `/api/users` but not `/apiville`.
pub fn matches_prefix(path: &str, prefix: &str, mode: PrefixMatch) -> bool {
	let Some(rest) = path.strip_prefix(prefix) else {
		return false;
	};
	match mode {
		PrefixMatch::Raw => true,
		PrefixMatch::Segment => rest.is_empty() || rest.starts_with('/') || prefix.ends_with('/'),
	}
}

/// Removes one leading occurrence of `prefix` from `path`.
///
/// The result is always an absolute path: an empty remainder becomes `/` and
/// a remainder without a leading slash gets one. Paths that do not start with
/// `prefix` are returned unchanged.
pub fn strip_prefix(path: &str, prefix: &str) -> String {
	match path.strip_prefix(prefix) {
		Some(rest) if rest.starts_with('/') => rest.to_string(),
		Some(rest) => format!("/{}", rest),
		None => path.to_string(),
	}
}
