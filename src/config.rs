use std::{
	collections::HashMap,
	env, fs,
	net::SocketAddr,
	path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_PORT: u16 = 3000;
const DEFAULT_CONFIG_PATH: &str = "config.json";

/// How a rule's prefix is compared against the request path.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PrefixMatch {
	/// `/api` matches `/api` and `/api/...`, never `/apiville`.
	#[default]
	Segment,
	/// Plain string prefix: `/api` also matches `/apiville`.
	Raw,
}

/// What happens to the path of a matched request before it is sent upstream.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Rewrite {
	#[default]
	StripPrefix,
	Retain,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Proxy {
	pub match_prefix: String,
	pub target_origin: String,
	#[serde(default)]
	pub change_origin: bool,
	#[serde(default)]
	pub rewrite: Rewrite,
	#[serde(default)]
	pub prefix_match: PrefixMatch,
	#[serde(default)]
	pub request_headers: HashMap<String, String>,
	#[serde(default = "default_timeout_secs")]
	pub timeout_secs: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Server {
	pub name: String,
	pub root: String,
	#[serde(default)]
	pub listen: String,
	#[serde(default)]
	pub proxies: Vec<Proxy>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Http {
	pub servers: Vec<Server>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Configuration {
	#[serde(default = "default_log_level")]
	pub log_level: String,
	#[serde(default)]
	pub access_log: bool,
	pub http: Http,
}

fn default_timeout_secs() -> u64 {
	30
}

fn default_log_level() -> String {
	"info".to_string()
}

impl Configuration {
	/// Reads the config from `CONFIG_SETTING` if set, otherwise from the
	/// file named by `CONFIG_PATH` (default `config.json`).
	pub fn load() -> Result<Self, ConfigError> {
		match env::var("CONFIG_SETTING") {
			Ok(val) => Self::from_json(&val),
			Err(_) => {
				let path = env::var("CONFIG_PATH").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
				Self::from_file(path)
			}
		}
	}

	pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let json_content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
			path: PathBuf::from(path),
			source,
		})?;
		Self::from_json(&json_content)
	}

	pub fn from_json(json: &str) -> Result<Self, ConfigError> {
		let config: Configuration = serde_json::from_str(json)?;
		if config.http.servers.is_empty() {
			return Err(ConfigError::NoServers);
		}
		Ok(config)
	}
}

impl Server {
	/// A bare port binds all interfaces; an empty value falls back to the
	/// `PORT` environment variable and then to 3000.
	pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
		let listen = self.listen.trim();
		if listen.is_empty() {
			let port = env::var("PORT")
				.ok()
				.and_then(|port| port.parse::<u16>().ok())
				.unwrap_or(DEFAULT_PORT);
			return Ok(SocketAddr::from(([0, 0, 0, 0], port)));
		}
		if let Ok(addr) = listen.parse::<SocketAddr>() {
			return Ok(addr);
		}
		listen
			.parse::<u16>()
			.map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
			.map_err(|_| ConfigError::InvalidListen {
				server: self.name.clone(),
				listen: self.listen.clone(),
			})
	}
}
