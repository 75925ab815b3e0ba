use std::{path::PathBuf, str::FromStr, time::Duration};

use tracing::Level;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://yatube.db?mode=rwc";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_MEDIA_ROOT: &str = "media";
pub const DEFAULT_CACHE_TTL_SECS: u64 = 20;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("{name} has an invalid value {value:?}")]
	Invalid { name: &'static str, value: String },
}

/// Runtime configuration, read from the environment.
///
/// Call [`dotenvy::dotenv`] first to pick up a `.env` file.
#[derive(Debug, Clone)]
pub struct Config {
	pub database_url: String,
	pub port: u16,
	pub media_root: PathBuf,
	pub cache_ttl: Duration,
	pub log_level: Level,
	/// Export traces and metrics over OTLP when an endpoint is configured.
	pub otlp: bool,
}

impl Config {
	pub fn from_env() -> Result<Self, Error> {
		Self::from_lookup(|name| std::env::var(name).ok())
	}

	fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
		Ok(Self {
			database_url: lookup("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.into()),
			port: parse(&lookup, "PORT")?.unwrap_or(DEFAULT_PORT),
			media_root: lookup("MEDIA_ROOT").map_or_else(|| DEFAULT_MEDIA_ROOT.into(), PathBuf::from),
			cache_ttl: Duration::from_secs(
				parse(&lookup, "CACHE_TTL_SECS")?.unwrap_or(DEFAULT_CACHE_TTL_SECS),
			),
			log_level: parse(&lookup, "LOG_LEVEL")?.unwrap_or(Level::INFO),
			otlp: lookup("OTEL_EXPORTER_OTLP_ENDPOINT").is_some_and(|value| !value.is_empty()),
		})
	}
}

fn parse<T: FromStr>(
	lookup: &impl Fn(&str) -> Option<String>,
	name: &'static str,
) -> Result<Option<T>, Error> {
	lookup(name)
		.map(|value| value.parse().map_err(|_| Error::Invalid { name, value }))
		.transpose()
}
