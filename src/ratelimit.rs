use std::{sync::Arc, time::Duration};

use axum::{
	body::Body,
	http::{header, HeaderMap, Response, StatusCode},
	response::IntoResponse,
	Json,
};
use governor::{
	clock::QuantaInstant,
	middleware::{RateLimitingMiddleware, StateInformationMiddleware},
};
use tower_governor::{
	governor::{GovernorConfig, GovernorConfigBuilder},
	key_extractor::{KeyExtractor, PeerIpKeyExtractor},
	GovernorError,
};

use crate::error::Message;

pub type Config = Arc<GovernorConfig<PeerIpKeyExtractor, StateInformationMiddleware>>;

/// The rate limits of the whole application.
#[derive(Clone)]
pub struct Limits {
	pub default: Config,
	pub secure: Config,
}

impl Limits {
	pub fn new() -> Option<Self> {
		Some(Self {
			default: default()?,
			secure: secure()?,
		})
	}
}

/// Limits applied to every page: generous enough for normal browsing.
pub fn default() -> Option<Config> {
	GovernorConfigBuilder::default()
		.per_second(10)
		.burst_size(50)
		.use_headers()
		.error_handler(error_handler)
		.finish()
		.map(Arc::new)
}

/// Limits applied to the sign-up and login forms.
pub fn secure() -> Option<Config> {
	GovernorConfigBuilder::default()
		.per_second(1)
		.burst_size(5)
		.use_headers()
		.error_handler(error_handler)
		.finish()
		.map(Arc::new)
}

fn with_headers(response: impl IntoResponse, headers: Option<HeaderMap>) -> Response<Body> {
	let mut response = response.into_response();

	if let Some(headers) = headers {
		response.headers_mut().extend(headers);
	}

	response
}

fn error_handler(error: GovernorError) -> Response<Body> {
	match error {
		GovernorError::TooManyRequests { wait_time, headers } => with_headers(
			(
				StatusCode::TOO_MANY_REQUESTS,
				[(header::RETRY_AFTER, wait_time.to_string())],
				Json(
					Message::new("too_many_requests")
						.detail("wait_time", wait_time)
						.into_vec(),
				),
			),
			headers,
		),
		GovernorError::UnableToExtractKey => {
			tracing::warn!("unable to extract a rate limiting key from the request");

			StatusCode::INTERNAL_SERVER_ERROR.into_response()
		}
		GovernorError::Other { code, msg, headers } => with_headers(
			(
				code,
				Json(Message::new(msg.unwrap_or_default()).into_vec()),
			),
			headers,
		),
	}
}

/// Periodically drops limiter state for clients that have gone quiet.
pub fn cleanup_old_limits<T, M>(configs: &[&Arc<GovernorConfig<T, M>>])
where
	T: KeyExtractor,
	<T as KeyExtractor>::Key: Send + Sync + 'static,
	M: RateLimitingMiddleware<QuantaInstant> + Send + Sync + 'static,
{
	let limiters = configs
		.iter()
		.map(|config| config.limiter().clone())
		.collect::<Vec<_>>();
	let interval = Duration::from_secs(60);

	std::thread::spawn(move || loop {
		std::thread::sleep(interval);

		for limiter in &limiters {
			tracing::debug!("rate limiting storage size: {}", limiter.len());

			limiter.retain_recent();
		}
	});
}
