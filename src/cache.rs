use std::{
	sync::Arc,
	time::{Duration, Instant},
};

use axum::{
	body::{Body, Bytes},
	extract::{Request, State},
	http::{header, HeaderMap, Method, StatusCode},
	middleware::Next,
	response::{IntoResponse, Response},
};
use dashmap::DashMap;

#[derive(Debug, Clone)]
struct Entry {
	headers: HeaderMap,
	body: Bytes,
	expires_at: Instant,
}

/// A full-page cache keyed by request url and cookies.
///
/// Entries only leave the cache by expiring or through [`PageCache::clear`].
#[derive(Debug, Clone)]
pub struct PageCache {
	entries: Arc<DashMap<String, Entry>>,
	ttl: Duration,
}

impl PageCache {
	pub fn new(ttl: Duration) -> Self {
		Self {
			entries: Arc::new(DashMap::new()),
			ttl,
		}
	}

	pub fn clear(&self) {
		self.entries.clear();
	}

	#[cfg(test)]
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	fn get(&self, key: &str) -> Option<Entry> {
		let now = Instant::now();
		let entry = self.entries.get(key).map(|entry| entry.clone())?;

		if entry.expires_at > now {
			return Some(entry);
		}

		self.entries.remove_if(key, |_, entry| entry.expires_at <= now);
		None
	}

	fn insert(&self, key: String, headers: HeaderMap, body: Bytes) {
		let now = Instant::now();

		self.entries.retain(|_, entry| entry.expires_at > now);
		self.entries.insert(
			key,
			Entry {
				headers,
				body,
				expires_at: now + self.ttl,
			},
		);
	}
}

/// Pages differ per viewer, so the cookies are part of the key.
fn cache_key(request: &Request) -> String {
	let cookies = request
		.headers()
		.get_all(header::COOKIE)
		.into_iter()
		.filter_map(|value| value.to_str().ok())
		.collect::<Vec<_>>()
		.join("; ");

	format!("{} {} {}", request.method(), request.uri(), cookies)
}

/// Middleware serving successful `GET` responses from a [`PageCache`].
pub async fn cache_page(State(cache): State<PageCache>, request: Request, next: Next) -> Response {
	if request.method() != Method::GET {
		return next.run(request).await;
	}

	let key = cache_key(&request);

	if let Some(entry) = cache.get(&key) {
		tracing::debug!(%key, "page cache hit");

		let mut response = Response::new(Body::from(entry.body));

		*response.headers_mut() = entry.headers;
		return response;
	}

	let response = next.run(request).await;

	if response.status() != StatusCode::OK {
		return response;
	}

	let (parts, body) = response.into_parts();
	let body = match axum::body::to_bytes(body, usize::MAX).await {
		Ok(body) => body,
		Err(error) => {
			tracing::error!(%error, "failed to buffer page for caching");

			return StatusCode::INTERNAL_SERVER_ERROR.into_response();
		}
	};

	cache.insert(key, parts.headers.clone(), body.clone());

	Response::from_parts(parts, Body::from(body))
}
