use std::sync::Arc;

use aide::{axum::ApiRouter, openapi::OpenApi};
use axum::{http::Uri, middleware, response::Response, Extension, Router};
use tower::ServiceBuilder;
use tower_governor::GovernorLayer;
use tower_http::{
	compression::CompressionLayer,
	request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
	services::ServeDir,
	trace::TraceLayer,
};

use crate::{cache, error::Message, openapi, ratelimit, render, AppState};

pub mod auth;
pub mod docs;
pub mod group;
pub mod model;
pub mod post;
pub mod profile;

async fn not_found(uri: Uri) -> Response {
	render::not_found(
		Message::new("not_found")
			.detail("path", uri.path())
			.into_vec(),
	)
}

/// Builds the whole application: pages, authentication, docs and media files.
///
/// Rate limits are left out when `limits` is `None`, which tests rely on
/// since they have no peer address to key the limiter on.
pub fn router(state: AppState, limits: Option<ratelimit::Limits>) -> Router {
	let mut api = OpenApi::default();

	let cached = post::cached_routes()
		.merge(profile::cached_routes())
		.layer(middleware::from_fn_with_state(
			state.cache.clone(),
			cache::cache_page,
		));

	let auth = match &limits {
		Some(limits) => auth::routes().layer(GovernorLayer {
			config: limits.secure.clone(),
		}),
		None => auth::routes(),
	};

	let router = ApiRouter::new()
		.merge(cached)
		.merge(post::routes())
		.merge(group::routes())
		.merge(profile::routes())
		.nest("/auth", auth)
		.nest("/docs", docs::routes())
		.finish_api_with(&mut api, openapi::docs)
		.layer(Extension(Arc::new(api)))
		.nest_service("/media", ServeDir::new(state.media.root()))
		.fallback(not_found);

	let router = match limits {
		Some(limits) => router.layer(GovernorLayer {
			config: limits.default,
		}),
		None => router,
	};

	router
		.layer(
			ServiceBuilder::new()
				.layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
				.layer(TraceLayer::new_for_http())
				.layer(PropagateRequestIdLayer::x_request_id())
				.layer(CompressionLayer::new()),
		)
		.with_state(state)
}
