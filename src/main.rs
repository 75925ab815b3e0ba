#![warn(clippy::pedantic)]

mod cache;
mod config;
mod error;
mod extract;
mod form;
mod media;
mod openapi;
mod query;
mod ratelimit;
mod render;
mod route;
mod session;
mod trace;

use std::net::SocketAddr;

use argon2::Argon2;
use sqlx::sqlite::SqlitePoolOptions;

pub type Database = sqlx::Pool<sqlx::Sqlite>;
pub type AppState = State;

/// The shared application state.
///
/// This should contain all shared dependencies that handlers need to access,
/// such as a database connection pool, a hash configuration (if it's expensive to create),
/// or a cache client.
///
/// For dependencies only used by a single handler, you can combine states instead.
#[derive(Clone, axum::extract::FromRef)]
pub struct State {
	pub database: Database,
	pub hasher: Argon2<'static>,
	pub media: media::Storage,
	pub cache: cache::PageCache,
}

#[tokio::main]
async fn main() {
	dotenvy::dotenv().ok();

	let config = config::Config::from_env().expect("invalid configuration");
	let _guard =
		trace::init_tracing_subscriber(&config).expect("failed to initialize tracing subscriber");

	let database = SqlitePoolOptions::new()
		.connect(&config.database_url)
		.await
		.expect("failed to connect to database");

	sqlx::migrate!()
		.run(&database)
		.await
		.expect("failed to run migrations");

	let state = State {
		database,
		hasher: Argon2::default(),
		media: media::Storage::new(&config.media_root),
		cache: cache::PageCache::new(config.cache_ttl),
	};

	let limits = ratelimit::Limits::new().expect("invalid rate limit configuration");

	ratelimit::cleanup_old_limits(&[&limits.default, &limits.secure]);

	let app = route::router(state, Some(limits));

	let listener = tokio::net::TcpListener::bind(("127.0.0.1", config.port))
		.await
		.expect("failed to bind to port");

	tracing::info!("listening on port {}", config.port);

	axum::serve(
		listener,
		app.into_make_service_with_connect_info::<SocketAddr>(),
	)
	.await
	.expect("server error");
}
