use aide::axum::{routing::get_with, ApiRouter};
use axum::http::StatusCode;

use crate::{error, AppState};

pub mod model;
pub mod route;

pub const LOGIN_URL: &str = "/auth/login/";

/// An error that can occur during authentication.
///
/// Note that the messages are presented to the client, so they should not contain
/// sensitive information.
#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("login required to access {0}")]
	LoginRequired(String),
	#[error("password hashing error")]
	Argon(#[from] argon2::Error),
}

pub type RouteError = error::RouteError<Error>;

/// The login page url that sends the user back to `path` afterwards.
///
/// Every segment of `path` is query-encoded, while the slashes between them are kept.
pub fn login_url(path: &str) -> String {
	let next = path
		.split('/')
		.map(|segment| url::form_urlencoded::byte_serialize(segment.as_bytes()).collect::<String>())
		.collect::<Vec<_>>()
		.join("/");

	format!("{LOGIN_URL}?next={next}")
}

pub fn routes() -> ApiRouter<AppState> {
	use route::*;

	ApiRouter::new()
		.api_route(
			"/signup/",
			get_with(signup_form, signup_form_docs).post_with(signup, signup_docs),
		)
		.api_route(
			"/login/",
			get_with(login_form, login_form_docs).post_with(login, login_docs),
		)
		.api_route(
			"/logout/",
			get_with(logout, logout_docs).post_with(logout, logout_docs),
		)
}

impl error::ErrorShape for Error {
	fn status(&self) -> StatusCode {
		match self {
			Self::LoginRequired(..) => StatusCode::UNAUTHORIZED,
			Self::Argon(..) => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}

	fn errors(&self) -> Vec<error::Message<'_>> {
		match self {
			Self::LoginRequired(path) => error::Message::new("login_required")
				.detail("next", path.as_str())
				.into_vec(),
			Self::Argon(..) => error::Message::new(self.to_string()).into_vec(),
		}
	}

	fn location(&self) -> Option<String> {
		match self {
			Self::LoginRequired(path) => Some(login_url(path)),
			Self::Argon(..) => None,
		}
	}
}
