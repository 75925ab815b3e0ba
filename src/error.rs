use std::{borrow::Cow, convert::Infallible};

use aide::OperationOutput;
use axum::{
	body::Body,
	extract::{multipart, rejection},
	http::{header, Response, StatusCode},
	response::IntoResponse,
	Json,
};
use schemars::JsonSchema;
use serde::Serialize;

use crate::render;

pub type Map = serde_json::Map<String, serde_json::Value>;

/// A single client-facing error message.
#[derive(Debug, Serialize, JsonSchema)]
pub struct Message<'a> {
	pub content: Cow<'a, str>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub field: Option<Cow<'a, str>>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub details: Option<Cow<'a, Map>>,
}

impl<'a> Message<'a> {
	pub fn new(content: impl Into<Cow<'a, str>>) -> Self {
		Self {
			content: content.into(),
			field: None,
			details: None,
		}
	}

	pub fn field(mut self, field: impl Into<Cow<'a, str>>) -> Self {
		self.field = Some(field.into());
		self
	}

	pub fn detail(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
		let mut details = self.details.map(Cow::into_owned).unwrap_or_default();

		details.insert(key.into(), value.into());
		self.details = Some(Cow::Owned(details));
		self
	}

	pub fn into_vec(self) -> Vec<Self> {
		vec![self]
	}
}

/// Describes how a route-specific error is presented to the client.
pub trait ErrorShape: std::error::Error {
	fn status(&self) -> StatusCode;

	fn errors(&self) -> Vec<Message<'_>>;

	/// When set, the error is answered with a redirect to this location
	/// instead of an error body.
	fn location(&self) -> Option<String> {
		None
	}
}

impl ErrorShape for Infallible {
	fn status(&self) -> StatusCode {
		match *self {}
	}

	fn errors(&self) -> Vec<Message<'_>> {
		match *self {}
	}
}

/// Error type for route handlers.
///
/// The Display trait is not sent to the client, so it can show
/// sensitive information.
#[derive(Debug, thiserror::Error)]
pub enum RouteError<E: ErrorShape> {
	#[error(transparent)]
	Route(E),
	#[error("validation error: {0}")]
	Validation(#[from] validator::ValidationErrors),
	#[error("query error: {0}")]
	Query(#[from] rejection::QueryRejection),
	#[error("path error: {0}")]
	Path(#[from] rejection::PathRejection),
	#[error("form error: {0}")]
	Form(#[from] rejection::FormRejection),
	#[error("multipart rejection: {0}")]
	MultipartRejection(#[from] multipart::MultipartRejection),
	#[error("multipart error: {0}")]
	Multipart(#[from] multipart::MultipartError),
	#[error("io error: {0}")]
	Io(#[from] std::io::Error),
	#[error("database error: {0}")]
	Database(#[from] sqlx::Error),
}

impl<E: ErrorShape> From<E> for RouteError<E> {
	fn from(error: E) -> Self {
		Self::Route(error)
	}
}

/// Errors raised by extractors that are not tied to any route.
pub type AppError = RouteError<Infallible>;

fn bad_request(error: &impl std::fmt::Display) -> Response<Body> {
	(
		StatusCode::BAD_REQUEST,
		Json(Message::new(error.to_string()).into_vec()),
	)
		.into_response()
}

impl<E: ErrorShape> IntoResponse for RouteError<E> {
	fn into_response(self) -> Response<Body> {
		match self {
			Self::Route(error) => {
				if let Some(location) = error.location() {
					return (StatusCode::SEE_OTHER, [(header::LOCATION, location)]).into_response();
				}

				match error.status() {
					StatusCode::NOT_FOUND => render::not_found(error.errors()),
					status => (status, Json(error.errors())).into_response(),
				}
			}
			Self::Validation(errors) => (
				StatusCode::BAD_REQUEST,
				Json(
					errors
						.field_errors()
						.into_iter()
						.flat_map(|(field, errors)| {
							let field = field.to_string();

							errors.iter().map(move |error| {
								Message::new(error.to_string()).field(field.clone())
							})
						})
						.collect::<Vec<_>>(),
				),
			)
				.into_response(),
			// Path parameters only ever hold ids and slugs, so a value that does
			// not parse cannot name an existing resource.
			Self::Path(..) => render::not_found(Message::new("not_found").into_vec()),
			Self::Query(error) => bad_request(&error),
			Self::Form(error) => bad_request(&error),
			Self::MultipartRejection(error) => bad_request(&error),
			Self::Multipart(error) => bad_request(&error),
			Self::Io(error) => {
				tracing::error!(%error, "io error while handling request");

				StatusCode::INTERNAL_SERVER_ERROR.into_response()
			}
			Self::Database(error) => {
				tracing::error!(%error, "database error while handling request");

				StatusCode::INTERNAL_SERVER_ERROR.into_response()
			}
		}
	}
}

impl<E: ErrorShape> OperationOutput for RouteError<E> {
	type Inner = Self;
}
