use aide::OperationOutput;
use axum::{
	body::Body,
	http::{header, HeaderValue, Response, StatusCode},
	response::IntoResponse,
	Json,
};
use schemars::JsonSchema;
use serde::Serialize;

use crate::error::Message;

pub const NOT_FOUND_TEMPLATE: &str = "core/404.html";

/// A rendered page: the template that displays it and its full context.
#[derive(Debug, Serialize, JsonSchema)]
pub struct Page<C> {
	pub template: &'static str,
	pub context: C,
}

#[derive(Debug)]
enum Outcome<C> {
	Page(Page<C>),
	Redirect(String),
}

/// The outcome of a page handler: a page or a redirect, plus any cookies to set.
///
/// Redirects use `303 See Other` so a submitted form is followed by a `GET`.
#[derive(Debug)]
pub struct View<C = ()> {
	body: Outcome<C>,
	cookies: Vec<cookie::Cookie<'static>>,
}

impl<C> View<C> {
	pub fn render(template: &'static str, context: C) -> Self {
		Self {
			body: Outcome::Page(Page { template, context }),
			cookies: Vec::new(),
		}
	}

	pub fn redirect(location: impl Into<String>) -> Self {
		Self {
			body: Outcome::Redirect(location.into()),
			cookies: Vec::new(),
		}
	}

	pub fn with_cookie(mut self, cookie: cookie::Cookie<'static>) -> Self {
		self.cookies.push(cookie);
		self
	}
}

impl<C: Serialize> IntoResponse for View<C> {
	fn into_response(self) -> Response<Body> {
		let mut response = match self.body {
			Outcome::Page(page) => Json(page).into_response(),
			Outcome::Redirect(location) => {
				(StatusCode::SEE_OTHER, [(header::LOCATION, location)]).into_response()
			}
		};

		for cookie in self.cookies {
			if let Ok(value) = HeaderValue::from_str(&cookie.to_string()) {
				response.headers_mut().append(header::SET_COOKIE, value);
			}
		}

		response
	}
}

impl<C: JsonSchema + Serialize> OperationOutput for View<C> {
	type Inner = Page<C>;

	fn operation_response(
		ctx: &mut aide::gen::GenContext,
		operation: &mut aide::openapi::Operation,
	) -> Option<aide::openapi::Response> {
		axum_jsonschema::Json::<Page<C>>::operation_response(ctx, operation)
	}

	fn inferred_responses(
		ctx: &mut aide::gen::GenContext,
		operation: &mut aide::openapi::Operation,
	) -> Vec<(Option<u16>, aide::openapi::Response)> {
		axum_jsonschema::Json::<Page<C>>::inferred_responses(ctx, operation)
	}
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct NotFoundContext<'a> {
	/// What could not be found.
	pub errors: Vec<Message<'a>>,
}

/// The `404` page, shared by unknown routes and unknown resources.
pub fn not_found(errors: Vec<Message<'_>>) -> Response<Body> {
	(
		StatusCode::NOT_FOUND,
		View::render(NOT_FOUND_TEMPLATE, NotFoundContext { errors }),
	)
		.into_response()
}

#[cfg(test)]
mod test {
	use axum::{http::StatusCode, response::IntoResponse};

	use super::View;
	use crate::session;

	#[test]
	fn test_redirect_sets_location_and_cookies() {
		let response = View::<()>::redirect("/profile/leo/")
			.with_cookie(session::clear_cookie())
			.into_response();

		assert_eq!(response.status(), StatusCode::SEE_OTHER);
		assert_eq!(response.headers()["location"], "/profile/leo/");
		assert!(response.headers()["set-cookie"]
			.to_str()
			.unwrap()
			.starts_with("session="));
	}

	#[test]
	fn test_render_is_ok() {
		let response = View::render("posts/index.html", ()).into_response();

		assert_eq!(response.status(), StatusCode::OK);
	}
}
