use aide::OperationInput;
use axum::{
	extract::{FromRef, FromRequestParts, OriginalUri},
	http::{header, request},
};
use uuid::Uuid;

use crate::{
	error::RouteError,
	openapi::SECURITY_SCHEME_SESSION,
	route::auth::{self, model::User},
	session, Database,
};

/// Looks up the user owning the session cookie of the request, if any.
async fn lookup(
	parts: &request::Parts,
	database: &Database,
) -> Result<Option<(Uuid, User)>, sqlx::Error> {
	let cookies = parts
		.headers
		.get_all(header::COOKIE)
		.into_iter()
		.filter_map(|value| value.to_str().ok());

	let Some(session_id) = session::find_session_id(cookies) else {
		return Ok(None);
	};

	let user = sqlx::query_as::<_, User>(
		r#"
			SELECT * FROM "user" WHERE id = (
				SELECT user_id FROM session WHERE id = ?
			)
		"#,
	)
	.bind(session_id)
	.fetch_optional(database)
	.await?;

	Ok(user.map(|user| (session_id, user)))
}

/// Extracts the session and related user from the request.
///
/// Requests without a valid session are redirected to the login page,
/// which sends the user back to the requested path afterwards.
///
/// ```rust
/// async fn route(session: Session) {
///   println!("{:?}", session.user);
/// }
/// ```
#[derive(Debug)]
pub struct Session {
	pub id: Uuid,
	pub user: User,
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for Session
where
	Database: FromRef<S>,
	S: Sync + Send,
{
	type Rejection = RouteError<auth::Error>;

	async fn from_request_parts(
		parts: &mut request::Parts,
		state: &S,
	) -> Result<Self, Self::Rejection> {
		let database = Database::from_ref(state);

		if let Some((id, user)) = lookup(parts, &database).await? {
			return Ok(Session { id, user });
		}

		// Nested routers see a stripped uri, so prefer the original one.
		let path = parts
			.extensions
			.get::<OriginalUri>()
			.map_or_else(|| parts.uri.path(), |uri| uri.0.path())
			.to_string();

		Err(auth::Error::LoginRequired(path).into())
	}
}

impl OperationInput for Session {
	/// Adds a session cookie requirement to the `OpenAPI` operation.
	fn operation_input(_ctx: &mut aide::gen::GenContext, operation: &mut aide::openapi::Operation) {
		operation.security.push(
			[(SECURITY_SCHEME_SESSION.to_string(), Vec::new())]
				.into_iter()
				.collect(),
		);
	}
}

/// The user viewing a page, when logged in.
///
/// Unlike [`Session`], a missing or stale session is not an error.
#[derive(Debug)]
pub struct Viewer(pub Option<User>);

#[axum::async_trait]
impl<S> FromRequestParts<S> for Viewer
where
	Database: FromRef<S>,
	S: Sync + Send,
{
	type Rejection = RouteError<auth::Error>;

	async fn from_request_parts(
		parts: &mut request::Parts,
		state: &S,
	) -> Result<Self, Self::Rejection> {
		let database = Database::from_ref(state);

		Ok(Self(lookup(parts, &database).await?.map(|(_, user)| user)))
	}
}

impl OperationInput for Viewer {}
