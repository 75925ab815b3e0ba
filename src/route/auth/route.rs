use argon2::Argon2;
use axum::extract::State;
use chrono::Utc;
use macros::route;
use uuid::Uuid;

use crate::{
	extract::{FormData, Query, Session},
	form::{self, FormErrors},
	openapi::tag,
	render::View,
	session, AppState, Database,
};

use super::{model, Error, RouteError};

pub const KEY_LENGTH: usize = 32;

const INVALID_LOGIN: &str = "Please enter a correct username and password. Note that both fields may be case-sensitive.";
const USERNAME_TAKEN: &str = "A user with that username already exists.";

/// Hashes a password with Argon2, using the user's id as a salt.
/// Since this is only used for logging in and creating a new password,
/// the scope of this function can remain in here with no issues.
pub fn hash_password(
	hasher: &Argon2,
	password: &str,
	id: &Uuid,
) -> Result<[u8; KEY_LENGTH], argon2::Error> {
	let mut hash = [0; KEY_LENGTH];

	hasher.hash_password_into(password.as_bytes(), id.as_bytes(), &mut hash)?;
	Ok(hash)
}

/// Only local paths are followed after logging in.
fn safe_next(next: Option<&str>) -> &str {
	match next {
		Some(next) if next.starts_with('/') && !next.starts_with("//") && !next.contains('\\') => next,
		_ => "/",
	}
}

async fn open_session<'e, E>(executor: E, user_id: Uuid) -> Result<Uuid, sqlx::Error>
where
	E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
	let id = Uuid::new_v4();

	sqlx::query("INSERT INTO session (id, user_id, created_at) VALUES (?, ?, ?)")
		.bind(id)
		.bind(user_id)
		.bind(Utc::now())
		.execute(executor)
		.await?;

	Ok(id)
}

/// Signup form
/// Returns an empty signup form.
#[route(tag = tag::AUTH)]
pub async fn signup_form() -> View<model::SignupContext> {
	View::render(
		"users/signup.html",
		model::SignupContext {
			form: model::SignupValues::default(),
			errors: FormErrors::default(),
		},
	)
}

/// Sign up
/// Creates an account and logs in to it.
///
/// An invalid form, or a username that is already taken, is shown again with its errors.
#[route(tag = tag::AUTH, redirect = "Redirects to the index with a new session cookie.")]
pub async fn signup(
	State(state): State<AppState>,
	data: FormData,
) -> Result<View<model::SignupContext>, RouteError> {
	let form = model::SignupForm::bind(&data);
	let mut errors = form::validate(&form);

	if errors.is_empty() {
		let user_id = Uuid::new_v4();
		let hashed = hash_password(&state.hasher, &form.password1, &user_id).map_err(Error::Argon)?;

		let mut tx = state.database.begin().await?;

		let inserted = sqlx::query(
			r#"
				INSERT INTO "user" (id, username, email, first_name, last_name, password, created_at)
				VALUES (?, ?, ?, ?, ?, ?, ?)
			"#,
		)
		.bind(user_id)
		.bind(&form.username)
		.bind(&form.email)
		.bind(&form.first_name)
		.bind(&form.last_name)
		.bind(hashed.as_slice())
		.bind(Utc::now())
		.execute(&mut *tx)
		.await;

		match inserted {
			Ok(..) => {
				let session_id = open_session(&mut *tx, user_id).await?;

				tx.commit().await?;
				tracing::info!(username = %form.username, "user signed up");

				return Ok(View::redirect("/").with_cookie(session::create_cookie(session_id)));
			}
			Err(sqlx::Error::Database(ref error)) if error.is_unique_violation() => {
				errors.add("username", USERNAME_TAKEN);
			}
			Err(error) => return Err(error.into()),
		}
	}

	Ok(View::render(
		"users/signup.html",
		model::SignupContext {
			form: form.initial(),
			errors,
		},
	))
}

/// Login form
/// Returns an empty login form, remembering where to go afterwards.
#[route(tag = tag::AUTH)]
pub async fn login_form(
	Query(query): Query<model::LoginQuery>,
) -> Result<View<model::LoginContext>, RouteError> {
	Ok(View::render(
		"users/login.html",
		model::LoginContext {
			form: model::LoginValues {
				username: String::new(),
				next: query.next,
			},
			errors: FormErrors::default(),
		},
	))
}

/// Log in
/// Logs in to an account, setting a session cookie.
///
/// Wrong credentials show the form again with an error that does not tell
/// which of the two was wrong.
#[route(tag = tag::AUTH, redirect = "Redirects to `next` when it is a local path, or to the index.")]
pub async fn login(
	State(state): State<AppState>,
	data: FormData,
) -> Result<View<model::LoginContext>, RouteError> {
	let form = model::LoginForm::bind(&data);
	let mut errors = form::validate(&form);

	if errors.is_empty() {
		let user = sqlx::query_as::<_, model::User>(r#"SELECT * FROM "user" WHERE username = ?"#)
			.bind(&form.username)
			.fetch_optional(&state.database)
			.await?;

		if let Some(user) = user {
			let hashed = hash_password(&state.hasher, &form.password, &user.id).map_err(Error::Argon)?;

			if user.password == hashed {
				let session_id = open_session(&state.database, user.id).await?;

				return Ok(View::redirect(safe_next(form.next.as_deref()))
					.with_cookie(session::create_cookie(session_id)));
			}
		}

		errors.add(FormErrors::NON_FIELD, INVALID_LOGIN);
	}

	Ok(View::render(
		"users/login.html",
		model::LoginContext {
			form: model::LoginValues {
				username: form.username,
				next: form.next,
			},
			errors,
		},
	))
}

/// Log out
/// Logs out of the current session and clears the session cookie.
///
/// Logging out without a session is not an error.
#[route(tag = tag::AUTH)]
pub async fn logout(
	State(database): State<Database>,
	session: Option<Session>,
) -> Result<View, RouteError> {
	if let Some(session) = session {
		sqlx::query("DELETE FROM session WHERE id = ?")
			.bind(session.id)
			.execute(&database)
			.await?;
	}

	Ok(View::render("users/logged_out.html", ()).with_cookie(session::clear_cookie()))
}
