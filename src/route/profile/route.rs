use axum::extract::State;
use macros::route;
use uuid::Uuid;

use crate::{
	extract::{Path, Query, Session, Viewer},
	openapi::tag,
	query::PostQuery,
	render::View,
	Database,
};

use super::{model, Error, RouteError};

pub fn profile_url(username: &str) -> String {
	format!("/profile/{username}/")
}

async fn find_author(database: &Database, username: &str) -> Result<model::User, RouteError> {
	Ok(
		sqlx::query_as::<_, model::User>(r#"SELECT * FROM "user" WHERE username = ?"#)
			.bind(username)
			.fetch_optional(database)
			.await?
			.ok_or_else(|| Error::UnknownUser(username.to_string()))?,
	)
}

async fn is_following(
	database: &Database,
	user_id: Uuid,
	author_id: Uuid,
) -> Result<bool, sqlx::Error> {
	sqlx::query_scalar::<_, bool>(
		"SELECT EXISTS (SELECT 1 FROM follow WHERE user_id = ? AND author_id = ?)",
	)
	.bind(user_id)
	.bind(author_id)
	.fetch_one(database)
	.await
}

/// Get profile
/// Returns an author and a page of their posts, newest first.
///
/// For a logged in user, `following` tells whether they follow the author.
#[route(tag = tag::PROFILE)]
pub async fn profile(
	State(database): State<Database>,
	Viewer(viewer): Viewer,
	Path(path): Path<model::ProfilePath>,
	Query(input): Query<model::PageInput>,
) -> Result<View<model::ProfileContext>, RouteError> {
	let author = find_author(&database, &path.username).await?;
	let page_obj = PostQuery::author(author.id)
		.paginate(&database, input.requested())
		.await?;

	let following = match viewer {
		Some(viewer) => is_following(&database, viewer.id, author.id).await?,
		None => false,
	};

	Ok(View::render(
		"posts/profile.html",
		model::ProfileContext {
			posts_count: page_obj.count,
			author,
			page_obj,
			following,
		},
	))
}

/// Follow feed
/// Returns a page of posts written by the authors the logged in user follows, newest first.
#[route(tag = tag::PROFILE, login_required)]
pub async fn follow_index(
	State(database): State<Database>,
	session: Session,
	Query(input): Query<model::PageInput>,
) -> Result<View<model::FollowContext>, RouteError> {
	let page_obj = PostQuery::followed_by(session.user.id)
		.paginate(&database, input.requested())
		.await?;

	Ok(View::render(
		"posts/follow.html",
		model::FollowContext {
			page_obj,
			follow: true,
		},
	))
}

/// Follow author
/// Makes the logged in user follow an author.
///
/// Following yourself or an author you already follow changes nothing.
#[route(tag = tag::PROFILE, login_required, redirect = "Redirects to the author's profile.")]
pub async fn profile_follow(
	State(database): State<Database>,
	session: Session,
	Path(path): Path<model::ProfilePath>,
) -> Result<View, RouteError> {
	let author = find_author(&database, &path.username).await?;

	if author.id == session.user.id || is_following(&database, session.user.id, author.id).await? {
		return Ok(View::redirect(profile_url(&author.username)));
	}

	let result = sqlx::query("INSERT INTO follow (user_id, author_id) VALUES (?, ?)")
		.bind(session.user.id)
		.bind(author.id)
		.execute(&database)
		.await;

	match result {
		Ok(..) => {
			tracing::info!(user = %session.user.username, author = %author.username, "followed author");
		}
		// A concurrent request followed the author first.
		Err(sqlx::Error::Database(ref error)) if error.is_unique_violation() => {}
		Err(error) => return Err(error.into()),
	}

	Ok(View::redirect(profile_url(&author.username)))
}

/// Unfollow author
/// Makes the logged in user stop following an author.
#[route(tag = tag::PROFILE, login_required, redirect = "Redirects to the author's profile.")]
pub async fn profile_unfollow(
	State(database): State<Database>,
	session: Session,
	Path(path): Path<model::ProfilePath>,
) -> Result<View, RouteError> {
	let author = find_author(&database, &path.username).await?;

	sqlx::query("DELETE FROM follow WHERE user_id = ? AND author_id = ?")
		.bind(session.user.id)
		.bind(author.id)
		.execute(&database)
		.await?;

	Ok(View::redirect(profile_url(&author.username)))
}
