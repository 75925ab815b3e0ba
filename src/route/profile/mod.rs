use aide::axum::{routing::get_with, ApiRouter};
use axum::http::StatusCode;

use crate::{error, AppState};

pub mod model;
pub mod route;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("unknown user {0}")]
	UnknownUser(String),
}

pub type RouteError = error::RouteError<Error>;

/// Routes whose pages are served through the page cache.
pub fn cached_routes() -> ApiRouter<AppState> {
	use route::*;

	ApiRouter::new().api_route("/follow/", get_with(follow_index, follow_index_docs))
}

pub fn routes() -> ApiRouter<AppState> {
	use route::*;

	ApiRouter::new()
		.api_route("/profile/:username/", get_with(profile, profile_docs))
		.api_route(
			"/profile/:username/follow/",
			get_with(profile_follow, profile_follow_docs)
				.post_with(profile_follow, profile_follow_docs),
		)
		.api_route(
			"/profile/:username/unfollow/",
			get_with(profile_unfollow, profile_unfollow_docs)
				.post_with(profile_unfollow, profile_unfollow_docs),
		)
}

impl error::ErrorShape for Error {
	fn status(&self) -> StatusCode {
		match self {
			Self::UnknownUser(..) => StatusCode::NOT_FOUND,
		}
	}

	fn errors(&self) -> Vec<error::Message<'_>> {
		match self {
			Self::UnknownUser(username) => error::Message::new("unknown_user")
				.detail("username", username.as_str())
				.into_vec(),
		}
	}
}

#[cfg(test)]
mod test {
	use crate::test::*;

	#[sqlx::test]
	async fn test_profile_lists_author_posts(pool: Database) {
		let app = TestApp::new(pool);
		let leo = app.user("leo").await;
		let kit = app.user("kit").await;

		let first = app.post(&leo, "First", None).await;
		let second = app.post(&leo, "Second", None).await;
		app.post(&kit, "Not leo's", None).await;

		let response = app.guest.get("/profile/leo/").await;

		assert_eq!(response.status_code(), StatusCode::OK);

		let page = response.json::<Value>();
		let context = &page["context"];

		assert_eq!(page["template"], "posts/profile.html");
		assert_eq!(context["author"]["username"], "leo");
		assert_eq!(context["author"].get("password"), None);
		assert_eq!(context["author"].get("email"), None);
		assert_eq!(context["posts_count"], 2);
		assert_eq!(context["following"], false);
		assert_eq!(page_ids(&page), vec![second, first]);
	}

	#[sqlx::test]
	async fn test_unknown_profile_is_not_found(pool: Database) {
		let app = TestApp::new(pool);
		let leo = app.user("leo").await;
		let client = app.client(&leo).await;

		for path in ["/profile/nobody/", "/profile/nobody/follow/", "/profile/nobody/unfollow/"] {
			assert_eq!(
				client.get(path).await.status_code(),
				StatusCode::NOT_FOUND,
				"{path}"
			);
		}
	}

	#[sqlx::test]
	async fn test_follow_and_unfollow(pool: Database) {
		let app = TestApp::new(pool);
		app.user("leo").await;
		let kit = app.user("kit").await;
		let client = app.client(&kit).await;

		let response = client.get("/profile/leo/follow/").await;

		assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
		assert_eq!(response.header("location"), "/profile/leo/");
		assert_eq!(app.count("follow").await, 1);

		let page = client.get("/profile/leo/").await.json::<Value>();

		assert_eq!(page["context"]["following"], true);

		let response = client.post("/profile/leo/unfollow/").await;

		assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
		assert_eq!(response.header("location"), "/profile/leo/");
		assert_eq!(app.count("follow").await, 0);

		// Unfollowing an author that is not followed is harmless.
		let response = client.get("/profile/leo/unfollow/").await;

		assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
		assert_eq!(app.count("follow").await, 0);
	}

	#[sqlx::test]
	async fn test_follow_is_idempotent(pool: Database) {
		let app = TestApp::new(pool);
		app.user("leo").await;
		let kit = app.user("kit").await;
		let client = app.client(&kit).await;

		for _ in 0..3 {
			client.get("/profile/leo/follow/").await;
		}

		client.post("/profile/leo/follow/").await;

		assert_eq!(app.count("follow").await, 1);
	}

	#[sqlx::test]
	async fn test_cannot_follow_self(pool: Database) {
		let app = TestApp::new(pool);
		let leo = app.user("leo").await;
		let client = app.client(&leo).await;

		let response = client.get("/profile/leo/follow/").await;

		assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
		assert_eq!(response.header("location"), "/profile/leo/");
		assert_eq!(app.count("follow").await, 0);
	}

	#[sqlx::test]
	async fn test_guest_cannot_follow(pool: Database) {
		let app = TestApp::new(pool);
		app.user("leo").await;

		for path in ["/follow/", "/profile/leo/follow/", "/profile/leo/unfollow/"] {
			let response = app.guest.get(path).await;

			assert_eq!(response.status_code(), StatusCode::SEE_OTHER, "{path}");
			assert_eq!(
				response.header("location"),
				format!("/auth/login/?next={path}").as_str()
			);
		}

		assert_eq!(app.count("follow").await, 0);
	}

	#[sqlx::test]
	async fn test_guest_returns_to_author_with_plus_in_name(pool: Database) {
		let app = TestApp::new(pool);
		app.user("a+b").await;
		app.user("reader").await;

		let response = app.guest.get("/profile/a+b/follow/").await;

		assert_eq!(response.status_code(), StatusCode::SEE_OTHER);

		let login = response.header("location").to_str().unwrap().to_string();

		assert_eq!(login, "/auth/login/?next=/profile/a%2Bb/follow/");

		let page = app.guest.get(&login).await.json::<Value>();

		assert_eq!(page["context"]["form"]["next"], "/profile/a+b/follow/");

		let response = app
			.guest
			.post("/auth/login/")
			.form(&[
				("username", "reader"),
				("password", PASSWORD),
				("next", "/profile/a+b/follow/"),
			])
			.await;

		assert_eq!(response.header("location"), "/profile/a+b/follow/");

		let cookie = response.header("set-cookie").to_str().unwrap().to_string();
		let response = app
			.guest
			.get("/profile/a+b/follow/")
			.add_header(
				axum::http::header::COOKIE,
				axum::http::HeaderValue::from_str(cookie.split(';').next().unwrap()).unwrap(),
			)
			.await;

		assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
		assert_eq!(response.header("location"), "/profile/a+b/");
		assert_eq!(app.count("follow").await, 1);
	}

	#[sqlx::test]
	async fn test_feed_shows_followed_authors_only(pool: Database) {
		let app = TestApp::new(pool);
		let leo = app.user("leo").await;
		let kit = app.user("kit").await;
		let reader = app.user("reader").await;
		let lonely = app.user("lonely").await;

		let mut ids = Vec::new();

		for i in 0..12 {
			ids.push(app.post(&leo, &format!("Post {i}"), None).await);
		}

		app.post(&kit, "Unfollowed author", None).await;
		app.follow(&reader, &leo).await;
		ids.reverse();

		let client = app.client(&reader).await;
		let first = client.get("/follow/").await;

		assert_eq!(first.status_code(), StatusCode::OK);

		let first = first.json::<Value>();
		let second = client.get("/follow/?page=2").await.json::<Value>();

		assert_eq!(first["template"], "posts/follow.html");
		assert_eq!(first["context"]["follow"], true);
		assert_eq!(page_ids(&first), ids[..10]);
		assert_eq!(page_ids(&second), ids[10..]);

		let empty = app.client(&lonely).await.get("/follow/").await.json::<Value>();

		assert!(page_ids(&empty).is_empty());
		assert_eq!(empty["context"]["page_obj"]["num_pages"], 1);
	}

	#[sqlx::test]
	async fn test_feed_is_cached(pool: Database) {
		let app = TestApp::new(pool);
		let leo = app.user("leo").await;
		let reader = app.user("reader").await;
		app.follow(&reader, &leo).await;

		let client = app.client(&reader).await;
		let before = client.get("/follow/").await.text();

		app.post(&leo, "Fresh", None).await;

		assert_eq!(client.get("/follow/").await.text(), before);

		app.state.cache.clear();

		let after = client.get("/follow/").await.json::<Value>();

		assert_eq!(page_ids(&after).len(), 1);
	}
}
