use aide::axum::{routing::get_with, ApiRouter};
use axum::http::StatusCode;

use crate::{error, AppState};

pub mod model;
pub mod route;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("unknown post {0}")]
	UnknownPost(i64),
}

pub type RouteError = error::RouteError<Error>;

/// Routes whose pages are served through the page cache.
pub fn cached_routes() -> ApiRouter<AppState> {
	use route::*;

	ApiRouter::new().api_route("/", get_with(index, index_docs))
}

pub fn routes() -> ApiRouter<AppState> {
	use route::*;

	ApiRouter::new()
		.api_route(
			"/create/",
			get_with(create_form, create_form_docs).post_with(create_post, create_post_docs),
		)
		.api_route("/posts/:post_id/", get_with(post_detail, post_detail_docs))
		.api_route(
			"/posts/:post_id/edit/",
			get_with(edit_form, edit_form_docs).post_with(edit_post, edit_post_docs),
		)
		.api_route(
			"/posts/:post_id/comment/",
			get_with(add_comment, add_comment_docs).post_with(add_comment, add_comment_docs),
		)
}

impl error::ErrorShape for Error {
	fn status(&self) -> StatusCode {
		match self {
			Self::UnknownPost(..) => StatusCode::NOT_FOUND,
		}
	}

	fn errors(&self) -> Vec<error::Message<'_>> {
		match self {
			Self::UnknownPost(post) => error::Message::new("unknown_post")
				.detail("post", *post)
				.into_vec(),
		}
	}
}

#[cfg(test)]
mod test {
	use axum_test::multipart::{MultipartForm, Part};

	use crate::test::*;

	fn gif(name: &str) -> Part {
		Part::bytes(SMALL_GIF.to_vec())
			.file_name(name)
			.mime_type("image/gif")
	}

	#[sqlx::test]
	async fn test_index_pages_are_newest_first(pool: Database) {
		let app = TestApp::new(pool);
		let leo = app.user("leo").await;
		let kit = app.user("kit").await;
		let group = app.group("Cats", "cats").await;

		let mut ids = Vec::new();

		for i in 0..12 {
			ids.push(app.post(&leo, &format!("Post {i}"), Some(&group)).await);
		}

		ids.push(app.post(&kit, "Post 13", None).await);
		ids.reverse();

		let first = app.guest.get("/").await;

		assert_eq!(first.status_code(), StatusCode::OK);

		let first = first.json::<Value>();
		let second = app.guest.get("/?page=2").await.json::<Value>();

		assert_eq!(first["template"], "posts/index.html");
		assert_eq!(first["context"]["index"], true);
		assert_eq!(first["context"]["page_obj"]["has_next"], true);
		assert_eq!(second["context"]["page_obj"]["has_previous"], true);
		assert_eq!(page_ids(&first), ids[..10]);
		assert_eq!(page_ids(&second), ids[10..]);
	}

	#[sqlx::test]
	async fn test_index_page_is_cached(pool: Database) {
		let app = TestApp::new(pool);
		let leo = app.user("leo").await;
		let post = app.post(&leo, "Cached", None).await;

		let cached = app.guest.get("/").await.text();

		app.delete_post(post).await;

		assert_eq!(app.guest.get("/").await.text(), cached);

		app.state.cache.clear();

		assert_ne!(app.guest.get("/").await.text(), cached);
	}

	#[sqlx::test]
	async fn test_post_detail(pool: Database) {
		let app = TestApp::new(pool);
		let leo = app.user("leo").await;
		let kit = app.user("kit").await;
		let post = app.post(&leo, "Hello", None).await;

		app.comment(post, &kit, "First").await;
		app.comment(post, &leo, "Second").await;

		let response = app.guest.get(&format!("/posts/{post}/")).await;

		assert_eq!(response.status_code(), StatusCode::OK);

		let page = response.json::<Value>();
		let context = &page["context"];

		assert_eq!(page["template"], "posts/post_detail.html");
		assert_eq!(context["post"]["id"], post);
		assert_eq!(context["post"]["author"], "leo");
		assert_eq!(context["author_posts"], 1);
		assert_eq!(context["comments"][0]["text"], "Second");
		assert_eq!(context["comments"][1]["text"], "First");
		assert_eq!(context["comments"][1]["author"], "kit");
	}

	#[sqlx::test]
	async fn test_unknown_post_is_not_found(pool: Database) {
		let app = TestApp::new(pool);

		for path in ["/posts/404/", "/posts/not-a-number/", "/unexisting_page/"] {
			let response = app.guest.get(path).await;

			assert_eq!(response.status_code(), StatusCode::NOT_FOUND, "{path}");
			assert_eq!(response.json::<Value>()["template"], "core/404.html", "{path}");
		}
	}

	#[sqlx::test]
	async fn test_guest_is_sent_to_login(pool: Database) {
		let app = TestApp::new(pool);
		let leo = app.user("leo").await;
		let post = app.post(&leo, "Hello", None).await;

		for path in [
			"/create/".to_string(),
			format!("/posts/{post}/edit/"),
			format!("/posts/{post}/comment/"),
		] {
			let response = app.guest.get(&path).await;

			assert_eq!(response.status_code(), StatusCode::SEE_OTHER, "{path}");
			assert_eq!(
				response.header("location"),
				format!("/auth/login/?next={path}").as_str()
			);
		}
	}

	#[sqlx::test]
	async fn test_guest_cannot_create_post(pool: Database) {
		let app = TestApp::new(pool);

		let response = app
			.guest
			.post("/create/")
			.form(&[("text", "Guest post")])
			.await;

		assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
		assert_eq!(response.header("location"), "/auth/login/?next=/create/");
		assert_eq!(app.count("post").await, 0);
	}

	#[sqlx::test]
	async fn test_create_form(pool: Database) {
		let app = TestApp::new(pool);
		let leo = app.user("leo").await;
		app.group("Cats", "cats").await;
		let client = app.client(&leo).await;

		let page = client.get("/create/").await.json::<Value>();

		assert_eq!(page["template"], "posts/create_post.html");
		assert_eq!(page["context"]["is_edit"], false);
		assert_eq!(page["context"]["form"]["text"], "");
		assert_eq!(page["context"]["groups"][0]["slug"], "cats");
	}

	#[sqlx::test]
	async fn test_create_post_with_image(pool: Database) {
		let app = TestApp::new(pool);
		let leo = app.user("leo").await;
		let group = app.group("Cats", "cats").await;
		let client = app.client(&leo).await;

		let response = client
			.post("/create/")
			.multipart(
				MultipartForm::new()
					.add_text("text", "A new post")
					.add_text("group", group.id.to_string())
					.add_part("image", gif("small.gif")),
			)
			.await;

		assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
		assert_eq!(response.header("location"), "/profile/leo/");

		let post = app.latest_post().await;

		assert_eq!(post.text, "A new post");
		assert_eq!(post.author_id, leo.id);
		assert_eq!(post.group_id, Some(group.id));
		assert_eq!(post.image.as_deref(), Some("posts/small.gif"));
		assert!(app.state.media.root().join("posts/small.gif").exists());
	}

	#[sqlx::test]
	async fn test_failed_insert_leaves_no_upload(pool: Database) {
		let app = TestApp::new(pool);
		let leo = app.user("leo").await;
		let client = app.client(&leo).await;

		sqlx::query(
			"CREATE TRIGGER reject_post BEFORE INSERT ON post BEGIN SELECT RAISE(ABORT, 'rejected'); END",
		)
		.execute(&app.state.database)
		.await
		.unwrap();

		let response = client
			.post("/create/")
			.multipart(
				MultipartForm::new()
					.add_text("text", "Never stored")
					.add_part("image", gif("small.gif")),
			)
			.await;

		assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
		assert_eq!(app.count("post").await, 0);
		assert!(!app.state.media.root().join("posts/small.gif").exists());
	}

	#[sqlx::test]
	async fn test_create_post_without_group(pool: Database) {
		let app = TestApp::new(pool);
		let leo = app.user("leo").await;
		let client = app.client(&leo).await;

		let response = client
			.post("/create/")
			.form(&[("text", "Plain"), ("group", "")])
			.await;

		assert_eq!(response.status_code(), StatusCode::SEE_OTHER);

		let post = app.latest_post().await;

		assert_eq!(post.group_id, None);
		assert_eq!(post.image, None);
	}

	#[sqlx::test]
	async fn test_invalid_post_form_is_shown_again(pool: Database) {
		let app = TestApp::new(pool);
		let leo = app.user("leo").await;
		let client = app.client(&leo).await;

		let response = client
			.post("/create/")
			.multipart(
				MultipartForm::new()
					.add_text("text", "   ")
					.add_text("group", "999")
					.add_part(
						"image",
						Part::text("not an image").file_name("notes.gif"),
					),
			)
			.await;

		assert_eq!(response.status_code(), StatusCode::OK);

		let page = response.json::<Value>();
		let errors = &page["context"]["errors"];

		assert_eq!(page["template"], "posts/create_post.html");
		assert_eq!(errors["text"][0], "This field is required.");
		assert!(errors["group"][0].as_str().unwrap().starts_with("Select a valid choice"));
		assert!(errors["image"][0].as_str().unwrap().starts_with("Upload a valid image"));
		assert_eq!(app.count("post").await, 0);
	}

	#[sqlx::test]
	async fn test_author_edits_post(pool: Database) {
		let app = TestApp::new(pool);
		let leo = app.user("leo").await;
		let group = app.group("Cats", "cats").await;
		let post = app.post(&leo, "Original", Some(&group)).await;
		let client = app.client(&leo).await;

		let form = client.get(&format!("/posts/{post}/edit/")).await.json::<Value>();

		assert_eq!(form["context"]["is_edit"], true);
		assert_eq!(form["context"]["form"]["text"], "Original");
		assert_eq!(form["context"]["form"]["group"], group.id.to_string());

		let response = client
			.post(&format!("/posts/{post}/edit/"))
			.multipart(
				MultipartForm::new()
					.add_text("text", "Edited")
					.add_part("image", gif("new_small.gif")),
			)
			.await;

		assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
		assert_eq!(response.header("location"), format!("/posts/{post}/").as_str());
		assert_eq!(app.count("post").await, 1);

		let edited = app.latest_post().await;

		assert_eq!(edited.text, "Edited");
		assert_eq!(edited.group_id, None);
		assert_eq!(edited.image.as_deref(), Some("posts/new_small.gif"));
	}

	#[sqlx::test]
	async fn test_edit_keeps_or_clears_image(pool: Database) {
		let app = TestApp::new(pool);
		let leo = app.user("leo").await;
		let client = app.client(&leo).await;

		client
			.post("/create/")
			.multipart(
				MultipartForm::new()
					.add_text("text", "With image")
					.add_part("image", gif("small.gif")),
			)
			.await;

		let post = app.latest_post().await;

		client
			.post(&format!("/posts/{}/edit/", post.id))
			.form(&[("text", "Still with image")])
			.await;

		assert_eq!(app.latest_post().await.image.as_deref(), Some("posts/small.gif"));

		client
			.post(&format!("/posts/{}/edit/", post.id))
			.form(&[("text", "Without image"), ("image-clear", "on")])
			.await;

		assert_eq!(app.latest_post().await.image, None);
	}

	#[sqlx::test]
	async fn test_upload_and_clear_together_is_rejected(pool: Database) {
		let app = TestApp::new(pool);
		let leo = app.user("leo").await;
		let post = app.post(&leo, "Original", None).await;
		let client = app.client(&leo).await;

		let response = client
			.post(&format!("/posts/{post}/edit/"))
			.multipart(
				MultipartForm::new()
					.add_text("text", "Edited")
					.add_text("image-clear", "on")
					.add_part("image", gif("small.gif")),
			)
			.await;

		assert_eq!(response.status_code(), StatusCode::OK);

		let page = response.json::<Value>();

		assert_eq!(
			page["context"]["errors"]["image"][0],
			"Please either submit a file or check the clear checkbox, not both."
		);

		let unchanged = app.latest_post().await;

		assert_eq!(unchanged.text, "Original");
		assert_eq!(unchanged.image, None);
		assert!(!app.state.media.root().join("posts/small.gif").exists());
	}

	#[sqlx::test]
	async fn test_non_author_is_sent_to_post(pool: Database) {
		let app = TestApp::new(pool);
		let leo = app.user("leo").await;
		let kit = app.user("kit").await;
		let post = app.post(&leo, "Original", None).await;
		let client = app.client(&kit).await;
		let detail = format!("/posts/{post}/");

		let response = client.get(&format!("/posts/{post}/edit/")).await;

		assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
		assert_eq!(response.header("location"), detail.as_str());

		let response = client
			.post(&format!("/posts/{post}/edit/"))
			.form(&[("text", "Hijacked")])
			.await;

		assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
		assert_eq!(response.header("location"), detail.as_str());
		assert_eq!(app.latest_post().await.text, "Original");
	}

	#[sqlx::test]
	async fn test_add_comment(pool: Database) {
		let app = TestApp::new(pool);
		let leo = app.user("leo").await;
		let kit = app.user("kit").await;
		let post = app.post(&leo, "Hello", None).await;
		let client = app.client(&kit).await;
		let path = format!("/posts/{post}/comment/");

		let response = client.post(&path).form(&[("text", "Nice post")]).await;

		assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
		assert_eq!(response.header("location"), format!("/posts/{post}/").as_str());

		let response = client.post(&path).form(&[("text", "  ")]).await;

		assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
		assert_eq!(app.count("comment").await, 1);

		let page = app.guest.get(&format!("/posts/{post}/")).await.json::<Value>();

		assert_eq!(page["context"]["comments"][0]["text"], "Nice post");
		assert_eq!(page["context"]["comments"][0]["author"], "kit");
	}

	#[sqlx::test]
	async fn test_guest_cannot_comment(pool: Database) {
		let app = TestApp::new(pool);
		let leo = app.user("leo").await;
		let post = app.post(&leo, "Hello", None).await;

		let response = app
			.guest
			.post(&format!("/posts/{post}/comment/"))
			.form(&[("text", "Anonymous")])
			.await;

		assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
		assert_eq!(
			response.header("location"),
			format!("/auth/login/?next=/posts/{post}/comment/").as_str()
		);
		assert_eq!(app.count("comment").await, 0);
	}

	#[sqlx::test]
	async fn test_comment_on_unknown_post(pool: Database) {
		let app = TestApp::new(pool);
		let leo = app.user("leo").await;
		let client = app.client(&leo).await;

		let response = client
			.post("/posts/404/comment/")
			.form(&[("text", "Hello?")])
			.await;

		assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
	}

	#[sqlx::test]
	async fn test_deleting_group_keeps_posts(pool: Database) {
		let app = TestApp::new(pool);
		let leo = app.user("leo").await;
		let group = app.group("Cats", "cats").await;
		let post = app.post(&leo, "Meow", Some(&group)).await;

		sqlx::query(r#"DELETE FROM "group" WHERE id = ?"#)
			.bind(group.id)
			.execute(&app.state.database)
			.await
			.unwrap();

		let page = app.guest.get(&format!("/posts/{post}/")).await.json::<Value>();

		assert_eq!(page["context"]["post"]["group_id"], Value::Null);
	}

	#[sqlx::test]
	async fn test_deleting_author_removes_posts_and_comments(pool: Database) {
		let app = TestApp::new(pool);
		let leo = app.user("leo").await;
		let kit = app.user("kit").await;
		let post = app.post(&leo, "Hello", None).await;
		let kept = app.post(&kit, "Mine", None).await;

		app.comment(post, &kit, "On leo's post").await;
		app.comment(kept, &leo, "On kit's post").await;

		sqlx::query(r#"DELETE FROM "user" WHERE id = ?"#)
			.bind(leo.id)
			.execute(&app.state.database)
			.await
			.unwrap();

		assert_eq!(app.count("post").await, 1);
		assert_eq!(app.count("comment").await, 0);
	}
}
