use axum::extract::State;
use chrono::Utc;
use macros::route;
use validator::Validate;

use crate::{
	extract::{FormData, Path, Query, Session},
	media,
	openapi::tag,
	query::PostQuery,
	render::View,
	AppState, Database,
};

use super::{model, Error, RouteError};

const FORM_TEMPLATE: &str = "posts/create_post.html";

pub fn detail_url(post_id: i64) -> String {
	format!("/posts/{post_id}/")
}

async fn groups(database: &Database) -> Result<Vec<model::Group>, sqlx::Error> {
	sqlx::query_as::<_, model::Group>(r#"SELECT * FROM "group" ORDER BY title"#)
		.fetch_all(database)
		.await
}

async fn find_post(database: &Database, post_id: i64) -> Result<model::Post, RouteError> {
	Ok(PostQuery::id(post_id)
		.first(database)
		.await?
		.ok_or(Error::UnknownPost(post_id))?)
}

/// Index
/// Returns a page of all posts, newest first.
#[route(tag = tag::POST)]
pub async fn index(
	State(database): State<Database>,
	Query(input): Query<model::PageInput>,
) -> Result<View<model::IndexContext>, RouteError> {
	let page_obj = PostQuery::all()
		.paginate(&database, input.requested())
		.await?;

	Ok(View::render(
		"posts/index.html",
		model::IndexContext {
			page_obj,
			index: true,
		},
	))
}

/// Get single post
/// Returns a post with its comments, newest first, and an empty comment form.
#[route(tag = tag::POST)]
pub async fn post_detail(
	State(database): State<Database>,
	Path(path): Path<model::PostPath>,
) -> Result<View<model::DetailContext>, RouteError> {
	let post = find_post(&database, path.post_id).await?;

	let comments = sqlx::query_as::<_, model::Comment>(
		r#"
			SELECT comment.*, "user".username AS author
			FROM comment
			JOIN "user" ON "user".id = comment.author_id
			WHERE comment.post_id = ?
			ORDER BY comment.created_at DESC, comment.id DESC
		"#,
	)
	.bind(post.id)
	.fetch_all(&database)
	.await?;

	let author_posts = PostQuery::author(post.author_id).count(&database).await?;

	Ok(View::render(
		"posts/post_detail.html",
		model::DetailContext {
			post,
			comments,
			form: model::CommentForm::default(),
			author_posts,
		},
	))
}

/// Post form
/// Returns an empty form for writing a new post.
#[route(tag = tag::POST, login_required)]
pub async fn create_form(
	State(database): State<Database>,
	_session: Session,
) -> Result<View<model::PostFormContext>, RouteError> {
	Ok(View::render(
		FORM_TEMPLATE,
		model::PostFormContext {
			form: model::PostFormValues::default(),
			errors: Default::default(),
			groups: groups(&database).await?,
			is_edit: false,
			post_id: None,
		},
	))
}

/// Create post
/// Creates a post written by the logged in user.
///
/// An invalid form is shown again with its errors.
#[route(tag = tag::POST, login_required, redirect = "Redirects to the author's profile once the post is created.")]
pub async fn create_post(
	State(state): State<AppState>,
	session: Session,
	data: FormData,
) -> Result<View<model::PostFormContext>, RouteError> {
	let form = model::PostForm::bind(data);
	let (group, errors) = form.clean(&state.database).await?;

	if !errors.is_empty() {
		return Ok(View::render(
			FORM_TEMPLATE,
			model::PostFormContext {
				form: form.initial(None),
				errors,
				groups: groups(&state.database).await?,
				is_edit: false,
				post_id: None,
			},
		));
	}

	let image = match &form.image {
		Some(file) => Some(state.media.save(media::POST_IMAGES, file).await?),
		None => None,
	};

	let inserted = sqlx::query_scalar::<_, i64>(
		r#"
			INSERT INTO post (text, created_at, author_id, group_id, image)
			VALUES (?, ?, ?, ?, ?)
			RETURNING id
		"#,
	)
	.bind(&form.text)
	.bind(Utc::now())
	.bind(session.user.id)
	.bind(group)
	.bind(&image)
	.fetch_one(&state.database)
	.await;

	let post_id = match inserted {
		Ok(post_id) => post_id,
		Err(error) => {
			if let Some(image) = &image {
				state.media.remove(image).await;
			}

			return Err(error.into());
		}
	};

	tracing::info!(post_id, author = %session.user.username, "post created");

	Ok(View::redirect(format!(
		"/profile/{}/",
		session.user.username
	)))
}

/// Edit form
/// Returns the form for editing a post, filled in with its current values.
///
/// Only the author may edit a post; anyone else is sent to the post instead.
#[route(tag = tag::POST, login_required, redirect = "Redirects to the post when the user is not its author.")]
pub async fn edit_form(
	State(database): State<Database>,
	session: Session,
	Path(path): Path<model::PostPath>,
) -> Result<View<model::PostFormContext>, RouteError> {
	let post = find_post(&database, path.post_id).await?;

	if post.author_id != session.user.id {
		return Ok(View::redirect(detail_url(post.id)));
	}

	Ok(View::render(
		FORM_TEMPLATE,
		model::PostFormContext {
			form: model::PostFormValues::from(&post),
			errors: Default::default(),
			groups: groups(&database).await?,
			is_edit: true,
			post_id: Some(post.id),
		},
	))
}

/// Edit post
/// Updates a post with the submitted form.
///
/// A post submitted without a group leaves every group. The stored image is
/// kept unless a new one is uploaded or `image-clear` is ticked.
#[route(tag = tag::POST, login_required, redirect = "Redirects to the post once it is saved, or right away when the user is not its author.")]
pub async fn edit_post(
	State(state): State<AppState>,
	session: Session,
	Path(path): Path<model::PostPath>,
	data: FormData,
) -> Result<View<model::PostFormContext>, RouteError> {
	let post = find_post(&state.database, path.post_id).await?;

	if post.author_id != session.user.id {
		tracing::debug!(post_id = post.id, user = %session.user.username, "edit by non-author refused");

		return Ok(View::redirect(detail_url(post.id)));
	}

	let form = model::PostForm::bind(data);
	let (group, errors) = form.clean(&state.database).await?;

	if !errors.is_empty() {
		return Ok(View::render(
			FORM_TEMPLATE,
			model::PostFormContext {
				form: form.initial(post.image.clone()),
				errors,
				groups: groups(&state.database).await?,
				is_edit: true,
				post_id: Some(post.id),
			},
		));
	}

	let uploaded = match &form.image {
		Some(file) => Some(state.media.save(media::POST_IMAGES, file).await?),
		None => None,
	};

	let image = match (&uploaded, form.clear_image) {
		(Some(uploaded), _) => Some(uploaded.clone()),
		(None, true) => None,
		(None, false) => post.image,
	};

	let updated = sqlx::query(
		r#"
			UPDATE post
			SET text = ?, group_id = ?, image = ?
			WHERE id = ? AND author_id = ?
		"#,
	)
	.bind(&form.text)
	.bind(group)
	.bind(&image)
	.bind(post.id)
	.bind(session.user.id)
	.execute(&state.database)
	.await;

	if let Err(error) = updated {
		if let Some(uploaded) = &uploaded {
			state.media.remove(uploaded).await;
		}

		return Err(error.into());
	}

	Ok(View::redirect(detail_url(post.id)))
}

/// Add comment
/// Adds a comment by the logged in user to a post.
///
/// The user is sent back to the post whether or not the comment was valid.
#[route(tag = tag::POST, login_required, redirect = "Redirects to the post.")]
pub async fn add_comment(
	State(database): State<Database>,
	session: Session,
	Path(path): Path<model::PostPath>,
	data: FormData,
) -> Result<View, RouteError> {
	let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM post WHERE id = ?)")
		.bind(path.post_id)
		.fetch_one(&database)
		.await?;

	if !exists {
		return Err(Error::UnknownPost(path.post_id).into());
	}

	let form = model::CommentForm::bind(&data);

	if form.validate().is_ok() {
		sqlx::query(
			r#"
				INSERT INTO comment (post_id, author_id, text, created_at)
				VALUES (?, ?, ?, ?)
			"#,
		)
		.bind(path.post_id)
		.bind(session.user.id)
		.bind(&form.text)
		.bind(Utc::now())
		.execute(&database)
		.await?;
	}

	Ok(View::redirect(detail_url(path.post_id)))
}
