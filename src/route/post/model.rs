pub use crate::route::{
	group::model::Group,
	model::{PageInput, PageOf},
};

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{
	extract::{FormData, UploadedFile},
	form::{self, FormErrors},
	Database,
};

/// A single post, joined with its author and group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, sqlx::FromRow)]
pub struct Post {
	/// The unique identifier of the post.
	pub id: i64,
	/// The body of the post.
	pub text: String,
	/// The creation time of the post.
	pub created_at: DateTime<Utc>,
	/// The uploaded image, relative to the media root.
	pub image: Option<String>,
	/// The user that wrote the post.
	pub author_id: Uuid,
	/// The username of the author.
	pub author: String,
	pub group_id: Option<i64>,
	pub group_slug: Option<String>,
	pub group_title: Option<String>,
}

/// A single comment on a post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, sqlx::FromRow)]
pub struct Comment {
	pub id: i64,
	pub post_id: i64,
	pub author_id: Uuid,
	/// The username of the author.
	pub author: String,
	pub text: String,
	pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate, JsonSchema)]
pub struct PostPath {
	pub post_id: i64,
}

/// The post form: text, an optional group and an optional image.
#[derive(Debug, Default, Validate)]
pub struct PostForm {
	#[validate(length(min = 1, message = "This field is required."))]
	pub text: String,
	/// The submitted group id, unparsed.
	pub group: Option<String>,
	pub image: Option<UploadedFile>,
	/// Whether the "clear" checkbox of the image input was ticked.
	pub clear_image: bool,
}

impl PostForm {
	pub fn bind(mut data: FormData) -> Self {
		Self {
			text: data.text_or_default("text"),
			group: data.text("group").map(str::to_string),
			clear_image: data.text("image-clear").is_some_and(|value| value == "on"),
			image: data.take_file("image"),
		}
	}

	/// Validates the form, including the checks that need the database.
	///
	/// Returns the selected group alongside any field errors.
	pub async fn clean(&self, database: &Database) -> Result<(Option<i64>, FormErrors), sqlx::Error> {
		let mut errors = form::validate(self);

		match &self.image {
			Some(..) if self.clear_image => errors.add("image", form::CONTRADICTION),
			Some(image) if !form::is_image(image) => errors.add("image", form::INVALID_IMAGE),
			_ => {}
		}

		let Some(group) = self.group.as_deref() else {
			return Ok((None, errors));
		};

		let exists = match group.parse::<i64>() {
			Ok(id) => {
				sqlx::query_scalar::<_, bool>(r#"SELECT EXISTS (SELECT 1 FROM "group" WHERE id = ?)"#)
					.bind(id)
					.fetch_one(database)
					.await?
					.then_some(id)
			}
			Err(..) => None,
		};

		if exists.is_none() {
			errors.add("group", form::INVALID_CHOICE);
		}

		Ok((exists, errors))
	}

	/// The values to show when the form is displayed again.
	pub fn initial(&self, image: Option<String>) -> PostFormValues {
		PostFormValues {
			text: self.text.clone(),
			group: self.group.clone(),
			image,
		}
	}
}

/// The values a post form is displayed with.
#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct PostFormValues {
	pub text: String,
	pub group: Option<String>,
	pub image: Option<String>,
}

impl From<&Post> for PostFormValues {
	fn from(post: &Post) -> Self {
		Self {
			text: post.text.clone(),
			group: post.group_id.map(|id| id.to_string()),
			image: post.image.clone(),
		}
	}
}

#[derive(Debug, Default, Serialize, Deserialize, Validate, JsonSchema)]
pub struct CommentForm {
	#[validate(length(min = 1, message = "This field is required."))]
	pub text: String,
}

impl CommentForm {
	pub fn bind(data: &FormData) -> Self {
		Self {
			text: data.text_or_default("text"),
		}
	}
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct IndexContext {
	pub page_obj: PageOf<Post>,
	pub index: bool,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct DetailContext {
	pub post: Post,
	pub comments: Vec<Comment>,
	pub form: CommentForm,
	/// How many posts the author of this post has written.
	pub author_posts: i64,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct PostFormContext {
	pub form: PostFormValues,
	pub errors: FormErrors,
	/// The groups a post can be assigned to.
	pub groups: Vec<Group>,
	pub is_edit: bool,
	pub post_id: Option<i64>,
}
