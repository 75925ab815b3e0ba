pub use crate::route::{
	auth::model::User,
	model::{PageInput, PageOf},
	post::model::Post,
};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Deserialize, Validate, JsonSchema)]
pub struct ProfilePath {
	/// The username of the author.
	pub username: String,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ProfileContext {
	pub author: User,
	pub page_obj: PageOf<Post>,
	/// How many posts the author has written.
	pub posts_count: i64,
	/// Whether the logged in user follows the author. Always false for guests.
	pub following: bool,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct FollowContext {
	pub page_obj: PageOf<Post>,
	pub follow: bool,
}
