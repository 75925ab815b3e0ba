pub use crate::route::{
	model::{PageInput, PageOf},
	post::model::Post,
};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// A topic that posts can be filed under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, sqlx::FromRow)]
pub struct Group {
	pub id: i64,
	pub title: String,
	/// The unique, url-safe name of the group.
	pub slug: String,
	pub description: String,
}

#[derive(Debug, Deserialize, Validate, JsonSchema)]
pub struct GroupPath {
	pub slug: String,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct GroupContext {
	pub group: Group,
	pub page_obj: PageOf<Post>,
}
