use sqlx::{QueryBuilder, Sqlite};
use uuid::Uuid;

use crate::{
	route::{
		model::{PageOf, Paginator, PAGE_SIZE},
		post::model::Post,
	},
	Database,
};

const SELECT_POST: &str = r#"
	SELECT
		post.id, post.text, post.created_at, post.image,
		post.author_id, "user".username AS author,
		post.group_id, "group".slug AS group_slug, "group".title AS group_title
	FROM post
	JOIN "user" ON "user".id = post.author_id
	LEFT JOIN "group" ON "group".id = post.group_id
"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Filter {
	All,
	Id(i64),
	Group(i64),
	Author(Uuid),
	FollowedBy(Uuid),
}

/// A description of a set of posts, newest first.
///
/// Building one does not touch the database; it is executed only by
/// [`PostQuery::count`], [`PostQuery::fetch`], [`PostQuery::first`] and
/// [`PostQuery::paginate`], so the same value can be counted and then
/// sliced without being rebuilt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostQuery {
	filter: Filter,
}

impl PostQuery {
	pub fn all() -> Self {
		Self {
			filter: Filter::All,
		}
	}

	pub fn id(id: i64) -> Self {
		Self {
			filter: Filter::Id(id),
		}
	}

	pub fn group(group_id: i64) -> Self {
		Self {
			filter: Filter::Group(group_id),
		}
	}

	pub fn author(author_id: Uuid) -> Self {
		Self {
			filter: Filter::Author(author_id),
		}
	}

	/// Posts whose author is followed by `user_id`.
	pub fn followed_by(user_id: Uuid) -> Self {
		Self {
			filter: Filter::FollowedBy(user_id),
		}
	}

	fn push_filter(&self, builder: &mut QueryBuilder<'_, Sqlite>) {
		match self.filter {
			Filter::All => {}
			Filter::Id(id) => {
				builder.push(" WHERE post.id = ").push_bind(id);
			}
			Filter::Group(group_id) => {
				builder.push(" WHERE post.group_id = ").push_bind(group_id);
			}
			Filter::Author(author_id) => {
				builder.push(" WHERE post.author_id = ").push_bind(author_id);
			}
			Filter::FollowedBy(user_id) => {
				builder
					.push(" WHERE post.author_id IN (SELECT author_id FROM follow WHERE user_id = ")
					.push_bind(user_id)
					.push(")");
			}
		}
	}

	pub async fn count(&self, database: &Database) -> Result<i64, sqlx::Error> {
		let mut builder = QueryBuilder::new("SELECT COUNT(*) FROM post");

		self.push_filter(&mut builder);
		builder
			.build_query_scalar::<i64>()
			.fetch_one(database)
			.await
	}

	pub async fn fetch(
		&self,
		database: &Database,
		limit: i64,
		offset: i64,
	) -> Result<Vec<Post>, sqlx::Error> {
		let mut builder = QueryBuilder::new(SELECT_POST);

		self.push_filter(&mut builder);
		builder
			.push(" ORDER BY post.created_at DESC, post.id DESC LIMIT ")
			.push_bind(limit)
			.push(" OFFSET ")
			.push_bind(offset);

		builder.build_query_as::<Post>().fetch_all(database).await
	}

	pub async fn first(&self, database: &Database) -> Result<Option<Post>, sqlx::Error> {
		Ok(self.fetch(database, 1, 0).await?.into_iter().next())
	}

	/// Counts the matching posts, then fetches the requested page.
	pub async fn paginate(
		&self,
		database: &Database,
		requested: Option<&str>,
	) -> Result<PageOf<Post>, sqlx::Error> {
		let slice = Paginator::new(self.count(database).await?, PAGE_SIZE).page(requested);
		let posts = if slice.count == 0 {
			Vec::new()
		} else {
			self.fetch(database, slice.limit(), slice.offset()).await?
		};

		Ok(slice.with_items(posts))
	}
}
