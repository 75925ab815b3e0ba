use axum::extract::State;
use macros::route;

use crate::{
	extract::{Path, Query},
	openapi::tag,
	query::PostQuery,
	render::View,
	Database,
};

use super::{model, Error, RouteError};

/// Group posts
/// Returns a group and a page of its posts, newest first.
#[route(tag = tag::GROUP)]
pub async fn group_posts(
	State(database): State<Database>,
	Path(path): Path<model::GroupPath>,
	Query(input): Query<model::PageInput>,
) -> Result<View<model::GroupContext>, RouteError> {
	let group = sqlx::query_as::<_, model::Group>(r#"SELECT * FROM "group" WHERE slug = ?"#)
		.bind(&path.slug)
		.fetch_optional(&database)
		.await?
		.ok_or_else(|| Error::UnknownGroup(path.slug.clone()))?;

	let page_obj = PostQuery::group(group.id)
		.paginate(&database, input.requested())
		.await?;

	Ok(View::render(
		"posts/group_list.html",
		model::GroupContext { group, page_obj },
	))
}
