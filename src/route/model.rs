use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Number of posts shown on every paginated listing.
pub const PAGE_SIZE: i64 = 10;

/// The `?page=` query of a paginated listing.
///
/// The raw value is kept as a string: anything that is not a number
/// falls back to the first page instead of rejecting the request.
#[derive(Debug, Default, Deserialize, Validate, JsonSchema)]
pub struct PageInput {
	/// The page number to return (1-indexed).
	pub page: Option<String>,
}

impl PageInput {
	pub fn requested(&self) -> Option<&str> {
		self.page.as_deref()
	}
}

/// Splits `count` ordered items into pages of `per_page`.
#[derive(Debug, Clone, Copy)]
pub struct Paginator {
	count: i64,
	per_page: i64,
}

/// The slice of items that make up one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSlice {
	pub number: i64,
	pub num_pages: i64,
	pub count: i64,
	per_page: i64,
}

impl Paginator {
	pub fn new(count: i64, per_page: i64) -> Self {
		Self {
			count: count.max(0),
			per_page: per_page.max(1),
		}
	}

	/// The number of pages; an empty collection still has one (empty) page.
	pub fn num_pages(&self) -> i64 {
		((self.count + self.per_page - 1) / self.per_page).max(1)
	}

	/// Resolves a requested page number.
	///
	/// A missing or non-numeric value selects the first page, a number outside
	/// `1..=num_pages` selects the last one.
	pub fn page(&self, requested: Option<&str>) -> PageSlice {
		let num_pages = self.num_pages();
		let number = match requested.map(|value| value.trim().parse::<i64>()) {
			None | Some(Err(..)) => 1,
			Some(Ok(number)) if (1..=num_pages).contains(&number) => number,
			Some(Ok(..)) => num_pages,
		};

		PageSlice {
			number,
			num_pages,
			count: self.count,
			per_page: self.per_page,
		}
	}
}

impl PageSlice {
	pub fn offset(&self) -> i64 {
		(self.number - 1) * self.per_page
	}

	pub fn limit(&self) -> i64 {
		self.per_page
	}

	pub fn has_next(&self) -> bool {
		self.number < self.num_pages
	}

	pub fn has_previous(&self) -> bool {
		self.number > 1
	}

	pub fn with_items<T>(self, object_list: Vec<T>) -> PageOf<T> {
		PageOf {
			has_next: self.has_next(),
			has_previous: self.has_previous(),
			number: self.number,
			num_pages: self.num_pages,
			count: self.count,
			object_list,
		}
	}
}

/// One page of a listing, as exposed to templates.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct PageOf<T> {
	pub object_list: Vec<T>,
	pub number: i64,
	pub num_pages: i64,
	pub count: i64,
	pub has_next: bool,
	pub has_previous: bool,
}
