use std::collections::HashMap;

use aide::OperationInput;
use axum::{
	body::Bytes,
	extract::{FromRequest, Multipart, Request},
	http::header,
	Form,
};

use crate::error::AppError;

/// A file submitted through a `multipart/form-data` body.
#[derive(Debug, Clone)]
pub struct UploadedFile {
	pub file_name: String,
	pub content_type: Option<String>,
	pub bytes: Bytes,
}

/// The submitted fields of an HTML form.
///
/// Accepts both `application/x-www-form-urlencoded` and `multipart/form-data`
/// bodies, so the same handler serves forms with and without file inputs.
/// Nothing is validated here; forms bind from this and validate themselves.
#[derive(Debug, Default)]
pub struct FormData {
	fields: HashMap<String, String>,
	files: HashMap<String, UploadedFile>,
}

impl FormData {
	/// Returns a text field, trimmed. Empty fields are treated as missing.
	pub fn text(&self, name: &str) -> Option<&str> {
		self.fields
			.get(name)
			.map(|value| value.trim())
			.filter(|value| !value.is_empty())
	}

	/// Returns a text field, trimmed, or an empty string when missing.
	pub fn text_or_default(&self, name: &str) -> String {
		self.text(name).unwrap_or_default().to_string()
	}

	/// Returns a text field exactly as submitted.
	pub fn raw(&self, name: &str) -> Option<&str> {
		self.fields.get(name).map(String::as_str)
	}

	pub fn take_file(&mut self, name: &str) -> Option<UploadedFile> {
		self.files.remove(name)
	}

	#[cfg(test)]
	pub fn from_fields<'a>(fields: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
		Self {
			fields: fields
				.into_iter()
				.map(|(name, value)| (name.to_string(), value.to_string()))
				.collect(),
			files: HashMap::new(),
		}
	}
}

#[axum::async_trait]
impl<S> FromRequest<S> for FormData
where
	S: Send + Sync,
{
	type Rejection = AppError;

	async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
		let is_multipart = req
			.headers()
			.get(header::CONTENT_TYPE)
			.and_then(|value| value.to_str().ok())
			.is_some_and(|value| value.starts_with("multipart/form-data"));

		if !is_multipart {
			let Form(fields) = Form::<Vec<(String, String)>>::from_request(req, state).await?;

			return Ok(Self {
				fields: fields.into_iter().collect(),
				files: HashMap::new(),
			});
		}

		let mut multipart = Multipart::from_request(req, state).await?;
		let mut data = Self::default();

		while let Some(field) = multipart.next_field().await? {
			let Some(name) = field.name().map(str::to_string) else {
				continue;
			};

			match field.file_name().map(str::to_string) {
				Some(file_name) => {
					let content_type = field.content_type().map(str::to_string);
					let bytes = field.bytes().await?;

					// Browsers submit an empty part for an untouched file input.
					if file_name.is_empty() && bytes.is_empty() {
						continue;
					}

					data.files.insert(
						name,
						UploadedFile {
							file_name,
							content_type,
							bytes,
						},
					);
				}
				None => {
					let value = field.text().await?;

					data.fields.insert(name, value);
				}
			}
		}

		Ok(data)
	}
}

impl OperationInput for FormData {}
