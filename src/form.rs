use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::{ValidationError, ValidationErrors};

use crate::extract::UploadedFile;

pub const REQUIRED: &str = "This field is required.";
pub const INVALID_CHOICE: &str =
	"Select a valid choice. That choice is not one of the available choices.";
pub const INVALID_IMAGE: &str =
	"Upload a valid image. The file you uploaded was either not an image or a corrupted image.";
pub const CONTRADICTION: &str =
	"Please either submit a file or check the clear checkbox, not both.";

/// Field errors of a submitted form, keyed by field name.
///
/// Errors that concern the form as a whole live under `__all__`.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct FormErrors(pub BTreeMap<String, Vec<String>>);

impl FormErrors {
	pub const NON_FIELD: &'static str = "__all__";

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	pub fn add(&mut self, field: &str, message: impl Into<String>) {
		self.0
			.entry(field.to_string())
			.or_default()
			.push(message.into());
	}

	#[cfg(test)]
	pub fn get(&self, field: &str) -> &[String] {
		self.0.get(field).map_or(&[], Vec::as_slice)
	}
}

impl From<ValidationErrors> for FormErrors {
	fn from(errors: ValidationErrors) -> Self {
		let mut form = Self::default();

		for (field, errors) in errors.field_errors() {
			for error in errors {
				form.add(&field, message(error));
			}
		}

		form
	}
}

/// Builds a [`ValidationError`] carrying a human readable message.
pub fn error(code: &'static str, message: &'static str) -> ValidationError {
	let mut error = ValidationError::new(code);

	error.message = Some(message.into());
	error
}

fn message(error: &ValidationError) -> String {
	error
		.message
		.as_ref()
		.map_or_else(|| error.code.to_string(), ToString::to_string)
}

/// Runs the derived validators of a form, collecting failures as [`FormErrors`].
pub fn validate(form: &impl validator::Validate) -> FormErrors {
	form.validate().map_or_else(FormErrors::from, |()| FormErrors::default())
}

/// Sniffs the leading bytes of an upload for a supported image format.
pub fn is_image(file: &UploadedFile) -> bool {
	const SIGNATURES: &[&[u8]] = &[
		b"GIF87a",
		b"GIF89a",
		b"\x89PNG\r\n\x1a\n",
		b"\xFF\xD8\xFF",
	];

	let bytes = file.bytes.as_ref();

	SIGNATURES
		.iter()
		.any(|signature| bytes.starts_with(signature))
		|| (bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP")
}
