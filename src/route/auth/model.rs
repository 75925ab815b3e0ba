use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{
	extract::FormData,
	form::{self, FormErrors},
};

fn validate_username(username: &str) -> Result<(), ValidationError> {
	if username.is_empty() {
		return Err(form::error("required", form::REQUIRED));
	}

	if username
		.chars()
		.any(|c| !c.is_alphanumeric() && !matches!(c, '@' | '.' | '+' | '-' | '_'))
	{
		return Err(form::error(
			"invalid_username",
			"Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
		));
	}

	Ok(())
}

fn validate_password(password: &str) -> Result<(), ValidationError> {
	if password.chars().all(|c| c.is_ascii_digit()) {
		return Err(form::error(
			"password_entirely_numeric",
			"This password is entirely numeric.",
		));
	}

	Ok(())
}

/// A single user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, sqlx::FromRow)]
pub struct User {
	/// The unique identifier of the user.
	pub id: Uuid,
	/// The username that is displayed to the public.
	pub username: String,
	#[serde(skip_serializing)]
	pub email: Option<String>,
	pub first_name: String,
	pub last_name: String,
	/// The hashed password.
	#[serde(skip)]
	pub password: Vec<u8>,
	/// The creation time of the user.
	pub created_at: DateTime<Utc>,
}

/// The signup form.
#[derive(Debug, Default, Validate)]
pub struct SignupForm {
	#[validate(length(max = 150, message = "Ensure this value has at most 150 characters."))]
	pub first_name: String,
	#[validate(length(max = 150, message = "Ensure this value has at most 150 characters."))]
	pub last_name: String,
	#[validate(
		length(max = 150, message = "Ensure this value has at most 150 characters."),
		custom(function = "validate_username")
	)]
	pub username: String,
	#[validate(email(message = "Enter a valid email address."))]
	pub email: Option<String>,
	#[validate(
		length(min = 8, message = "This password is too short. It must contain at least 8 characters."),
		custom(function = "validate_password")
	)]
	pub password1: String,
	#[validate(must_match(other = "password1", message = "The two password fields didn't match."))]
	pub password2: String,
}

impl SignupForm {
	pub fn bind(data: &FormData) -> Self {
		Self {
			first_name: data.text_or_default("first_name"),
			last_name: data.text_or_default("last_name"),
			username: data.text_or_default("username"),
			email: data.text("email").map(str::to_string),
			password1: data.raw("password1").unwrap_or_default().to_string(),
			password2: data.raw("password2").unwrap_or_default().to_string(),
		}
	}

	/// The values to show when the form is displayed again. Passwords are never echoed.
	pub fn initial(&self) -> SignupValues {
		SignupValues {
			first_name: self.first_name.clone(),
			last_name: self.last_name.clone(),
			username: self.username.clone(),
			email: self.email.clone().unwrap_or_default(),
		}
	}
}

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct SignupValues {
	pub first_name: String,
	pub last_name: String,
	pub username: String,
	pub email: String,
}

/// The login form.
#[derive(Debug, Default, Validate)]
pub struct LoginForm {
	#[validate(length(min = 1, message = "This field is required."))]
	pub username: String,
	#[validate(length(min = 1, message = "This field is required."))]
	pub password: String,
	pub next: Option<String>,
}

impl LoginForm {
	pub fn bind(data: &FormData) -> Self {
		Self {
			username: data.text_or_default("username"),
			password: data.raw("password").unwrap_or_default().to_string(),
			next: data.text("next").map(str::to_string),
		}
	}
}

#[derive(Debug, Default, Deserialize, Validate, JsonSchema)]
pub struct LoginQuery {
	/// Where to go once logged in. Only local paths are followed.
	pub next: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct LoginValues {
	pub username: String,
	pub next: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct SignupContext {
	pub form: SignupValues,
	pub errors: FormErrors,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct LoginContext {
	pub form: LoginValues,
	pub errors: FormErrors,
}
