use std::{
	io,
	path::{Path, PathBuf},
	sync::Arc,
};

use tokio::{fs, io::AsyncWriteExt};
use uuid::Uuid;

use crate::extract::UploadedFile;

/// Directory under the media root that post images are written to.
pub const POST_IMAGES: &str = "posts";

/// Stores uploaded files below a media root directory.
#[derive(Debug, Clone)]
pub struct Storage {
	root: Arc<PathBuf>,
}

impl Storage {
	pub fn new(root: impl Into<PathBuf>) -> Self {
		Self {
			root: Arc::new(root.into()),
		}
	}

	pub fn root(&self) -> &Path {
		&self.root
	}

	/// Writes `file` into `directory`, returning its path relative to the root.
	///
	/// An existing file is never overwritten: a clashing name gets a random suffix.
	pub async fn save(&self, directory: &str, file: &UploadedFile) -> io::Result<String> {
		let dir = self.root.join(directory);

		fs::create_dir_all(&dir).await?;

		let name = sanitize(&file.file_name);
		let mut candidate = name.clone();

		loop {
			let result = fs::OpenOptions::new()
				.write(true)
				.create_new(true)
				.open(dir.join(&candidate))
				.await;

			match result {
				Ok(mut handle) => {
					let written = async {
						handle.write_all(&file.bytes).await?;
						handle.flush().await
					}
					.await;

					let stored = format!("{directory}/{candidate}");

					if let Err(error) = written {
						drop(handle);
						self.remove(&stored).await;

						return Err(error);
					}

					tracing::debug!(file = %candidate, "stored upload");

					return Ok(stored);
				}
				Err(error) if error.kind() == io::ErrorKind::AlreadyExists => {
					candidate = with_suffix(&name, &Uuid::new_v4().simple().to_string()[..7]);
				}
				Err(error) => return Err(error),
			}
		}
	}

	/// Deletes a stored file given its path relative to the root.
	///
	/// Failures are only logged since the file is unused either way.
	pub async fn remove(&self, stored: &str) {
		if let Err(error) = fs::remove_file(self.root.join(stored)).await {
			tracing::warn!(%error, file = %stored, "failed to remove stored upload");
		}
	}
}

/// Reduces an uploaded file name to a safe final path component.
fn sanitize(file_name: &str) -> String {
	let base = file_name
		.rsplit(['/', '\\'])
		.next()
		.unwrap_or_default()
		.chars()
		.map(|c| {
			if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
				c
			} else {
				'_'
			}
		})
		.collect::<String>();

	let base = base.trim_start_matches('.');

	if base.is_empty() {
		"upload".into()
	} else {
		base.into()
	}
}

fn with_suffix(name: &str, suffix: &str) -> String {
	match name.rsplit_once('.') {
		Some((stem, extension)) if !stem.is_empty() => format!("{stem}_{suffix}.{extension}"),
		_ => format!("{name}_{suffix}"),
	}
}
