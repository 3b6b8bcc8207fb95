// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Login notice (motd fragment) left behind by a failed run.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct LoginNotice {
	path: PathBuf,
}

impl LoginNotice {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	pub async fn write_failure(&self, error: &str, log_file: Option<&Path>) -> std::io::Result<()> {
		if let Some(parent) = self.path.parent() {
			fs::create_dir_all(parent).await?;
		}
		let mut text = format!(
			"\n*** burrow: provisioning of this host FAILED ***\n\nlast error: {error}\n"
		);
		match log_file {
			Some(log) => text.push_str(&format!("details: {}\n", log.display())),
			None => text.push_str("details: journalctl -t burrow\n"),
		}
		text.push_str("re-run with: burrow provision\n\n");

		fs::write(&self.path, text).await?;
		info!(path = %self.path.display(), "login notice written");
		Ok(())
	}

	pub async fn clear(&self) -> std::io::Result<()> {
		match fs::remove_file(&self.path).await {
			Ok(()) => {
				debug!(path = %self.path.display(), "login notice removed");
				Ok(())
			}
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
			Err(e) => Err(e),
		}
	}
}
