// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::error::TableRegistryError;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

pub const DEFAULT_RT_TABLES: &str = "/etc/iproute2/rt_tables";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableRegistration {
	AlreadyPresent,
	Appended,
}

/// The iproute2 table-name registry (`id name` per line).
#[derive(Debug, Clone)]
pub struct TableRegistry {
	path: PathBuf,
}

impl TableRegistry {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn system() -> Self {
		Self::new(DEFAULT_RT_TABLES)
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	fn io_err(&self, source: std::io::Error) -> TableRegistryError {
		TableRegistryError::Io {
			path: self.path.clone(),
			source,
		}
	}

	/// Makes sure `id name` is registered, appending it if absent. Fails if
	/// either half is already bound to something else.
	///
	/// ```
	/// # tokio_test::block_on(async {
	/// use burrow_wg::{TableRegistration, TableRegistry};
	///
	/// let dir = tempfile::tempdir().unwrap();
	/// let registry = TableRegistry::new(dir.path().join("rt_tables"));
	/// assert_eq!(registry.ensure(2, "ssh").await.unwrap(), TableRegistration::Appended);
	/// assert_eq!(registry.ensure(2, "ssh").await.unwrap(), TableRegistration::AlreadyPresent);
	/// # });
	/// ```
	pub async fn ensure(&self, id: u32, name: &str) -> Result<TableRegistration, TableRegistryError> {
		let existing = match fs::read_to_string(&self.path).await {
			Ok(contents) => contents,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
			Err(e) => return Err(self.io_err(e)),
		};

		for (existing_id, existing_name) in parse_entries(&existing) {
			match (existing_id == id, existing_name == name) {
				(true, true) => {
					debug!(path = %self.path.display(), id, name, "routing table already registered");
					return Ok(TableRegistration::AlreadyPresent);
				}
				(false, true) => {
					return Err(TableRegistryError::NameConflict {
						name: name.to_string(),
						existing_id,
						wanted_id: id,
					});
				}
				(true, false) => {
					return Err(TableRegistryError::IdConflict {
						id,
						existing_name: existing_name.to_string(),
						wanted_name: name.to_string(),
					});
				}
				(false, false) => {}
			}
		}

		if let Some(parent) = self.path.parent() {
			fs::create_dir_all(parent).await.map_err(|e| self.io_err(e))?;
		}

		let mut line = String::new();
		if !existing.is_empty() && !existing.ends_with('\n') {
			line.push('\n');
		}
		line.push_str(&format!("{id} {name}\n"));

		let mut file = fs::OpenOptions::new()
			.create(true)
			.append(true)
			.open(&self.path)
			.await
			.map_err(|e| self.io_err(e))?;
		file.write_all(line.as_bytes()).await.map_err(|e| self.io_err(e))?;
		file.flush().await.map_err(|e| self.io_err(e))?;

		info!(path = %self.path.display(), id, name, "registered routing table");
		Ok(TableRegistration::Appended)
	}
}

fn parse_entries(contents: &str) -> impl Iterator<Item = (u32, &str)> {
	contents.lines().filter_map(|line| {
		let line = line.split('#').next().unwrap_or("").trim();
		let mut parts = line.split_whitespace();
		let id = parts.next()?.parse().ok()?;
		let name = parts.next()?;
		Some((id, name))
	})
}
