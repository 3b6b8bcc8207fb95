// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Sentinel files describing the run lifecycle to whatever re-triggers
//! provisioning after a reboot.
//!
//! All three are created up front by the first-boot mechanism. A run deletes
//! `started` when it begins, `finished` when it reaches the end (success or
//! not) and `success` only when the tunnel verified. Whatever is still present
//! afterwards tells how far the last run got.

use std::fmt;
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, info};

use crate::error::MarkerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
	Started,
	Finished,
	Success,
}

impl Marker {
	pub const ALL: [Marker; 3] = [Marker::Started, Marker::Finished, Marker::Success];

	pub fn file_name(self) -> &'static str {
		match self {
			Marker::Started => "root_setup_not_yet_started_once",
			Marker::Finished => "root_setup_not_yet_finished_once",
			Marker::Success => "root_setup_not_yet_success_once",
		}
	}
}

/// What the markers (plus the run lock) say about the last run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
	NotStarted,
	Running,
	/// Started but the process went away before the end.
	Interrupted,
	Failed,
	Succeeded,
}

impl RunOutcome {
	pub fn is_terminal(self) -> bool {
		matches!(self, Self::Interrupted | Self::Failed | Self::Succeeded)
	}
}

impl fmt::Display for RunOutcome {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Self::NotStarted => "not started",
			Self::Running => "running",
			Self::Interrupted => "interrupted",
			Self::Failed => "failed",
			Self::Succeeded => "succeeded",
		})
	}
}

#[derive(Debug, Clone)]
pub struct RunMarkers {
	dir: PathBuf,
}

impl RunMarkers {
	pub fn new(dir: impl Into<PathBuf>) -> Self {
		Self { dir: dir.into() }
	}

	pub fn dir(&self) -> &Path {
		&self.dir
	}

	pub fn path(&self, marker: Marker) -> PathBuf {
		self.dir.join(marker.file_name())
	}

	pub async fn exists(&self, marker: Marker) -> Result<bool, MarkerError> {
		let path = self.path(marker);
		fs::try_exists(&path)
			.await
			.map_err(|source| MarkerError::Io { path, source })
	}

	/// Arms all three markers, as the first-boot hook does.
	pub async fn create_all(&self) -> Result<(), MarkerError> {
		fs::create_dir_all(&self.dir)
			.await
			.map_err(|source| MarkerError::Io {
				path: self.dir.clone(),
				source,
			})?;
		for marker in Marker::ALL {
			let path = self.path(marker);
			fs::write(&path, b"")
				.await
				.map_err(|source| MarkerError::Io { path, source })?;
		}
		info!(dir = %self.dir.display(), "run markers armed");
		Ok(())
	}

	/// Removes a marker; absent is fine.
	pub async fn clear(&self, marker: Marker) -> Result<(), MarkerError> {
		let path = self.path(marker);
		match fs::remove_file(&path).await {
			Ok(()) => {
				debug!(marker = marker.file_name(), "cleared run marker");
				Ok(())
			}
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
			Err(source) => Err(MarkerError::Io { path, source }),
		}
	}

	/// `running` is whether a provisioning process currently holds the run
	/// lock.
	pub async fn outcome(&self, running: bool) -> Result<RunOutcome, MarkerError> {
		if self.exists(Marker::Started).await? {
			return Ok(RunOutcome::NotStarted);
		}
		if running {
			return Ok(RunOutcome::Running);
		}
		if self.exists(Marker::Finished).await? {
			return Ok(RunOutcome::Interrupted);
		}
		if self.exists(Marker::Success).await? {
			return Ok(RunOutcome::Failed);
		}
		Ok(RunOutcome::Succeeded)
	}
}
