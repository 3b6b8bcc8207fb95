// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Advisory run lock: at most one process mutates tunnel and routing state.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::LockError;

/// Exclusive `flock` held for the lifetime of the value. The kernel drops it
/// if the process dies, so a stale file never blocks the next run.
#[derive(Debug)]
pub struct RunLock {
	file: File,
	path: PathBuf,
}

fn try_flock(file: &File, operation: libc::c_int) -> std::io::Result<bool> {
	// SAFETY: the descriptor is owned by `file` and valid for the call.
	let rc = unsafe { libc::flock(file.as_raw_fd(), operation | libc::LOCK_NB) };
	if rc == 0 {
		return Ok(true);
	}
	let err = std::io::Error::last_os_error();
	if err.raw_os_error() == Some(libc::EWOULDBLOCK) {
		Ok(false)
	} else {
		Err(err)
	}
}

impl RunLock {
	/// Takes the lock without waiting. Fails with `AlreadyHeld` if another
	/// run has it.
	pub fn acquire(path: impl AsRef<Path>) -> Result<Self, LockError> {
		let path = path.as_ref().to_path_buf();
		let io_err = |source| LockError::Io {
			path: path.clone(),
			source,
		};

		if let Some(parent) = path.parent() {
			std::fs::create_dir_all(parent).map_err(io_err)?;
		}
		let mut file = OpenOptions::new()
			.read(true)
			.write(true)
			.create(true)
			.truncate(false)
			.mode(0o644)
			.open(&path)
			.map_err(io_err)?;

		if !try_flock(&file, libc::LOCK_EX).map_err(io_err)? {
			return Err(LockError::AlreadyHeld { path });
		}

		file.set_len(0).map_err(io_err)?;
		writeln!(file, "{}", std::process::id()).map_err(io_err)?;

		info!(path = %path.display(), "run lock acquired");
		Ok(Self { file, path })
	}

	/// Whether some process currently holds the lock at `path`.
	pub fn is_held(path: impl AsRef<Path>) -> Result<bool, LockError> {
		let path = path.as_ref();
		let file = match File::open(path) {
			Ok(file) => file,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
			Err(source) => {
				return Err(LockError::Io {
					path: path.to_path_buf(),
					source,
				})
			}
		};
		let free = try_flock(&file, libc::LOCK_SH).map_err(|source| LockError::Io {
			path: path.to_path_buf(),
			source,
		})?;
		// Closing `file` releases the probe lock.
		Ok(!free)
	}

	pub fn path(&self) -> &Path {
		&self.path
	}
}

impl Drop for RunLock {
	fn drop(&mut self) {
		// SAFETY: as in `try_flock`.
		unsafe {
			libc::flock(self.file.as_raw_fd(), libc::LOCK_UN);
		}
		debug!(path = %self.path.display(), "run lock released");
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::TempDir;

	#[test]
	fn second_acquire_is_refused() {
		let dir = TempDir::new().unwrap();
		let path = dir.path().join("burrow.lock");

		let lock = RunLock::acquire(&path).unwrap();
		assert!(matches!(
			RunLock::acquire(&path),
			Err(LockError::AlreadyHeld { .. })
		));
		assert!(RunLock::is_held(&path).unwrap());

		drop(lock);
		assert!(!RunLock::is_held(&path).unwrap());
		RunLock::acquire(&path).unwrap();
	}

	#[test]
	fn lock_file_records_pid() {
		let dir = TempDir::new().unwrap();
		let path = dir.path().join("run").join("burrow.lock");
		let _lock = RunLock::acquire(&path).unwrap();

		let contents = std::fs::read_to_string(&path).unwrap();
		assert_eq!(contents.trim(), std::process::id().to_string());
	}

	#[test]
	fn missing_file_is_not_held() {
		let dir = TempDir::new().unwrap();
		assert!(!RunLock::is_held(dir.path().join("absent.lock")).unwrap());
	}
}
