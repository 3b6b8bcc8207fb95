// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! `VAR` / `VAR_FILE` secret loading.
//!
//! The WireGuard private key and the status token are usually dropped on the
//! VM by cloud-init, so both may be given inline or as a path to a file that
//! holds them.

use std::fs;
use std::path::PathBuf;

use burrow_common_secret::SecretString;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SecretEnvError {
	#[error("failed to read secret file at {path}: {source}")]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("secret file path in {var} is empty")]
	EmptyPath { var: String },
}

/// Loads `var` from the process environment. `{var}_FILE` wins over `{var}`;
/// a single trailing newline in the file is dropped.
pub fn load_secret_env(var: &str) -> Result<Option<SecretString>, SecretEnvError> {
	load_secret_with(var, |name| std::env::var(name).ok())
}

/// Same as [`load_secret_env`] with an explicit variable lookup.
pub fn load_secret_with<F>(var: &str, lookup: F) -> Result<Option<SecretString>, SecretEnvError>
where
	F: Fn(&str) -> Option<String>,
{
	let file_var = format!("{var}_FILE");

	if let Some(path_str) = lookup(&file_var) {
		if path_str.trim().is_empty() {
			return Err(SecretEnvError::EmptyPath { var: file_var });
		}

		let path = PathBuf::from(path_str.trim());
		let content = fs::read_to_string(&path).map_err(|source| SecretEnvError::Io {
			path: path.clone(),
			source,
		})?;

		let secret = content.strip_suffix('\n').unwrap_or(&content).to_string();
		return Ok(Some(SecretString::new(secret)));
	}

	Ok(lookup(var).map(SecretString::new))
}
