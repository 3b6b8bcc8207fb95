// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration error types.

use std::path::PathBuf;

use crate::env::SecretEnvError;

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	/// I/O error reading a config file
	#[error("failed to read {path}: {source}")]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	/// TOML parsing error
	#[error("TOML parse error in {path}: {source}")]
	TomlParse {
		path: PathBuf,
		#[source]
		source: toml::de::Error,
	},

	/// Missing required field
	#[error("missing required field: {0}")]
	MissingField(String),

	/// Invalid value
	#[error("invalid value for {field}: {message}")]
	InvalidValue { field: String, message: String },

	#[error(transparent)]
	Secret(#[from] SecretEnvError),
}

impl ConfigError {
	pub fn missing_field(field: impl Into<String>) -> Self {
		Self::MissingField(field.into())
	}

	pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
		Self::InvalidValue {
			field: field.into(),
			message: message.into(),
		}
	}
}
