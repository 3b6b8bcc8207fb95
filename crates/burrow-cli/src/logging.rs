// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use console::style;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn open_log_file(path: &Path) -> std::io::Result<File> {
	if let Some(parent) = path.parent() {
		std::fs::create_dir_all(parent)?;
	}
	OpenOptions::new().create(true).append(true).open(path)
}

/// Stderr output (human or JSON) plus an optional plain-text copy appended
/// to `log_file`. `RUST_LOG` overrides the default `info` filter.
pub fn init_logging(json: bool, log_file: Option<&Path>) {
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

	let file = log_file.and_then(|path| match open_log_file(path) {
		Ok(file) => Some(file),
		Err(e) => {
			eprintln!(
				"{} cannot open log file {}: {e}",
				style("warning:").yellow().bold(),
				path.display()
			);
			None
		}
	});

	let stderr_plain = (!json).then(|| fmt::layer().with_writer(std::io::stderr));
	let stderr_json = json.then(|| fmt::layer().json().with_writer(std::io::stderr));
	let file_layer = file.map(|file| {
		fmt::layer()
			.with_ansi(false)
			.with_writer(Mutex::new(file))
	});

	tracing_subscriber::registry()
		.with(filter)
		.with(stderr_plain)
		.with(stderr_json)
		.with(file_layer)
		.init();
}
