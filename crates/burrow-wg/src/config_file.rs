// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::error::ConfigWriteError;
use crate::render::ConfigText;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument};

const CONFIG_DIR: &str = "/etc/wireguard";

/// `/etc/wireguard/<iface>.conf`, where wg-quick looks for it.
pub fn config_path_for(interface: &str) -> PathBuf {
	Path::new(CONFIG_DIR).join(format!("{interface}.conf"))
}

fn temp_path_for(path: &Path) -> PathBuf {
	let name = path
		.file_name()
		.map(|n| n.to_string_lossy().into_owned())
		.unwrap_or_else(|| "wg.conf".to_string());
	path.with_file_name(format!(".{name}.tmp"))
}

/// Replaces `path` with `text`. The new content goes to a sibling temp file
/// created 0600, is synced, then renamed over the target, so readers see
/// either the old file or the complete new one.
#[instrument(skip(text), fields(path = %path.display()))]
pub async fn write_config(path: &Path, text: &ConfigText) -> Result<(), ConfigWriteError> {
	let io_err = |source| ConfigWriteError::Io {
		path: path.to_path_buf(),
		source,
	};

	if let Some(parent) = path.parent() {
		fs::create_dir_all(parent).await.map_err(io_err)?;
	}

	let tmp = temp_path_for(path);
	match fs::remove_file(&tmp).await {
		Ok(()) => {}
		Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
		Err(e) => return Err(io_err(e)),
	}

	if let Err(e) = write_private(&tmp, text.expose().as_bytes()).await {
		let _ = fs::remove_file(&tmp).await;
		return Err(io_err(e));
	}

	if let Err(e) = fs::rename(&tmp, path).await {
		let _ = fs::remove_file(&tmp).await;
		return Err(io_err(e));
	}

	info!("wrote tunnel config");
	Ok(())
}

#[cfg(unix)]
async fn write_private(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
	use std::os::unix::fs::PermissionsExt;
	use tokio::fs::OpenOptions;
	use tokio::io::AsyncWriteExt;

	let mut file = OpenOptions::new()
		.write(true)
		.create_new(true)
		.mode(0o600)
		.open(path)
		.await?;
	file.write_all(bytes).await?;
	file.sync_all().await?;
	fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)).await?;
	Ok(())
}

#[cfg(not(unix))]
async fn write_private(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
	fs::write(path, bytes).await
}
