// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::error::KeyError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// Length of a padded base64 Curve25519 key as `wg genkey` prints it.
pub const ENCODED_KEY_LEN: usize = 44;

const KEY_LEN: usize = 32;

/// Checks that `encoded` is a WireGuard key: 44 characters of padded
/// base64 decoding to 32 bytes.
pub fn check_key(encoded: &str) -> Result<(), KeyError> {
	if encoded.len() != ENCODED_KEY_LEN {
		return Err(KeyError::InvalidEncodedLength(encoded.len()));
	}
	let bytes = STANDARD.decode(encoded)?;
	if bytes.len() != KEY_LEN {
		return Err(KeyError::InvalidLength(bytes.len()));
	}
	Ok(())
}
