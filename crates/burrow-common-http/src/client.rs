// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use reqwest::{Client, ClientBuilder};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Default request timeout. The oracle and the status callback are small
/// JSON exchanges; anything slower than this is treated as unreachable.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
#[error("URL must use https://: {0}")]
pub struct InsecureUrl(pub String);

/// Creates a client with the standard User-Agent and default timeout.
pub fn new_client() -> reqwest::Result<Client> {
	new_client_with_timeout(DEFAULT_TIMEOUT)
}

/// Creates a client with the standard User-Agent and the given timeout.
pub fn new_client_with_timeout(timeout: Duration) -> reqwest::Result<Client> {
	builder().timeout(timeout).build()
}

/// Client builder preloaded with the burrow User-Agent.
pub fn builder() -> ClientBuilder {
	Client::builder().user_agent(user_agent())
}

/// Format: `burrow/{version}/{os}-{arch}`
pub fn user_agent() -> String {
	format!(
		"burrow/{}/{}-{}",
		env!("CARGO_PKG_VERSION"),
		std::env::consts::OS,
		std::env::consts::ARCH
	)
}

/// Rejects anything that is not `https://`.
pub fn require_https(url: &Url) -> Result<(), InsecureUrl> {
	if url.scheme() != "https" {
		return Err(InsecureUrl(url.to_string()));
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn user_agent_has_three_segments() {
		let ua = user_agent();
		let parts: Vec<&str> = ua.split('/').collect();
		assert_eq!(parts.len(), 3);
		assert_eq!(parts[0], "burrow");
		assert_eq!(parts[1], env!("CARGO_PKG_VERSION"));
	}

	#[test]
	fn client_builds() {
		assert!(new_client().is_ok());
	}

	#[test]
	fn https_is_required() {
		let ok: Url = "https://ipinfo.io/json".parse().unwrap();
		let plain: Url = "http://ipinfo.io/json".parse().unwrap();
		assert!(require_https(&ok).is_ok());
		assert!(require_https(&plain).is_err());
	}
}
