// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::error::EndpointError;
use std::fmt;
use std::net::Ipv6Addr;
use std::str::FromStr;

/// Peer endpoint as written in the `[Peer]` section: `host:port` or
/// `[v6-literal]:port`. The host is kept as given; resolution happens at
/// provisioning time while the direct route is still up.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
	host: String,
	port: u16,
}

impl Endpoint {
	pub fn new(host: impl Into<String>, port: u16) -> Self {
		Self {
			host: host.into(),
			port,
		}
	}

	pub fn host(&self) -> &str {
		&self.host
	}

	pub fn port(&self) -> u16 {
		self.port
	}
}

/// True when `host` can be written on a single config line.
pub fn is_clean_host(host: &str) -> bool {
	!host.chars().any(|c| c.is_whitespace() || c.is_control())
}

fn parse_port(raw: &str, port: &str) -> Result<u16, EndpointError> {
	match port.parse::<u16>() {
		Ok(0) | Err(_) => Err(EndpointError::InvalidPort(raw.to_string())),
		Ok(p) => Ok(p),
	}
}

impl FromStr for Endpoint {
	type Err = EndpointError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let raw = s.trim();
		if raw.is_empty() {
			return Err(EndpointError::Empty);
		}

		if let Some(rest) = raw.strip_prefix('[') {
			let (host, tail) = rest
				.split_once(']')
				.ok_or_else(|| EndpointError::MissingPort(raw.to_string()))?;
			let port = tail
				.strip_prefix(':')
				.ok_or_else(|| EndpointError::MissingPort(raw.to_string()))?;
			if host.parse::<Ipv6Addr>().is_err() {
				return Err(EndpointError::EmptyHost(raw.to_string()));
			}
			return Ok(Self::new(host, parse_port(raw, port)?));
		}

		let (host, port) = raw
			.rsplit_once(':')
			.ok_or_else(|| EndpointError::MissingPort(raw.to_string()))?;
		if host.contains(':') {
			return Err(EndpointError::UnbracketedIpv6(raw.to_string()));
		}
		if host.is_empty() {
			return Err(EndpointError::EmptyHost(raw.to_string()));
		}
		if !is_clean_host(host) {
			return Err(EndpointError::InvalidHost(raw.to_string()));
		}
		Ok(Self::new(host, parse_port(raw, port)?))
	}
}

impl fmt::Display for Endpoint {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		if self.host.contains(':') {
			write!(f, "[{}]:{}", self.host, self.port)
		} else {
			write!(f, "{}:{}", self.host, self.port)
		}
	}
}
