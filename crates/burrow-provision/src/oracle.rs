// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::net::IpAddr;

use async_trait::async_trait;
use burrow_common_http::{new_client, require_https, retry, RetryConfig};
use serde::Deserialize;
use tracing::{debug, instrument};
use url::Url;

use crate::error::ConnectivityError;

/// Public identity of the host as seen from outside.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EgressIdentity {
	pub ip: IpAddr,
	pub country: String,
}

impl EgressIdentity {
	/// ASCII case-insensitive.
	pub fn in_country(&self, country: &str) -> bool {
		self.country.eq_ignore_ascii_case(country.trim())
	}
}

/// Read-only network probes used before and after the tunnel change.
#[async_trait]
pub trait NetworkProbe: Send + Sync {
	async fn resolve(&self, host: &str) -> Result<Vec<IpAddr>, ConnectivityError>;
	async fn observe(&self) -> Result<EgressIdentity, ConnectivityError>;
}

#[derive(Debug, Deserialize)]
struct OracleResponse {
	ip: Option<String>,
	country: Option<String>,
}

/// IP/geolocation oracle queried over HTTPS, e.g. `https://ipinfo.io/json`.
pub struct HttpOracle {
	client: reqwest::Client,
	url: Url,
	retry: RetryConfig,
}

impl HttpOracle {
	pub fn new(url: Url) -> Result<Self, ConnectivityError> {
		require_https(&url)?;
		Ok(Self {
			client: new_client()?,
			url,
			retry: RetryConfig::default(),
		})
	}

	pub fn with_retry(mut self, retry: RetryConfig) -> Self {
		self.retry = retry;
		self
	}

	async fn fetch(&self) -> Result<EgressIdentity, ConnectivityError> {
		let response = self
			.client
			.get(self.url.clone())
			.header(reqwest::header::ACCEPT, "application/json")
			.send()
			.await?;

		let status = response.status();
		if !status.is_success() {
			return Err(ConnectivityError::OracleStatus { status });
		}

		let body: OracleResponse = response
			.json()
			.await
			.map_err(|e| ConnectivityError::InvalidResponse(e.to_string()))?;
		parse_identity(body)
	}
}

fn parse_identity(body: OracleResponse) -> Result<EgressIdentity, ConnectivityError> {
	let raw_ip = body
		.ip
		.filter(|s| !s.trim().is_empty())
		.ok_or_else(|| ConnectivityError::InvalidResponse("missing `ip`".to_string()))?;
	let ip = raw_ip
		.trim()
		.parse::<IpAddr>()
		.map_err(|_| ConnectivityError::InvalidResponse(format!("`ip` is not an address: {raw_ip:?}")))?;
	let country = body
		.country
		.map(|c| c.trim().to_string())
		.filter(|c| !c.is_empty())
		.ok_or_else(|| ConnectivityError::InvalidResponse("missing `country`".to_string()))?;
	Ok(EgressIdentity { ip, country })
}

#[async_trait]
impl NetworkProbe for HttpOracle {
	#[instrument(skip(self))]
	async fn resolve(&self, host: &str) -> Result<Vec<IpAddr>, ConnectivityError> {
		let addrs: Vec<IpAddr> = tokio::net::lookup_host((host, 443))
			.await
			.map_err(|source| ConnectivityError::Dns {
				host: host.to_string(),
				source,
			})?
			.map(|sa| sa.ip())
			.collect();
		debug!(count = addrs.len(), "resolved");
		Ok(addrs)
	}

	#[instrument(skip(self), fields(url = %self.url))]
	async fn observe(&self) -> Result<EgressIdentity, ConnectivityError> {
		let identity = retry(&self.retry, || self.fetch()).await?;
		debug!(observed_ip = %identity.ip, observed_country = %identity.country, "oracle answered");
		Ok(identity)
	}
}
