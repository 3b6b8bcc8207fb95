// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Best-effort status callback for operator dashboards.

use std::time::Duration;

use async_trait::async_trait;
use burrow_common_http::{new_client_with_timeout, require_https};
use burrow_common_secret::SecretString;
use burrow_config::StatusSettings;
use serde::Serialize;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::error::ConnectivityError;

const STATUS_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
	Running,
	Failed,
	Done,
}

/// Never fails: a reporter that cannot deliver logs and moves on.
#[async_trait]
pub trait StatusReporter: Send + Sync {
	async fn report(&self, status: RunStatus, message: Option<&str>);
}

pub struct NoopStatusReporter;

#[async_trait]
impl StatusReporter for NoopStatusReporter {
	async fn report(&self, status: RunStatus, _message: Option<&str>) {
		debug!(?status, "status callback not configured");
	}
}

#[derive(Debug, Serialize)]
struct StatusPayload<'a> {
	host: &'a str,
	status: RunStatus,
	#[serde(skip_serializing_if = "Option::is_none")]
	message: Option<&'a str>,
}

pub struct HttpStatusReporter {
	client: reqwest::Client,
	url: Url,
	token: Option<SecretString>,
	host: String,
}

impl HttpStatusReporter {
	pub fn new(url: Url, host: impl Into<String>) -> Result<Self, ConnectivityError> {
		require_https(&url)?;
		Ok(Self {
			client: new_client_with_timeout(STATUS_TIMEOUT)?,
			url,
			token: None,
			host: host.into(),
		})
	}

	/// `fallback_host` is used when the settings do not name the host.
	pub fn from_settings(
		settings: &StatusSettings,
		fallback_host: &str,
	) -> Result<Self, ConnectivityError> {
		let host = settings.host.as_deref().unwrap_or(fallback_host);
		let mut reporter = Self::new(settings.url.clone(), host)?;
		reporter.token = settings.token.clone();
		Ok(reporter)
	}

	pub fn with_token(mut self, token: SecretString) -> Self {
		self.token = Some(token);
		self
	}

	async fn post(&self, payload: &StatusPayload<'_>) -> reqwest::Result<()> {
		let mut request = self.client.post(self.url.clone()).json(payload);
		if let Some(token) = &self.token {
			request = request.bearer_auth(token.expose());
		}
		request.send().await?.error_for_status()?;
		Ok(())
	}
}

#[async_trait]
impl StatusReporter for HttpStatusReporter {
	#[instrument(skip(self, message), fields(host = %self.host))]
	async fn report(&self, status: RunStatus, message: Option<&str>) {
		let payload = StatusPayload {
			host: &self.host,
			status,
			message,
		};
		match self.post(&payload).await {
			Ok(()) => debug!("status reported"),
			Err(e) => warn!(error = %e, "status callback failed"),
		}
	}
}
