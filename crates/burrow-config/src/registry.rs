// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration registry - manages sources and merges layers.

use tracing::{debug, info};

use crate::layer::ConfigLayer;
use crate::runtime::ProvisionConfig;
use crate::sources::ConfigSource;
use crate::validation::{validate_config, ValidationScope};
use crate::ConfigError;

/// Registry that manages configuration sources and merges them.
pub struct ConfigRegistry {
	sources: Vec<Box<dyn ConfigSource>>,
}

impl ConfigRegistry {
	pub fn new() -> Self {
		Self {
			sources: Vec::new(),
		}
	}

	pub fn register(&mut self, source: Box<dyn ConfigSource>) {
		debug!(source = source.name(), precedence = ?source.precedence(), "registering config source");
		self.sources.push(source);
	}

	/// Merge all sources, lowest precedence first, then finalize and
	/// validate. A source that fails to load fails the whole load.
	pub fn load(&self, scope: ValidationScope) -> Result<ProvisionConfig, ConfigError> {
		let mut sorted_sources: Vec<_> = self.sources.iter().collect();
		sorted_sources.sort_by_key(|s| s.precedence());

		info!(
			source_count = sorted_sources.len(),
			"loading configuration from sources"
		);

		let mut merged = ConfigLayer::default();
		for source in &sorted_sources {
			let layer = source.load()?;
			debug!(source = source.name(), "merging config layer");
			merged.merge(layer);
		}

		let config = ProvisionConfig::from_layer(merged)?;
		validate_config(&config, scope)?;

		info!(
			interface = %config.service.interface,
			steps = config.steps.len(),
			status_callback = config.status.is_some(),
			?scope,
			"configuration loaded"
		);

		Ok(config)
	}

	pub fn source_count(&self) -> usize {
		self.sources.len()
	}
}

impl Default for ConfigRegistry {
	fn default() -> Self {
		Self::new()
	}
}
