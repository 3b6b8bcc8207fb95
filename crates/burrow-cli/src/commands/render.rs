// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use anyhow::Result;
use burrow_config::ProvisionConfig;
use burrow_provision::detect_routing;
use burrow_wg::render_config;

use super::system_runner;

/// Prints the config a run would write, with the private key redacted.
/// Routing is read from the live table, so the output reflects the current
/// default route.
pub async fn handle_render(cfg: &ProvisionConfig) -> Result<()> {
	let runner = system_runner();
	let snapshot = detect_routing(runner.as_ref()).await?;
	let text = render_config(&snapshot, &cfg.tunnel)?;
	print!("{}", text.redacted());
	Ok(())
}
