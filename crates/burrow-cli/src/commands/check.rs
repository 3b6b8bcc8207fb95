// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! One-off oracle checks outside a provisioning run.

use anyhow::{Context, Result};
use burrow_config::ProvisionConfig;
use burrow_provision::{check_direct_connectivity, verify_tunneled, HttpOracle, NetworkProbe};
use console::style;

fn expected(cfg: &ProvisionConfig) -> Result<(std::net::IpAddr, &str)> {
	cfg.oracle
		.expected()
		.context("expected_ip and expected_country must be configured")
}

pub async fn handle_check(cfg: &ProvisionConfig) -> Result<()> {
	let (ip, country) = expected(cfg)?;
	let oracle = HttpOracle::new(cfg.oracle.url.clone())?;

	check_direct_connectivity(&oracle, &cfg.oracle.probe_host, ip, country).await?;
	if let Some(endpoint) = &cfg.tunnel.peer_endpoint {
		oracle.resolve(endpoint.host()).await?;
	}

	println!("{} Direct connectivity confirmed", style("✓").green().bold());
	println!("  Egress IP: {}", style(ip).cyan());
	println!("  Country:   {}", style(country).cyan());
	Ok(())
}

pub async fn handle_verify(cfg: &ProvisionConfig) -> Result<()> {
	let (ip, country) = expected(cfg)?;
	let oracle = HttpOracle::new(cfg.oracle.url.clone())?;

	verify_tunneled(&oracle, ip, country).await?;

	println!("{} Egress goes through the tunnel", style("✓").green().bold());
	println!("  Not {} ({})", style(ip).cyan(), style(country).cyan());
	Ok(())
}
