// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::config::{is_safe_name, RoutingPolicy, TunnelConfig};
use crate::endpoint::is_clean_host;
use crate::error::ConfigRenderError;
use crate::hooks::HookPair;
use crate::keys::check_key;
use crate::routing::RoutingSnapshot;
use burrow_common_secret::{SecretString, REDACTED};
use std::net::IpAddr;

/// Full-tunnel routing: everything not carved out goes through the peer.
const ALLOWED_IPS: &str = "0.0.0.0/0, ::/0";

/// Rendered `wg0.conf`. Holds the private key, so it is a secret too.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigText(SecretString);

impl ConfigText {
	pub fn expose(&self) -> &str {
		self.0.expose()
	}

	/// The same text with the `PrivateKey` value blanked out, for display.
	pub fn redacted(&self) -> String {
		let mut out = String::with_capacity(self.expose().len());
		for line in self.expose().lines() {
			match line.split_once('=') {
				Some((key, _)) if key.trim() == "PrivateKey" => {
					out.push_str("PrivateKey = ");
					out.push_str(REDACTED);
				}
				_ => out.push_str(line),
			}
			out.push('\n');
		}
		out
	}
}

/// The SSH carve-out as PostUp/PreDown pairs, in PostUp order.
pub fn routing_hooks(snapshot: &RoutingSnapshot, policy: &RoutingPolicy) -> Vec<HookPair> {
	let (ip, iptables) = match snapshot.default_gateway {
		IpAddr::V4(_) => ("ip", "iptables"),
		IpAddr::V6(_) => ("ip -6", "ip6tables"),
	};
	let route = format!(
		"route {{}} default via {} dev {} table {}",
		snapshot.default_gateway, snapshot.egress_interface, policy.table_name
	);
	let rule = format!("rule {{}} fwmark {} table {}", policy.fwmark, policy.table_name);
	let mark = format!(
		"-t mangle {{}} OUTPUT -p tcp --sport {} -j MARK --set-mark {}",
		policy.ssh_port, policy.fwmark
	);

	vec![
		HookPair {
			post_up: format!("{ip} {}", route.replace("{}", "add")),
			pre_down: format!("{ip} {} || true", route.replace("{}", "del")),
		},
		HookPair {
			post_up: format!("{ip} {}", rule.replace("{}", "add")),
			pre_down: format!("{ip} {} || true", rule.replace("{}", "del")),
		},
		HookPair {
			post_up: format!("{iptables} {}", mark.replace("{}", "-A")),
			pre_down: format!("{iptables} {} || true", mark.replace("{}", "-D")),
		},
	]
}

fn join<T: ToString>(items: &[T]) -> String {
	items
		.iter()
		.map(ToString::to_string)
		.collect::<Vec<_>>()
		.join(", ")
}

/// Renders the interface and peer sections. Output depends only on the
/// arguments. PreDown lines undo the PostUp lines in reverse order.
pub fn render_config(
	snapshot: &RoutingSnapshot,
	cfg: &TunnelConfig,
) -> Result<ConfigText, ConfigRenderError> {
	if cfg.private_key.is_blank() {
		return Err(ConfigRenderError::MissingField("private_key"));
	}
	if cfg.local_addresses.is_empty() {
		return Err(ConfigRenderError::MissingField("local_addresses"));
	}
	if cfg.peer_public_key.trim().is_empty() {
		return Err(ConfigRenderError::MissingField("peer_public_key"));
	}
	let endpoint = cfg
		.peer_endpoint
		.as_ref()
		.ok_or(ConfigRenderError::MissingField("peer_endpoint"))?;

	check_key(cfg.private_key.expose()).map_err(|source| ConfigRenderError::InvalidKey {
		field: "private_key",
		source,
	})?;
	check_key(&cfg.peer_public_key).map_err(|source| ConfigRenderError::InvalidKey {
		field: "peer_public_key",
		source,
	})?;
	if !is_clean_host(endpoint.host()) {
		return Err(ConfigRenderError::UnsafeHost(endpoint.host().to_string()));
	}
	if !is_safe_name(&cfg.routing.table_name) {
		return Err(ConfigRenderError::UnsafeName {
			field: "table_name",
			value: cfg.routing.table_name.clone(),
		});
	}
	if !is_safe_name(&snapshot.egress_interface) {
		return Err(ConfigRenderError::UnsafeName {
			field: "egress_interface",
			value: snapshot.egress_interface.clone(),
		});
	}

	let hooks = routing_hooks(snapshot, &cfg.routing);

	let mut lines = vec![
		"[Interface]".to_string(),
		format!("PrivateKey = {}", cfg.private_key.expose()),
		format!("Address = {}", join(&cfg.local_addresses)),
	];
	if !cfg.dns_servers.is_empty() {
		lines.push(format!("DNS = {}", join(&cfg.dns_servers)));
	}
	lines.push(format!("MTU = {}", cfg.mtu));
	for pair in &hooks {
		lines.push(format!("PostUp = {}", pair.post_up));
	}
	for pair in hooks.iter().rev() {
		lines.push(format!("PreDown = {}", pair.pre_down));
	}
	lines.push(String::new());
	lines.push("[Peer]".to_string());
	lines.push(format!("PublicKey = {}", cfg.peer_public_key));
	lines.push(format!("Endpoint = {endpoint}"));
	lines.push(format!("PersistentKeepalive = {}", cfg.keepalive_seconds));
	lines.push(format!("AllowedIPs = {ALLOWED_IPS}"));

	let mut text = lines.join("\n");
	text.push('\n');
	Ok(ConfigText(SecretString::new(text)))
}
