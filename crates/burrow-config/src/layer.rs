// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Partial configuration layer for merging from multiple sources.

use burrow_common_secret::SecretString;
use serde::Deserialize;
use std::path::PathBuf;

/// Partial configuration layer - all fields are Option for merging.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigLayer {
	#[serde(default)]
	pub interface: Option<InterfaceLayer>,
	#[serde(default)]
	pub peer: Option<PeerLayer>,
	#[serde(default)]
	pub routing: Option<RoutingLayer>,
	#[serde(default)]
	pub service: Option<ServiceLayer>,
	#[serde(default)]
	pub oracle: Option<OracleLayer>,
	#[serde(default)]
	pub run: Option<RunLayer>,
	#[serde(default)]
	pub status: Option<StatusLayer>,
	/// Replaced wholesale by a higher layer, never concatenated.
	#[serde(default)]
	pub steps: Option<Vec<StepLayer>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InterfaceLayer {
	#[serde(default)]
	pub name: Option<String>,
	#[serde(default)]
	pub private_key: Option<SecretString>,
	#[serde(default)]
	pub addresses: Option<Vec<String>>,
	#[serde(default)]
	pub dns: Option<Vec<String>>,
	#[serde(default)]
	pub mtu: Option<u16>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PeerLayer {
	#[serde(default)]
	pub public_key: Option<String>,
	#[serde(default)]
	pub endpoint: Option<String>,
	#[serde(default)]
	pub persistent_keepalive: Option<u16>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RoutingLayer {
	#[serde(default)]
	pub table_id: Option<u32>,
	#[serde(default)]
	pub table_name: Option<String>,
	#[serde(default)]
	pub fwmark: Option<u32>,
	#[serde(default)]
	pub ssh_port: Option<u16>,
	#[serde(default)]
	pub rt_tables: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceLayer {
	#[serde(default)]
	pub poll_attempts: Option<u32>,
	#[serde(default)]
	pub poll_interval_ms: Option<u64>,
	#[serde(default)]
	pub busy_attempts: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OracleLayer {
	#[serde(default)]
	pub url: Option<String>,
	#[serde(default)]
	pub probe_host: Option<String>,
	#[serde(default)]
	pub expected_ip: Option<String>,
	#[serde(default)]
	pub expected_country: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RunLayer {
	#[serde(default)]
	pub marker_dir: Option<PathBuf>,
	#[serde(default)]
	pub lock_file: Option<PathBuf>,
	/// An empty path disables the log file.
	#[serde(default)]
	pub log_file: Option<PathBuf>,
	#[serde(default)]
	pub login_notice: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusLayer {
	#[serde(default)]
	pub url: Option<String>,
	#[serde(default)]
	pub token: Option<SecretString>,
	#[serde(default)]
	pub host: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StepLayer {
	pub name: String,
	pub command: Vec<String>,
}

impl ConfigLayer {
	/// Merge another layer into this one (other takes precedence).
	pub fn merge(&mut self, other: ConfigLayer) {
		merge_option(&mut self.interface, other.interface, InterfaceLayer::merge);
		merge_option(&mut self.peer, other.peer, PeerLayer::merge);
		merge_option(&mut self.routing, other.routing, RoutingLayer::merge);
		merge_option(&mut self.service, other.service, ServiceLayer::merge);
		merge_option(&mut self.oracle, other.oracle, OracleLayer::merge);
		merge_option(&mut self.run, other.run, RunLayer::merge);
		merge_option(&mut self.status, other.status, StatusLayer::merge);
		if other.steps.is_some() {
			self.steps = other.steps;
		}
	}
}

fn merge_option<T, F>(target: &mut Option<T>, source: Option<T>, merge_fn: F)
where
	F: FnOnce(&mut T, T),
{
	match (target.as_mut(), source) {
		(Some(t), Some(s)) => merge_fn(t, s),
		(None, Some(s)) => *target = Some(s),
		_ => {}
	}
}

macro_rules! take_some {
	($target:ident, $other:ident, $($field:ident),+ $(,)?) => {
		$(
			if $other.$field.is_some() {
				$target.$field = $other.$field;
			}
		)+
	};
}

impl InterfaceLayer {
	fn merge(&mut self, other: InterfaceLayer) {
		take_some!(self, other, name, private_key, addresses, dns, mtu);
	}
}

impl PeerLayer {
	fn merge(&mut self, other: PeerLayer) {
		take_some!(self, other, public_key, endpoint, persistent_keepalive);
	}
}

impl RoutingLayer {
	fn merge(&mut self, other: RoutingLayer) {
		take_some!(self, other, table_id, table_name, fwmark, ssh_port, rt_tables);
	}
}

impl ServiceLayer {
	fn merge(&mut self, other: ServiceLayer) {
		take_some!(self, other, poll_attempts, poll_interval_ms, busy_attempts);
	}
}

impl OracleLayer {
	fn merge(&mut self, other: OracleLayer) {
		take_some!(self, other, url, probe_host, expected_ip, expected_country);
	}
}

impl RunLayer {
	fn merge(&mut self, other: RunLayer) {
		take_some!(self, other, marker_dir, lock_file, log_file, login_notice);
	}
}

impl StatusLayer {
	fn merge(&mut self, other: StatusLayer) {
		take_some!(self, other, url, token, host);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	#[test]
	fn parses_a_full_file() {
		let toml = r#"
[interface]
name = "wg1"
private_key = "yAnz5TF+lXXJte14tji3zlMNq+hd2rYUIgJBgB3fBmk="
addresses = ["10.8.0.2/32"]
dns = ["1.1.1.1"]

[peer]
public_key = "xTIBA5rboUvnH4htodjb6e697QjLERt1NAB4mZqp8Dg="
endpoint = "vpn.example.com:51820"

[oracle]
expected_ip = "203.0.113.5"
expected_country = "JP"

[[steps]]
name = "packages"
command = ["apt-get", "install", "-y", "zsh"]

[[steps]]
name = "dotfiles"
command = ["/usr/local/bin/dotfiles", "--apply"]
"#;
		let layer: ConfigLayer = toml::from_str(toml).unwrap();
		let iface = layer.interface.unwrap();
		assert_eq!(iface.name.as_deref(), Some("wg1"));
		assert!(!format!("{iface:?}").contains("yAnz5TF"));
		assert_eq!(layer.steps.unwrap().len(), 2);
		assert_eq!(layer.oracle.unwrap().expected_country.as_deref(), Some("JP"));
	}

	#[test]
	fn merge_overrides_only_set_fields() {
		let mut base: ConfigLayer = toml::from_str(
			r#"
[interface]
addresses = ["10.8.0.2/32"]
dns = ["1.1.1.1"]
"#,
		)
		.unwrap();
		let over: ConfigLayer = toml::from_str(
			r#"
[interface]
dns = ["9.9.9.9"]
"#,
		)
		.unwrap();
		base.merge(over);

		let iface = base.interface.unwrap();
		assert_eq!(iface.addresses.unwrap(), vec!["10.8.0.2/32"]);
		assert_eq!(iface.dns.unwrap(), vec!["9.9.9.9"]);
	}

	#[test]
	fn steps_are_replaced_not_appended() {
		let mut base: ConfigLayer =
			toml::from_str("[[steps]]\nname = \"a\"\ncommand = [\"true\"]\n").unwrap();
		let over: ConfigLayer =
			toml::from_str("[[steps]]\nname = \"b\"\ncommand = [\"false\"]\n").unwrap();
		base.merge(over);
		let steps = base.steps.unwrap();
		assert_eq!(steps.len(), 1);
		assert_eq!(steps[0].name, "b");
	}

	#[test]
	fn empty_layer_does_not_clear_values() {
		let mut base: ConfigLayer = toml::from_str("[routing]\nfwmark = 7\n").unwrap();
		base.merge(ConfigLayer::default());
		assert_eq!(base.routing.unwrap().fwmark, Some(7));
	}

	proptest! {
		#[test]
		fn later_layer_wins(first in 1u32..1000, second in proptest::option::of(1u32..1000)) {
			let mut merged = ConfigLayer {
				routing: Some(RoutingLayer { fwmark: Some(first), ..Default::default() }),
				..Default::default()
			};
			merged.merge(ConfigLayer {
				routing: Some(RoutingLayer { fwmark: second, ..Default::default() }),
				..Default::default()
			});
			let got = merged.routing.unwrap().fwmark;
			prop_assert_eq!(got, Some(second.unwrap_or(first)));
		}
	}
}
