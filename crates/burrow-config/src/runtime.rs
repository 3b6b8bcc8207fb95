// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Runtime configuration types with resolved defaults.

use burrow_common_secret::SecretString;
use burrow_wg::{
	config_path_for, Endpoint, RoutingPolicy, TunnelConfig, DEFAULT_KEEPALIVE_SECS, DEFAULT_MTU,
	DEFAULT_RT_TABLES,
};
use ipnet::IpNet;
use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

use crate::defaults;
use crate::layer::*;
use crate::ConfigError;

/// The final configuration for one provisioning run.
#[derive(Debug, Clone)]
pub struct ProvisionConfig {
	pub tunnel: TunnelConfig,
	pub rt_tables: PathBuf,
	pub service: ServiceSettings,
	pub oracle: OracleSettings,
	pub run: RunSettings,
	pub status: Option<StatusSettings>,
	pub steps: Vec<StepSettings>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSettings {
	pub interface: String,
	pub config_path: PathBuf,
	pub poll_attempts: u32,
	pub poll_interval: Duration,
	pub busy_attempts: u32,
}

impl ServiceSettings {
	/// systemd unit driving the interface.
	pub fn unit(&self) -> String {
		format!("wg-quick@{}", self.interface)
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleSettings {
	pub url: Url,
	pub probe_host: String,
	pub expected_ip: Option<IpAddr>,
	pub expected_country: Option<String>,
}

impl OracleSettings {
	/// The host's direct (pre-tunnel) identity, when fully configured.
	pub fn expected(&self) -> Option<(IpAddr, &str)> {
		match (self.expected_ip, self.expected_country.as_deref()) {
			(Some(ip), Some(country)) => Some((ip, country)),
			_ => None,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSettings {
	pub marker_dir: PathBuf,
	pub lock_file: PathBuf,
	pub log_file: Option<PathBuf>,
	pub login_notice: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusSettings {
	pub url: Url,
	pub token: Option<SecretString>,
	pub host: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepSettings {
	pub name: String,
	pub command: Vec<String>,
}

fn parse_each<T: std::str::FromStr>(field: &str, values: Vec<String>) -> Result<Vec<T>, ConfigError>
where
	T::Err: std::fmt::Display,
{
	values
		.iter()
		.map(|v| v.trim())
		.filter(|v| !v.is_empty())
		.map(|v| {
			v.parse::<T>()
				.map_err(|e| ConfigError::invalid_value(field, format!("{v:?}: {e}")))
		})
		.collect()
}

fn parse_url(field: &str, raw: &str) -> Result<Url, ConfigError> {
	Url::parse(raw).map_err(|e| ConfigError::invalid_value(field, format!("{raw:?}: {e}")))
}

fn non_empty(value: Option<String>) -> Option<String> {
	value
		.map(|v| v.trim().to_string())
		.filter(|v| !v.is_empty())
}

impl ProvisionConfig {
	/// Build from a merged layer, applying defaults and parsing typed
	/// fields. Presence of required values is checked by
	/// [`crate::validate_config`].
	pub fn from_layer(layer: ConfigLayer) -> Result<Self, ConfigError> {
		let iface = layer.interface.unwrap_or_default();
		let peer = layer.peer.unwrap_or_default();
		let routing = layer.routing.unwrap_or_default();
		let service = layer.service.unwrap_or_default();
		let oracle = layer.oracle.unwrap_or_default();
		let run = layer.run.unwrap_or_default();

		let local_addresses: Vec<IpNet> =
			parse_each("interface.addresses", iface.addresses.unwrap_or_default())?;
		let dns_servers: Vec<IpAddr> = parse_each("interface.dns", iface.dns.unwrap_or_default())?;
		let peer_endpoint = match non_empty(peer.endpoint) {
			Some(raw) => Some(
				raw.parse::<Endpoint>()
					.map_err(|e| ConfigError::invalid_value("peer.endpoint", e.to_string()))?,
			),
			None => None,
		};

		let default_policy = RoutingPolicy::default();
		let tunnel = TunnelConfig {
			private_key: iface.private_key.unwrap_or_else(|| SecretString::from("")),
			local_addresses,
			dns_servers,
			peer_public_key: peer.public_key.unwrap_or_default().trim().to_string(),
			peer_endpoint,
			mtu: iface.mtu.unwrap_or(DEFAULT_MTU),
			keepalive_seconds: peer.persistent_keepalive.unwrap_or(DEFAULT_KEEPALIVE_SECS),
			routing: RoutingPolicy {
				table_id: routing.table_id.unwrap_or(default_policy.table_id),
				table_name: non_empty(routing.table_name).unwrap_or(default_policy.table_name),
				fwmark: routing.fwmark.unwrap_or(default_policy.fwmark),
				ssh_port: routing.ssh_port.unwrap_or(default_policy.ssh_port),
			},
		};

		let interface = non_empty(iface.name).unwrap_or_else(|| defaults::INTERFACE.to_string());
		let service = ServiceSettings {
			config_path: config_path_for(&interface),
			interface,
			poll_attempts: service.poll_attempts.unwrap_or(defaults::POLL_ATTEMPTS),
			poll_interval: Duration::from_millis(
				service.poll_interval_ms.unwrap_or(defaults::POLL_INTERVAL_MS),
			),
			busy_attempts: service.busy_attempts.unwrap_or(defaults::BUSY_ATTEMPTS),
		};

		let oracle_url = non_empty(oracle.url).unwrap_or_else(|| defaults::ORACLE_URL.to_string());
		let expected_ip = match non_empty(oracle.expected_ip) {
			Some(raw) => Some(raw.parse::<IpAddr>().map_err(|e| {
				ConfigError::invalid_value("oracle.expected_ip", format!("{raw:?}: {e}"))
			})?),
			None => None,
		};
		let oracle = OracleSettings {
			url: parse_url("oracle.url", &oracle_url)?,
			probe_host: non_empty(oracle.probe_host)
				.unwrap_or_else(|| defaults::PROBE_HOST.to_string()),
			expected_ip,
			expected_country: non_empty(oracle.expected_country),
		};

		let log_file = match run.log_file {
			Some(path) if path.as_os_str().is_empty() => None,
			Some(path) => Some(path),
			None => Some(PathBuf::from(defaults::LOG_FILE)),
		};
		let run = RunSettings {
			marker_dir: run
				.marker_dir
				.unwrap_or_else(|| PathBuf::from(defaults::MARKER_DIR)),
			lock_file: run
				.lock_file
				.unwrap_or_else(|| PathBuf::from(defaults::LOCK_FILE)),
			log_file,
			login_notice: run
				.login_notice
				.unwrap_or_else(|| PathBuf::from(defaults::LOGIN_NOTICE)),
		};

		let status = match layer.status {
			Some(status) => match non_empty(status.url) {
				Some(raw) => Some(StatusSettings {
					url: parse_url("status.url", &raw)?,
					token: status.token.filter(|t| !t.is_blank()),
					host: non_empty(status.host),
				}),
				None => None,
			},
			None => None,
		};

		let steps = layer
			.steps
			.unwrap_or_default()
			.into_iter()
			.map(|s| StepSettings {
				name: s.name,
				command: s.command,
			})
			.collect();

		Ok(Self {
			tunnel,
			rt_tables: routing
				.rt_tables
				.unwrap_or_else(|| PathBuf::from(DEFAULT_RT_TABLES)),
			service,
			oracle,
			run,
			status,
			steps,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn layer(toml: &str) -> ConfigLayer {
		toml::from_str(toml).unwrap()
	}

	#[test]
	fn empty_layer_yields_defaults() {
		let cfg = ProvisionConfig::from_layer(ConfigLayer::default()).unwrap();
		assert_eq!(cfg.tunnel.mtu, 1280);
		assert_eq!(cfg.tunnel.keepalive_seconds, 25);
		assert_eq!(cfg.tunnel.routing, RoutingPolicy::default());
		assert_eq!(cfg.rt_tables, PathBuf::from("/etc/iproute2/rt_tables"));
		assert_eq!(cfg.service.unit(), "wg-quick@wg0");
		assert_eq!(cfg.service.config_path, PathBuf::from("/etc/wireguard/wg0.conf"));
		assert_eq!(cfg.service.poll_attempts, 30);
		assert_eq!(cfg.service.poll_interval, Duration::from_secs(1));
		assert_eq!(cfg.service.busy_attempts, 120);
		assert_eq!(cfg.oracle.url.as_str(), "https://ipinfo.io/json");
		assert_eq!(cfg.oracle.probe_host, "www.google.com");
		assert_eq!(cfg.oracle.expected(), None);
		assert_eq!(cfg.run.marker_dir, PathBuf::from("/root"));
		assert_eq!(cfg.run.lock_file, PathBuf::from("/run/burrow.lock"));
		assert_eq!(cfg.run.log_file, Some(PathBuf::from("/var/log/burrow.log")));
		assert_eq!(cfg.run.login_notice, PathBuf::from("/etc/motd.d/99-burrow"));
		assert!(cfg.status.is_none());
		assert!(cfg.steps.is_empty());
	}

	#[test]
	fn typed_fields_are_parsed() {
		let cfg = ProvisionConfig::from_layer(layer(
			r#"
[interface]
name = "wg1"
addresses = ["10.8.0.2/32", "fd00::2/128"]
dns = ["1.1.1.1"]

[peer]
endpoint = "vpn.example.com:51820"

[oracle]
expected_ip = "203.0.113.5"
expected_country = "JP"
"#,
		))
		.unwrap();
		assert_eq!(cfg.tunnel.local_addresses.len(), 2);
		assert_eq!(cfg.tunnel.peer_endpoint.unwrap().port(), 51820);
		assert_eq!(cfg.service.unit(), "wg-quick@wg1");
		assert_eq!(cfg.service.config_path, PathBuf::from("/etc/wireguard/wg1.conf"));
		let (ip, country) = cfg.oracle.expected().unwrap();
		assert_eq!(ip.to_string(), "203.0.113.5");
		assert_eq!(country, "JP");
	}

	#[test]
	fn malformed_values_name_the_field() {
		let err = ProvisionConfig::from_layer(layer("[interface]\naddresses = [\"10.8.0.300/32\"]\n"))
			.unwrap_err();
		assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "interface.addresses"));

		let err = ProvisionConfig::from_layer(layer("[interface]\ndns = [\"one.one.one.one\"]\n"))
			.unwrap_err();
		assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "interface.dns"));

		let err = ProvisionConfig::from_layer(layer("[peer]\nendpoint = \"vpn.example.com\"\n"))
			.unwrap_err();
		assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "peer.endpoint"));

		let err = ProvisionConfig::from_layer(layer("[oracle]\nexpected_ip = \"localhost\"\n"))
			.unwrap_err();
		assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "oracle.expected_ip"));
	}

	#[test]
	fn empty_log_file_disables_it() {
		let cfg = ProvisionConfig::from_layer(layer("[run]\nlog_file = \"\"\n")).unwrap();
		assert_eq!(cfg.run.log_file, None);
	}

	#[test]
	fn status_requires_a_url() {
		let cfg = ProvisionConfig::from_layer(layer("[status]\nhost = \"dev-1\"\n")).unwrap();
		assert!(cfg.status.is_none());

		let cfg = ProvisionConfig::from_layer(layer(
			"[status]\nurl = \"https://status.example.com/hosts\"\ntoken = \"t0k\"\n",
		))
		.unwrap();
		let status = cfg.status.unwrap();
		assert_eq!(status.url.host_str(), Some("status.example.com"));
		assert_eq!(status.token.unwrap().expose(), "t0k");
		assert_eq!(status.host, None);
	}
}
