// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! burrow - WireGuard egress provisioning for cloud VMs
//!
//! Stops the tunnel, rewrites `wg0.conf` with an SSH carve-out, runs the
//! remaining host setup, then brings the tunnel back and checks that egress
//! actually moved.

mod commands;
mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use burrow_config::{load_config, CliOverrides, ValidationScope};
use burrow_provision::LockError;
use clap::{Args as ClapArgs, Parser, Subcommand};
use console::style;

use crate::commands::{MarkerCommands, TunnelCommands};

/// Exit code when another run holds the lock.
const EXIT_LOCKED: u8 = 2;

/// burrow - tunnel provisioning with a guaranteed restore
#[derive(Parser, Debug)]
#[command(name = "burrow", version, about, long_about = None)]
struct Args {
	/// Configuration file layered over /etc/burrow/config.toml
	#[arg(short, long, env = "BURROW_CONFIG", global = true)]
	config: Option<PathBuf>,

	/// WireGuard interface name (unit wg-quick@<name>)
	#[arg(short, long, global = true)]
	interface: Option<String>,

	/// Directory holding the run markers
	#[arg(long, global = true)]
	marker_dir: Option<PathBuf>,

	/// Run lock path
	#[arg(long, global = true)]
	lock_file: Option<PathBuf>,

	/// Append logs to this file (empty to disable)
	#[arg(long, global = true)]
	log_file: Option<PathBuf>,

	/// Output logs as JSON on stderr
	#[arg(long, global = true)]
	log_json: bool,

	#[command(subcommand)]
	command: Command,
}

#[derive(ClapArgs, Debug, Clone, Default)]
struct IdentityArgs {
	/// Public IP the host has without the tunnel
	#[arg(long)]
	expected_ip: Option<String>,

	/// Country code the host has without the tunnel
	#[arg(long)]
	expected_country: Option<String>,

	/// IP/geolocation oracle (https only)
	#[arg(long)]
	oracle_url: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Full run: check, stop tunnel, reconfigure, run steps, start and verify
	Provision(IdentityArgs),
	/// Confirm the host is directly connected with its expected identity
	Check(IdentityArgs),
	/// Confirm egress no longer matches the direct identity
	Verify(IdentityArgs),
	/// Print the tunnel config a run would write, key redacted
	Render,
	/// Control the tunnel unit
	Tunnel {
		#[command(subcommand)]
		command: TunnelCommands,
	},
	/// Inspect or arm the run markers
	Markers {
		#[command(subcommand)]
		command: MarkerCommands,
	},
}

impl Command {
	fn scope(&self) -> ValidationScope {
		match self {
			Command::Provision(_) => ValidationScope::Provision,
			Command::Check(_) | Command::Verify(_) => ValidationScope::Identity,
			Command::Render => ValidationScope::Tunnel,
			Command::Tunnel { .. } | Command::Markers { .. } => ValidationScope::Local,
		}
	}

	fn identity(&self) -> IdentityArgs {
		match self {
			Command::Provision(a) | Command::Check(a) | Command::Verify(a) => a.clone(),
			_ => IdentityArgs::default(),
		}
	}
}

impl From<&Args> for CliOverrides {
	fn from(args: &Args) -> Self {
		let identity = args.command.identity();
		CliOverrides {
			interface: args.interface.clone(),
			expected_ip: identity.expected_ip,
			expected_country: identity.expected_country,
			oracle_url: identity.oracle_url,
			marker_dir: args.marker_dir.clone(),
			lock_file: args.lock_file.clone(),
			log_file: args.log_file.clone(),
		}
	}
}

async fn run(args: Args) -> Result<u8> {
	let cfg = load_config(
		args.config.clone(),
		CliOverrides::from(&args),
		args.command.scope(),
	)
	.context("failed to load configuration")?;

	logging::init_logging(args.log_json, cfg.run.log_file.as_deref());

	match args.command {
		Command::Provision(_) => commands::provision::handle(&cfg).await,
		Command::Check(_) => commands::check::handle_check(&cfg).await.map(|()| 0),
		Command::Verify(_) => commands::check::handle_verify(&cfg).await.map(|()| 0),
		Command::Render => commands::render::handle_render(&cfg).await.map(|()| 0),
		Command::Tunnel { command } => commands::tunnel::handle(command, &cfg).await.map(|()| 0),
		Command::Markers { command } => commands::markers::handle(command, &cfg).await.map(|()| 0),
	}
}

fn exit_code_for(err: &anyhow::Error) -> u8 {
	match err.downcast_ref::<LockError>() {
		Some(LockError::AlreadyHeld { .. }) => EXIT_LOCKED,
		_ => 1,
	}
}

#[tokio::main]
async fn main() -> ExitCode {
	let args = Args::parse();

	match run(args).await {
		Ok(code) => ExitCode::from(code),
		Err(e) => {
			eprintln!("{} {e:#}", style("error:").red().bold());
			ExitCode::from(exit_code_for(&e))
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use clap::CommandFactory;

	#[test]
	fn cli_definition_is_consistent() {
		Args::command().debug_assert();
	}

	#[test]
	fn provision_flags_become_overrides() {
		let args = Args::try_parse_from([
			"burrow",
			"--interface",
			"wg1",
			"provision",
			"--expected-ip",
			"203.0.113.5",
			"--expected-country",
			"JP",
		])
		.unwrap();
		assert_eq!(args.command.scope(), ValidationScope::Provision);

		let overrides = CliOverrides::from(&args);
		assert_eq!(overrides.interface.as_deref(), Some("wg1"));
		assert_eq!(overrides.expected_ip.as_deref(), Some("203.0.113.5"));
		assert_eq!(overrides.expected_country.as_deref(), Some("JP"));
	}

	#[test]
	fn global_flags_after_subcommand() {
		let args = Args::try_parse_from([
			"burrow",
			"markers",
			"status",
			"--marker-dir",
			"/tmp/m",
		])
		.unwrap();
		assert!(matches!(
			args.command,
			Command::Markers {
				command: MarkerCommands::Status
			}
		));
		assert_eq!(args.marker_dir, Some(PathBuf::from("/tmp/m")));
		assert_eq!(args.command.scope(), ValidationScope::Local);
	}

	#[test]
	fn tunnel_commands_parse() {
		let args = Args::try_parse_from(["burrow", "tunnel", "down"]).unwrap();
		assert!(matches!(
			args.command,
			Command::Tunnel {
				command: TunnelCommands::Down
			}
		));
	}

	#[test]
	fn held_lock_maps_to_exit_two() {
		let err = anyhow::Error::from(LockError::AlreadyHeld {
			path: PathBuf::from("/run/burrow.lock"),
		});
		assert_eq!(exit_code_for(&err), EXIT_LOCKED);
		assert_eq!(exit_code_for(&anyhow::anyhow!("anything else")), 1);
	}
}
