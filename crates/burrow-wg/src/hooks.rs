// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Structural view of the `PostUp`/`PreDown` directives in a rendered config.
//!
//! Each directive is reduced to the object it touches (`ip route`,
//! `ip rule`, `iptables -t mangle OUTPUT`), an add/delete verb and the
//! remaining arguments. A `PreDown` reverses a `PostUp` when it touches the
//! same object with the same arguments and the opposite verb.

use crate::error::HookError;
use std::fmt;

const IGNORE_FAILURE: &str = "|| true";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
	Add,
	Del,
}

impl Verb {
	pub fn inverse(self) -> Self {
		match self {
			Verb::Add => Verb::Del,
			Verb::Del => Verb::Add,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HookAction {
	pub object: String,
	pub verb: Verb,
	pub args: Vec<String>,
}

impl HookAction {
	pub fn inverse(&self) -> Self {
		Self {
			object: self.object.clone(),
			verb: self.verb.inverse(),
			args: self.args.clone(),
		}
	}

	/// Parses one shell directive. A trailing `|| true` is accepted and
	/// ignored.
	pub fn parse(line: &str) -> Result<Self, HookError> {
		let unrecognised = || HookError::Unrecognised(line.trim().to_string());
		let command = line
			.trim()
			.strip_suffix(IGNORE_FAILURE)
			.unwrap_or(line.trim())
			.trim();
		let tokens: Vec<&str> = command.split_whitespace().collect();

		match tokens.first().copied() {
			Some("ip") => parse_ip(&tokens[1..]).ok_or_else(unrecognised),
			Some(bin @ ("iptables" | "ip6tables")) => {
				parse_iptables(bin, &tokens[1..]).ok_or_else(unrecognised)
			}
			_ => Err(unrecognised()),
		}
	}
}

fn parse_ip(tokens: &[&str]) -> Option<HookAction> {
	let (family, rest) = match tokens.first().copied() {
		Some(flag @ ("-4" | "-6")) => (Some(flag), &tokens[1..]),
		_ => (None, tokens),
	};
	let kind = *rest.first()?;
	if !matches!(kind, "route" | "rule") {
		return None;
	}
	let verb = match *rest.get(1)? {
		"add" => Verb::Add,
		"del" | "delete" => Verb::Del,
		_ => return None,
	};
	let object = match family {
		Some(flag) => format!("ip {flag} {kind}"),
		None => format!("ip {kind}"),
	};
	Some(HookAction {
		object,
		verb,
		args: rest[2..].iter().map(|s| s.to_string()).collect(),
	})
}

fn parse_iptables(bin: &str, tokens: &[&str]) -> Option<HookAction> {
	let mut table = "filter";
	let mut chain = None;
	let mut verb = None;
	let mut args = Vec::new();

	let mut i = 0;
	while i < tokens.len() {
		match tokens[i] {
			"-t" | "--table" => {
				table = tokens.get(i + 1)?;
				i += 2;
			}
			flag @ ("-A" | "--append" | "-I" | "--insert" | "-D" | "--delete") => {
				verb = Some(if matches!(flag, "-D" | "--delete") {
					Verb::Del
				} else {
					Verb::Add
				});
				chain = Some(*tokens.get(i + 1)?);
				i += 2;
				// `-I CHAIN 1` carries an optional position.
				if matches!(flag, "-I" | "--insert")
					&& tokens.get(i).is_some_and(|t| t.parse::<u32>().is_ok())
				{
					i += 1;
				}
			}
			other => {
				args.push(other.to_string());
				i += 1;
			}
		}
	}

	Some(HookAction {
		object: format!("{bin} -t {table} {}", chain?),
		verb: verb?,
		args,
	})
}

impl fmt::Display for HookAction {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let verb = match self.verb {
			Verb::Add => "add",
			Verb::Del => "del",
		};
		write!(f, "{} {} {}", self.object, verb, self.args.join(" "))
	}
}

/// One forward directive and the directive that undoes it, as shell text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookPair {
	pub post_up: String,
	pub pre_down: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Hooks {
	pub post_up: Vec<HookAction>,
	pub pre_down: Vec<HookAction>,
}

/// Extracts the `PostUp` and `PreDown` directives from config text.
pub fn parse_hooks(text: &str) -> Result<Hooks, HookError> {
	let mut hooks = Hooks::default();
	for line in text.lines() {
		let Some((key, value)) = line.split_once('=') else {
			continue;
		};
		match key.trim() {
			"PostUp" => hooks.post_up.push(HookAction::parse(value)?),
			"PreDown" => hooks.pre_down.push(HookAction::parse(value)?),
			_ => {}
		}
	}
	Ok(hooks)
}

/// Checks that every `PostUp` is reversed by exactly one `PreDown` and that
/// no `PreDown` is left over. Returns the number of pairs.
pub fn pair_hooks(hooks: &Hooks) -> Result<usize, HookError> {
	for up in &hooks.post_up {
		let wanted = up.inverse();
		match hooks.pre_down.iter().filter(|d| **d == wanted).count() {
			0 => return Err(HookError::Unreversed(up.to_string())),
			1 => {}
			_ => return Err(HookError::ReversedTwice(up.to_string())),
		}
	}
	for down in &hooks.pre_down {
		let forward = down.inverse();
		if !hooks.post_up.contains(&forward) {
			return Err(HookError::Orphan(down.to_string()));
		}
	}
	Ok(hooks.post_up.len())
}
