// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EndpointError {
	#[error("endpoint is empty")]
	Empty,

	#[error("endpoint {0:?} has no port (expected host:port)")]
	MissingPort(String),

	#[error("endpoint {0:?} has an invalid port")]
	InvalidPort(String),

	#[error("endpoint {0:?} has an empty host")]
	EmptyHost(String),

	#[error("endpoint {0:?}: IPv6 hosts must be bracketed, e.g. [2001:db8::1]:51820")]
	UnbracketedIpv6(String),

	#[error("endpoint {0:?}: host contains whitespace or control characters")]
	InvalidHost(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
	#[error("invalid encoded key length: expected 44 characters, got {0}")]
	InvalidEncodedLength(usize),

	#[error("invalid key length: expected 32 bytes, got {0}")]
	InvalidLength(usize),

	#[error("invalid base64 encoding: {0}")]
	InvalidBase64(#[from] base64::DecodeError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigRenderError {
	#[error("missing required field: {0}")]
	MissingField(&'static str),

	#[error("{field} is not a WireGuard key: {source}")]
	InvalidKey {
		field: &'static str,
		#[source]
		source: KeyError,
	},

	#[error("{field} {value:?} may only contain letters, digits, '_', '.' and '-'")]
	UnsafeName { field: &'static str, value: String },

	#[error("peer_endpoint host {0:?} contains whitespace or control characters")]
	UnsafeHost(String),
}

#[derive(Error, Debug)]
pub enum ConfigWriteError {
	#[error("failed to write {path}: {source}")]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RoutingError {
	#[error("no default route with a gateway in the main routing table")]
	NoDefaultRoute,

	#[error("malformed route line: {0}")]
	Malformed(String),
}

#[derive(Error, Debug)]
pub enum TableRegistryError {
	#[error("failed to update routing table registry {path}: {source}")]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("routing table {name:?} is already registered with id {existing_id} (wanted {wanted_id})")]
	NameConflict {
		name: String,
		existing_id: u32,
		wanted_id: u32,
	},

	#[error("routing table id {id} is already registered as {existing_name:?} (wanted {wanted_name:?})")]
	IdConflict {
		id: u32,
		existing_name: String,
		wanted_name: String,
	},
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HookError {
	#[error("unrecognised hook directive: {0}")]
	Unrecognised(String),

	#[error("PostUp has no matching PreDown: {0}")]
	Unreversed(String),

	#[error("PostUp is reversed more than once: {0}")]
	ReversedTwice(String),

	#[error("PreDown does not reverse any PostUp: {0}")]
	Orphan(String),
}
