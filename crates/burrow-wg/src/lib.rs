// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! WireGuard tunnel model for burrow.
//!
//! Everything in here is a pure function of its inputs or a single file
//! write. Talking to `systemctl`, `ip` and the network lives in
//! `burrow-provision`.

pub mod config;
pub mod config_file;
pub mod endpoint;
pub mod error;
pub mod hooks;
pub mod keys;
pub mod render;
pub mod routing;
pub mod table_registry;

pub use config::{
	is_safe_name, RoutingPolicy, TunnelConfig, DEFAULT_KEEPALIVE_SECS, DEFAULT_MTU,
	MAX_INTERFACE_NAME_LEN,
};
pub use config_file::{config_path_for, write_config};
pub use endpoint::{is_clean_host, Endpoint};
pub use error::{
	ConfigRenderError, ConfigWriteError, EndpointError, HookError, KeyError, RoutingError,
	TableRegistryError,
};
pub use hooks::{pair_hooks, parse_hooks, HookAction, HookPair, Hooks, Verb};
pub use keys::{check_key, ENCODED_KEY_LEN};
pub use render::{render_config, routing_hooks, ConfigText};
pub use routing::RoutingSnapshot;
pub use table_registry::{TableRegistration, TableRegistry, DEFAULT_RT_TABLES};
