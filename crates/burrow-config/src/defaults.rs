// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Built-in defaults, applied while finalizing the merged layer.

pub const SYSTEM_CONFIG_FILE: &str = "/etc/burrow/config.toml";

pub const INTERFACE: &str = "wg0";

pub const POLL_ATTEMPTS: u32 = 30;
pub const POLL_INTERVAL_MS: u64 = 1000;
/// Two minutes of one-second polls for a busy service manager.
pub const BUSY_ATTEMPTS: u32 = 120;

pub const ORACLE_URL: &str = "https://ipinfo.io/json";
pub const PROBE_HOST: &str = "www.google.com";

pub const MARKER_DIR: &str = "/root";
pub const LOCK_FILE: &str = "/run/burrow.lock";
pub const LOG_FILE: &str = "/var/log/burrow.log";
pub const LOGIN_NOTICE: &str = "/etc/motd.d/99-burrow";
