// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::net::IpAddr;

use tracing::{info, instrument};

use crate::error::VerificationError;
use crate::oracle::NetworkProbe;

/// Acceptance check after the tunnel is up: egress must come from a
/// different address and a different country than the direct path.
#[instrument(skip(probe))]
pub async fn verify_tunneled(
	probe: &dyn NetworkProbe,
	direct_ip: IpAddr,
	home_country: &str,
) -> Result<(), VerificationError> {
	let observed = probe.observe().await?;

	if observed.ip == direct_ip {
		return Err(VerificationError::StillDirect { ip: observed.ip });
	}
	if observed.in_country(home_country) {
		return Err(VerificationError::SameRegion {
			country: observed.country,
		});
	}

	info!(observed_ip = %observed.ip, observed_country = %observed.country, "egress goes through the tunnel");
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::ConnectivityError;
	use crate::testing::MockProbe;

	fn ip(s: &str) -> IpAddr {
		s.parse().unwrap()
	}

	#[tokio::test]
	async fn same_ip_is_still_direct() {
		let probe = MockProbe::new().then_observe("203.0.113.5", "US");
		let err = verify_tunneled(&probe, ip("203.0.113.5"), "JP").await.unwrap_err();
		assert!(matches!(err, VerificationError::StillDirect { ip } if ip == "203.0.113.5".parse::<IpAddr>().unwrap()));
	}

	#[tokio::test]
	async fn different_ip_and_country_passes() {
		let probe = MockProbe::new().then_observe("198.51.100.9", "US");
		verify_tunneled(&probe, ip("203.0.113.5"), "JP").await.unwrap();
	}

	#[tokio::test]
	async fn same_country_is_rejected() {
		let probe = MockProbe::new().then_observe("198.51.100.9", "jp");
		let err = verify_tunneled(&probe, ip("203.0.113.5"), "JP").await.unwrap_err();
		assert!(matches!(err, VerificationError::SameRegion { country } if country == "jp"));
	}

	#[tokio::test]
	async fn oracle_failure_is_reported() {
		let probe = MockProbe::new().then_fail(ConnectivityError::InvalidResponse("timeout".into()));
		let err = verify_tunneled(&probe, ip("203.0.113.5"), "JP").await.unwrap_err();
		assert!(matches!(err, VerificationError::Oracle(_)));
	}
}
