//! Input validation utilities for the Solearn protocol core

use crate::errors::SolearnError;
use crate::instructions::constants::BASIS_POINTS_DIVISOR;
use anchor_lang::prelude::*;

/// Validates a single basis-point value (at most 10000).
pub fn validate_bps(bps: u16) -> Result<()> {
    require!(
        (bps as u64) <= BASIS_POINTS_DIVISOR,
        SolearnError::ConfigInvalid
    );
    Ok(())
}

/// Validates that a split group of basis-point values sums to at most 10000.
///
/// # Examples
/// ```
/// use solearn::utils::validation::validate_bps_group;
///
/// assert!(validate_bps_group(&[5_000, 3_000, 2_000]).is_ok());
/// assert!(validate_bps_group(&[5_000, 5_001]).is_err());
/// ```
pub fn validate_bps_group(parts: &[u16]) -> Result<()> {
    let total: u64 = parts.iter().map(|&bps| bps as u64).sum();
    require!(total <= BASIS_POINTS_DIVISOR, SolearnError::ConfigInvalid);
    Ok(())
}

/// Inference inputs and solutions must carry at least one byte.
pub fn validate_payload(data: &[u8]) -> Result<()> {
    require!(!data.is_empty(), SolearnError::InvalidInput);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bps_bounds() {
        assert!(validate_bps(0).is_ok());
        assert!(validate_bps(10_000).is_ok());
        assert!(validate_bps(10_001).is_err());
        assert!(validate_bps(u16::MAX).is_err());
    }

    #[test]
    fn test_group_exactly_full() {
        assert!(validate_bps_group(&[50_00, 30_00, 5_00, 5_00, 10_00]).is_ok());
    }

    #[test]
    fn test_group_overflowing_u16_still_rejected() {
        // Individual values fit u16 but their sum does not
        assert!(validate_bps_group(&[u16::MAX, u16::MAX]).is_err());
    }

    #[test]
    fn test_empty_group() {
        assert!(validate_bps_group(&[]).is_ok());
    }

    #[test]
    fn test_payload() {
        assert!(validate_payload(b"x").is_ok());
        assert_eq!(
            validate_payload(b"").unwrap_err(),
            SolearnError::InvalidInput.into()
        );
    }
}
