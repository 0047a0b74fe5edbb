//! Risk configuration and violation types.
//!
//! `RiskLimits` is the single process-wide limit record; it is mutated
//! only through the risk engine's configuration API.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CoreError;

/// Process-wide risk limit configuration.
///
/// All limits are absolute USD notionals. Defaults follow common
/// institutional desk settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskLimits {
    /// Maximum absolute notional per symbol.
    #[serde(default = "default_max_position_size")]
    pub max_position_size: Decimal,
    /// Maximum sum of accepted-order notionals per UTC day.
    #[serde(default = "default_max_daily_volume")]
    pub max_daily_volume: Decimal,
    /// Maximum absolute sum of signed position notionals.
    #[serde(default = "default_max_net_exposure")]
    pub max_net_exposure: Decimal,
    /// Maximum sum of absolute position notionals.
    #[serde(default = "default_max_gross_exposure")]
    pub max_gross_exposure: Decimal,
    /// Operator kill switch: rejects every new order while enabled.
    #[serde(default)]
    pub kill_switch_enabled: bool,
}

fn default_max_position_size() -> Decimal {
    Decimal::from(1_000_000)
}

fn default_max_daily_volume() -> Decimal {
    Decimal::from(10_000_000)
}

fn default_max_net_exposure() -> Decimal {
    Decimal::from(5_000_000)
}

fn default_max_gross_exposure() -> Decimal {
    Decimal::from(15_000_000)
}

impl Default for RiskLimits {
    fn default() -> Self {
        Self {
            max_position_size: default_max_position_size(),
            max_daily_volume: default_max_daily_volume(),
            max_net_exposure: default_max_net_exposure(),
            max_gross_exposure: default_max_gross_exposure(),
            kill_switch_enabled: false,
        }
    }
}

impl RiskLimits {
    /// Validate that every limit is non-negative.
    pub fn validate(&self) -> Result<(), CoreError> {
        for (name, value) in [
            ("max_position_size", self.max_position_size),
            ("max_daily_volume", self.max_daily_volume),
            ("max_net_exposure", self.max_net_exposure),
            ("max_gross_exposure", self.max_gross_exposure),
        ] {
            if value.is_sign_negative() {
                return Err(CoreError::InvalidConfig(format!(
                    "{name} must be non-negative, got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// A pre-trade risk limit breach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Violation {
    PositionLimit,
    DailyVolumeLimit,
    NetExposureLimit,
    GrossExposureLimit,
    KillSwitchActive,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::PositionLimit => "POSITION_LIMIT",
            Self::DailyVolumeLimit => "DAILY_VOLUME_LIMIT",
            Self::NetExposureLimit => "NET_EXPOSURE_LIMIT",
            Self::GrossExposureLimit => "GROSS_EXPOSURE_LIMIT",
            Self::KillSwitchActive => "KILL_SWITCH_ACTIVE",
        };
        write!(f, "{s}")
    }
}

/// Point-in-time risk metrics snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskMetrics {
    pub net_exposure: Decimal,
    pub gross_exposure: Decimal,
    pub daily_volume: Decimal,
    pub total_positions: usize,
    pub largest_position: Decimal,
    pub kill_switch_active: bool,
}
