//! Configuration of the multipath module.
//!
//! Every parameter has a default (see [`defaults`](crate::defaults)) and
//! the whole [`MultipathConfig`] is checked once by
//! [`MultipathConfig::validate`] when the [`Multipath`] context is built.
//! An invalid configuration is refused there instead of misbehaving at
//! runtime.
//!
//! [`Multipath`]: crate::Multipath

use crate::{
    defaults::{
        DEFAULT_NOTIFICATION_MAX_INTERVAL, DEFAULT_NOTIFICATION_MIN_INTERVAL,
        DEFAULT_OPTION_TYPE, DEFAULT_RANDOM_ATTEMPTS, DEFAULT_SECONDARY_PRIORITY, DEFAULT_SEED,
        DEFAULT_THRESHOLD,
    },
    notification::PacketCountOptionType,
    route::RoutePriority,
    time::DetectionInterval,
};
use std::{fmt, str::FromStr, time::Duration};
use thiserror::Error;

/// Fraction of the expected packet count below which a node considers its
/// own uplink congested.
///
/// The ratio is kept as an integer fraction so the threshold computation
/// stays deterministic on hardware without a floating point unit.
///
/// ```
/// # use rpl_multipath_core::ThresholdRatio;
/// let ratio: ThresholdRatio = "3/4".parse().unwrap();
/// assert_eq!(ratio.threshold(100), 75);
/// // truncates toward zero
/// assert_eq!(ratio.threshold(3), 2);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ThresholdRatio {
    numerator: u32,
    denominator: u32,
}

/// How the two congestion tests are combined into the node's verdict.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Composition {
    /// The node notifies its children when its own uplink is congested
    /// **or** when a strict majority of its neighbors report congestion.
    #[default]
    SelfOrNeighborhood,
    /// Only the packet ratio test drives notification. The neighborhood
    /// majority is still computed and reported.
    SelfOnly,
}

/// Policy used to pick the alternate neighbor.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectionPolicy {
    /// Scan the neighbor table in order and prefer the first uncongested
    /// routing parent that is not the preferred parent. If they are all
    /// congested, the last scanned candidate is used anyway.
    #[default]
    Deterministic,
    /// Draw up to `attempts` neighbors at random and accept the first one
    /// that is an uncongested routing parent other than the preferred parent.
    Randomized { attempts: u8 },
}

impl SelectionPolicy {
    pub const fn randomized() -> Self {
        Self::Randomized {
            attempts: DEFAULT_RANDOM_ATTEMPTS,
        }
    }
}

/// Flap damping for the secondary route. Disabled by default.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Hysteresis {
    /// Number of detection intervals an alternate route stays installed
    /// before an uncongested parent is allowed to withdraw it.
    pub min_active_intervals: u32,
    /// Number of detection intervals after a withdrawal during which new
    /// congestion signals are ignored.
    pub hold_down_intervals: u32,
}

impl Hysteresis {
    pub const DISABLED: Self = Self {
        min_active_intervals: 0,
        hold_down_intervals: 0,
    };

    pub fn is_disabled(&self) -> bool {
        *self == Self::DISABLED
    }
}

/// Pacing of the downward congestion notification.
///
/// After a notification is sent, the next one is held back for the current
/// backoff, which doubles on every notification up to `max_interval` and
/// falls back to `min_interval` once the node stops being congested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pacing {
    pub min_interval: Duration,
    pub max_interval: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            min_interval: DEFAULT_NOTIFICATION_MIN_INTERVAL,
            max_interval: DEFAULT_NOTIFICATION_MAX_INTERVAL,
        }
    }
}

/// Configuration of a [`Multipath`] instance.
///
/// ```
/// use rpl_multipath_core::{MultipathConfig, SelectionPolicy};
///
/// let config = MultipathConfig::default()
///     .set_threshold("2/3".parse().unwrap())
///     .set_interval("16s".parse().unwrap())
///     .set_policy(SelectionPolicy::randomized())
///     .set_seed(42);
/// assert!(config.validate().is_ok());
/// ```
///
/// [`Multipath`]: crate::Multipath
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipathConfig {
    pub threshold: ThresholdRatio,
    pub interval: DetectionInterval,
    pub composition: Composition,
    pub policy: SelectionPolicy,
    pub hysteresis: Hysteresis,
    pub pacing: Pacing,
    pub secondary_priority: RoutePriority,
    pub option_type: PacketCountOptionType,
    pub seed: u64,
}

/// Error returned by [`MultipathConfig::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("threshold ratio denominator must not be zero")]
    ZeroDenominator,
    #[error("threshold ratio numerator must not be zero")]
    ZeroNumerator,
    #[error("threshold ratio must not exceed 1, got {numerator}/{denominator}")]
    RatioAboveOne { numerator: u32, denominator: u32 },
    #[error("detection interval must not be zero")]
    ZeroInterval,
    #[error(
        "detection interval must be 2^n seconds with n at most {max}, got {interval}"
    )]
    IntervalNotPowerOfTwo { interval: DetectionInterval, max: u8 },
    #[error("randomized selection needs at least one attempt")]
    ZeroAttempts,
    #[error(
        "notification pacing minimum ({min:?}) must not exceed its maximum ({max:?})"
    )]
    PacingRange { min: Duration, max: Duration },
    #[error("secondary route priority must be lower than the primary route's")]
    SecondaryPriority,
}

/// Error returned when parsing a [`ThresholdRatio`] from a string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ThresholdParseError {
    #[error("expected a fraction such as '1/2'")]
    MissingSlash,
    #[error("invalid number in threshold ratio")]
    InvalidNumber,
    #[error("{0}")]
    Invalid(#[from] ConfigError),
}

impl ThresholdRatio {
    pub const HALF: Self = Self {
        numerator: 1,
        denominator: 2,
    };

    /// Create a validated ratio.
    ///
    /// # Errors
    ///
    /// The ratio must be in `(0, 1]` and the denominator must be non-zero.
    pub fn new(numerator: u32, denominator: u32) -> Result<Self, ConfigError> {
        let ratio = Self {
            numerator,
            denominator,
        };
        ratio.validate()?;
        Ok(ratio)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.denominator == 0 {
            return Err(ConfigError::ZeroDenominator);
        }
        if self.numerator == 0 {
            return Err(ConfigError::ZeroNumerator);
        }
        if self.numerator > self.denominator {
            return Err(ConfigError::RatioAboveOne {
                numerator: self.numerator,
                denominator: self.denominator,
            });
        }
        Ok(())
    }

    #[inline]
    pub fn numerator(&self) -> u32 {
        self.numerator
    }

    #[inline]
    pub fn denominator(&self) -> u32 {
        self.denominator
    }

    /// `expected * numerator / denominator`, truncated toward zero.
    ///
    /// The product is computed on 64 bits and cannot overflow.
    #[inline]
    pub fn threshold(&self, expected: u32) -> u32 {
        let threshold = u64::from(expected) * u64::from(self.numerator)
            / u64::from(self.denominator.max(1));
        threshold as u32
    }
}

impl Default for ThresholdRatio {
    fn default() -> Self {
        DEFAULT_THRESHOLD
    }
}

impl fmt::Display for ThresholdRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

impl FromStr for ThresholdRatio {
    type Err = ThresholdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some((numerator, denominator)) = s.trim().split_once('/') else {
            return Err(ThresholdParseError::MissingSlash);
        };
        let numerator = numerator
            .trim()
            .parse()
            .map_err(|_| ThresholdParseError::InvalidNumber)?;
        let denominator = denominator
            .trim()
            .parse()
            .map_err(|_| ThresholdParseError::InvalidNumber)?;
        Ok(Self::new(numerator, denominator)?)
    }
}

impl Default for MultipathConfig {
    fn default() -> Self {
        Self {
            threshold: ThresholdRatio::default(),
            interval: DetectionInterval::default(),
            composition: Composition::default(),
            policy: SelectionPolicy::default(),
            hysteresis: Hysteresis::default(),
            pacing: Pacing::default(),
            secondary_priority: DEFAULT_SECONDARY_PRIORITY,
            option_type: DEFAULT_OPTION_TYPE,
            seed: DEFAULT_SEED,
        }
    }
}

impl MultipathConfig {
    pub fn set_threshold(mut self, threshold: ThresholdRatio) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn set_interval(mut self, interval: DetectionInterval) -> Self {
        self.interval = interval;
        self
    }

    pub fn set_composition(mut self, composition: Composition) -> Self {
        self.composition = composition;
        self
    }

    pub fn set_policy(mut self, policy: SelectionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn set_hysteresis(mut self, hysteresis: Hysteresis) -> Self {
        self.hysteresis = hysteresis;
        self
    }

    pub fn set_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn set_secondary_priority(mut self, priority: RoutePriority) -> Self {
        self.secondary_priority = priority;
        self
    }

    pub fn set_option_type(mut self, option_type: PacketCountOptionType) -> Self {
        self.option_type = option_type;
        self
    }

    /// Seed of the random source used by [`SelectionPolicy::Randomized`].
    pub fn set_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Check every parameter.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.threshold.validate()?;

        if self.interval.is_zero() {
            return Err(ConfigError::ZeroInterval);
        }
        if self.interval.exponent().is_none() {
            return Err(ConfigError::IntervalNotPowerOfTwo {
                interval: self.interval,
                max: DetectionInterval::MAX_EXPONENT,
            });
        }

        if let SelectionPolicy::Randomized { attempts: 0 } = self.policy {
            return Err(ConfigError::ZeroAttempts);
        }

        if self.pacing.min_interval > self.pacing.max_interval {
            return Err(ConfigError::PacingRange {
                min: self.pacing.min_interval,
                max: self.pacing.max_interval,
            });
        }

        if !self.secondary_priority.is_lower_than(RoutePriority::PRIMARY) {
            return Err(ConfigError::SecondaryPriority);
        }

        Ok(())
    }
}
