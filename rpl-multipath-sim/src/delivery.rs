use rand_core::Rng;
use std::{fmt, str::FromStr};
use thiserror::Error;

/// Share of the data packets a link delivers, in percent.
///
/// ```
/// use rpl_multipath_sim::Delivery;
///
/// let lossy: Delivery = "60%".parse().unwrap();
/// assert_eq!(lossy, Delivery::percent(60).unwrap());
/// assert_eq!(lossy.to_string(), "60%");
/// assert_eq!(Delivery::default(), Delivery::ALL);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Delivery(u8);

/// Error returned when a delivery ratio is above 100%.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("delivery ratio must be in [0, 100]%, got {0}%")]
pub struct DeliveryError(u8);

/// Error returned when parsing a [`Delivery`] from a string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryParseError {
    #[error("expected '%' suffix")]
    MissingSuffix,
    #[error("invalid number before '%'")]
    InvalidNumber,
    #[error("{0}")]
    OutOfRange(#[from] DeliveryError),
}

impl Delivery {
    /// A perfect link.
    pub const ALL: Self = Self(100);
    /// A broken link.
    pub const NONE: Self = Self(0);

    /// # Errors
    ///
    /// Fails if `percent` is above 100.
    pub fn percent(percent: u8) -> Result<Self, DeliveryError> {
        if percent > 100 {
            return Err(DeliveryError(percent));
        }
        Ok(Self(percent))
    }

    #[inline]
    pub fn into_percent(self) -> u8 {
        self.0
    }

    /// Draw whether one packet makes it across the link.
    ///
    /// The caller provides `rng` so that every random decision of the
    /// simulation comes from the single seeded source of the [`Mesh`].
    ///
    /// [`Mesh`]: crate::Mesh
    pub fn should_deliver<R: Rng>(&self, rng: &mut R) -> bool {
        match self.0 {
            0 => false,
            100 => true,
            percent => ((u64::from(rng.next_u32()) * 100) >> 32) < u64::from(percent),
        }
    }
}

impl Default for Delivery {
    fn default() -> Self {
        Self::ALL
    }
}

impl fmt::Display for Delivery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

impl FromStr for Delivery {
    type Err = DeliveryParseError;

    /// Parses a percentage string like `"0%"`, `"75%"` or `"100%"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some(number) = s.trim().strip_suffix('%') else {
            return Err(DeliveryParseError::MissingSuffix);
        };
        let percent: u8 = number
            .trim()
            .parse()
            .map_err(|_| DeliveryParseError::InvalidNumber)?;
        Ok(Self::percent(percent)?)
    }
}
