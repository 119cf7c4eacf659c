use crate::{
    config::ThresholdRatio,
    notification::PacketCountOptionType,
    route::RoutePriority,
    time::DetectionInterval,
};
use std::time::Duration;

/// Default congestion threshold ratio
///
/// A node considers its own uplink congested when it received fewer
/// than half of the packets its children report having sent.
///
/// ```
/// # use rpl_multipath_core::defaults::*;
/// assert_eq!(DEFAULT_THRESHOLD.to_string(), "1/2");
/// assert_eq!(DEFAULT_THRESHOLD.threshold(100), 50);
/// ```
pub const DEFAULT_THRESHOLD: ThresholdRatio = ThresholdRatio::HALF;

/// Default detection interval exponent
///
/// The detection interval is `2^DEFAULT_INTERVAL_EXPONENT` seconds.
pub const DEFAULT_INTERVAL_EXPONENT: u8 = 5;

/// Default detection interval
///
/// ```
/// # use rpl_multipath_core::defaults::*;
/// assert_eq!(DEFAULT_DETECTION_INTERVAL.to_string(), "32s");
/// ```
pub const DEFAULT_DETECTION_INTERVAL: DetectionInterval =
    DetectionInterval::new(Duration::from_secs(1 << DEFAULT_INTERVAL_EXPONENT));

/// Default number of random draws for the randomized alternate selection.
pub const DEFAULT_RANDOM_ATTEMPTS: u8 = 3;

/// Default minimum time between two congestion notifications
///
/// Zero means a congested node advertises its state on every detection
/// interval it finds itself congested. Children withdraw their alternate
/// route as soon as an interval passes without a signal from their parent,
/// so raising this value trades signalling overhead for route churn.
pub const DEFAULT_NOTIFICATION_MIN_INTERVAL: Duration = Duration::ZERO;

/// Default upper bound of the notification backoff.
pub const DEFAULT_NOTIFICATION_MAX_INTERVAL: Duration = Duration::from_secs(256);

/// Default priority of the secondary default route.
///
/// ```
/// # use rpl_multipath_core::{defaults::*, RoutePriority};
/// assert!(DEFAULT_SECONDARY_PRIORITY.is_lower_than(RoutePriority::PRIMARY));
/// ```
pub const DEFAULT_SECONDARY_PRIORITY: RoutePriority = RoutePriority::new(1);

/// Default type byte of the packet count sub-option.
pub const DEFAULT_OPTION_TYPE: PacketCountOptionType = PacketCountOptionType::new(0x0A);

/// Default seed of the random source used for alternate selection.
pub const DEFAULT_SEED: u64 = 0;

/// Default neighbor table capacity of [`NeighborArena`].
///
/// [`NeighborArena`]: crate::neighbor::NeighborArena
pub const DEFAULT_NEIGHBOR_CAPACITY: usize = 16;

/// Default capacity of the [`DefaultRouteTable`].
///
/// [`DefaultRouteTable`]: crate::route::DefaultRouteTable
pub const DEFAULT_ROUTE_CAPACITY: usize = 4;
