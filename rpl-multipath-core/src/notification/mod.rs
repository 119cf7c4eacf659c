//! The congestion notification protocol.
//!
//! Two signals travel along the tree, each piggybacked on a message the
//! routing protocol already sends:
//!
//! * **upward**, a child appends a [`PacketCountOption`] to its report to
//!   the parent with the number of packets it forwarded since the previous
//!   report. The parent adds it to its expected receive count;
//! * **downward**, a congested node raises a flag on its next periodic
//!   advertisement (see [`Advertiser`]). Children record it in the sender's
//!   neighbor entry with [`record_signal`].
//!
//! Loss of either signal is tolerated: the estimation is simply biased for
//! one interval.

mod option;

pub use self::option::{
    OptionDecodeError, OptionEncodeError, PacketCountOption, PacketCountOptionType,
};
use crate::{
    config::Pacing,
    neighbor::{NeighborHandle, NeighborTable},
};
use std::{net::Ipv6Addr, time::Duration};

/// Raises the congestion flag on the node's periodic advertisement.
pub trait Advertiser {
    /// Request the flag to be set on the next advertisement sent to the
    /// children. Must not block.
    ///
    /// # Errors
    ///
    /// A failure is not fatal, the notification is retried on the next
    /// congested interval.
    fn schedule_congestion_notification(&mut self) -> anyhow::Result<()>;
}

/// An [`Advertiser`] that latches the request until the host consumes it
/// while building its next advertisement.
#[derive(Debug, Default, Clone)]
pub struct AdvertisementFlag {
    pending: bool,
    scheduled: u64,
}

impl AdvertisementFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` if the next advertisement must carry the congestion flag.
    #[inline]
    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Consume the pending flag, to be called when building the advertisement.
    pub fn take(&mut self) -> bool {
        std::mem::take(&mut self.pending)
    }

    /// Total number of notifications requested.
    #[inline]
    pub fn scheduled(&self) -> u64 {
        self.scheduled
    }
}

impl Advertiser for AdvertisementFlag {
    fn schedule_congestion_notification(&mut self) -> anyhow::Result<()> {
        self.pending = true;
        self.scheduled += 1;
        Ok(())
    }
}

/// Rate limiter for the downward congestion notification.
///
/// Trickle-like: after a notification the next one is held back for the
/// current backoff, which then doubles up to the configured maximum. An
/// interval without congestion resets the backoff to its minimum. With a
/// minimum of zero every congested interval notifies.
#[derive(Debug, Clone)]
pub struct NotificationPacer {
    min_interval: Duration,
    max_interval: Duration,
    backoff: Duration,
    next_allowed: Duration,
}

impl NotificationPacer {
    pub fn new(pacing: Pacing) -> Self {
        Self {
            min_interval: pacing.min_interval,
            max_interval: pacing.max_interval,
            backoff: pacing.min_interval,
            next_allowed: Duration::ZERO,
        }
    }

    /// Decide whether to notify at `now`, the time elapsed since the
    /// module started.
    pub fn poll(&mut self, now: Duration, congested: bool) -> bool {
        if !congested {
            self.backoff = self.min_interval;
            self.next_allowed = now;
            return false;
        }
        if now < self.next_allowed {
            return false;
        }

        self.next_allowed = now.saturating_add(self.backoff);
        self.backoff = self.backoff.saturating_mul(2).min(self.max_interval);
        true
    }

    /// Current backoff, i.e. the hold-off applied after the next notification.
    #[inline]
    pub fn backoff(&self) -> Duration {
        self.backoff
    }
}

impl Default for NotificationPacer {
    fn default() -> Self {
        Self::new(Pacing::default())
    }
}

/// Who a received congestion signal came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalSource {
    /// The sender is not in the neighbor table, the signal is dropped.
    Unknown,
    Neighbor(NeighborHandle),
    /// The sender is the node's preferred parent: the path upward is
    /// congested.
    PreferredParent(NeighborHandle),
}

/// Record a congestion signal received from `from` in its neighbor entry.
pub fn record_signal<N>(neighbors: &mut N, from: &Ipv6Addr) -> SignalSource
where
    N: NeighborTable,
{
    let Some(neighbor) = neighbors.lookup(from) else {
        return SignalSource::Unknown;
    };
    if !neighbors.set_congested(neighbor, true) {
        return SignalSource::Unknown;
    }

    if neighbors.preferred_parent() == Some(neighbor) {
        SignalSource::PreferredParent(neighbor)
    } else {
        SignalSource::Neighbor(neighbor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::neighbor::NeighborArena;

    fn secs(secs: u64) -> Duration {
        Duration::from_secs(secs)
    }

    #[test]
    fn zero_minimum_always_notifies() {
        let mut pacer = NotificationPacer::new(Pacing {
            min_interval: Duration::ZERO,
            max_interval: secs(256),
        });

        for tick in 1..10 {
            assert!(pacer.poll(secs(32 * tick), true));
        }
    }

    #[test]
    fn not_congested_never_notifies() {
        let mut pacer = NotificationPacer::default();
        assert!(!pacer.poll(secs(32), false));
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let mut pacer = NotificationPacer::new(Pacing {
            min_interval: secs(32),
            max_interval: secs(100),
        });

        let sent: Vec<u64> = (1..=12)
            .map(|tick| secs(32 * tick))
            .filter(|now| pacer.poll(*now, true))
            .map(|now| now.as_secs() / 32)
            .collect();

        // held back 32s, 64s, 100s, 100s...
        assert_eq!(sent, vec![1, 2, 4, 8, 12]);
        assert_eq!(pacer.backoff(), secs(100));
    }

    #[test]
    fn backoff_resets_when_uncongested() {
        let mut pacer = NotificationPacer::new(Pacing {
            min_interval: secs(32),
            max_interval: secs(256),
        });

        assert!(pacer.poll(secs(32), true));
        assert!(pacer.poll(secs(64), true));
        assert_eq!(pacer.backoff(), secs(128));

        assert!(!pacer.poll(secs(96), false));
        assert_eq!(pacer.backoff(), secs(32));
    }

    #[test]
    fn new_episode_is_not_held_back() {
        let mut pacer = NotificationPacer::new(Pacing {
            min_interval: secs(32),
            max_interval: secs(256),
        });

        let congested = [true, true, true, true, false, true, true, true];
        let sent: Vec<bool> = congested
            .into_iter()
            .zip(1..)
            .map(|(congested, tick)| pacer.poll(secs(32 * tick), congested))
            .collect();

        // the calm interval at tick 5 drops the 256s hold-off of the
        // first episode
        assert_eq!(
            sent,
            vec![true, true, false, true, false, true, true, false]
        );
    }

    #[test]
    fn record_signal_sources() {
        let mut table = NeighborArena::with_capacity(4);
        let parent_addr = Ipv6Addr::new(0xfe80, 0, 0, 0, 0, 0, 0, 1);
        let other_addr = Ipv6Addr::new(0xfe80, 0, 0, 0, 0, 0, 0, 2);
        let parent = table.insert(parent_addr, true).unwrap();
        let other = table.insert(other_addr, true).unwrap();
        table.set_preferred_parent(Some(parent)).unwrap();

        assert_eq!(
            record_signal(&mut table, &other_addr),
            SignalSource::Neighbor(other)
        );
        assert_eq!(table.congested(other), Some(true));
        assert_eq!(table.congested(parent), Some(false));

        assert_eq!(
            record_signal(&mut table, &parent_addr),
            SignalSource::PreferredParent(parent)
        );
        assert_eq!(table.congested(parent), Some(true));

        assert_eq!(
            record_signal(&mut table, &Ipv6Addr::LOCALHOST),
            SignalSource::Unknown
        );
    }

    #[test]
    fn advertisement_flag() {
        let mut flag = AdvertisementFlag::new();
        assert!(!flag.take());

        flag.schedule_congestion_notification().unwrap();
        flag.schedule_congestion_notification().unwrap();
        assert!(flag.is_pending());
        assert!(flag.take());
        assert!(!flag.is_pending());
        assert_eq!(flag.scheduled(), 2);
    }
}
