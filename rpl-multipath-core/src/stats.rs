//! Multipath statistics and observability types.
//!
//! [`MultipathStats`] provides a point-in-time snapshot of one node's
//! multipath module. Obtain one via [`Multipath::stats`](crate::Multipath::stats).

use crate::{
    counters::CountersSnapshot, estimator::CongestionVerdict, neighbor::NeighborHandle,
};
use std::{net::Ipv6Addr, time::Duration};

/// Running totals kept by the [`Multipath`](crate::Multipath) context.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Tally {
    pub notifications: u64,
    pub notification_failures: u64,
    pub signals_received: u64,
    pub activations: u64,
    pub activations_skipped: u64,
    pub deactivations: u64,
    pub options_sent: u64,
    pub options_received: u64,
    pub options_dropped: u64,
}

/// Snapshot of the multipath module of a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipathStats {
    /// Current values of the packet counters.
    pub counters: CountersSnapshot,
    /// Whether a secondary default route is installed.
    pub active: bool,
    /// Whether activation is currently held down.
    pub suppressed: bool,
    pub alternate_neighbor: Option<NeighborHandle>,
    pub alternate_next_hop: Option<Ipv6Addr>,
    /// Number of detection intervals run so far.
    pub ticks: u64,
    /// Virtual time elapsed since the module started.
    pub elapsed: Duration,
    /// Verdict of the latest detection interval.
    pub last_verdict: Option<CongestionVerdict>,
    /// Congestion notifications scheduled on the advertiser.
    pub notifications: u64,
    /// Congestion notifications the advertiser refused.
    pub notification_failures: u64,
    /// Congestion signals received from known neighbors.
    pub signals_received: u64,
    /// Secondary routes installed.
    pub activations: u64,
    /// Activation requests that did not install a route.
    pub activations_skipped: u64,
    /// Secondary routes withdrawn.
    pub deactivations: u64,
    /// Packet count sub-options built for the parent.
    pub options_sent: u64,
    /// Packet count sub-options accepted from children.
    pub options_received: u64,
    /// Malformed packet count sub-options dropped.
    pub options_dropped: u64,
}
