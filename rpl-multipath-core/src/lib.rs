/*!
# Congestion-aware multipath for RPL

A node normally forwards all of its upward traffic through a single
preferred parent. This crate lets a node notice that its own uplink, or the
path through its parent, is getting congested, and react by installing a
second, lower priority default route through an alternate neighbor until
the congestion subsides.

The routing protocol itself stays external: the crate talks to it through
the [`NeighborTable`], [`RouteTable`], [`Advertiser`] and [`Timer`] traits.
In-memory implementations of each are provided for hosts without their own
and for testing.

All per-node state is owned by a [`Multipath`] context.

```
use rpl_multipath_core::{Multipath, MultipathConfig, SelectionPolicy};

let config = MultipathConfig::default()
    .set_threshold("1/2".parse().unwrap())
    .set_interval("32s".parse().unwrap())
    .set_policy(SelectionPolicy::Deterministic);
let multipath = Multipath::new(config).unwrap();

// the packet path only needs the counters
let counters = multipath.counters().clone();
counters.record_rx();
assert_eq!(multipath.counters().rx(), 1);
```

[`NeighborTable`]: neighbor::NeighborTable
[`RouteTable`]: route::RouteTable
[`Advertiser`]: notification::Advertiser
[`Timer`]: scheduler::Timer
*/

pub mod config;
mod counters;
pub mod defaults;
pub mod estimator;
mod multipath;
pub mod neighbor;
pub mod notification;
pub mod route;
pub mod scheduler;
pub mod stats;
mod time;

pub use self::{
    config::{ConfigError, MultipathConfig, SelectionPolicy, ThresholdRatio},
    counters::{CountersSnapshot, PacketCounters},
    estimator::{CongestionEstimator, CongestionVerdict},
    multipath::Multipath,
    neighbor::NeighborHandle,
    route::{Activation, RoutePriority},
    stats::MultipathStats,
    time::{DetectionInterval, IntervalError},
};
