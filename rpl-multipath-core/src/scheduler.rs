//! The periodic congestion detection pipeline.
//!
//! Each firing of the detection timer runs, strictly in this order:
//!
//! 1. evaluate the congestion verdict;
//! 2. notify the children if congested (subject to pacing);
//! 3. withdraw the alternate route if the preferred parent recovered;
//! 4. clear the neighbors' congestion flags;
//! 5. reset the interval counters;
//! 6. rearm the timer.
//!
//! A failing step never prevents the following ones from running.

use crate::{
    counters::PacketCounters,
    estimator::{CongestionEstimator, CongestionVerdict},
    neighbor::NeighborTable,
    notification::{Advertiser, NotificationPacer},
    route::{IntervalOutcome, RouteManager, RouteTable},
    time::DetectionInterval,
};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// The host's periodic timer.
pub trait Timer {
    /// Arm the timer to fire every `period`.
    fn set(&mut self, period: Duration);

    /// Rearm the timer with its current period.
    fn reset(&mut self);

    fn stop(&mut self);
}

/// A [`Timer`] driven by hand, for hosts that run their own event loop
/// (and for tests).
#[derive(Debug, Default, Clone)]
pub struct ManualTimer {
    period: Option<Duration>,
    armed: bool,
    rearms: u64,
}

impl ManualTimer {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn period(&self) -> Option<Duration> {
        self.period
    }

    /// Number of times the timer was rearmed.
    pub fn rearms(&self) -> u64 {
        self.rearms
    }
}

impl Timer for ManualTimer {
    fn set(&mut self, period: Duration) {
        self.period = Some(period);
        self.armed = true;
    }

    fn reset(&mut self) {
        if self.period.is_some() {
            self.armed = true;
            self.rearms += 1;
        }
    }

    fn stop(&mut self) {
        self.armed = false;
    }
}

/// A non-fatal failure of one step of the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TickError {
    #[error("Failed to schedule the congestion notification: {message}")]
    Notification { message: String },
}

/// Summary of one detection interval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickReport {
    /// Sequence number of the interval, starting at 1.
    pub tick: u64,
    /// Virtual time at the end of the interval.
    pub elapsed: Duration,
    pub verdict: CongestionVerdict,
    /// `true` if a congestion notification was scheduled.
    pub notified: bool,
    pub outcome: IntervalOutcome,
    pub errors: Vec<TickError>,
}

/// The components a tick drives.
pub struct Steps<'a> {
    pub counters: &'a PacketCounters,
    pub estimator: &'a CongestionEstimator,
    pub pacer: &'a mut NotificationPacer,
    pub manager: &'a mut RouteManager,
}

/// Drives the detection pipeline once per interval.
///
/// The scheduler keeps a virtual clock advanced by one interval at every
/// firing. It is used to pace notifications, so the host timer only needs
/// to be roughly periodic.
#[derive(Debug, Clone)]
pub struct Scheduler {
    interval: DetectionInterval,
    elapsed: Duration,
    ticks: u64,
    running: bool,
}

impl Scheduler {
    pub fn new(interval: DetectionInterval) -> Self {
        Self {
            interval,
            elapsed: Duration::ZERO,
            ticks: 0,
            running: false,
        }
    }

    #[inline]
    pub fn interval(&self) -> DetectionInterval {
        self.interval
    }

    #[inline]
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    #[inline]
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn start<T: Timer>(&mut self, timer: &mut T) {
        self.running = true;
        timer.set(self.interval.into_duration());
    }

    pub fn stop<T: Timer>(&mut self, timer: &mut T) {
        self.running = false;
        timer.stop();
    }

    /// Run the pipeline for the interval that just elapsed.
    ///
    /// Returns `None` if the scheduler is stopped: the firing is ignored
    /// and the timer is left alone.
    pub fn fire<N, R, A, T>(
        &mut self,
        steps: Steps<'_>,
        neighbors: &mut N,
        routes: &mut R,
        advertiser: &mut A,
        timer: &mut T,
    ) -> Option<TickReport>
    where
        N: NeighborTable,
        R: RouteTable,
        A: Advertiser,
        T: Timer,
    {
        if !self.running {
            return None;
        }

        self.ticks = self.ticks.wrapping_add(1);
        self.elapsed = self.elapsed.saturating_add(self.interval.into_duration());

        let mut errors = Vec::new();

        let verdict = steps
            .estimator
            .evaluate(&steps.counters.snapshot(), neighbors);

        let notified = self.notify(steps.pacer, &verdict, advertiser, &mut errors);

        let outcome = steps.manager.on_interval(neighbors, routes);

        neighbors.clear_congestion();
        steps.counters.reset_interval();
        timer.reset();

        debug!(
            tick = self.ticks,
            rx = verdict.rx,
            rx_expected = verdict.rx_expected,
            threshold = verdict.threshold,
            congested_neighbors = verdict.congested,
            neighbors = verdict.total,
            self_congested = verdict.self_congested,
            notified,
            ?outcome,
            "Congestion detection interval"
        );

        Some(TickReport {
            tick: self.ticks,
            elapsed: self.elapsed,
            verdict,
            notified,
            outcome,
            errors,
        })
    }

    fn notify<A: Advertiser>(
        &self,
        pacer: &mut NotificationPacer,
        verdict: &CongestionVerdict,
        advertiser: &mut A,
        errors: &mut Vec<TickError>,
    ) -> bool {
        if !pacer.poll(self.elapsed, verdict.self_congested) {
            return false;
        }

        match advertiser.schedule_congestion_notification() {
            Ok(()) => true,
            Err(error) => {
                warn!(%error, tick = self.ticks, "Congestion notification not scheduled");
                errors.push(TickError::Notification {
                    message: error.to_string(),
                });
                false
            }
        }
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(DetectionInterval::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::{Hysteresis, SelectionPolicy},
        neighbor::NeighborArena,
        notification::AdvertisementFlag,
        route::{DefaultRouteTable, RoutePriority},
    };
    use anyhow::bail;
    use std::net::Ipv6Addr;

    struct BrokenAdvertiser;

    impl Advertiser for BrokenAdvertiser {
        fn schedule_congestion_notification(&mut self) -> anyhow::Result<()> {
            bail!("advertisement queue full")
        }
    }

    struct Fixture {
        counters: PacketCounters,
        estimator: CongestionEstimator,
        pacer: NotificationPacer,
        manager: RouteManager,
        neighbors: NeighborArena,
        routes: DefaultRouteTable,
        timer: ManualTimer,
    }

    impl Fixture {
        fn new() -> Self {
            let mut neighbors = NeighborArena::with_capacity(4);
            let parent = neighbors
                .insert(Ipv6Addr::new(0xfe80, 0, 0, 0, 0, 0, 0, 1), true)
                .unwrap();
            neighbors.set_preferred_parent(Some(parent)).unwrap();

            Self {
                counters: PacketCounters::new(),
                estimator: CongestionEstimator::default(),
                pacer: NotificationPacer::default(),
                manager: RouteManager::new(
                    SelectionPolicy::Deterministic,
                    RoutePriority::new(1),
                    Hysteresis::DISABLED,
                ),
                neighbors,
                routes: DefaultRouteTable::new(),
                timer: ManualTimer::new(),
            }
        }

        fn fire<A: Advertiser>(
            &mut self,
            scheduler: &mut Scheduler,
            advertiser: &mut A,
        ) -> Option<TickReport> {
            scheduler.fire(
                Steps {
                    counters: &self.counters,
                    estimator: &self.estimator,
                    pacer: &mut self.pacer,
                    manager: &mut self.manager,
                },
                &mut self.neighbors,
                &mut self.routes,
                advertiser,
                &mut self.timer,
            )
        }
    }

    #[test]
    fn stopped_scheduler_ignores_firing() {
        let mut fixture = Fixture::new();
        let mut scheduler = Scheduler::default();

        assert!(fixture.fire(&mut scheduler, &mut AdvertisementFlag::new()).is_none());
        assert_eq!(scheduler.ticks(), 0);
    }

    #[test]
    fn congested_interval_notifies_and_resets() {
        let mut fixture = Fixture::new();
        let mut scheduler = Scheduler::default();
        let mut advertiser = AdvertisementFlag::new();
        scheduler.start(&mut fixture.timer);

        fixture.counters.apply_expected(100);
        for _ in 0..40 {
            fixture.counters.record_rx();
        }
        fixture.counters.record_tx();

        let report = fixture.fire(&mut scheduler, &mut advertiser).unwrap();

        assert_eq!(report.tick, 1);
        assert_eq!(report.elapsed, Duration::from_secs(32));
        assert!(report.verdict.self_congested);
        assert!(report.notified);
        assert!(advertiser.is_pending());
        assert_eq!(report.outcome, IntervalOutcome::Inactive);

        assert_eq!(fixture.counters.rx(), 0);
        assert_eq!(fixture.counters.rx_expected(), 0);
        assert_eq!(fixture.counters.tx_toward_parent(), 1);
        assert_eq!(fixture.timer.rearms(), 1);
    }

    #[test]
    fn flags_are_cleared_after_evaluation() {
        let mut fixture = Fixture::new();
        let mut scheduler = Scheduler::default();
        scheduler.start(&mut fixture.timer);

        let parent = fixture.neighbors.preferred_parent().unwrap();
        fixture.neighbors.set_congested(parent, true);

        let report = fixture
            .fire(&mut scheduler, &mut AdvertisementFlag::new())
            .unwrap();
        assert_eq!((report.verdict.congested, report.verdict.total), (1, 1));
        assert_eq!(fixture.neighbors.congested(parent), Some(false));
    }

    #[test]
    fn notification_failure_does_not_stop_the_pipeline() {
        let mut fixture = Fixture::new();
        let mut scheduler = Scheduler::default();
        scheduler.start(&mut fixture.timer);

        fixture.counters.apply_expected(10);

        let report = fixture.fire(&mut scheduler, &mut BrokenAdvertiser).unwrap();
        assert!(!report.notified);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].to_string().contains("advertisement queue full"));

        assert_eq!(fixture.counters.rx_expected(), 0);
        assert!(fixture.timer.is_armed());
        assert_eq!(fixture.timer.rearms(), 1);
    }

    #[test]
    fn stop_disarms_timer() {
        let mut fixture = Fixture::new();
        let mut scheduler = Scheduler::default();

        scheduler.start(&mut fixture.timer);
        assert!(fixture.timer.is_armed());
        assert_eq!(fixture.timer.period(), Some(Duration::from_secs(32)));

        scheduler.stop(&mut fixture.timer);
        assert!(!scheduler.is_running());
        assert!(!fixture.timer.is_armed());
        assert!(fixture.fire(&mut scheduler, &mut AdvertisementFlag::new()).is_none());
    }
}
