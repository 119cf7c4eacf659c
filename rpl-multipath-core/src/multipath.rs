use crate::{
    config::{ConfigError, MultipathConfig},
    counters::PacketCounters,
    estimator::{CongestionEstimator, CongestionVerdict},
    neighbor::{NeighborHandle, NeighborTable},
    notification::{
        Advertiser, NotificationPacer, PacketCountOption, SignalSource, record_signal,
    },
    route::{Activation, IntervalOutcome, MultipathState, RouteManager, RouteTable, StopReason},
    scheduler::{Scheduler, Steps, TickReport, Timer},
    stats::{MultipathStats, Tally},
};
use rand_chacha::ChaChaRng;
use rand_core::SeedableRng as _;
use std::{net::Ipv6Addr, sync::Arc};
use tracing::{debug, info};

/// The multipath module of one node.
///
/// Owns every piece of per-node state: the packet counters (shared with
/// the packet path), the route manager state machine, the notification
/// pacer and the random source. The host's collaborators (neighbor table,
/// route table, advertiser and timer) are borrowed for the duration of
/// each call.
///
/// ```
/// use rpl_multipath_core::{
///     Multipath, MultipathConfig,
///     neighbor::NeighborArena,
///     notification::AdvertisementFlag,
///     route::DefaultRouteTable,
///     scheduler::ManualTimer,
/// };
/// use std::net::Ipv6Addr;
///
/// let mut multipath = Multipath::new(MultipathConfig::default()).unwrap();
/// let mut neighbors = NeighborArena::new();
/// let mut routes = DefaultRouteTable::new();
/// let mut advertiser = AdvertisementFlag::new();
/// let mut timer = ManualTimer::new();
///
/// let parent = Ipv6Addr::new(0xfe80, 0, 0, 0, 0, 0, 0, 1);
/// let handle = neighbors.insert(parent, true).unwrap();
/// neighbors.set_preferred_parent(Some(handle)).unwrap();
/// neighbors.insert(Ipv6Addr::new(0xfe80, 0, 0, 0, 0, 0, 0, 2), true).unwrap();
///
/// multipath.start(&mut timer);
///
/// // the preferred parent advertises congestion
/// let activation = multipath.on_congestion_notification(&parent, &mut neighbors, &mut routes);
/// assert!(activation.unwrap().is_installed());
/// assert_eq!(routes.len(), 1);
///
/// // the flag is still fresh at the end of this interval
/// multipath
///     .tick(&mut neighbors, &mut routes, &mut advertiser, &mut timer)
///     .unwrap();
/// assert!(multipath.state().is_active());
///
/// // nothing more from the parent during the next one
/// multipath
///     .tick(&mut neighbors, &mut routes, &mut advertiser, &mut timer)
///     .unwrap();
/// assert!(!multipath.state().is_active());
/// assert!(routes.is_empty());
/// ```
#[derive(Debug)]
pub struct Multipath {
    config: MultipathConfig,
    counters: Arc<PacketCounters>,
    estimator: CongestionEstimator,
    pacer: NotificationPacer,
    manager: RouteManager,
    scheduler: Scheduler,
    rng: ChaChaRng,
    tally: Tally,
    last_verdict: Option<CongestionVerdict>,
}

impl Multipath {
    /// Build the module from a configuration.
    ///
    /// # Errors
    ///
    /// Fails if the configuration does not pass [`MultipathConfig::validate`].
    pub fn new(config: MultipathConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        Ok(Self {
            counters: Arc::new(PacketCounters::new()),
            estimator: CongestionEstimator::new(config.threshold, config.composition),
            pacer: NotificationPacer::new(config.pacing),
            manager: RouteManager::new(
                config.policy,
                config.secondary_priority,
                config.hysteresis,
            ),
            scheduler: Scheduler::new(config.interval),
            rng: ChaChaRng::seed_from_u64(config.seed),
            tally: Tally::default(),
            last_verdict: None,
            config,
        })
    }

    pub fn config(&self) -> &MultipathConfig {
        &self.config
    }

    /// The packet counters, to be shared with the packet path.
    pub fn counters(&self) -> &Arc<PacketCounters> {
        &self.counters
    }

    #[inline]
    pub fn on_packet_received(&self) {
        self.counters.record_rx();
    }

    #[inline]
    pub fn on_packet_sent(&self) {
        self.counters.record_tx();
    }

    /// Reseed the random source used by the randomized selection policy.
    pub fn set_seed(&mut self, seed: u64) {
        self.rng = ChaChaRng::seed_from_u64(seed);
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.scheduler.is_running()
    }

    /// Arm the detection timer.
    pub fn start<T: Timer>(&mut self, timer: &mut T) {
        self.scheduler.start(timer);
        info!(
            interval = %self.config.interval,
            threshold = %self.config.threshold,
            policy = ?self.config.policy,
            "Multipath started"
        );
    }

    /// Shut the module down: the alternate route, if any, is withdrawn and
    /// the timer stopped.
    pub fn stop<R, T>(&mut self, routes: &mut R, timer: &mut T)
    where
        R: RouteTable,
        T: Timer,
    {
        if self.manager.stop(routes, StopReason::Shutdown).is_some() {
            self.tally.deactivations += 1;
        }
        self.scheduler.stop(timer);
        info!(ticks = self.scheduler.ticks(), "Multipath stopped");
    }

    /// Build the sub-option to append to the next upward report.
    ///
    /// The transmit counter is read and cleared in one atomic step.
    pub fn packet_count_option(&mut self) -> PacketCountOption {
        let count = self.counters.take_and_reset_tx();
        self.tally.options_sent += 1;
        PacketCountOption::new(self.config.option_type, count)
    }

    /// Account for a packet count sub-option found at `offset` in a
    /// routing message received from a child.
    ///
    /// A malformed sub-option is dropped: the estimation of this interval
    /// is biased, which the next interval corrects.
    pub fn process_packet_count_option(&mut self, message: &[u8], offset: usize) -> Option<u16> {
        match PacketCountOption::decode_at(message, offset, self.config.option_type) {
            Ok(option) => {
                self.counters.apply_expected(u32::from(option.count()));
                self.tally.options_received += 1;
                Some(option.count())
            }
            Err(error) => {
                debug!(%error, "Dropping packet count sub-option");
                self.tally.options_dropped += 1;
                None
            }
        }
    }

    /// Handle a congestion flag carried by an advertisement from `from`.
    ///
    /// The flag is recorded in the sender's neighbor entry. If the sender
    /// is the preferred parent the alternate route is activated and the
    /// outcome returned, otherwise `None`.
    pub fn on_congestion_notification<N, R>(
        &mut self,
        from: &Ipv6Addr,
        neighbors: &mut N,
        routes: &mut R,
    ) -> Option<Activation>
    where
        N: NeighborTable,
        R: RouteTable,
    {
        let source = record_signal(neighbors, from);
        match source {
            SignalSource::Unknown => {
                debug!(%from, "Congestion signal from unknown neighbor");
                return None;
            }
            SignalSource::Neighbor(_) => {
                self.tally.signals_received += 1;
                return None;
            }
            SignalSource::PreferredParent(_) => self.tally.signals_received += 1,
        }

        if !self.is_running() {
            return None;
        }

        let was_active = self.manager.is_active();
        let activation = self.manager.activate(neighbors, routes, &mut self.rng);
        match activation {
            Activation::Installed { .. } => {
                if was_active {
                    // the previous alternate had to be withdrawn first
                    self.tally.deactivations += 1;
                }
                self.tally.activations += 1;
            }
            Activation::AlreadyActive => {}
            _ => {
                if was_active {
                    self.tally.deactivations += 1;
                }
                self.tally.activations_skipped += 1;
            }
        }
        Some(activation)
    }

    /// To be called by the host when a neighbor is evicted.
    pub fn on_neighbor_removed<R>(&mut self, neighbor: NeighborHandle, routes: &mut R) -> bool
    where
        R: RouteTable,
    {
        let withdrawn = self.manager.on_neighbor_removed(neighbor, routes);
        if withdrawn {
            self.tally.deactivations += 1;
        }
        withdrawn
    }

    /// Run the detection pipeline for the interval that just elapsed.
    ///
    /// Returns `None` if the module is stopped.
    pub fn tick<N, R, A, T>(
        &mut self,
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
        let steps = Steps {
            counters: &self.counters,
            estimator: &self.estimator,
            pacer: &mut self.pacer,
            manager: &mut self.manager,
        };
        let report = self
            .scheduler
            .fire(steps, neighbors, routes, advertiser, timer)?;

        if report.notified {
            self.tally.notifications += 1;
        }
        self.tally.notification_failures += report.errors.len() as u64;
        if let IntervalOutcome::Withdrawn(_) = report.outcome {
            self.tally.deactivations += 1;
        }
        self.last_verdict = Some(report.verdict);

        Some(report)
    }

    #[inline]
    pub fn state(&self) -> &MultipathState {
        self.manager.state()
    }

    pub fn stats(&self) -> MultipathStats {
        let state = self.manager.state();
        MultipathStats {
            counters: self.counters.snapshot(),
            active: state.is_active(),
            suppressed: state.is_suppressed(),
            alternate_neighbor: state.alternate_neighbor(),
            alternate_next_hop: state.alternate_next_hop(),
            ticks: self.scheduler.ticks(),
            elapsed: self.scheduler.elapsed(),
            last_verdict: self.last_verdict,
            notifications: self.tally.notifications,
            notification_failures: self.tally.notification_failures,
            signals_received: self.tally.signals_received,
            activations: self.tally.activations,
            activations_skipped: self.tally.activations_skipped,
            deactivations: self.tally.deactivations,
            options_sent: self.tally.options_sent,
            options_received: self.tally.options_received,
            options_dropped: self.tally.options_dropped,
        }
    }
}
