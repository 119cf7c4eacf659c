use crate::{
    config::{Composition, ThresholdRatio},
    counters::CountersSnapshot,
    neighbor::NeighborTable,
};

/// Outcome of one detection interval.
///
/// Besides the two verdicts it keeps the figures they were computed from.
/// When the packet ratio test fires the neighbor scan is skipped, and
/// `congested` and `total` are left to `0`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CongestionVerdict {
    /// The node should notify its children.
    pub self_congested: bool,
    /// A strict majority of the neighbors report congestion.
    pub neighbors_congested: bool,

    pub rx: u32,
    pub rx_expected: u32,
    pub threshold: u32,
    pub congested: usize,
    pub total: usize,
}

/// Turns the packet counters and the neighbors' congestion flags into a
/// [`CongestionVerdict`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CongestionEstimator {
    threshold: ThresholdRatio,
    composition: Composition,
}

/// `true` if `congested` is a strict majority of `total`.
///
/// ```
/// # use rpl_multipath_core::estimator::majority;
/// assert!(majority(3, 4));
/// assert!(!majority(2, 4));
/// assert!(!majority(0, 0));
/// ```
#[inline]
pub fn majority(congested: usize, total: usize) -> bool {
    congested.saturating_mul(2) > total
}

impl CongestionEstimator {
    pub fn new(threshold: ThresholdRatio, composition: Composition) -> Self {
        Self {
            threshold,
            composition,
        }
    }

    pub fn threshold(&self) -> ThresholdRatio {
        self.threshold
    }

    pub fn composition(&self) -> Composition {
        self.composition
    }

    /// Evaluate the congestion state of the node.
    ///
    /// Receiving fewer packets than `rx_expected * ratio` means packets get
    /// lost or queued on this node's own upstream link: the node is
    /// congested and the neighbor scan is skipped. Otherwise the neighbors'
    /// flags are counted.
    pub fn evaluate<N>(&self, counters: &CountersSnapshot, neighbors: &N) -> CongestionVerdict
    where
        N: NeighborTable,
    {
        let threshold = self.threshold.threshold(counters.rx_expected);

        let mut verdict = CongestionVerdict {
            rx: counters.rx,
            rx_expected: counters.rx_expected,
            threshold,
            ..CongestionVerdict::default()
        };

        if counters.rx < threshold {
            verdict.self_congested = true;
            return verdict;
        }

        let (congested, total) = neighbors
            .neighbors()
            .filter_map(|neighbor| neighbors.congested(neighbor))
            .fold((0usize, 0usize), |(congested, total), cn| {
                (congested + usize::from(cn), total + 1)
            });

        verdict.congested = congested;
        verdict.total = total;
        verdict.neighbors_congested = majority(congested, total);

        if self.composition == Composition::SelfOrNeighborhood {
            verdict.self_congested = verdict.neighbors_congested;
        }

        verdict
    }
}
