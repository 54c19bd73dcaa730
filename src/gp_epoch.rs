//! Drives one trial: epochs are run until the network is filled or the
//! stall guard gives up on it.

use log::{debug, warn};

use crate::gp_interface::{Algorithm, Stat};
use crate::gp_network::Network;
use crate::gp_propagation::run_epoch;
use crate::gp_random::RandomSource;

/// Terminal result of a trial
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrialOutcome {
    /// Every node holds the data after `epochs` epochs
    Filled { epochs: usize, reused: usize },
    /// The epoch guard fired before the network was filled
    NonConvergent,
}

impl TrialOutcome {
    pub fn is_filled(&self) -> bool {
        matches!(self, TrialOutcome::Filled { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrialState {
    Running,
    Filled,
    NonConvergent,
}

/// Runs a chosen algorithm over a network until it is filled
pub struct EpochDriver {
    algorithm: Algorithm,
    fanout: usize,
    debug: bool,
    trace: Vec<Stat>,
}

impl EpochDriver {
    pub fn new(algorithm: Algorithm, fanout: usize) -> Self {
        Self {
            algorithm,
            fanout,
            debug: false,
            trace: Vec::new(),
        }
    }

    /// Dump the propagation history of stalled trials
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Per-epoch statistics of the last trial run
    pub fn trace(&self) -> &[Stat] {
        &self.trace
    }

    /// Run epochs over `network`, which must already have its leader marked.
    ///
    /// The trial is abandoned once the next epoch index would exceed the
    /// number of nodes.
    pub fn run(&mut self, network: &mut Network, rng: &RandomSource) -> TrialOutcome {
        self.trace.clear();

        let mut epoch = 0;
        let mut reused = 0;
        let mut state = TrialState::Running;

        while state == TrialState::Running {
            if network.is_filled() {
                state = TrialState::Filled;
            } else if epoch > network.len() {
                state = TrialState::NonConvergent;
            } else {
                let stat = run_epoch(network, self.algorithm, self.fanout, epoch, rng);
                reused += stat.reused;
                self.trace.push(stat);
                epoch += 1;
            }
        }

        match state {
            TrialState::Filled => {
                debug!(
                    "{}: filled {} nodes in {} epochs, {} reused",
                    self.algorithm,
                    network.len(),
                    epoch,
                    reused
                );
                TrialOutcome::Filled {
                    epochs: epoch,
                    reused,
                }
            }
            _ => {
                if self.debug {
                    warn!(
                        "{}: found infinite cycle after {} epochs\n{}",
                        self.algorithm,
                        epoch,
                        network.history_dump()
                    );
                } else {
                    debug!("{}: no convergence after {} epochs", self.algorithm, epoch);
                }
                TrialOutcome::NonConvergent
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gp_interface::ClusterSpec;
    use crate::gp_network::TopologyBuilder;

    fn prepare_network(size: usize, rng: &RandomSource) -> Network {
        let mut net = Network::sample(size, rng).unwrap();
        net.visit_node(0).unwrap();
        net
    }

    #[test]
    fn test_coverage_never_decreases() {
        let rng = RandomSource::new();

        for algorithm in Algorithm::ALL {
            for _ in 0..5 {
                let mut net = prepare_network(50, &rng);
                let mut driver = EpochDriver::new(algorithm, 3);
                driver.run(&mut net, &rng);

                let coverage: Vec<usize> = driver.trace().iter().map(|s| s.coverage).collect();
                assert!(
                    coverage.windows(2).all(|w| w[0] <= w[1]),
                    "{} coverage went down: {:?}",
                    algorithm,
                    coverage
                );
            }
        }
    }

    #[test]
    fn test_filled_outcome_fills_network() {
        let rng = RandomSource::new();

        for algorithm in [
            Algorithm::NaiveOnce,
            Algorithm::NaiveForever,
            Algorithm::NaiveForeverMemorise,
            Algorithm::CentralisedMemorise,
            Algorithm::VectorOnce,
        ] {
            let mut net = prepare_network(40, &rng);
            let mut driver = EpochDriver::new(algorithm, 5);
            let outcome = driver.run(&mut net, &rng);

            if let TrialOutcome::Filled { epochs, reused } = outcome {
                assert!(net.is_filled());
                assert_eq!(epochs, driver.trace().len());
                assert_eq!(reused, driver.trace().iter().map(|s| s.reused).sum::<usize>());
                assert_eq!(driver.trace().last().unwrap().coverage, 40);
            } else {
                assert!(!net.is_filled());
            }
        }
    }

    #[test]
    fn test_full_fanout_fills_in_one_epoch() {
        let rng = RandomSource::new();
        let mut net = prepare_network(10, &rng);

        let outcome = EpochDriver::new(Algorithm::NaiveOnce, 9).run(&mut net, &rng);
        assert_eq!(outcome, TrialOutcome::Filled { epochs: 1, reused: 0 });
    }

    #[test]
    fn test_single_node_needs_no_epoch() {
        let rng = RandomSource::new();
        let mut net = prepare_network(1, &rng);

        let outcome = EpochDriver::new(Algorithm::NaiveOnce, 1).run(&mut net, &rng);
        assert_eq!(outcome, TrialOutcome::Filled { epochs: 0, reused: 0 });
    }

    #[test]
    fn test_zero_fanout_stalls() {
        let rng = RandomSource::new();
        let mut net = prepare_network(5, &rng);

        let mut driver = EpochDriver::new(Algorithm::NaiveForever, 0);
        assert_eq!(driver.run(&mut net, &rng), TrialOutcome::NonConvergent);
        // epochs 0..=size ran before the guard fired
        assert_eq!(driver.trace().len(), 6);
        assert_eq!(net.coverage(), 1);
    }

    #[test]
    fn test_isolated_leader_stalls() {
        let rng = RandomSource::new();
        let mut net = TopologyBuilder::new(8)
            .with_default_probability(0.0)
            .build(&rng)
            .unwrap();
        net.visit_node(0).unwrap();

        let outcome = EpochDriver::new(Algorithm::NaiveForever, 2)
            .with_debug(true)
            .run(&mut net, &rng);
        assert_eq!(outcome, TrialOutcome::NonConvergent);
        assert!(!outcome.is_filled());
    }

    #[test]
    fn test_unreachable_cluster_stalls() {
        let rng = RandomSource::new();
        // nodes 0..4 form a complete cluster, nodes 4..8 are linked to nobody
        let mut net = TopologyBuilder::new(8)
            .with_clusters(vec![ClusterSpec::new(1.0, 4).unwrap()])
            .with_default_probability(0.0)
            .build(&rng)
            .unwrap();
        net.visit_node(0).unwrap();

        let mut driver = EpochDriver::new(Algorithm::NaiveForever, 3);
        assert_eq!(driver.run(&mut net, &rng), TrialOutcome::NonConvergent);
        assert_eq!(net.coverage(), 4);
    }
}
