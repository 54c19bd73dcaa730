//! Experiment configuration and the concurrent multi-trial runner.

use std::num::NonZeroUsize;
use std::thread;
use std::time::Instant;

use crossbeam_channel::Receiver;
use log::{debug, info, warn};
use serde::Deserialize;

use crate::gp_aggregator::{ExperimentReport, ResultAggregator};
use crate::gp_epoch::{EpochDriver, TrialOutcome};
use crate::gp_interface::{check_probability, Algorithm, ClusterSpec, GossipError, NodeId};
use crate::gp_network::{Network, TopologyBuilder};
use crate::gp_random::RandomSource;

// ============================================================================
// Configuration
// ============================================================================

/// Parameters of a batch of trials
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExperimentConfig {
    /// Number of nodes in each network
    pub size: usize,

    /// Targets chosen per sender and epoch, ideally `0 < fanout < size`
    pub fanout: usize,

    /// Node holding the data before the first epoch
    pub leader: NodeId,

    /// Number of independent trials
    pub trials: usize,

    /// Link probability for node pairs that do not share a cluster
    pub default_probability: f64,

    /// Clusters, filled in list order
    pub clusters: Vec<ClusterSpec>,

    pub algorithm: Algorithm,

    /// Dump the history of stalled trials
    pub debug: bool,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            size: 100,
            fanout: 10,
            leader: 0,
            trials: 10,
            default_probability: 1.0,
            clusters: Vec::new(),
            algorithm: Algorithm::NaiveOnce,
            debug: false,
        }
    }
}

impl ExperimentConfig {
    /// Reject configurations that can not produce a single trial
    pub fn validate(&self) -> Result<(), GossipError> {
        if self.size == 0 {
            return Err(GossipError::InvalidSize);
        }
        if self.leader >= self.size {
            return Err(GossipError::InvalidLeader {
                leader: self.leader,
                size: self.size,
            });
        }
        if self.trials == 0 {
            return Err(GossipError::InvalidTrials);
        }
        check_probability(self.default_probability)?;
        for cluster in &self.clusters {
            check_probability(cluster.probability)?;
        }

        if self.fanout == 0 || self.fanout >= self.size {
            warn!(
                "fan-out {} outside of 1..{}: trials may not converge",
                self.fanout, self.size
            );
        }
        Ok(())
    }

    /// Fresh network for one trial, leader already holding the data
    pub fn build_network(&self, rng: &RandomSource) -> Result<Network, GossipError> {
        let mut network = TopologyBuilder::new(self.size)
            .with_clusters(self.clusters.clone())
            .with_default_probability(self.default_probability)
            .build(rng)?;
        network.visit_node(self.leader)?;
        Ok(network)
    }

    /// Build a network and drive it to completion
    pub fn run_trial(&self, rng: &RandomSource) -> Result<TrialOutcome, GossipError> {
        let mut network = self.build_network(rng)?;
        let mut driver = EpochDriver::new(self.algorithm, self.fanout).with_debug(self.debug);
        Ok(driver.run(&mut network, rng))
    }
}

// ============================================================================
// Runner
// ============================================================================

/// Worker count used when none is given: one and a half times the available
/// parallelism, rounded down
pub fn default_worker_count() -> usize {
    let cpus = thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1);
    (cpus + cpus / 2).max(1)
}

/// Runs every trial of a configuration across a fixed pool of workers
pub struct ExperimentRunner {
    config: ExperimentConfig,
    rng: RandomSource,
    workers: usize,
}

impl ExperimentRunner {
    /// Validates the configuration; no trial runs if it is rejected
    pub fn new(config: ExperimentConfig) -> Result<Self, GossipError> {
        config.validate()?;
        Ok(Self {
            config,
            rng: RandomSource::new(),
            workers: default_worker_count(),
        })
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn run(&self) -> Result<ExperimentReport, GossipError> {
        let start = Instant::now();
        let trials = self.config.trials;

        info!(
            "running {} trials of {} (size {}, fan-out {}) on {} workers",
            trials, self.config.algorithm, self.config.size, self.config.fanout, self.workers
        );

        // every trial is queued up front, workers only drain
        let (jobs, queue) = crossbeam_channel::bounded(trials);
        for trial in 0..trials {
            jobs.send(trial).expect("trial queue sized for every trial");
        }
        drop(jobs);

        let aggregator = ResultAggregator::new();

        let results: Vec<Result<usize, GossipError>> = thread::scope(|s| {
            let handles: Vec<_> = (0..self.workers.min(trials))
                .map(|worker| {
                    let queue = queue.clone();
                    let aggregator = &aggregator;
                    s.spawn(move || self.work(worker, queue, aggregator))
                })
                .collect();

            handles
                .into_iter()
                .map(|handle| match handle.join() {
                    Ok(result) => result,
                    Err(panic) => std::panic::resume_unwind(panic),
                })
                .collect()
        });

        for result in results {
            result?;
        }

        let mut report = aggregator.into_report(&self.config);
        report.elapsed = start.elapsed();

        info!(
            "{} trials finished in {:?}: {} filled, {} non-convergent",
            trials,
            report.elapsed,
            report.filled(),
            report.non_convergent
        );
        Ok(report)
    }

    fn work(
        &self,
        worker: usize,
        queue: Receiver<usize>,
        aggregator: &ResultAggregator,
    ) -> Result<usize, GossipError> {
        let mut completed = 0;
        for trial in queue.iter() {
            let outcome = self.config.run_trial(&self.rng)?;
            debug!("worker {}: trial {} -> {:?}", worker, trial, outcome);
            aggregator.record(outcome);
            completed += 1;
        }
        Ok(completed)
    }
}
