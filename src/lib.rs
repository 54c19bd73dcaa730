//! # gossip_model - Push-Gossip Dissemination Simulator
//!
//! Simulates epidemic ("push-gossip") data dissemination over randomly
//! generated networks and measures how many epochs are needed until every
//! node holds the data.
//!
//! ## Core Components
//!
//! - **RandomSource**: OS-entropy backed randomness shared by every component
//! - **TopologyBuilder / Network**: nodes, optional probabilistic clusters and
//!   the directed connectivity matrix
//! - **choose_targets**: randomized target selection for one sender
//! - **run_epoch**: the six epoch step algorithms (see `Algorithm`)
//! - **EpochDriver**: runs epochs until the network is filled or stalls
//! - **ExperimentRunner / ResultAggregator**: concurrent trials and their
//!   thread-safe aggregation
//!
//! ```no_run
//! use gossip_model::{Algorithm, ExperimentConfig, ExperimentRunner};
//!
//! let config = ExperimentConfig {
//!     size: 100,
//!     fanout: 4,
//!     trials: 1000,
//!     algorithm: Algorithm::VectorOnce,
//!     ..ExperimentConfig::default()
//! };
//!
//! let report = ExperimentRunner::new(config)?.run()?;
//! report.print_summary();
//! # Ok::<(), gossip_model::GossipError>(())
//! ```

pub mod gp_aggregator;
pub mod gp_epoch;
pub mod gp_experiment;
pub mod gp_interface;
pub mod gp_network;
pub mod gp_propagation;
pub mod gp_random;
pub mod gp_selector;

// Re-export commonly used types
pub use gp_aggregator::{ExperimentReport, ResultAggregator};
pub use gp_epoch::{EpochDriver, TrialOutcome, TrialState};
pub use gp_experiment::{default_worker_count, ExperimentConfig, ExperimentRunner};
pub use gp_interface::{
    parse_cluster_list, Algorithm, ClusterId, ClusterSpec, EpochIndex, GossipError, NodeId,
    PropagationState, Stat,
};
pub use gp_network::{Network, Node, TopologyBuilder};
pub use gp_propagation::run_epoch;
pub use gp_random::RandomSource;
pub use gp_selector::choose_targets;
