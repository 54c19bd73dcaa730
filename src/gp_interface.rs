use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use thiserror::Error;

// node identifiers are dense over 0..size so they double as indices
pub type NodeId = usize;
pub type ClusterId = usize;
pub type EpochIndex = usize;

/// Number of histogram buckets rendered by the dense (debug) report line
pub const HISTOGRAM_BUCKETS: usize = 20;

// ============================================================================
// Errors
// ============================================================================

/// Configuration and construction failures.
///
/// These are detected before any trial runs. A trial that fails to fill the
/// network is not an error, see `TrialOutcome::NonConvergent`.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GossipError {
    /// Network size must be greater than zero
    #[error("sample size must be greater than zero")]
    InvalidSize,

    /// Leader index outside of the network
    #[error("leader index {leader} is out of sample range 0..{size}")]
    InvalidLeader { leader: NodeId, size: usize },

    /// Trial count must be greater than zero
    #[error("number of experiments must be greater than zero")]
    InvalidTrials,

    /// A probability outside of [0, 1]
    #[error("probability {0} is outside of [0, 1]")]
    InvalidProbability(f64),

    /// Malformed `<probability>/<capacity>` cluster spec
    #[error("invalid cluster spec '{0}', expected <probability>/<capacity>")]
    InvalidClusterSpec(String),

    /// Unrecognised propagation algorithm name
    #[error("unknown propagation algorithm '{0}'")]
    UnknownAlgorithm(String),

    /// Anything else rejected while reading parameters
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

// ============================================================================
// Node state
// ============================================================================

/// Data state of a single node.
///
/// `Propagated` is only reached by the algorithms that retire a sender after
/// its single send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PropagationState {
    #[default]
    NoData,
    Ready,
    Propagated,
}

impl PropagationState {
    pub fn has_data(self) -> bool {
        self != PropagationState::NoData
    }
}

/// Per-epoch statistics emitted by a propagation step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stat {
    /// Number of messages sent in the epoch
    pub sent: usize,
    /// Number of redundant messages (duplicates or already informed targets)
    pub reused: usize,
    /// Nodes holding the data once the epoch finished
    pub coverage: usize,
}

// ============================================================================
// Clusters
// ============================================================================

/// Cluster description: link probability inside the cluster and the number of
/// nodes it may still absorb.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(try_from = "String")]
pub struct ClusterSpec {
    pub probability: f64,
    pub capacity: usize,
}

impl ClusterSpec {
    pub fn new(probability: f64, capacity: usize) -> Result<Self, GossipError> {
        check_probability(probability)?;
        Ok(Self {
            probability,
            capacity,
        })
    }
}

impl FromStr for ClusterSpec {
    type Err = GossipError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || GossipError::InvalidClusterSpec(s.to_string());

        let (probability, capacity) = s.trim().split_once('/').ok_or_else(invalid)?;
        let probability: f64 = probability.trim().parse().map_err(|_| invalid())?;
        let capacity: usize = capacity.trim().parse().map_err(|_| invalid())?;

        ClusterSpec::new(probability, capacity)
    }
}

impl TryFrom<String> for ClusterSpec {
    type Error = GossipError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for ClusterSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.probability, self.capacity)
    }
}

/// Parse a comma separated list such as `0.9/10,0.5/20`. Blank input yields no clusters.
pub fn parse_cluster_list(s: &str) -> Result<Vec<ClusterSpec>, GossipError> {
    s.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::parse)
        .collect()
}

pub fn check_probability(p: f64) -> Result<(), GossipError> {
    if (0.0..=1.0).contains(&p) {
        Ok(())
    } else {
        Err(GossipError::InvalidProbability(p))
    }
}

// ============================================================================
// Algorithms
// ============================================================================

/// The push-gossip epoch step variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum Algorithm {
    /// Every ready node pushes once, then retires
    #[default]
    NaiveOnce,
    /// Every ready node pushes in every epoch
    NaiveForever,
    /// As `NaiveForever`, but a sender never re-targets a node it already chose
    NaiveForeverMemorise,
    /// Only node 0 pushes
    Centralised,
    /// Only node 0 pushes, never re-targeting a node
    CentralisedMemorise,
    /// Push once and hand the sender's memorised set to newly informed nodes
    VectorOnce,
}

impl Algorithm {
    pub const ALL: [Algorithm; 6] = [
        Algorithm::NaiveOnce,
        Algorithm::NaiveForever,
        Algorithm::NaiveForeverMemorise,
        Algorithm::Centralised,
        Algorithm::CentralisedMemorise,
        Algorithm::VectorOnce,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Algorithm::NaiveOnce => "naive-once",
            Algorithm::NaiveForever => "naive-forever",
            Algorithm::NaiveForeverMemorise => "naive-forever-memorise",
            Algorithm::Centralised => "centralised",
            Algorithm::CentralisedMemorise => "centralised-memorise",
            Algorithm::VectorOnce => "vector-once",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Algorithm {
    type Err = GossipError;

    /// Accepts `naive-once`, `naive_once` and `NaiveOnce` spellings
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalised: String = s
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .flat_map(char::to_lowercase)
            .collect();

        Algorithm::ALL
            .into_iter()
            .find(|a| a.name().replace('-', "") == normalised)
            .ok_or_else(|| GossipError::UnknownAlgorithm(s.to_string()))
    }
}

impl TryFrom<String> for Algorithm {
    type Error = GossipError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
