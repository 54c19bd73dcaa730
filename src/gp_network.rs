//! Network topology for push-gossip trials.
//!
//! A `Network` owns every node of one trial, the directed connectivity
//! matrix drawn when the network was built, the propagation history and the
//! per-node memorised target sets used by the history aware algorithms.

use std::collections::BTreeMap;
use std::fmt::Write;

use hashbrown::HashSet;
use log::debug;

use crate::gp_interface::{
    check_probability, ClusterId, ClusterSpec, EpochIndex, GossipError, NodeId,
    PropagationState,
};
use crate::gp_random::RandomSource;

/// A single simulated node
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub state: PropagationState,
    /// `None` when the node did not fit into any cluster
    pub cluster: Option<ClusterId>,
}

// ============================================================================
// Topology Builder
// ============================================================================

/// Builds a fresh `Network` with optional probabilistic clustering
#[derive(Debug, Clone)]
pub struct TopologyBuilder {
    size: usize,
    clusters: Vec<ClusterSpec>,
    default_probability: f64,
}

impl TopologyBuilder {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            clusters: Vec::new(),
            default_probability: 1.0,
        }
    }

    /// Clusters are filled in list order
    pub fn with_clusters(mut self, clusters: Vec<ClusterSpec>) -> Self {
        self.clusters = clusters;
        self
    }

    /// Link probability for pairs that do not share a cluster
    pub fn with_default_probability(mut self, probability: f64) -> Self {
        self.default_probability = probability;
        self
    }

    pub fn build(self, rng: &RandomSource) -> Result<Network, GossipError> {
        if self.size == 0 {
            return Err(GossipError::InvalidSize);
        }
        check_probability(self.default_probability)?;
        for cluster in &self.clusters {
            check_probability(cluster.probability)?;
        }

        let size = self.size;
        let mut clusters = self.clusters;

        let nodes: Vec<Node> = (0..size)
            .map(|id| Node {
                id,
                state: PropagationState::NoData,
                cluster: allocate_cluster(&mut clusters),
            })
            .collect();

        let affinity = if clusters.is_empty() && self.default_probability >= 1.0 {
            None
        } else {
            Some(draw_affinity(
                &nodes,
                &clusters,
                self.default_probability,
                rng,
            ))
        };

        let memorised = (0..size)
            .map(|id| {
                let mut own = HashSet::new();
                own.insert(id);
                own
            })
            .collect();

        debug!(
            "built network: {} nodes, {} clusters, {} clustered nodes, affinity matrix: {}",
            size,
            clusters.len(),
            nodes.iter().filter(|n| n.cluster.is_some()).count(),
            affinity.is_some()
        );

        Ok(Network {
            nodes,
            clusters,
            affinity,
            history: BTreeMap::new(),
            memorised,
        })
    }
}

/// Take one unit of capacity from the first cluster that still has room
fn allocate_cluster(clusters: &mut [ClusterSpec]) -> Option<ClusterId> {
    let (id, cluster) = clusters
        .iter_mut()
        .enumerate()
        .find(|(_, c)| c.capacity > 0)?;
    cluster.capacity -= 1;
    Some(id)
}

/// Row-major `size * size` matrix, `matrix[from * size + to]`
fn draw_affinity(
    nodes: &[Node],
    clusters: &[ClusterSpec],
    default_probability: f64,
    rng: &RandomSource,
) -> Vec<bool> {
    let size = nodes.len();
    let mut matrix = Vec::with_capacity(size * size);

    for from in nodes {
        for to in nodes {
            let linked = if from.id == to.id {
                true
            } else {
                match (from.cluster, to.cluster) {
                    (Some(a), Some(b)) if a == b => rng.gen_bool(clusters[a].probability),
                    _ => rng.gen_bool(default_probability),
                }
            };
            matrix.push(linked);
        }
    }
    matrix
}

// ============================================================================
// Network
// ============================================================================

pub struct Network {
    nodes: Vec<Node>,
    /// Cluster specs with their capacity left after allocation
    clusters: Vec<ClusterSpec>,
    /// `None` means fully connected
    affinity: Option<Vec<bool>>,
    history: BTreeMap<EpochIndex, BTreeMap<NodeId, Vec<NodeId>>>,
    memorised: Vec<HashSet<NodeId>>,
}

impl Network {
    /// Fully connected network without clusters
    pub fn sample(size: usize, rng: &RandomSource) -> Result<Self, GossipError> {
        TopologyBuilder::new(size).build(rng)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn state(&self, id: NodeId) -> PropagationState {
        self.nodes[id].state
    }

    pub(crate) fn set_state(&mut self, id: NodeId, state: PropagationState) {
        self.nodes[id].state = state;
    }

    pub fn cluster_of(&self, id: NodeId) -> Option<ClusterId> {
        self.nodes[id].cluster
    }

    /// Cluster spec with its remaining (unallocated) capacity
    pub fn cluster(&self, id: ClusterId) -> Option<&ClusterSpec> {
        self.clusters.get(id)
    }

    /// Whether `from` has a link to `to`
    pub fn is_connected(&self, from: NodeId, to: NodeId) -> bool {
        match &self.affinity {
            Some(matrix) => matrix[from * self.nodes.len() + to],
            None => true,
        }
    }

    pub fn is_fully_connected(&self) -> bool {
        self.affinity.is_none()
    }

    /// Mark a node as holding the data, ready to propagate
    pub fn visit_node(&mut self, id: NodeId) -> Result<(), GossipError> {
        if id >= self.nodes.len() {
            return Err(GossipError::InvalidLeader {
                leader: id,
                size: self.nodes.len(),
            });
        }
        self.nodes[id].state = PropagationState::Ready;
        Ok(())
    }

    /// Count of nodes holding the data
    pub fn coverage(&self) -> usize {
        self.nodes.iter().filter(|n| n.state.has_data()).count()
    }

    pub fn is_filled(&self) -> bool {
        self.nodes.iter().all(|n| n.state.has_data())
    }

    /// Targets a node will not choose (always contains the node itself)
    pub fn memorised(&self, id: NodeId) -> &HashSet<NodeId> {
        &self.memorised[id]
    }

    pub(crate) fn memorise(&mut self, id: NodeId, target: NodeId) {
        self.memorised[id].insert(target);
    }

    /// Copy every entry of `from`'s memorised set into `to`'s
    pub(crate) fn inherit_memorised(&mut self, to: NodeId, from: NodeId) {
        if to == from {
            return;
        }
        let inherited: Vec<NodeId> = self.memorised[from].iter().copied().collect();
        self.memorised[to].extend(inherited);
    }

    /// Record the targets chosen by `sender` in `epoch`. Each pair is written once.
    pub(crate) fn set_history(&mut self, sender: NodeId, epoch: EpochIndex, targets: Vec<NodeId>) {
        let previous = self.history.entry(epoch).or_default().insert(sender, targets);
        assert!(
            previous.is_none(),
            "history for node {sender} in epoch {epoch} written twice"
        );
    }

    pub fn history(&self, epoch: EpochIndex, sender: NodeId) -> Option<&[NodeId]> {
        self.history
            .get(&epoch)
            .and_then(|senders| senders.get(&sender))
            .map(Vec::as_slice)
    }

    pub fn epochs_recorded(&self) -> usize {
        self.history.len()
    }

    /// Human readable dump of every recorded epoch
    pub fn history_dump(&self) -> String {
        let mut out = String::new();
        for (epoch, senders) in &self.history {
            let _ = writeln!(out, "Epoch: {}", epoch + 1);
            for (node, targets) in senders {
                let _ = writeln!(out, "  Node:#{} {:?}", node, targets);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(probability: f64, capacity: usize) -> ClusterSpec {
        ClusterSpec::new(probability, capacity).unwrap()
    }

    #[test]
    fn test_zero_size_rejected() {
        let rng = RandomSource::new();
        assert_eq!(
            Network::sample(0, &rng).err(),
            Some(GossipError::InvalidSize)
        );
    }

    #[test]
    fn test_fresh_network_state() {
        let rng = RandomSource::new();
        let net = Network::sample(10, &rng).unwrap();

        assert_eq!(net.len(), 10);
        assert_eq!(net.coverage(), 0);
        assert!(!net.is_filled());
        assert!(net.is_fully_connected());
        assert_eq!(net.epochs_recorded(), 0);

        for (i, node) in net.nodes().iter().enumerate() {
            assert_eq!(node.id, i);
            assert_eq!(node.state, PropagationState::NoData);
            assert_eq!(node.cluster, None);
            assert_eq!(net.memorised(i).len(), 1);
            assert!(net.memorised(i).contains(&i));
        }
    }

    #[test]
    fn test_visit_node() {
        let rng = RandomSource::new();
        let mut net = Network::sample(5, &rng).unwrap();

        net.visit_node(3).unwrap();
        assert_eq!(net.state(3), PropagationState::Ready);
        assert_eq!(net.coverage(), 1);

        assert_eq!(
            net.visit_node(5),
            Err(GossipError::InvalidLeader { leader: 5, size: 5 })
        );
    }

    #[test]
    fn test_single_node_network_is_filled_once_visited() {
        let rng = RandomSource::new();
        let mut net = Network::sample(1, &rng).unwrap();
        net.visit_node(0).unwrap();
        assert!(net.is_filled());
    }

    #[test]
    fn test_cluster_allocation_in_list_order() {
        let rng = RandomSource::new();
        let net = TopologyBuilder::new(3)
            .with_clusters(vec![spec(0.5, 0), spec(0.7, 1)])
            .build(&rng)
            .unwrap();

        assert_eq!(net.cluster_of(0), Some(1));
        assert_eq!(net.cluster_of(1), None);
        assert_eq!(net.cluster_of(2), None);

        // capacity is consumed, never below zero
        assert_eq!(net.cluster(0).unwrap().capacity, 0);
        assert_eq!(net.cluster(1).unwrap().capacity, 0);
    }

    #[test]
    fn test_clusters_fill_sequentially() {
        let rng = RandomSource::new();
        let net = TopologyBuilder::new(6)
            .with_clusters(vec![spec(1.0, 2), spec(1.0, 3)])
            .build(&rng)
            .unwrap();

        let clusters: Vec<_> = net.nodes().iter().map(|n| n.cluster).collect();
        assert_eq!(
            clusters,
            vec![Some(0), Some(0), Some(1), Some(1), Some(1), None]
        );
    }

    #[test]
    fn test_affinity_inside_and_across_clusters() {
        let rng = RandomSource::new();
        let net = TopologyBuilder::new(5)
            .with_clusters(vec![spec(1.0, 3)])
            .with_default_probability(0.0)
            .build(&rng)
            .unwrap();

        assert!(!net.is_fully_connected());
        for a in 0..3 {
            for b in 0..3 {
                assert!(net.is_connected(a, b));
            }
            assert!(!net.is_connected(a, 3));
            assert!(!net.is_connected(4, a));
        }
        // unclustered nodes share no cluster, only the self link survives
        assert!(!net.is_connected(3, 4));
        assert!(net.is_connected(3, 3));
        assert!(net.is_connected(4, 4));
    }

    #[test]
    fn test_default_probability_zero_isolates_everyone() {
        let rng = RandomSource::new();
        let net = TopologyBuilder::new(4)
            .with_default_probability(0.0)
            .build(&rng)
            .unwrap();

        for a in 0..4 {
            for b in 0..4 {
                assert_eq!(net.is_connected(a, b), a == b);
            }
        }
    }

    #[test]
    fn test_invalid_probability_rejected() {
        let rng = RandomSource::new();
        let result = TopologyBuilder::new(4)
            .with_default_probability(1.2)
            .build(&rng);
        assert_eq!(result.err(), Some(GossipError::InvalidProbability(1.2)));
    }

    #[test]
    fn test_history_records() {
        let rng = RandomSource::new();
        let mut net = Network::sample(4, &rng).unwrap();

        net.set_history(0, 0, vec![2, 3]);
        net.set_history(2, 1, vec![1]);

        assert_eq!(net.history(0, 0), Some(&[2, 3][..]));
        assert_eq!(net.history(1, 2), Some(&[1][..]));
        assert_eq!(net.history(1, 0), None);
        assert_eq!(net.epochs_recorded(), 2);

        let dump = net.history_dump();
        assert!(dump.contains("Epoch: 1\n  Node:#0 [2, 3]"));
        assert!(dump.contains("Epoch: 2\n  Node:#2 [1]"));
    }

    #[test]
    #[should_panic(expected = "written twice")]
    fn test_history_written_once() {
        let rng = RandomSource::new();
        let mut net = Network::sample(4, &rng).unwrap();
        net.set_history(0, 0, vec![1]);
        net.set_history(0, 0, vec![2]);
    }

    #[test]
    fn test_inherit_memorised() {
        let rng = RandomSource::new();
        let mut net = Network::sample(6, &rng).unwrap();

        net.memorise(0, 4);
        net.inherit_memorised(2, 0);

        let inherited = net.memorised(2);
        assert!(inherited.contains(&0));
        assert!(inherited.contains(&2));
        assert!(inherited.contains(&4));
        assert_eq!(inherited.len(), 3);
    }
}
