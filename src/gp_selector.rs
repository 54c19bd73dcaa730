//! Random target selection shared by every propagation algorithm.

use hashbrown::HashSet;

use crate::gp_interface::NodeId;
use crate::gp_network::Network;
use crate::gp_random::RandomSource;

/// How `choose_targets` draws its candidates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionStrategy {
    /// Shuffle every id and scan the permutation in order
    Permutation,
    /// Independent uniform draws, rejecting excluded or repeated ids
    Rejection,
}

/// Pick the strategy for a pool of `candidates` eligible ids.
///
/// Rejection sampling only pays off while most of the network is eligible
/// and the pool is strictly larger than `fanout`; otherwise the draw loop
/// could spin for a long time or never finish.
pub fn strategy_for(size: usize, candidates: usize, fanout: usize) -> SelectionStrategy {
    if candidates <= size / 2 || fanout >= candidates {
        SelectionStrategy::Permutation
    } else {
        SelectionStrategy::Rejection
    }
}

/// Choose up to `fanout` distinct targets for `from`.
///
/// Ids in `exclude` and ids `from` has no link to are never returned. A
/// `fanout` larger than the network yields no targets at all.
pub fn choose_targets(
    network: &Network,
    fanout: usize,
    exclude: &HashSet<NodeId>,
    from: NodeId,
    rng: &RandomSource,
) -> Vec<NodeId> {
    let size = network.len();
    if fanout == 0 || fanout > size {
        return Vec::new();
    }

    let eligible = |id: NodeId| !exclude.contains(&id) && network.is_connected(from, id);

    let candidates = if network.is_fully_connected() {
        size - exclude.iter().filter(|id| **id < size).count()
    } else {
        (0..size).filter(|id| eligible(*id)).count()
    };

    match strategy_for(size, candidates, fanout) {
        SelectionStrategy::Permutation => rng
            .permutation(size)
            .into_iter()
            .filter(|id| eligible(*id))
            .take(fanout)
            .collect(),
        SelectionStrategy::Rejection => {
            let mut selected = HashSet::with_capacity(fanout);
            let mut targets = Vec::with_capacity(fanout);
            while targets.len() < fanout {
                let candidate = rng.gen_index(size);
                if eligible(candidate) && selected.insert(candidate) {
                    targets.push(candidate);
                }
            }
            targets
        }
    }
}
