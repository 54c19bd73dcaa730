//! Epoch step algorithms for push gossip.
//!
//! All six variants share one skeleton: collect the senders of the epoch,
//! let each choose its targets, record the choice in the network history and
//! finally update the targets while tallying redundant sends. A variant only
//! decides who sends, whether a sender retires and how memorised target sets
//! evolve.

use crate::gp_interface::{Algorithm, EpochIndex, NodeId, PropagationState, Stat};
use crate::gp_network::Network;
use crate::gp_random::RandomSource;
use crate::gp_selector::choose_targets;

/// The only sender of the centralised algorithms
pub const CENTRAL_NODE: NodeId = 0;

/// Which nodes push in an epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SenderPolicy {
    /// Every node currently `Ready`
    AllReady,
    /// `CENTRAL_NODE` only, whatever its state
    CentralOnly,
}

/// How memorised target sets change during an epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoriseRule {
    /// Sets stay as built (each node only excludes itself)
    Static,
    /// A sender adds every target it chooses to its own set
    SenderRemembers,
    /// A newly informed node inherits the set of its first (lowest id) sender
    InheritFromFirstSender,
}

/// Parameters distinguishing the algorithm variants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepRules {
    pub senders: SenderPolicy,
    /// Sender moves to `Propagated` after its send
    pub retire: bool,
    pub memorise: MemoriseRule,
}

impl Algorithm {
    pub fn rules(self) -> StepRules {
        let (senders, retire, memorise) = match self {
            Algorithm::NaiveOnce => (SenderPolicy::AllReady, true, MemoriseRule::Static),
            Algorithm::NaiveForever => (SenderPolicy::AllReady, false, MemoriseRule::Static),
            Algorithm::NaiveForeverMemorise => {
                (SenderPolicy::AllReady, false, MemoriseRule::SenderRemembers)
            }
            Algorithm::Centralised => (SenderPolicy::CentralOnly, false, MemoriseRule::Static),
            Algorithm::CentralisedMemorise => {
                (SenderPolicy::CentralOnly, false, MemoriseRule::SenderRemembers)
            }
            Algorithm::VectorOnce => (
                SenderPolicy::AllReady,
                true,
                MemoriseRule::InheritFromFirstSender,
            ),
        };
        StepRules {
            senders,
            retire,
            memorise,
        }
    }
}

/// Run one epoch of `algorithm` over `network`
pub fn run_epoch(
    network: &mut Network,
    algorithm: Algorithm,
    fanout: usize,
    epoch: EpochIndex,
    rng: &RandomSource,
) -> Stat {
    let rules = algorithm.rules();
    let size = network.len();
    let mut stat = Stat::default();

    let senders: Vec<NodeId> = match rules.senders {
        SenderPolicy::AllReady => network
            .nodes()
            .iter()
            .filter(|n| n.state == PropagationState::Ready)
            .map(|n| n.id)
            .collect(),
        SenderPolicy::CentralOnly => vec![CENTRAL_NODE],
    };

    let mut votes = vec![0usize; size];
    // senders run in ascending id order, so the first voter is the lowest id
    let mut first_voter: Vec<Option<NodeId>> = vec![None; size];

    for sender in senders {
        let targets = choose_targets(network, fanout, network.memorised(sender), sender, rng);
        stat.sent += targets.len();

        for &target in &targets {
            votes[target] += 1;
            first_voter[target].get_or_insert(sender);
            if rules.memorise == MemoriseRule::SenderRemembers {
                network.memorise(sender, target);
            }
        }

        network.set_history(sender, epoch, targets);
        if rules.retire {
            network.set_state(sender, PropagationState::Propagated);
        }
    }

    for (target, &repeated) in votes.iter().enumerate() {
        if repeated == 0 {
            continue;
        }

        let state = network.state(target);
        let already_informed = if rules.retire {
            state.has_data()
        } else {
            state == PropagationState::Ready
        };

        if already_informed {
            stat.reused += 1;
        }

        if rules.retire {
            if !already_informed {
                if rules.memorise == MemoriseRule::InheritFromFirstSender {
                    if let Some(voter) = first_voter[target] {
                        network.inherit_memorised(target, voter);
                    }
                }
                network.set_state(target, PropagationState::Ready);
            }
        } else {
            network.set_state(target, PropagationState::Ready);
        }

        stat.reused += repeated - 1;
    }

    stat.coverage = network.coverage();
    stat
}

#[cfg(test)]
mod tests {
    use super::*;
    use hashbrown::HashSet;

    fn prepare_network(size: usize, rng: &RandomSource) -> Network {
        let mut net = Network::sample(size, rng).unwrap();
        net.visit_node(0).unwrap();
        net
    }

    #[test]
    fn test_naive_once_single_epoch_coverage() {
        let rng = RandomSource::new();

        let mut net = prepare_network(10, &rng);
        let stat = run_epoch(&mut net, Algorithm::NaiveOnce, 2, 0, &rng);
        assert_eq!(net.coverage(), 3);
        assert_eq!(stat.coverage, 3);
        assert_eq!(stat.sent, 2);
        assert_eq!(stat.reused, 0);

        let mut net = prepare_network(10, &rng);
        run_epoch(&mut net, Algorithm::NaiveOnce, 9, 0, &rng);
        assert_eq!(net.coverage(), 10);
        assert!(net.is_filled());
    }

    #[test]
    fn test_naive_once_retires_sender() {
        let rng = RandomSource::new();
        let mut net = prepare_network(10, &rng);

        run_epoch(&mut net, Algorithm::NaiveOnce, 2, 0, &rng);
        assert_eq!(net.state(0), PropagationState::Propagated);

        let targets = net.history(0, 0).unwrap().to_vec();
        assert_eq!(targets.len(), 2);
        for t in targets {
            assert_ne!(t, 0);
            assert_eq!(net.state(t), PropagationState::Ready);
        }
    }

    #[test]
    fn test_retiring_redundancy_accounting() {
        let rng = RandomSource::new();
        let mut net = prepare_network(3, &rng);

        run_epoch(&mut net, Algorithm::NaiveOnce, 2, 0, &rng);
        assert!(net.is_filled());

        // nodes 1 and 2 each reach both other nodes, all of which hold the data:
        // node 0 twice (informed + duplicate), nodes 1 and 2 once each
        let stat = run_epoch(&mut net, Algorithm::NaiveOnce, 2, 1, &rng);
        assert_eq!(stat.sent, 4);
        assert_eq!(stat.reused, 4);
        assert_eq!(stat.coverage, 3);
        for id in 0..3 {
            assert_eq!(net.state(id), PropagationState::Propagated);
        }
    }

    #[test]
    fn test_naive_forever_keeps_senders_ready() {
        let rng = RandomSource::new();
        let mut net = prepare_network(10, &rng);

        let first = run_epoch(&mut net, Algorithm::NaiveForever, 9, 0, &rng);
        assert_eq!(first.coverage, 10);
        assert_eq!(net.state(0), PropagationState::Ready);

        // every node sends to the other nine, every delivery is redundant
        let second = run_epoch(&mut net, Algorithm::NaiveForever, 9, 1, &rng);
        assert_eq!(second.sent, 90);
        assert_eq!(second.reused, 90);
        assert_eq!(net.history(1, 0).unwrap().len(), 9);
        assert_eq!(net.history(1, 9).unwrap().len(), 9);
    }

    #[test]
    fn test_naive_forever_memorise_never_repeats_target() {
        let rng = RandomSource::new();
        let mut net = prepare_network(30, &rng);

        let mut targeted_by_leader = HashSet::new();
        for epoch in 0..5 {
            run_epoch(&mut net, Algorithm::NaiveForeverMemorise, 3, epoch, &rng);
            for t in net.history(epoch, 0).unwrap() {
                assert!(targeted_by_leader.insert(*t), "node {} chosen twice", t);
            }
        }
        assert_eq!(net.memorised(0).len(), 1 + targeted_by_leader.len());
    }

    #[test]
    fn test_centralised_only_node_zero_sends() {
        let rng = RandomSource::new();
        let mut net = prepare_network(20, &rng);

        for epoch in 0..4 {
            let stat = run_epoch(&mut net, Algorithm::Centralised, 3, epoch, &rng);
            assert_eq!(stat.sent, 3);
            assert!(net.history(epoch, 0).is_some());
            for id in 1..20 {
                assert!(net.history(epoch, id).is_none());
            }
        }
        // memorised set never grows
        assert_eq!(net.memorised(0).len(), 1);
    }

    #[test]
    fn test_centralised_memorise_fills_without_waste() {
        let rng = RandomSource::new();
        let mut net = prepare_network(10, &rng);

        for epoch in 0..3 {
            let stat = run_epoch(&mut net, Algorithm::CentralisedMemorise, 3, epoch, &rng);
            assert_eq!(stat.sent, 3);
            assert_eq!(stat.reused, 0);
            assert_eq!(stat.coverage, 1 + 3 * (epoch + 1));
        }
        assert!(net.is_filled());
        assert_eq!(net.memorised(0).len(), 10);
    }

    #[test]
    fn test_vector_once_inherits_sender_set() {
        let rng = RandomSource::new();
        let mut net = prepare_network(10, &rng);

        run_epoch(&mut net, Algorithm::VectorOnce, 2, 0, &rng);
        let first_wave = net.history(0, 0).unwrap().to_vec();
        for &t in &first_wave {
            assert!(net.memorised(t).contains(&0));
            assert!(net.memorised(t).contains(&t));
        }

        // second wave never goes back to the leader
        run_epoch(&mut net, Algorithm::VectorOnce, 2, 1, &rng);
        for &sender in &first_wave {
            let targets = net.history(1, sender).unwrap();
            assert!(!targets.contains(&0));
            assert!(!targets.contains(&sender));
        }
    }

    #[test]
    fn test_vector_once_inherits_from_lowest_sender() {
        let rng = RandomSource::new();

        for _ in 0..20 {
            let mut net = Network::sample(6, &rng).unwrap();
            net.visit_node(1).unwrap();
            net.visit_node(2).unwrap();
            net.memorise(1, 4);
            net.memorise(2, 5);

            // node 1 reaches {0, 2, 3, 5}, node 2 reaches {0, 1, 3, 4}
            run_epoch(&mut net, Algorithm::VectorOnce, 5, 0, &rng);
            assert_eq!(net.history(0, 1).unwrap().len(), 4);
            assert_eq!(net.history(0, 2).unwrap().len(), 4);

            for shared in [0, 3] {
                let inherited = net.memorised(shared);
                assert!(inherited.contains(&1));
                assert!(inherited.contains(&4));
                assert!(!inherited.contains(&2));
                assert!(!inherited.contains(&5));
                assert_eq!(net.state(shared), PropagationState::Ready);
            }
        }
    }

    #[test]
    fn test_step_rules() {
        assert!(Algorithm::NaiveOnce.rules().retire);
        assert!(Algorithm::VectorOnce.rules().retire);
        assert!(!Algorithm::NaiveForever.rules().retire);
        assert_eq!(
            Algorithm::CentralisedMemorise.rules().senders,
            SenderPolicy::CentralOnly
        );
        assert_eq!(
            Algorithm::VectorOnce.rules().memorise,
            MemoriseRule::InheritFromFirstSender
        );
    }
}
