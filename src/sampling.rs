use anyhow::{bail, Result};
use indexmap::IndexSet;
use log::trace;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};

use crate::network::Network;

// Collecting endpoints by uniform edge draws is coupon collection over
// edges, so edges * ln(edges) draws suffice; 64 exceeds ln of any feasible
// edge count.
const DRAW_BUDGET_FACTOR: usize = 64;

// Uniform restarts reach any remaining node with probability 1/n, so
// n * ln(n) restarts suffice even on an edgeless network.
const RESTART_BUDGET_FACTOR: usize = 64;

/// How subnetwork indices are drawn from the full network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplingStrategy {
    /// Uniform permutation prefix. The only strategy with a held-out test
    /// set, which contains the train set as a prefix, not disjoint from it.
    Node,
    Edge,
    Link,
    LinkForward,
}

impl SamplingStrategy {
    pub fn label(&self) -> &'static str {
        match self {
            SamplingStrategy::Node => "node",
            SamplingStrategy::Edge => "edge",
            SamplingStrategy::Link => "link",
            SamplingStrategy::LinkForward => "link_forward",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplerConfig {
    pub train_size: usize,
    pub test_size: usize,
    pub strategy: SamplingStrategy,
    pub seed: Option<u64>,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            train_size: 10,
            test_size: 0,
            strategy: SamplingStrategy::Node,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubnetworkSample {
    pub train: Vec<usize>,
    pub test: Option<Vec<usize>>,
}

#[derive(Debug)]
enum StrategyState {
    Node,
    Edge {
        sources: Vec<usize>,
        targets: Vec<usize>,
    },
    Trace {
        neighbors: Vec<IndexSet<usize>>,
    },
}

/// Draws index subsets from a fixed network under one strategy; a seeded
/// sampler replays the identical sequence of subsets.
#[derive(Debug)]
pub struct SubnetworkSampler {
    config: SamplerConfig,
    node_count: usize,
    state: StrategyState,
    rng: Xoshiro256PlusPlus,
}

impl SubnetworkSampler {
    pub fn new(network: &Network, config: SamplerConfig) -> Result<Self> {
        let node_count = network.node_count();

        let state = match config.strategy {
            SamplingStrategy::Node => {
                if config.train_size.saturating_add(config.test_size) > node_count {
                    bail!(
                        "requested train {} + test {} nodes, but the network only has {}",
                        config.train_size,
                        config.test_size,
                        node_count
                    );
                }
                StrategyState::Node
            }
            SamplingStrategy::Edge => {
                reject_test_set(&config)?;
                let mut sources = Vec::with_capacity(network.edge_count());
                let mut targets = Vec::with_capacity(network.edge_count());
                let mut endpoints: IndexSet<usize> = IndexSet::new();
                for (source, target) in network.edges() {
                    sources.push(source);
                    targets.push(target);
                    endpoints.insert(source);
                    endpoints.insert(target);
                }
                if config.train_size > endpoints.len() {
                    bail!(
                        "requested {} nodes, but edge sampling can only reach {} distinct endpoints",
                        config.train_size,
                        endpoints.len()
                    );
                }
                StrategyState::Edge { sources, targets }
            }
            SamplingStrategy::Link | SamplingStrategy::LinkForward => {
                reject_test_set(&config)?;
                if config.train_size > node_count {
                    bail!(
                        "requested {} nodes, but the network only has {}",
                        config.train_size,
                        node_count
                    );
                }
                let undirected = config.strategy == SamplingStrategy::Link;
                let mut neighbors: Vec<IndexSet<usize>> = vec![IndexSet::new(); node_count];
                for (source, target) in network.edges() {
                    neighbors[source].insert(target);
                    if undirected {
                        neighbors[target].insert(source);
                    }
                }
                StrategyState::Trace { neighbors }
            }
        };

        let rng = Xoshiro256PlusPlus::seed_from_u64(config.seed.unwrap_or_else(random_seed));
        Ok(Self {
            config,
            node_count,
            state,
            rng,
        })
    }

    /// Draw one subset of exactly `train_size` distinct indices.
    pub fn sample(&mut self) -> Result<SubnetworkSample> {
        let config = &self.config;
        let rng = &mut self.rng;
        match &self.state {
            StrategyState::Node => sample_node(self.node_count, config, rng),
            StrategyState::Edge { sources, targets } => sample_edge(sources, targets, config, rng),
            StrategyState::Trace { neighbors } => {
                sample_trace(neighbors, self.node_count, config, rng)
            }
        }
    }

    pub fn strategy(&self) -> SamplingStrategy {
        self.config.strategy
    }
}

fn reject_test_set(config: &SamplerConfig) -> Result<()> {
    if config.test_size > 0 {
        bail!(
            "held-out test sets are only defined for the node strategy, not {}",
            config.strategy.label()
        );
    }
    Ok(())
}

fn sample_node(
    node_count: usize,
    config: &SamplerConfig,
    rng: &mut Xoshiro256PlusPlus,
) -> Result<SubnetworkSample> {
    let prefix = config.train_size + config.test_size;
    let mut permutation: Vec<usize> = (0..node_count).collect();
    // The chosen elements come back in the first returned slice, not at the
    // front of the vector.
    let (shuffled, _) = permutation.partial_shuffle(rng, prefix);

    let train = shuffled[..config.train_size].to_vec();
    let test = if config.test_size > 0 {
        Some(shuffled[..prefix].to_vec())
    } else {
        None
    };
    Ok(SubnetworkSample { train, test })
}

fn sample_edge(
    sources: &[usize],
    targets: &[usize],
    config: &SamplerConfig,
    rng: &mut Xoshiro256PlusPlus,
) -> Result<SubnetworkSample> {
    let target_size = config.train_size;
    if target_size == 0 {
        return Ok(SubnetworkSample {
            train: Vec::new(),
            test: None,
        });
    }

    let edge_total = sources.len();
    let draw_budget = DRAW_BUDGET_FACTOR * edge_total.max(target_size);
    let mut selected: IndexSet<usize> = IndexSet::with_capacity(target_size);
    let mut draws = 0usize;

    while selected.len() < target_size {
        if draws >= draw_budget {
            bail!(
                "edge sampling exhausted: {} of {} nodes after {} draws",
                selected.len(),
                target_size,
                draws
            );
        }
        draws += 1;

        let edge = rng.gen_range(0..edge_total);
        let (source, target) = (sources[edge], targets[edge]);
        if selected.len() + 1 == target_size {
            // One slot left: without this coin flip the endpoint inserted
            // first below would always claim it.
            let first = if rng.gen_bool(0.5) { source } else { target };
            insert_bounded(&mut selected, target_size, first);
        }
        insert_bounded(&mut selected, target_size, source);
        insert_bounded(&mut selected, target_size, target);
    }

    Ok(SubnetworkSample {
        train: selected.into_iter().collect(),
        test: None,
    })
}

fn sample_trace(
    neighbors: &[IndexSet<usize>],
    node_count: usize,
    config: &SamplerConfig,
    rng: &mut Xoshiro256PlusPlus,
) -> Result<SubnetworkSample> {
    let target_size = config.train_size;
    if target_size == 0 {
        return Ok(SubnetworkSample {
            train: Vec::new(),
            test: None,
        });
    }

    let restart_budget = RESTART_BUDGET_FACTOR * node_count.max(target_size);
    let mut visited: IndexSet<usize> = IndexSet::with_capacity(target_size);
    let mut restarts = 0usize;
    let mut location = rng.gen_range(0..node_count);

    while visited.len() < target_size {
        visited.insert(location);
        if visited.len() == target_size {
            break;
        }

        let options = &neighbors[location];
        if options.iter().all(|node| visited.contains(node)) {
            // Dead end or cycle trap: every neighbor already visited.
            restarts += 1;
            if restarts > restart_budget {
                bail!(
                    "link sampling exhausted: {} of {} nodes after {} dead-end restarts",
                    visited.len(),
                    target_size,
                    restarts
                );
            }
            trace!("dead end at node {location}, restarting walk");
            location = rng.gen_range(0..node_count);
            continue;
        }

        location = options[rng.gen_range(0..options.len())];
    }

    Ok(SubnetworkSample {
        train: visited.into_iter().collect(),
        test: None,
    })
}

fn insert_bounded(selected: &mut IndexSet<usize>, capacity: usize, node: usize) -> bool {
    if selected.len() < capacity {
        selected.insert(node)
    } else {
        false
    }
}

fn random_seed() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64
}
