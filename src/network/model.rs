use anyhow::{anyhow, bail, Result};
use indexmap::{IndexMap, IndexSet};
use ndarray::Array2;
use petgraph::graph::DiGraph;
use petgraph::prelude::NodeIndex;
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};

use crate::network::covariates::{EdgeCovariate, NodeCovariate};

pub type NodeName = String;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeAttributes {
    pub name: NodeName,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeAttributes {
    pub weight: f64,
}

impl Default for EdgeAttributes {
    fn default() -> Self {
        Self { weight: 1.0 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawNetwork {
    pub nodes: Vec<RawNode>,
    pub edges: Vec<RawEdge>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawNode {
    pub id: NodeName,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawEdge {
    pub source: NodeName,
    pub target: NodeName,
    #[serde(default = "default_edge_weight")]
    pub weight: f64,
}

fn default_edge_weight() -> f64 {
    1.0
}

pub type DirectedEdges = DiGraph<NodeAttributes, EdgeAttributes>;

/// A directed network over nodes indexed `0..N-1`. Node index `i` always
/// corresponds to the `i`-th entry of `node_lookup`; nodes are never removed.
#[derive(Debug, Clone, Default)]
pub struct Network {
    pub graph: DirectedEdges,
    pub node_lookup: IndexMap<NodeName, NodeIndex>,
    pub node_covariates: IndexMap<String, NodeCovariate>,
    pub edge_covariates: IndexMap<String, EdgeCovariate>,
}

impl Network {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn node_name(&self, index: usize) -> Option<&str> {
        self.graph
            .node_weight(NodeIndex::new(index))
            .map(|attrs| attrs.name.as_str())
    }

    pub fn node_names(&self) -> Vec<NodeName> {
        self.node_lookup.keys().cloned().collect()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.node_lookup.get(name).map(|idx| idx.index())
    }

    /// Look up the node named `name`, inserting it when absent.
    pub fn ensure_node(&mut self, name: &str) -> usize {
        if let Some(idx) = self.node_lookup.get(name) {
            return idx.index();
        }
        let idx = self.graph.add_node(NodeAttributes {
            name: name.to_string(),
        });
        self.node_lookup.insert(name.to_string(), idx);
        idx.index()
    }

    /// Set the directed edge `source -> target`, replacing any existing weight.
    pub fn add_edge(&mut self, source: usize, target: usize, weight: f64) -> Result<()> {
        let node_count = self.node_count();
        if source >= node_count || target >= node_count {
            bail!(
                "edge ({source}, {target}) outside node range 0..{}",
                node_count
            );
        }
        self.graph.update_edge(
            NodeIndex::new(source),
            NodeIndex::new(target),
            EdgeAttributes { weight },
        );
        Ok(())
    }

    pub fn has_edge(&self, source: usize, target: usize) -> bool {
        self.graph
            .find_edge(NodeIndex::new(source), NodeIndex::new(target))
            .is_some()
    }

    pub fn edges(&self) -> Vec<(usize, usize)> {
        self.graph
            .edge_references()
            .map(|edge| (edge.source().index(), edge.target().index()))
            .collect()
    }

    pub fn adjacency_matrix(&self) -> Array2<f64> {
        let n = self.node_count();
        let mut matrix = Array2::zeros((n, n));
        for edge in self.graph.edge_references() {
            matrix[[edge.source().index(), edge.target().index()]] = edge.weight().weight;
        }
        matrix
    }

    pub fn new_node_covariate(&mut self, name: &str) -> &mut NodeCovariate {
        let covariate = NodeCovariate::new(self.node_names());
        self.node_covariates.insert(name.to_string(), covariate);
        self.node_covariates.get_mut(name).expect("just inserted")
    }

    pub fn new_edge_covariate(&mut self, name: &str) -> &mut EdgeCovariate {
        let covariate = EdgeCovariate::new(self.node_names());
        self.edge_covariates.insert(name.to_string(), covariate);
        self.edge_covariates.get_mut(name).expect("just inserted")
    }

    /// Induced subnetwork over `indices`, in that order: node `k` of the
    /// result is node `indices[k]` of `self`. Keeps edges with both endpoints
    /// selected and restricts covariates; repeated indices are an error.
    pub fn subnetwork(&self, indices: &[usize]) -> Result<Network> {
        let node_count = self.node_count();
        let mut seen: IndexSet<usize> = IndexSet::with_capacity(indices.len());
        for &index in indices {
            if index >= node_count {
                bail!("subnetwork index {index} outside node range 0..{node_count}");
            }
            if !seen.insert(index) {
                bail!("subnetwork index {index} requested more than once");
            }
        }

        let mut graph = DirectedEdges::with_capacity(indices.len(), indices.len());
        let mut node_lookup = IndexMap::with_capacity(indices.len());
        let mut index_mapping: IndexMap<NodeIndex, NodeIndex> =
            IndexMap::with_capacity(indices.len());

        for &index in indices {
            let old_idx = NodeIndex::new(index);
            let attrs = self
                .graph
                .node_weight(old_idx)
                .ok_or_else(|| anyhow!("node {index} missing from graph storage"))?;
            let new_idx = graph.add_node(attrs.clone());
            node_lookup.insert(attrs.name.clone(), new_idx);
            index_mapping.insert(old_idx, new_idx);
        }

        for edge in self.graph.edge_references() {
            if let (Some(&new_source), Some(&new_target)) = (
                index_mapping.get(&edge.source()),
                index_mapping.get(&edge.target()),
            ) {
                graph.add_edge(new_source, new_target, edge.weight().clone());
            }
        }

        let node_covariates = self
            .node_covariates
            .iter()
            .map(|(name, covariate)| Ok((name.clone(), covariate.subset(indices)?)))
            .collect::<Result<IndexMap<_, _>>>()?;
        let edge_covariates = self
            .edge_covariates
            .iter()
            .map(|(name, covariate)| Ok((name.clone(), covariate.subset(indices)?)))
            .collect::<Result<IndexMap<_, _>>>()?;

        Ok(Network {
            graph,
            node_lookup,
            node_covariates,
            edge_covariates,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weighted_square() -> Network {
        let mut network = Network::new();
        for name in ["a", "b", "c", "d"] {
            network.ensure_node(name);
        }
        network.add_edge(0, 1, 1.5).expect("edge");
        network.add_edge(1, 2, 2.5).expect("edge");
        network.add_edge(2, 0, 3.5).expect("edge");
        network.add_edge(3, 2, 4.5).expect("edge");

        let ages = network.new_node_covariate("age");
        for (index, value) in [10.0, 11.0, 12.0, 13.0].into_iter().enumerate() {
            ages.set(index, value).expect("set");
        }
        let costs = network.new_edge_covariate("cost");
        costs.set(2, 0, 0.25).expect("set");
        costs.set(3, 2, 0.75).expect("set");
        network
    }

    #[test]
    fn subnetwork_keeps_the_requested_node_order() {
        let network = weighted_square();
        let sub = network.subnetwork(&[2, 0, 3]).expect("subnetwork");
        assert_eq!(sub.node_names(), vec!["c", "a", "d"]);
        assert_eq!(sub.index_of("c"), Some(0));
        assert_eq!(sub.index_of("d"), Some(2));
    }

    #[test]
    fn subnetwork_keeps_only_intra_subset_edges_with_weights() {
        let network = weighted_square();
        let sub = network.subnetwork(&[2, 0, 3]).expect("subnetwork");
        // b is excluded, so a->b and b->c drop; c->a and d->c survive.
        assert_eq!(sub.edge_count(), 2);
        let adjacency = sub.adjacency_matrix();
        assert_eq!(adjacency[[0, 1]], 3.5, "c -> a");
        assert_eq!(adjacency[[2, 0]], 4.5, "d -> c");
        assert_eq!(adjacency[[1, 0]], 0.0);
    }

    #[test]
    fn subnetwork_restricts_covariates_in_the_same_order() {
        let network = weighted_square();
        let sub = network.subnetwork(&[2, 0, 3]).expect("subnetwork");

        let ages = &sub.node_covariates["age"];
        assert_eq!(ages.values().to_vec(), vec![12.0, 10.0, 13.0]);

        let costs = &sub.edge_covariates["cost"];
        assert_eq!(costs.get(0, 1), 0.25, "was (2, 0)");
        assert_eq!(costs.get(2, 0), 0.75, "was (3, 2)");
        assert_eq!(costs.get(1, 0), 0.0);
    }

    #[test]
    fn subnetwork_rejects_repeated_and_out_of_range_indices() {
        let network = weighted_square();
        let err = network.subnetwork(&[1, 1]).unwrap_err();
        assert!(err.to_string().contains("more than once"));
        let err = network.subnetwork(&[4]).unwrap_err();
        assert!(err.to_string().contains("outside node range"));
    }
}
