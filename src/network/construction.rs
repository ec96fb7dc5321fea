use std::io::Read;

use anyhow::{anyhow, bail, Result};

use crate::network::model::{Network, RawEdge, RawNetwork, RawNode};

/// Builds in-memory networks from edge lists or their JSON representation.
#[derive(Debug, Default)]
pub struct NetworkLoader;

impl NetworkLoader {
    /// Build a network from `(source, target)` name pairs, creating nodes on
    /// first mention. Repeated pairs collapse onto one edge.
    pub fn from_edge_names<'a, I>(pairs: I) -> Network
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut network = Network::new();
        for (source, target) in pairs {
            let source_idx = network.ensure_node(source);
            let target_idx = network.ensure_node(target);
            // Indices come straight from ensure_node, so this cannot fail.
            let _ = network.add_edge(source_idx, target_idx, 1.0);
        }
        network
    }

    /// Parse a JSON string into a network.
    pub fn from_json_str(json: &str) -> Result<Network> {
        let raw: RawNetwork = serde_json::from_str(json)?;
        Self::from_raw_network(raw)
    }

    pub fn from_reader<R: Read>(mut reader: R) -> Result<Network> {
        let mut buf = String::new();
        reader.read_to_string(&mut buf)?;
        Self::from_json_str(&buf)
    }

    fn from_raw_network(raw: RawNetwork) -> Result<Network> {
        let mut network = Network::new();
        for raw_node in &raw.nodes {
            if network.index_of(&raw_node.id).is_some() {
                bail!("duplicate node id '{}'", raw_node.id);
            }
            network.ensure_node(&raw_node.id);
        }

        for raw_edge in &raw.edges {
            let source = network
                .index_of(&raw_edge.source)
                .ok_or_else(|| anyhow!("unknown source node id: {}", raw_edge.source))?;
            let target = network
                .index_of(&raw_edge.target)
                .ok_or_else(|| anyhow!("unknown target node id: {}", raw_edge.target))?;
            network.add_edge(source, target, raw_edge.weight)?;
        }

        Ok(network)
    }
}

/// Exports networks back to the JSON shape the loader accepts.
pub struct NetworkWriter;

impl NetworkWriter {
    pub fn to_raw_network(network: &Network) -> RawNetwork {
        let nodes = network
            .node_names()
            .into_iter()
            .map(|id| RawNode { id })
            .collect();

        let adjacency = network.adjacency_matrix();
        let edges = network
            .edges()
            .into_iter()
            .map(|(source_idx, target_idx)| RawEdge {
                source: network
                    .node_name(source_idx)
                    .expect("edge endpoint must exist")
                    .to_string(),
                target: network
                    .node_name(target_idx)
                    .expect("edge endpoint must exist")
                    .to_string(),
                weight: adjacency[[source_idx, target_idx]],
            })
            .collect();

        RawNetwork { nodes, edges }
    }

    pub fn to_json_string(network: &Network) -> Result<String> {
        let raw = Self::to_raw_network(network);
        Ok(serde_json::to_string_pretty(&raw)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_network_json() -> String {
        r#"{
            "nodes": [
                {"id": "u"},
                {"id": "v"},
                {"id": "w"}
            ],
            "edges": [
                {"source": "u", "target": "v", "weight": 2.0},
                {"source": "v", "target": "w"}
            ]
        }"#
        .to_string()
    }

    #[test]
    fn load_json_network_counts_match() {
        let network = NetworkLoader::from_json_str(&sample_network_json()).expect("load network");
        assert_eq!(network.node_count(), 3);
        assert_eq!(network.edge_count(), 2);
        assert_eq!(network.index_of("u"), Some(0));
        assert_eq!(network.adjacency_matrix()[[0, 1]], 2.0);
        assert_eq!(network.adjacency_matrix()[[1, 2]], 1.0, "default weight");
    }

    #[test]
    fn unknown_endpoint_is_rejected() {
        let json = r#"{
            "nodes": [{"id": "u"}],
            "edges": [{"source": "u", "target": "ghost"}]
        }"#;
        let err = NetworkLoader::from_json_str(json).unwrap_err();
        assert!(err.to_string().contains("ghost"));
    }

    #[test]
    fn edge_name_builder_collapses_duplicates() {
        let network = NetworkLoader::from_edge_names(vec![
            ("a", "b"),
            ("b", "c"),
            ("a", "b"),
            ("c", "a"),
        ]);
        assert_eq!(network.node_count(), 3);
        assert_eq!(network.edge_count(), 3);
        assert!(network.has_edge(0, 1));
    }

    #[test]
    fn json_round_trip_preserves_structure() {
        let network = NetworkLoader::from_json_str(&sample_network_json()).expect("load network");
        let json = NetworkWriter::to_json_string(&network).expect("serialize");
        let reloaded = NetworkLoader::from_json_str(&json).expect("reload");
        assert_eq!(reloaded.node_count(), network.node_count());
        assert_eq!(reloaded.edges(), network.edges());
        assert_eq!(reloaded.adjacency_matrix(), network.adjacency_matrix());
    }
}
