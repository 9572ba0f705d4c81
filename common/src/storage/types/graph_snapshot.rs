use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::stored_object;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GraphNode {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: String,
    pub label: String,
    pub properties: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GraphEdge {
    pub id: String,
    #[serde(rename = "type")]
    pub edge_type: String,
    pub source: String,
    pub target: String,
    pub properties: serde_json::Value,
}

stored_object!(GraphSnapshot, "graph_snapshot", {
    nodes: Vec<GraphNode>,
    edges: Vec<GraphEdge>,
});

impl GraphSnapshot {
    /// Every edge endpoint must resolve to a node in the same snapshot, and no
    /// (source, type, target) triple may repeat.
    pub fn is_internally_consistent(&self) -> bool {
        let node_ids: HashSet<&str> = self.nodes.iter().map(|n| n.id.as_str()).collect();
        let mut seen_triples = HashSet::new();

        for edge in &self.edges {
            if edge.source == edge.target {
                return false;
            }
            if !node_ids.contains(edge.source.as_str()) || !node_ids.contains(edge.target.as_str())
            {
                return false;
            }
            if !seen_triples.insert((edge.source.as_str(), edge.edge_type.as_str(), edge.target.as_str())) {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str) -> GraphNode {
        GraphNode {
            id: id.into(),
            node_type: "ingredient".into(),
            label: id.into(),
            properties: serde_json::json!({}),
        }
    }

    fn edge(source: &str, edge_type: &str, target: &str) -> GraphEdge {
        GraphEdge {
            id: format!("{source}-{edge_type}-{target}"),
            edge_type: edge_type.into(),
            source: source.into(),
            target: target.into(),
            properties: serde_json::json!({}),
        }
    }

    #[test]
    fn rejects_dangling_edge() {
        let now = chrono::Utc::now();
        let snapshot = GraphSnapshot {
            id: "snap:1".into(),
            created_at: now,
            updated_at: now,
            nodes: vec![node("ingredient:oat_flour")],
            edges: vec![edge("ingredient:oat_flour", "CONTAINS", "recipe:1")],
        };
        assert!(!snapshot.is_internally_consistent());
    }

    #[test]
    fn rejects_self_loop_and_duplicate_triples() {
        let now = chrono::Utc::now();
        let mut snapshot = GraphSnapshot {
            id: "snap:2".into(),
            created_at: now,
            updated_at: now,
            nodes: vec![node("recipe:1"), node("ingredient:oat_flour")],
            edges: vec![edge("recipe:1", "CONTAINS", "recipe:1")],
        };
        assert!(!snapshot.is_internally_consistent());

        snapshot.edges = vec![
            edge("recipe:1", "CONTAINS", "ingredient:oat_flour"),
            edge("recipe:1", "CONTAINS", "ingredient:oat_flour"),
        ];
        assert!(!snapshot.is_internally_consistent());
    }

    #[test]
    fn accepts_well_formed_snapshot() {
        let now = chrono::Utc::now();
        let snapshot = GraphSnapshot {
            id: "snap:3".into(),
            created_at: now,
            updated_at: now,
            nodes: vec![node("recipe:1"), node("ingredient:oat_flour")],
            edges: vec![edge("recipe:1", "CONTAINS", "ingredient:oat_flour")],
        };
        assert!(snapshot.is_internally_consistent());
    }
}
