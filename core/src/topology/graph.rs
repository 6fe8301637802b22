use crate::prelude::{CoreResult, MoteId};
use crate::telemetry::log::LogManager;
use crate::topology::position::{MotePositions, Position};
use crate::topology::relationship::ParentMap;
use crate::topology::role::RoleColor;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Write;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: MoteId,
    /// Flipped position; `None` for motes only known through an edge.
    pub position: Option<Position>,
    pub role: RoleColor,
    pub implicit: bool,
}

/// Directed child → parent link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub child: MoteId,
    pub parent: MoteId,
}

/// Renderable DODAG: positioned, colored nodes plus parent edges.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopologyGraph {
    pub adversarial: bool,
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl TopologyGraph {
    pub fn node(&self, id: MoteId) -> Option<&GraphNode> {
        self.nodes.iter().find(|node| node.id == id)
    }

    /// Colors parallel to `nodes`.
    pub fn colors(&self) -> Vec<RoleColor> {
        self.nodes.iter().map(|node| node.role).collect()
    }

    pub fn parent_of(&self, id: MoteId) -> Option<MoteId> {
        self.edges
            .iter()
            .find(|edge| edge.child == id)
            .map(|edge| edge.parent)
    }

    pub fn to_json(&self) -> CoreResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Graphviz rendition with pinned positions, for `neato -n`.
    pub fn to_dot(&self) -> String {
        let mut dot = String::from("digraph dodag {\n    node [style=filled];\n");
        for node in &self.nodes {
            let _ = write!(
                dot,
                "    {} [label=\"{}\", fillcolor=\"{}\"",
                node.id,
                node.id,
                node.role.fill()
            );
            if let Some(position) = node.position {
                let _ = write!(dot, ", pos=\"{},{}!\"", position.x, position.y);
            }
            dot.push_str("];\n");
        }
        for edge in &self.edges {
            let _ = writeln!(dot, "    {} -> {};", edge.child, edge.parent);
        }
        dot.push_str("}\n");
        dot
    }
}

/// Turns mote positions and the final parent map into a [`TopologyGraph`].
pub struct TopologyGraphBuilder {
    adversarial: bool,
    logger: LogManager,
}

impl TopologyGraphBuilder {
    pub fn new(adversarial: bool) -> Self {
        Self {
            adversarial,
            logger: LogManager::new("dodag"),
        }
    }

    pub fn build(&self, positions: &MotePositions, parents: &ParentMap) -> TopologyGraph {
        let max_id = positions.keys().next_back().copied();
        let mut graph = TopologyGraph {
            adversarial: self.adversarial,
            ..Default::default()
        };
        let mut index: HashMap<MoteId, usize> = HashMap::with_capacity(positions.len());

        for (&id, position) in positions {
            index.insert(id, graph.nodes.len());
            graph.nodes.push(GraphNode {
                id,
                position: Some(position.flipped()),
                role: RoleColor::classify(id, max_id, self.adversarial),
                implicit: false,
            });
        }

        for (&child, &parent) in parents {
            for endpoint in [child, parent] {
                if index.contains_key(&endpoint) {
                    continue;
                }
                self.logger
                    .warn(&format!("mote {} has no declared position", endpoint));
                index.insert(endpoint, graph.nodes.len());
                graph.nodes.push(GraphNode {
                    id: endpoint,
                    position: None,
                    role: RoleColor::classify(endpoint, max_id, self.adversarial),
                    implicit: true,
                });
            }
            graph.edges.push(GraphEdge { child, parent });
        }

        self.logger.record(&format!(
            "DODAG with {} nodes and {} edges",
            graph.nodes.len(),
            graph.edges.len()
        ));
        graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> MotePositions {
        MotePositions::from([
            (0, Position::new(0.0, 0.0)),
            (1, Position::new(10.0, 0.0)),
            (2, Position::new(0.0, 10.0)),
            (3, Position::new(10.0, 10.0)),
        ])
    }

    #[test]
    fn builder_keeps_isolated_motes() {
        let parents = ParentMap::from([(1, 0)]);
        let graph = TopologyGraphBuilder::new(false).build(&square(), &parents);
        let ids: Vec<MoteId> = graph.nodes.iter().map(|node| node.id).collect();
        assert_eq!(ids, vec![0, 1, 2, 3]);
        assert_eq!(graph.edges, vec![GraphEdge { child: 1, parent: 0 }]);
        assert_eq!(graph.parent_of(2), None);
    }

    #[test]
    fn builder_flips_vertical_axis() {
        let graph = TopologyGraphBuilder::new(false).build(&square(), &ParentMap::new());
        assert_eq!(
            graph.node(3).and_then(|node| node.position),
            Some(Position::new(10.0, -10.0))
        );
    }

    #[test]
    fn adversarial_colors_follow_node_order() {
        let graph = TopologyGraphBuilder::new(true).build(&square(), &ParentMap::new());
        assert_eq!(
            graph.colors(),
            vec![
                RoleColor::Root,
                RoleColor::Normal,
                RoleColor::Normal,
                RoleColor::Suspect
            ]
        );
    }

    #[test]
    fn benign_colors_have_no_suspect() {
        let graph = TopologyGraphBuilder::new(false).build(&square(), &ParentMap::new());
        assert_eq!(graph.colors()[0], RoleColor::Root);
        assert!(graph.colors()[1..]
            .iter()
            .all(|role| *role == RoleColor::Normal));
    }

    #[test]
    fn unknown_parent_becomes_implicit_node() {
        let parents = ParentMap::from([(3, 9)]);
        let graph = TopologyGraphBuilder::new(true).build(&square(), &parents);
        let implicit = graph.node(9).unwrap();
        assert!(implicit.implicit);
        assert_eq!(implicit.position, None);
        assert_eq!(implicit.role, RoleColor::Normal);
        assert_eq!(graph.nodes.len(), 5);
    }

    #[test]
    fn dot_output_pins_positions_and_colors() {
        let parents = ParentMap::from([(1, 0)]);
        let dot = TopologyGraphBuilder::new(true).build(&square(), &parents).to_dot();
        assert!(dot.starts_with("digraph dodag {"));
        assert!(dot.contains("0 [label=\"0\", fillcolor=\"green\", pos=\"0,-0!\"];"));
        assert!(dot.contains("3 [label=\"3\", fillcolor=\"red\", pos=\"10,-10!\"];"));
        assert!(dot.contains("1 -> 0;"));
    }

    #[test]
    fn json_output_round_trips() {
        let graph = TopologyGraphBuilder::new(false).build(&square(), &ParentMap::from([(2, 0)]));
        let decoded: TopologyGraph = serde_json::from_str(&graph.to_json().unwrap()).unwrap();
        assert_eq!(decoded, graph);
    }
}
