pub mod graph;
pub mod position;
pub mod relationship;
pub mod role;

pub use graph::{GraphEdge, GraphNode, TopologyGraph, TopologyGraphBuilder};
pub use position::{CscPositionSource, MotePositions, Position, PositionSource};
pub use relationship::{ParentMap, RelationshipEvent, RelationshipHistory, TopologyEdgeExtractor};
pub use role::RoleColor;
