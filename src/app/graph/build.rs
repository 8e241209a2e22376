use crate::risk::RiskGraph;
use crate::util::short_id;

use super::super::encoding::{EdgeStyle, NodeStyle, RadiusScale, edge_style, node_style};
use super::super::physics::{NodeSeed, Simulation, SimulationParams};

/// Per-node visual attributes, resolved once when the graph is loaded.
#[derive(Clone, Debug, PartialEq)]
pub(in crate::app) struct SceneNode {
    pub(in crate::app) label: String,
    pub(in crate::app) style: NodeStyle,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(in crate::app) struct SceneEdge {
    pub(in crate::app) source: usize,
    pub(in crate::app) target: usize,
    pub(in crate::app) style: EdgeStyle,
}

/// Scene elements indexed like the nodes and edges of the fused graph.
#[derive(Clone, Debug, Default)]
pub(in crate::app) struct Scene {
    pub(in crate::app) nodes: Vec<SceneNode>,
    pub(in crate::app) edges: Vec<SceneEdge>,
}

impl Scene {
    pub(in crate::app) fn from_graph(graph: &RiskGraph) -> Self {
        let scale = RadiusScale::from_range(graph.degree_range());

        let nodes = graph
            .nodes
            .iter()
            .map(|node| SceneNode {
                label: short_id(&node.id),
                style: node_style(node, &scale),
            })
            .collect();

        let edges = graph
            .edges
            .iter()
            .map(|edge| SceneEdge {
                source: edge.source,
                target: edge.target,
                style: edge_style(edge.pattern),
            })
            .collect();

        Self { nodes, edges }
    }

    pub(in crate::app) fn simulation(&self, graph: &RiskGraph, params: SimulationParams) -> Simulation {
        let seeds = graph
            .nodes
            .iter()
            .zip(&self.nodes)
            .map(|(node, scene_node)| NodeSeed {
                id: &node.id,
                radius: scene_node.style.radius,
            })
            .collect::<Vec<_>>();
        let links = self
            .edges
            .iter()
            .map(|edge| (edge.source, edge.target))
            .collect::<Vec<_>>();

        Simulation::new(&seeds, &links, params)
    }
}

#[cfg(test)]
pub(in crate::app) mod tests {
    use serde_json::json;

    use super::*;
    use crate::app::encoding::{MAX_NODE_RADIUS, MIN_NODE_RADIUS, RiskTier};
    use crate::feed::{RawFeeds, parse_feeds};
    use crate::risk::{EdgePattern, fuse};

    /// Three wallets: `a` critical with reasons, `b` without any risk
    /// records, `c` low. One smurfing edge and one normal edge.
    pub(in crate::app) fn scenario_graph() -> RiskGraph {
        let raw = RawFeeds {
            graph: json!({
                "nodes": [
                    { "id": "a", "entity_type": "wallet" },
                    { "id": "b", "entity_type": "wallet" },
                    { "id": "c", "entity_type": "wallet" }
                ],
                "edges": [
                    { "source": "a", "target": "b", "pattern": "smurfing", "amount": 12.5 },
                    { "source": "b", "target": "c", "amount": 1.0 }
                ]
            }),
            final_risk: json!({
                "wallets": [
                    { "id": "a", "final_risk": 0.92, "reasons": ["Fan-out to 14 fresh wallets"] },
                    { "id": "c", "final_risk": 0.1, "reasons": [] }
                ]
            }),
            risk_scores: json!({
                "wallets": [
                    { "id": "a", "base_risk": 0.71 },
                    { "id": "c", "base_risk": 0.05 }
                ]
            }),
        };

        fuse(parse_feeds(&raw).expect("scenario feeds parse"))
    }

    #[test]
    fn scene_mirrors_graph_order_and_styles() {
        let graph = scenario_graph();
        let scene = Scene::from_graph(&graph);

        assert_eq!(scene.nodes.len(), 3);
        assert_eq!(scene.edges.len(), 2);

        let a = graph.index_by_id["a"];
        let b = graph.index_by_id["b"];
        assert_eq!(scene.nodes[a].style.tier, RiskTier::Critical);
        assert!(scene.nodes[a].style.glow);
        assert_eq!(scene.nodes[b].style.tier, RiskTier::Low);
        // degree a = 1, b = 2
        assert_eq!(scene.nodes[a].style.radius, MIN_NODE_RADIUS);
        assert_eq!(scene.nodes[b].style.radius, MAX_NODE_RADIUS);

        let smurfing = scene
            .edges
            .iter()
            .find(|edge| edge.source == a && edge.target == b)
            .expect("smurfing edge");
        assert_eq!(smurfing.style, edge_style(EdgePattern::Smurfing));
        assert!(smurfing.style.marker);
    }

    #[test]
    fn simulation_covers_every_node() {
        let graph = scenario_graph();
        let scene = Scene::from_graph(&graph);
        let simulation = scene.simulation(&graph, SimulationParams::default());
        assert_eq!(simulation.node_count(), 3);
    }

    #[test]
    fn empty_graph_builds_empty_scene() {
        let graph = RiskGraph::default();
        let scene = Scene::from_graph(&graph);
        assert!(scene.nodes.is_empty());
        assert!(scene.edges.is_empty());
        assert_eq!(scene.simulation(&graph, SimulationParams::default()).node_count(), 0);
    }
}
