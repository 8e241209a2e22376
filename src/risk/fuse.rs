use std::collections::HashMap;

use tracing::{debug, info};

use crate::feed::ParsedFeeds;

use super::graph::{
    BaseRiskEntry, EdgePattern, EntityType, FinalRiskEntry, FusionReport, RiskGraph, RiskIndex,
    TransactionEdge, WalletNode,
};

/// Joins topology with both risk feeds.
///
/// Duplicate topology ids keep their first occurrence; duplicate risk
/// records keep the last. Edges whose endpoints are not in the node list are
/// dropped before degrees are counted, so every degree matches a drawn edge.
pub fn fuse(parsed: ParsedFeeds) -> RiskGraph {
    let ParsedFeeds {
        topology,
        final_risk,
        risk_scores,
    } = parsed;

    let mut report = FusionReport {
        malformed_nodes: topology.skipped_nodes,
        malformed_edges: topology.skipped_edges,
        malformed_risk_records: final_risk.skipped + risk_scores.skipped,
        ..FusionReport::default()
    };

    let mut risk = RiskIndex::default();
    for record in final_risk.records {
        let replaced = risk.insert_final(
            record.id,
            FinalRiskEntry {
                final_risk: record.final_risk,
                reasons: record.reasons,
                gnn_risk: record.gnn_risk,
                delta: record.delta,
            },
        );
        report.duplicate_risk_records += usize::from(replaced);
    }
    for record in risk_scores.records {
        let replaced = risk.insert_base(
            record.id,
            BaseRiskEntry {
                base_risk: record.base_risk,
                factors: record.factors,
            },
        );
        report.duplicate_risk_records += usize::from(replaced);
    }

    let mut index_by_id = HashMap::with_capacity(topology.nodes.len());
    let mut nodes = Vec::with_capacity(topology.nodes.len());
    for node in topology.nodes {
        if index_by_id.contains_key(&node.id) {
            debug!(id = %node.id, "skipping duplicate node");
            report.duplicate_nodes += 1;
            continue;
        }

        let final_entry = risk.final_risk(&node.id);
        let wallet = WalletNode {
            entity_type: EntityType::resolve(node.entity_type.as_deref(), &node.id),
            degree: 0,
            final_risk: final_entry.map(|entry| entry.final_risk),
            base_risk: risk.base_risk(&node.id).map(|entry| entry.base_risk),
            reasons: final_entry
                .map(|entry| entry.reasons.clone())
                .unwrap_or_default(),
            id: node.id,
        };
        index_by_id.insert(wallet.id.clone(), nodes.len());
        nodes.push(wallet);
    }

    let mut edges = Vec::with_capacity(topology.edges.len());
    for edge in topology.edges {
        let (Some(&source), Some(&target)) =
            (index_by_id.get(&edge.source), index_by_id.get(&edge.target))
        else {
            debug!(source = %edge.source, target = %edge.target, "dropping edge with unknown endpoint");
            report.dangling_edges += 1;
            continue;
        };

        nodes[source].degree += 1;
        nodes[target].degree += 1;
        edges.push(TransactionEdge {
            source,
            target,
            pattern: EdgePattern::parse(edge.pattern.as_deref()),
            amount: edge.amount,
        });
    }

    info!(
        nodes = nodes.len(),
        edges = edges.len(),
        dropped = report.dropped_total(),
        duplicate_risk_records = report.duplicate_risk_records,
        "fused risk graph"
    );

    RiskGraph {
        nodes,
        edges,
        index_by_id,
        risk,
        report,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::*;
    use crate::feed::{RawFeeds, parse_feeds};

    fn fuse_json(graph: Value, final_risk: Value, risk_scores: Value) -> RiskGraph {
        let raw = RawFeeds {
            graph,
            final_risk,
            risk_scores,
        };
        fuse(parse_feeds(&raw).expect("feeds parse"))
    }

    fn node<'a>(graph: &'a RiskGraph, id: &str) -> Option<&'a WalletNode> {
        graph.index_of(id).map(|index| &graph.nodes[index])
    }

    fn degree(graph: &RiskGraph, id: &str) -> usize {
        node(&graph, id).expect("node exists").degree
    }

    #[test]
    fn degree_counts_both_endpoints() {
        let graph = fuse_json(
            json!({
                "nodes": [{"id": "A"}, {"id": "B"}, {"id": "C"}],
                "edges": [{"source": "A", "target": "B"}, {"source": "B", "target": "C"}]
            }),
            json!({"wallets": []}),
            json!({"wallets": []}),
        );

        assert_eq!(degree(&graph, "A"), 1);
        assert_eq!(degree(&graph, "B"), 2);
        assert_eq!(degree(&graph, "C"), 1);
        assert_eq!(graph.degree_range(), Some((1, 2)));
    }

    #[test]
    fn attaches_risk_and_leaves_missing_wallets_empty() {
        let graph = fuse_json(
            json!({
                "nodes": [{"id": "a"}, {"id": "b"}],
                "edges": [{"source": "a", "target": "b", "pattern": "smurfing"}]
            }),
            json!({"wallets": [{"id": "a", "final_risk": 0.9, "reasons": ["fan-out"]}]}),
            json!({"wallets": [{"id": "a", "base_risk": 0.5}]}),
        );

        let a = node(&graph, "a").expect("a exists");
        assert_eq!(a.final_risk, Some(0.9));
        assert_eq!(a.base_risk, Some(0.5));
        assert_eq!(a.reasons, ["fan-out"]);

        let b = node(&graph, "b").expect("b exists");
        assert_eq!(b.final_risk, None);
        assert_eq!(b.base_risk, None);
        assert!(b.reasons.is_empty());

        assert_eq!(graph.edges[0].pattern, EdgePattern::Smurfing);
        assert_eq!(graph.suspicious_edge_count(), 1);
    }

    #[test]
    fn edges_with_unknown_endpoints_are_dropped() {
        let graph = fuse_json(
            json!({
                "nodes": [{"id": "a"}, {"id": "b"}],
                "edges": [
                    {"source": "a", "target": "ghost"},
                    {"source": "a", "target": "b"},
                    {"source": "phantom", "target": "b"}
                ]
            }),
            json!({}),
            json!({}),
        );

        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.report.dangling_edges, 2);
        assert_eq!(degree(&graph, "a"), 1);
        assert_eq!(degree(&graph, "b"), 1);
        assert!(node(&graph, "ghost").is_none());
    }

    #[test]
    fn duplicates_follow_first_node_and_last_risk_record() {
        let graph = fuse_json(
            json!({
                "nodes": [{"id": "a", "entity_type": "service"}, {"id": "a", "entity_type": "wallet"}],
                "edges": []
            }),
            json!({"wallets": [
                {"id": "a", "final_risk": 0.1, "reasons": ["first"]},
                {"id": "a", "final_risk": 0.7, "reasons": ["second"]}
            ]}),
            json!({"wallets": []}),
        );

        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.report.duplicate_nodes, 1);
        assert_eq!(graph.report.duplicate_risk_records, 1);
        let a = node(&graph, "a").expect("a exists");
        assert_eq!(a.entity_type, EntityType::Service);
        assert_eq!(a.final_risk, Some(0.7));
        assert_eq!(a.reasons, ["second"]);
    }

    #[test]
    fn empty_topology_fuses_to_empty_graph() {
        let graph = fuse_json(json!({"nodes": [], "edges": []}), json!({}), json!({}));
        assert_eq!(graph.node_count(), 0);
        assert_eq!(graph.edge_count(), 0);
        assert_eq!(graph.degree_range(), None);
        assert_eq!(graph.report, FusionReport::default());
    }

    #[test]
    fn malformed_records_are_counted() {
        let graph = fuse_json(
            json!({"nodes": [{"id": "a"}, {}], "edges": [{"target": "a"}]}),
            json!({"wallets": [{"id": "a"}]}),
            json!({"wallets": [{"id": "a", "base_risk": 0.4}]}),
        );

        assert_eq!(graph.report.malformed_nodes, 1);
        assert_eq!(graph.report.malformed_edges, 1);
        assert_eq!(graph.report.malformed_risk_records, 1);
        assert_eq!(graph.report.dropped_total(), 3);
        let a = node(&graph, "a").expect("a exists");
        assert_eq!(a.final_risk, None);
        assert_eq!(a.base_risk, Some(0.4));
    }

    #[test]
    fn self_loop_counts_twice() {
        let graph = fuse_json(
            json!({"nodes": [{"id": "a"}], "edges": [{"source": "a", "target": "a"}]}),
            json!({}),
            json!({}),
        );
        assert_eq!(degree(&graph, "a"), 2);
    }

    #[test]
    fn top_by_final_risk_puts_missing_last() {
        let graph = fuse_json(
            json!({"nodes": [{"id": "low"}, {"id": "none"}, {"id": "high"}]}),
            json!({"wallets": [
                {"id": "low", "final_risk": 0.2},
                {"id": "high", "final_risk": 0.95}
            ]}),
            json!({}),
        );

        let ranked = graph
            .top_by_final_risk(3)
            .into_iter()
            .map(|index| graph.nodes[index].id.as_str())
            .collect::<Vec<_>>();
        assert_eq!(ranked, ["high", "low", "none"]);
    }
}
