use std::collections::HashMap;

use crate::feed::RiskFactors;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EdgePattern {
    Smurfing,
    Peeling,
    Normal,
}

impl EdgePattern {
    pub const ALL: [Self; 3] = [Self::Smurfing, Self::Peeling, Self::Normal];

    /// Unknown or missing labels degrade to `Normal`.
    pub fn parse(label: Option<&str>) -> Self {
        match label {
            Some("smurfing") => Self::Smurfing,
            Some("peeling") => Self::Peeling,
            _ => Self::Normal,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Smurfing => "Smurfing",
            Self::Peeling => "Peeling",
            Self::Normal => "Normal",
        }
    }

    pub fn is_suspicious(self) -> bool {
        !matches!(self, Self::Normal)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntityType {
    Wallet,
    Service,
}

impl EntityType {
    pub fn resolve(declared: Option<&str>, id: &str) -> Self {
        match declared {
            Some("wallet") => Self::Wallet,
            Some("service") => Self::Service,
            _ if id.starts_with("0x") => Self::Wallet,
            _ => Self::Service,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Wallet => "wallet",
            Self::Service => "service",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct WalletNode {
    pub id: String,
    pub entity_type: EntityType,
    pub degree: usize,
    pub final_risk: Option<f64>,
    pub base_risk: Option<f64>,
    pub reasons: Vec<String>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TransactionEdge {
    pub source: usize,
    pub target: usize,
    pub pattern: EdgePattern,
    pub amount: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FinalRiskEntry {
    pub final_risk: f64,
    pub reasons: Vec<String>,
    pub gnn_risk: Option<f64>,
    pub delta: Option<f64>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BaseRiskEntry {
    pub base_risk: f64,
    pub factors: RiskFactors,
}

#[derive(Clone, Debug, Default)]
pub struct RiskIndex {
    final_risk: HashMap<String, FinalRiskEntry>,
    base_risk: HashMap<String, BaseRiskEntry>,
}

impl RiskIndex {
    /// Returns `true` when an earlier record for the same id was replaced.
    pub fn insert_final(&mut self, id: String, entry: FinalRiskEntry) -> bool {
        self.final_risk.insert(id, entry).is_some()
    }

    pub fn insert_base(&mut self, id: String, entry: BaseRiskEntry) -> bool {
        self.base_risk.insert(id, entry).is_some()
    }

    pub fn final_risk(&self, id: &str) -> Option<&FinalRiskEntry> {
        self.final_risk.get(id)
    }

    pub fn base_risk(&self, id: &str) -> Option<&BaseRiskEntry> {
        self.base_risk.get(id)
    }
}

/// Counts of records that fusion skipped or overrode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FusionReport {
    pub malformed_nodes: usize,
    pub malformed_edges: usize,
    pub malformed_risk_records: usize,
    pub duplicate_nodes: usize,
    pub duplicate_risk_records: usize,
    pub dangling_edges: usize,
}

impl FusionReport {
    pub fn dropped_total(&self) -> usize {
        self.malformed_nodes
            + self.malformed_edges
            + self.malformed_risk_records
            + self.duplicate_nodes
            + self.dangling_edges
    }
}

#[derive(Clone, Debug, Default)]
pub struct RiskGraph {
    pub nodes: Vec<WalletNode>,
    pub edges: Vec<TransactionEdge>,
    pub index_by_id: HashMap<String, usize>,
    pub risk: RiskIndex,
    pub report: FusionReport,
}

impl RiskGraph {
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn suspicious_edge_count(&self) -> usize {
        self.edges
            .iter()
            .filter(|edge| edge.pattern.is_suspicious())
            .count()
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index_by_id.get(id).copied()
    }

    pub fn degree_range(&self) -> Option<(usize, usize)> {
        let mut degrees = self.nodes.iter().map(|node| node.degree);
        let first = degrees.next()?;
        Some(degrees.fold((first, first), |(min, max), degree| {
            (min.min(degree), max.max(degree))
        }))
    }

    /// Node indices ordered by final risk, highest first; ties by id.
    pub fn top_by_final_risk(&self, limit: usize) -> Vec<usize> {
        let mut indices = (0..self.nodes.len()).collect::<Vec<_>>();
        indices.sort_by(|&a, &b| {
            let a_node = &self.nodes[a];
            let b_node = &self.nodes[b];
            b_node
                .final_risk
                .unwrap_or(-1.0)
                .total_cmp(&a_node.final_risk.unwrap_or(-1.0))
                .then_with(|| a_node.id.cmp(&b_node.id))
        });
        indices.truncate(limit);
        indices
    }

    pub fn edges_touching(&self, index: usize) -> impl Iterator<Item = &TransactionEdge> {
        self.edges
            .iter()
            .filter(move |edge| edge.source == index || edge.target == index)
    }
}
