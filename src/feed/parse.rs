use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::client::RawFeeds;
use super::error::{FeedKind, LoadError};

#[derive(Clone, Debug, PartialEq)]
pub struct TopologyNode {
    pub id: String,
    pub entity_type: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TopologyEdge {
    pub source: String,
    pub target: String,
    pub pattern: Option<String>,
    pub amount: f64,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Topology {
    pub nodes: Vec<TopologyNode>,
    pub edges: Vec<TopologyEdge>,
    pub skipped_nodes: usize,
    pub skipped_edges: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FinalRiskRecord {
    pub id: String,
    pub final_risk: f64,
    pub reasons: Vec<String>,
    pub gnn_risk: Option<f64>,
    pub delta: Option<f64>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RiskFactors {
    pub structural: Option<f64>,
    pub flow: Option<f64>,
    pub temporal: Option<f64>,
    pub proximity: Option<f64>,
}

impl RiskFactors {
    pub fn entries(&self) -> [(&'static str, Option<f64>); 4] {
        [
            ("structural", self.structural),
            ("flow", self.flow),
            ("temporal", self.temporal),
            ("proximity", self.proximity),
        ]
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct BaseRiskRecord {
    pub id: String,
    pub base_risk: f64,
    pub factors: RiskFactors,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Records<T> {
    pub records: Vec<T>,
    pub skipped: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ParsedFeeds {
    pub topology: Topology,
    pub final_risk: Records<FinalRiskRecord>,
    pub risk_scores: Records<BaseRiskRecord>,
}

#[derive(Deserialize)]
struct NodeRecord {
    id: String,
    #[serde(default)]
    entity_type: Option<Value>,
}

#[derive(Deserialize)]
struct EdgeRecord {
    source: String,
    target: String,
    #[serde(default)]
    pattern: Option<Value>,
    #[serde(default)]
    amount: Option<Value>,
}

#[derive(Deserialize)]
struct FinalRiskEntry {
    id: String,
    final_risk: f64,
    #[serde(default)]
    reasons: Option<Value>,
    #[serde(default)]
    gnn_risk: Option<Value>,
    #[serde(default)]
    delta: Option<Value>,
}

#[derive(Deserialize)]
struct RiskScoreEntry {
    id: String,
    base_risk: f64,
    #[serde(default)]
    structural_risk: Option<Value>,
    #[serde(default)]
    flow_risk: Option<Value>,
    #[serde(default)]
    temporal_risk: Option<Value>,
    #[serde(default)]
    proximity_risk: Option<Value>,
}

pub fn parse_feeds(raw: &RawFeeds) -> Result<ParsedFeeds, LoadError> {
    Ok(ParsedFeeds {
        topology: parse_topology(&raw.graph)?,
        final_risk: parse_final_risk(&raw.final_risk)?,
        risk_scores: parse_risk_scores(&raw.risk_scores)?,
    })
}

pub fn parse_topology(payload: &Value) -> Result<Topology, LoadError> {
    let feed = FeedKind::Graph;
    let mut topology = Topology::default();

    for value in record_list(payload, feed, "nodes")? {
        match NodeRecord::deserialize(value) {
            Ok(record) => topology.nodes.push(TopologyNode {
                id: record.id,
                entity_type: record
                    .entity_type
                    .as_ref()
                    .and_then(Value::as_str)
                    .map(str::to_owned),
            }),
            Err(error) => {
                debug!(%feed, %error, "skipping malformed node record");
                topology.skipped_nodes += 1;
            }
        }
    }

    for value in record_list(payload, feed, "edges")? {
        match EdgeRecord::deserialize(value) {
            Ok(record) => topology.edges.push(TopologyEdge {
                source: record.source,
                target: record.target,
                pattern: record
                    .pattern
                    .as_ref()
                    .and_then(Value::as_str)
                    .map(str::to_owned),
                amount: record.amount.as_ref().and_then(Value::as_f64).unwrap_or(0.0),
            }),
            Err(error) => {
                debug!(%feed, %error, "skipping malformed edge record");
                topology.skipped_edges += 1;
            }
        }
    }

    Ok(topology)
}

pub fn parse_final_risk(payload: &Value) -> Result<Records<FinalRiskRecord>, LoadError> {
    parse_wallets(payload, FeedKind::FinalRisk, |entry: FinalRiskEntry| FinalRiskRecord {
        id: entry.id,
        final_risk: clamp_unit(entry.final_risk),
        reasons: string_list(entry.reasons.as_ref()),
        gnn_risk: entry.gnn_risk.as_ref().and_then(Value::as_f64).map(clamp_unit),
        delta: entry.delta.as_ref().and_then(Value::as_f64),
    })
}

pub fn parse_risk_scores(payload: &Value) -> Result<Records<BaseRiskRecord>, LoadError> {
    parse_wallets(payload, FeedKind::RiskScores, |entry: RiskScoreEntry| BaseRiskRecord {
        id: entry.id,
        base_risk: clamp_unit(entry.base_risk),
        factors: RiskFactors {
            structural: optional_unit(entry.structural_risk.as_ref()),
            flow: optional_unit(entry.flow_risk.as_ref()),
            temporal: optional_unit(entry.temporal_risk.as_ref()),
            proximity: optional_unit(entry.proximity_risk.as_ref()),
        },
    })
}

fn parse_wallets<E, T>(
    payload: &Value,
    feed: FeedKind,
    convert: impl Fn(E) -> T,
) -> Result<Records<T>, LoadError>
where
    E: for<'de> Deserialize<'de>,
{
    let mut parsed = Records {
        records: Vec::new(),
        skipped: 0,
    };

    for value in record_list(payload, feed, "wallets")? {
        match E::deserialize(value) {
            Ok(entry) => parsed.records.push(convert(entry)),
            Err(error) => {
                debug!(%feed, %error, "skipping malformed wallet record");
                parsed.skipped += 1;
            }
        }
    }

    Ok(parsed)
}

/// A missing list reads as empty; a list of the wrong type fails the load.
fn record_list<'a>(payload: &'a Value, feed: FeedKind, key: &str) -> Result<&'a [Value], LoadError> {
    let object = payload.as_object().ok_or_else(|| LoadError::Shape {
        feed,
        message: "expected a JSON object".to_owned(),
    })?;

    match object.get(key) {
        None | Some(Value::Null) => Ok(&[]),
        Some(Value::Array(items)) => Ok(items.as_slice()),
        Some(_) => Err(LoadError::Shape {
            feed,
            message: format!("`{key}` is not an array"),
        }),
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_owned)
                .collect()
        })
        .unwrap_or_default()
}

fn optional_unit(value: Option<&Value>) -> Option<f64> {
    value.and_then(Value::as_f64).map(clamp_unit)
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
