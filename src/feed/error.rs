use std::fmt;

use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FeedKind {
    Graph,
    FinalRisk,
    RiskScores,
}

impl FeedKind {
    pub fn path(self) -> &'static str {
        match self {
            Self::Graph => "graph/",
            Self::FinalRisk => "final-risk/",
            Self::RiskScores => "risk-scores/",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Graph => "graph feed",
            Self::FinalRisk => "final-risk feed",
            Self::RiskScores => "risk-score feed",
        }
    }
}

impl fmt::Display for FeedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Any of these aborts the whole load; no partial graph is kept.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("{feed} request failed: {message}")]
    Transport { feed: FeedKind, message: String },

    #[error("{feed} request timed out after {seconds}s")]
    Timeout { feed: FeedKind, seconds: u64 },

    #[error("{feed} returned HTTP {status}")]
    Status { feed: FeedKind, status: u16 },

    #[error("{feed} returned invalid JSON: {message}")]
    Decode { feed: FeedKind, message: String },

    #[error("{feed} payload has an unexpected shape: {message}")]
    Shape { feed: FeedKind, message: String },

    #[error("failed to start the feed loader: {0}")]
    Runtime(String),

    #[error("background load worker disconnected")]
    WorkerDisconnected,
}

impl LoadError {
    pub fn feed(&self) -> Option<FeedKind> {
        match self {
            Self::Transport { feed, .. }
            | Self::Timeout { feed, .. }
            | Self::Status { feed, .. }
            | Self::Decode { feed, .. }
            | Self::Shape { feed, .. } => Some(*feed),
            Self::Runtime(_) | Self::WorkerDisconnected => None,
        }
    }
}
