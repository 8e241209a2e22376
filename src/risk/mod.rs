mod fuse;
mod graph;

pub use fuse::fuse;
pub use graph::{EdgePattern, EntityType, RiskGraph, WalletNode};
