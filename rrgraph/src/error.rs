use rrgraph_arch::ArchError;
use thiserror::Error;

use crate::lookup::SpatialKey;
use crate::node::NodeId;

#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Configuration(#[from] ArchError),
    #[error("spatial key {key} is already registered to node {node}")]
    DuplicateKey { key: SpatialKey, node: NodeId },
    #[error("spatial key {0} is outside the lookup bounds")]
    KeyOutOfBounds(SpatialKey),
    #[error("spatial key {0}: pin kinds need a side, other kinds must not have one")]
    SideMismatch(SpatialKey),
    #[error("invalid options: {0}")]
    Options(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
