//! Cluster metadata messages (`metapb` package)
//!
//! Shared by the placement driver, which reports them, and the store, which
//! checks request contexts against them.

use serde::{Deserialize, Serialize};

/// Region configuration version
#[derive(Clone, Copy, PartialEq, Eq, Hash, prost::Message, Serialize, Deserialize)]
pub struct RegionEpoch {
    /// Bumped on membership changes
    #[prost(uint64, tag = "1")]
    pub conf_ver: u64,
    /// Bumped on split or merge
    #[prost(uint64, tag = "2")]
    pub version: u64,
}

/// One replica of a region
#[derive(Clone, Copy, PartialEq, Eq, Hash, prost::Message, Serialize, Deserialize)]
pub struct Peer {
    #[prost(uint64, tag = "1")]
    pub id: u64,
    #[prost(uint64, tag = "2")]
    pub store_id: u64,
}

/// Contiguous key range `[start_key, end_key)`; an empty `end_key` means
/// no upper bound
#[derive(Clone, PartialEq, Eq, prost::Message, Serialize, Deserialize)]
pub struct Region {
    #[prost(uint64, tag = "1")]
    pub id: u64,
    #[prost(bytes = "vec", tag = "2")]
    pub start_key: Vec<u8>,
    #[prost(bytes = "vec", tag = "3")]
    pub end_key: Vec<u8>,
    #[prost(message, optional, tag = "4")]
    pub region_epoch: Option<RegionEpoch>,
    #[prost(message, repeated, tag = "5")]
    pub peers: Vec<Peer>,
}

#[derive(Clone, PartialEq, Eq, prost::Message, Serialize, Deserialize)]
pub struct Store {
    #[prost(uint64, tag = "1")]
    pub id: u64,
    /// Connectable address (host:port)
    #[prost(string, tag = "2")]
    pub address: String,
}
