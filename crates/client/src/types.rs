//! Routing data model
//!
//! Regions, stores and the ephemeral routing values built from them. None of
//! these are cached: every operation resolves fresh copies from the metadata
//! service and drops them when it completes.

use proto::{kvrpcpb, metapb};
use serde::{Deserialize, Serialize};

pub use proto::metapb::{Peer, RegionEpoch};
pub use proto::pdpb::Member;

/// Region ID type
pub type RegionId = u64;

/// Store ID type
pub type StoreId = u64;

/// Cluster identity discovered at initialization
///
/// Immutable for the lifetime of the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterInfo {
    /// Cluster identifier
    pub id: u64,
    /// Metadata service leader
    pub leader: Member,
    /// All metadata service members
    pub members: Vec<Member>,
}

/// Contiguous key range owned by one replica group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    pub id: RegionId,
    /// Start key (inclusive)
    pub start_key: Vec<u8>,
    /// End key (exclusive), empty means no upper bound
    pub end_key: Vec<u8>,
    pub epoch: RegionEpoch,
    /// Replicas, in the order the metadata service lists them
    pub peers: Vec<Peer>,
}

impl Region {
    /// Check if a key belongs to this region
    pub fn contains(&self, key: &[u8]) -> bool {
        key >= self.start_key.as_slice()
            && (self.end_key.is_empty() || key < self.end_key.as_slice())
    }

    /// Whether this is the last region of the keyspace
    pub fn is_unbounded(&self) -> bool {
        self.end_key.is_empty()
    }
}

impl From<metapb::Region> for Region {
    fn from(region: metapb::Region) -> Self {
        Self {
            id: region.id,
            start_key: region.start_key,
            end_key: region.end_key,
            epoch: region.region_epoch.unwrap_or_default(),
            peers: region.peers,
        }
    }
}

/// Physical server hosting peers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Store {
    pub id: StoreId,
    /// Connectable address (host:port)
    pub address: String,
}

impl From<metapb::Store> for Store {
    fn from(store: metapb::Store) -> Self {
        Self {
            id: store.id,
            address: store.address,
        }
    }
}

/// Answer of a key-location lookup
#[derive(Debug, Clone)]
pub struct KeyLocation {
    pub region: Region,
    /// Leader peer, when the metadata service reports one
    pub leader: Option<Peer>,
}

/// Scope attached to every raw command
///
/// Only valid for the region snapshot it was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestContext {
    pub region_id: RegionId,
    pub region_epoch: RegionEpoch,
    pub peer: Peer,
}

impl From<RequestContext> for kvrpcpb::Context {
    fn from(ctx: RequestContext) -> Self {
        kvrpcpb::Context {
            region_id: ctx.region_id,
            region_epoch: Some(ctx.region_epoch),
            peer: Some(ctx.peer),
        }
    }
}

/// Resolved destination of a region-scoped request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingTarget {
    pub region: Region,
    pub peer: Peer,
    pub store: Store,
}

impl RoutingTarget {
    /// Build the request context for this snapshot
    pub fn context(&self) -> RequestContext {
        RequestContext {
            region_id: self.region.id,
            region_epoch: self.region.epoch,
            peer: self.peer,
        }
    }
}

/// Routing target resolved for a single key
#[derive(Debug, Clone)]
pub struct RoutingTuple {
    pub target: RoutingTarget,
    pub key: Vec<u8>,
}

/// Key-value pair at the client surface
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct KvPair {
    pub key: String,
    pub value: String,
}

impl KvPair {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl TryFrom<kvrpcpb::KvPair> for KvPair {
    type Error = std::string::FromUtf8Error;

    fn try_from(pair: kvrpcpb::KvPair) -> Result<Self, Self::Error> {
        Ok(Self {
            key: String::from_utf8(pair.key)?,
            value: String::from_utf8(pair.value)?,
        })
    }
}
