//! Client error types

use std::string::FromUtf8Error;

use proto::kvrpcpb;

use crate::types::{Peer, RegionId};

/// Result alias used throughout the client
pub type Result<T> = std::result::Result<T, RawKvError>;

/// Raw KV client errors
///
/// Every error propagates unchanged to the caller of the operation; nothing
/// in the client retries or swallows one. A missing key is not an error, see
/// [`crate::RawClient::get`].
#[derive(Debug, thiserror::Error)]
pub enum RawKvError {
    /// Metadata service unreachable, or it answered with a failure
    #[error("Metadata service unavailable: {0}")]
    DirectoryUnavailable(String),
    /// Store rejected the request's routing (stale epoch, not leader, ...)
    #[error("Region error: {0}")]
    Region(#[from] RegionError),
    /// Store accepted the routing but the operation itself failed
    #[error("Remote operation failed: {0}")]
    RemoteOperation(String),
    /// Connecting to or calling a store failed at the transport level
    #[error("Store {address} unavailable: {message}")]
    StoreUnavailable { address: String, message: String },
    #[error("Region {0} has no peer to address")]
    NoPeer(RegionId),
    #[error("Invalid range: start {start:?} is not before end {end:?}")]
    InvalidRange { start: String, end: String },
    #[error("Invalid UTF-8 from store: {0}")]
    InvalidUtf8(#[from] FromUtf8Error),
}

impl RawKvError {
    pub(crate) fn directory(err: impl std::fmt::Display) -> Self {
        RawKvError::DirectoryUnavailable(err.to_string())
    }

    pub(crate) fn store(address: &str, err: impl std::fmt::Display) -> Self {
        RawKvError::StoreUnavailable {
            address: address.to_string(),
            message: err.to_string(),
        }
    }

    /// Whether this is a region-level routing error
    pub fn is_region_error(&self) -> bool {
        matches!(self, RawKvError::Region(_))
    }
}

/// Region-level error reported by a store
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegionError {
    #[error("epoch not match for region {region_id}: {message}")]
    EpochNotMatch { region_id: RegionId, message: String },
    #[error("peer is not leader of region {region_id} (leader: {leader:?})")]
    NotLeader {
        region_id: RegionId,
        leader: Option<Peer>,
    },
    #[error("region {region_id} not found on store")]
    RegionNotFound { region_id: RegionId },
    #[error("key not in region {region_id}")]
    KeyNotInRegion { region_id: RegionId },
    #[error("region {region_id}: {message}")]
    Other { region_id: RegionId, message: String },
}

impl RegionError {
    /// Classify a store's region error for a request sent to `region_id`
    pub fn from_proto(region_id: RegionId, err: kvrpcpb::RegionError) -> Self {
        if let Some(not_leader) = err.not_leader {
            let region_id = if not_leader.region_id != 0 {
                not_leader.region_id
            } else {
                region_id
            };
            return RegionError::NotLeader {
                region_id,
                leader: not_leader.leader,
            };
        }
        if let Some(not_found) = err.region_not_found {
            let region_id = if not_found.region_id != 0 {
                not_found.region_id
            } else {
                region_id
            };
            return RegionError::RegionNotFound { region_id };
        }
        if err.epoch_not_match.is_some() {
            return RegionError::EpochNotMatch {
                region_id,
                message: err.message,
            };
        }
        if let Some(not_in_region) = err.key_not_in_region {
            let region_id = if not_in_region.region_id != 0 {
                not_in_region.region_id
            } else {
                region_id
            };
            return RegionError::KeyNotInRegion { region_id };
        }
        RegionError::Other {
            region_id,
            message: err.message,
        }
    }

    pub fn region_id(&self) -> RegionId {
        match self {
            RegionError::EpochNotMatch { region_id, .. }
            | RegionError::NotLeader { region_id, .. }
            | RegionError::RegionNotFound { region_id }
            | RegionError::KeyNotInRegion { region_id }
            | RegionError::Other { region_id, .. } => *region_id,
        }
    }

    /// Whether the request carried an out-of-date region epoch
    pub fn is_stale_epoch(&self) -> bool {
        matches!(self, RegionError::EpochNotMatch { .. })
    }
}
