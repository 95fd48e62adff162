//! Raw KV store messages (`kvrpcpb` package)
//!
//! Every request carries a [`Context`] naming the region, its epoch and the
//! peer the client believes it is talking to. Every response may carry a
//! [`RegionError`] (routing went stale) distinct from the operation-level
//! failure: the `error` string, or for reads the per-pair [`KeyError`].

use crate::metapb::{Peer, Region, RegionEpoch};

/// Request scope attached to every raw command
#[derive(Clone, PartialEq, prost::Message)]
pub struct Context {
    #[prost(uint64, tag = "1")]
    pub region_id: u64,
    #[prost(message, optional, tag = "2")]
    pub region_epoch: Option<RegionEpoch>,
    #[prost(message, optional, tag = "3")]
    pub peer: Option<Peer>,
}

/// The addressed peer is not the region leader
#[derive(Clone, PartialEq, prost::Message)]
pub struct NotLeader {
    #[prost(uint64, tag = "1")]
    pub region_id: u64,
    /// Leader known to the store, if any
    #[prost(message, optional, tag = "2")]
    pub leader: Option<Peer>,
}

/// The store holds no peer of the addressed region
#[derive(Clone, PartialEq, prost::Message)]
pub struct RegionNotFound {
    #[prost(uint64, tag = "1")]
    pub region_id: u64,
}

/// The key is outside the addressed region
#[derive(Clone, PartialEq, prost::Message)]
pub struct KeyNotInRegion {
    #[prost(bytes = "vec", tag = "1")]
    pub key: Vec<u8>,
    #[prost(uint64, tag = "2")]
    pub region_id: u64,
    #[prost(bytes = "vec", tag = "3")]
    pub start_key: Vec<u8>,
    #[prost(bytes = "vec", tag = "4")]
    pub end_key: Vec<u8>,
}

/// The epoch in the request context is stale
#[derive(Clone, PartialEq, prost::Message)]
pub struct EpochNotMatch {
    /// Regions now covering the requested range
    #[prost(message, repeated, tag = "1")]
    pub current_regions: Vec<Region>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ServerIsBusy {
    #[prost(string, tag = "1")]
    pub reason: String,
    #[prost(uint64, tag = "2")]
    pub backoff_ms: u64,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct StaleCommand {}

#[derive(Clone, PartialEq, prost::Message)]
pub struct StoreNotMatch {
    #[prost(uint64, tag = "1")]
    pub request_store_id: u64,
    #[prost(uint64, tag = "2")]
    pub actual_store_id: u64,
}

/// Region-level error reported by a store (`errorpb.Error`)
#[derive(Clone, PartialEq, prost::Message)]
pub struct RegionError {
    #[prost(string, tag = "1")]
    pub message: String,
    #[prost(message, optional, tag = "2")]
    pub not_leader: Option<NotLeader>,
    #[prost(message, optional, tag = "3")]
    pub region_not_found: Option<RegionNotFound>,
    #[prost(message, optional, tag = "4")]
    pub key_not_in_region: Option<KeyNotInRegion>,
    #[prost(message, optional, tag = "5")]
    pub epoch_not_match: Option<EpochNotMatch>,
    #[prost(message, optional, tag = "6")]
    pub server_is_busy: Option<ServerIsBusy>,
    #[prost(message, optional, tag = "7")]
    pub stale_command: Option<StaleCommand>,
    #[prost(message, optional, tag = "8")]
    pub store_not_match: Option<StoreNotMatch>,
}

/// Per-key failure attached to a returned pair
#[derive(Clone, PartialEq, prost::Message)]
pub struct KeyError {
    #[prost(string, tag = "2")]
    pub retryable: String,
    #[prost(string, tag = "3")]
    pub abort: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct KvPair {
    #[prost(message, optional, tag = "1")]
    pub error: Option<KeyError>,
    #[prost(bytes = "vec", tag = "2")]
    pub key: Vec<u8>,
    #[prost(bytes = "vec", tag = "3")]
    pub value: Vec<u8>,
}

impl KvPair {
    pub fn new(key: Vec<u8>, value: Vec<u8>) -> Self {
        Self {
            error: None,
            key,
            value,
        }
    }
}

// ==================== Get ====================

#[derive(Clone, PartialEq, prost::Message)]
pub struct RawGetRequest {
    #[prost(message, optional, tag = "1")]
    pub context: Option<Context>,
    #[prost(bytes = "vec", tag = "2")]
    pub key: Vec<u8>,
    #[prost(string, tag = "3")]
    pub cf: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct RawGetResponse {
    #[prost(message, optional, tag = "1")]
    pub region_error: Option<RegionError>,
    #[prost(string, tag = "2")]
    pub error: String,
    #[prost(bytes = "vec", tag = "3")]
    pub value: Vec<u8>,
    #[prost(bool, tag = "4")]
    pub not_found: bool,
}

// ==================== Put ====================

#[derive(Clone, PartialEq, prost::Message)]
pub struct RawPutRequest {
    #[prost(message, optional, tag = "1")]
    pub context: Option<Context>,
    #[prost(bytes = "vec", tag = "2")]
    pub key: Vec<u8>,
    #[prost(bytes = "vec", tag = "3")]
    pub value: Vec<u8>,
    #[prost(string, tag = "4")]
    pub cf: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct RawPutResponse {
    #[prost(message, optional, tag = "1")]
    pub region_error: Option<RegionError>,
    #[prost(string, tag = "2")]
    pub error: String,
}

// ==================== Delete ====================

#[derive(Clone, PartialEq, prost::Message)]
pub struct RawDeleteRequest {
    #[prost(message, optional, tag = "1")]
    pub context: Option<Context>,
    #[prost(bytes = "vec", tag = "2")]
    pub key: Vec<u8>,
    #[prost(string, tag = "3")]
    pub cf: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct RawDeleteResponse {
    #[prost(message, optional, tag = "1")]
    pub region_error: Option<RegionError>,
    #[prost(string, tag = "2")]
    pub error: String,
}

// ==================== Batch get ====================

#[derive(Clone, PartialEq, prost::Message)]
pub struct RawBatchGetRequest {
    #[prost(message, optional, tag = "1")]
    pub context: Option<Context>,
    #[prost(bytes = "vec", repeated, tag = "2")]
    pub keys: Vec<Vec<u8>>,
    #[prost(string, tag = "3")]
    pub cf: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct RawBatchGetResponse {
    #[prost(message, optional, tag = "1")]
    pub region_error: Option<RegionError>,
    /// Only keys that exist are returned
    #[prost(message, repeated, tag = "2")]
    pub pairs: Vec<KvPair>,
}

// ==================== Batch put ====================

#[derive(Clone, PartialEq, prost::Message)]
pub struct RawBatchPutRequest {
    #[prost(message, optional, tag = "1")]
    pub context: Option<Context>,
    #[prost(message, repeated, tag = "2")]
    pub pairs: Vec<KvPair>,
    #[prost(string, tag = "3")]
    pub cf: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct RawBatchPutResponse {
    #[prost(message, optional, tag = "1")]
    pub region_error: Option<RegionError>,
    #[prost(string, tag = "2")]
    pub error: String,
}

// ==================== Batch delete ====================

#[derive(Clone, PartialEq, prost::Message)]
pub struct RawBatchDeleteRequest {
    #[prost(message, optional, tag = "1")]
    pub context: Option<Context>,
    #[prost(bytes = "vec", repeated, tag = "2")]
    pub keys: Vec<Vec<u8>>,
    #[prost(string, tag = "3")]
    pub cf: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct RawBatchDeleteResponse {
    #[prost(message, optional, tag = "1")]
    pub region_error: Option<RegionError>,
    #[prost(string, tag = "2")]
    pub error: String,
}

// ==================== Scan ====================

/// Ascending scan covers `[start_key, end_key)`. With `reverse` set the scan
/// is descending, `start_key` is the exclusive upper bound and `end_key` the
/// inclusive lower bound. An empty `end_key` means unbounded.
#[derive(Clone, PartialEq, prost::Message)]
pub struct RawScanRequest {
    #[prost(message, optional, tag = "1")]
    pub context: Option<Context>,
    #[prost(bytes = "vec", tag = "2")]
    pub start_key: Vec<u8>,
    #[prost(uint32, tag = "3")]
    pub limit: u32,
    #[prost(bool, tag = "4")]
    pub key_only: bool,
    #[prost(string, tag = "5")]
    pub cf: String,
    #[prost(bool, tag = "6")]
    pub reverse: bool,
    #[prost(bytes = "vec", tag = "7")]
    pub end_key: Vec<u8>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct RawScanResponse {
    #[prost(message, optional, tag = "1")]
    pub region_error: Option<RegionError>,
    #[prost(message, repeated, tag = "2")]
    pub kvs: Vec<KvPair>,
}

// ==================== Delete range ====================

/// Deletes `[start_key, end_key)`; an empty `end_key` means unbounded
#[derive(Clone, PartialEq, prost::Message)]
pub struct RawDeleteRangeRequest {
    #[prost(message, optional, tag = "1")]
    pub context: Option<Context>,
    #[prost(bytes = "vec", tag = "2")]
    pub start_key: Vec<u8>,
    #[prost(bytes = "vec", tag = "3")]
    pub end_key: Vec<u8>,
    #[prost(string, tag = "4")]
    pub cf: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct RawDeleteRangeResponse {
    #[prost(message, optional, tag = "1")]
    pub region_error: Option<RegionError>,
    #[prost(string, tag = "2")]
    pub error: String,
}
