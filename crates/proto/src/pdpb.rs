//! Placement driver messages and gRPC client (`pdpb.PD`)
//!
//! Every response carries a [`ResponseHeader`] whose `error`, when set to
//! anything but [`ErrorType::Ok`], means the request failed.

use serde::{Deserialize, Serialize};
use tonic::transport::Channel;

use crate::metapb::{Peer, Region, Store};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum ErrorType {
    Ok = 0,
    Unknown = 1,
    NotBootstrapped = 2,
    StoreTombstone = 3,
    AlreadyBootstrapped = 4,
    IncompatibleVersion = 5,
    RegionNotFound = 6,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Error {
    #[prost(enumeration = "ErrorType", tag = "1")]
    pub r#type: i32,
    #[prost(string, tag = "2")]
    pub message: String,
}

#[derive(Clone, Copy, PartialEq, prost::Message)]
pub struct RequestHeader {
    /// 0 while bootstrapping, before the cluster id is known
    #[prost(uint64, tag = "1")]
    pub cluster_id: u64,
    #[prost(uint64, tag = "2")]
    pub sender_id: u64,
}

impl RequestHeader {
    pub fn new(cluster_id: u64) -> Self {
        Self {
            cluster_id,
            sender_id: 0,
        }
    }
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ResponseHeader {
    #[prost(uint64, tag = "1")]
    pub cluster_id: u64,
    #[prost(message, optional, tag = "2")]
    pub error: Option<Error>,
}

/// Placement driver member
#[derive(Clone, PartialEq, Eq, prost::Message, Serialize, Deserialize)]
pub struct Member {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(uint64, tag = "2")]
    pub member_id: u64,
    #[prost(string, repeated, tag = "3")]
    pub peer_urls: Vec<String>,
    /// Client URLs, e.g. `http://pd0:2379`
    #[prost(string, repeated, tag = "4")]
    pub client_urls: Vec<String>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct GetMembersRequest {
    #[prost(message, optional, tag = "1")]
    pub header: Option<RequestHeader>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct GetMembersResponse {
    #[prost(message, optional, tag = "1")]
    pub header: Option<ResponseHeader>,
    #[prost(message, repeated, tag = "2")]
    pub members: Vec<Member>,
    #[prost(message, optional, tag = "3")]
    pub leader: Option<Member>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct GetRegionRequest {
    #[prost(message, optional, tag = "1")]
    pub header: Option<RequestHeader>,
    #[prost(bytes = "vec", tag = "2")]
    pub region_key: Vec<u8>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct GetRegionResponse {
    #[prost(message, optional, tag = "1")]
    pub header: Option<ResponseHeader>,
    #[prost(message, optional, tag = "2")]
    pub region: Option<Region>,
    #[prost(message, optional, tag = "3")]
    pub leader: Option<Peer>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct GetStoreRequest {
    #[prost(message, optional, tag = "1")]
    pub header: Option<RequestHeader>,
    #[prost(uint64, tag = "2")]
    pub store_id: u64,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct GetStoreResponse {
    #[prost(message, optional, tag = "1")]
    pub header: Option<ResponseHeader>,
    #[prost(message, optional, tag = "2")]
    pub store: Option<Store>,
}

/// Placement driver client over a tonic channel
#[derive(Debug, Clone)]
pub struct PdClient {
    inner: tonic::client::Grpc<Channel>,
}

impl PdClient {
    pub fn new(channel: Channel) -> Self {
        Self {
            inner: tonic::client::Grpc::new(channel),
        }
    }

    unary_method!(
        get_members,
        "pdpb.PD",
        "GetMembers",
        "/pdpb.PD/GetMembers",
        GetMembersRequest,
        GetMembersResponse
    );
    unary_method!(
        get_region,
        "pdpb.PD",
        "GetRegion",
        "/pdpb.PD/GetRegion",
        GetRegionRequest,
        GetRegionResponse
    );
    unary_method!(
        get_store,
        "pdpb.PD",
        "GetStore",
        "/pdpb.PD/GetStore",
        GetStoreRequest,
        GetStoreResponse
    );
}
