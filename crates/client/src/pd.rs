//! Metadata service (placement driver) client
//!
//! The routing layer only talks to the metadata service through the
//! [`MetadataService`] trait; [`PdGrpcClient`] is the tonic transport for
//! the `pdpb.PD` service.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use proto::pdpb::{
    ErrorType, GetMembersRequest, GetMembersResponse, GetRegionRequest, GetRegionResponse,
    GetStoreRequest, GetStoreResponse, PdClient, RequestHeader, ResponseHeader,
};
use tonic::transport::Endpoint;
use tracing::debug;

use crate::error::{RawKvError, Result};
use crate::types::StoreId;

/// Metadata service RPC surface
#[async_trait]
pub trait MetadataService: Send + Sync {
    /// List members; `cluster_id` is 0 while bootstrapping
    async fn get_members(&self, cluster_id: u64) -> Result<GetMembersResponse>;

    /// Region owning `key`, plus its leader when known
    async fn get_region(&self, cluster_id: u64, key: &[u8]) -> Result<GetRegionResponse>;

    /// Network address of a store
    async fn get_store(&self, cluster_id: u64, store_id: StoreId) -> Result<GetStoreResponse>;
}

/// Opens metadata service connections
#[async_trait]
pub trait MetadataConnector: Send + Sync {
    async fn connect(&self, address: &str) -> Result<Arc<dyn MetadataService>>;
}

/// Prefix `http://` when the address carries no scheme
pub(crate) fn with_http_scheme(address: &str) -> String {
    let address = address.trim_end_matches('/');
    if address.contains("://") {
        address.to_string()
    } else {
        format!("http://{}", address)
    }
}

/// Fail on a response header carrying an error other than `OK`
fn check_header(method: &str, header: Option<&ResponseHeader>) -> Result<()> {
    let Some(error) = header.and_then(|h| h.error.as_ref()) else {
        return Ok(());
    };
    match ErrorType::try_from(error.r#type) {
        Ok(ErrorType::Ok) => Ok(()),
        Ok(kind) => Err(RawKvError::DirectoryUnavailable(format!(
            "{}: {:?}: {}",
            method, kind, error.message
        ))),
        Err(_) => Err(RawKvError::DirectoryUnavailable(format!(
            "{}: error type {}: {}",
            method, error.r#type, error.message
        ))),
    }
}

/// gRPC metadata service client
pub struct PdGrpcClient {
    address: String,
    client: PdClient,
}

impl PdGrpcClient {
    pub fn address(&self) -> &str {
        &self.address
    }

    fn unavailable(&self, status: tonic::Status) -> RawKvError {
        RawKvError::DirectoryUnavailable(format!("{}: {}", self.address, status))
    }
}

#[async_trait]
impl MetadataService for PdGrpcClient {
    async fn get_members(&self, cluster_id: u64) -> Result<GetMembersResponse> {
        let req = GetMembersRequest {
            header: Some(RequestHeader::new(cluster_id)),
        };
        let mut client = self.client.clone();
        let resp = client
            .get_members(req)
            .await
            .map_err(|status| self.unavailable(status))?
            .into_inner();
        check_header("GetMembers", resp.header.as_ref())?;
        Ok(resp)
    }

    async fn get_region(&self, cluster_id: u64, key: &[u8]) -> Result<GetRegionResponse> {
        let req = GetRegionRequest {
            header: Some(RequestHeader::new(cluster_id)),
            region_key: key.to_vec(),
        };
        let mut client = self.client.clone();
        let resp = client
            .get_region(req)
            .await
            .map_err(|status| self.unavailable(status))?
            .into_inner();
        check_header("GetRegion", resp.header.as_ref())?;
        Ok(resp)
    }

    async fn get_store(&self, cluster_id: u64, store_id: StoreId) -> Result<GetStoreResponse> {
        let req = GetStoreRequest {
            header: Some(RequestHeader::new(cluster_id)),
            store_id,
        };
        let mut client = self.client.clone();
        let resp = client
            .get_store(req)
            .await
            .map_err(|status| self.unavailable(status))?
            .into_inner();
        check_header("GetStore", resp.header.as_ref())?;
        Ok(resp)
    }
}

/// Connector producing [`PdGrpcClient`]s
#[derive(Debug, Clone)]
pub struct PdGrpcConnector {
    timeout: Duration,
}

impl PdGrpcConnector {
    /// `timeout` bounds both connecting and each call
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl MetadataConnector for PdGrpcConnector {
    async fn connect(&self, address: &str) -> Result<Arc<dyn MetadataService>> {
        let channel = Endpoint::from_shared(with_http_scheme(address))
            .map_err(|e| {
                RawKvError::DirectoryUnavailable(format!("{}: invalid endpoint: {}", address, e))
            })?
            .connect_timeout(self.timeout)
            .timeout(self.timeout)
            .connect()
            .await
            .map_err(|e| {
                RawKvError::DirectoryUnavailable(format!("{}: failed to connect: {}", address, e))
            })?;

        debug!("Connected to metadata service at {}", address);
        Ok(Arc::new(PdGrpcClient {
            address: address.to_string(),
            client: PdClient::new(channel),
        }))
    }
}
