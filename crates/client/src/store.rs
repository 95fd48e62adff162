//! Store node client
//!
//! [`StoreService`] is the raw KV surface of one store; [`StoreConnector`]
//! opens a fresh connection per call. [`GrpcStoreConnector`] is the tonic
//! transport.

use std::time::Duration;

use async_trait::async_trait;
use proto::kvrpcpb::*;
use proto::tikvpb::TikvClient;
use tonic::transport::Endpoint;
use tracing::debug;

use crate::error::{RawKvError, Result};
use crate::pd::with_http_scheme;

/// Raw KV operations of a single store
#[async_trait]
pub trait StoreService: Send + Sync {
    async fn raw_get(&self, req: RawGetRequest) -> Result<RawGetResponse>;
    async fn raw_put(&self, req: RawPutRequest) -> Result<RawPutResponse>;
    async fn raw_delete(&self, req: RawDeleteRequest) -> Result<RawDeleteResponse>;
    async fn raw_batch_get(&self, req: RawBatchGetRequest) -> Result<RawBatchGetResponse>;
    async fn raw_batch_put(&self, req: RawBatchPutRequest) -> Result<RawBatchPutResponse>;
    async fn raw_batch_delete(&self, req: RawBatchDeleteRequest)
        -> Result<RawBatchDeleteResponse>;
    async fn raw_scan(&self, req: RawScanRequest) -> Result<RawScanResponse>;
    async fn raw_delete_range(&self, req: RawDeleteRangeRequest)
        -> Result<RawDeleteRangeResponse>;
}

/// Opens store connections
#[async_trait]
pub trait StoreConnector: Send + Sync {
    async fn connect(&self, address: &str) -> Result<Box<dyn StoreService>>;
}

/// Connector producing tonic-backed [`GrpcStoreClient`]s
#[derive(Debug, Clone)]
pub struct GrpcStoreConnector {
    connect_timeout: Duration,
    request_timeout: Option<Duration>,
}

impl GrpcStoreConnector {
    pub fn new(connect_timeout: Duration, request_timeout: Option<Duration>) -> Self {
        Self {
            connect_timeout,
            request_timeout,
        }
    }
}

#[async_trait]
impl StoreConnector for GrpcStoreConnector {
    async fn connect(&self, address: &str) -> Result<Box<dyn StoreService>> {
        let mut endpoint = Endpoint::from_shared(with_http_scheme(address))
            .map_err(|e| RawKvError::store(address, format!("invalid endpoint: {}", e)))?
            .connect_timeout(self.connect_timeout);
        if let Some(timeout) = self.request_timeout {
            endpoint = endpoint.timeout(timeout);
        }

        let channel = endpoint
            .connect()
            .await
            .map_err(|e| RawKvError::store(address, format!("failed to connect: {}", e)))?;

        debug!("Connected to store at {}", address);
        Ok(Box::new(GrpcStoreClient {
            address: address.to_string(),
            client: TikvClient::new(channel),
        }))
    }
}

/// One store connection
pub struct GrpcStoreClient {
    address: String,
    client: TikvClient,
}

impl GrpcStoreClient {
    fn unavailable(&self, status: tonic::Status) -> RawKvError {
        RawKvError::store(&self.address, status)
    }
}

#[async_trait]
impl StoreService for GrpcStoreClient {
    async fn raw_get(&self, req: RawGetRequest) -> Result<RawGetResponse> {
        let mut client = self.client.clone();
        client
            .raw_get(req)
            .await
            .map(tonic::Response::into_inner)
            .map_err(|status| self.unavailable(status))
    }

    async fn raw_put(&self, req: RawPutRequest) -> Result<RawPutResponse> {
        let mut client = self.client.clone();
        client
            .raw_put(req)
            .await
            .map(tonic::Response::into_inner)
            .map_err(|status| self.unavailable(status))
    }

    async fn raw_delete(&self, req: RawDeleteRequest) -> Result<RawDeleteResponse> {
        let mut client = self.client.clone();
        client
            .raw_delete(req)
            .await
            .map(tonic::Response::into_inner)
            .map_err(|status| self.unavailable(status))
    }

    async fn raw_batch_get(&self, req: RawBatchGetRequest) -> Result<RawBatchGetResponse> {
        let mut client = self.client.clone();
        client
            .raw_batch_get(req)
            .await
            .map(tonic::Response::into_inner)
            .map_err(|status| self.unavailable(status))
    }

    async fn raw_batch_put(&self, req: RawBatchPutRequest) -> Result<RawBatchPutResponse> {
        let mut client = self.client.clone();
        client
            .raw_batch_put(req)
            .await
            .map(tonic::Response::into_inner)
            .map_err(|status| self.unavailable(status))
    }

    async fn raw_batch_delete(&self, req: RawBatchDeleteRequest) -> Result<RawBatchDeleteResponse> {
        let mut client = self.client.clone();
        client
            .raw_batch_delete(req)
            .await
            .map(tonic::Response::into_inner)
            .map_err(|status| self.unavailable(status))
    }

    async fn raw_scan(&self, req: RawScanRequest) -> Result<RawScanResponse> {
        let mut client = self.client.clone();
        client
            .raw_scan(req)
            .await
            .map(tonic::Response::into_inner)
            .map_err(|status| self.unavailable(status))
    }

    async fn raw_delete_range(&self, req: RawDeleteRangeRequest) -> Result<RawDeleteRangeResponse> {
        let mut client = self.client.clone();
        client
            .raw_delete_range(req)
            .await
            .map(tonic::Response::into_inner)
            .map_err(|status| self.unavailable(status))
    }
}
