//! Raw store gateway
//!
//! Sends one raw command to the store named by a [`RoutingTarget`], scoped
//! with the target's request context. Every call opens its own connection,
//! which is dropped when the call returns.

use std::sync::Arc;

use proto::kvrpcpb::{self, *};
use tracing::{debug, warn};

use crate::error::{RawKvError, RegionError, Result};
use crate::store::{StoreConnector, StoreService};
use crate::types::RoutingTarget;

/// Error fields common to every raw response
trait RawResponse {
    fn take_region_error(&mut self) -> Option<kvrpcpb::RegionError>;
    fn operation_error(&self) -> Option<String>;
}

macro_rules! impl_raw_response {
    ($($resp:ty),* $(,)?) => {
        $(
            impl RawResponse for $resp {
                fn take_region_error(&mut self) -> Option<kvrpcpb::RegionError> {
                    self.region_error.take()
                }

                fn operation_error(&self) -> Option<String> {
                    (!self.error.is_empty()).then(|| self.error.clone())
                }
            }
        )*
    };
}

impl_raw_response!(
    RawGetResponse,
    RawPutResponse,
    RawDeleteResponse,
    RawBatchPutResponse,
    RawBatchDeleteResponse,
    RawDeleteRangeResponse,
);

/// Responses carrying pairs report failures per pair
macro_rules! impl_pairs_response {
    ($($resp:ty => $pairs:ident),* $(,)?) => {
        $(
            impl RawResponse for $resp {
                fn take_region_error(&mut self) -> Option<kvrpcpb::RegionError> {
                    self.region_error.take()
                }

                fn operation_error(&self) -> Option<String> {
                    self.$pairs.iter().find_map(key_error)
                }
            }
        )*
    };
}

impl_pairs_response!(
    RawBatchGetResponse => pairs,
    RawScanResponse => kvs,
);

fn key_error(pair: &KvPair) -> Option<String> {
    let err = pair.error.as_ref()?;
    let message = if !err.abort.is_empty() {
        &err.abort
    } else {
        &err.retryable
    };
    Some(format!("key {:?}: {}", String::from_utf8_lossy(&pair.key), message))
}

/// Turn response-level failures into errors
fn check<R: RawResponse>(target: &RoutingTarget, mut resp: R) -> Result<R> {
    if let Some(err) = resp.take_region_error() {
        let err = RegionError::from_proto(target.region.id, err);
        warn!("Store {} rejected request: {}", target.store.address, err);
        return Err(err.into());
    }
    if let Some(message) = resp.operation_error() {
        return Err(RawKvError::RemoteOperation(message));
    }
    Ok(resp)
}

pub struct RawStoreGateway {
    connector: Arc<dyn StoreConnector>,
}

impl RawStoreGateway {
    pub fn new(connector: Arc<dyn StoreConnector>) -> Self {
        Self { connector }
    }

    async fn connect(&self, target: &RoutingTarget, op: &str) -> Result<Box<dyn StoreService>> {
        debug!(
            "{} -> region {} (epoch {}/{}) peer {} at {}",
            op,
            target.region.id,
            target.region.epoch.conf_ver,
            target.region.epoch.version,
            target.peer.id,
            target.store.address
        );
        self.connector.connect(&target.store.address).await
    }

    fn context(target: &RoutingTarget) -> Option<Context> {
        Some(target.context().into())
    }

    /// `None` when the key does not exist
    pub async fn get(&self, target: &RoutingTarget, key: Vec<u8>) -> Result<Option<Vec<u8>>> {
        let store = self.connect(target, "raw_get").await?;
        let req = RawGetRequest {
            context: Self::context(target),
            key,
            cf: String::new(),
        };
        let resp = check(target, store.raw_get(req).await?)?;
        Ok(if resp.not_found { None } else { Some(resp.value) })
    }

    pub async fn put(&self, target: &RoutingTarget, key: Vec<u8>, value: Vec<u8>) -> Result<()> {
        let store = self.connect(target, "raw_put").await?;
        let req = RawPutRequest {
            context: Self::context(target),
            key,
            value,
            cf: String::new(),
        };
        check(target, store.raw_put(req).await?)?;
        Ok(())
    }

    pub async fn delete(&self, target: &RoutingTarget, key: Vec<u8>) -> Result<()> {
        let store = self.connect(target, "raw_delete").await?;
        let req = RawDeleteRequest {
            context: Self::context(target),
            key,
            cf: String::new(),
        };
        check(target, store.raw_delete(req).await?)?;
        Ok(())
    }

    /// Pairs for the keys that exist
    pub async fn batch_get(
        &self,
        target: &RoutingTarget,
        keys: Vec<Vec<u8>>,
    ) -> Result<Vec<KvPair>> {
        let store = self.connect(target, "raw_batch_get").await?;
        let req = RawBatchGetRequest {
            context: Self::context(target),
            keys,
            cf: String::new(),
        };
        let resp = check(target, store.raw_batch_get(req).await?)?;
        Ok(resp.pairs)
    }

    pub async fn batch_put(&self, target: &RoutingTarget, pairs: Vec<KvPair>) -> Result<()> {
        let store = self.connect(target, "raw_batch_put").await?;
        let req = RawBatchPutRequest {
            context: Self::context(target),
            pairs,
            cf: String::new(),
        };
        check(target, store.raw_batch_put(req).await?)?;
        Ok(())
    }

    pub async fn batch_delete(&self, target: &RoutingTarget, keys: Vec<Vec<u8>>) -> Result<()> {
        let store = self.connect(target, "raw_batch_delete").await?;
        let req = RawBatchDeleteRequest {
            context: Self::context(target),
            keys,
            cf: String::new(),
        };
        check(target, store.raw_batch_delete(req).await?)?;
        Ok(())
    }

    /// Ascending scan of `[start, end)`, or with `reverse` a descending scan
    /// from `start` (exclusive) down to `end` (inclusive)
    pub async fn scan(
        &self,
        target: &RoutingTarget,
        start: Vec<u8>,
        end: Vec<u8>,
        limit: u32,
        reverse: bool,
    ) -> Result<Vec<KvPair>> {
        let store = self.connect(target, "raw_scan").await?;
        let req = RawScanRequest {
            context: Self::context(target),
            start_key: start,
            limit,
            key_only: false,
            cf: String::new(),
            reverse,
            end_key: end,
        };
        let resp = check(target, store.raw_scan(req).await?)?;
        Ok(resp.kvs)
    }

    /// Delete `[start, end)`; an empty `end` means to the end of the region
    pub async fn delete_range(
        &self,
        target: &RoutingTarget,
        start: Vec<u8>,
        end: Vec<u8>,
    ) -> Result<()> {
        let store = self.connect(target, "raw_delete_range").await?;
        let req = RawDeleteRangeRequest {
            context: Self::context(target),
            start_key: start,
            end_key: end,
            cf: String::new(),
        };
        check(target, store.raw_delete_range(req).await?)?;
        Ok(())
    }
}
