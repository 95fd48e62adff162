//! Raw KV client
//!
//! Public facade over the routing layer. Keys and values are text at this
//! surface and bytes everywhere below it.

use std::sync::Arc;

use futures::future::try_join_all;
use proto::kvrpcpb;
use tracing::{info, warn};

use crate::config::Config;
use crate::directory::ClusterDirectory;
use crate::error::{RawKvError, Result};
use crate::gateway::RawStoreGateway;
use crate::pd::{MetadataConnector, PdGrpcConnector};
use crate::range::RangeOperationDriver;
use crate::resolver::StoreEndpointResolver;
use crate::router::{RegionGroup, RegionRouter};
use crate::store::{GrpcStoreConnector, StoreConnector};
use crate::types::{ClusterInfo, KvPair, Member};

pub struct RawClient {
    directory: Arc<ClusterDirectory>,
    resolver: Arc<StoreEndpointResolver>,
    router: RegionRouter,
    gateway: Arc<RawStoreGateway>,
    ranges: RangeOperationDriver,
}

impl RawClient {
    /// Connect over HTTP to the metadata service and gRPC to the stores
    pub async fn connect(config: Config) -> Result<Self> {
        let metadata = Arc::new(PdGrpcConnector::new(config.pd.request_timeout()));
        let store = Arc::new(GrpcStoreConnector::new(
            config.store.connect_timeout(),
            config.store.request_timeout(),
        ));
        Self::with_connectors(config, metadata, store).await
    }

    /// Build a client over caller-provided transports
    ///
    /// Bootstrap tries the configured metadata endpoints in order and keeps
    /// the first that answers.
    pub async fn with_connectors(
        config: Config,
        metadata: Arc<dyn MetadataConnector>,
        store: Arc<dyn StoreConnector>,
    ) -> Result<Self> {
        let mut last_error =
            RawKvError::DirectoryUnavailable("no metadata endpoints configured".into());
        let mut directory = None;
        for endpoint in &config.pd.endpoints {
            match ClusterDirectory::initialize(endpoint, metadata.clone()).await {
                Ok(dir) => {
                    directory = Some(dir);
                    break;
                }
                Err(e) => {
                    warn!("Bootstrap via {} failed: {}", endpoint, e);
                    last_error = e;
                }
            }
        }
        let directory = Arc::new(directory.ok_or(last_error)?);

        let resolver = Arc::new(StoreEndpointResolver::new(directory.clone()));
        let gateway = Arc::new(RawStoreGateway::new(store));
        let router = RegionRouter::new(resolver.clone());
        let ranges =
            RangeOperationDriver::new(resolver.clone(), gateway.clone(), config.scan.limit);

        info!("Raw KV client ready for cluster {}", directory.cluster_id());

        Ok(Self {
            directory,
            resolver,
            router,
            gateway,
            ranges,
        })
    }

    pub fn cluster(&self) -> &ClusterInfo {
        self.directory.cluster()
    }

    pub fn cluster_id(&self) -> u64 {
        self.directory.cluster_id()
    }

    pub fn leader(&self) -> &Member {
        &self.directory.cluster().leader
    }

    pub fn members(&self) -> &[Member] {
        &self.directory.cluster().members
    }

    /// Value of `key`, or `None` when it does not exist
    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        let tuple = self.resolver.resolve_key(key.as_bytes()).await?;
        match self.gateway.get(&tuple.target, tuple.key).await? {
            Some(value) => Ok(Some(String::from_utf8(value)?)),
            None => Ok(None),
        }
    }

    pub async fn put(&self, key: &str, value: &str) -> Result<()> {
        let tuple = self.resolver.resolve_key(key.as_bytes()).await?;
        self.gateway
            .put(&tuple.target, tuple.key, value.as_bytes().to_vec())
            .await
    }

    pub async fn delete(&self, key: &str) -> Result<()> {
        let tuple = self.resolver.resolve_key(key.as_bytes()).await?;
        self.gateway.delete(&tuple.target, tuple.key).await
    }

    /// Pairs for the keys that exist, in no particular order
    pub async fn batch_get<I, K>(&self, keys: I) -> Result<Vec<KvPair>>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        let groups = self.router.group_keys(to_byte_keys(keys)).await?;
        let gateway = &self.gateway;
        let found = try_join_all(groups.into_values().map(|group| async move {
            let RegionGroup { target, items } = group;
            gateway.batch_get(&target, items).await
        }))
        .await?;

        to_text_pairs(found.into_iter().flatten().collect())
    }

    /// Write all pairs; a repeated key keeps its last value
    ///
    /// Each region is written by its own request. When one fails the error
    /// is returned and writes to other regions may already be applied.
    pub async fn batch_put<I, K, V>(&self, pairs: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let pairs = pairs
            .into_iter()
            .map(|(key, value)| {
                kvrpcpb::KvPair::new(
                    key.as_ref().as_bytes().to_vec(),
                    value.as_ref().as_bytes().to_vec(),
                )
            })
            .collect();

        let groups = self.router.group_pairs(pairs).await?;
        let gateway = &self.gateway;
        try_join_all(groups.into_values().map(|group| async move {
            let RegionGroup { target, items } = group;
            gateway.batch_put(&target, items).await
        }))
        .await?;
        Ok(())
    }

    /// Delete all keys; same partial-failure caveat as [`Self::batch_put`]
    pub async fn batch_delete<I, K>(&self, keys: I) -> Result<()>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        let groups = self.router.group_keys(to_byte_keys(keys)).await?;
        let gateway = &self.gateway;
        try_join_all(groups.into_values().map(|group| async move {
            let RegionGroup { target, items } = group;
            gateway.batch_delete(&target, items).await
        }))
        .await?;
        Ok(())
    }

    /// Ascending pairs in `[start, end)` from the region owning `start`
    ///
    /// Keys past that region's end are not returned even when they fall in
    /// the requested range.
    pub async fn scan(&self, start: &str, end: &str) -> Result<Vec<KvPair>> {
        let pairs = self.ranges.scan(start.as_bytes(), end.as_bytes()).await?;
        to_text_pairs(pairs)
    }

    /// Descending pairs below `start` down to `end` (inclusive), from the
    /// region owning `start`
    ///
    /// When `start` is exactly a region's start key, that region holds
    /// nothing below `start` and the result is empty, even if the previous
    /// region has keys in `[end, start)`.
    pub async fn reverse_scan(&self, start: &str, end: &str) -> Result<Vec<KvPair>> {
        let pairs = self
            .ranges
            .reverse_scan(start.as_bytes(), end.as_bytes())
            .await?;
        to_text_pairs(pairs)
    }

    /// Delete every key in `[start, end)`, across as many regions as needed
    pub async fn delete_range(&self, start: &str, end: &str) -> Result<()> {
        self.ranges
            .delete_range(start.as_bytes(), end.as_bytes())
            .await
    }

    /// Delete every key from `start` to the end of the keyspace
    pub async fn delete_range_from(&self, start: &str) -> Result<()> {
        self.ranges.delete_range(start.as_bytes(), &[]).await
    }
}

fn to_byte_keys<I, K>(keys: I) -> Vec<Vec<u8>>
where
    I: IntoIterator<Item = K>,
    K: AsRef<str>,
{
    keys.into_iter()
        .map(|key| key.as_ref().as_bytes().to_vec())
        .collect()
}

fn to_text_pairs(pairs: Vec<kvrpcpb::KvPair>) -> Result<Vec<KvPair>> {
    pairs
        .into_iter()
        .map(|pair| KvPair::try_from(pair).map_err(RawKvError::from))
        .collect()
}

