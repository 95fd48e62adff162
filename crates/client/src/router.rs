//! Region Router - batch key routing module
//!
//! Resolves the owning region of every key in a batch and groups the batch
//! by region, so that each region receives exactly one request.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures::future::try_join_all;
use proto::kvrpcpb::KvPair;
use tracing::debug;

use crate::error::Result;
use crate::resolver::StoreEndpointResolver;
use crate::types::{RegionId, RoutingTarget};

/// Item that can be routed by a key
pub trait RoutingKey {
    fn routing_key(&self) -> &[u8];
}

impl RoutingKey for Vec<u8> {
    fn routing_key(&self) -> &[u8] {
        self
    }
}

impl RoutingKey for KvPair {
    fn routing_key(&self) -> &[u8] {
        &self.key
    }
}

/// Items of a batch that belong to one region
#[derive(Debug, Clone)]
pub struct RegionGroup<T> {
    /// Routing resolved for the first item of the group
    pub target: RoutingTarget,
    /// Items in first-seen order
    pub items: Vec<T>,
}

/// Routing groups keyed by region id
pub type RegionGroups<T> = HashMap<RegionId, RegionGroup<T>>;

/// Region Router
/// Responsible for splitting batches along region boundaries
#[derive(Clone)]
pub struct RegionRouter {
    resolver: Arc<StoreEndpointResolver>,
}

impl RegionRouter {
    pub fn new(resolver: Arc<StoreEndpointResolver>) -> Self {
        Self { resolver }
    }

    /// Resolve every item's routing concurrently and group by region id
    ///
    /// All resolutions are in flight at once. Every item lands in exactly one
    /// group; two items whose lookups returned different peers for the same
    /// region still share a group, under the first item's target.
    pub async fn resolve_all<T>(&self, items: Vec<T>) -> Result<RegionGroups<T>>
    where
        T: RoutingKey + Send + Sync,
    {
        let tuples = try_join_all(
            items
                .iter()
                .map(|item| self.resolver.resolve_key(item.routing_key())),
        )
        .await?;

        let mut groups: RegionGroups<T> = HashMap::new();
        for (item, tuple) in items.into_iter().zip(tuples) {
            match groups.entry(tuple.target.region.id) {
                Entry::Occupied(mut entry) => entry.get_mut().items.push(item),
                Entry::Vacant(entry) => {
                    entry.insert(RegionGroup {
                        target: tuple.target,
                        items: vec![item],
                    });
                }
            }
        }

        debug!("Batch split into {} region groups", groups.len());
        Ok(groups)
    }

    /// Group distinct keys by region
    pub async fn group_keys(&self, keys: Vec<Vec<u8>>) -> Result<RegionGroups<Vec<u8>>> {
        self.resolve_all(dedup_keys(keys)).await
    }

    /// Group key-value pairs by region, one pair per distinct key
    pub async fn group_pairs(&self, pairs: Vec<KvPair>) -> Result<RegionGroups<KvPair>> {
        self.resolve_all(dedup_pairs(pairs)).await
    }
}

/// Drop repeated keys, keeping first occurrences in order
fn dedup_keys(keys: Vec<Vec<u8>>) -> Vec<Vec<u8>> {
    let mut seen = HashSet::with_capacity(keys.len());
    keys.into_iter()
        .filter(|key| seen.insert(key.clone()))
        .collect()
}

/// Drop repeated keys; a key keeps its first position and its last value
fn dedup_pairs(pairs: Vec<KvPair>) -> Vec<KvPair> {
    let mut positions: HashMap<Vec<u8>, usize> = HashMap::with_capacity(pairs.len());
    let mut unique: Vec<KvPair> = Vec::with_capacity(pairs.len());
    for pair in pairs {
        match positions.entry(pair.key.clone()) {
            Entry::Occupied(entry) => unique[*entry.get()].value = pair.value,
            Entry::Vacant(entry) => {
                entry.insert(unique.len());
                unique.push(pair);
            }
        }
    }
    unique
}
