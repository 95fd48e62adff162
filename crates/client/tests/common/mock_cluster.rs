//! In-memory cluster: a metadata service and stores sharing one keyspace
//!
//! The mock plays both transports. As a `MetadataConnector` it answers
//! members/region/store lookups from a sorted region table; as a
//! `StoreConnector` it hands out stores that validate the request context
//! (region, epoch, leader, key bounds) the way a real store does, and record
//! every call they accept.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::ops::Bound;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use proto::kvrpcpb::{self, *};
use proto::metapb::{self, Peer, RegionEpoch};
use proto::pdpb::{GetMembersResponse, GetRegionResponse, GetStoreResponse, Member, ResponseHeader};
use rawkv::{
    ClusterDirectory, Config, MetadataConnector, MetadataService, RawClient, RawKvError,
    Result, StoreConnector, StoreEndpointResolver, StoreService,
};
use tokio::sync::Barrier;

pub const CLUSTER_ID: u64 = 6_942_001;
pub const STORE_COUNT: u64 = 3;
pub const PD_ADDR: &str = "pd-0:2379";

/// A store call that passed routing validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreCall {
    pub op: &'static str,
    pub region_id: u64,
    pub store_id: u64,
    pub start: Vec<u8>,
    pub end: Vec<u8>,
}

#[derive(Clone)]
pub struct MockCluster {
    inner: Arc<Inner>,
}

struct Inner {
    /// Sorted by start key, contiguous, last region unbounded
    regions: Mutex<Vec<metapb::Region>>,
    /// Leaders reported by the metadata service; absent means "unknown"
    reported_leaders: Mutex<HashMap<u64, Peer>>,
    /// Leaders known only to the stores
    silent_leaders: Mutex<HashMap<u64, Peer>>,
    data: Mutex<BTreeMap<Vec<u8>, Vec<u8>>>,
    calls: Mutex<Vec<StoreCall>>,
    stale_regions: Mutex<HashSet<u64>>,
    failing_regions: Mutex<HashMap<u64, String>>,
    down_stores: Mutex<HashSet<u64>>,
    pd_down: AtomicBool,
    refused_addresses: Mutex<HashSet<String>>,
    locate_barrier: Mutex<Option<Arc<Barrier>>>,
    pd_connects: Mutex<Vec<String>>,
    region_lookups: AtomicUsize,
    store_lookups: AtomicUsize,
    store_connects: AtomicUsize,
}

fn store_address(store_id: u64) -> String {
    format!("store-{}:20160", store_id)
}

fn lossy(key: &[u8]) -> String {
    String::from_utf8_lossy(key).into_owned()
}

impl MockCluster {
    /// Regions split at `split_keys`: `[-inf, k0), [k0, k1), ..., [kn, +inf)`
    ///
    /// Region `i` (id `i + 1`) has two peers; the first is the leader. Peers
    /// are spread round-robin over the stores.
    pub fn new(split_keys: &[&str]) -> Self {
        let mut bounds: Vec<Vec<u8>> = vec![Vec::new()];
        bounds.extend(split_keys.iter().map(|k| k.as_bytes().to_vec()));

        let regions = bounds
            .iter()
            .enumerate()
            .map(|(i, start)| {
                let id = i as u64 + 1;
                let end = bounds.get(i + 1).cloned().unwrap_or_default();
                metapb::Region {
                    id,
                    start_key: start.clone(),
                    end_key: end,
                    region_epoch: Some(RegionEpoch {
                        conf_ver: 1,
                        version: id,
                    }),
                    peers: vec![
                        Peer {
                            id: id * 10 + 1,
                            store_id: (i as u64 % STORE_COUNT) + 1,
                        },
                        Peer {
                            id: id * 10 + 2,
                            store_id: ((i as u64 + 1) % STORE_COUNT) + 1,
                        },
                    ],
                }
            })
            .collect();

        Self {
            inner: Arc::new(Inner {
                regions: Mutex::new(regions),
                reported_leaders: Mutex::new(HashMap::new()),
                silent_leaders: Mutex::new(HashMap::new()),
                data: Mutex::new(BTreeMap::new()),
                calls: Mutex::new(Vec::new()),
                stale_regions: Mutex::new(HashSet::new()),
                failing_regions: Mutex::new(HashMap::new()),
                down_stores: Mutex::new(HashSet::new()),
                pd_down: AtomicBool::new(false),
                refused_addresses: Mutex::new(HashSet::new()),
                locate_barrier: Mutex::new(None),
                pd_connects: Mutex::new(Vec::new()),
                region_lookups: AtomicUsize::new(0),
                store_lookups: AtomicUsize::new(0),
                store_connects: AtomicUsize::new(0),
            }),
        }
    }

    // ==================== Client construction ====================

    pub async fn client(&self) -> RawClient {
        self.client_with_config(Config::with_pd_endpoint(PD_ADDR))
            .await
    }

    pub async fn client_with_config(&self, config: Config) -> RawClient {
        RawClient::with_connectors(config, Arc::new(self.clone()), Arc::new(self.clone()))
            .await
            .expect("mock cluster should bootstrap")
    }

    pub async fn resolver(&self) -> Arc<StoreEndpointResolver> {
        let directory = ClusterDirectory::initialize(PD_ADDR, Arc::new(self.clone()))
            .await
            .expect("mock cluster should bootstrap");
        Arc::new(StoreEndpointResolver::new(Arc::new(directory)))
    }

    // ==================== Topology ====================

    fn locate(&self, key: &[u8]) -> Option<metapb::Region> {
        let regions = self.inner.regions.lock();
        let idx = regions.partition_point(|r| r.start_key.as_slice() <= key);
        if idx == 0 {
            return None;
        }
        let candidate = &regions[idx - 1];
        if candidate.end_key.is_empty() || key < candidate.end_key.as_slice() {
            Some(candidate.clone())
        } else {
            None
        }
    }

    fn region_by_id(&self, region_id: u64) -> Option<metapb::Region> {
        self.inner
            .regions
            .lock()
            .iter()
            .find(|r| r.id == region_id)
            .cloned()
    }

    pub fn region_id_for(&self, key: &str) -> u64 {
        self.locate(key.as_bytes()).map(|r| r.id).unwrap_or_default()
    }

    pub fn region(&self, region_id: u64) -> metapb::Region {
        self.region_by_id(region_id).expect("unknown region")
    }

    /// Make the metadata service report (and the store honour) a leader
    pub fn set_leader(&self, region_id: u64, peer: Peer) {
        self.inner.reported_leaders.lock().insert(region_id, peer);
    }

    /// Move leadership without telling the metadata service
    pub fn move_leader_silently(&self, region_id: u64, peer: Peer) {
        self.inner.silent_leaders.lock().insert(region_id, peer);
    }

    fn actual_leader(&self, region: &metapb::Region) -> Option<Peer> {
        let silent = self.inner.silent_leaders.lock().get(&region.id).copied();
        silent
            .or_else(|| self.inner.reported_leaders.lock().get(&region.id).copied())
            .or_else(|| region.peers.first().copied())
    }

    // ==================== Fault injection ====================

    pub fn mark_epoch_stale(&self, region_id: u64) {
        self.inner.stale_regions.lock().insert(region_id);
    }

    pub fn fail_region(&self, region_id: u64, message: &str) {
        self.inner
            .failing_regions
            .lock()
            .insert(region_id, message.to_string());
    }

    pub fn store_down(&self, store_id: u64) {
        self.inner.down_stores.lock().insert(store_id);
    }

    pub fn set_pd_down(&self, down: bool) {
        self.inner.pd_down.store(down, Ordering::SeqCst);
    }

    /// Refuse metadata connections to one address
    pub fn refuse_address(&self, address: &str) {
        self.inner.refused_addresses.lock().insert(address.to_string());
    }

    /// Hold every region lookup until `n` of them are in flight
    pub fn set_locate_barrier(&self, n: usize) {
        *self.inner.locate_barrier.lock() = Some(Arc::new(Barrier::new(n)));
    }

    // ==================== Data & observation ====================

    pub fn seed(&self, pairs: &[(&str, &str)]) {
        let mut data = self.inner.data.lock();
        for (k, v) in pairs {
            data.insert(k.as_bytes().to_vec(), v.as_bytes().to_vec());
        }
    }

    pub fn value(&self, key: &str) -> Option<String> {
        self.inner.data.lock().get(key.as_bytes()).map(|v| lossy(v))
    }

    pub fn keys(&self) -> Vec<String> {
        self.inner.data.lock().keys().map(|k| lossy(k)).collect()
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.inner.calls.lock().clone()
    }

    pub fn calls_for(&self, op: &str) -> Vec<StoreCall> {
        self.calls().into_iter().filter(|c| c.op == op).collect()
    }

    /// `(start, end)` of every accepted delete-range call, in order
    pub fn delete_range_calls(&self) -> Vec<(String, String)> {
        self.calls_for("raw_delete_range")
            .into_iter()
            .map(|c| (lossy(&c.start), lossy(&c.end)))
            .collect()
    }

    pub fn clear_calls(&self) {
        self.inner.calls.lock().clear();
    }

    pub fn pd_connects(&self) -> Vec<String> {
        self.inner.pd_connects.lock().clone()
    }

    pub fn region_lookups(&self) -> usize {
        self.inner.region_lookups.load(Ordering::SeqCst)
    }

    pub fn store_lookups(&self) -> usize {
        self.inner.store_lookups.load(Ordering::SeqCst)
    }

    pub fn store_connects(&self) -> usize {
        self.inner.store_connects.load(Ordering::SeqCst)
    }

    fn check_pd(&self) -> Result<()> {
        if self.inner.pd_down.load(Ordering::SeqCst) {
            Err(RawKvError::DirectoryUnavailable(
                "connection refused".to_string(),
            ))
        } else {
            Ok(())
        }
    }
}

// ==================== Metadata service ====================

#[async_trait]
impl MetadataConnector for MockCluster {
    async fn connect(&self, address: &str) -> Result<Arc<dyn MetadataService>> {
        self.check_pd()?;
        if self.inner.refused_addresses.lock().contains(address) {
            return Err(RawKvError::DirectoryUnavailable(format!(
                "{}: connection refused",
                address
            )));
        }
        self.inner.pd_connects.lock().push(address.to_string());
        Ok(Arc::new(self.clone()))
    }
}

fn pd_member(i: u64) -> Member {
    Member {
        name: format!("pd-{}", i),
        member_id: i + 1,
        client_urls: vec![format!("http://pd-{}:2379", i)],
        ..Default::default()
    }
}

fn header(cluster_id: u64) -> ResponseHeader {
    ResponseHeader {
        cluster_id,
        error: None,
    }
}

#[async_trait]
impl MetadataService for MockCluster {
    async fn get_members(&self, _cluster_id: u64) -> Result<GetMembersResponse> {
        self.check_pd()?;
        Ok(GetMembersResponse {
            header: Some(header(CLUSTER_ID)),
            leader: Some(pd_member(0)),
            members: (0..3).map(pd_member).collect(),
        })
    }

    async fn get_region(&self, cluster_id: u64, key: &[u8]) -> Result<GetRegionResponse> {
        self.check_pd()?;
        if cluster_id != CLUSTER_ID {
            return Err(RawKvError::DirectoryUnavailable(format!(
                "cluster id mismatch: {}",
                cluster_id
            )));
        }
        self.inner.region_lookups.fetch_add(1, Ordering::SeqCst);

        let barrier = self.inner.locate_barrier.lock().clone();
        if let Some(barrier) = barrier {
            barrier.wait().await;
        }

        let region = self.locate(key);
        let leader = region
            .as_ref()
            .and_then(|r| self.inner.reported_leaders.lock().get(&r.id).copied());
        Ok(GetRegionResponse {
            header: Some(header(cluster_id)),
            region,
            leader,
        })
    }

    async fn get_store(&self, cluster_id: u64, store_id: u64) -> Result<GetStoreResponse> {
        self.check_pd()?;
        self.inner.store_lookups.fetch_add(1, Ordering::SeqCst);
        let store = (1..=STORE_COUNT).contains(&store_id).then(|| metapb::Store {
            id: store_id,
            address: store_address(store_id),
        });
        Ok(GetStoreResponse {
            header: Some(header(cluster_id)),
            store,
        })
    }
}

// ==================== Stores ====================

#[async_trait]
impl StoreConnector for MockCluster {
    async fn connect(&self, address: &str) -> Result<Box<dyn StoreService>> {
        let store_id = (1..=STORE_COUNT)
            .find(|id| store_address(*id) == address)
            .ok_or_else(|| RawKvError::StoreUnavailable {
                address: address.to_string(),
                message: "unknown address".to_string(),
            })?;
        if self.inner.down_stores.lock().contains(&store_id) {
            return Err(RawKvError::StoreUnavailable {
                address: address.to_string(),
                message: "connection refused".to_string(),
            });
        }
        self.inner.store_connects.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockStore {
            store_id,
            cluster: self.clone(),
        }))
    }
}

struct MockStore {
    store_id: u64,
    cluster: MockCluster,
}

/// Outcome of routing validation
enum Admission {
    Accepted(metapb::Region),
    Rejected(kvrpcpb::RegionError),
    Failed(String),
}

fn region_error(message: &str) -> kvrpcpb::RegionError {
    kvrpcpb::RegionError {
        message: message.to_string(),
        ..Default::default()
    }
}

fn in_region(region: &metapb::Region, key: &[u8]) -> bool {
    key >= region.start_key.as_slice()
        && (region.end_key.is_empty() || key < region.end_key.as_slice())
}

impl MockStore {
    /// Validate the context like a real store, then record the call
    fn admit(
        &self,
        op: &'static str,
        ctx: Option<Context>,
        keys: &[&[u8]],
        range: Option<(&[u8], &[u8])>,
    ) -> Admission {
        let ctx = ctx.unwrap_or_default();
        let Some(region) = self.cluster.region_by_id(ctx.region_id) else {
            let mut err = region_error("region not found");
            err.region_not_found = Some(RegionNotFound {
                region_id: ctx.region_id,
            });
            return Admission::Rejected(err);
        };

        if self.cluster.inner.stale_regions.lock().contains(&region.id)
            || ctx.region_epoch != region.region_epoch
        {
            let mut err = region_error("epoch not match");
            err.epoch_not_match = Some(EpochNotMatch {
                current_regions: vec![region.clone()],
            });
            return Admission::Rejected(err);
        }

        let leader = self.cluster.actual_leader(&region);
        if ctx.peer != leader || leader.map(|p| p.store_id) != Some(self.store_id) {
            let mut err = region_error("not leader");
            err.not_leader = Some(NotLeader {
                region_id: region.id,
                leader,
            });
            return Admission::Rejected(err);
        }

        let key_outside = keys.iter().find(|k| !in_region(&region, k));
        let range_outside = range.and_then(|(start, end)| {
            let end_ok = if region.end_key.is_empty() {
                true
            } else {
                !end.is_empty() && end <= region.end_key.as_slice()
            };
            (!in_region(&region, start) || !end_ok).then_some(start)
        });
        if let Some(key) = key_outside.copied().or(range_outside) {
            let mut err = region_error("key not in region");
            err.key_not_in_region = Some(KeyNotInRegion {
                key: key.to_vec(),
                region_id: region.id,
                start_key: region.start_key.clone(),
                end_key: region.end_key.clone(),
            });
            return Admission::Rejected(err);
        }

        if let Some(message) = self.cluster.inner.failing_regions.lock().get(&region.id) {
            return Admission::Failed(message.clone());
        }

        let (start, end) = match range {
            Some((start, end)) => (start.to_vec(), end.to_vec()),
            None => (
                keys.first().map(|k| k.to_vec()).unwrap_or_default(),
                Vec::new(),
            ),
        };
        self.cluster.inner.calls.lock().push(StoreCall {
            op,
            region_id: region.id,
            store_id: self.store_id,
            start,
            end,
        });
        Admission::Accepted(region)
    }
}

/// Split an admission into the two error fields of a response
macro_rules! admitted {
    ($admission:expr, $resp:ty) => {
        match $admission {
            Admission::Accepted(region) => region,
            Admission::Rejected(err) => {
                return Ok(<$resp>::default().with_errors(Some(err), String::new()))
            }
            Admission::Failed(msg) => return Ok(<$resp>::default().with_errors(None, msg)),
        }
    };
}

trait WithErrors {
    fn with_errors(self, region_error: Option<kvrpcpb::RegionError>, error: String) -> Self;
}

macro_rules! impl_with_errors {
    ($($resp:ty),*) => {
        $(
            impl WithErrors for $resp {
                fn with_errors(
                    mut self,
                    region_error: Option<kvrpcpb::RegionError>,
                    error: String,
                ) -> Self {
                    self.region_error = region_error;
                    self.error = error;
                    self
                }
            }
        )*
    };
}

impl_with_errors!(
    RawGetResponse,
    RawPutResponse,
    RawDeleteResponse,
    RawBatchPutResponse,
    RawBatchDeleteResponse,
    RawDeleteRangeResponse
);

/// Pair-returning responses report a failure as an aborted pair
macro_rules! impl_with_pair_errors {
    ($($resp:ty => $pairs:ident),*) => {
        $(
            impl WithErrors for $resp {
                fn with_errors(
                    mut self,
                    region_error: Option<kvrpcpb::RegionError>,
                    error: String,
                ) -> Self {
                    self.region_error = region_error;
                    if !error.is_empty() {
                        self.$pairs.push(KvPair {
                            error: Some(KeyError {
                                abort: error,
                                ..Default::default()
                            }),
                            ..Default::default()
                        });
                    }
                    self
                }
            }
        )*
    };
}

impl_with_pair_errors!(RawBatchGetResponse => pairs, RawScanResponse => kvs);

#[async_trait]
impl StoreService for MockStore {
    async fn raw_get(&self, req: RawGetRequest) -> Result<RawGetResponse> {
        admitted!(
            self.admit("raw_get", req.context, &[req.key.as_slice()], None),
            RawGetResponse
        );
        let value = self.cluster.inner.data.lock().get(&req.key).cloned();
        Ok(RawGetResponse {
            not_found: value.is_none(),
            value: value.unwrap_or_default(),
            ..Default::default()
        })
    }

    async fn raw_put(&self, req: RawPutRequest) -> Result<RawPutResponse> {
        admitted!(
            self.admit("raw_put", req.context, &[req.key.as_slice()], None),
            RawPutResponse
        );
        self.cluster.inner.data.lock().insert(req.key, req.value);
        Ok(RawPutResponse::default())
    }

    async fn raw_delete(&self, req: RawDeleteRequest) -> Result<RawDeleteResponse> {
        admitted!(
            self.admit("raw_delete", req.context, &[req.key.as_slice()], None),
            RawDeleteResponse
        );
        self.cluster.inner.data.lock().remove(&req.key);
        Ok(RawDeleteResponse::default())
    }

    async fn raw_batch_get(&self, req: RawBatchGetRequest) -> Result<RawBatchGetResponse> {
        let keys: Vec<&[u8]> = req.keys.iter().map(|k| k.as_slice()).collect();
        admitted!(
            self.admit("raw_batch_get", req.context, &keys, None),
            RawBatchGetResponse
        );
        let data = self.cluster.inner.data.lock();
        let pairs = req
            .keys
            .iter()
            .filter_map(|k| {
                data.get(k).map(|v| KvPair::new(k.clone(), v.clone()))
            })
            .collect();
        Ok(RawBatchGetResponse {
            pairs,
            ..Default::default()
        })
    }

    async fn raw_batch_put(&self, req: RawBatchPutRequest) -> Result<RawBatchPutResponse> {
        let keys: Vec<&[u8]> = req.pairs.iter().map(|p| p.key.as_slice()).collect();
        admitted!(
            self.admit("raw_batch_put", req.context, &keys, None),
            RawBatchPutResponse
        );
        let mut data = self.cluster.inner.data.lock();
        for pair in req.pairs {
            data.insert(pair.key, pair.value);
        }
        Ok(RawBatchPutResponse::default())
    }

    async fn raw_batch_delete(&self, req: RawBatchDeleteRequest) -> Result<RawBatchDeleteResponse> {
        let keys: Vec<&[u8]> = req.keys.iter().map(|k| k.as_slice()).collect();
        admitted!(
            self.admit("raw_batch_delete", req.context, &keys, None),
            RawBatchDeleteResponse
        );
        let mut data = self.cluster.inner.data.lock();
        for key in &req.keys {
            data.remove(key);
        }
        Ok(RawBatchDeleteResponse::default())
    }

    async fn raw_scan(&self, req: RawScanRequest) -> Result<RawScanResponse> {
        // A reverse scan starts from an exclusive upper bound, which may be
        // the region's own end key, so only forward scans check the start
        let keys: Vec<&[u8]> = if req.reverse {
            Vec::new()
        } else {
            vec![req.start_key.as_slice()]
        };
        let region = admitted!(
            self.admit("raw_scan", req.context, &keys, None),
            RawScanResponse
        );

        let data = self.cluster.inner.data.lock();
        let limit = req.limit as usize;
        let kvs: Vec<KvPair> = if req.reverse {
            let upper = if region.end_key.is_empty() || req.start_key < region.end_key {
                req.start_key.clone()
            } else {
                region.end_key.clone()
            };
            let lower = req.end_key.clone().max(region.start_key.clone());
            if !upper.is_empty() && lower >= upper {
                return Ok(RawScanResponse::default());
            }
            let upper_bound = if upper.is_empty() {
                Bound::Unbounded
            } else {
                Bound::Excluded(upper)
            };
            data.range((Bound::Included(lower), upper_bound))
                .rev()
                .take(limit)
                .map(|(k, v)| KvPair::new(k.clone(), v.clone()))
                .collect()
        } else {
            data.range(req.start_key.clone()..)
                .take_while(|(k, _)| {
                    (req.end_key.is_empty() || **k < req.end_key)
                        && (region.end_key.is_empty() || **k < region.end_key)
                })
                .take(limit)
                .map(|(k, v)| KvPair::new(k.clone(), v.clone()))
                .collect()
        };

        Ok(RawScanResponse {
            kvs,
            ..Default::default()
        })
    }

    async fn raw_delete_range(&self, req: RawDeleteRangeRequest) -> Result<RawDeleteRangeResponse> {
        admitted!(
            self.admit(
                "raw_delete_range",
                req.context,
                &[],
                Some((req.start_key.as_slice(), req.end_key.as_slice()))
            ),
            RawDeleteRangeResponse
        );
        let mut data = self.cluster.inner.data.lock();
        data.retain(|k, _| {
            *k < req.start_key || (!req.end_key.is_empty() && *k >= req.end_key)
        });
        Ok(RawDeleteRangeResponse::default())
    }
}
