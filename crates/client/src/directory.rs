//! Cluster directory
//!
//! Holds the cluster identity discovered at bootstrap and answers the two
//! routing questions the client asks the metadata service: which region owns
//! a key, and where a store lives.

use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::error::{RawKvError, Result};
use crate::pd::{MetadataConnector, MetadataService};
use crate::types::{ClusterInfo, KeyLocation, Store, StoreId};

/// Cluster id sent before the real one is known
const BOOTSTRAP_CLUSTER_ID: u64 = 0;

pub struct ClusterDirectory {
    cluster: ClusterInfo,
    connector: Arc<dyn MetadataConnector>,
    /// Connection to the metadata leader, opened on first use and reused
    /// until the directory is dropped
    leader: OnceCell<Arc<dyn MetadataService>>,
}

impl ClusterDirectory {
    /// Bootstrap from any metadata service member
    pub async fn initialize(address: &str, connector: Arc<dyn MetadataConnector>) -> Result<Self> {
        let bootstrap = connector.connect(address).await?;
        let resp = bootstrap.get_members(BOOTSTRAP_CLUSTER_ID).await?;

        let header = resp.header.ok_or_else(|| {
            RawKvError::DirectoryUnavailable(format!("{} sent no response header", address))
        })?;
        let leader = resp.leader.ok_or_else(|| {
            RawKvError::DirectoryUnavailable(format!("{} reported no leader", address))
        })?;

        let cluster = ClusterInfo {
            id: header.cluster_id,
            leader,
            members: resp.members,
        };

        info!(
            "Discovered cluster {} via {}: leader {}, {} members",
            cluster.id,
            address,
            cluster.leader.name,
            cluster.members.len()
        );

        Ok(Self {
            cluster,
            connector,
            leader: OnceCell::new(),
        })
    }

    pub fn cluster(&self) -> &ClusterInfo {
        &self.cluster
    }

    pub fn cluster_id(&self) -> u64 {
        self.cluster.id
    }

    async fn leader(&self) -> Result<&Arc<dyn MetadataService>> {
        self.leader
            .get_or_try_init(|| async {
                let url = self.cluster.leader.client_urls.first().ok_or_else(|| {
                    RawKvError::DirectoryUnavailable(format!(
                        "leader {} has no client url",
                        self.cluster.leader.name
                    ))
                })?;
                info!("Connecting to metadata leader at {}", url);
                self.connector.connect(url).await
            })
            .await
    }

    /// Ask the metadata leader for the region owning `key`
    pub async fn locate_key(&self, key: &[u8]) -> Result<KeyLocation> {
        let resp = self.leader().await?.get_region(self.cluster.id, key).await?;

        let region = resp.region.ok_or_else(|| {
            RawKvError::DirectoryUnavailable(format!(
                "no region for key {:?}",
                String::from_utf8_lossy(key)
            ))
        })?;

        debug!(
            "Key {:?} is in region {} (leader: {:?})",
            String::from_utf8_lossy(key),
            region.id,
            resp.leader.map(|p| p.id)
        );

        Ok(KeyLocation {
            region: region.into(),
            leader: resp.leader,
        })
    }

    /// Ask the metadata leader for a store's address
    pub async fn resolve_store(&self, store_id: StoreId) -> Result<Store> {
        let resp = self
            .leader()
            .await?
            .get_store(self.cluster.id, store_id)
            .await?;

        let store: Store = resp
            .store
            .ok_or_else(|| RawKvError::DirectoryUnavailable(format!("no store {}", store_id)))?
            .into();

        debug!("Store {} is at {}", store.id, store.address);
        Ok(store)
    }
}
