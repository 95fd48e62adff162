//! Store endpoint resolution
//!
//! Turns a region (plus the leader the metadata service reported, if any)
//! into the peer to address and the store hosting it.

use std::sync::Arc;

use tracing::debug;

use crate::directory::ClusterDirectory;
use crate::error::{RawKvError, Result};
use crate::types::{Peer, Region, RoutingTarget, RoutingTuple, Store};

/// Chooses which replica of a region requests are sent to
pub trait PeerSelector: Send + Sync {
    fn select_peer(&self, region: &Region, leader: Option<&Peer>) -> Option<Peer>;
}

/// Reported leader if present, otherwise the first listed peer
///
/// The fallback peer is not checked for reachability or leadership; a wrong
/// guess comes back from the store as a `NotLeader` region error.
#[derive(Debug, Clone, Copy, Default)]
pub struct LeaderOrFirstPeer;

impl PeerSelector for LeaderOrFirstPeer {
    fn select_peer(&self, region: &Region, leader: Option<&Peer>) -> Option<Peer> {
        leader.or_else(|| region.peers.first()).copied()
    }
}

pub struct StoreEndpointResolver {
    directory: Arc<ClusterDirectory>,
    selector: Arc<dyn PeerSelector>,
}

impl StoreEndpointResolver {
    pub fn new(directory: Arc<ClusterDirectory>) -> Self {
        Self::with_selector(directory, Arc::new(LeaderOrFirstPeer))
    }

    pub fn with_selector(
        directory: Arc<ClusterDirectory>,
        selector: Arc<dyn PeerSelector>,
    ) -> Self {
        Self {
            directory,
            selector,
        }
    }

    pub fn directory(&self) -> &ClusterDirectory {
        &self.directory
    }

    /// Pick the region's designated peer and resolve its store
    pub async fn resolve_peer_to_store(
        &self,
        region: &Region,
        leader: Option<&Peer>,
    ) -> Result<(Peer, Store)> {
        let peer = self
            .selector
            .select_peer(region, leader)
            .ok_or(RawKvError::NoPeer(region.id))?;
        let store = self.directory.resolve_store(peer.store_id).await?;
        Ok((peer, store))
    }

    /// Locate the region owning `key` and resolve its store
    ///
    /// Two metadata round trips, never cached.
    pub async fn resolve_key(&self, key: &[u8]) -> Result<RoutingTuple> {
        let location = self.directory.locate_key(key).await?;
        let (peer, store) = self
            .resolve_peer_to_store(&location.region, location.leader.as_ref())
            .await?;

        debug!(
            "Routed {:?} to region {} peer {} at {}",
            String::from_utf8_lossy(key),
            location.region.id,
            peer.id,
            store.address
        );

        Ok(RoutingTuple {
            target: RoutingTarget {
                region: location.region,
                peer,
                store,
            },
            key: key.to_vec(),
        })
    }
}
