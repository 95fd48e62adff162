//! Raw KV client - region-aware routing for a range-sharded key-value store
//!
//! Provides:
//! - Key to region resolution through the metadata service
//! - Region to store address resolution
//! - Batch splitting along region boundaries
//! - Range deletion across any number of regions
//!
//! # Usage Example
//! ```ignore
//! use rawkv::{Config, RawClient};
//!
//! let client = RawClient::connect(Config::with_pd_endpoint("pd0:2379")).await?;
//! client.put("company", "PingCAP").await?;
//! assert_eq!(client.get("company").await?.as_deref(), Some("PingCAP"));
//! ```

pub mod client;
pub mod config;
pub mod directory;
pub mod error;
pub mod gateway;
pub mod pd;
pub mod range;
pub mod resolver;
pub mod router;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use client::RawClient;
pub use config::{Config, ConfigError, MAX_RAW_KV_SCAN_LIMIT};
pub use directory::ClusterDirectory;
pub use error::{RawKvError, RegionError, Result};
pub use pd::{MetadataConnector, MetadataService, PdGrpcConnector};
pub use resolver::{LeaderOrFirstPeer, PeerSelector, StoreEndpointResolver};
pub use router::{RegionGroup, RegionRouter};
pub use store::{GrpcStoreConnector, StoreConnector, StoreService};
pub use types::{ClusterInfo, KvPair, Member, Peer, Region, RegionEpoch, RegionId, Store};
