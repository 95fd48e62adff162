//! Range operations
//!
//! Scans are single-region: they are sent to the region owning the start key
//! and return whatever that region holds of the range. Range deletion walks
//! every region the range touches, one region at a time.

use std::sync::Arc;

use proto::kvrpcpb::KvPair;
use tracing::debug;

use crate::error::{RawKvError, RegionError, Result};
use crate::gateway::RawStoreGateway;
use crate::resolver::StoreEndpointResolver;

pub struct RangeOperationDriver {
    resolver: Arc<StoreEndpointResolver>,
    gateway: Arc<RawStoreGateway>,
    scan_limit: u32,
}

impl RangeOperationDriver {
    pub fn new(
        resolver: Arc<StoreEndpointResolver>,
        gateway: Arc<RawStoreGateway>,
        scan_limit: u32,
    ) -> Self {
        Self {
            resolver,
            gateway,
            scan_limit,
        }
    }

    /// Ascending scan of `[start, end)` within the region owning `start`
    pub async fn scan(&self, start: &[u8], end: &[u8]) -> Result<Vec<KvPair>> {
        let tuple = self.resolver.resolve_key(start).await?;
        self.gateway
            .scan(&tuple.target, start.to_vec(), end.to_vec(), self.scan_limit, false)
            .await
    }

    /// Descending scan from `start` (exclusive) down to `end` (inclusive)
    /// within the region owning `start`
    pub async fn reverse_scan(&self, start: &[u8], end: &[u8]) -> Result<Vec<KvPair>> {
        let tuple = self.resolver.resolve_key(start).await?;
        self.gateway
            .scan(&tuple.target, start.to_vec(), end.to_vec(), self.scan_limit, true)
            .await
    }

    /// Delete every key in `[start, end)`; an empty `end` means unbounded
    ///
    /// Each iteration deletes the part of the range inside one region and
    /// moves to the next region boundary. The first failure aborts the walk;
    /// regions already visited stay deleted.
    pub async fn delete_range(&self, start: &[u8], end: &[u8]) -> Result<()> {
        if !end.is_empty() && start >= end {
            return Err(RawKvError::InvalidRange {
                start: String::from_utf8_lossy(start).into_owned(),
                end: String::from_utf8_lossy(end).into_owned(),
            });
        }

        let mut cursor = start.to_vec();
        let mut regions = 0usize;
        loop {
            let tuple = self.resolver.resolve_key(&cursor).await?;
            let region = &tuple.target.region;
            let effective_end = clip_end(end, &region.end_key);

            // A region ending at or before the cursor would never advance it
            if !effective_end.is_empty() && effective_end.as_slice() <= cursor.as_slice() {
                return Err(RegionError::KeyNotInRegion {
                    region_id: region.id,
                }
                .into());
            }

            debug!(
                "delete_range [{:?}, {:?}) in region {}",
                String::from_utf8_lossy(&cursor),
                String::from_utf8_lossy(&effective_end),
                region.id
            );

            self.gateway
                .delete_range(&tuple.target, cursor, effective_end.clone())
                .await?;
            regions += 1;

            if effective_end.is_empty() || effective_end.as_slice() == end {
                break;
            }
            cursor = effective_end;
        }

        debug!("delete_range covered {} regions", regions);
        Ok(())
    }
}

/// The lesser of two exclusive end keys, where empty means unbounded
fn clip_end(requested: &[u8], region_end: &[u8]) -> Vec<u8> {
    match (requested.is_empty(), region_end.is_empty()) {
        (true, _) => region_end.to_vec(),
        (false, true) => requested.to_vec(),
        (false, false) => requested.min(region_end).to_vec(),
    }
}
