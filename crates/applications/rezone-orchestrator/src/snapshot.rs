//! Point-in-time copies of the source instance's storage
//!
//! Two interchangeable capture strategies produce a [`PointInTimeCopy`]:
//!
//! - [`SnapshotCapture`]: one incremental snapshot per disk. Advanced-tier disks
//!   request instant access and are usable as soon as the snapshot is
//!   fast-readable, instead of waiting for full durability.
//! - [`RestorePointCapture`]: one restore point collection scoped to the
//!   instance with one crash-consistent restore point, whose captured metadata
//!   carries a per-disk copy handle.
//!
//! Disk provisioning only ever asks a [`CopyHandleSource`] for the handle of a
//! named disk, so it never branches on which strategy produced the copy.

use crate::config::{CopyStrategy, MigrationConfig};
use crate::error::{OrchestratorError, Result};
use crate::naming;
use crate::poller::{OperationPoller, Readiness};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rezone_core::{
    ComputeProvider, ConsistencyMode, DiskDescriptor, DiskSource, ResourceId,
    RestorePointCollectionDefinition, RestorePointDefinition, SkuClass, SnapshotDefinition,
    VirtualMachine,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Looks up the copy handle a disk's data was captured to
pub trait CopyHandleSource: Send + Sync {
    /// Copy handle for the named source disk, if one was captured
    fn copy_handle(&self, disk_name: &str) -> Option<DiskSource>;
}

fn find_by_disk<'a>(
    handles: &'a BTreeMap<String, ResourceId>,
    disk_name: &str,
) -> Option<&'a ResourceId> {
    handles.get(disk_name).or_else(|| {
        handles
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(disk_name))
            .map(|(_, id)| id)
    })
}

/// Per-disk incremental snapshots keyed by source disk name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SnapshotSet {
    snapshots: BTreeMap<String, ResourceId>,
}

impl SnapshotSet {
    /// Empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the snapshot taken of `disk_name`
    pub fn insert(&mut self, disk_name: impl Into<String>, snapshot_id: ResourceId) {
        self.snapshots.insert(disk_name.into(), snapshot_id);
    }

    /// Number of snapshots
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// No snapshot was recorded
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Snapshot ids, in disk-name order
    pub fn ids(&self) -> impl Iterator<Item = &ResourceId> {
        self.snapshots.values()
    }
}

impl CopyHandleSource for SnapshotSet {
    fn copy_handle(&self, disk_name: &str) -> Option<DiskSource> {
        find_by_disk(&self.snapshots, disk_name).map(|id| DiskSource::Snapshot(id.clone()))
    }
}

/// Restore point with the disk restore points it captured
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RestorePointCopy {
    /// Restore point collection holding the restore point
    pub collection_id: ResourceId,
    /// Crash-consistent restore point
    pub restore_point_id: ResourceId,
    disk_restore_points: BTreeMap<String, ResourceId>,
}

impl RestorePointCopy {
    /// Restore point copy from its per-disk handles
    pub fn new(
        collection_id: ResourceId,
        restore_point_id: ResourceId,
        disk_restore_points: BTreeMap<String, ResourceId>,
    ) -> Self {
        Self {
            collection_id,
            restore_point_id,
            disk_restore_points,
        }
    }

    /// Number of disks the restore point captured
    pub fn disk_count(&self) -> usize {
        self.disk_restore_points.len()
    }
}

impl CopyHandleSource for RestorePointCopy {
    fn copy_handle(&self, disk_name: &str) -> Option<DiskSource> {
        find_by_disk(&self.disk_restore_points, disk_name)
            .map(|id| DiskSource::RestorePoint(id.clone()))
    }
}

/// Point-in-time copy produced by either capture strategy
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PointInTimeCopy {
    /// One incremental snapshot per disk
    Snapshots(SnapshotSet),
    /// One crash-consistent restore point
    RestorePoint(RestorePointCopy),
}

impl PointInTimeCopy {
    /// Transient resources to remove once the replica exists
    pub fn artifacts(&self) -> Vec<ResourceId> {
        match self {
            Self::Snapshots(set) => set.ids().cloned().collect(),
            Self::RestorePoint(copy) => vec![copy.collection_id.clone()],
        }
    }

    /// Delete the copy artifacts
    ///
    /// Best-effort: every failure becomes a warning and the remaining artifacts
    /// are still attempted.
    pub async fn cleanup(&self, provider: &dyn ComputeProvider) -> Vec<String> {
        let mut warnings = Vec::new();

        match self {
            Self::Snapshots(set) => {
                for id in set.ids() {
                    match provider.delete_snapshot(id).await {
                        Ok(()) => info!(snapshot = %id, "Deleted snapshot"),
                        Err(e) => {
                            warn!(snapshot = %id, error = %e, "Failed to delete snapshot");
                            warnings.push(format!("Could not delete snapshot {}: {}", id, e));
                        }
                    }
                }
            }
            Self::RestorePoint(copy) => {
                let id = &copy.collection_id;
                match provider.delete_restore_point_collection(id).await {
                    Ok(()) => info!(collection = %id, "Deleted restore point collection"),
                    Err(e) => {
                        warn!(
                            collection = %id,
                            error = %e,
                            "Failed to delete restore point collection"
                        );
                        warnings.push(format!(
                            "Could not delete restore point collection {}: {}",
                            id, e
                        ));
                    }
                }
            }
        }

        warnings
    }
}

impl CopyHandleSource for PointInTimeCopy {
    fn copy_handle(&self, disk_name: &str) -> Option<DiskSource> {
        match self {
            Self::Snapshots(set) => set.copy_handle(disk_name),
            Self::RestorePoint(copy) => copy.copy_handle(disk_name),
        }
    }
}

/// Disk class that cannot be captured by a crash-consistent restore point
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum RestorePointBlocker {
    /// Ultra disk or premium SSD v2
    AdvancedTier {
        /// Disk name
        disk: String,
        /// Disk SKU
        sku: String,
    },
    /// Write acceleration is enabled on the attachment
    WriteAccelerated {
        /// Disk name
        disk: String,
    },
    /// OS disk lives on host-local storage
    EphemeralOs {
        /// Disk name
        disk: String,
    },
    /// Disk is shared between instances
    MultiAttach {
        /// Disk name
        disk: String,
        /// Configured share count
        max_shares: u32,
    },
}

impl RestorePointBlocker {
    /// Disk the blocker applies to
    pub fn disk(&self) -> &str {
        match self {
            Self::AdvancedTier { disk, .. }
            | Self::WriteAccelerated { disk }
            | Self::EphemeralOs { disk }
            | Self::MultiAttach { disk, .. } => disk,
        }
    }
}

impl fmt::Display for RestorePointBlocker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AdvancedTier { disk, sku } => write!(
                f,
                "disk {} uses {} which restore points cannot capture; use the snapshot strategy",
                disk, sku
            ),
            Self::WriteAccelerated { disk } => write!(
                f,
                "disk {} has write acceleration enabled, which restore points do not support",
                disk
            ),
            Self::EphemeralOs { disk } => write!(
                f,
                "OS disk {} is ephemeral and has no managed copy to capture",
                disk
            ),
            Self::MultiAttach { disk, max_shares } => write!(
                f,
                "disk {} is shared (maxShares {}), which restore points do not support",
                disk, max_shares
            ),
        }
    }
}

/// Every reason the given disks cannot be captured by a restore point
///
/// One disk may yield several blockers; none are collapsed.
pub fn restore_point_blockers(disks: &[DiskDescriptor]) -> Vec<RestorePointBlocker> {
    let mut blockers = Vec::new();

    for disk in disks {
        if disk.sku.class() == SkuClass::Advanced {
            blockers.push(RestorePointBlocker::AdvancedTier {
                disk: disk.name.clone(),
                sku: disk.sku.to_string(),
            });
        }
        if disk.write_accelerator {
            blockers.push(RestorePointBlocker::WriteAccelerated {
                disk: disk.name.clone(),
            });
        }
        if disk.ephemeral {
            blockers.push(RestorePointBlocker::EphemeralOs {
                disk: disk.name.clone(),
            });
        }
        if let Some(shares) = disk.max_shares.filter(|s| *s > 1) {
            blockers.push(RestorePointBlocker::MultiAttach {
                disk: disk.name.clone(),
                max_shares: shares,
            });
        }
    }

    blockers
}

/// What to capture and where to put the copy artifacts
#[derive(Debug, Clone)]
pub struct CaptureRequest<'a> {
    /// Source instance
    pub vm: &'a VirtualMachine,
    /// Disks whose data must be copied (a subset of the instance's disks)
    pub disks: &'a [DiskDescriptor],
    /// Every disk attached to the source, used to compute exclusions
    pub all_disks: &'a [DiskDescriptor],
    /// Resource group receiving the copy artifacts
    pub resource_group: &'a str,
    /// Timestamp used in artifact names
    pub at: DateTime<Utc>,
}

/// Capture strategy producing a point-in-time copy
#[async_trait]
pub trait PointInTimeCapture: Send + Sync {
    /// Strategy name for logs
    fn name(&self) -> &'static str;

    /// Take the copy and wait until every handle is usable
    async fn capture(&self, request: &CaptureRequest<'_>) -> Result<PointInTimeCopy>;
}

/// Build the capture strategy selected by configuration
pub fn capture_for(
    provider: Arc<dyn ComputeProvider>,
    config: &MigrationConfig,
) -> Box<dyn PointInTimeCapture> {
    let poller = OperationPoller::new(config.poll_backoff);
    match config.copy_strategy {
        CopyStrategy::Snapshot => Box::new(SnapshotCapture {
            provider,
            poller,
            timeout: config.copy_timeout,
            instant_access_minutes: config.instant_access_minutes,
        }),
        CopyStrategy::RestorePoint => Box::new(RestorePointCapture {
            provider,
            poller,
            timeout: config.copy_timeout,
        }),
    }
}

/// Per-disk incremental snapshot strategy
pub struct SnapshotCapture {
    provider: Arc<dyn ComputeProvider>,
    poller: OperationPoller,
    timeout: Duration,
    instant_access_minutes: u32,
}

impl SnapshotCapture {
    /// Snapshot strategy polling each snapshot up to `timeout`
    pub fn new(
        provider: Arc<dyn ComputeProvider>,
        poller: OperationPoller,
        timeout: Duration,
        instant_access_minutes: u32,
    ) -> Self {
        Self {
            provider,
            poller,
            timeout,
            instant_access_minutes,
        }
    }

    fn definition(
        &self,
        disk: &DiskDescriptor,
        source_id: &ResourceId,
        at: DateTime<Utc>,
    ) -> SnapshotDefinition {
        let instant_access = disk.sku.supports_instant_access();
        SnapshotDefinition {
            name: naming::snapshot_name(&disk.name, at),
            location: disk.location.clone(),
            source_disk_id: source_id.clone(),
            incremental: true,
            instant_access_minutes: instant_access.then_some(self.instant_access_minutes),
            tags: disk.tags.clone(),
        }
    }

    /// Create every snapshot, then wait for each; ids land in `created` as
    /// soon as the provider accepts them
    async fn take_snapshots(
        &self,
        request: &CaptureRequest<'_>,
        created: &mut Vec<ResourceId>,
    ) -> Result<SnapshotSet> {
        let mut pending = Vec::with_capacity(request.disks.len());

        for disk in request.disks {
            let source_id = disk
                .id
                .as_ref()
                .ok_or_else(|| OrchestratorError::MissingCopy(disk.name.clone()))?;
            let definition = self.definition(disk, source_id, request.at);

            info!(
                disk = %disk.name,
                snapshot = %definition.name,
                instant_access = definition.instant_access_minutes.is_some(),
                "Creating incremental snapshot"
            );
            let id = self
                .provider
                .create_snapshot(request.resource_group, &definition)
                .await?;
            created.push(id.clone());
            pending.push((disk, id, definition.instant_access_minutes.is_some()));
        }

        // Snapshots progress in parallel on the provider side; wait for each in turn
        let mut set = SnapshotSet::new();
        for (disk, id, instant_access) in pending {
            let readiness = if instant_access {
                Readiness::fast_readable()
            } else {
                Readiness::Provisioned
            };
            self.poller
                .wait_for(self.provider.as_ref(), &id, &readiness, self.timeout)
                .await?;
            set.insert(disk.name.clone(), id);
        }

        Ok(set)
    }
}

#[async_trait]
impl PointInTimeCapture for SnapshotCapture {
    fn name(&self) -> &'static str {
        "snapshot"
    }

    async fn capture(&self, request: &CaptureRequest<'_>) -> Result<PointInTimeCopy> {
        let mut created = Vec::with_capacity(request.disks.len());
        match self.take_snapshots(request, &mut created).await {
            Ok(set) => {
                info!(snapshots = set.len(), "Snapshots ready");
                Ok(PointInTimeCopy::Snapshots(set))
            }
            Err(e) => {
                warn!(created = created.len(), error = %e, "Snapshot capture failed");
                Err(OrchestratorError::capture_failed(created, e))
            }
        }
    }
}

/// Crash-consistent restore point strategy
pub struct RestorePointCapture {
    provider: Arc<dyn ComputeProvider>,
    poller: OperationPoller,
    timeout: Duration,
}

impl RestorePointCapture {
    /// Restore point strategy polling each step up to `timeout`
    pub fn new(
        provider: Arc<dyn ComputeProvider>,
        poller: OperationPoller,
        timeout: Duration,
    ) -> Self {
        Self {
            provider,
            poller,
            timeout,
        }
    }

    async fn wait_provisioned(&self, id: &ResourceId) -> Result<()> {
        self.poller
            .wait_for(self.provider.as_ref(), id, &Readiness::Provisioned, self.timeout)
            .await?;
        Ok(())
    }

    async fn take_restore_point(
        &self,
        request: &CaptureRequest<'_>,
        created: &mut Vec<ResourceId>,
    ) -> Result<RestorePointCopy> {
        let vm = request.vm;

        let collection = RestorePointCollectionDefinition {
            name: naming::restore_point_collection_name(&vm.name, request.at),
            location: vm.location.clone(),
            source_vm_id: vm.id.clone(),
            tags: vm.tags.clone(),
        };
        info!(vm = %vm.name, collection = %collection.name, "Creating restore point collection");
        let collection_id = self
            .provider
            .create_restore_point_collection(request.resource_group, &collection)
            .await?;
        created.push(collection_id.clone());
        self.wait_provisioned(&collection_id).await?;

        let wanted: Vec<&str> = request.disks.iter().map(|d| d.name.as_str()).collect();
        let excluded_disks: Vec<ResourceId> = request
            .all_disks
            .iter()
            .filter(|d| !wanted.contains(&d.name.as_str()))
            .filter_map(|d| d.id.clone())
            .collect();

        let definition = RestorePointDefinition {
            name: naming::restore_point_name(&vm.name, request.at),
            consistency_mode: ConsistencyMode::CrashConsistent,
            excluded_disks,
        };
        info!(
            restore_point = %definition.name,
            excluded = definition.excluded_disks.len(),
            "Creating crash-consistent restore point"
        );
        let restore_point_id = self
            .provider
            .create_restore_point(&collection_id, &definition)
            .await?;
        self.wait_provisioned(&restore_point_id).await?;

        let restore_point = self.provider.get_restore_point(&restore_point_id).await?;
        let handles: BTreeMap<String, ResourceId> = restore_point
            .disk_restore_points
            .into_iter()
            .map(|r| (r.disk_name, r.restore_point_id))
            .collect();

        for disk in request.disks {
            if find_by_disk(&handles, &disk.name).is_none() {
                return Err(OrchestratorError::MissingCopy(disk.name.clone()));
            }
        }

        debug!(disks = handles.len(), "Restore point captured disk handles");
        Ok(RestorePointCopy::new(collection_id, restore_point_id, handles))
    }
}

#[async_trait]
impl PointInTimeCapture for RestorePointCapture {
    fn name(&self) -> &'static str {
        "restore-point"
    }

    async fn capture(&self, request: &CaptureRequest<'_>) -> Result<PointInTimeCopy> {
        let mut created = Vec::with_capacity(1);
        match self.take_restore_point(request, &mut created).await {
            Ok(copy) => Ok(PointInTimeCopy::RestorePoint(copy)),
            Err(e) => {
                warn!(error = %e, "Restore point capture failed");
                Err(OrchestratorError::capture_failed(created, e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rezone_core::{CachingMode, DiskRole, DiskSku, Tags};

    fn disk(name: &str, sku: &str) -> DiskDescriptor {
        DiskDescriptor {
            name: name.to_string(),
            id: Some(ResourceId::new(format!("/rg/disks/{}", name))),
            location: "westeurope".to_string(),
            role: DiskRole::Data { lun: 0 },
            sku: DiskSku::new(sku),
            size_gb: 128,
            iops_read_write: None,
            mbps_read_write: None,
            tier: None,
            logical_sector_size: None,
            caching: CachingMode::None,
            write_accelerator: false,
            ephemeral: false,
            disk_encryption_set: None,
            encryption_settings_enabled: false,
            max_shares: None,
            os_type: None,
            hyper_v_generation: None,
            zones: vec![],
            tags: Tags::new(),
        }
    }

    #[test]
    fn test_blockers_are_itemized_per_disk() {
        let mut wa = disk("log", DiskSku::PREMIUM);
        wa.write_accelerator = true;
        let mut shared = disk("shared", DiskSku::PREMIUM);
        shared.max_shares = Some(2);
        let mut eph = disk("os", DiskSku::STANDARD_SSD);
        eph.ephemeral = true;
        let ultra = disk("fast", DiskSku::ULTRA);
        let ok = disk("plain", DiskSku::PREMIUM);

        let blockers = restore_point_blockers(&[wa, shared, eph, ultra, ok]);

        assert_eq!(blockers.len(), 4);
        assert!(matches!(blockers[0], RestorePointBlocker::WriteAccelerated { .. }));
        assert!(matches!(blockers[1], RestorePointBlocker::MultiAttach { max_shares: 2, .. }));
        assert!(matches!(blockers[2], RestorePointBlocker::EphemeralOs { .. }));
        assert!(matches!(blockers[3], RestorePointBlocker::AdvancedTier { .. }));
        assert!(blockers.iter().all(|b| b.disk() != "plain"));
    }

    #[test]
    fn test_single_share_is_not_multi_attach() {
        let mut d = disk("data", DiskSku::PREMIUM);
        d.max_shares = Some(1);
        assert!(restore_point_blockers(&[d]).is_empty());
    }

    #[test]
    fn test_copy_handle_lookup_is_strategy_agnostic() {
        let mut set = SnapshotSet::new();
        set.insert("data-01", ResourceId::new("/rg/snapshots/data-01-snap"));
        let snapshots = PointInTimeCopy::Snapshots(set);

        let mut handles = BTreeMap::new();
        handles.insert("data-01".to_string(), ResourceId::new("/rpc/rp/diskRestorePoints/x"));
        let rp = PointInTimeCopy::RestorePoint(RestorePointCopy::new(
            ResourceId::new("/rg/rpc"),
            ResourceId::new("/rg/rpc/rp"),
            handles,
        ));

        for copy in [&snapshots, &rp] {
            assert!(copy.copy_handle("DATA-01").is_some());
            assert!(copy.copy_handle("missing").is_none());
        }
        assert!(matches!(rp.copy_handle("data-01"), Some(DiskSource::RestorePoint(_))));
        assert_eq!(rp.artifacts(), vec![ResourceId::new("/rg/rpc")]);
    }
}
