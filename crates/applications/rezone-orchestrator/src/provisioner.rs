//! Zone-pinned managed disks created from point-in-time copies
//!
//! Each disk goes through the same sequence:
//!
//! ```text
//! get_disk(target) ── exists ──► Existing (wrong zone ⇒ Conflict)
//!      │
//!      └─ absent ─► copy handle ─► create_disk ─► poll ─► Created
//!                                     │
//!                     retryable error ├─► wait, re-check existence, retry
//!                     other error     └─► Provisioning { attempts }
//! ```
//!
//! The OS disk is always provisioned before any data disk. Data disks fan out
//! up to the configured parallelism; after the first failure no new disk is
//! dispatched, in-flight siblings are allowed to finish, and every disk's final
//! outcome is reported together.

use crate::backoff::Backoff;
use crate::error::{OrchestratorError, Result};
use crate::poller::{OperationPoller, Readiness};
use crate::snapshot::CopyHandleSource;
use futures::stream::{FuturesUnordered, StreamExt};
use rezone_core::{
    ComputeProvider, DiskDefinition, DiskDescriptor, DiskRole, DiskSku, DiskSource, ManagedDisk,
    ResourceId, SkuClass,
};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// One source disk and the replica it becomes
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiskPlan {
    /// Captured source disk
    pub source: DiskDescriptor,
    /// Replica disk name
    pub target_name: String,
    /// Effective target SKU (the source SKU unless a conversion was requested)
    pub target_sku: DiskSku,
}

impl DiskPlan {
    /// Target SKU differs from the source SKU
    pub fn converts_sku(&self) -> bool {
        !self.target_sku.same_as(&self.source.sku)
    }

    /// Role of the source disk
    pub fn role(&self) -> DiskRole {
        self.source.role
    }
}

/// Build the create definition for a replica disk
///
/// Size, performance caps, tier, sector size, encryption set and tags are
/// inherited from the source. Converting into an advanced-tier SKU drops IOPS,
/// throughput and tier so the provider applies its own defaults.
pub fn build_disk_definition(plan: &DiskPlan, zone: &str, source: DiskSource) -> DiskDefinition {
    let src = &plan.source;
    let provider_defaults = plan.converts_sku() && plan.target_sku.class() == SkuClass::Advanced;

    DiskDefinition {
        name: plan.target_name.clone(),
        location: src.location.clone(),
        zone: Some(zone.to_string()),
        sku: plan.target_sku.clone(),
        size_gb: src.size_gb,
        iops_read_write: if provider_defaults { None } else { src.iops_read_write },
        mbps_read_write: if provider_defaults { None } else { src.mbps_read_write },
        tier: if provider_defaults { None } else { src.tier.clone() },
        logical_sector_size: src.logical_sector_size,
        disk_encryption_set: src.disk_encryption_set.clone(),
        os_type: src.os_type.clone(),
        hyper_v_generation: src.hyper_v_generation.clone(),
        source,
        tags: src.tags.clone(),
    }
}

/// Final state of one disk in a provisioning pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DiskOutcome {
    /// Newly created by this pass
    Created {
        /// Replica disk id
        id: ResourceId,
        /// SKU it was created with
        sku: DiskSku,
    },
    /// Already present from an earlier run
    Existing {
        /// Replica disk id
        id: ResourceId,
        /// SKU the existing disk has
        sku: DiskSku,
    },
    /// Creation or polling failed
    Failed {
        /// Rendered failure
        error: String,
    },
    /// Not dispatched because a sibling failed first
    Skipped,
}

impl DiskOutcome {
    /// Creation or polling failed
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// Disk id for created or existing disks
    pub fn disk_id(&self) -> Option<&ResourceId> {
        match self {
            Self::Created { id, .. } | Self::Existing { id, .. } => Some(id),
            _ => None,
        }
    }

    /// SKU the disk was actually provisioned with
    pub fn sku(&self) -> Option<&DiskSku> {
        match self {
            Self::Created { sku, .. } | Self::Existing { sku, .. } => Some(sku),
            _ => None,
        }
    }
}

/// Self-contained result for one disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiskProvisionRecord {
    /// Source disk name
    pub source_disk: String,
    /// Replica disk name
    pub target_name: String,
    /// OS or data disk (with LUN)
    pub role: DiskRole,
    /// Final state
    pub outcome: DiskOutcome,
    /// Create calls made
    pub attempts: u32,
}

impl fmt::Display for DiskProvisionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {} [{}]: ", self.source_disk, self.target_name, self.role)?;
        match &self.outcome {
            DiskOutcome::Created { id, .. } => {
                write!(f, "created {} ({} attempt(s))", id, self.attempts)
            }
            DiskOutcome::Existing { id, .. } => write!(f, "already existed as {}", id),
            DiskOutcome::Failed { error } => {
                write!(f, "FAILED after {} attempt(s): {}", self.attempts, error)
            }
            DiskOutcome::Skipped => write!(f, "skipped (not dispatched after an earlier failure)"),
        }
    }
}

/// Successfully provisioned (or found) disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionedDisk {
    /// Replica disk id
    pub id: ResourceId,
    /// SKU the disk actually has
    pub sku: DiskSku,
    /// Found from an earlier run rather than created
    pub existed: bool,
    /// Create calls made (0 when the disk existed)
    pub attempts: u32,
}

/// Creates zone-pinned replica disks
pub struct ZonalDiskProvisioner {
    provider: Arc<dyn ComputeProvider>,
    poller: OperationPoller,
    timeout: Duration,
    max_attempts: u32,
    retry_backoff: Backoff,
    parallelism: usize,
}

impl ZonalDiskProvisioner {
    /// Create a provisioner with a 3-attempt, 10 second retry policy and
    /// sequential data disks
    pub fn new(
        provider: Arc<dyn ComputeProvider>,
        poller: OperationPoller,
        timeout: Duration,
    ) -> Self {
        Self {
            provider,
            poller,
            timeout,
            max_attempts: 3,
            retry_backoff: Backoff::fixed(Duration::from_secs(10)),
            parallelism: 1,
        }
    }

    /// Set the attempt ceiling and fixed inter-attempt delay
    pub fn with_retries(mut self, max_attempts: u32, delay: Duration) -> Self {
        self.max_attempts = max_attempts.max(1);
        self.retry_backoff = Backoff::fixed(delay);
        self
    }

    /// Set how many data disks may be in flight at once
    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism.max(1);
        self
    }

    /// Provision one replica disk, reusing it if it already exists
    pub async fn provision(
        &self,
        resource_group: &str,
        zone: &str,
        plan: &DiskPlan,
        copies: &dyn CopyHandleSource,
    ) -> Result<ProvisionedDisk> {
        if let Some(existing) = self.provider.get_disk(resource_group, &plan.target_name).await? {
            return self.adopt_existing(existing, zone).await;
        }

        let handle = copies
            .copy_handle(&plan.source.name)
            .ok_or_else(|| OrchestratorError::MissingCopy(plan.source.name.clone()))?;
        let definition = build_disk_definition(plan, zone, handle);

        info!(
            disk = %definition.name,
            source_disk = %plan.source.name,
            sku = %definition.sku,
            zone = %zone,
            "Creating zonal disk"
        );

        let (id, attempts) = self.create_with_retry(resource_group, &definition).await?;

        self.poller
            .wait_for(self.provider.as_ref(), &id, &Readiness::Provisioned, self.timeout)
            .await?;

        Ok(ProvisionedDisk {
            id,
            sku: definition.sku,
            existed: false,
            attempts,
        })
    }

    async fn adopt_existing(&self, existing: ManagedDisk, zone: &str) -> Result<ProvisionedDisk> {
        if !existing.zones.iter().any(|z| z == zone) {
            return Err(OrchestratorError::conflict(format!(
                "{} (exists outside zone {})",
                existing.id, zone
            )));
        }

        info!(disk = %existing.name, id = %existing.id, "Disk already exists, reusing");

        if !existing.provisioning_state.is_succeeded() {
            self.poller
                .wait_for(
                    self.provider.as_ref(),
                    &existing.id,
                    &Readiness::Provisioned,
                    self.timeout,
                )
                .await?;
        }

        Ok(ProvisionedDisk {
            id: existing.id,
            sku: existing.sku,
            existed: true,
            attempts: 0,
        })
    }

    async fn create_with_retry(
        &self,
        resource_group: &str,
        definition: &DiskDefinition,
    ) -> Result<(ResourceId, u32)> {
        let mut attempt = 0u32;

        loop {
            attempt += 1;

            let err = match self.provider.create_disk(resource_group, definition).await {
                Ok(id) => return Ok((id, attempt)),
                Err(e) => e,
            };

            // A failed call may still have created the disk
            if err.is_retryable() || matches!(err, rezone_core::ProviderError::Conflict(_)) {
                let existing = self.provider.get_disk(resource_group, &definition.name).await?;
                if let Some(disk) = existing {
                    warn!(
                        disk = %definition.name,
                        error = %err,
                        "Create reported an error but the disk exists"
                    );
                    return Ok((disk.id, attempt));
                }
            }

            if !err.is_retryable() || attempt >= self.max_attempts {
                error!(
                    disk = %definition.name,
                    attempts = attempt,
                    error = %err,
                    "Disk creation failed"
                );
                return Err(OrchestratorError::Provisioning {
                    resource: definition.name.clone(),
                    attempts: attempt,
                    source: err,
                });
            }

            let delay = self.retry_backoff.delay_for(attempt - 1);
            warn!(
                disk = %definition.name,
                attempt,
                max_attempts = self.max_attempts,
                retry_in_secs = delay.as_secs_f64(),
                error = %err,
                "Transient disk creation failure, retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }

    async fn provision_record(
        &self,
        resource_group: &str,
        zone: &str,
        plan: &DiskPlan,
        copies: &dyn CopyHandleSource,
    ) -> DiskProvisionRecord {
        let (outcome, attempts) = match self.provision(resource_group, zone, plan, copies).await {
            Ok(disk) if disk.existed => (
                DiskOutcome::Existing {
                    id: disk.id,
                    sku: disk.sku,
                },
                disk.attempts,
            ),
            Ok(disk) => (
                DiskOutcome::Created {
                    id: disk.id,
                    sku: disk.sku,
                },
                disk.attempts,
            ),
            Err(e) => {
                let attempts = match &e {
                    OrchestratorError::Provisioning { attempts, .. } => *attempts,
                    _ => 1,
                };
                (
                    DiskOutcome::Failed {
                        error: e.to_string(),
                    },
                    attempts,
                )
            }
        };

        DiskProvisionRecord {
            source_disk: plan.source.name.clone(),
            target_name: plan.target_name.clone(),
            role: plan.role(),
            outcome,
            attempts,
        }
    }

    /// Provision every planned disk, OS disk first
    ///
    /// Returns one record per plan ordered OS disk first then by LUN, or
    /// [`OrchestratorError::DiskProvisioning`] carrying every record if any
    /// disk failed.
    pub async fn provision_all(
        &self,
        resource_group: &str,
        zone: &str,
        plans: &[DiskPlan],
        copies: &dyn CopyHandleSource,
    ) -> Result<Vec<DiskProvisionRecord>> {
        let (os, data): (Vec<&DiskPlan>, Vec<&DiskPlan>) =
            plans.iter().partition(|p| p.source.is_os());

        let mut records = Vec::with_capacity(plans.len());
        let mut failed = false;

        for plan in os {
            let record = self.provision_record(resource_group, zone, plan, copies).await;
            failed |= record.outcome.is_failed();
            records.push(record);
        }

        if failed {
            records.extend(data.iter().map(|plan| skipped(plan)));
        } else {
            records.extend(self.fan_out(resource_group, zone, &data, copies).await);
        }

        records.sort_by_key(|r| r.role.lun().unwrap_or(-1));

        if records.iter().any(|r| r.outcome.is_failed()) {
            return Err(OrchestratorError::DiskProvisioning(records));
        }

        info!(disks = records.len(), "All disks provisioned");
        Ok(records)
    }

    async fn fan_out(
        &self,
        resource_group: &str,
        zone: &str,
        plans: &[&DiskPlan],
        copies: &dyn CopyHandleSource,
    ) -> Vec<DiskProvisionRecord> {
        let mut slots: Vec<Option<DiskProvisionRecord>> = vec![None; plans.len()];
        let mut queue = plans.iter().copied().enumerate();
        let mut in_flight = FuturesUnordered::new();
        let mut failed = false;

        debug!(
            data_disks = plans.len(),
            parallelism = self.parallelism,
            "Dispatching data disks"
        );

        loop {
            while !failed && in_flight.len() < self.parallelism {
                let Some((index, plan)) = queue.next() else {
                    break;
                };
                in_flight.push(async move {
                    (
                        index,
                        self.provision_record(resource_group, zone, plan, copies).await,
                    )
                });
            }

            let Some((index, record)) = in_flight.next().await else {
                break;
            };

            if record.outcome.is_failed() && !failed {
                warn!(
                    disk = %record.target_name,
                    in_flight = in_flight.len(),
                    "Disk failed; letting in-flight disks finish and dispatching no more"
                );
                failed = true;
            }
            slots[index] = Some(record);
        }

        slots
            .into_iter()
            .zip(plans)
            .map(|(slot, plan)| slot.unwrap_or_else(|| skipped(plan)))
            .collect()
    }
}

fn skipped(plan: &DiskPlan) -> DiskProvisionRecord {
    DiskProvisionRecord {
        source_disk: plan.source.name.clone(),
        target_name: plan.target_name.clone(),
        role: plan.role(),
        outcome: DiskOutcome::Skipped,
        attempts: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{InMemoryProvider, ProviderCall};
    use crate::snapshot::SnapshotSet;
    use rezone_core::{CachingMode, ProviderError, Tags};

    const RG: &str = "rg-target";

    fn descriptor(name: &str, role: DiskRole, sku: &str) -> DiskDescriptor {
        DiskDescriptor {
            name: name.to_string(),
            id: Some(ResourceId::new(format!("/rg-src/disks/{}", name))),
            location: "westeurope".to_string(),
            role,
            sku: DiskSku::new(sku),
            size_gb: 256,
            iops_read_write: Some(7500),
            mbps_read_write: Some(250),
            tier: Some("P15".to_string()),
            logical_sector_size: Some(512),
            caching: CachingMode::None,
            write_accelerator: false,
            ephemeral: false,
            disk_encryption_set: Some(ResourceId::new("/rg/des/key")),
            encryption_settings_enabled: false,
            max_shares: None,
            os_type: None,
            hyper_v_generation: None,
            zones: vec![],
            tags: Tags::from([("app".to_string(), "db".to_string())]),
        }
    }

    fn plan(name: &str, role: DiskRole, source_sku: &str, target_sku: &str) -> DiskPlan {
        DiskPlan {
            source: descriptor(name, role, source_sku),
            target_name: format!("{}-z2", name),
            target_sku: DiskSku::new(target_sku),
        }
    }

    fn snapshots(plans: &[DiskPlan]) -> SnapshotSet {
        let mut set = SnapshotSet::new();
        for p in plans {
            set.insert(
                p.source.name.clone(),
                ResourceId::new(format!("/rg/snapshots/{}-snap", p.source.name)),
            );
        }
        set
    }

    fn provisioner(provider: Arc<InMemoryProvider>) -> ZonalDiskProvisioner {
        ZonalDiskProvisioner::new(
            provider,
            OperationPoller::new(Backoff::fixed(Duration::from_secs(1))),
            Duration::from_secs(60),
        )
    }

    fn handle() -> DiskSource {
        DiskSource::Snapshot(ResourceId::new("/rg/snapshots/s"))
    }

    #[test]
    fn test_definition_inherits_performance_when_sku_kept() {
        let p = plan("data", DiskRole::Data { lun: 0 }, DiskSku::PREMIUM, DiskSku::PREMIUM);
        let definition = build_disk_definition(&p, "2", handle());

        assert_eq!(definition.zone.as_deref(), Some("2"));
        assert_eq!(definition.iops_read_write, Some(7500));
        assert_eq!(definition.mbps_read_write, Some(250));
        assert_eq!(definition.tier.as_deref(), Some("P15"));
        assert_eq!(definition.logical_sector_size, Some(512));
        assert_eq!(definition.disk_encryption_set, p.source.disk_encryption_set);
        assert_eq!(definition.tags, p.source.tags);
    }

    #[test]
    fn test_definition_omits_performance_when_converting_to_advanced() {
        let p = plan("data", DiskRole::Data { lun: 0 }, DiskSku::PREMIUM, DiskSku::PREMIUM_V2);
        let definition = build_disk_definition(&p, "2", handle());

        assert_eq!(definition.sku.as_str(), DiskSku::PREMIUM_V2);
        assert_eq!(definition.iops_read_write, None);
        assert_eq!(definition.mbps_read_write, None);
        assert_eq!(definition.tier, None);
        assert_eq!(definition.size_gb, 256);
    }

    #[test]
    fn test_definition_keeps_performance_for_same_advanced_sku() {
        let p = plan("data", DiskRole::Data { lun: 0 }, DiskSku::ULTRA, "ultrassd_lrs");
        let definition = build_disk_definition(&p, "1", handle());
        assert_eq!(definition.iops_read_write, Some(7500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_provision_twice_is_idempotent() {
        let provider = Arc::new(InMemoryProvider::new());
        let p = plan("os", DiskRole::Os, DiskSku::PREMIUM, DiskSku::PREMIUM);
        let copies = snapshots(std::slice::from_ref(&p));
        let provisioner = provisioner(provider.clone());

        let first = provisioner.provision(RG, "2", &p, &copies).await.unwrap();
        let second = provisioner.provision(RG, "2", &p, &copies).await.unwrap();

        assert!(!first.existed);
        assert!(second.existed);
        assert_eq!(first.id, second.id);
        assert_eq!(
            provider.count_calls(|c| matches!(c, ProviderCall::CreateDisk(_))),
            1
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_existing_disk_in_other_zone_conflicts() {
        let provider = Arc::new(InMemoryProvider::new());
        let p = plan("os", DiskRole::Os, DiskSku::PREMIUM, DiskSku::PREMIUM);
        let copies = snapshots(std::slice::from_ref(&p));
        provisioner(provider.clone())
            .provision(RG, "3", &p, &copies)
            .await
            .unwrap();

        let err = provisioner(provider)
            .provision(RG, "2", &p, &copies)
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::Conflict { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failures_are_retried() {
        let provider = Arc::new(InMemoryProvider::new());
        provider.fail_create(
            "data-z2",
            vec![
                ProviderError::Transient("reset".into()),
                ProviderError::Throttled("slow down".into()),
            ],
        );
        let p = plan("data", DiskRole::Data { lun: 0 }, DiskSku::PREMIUM, DiskSku::PREMIUM);
        let copies = snapshots(std::slice::from_ref(&p));

        let disk = provisioner(provider)
            .with_retries(3, Duration::from_secs(10))
            .provision(RG, "2", &p, &copies)
            .await
            .unwrap();

        assert_eq!(disk.attempts, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries_surface_last_error_with_attempts() {
        let provider = Arc::new(InMemoryProvider::new());
        provider.fail_create(
            "data-z2",
            vec![
                ProviderError::Transient("first".into()),
                ProviderError::Transient("second".into()),
                ProviderError::Transient("third".into()),
            ],
        );
        let p = plan("data", DiskRole::Data { lun: 0 }, DiskSku::PREMIUM, DiskSku::PREMIUM);
        let copies = snapshots(std::slice::from_ref(&p));

        let err = provisioner(provider)
            .provision(RG, "2", &p, &copies)
            .await
            .unwrap_err();

        match err {
            OrchestratorError::Provisioning {
                attempts, source, ..
            } => {
                assert_eq!(attempts, 3);
                assert_eq!(source, ProviderError::Transient("third".into()));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_error_fails_immediately() {
        let provider = Arc::new(InMemoryProvider::new());
        provider.fail_create(
            "data-z2",
            vec![ProviderError::Api {
                status: 400,
                code: "InvalidParameter".into(),
                message: "bad tier".into(),
            }],
        );
        let p = plan("data", DiskRole::Data { lun: 0 }, DiskSku::PREMIUM, DiskSku::PREMIUM);
        let copies = snapshots(std::slice::from_ref(&p));

        let err = provisioner(provider)
            .provision(RG, "2", &p, &copies)
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::Provisioning { attempts: 1, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_copy_handle() {
        let provider = Arc::new(InMemoryProvider::new());
        let p = plan("data", DiskRole::Data { lun: 0 }, DiskSku::PREMIUM, DiskSku::PREMIUM);

        let err = provisioner(provider)
            .provision(RG, "2", &p, &SnapshotSet::new())
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::MissingCopy(name) if name == "data"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fan_out_reports_every_disk_on_failure() {
        let provider = Arc::new(InMemoryProvider::new());
        provider.fail_create(
            "data1-z2",
            vec![ProviderError::Conflict("quota exceeded".into())],
        );

        let plans = vec![
            plan("os", DiskRole::Os, DiskSku::PREMIUM, DiskSku::PREMIUM),
            plan("data0", DiskRole::Data { lun: 0 }, DiskSku::PREMIUM, DiskSku::PREMIUM),
            plan("data1", DiskRole::Data { lun: 1 }, DiskSku::PREMIUM, DiskSku::PREMIUM),
            plan("data2", DiskRole::Data { lun: 2 }, DiskSku::PREMIUM, DiskSku::PREMIUM),
        ];
        let copies = snapshots(&plans);

        let err = provisioner(provider)
            .with_parallelism(2)
            .provision_all(RG, "2", &plans, &copies)
            .await
            .unwrap_err();

        let OrchestratorError::DiskProvisioning(records) = err else {
            panic!("expected disk provisioning error");
        };
        assert_eq!(records.len(), 4);
        assert_eq!(records[0].role, DiskRole::Os);
        assert!(matches!(records[0].outcome, DiskOutcome::Created { .. }));
        assert!(matches!(records[1].outcome, DiskOutcome::Created { .. }));
        assert!(records[2].outcome.is_failed());
        // data2 was either never dispatched or finished alongside data1
        assert!(matches!(
            records[3].outcome,
            DiskOutcome::Skipped | DiskOutcome::Created { .. }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sequential_fan_out_succeeds_in_lun_order() {
        let provider = Arc::new(InMemoryProvider::new());
        let plans = vec![
            plan("data1", DiskRole::Data { lun: 1 }, DiskSku::PREMIUM, DiskSku::PREMIUM),
            plan("os", DiskRole::Os, DiskSku::PREMIUM, DiskSku::PREMIUM),
            plan("data0", DiskRole::Data { lun: 0 }, DiskSku::PREMIUM, DiskSku::PREMIUM),
        ];
        let copies = snapshots(&plans);

        let records = provisioner(provider.clone())
            .provision_all(RG, "2", &plans, &copies)
            .await
            .unwrap();

        let names: Vec<_> = records.iter().map(|r| r.target_name.as_str()).collect();
        assert_eq!(names, vec!["os-z2", "data0-z2", "data1-z2"]);

        let first_create = provider
            .calls()
            .into_iter()
            .find(|c| matches!(c, ProviderCall::CreateDisk(_)));
        assert_eq!(first_create, Some(ProviderCall::CreateDisk("os-z2".to_string())));
    }
}
