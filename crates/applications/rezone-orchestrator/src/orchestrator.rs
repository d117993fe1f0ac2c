//! Migration state machine
//!
//! ```text
//! Validate → Quiesce → Copy → ProvisionDisks → ProvisionNetwork
//!     → AssembleInstance → Cleanup → Done
//! ```
//!
//! Each stage runs only after the previous one succeeded. Validation (and the
//! placement policy applied to its decision) runs before anything is mutated,
//! so its errors are returned as-is. Any later failure is wrapped in
//! [`OrchestratorError::Interrupted`] listing every resource created so far;
//! re-running the same request skips disks and the NIC that already exist.
//!
//! In what-if mode every read-only step runs in full and each mutating action
//! is logged and recorded in [`MigrationResult::planned_actions`] instead of
//! being performed.

use crate::config::{MigrationConfig, PlacementPolicy};
use crate::error::{OrchestratorError, Result};
use crate::network::build_replica_nic;
use crate::placement::PlacementDecision;
use crate::poller::{OperationPoller, Readiness};
use crate::provisioner::{DiskOutcome, DiskPlan, DiskProvisionRecord, ZonalDiskProvisioner};
use crate::snapshot::{self, CaptureRequest, CopyHandleSource, PointInTimeCopy, SnapshotSet};
use crate::validator::{CompatibilityValidator, MigrationPlan, MigrationRequest};
use chrono::Utc;
use rezone_core::{
    CachingMode, ComputeProvider, DiskAttachmentDefinition, DiskDescriptor, InstanceDefinition,
    PowerState, ResourceId,
};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

/// Stage of the migration state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MigrationStage {
    /// Read facts, run every rule, inspect leftovers of earlier runs
    Validate,
    /// Deallocate the source
    Quiesce,
    /// Take the point-in-time copy
    Copy,
    /// Create zonal disks from the copy
    ProvisionDisks,
    /// Create the replica NIC
    ProvisionNetwork,
    /// Create the zonal instance
    AssembleInstance,
    /// Remove copy artifacts
    Cleanup,
    /// Migration finished
    Done,
}

impl fmt::Display for MigrationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Outcome of a migration, accumulated stage by stage
#[derive(Debug, Clone, Default, Serialize)]
pub struct MigrationResult {
    /// Source instance name
    pub source_vm: String,
    /// Replica instance name
    pub target_vm_name: String,
    /// Resource group receiving the replica
    pub target_resource_group: String,
    /// Availability zone of the replica
    pub target_zone: String,
    /// What-if run: mutating actions were only planned
    pub what_if: bool,
    /// Stages that finished, in order
    pub completed_stages: Vec<MigrationStage>,

    /// Stage that failed, if any
    pub failed_stage: Option<MigrationStage>,

    /// Per-disk provisioning records, OS disk first
    pub disks: Vec<DiskProvisionRecord>,
    /// Replica disks created by this run
    pub created_disk_ids: Vec<ResourceId>,
    /// Replica disks left by an earlier run and reused
    pub reused_disk_ids: Vec<ResourceId>,
    /// Replica NIC
    pub nic_id: Option<ResourceId>,
    /// The NIC was left by an earlier run
    pub nic_reused: bool,
    /// Replica instance, once submitted
    pub vm_id: Option<ResourceId>,

    /// Snapshots or restore point collection taken by this run
    pub copy_artifacts: Vec<ResourceId>,
    /// Every copy artifact was deleted during cleanup
    pub copies_removed: bool,

    /// Placement group decision made during validation
    pub placement: Option<PlacementDecision>,

    /// Mutating actions that would have run (what-if only)
    pub planned_actions: Vec<String>,

    /// Non-fatal observations, including cleanup failures
    pub warnings: Vec<String>,
    /// Failure messages (filled by `run_with_report`)
    pub errors: Vec<String>,
}

impl MigrationResult {
    fn new(request: &MigrationRequest, what_if: bool) -> Self {
        Self {
            source_vm: request.vm_name.clone(),
            target_vm_name: request.effective_vm_name().to_string(),
            target_resource_group: request.effective_resource_group().to_string(),
            target_zone: request.target_zone.clone(),
            what_if,
            ..Default::default()
        }
    }

    /// Migration reached `Done` (or a what-if run finished without errors)
    pub fn succeeded(&self) -> bool {
        self.errors.is_empty()
            && (self.what_if || self.completed_stages.last() == Some(&MigrationStage::Done))
    }

    /// Every resource this run created that still exists
    pub fn created_resources(&self) -> Vec<ResourceId> {
        let mut created = Vec::new();
        if !self.copies_removed {
            created.extend(self.copy_artifacts.iter().cloned());
        }
        created.extend(self.created_disk_ids.iter().cloned());
        if !self.nic_reused {
            created.extend(self.nic_id.iter().cloned());
        }
        created.extend(self.vm_id.iter().cloned());
        created
    }

    fn complete(&mut self, stage: MigrationStage) {
        info!(stage = %stage, "Stage complete");
        self.completed_stages.push(stage);
    }

    fn absorb_disks(&mut self, records: &[DiskProvisionRecord]) {
        for record in records {
            match &record.outcome {
                DiskOutcome::Created { id, .. } => self.created_disk_ids.push(id.clone()),
                DiskOutcome::Existing { id, .. } => self.reused_disk_ids.push(id.clone()),
                _ => {}
            }
        }
        self.disks = records.to_vec();
    }

    fn record_action(&mut self, action: String) {
        info!(action = %action, "What-if: would perform");
        self.planned_actions.push(action);
    }

    /// Human-readable multi-line report
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let status = if !self.errors.is_empty() {
            "FAILED"
        } else if self.what_if {
            "what-if (no changes made)"
        } else {
            "completed"
        };

        out.push_str(&format!(
            "Migration {} -> {}/{} in zone {}: {}\n",
            self.source_vm,
            self.target_resource_group,
            self.target_vm_name,
            self.target_zone,
            status
        ));

        let stages: Vec<String> = self.completed_stages.iter().map(|s| s.to_string()).collect();
        out.push_str(&format!("  Stages completed: {}\n", stages.join(" → ")));
        if let Some(stage) = self.failed_stage {
            out.push_str(&format!("  Failed during: {}\n", stage));
        }
        if let Some(placement) = &self.placement {
            out.push_str(&format!("  Placement: {}\n", placement));
        }

        if !self.planned_actions.is_empty() {
            out.push_str("  Planned actions:\n");
            for action in &self.planned_actions {
                out.push_str(&format!("    - {}\n", action));
            }
        }

        for record in &self.disks {
            out.push_str(&format!("  Disk {}\n", record));
        }
        if let Some(nic) = &self.nic_id {
            let how = if self.nic_reused { "reused" } else { "created" };
            out.push_str(&format!("  NIC ({}): {}\n", how, nic));
        }
        if let Some(vm) = &self.vm_id {
            out.push_str(&format!("  Instance: {}\n", vm));
        }
        if !self.copy_artifacts.is_empty() {
            let how = if self.copies_removed { "removed" } else { "kept" };
            out.push_str(&format!("  Copy artifacts ({}):\n", how));
            for id in &self.copy_artifacts {
                out.push_str(&format!("    - {}\n", id));
            }
        }

        if !self.warnings.is_empty() {
            out.push_str("  Warnings:\n");
            for warning in &self.warnings {
                out.push_str(&format!("    - {}\n", warning));
            }
        }
        if !self.errors.is_empty() {
            out.push_str("  Errors:\n");
            for error in &self.errors {
                for (i, line) in error.lines().enumerate() {
                    let bullet = if i == 0 { "-" } else { " " };
                    out.push_str(&format!("    {} {}\n", bullet, line));
                }
            }
        }

        out
    }
}

/// Read-only facts about resources left behind by an earlier run
struct ReentryState {
    /// Disks whose replica does not exist yet
    to_copy: Vec<DiskDescriptor>,
    existing_nic: Option<ResourceId>,
}

/// Sequences validation, copy, provisioning and assembly
pub struct MigrationOrchestrator {
    provider: Arc<dyn ComputeProvider>,
    config: MigrationConfig,
}

impl MigrationOrchestrator {
    /// Orchestrator driving `provider` with `config`
    pub fn new(provider: Arc<dyn ComputeProvider>, config: MigrationConfig) -> Self {
        Self { provider, config }
    }

    /// Configuration in use
    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    fn poller(&self) -> OperationPoller {
        OperationPoller::new(self.config.poll_backoff)
    }

    /// Run the migration
    ///
    /// Returns the result on success, or the failure (wrapped in
    /// `Interrupted` when resources were already touched).
    pub async fn run(&self, request: &MigrationRequest) -> Result<MigrationResult> {
        let mut result = MigrationResult::new(request, self.config.what_if);
        self.drive(request, &mut result).await?;
        Ok(result)
    }

    /// Run the migration and fold any failure into the result's `errors`
    pub async fn run_with_report(&self, request: &MigrationRequest) -> MigrationResult {
        let mut result = MigrationResult::new(request, self.config.what_if);
        if let Err(e) = self.drive(request, &mut result).await {
            if let OrchestratorError::Interrupted { stage, .. } = &e {
                result.failed_stage = Some(*stage);
            } else {
                result.failed_stage = Some(MigrationStage::Validate);
            }
            result.errors.push(e.to_string());
        }
        result
    }

    async fn drive(&self, request: &MigrationRequest, result: &mut MigrationResult) -> Result<()> {
        info!(
            vm = %request.vm_name,
            resource_group = %request.resource_group,
            target_zone = %request.target_zone,
            what_if = self.config.what_if,
            "Starting zone migration"
        );

        // Nothing below mutates until quiesce
        let validator = CompatibilityValidator::new(self.provider.clone(), &self.config);
        let plan = validator.validate(request).await?;
        result.warnings.extend(plan.warnings.iter().cloned());
        result.placement = Some(plan.placement.clone());

        let placement_group = self.apply_placement_policy(&plan, result)?;
        let reentry = self.inspect_target(&plan).await?;
        result.complete(MigrationStage::Validate);

        if self.config.what_if {
            self.record_what_if(&plan, &reentry, placement_group.as_ref(), result);
            return Ok(());
        }

        self.quiesce(&plan)
            .await
            .map_err(|e| interrupted(MigrationStage::Quiesce, result, e))?;
        result.complete(MigrationStage::Quiesce);

        let copy = match self.copy(&plan, &reentry).await {
            Ok(copy) => copy,
            Err(OrchestratorError::CaptureFailed { created, source }) => {
                result.copy_artifacts = created;
                return Err(interrupted(MigrationStage::Copy, result, *source));
            }
            Err(e) => return Err(interrupted(MigrationStage::Copy, result, e)),
        };
        if let Some(copy) = &copy {
            result.copy_artifacts = copy.artifacts();
        }
        result.complete(MigrationStage::Copy);

        let empty = SnapshotSet::new();
        let handles: &dyn CopyHandleSource = match &copy {
            Some(copy) => copy,
            None => &empty,
        };
        let records = match self.provision_disks(&plan, handles).await {
            Ok(records) => records,
            Err(OrchestratorError::DiskProvisioning(records)) => {
                result.absorb_disks(&records);
                return Err(interrupted(
                    MigrationStage::ProvisionDisks,
                    result,
                    OrchestratorError::DiskProvisioning(records),
                ));
            }
            Err(e) => return Err(interrupted(MigrationStage::ProvisionDisks, result, e)),
        };
        result.absorb_disks(&records);
        result.complete(MigrationStage::ProvisionDisks);

        let nic_id = match reentry.existing_nic {
            Some(id) => {
                info!(nic = %id, "Replica NIC already exists, reusing");
                result.nic_reused = true;
                id
            }
            None => self
                .provision_network(&plan, result)
                .await
                .map_err(|e| interrupted(MigrationStage::ProvisionNetwork, result, e))?,
        };
        result.nic_id = Some(nic_id.clone());
        result.complete(MigrationStage::ProvisionNetwork);

        self.assemble(&plan, &records, &nic_id, placement_group, result)
            .await
            .map_err(|e| interrupted(MigrationStage::AssembleInstance, result, e))?;
        result.complete(MigrationStage::AssembleInstance);

        match &copy {
            Some(copy) if !self.config.keep_copies => {
                let warnings = copy.cleanup(self.provider.as_ref()).await;
                result.copies_removed = warnings.is_empty();
                result.warnings.extend(warnings);
            }
            Some(_) => {
                result.warnings.push(
                    "Copy artifacts kept; delete them once the replica is verified".to_string(),
                );
            }
            None => {}
        }
        result.complete(MigrationStage::Cleanup);
        result.complete(MigrationStage::Done);

        info!(
            vm = %plan.target_vm_name,
            zone = %plan.target_zone,
            created = result.created_resources().len(),
            warnings = result.warnings.len(),
            "Zone migration completed"
        );
        Ok(())
    }

    /// Turn the placement decision into the group the replica joins
    fn apply_placement_policy(
        &self,
        plan: &MigrationPlan,
        result: &mut MigrationResult,
    ) -> Result<Option<ResourceId>> {
        match &plan.placement {
            PlacementDecision::NotApplicable => Ok(None),
            PlacementDecision::Compatible { group, reason } => {
                info!(group = %group, reason = %reason, "Replica joins placement group");
                Ok(Some(group.clone()))
            }
            PlacementDecision::Incompatible { group, reason } => {
                match self.config.placement_policy {
                    PlacementPolicy::Strict => Err(OrchestratorError::Incompatibility {
                        group: group.clone(),
                        zone: plan.target_zone.clone(),
                        reason: reason.to_string(),
                    }),
                    PlacementPolicy::SkipWithWarning => {
                        warn!(
                            group = %group,
                            reason = %reason,
                            "Replica will not join placement group"
                        );
                        result.warnings.push(format!(
                            "Replica created outside placement group {} ({})",
                            group.name(),
                            reason
                        ));
                        Ok(None)
                    }
                }
            }
        }
    }

    /// Detect what an earlier run already created
    async fn inspect_target(&self, plan: &MigrationPlan) -> Result<ReentryState> {
        let rg = plan.target_resource_group.as_str();

        if let Some(existing) = self.provider.get_vm(rg, &plan.target_vm_name).await? {
            return Err(OrchestratorError::conflict(existing.id.to_string()));
        }

        let mut to_copy = Vec::new();
        for disk in &plan.disks {
            if self.provider.get_disk(rg, &disk.target_name).await?.is_some() {
                info!(disk = %disk.target_name, "Replica disk exists from an earlier run");
            } else {
                to_copy.push(disk.source.clone());
            }
        }

        let existing_nic = self
            .provider
            .get_nic_by_name(rg, &plan.nic_name)
            .await?
            .map(|nic| nic.id);

        Ok(ReentryState {
            to_copy,
            existing_nic,
        })
    }

    fn record_what_if(
        &self,
        plan: &MigrationPlan,
        reentry: &ReentryState,
        placement_group: Option<&ResourceId>,
        result: &mut MigrationResult,
    ) {
        let vm = &plan.source.vm;
        let rg = &plan.target_resource_group;

        if !vm.power_state.is_stopped() {
            result.record_action(format!("Deallocate source instance {}", vm.name));
        }

        if !reentry.to_copy.is_empty() {
            let names: Vec<&str> = reentry.to_copy.iter().map(|d| d.name.as_str()).collect();
            result.record_action(format!(
                "Capture {} copy of {} in {}",
                snapshot::capture_for(self.provider.clone(), &self.config).name(),
                names.join(", "),
                rg
            ));
        }

        for disk in &plan.disks {
            if reentry.to_copy.iter().any(|d| d.name == disk.source.name) {
                result.record_action(format!(
                    "Create disk {} ({}, {} GiB) in zone {}",
                    disk.target_name, disk.target_sku, disk.source.size_gb, plan.target_zone
                ));
            } else {
                result.record_action(format!("Reuse existing disk {}", disk.target_name));
            }
        }

        match &reentry.existing_nic {
            Some(id) => result.record_action(format!("Reuse existing NIC {}", id.name())),
            None => result.record_action(format!("Create NIC {}", plan.nic_name)),
        }

        result.record_action(format!(
            "Create instance {} ({}) in zone {}{}",
            plan.target_vm_name,
            plan.vm_size,
            plan.target_zone,
            placement_group
                .map(|g| format!(" in placement group {}", g.name()))
                .unwrap_or_default()
        ));

        if !reentry.to_copy.is_empty() && !self.config.keep_copies {
            result.record_action("Delete copy artifacts".to_string());
        }
    }

    async fn quiesce(&self, plan: &MigrationPlan) -> Result<()> {
        let vm = &plan.source.vm;
        if vm.power_state.is_stopped() {
            info!(vm = %vm.name, power_state = %vm.power_state, "Source already stopped");
            return Ok(());
        }

        info!(vm = %vm.name, power_state = %vm.power_state, "Deallocating source instance");
        self.provider.deallocate_vm(&vm.id).await?;

        let stopped =
            Readiness::with_states([PowerState::Deallocated.code(), PowerState::Stopped.code()]);
        self.poller()
            .wait_for(self.provider.as_ref(), &vm.id, &stopped, self.config.operation_timeout)
            .await?;
        Ok(())
    }

    async fn copy(
        &self,
        plan: &MigrationPlan,
        reentry: &ReentryState,
    ) -> Result<Option<PointInTimeCopy>> {
        if reentry.to_copy.is_empty() {
            info!("Every replica disk exists, skipping copy");
            return Ok(None);
        }

        let capture = snapshot::capture_for(self.provider.clone(), &self.config);
        info!(
            strategy = capture.name(),
            disks = reentry.to_copy.len(),
            "Capturing point-in-time copy"
        );

        let request = CaptureRequest {
            vm: &plan.source.vm,
            disks: &reentry.to_copy,
            all_disks: &plan.source.disks,
            resource_group: &plan.target_resource_group,
            at: Utc::now(),
        };
        capture.capture(&request).await.map(Some)
    }

    async fn provision_disks(
        &self,
        plan: &MigrationPlan,
        handles: &dyn CopyHandleSource,
    ) -> Result<Vec<DiskProvisionRecord>> {
        ZonalDiskProvisioner::new(
            self.provider.clone(),
            self.poller(),
            self.config.operation_timeout,
        )
            .with_retries(self.config.create_attempts, self.config.create_retry_delay)
            .with_parallelism(self.config.disk_parallelism)
            .provision_all(&plan.target_resource_group, &plan.target_zone, &plan.disks, handles)
            .await
    }

    async fn provision_network(
        &self,
        plan: &MigrationPlan,
        result: &mut MigrationResult,
    ) -> Result<ResourceId> {
        let source = plan.source.network.as_ref().ok_or_else(|| {
            OrchestratorError::source_not_found(format!(
                "network interface of {}",
                plan.source.vm.name
            ))
        })?;

        let (definition, warnings) =
            build_replica_nic(source, &plan.nic_name, &plan.source.vm.location);
        for warning in &warnings {
            warn!(nic = %definition.name, "{}", warning);
        }
        result.warnings.extend(warnings);

        info!(nic = %definition.name, "Creating replica NIC");
        let id = self
            .provider
            .create_nic(&plan.target_resource_group, &definition)
            .await?;
        result.nic_id = Some(id.clone());

        self.poller()
            .wait_for(
                self.provider.as_ref(),
                &id,
                &Readiness::Provisioned,
                self.config.operation_timeout,
            )
            .await?;
        Ok(id)
    }

    async fn assemble(
        &self,
        plan: &MigrationPlan,
        records: &[DiskProvisionRecord],
        nic_id: &ResourceId,
        placement_group: Option<ResourceId>,
        result: &mut MigrationResult,
    ) -> Result<()> {
        let rg = plan.target_resource_group.as_str();

        // An earlier run may have raced us since inspection
        if let Some(existing) = self.provider.get_vm(rg, &plan.target_vm_name).await? {
            return Err(OrchestratorError::conflict(existing.id.to_string()));
        }

        let (definition, warnings) = build_instance(plan, records, nic_id, placement_group)?;
        result.warnings.extend(warnings);

        info!(
            vm = %definition.name,
            size = %definition.size,
            zone = %definition.zone,
            data_disks = definition.data_disks.len(),
            placement_group = definition
                .placement_group
                .as_ref()
                .map(|g| g.name())
                .unwrap_or("none"),
            "Creating replica instance"
        );
        let id = self.provider.create_vm(rg, &definition).await?;
        result.vm_id = Some(id.clone());

        self.poller()
            .wait_for(
                self.provider.as_ref(),
                &id,
                &Readiness::Provisioned,
                self.config.operation_timeout,
            )
            .await?;
        Ok(())
    }
}

fn interrupted(
    stage: MigrationStage,
    result: &MigrationResult,
    source: OrchestratorError,
) -> OrchestratorError {
    warn!(stage = %stage, error = %source, "Migration interrupted");
    OrchestratorError::Interrupted {
        stage,
        created: result.created_resources(),
        source: Box::new(source),
    }
}

fn attachment(
    plan: &DiskPlan,
    record: &DiskProvisionRecord,
    warnings: &mut Vec<String>,
) -> Result<DiskAttachmentDefinition> {
    let disk_id = record.outcome.disk_id().cloned().ok_or_else(|| {
        OrchestratorError::source_not_found(format!("replica disk {}", record.target_name))
    })?;
    let sku = record.outcome.sku().unwrap_or(&plan.target_sku);

    let caching = if sku.requires_no_caching() {
        if plan.source.caching != CachingMode::None {
            warnings.push(format!(
                "{} attached with caching None ({} requires it; source used {})",
                record.target_name, sku, plan.source.caching
            ));
        }
        CachingMode::None
    } else {
        plan.source.caching
    };

    Ok(DiskAttachmentDefinition {
        name: record.target_name.clone(),
        disk_id,
        role: plan.source.role,
        caching,
        write_accelerator: plan.source.write_accelerator,
    })
}

/// Compose the replica instance definition from provisioned resources
pub fn build_instance(
    plan: &MigrationPlan,
    records: &[DiskProvisionRecord],
    nic_id: &ResourceId,
    placement_group: Option<ResourceId>,
) -> Result<(InstanceDefinition, Vec<String>)> {
    let vm = &plan.source.vm;
    let mut warnings = Vec::new();
    let mut os_disk = None;
    let mut data_disks = Vec::new();

    for disk in &plan.disks {
        let record = records
            .iter()
            .find(|r| r.target_name == disk.target_name)
            .ok_or_else(|| {
                OrchestratorError::source_not_found(format!("replica disk {}", disk.target_name))
            })?;
        let attached = attachment(disk, record, &mut warnings)?;
        if disk.source.is_os() {
            os_disk = Some(attached);
        } else {
            data_disks.push(attached);
        }
    }

    let os_disk = os_disk.ok_or_else(|| {
        OrchestratorError::source_not_found(format!("OS disk replica for {}", vm.name))
    })?;

    let definition = InstanceDefinition {
        name: plan.target_vm_name.clone(),
        location: vm.location.clone(),
        zone: plan.target_zone.clone(),
        size: plan.vm_size.clone(),
        os_disk,
        data_disks,
        nic_id: nic_id.clone(),
        boot_diagnostics: vm.boot_diagnostics.clone(),
        identity: vm.identity.clone(),
        priority: vm.priority.clone(),
        eviction_policy: vm.eviction_policy.clone(),
        max_price: vm.max_price,
        placement_group,
        encryption_at_host: vm.encryption_at_host,
        license_type: vm.license_type.clone(),
        tags: vm.tags.clone(),
    };

    Ok((definition, warnings))
}
