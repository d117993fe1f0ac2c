//! Pre-flight compatibility gate
//!
//! The validator reads every source-side fact once ([`CompatibilityValidator::gather`]),
//! then runs each rule independently over those facts
//! ([`CompatibilityValidator::evaluate`]). Every violation is collected, so a
//! caller sees the complete list in one pass. Nothing here mutates provider
//! state.

use crate::config::{CopyStrategy, MigrationConfig, ScopePolicy};
use crate::error::{OrchestratorError, Result};
use crate::naming;
use crate::placement::{self, PlacementDecision};
use crate::provisioner::DiskPlan;
use crate::snapshot::restore_point_blockers;
use chrono::Utc;
use rezone_core::{
    CachingMode, ComputeProvider, DiskDescriptor, DiskSku, NetworkDescriptor, PlacementGroupFacts,
    RestrictionKind, SkuEntry, VirtualMachine, VALID_ZONES,
};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// SKU catalog resource type for instance sizes
pub const VM_RESOURCE_TYPE: &str = "virtualMachines";

/// SKU catalog resource type for managed disks
pub const DISK_RESOURCE_TYPE: &str = "disks";

/// What the caller asked for
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationRequest {
    /// Source resource group
    pub resource_group: String,
    /// Source instance name
    pub vm_name: String,
    /// Availability zone to move into (`1`, `2` or `3`)
    pub target_zone: String,

    /// Defaults to the source resource group
    pub target_resource_group: Option<String>,

    /// Defaults to the source instance name
    pub target_vm_name: Option<String>,

    /// Defaults to the source size
    pub vm_size: Option<String>,

    /// Convert the OS disk to this SKU
    pub os_disk_sku: Option<DiskSku>,

    /// Convert every data disk to this SKU
    pub data_disk_sku: Option<DiskSku>,
}

impl MigrationRequest {
    /// Move `vm_name` in `resource_group` into `target_zone`
    pub fn new(
        resource_group: impl Into<String>,
        vm_name: impl Into<String>,
        target_zone: impl Into<String>,
    ) -> Self {
        Self {
            resource_group: resource_group.into(),
            vm_name: vm_name.into(),
            target_zone: target_zone.into(),
            target_resource_group: None,
            target_vm_name: None,
            vm_size: None,
            os_disk_sku: None,
            data_disk_sku: None,
        }
    }

    /// Place the replica in another resource group
    pub fn with_target_resource_group(mut self, rg: impl Into<String>) -> Self {
        self.target_resource_group = Some(rg.into());
        self
    }

    /// Give the replica instance a different name
    pub fn with_target_vm_name(mut self, name: impl Into<String>) -> Self {
        self.target_vm_name = Some(name.into());
        self
    }

    /// Resize the replica
    pub fn with_vm_size(mut self, size: impl Into<String>) -> Self {
        self.vm_size = Some(size.into());
        self
    }

    /// Convert the OS disk to `sku`
    pub fn with_os_disk_sku(mut self, sku: impl Into<String>) -> Self {
        self.os_disk_sku = Some(DiskSku::new(sku));
        self
    }

    /// Convert every data disk to `sku`
    pub fn with_data_disk_sku(mut self, sku: impl Into<String>) -> Self {
        self.data_disk_sku = Some(DiskSku::new(sku));
        self
    }

    /// Resource group that receives the replica
    pub fn effective_resource_group(&self) -> &str {
        self.target_resource_group
            .as_deref()
            .unwrap_or(&self.resource_group)
    }

    /// Replica instance name
    pub fn effective_vm_name(&self) -> &str {
        self.target_vm_name.as_deref().unwrap_or(&self.vm_name)
    }
}

/// Availability of one SKU in one zone
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkuAvailability {
    /// Deployable in the zone
    Available,
    /// The catalog has no entry for the SKU in this location
    NotOffered,
    /// The SKU is offered in the location but not in the zone
    NotInZone,
    /// A location or zone restriction applies
    Restricted {
        /// Provider reason code
        reason: Option<String>,
    },
}

/// SKU catalog for the source location
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkuCatalog {
    entries: Vec<SkuEntry>,
}

impl SkuCatalog {
    /// Catalog over the given entries
    pub fn new(entries: Vec<SkuEntry>) -> Self {
        Self { entries }
    }

    fn find(&self, resource_type: &str, name: &str) -> Option<&SkuEntry> {
        self.entries.iter().find(|e| {
            e.resource_type.eq_ignore_ascii_case(resource_type) && e.name.eq_ignore_ascii_case(name)
        })
    }

    /// Whether `name` can be deployed in `zone`
    pub fn availability(&self, resource_type: &str, name: &str, zone: &str) -> SkuAvailability {
        let Some(entry) = self.find(resource_type, name) else {
            return SkuAvailability::NotOffered;
        };

        for restriction in &entry.restrictions {
            let applies = match restriction.kind {
                RestrictionKind::Location => true,
                RestrictionKind::Zone => restriction.zones.iter().any(|z| z == zone),
            };
            if applies {
                return SkuAvailability::Restricted {
                    reason: restriction.reason_code.clone(),
                };
            }
        }

        if entry.zones.iter().any(|z| z == zone) {
            SkuAvailability::Available
        } else {
            SkuAvailability::NotInZone
        }
    }
}

/// Everything known about the source, read once before any rule runs
#[derive(Debug, Clone, Serialize)]
pub struct SourceFacts {
    /// Source instance
    pub vm: VirtualMachine,

    /// Attached disks, OS disk first
    pub disks: Vec<DiskDescriptor>,

    /// First network interface (the only one in supported topologies)
    pub network: Option<NetworkDescriptor>,

    /// Placement group and member zones, when the source belongs to one
    pub placement: Option<PlacementGroupFacts>,

    /// SKU catalog for the source location
    #[serde(skip)]
    pub skus: SkuCatalog,
}

/// Category of a pre-flight violation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ViolationKind {
    /// Target zone is not 1, 2 or 3
    InvalidZone,
    /// Replica would collide with the source in the same resource group
    ScopeCollision,
    /// Several NICs, no NIC, scale set membership or an ephemeral OS disk
    UnsupportedTopology,
    /// Advanced-tier target disk with host caching other than None
    CachingNotNone,
    /// Instance size not deployable in the target zone
    VmSizeUnavailable,
    /// Advanced-tier disk SKU not deployable in the target zone
    DiskSkuUnavailable,
    /// Volume encryption that cannot follow the disks
    DiskEncryptionBlocked,
    /// Disk the restore point strategy cannot capture
    RestorePointIncompatible,
    /// Placement group members disagree about their zone
    PlacementGroupInconsistent,
    /// Two disks map to the same replica or snapshot name
    NameCollision,
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// One rule violation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    /// Rule that failed
    pub kind: ViolationKind,

    /// Resource the violation is about
    pub subject: String,

    /// What is wrong and how to fix it
    pub message: String,
}

impl Violation {
    /// Violation of `kind` about `subject`
    pub fn new(
        kind: ViolationKind,
        subject: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            subject: subject.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.kind, self.subject, self.message)
    }
}

/// Every violation found in one validation pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    /// Violations in rule order
    pub violations: Vec<Violation>,
}

impl ValidationReport {
    /// No rule was violated
    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    /// Number of violations
    pub fn len(&self) -> usize {
        self.violations.len()
    }

    /// At least one violation of `kind`
    pub fn has(&self, kind: ViolationKind) -> bool {
        self.violations.iter().any(|v| v.kind == kind)
    }

    /// Violations of `kind`
    pub fn of_kind(&self, kind: ViolationKind) -> impl Iterator<Item = &Violation> {
        self.violations.iter().filter(move |v| v.kind == kind)
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Validation failed with {} violation(s):", self.violations.len())?;
        for violation in &self.violations {
            write!(f, "\n  - {}", violation)?;
        }
        Ok(())
    }
}

/// Validated, read-only migration plan
#[derive(Debug, Clone, Serialize)]
pub struct MigrationPlan {
    /// Facts gathered from the source
    pub source: SourceFacts,
    /// Availability zone of the replica
    pub target_zone: String,
    /// Resource group receiving the replica
    pub target_resource_group: String,
    /// Replica instance name
    pub target_vm_name: String,
    /// Replica size (the source size unless overridden)
    pub vm_size: String,

    /// Requested OS disk SKU; `None` keeps the source SKU
    pub os_disk_sku: Option<DiskSku>,

    /// Requested data disk SKU; `None` keeps the source SKU
    pub data_disk_sku: Option<DiskSku>,

    /// Per-disk replica names and effective SKUs, OS disk first
    pub disks: Vec<DiskPlan>,

    /// Replica NIC name
    pub nic_name: String,

    /// Whether the replica joins the source placement group
    pub placement: PlacementDecision,

    /// Non-blocking observations
    pub warnings: Vec<String>,
}

/// Rule-level policy knobs
#[derive(Debug, Clone, PartialEq, Eq)]
struct Policies {
    copy_strategy: CopyStrategy,
    scope_policy: ScopePolicy,
    name_suffix: Option<String>,
}

/// Pre-flight gate combining every compatibility rule
pub struct CompatibilityValidator {
    provider: Arc<dyn ComputeProvider>,
    policies: Policies,
}

impl CompatibilityValidator {
    /// Validator reading from `provider` under the policies in `config`
    pub fn new(provider: Arc<dyn ComputeProvider>, config: &MigrationConfig) -> Self {
        Self {
            provider,
            policies: Policies {
                copy_strategy: config.copy_strategy,
                scope_policy: config.scope_policy,
                name_suffix: config.name_suffix.clone(),
            },
        }
    }

    /// Read every source-side fact the rules need
    pub async fn gather(&self, request: &MigrationRequest) -> Result<SourceFacts> {
        let provider = self.provider.as_ref();

        let vm = provider
            .get_vm(&request.resource_group, &request.vm_name)
            .await?
            .ok_or_else(|| {
                OrchestratorError::source_not_found(format!(
                    "instance {}/{}",
                    request.resource_group, request.vm_name
                ))
            })?;

        info!(
            vm = %vm.name,
            location = %vm.location,
            zone = vm.zone.as_deref().unwrap_or("regional"),
            size = %vm.size,
            power_state = %vm.power_state,
            "Gathering source facts"
        );

        let mut disks = Vec::with_capacity(1 + vm.data_disks.len());
        for attachment in vm.attached_disks() {
            if attachment.ephemeral {
                disks.push(DiskDescriptor::ephemeral_os(attachment, &vm.location));
                continue;
            }

            let id = attachment.managed_disk_id.as_ref().ok_or_else(|| {
                OrchestratorError::source_not_found(format!("managed disk for {}", attachment.name))
            })?;
            let rg = id.resource_group().unwrap_or(&request.resource_group);
            let disk = provider
                .get_disk(rg, id.name())
                .await?
                .ok_or_else(|| OrchestratorError::source_not_found(id.to_string()))?;

            debug!(disk = %disk.name, sku = %disk.sku, role = %attachment.role, "Captured disk");
            disks.push(DiskDescriptor::capture(attachment, &disk));
        }

        let network = match vm.nic_ids.first() {
            Some(nic_id) => Some(
                provider
                    .get_nic(nic_id)
                    .await?
                    .ok_or_else(|| OrchestratorError::source_not_found(nic_id.to_string()))?,
            ),
            None => None,
        };

        let placement = match &vm.placement_group {
            Some(group_id) => Some(placement::gather_placement_facts(provider, group_id).await?),
            None => None,
        };

        let skus = SkuCatalog::new(provider.list_skus(&vm.location).await?);

        Ok(SourceFacts {
            vm,
            disks,
            network,
            placement,
            skus,
        })
    }

    /// Run every rule over gathered facts
    pub fn evaluate(
        &self,
        request: &MigrationRequest,
        facts: SourceFacts,
    ) -> std::result::Result<MigrationPlan, ValidationReport> {
        let zone = request.target_zone.as_str();
        let suffix = self
            .policies
            .name_suffix
            .clone()
            .unwrap_or_else(|| naming::zone_suffix(zone));
        let vm_size = request.vm_size.clone().unwrap_or_else(|| facts.vm.size.clone());
        let disks = plan_disks(&facts.disks, request, &suffix);

        let mut violations = Vec::new();
        violations.extend(check_zone(zone));
        violations.extend(check_scope(request, &facts.vm, &disks, self.policies.scope_policy));
        violations.extend(check_topology(&facts));
        violations.extend(check_caching(&disks));
        violations.extend(check_vm_size(&facts.skus, &vm_size, zone));
        violations.extend(check_disk_skus(&facts.skus, &disks, zone));
        violations.extend(check_encryption(&facts));
        violations.extend(check_copy_strategy(&facts.disks, self.policies.copy_strategy));
        violations.extend(check_name_collisions(&disks, self.policies.copy_strategy));

        let placement = match &facts.placement {
            Some(group) => match placement::resolve(group, &facts.vm.id, zone) {
                Ok(decision) => decision,
                Err(inconsistent) => {
                    violations.push(Violation::new(
                        ViolationKind::PlacementGroupInconsistent,
                        inconsistent.group.name(),
                        inconsistent.to_string(),
                    ));
                    PlacementDecision::NotApplicable
                }
            },
            None => PlacementDecision::NotApplicable,
        };

        if !violations.is_empty() {
            for violation in &violations {
                warn!(
                    kind = %violation.kind,
                    subject = %violation.subject,
                    "{}",
                    violation.message
                );
            }
            return Err(ValidationReport { violations });
        }

        let nic_name = facts
            .network
            .as_ref()
            .map(|nic| naming::replica_name(&nic.name, &suffix))
            .unwrap_or_else(|| naming::replica_name(&format!("{}-nic", facts.vm.name), &suffix));

        let warnings = collect_warnings(&facts, &disks, zone);

        Ok(MigrationPlan {
            target_zone: zone.to_string(),
            target_resource_group: request.effective_resource_group().to_string(),
            target_vm_name: request.effective_vm_name().to_string(),
            vm_size,
            os_disk_sku: request.os_disk_sku.clone(),
            data_disk_sku: request.data_disk_sku.clone(),
            disks,
            nic_name,
            placement,
            warnings,
            source: facts,
        })
    }

    /// Gather facts and evaluate every rule
    pub async fn validate(&self, request: &MigrationRequest) -> Result<MigrationPlan> {
        let facts = self.gather(request).await?;
        let plan = self
            .evaluate(request, facts)
            .map_err(OrchestratorError::Validation)?;

        info!(
            vm = %plan.source.vm.name,
            target_zone = %plan.target_zone,
            disks = plan.disks.len(),
            placement = %plan.placement,
            warnings = plan.warnings.len(),
            "Validation passed"
        );
        Ok(plan)
    }
}

/// Replica name and effective SKU for every source disk
fn plan_disks(disks: &[DiskDescriptor], request: &MigrationRequest, suffix: &str) -> Vec<DiskPlan> {
    disks
        .iter()
        .map(|disk| {
            let requested = if disk.is_os() {
                request.os_disk_sku.as_ref()
            } else {
                request.data_disk_sku.as_ref()
            };
            DiskPlan {
                source: disk.clone(),
                target_name: naming::replica_name(&disk.name, suffix),
                target_sku: requested.cloned().unwrap_or_else(|| disk.sku.clone()),
            }
        })
        .collect()
}

fn check_zone(zone: &str) -> Vec<Violation> {
    if VALID_ZONES.contains(&zone) {
        Vec::new()
    } else {
        vec![Violation::new(
            ViolationKind::InvalidZone,
            zone,
            format!("target zone must be one of {}", VALID_ZONES.join(", ")),
        )]
    }
}

fn check_scope(
    request: &MigrationRequest,
    vm: &VirtualMachine,
    disks: &[DiskPlan],
    policy: ScopePolicy,
) -> Vec<Violation> {
    let same_group = request
        .effective_resource_group()
        .eq_ignore_ascii_case(&vm.resource_group);
    if !same_group {
        return Vec::new();
    }

    let mut violations = Vec::new();
    match policy {
        ScopePolicy::RequireDifferentGroup => violations.push(Violation::new(
            ViolationKind::ScopeCollision,
            &vm.resource_group,
            "target resource group must differ from the source resource group",
        )),
        ScopePolicy::AllowSameGroupWithNewName => {
            if request.effective_vm_name().eq_ignore_ascii_case(&vm.name) {
                violations.push(Violation::new(
                    ViolationKind::ScopeCollision,
                    &vm.name,
                    "replica would reuse the source name in the same resource group; \
                     set a target name",
                ));
            }
            for disk in disks {
                if disk.target_name.eq_ignore_ascii_case(&disk.source.name) {
                    violations.push(Violation::new(
                        ViolationKind::ScopeCollision,
                        &disk.source.name,
                        "replica disk name equals the source disk name in the same resource group",
                    ));
                }
            }
        }
    }
    violations
}

fn check_topology(facts: &SourceFacts) -> Vec<Violation> {
    let vm = &facts.vm;
    let mut violations = Vec::new();

    if vm.nic_ids.len() > 1 {
        violations.push(Violation::new(
            ViolationKind::UnsupportedTopology,
            &vm.name,
            format!("instance has {} network interfaces; only one is supported", vm.nic_ids.len()),
        ));
    }
    if facts.network.is_none() {
        violations.push(Violation::new(
            ViolationKind::UnsupportedTopology,
            &vm.name,
            "instance has no network interface",
        ));
    }
    if let Some(scale_set) = &vm.scale_set {
        violations.push(Violation::new(
            ViolationKind::UnsupportedTopology,
            &vm.name,
            format!("instance is a member of scale set {}", scale_set.name()),
        ));
    }
    violations
}

fn check_caching(disks: &[DiskPlan]) -> Vec<Violation> {
    disks
        .iter()
        .filter(|d| d.target_sku.requires_no_caching() && d.source.caching != CachingMode::None)
        .map(|d| {
            Violation::new(
                ViolationKind::CachingNotNone,
                &d.source.name,
                format!(
                    "target SKU {} requires host caching None, but the disk uses {}",
                    d.target_sku, d.source.caching
                ),
            )
        })
        .collect()
}

fn describe(availability: &SkuAvailability, zone: &str) -> Option<String> {
    match availability {
        SkuAvailability::Available => None,
        SkuAvailability::NotOffered => Some("not offered in this location".to_string()),
        SkuAvailability::NotInZone => Some(format!("not offered in zone {}", zone)),
        SkuAvailability::Restricted { reason } => Some(format!(
            "restricted in zone {} ({})",
            zone,
            reason.as_deref().unwrap_or("no reason given")
        )),
    }
}

fn check_vm_size(catalog: &SkuCatalog, size: &str, zone: &str) -> Vec<Violation> {
    let availability = catalog.availability(VM_RESOURCE_TYPE, size, zone);
    describe(&availability, zone)
        .map(|why| vec![Violation::new(ViolationKind::VmSizeUnavailable, size, why)])
        .unwrap_or_default()
}

fn check_disk_skus(catalog: &SkuCatalog, disks: &[DiskPlan], zone: &str) -> Vec<Violation> {
    let advanced: BTreeSet<String> = disks
        .iter()
        .filter(|d| d.target_sku.requires_no_caching())
        .map(|d| d.target_sku.to_string())
        .collect();

    advanced
        .into_iter()
        .filter_map(|sku| {
            let availability = catalog.availability(DISK_RESOURCE_TYPE, &sku, zone);
            describe(&availability, zone)
                .map(|why| Violation::new(ViolationKind::DiskSkuUnavailable, sku, why))
        })
        .collect()
}

fn check_encryption(facts: &SourceFacts) -> Vec<Violation> {
    let mut violations = Vec::new();

    if facts.vm.has_disk_encryption_extension() {
        violations.push(Violation::new(
            ViolationKind::DiskEncryptionBlocked,
            &facts.vm.name,
            "volume encryption extension is installed; encrypted volumes cannot be transplanted",
        ));
    }
    for disk in facts.disks.iter().filter(|d| d.encryption_settings_enabled) {
        violations.push(Violation::new(
            ViolationKind::DiskEncryptionBlocked,
            &disk.name,
            "disk carries volume encryption settings with keys in an external vault",
        ));
    }
    violations
}

fn check_copy_strategy(disks: &[DiskDescriptor], strategy: CopyStrategy) -> Vec<Violation> {
    match strategy {
        CopyStrategy::RestorePoint => restore_point_blockers(disks)
            .into_iter()
            .map(|b| {
                Violation::new(ViolationKind::RestorePointIncompatible, b.disk(), b.to_string())
            })
            .collect(),
        CopyStrategy::Snapshot => disks
            .iter()
            .filter(|d| d.ephemeral)
            .map(|d| {
                Violation::new(
                    ViolationKind::UnsupportedTopology,
                    &d.name,
                    "ephemeral OS disk has no managed copy to snapshot",
                )
            })
            .collect(),
    }
}

/// Two disks must never map to the same replica or snapshot name
fn check_name_collisions(disks: &[DiskPlan], strategy: CopyStrategy) -> Vec<Violation> {
    let mut violations = Vec::new();
    let mut replicas: BTreeMap<String, &str> = BTreeMap::new();
    let mut snapshots: BTreeMap<String, &str> = BTreeMap::new();
    // Every snapshot in a run shares one timestamp
    let at = Utc::now();

    for disk in disks {
        let source = disk.source.name.as_str();

        if let Some(other) = replicas.insert(disk.target_name.to_ascii_lowercase(), source) {
            violations.push(Violation::new(
                ViolationKind::NameCollision,
                source,
                format!("replica name {} is also derived from disk {}", disk.target_name, other),
            ));
        }

        if strategy == CopyStrategy::Snapshot && !disk.source.ephemeral {
            let snapshot = naming::snapshot_name(source, at);
            if let Some(other) = snapshots.insert(snapshot.to_ascii_lowercase(), source) {
                violations.push(Violation::new(
                    ViolationKind::NameCollision,
                    source,
                    format!("snapshot name {} is also derived from disk {}", snapshot, other),
                ));
            }
        }
    }
    violations
}

fn collect_warnings(facts: &SourceFacts, disks: &[DiskPlan], zone: &str) -> Vec<String> {
    let mut warnings = Vec::new();

    if facts.vm.zone.as_deref() == Some(zone) {
        warnings.push(format!(
            "{} is already in zone {}; the replica will share its zone",
            facts.vm.name, zone
        ));
    }
    for disk in disks.iter().filter(|d| d.converts_sku()) {
        warnings.push(format!(
            "{} converts from {} to {}",
            disk.source.name, disk.source.sku, disk.target_sku
        ));
    }
    if facts.vm.encryption_at_host {
        warnings.push(
            "encryption at host is mirrored best-effort; confirm the target size supports it"
                .to_string(),
        );
    }
    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use rezone_core::{
        AttachedDisk, DiskRole, ExtensionRef, PowerState, ProvisioningState,
        ResourceId, SkuRestriction, Tags,
    };

    fn attached(name: &str, role: DiskRole, caching: CachingMode) -> AttachedDisk {
        AttachedDisk {
            name: name.to_string(),
            managed_disk_id: Some(ResourceId::new(format!(
                "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Compute/disks/{}",
                name
            ))),
            role,
            caching,
            write_accelerator: false,
            ephemeral: false,
            sku: None,
        }
    }

    fn descriptor(attachment: &AttachedDisk, sku: &str) -> DiskDescriptor {
        DiskDescriptor {
            name: attachment.name.clone(),
            id: attachment.managed_disk_id.clone(),
            location: "westeurope".to_string(),
            role: attachment.role,
            sku: DiskSku::new(sku),
            size_gb: 64,
            iops_read_write: None,
            mbps_read_write: None,
            tier: None,
            logical_sector_size: None,
            caching: attachment.caching,
            write_accelerator: false,
            ephemeral: false,
            disk_encryption_set: None,
            encryption_settings_enabled: false,
            max_shares: None,
            os_type: Some("Linux".to_string()),
            hyper_v_generation: None,
            zones: vec![],
            tags: Tags::new(),
        }
    }

    fn nic() -> NetworkDescriptor {
        NetworkDescriptor {
            id: ResourceId::new("/rg/networkInterfaces/app-nic"),
            name: "app-nic".to_string(),
            location: "westeurope".to_string(),
            ip_configurations: vec![],
            dns_servers: vec![],
            accelerated_networking: false,
            ip_forwarding: false,
            nsg_id: None,
            provisioning_state: ProvisioningState::Succeeded,
            tags: Tags::new(),
        }
    }

    fn sku(resource_type: &str, name: &str, zones: &[&str]) -> SkuEntry {
        SkuEntry {
            resource_type: resource_type.to_string(),
            name: name.to_string(),
            locations: vec!["westeurope".to_string()],
            zones: zones.iter().map(|z| z.to_string()).collect(),
            restrictions: vec![],
        }
    }

    fn facts(os_sku: &str, os_caching: CachingMode) -> SourceFacts {
        let os = attached("app-os", DiskRole::Os, os_caching);
        let vm = VirtualMachine {
            id: ResourceId::new("/rg/virtualMachines/app"),
            name: "app".to_string(),
            resource_group: "rg".to_string(),
            location: "westeurope".to_string(),
            zone: None,
            size: "Standard_D4s_v5".to_string(),
            power_state: PowerState::Running,
            provisioning_state: ProvisioningState::Succeeded,
            os_disk: os.clone(),
            data_disks: vec![],
            nic_ids: vec![ResourceId::new("/rg/networkInterfaces/app-nic")],
            placement_group: None,
            scale_set: None,
            boot_diagnostics: None,
            identity: None,
            priority: None,
            eviction_policy: None,
            max_price: None,
            encryption_at_host: false,
            license_type: None,
            extensions: vec![],
            tags: Tags::new(),
        };
        SourceFacts {
            disks: vec![descriptor(&os, os_sku)],
            vm,
            network: Some(nic()),
            placement: None,
            skus: SkuCatalog::new(vec![
                sku(VM_RESOURCE_TYPE, "Standard_D4s_v5", &["1", "2", "3"]),
                sku(VM_RESOURCE_TYPE, "Standard_M64", &["1"]),
                sku(DISK_RESOURCE_TYPE, DiskSku::ULTRA, &["1", "2"]),
                sku(DISK_RESOURCE_TYPE, DiskSku::PREMIUM_V2, &["3"]),
            ]),
        }
    }

    fn validator(config: &MigrationConfig) -> CompatibilityValidator {
        CompatibilityValidator::new(Arc::new(crate::mock::InMemoryProvider::new()), config)
    }

    fn request(zone: &str) -> MigrationRequest {
        MigrationRequest::new("rg", "app", zone).with_target_resource_group("rg-zonal")
    }

    #[test]
    fn test_clean_source_produces_plan() {
        let plan = validator(&MigrationConfig::default())
            .evaluate(&request("2"), facts(DiskSku::PREMIUM, CachingMode::ReadWrite))
            .unwrap();

        assert_eq!(plan.target_resource_group, "rg-zonal");
        assert_eq!(plan.target_vm_name, "app");
        assert_eq!(plan.vm_size, "Standard_D4s_v5");
        assert_eq!(plan.disks[0].target_name, "app-os-z2");
        assert_eq!(plan.nic_name, "app-nic-z2");
        assert_eq!(plan.placement, PlacementDecision::NotApplicable);
    }

    #[test]
    fn test_invalid_zone() {
        let report = validator(&MigrationConfig::default())
            .evaluate(&request("4"), facts(DiskSku::PREMIUM, CachingMode::None))
            .unwrap_err();
        assert!(report.has(ViolationKind::InvalidZone));
    }

    #[test]
    fn test_caching_checked_against_target_sku() {
        // Source is premium, conversion to premium v2 makes ReadOnly illegal
        let req = request("3").with_os_disk_sku(DiskSku::PREMIUM_V2);
        let report = validator(&MigrationConfig::default())
            .evaluate(&req, facts(DiskSku::PREMIUM, CachingMode::ReadOnly))
            .unwrap_err();
        assert_eq!(report.len(), 1);
        assert!(report.has(ViolationKind::CachingNotNone));

        // Converting away from ultra makes ReadWrite legal
        let req = request("2").with_os_disk_sku(DiskSku::PREMIUM);
        assert!(validator(&MigrationConfig::default())
            .evaluate(&req, facts(DiskSku::ULTRA, CachingMode::ReadWrite))
            .is_ok());
    }

    #[test]
    fn test_violations_are_aggregated() {
        let req = request("2").with_vm_size("Standard_M64");
        let report = validator(&MigrationConfig::default())
            .evaluate(&req, facts(DiskSku::ULTRA, CachingMode::ReadWrite))
            .unwrap_err();

        assert!(report.has(ViolationKind::VmSizeUnavailable));
        assert!(report.has(ViolationKind::CachingNotNone));
        assert_eq!(report.len(), 2);
        assert!(report.to_string().contains("2 violation(s)"));
    }

    #[test]
    fn test_zone_restriction_blocks_size() {
        let mut f = facts(DiskSku::PREMIUM, CachingMode::None);
        let mut entry = sku(VM_RESOURCE_TYPE, "Standard_D4s_v5", &["1", "2", "3"]);
        entry.restrictions.push(SkuRestriction {
            kind: RestrictionKind::Zone,
            locations: vec!["westeurope".to_string()],
            zones: vec!["2".to_string()],
            reason_code: Some("NotAvailableForSubscription".to_string()),
        });
        f.skus = SkuCatalog::new(vec![entry]);

        let report = validator(&MigrationConfig::default())
            .evaluate(&request("2"), f)
            .unwrap_err();
        let violation = report.of_kind(ViolationKind::VmSizeUnavailable).next().unwrap();
        assert!(violation.message.contains("NotAvailableForSubscription"));
    }

    #[test]
    fn test_advanced_disk_sku_must_exist_in_zone() {
        let report = validator(&MigrationConfig::default())
            .evaluate(&request("3"), facts(DiskSku::ULTRA, CachingMode::None))
            .unwrap_err();
        assert!(report.has(ViolationKind::DiskSkuUnavailable));
    }

    #[test]
    fn test_scope_policies() {
        let same_group = MigrationRequest::new("rg", "app", "2");

        let strict =
            MigrationConfig::default().with_scope_policy(ScopePolicy::RequireDifferentGroup);
        let report = validator(&strict)
            .evaluate(&same_group, facts(DiskSku::PREMIUM, CachingMode::None))
            .unwrap_err();
        assert!(report.has(ViolationKind::ScopeCollision));

        let renamed = same_group.clone().with_target_vm_name("app-z2");
        assert!(validator(&MigrationConfig::default())
            .evaluate(&renamed, facts(DiskSku::PREMIUM, CachingMode::None))
            .is_ok());

        let report = validator(&MigrationConfig::default())
            .evaluate(&same_group, facts(DiskSku::PREMIUM, CachingMode::None))
            .unwrap_err();
        assert!(report.has(ViolationKind::ScopeCollision));
    }

    #[test]
    fn test_volume_encryption_blocks() {
        let mut f = facts(DiskSku::PREMIUM, CachingMode::None);
        f.vm.extensions.push(ExtensionRef {
            name: "AzureDiskEncryptionForLinux".to_string(),
            publisher: "Microsoft.Azure.Security".to_string(),
            kind: "AzureDiskEncryptionForLinux".to_string(),
        });
        let report = validator(&MigrationConfig::default())
            .evaluate(&request("2"), f)
            .unwrap_err();
        assert!(report.has(ViolationKind::DiskEncryptionBlocked));
    }

    #[test]
    fn test_restore_point_blockers_become_violations() {
        let mut f = facts(DiskSku::PREMIUM, CachingMode::None);
        let mut data = descriptor(
            &attached("app-log", DiskRole::Data { lun: 0 }, CachingMode::None),
            DiskSku::PREMIUM,
        );
        data.write_accelerator = true;
        data.max_shares = Some(3);
        f.disks.push(data);

        let config = MigrationConfig::default().with_copy_strategy(CopyStrategy::RestorePoint);
        let report = validator(&config).evaluate(&request("2"), f).unwrap_err();
        assert_eq!(report.of_kind(ViolationKind::RestorePointIncompatible).count(), 2);
    }

    #[test]
    fn test_unsupported_topologies() {
        let mut f = facts(DiskSku::PREMIUM, CachingMode::None);
        f.vm.nic_ids.push(ResourceId::new("/rg/networkInterfaces/second"));
        f.vm.scale_set = Some(ResourceId::new("/rg/virtualMachineScaleSets/web"));

        let report = validator(&MigrationConfig::default())
            .evaluate(&request("2"), f)
            .unwrap_err();
        assert_eq!(report.of_kind(ViolationKind::UnsupportedTopology).count(), 2);
    }

    #[test]
    fn test_disks_sharing_a_name_collide() {
        // Same disk name in two resource groups maps to one replica name
        let mut f = facts(DiskSku::PREMIUM, CachingMode::None);
        let first = attached("shared-data", DiskRole::Data { lun: 0 }, CachingMode::None);
        let mut second = attached("shared-data", DiskRole::Data { lun: 1 }, CachingMode::None);
        second.managed_disk_id = Some(ResourceId::new(
            "/subscriptions/s/resourceGroups/rg-b/providers/Microsoft.Compute/disks/shared-data",
        ));
        f.disks.push(descriptor(&first, DiskSku::PREMIUM));
        f.disks.push(descriptor(&second, DiskSku::PREMIUM));

        let report = validator(&MigrationConfig::default())
            .evaluate(&request("2"), f.clone())
            .unwrap_err();
        let collisions: Vec<_> = report.of_kind(ViolationKind::NameCollision).collect();
        assert_eq!(collisions.len(), 2);
        assert!(collisions[0].message.contains("shared-data-z2"));
        assert!(collisions[1].message.contains("-snap-"));

        let config = MigrationConfig::default().with_copy_strategy(CopyStrategy::RestorePoint);
        let report = validator(&config).evaluate(&request("2"), f).unwrap_err();
        assert_eq!(report.of_kind(ViolationKind::NameCollision).count(), 1);
    }

    #[test]
    fn test_long_disk_names_sharing_a_prefix_do_not_collide() {
        let vm = "v".repeat(64);
        let mut f = facts(DiskSku::PREMIUM, CachingMode::None);
        for lun in 0..2 {
            let name = format!("{}_DataDisk_{}", vm, lun);
            let disk = attached(&name, DiskRole::Data { lun }, CachingMode::None);
            f.disks.push(descriptor(&disk, DiskSku::PREMIUM));
        }

        let config = MigrationConfig::default().with_name_suffix("-zone-two-replica-copy");
        let plan = validator(&config).evaluate(&request("2"), f).unwrap();

        assert_ne!(plan.disks[1].target_name, plan.disks[2].target_name);
        assert!(plan.disks.iter().all(|d| d.target_name.len() <= naming::MAX_NAME_LEN));
    }

    #[test]
    fn test_same_zone_is_a_warning() {
        let mut f = facts(DiskSku::PREMIUM, CachingMode::None);
        f.vm.zone = Some("2".to_string());
        let plan = validator(&MigrationConfig::default())
            .evaluate(&request("2"), f)
            .unwrap();
        assert!(plan.warnings.iter().any(|w| w.contains("already in zone 2")));
    }
}
