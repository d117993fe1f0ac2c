//! Resource descriptors shared across rezone components
//!
//! Everything in this module is a read-only capture of provider state. The
//! orchestrator builds these once while gathering facts and never mutates them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Availability zones accepted as migration targets
pub const VALID_ZONES: [&str; 3] = ["1", "2", "3"];

/// Resource tags
pub type Tags = BTreeMap<String, String>;

/// Fully qualified provider resource identifier
///
/// Identifiers are compared case-insensitively by the provider, so use
/// [`ResourceId::matches`] rather than `==` when comparing ids that came from
/// different API responses.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(pub String);

impl ResourceId {
    /// Wrap a raw identifier string
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Raw identifier string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last path segment (the resource name)
    pub fn name(&self) -> &str {
        let trimmed = self.0.trim_end_matches('/');
        trimmed.rsplit('/').next().unwrap_or(trimmed)
    }

    /// Resource group segment, if the id carries one
    pub fn resource_group(&self) -> Option<&str> {
        let mut segments = self.0.split('/');
        while let Some(segment) = segments.next() {
            if segment.eq_ignore_ascii_case("resourceGroups") {
                return segments.next().filter(|s| !s.is_empty());
            }
        }
        None
    }

    /// Case-insensitive identity comparison
    pub fn matches(&self, other: &ResourceId) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Provisioning state reported for any provider resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProvisioningState {
    /// Creation accepted and in progress
    Creating,
    /// Update in progress
    Updating,
    /// Operation completed
    Succeeded,
    /// Operation failed
    Failed,
    /// Operation canceled
    Canceled,
    /// Resource is being deleted
    Deleting,
    /// Unrecognised state string
    Unknown,
}

impl ProvisioningState {
    /// Parse a provider state string (case-insensitive)
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "creating" | "accepted" | "inprogress" => Self::Creating,
            "updating" => Self::Updating,
            "succeeded" => Self::Succeeded,
            "failed" => Self::Failed,
            "canceled" | "cancelled" => Self::Canceled,
            "deleting" => Self::Deleting,
            _ => Self::Unknown,
        }
    }

    /// Operation completed successfully
    pub fn is_succeeded(&self) -> bool {
        matches!(self, Self::Succeeded)
    }

    /// Terminal failure: the operation will not make further progress
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed | Self::Canceled)
    }
}

impl fmt::Display for ProvisioningState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Creating => "Creating",
            Self::Updating => "Updating",
            Self::Succeeded => "Succeeded",
            Self::Failed => "Failed",
            Self::Canceled => "Canceled",
            Self::Deleting => "Deleting",
            Self::Unknown => "Unknown",
        };
        write!(f, "{}", s)
    }
}

/// Observed status of a long-running operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationStatus {
    /// Top-level provisioning state
    pub provisioning_state: ProvisioningState,

    /// Resource-specific readiness sub-state (snapshot access state, power state)
    pub secondary_state: Option<String>,
}

impl OperationStatus {
    /// Status with no secondary state
    pub fn new(provisioning_state: ProvisioningState) -> Self {
        Self {
            provisioning_state,
            secondary_state: None,
        }
    }

    /// Attach a secondary readiness state
    pub fn with_secondary(mut self, state: impl Into<String>) -> Self {
        self.secondary_state = Some(state.into());
        self
    }

    /// Plain `Succeeded` status
    pub fn succeeded() -> Self {
        Self::new(ProvisioningState::Succeeded)
    }
}

impl fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.secondary_state {
            Some(secondary) => write!(f, "{}/{}", self.provisioning_state, secondary),
            None => write!(f, "{}", self.provisioning_state),
        }
    }
}

/// Instance power state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PowerState {
    /// Booting
    Starting,
    /// Running
    Running,
    /// Shutting down, hardware still allocated
    Stopping,
    /// Stopped, hardware still allocated
    Stopped,
    /// Releasing hardware
    Deallocating,
    /// Stopped with hardware released
    Deallocated,
    /// Unrecognised power code
    Unknown,
}

impl PowerState {
    /// Parse a power-state code, with or without the `PowerState/` prefix
    pub fn parse(code: &str) -> Self {
        let code = code.rsplit('/').next().unwrap_or(code);
        match code.to_ascii_lowercase().as_str() {
            "starting" => Self::Starting,
            "running" => Self::Running,
            "stopping" => Self::Stopping,
            "stopped" => Self::Stopped,
            "deallocating" => Self::Deallocating,
            "deallocated" => Self::Deallocated,
            _ => Self::Unknown,
        }
    }

    /// Provider status code (`PowerState/<state>`)
    pub fn code(&self) -> &'static str {
        match self {
            Self::Starting => "PowerState/starting",
            Self::Running => "PowerState/running",
            Self::Stopping => "PowerState/stopping",
            Self::Stopped => "PowerState/stopped",
            Self::Deallocating => "PowerState/deallocating",
            Self::Deallocated => "PowerState/deallocated",
            Self::Unknown => "PowerState/unknown",
        }
    }

    /// Instance is not running and will not write to its disks
    pub fn is_stopped(&self) -> bool {
        matches!(self, Self::Stopped | Self::Deallocated)
    }

    /// Instance currently occupies physical hardware
    ///
    /// An unknown state is counted as occupying hardware.
    pub fn holds_hardware(&self) -> bool {
        !self.is_stopped()
    }
}

impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code().trim_start_matches("PowerState/"))
    }
}

/// Host caching mode of an attached disk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CachingMode {
    /// No host caching
    #[default]
    None,
    /// Read caching
    ReadOnly,
    /// Read and write caching
    ReadWrite,
}

impl CachingMode {
    /// Parse a provider caching string, defaulting to `None`
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "readonly" => Self::ReadOnly,
            "readwrite" => Self::ReadWrite,
            _ => Self::None,
        }
    }

    /// Provider caching string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "None",
            Self::ReadOnly => "ReadOnly",
            Self::ReadWrite => "ReadWrite",
        }
    }
}

impl fmt::Display for CachingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Performance class of a disk SKU
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkuClass {
    /// Standard HDD and standard SSD
    Standard,
    /// Premium SSD
    Premium,
    /// Ultra disk and premium SSD v2
    Advanced,
}

/// Storage SKU name of a managed disk (e.g. `Premium_LRS`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DiskSku(pub String);

impl DiskSku {
    /// Standard HDD, locally redundant
    pub const STANDARD_HDD: &'static str = "Standard_LRS";
    /// Standard SSD, locally redundant
    pub const STANDARD_SSD: &'static str = "StandardSSD_LRS";
    /// Standard SSD, zone redundant
    pub const STANDARD_SSD_ZRS: &'static str = "StandardSSD_ZRS";
    /// Premium SSD, locally redundant
    pub const PREMIUM: &'static str = "Premium_LRS";
    /// Premium SSD, zone redundant
    pub const PREMIUM_ZRS: &'static str = "Premium_ZRS";
    /// Premium SSD v2
    pub const PREMIUM_V2: &'static str = "PremiumV2_LRS";
    /// Ultra disk
    pub const ULTRA: &'static str = "UltraSSD_LRS";

    /// Wrap a SKU name
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// SKU name
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Performance class of the SKU
    pub fn class(&self) -> SkuClass {
        let name = self.0.to_ascii_lowercase();
        if name == Self::ULTRA.to_ascii_lowercase() || name == Self::PREMIUM_V2.to_ascii_lowercase()
        {
            SkuClass::Advanced
        } else if name.starts_with("premium") {
            SkuClass::Premium
        } else {
            SkuClass::Standard
        }
    }

    /// Disks of this SKU must be attached with caching `None`
    pub fn requires_no_caching(&self) -> bool {
        self.class() == SkuClass::Advanced
    }

    /// Snapshots of this SKU can become readable before full durability
    pub fn supports_instant_access(&self) -> bool {
        self.class() == SkuClass::Advanced
    }

    /// Case-insensitive comparison
    pub fn same_as(&self, other: &DiskSku) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl fmt::Display for DiskSku {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Role of a disk on its instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiskRole {
    /// Operating system disk
    Os,
    /// Data disk at a logical unit number
    Data { lun: i32 },
}

impl DiskRole {
    /// Logical unit number of a data disk
    pub fn lun(&self) -> Option<i32> {
        match self {
            Self::Os => None,
            Self::Data { lun } => Some(*lun),
        }
    }
}

impl fmt::Display for DiskRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Os => write!(f, "OS"),
            Self::Data { lun } => write!(f, "data (LUN {})", lun),
        }
    }
}

/// Disk reference as it appears on the instance's storage profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttachedDisk {
    /// Disk name
    pub name: String,

    /// Managed disk id (absent for ephemeral OS disks)
    pub managed_disk_id: Option<ResourceId>,

    /// OS or data disk
    pub role: DiskRole,
    /// Host caching mode
    pub caching: CachingMode,
    /// Write acceleration is enabled
    pub write_accelerator: bool,

    /// Ephemeral OS disk placed on host-local storage
    pub ephemeral: bool,

    /// Storage SKU declared on the attachment, if any
    pub sku: Option<DiskSku>,
}

/// Managed disk resource as returned by the provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManagedDisk {
    /// Disk resource id
    pub id: ResourceId,
    /// Disk name
    pub name: String,
    /// Region
    pub location: String,
    /// Storage SKU
    pub sku: DiskSku,
    /// Provisioned size
    pub size_gb: u32,
    /// Provisioned IOPS (advanced tiers)
    pub iops_read_write: Option<u64>,
    /// Provisioned throughput in MB/s (advanced tiers)
    pub mbps_read_write: Option<u64>,
    /// Performance tier
    pub tier: Option<String>,
    /// Sector size in bytes (advanced tiers)
    pub logical_sector_size: Option<u32>,
    /// Server-side encryption set
    pub disk_encryption_set: Option<ResourceId>,

    /// Volume-level (guest agent) encryption settings are enabled
    pub encryption_settings_enabled: bool,

    /// Share count for multi-attach disks
    pub max_shares: Option<u32>,
    /// Operating system type of an OS disk
    pub os_type: Option<String>,
    /// Hypervisor generation of an OS disk
    pub hyper_v_generation: Option<String>,
    /// Zones the disk is pinned to
    pub zones: Vec<String>,
    /// Provisioning state
    pub provisioning_state: ProvisioningState,
    /// Resource tags
    pub tags: Tags,
}

/// Immutable capture of one source disk, combining attachment and resource facts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiskDescriptor {
    /// Disk name
    pub name: String,
    /// Disk resource id (absent for ephemeral OS disks)
    pub id: Option<ResourceId>,
    /// Region
    pub location: String,
    /// OS or data disk
    pub role: DiskRole,
    /// Storage SKU
    pub sku: DiskSku,
    /// Provisioned size
    pub size_gb: u32,
    /// Provisioned IOPS
    pub iops_read_write: Option<u64>,
    /// Provisioned throughput in MB/s
    pub mbps_read_write: Option<u64>,
    /// Performance tier
    pub tier: Option<String>,
    /// Sector size in bytes
    pub logical_sector_size: Option<u32>,
    /// Host caching mode on the source attachment
    pub caching: CachingMode,
    /// Write acceleration on the source attachment
    pub write_accelerator: bool,
    /// Ephemeral OS disk on host-local storage
    pub ephemeral: bool,
    /// Server-side encryption set
    pub disk_encryption_set: Option<ResourceId>,
    /// Volume-level encryption settings are enabled
    pub encryption_settings_enabled: bool,
    /// Share count for multi-attach disks
    pub max_shares: Option<u32>,
    /// Operating system type
    pub os_type: Option<String>,
    /// Hypervisor generation
    pub hyper_v_generation: Option<String>,
    /// Zones the disk is pinned to
    pub zones: Vec<String>,
    /// Resource tags
    pub tags: Tags,
}

impl DiskDescriptor {
    /// Merge an attachment with its managed disk resource
    pub fn capture(attachment: &AttachedDisk, disk: &ManagedDisk) -> Self {
        Self {
            name: disk.name.clone(),
            id: Some(disk.id.clone()),
            location: disk.location.clone(),
            role: attachment.role,
            sku: disk.sku.clone(),
            size_gb: disk.size_gb,
            iops_read_write: disk.iops_read_write,
            mbps_read_write: disk.mbps_read_write,
            tier: disk.tier.clone(),
            logical_sector_size: disk.logical_sector_size,
            caching: attachment.caching,
            write_accelerator: attachment.write_accelerator,
            ephemeral: attachment.ephemeral,
            disk_encryption_set: disk.disk_encryption_set.clone(),
            encryption_settings_enabled: disk.encryption_settings_enabled,
            max_shares: disk.max_shares,
            os_type: disk.os_type.clone(),
            hyper_v_generation: disk.hyper_v_generation.clone(),
            zones: disk.zones.clone(),
            tags: disk.tags.clone(),
        }
    }

    /// Describe an ephemeral OS disk, which has no managed disk resource
    pub fn ephemeral_os(attachment: &AttachedDisk, location: &str) -> Self {
        Self {
            name: attachment.name.clone(),
            id: None,
            location: location.to_string(),
            role: DiskRole::Os,
            sku: attachment
                .sku
                .clone()
                .unwrap_or_else(|| DiskSku::new(DiskSku::STANDARD_HDD)),
            size_gb: 0,
            iops_read_write: None,
            mbps_read_write: None,
            tier: None,
            logical_sector_size: None,
            caching: attachment.caching,
            write_accelerator: attachment.write_accelerator,
            ephemeral: true,
            disk_encryption_set: None,
            encryption_settings_enabled: false,
            max_shares: None,
            os_type: None,
            hyper_v_generation: None,
            zones: Vec::new(),
            tags: Tags::new(),
        }
    }

    /// Disk is the OS disk
    pub fn is_os(&self) -> bool {
        self.role == DiskRole::Os
    }

    /// Disk can be attached to several instances at once
    pub fn is_multi_attach(&self) -> bool {
        self.max_shares.is_some_and(|shares| shares > 1)
    }
}

/// IP address allocation mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum IpAllocation {
    /// Address assigned by the provider
    #[default]
    Dynamic,
    /// Address fixed by the owner
    Static,
}

/// One IP configuration of a network interface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IpConfiguration {
    /// Configuration name
    pub name: String,
    /// Primary configuration of the interface
    pub primary: bool,
    /// Address allocation mode
    pub allocation: IpAllocation,
    /// Private address currently assigned
    pub private_address: Option<String>,
    /// `IPv4` or `IPv6`
    pub address_version: Option<String>,
    /// Subnet the address lives in
    pub subnet_id: Option<ResourceId>,
    /// Associated public address
    pub public_ip_id: Option<ResourceId>,
    /// Load balancer backend pools
    pub load_balancer_backend_pool_ids: Vec<ResourceId>,
    /// Load balancer inbound NAT rules
    pub load_balancer_inbound_nat_rule_ids: Vec<ResourceId>,
    /// Application security groups
    pub application_security_group_ids: Vec<ResourceId>,
}

/// Immutable capture of the source network interface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkDescriptor {
    /// Interface resource id
    pub id: ResourceId,
    /// Interface name
    pub name: String,
    /// Region
    pub location: String,
    /// IP configurations
    pub ip_configurations: Vec<IpConfiguration>,
    /// Custom DNS servers
    pub dns_servers: Vec<String>,
    /// Accelerated networking is enabled
    pub accelerated_networking: bool,
    /// IP forwarding is enabled
    pub ip_forwarding: bool,
    /// Network security group
    pub nsg_id: Option<ResourceId>,
    /// Provisioning state
    pub provisioning_state: ProvisioningState,
    /// Resource tags
    pub tags: Tags,
}

impl NetworkDescriptor {
    /// Primary IP configuration (first one when none is flagged)
    pub fn primary_configuration(&self) -> Option<&IpConfiguration> {
        self.ip_configurations
            .iter()
            .find(|c| c.primary)
            .or_else(|| self.ip_configurations.first())
    }
}

/// Boot diagnostics settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootDiagnostics {
    /// Boot diagnostics are enabled
    pub enabled: bool,
    /// Storage account URI, `None` for managed storage
    pub storage_uri: Option<String>,
}

/// Managed identity attached to an instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmIdentity {
    /// System-assigned identity is enabled
    pub system_assigned: bool,
    /// User-assigned identity ids
    pub user_assigned: Vec<ResourceId>,
}

impl VmIdentity {
    /// Provider identity type string (`SystemAssigned, UserAssigned`)
    pub fn kind(&self) -> &'static str {
        match (self.system_assigned, !self.user_assigned.is_empty()) {
            (true, true) => "SystemAssigned, UserAssigned",
            (true, false) => "SystemAssigned",
            (false, true) => "UserAssigned",
            (false, false) => "None",
        }
    }
}

/// Extension installed on an instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionRef {
    /// Extension name
    pub name: String,
    /// Publisher namespace
    pub publisher: String,
    /// Extension type
    pub kind: String,
}

impl ExtensionRef {
    /// Guest-agent volume encryption extension
    pub fn is_disk_encryption(&self) -> bool {
        self.publisher.eq_ignore_ascii_case("Microsoft.Azure.Security")
            && self.kind.to_ascii_lowercase().starts_with("azurediskencryption")
    }
}

/// Compute instance as returned by the provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VirtualMachine {
    /// Instance resource id
    pub id: ResourceId,
    /// Instance name
    pub name: String,
    /// Resource group name
    pub resource_group: String,
    /// Region
    pub location: String,
    /// Zone, `None` for a regional instance
    pub zone: Option<String>,
    /// Instance size
    pub size: String,
    /// Power state
    pub power_state: PowerState,
    /// Provisioning state
    pub provisioning_state: ProvisioningState,
    /// OS disk attachment
    pub os_disk: AttachedDisk,
    /// Data disk attachments
    pub data_disks: Vec<AttachedDisk>,
    /// Attached network interfaces
    pub nic_ids: Vec<ResourceId>,
    /// Proximity placement group
    pub placement_group: Option<ResourceId>,
    /// Scale set membership
    pub scale_set: Option<ResourceId>,
    /// Boot diagnostics settings
    pub boot_diagnostics: Option<BootDiagnostics>,
    /// Managed identity
    pub identity: Option<VmIdentity>,
    /// `Regular` or `Spot`
    pub priority: Option<String>,
    /// Spot eviction policy
    pub eviction_policy: Option<String>,
    /// Spot price ceiling
    pub max_price: Option<f64>,
    /// Host-level encryption is enabled
    pub encryption_at_host: bool,
    /// License type
    pub license_type: Option<String>,
    /// Installed extensions
    pub extensions: Vec<ExtensionRef>,
    /// Resource tags
    pub tags: Tags,
}

impl VirtualMachine {
    /// Guest-agent volume encryption extension is installed
    pub fn has_disk_encryption_extension(&self) -> bool {
        self.extensions.iter().any(ExtensionRef::is_disk_encryption)
    }

    /// All attached disks, OS disk first
    pub fn attached_disks(&self) -> impl Iterator<Item = &AttachedDisk> {
        std::iter::once(&self.os_disk).chain(self.data_disks.iter())
    }
}

/// Kind of SKU restriction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RestrictionKind {
    /// SKU is unavailable in the listed locations
    Location,
    /// SKU is unavailable in the listed zones
    Zone,
}

/// Restriction entry on a SKU catalog record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkuRestriction {
    /// Restriction scope
    pub kind: RestrictionKind,
    /// Locations the restriction applies to
    pub locations: Vec<String>,
    /// Zones the restriction applies to
    pub zones: Vec<String>,
    /// Provider reason code
    pub reason_code: Option<String>,
}

/// One SKU catalog record for a location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkuEntry {
    /// Resource type (`virtualMachines`, `disks`)
    pub resource_type: String,
    /// SKU name
    pub name: String,
    /// Locations the SKU is offered in
    pub locations: Vec<String>,

    /// Zones the SKU is offered in
    pub zones: Vec<String>,
    /// Restrictions on this SKU
    pub restrictions: Vec<SkuRestriction>,
}

/// Placement group definition with its member references
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementGroup {
    /// Group resource id
    pub id: ResourceId,
    /// Group name
    pub name: String,
    /// Region
    pub location: String,
    /// Member instance ids
    pub member_ids: Vec<ResourceId>,
}

/// Member instance of a placement group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementMember {
    /// Instance resource id
    pub id: ResourceId,
    /// Instance name
    pub name: String,
    /// Zone, `None` for a regional instance
    pub zone: Option<String>,
    /// Power state
    pub power_state: PowerState,
}

/// Facts about a placement group gathered at validation time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementGroupFacts {
    /// Group resource id
    pub group_id: ResourceId,
    /// Every member of the group
    pub members: Vec<PlacementMember>,
}

/// Per-disk copy handle captured by a restore point
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiskRestorePointRef {
    /// Name of the captured disk
    pub disk_name: String,
    /// Id of the captured disk
    pub disk_id: Option<ResourceId>,
    /// Disk restore point id
    pub restore_point_id: ResourceId,
}

/// Restore point with its captured disk metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestorePoint {
    /// Restore point id
    pub id: ResourceId,
    /// Creation status
    pub status: OperationStatus,
    /// Per-disk copy handles
    pub disk_restore_points: Vec<DiskRestorePointRef>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_id_segments() {
        let id = ResourceId::new(
            "/subscriptions/sub/resourceGroups/rg-app/providers/Microsoft.Compute/disks/os-disk",
        );
        assert_eq!(id.name(), "os-disk");
        assert_eq!(id.resource_group(), Some("rg-app"));
        assert!(id.matches(&ResourceId::new(id.as_str().to_uppercase())));
    }

    #[test]
    fn test_sku_classes() {
        assert!(DiskSku::new("UltraSSD_LRS").requires_no_caching());
        assert!(DiskSku::new("premiumv2_lrs").requires_no_caching());
        assert!(!DiskSku::new("Premium_LRS").requires_no_caching());
        assert_eq!(DiskSku::new("Premium_ZRS").class(), SkuClass::Premium);
        assert_eq!(DiskSku::new("StandardSSD_LRS").class(), SkuClass::Standard);
        assert!(DiskSku::new("Premium_LRS").same_as(&DiskSku::new("premium_lrs")));
    }

    #[test]
    fn test_power_state_parse() {
        assert_eq!(PowerState::parse("PowerState/deallocated"), PowerState::Deallocated);
        assert_eq!(PowerState::parse("running"), PowerState::Running);
        assert!(PowerState::Stopped.is_stopped());
        assert!(PowerState::Unknown.holds_hardware());
        assert!(!PowerState::Deallocated.holds_hardware());
    }

    #[test]
    fn test_provisioning_state_terminal() {
        assert!(ProvisioningState::parse("Failed").is_failed());
        assert!(ProvisioningState::parse("Canceled").is_failed());
        assert!(ProvisioningState::parse("succeeded").is_succeeded());
        assert_eq!(ProvisioningState::parse("weird"), ProvisioningState::Unknown);
    }

    #[test]
    fn test_identity_kind() {
        let identity = VmIdentity {
            system_assigned: true,
            user_assigned: vec![ResourceId::new("/x/identities/app")],
        };
        assert_eq!(identity.kind(), "SystemAssigned, UserAssigned");
    }

    #[test]
    fn test_operation_status_serialization() {
        let status = OperationStatus::succeeded().with_secondary("InstantAccess");
        let json = serde_json::to_string(&status).unwrap();
        let parsed: OperationStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, status);
        assert_eq!(status.to_string(), "Succeeded/InstantAccess");
    }
}
