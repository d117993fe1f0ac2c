//! Definitions submitted to the provider when creating replica resources

use crate::types::{
    BootDiagnostics, CachingMode, DiskRole, DiskSku, IpAllocation, ResourceId, Tags, VmIdentity,
};
use serde::{Deserialize, Serialize};

/// Incremental snapshot of one disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotDefinition {
    /// Snapshot name
    pub name: String,
    /// Region
    pub location: String,
    /// Disk the snapshot is taken from
    pub source_disk_id: ResourceId,
    /// Store only changed blocks
    pub incremental: bool,

    /// Request an instant-access (fast-readable) snapshot for this many minutes
    pub instant_access_minutes: Option<u32>,
    /// Resource tags
    pub tags: Tags,
}

/// Restore point collection scoped to one instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestorePointCollectionDefinition {
    /// Collection name
    pub name: String,
    /// Region
    pub location: String,
    /// Instance the collection belongs to
    pub source_vm_id: ResourceId,
    /// Resource tags
    pub tags: Tags,
}

/// Consistency level requested for a restore point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConsistencyMode {
    /// Disks are captured as of the same instant
    CrashConsistent,
    /// Guest applications are quiesced first
    ApplicationConsistent,
}

impl ConsistencyMode {
    /// Provider consistency string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CrashConsistent => "CrashConsistent",
            Self::ApplicationConsistent => "ApplicationConsistent",
        }
    }
}

/// Restore point inside a collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestorePointDefinition {
    /// Restore point name
    pub name: String,
    /// Requested consistency
    pub consistency_mode: ConsistencyMode,
    /// Disks left out of the restore point
    pub excluded_disks: Vec<ResourceId>,
}

/// Point-in-time copy a new disk is created from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiskSource {
    /// Create from a snapshot
    Snapshot(ResourceId),
    /// Create from a disk restore point
    RestorePoint(ResourceId),
}

impl DiskSource {
    /// Id of the snapshot or disk restore point
    pub fn source_id(&self) -> &ResourceId {
        match self {
            Self::Snapshot(id) | Self::RestorePoint(id) => id,
        }
    }
}

/// Managed disk to create
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiskDefinition {
    /// Disk name
    pub name: String,
    /// Region
    pub location: String,
    /// Zone to pin the disk to
    pub zone: Option<String>,
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
    /// Server-side encryption set
    pub disk_encryption_set: Option<ResourceId>,
    /// Operating system type of an OS disk
    pub os_type: Option<String>,
    /// Hypervisor generation of an OS disk
    pub hyper_v_generation: Option<String>,
    /// Copy the disk is created from
    pub source: DiskSource,
    /// Resource tags
    pub tags: Tags,
}

/// IP configuration of a NIC to create
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NicIpConfigurationDefinition {
    /// Configuration name
    pub name: String,
    /// Primary configuration of the interface
    pub primary: bool,
    /// Address allocation mode
    pub allocation: IpAllocation,
    /// `IPv4` or `IPv6`
    pub address_version: Option<String>,
    /// Subnet to place the address in
    pub subnet_id: Option<ResourceId>,
    /// Load balancer backend pools
    pub load_balancer_backend_pool_ids: Vec<ResourceId>,
    /// Application security groups
    pub application_security_group_ids: Vec<ResourceId>,
}

/// Network interface to create
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NicDefinition {
    /// Interface name
    pub name: String,
    /// Region
    pub location: String,
    /// IP configurations
    pub ip_configurations: Vec<NicIpConfigurationDefinition>,
    /// Custom DNS servers
    pub dns_servers: Vec<String>,
    /// Accelerated networking is enabled
    pub accelerated_networking: bool,
    /// IP forwarding is enabled
    pub ip_forwarding: bool,
    /// Network security group
    pub nsg_id: Option<ResourceId>,
    /// Resource tags
    pub tags: Tags,
}

/// Disk attachment on an instance to create
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiskAttachmentDefinition {
    /// Attachment name
    pub name: String,
    /// Disk to attach
    pub disk_id: ResourceId,
    /// OS or data disk
    pub role: DiskRole,
    /// Host caching mode
    pub caching: CachingMode,
    /// Write acceleration is enabled
    pub write_accelerator: bool,
}

/// Compute instance to create
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceDefinition {
    /// Instance name
    pub name: String,
    /// Region
    pub location: String,
    /// Target zone
    pub zone: String,
    /// Instance size
    pub size: String,
    /// OS disk attachment
    pub os_disk: DiskAttachmentDefinition,
    /// Data disk attachments
    pub data_disks: Vec<DiskAttachmentDefinition>,
    /// Network interface to attach
    pub nic_id: ResourceId,
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
    /// Proximity placement group
    pub placement_group: Option<ResourceId>,
    /// Host-level encryption is enabled
    pub encryption_at_host: bool,
    /// License type
    pub license_type: Option<String>,
    /// Resource tags
    pub tags: Tags,
}
