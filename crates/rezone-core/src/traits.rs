//! Core traits for Rezone
//!
//! The `ComputeProvider` trait is the whole surface the orchestrator needs from
//! a cloud. The orchestrator works through this interface ONLY - never concrete
//! clients - so every engine can be exercised against an in-memory provider.

use async_trait::async_trait;

use crate::definitions::*;
use crate::error::Result;
use crate::types::*;

/// Cloud resource-provider contract
///
/// Every `create_*` call returns the id of the new resource. Creation is
/// asynchronous on the provider side; the id doubles as the operation handle
/// and is polled through [`ComputeProvider::get_operation_status`].
#[async_trait]
pub trait ComputeProvider: Send + Sync {
    /// Provider identity (e.g. "azure-arm", "in-memory")
    fn name(&self) -> &str;

    // Reads. Lookups by name return `None` when the resource does not exist.

    async fn get_vm(&self, resource_group: &str, name: &str) -> Result<Option<VirtualMachine>>;
    async fn get_vm_by_id(&self, id: &ResourceId) -> Result<Option<VirtualMachine>>;
    async fn get_disk(&self, resource_group: &str, name: &str) -> Result<Option<ManagedDisk>>;
    async fn get_nic(&self, id: &ResourceId) -> Result<Option<NetworkDescriptor>>;
    async fn get_nic_by_name(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<Option<NetworkDescriptor>>;

    /// SKU catalog for a location (instance sizes and disk SKUs)
    async fn list_skus(&self, location: &str) -> Result<Vec<SkuEntry>>;

    async fn get_placement_group(&self, id: &ResourceId) -> Result<Option<PlacementGroup>>;

    /// Restore point including the per-disk copy handles it captured
    async fn get_restore_point(&self, id: &ResourceId) -> Result<RestorePoint>;

    /// Current status of any resource created through this provider
    ///
    /// For snapshots the secondary state is the access state; for instances
    /// it is the power-state code.
    async fn get_operation_status(&self, id: &ResourceId) -> Result<OperationStatus>;

    // Writes

    /// Stop the instance and release its hardware
    async fn deallocate_vm(&self, id: &ResourceId) -> Result<()>;

    async fn create_snapshot(
        &self,
        resource_group: &str,
        definition: &SnapshotDefinition,
    ) -> Result<ResourceId>;

    async fn create_restore_point_collection(
        &self,
        resource_group: &str,
        definition: &RestorePointCollectionDefinition,
    ) -> Result<ResourceId>;

    async fn create_restore_point(
        &self,
        collection_id: &ResourceId,
        definition: &RestorePointDefinition,
    ) -> Result<ResourceId>;

    async fn create_disk(&self, resource_group: &str, definition: &DiskDefinition)
    -> Result<ResourceId>;

    async fn create_nic(&self, resource_group: &str, definition: &NicDefinition)
    -> Result<ResourceId>;

    async fn create_vm(
        &self,
        resource_group: &str,
        definition: &InstanceDefinition,
    ) -> Result<ResourceId>;

    async fn delete_snapshot(&self, id: &ResourceId) -> Result<()>;

    /// Delete a restore point collection and every restore point inside it
    async fn delete_restore_point_collection(&self, id: &ResourceId) -> Result<()>;
}
