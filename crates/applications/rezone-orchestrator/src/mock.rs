//! Deterministic in-memory provider
//!
//! Holds instances, disks, NICs, placement groups and SKU catalogs in memory,
//! records every mutating call, and supports scripted status sequences and
//! injected create failures. Resources created through it become visible to
//! subsequent reads, so re-entry behaviour can be exercised across runs.

use async_trait::async_trait;
use rezone_core::{
    ComputeProvider, DiskAttachmentDefinition, DiskDefinition, DiskRestorePointRef,
    InstanceDefinition, IpConfiguration, ManagedDisk, NetworkDescriptor, NicDefinition,
    OperationStatus, PlacementGroup, PowerState, ProviderError, ProvisioningState, ResourceId,
    RestorePoint,
    RestorePointCollectionDefinition, RestorePointDefinition, SkuEntry, SnapshotDefinition,
    VirtualMachine,
};
use rezone_core::{AttachedDisk, Result};
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

/// Subscription id used in every generated resource id
pub const MOCK_SUBSCRIPTION: &str = "00000000-0000-0000-0000-000000000000";

/// Resource provider types used in generated ids
pub mod kinds {
    /// Instance resource type
    pub const VM: &str = "Microsoft.Compute/virtualMachines";
    /// Managed disk resource type
    pub const DISK: &str = "Microsoft.Compute/disks";
    /// Snapshot resource type
    pub const SNAPSHOT: &str = "Microsoft.Compute/snapshots";
    /// Restore point collection resource type
    pub const RESTORE_POINT_COLLECTION: &str = "Microsoft.Compute/restorePointCollections";
    /// Placement group resource type
    pub const PLACEMENT_GROUP: &str = "Microsoft.Compute/proximityPlacementGroups";
    /// Network interface resource type
    pub const NIC: &str = "Microsoft.Network/networkInterfaces";
}

/// Build a fully qualified id in the mock subscription
pub fn resource_id(resource_group: &str, kind: &str, name: &str) -> ResourceId {
    ResourceId::new(format!(
        "/subscriptions/{}/resourceGroups/{}/providers/{}/{}",
        MOCK_SUBSCRIPTION, resource_group, kind, name
    ))
}

/// Mutating call observed by the provider (resource name only)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderCall {
    /// `deallocate_vm`
    DeallocateVm(String),
    /// `create_snapshot`
    CreateSnapshot(String),
    /// `create_restore_point_collection`
    CreateRestorePointCollection(String),
    /// `create_restore_point`
    CreateRestorePoint(String),
    /// `create_disk`
    CreateDisk(String),
    /// `create_nic`
    CreateNic(String),
    /// `create_vm`
    CreateVm(String),
    /// `delete_snapshot`
    DeleteSnapshot(String),
    /// `delete_restore_point_collection`
    DeleteRestorePointCollection(String),
}

#[derive(Default)]
struct State {
    vms: BTreeMap<String, VirtualMachine>,
    disks: BTreeMap<String, ManagedDisk>,
    nics: BTreeMap<String, NetworkDescriptor>,
    snapshots: BTreeMap<String, SnapshotDefinition>,
    collections: BTreeMap<String, RestorePointCollectionDefinition>,
    restore_points: BTreeMap<String, RestorePoint>,
    placement_groups: BTreeMap<String, PlacementGroup>,
    skus: Vec<SkuEntry>,
    statuses: BTreeMap<String, VecDeque<OperationStatus>>,
    prefixed_statuses: Vec<(String, VecDeque<OperationStatus>)>,
    create_failures: BTreeMap<String, VecDeque<ProviderError>>,
    prefixed_create_failures: Vec<(String, VecDeque<ProviderError>)>,
    delete_failures: Vec<(String, ProviderError)>,
    vm_definitions: BTreeMap<String, InstanceDefinition>,
    nic_definitions: BTreeMap<String, NicDefinition>,
    disk_definitions: BTreeMap<String, DiskDefinition>,
    calls: Vec<ProviderCall>,
    next_address: u8,
}

fn key(id: &ResourceId) -> String {
    id.as_str().to_ascii_lowercase()
}

fn next_status(queue: &mut VecDeque<OperationStatus>) -> Option<OperationStatus> {
    if queue.len() > 1 {
        queue.pop_front()
    } else {
        queue.front().cloned()
    }
}

/// Value of the first entry whose prefix matches the start of `name`
fn by_prefix<'a, T>(entries: &'a mut [(String, T)], name: &str) -> Option<&'a mut T> {
    let name = name.to_ascii_lowercase();
    entries
        .iter_mut()
        .find(|(prefix, _)| name.starts_with(prefix.as_str()))
        .map(|(_, value)| value)
}

/// In-memory `ComputeProvider`
#[derive(Default)]
pub struct InMemoryProvider {
    state: Mutex<State>,
}

impl InMemoryProvider {
    /// Empty provider
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        // A panicking test thread must not hide the state from the others
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Seed an instance
    pub fn insert_vm(&self, vm: VirtualMachine) {
        self.state().vms.insert(key(&vm.id), vm);
    }

    /// Seed a managed disk
    pub fn insert_disk(&self, disk: ManagedDisk) {
        self.state().disks.insert(key(&disk.id), disk);
    }

    /// Seed a network interface
    pub fn insert_nic(&self, nic: NetworkDescriptor) {
        self.state().nics.insert(key(&nic.id), nic);
    }

    /// Seed a placement group
    pub fn insert_placement_group(&self, group: PlacementGroup) {
        self.state().placement_groups.insert(key(&group.id), group);
    }

    /// Replace the SKU catalog
    pub fn set_skus(&self, skus: Vec<SkuEntry>) {
        self.state().skus = skus;
    }

    /// Statuses returned for the named resource, one per poll; the last repeats
    pub fn script_status(&self, name: &str, statuses: Vec<OperationStatus>) {
        self.state()
            .statuses
            .insert(name.to_ascii_lowercase(), statuses.into());
    }

    /// Statuses returned for any resource whose name starts with `prefix`
    ///
    /// Useful for timestamped copy artifacts whose full name is not known up
    /// front. Exact-name scripts take precedence.
    pub fn script_status_prefix(&self, prefix: &str, statuses: Vec<OperationStatus>) {
        self.state()
            .prefixed_statuses
            .push((prefix.to_ascii_lowercase(), statuses.into()));
    }

    /// Errors returned by the next create calls for the named resource
    pub fn fail_create(&self, name: &str, errors: Vec<ProviderError>) {
        self.state()
            .create_failures
            .insert(name.to_ascii_lowercase(), errors.into());
    }

    /// Errors returned by the next create calls for names starting with `prefix`
    pub fn fail_create_prefix(&self, prefix: &str, errors: Vec<ProviderError>) {
        self.state()
            .prefixed_create_failures
            .push((prefix.to_ascii_lowercase(), errors.into()));
    }

    /// Every delete of a resource whose name starts with `prefix` fails
    pub fn fail_delete(&self, prefix: &str, error: ProviderError) {
        self.state()
            .delete_failures
            .push((prefix.to_ascii_lowercase(), error));
    }

    /// Every mutating call so far, in order
    pub fn calls(&self) -> Vec<ProviderCall> {
        self.state().calls.clone()
    }

    /// Number of recorded calls matching `predicate`
    pub fn count_calls(&self, predicate: impl Fn(&ProviderCall) -> bool) -> usize {
        self.state().calls.iter().filter(|c| predicate(c)).count()
    }

    /// Instance by resource group and name
    pub fn vm(&self, resource_group: &str, name: &str) -> Option<VirtualMachine> {
        self.state()
            .vms
            .get(&key(&resource_id(resource_group, kinds::VM, name)))
            .cloned()
    }

    /// Definition submitted for the named instance
    pub fn vm_definition(&self, name: &str) -> Option<InstanceDefinition> {
        self.state().vm_definitions.get(&name.to_ascii_lowercase()).cloned()
    }

    /// Definition submitted for the named NIC
    pub fn nic_definition(&self, name: &str) -> Option<NicDefinition> {
        self.state().nic_definitions.get(&name.to_ascii_lowercase()).cloned()
    }

    /// Definition submitted for the named disk
    pub fn disk_definition(&self, name: &str) -> Option<DiskDefinition> {
        self.state().disk_definitions.get(&name.to_ascii_lowercase()).cloned()
    }

    /// Snapshots currently held
    pub fn snapshot_count(&self) -> usize {
        self.state().snapshots.len()
    }

    /// Restore point collections currently held
    pub fn restore_point_collection_count(&self) -> usize {
        self.state().collections.len()
    }

    fn injected_failure(state: &mut State, name: &str) -> Option<ProviderError> {
        if let Some(err) = state
            .create_failures
            .get_mut(&name.to_ascii_lowercase())
            .and_then(VecDeque::pop_front)
        {
            return Some(err);
        }
        by_prefix(&mut state.prefixed_create_failures, name).and_then(VecDeque::pop_front)
    }

    fn injected_delete_failure(state: &mut State, name: &str) -> Option<ProviderError> {
        by_prefix(&mut state.delete_failures, name).cloned()
    }

    fn default_status(state: &State, id: &ResourceId) -> Option<OperationStatus> {
        let k = key(id);
        if let Some(vm) = state.vms.get(&k) {
            return Some(
                OperationStatus::new(vm.provisioning_state).with_secondary(vm.power_state.code()),
            );
        }
        if let Some(snapshot) = state.snapshots.get(&k) {
            let access = if snapshot.instant_access_minutes.is_some() {
                "InstantAccess"
            } else {
                "Available"
            };
            return Some(OperationStatus::succeeded().with_secondary(access));
        }
        if let Some(disk) = state.disks.get(&k) {
            return Some(OperationStatus::new(disk.provisioning_state));
        }
        if state.nics.contains_key(&k)
            || state.collections.contains_key(&k)
            || state.restore_points.contains_key(&k)
        {
            return Some(OperationStatus::succeeded());
        }
        None
    }
}

#[async_trait]
impl ComputeProvider for InMemoryProvider {
    fn name(&self) -> &str {
        "in-memory"
    }

    async fn get_vm(&self, resource_group: &str, name: &str) -> Result<Option<VirtualMachine>> {
        Ok(self.vm(resource_group, name))
    }

    async fn get_vm_by_id(&self, id: &ResourceId) -> Result<Option<VirtualMachine>> {
        Ok(self.state().vms.get(&key(id)).cloned())
    }

    async fn get_disk(&self, resource_group: &str, name: &str) -> Result<Option<ManagedDisk>> {
        let id = resource_id(resource_group, kinds::DISK, name);
        Ok(self.state().disks.get(&key(&id)).cloned())
    }

    async fn get_nic(&self, id: &ResourceId) -> Result<Option<NetworkDescriptor>> {
        Ok(self.state().nics.get(&key(id)).cloned())
    }

    async fn get_nic_by_name(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<Option<NetworkDescriptor>> {
        self.get_nic(&resource_id(resource_group, kinds::NIC, name)).await
    }

    async fn list_skus(&self, location: &str) -> Result<Vec<SkuEntry>> {
        Ok(self
            .state()
            .skus
            .iter()
            .filter(|s| s.locations.iter().any(|l| l.eq_ignore_ascii_case(location)))
            .cloned()
            .collect())
    }

    async fn get_placement_group(&self, id: &ResourceId) -> Result<Option<PlacementGroup>> {
        Ok(self.state().placement_groups.get(&key(id)).cloned())
    }

    async fn get_restore_point(&self, id: &ResourceId) -> Result<RestorePoint> {
        self.state()
            .restore_points
            .get(&key(id))
            .cloned()
            .ok_or_else(|| ProviderError::NotFound(id.to_string()))
    }

    async fn get_operation_status(&self, id: &ResourceId) -> Result<OperationStatus> {
        let mut state = self.state();

        let name = id.name().to_ascii_lowercase();
        if let Some(status) = state.statuses.get_mut(&name).and_then(next_status) {
            return Ok(status);
        }
        if let Some(status) = by_prefix(&mut state.prefixed_statuses, &name).and_then(next_status) {
            return Ok(status);
        }

        Self::default_status(&state, id).ok_or_else(|| ProviderError::NotFound(id.to_string()))
    }

    async fn deallocate_vm(&self, id: &ResourceId) -> Result<()> {
        let mut state = self.state();
        let vm = state
            .vms
            .get_mut(&key(id))
            .ok_or_else(|| ProviderError::NotFound(id.to_string()))?;
        vm.power_state = PowerState::Deallocated;
        let name = vm.name.clone();
        state.calls.push(ProviderCall::DeallocateVm(name));
        Ok(())
    }

    async fn create_snapshot(
        &self,
        resource_group: &str,
        definition: &SnapshotDefinition,
    ) -> Result<ResourceId> {
        let mut state = self.state();
        state.calls.push(ProviderCall::CreateSnapshot(definition.name.clone()));
        if let Some(err) = Self::injected_failure(&mut state, &definition.name) {
            return Err(err);
        }

        let id = resource_id(resource_group, kinds::SNAPSHOT, &definition.name);
        state.snapshots.insert(key(&id), definition.clone());
        debug!(snapshot = %id, "Mock snapshot created");
        Ok(id)
    }

    async fn create_restore_point_collection(
        &self,
        resource_group: &str,
        definition: &RestorePointCollectionDefinition,
    ) -> Result<ResourceId> {
        let mut state = self.state();
        state
            .calls
            .push(ProviderCall::CreateRestorePointCollection(definition.name.clone()));
        if let Some(err) = Self::injected_failure(&mut state, &definition.name) {
            return Err(err);
        }

        let id = resource_id(resource_group, kinds::RESTORE_POINT_COLLECTION, &definition.name);
        state.collections.insert(key(&id), definition.clone());
        Ok(id)
    }

    async fn create_restore_point(
        &self,
        collection_id: &ResourceId,
        definition: &RestorePointDefinition,
    ) -> Result<ResourceId> {
        let mut state = self.state();
        state
            .calls
            .push(ProviderCall::CreateRestorePoint(definition.name.clone()));
        if let Some(err) = Self::injected_failure(&mut state, &definition.name) {
            return Err(err);
        }

        let collection = state
            .collections
            .get(&key(collection_id))
            .cloned()
            .ok_or_else(|| ProviderError::NotFound(collection_id.to_string()))?;
        let vm = state
            .vms
            .get(&key(&collection.source_vm_id))
            .cloned()
            .ok_or_else(|| ProviderError::NotFound(collection.source_vm_id.to_string()))?;

        let id = ResourceId::new(format!("{}/restorePoints/{}", collection_id, definition.name));
        let disk_restore_points = vm
            .attached_disks()
            .filter_map(|disk: &AttachedDisk| {
                let disk_id = disk.managed_disk_id.clone()?;
                if definition.excluded_disks.iter().any(|x| x.matches(&disk_id)) {
                    return None;
                }
                Some(DiskRestorePointRef {
                    disk_name: disk.name.clone(),
                    restore_point_id: ResourceId::new(format!(
                        "{}/diskRestorePoints/{}",
                        id, disk.name
                    )),
                    disk_id: Some(disk_id),
                })
            })
            .collect();

        state.restore_points.insert(
            key(&id),
            RestorePoint {
                id: id.clone(),
                status: OperationStatus::succeeded(),
                disk_restore_points,
            },
        );
        Ok(id)
    }

    async fn create_disk(
        &self,
        resource_group: &str,
        definition: &DiskDefinition,
    ) -> Result<ResourceId> {
        let mut state = self.state();
        state.calls.push(ProviderCall::CreateDisk(definition.name.clone()));
        if let Some(err) = Self::injected_failure(&mut state, &definition.name) {
            return Err(err);
        }

        let id = resource_id(resource_group, kinds::DISK, &definition.name);
        if state.disks.contains_key(&key(&id)) {
            return Err(ProviderError::Conflict(id.to_string()));
        }
        state.disks.insert(
            key(&id),
            ManagedDisk {
                id: id.clone(),
                name: definition.name.clone(),
                location: definition.location.clone(),
                sku: definition.sku.clone(),
                size_gb: definition.size_gb,
                iops_read_write: definition.iops_read_write,
                mbps_read_write: definition.mbps_read_write,
                tier: definition.tier.clone(),
                logical_sector_size: definition.logical_sector_size,
                disk_encryption_set: definition.disk_encryption_set.clone(),
                encryption_settings_enabled: false,
                max_shares: None,
                os_type: definition.os_type.clone(),
                hyper_v_generation: definition.hyper_v_generation.clone(),
                zones: definition.zone.iter().cloned().collect(),
                provisioning_state: ProvisioningState::Succeeded,
                tags: definition.tags.clone(),
            },
        );
        state
            .disk_definitions
            .insert(definition.name.to_ascii_lowercase(), definition.clone());
        Ok(id)
    }

    async fn create_nic(
        &self,
        resource_group: &str,
        definition: &NicDefinition,
    ) -> Result<ResourceId> {
        let mut state = self.state();
        state.calls.push(ProviderCall::CreateNic(definition.name.clone()));
        if let Some(err) = Self::injected_failure(&mut state, &definition.name) {
            return Err(err);
        }

        let id = resource_id(resource_group, kinds::NIC, &definition.name);
        state.next_address = state.next_address.wrapping_add(1);
        let host = 100u16 + u16::from(state.next_address);

        let ip_configurations = definition
            .ip_configurations
            .iter()
            .map(|c| IpConfiguration {
                name: c.name.clone(),
                primary: c.primary,
                allocation: c.allocation,
                private_address: Some(format!("10.0.{}.{}", host / 256, host % 256)),
                address_version: c.address_version.clone(),
                subnet_id: c.subnet_id.clone(),
                public_ip_id: None,
                load_balancer_backend_pool_ids: c.load_balancer_backend_pool_ids.clone(),
                load_balancer_inbound_nat_rule_ids: vec![],
                application_security_group_ids: c.application_security_group_ids.clone(),
            })
            .collect();

        state.nics.insert(
            key(&id),
            NetworkDescriptor {
                id: id.clone(),
                name: definition.name.clone(),
                location: definition.location.clone(),
                ip_configurations,
                dns_servers: definition.dns_servers.clone(),
                accelerated_networking: definition.accelerated_networking,
                ip_forwarding: definition.ip_forwarding,
                nsg_id: definition.nsg_id.clone(),
                provisioning_state: ProvisioningState::Succeeded,
                tags: definition.tags.clone(),
            },
        );
        state
            .nic_definitions
            .insert(definition.name.to_ascii_lowercase(), definition.clone());
        Ok(id)
    }

    async fn create_vm(
        &self,
        resource_group: &str,
        definition: &InstanceDefinition,
    ) -> Result<ResourceId> {
        let mut state = self.state();
        state.calls.push(ProviderCall::CreateVm(definition.name.clone()));
        if let Some(err) = Self::injected_failure(&mut state, &definition.name) {
            return Err(err);
        }

        let id = resource_id(resource_group, kinds::VM, &definition.name);
        if state.vms.contains_key(&key(&id)) {
            return Err(ProviderError::Conflict(id.to_string()));
        }

        let attach = |d: &DiskAttachmentDefinition| AttachedDisk {
            name: d.name.clone(),
            managed_disk_id: Some(d.disk_id.clone()),
            role: d.role,
            caching: d.caching,
            write_accelerator: d.write_accelerator,
            ephemeral: false,
            sku: None,
        };

        let vm = VirtualMachine {
            id: id.clone(),
            name: definition.name.clone(),
            resource_group: resource_group.to_string(),
            location: definition.location.clone(),
            zone: Some(definition.zone.clone()),
            size: definition.size.clone(),
            power_state: PowerState::Running,
            provisioning_state: ProvisioningState::Succeeded,
            os_disk: attach(&definition.os_disk),
            data_disks: definition.data_disks.iter().map(attach).collect(),
            nic_ids: vec![definition.nic_id.clone()],
            placement_group: definition.placement_group.clone(),
            scale_set: None,
            boot_diagnostics: definition.boot_diagnostics.clone(),
            identity: definition.identity.clone(),
            priority: definition.priority.clone(),
            eviction_policy: definition.eviction_policy.clone(),
            max_price: definition.max_price,
            encryption_at_host: definition.encryption_at_host,
            license_type: definition.license_type.clone(),
            extensions: vec![],
            tags: definition.tags.clone(),
        };

        state.vms.insert(key(&id), vm);
        state
            .vm_definitions
            .insert(definition.name.to_ascii_lowercase(), definition.clone());
        Ok(id)
    }

    async fn delete_snapshot(&self, id: &ResourceId) -> Result<()> {
        let mut state = self.state();
        state.calls.push(ProviderCall::DeleteSnapshot(id.name().to_string()));
        if let Some(err) = Self::injected_delete_failure(&mut state, id.name()) {
            return Err(err);
        }
        state
            .snapshots
            .remove(&key(id))
            .map(|_| ())
            .ok_or_else(|| ProviderError::NotFound(id.to_string()))
    }

    async fn delete_restore_point_collection(&self, id: &ResourceId) -> Result<()> {
        let mut state = self.state();
        state
            .calls
            .push(ProviderCall::DeleteRestorePointCollection(id.name().to_string()));
        if let Some(err) = Self::injected_delete_failure(&mut state, id.name()) {
            return Err(err);
        }
        let prefix = format!("{}/", key(id));
        state.restore_points.retain(|k, _| !k.starts_with(&prefix));
        state
            .collections
            .remove(&key(id))
            .map(|_| ())
            .ok_or_else(|| ProviderError::NotFound(id.to_string()))
    }
}
