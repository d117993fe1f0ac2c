//! Azure Resource Manager backed `ComputeProvider`
//!
//! Talks to the management REST API directly with a bearer token. The JSON
//! mapping lives in free functions (`parse_*` for responses, `*_body` for
//! requests) so it can be checked against recorded payloads without a network.
//!
//! ```text
//! ArmClient ──GET/PUT/POST/DELETE──▶ management.azure.com
//!     │                                   │
//!     │◀── 2xx JSON ── parse_vm / parse_disk / parse_nic / parse_skus ...
//!     │◀── 404 ─────── Ok(None) for lookups, NotFound otherwise
//!     │◀── 409/429/5xx Conflict / Throttled / Transient
//! ```

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, StatusCode};
use rezone_core::{
    AttachedDisk, BootDiagnostics, CachingMode, ComputeProvider, DiskDefinition,
    DiskRestorePointRef, DiskRole, DiskSku, DiskSource, ExtensionRef, InstanceDefinition,
    IpAllocation, IpConfiguration, ManagedDisk, NetworkDescriptor, NicDefinition,
    OperationStatus, PlacementGroup, PowerState, ProviderError, ProvisioningState, ResourceId,
    RestorePoint, RestorePointCollectionDefinition, RestorePointDefinition, RestrictionKind,
    Result, SkuClass, SkuEntry, SkuRestriction, SnapshotDefinition, Tags, VirtualMachine,
    VmIdentity,
};
use serde_json::{Map, Value, json};
use std::time::Duration;
use tracing::{debug, info};

/// Public cloud management endpoint
pub const DEFAULT_ENDPOINT: &str = "https://management.azure.com";

/// API versions per resource provider
pub const COMPUTE_API_VERSION: &str = "2024-03-01";
/// Management API version for disks, snapshots and restore points
pub const DISK_API_VERSION: &str = "2023-10-02";
/// Management API version for network interfaces
pub const NETWORK_API_VERSION: &str = "2023-09-01";
/// Management API version for the SKU catalog
pub const SKU_API_VERSION: &str = "2021-07-01";

/// Per-request timeout
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Resource manager client for one subscription
pub struct ArmClient {
    client: reqwest::Client,
    endpoint: String,
    subscription_id: String,
    token: String,
}

impl ArmClient {
    /// Create a client against the public cloud endpoint
    pub fn new(
        subscription_id: impl Into<String>,
        token: impl Into<String>,
    ) -> crate::error::Result<Self> {
        Ok(Self {
            client: reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            subscription_id: subscription_id.into(),
            token: token.into(),
        })
    }

    /// Use a different management endpoint (sovereign clouds, test servers)
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    fn resource_url(&self, resource_group: &str, resource_type: &str, name: &str) -> String {
        format!(
            "{}/subscriptions/{}/resourceGroups/{}/providers/{}/{}",
            self.endpoint, self.subscription_id, resource_group, resource_type, name
        )
    }

    fn id_url(&self, id: &ResourceId) -> String {
        format!("{}{}", self.endpoint, id.as_str())
    }

    fn request(&self, method: Method, url: &str, api_version: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .query(&[("api-version", api_version)])
    }

    /// Send a request; a 404 becomes `Ok(None)`
    async fn send(&self, request: RequestBuilder) -> Result<Option<Value>> {
        let response = request.bearer_auth(&self.token).send().await.map_err(transport)?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let body = response.text().await.map_err(transport)?;
        if !status.is_success() {
            return Err(classify(status.as_u16(), &body));
        }
        if body.trim().is_empty() {
            return Ok(Some(Value::Null));
        }

        serde_json::from_str(&body)
            .map(Some)
            .map_err(|e| ProviderError::malformed(format!("invalid JSON: {}", e)))
    }

    async fn get(&self, url: &str, api_version: &str) -> Result<Option<Value>> {
        debug!(url = %url, "GET");
        self.send(self.request(Method::GET, url, api_version)).await
    }

    async fn put(&self, url: &str, api_version: &str, body: &Value) -> Result<Value> {
        debug!(url = %url, "PUT");
        self.send(self.request(Method::PUT, url, api_version).json(body))
            .await?
            .ok_or_else(|| ProviderError::NotFound(url.to_string()))
    }

    async fn post(&self, url: &str, api_version: &str) -> Result<()> {
        debug!(url = %url, "POST");
        self.send(self.request(Method::POST, url, api_version))
            .await?
            .map(|_| ())
            .ok_or_else(|| ProviderError::NotFound(url.to_string()))
    }

    async fn delete(&self, id: &ResourceId) -> Result<()> {
        let url = self.id_url(id);
        debug!(url = %url, "DELETE");
        self.send(self.request(Method::DELETE, &url, api_version_for(id)))
            .await?
            .map(|_| ())
            .ok_or_else(|| ProviderError::NotFound(id.to_string()))
    }
}

/// Pick the API version from the resource provider segment of an id
pub fn api_version_for(id: &ResourceId) -> &'static str {
    let lower = id.as_str().to_ascii_lowercase();
    if lower.contains("/microsoft.network/") {
        NETWORK_API_VERSION
    } else if lower.contains("/microsoft.compute/disks/")
        || lower.contains("/microsoft.compute/snapshots/")
    {
        DISK_API_VERSION
    } else {
        COMPUTE_API_VERSION
    }
}

fn transport(e: reqwest::Error) -> ProviderError {
    if e.is_connect() || e.is_timeout() {
        ProviderError::Unavailable(e.to_string())
    } else {
        ProviderError::Transient(e.to_string())
    }
}

/// Map an error response to a provider error
pub fn classify(status: u16, body: &str) -> ProviderError {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let code = parsed
        .as_ref()
        .and_then(|v| str_at(v, "/error/code"))
        .unwrap_or_else(|| "Unknown".to_string());
    let message = parsed
        .as_ref()
        .and_then(|v| str_at(v, "/error/message"))
        .unwrap_or_else(|| body.trim().to_string());

    match status {
        404 => ProviderError::NotFound(message),
        409 => ProviderError::Conflict(format!("{}: {}", code, message)),
        429 => ProviderError::Throttled(message),
        500..=599 => ProviderError::Transient(format!("{} {}: {}", status, code, message)),
        _ => ProviderError::Api {
            status,
            code,
            message,
        },
    }
}

// JSON accessors

fn str_at(value: &Value, pointer: &str) -> Option<String> {
    value.pointer(pointer).and_then(Value::as_str).map(String::from)
}

fn required(value: &Value, pointer: &str) -> Result<String> {
    str_at(value, pointer).ok_or_else(|| ProviderError::malformed(format!("missing {}", pointer)))
}

fn bool_at(value: &Value, pointer: &str) -> bool {
    value.pointer(pointer).and_then(Value::as_bool).unwrap_or(false)
}

fn u64_at(value: &Value, pointer: &str) -> Option<u64> {
    value.pointer(pointer).and_then(Value::as_u64)
}

fn u32_at(value: &Value, pointer: &str) -> Option<u32> {
    u64_at(value, pointer).and_then(|n| u32::try_from(n).ok())
}

fn id_at(value: &Value, pointer: &str) -> Option<ResourceId> {
    str_at(value, pointer).map(ResourceId::new)
}

/// Ids of an array of `{ "id": ... }` references
fn ids_at(value: &Value, pointer: &str) -> Vec<ResourceId> {
    array_at(value, pointer)
        .iter()
        .filter_map(|item| id_at(item, "/id"))
        .collect()
}

fn array_at<'a>(value: &'a Value, pointer: &str) -> &'a [Value] {
    value
        .pointer(pointer)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn strings_at(value: &Value, pointer: &str) -> Vec<String> {
    array_at(value, pointer)
        .iter()
        .filter_map(|v| v.as_str().map(String::from))
        .collect()
}

fn tags_at(value: &Value) -> Tags {
    value
        .get("tags")
        .and_then(Value::as_object)
        .map(|tags| {
            tags.iter()
                .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
                .collect()
        })
        .unwrap_or_default()
}

fn provisioning_state(value: &Value) -> ProvisioningState {
    str_at(value, "/properties/provisioningState")
        .map(|s| ProvisioningState::parse(&s))
        .unwrap_or(ProvisioningState::Unknown)
}

/// Power state from the instance view statuses (`PowerState/<state>`)
fn power_state(value: &Value) -> PowerState {
    array_at(value, "/properties/instanceView/statuses")
        .iter()
        .filter_map(|s| str_at(s, "/code"))
        .find(|code| code.starts_with("PowerState/"))
        .map(|code| PowerState::parse(&code))
        .unwrap_or(PowerState::Unknown)
}

// Response parsing

fn parse_attached_disk(value: &Value, role: DiskRole) -> Result<AttachedDisk> {
    Ok(AttachedDisk {
        name: required(value, "/name")?,
        managed_disk_id: id_at(value, "/managedDisk/id"),
        role,
        caching: str_at(value, "/caching")
            .map(|c| CachingMode::parse(&c))
            .unwrap_or_default(),
        write_accelerator: bool_at(value, "/writeAcceleratorEnabled"),
        ephemeral: value.pointer("/diffDiskSettings").is_some_and(|v| !v.is_null()),
        sku: str_at(value, "/managedDisk/storageAccountType").map(DiskSku::new),
    })
}

/// Parse a virtual machine (expanded with its instance view)
pub fn parse_vm(value: &Value) -> Result<VirtualMachine> {
    let id = ResourceId::new(required(value, "/id")?);
    let resource_group = id
        .resource_group()
        .map(String::from)
        .ok_or_else(|| ProviderError::malformed(format!("no resource group in {}", id)))?;

    let os_disk = value
        .pointer("/properties/storageProfile/osDisk")
        .ok_or_else(|| ProviderError::malformed("missing osDisk"))
        .and_then(|disk| parse_attached_disk(disk, DiskRole::Os))?;

    let data_disks = array_at(value, "/properties/storageProfile/dataDisks")
        .iter()
        .map(|disk| {
            let lun = value_lun(disk)?;
            parse_attached_disk(disk, DiskRole::Data { lun })
        })
        .collect::<Result<Vec<_>>>()?;

    let boot_diagnostics = value
        .pointer("/properties/diagnosticsProfile/bootDiagnostics")
        .map(|diag| BootDiagnostics {
            enabled: bool_at(diag, "/enabled"),
            storage_uri: str_at(diag, "/storageUri"),
        });

    let identity = value.get("identity").filter(|v| !v.is_null()).map(|identity| {
        let kind = str_at(identity, "/type").unwrap_or_default();
        VmIdentity {
            system_assigned: kind.contains("SystemAssigned"),
            user_assigned: identity
                .get("userAssignedIdentities")
                .and_then(Value::as_object)
                .map(|ids| ids.keys().map(ResourceId::new).collect())
                .unwrap_or_default(),
        }
    });

    let extensions = array_at(value, "/resources")
        .iter()
        .filter_map(|ext| {
            Some(ExtensionRef {
                name: str_at(ext, "/name")?,
                publisher: str_at(ext, "/properties/publisher").unwrap_or_default(),
                kind: str_at(ext, "/properties/type").unwrap_or_default(),
            })
        })
        .collect();

    Ok(VirtualMachine {
        name: required(value, "/name")?,
        location: required(value, "/location")?,
        zone: strings_at(value, "/zones").into_iter().next(),
        size: required(value, "/properties/hardwareProfile/vmSize")?,
        power_state: power_state(value),
        provisioning_state: provisioning_state(value),
        os_disk,
        data_disks,
        nic_ids: ids_at(value, "/properties/networkProfile/networkInterfaces"),
        placement_group: id_at(value, "/properties/proximityPlacementGroup/id"),
        scale_set: id_at(value, "/properties/virtualMachineScaleSet/id"),
        boot_diagnostics,
        identity,
        priority: str_at(value, "/properties/priority"),
        eviction_policy: str_at(value, "/properties/evictionPolicy"),
        max_price: value
            .pointer("/properties/billingProfile/maxPrice")
            .and_then(Value::as_f64),
        encryption_at_host: bool_at(value, "/properties/securityProfile/encryptionAtHost"),
        license_type: str_at(value, "/properties/licenseType"),
        extensions,
        tags: tags_at(value),
        resource_group,
        id,
    })
}

fn value_lun(disk: &Value) -> Result<i32> {
    disk.get("lun")
        .and_then(Value::as_i64)
        .and_then(|lun| i32::try_from(lun).ok())
        .ok_or_else(|| ProviderError::malformed("data disk without lun"))
}

/// Parse a managed disk
pub fn parse_disk(value: &Value) -> Result<ManagedDisk> {
    Ok(ManagedDisk {
        id: ResourceId::new(required(value, "/id")?),
        name: required(value, "/name")?,
        location: required(value, "/location")?,
        sku: DiskSku::new(required(value, "/sku/name")?),
        size_gb: u32_at(value, "/properties/diskSizeGB").unwrap_or(0),
        iops_read_write: u64_at(value, "/properties/diskIOPSReadWrite"),
        mbps_read_write: u64_at(value, "/properties/diskMBpsReadWrite"),
        tier: str_at(value, "/properties/tier"),
        logical_sector_size: u32_at(value, "/properties/creationData/logicalSectorSize"),
        disk_encryption_set: id_at(value, "/properties/encryption/diskEncryptionSetId"),
        encryption_settings_enabled: bool_at(
            value,
            "/properties/encryptionSettingsCollection/enabled",
        ),
        max_shares: u32_at(value, "/properties/maxShares"),
        os_type: str_at(value, "/properties/osType"),
        hyper_v_generation: str_at(value, "/properties/hyperVGeneration"),
        zones: strings_at(value, "/zones"),
        provisioning_state: provisioning_state(value),
        tags: tags_at(value),
    })
}

/// Parse a network interface
pub fn parse_nic(value: &Value) -> Result<NetworkDescriptor> {
    let ip_configurations = array_at(value, "/properties/ipConfigurations")
        .iter()
        .map(|config| {
            Ok(IpConfiguration {
                name: required(config, "/name")?,
                primary: bool_at(config, "/properties/primary"),
                allocation: match str_at(config, "/properties/privateIPAllocationMethod")
                    .as_deref()
                {
                    Some(m) if m.eq_ignore_ascii_case("static") => IpAllocation::Static,
                    _ => IpAllocation::Dynamic,
                },
                private_address: str_at(config, "/properties/privateIPAddress"),
                address_version: str_at(config, "/properties/privateIPAddressVersion"),
                subnet_id: id_at(config, "/properties/subnet/id"),
                public_ip_id: id_at(config, "/properties/publicIPAddress/id"),
                load_balancer_backend_pool_ids: ids_at(
                    config,
                    "/properties/loadBalancerBackendAddressPools",
                ),
                load_balancer_inbound_nat_rule_ids: ids_at(
                    config,
                    "/properties/loadBalancerInboundNatRules",
                ),
                application_security_group_ids: ids_at(
                    config,
                    "/properties/applicationSecurityGroups",
                ),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(NetworkDescriptor {
        id: ResourceId::new(required(value, "/id")?),
        name: required(value, "/name")?,
        location: required(value, "/location")?,
        ip_configurations,
        dns_servers: strings_at(value, "/properties/dnsSettings/dnsServers"),
        accelerated_networking: bool_at(value, "/properties/enableAcceleratedNetworking"),
        ip_forwarding: bool_at(value, "/properties/enableIPForwarding"),
        nsg_id: id_at(value, "/properties/networkSecurityGroup/id"),
        provisioning_state: provisioning_state(value),
        tags: tags_at(value),
    })
}

/// Parse one page of the resource SKU listing
///
/// Zones come from the `locationInfo` entry for each location; restrictions
/// keep their type, affected locations/zones and reason code.
pub fn parse_skus(value: &Value) -> Vec<SkuEntry> {
    array_at(value, "/value")
        .iter()
        .filter_map(|sku| {
            let resource_type = str_at(sku, "/resourceType")?;
            let name = str_at(sku, "/name")?;

            let zones = array_at(sku, "/locationInfo")
                .iter()
                .flat_map(|info| strings_at(info, "/zones"))
                .collect();

            let restrictions = array_at(sku, "/restrictions")
                .iter()
                .filter_map(|r| {
                    let kind = match str_at(r, "/type")?.as_str() {
                        "Location" => RestrictionKind::Location,
                        "Zone" => RestrictionKind::Zone,
                        _ => return None,
                    };
                    Some(SkuRestriction {
                        kind,
                        locations: strings_at(r, "/restrictionInfo/locations"),
                        zones: strings_at(r, "/restrictionInfo/zones"),
                        reason_code: str_at(r, "/reasonCode"),
                    })
                })
                .collect();

            Some(SkuEntry {
                resource_type,
                name,
                locations: strings_at(sku, "/locations"),
                zones,
                restrictions,
            })
        })
        .collect()
}

/// Parse a proximity placement group and its member references
pub fn parse_placement_group(value: &Value) -> Result<PlacementGroup> {
    Ok(PlacementGroup {
        id: ResourceId::new(required(value, "/id")?),
        name: required(value, "/name")?,
        location: required(value, "/location")?,
        member_ids: ids_at(value, "/properties/virtualMachines"),
    })
}

/// Parse a restore point and the disk restore points it captured
pub fn parse_restore_point(value: &Value) -> Result<RestorePoint> {
    let profile = "/properties/sourceMetadata/storageProfile";
    let os_disk = value.pointer(&format!("{}/osDisk", profile));
    let data_disks = array_at(value, &format!("{}/dataDisks", profile));

    let disk_restore_points = os_disk
        .into_iter()
        .chain(data_disks.iter())
        .filter_map(|disk| {
            Some(DiskRestorePointRef {
                disk_name: str_at(disk, "/name")?,
                disk_id: id_at(disk, "/managedDisk/id"),
                restore_point_id: id_at(disk, "/diskRestorePoint/id")?,
            })
        })
        .collect();

    Ok(RestorePoint {
        id: ResourceId::new(required(value, "/id")?),
        status: OperationStatus::new(provisioning_state(value)),
        disk_restore_points,
    })
}

/// Parse the status of any resource this client creates
///
/// Snapshots report their access state and instances their power state as the
/// secondary state.
pub fn parse_status(value: &Value) -> OperationStatus {
    let status = OperationStatus::new(provisioning_state(value));

    if let Some(access) = str_at(value, "/properties/snapshotAccessState") {
        return status.with_secondary(access);
    }
    if value.pointer("/properties/instanceView").is_some() {
        return status.with_secondary(power_state(value).code());
    }
    status
}

// Request bodies

fn tags_value(tags: &Tags) -> Value {
    json!(tags)
}

fn id_refs(ids: &[ResourceId]) -> Value {
    Value::Array(ids.iter().map(|id| json!({ "id": id })).collect())
}

/// Body for an incremental snapshot
pub fn snapshot_body(definition: &SnapshotDefinition) -> Value {
    let mut creation = json!({
        "createOption": "Copy",
        "sourceResourceId": definition.source_disk_id,
    });
    if let Some(minutes) = definition.instant_access_minutes {
        creation["instantAccessDurationMinutes"] = json!(minutes);
    }

    json!({
        "location": definition.location,
        "properties": {
            "creationData": creation,
            "incremental": definition.incremental,
        },
        "tags": tags_value(&definition.tags),
    })
}

/// Request body for a restore point collection
pub fn restore_point_collection_body(definition: &RestorePointCollectionDefinition) -> Value {
    json!({
        "location": definition.location,
        "properties": { "source": { "id": definition.source_vm_id } },
        "tags": tags_value(&definition.tags),
    })
}

/// Request body for a restore point
pub fn restore_point_body(definition: &RestorePointDefinition) -> Value {
    json!({
        "properties": {
            "consistencyMode": definition.consistency_mode.as_str(),
            "excludeDisks": id_refs(&definition.excluded_disks),
        }
    })
}

/// Body for a zonal managed disk
///
/// Provisioned IOPS/throughput are only sent for Advanced SKUs and the
/// performance tier only for Premium SKUs; the API rejects them elsewhere.
pub fn disk_body(definition: &DiskDefinition) -> Value {
    let (create_option, source) = match &definition.source {
        DiskSource::Snapshot(id) => ("Copy", id),
        DiskSource::RestorePoint(id) => ("Restore", id),
    };
    let class = definition.sku.class();

    let mut creation = Map::new();
    creation.insert("createOption".into(), json!(create_option));
    creation.insert("sourceResourceId".into(), json!(source));
    if let (Some(size), SkuClass::Advanced) = (definition.logical_sector_size, class) {
        creation.insert("logicalSectorSize".into(), json!(size));
    }

    let mut properties = Map::new();
    properties.insert("creationData".into(), Value::Object(creation));
    properties.insert("diskSizeGB".into(), json!(definition.size_gb));
    if class == SkuClass::Advanced {
        if let Some(iops) = definition.iops_read_write {
            properties.insert("diskIOPSReadWrite".into(), json!(iops));
        }
        if let Some(mbps) = definition.mbps_read_write {
            properties.insert("diskMBpsReadWrite".into(), json!(mbps));
        }
    }
    if let (Some(tier), SkuClass::Premium) = (&definition.tier, class) {
        properties.insert("tier".into(), json!(tier));
    }
    if let Some(des) = &definition.disk_encryption_set {
        properties.insert(
            "encryption".into(),
            json!({ "type": "EncryptionAtRestWithCustomerKey", "diskEncryptionSetId": des }),
        );
    }
    if let Some(os_type) = &definition.os_type {
        properties.insert("osType".into(), json!(os_type));
    }
    if let Some(generation) = &definition.hyper_v_generation {
        properties.insert("hyperVGeneration".into(), json!(generation));
    }

    let mut body = json!({
        "location": definition.location,
        "sku": { "name": definition.sku },
        "properties": properties,
        "tags": tags_value(&definition.tags),
    });
    if let Some(zone) = &definition.zone {
        body["zones"] = json!([zone]);
    }
    body
}

/// Request body for a network interface
pub fn nic_body(definition: &NicDefinition) -> Value {
    let ip_configurations: Vec<Value> = definition
        .ip_configurations
        .iter()
        .map(|config| {
            let mut properties = json!({
                "primary": config.primary,
                "privateIPAllocationMethod": match config.allocation {
                    IpAllocation::Dynamic => "Dynamic",
                    IpAllocation::Static => "Static",
                },
                "loadBalancerBackendAddressPools": id_refs(&config.load_balancer_backend_pool_ids),
                "applicationSecurityGroups": id_refs(&config.application_security_group_ids),
            });
            if let Some(subnet) = &config.subnet_id {
                properties["subnet"] = json!({ "id": subnet });
            }
            if let Some(version) = &config.address_version {
                properties["privateIPAddressVersion"] = json!(version);
            }
            json!({ "name": config.name, "properties": properties })
        })
        .collect();

    let mut properties = json!({
        "ipConfigurations": ip_configurations,
        "dnsSettings": { "dnsServers": definition.dns_servers },
        "enableAcceleratedNetworking": definition.accelerated_networking,
        "enableIPForwarding": definition.ip_forwarding,
    });
    if let Some(nsg) = &definition.nsg_id {
        properties["networkSecurityGroup"] = json!({ "id": nsg });
    }

    json!({
        "location": definition.location,
        "properties": properties,
        "tags": tags_value(&definition.tags),
    })
}

/// Body for a zonal instance attaching pre-created disks and NIC
pub fn vm_body(definition: &InstanceDefinition) -> Value {
    let attach = |disk: &rezone_core::DiskAttachmentDefinition| {
        let mut value = json!({
            "name": disk.name,
            "createOption": "Attach",
            "caching": disk.caching.as_str(),
            "writeAcceleratorEnabled": disk.write_accelerator,
            "managedDisk": { "id": disk.disk_id },
        });
        if let Some(lun) = disk.role.lun() {
            value["lun"] = json!(lun);
        }
        value
    };

    let mut properties = json!({
        "hardwareProfile": { "vmSize": definition.size },
        "storageProfile": {
            "osDisk": attach(&definition.os_disk),
            "dataDisks": definition.data_disks.iter().map(attach).collect::<Vec<_>>(),
        },
        "networkProfile": {
            "networkInterfaces": [
                { "id": definition.nic_id, "properties": { "primary": true } }
            ]
        },
    });

    if let Some(diag) = &definition.boot_diagnostics {
        let mut boot = json!({ "enabled": diag.enabled });
        if let Some(uri) = &diag.storage_uri {
            boot["storageUri"] = json!(uri);
        }
        properties["diagnosticsProfile"] = json!({ "bootDiagnostics": boot });
    }
    if let Some(priority) = &definition.priority {
        properties["priority"] = json!(priority);
    }
    if let Some(policy) = &definition.eviction_policy {
        properties["evictionPolicy"] = json!(policy);
    }
    if let Some(price) = definition.max_price {
        properties["billingProfile"] = json!({ "maxPrice": price });
    }
    if let Some(group) = &definition.placement_group {
        properties["proximityPlacementGroup"] = json!({ "id": group });
    }
    if definition.encryption_at_host {
        properties["securityProfile"] = json!({ "encryptionAtHost": true });
    }
    if let Some(license) = &definition.license_type {
        properties["licenseType"] = json!(license);
    }

    let mut body = json!({
        "location": definition.location,
        "zones": [definition.zone],
        "properties": properties,
        "tags": tags_value(&definition.tags),
    });

    if let Some(identity) = definition.identity.as_ref().filter(|i| i.kind() != "None") {
        let mut value = json!({ "type": identity.kind() });
        if !identity.user_assigned.is_empty() {
            let assigned: Map<String, Value> = identity
                .user_assigned
                .iter()
                .map(|id| (id.to_string(), json!({})))
                .collect();
            value["userAssignedIdentities"] = Value::Object(assigned);
        }
        body["identity"] = value;
    }

    body
}

#[async_trait]
impl ComputeProvider for ArmClient {
    fn name(&self) -> &str {
        "azure-arm"
    }

    async fn get_vm(&self, resource_group: &str, name: &str) -> Result<Option<VirtualMachine>> {
        let url = self.resource_url(resource_group, "Microsoft.Compute/virtualMachines", name);
        self.get_vm_at(&url).await
    }

    async fn get_vm_by_id(&self, id: &ResourceId) -> Result<Option<VirtualMachine>> {
        self.get_vm_at(&self.id_url(id)).await
    }

    async fn get_disk(&self, resource_group: &str, name: &str) -> Result<Option<ManagedDisk>> {
        let url = self.resource_url(resource_group, "Microsoft.Compute/disks", name);
        self.get(&url, DISK_API_VERSION)
            .await?
            .map(|v| parse_disk(&v))
            .transpose()
    }

    async fn get_nic(&self, id: &ResourceId) -> Result<Option<NetworkDescriptor>> {
        self.get(&self.id_url(id), NETWORK_API_VERSION)
            .await?
            .map(|v| parse_nic(&v))
            .transpose()
    }

    async fn get_nic_by_name(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<Option<NetworkDescriptor>> {
        let url = self.resource_url(resource_group, "Microsoft.Network/networkInterfaces", name);
        self.get(&url, NETWORK_API_VERSION)
            .await?
            .map(|v| parse_nic(&v))
            .transpose()
    }

    async fn list_skus(&self, location: &str) -> Result<Vec<SkuEntry>> {
        let filter = format!("location eq '{}'", location);
        let first = format!(
            "{}/subscriptions/{}/providers/Microsoft.Compute/skus",
            self.endpoint, self.subscription_id
        );

        let mut skus = Vec::new();
        let mut page = self
            .send(
                self.request(Method::GET, &first, SKU_API_VERSION)
                    .query(&[("$filter", filter.as_str())]),
            )
            .await?;

        while let Some(value) = page {
            skus.extend(parse_skus(&value));
            page = match str_at(&value, "/nextLink") {
                // nextLink already carries every query parameter
                Some(next) => self.send(self.client.get(next.as_str())).await?,
                None => None,
            };
        }

        debug!(location = %location, skus = skus.len(), "Listed resource SKUs");
        Ok(skus)
    }

    async fn get_placement_group(&self, id: &ResourceId) -> Result<Option<PlacementGroup>> {
        self.get(&self.id_url(id), COMPUTE_API_VERSION)
            .await?
            .map(|v| parse_placement_group(&v))
            .transpose()
    }

    async fn get_restore_point(&self, id: &ResourceId) -> Result<RestorePoint> {
        let value = self
            .get(&self.id_url(id), COMPUTE_API_VERSION)
            .await?
            .ok_or_else(|| ProviderError::NotFound(id.to_string()))?;
        parse_restore_point(&value)
    }

    async fn get_operation_status(&self, id: &ResourceId) -> Result<OperationStatus> {
        let is_vm = id
            .as_str()
            .to_ascii_lowercase()
            .contains("/microsoft.compute/virtualmachines/");

        let mut request = self.request(Method::GET, &self.id_url(id), api_version_for(id));
        if is_vm {
            request = request.query(&[("$expand", "instanceView")]);
        }

        let value = self
            .send(request)
            .await?
            .ok_or_else(|| ProviderError::NotFound(id.to_string()))?;
        Ok(parse_status(&value))
    }

    async fn deallocate_vm(&self, id: &ResourceId) -> Result<()> {
        info!(vm = %id.name(), "Requesting deallocation");
        self.post(&format!("{}/deallocate", self.id_url(id)), COMPUTE_API_VERSION)
            .await
    }

    async fn create_snapshot(
        &self,
        resource_group: &str,
        definition: &SnapshotDefinition,
    ) -> Result<ResourceId> {
        let url =
            self.resource_url(resource_group, "Microsoft.Compute/snapshots", &definition.name);
        let created = self.put(&url, DISK_API_VERSION, &snapshot_body(definition)).await?;
        created_id(&created, &url, &self.endpoint)
    }

    async fn create_restore_point_collection(
        &self,
        resource_group: &str,
        definition: &RestorePointCollectionDefinition,
    ) -> Result<ResourceId> {
        let url = self.resource_url(
            resource_group,
            "Microsoft.Compute/restorePointCollections",
            &definition.name,
        );
        let created = self
            .put(&url, COMPUTE_API_VERSION, &restore_point_collection_body(definition))
            .await?;
        created_id(&created, &url, &self.endpoint)
    }

    async fn create_restore_point(
        &self,
        collection_id: &ResourceId,
        definition: &RestorePointDefinition,
    ) -> Result<ResourceId> {
        let url = format!("{}/restorePoints/{}", self.id_url(collection_id), definition.name);
        let created = self
            .put(&url, COMPUTE_API_VERSION, &restore_point_body(definition))
            .await?;
        created_id(&created, &url, &self.endpoint)
    }

    async fn create_disk(
        &self,
        resource_group: &str,
        definition: &DiskDefinition,
    ) -> Result<ResourceId> {
        let url = self.resource_url(resource_group, "Microsoft.Compute/disks", &definition.name);
        let created = self.put(&url, DISK_API_VERSION, &disk_body(definition)).await?;
        created_id(&created, &url, &self.endpoint)
    }

    async fn create_nic(
        &self,
        resource_group: &str,
        definition: &NicDefinition,
    ) -> Result<ResourceId> {
        let url = self.resource_url(
            resource_group,
            "Microsoft.Network/networkInterfaces",
            &definition.name,
        );
        let created = self.put(&url, NETWORK_API_VERSION, &nic_body(definition)).await?;
        created_id(&created, &url, &self.endpoint)
    }

    async fn create_vm(
        &self,
        resource_group: &str,
        definition: &InstanceDefinition,
    ) -> Result<ResourceId> {
        let url = self.resource_url(
            resource_group,
            "Microsoft.Compute/virtualMachines",
            &definition.name,
        );
        let created = self.put(&url, COMPUTE_API_VERSION, &vm_body(definition)).await?;
        created_id(&created, &url, &self.endpoint)
    }

    async fn delete_snapshot(&self, id: &ResourceId) -> Result<()> {
        self.delete(id).await
    }

    async fn delete_restore_point_collection(&self, id: &ResourceId) -> Result<()> {
        // The service deletes contained restore points with the collection
        self.delete(id).await
    }
}

impl ArmClient {
    async fn get_vm_at(&self, url: &str) -> Result<Option<VirtualMachine>> {
        self.send(
            self.request(Method::GET, url, COMPUTE_API_VERSION)
                .query(&[("$expand", "instanceView")]),
        )
        .await?
        .map(|v| parse_vm(&v))
        .transpose()
    }
}

/// Id reported by a PUT response, falling back to the request path
fn created_id(response: &Value, url: &str, endpoint: &str) -> Result<ResourceId> {
    Ok(match str_at(response, "/id") {
        Some(id) => ResourceId::new(id),
        None => ResourceId::new(url.strip_prefix(endpoint).unwrap_or(url)),
    })
}
