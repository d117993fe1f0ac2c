//! End-to-end migrations against the in-memory provider

use rezone_core::{
    AttachedDisk, CachingMode, DiskRole, DiskSku, ExtensionRef, IpAllocation, IpConfiguration,
    ManagedDisk, NetworkDescriptor, OperationStatus, PlacementGroup, PowerState, ProviderError,
    ProvisioningState, SkuEntry, Tags, VirtualMachine,
};
use rezone_orchestrator::mock::{InMemoryProvider, ProviderCall, kinds, resource_id};
use rezone_orchestrator::naming;
use rezone_orchestrator::{
    Backoff, CopyStrategy, MigrationConfig, MigrationOrchestrator, MigrationRequest,
    MigrationStage, OrchestratorError, PlacementPolicy, ViolationKind,
};
use std::sync::Arc;
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};

const RG: &str = "rg-app";
const TARGET_RG: &str = "rg-zonal";
const LOCATION: &str = "westeurope";
const VM: &str = "app01";
const SIZE: &str = "Standard_D4s_v5";
const SOURCE_ADDRESS: &str = "10.0.1.4";

struct Source {
    os_sku: &'static str,
    os_caching: CachingMode,
    data_disks: Vec<(&'static str, i32)>,
    placement_group: Option<PlacementGroup>,
    extensions: Vec<ExtensionRef>,
}

impl Default for Source {
    fn default() -> Self {
        Self {
            os_sku: DiskSku::STANDARD_HDD,
            os_caching: CachingMode::ReadWrite,
            data_disks: vec![],
            placement_group: None,
            extensions: vec![],
        }
    }
}

fn attached(name: &str, role: DiskRole, caching: CachingMode) -> AttachedDisk {
    AttachedDisk {
        name: name.to_string(),
        managed_disk_id: Some(resource_id(RG, kinds::DISK, name)),
        role,
        caching,
        write_accelerator: false,
        ephemeral: false,
        sku: None,
    }
}

fn managed_disk(name: &str, sku: &str) -> ManagedDisk {
    ManagedDisk {
        id: resource_id(RG, kinds::DISK, name),
        name: name.to_string(),
        location: LOCATION.to_string(),
        sku: DiskSku::new(sku),
        size_gb: 128,
        iops_read_write: None,
        mbps_read_write: None,
        tier: None,
        logical_sector_size: None,
        disk_encryption_set: None,
        encryption_settings_enabled: false,
        max_shares: None,
        os_type: Some("Linux".to_string()),
        hyper_v_generation: Some("V2".to_string()),
        zones: vec![],
        provisioning_state: ProvisioningState::Succeeded,
        tags: Tags::new(),
    }
}

fn source_nic() -> NetworkDescriptor {
    NetworkDescriptor {
        id: resource_id(RG, kinds::NIC, "app01-nic"),
        name: "app01-nic".to_string(),
        location: LOCATION.to_string(),
        ip_configurations: vec![IpConfiguration {
            name: "ipconfig1".to_string(),
            primary: true,
            allocation: IpAllocation::Dynamic,
            private_address: Some(SOURCE_ADDRESS.to_string()),
            address_version: Some("IPv4".to_string()),
            subnet_id: Some(resource_id(
                RG,
                "Microsoft.Network/virtualNetworks",
                "vnet/subnets/app",
            )),
            public_ip_id: None,
            load_balancer_backend_pool_ids: vec![],
            load_balancer_inbound_nat_rule_ids: vec![],
            application_security_group_ids: vec![],
        }],
        dns_servers: vec![],
        accelerated_networking: true,
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
        locations: vec![LOCATION.to_string()],
        zones: zones.iter().map(|z| z.to_string()).collect(),
        restrictions: vec![],
    }
}

fn source_vm(source: &Source) -> VirtualMachine {
    VirtualMachine {
        id: resource_id(RG, kinds::VM, VM),
        name: VM.to_string(),
        resource_group: RG.to_string(),
        location: LOCATION.to_string(),
        zone: None,
        size: SIZE.to_string(),
        power_state: PowerState::Running,
        provisioning_state: ProvisioningState::Succeeded,
        os_disk: attached("app01-os", DiskRole::Os, source.os_caching),
        data_disks: source
            .data_disks
            .iter()
            .map(|(name, lun)| attached(name, DiskRole::Data { lun: *lun }, CachingMode::ReadOnly))
            .collect(),
        nic_ids: vec![source_nic().id],
        placement_group: source.placement_group.as_ref().map(|g| g.id.clone()),
        scale_set: None,
        boot_diagnostics: None,
        identity: None,
        priority: None,
        eviction_policy: None,
        max_price: None,
        encryption_at_host: false,
        license_type: None,
        extensions: source.extensions.clone(),
        tags: Tags::from([("app".to_string(), "billing".to_string())]),
    }
}

/// Seed a provider with the source instance and a catalog offering every zone
fn seeded(source: Source) -> Arc<InMemoryProvider> {
    let provider = Arc::new(InMemoryProvider::new());

    provider.insert_vm(source_vm(&source));
    provider.insert_disk(managed_disk("app01-os", source.os_sku));
    for (name, _) in &source.data_disks {
        provider.insert_disk(managed_disk(name, DiskSku::PREMIUM));
    }
    provider.insert_nic(source_nic());
    if let Some(group) = source.placement_group {
        provider.insert_placement_group(group);
    }
    provider.set_skus(vec![
        sku("virtualMachines", SIZE, &["1", "2", "3"]),
        sku("disks", DiskSku::ULTRA, &["1", "2", "3"]),
        sku("disks", DiskSku::PREMIUM_V2, &["1", "2", "3"]),
    ]);

    provider
}

fn config() -> MigrationConfig {
    MigrationConfig::default()
        .with_poll_backoff(Backoff::fixed(Duration::from_secs(1)))
        .with_operation_timeout(Duration::from_secs(60))
        .with_copy_timeout(Duration::from_secs(60))
}

fn request(zone: &str) -> MigrationRequest {
    MigrationRequest::new(RG, VM, zone).with_target_resource_group(TARGET_RG)
}

fn mutations(provider: &InMemoryProvider) -> Vec<ProviderCall> {
    provider.calls()
}

#[tokio::test(start_paused = true)]
async fn test_single_disk_instance_moves_to_zone() {
    let provider = seeded(Source::default());
    let orchestrator = MigrationOrchestrator::new(provider.clone(), config());

    let result = assert_ok!(orchestrator.run(&request("2")).await);

    assert!(result.succeeded());
    assert_eq!(result.completed_stages.last(), Some(&MigrationStage::Done));
    assert_eq!(result.disks.len(), 1);
    assert!(result.copies_removed);

    let replica = provider.vm(TARGET_RG, VM).expect("replica exists");
    assert_eq!(replica.zone.as_deref(), Some("2"));
    assert!(replica.data_disks.is_empty());
    assert_eq!(replica.os_disk.caching, CachingMode::ReadWrite);
    assert_eq!(replica.tags.get("app").map(String::as_str), Some("billing"));

    let disk = provider.disk_definition("app01-os-z2").expect("disk created");
    assert_eq!(disk.zone.as_deref(), Some("2"));
    assert_eq!(disk.sku.as_str(), DiskSku::STANDARD_HDD);

    let nic = provider.nic_definition("app01-nic-z2").expect("nic created");
    assert_eq!(nic.ip_configurations[0].allocation, IpAllocation::Dynamic);
    let new_address = {
        use rezone_core::ComputeProvider;
        provider
            .get_nic(&replica.nic_ids[0])
            .await
            .unwrap()
            .and_then(|n| n.ip_configurations[0].private_address.clone())
    };
    assert!(new_address.is_some());
    assert_ne!(new_address.as_deref(), Some(SOURCE_ADDRESS));

    // Source is left deallocated, never deleted
    let source = provider.vm(RG, VM).expect("source still exists");
    assert_eq!(source.power_state, PowerState::Deallocated);

    let calls = mutations(&provider);
    assert_eq!(calls[0], ProviderCall::DeallocateVm(VM.to_string()));
    assert!(matches!(calls[1], ProviderCall::CreateSnapshot(_)));
    assert_eq!(calls[2], ProviderCall::CreateDisk("app01-os-z2".to_string()));
    assert_eq!(calls[3], ProviderCall::CreateNic("app01-nic-z2".to_string()));
    assert_eq!(calls[4], ProviderCall::CreateVm(VM.to_string()));
    assert!(matches!(calls[5], ProviderCall::DeleteSnapshot(_)));
    assert_eq!(provider.snapshot_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_ultra_os_disk_with_caching_is_rejected_before_mutation() {
    let provider = seeded(Source {
        os_sku: DiskSku::ULTRA,
        os_caching: CachingMode::ReadWrite,
        ..Default::default()
    });
    let orchestrator = MigrationOrchestrator::new(provider.clone(), config());

    let err = assert_err!(orchestrator.run(&request("2")).await);

    let OrchestratorError::Validation(report) = err else {
        panic!("expected validation failure");
    };
    let caching: Vec<_> = report.of_kind(ViolationKind::CachingNotNone).collect();
    assert_eq!(caching.len(), 1);
    assert_eq!(caching[0].subject, "app01-os");
    assert!(caching[0].message.contains(DiskSku::ULTRA));
    assert!(mutations(&provider).is_empty());
}

fn pinned_group() -> (PlacementGroup, VirtualMachine) {
    let group_id = resource_id(RG, kinds::PLACEMENT_GROUP, "ppg-app");
    let mut neighbour = source_vm(&Source::default());
    neighbour.id = resource_id(RG, kinds::VM, "db01");
    neighbour.name = "db01".to_string();
    neighbour.zone = Some("3".to_string());
    neighbour.placement_group = Some(group_id.clone());

    let group = PlacementGroup {
        id: group_id,
        name: "ppg-app".to_string(),
        location: LOCATION.to_string(),
        member_ids: vec![resource_id(RG, kinds::VM, VM), neighbour.id.clone()],
    };
    (group, neighbour)
}

#[tokio::test(start_paused = true)]
async fn test_placement_group_pinned_elsewhere_aborts_under_strict_policy() {
    let (group, neighbour) = pinned_group();
    let provider = seeded(Source {
        placement_group: Some(group),
        ..Default::default()
    });
    provider.insert_vm(neighbour);

    let orchestrator = MigrationOrchestrator::new(provider.clone(), config());
    let err = assert_err!(orchestrator.run(&request("2")).await);

    match err {
        OrchestratorError::Incompatibility { zone, reason, .. } => {
            assert_eq!(zone, "2");
            assert!(reason.contains("pinned to zone 3"), "reason: {}", reason);
        }
        other => panic!("unexpected error: {}", other),
    }
    assert!(mutations(&provider).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_placement_group_pinned_elsewhere_is_skipped_with_warning() {
    let (group, neighbour) = pinned_group();
    let provider = seeded(Source {
        placement_group: Some(group),
        ..Default::default()
    });
    provider.insert_vm(neighbour);

    let orchestrator = MigrationOrchestrator::new(
        provider.clone(),
        config().with_placement_policy(PlacementPolicy::SkipWithWarning),
    );
    let result = assert_ok!(orchestrator.run(&request("2")).await);

    let definition = provider.vm_definition(VM).expect("replica submitted");
    assert_eq!(definition.placement_group, None);
    assert!(
        result
            .warnings
            .iter()
            .any(|w| w.contains("outside placement group ppg-app"))
    );
}

#[tokio::test(start_paused = true)]
async fn test_placement_group_in_target_zone_is_joined() {
    let (group, mut neighbour) = pinned_group();
    neighbour.zone = Some("2".to_string());
    let group_id = group.id.clone();
    let provider = seeded(Source {
        placement_group: Some(group),
        ..Default::default()
    });
    provider.insert_vm(neighbour);

    let orchestrator = MigrationOrchestrator::new(provider.clone(), config());
    assert_ok!(orchestrator.run(&request("2")).await);

    let definition = provider.vm_definition(VM).expect("replica submitted");
    assert_eq!(definition.placement_group, Some(group_id));
}

#[tokio::test(start_paused = true)]
async fn test_every_violation_is_reported_at_once() {
    let provider = seeded(Source {
        os_sku: DiskSku::ULTRA,
        extensions: vec![ExtensionRef {
            name: "AzureDiskEncryptionForLinux".to_string(),
            publisher: "Microsoft.Azure.Security".to_string(),
            kind: "AzureDiskEncryptionForLinux".to_string(),
        }],
        ..Default::default()
    });
    let request = MigrationRequest::new(RG, VM, "2").with_vm_size("Standard_M416ms_v2");

    let orchestrator = MigrationOrchestrator::new(provider.clone(), config());
    let err = assert_err!(orchestrator.run(&request).await);

    let OrchestratorError::Validation(report) = err else {
        panic!("expected validation failure");
    };
    assert!(report.has(ViolationKind::ScopeCollision));
    assert!(report.has(ViolationKind::CachingNotNone));
    assert!(report.has(ViolationKind::VmSizeUnavailable));
    assert!(report.has(ViolationKind::DiskEncryptionBlocked));
    assert!(report.len() >= 4);
    assert!(mutations(&provider).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_what_if_plans_without_mutating() {
    let provider = seeded(Source {
        data_disks: vec![("app01-data0", 0)],
        ..Default::default()
    });
    let orchestrator = MigrationOrchestrator::new(provider.clone(), config().with_what_if(true));

    let result = assert_ok!(orchestrator.run(&request("3")).await);

    assert!(result.succeeded());
    assert_eq!(result.completed_stages, vec![MigrationStage::Validate]);
    assert!(result.planned_actions.iter().any(|a| a.starts_with("Deallocate")));
    assert!(
        result
            .planned_actions
            .iter()
            .any(|a| a.starts_with("Create disk app01-data0-z3"))
    );
    assert!(mutations(&provider).is_empty());
    assert!(result.summary().contains("what-if"));
}

#[tokio::test(start_paused = true)]
async fn test_rerun_after_interruption_reuses_created_resources() {
    let provider = seeded(Source {
        data_disks: vec![("app01-data0", 0), ("app01-data1", 1)],
        ..Default::default()
    });
    provider.fail_create(
        VM,
        vec![ProviderError::Api {
            status: 400,
            code: "AllocationFailed".into(),
            message: "no capacity".into(),
        }],
    );
    let orchestrator = MigrationOrchestrator::new(provider.clone(), config());

    let err = assert_err!(orchestrator.run(&request("1")).await);
    match &err {
        OrchestratorError::Interrupted { stage, created, .. } => {
            assert_eq!(*stage, MigrationStage::AssembleInstance);
            // 3 snapshots + 3 disks + NIC
            assert_eq!(created.len(), 7);
        }
        other => panic!("unexpected error: {}", other),
    }
    assert!(err.to_string().contains("Resources already created"));

    let result = assert_ok!(orchestrator.run(&request("1")).await);

    assert!(result.succeeded());
    assert!(result.nic_reused);
    assert_eq!(result.reused_disk_ids.len(), 3);
    assert!(result.created_disk_ids.is_empty());
    assert!(result.copy_artifacts.is_empty());

    let count = |f: fn(&ProviderCall) -> bool| provider.count_calls(f);
    assert_eq!(count(|c| matches!(c, ProviderCall::DeallocateVm(_))), 1);
    assert_eq!(count(|c| matches!(c, ProviderCall::CreateSnapshot(_))), 3);
    assert_eq!(count(|c| matches!(c, ProviderCall::CreateDisk(_))), 3);
    assert_eq!(count(|c| matches!(c, ProviderCall::CreateNic(_))), 1);
    assert_eq!(count(|c| matches!(c, ProviderCall::CreateVm(_))), 2);

    let replica = provider.vm(TARGET_RG, VM).expect("replica exists");
    let luns: Vec<_> = replica.data_disks.iter().filter_map(|d| d.role.lun()).collect();
    assert_eq!(luns, vec![0, 1]);
}

#[tokio::test(start_paused = true)]
async fn test_existing_target_instance_is_a_conflict() {
    let provider = seeded(Source::default());
    let mut existing = source_vm(&Source::default());
    existing.id = resource_id(TARGET_RG, kinds::VM, VM);
    existing.resource_group = TARGET_RG.to_string();
    provider.insert_vm(existing);

    let orchestrator = MigrationOrchestrator::new(provider.clone(), config());
    let err = assert_err!(orchestrator.run(&request("2")).await);

    assert!(matches!(err, OrchestratorError::Conflict { .. }));
    assert!(mutations(&provider).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_restore_point_strategy_end_to_end() {
    let provider = seeded(Source {
        os_sku: DiskSku::PREMIUM,
        data_disks: vec![("app01-data0", 0)],
        ..Default::default()
    });
    let orchestrator = MigrationOrchestrator::new(
        provider.clone(),
        config().with_copy_strategy(CopyStrategy::RestorePoint),
    );

    let result = assert_ok!(orchestrator.run(&request("2")).await);

    assert!(result.succeeded());
    assert_eq!(result.copy_artifacts.len(), 1);
    assert!(result.copies_removed);
    assert_eq!(provider.restore_point_collection_count(), 0);

    let disk = provider.disk_definition("app01-data0-z2").expect("disk created");
    assert!(matches!(disk.source, rezone_core::DiskSource::RestorePoint(_)));
    assert_eq!(
        provider.count_calls(|c| matches!(c, ProviderCall::CreateRestorePoint(_))),
        1
    );
    assert_eq!(
        provider.count_calls(|c| matches!(c, ProviderCall::CreateSnapshot(_))),
        0
    );
}

#[tokio::test(start_paused = true)]
async fn test_stuck_instance_times_out_and_reports_created_resources() {
    let provider = seeded(Source::default());
    provider.script_status(
        "app01-zonal",
        vec![OperationStatus::new(ProvisioningState::Creating)],
    );
    let orchestrator = MigrationOrchestrator::new(provider.clone(), config());
    let request = request("2").with_target_vm_name("app01-zonal");

    let result = orchestrator.run_with_report(&request).await;

    assert!(!result.succeeded());
    assert_eq!(result.failed_stage, Some(MigrationStage::AssembleInstance));
    assert!(result.vm_id.is_some());
    assert!(result.errors[0].contains("Timed out"));
    assert!(result.summary().contains("FAILED"));
}

#[tokio::test(start_paused = true)]
async fn test_data_disk_conversion_to_advanced_rejects_read_only_caching() {
    let provider = seeded(Source {
        os_sku: DiskSku::PREMIUM,
        os_caching: CachingMode::None,
        data_disks: vec![("app01-data0", 0)],
        ..Default::default()
    });
    let orchestrator = MigrationOrchestrator::new(provider.clone(), config());
    let request = request("2").with_data_disk_sku(DiskSku::PREMIUM_V2);

    // Data disk carries ReadOnly caching, which premium v2 rejects
    let err = assert_err!(orchestrator.run(&request).await);
    let OrchestratorError::Validation(report) = err else {
        panic!("expected validation failure");
    };
    assert!(report.has(ViolationKind::CachingNotNone));
    assert_eq!(report.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_long_disk_names_get_distinct_snapshots() {
    // Default data disk naming under a 64-character instance name
    let vm_name = "v".repeat(64);
    let data_disks: Vec<(String, i32)> = (0..2)
        .map(|lun| (format!("{}_DataDisk_{}", vm_name, lun), lun))
        .collect();

    let provider = seeded(Source::default());
    let mut vm = source_vm(&Source::default());
    vm.id = resource_id(RG, kinds::VM, &vm_name);
    vm.name = vm_name.clone();
    vm.data_disks = data_disks
        .iter()
        .map(|(name, lun)| attached(name, DiskRole::Data { lun: *lun }, CachingMode::None))
        .collect();
    provider.insert_vm(vm);
    for (name, _) in &data_disks {
        provider.insert_disk(managed_disk(name, DiskSku::PREMIUM));
    }

    let orchestrator = MigrationOrchestrator::new(provider.clone(), config());
    let request = MigrationRequest::new(RG, &vm_name, "2").with_target_resource_group(TARGET_RG);
    let result = assert_ok!(orchestrator.run(&request).await);

    assert!(result.succeeded());
    assert_eq!(result.copy_artifacts.len(), 3);

    let mut snapshots: Vec<String> = provider
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            ProviderCall::CreateSnapshot(name) => Some(name),
            _ => None,
        })
        .collect();
    snapshots.sort();
    snapshots.dedup();
    assert_eq!(snapshots.len(), 3);
    assert!(snapshots.iter().all(|n| n.chars().count() <= naming::MAX_NAME_LEN));

    let sources: Vec<_> = data_disks
        .iter()
        .map(|(name, _)| {
            provider
                .disk_definition(&naming::replica_name(name, "-z2"))
                .expect("replica disk created")
                .source
        })
        .collect();
    assert_ne!(sources[0], sources[1]);
}

#[tokio::test(start_paused = true)]
async fn test_failed_snapshot_reports_every_snapshot_taken() {
    let provider = seeded(Source {
        data_disks: vec![("app01-data0", 0)],
        ..Default::default()
    });
    provider.script_status_prefix(
        "app01-data0-snap-",
        vec![OperationStatus::new(ProvisioningState::Failed)],
    );
    let orchestrator = MigrationOrchestrator::new(provider.clone(), config());

    let err = assert_err!(orchestrator.run(&request("2")).await);

    match &err {
        OrchestratorError::Interrupted { stage, created, .. } => {
            assert_eq!(*stage, MigrationStage::Copy);
            assert_eq!(created.len(), 2);
            assert!(created.iter().any(|id| id.name().starts_with("app01-os-snap-")));
            assert!(created.iter().any(|id| id.name().starts_with("app01-data0-snap-")));
        }
        other => panic!("unexpected error: {}", other),
    }
    assert!(matches!(err.root(), OrchestratorError::OperationFailed { .. }));
    assert_eq!(provider.snapshot_count(), 2);
    assert_eq!(provider.count_calls(|c| matches!(c, ProviderCall::CreateDisk(_))), 0);
}

#[tokio::test(start_paused = true)]
async fn test_failed_restore_point_reports_its_collection() {
    let provider = seeded(Source {
        os_sku: DiskSku::PREMIUM,
        ..Default::default()
    });
    provider.fail_create_prefix(
        "app01-rp-",
        vec![ProviderError::Api {
            status: 409,
            code: "OperationNotAllowed".into(),
            message: "restore point already in progress".into(),
        }],
    );
    let orchestrator = MigrationOrchestrator::new(
        provider.clone(),
        config().with_copy_strategy(CopyStrategy::RestorePoint),
    );

    let result = orchestrator.run_with_report(&request("2")).await;

    assert!(!result.succeeded());
    assert_eq!(result.failed_stage, Some(MigrationStage::Copy));
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].contains("app01-rpc-"));
    assert_eq!(provider.restore_point_collection_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_cleanup_failure_is_only_a_warning() {
    let provider = seeded(Source::default());
    provider.fail_delete(
        "app01-os-snap-",
        ProviderError::Transient("storage account busy".into()),
    );
    let orchestrator = MigrationOrchestrator::new(provider.clone(), config());

    let result = assert_ok!(orchestrator.run(&request("2")).await);

    assert!(result.succeeded());
    assert_eq!(result.completed_stages.last(), Some(&MigrationStage::Done));
    assert!(!result.copies_removed);
    assert!(
        result
            .warnings
            .iter()
            .any(|w| w.contains("Could not delete snapshot") && w.contains("storage account busy"))
    );
    assert_eq!(provider.snapshot_count(), 1);
    assert!(provider.vm(TARGET_RG, VM).is_some());
}

#[tokio::test(start_paused = true)]
async fn test_adopted_ultra_disk_is_attached_without_caching() {
    // Source caching is ReadWrite; an earlier run left an ultra replica behind
    let provider = seeded(Source::default());
    let mut leftover = managed_disk("app01-os-z2", DiskSku::ULTRA);
    leftover.id = resource_id(TARGET_RG, kinds::DISK, "app01-os-z2");
    leftover.zones = vec!["2".to_string()];
    provider.insert_disk(leftover);

    let orchestrator = MigrationOrchestrator::new(provider.clone(), config());
    let result = assert_ok!(orchestrator.run(&request("2")).await);

    assert!(result.succeeded());
    assert_eq!(result.reused_disk_ids.len(), 1);
    assert_eq!(provider.count_calls(|c| matches!(c, ProviderCall::CreateSnapshot(_))), 0);

    let definition = provider.vm_definition(VM).expect("replica submitted");
    assert_eq!(definition.os_disk.caching, CachingMode::None);
    assert!(
        result
            .warnings
            .iter()
            .any(|w| w.contains("app01-os-z2 attached with caching None"))
    );
}
