//! Replica network interface reconstruction
//!
//! The replica gets a fresh NIC built from the source NIC's configuration.
//! Allocation-specific fields never carry over: every address is reissued
//! dynamically, public IPs stay with the source, and inbound NAT rules (which
//! bind to exactly one NIC) are dropped.

use rezone_core::{IpAllocation, NetworkDescriptor, NicDefinition, NicIpConfigurationDefinition};
use tracing::debug;

/// Build the replica NIC definition and the warnings for dropped settings
pub fn build_replica_nic(
    source: &NetworkDescriptor,
    name: &str,
    location: &str,
) -> (NicDefinition, Vec<String>) {
    let mut warnings = Vec::new();
    let primary_name = source.primary_configuration().map(|c| c.name.clone());

    let ip_configurations = source
        .ip_configurations
        .iter()
        .map(|config| {
            if let Some(public_ip) = &config.public_ip_id {
                warnings.push(format!(
                    "Public IP {} stays with the source NIC; attach a new one to {} if needed",
                    public_ip.name(),
                    name
                ));
            }
            if !config.load_balancer_inbound_nat_rule_ids.is_empty() {
                warnings.push(format!(
                    "{} inbound NAT rule(s) on {} were not copied; a NAT rule binds to one NIC",
                    config.load_balancer_inbound_nat_rule_ids.len(),
                    config.name
                ));
            }
            if config.allocation == IpAllocation::Static {
                warnings.push(format!(
                    "Static address {} on {} is reissued as dynamic",
                    config.private_address.as_deref().unwrap_or("(unknown)"),
                    config.name
                ));
            }

            NicIpConfigurationDefinition {
                name: config.name.clone(),
                primary: primary_name.as_deref() == Some(config.name.as_str()),
                allocation: IpAllocation::Dynamic,
                address_version: config.address_version.clone(),
                subnet_id: config.subnet_id.clone(),
                load_balancer_backend_pool_ids: config.load_balancer_backend_pool_ids.clone(),
                application_security_group_ids: config.application_security_group_ids.clone(),
            }
        })
        .collect::<Vec<_>>();

    debug!(
        nic = %name,
        ip_configurations = ip_configurations.len(),
        dropped = warnings.len(),
        "Built replica NIC definition"
    );

    let definition = NicDefinition {
        name: name.to_string(),
        location: location.to_string(),
        ip_configurations,
        dns_servers: source.dns_servers.clone(),
        accelerated_networking: source.accelerated_networking,
        ip_forwarding: source.ip_forwarding,
        nsg_id: source.nsg_id.clone(),
        tags: source.tags.clone(),
    };

    (definition, warnings)
}
