//! Placement group zone compatibility
//!
//! A placement group pins itself to physical hardware through its members:
//!
//! - any zonal member pins the group to that member's zone
//! - with no zonal member, a regional member that holds hardware pins the
//!   group to hardware of unknown zone
//! - stopped/deallocated regional members hold nothing
//!
//! The source instance is excluded since it is the one being relocated.
//! The decision depends only on the member set, never on member order.

use crate::error::{OrchestratorError, Result};
use rezone_core::{ComputeProvider, PlacementGroupFacts, PlacementMember, PowerState, ResourceId};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use tracing::{debug, warn};

/// Why a placement group can or cannot accept the replica
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum PlacementReason {
    /// No other member exists; the group is fully open
    NoMembers,
    /// Only stopped regional members exist; nothing is pinned
    OnlyReleasedRegionalMembers,
    /// Zonal members already live in the target zone
    PinnedToTargetZone(String),
    /// Zonal members live in another zone
    PinnedToOtherZone(String),
    /// Running regional members hold hardware of unknown zone
    BlockedByRunningRegional(Vec<String>),
}

impl fmt::Display for PlacementReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoMembers => write!(f, "no other members, group is open"),
            Self::OnlyReleasedRegionalMembers => {
                write!(f, "only deallocated regional members, group is open")
            }
            Self::PinnedToTargetZone(zone) => write!(f, "pinned to zone {}", zone),
            Self::PinnedToOtherZone(zone) => write!(f, "pinned to zone {}", zone),
            Self::BlockedByRunningRegional(names) => write!(
                f,
                "blocked by running regional member(s) {}; deallocate them or move them first",
                names.join(", ")
            ),
        }
    }
}

/// Outcome of the placement check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum PlacementDecision {
    /// Source instance is not in a placement group
    NotApplicable,
    /// Replica may join the group
    Compatible {
        /// Placement group id
        group: ResourceId,
        /// Why joining is safe
        reason: PlacementReason,
    },
    /// Replica must not join the group
    Incompatible {
        /// Placement group id
        group: ResourceId,
        /// What blocks the target zone
        reason: PlacementReason,
    },
}

impl PlacementDecision {
    /// Group to assign to the replica, if any
    pub fn group_to_use(&self) -> Option<&ResourceId> {
        match self {
            Self::Compatible { group, .. } => Some(group),
            _ => None,
        }
    }

    /// The replica cannot join the group in the target zone
    pub fn is_incompatible(&self) -> bool {
        matches!(self, Self::Incompatible { .. })
    }
}

impl fmt::Display for PlacementDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotApplicable => write!(f, "no placement group"),
            Self::Compatible { group, reason } => {
                write!(f, "use placement group {} ({})", group.name(), reason)
            }
            Self::Incompatible { group, reason } => {
                write!(f, "cannot use placement group {} ({})", group.name(), reason)
            }
        }
    }
}

/// Zonal members of the group disagree about their zone
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InconsistentPlacement {
    /// Placement group id
    pub group: ResourceId,
    /// Distinct zones the members report
    pub zones: Vec<String>,
}

impl fmt::Display for InconsistentPlacement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "placement group {} has zonal members in zones {}; provider state is inconsistent",
            self.group.name(),
            self.zones.join(", ")
        )
    }
}

/// Decide whether the group can accept a member in `target_zone`
pub fn resolve(
    facts: &PlacementGroupFacts,
    source_vm: &ResourceId,
    target_zone: &str,
) -> std::result::Result<PlacementDecision, InconsistentPlacement> {
    let group = facts.group_id.clone();
    let others: Vec<&PlacementMember> = facts
        .members
        .iter()
        .filter(|m| !m.id.matches(source_vm))
        .collect();

    if others.is_empty() {
        return Ok(PlacementDecision::Compatible {
            group,
            reason: PlacementReason::NoMembers,
        });
    }

    let zones: BTreeSet<&str> = others.iter().filter_map(|m| m.zone.as_deref()).collect();

    if zones.len() > 1 {
        return Err(InconsistentPlacement {
            group,
            zones: zones.into_iter().map(String::from).collect(),
        });
    }

    if let Some(pinned) = zones.into_iter().next() {
        return Ok(if pinned == target_zone {
            PlacementDecision::Compatible {
                group,
                reason: PlacementReason::PinnedToTargetZone(pinned.to_string()),
            }
        } else {
            PlacementDecision::Incompatible {
                group,
                reason: PlacementReason::PinnedToOtherZone(pinned.to_string()),
            }
        });
    }

    let mut running: Vec<String> = others
        .iter()
        .filter(|m| m.power_state.holds_hardware())
        .map(|m| m.name.clone())
        .collect();
    running.sort();

    Ok(if running.is_empty() {
        PlacementDecision::Compatible {
            group,
            reason: PlacementReason::OnlyReleasedRegionalMembers,
        }
    } else {
        PlacementDecision::Incompatible {
            group,
            reason: PlacementReason::BlockedByRunningRegional(running),
        }
    })
}

/// Read a placement group and the zone/power state of every member
pub async fn gather_placement_facts(
    provider: &dyn ComputeProvider,
    group_id: &ResourceId,
) -> Result<PlacementGroupFacts> {
    let group = provider
        .get_placement_group(group_id)
        .await?
        .ok_or_else(|| OrchestratorError::source_not_found(group_id.to_string()))?;

    let mut members = Vec::with_capacity(group.member_ids.len());
    for member_id in &group.member_ids {
        match provider.get_vm_by_id(member_id).await? {
            Some(vm) => members.push(PlacementMember {
                id: vm.id,
                name: vm.name,
                zone: vm.zone,
                power_state: vm.power_state,
            }),
            None => {
                // Listed but unreadable: assume it holds hardware
                warn!(member = %member_id, "Placement group member not found");
                members.push(PlacementMember {
                    id: member_id.clone(),
                    name: member_id.name().to_string(),
                    zone: None,
                    power_state: PowerState::Unknown,
                });
            }
        }
    }

    debug!(group = %group.name, members = members.len(), "Gathered placement group facts");

    Ok(PlacementGroupFacts {
        group_id: group.id,
        members,
    })
}
