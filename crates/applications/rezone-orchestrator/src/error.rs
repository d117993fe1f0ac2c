//! Error types for the orchestrator

use crate::orchestrator::MigrationStage;
use crate::provisioner::DiskProvisionRecord;
use crate::validator::ValidationReport;
use rezone_core::{OperationStatus, ProviderError, ResourceId};
use std::time::Duration;
use thiserror::Error;

/// Orchestrator result type
pub type Result<T> = std::result::Result<T, OrchestratorError>;

/// Errors that can occur in the orchestrator
#[derive(Error, Debug)]
pub enum OrchestratorError {
    /// Pre-flight rules rejected the migration; nothing was mutated
    #[error("{0}")]
    Validation(ValidationReport),

    /// Structural mismatch that cannot be resolved automatically
    #[error("Placement group {group} cannot accept a member in zone {zone}: {reason}")]
    Incompatibility {
        /// Placement group id
        group: ResourceId,
        /// Requested target zone
        zone: String,
        /// Human-actionable reason
        reason: String,
    },

    /// A resource the migration intended to create already exists
    #[error("Resource {resource} already exists; refusing to create a duplicate")]
    Conflict {
        /// Name or id of the existing resource
        resource: String,
    },

    /// A create call kept failing
    #[error("Provisioning {resource} failed after {attempts} attempt(s): {source}")]
    Provisioning {
        /// Resource being created
        resource: String,
        /// Attempts made, including the last one
        attempts: u32,
        /// Last underlying provider error
        #[source]
        source: ProviderError,
    },

    /// A long-running operation reached a terminal failure state
    #[error("Operation on {resource} ended in state {status}")]
    OperationFailed {
        /// Resource being polled
        resource: String,
        /// Last observed status
        status: OperationStatus,
    },

    /// A long-running operation did not finish in time
    #[error("Timed out after {timeout:?} waiting for {resource} (last state: {last_status})")]
    Timeout {
        /// Resource being polled
        resource: String,
        /// Configured timeout
        timeout: Duration,
        /// Last observed status
        last_status: OperationStatus,
    },

    /// One or more disks failed during fan-out provisioning
    #[error("Disk provisioning failed:\n{}", format_records(.0))]
    DiskProvisioning(Vec<DiskProvisionRecord>),

    /// Point-in-time capture failed after some copy artifacts were created
    #[error("Capture failed with {} copy artifact(s) left behind: {source}", .created.len())]
    CaptureFailed {
        /// Snapshots or restore point collection created before the failure
        created: Vec<ResourceId>,
        /// Underlying failure
        #[source]
        source: Box<OrchestratorError>,
    },

    /// No point-in-time copy handle exists for a disk
    #[error("No point-in-time copy is available for disk {0}")]
    MissingCopy(String),

    /// A source resource could not be found
    #[error("Source resource not found: {0}")]
    SourceNotFound(String),

    /// Failure after resources were already created
    #[error(
        "Migration stopped during {stage}: {source}\nResources already created: {}",
        format_created(.created)
    )]
    Interrupted {
        /// Stage that failed
        stage: MigrationStage,
        /// Resources created before the failure
        created: Vec<ResourceId>,
        /// Underlying failure
        #[source]
        source: Box<OrchestratorError>,
    },

    /// Provider error outside of a retried create
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl OrchestratorError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a conflict error
    pub fn conflict(resource: impl Into<String>) -> Self {
        Self::Conflict {
            resource: resource.into(),
        }
    }

    /// Create a source-not-found error
    pub fn source_not_found(resource: impl Into<String>) -> Self {
        Self::SourceNotFound(resource.into())
    }

    /// The error was raised before anything was mutated
    pub fn is_pre_mutation(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::Incompatibility { .. } | Self::SourceNotFound(_)
        )
    }

    /// Wrap a capture failure with the artifacts created before it
    pub fn capture_failed(created: Vec<ResourceId>, source: OrchestratorError) -> Self {
        if created.is_empty() {
            source
        } else {
            Self::CaptureFailed {
                created,
                source: Box::new(source),
            }
        }
    }

    /// Unwrap `Interrupted` and `CaptureFailed` down to the underlying failure
    pub fn root(&self) -> &OrchestratorError {
        match self {
            Self::Interrupted { source, .. } | Self::CaptureFailed { source, .. } => source.root(),
            other => other,
        }
    }
}

fn format_records(records: &[DiskProvisionRecord]) -> String {
    records
        .iter()
        .map(|r| format!("  {}", r))
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_created(created: &[ResourceId]) -> String {
    if created.is_empty() {
        "none".to_string()
    } else {
        created
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}
