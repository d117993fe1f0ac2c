//! # Rezone Orchestrator
//!
//! Relocates a regional compute instance into an availability zone by
//! replicating it: the source is stopped, its disks are copied point-in-time,
//! zone-pinned disks and a fresh NIC are created from the copies, and a new
//! zonal instance is assembled from them.
//!
//! ## Architecture
//!
//! ```text
//! MigrationOrchestrator
//! ├── CompatibilityValidator   every rule, one aggregated report
//! │   └── placement::resolve   placement group zone pinning
//! ├── quiesce                  deallocate + poll
//! ├── PointInTimeCapture       snapshots | restore point
//! ├── ZonalDiskProvisioner     OS disk first, bounded data-disk fan-out
//! ├── network                  replica NIC, dynamic addressing
//! └── build_instance           attach everything in the target zone
//!           │
//!           ▼
//!    dyn ComputeProvider  ──  ArmClient (REST) | InMemoryProvider (tests)
//! ```
//!
//! ## Guarantees
//!
//! 1. **Nothing is mutated until validation passes**: every violation is
//!    reported at once.
//! 2. **Re-runs converge**: a replica disk or NIC left by an interrupted run
//!    is reused, never duplicated.
//! 3. **The source is never destroyed**: it is left deallocated.
//!
//! See [`orchestrator`] for the stage machine and [`validator`] for the rules.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod arm;
pub mod backoff;
pub mod config;
pub mod error;
pub mod mock;
pub mod naming;
pub mod network;
pub mod orchestrator;
pub mod placement;
pub mod poller;
pub mod provisioner;
pub mod snapshot;
pub mod validator;

// ============================================================================
// Public exports - Migration API
// ============================================================================

// Orchestration
pub use orchestrator::{MigrationOrchestrator, MigrationResult, MigrationStage};

// Validation
pub use validator::{
    CompatibilityValidator, MigrationPlan, MigrationRequest, ValidationReport, Violation,
    ViolationKind,
};

// Configuration
pub use config::{CopyStrategy, MigrationConfig, PlacementPolicy, ScopePolicy};

// Error handling
pub use error::{OrchestratorError, Result};

// ============================================================================
// Public exports - Building blocks
// ============================================================================

// Point-in-time copies
pub use snapshot::{
    PointInTimeCapture, PointInTimeCopy, RestorePointCapture, RestorePointCopy, SnapshotCapture,
    SnapshotSet,
};

// Disk provisioning
pub use provisioner::{DiskOutcome, DiskPlan, DiskProvisionRecord, ZonalDiskProvisioner};

// Placement groups
pub use placement::{PlacementDecision, PlacementReason};

// Long-running operations
pub use backoff::Backoff;
pub use poller::{OperationPoller, Readiness};

// Providers
pub use arm::ArmClient;
pub use mock::InMemoryProvider;
