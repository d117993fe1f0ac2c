//! Migration policy and tuning configuration

use crate::backoff::Backoff;
use crate::error::{OrchestratorError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default timeout for disk, NIC and instance provisioning
const DEFAULT_OPERATION_TIMEOUT_SECS: u64 = 1800; // 30 minutes

/// Default timeout for snapshots and restore points
const DEFAULT_COPY_TIMEOUT_SECS: u64 = 7200; // 2 hours

/// Default attempt ceiling for disk creation
const DEFAULT_CREATE_ATTEMPTS: u32 = 3;

/// Default delay between disk creation attempts
const DEFAULT_CREATE_RETRY_DELAY_SECS: u64 = 10;

/// How the point-in-time copy of the source storage is taken
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CopyStrategy {
    /// One incremental snapshot per disk
    #[default]
    Snapshot,
    /// One crash-consistent restore point covering every disk
    RestorePoint,
}

/// What to do when the placement group cannot accept the replica
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlacementPolicy {
    /// Abort before any mutation
    #[default]
    Strict,
    /// Create the replica outside the group and report a warning
    SkipWithWarning,
}

/// Where the replica may live relative to the source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScopePolicy {
    /// Replica must go to a different resource group
    RequireDifferentGroup,
    /// Same resource group is fine as long as the replica name differs
    #[default]
    AllowSameGroupWithNewName,
}

/// Configuration for a migration run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationConfig {
    /// Point-in-time copy strategy
    pub copy_strategy: CopyStrategy,

    /// Placement group incompatibility policy
    pub placement_policy: PlacementPolicy,

    /// Source/target scope policy
    pub scope_policy: ScopePolicy,

    /// Maximum data disks provisioned concurrently (1 = sequential)
    pub disk_parallelism: usize,

    /// Timeout for disk, NIC and instance provisioning
    #[serde(with = "secs")]
    pub operation_timeout: Duration,

    /// Timeout for snapshots and restore points
    #[serde(with = "secs")]
    pub copy_timeout: Duration,

    /// Poll delay schedule
    pub poll_backoff: Backoff,

    /// Attempt ceiling for disk creation
    pub create_attempts: u32,

    /// Delay between disk creation attempts
    #[serde(with = "secs")]
    pub create_retry_delay: Duration,

    /// Suffix appended to replica disk and NIC names (default `-z{zone}`)
    pub name_suffix: Option<String>,

    /// Minutes of instant access requested for fast-readable snapshots
    pub instant_access_minutes: u32,

    /// Log every mutating action instead of performing it
    pub what_if: bool,

    /// Keep snapshots / restore points after the replica is created
    pub keep_copies: bool,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            copy_strategy: CopyStrategy::default(),
            placement_policy: PlacementPolicy::default(),
            scope_policy: ScopePolicy::default(),
            disk_parallelism: 1,
            operation_timeout: Duration::from_secs(DEFAULT_OPERATION_TIMEOUT_SECS),
            copy_timeout: Duration::from_secs(DEFAULT_COPY_TIMEOUT_SECS),
            poll_backoff: Backoff::polling(),
            create_attempts: DEFAULT_CREATE_ATTEMPTS,
            create_retry_delay: Duration::from_secs(DEFAULT_CREATE_RETRY_DELAY_SECS),
            name_suffix: None,
            instant_access_minutes: 60,
            what_if: false,
            keep_copies: false,
        }
    }
}

impl MigrationConfig {
    /// Load a JSON configuration file; missing fields take their defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that cannot work
    pub fn validate(&self) -> Result<()> {
        if self.disk_parallelism == 0 {
            return Err(OrchestratorError::config("disk_parallelism must be at least 1"));
        }
        if self.create_attempts == 0 {
            return Err(OrchestratorError::config("create_attempts must be at least 1"));
        }
        if self.operation_timeout.is_zero() || self.copy_timeout.is_zero() {
            return Err(OrchestratorError::config("timeouts must be greater than zero"));
        }
        if self.poll_backoff.base.is_zero() || self.poll_backoff.cap.is_zero() {
            return Err(OrchestratorError::config(
                "poll_backoff base and cap must be greater than zero",
            ));
        }
        if self.poll_backoff.cap < self.poll_backoff.base {
            return Err(OrchestratorError::config("poll_backoff cap must not be below its base"));
        }
        Ok(())
    }

    /// Set copy strategy
    pub fn with_copy_strategy(mut self, strategy: CopyStrategy) -> Self {
        self.copy_strategy = strategy;
        self
    }

    /// Set placement policy
    pub fn with_placement_policy(mut self, policy: PlacementPolicy) -> Self {
        self.placement_policy = policy;
        self
    }

    /// Set scope policy
    pub fn with_scope_policy(mut self, policy: ScopePolicy) -> Self {
        self.scope_policy = policy;
        self
    }

    /// Set data disk parallelism
    pub fn with_disk_parallelism(mut self, parallelism: usize) -> Self {
        self.disk_parallelism = parallelism.max(1);
        self
    }

    /// Set provisioning timeout
    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }

    /// Set copy timeout
    pub fn with_copy_timeout(mut self, timeout: Duration) -> Self {
        self.copy_timeout = timeout;
        self
    }

    /// Set poll delay schedule
    pub fn with_poll_backoff(mut self, backoff: Backoff) -> Self {
        self.poll_backoff = backoff;
        self
    }

    /// Set disk creation retry policy
    pub fn with_create_retries(mut self, attempts: u32, delay: Duration) -> Self {
        self.create_attempts = attempts.max(1);
        self.create_retry_delay = delay;
        self
    }

    /// Set replica name suffix
    pub fn with_name_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.name_suffix = Some(suffix.into());
        self
    }

    /// Enable or disable what-if mode
    pub fn with_what_if(mut self, what_if: bool) -> Self {
        self.what_if = what_if;
        self
    }

    /// Keep copy artifacts after completion
    pub fn with_keep_copies(mut self, keep: bool) -> Self {
        self.keep_copies = keep;
        self
    }
}

mod secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(deserializer)?))
    }
}
