//! Rezone - move a regional instance into an availability zone
//!
//! ## Usage
//!
//! ```bash
//! export AZURE_SUBSCRIPTION_ID=...
//! export AZURE_ACCESS_TOKEN=$(az account get-access-token --query accessToken -o tsv)
//!
//! # Check every rule without touching anything
//! rezone validate --resource-group rg-app --vm app01 --zone 2 --target-resource-group rg-app-z2
//!
//! # Print the actions a move would take
//! rezone move --resource-group rg-app --vm app01 --zone 2 --target-name app01-z2 --what-if
//!
//! # Move for real, keeping the snapshots for inspection
//! rezone move --resource-group rg-app --vm app01 --zone 2 --target-name app01-z2 --keep-copies
//! ```

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use rezone_orchestrator::{
    ArmClient, CompatibilityValidator, CopyStrategy, MigrationConfig, MigrationOrchestrator,
    MigrationRequest, OrchestratorError, PlacementPolicy, ScopePolicy,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Rezone: relocate a regional instance into an availability zone
#[derive(Parser)]
#[command(name = "rezone")]
#[command(about = "Replicate a regional instance into an availability zone", long_about = None)]
struct Cli {
    /// Subscription that owns the source instance
    #[arg(long, global = true, env = "AZURE_SUBSCRIPTION_ID")]
    subscription: Option<String>,

    /// Bearer token for the management API
    #[arg(long, global = true, env = "AZURE_ACCESS_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Management endpoint
    #[arg(
        long,
        global = true,
        env = "AZURE_RESOURCE_MANAGER_ENDPOINT",
        default_value = rezone_orchestrator::arm::DEFAULT_ENDPOINT
    )]
    endpoint: String,

    /// Migration config file (JSON); flags override it
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every compatibility rule and report all violations
    Validate {
        #[command(flatten)]
        target: TargetArgs,
    },

    /// Replicate the instance into the target zone
    Move {
        #[command(flatten)]
        target: TargetArgs,

        /// Report the planned actions without mutating anything
        #[arg(long)]
        what_if: bool,

        /// Keep snapshots / restore points after a successful move
        #[arg(long)]
        keep_copies: bool,

        /// Data disks provisioned concurrently
        #[arg(long)]
        disk_parallelism: Option<usize>,
    },
}

#[derive(Args)]
struct TargetArgs {
    /// Resource group of the source instance
    #[arg(long, short = 'g')]
    resource_group: String,

    /// Source instance name
    #[arg(long)]
    vm: String,

    /// Target availability zone (1, 2 or 3)
    #[arg(long, short = 'z')]
    zone: String,

    /// Resource group for the replica (default: source resource group)
    #[arg(long)]
    target_resource_group: Option<String>,

    /// Replica instance name (default: source name)
    #[arg(long)]
    target_name: Option<String>,

    /// Instance size for the replica (default: source size)
    #[arg(long)]
    vm_size: Option<String>,

    /// Storage SKU for the replica OS disk
    #[arg(long)]
    os_disk_sku: Option<String>,

    /// Storage SKU for every replica data disk
    #[arg(long)]
    data_disk_sku: Option<String>,

    /// Point-in-time copy strategy
    #[arg(long, value_enum)]
    copy_strategy: Option<CopyStrategyArg>,

    /// Placement group handling when the group is pinned elsewhere
    #[arg(long, value_enum)]
    placement_policy: Option<PlacementPolicyArg>,

    /// Allow the replica in the source resource group under a new name
    #[arg(long, value_enum)]
    scope_policy: Option<ScopePolicyArg>,
}

#[derive(Clone, Copy, ValueEnum)]
enum CopyStrategyArg {
    Snapshot,
    RestorePoint,
}

#[derive(Clone, Copy, ValueEnum)]
enum PlacementPolicyArg {
    Strict,
    SkipWithWarning,
}

#[derive(Clone, Copy, ValueEnum)]
enum ScopePolicyArg {
    RequireDifferentGroup,
    AllowSameGroupWithNewName,
}

impl TargetArgs {
    fn request(&self) -> MigrationRequest {
        let mut request = MigrationRequest::new(&self.resource_group, &self.vm, &self.zone);
        if let Some(rg) = &self.target_resource_group {
            request = request.with_target_resource_group(rg);
        }
        if let Some(name) = &self.target_name {
            request = request.with_target_vm_name(name);
        }
        if let Some(size) = &self.vm_size {
            request = request.with_vm_size(size);
        }
        if let Some(sku) = &self.os_disk_sku {
            request = request.with_os_disk_sku(sku);
        }
        if let Some(sku) = &self.data_disk_sku {
            request = request.with_data_disk_sku(sku);
        }
        request
    }

    fn apply(&self, mut config: MigrationConfig) -> MigrationConfig {
        if let Some(strategy) = self.copy_strategy {
            config = config.with_copy_strategy(match strategy {
                CopyStrategyArg::Snapshot => CopyStrategy::Snapshot,
                CopyStrategyArg::RestorePoint => CopyStrategy::RestorePoint,
            });
        }
        if let Some(policy) = self.placement_policy {
            config = config.with_placement_policy(match policy {
                PlacementPolicyArg::Strict => PlacementPolicy::Strict,
                PlacementPolicyArg::SkipWithWarning => PlacementPolicy::SkipWithWarning,
            });
        }
        if let Some(policy) = self.scope_policy {
            config = config.with_scope_policy(match policy {
                ScopePolicyArg::RequireDifferentGroup => ScopePolicy::RequireDifferentGroup,
                ScopePolicyArg::AllowSameGroupWithNewName => ScopePolicy::AllowSameGroupWithNewName,
            });
        }
        config
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "rezone=info,rezone_orchestrator=info,warn".into());
    if cli.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    let base_config = match &cli.config {
        Some(path) => MigrationConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => MigrationConfig::default(),
    };

    let subscription = cli
        .subscription
        .clone()
        .ok_or_else(|| anyhow::anyhow!("--subscription or AZURE_SUBSCRIPTION_ID required"))?;
    let token = cli
        .token
        .clone()
        .ok_or_else(|| anyhow::anyhow!("--token or AZURE_ACCESS_TOKEN required"))?;
    let provider = Arc::new(ArmClient::new(subscription, token)?.with_endpoint(&cli.endpoint));

    match cli.command {
        Commands::Validate { target } => {
            let config = target.apply(base_config);
            config.validate()?;
            validate(provider, &config, &target.request(), cli.json).await
        }

        Commands::Move {
            target,
            what_if,
            keep_copies,
            disk_parallelism,
        } => {
            let mut config = target.apply(base_config);
            if what_if {
                config = config.with_what_if(true);
            }
            if keep_copies {
                config = config.with_keep_copies(true);
            }
            if let Some(n) = disk_parallelism {
                config = config.with_disk_parallelism(n);
            }
            config.validate()?;
            run_move(provider, config, &target.request(), cli.json).await
        }
    }
}

async fn validate(
    provider: Arc<ArmClient>,
    config: &MigrationConfig,
    request: &MigrationRequest,
    json: bool,
) -> anyhow::Result<()> {
    let validator = CompatibilityValidator::new(provider, config);

    match validator.validate(request).await {
        Ok(plan) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&plan)?);
                return Ok(());
            }

            println!(
                "{} can move to zone {} as {}/{} ({})",
                plan.source.vm.name,
                plan.target_zone,
                plan.target_resource_group,
                plan.target_vm_name,
                plan.vm_size
            );
            for disk in &plan.disks {
                println!(
                    "  {} {} -> {} ({})",
                    disk.role(),
                    disk.source.name,
                    disk.target_name,
                    disk.target_sku
                );
            }
            println!("  NIC -> {}", plan.nic_name);
            println!("  Placement: {}", plan.placement);
            for warning in &plan.warnings {
                println!("  warning: {}", warning);
            }
            Ok(())
        }
        Err(OrchestratorError::Validation(report)) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", report);
            }
            anyhow::bail!("{} violation(s)", report.len())
        }
        Err(e) => Err(e.into()),
    }
}

async fn run_move(
    provider: Arc<ArmClient>,
    config: MigrationConfig,
    request: &MigrationRequest,
    json: bool,
) -> anyhow::Result<()> {
    let orchestrator = MigrationOrchestrator::new(provider, config);
    let result = orchestrator.run_with_report(request).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print!("{}", result.summary());
    }

    if result.succeeded() {
        info!(vm = %result.target_vm_name, "Done");
        Ok(())
    } else {
        error!(stage = ?result.failed_stage, "Migration failed");
        anyhow::bail!("migration of {} failed", request.vm_name)
    }
}
