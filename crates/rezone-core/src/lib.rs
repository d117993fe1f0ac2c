//! Rezone Core - Shared types and traits
//!
//! This crate defines the abstractions shared by the orchestrator and every
//! provider backend:
//! - Resource descriptors captured from the source instance (disks, NIC,
//!   placement group members, SKU catalog)
//! - Definitions submitted when creating replica resources
//! - The `ComputeProvider` trait (the only way the orchestrator talks to a cloud)
//! - Provider error types

pub mod definitions;
pub mod error;
pub mod traits;
pub mod types;

pub use definitions::*;
pub use error::*;
pub use traits::*;
pub use types::*;
