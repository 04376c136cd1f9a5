//! Module dependency resolver
//!
//! This crate models engine build descriptors as data and resolves them:
//! - Module and target descriptors (modules.toml / JSON)
//! - Platform rules keyed by a closed platform set, with an explicit default
//! - Per-platform resolution into ordered, deduplicated build plans
//! - Cycle detection over in-set dependencies; unknown names stay opaque
//! - Snapshot-and-swap descriptor store for concurrent resolution
//! - Checksummed plan files for the external build tool

pub mod descriptor;
pub mod paths;
pub mod planfile;
pub mod platform;
pub mod resolver;
pub mod store;
pub mod target;

pub use descriptor::{
    load_descriptors, DescriptorError, DescriptorFile, DescriptorSet, FrameworkRef, FrameworkSpec,
    ModuleDescriptor, PchUsage, PlatformRule, ProjectInfo, RawModule, RawRule, ReceiptProperty,
};
pub use paths::{PathContext, PathError};
pub use planfile::{PlanFile, PlanFileError, PLANFILE_VERSION};
pub use platform::{Platform, PlatformSelector, TargetType, UnknownPlatform, UnknownTargetType};
pub use resolver::{resolve, ModuleResolver, ResolveError, ResolvedPlan, TargetRequest};
pub use store::DescriptorStore;
pub use target::{resolve_target, RawTarget, TargetDescriptor, TargetPlan};
