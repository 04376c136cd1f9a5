//! Target descriptors
//!
//! A target names a configuration kind and the modules it builds. Resolving
//! a target resolves each of its modules with the target's configuration.

use crate::descriptor::{DescriptorError, DescriptorSet};
use crate::platform::{Platform, TargetType};
use crate::resolver::{resolve, ResolveError, ResolvedPlan, TargetRequest};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A target record before validation
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RawTarget {
    pub name: String,

    #[serde(rename = "type", default)]
    pub target_type: TargetType,

    /// Build settings version, e.g. "V2"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_settings: Option<String>,

    /// Include order version, e.g. "Unreal5_1"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_order: Option<String>,

    /// Modules built by the target
    #[serde(default)]
    pub modules: Vec<String>,
}

/// A validated target descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetDescriptor {
    pub name: String,
    pub target_type: TargetType,
    pub build_settings: Option<String>,
    pub include_order: Option<String>,
    pub modules: Vec<String>,
}

impl TargetDescriptor {
    pub(crate) fn from_raw(raw: RawTarget) -> Result<Self, DescriptorError> {
        if raw.name.is_empty() {
            return Err(DescriptorError::ValidationError(
                "Target name cannot be empty".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        let mut modules = Vec::with_capacity(raw.modules.len());
        for module in raw.modules {
            if module.trim().is_empty() {
                return Err(DescriptorError::ValidationError(format!(
                    "Target {} lists an empty module name",
                    raw.name
                )));
            }
            if seen.insert(module.clone()) {
                modules.push(module);
            }
        }

        Ok(Self {
            name: raw.name,
            target_type: raw.target_type,
            build_settings: raw.build_settings,
            include_order: raw.include_order,
            modules,
        })
    }
}

/// Plans for every module of a target on one platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetPlan {
    pub target: String,
    pub platform: Platform,
    pub configuration: TargetType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_settings: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_order: Option<String>,
    pub modules: Vec<ResolvedPlan>,
}

impl TargetPlan {
    /// Dependencies of all modules merged, first occurrence kept
    pub fn dependencies(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.modules
            .iter()
            .flat_map(|plan| plan.dependencies.iter())
            .map(String::as_str)
            .filter(|name| seen.insert(*name))
            .collect()
    }

    /// Plan of one of the target's modules
    pub fn module(&self, name: &str) -> Option<&ResolvedPlan> {
        self.modules.iter().find(|plan| plan.module == name)
    }
}

/// Resolve every module of a target for a platform
///
/// Modules named by a target must be present in the set; they are never
/// treated as opaque.
pub fn resolve_target(
    set: &DescriptorSet,
    target_name: &str,
    platform: Platform,
) -> Result<TargetPlan, ResolveError> {
    let target = set
        .target(target_name)
        .ok_or_else(|| ResolveError::TargetNotFound(target_name.to_string()))?;

    let modules = target
        .modules
        .iter()
        .map(|module| {
            let request = TargetRequest::new(module.as_str(), platform)
                .with_configuration(target.target_type);
            resolve(set, &request)
        })
        .collect::<Result<Vec<_>, _>>()?;

    log::debug!(
        "Resolved target {} ({}) for {}: {} module(s)",
        target.name,
        target.target_type,
        platform,
        modules.len()
    );

    Ok(TargetPlan {
        target: target.name.clone(),
        platform,
        configuration: target.target_type,
        build_settings: target.build_settings.clone(),
        include_order: target.include_order.clone(),
        modules,
    })
}
