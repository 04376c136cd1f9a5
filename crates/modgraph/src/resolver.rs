//! Dependency resolution
//!
//! Flattens one module's public, private and platform-specific inputs into a
//! [`ResolvedPlan`] and checks the in-set dependency graph below it for cycles.
//! Names that are not in the descriptor set are opaque leaves: they appear in
//! the plan but are never expanded.

use crate::descriptor::{DescriptorSet, FrameworkRef, PchUsage, ReceiptProperty};
use crate::platform::{Platform, PlatformSelector, TargetType};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use thiserror::Error;

/// Errors that can occur during resolution
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// Requested module is not in the descriptor set
    #[error("Module not found: {module} (platform {platform})")]
    ModuleNotFound { module: String, platform: Platform },

    /// The dependency graph loops back on itself
    #[error("Cyclic dependency on {platform}: {}", format_cycle(.cycle))]
    CyclicDependency {
        /// Modules on the cycle, starting at the first repeated one
        cycle: Vec<String>,
        platform: Platform,
    },

    /// Requested target is not in the descriptor set
    #[error("Target not found: {0}")]
    TargetNotFound(String),
}

impl ResolveError {
    /// Module the error is about, if any
    pub fn module(&self) -> Option<&str> {
        match self {
            ResolveError::ModuleNotFound { module, .. } => Some(module.as_str()),
            ResolveError::CyclicDependency { cycle, .. } => cycle.first().map(String::as_str),
            ResolveError::TargetNotFound(_) => None,
        }
    }
}

/// Formats a cycle as `A -> B -> C -> A`
fn format_cycle(cycle: &[String]) -> String {
    let mut path = cycle.join(" -> ");
    if let Some(first) = cycle.first() {
        path.push_str(" -> ");
        path.push_str(first);
    }
    path
}

/// What to resolve: a module on a platform for a configuration kind
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetRequest {
    pub module: String,
    pub platform: Platform,
    #[serde(default)]
    pub configuration: TargetType,
}

impl TargetRequest {
    /// Create a request for the default (game) configuration
    pub fn new(module: impl Into<String>, platform: Platform) -> Self {
        Self {
            module: module.into(),
            platform,
            configuration: TargetType::default(),
        }
    }

    /// Set the configuration kind
    pub fn with_configuration(mut self, configuration: TargetType) -> Self {
        self.configuration = configuration;
        self
    }
}

/// Flattened build inputs for one (module, platform, configuration)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedPlan {
    pub module: String,
    pub platform: Platform,
    pub configuration: TargetType,
    pub pch_usage: PchUsage,

    /// Direct dependencies in declaration order, duplicates removed
    pub dependencies: Vec<String>,

    /// In-set modules reachable from this one, dependencies first
    #[serde(default)]
    pub build_order: Vec<String>,

    #[serde(default)]
    pub include_paths: BTreeSet<String>,

    #[serde(default)]
    pub frameworks: BTreeSet<FrameworkRef>,

    /// Receipt properties in rule order; duplicate keys are all kept
    #[serde(default)]
    pub receipt_properties: Vec<ReceiptProperty>,
}

impl ResolvedPlan {
    pub fn has_dependency(&self, name: &str) -> bool {
        self.dependencies.iter().any(|dep| dep == name)
    }

    pub fn framework_names(&self) -> Vec<&str> {
        self.frameworks.iter().map(|f| f.name.as_str()).collect()
    }

    /// Frameworks that ship as an archive with the module
    pub fn bundled_frameworks(&self) -> impl Iterator<Item = &FrameworkRef> {
        self.frameworks.iter().filter(|f| f.archive.is_some())
    }

    /// Values of every receipt property with the given key, in order
    pub fn receipt_values(&self, key: &str) -> Vec<&str> {
        self.receipt_properties
            .iter()
            .filter(|prop| prop.key == key)
            .map(|prop| prop.value.as_str())
            .collect()
    }
}

/// Resolve a module for a platform and configuration
pub fn resolve(
    set: &DescriptorSet,
    request: &TargetRequest,
) -> Result<ResolvedPlan, ResolveError> {
    ModuleResolver::new(set, request.platform, request.configuration).resolve(&request.module)
}

/// Add a framework unless one of the same name is already present
///
/// A bundled archive replaces a system framework of the same name.
fn add_framework(frameworks: &mut BTreeSet<FrameworkRef>, framework: FrameworkRef) {
    match frameworks.iter().find(|f| f.name == framework.name).cloned() {
        None => {
            frameworks.insert(framework);
        }
        Some(existing) if existing.archive.is_none() && framework.archive.is_some() => {
            frameworks.remove(&existing);
            frameworks.insert(framework);
        }
        Some(_) => {}
    }
}

/// Per-module visitation state during cycle detection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VisitState {
    InProgress,
    Done,
}

/// Resolver bound to one platform and configuration
///
/// Holds only the visitation state of a single resolution; the descriptor
/// set is borrowed read-only.
pub struct ModuleResolver<'a> {
    set: &'a DescriptorSet,
    platform: Platform,
    configuration: TargetType,
    states: HashMap<&'a str, VisitState>,
    stack: Vec<&'a str>,
    order: Vec<String>,
}

impl<'a> ModuleResolver<'a> {
    pub fn new(set: &'a DescriptorSet, platform: Platform, configuration: TargetType) -> Self {
        Self {
            set,
            platform,
            configuration,
            states: HashMap::new(),
            stack: Vec::new(),
            order: Vec::new(),
        }
    }

    /// Resolve a module into a plan
    pub fn resolve(mut self, name: &str) -> Result<ResolvedPlan, ResolveError> {
        let set = self.set;
        let module = set.get(name).ok_or_else(|| ResolveError::ModuleNotFound {
            module: name.to_string(),
            platform: self.platform,
        })?;

        let mut seen: HashSet<&str> = HashSet::new();
        let mut dependencies = Vec::new();
        for dep in module
            .public_dependencies
            .iter()
            .chain(module.private_dependencies.iter())
        {
            if seen.insert(dep) {
                dependencies.push(dep.clone());
            }
        }

        let mut include_paths: BTreeSet<String> = module
            .public_include_paths
            .union(&module.private_include_paths)
            .cloned()
            .collect();
        let mut frameworks = BTreeSet::new();
        for framework in &module.public_frameworks {
            add_framework(&mut frameworks, framework.clone());
        }
        let mut receipt_properties = Vec::new();

        if !module.has_rules_for(self.platform)
            && module.rules.contains_key(&PlatformSelector::Default)
        {
            log::warn!(
                "{} has no rules for {}, using its default rules",
                module.name,
                self.platform
            );
        }

        for rule in module.matching_rules(self.platform, self.configuration) {
            log::debug!(
                "Applying {} rule to {} ({} dependencies, {} receipt properties)",
                rule.selector,
                module.name,
                rule.dependencies.len(),
                rule.receipt.len()
            );

            for dep in &rule.dependencies {
                if seen.insert(dep) {
                    dependencies.push(dep.clone());
                }
            }
            include_paths.extend(rule.include_paths.iter().cloned());
            for framework in &rule.frameworks {
                add_framework(&mut frameworks, framework.clone());
            }
            receipt_properties.extend(rule.receipt.iter().cloned());
        }

        self.visit(&module.name)?;

        // The root is finished last; build order covers what it depends on.
        let mut build_order = std::mem::take(&mut self.order);
        if build_order.last().is_some_and(|last| *last == module.name) {
            build_order.pop();
        }

        log::debug!(
            "Resolved {} for {} ({}): {} dependencies, {} in-set",
            module.name,
            self.platform,
            self.configuration,
            dependencies.len(),
            build_order.len()
        );

        Ok(ResolvedPlan {
            module: module.name.clone(),
            platform: self.platform,
            configuration: self.configuration,
            pch_usage: module.pch_usage,
            dependencies,
            build_order,
            include_paths,
            frameworks,
            receipt_properties,
        })
    }

    /// Depth-first walk over in-set dependencies
    fn visit(&mut self, name: &'a str) -> Result<(), ResolveError> {
        match self.states.get(name) {
            Some(VisitState::Done) => return Ok(()),
            Some(VisitState::InProgress) => {
                let start = self
                    .stack
                    .iter()
                    .position(|entry| *entry == name)
                    .unwrap_or(0);
                return Err(ResolveError::CyclicDependency {
                    cycle: self.stack[start..].iter().map(|s| s.to_string()).collect(),
                    platform: self.platform,
                });
            }
            None => {}
        }

        // Opaque leaf, supplied by the host toolchain
        let Some(module) = self.set.get(name) else {
            return Ok(());
        };

        self.states.insert(name, VisitState::InProgress);
        self.stack.push(name);

        for dep in module.dependencies_for(self.platform, self.configuration) {
            self.visit(dep)?;
        }

        self.stack.pop();
        self.states.insert(name, VisitState::Done);
        self.order.push(name.to_string());
        Ok(())
    }
}
