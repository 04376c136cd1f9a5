//! Module descriptors (modules.toml)
//!
//! Raw records are deserialized as-is and then validated into an immutable
//! [`DescriptorSet`]. Platform tokens are kept as strings in the raw form so
//! that an unsupported platform is reported as such instead of as a generic
//! parse failure.

use crate::paths::{PathContext, PathError};
use crate::platform::{Platform, PlatformSelector, TargetType};
use crate::target::{RawTarget, TargetDescriptor};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur while loading descriptors
#[derive(Debug, Error)]
pub enum DescriptorError {
    /// Failed to read descriptor file
    #[error("Failed to read descriptor file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse descriptors: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Failed to parse JSON
    #[error("Failed to parse descriptors: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Validation error
    #[error("Invalid descriptor: {0}")]
    ValidationError(String),

    /// Two descriptors share a name
    #[error("Duplicate module name: {0}")]
    DuplicateModuleName(String),

    /// A platform rule names a platform outside the supported set
    #[error("Module {module} has a rule for unknown platform '{token}'")]
    UnknownPlatform { module: String, token: String },

    /// A path could not be expanded
    #[error("Module {module}: {source}")]
    PathError {
        module: String,
        #[source]
        source: PathError,
    },
}

/// Precompiled header mode, carried through to the plan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PchUsage {
    #[default]
    ExplicitOrShared,
    Shared,
    NoPch,
}

/// Descriptor file contents (modules.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DescriptorFile {
    /// Project metadata
    #[serde(default)]
    pub project: ProjectInfo,

    /// Module records
    #[serde(default)]
    pub modules: Vec<RawModule>,

    /// Target records
    #[serde(default)]
    pub targets: Vec<RawTarget>,
}

/// Project metadata
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProjectInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Value of `$(ProjectDir)`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,
}

/// A module record before validation
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RawModule {
    pub name: String,

    /// Value of `$(ModuleDir)`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<String>,

    /// Value of `$(PluginDir)`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin_directory: Option<String>,

    #[serde(default)]
    pub pch_usage: PchUsage,

    #[serde(default)]
    pub public_dependencies: Vec<String>,

    #[serde(default)]
    pub private_dependencies: Vec<String>,

    #[serde(default)]
    pub public_include_paths: Vec<String>,

    #[serde(default)]
    pub private_include_paths: Vec<String>,

    #[serde(default)]
    pub public_frameworks: Vec<FrameworkSpec>,

    #[serde(default)]
    pub rules: Vec<RawRule>,
}

/// A platform rule record before validation
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RawRule {
    /// Platform token, or `Default`
    pub platform: String,

    /// Configuration kinds the rule is limited to (empty: all)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub configurations: Vec<TargetType>,

    #[serde(default)]
    pub dependencies: Vec<String>,

    #[serde(default)]
    pub include_paths: Vec<String>,

    #[serde(default)]
    pub frameworks: Vec<FrameworkSpec>,

    #[serde(default)]
    pub receipt: Vec<ReceiptProperty>,
}

/// Framework entry: a system framework name or a bundled archive
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum FrameworkSpec {
    /// System framework: "UIKit"
    Simple(String),

    /// Framework shipped as an archive with the plugin
    Bundled {
        name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        archive: Option<String>,
    },
}

/// Framework reference attached to a module or plan
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FrameworkRef {
    pub name: String,

    /// SDK archive to bundle, if the framework is not a system one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archive: Option<String>,
}

/// Key/value metadata handed to packaging steps
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReceiptProperty {
    pub key: String,
    pub value: String,
}

impl ReceiptProperty {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Extra build inputs that apply to one platform
#[derive(Debug, Clone, PartialEq)]
pub struct PlatformRule {
    pub selector: PlatformSelector,
    pub configurations: Vec<TargetType>,
    pub dependencies: Vec<String>,
    pub include_paths: Vec<String>,
    pub frameworks: Vec<FrameworkRef>,
    pub receipt: Vec<ReceiptProperty>,
}

impl PlatformRule {
    /// Whether the rule is enabled for a configuration kind
    pub fn applies_to(&self, configuration: TargetType) -> bool {
        self.configurations.is_empty() || self.configurations.contains(&configuration)
    }
}

/// A validated module descriptor
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleDescriptor {
    pub name: String,
    pub directory: Option<String>,
    pub plugin_directory: Option<String>,
    pub pch_usage: PchUsage,
    pub public_dependencies: Vec<String>,
    pub private_dependencies: Vec<String>,
    pub public_include_paths: BTreeSet<String>,
    pub private_include_paths: BTreeSet<String>,
    pub public_frameworks: BTreeSet<FrameworkRef>,

    /// Rules grouped by platform, declaration order kept within a group
    pub rules: BTreeMap<PlatformSelector, Vec<PlatformRule>>,
}

impl ModuleDescriptor {
    /// Rules that apply for a platform and configuration
    ///
    /// `Default` rules stand in only when the module has no rules keyed by
    /// the platform itself.
    pub fn matching_rules(
        &self,
        platform: Platform,
        configuration: TargetType,
    ) -> impl Iterator<Item = &PlatformRule> {
        let selector = if self.rules.contains_key(&PlatformSelector::Platform(platform)) {
            PlatformSelector::Platform(platform)
        } else {
            PlatformSelector::Default
        };

        self.rules
            .get(&selector)
            .into_iter()
            .flatten()
            .filter(move |rule| rule.applies_to(configuration))
    }

    /// Public, private and matching platform dependencies, first occurrence kept
    pub fn dependencies_for(&self, platform: Platform, configuration: TargetType) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.public_dependencies
            .iter()
            .chain(self.private_dependencies.iter())
            .chain(
                self.matching_rules(platform, configuration)
                    .flat_map(|rule| rule.dependencies.iter()),
            )
            .map(String::as_str)
            .filter(|name| seen.insert(*name))
            .collect()
    }

    /// Whether any rule is keyed by the given platform
    pub fn has_rules_for(&self, platform: Platform) -> bool {
        self.rules.contains_key(&PlatformSelector::Platform(platform))
    }
}

/// Validated, immutable set of module and target descriptors
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DescriptorSet {
    project: ProjectInfo,
    modules: BTreeMap<String, ModuleDescriptor>,
    targets: BTreeMap<String, TargetDescriptor>,
}

impl DescriptorSet {
    /// Parse and validate a TOML descriptor file
    pub fn from_file(path: &Path) -> Result<Self, DescriptorError> {
        let content = std::fs::read_to_string(path)?;
        if path.extension().is_some_and(|ext| ext == "json") {
            Self::from_json_str(&content)
        } else {
            Self::from_str(&content)
        }
    }

    /// Parse and validate TOML descriptors
    pub fn from_str(content: &str) -> Result<Self, DescriptorError> {
        let file: DescriptorFile = toml::from_str(content)?;
        load_descriptors(file)
    }

    /// Parse and validate JSON descriptors
    pub fn from_json_str(content: &str) -> Result<Self, DescriptorError> {
        let file: DescriptorFile = serde_json::from_str(content)?;
        load_descriptors(file)
    }

    pub fn project(&self) -> &ProjectInfo {
        &self.project
    }

    /// Look up a module by name
    pub fn get(&self, name: &str) -> Option<&ModuleDescriptor> {
        self.modules.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }

    /// Modules in name order
    pub fn modules(&self) -> impl Iterator<Item = &ModuleDescriptor> {
        self.modules.values()
    }

    /// Module names in name order
    pub fn module_names(&self) -> Vec<&str> {
        self.modules.keys().map(String::as_str).collect()
    }

    /// Look up a target by name
    pub fn target(&self, name: &str) -> Option<&TargetDescriptor> {
        self.targets.get(name)
    }

    pub fn targets(&self) -> impl Iterator<Item = &TargetDescriptor> {
        self.targets.values()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

/// Validate raw records into a descriptor set
///
/// Fails on the first empty or duplicate module name, unknown platform
/// token or unexpandable path. Nothing is resolved here.
pub fn load_descriptors(file: DescriptorFile) -> Result<DescriptorSet, DescriptorError> {
    let mut modules = BTreeMap::new();

    for raw in file.modules {
        let module = validate_module(raw, file.project.root.as_deref())?;
        if modules.contains_key(&module.name) {
            return Err(DescriptorError::DuplicateModuleName(module.name));
        }
        modules.insert(module.name.clone(), module);
    }

    let mut targets = BTreeMap::new();
    for raw in file.targets {
        let target = TargetDescriptor::from_raw(raw)?;
        if targets.contains_key(&target.name) {
            return Err(DescriptorError::ValidationError(format!(
                "Duplicate target name: {}",
                target.name
            )));
        }
        targets.insert(target.name.clone(), target);
    }

    log::info!(
        "Loaded {} module descriptor(s) and {} target(s)",
        modules.len(),
        targets.len()
    );

    Ok(DescriptorSet {
        project: file.project,
        modules,
        targets,
    })
}

fn validate_module(
    raw: RawModule,
    project_dir: Option<&str>,
) -> Result<ModuleDescriptor, DescriptorError> {
    if raw.name.is_empty() {
        return Err(DescriptorError::ValidationError(
            "Module name cannot be empty".to_string(),
        ));
    }

    if !is_valid_module_name(&raw.name) {
        return Err(DescriptorError::ValidationError(format!(
            "Invalid module name: {}. Must contain only alphanumeric characters and underscores",
            raw.name
        )));
    }

    let name = raw.name;
    let ctx = PathContext {
        project_dir,
        module_dir: raw.directory.as_deref(),
        plugin_dir: raw.plugin_directory.as_deref(),
    };
    let expand = |path: &str| {
        ctx.expand(path).map_err(|source| DescriptorError::PathError {
            module: name.clone(),
            source,
        })
    };

    for dep in raw
        .public_dependencies
        .iter()
        .chain(raw.private_dependencies.iter())
    {
        validate_dependency_name(&name, dep)?;
    }

    let public_include_paths = raw
        .public_include_paths
        .iter()
        .map(|p| expand(p.as_str()))
        .collect::<Result<BTreeSet<_>, _>>()?;
    let private_include_paths = raw
        .private_include_paths
        .iter()
        .map(|p| expand(p.as_str()))
        .collect::<Result<BTreeSet<_>, _>>()?;
    let public_frameworks = raw
        .public_frameworks
        .iter()
        .map(|f| framework_ref(f, &expand))
        .collect::<Result<BTreeSet<_>, _>>()?;

    let mut rules: BTreeMap<PlatformSelector, Vec<PlatformRule>> = BTreeMap::new();
    for rule in raw.rules {
        let selector = rule
            .platform
            .parse::<PlatformSelector>()
            .map_err(|_| DescriptorError::UnknownPlatform {
                module: name.clone(),
                token: rule.platform.clone(),
            })?;

        for dep in &rule.dependencies {
            validate_dependency_name(&name, dep)?;
        }

        let include_paths = rule
            .include_paths
            .iter()
            .map(|p| expand(p.as_str()))
            .collect::<Result<Vec<_>, _>>()?;
        let frameworks = rule
            .frameworks
            .iter()
            .map(|f| framework_ref(f, &expand))
            .collect::<Result<Vec<_>, _>>()?;
        let receipt = rule
            .receipt
            .iter()
            .map(|prop| {
                if prop.key.is_empty() {
                    return Err(DescriptorError::ValidationError(format!(
                        "Module {} has a receipt property with an empty key",
                        name
                    )));
                }
                Ok(ReceiptProperty::new(
                    prop.key.clone(),
                    expand_value(&prop.value, &expand)?,
                ))
            })
            .collect::<Result<Vec<_>, _>>()?;

        rules.entry(selector).or_default().push(PlatformRule {
            selector,
            configurations: rule.configurations,
            dependencies: rule.dependencies,
            include_paths,
            frameworks,
            receipt,
        });
    }

    Ok(ModuleDescriptor {
        name: name.clone(),
        directory: raw.directory.as_deref().map(crate::paths::normalize),
        plugin_directory: raw.plugin_directory.as_deref().map(crate::paths::normalize),
        pch_usage: raw.pch_usage,
        public_dependencies: raw.public_dependencies,
        private_dependencies: raw.private_dependencies,
        public_include_paths,
        private_include_paths,
        public_frameworks,
        rules,
    })
}

fn framework_ref<F>(spec: &FrameworkSpec, expand: &F) -> Result<FrameworkRef, DescriptorError>
where
    F: Fn(&str) -> Result<String, DescriptorError>,
{
    match spec {
        FrameworkSpec::Simple(name) => Ok(FrameworkRef {
            name: name.clone(),
            archive: None,
        }),
        FrameworkSpec::Bundled { name, archive } => Ok(FrameworkRef {
            name: name.clone(),
            archive: archive.as_deref().map(expand).transpose()?,
        }),
    }
}

/// Receipt values are only expanded when they reference a directory token;
/// plain values are not paths and stay untouched.
fn expand_value<F>(value: &str, expand: &F) -> Result<String, DescriptorError>
where
    F: Fn(&str) -> Result<String, DescriptorError>,
{
    if value.contains("$(") {
        expand(value)
    } else {
        Ok(value.to_string())
    }
}

/// Validate a module name (alphanumeric and underscores)
fn is_valid_module_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn validate_dependency_name(module: &str, dep: &str) -> Result<(), DescriptorError> {
    if dep.trim().is_empty() {
        return Err(DescriptorError::ValidationError(format!(
            "Module {} declares an empty dependency name",
            module
        )));
    }
    if dep.chars().any(char::is_whitespace) {
        return Err(DescriptorError::ValidationError(format!(
            "Module {} declares an invalid dependency name: '{}'",
            module, dep
        )));
    }
    Ok(())
}

impl RawModule {
    /// Create an empty module record
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_public(mut self, deps: &[&str]) -> Self {
        self.public_dependencies
            .extend(deps.iter().map(|d| d.to_string()));
        self
    }

    pub fn with_private(mut self, deps: &[&str]) -> Self {
        self.private_dependencies
            .extend(deps.iter().map(|d| d.to_string()));
        self
    }

    pub fn with_rule(mut self, rule: RawRule) -> Self {
        self.rules.push(rule);
        self
    }
}

impl RawRule {
    /// Create an empty rule for a platform token
    pub fn new(platform: impl Into<String>) -> Self {
        Self {
            platform: platform.into(),
            ..Default::default()
        }
    }

    pub fn with_dependencies(mut self, deps: &[&str]) -> Self {
        self.dependencies.extend(deps.iter().map(|d| d.to_string()));
        self
    }

    pub fn with_receipt(mut self, key: &str, value: &str) -> Self {
        self.receipt.push(ReceiptProperty::new(key, value));
        self
    }

    pub fn with_configurations(mut self, configurations: &[TargetType]) -> Self {
        self.configurations.extend_from_slice(configurations);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(modules: Vec<RawModule>) -> DescriptorFile {
        DescriptorFile {
            modules,
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_minimal_module() {
        let toml = r#"
[[modules]]
name = "EasyEmail"
public_dependencies = ["Core"]
private_dependencies = ["CoreUObject", "Engine", "Sockets", "SSL", "OpenSSL"]
"#;

        let set = DescriptorSet::from_str(toml).unwrap();
        let module = set.get("EasyEmail").unwrap();
        assert_eq!(module.public_dependencies, vec!["Core"]);
        assert_eq!(module.private_dependencies.len(), 5);
        assert_eq!(module.pch_usage, PchUsage::ExplicitOrShared);
        assert!(module.rules.is_empty());
    }

    #[test]
    fn test_parse_framework_forms() {
        let toml = r#"
[[modules]]
name = "Sdk"
plugin_directory = "Plugins/Sdk"

[[modules.rules]]
platform = "IOS"
frameworks = ["UIKit", { name = "Sdk", archive = "$(PluginDir)/ios/Sdk.framework.zip" }]
"#;

        let set = DescriptorSet::from_str(toml).unwrap();
        let module = set.get("Sdk").unwrap();
        let rule = &module.rules[&PlatformSelector::Platform(Platform::Ios)][0];
        assert_eq!(rule.frameworks[0].name, "UIKit");
        assert_eq!(rule.frameworks[0].archive, None);
        assert_eq!(
            rule.frameworks[1].archive.as_deref(),
            Some("Plugins/Sdk/ios/Sdk.framework.zip")
        );
    }

    #[test]
    fn test_rules_grouped_in_declaration_order() {
        let module = RawModule::new("M")
            .with_rule(RawRule::new("Android").with_receipt("A", "1"))
            .with_rule(RawRule::new("IOS").with_receipt("I", "1"))
            .with_rule(RawRule::new("android").with_receipt("A", "2"));

        let set = load_descriptors(file(vec![module])).unwrap();
        let rules = &set.get("M").unwrap().rules[&PlatformSelector::Platform(Platform::Android)];
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].receipt[0].value, "1");
        assert_eq!(rules[1].receipt[0].value, "2");
    }

    #[test]
    fn test_unknown_platform_rejected() {
        let module = RawModule::new("M").with_rule(RawRule::new("Switch"));
        let err = load_descriptors(file(vec![module])).unwrap_err();
        match err {
            DescriptorError::UnknownPlatform { module, token } => {
                assert_eq!(module, "M");
                assert_eq!(token, "Switch");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_duplicate_module_rejected() {
        let err = load_descriptors(file(vec![RawModule::new("Core"), RawModule::new("Core")]))
            .unwrap_err();
        assert!(matches!(err, DescriptorError::DuplicateModuleName(name) if name == "Core"));
    }

    #[test]
    fn test_invalid_names_rejected() {
        let rejected = |module: RawModule| load_descriptors(file(vec![module])).is_err();
        assert!(rejected(RawModule::new("")));
        assert!(rejected(RawModule::new("My Module")));
        assert!(rejected(RawModule::new("M").with_public(&[""])));
        assert!(rejected(RawModule::new("M").with_private(&["Core UObject"])));
    }

    #[test]
    fn test_undeclared_module_dir_rejected() {
        let mut module = RawModule::new("M");
        module.public_include_paths.push("$(ModuleDir)/Public".to_string());
        let err = load_descriptors(file(vec![module])).unwrap_err();
        assert!(matches!(err, DescriptorError::PathError { module, .. } if module == "M"));
    }

    #[test]
    fn test_plain_receipt_value_untouched() {
        let module =
            RawModule::new("M").with_rule(RawRule::new("Android").with_receipt("Flag", "a/../b"));
        let set = load_descriptors(file(vec![module])).unwrap();
        let rule = &set.get("M").unwrap().rules[&PlatformSelector::Platform(Platform::Android)][0];
        assert_eq!(rule.receipt[0].value, "a/../b");
    }

    #[test]
    fn test_default_rules_only_without_platform_rules() {
        let module = RawModule::new("M")
            .with_rule(RawRule::new("Default").with_dependencies(&["Fallback"]))
            .with_rule(RawRule::new("Android").with_dependencies(&["Launch"]));
        let set = load_descriptors(file(vec![module])).unwrap();
        let module = set.get("M").unwrap();

        assert_eq!(
            module.dependencies_for(Platform::Android, TargetType::Game),
            vec!["Launch"]
        );
        assert_eq!(
            module.dependencies_for(Platform::Linux, TargetType::Game),
            vec!["Fallback"]
        );
    }

    #[test]
    fn test_configuration_filter() {
        let module = RawModule::new("M").with_rule(
            RawRule::new("Windows")
                .with_dependencies(&["UnrealEd"])
                .with_configurations(&[TargetType::Editor]),
        );
        let set = load_descriptors(file(vec![module])).unwrap();
        let module = set.get("M").unwrap();

        assert_eq!(
            module.dependencies_for(Platform::Windows, TargetType::Editor),
            vec!["UnrealEd"]
        );
        assert!(module
            .dependencies_for(Platform::Windows, TargetType::Game)
            .is_empty());
    }
}
