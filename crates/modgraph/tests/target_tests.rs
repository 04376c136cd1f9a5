//! Integration tests for target resolution

use modgraph::{resolve_target, DescriptorSet, Platform, ResolveError, TargetType};
use std::path::Path;

fn fixture() -> DescriptorSet {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/project.toml");
    DescriptorSet::from_file(&path).unwrap()
}

#[test]
fn test_resolve_editor_target() {
    let set = fixture();
    let plan = resolve_target(&set, "Metaverse_CEditor", Platform::Windows).unwrap();

    assert_eq!(plan.target, "Metaverse_CEditor");
    assert_eq!(plan.configuration, TargetType::Editor);
    assert_eq!(plan.build_settings.as_deref(), Some("V2"));
    assert_eq!(plan.include_order.as_deref(), Some("Unreal5_1"));
    assert_eq!(plan.modules.len(), 1);

    let module = plan.module("Metaverse_C").unwrap();
    assert_eq!(module.configuration, TargetType::Editor);
    assert!(module.has_dependency("UMG"));
}

#[test]
fn test_target_dependencies_merged() {
    let toml = r#"
[[modules]]
name = "Game"
public_dependencies = ["Core", "Engine"]

[[modules]]
name = "Mail"
public_dependencies = ["Core"]
private_dependencies = ["SSL"]

[[targets]]
name = "Client"
type = "client"
modules = ["Game", "Mail"]
"#;
    let set = DescriptorSet::from_str(toml).unwrap();
    let plan = resolve_target(&set, "Client", Platform::Linux).unwrap();

    assert_eq!(plan.dependencies(), vec!["Core", "Engine", "SSL"]);
    assert!(plan.modules.iter().all(|m| m.configuration == TargetType::Client));
}

#[test]
fn test_target_with_missing_module() {
    let toml = r#"
[[modules]]
name = "Game"

[[targets]]
name = "GameEditor"
type = "editor"
modules = ["Game", "GameTools"]
"#;
    let set = DescriptorSet::from_str(toml).unwrap();
    let err = resolve_target(&set, "GameEditor", Platform::Mac).unwrap_err();

    assert_eq!(
        err,
        ResolveError::ModuleNotFound {
            module: "GameTools".to_string(),
            platform: Platform::Mac,
        }
    );
}

#[test]
fn test_target_propagates_cycle() {
    let toml = r#"
[[modules]]
name = "A"
public_dependencies = ["B"]

[[modules]]
name = "B"

[[modules.rules]]
platform = "Android"
dependencies = ["A"]

[[targets]]
name = "Mobile"
modules = ["A"]
"#;
    let set = DescriptorSet::from_str(toml).unwrap();

    assert!(resolve_target(&set, "Mobile", Platform::Windows).is_ok());
    assert!(matches!(
        resolve_target(&set, "Mobile", Platform::Android),
        Err(ResolveError::CyclicDependency { .. })
    ));
}
