//! Target platforms and configuration kinds
//!
//! The platform set is closed: every platform token that appears in a
//! descriptor is checked against it at load time.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A platform token that is not part of the known set
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown platform: {0}")]
pub struct UnknownPlatform(pub String);

/// A configuration kind token that is not recognized
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown configuration kind: {0}")]
pub struct UnknownTargetType(pub String);

/// Supported target platforms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum Platform {
    Windows,
    Mac,
    Linux,
    Android,
    #[serde(rename = "IOS")]
    Ios,
}

impl Platform {
    /// Every supported platform, in declaration order
    pub const ALL: [Platform; 5] = [
        Platform::Windows,
        Platform::Mac,
        Platform::Linux,
        Platform::Android,
        Platform::Ios,
    ];

    /// Canonical token used in descriptors and plans
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Windows => "Windows",
            Platform::Mac => "Mac",
            Platform::Linux => "Linux",
            Platform::Android => "Android",
            Platform::Ios => "IOS",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = UnknownPlatform;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "windows" | "win64" => Ok(Platform::Windows),
            "mac" => Ok(Platform::Mac),
            "linux" => Ok(Platform::Linux),
            "android" => Ok(Platform::Android),
            "ios" => Ok(Platform::Ios),
            _ => Err(UnknownPlatform(s.to_string())),
        }
    }
}

impl TryFrom<String> for Platform {
    type Error = UnknownPlatform;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Key under which a platform rule is filed
///
/// `Default` rules only apply to a platform that has no rules of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PlatformSelector {
    Platform(Platform),
    Default,
}

impl PlatformSelector {
    /// Whether this selector names exactly the given platform
    pub fn is_platform(&self, platform: Platform) -> bool {
        *self == PlatformSelector::Platform(platform)
    }
}

impl fmt::Display for PlatformSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlatformSelector::Platform(p) => p.fmt(f),
            PlatformSelector::Default => f.write_str("Default"),
        }
    }
}

impl FromStr for PlatformSelector {
    type Err = UnknownPlatform;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("default") {
            return Ok(PlatformSelector::Default);
        }
        s.parse().map(PlatformSelector::Platform)
    }
}

/// Build configuration kind of a target
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum TargetType {
    #[default]
    Game,
    Editor,
    Client,
    Server,
    Program,
}

impl TargetType {
    pub const ALL: [TargetType; 5] = [
        TargetType::Game,
        TargetType::Editor,
        TargetType::Client,
        TargetType::Server,
        TargetType::Program,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TargetType::Game => "game",
            TargetType::Editor => "editor",
            TargetType::Client => "client",
            TargetType::Server => "server",
            TargetType::Program => "program",
        }
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetType {
    type Err = UnknownTargetType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "game" | "runtime" => Ok(TargetType::Game),
            "editor" => Ok(TargetType::Editor),
            "client" => Ok(TargetType::Client),
            "server" => Ok(TargetType::Server),
            "program" => Ok(TargetType::Program),
            _ => Err(UnknownTargetType(s.to_string())),
        }
    }
}

impl TryFrom<String> for TargetType {
    type Error = UnknownTargetType;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_platform_tokens() {
        assert_eq!("Android".parse::<Platform>().unwrap(), Platform::Android);
        assert_eq!("IOS".parse::<Platform>().unwrap(), Platform::Ios);
        assert_eq!("ios".parse::<Platform>().unwrap(), Platform::Ios);
        assert_eq!("Win64".parse::<Platform>().unwrap(), Platform::Windows);
        assert_eq!(
            "PS5".parse::<Platform>(),
            Err(UnknownPlatform("PS5".to_string()))
        );
    }

    #[test]
    fn test_platform_display_round_trips() {
        for platform in Platform::ALL {
            assert_eq!(platform.to_string().parse::<Platform>().unwrap(), platform);
        }
    }

    #[test]
    fn test_parse_selector() {
        assert_eq!(
            "default".parse::<PlatformSelector>().unwrap(),
            PlatformSelector::Default
        );
        assert_eq!(
            "Mac".parse::<PlatformSelector>().unwrap(),
            PlatformSelector::Platform(Platform::Mac)
        );
        assert!("Switch".parse::<PlatformSelector>().is_err());
        assert!(PlatformSelector::Platform(Platform::Linux).is_platform(Platform::Linux));
        assert!(!PlatformSelector::Default.is_platform(Platform::Linux));
    }

    #[test]
    fn test_parse_target_type() {
        assert_eq!("editor".parse::<TargetType>().unwrap(), TargetType::Editor);
        assert_eq!("Runtime".parse::<TargetType>().unwrap(), TargetType::Game);
        assert!("shipping".parse::<TargetType>().is_err());
    }

    #[test]
    fn test_platform_serializes_canonical_token() {
        let json = serde_json::to_string(&Platform::Ios).unwrap();
        assert_eq!(json, "\"IOS\"");
    }

    #[test]
    fn test_deserialize_accepts_parsed_tokens() {
        let platform: Platform = serde_json::from_str("\"Win64\"").unwrap();
        assert_eq!(platform, Platform::Windows);
        let platform: Platform = serde_json::from_str("\"ios\"").unwrap();
        assert_eq!(platform, Platform::Ios);
        let kind: TargetType = serde_json::from_str("\"runtime\"").unwrap();
        assert_eq!(kind, TargetType::Game);
        let kind: TargetType = serde_json::from_str("\"Editor\"").unwrap();
        assert_eq!(kind, TargetType::Editor);

        let err = serde_json::from_str::<Platform>("\"PS5\"").unwrap_err();
        assert!(err.to_string().contains("Unknown platform: PS5"));
    }
}
