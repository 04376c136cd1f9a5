//! Plan files
//!
//! A resolved plan serialized for the external build tool, with a SHA-256
//! checksum over the plan so a stale or hand-edited file is rejected.

use crate::platform::{Platform, TargetType};
use crate::resolver::ResolvedPlan;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during plan file operations
#[derive(Debug, Error)]
pub enum PlanFileError {
    /// Failed to read or write the plan file
    #[error("Failed to access plan file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse or serialize JSON
    #[error("Failed to parse plan file: {0}")]
    ParseError(#[from] serde_json::Error),

    /// Validation error
    #[error("Invalid plan file: {0}")]
    ValidationError(String),

    /// Checksum does not match the plan contents
    #[error("Checksum mismatch for plan of {module}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        module: String,
        expected: String,
        actual: String,
    },
}

/// Plan file format version
pub const PLANFILE_VERSION: u32 = 1;

/// A checksummed plan as handed to the build tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanFile {
    /// Plan file format version
    pub version: u32,

    pub module: String,
    pub platform: Platform,
    pub configuration: TargetType,

    /// SHA-256 of the canonical JSON of `plan` (hex-encoded)
    pub checksum: String,

    pub plan: ResolvedPlan,
}

impl PlanFile {
    /// Wrap a plan and compute its checksum
    pub fn new(plan: ResolvedPlan) -> Result<Self, PlanFileError> {
        let checksum = checksum(&plan)?;
        Ok(Self {
            version: PLANFILE_VERSION,
            module: plan.module.clone(),
            platform: plan.platform,
            configuration: plan.configuration,
            checksum,
            plan,
        })
    }

    /// Parse a plan file from disk
    pub fn from_file(path: &Path) -> Result<Self, PlanFileError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parse and verify a plan file
    pub fn from_str(content: &str) -> Result<Self, PlanFileError> {
        let file: PlanFile = serde_json::from_str(content)?;
        file.validate()?;
        Ok(file)
    }

    /// Check version, header consistency and checksum
    pub fn validate(&self) -> Result<(), PlanFileError> {
        if self.version != PLANFILE_VERSION {
            return Err(PlanFileError::ValidationError(format!(
                "Unsupported plan file version: {} (expected {})",
                self.version, PLANFILE_VERSION
            )));
        }

        if self.module != self.plan.module
            || self.platform != self.plan.platform
            || self.configuration != self.plan.configuration
        {
            return Err(PlanFileError::ValidationError(format!(
                "Header ({}, {}, {}) does not match plan ({}, {}, {})",
                self.module,
                self.platform,
                self.configuration,
                self.plan.module,
                self.plan.platform,
                self.plan.configuration
            )));
        }

        let actual = checksum(&self.plan)?;
        if actual != self.checksum {
            return Err(PlanFileError::ChecksumMismatch {
                module: self.module.clone(),
                expected: self.checksum.clone(),
                actual,
            });
        }

        Ok(())
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String, PlanFileError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write plan file to disk
    pub fn to_file(&self, path: &Path) -> Result<(), PlanFileError> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

/// Checksum of a plan's canonical (compact) JSON
pub fn checksum(plan: &ResolvedPlan) -> Result<String, PlanFileError> {
    let canonical = serde_json::to_vec(plan)?;
    Ok(hex::encode(Sha256::digest(&canonical)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::PchUsage;
    use std::collections::BTreeSet;

    fn plan() -> ResolvedPlan {
        ResolvedPlan {
            module: "EasyEmail".to_string(),
            platform: Platform::Windows,
            configuration: TargetType::Game,
            pch_usage: PchUsage::ExplicitOrShared,
            dependencies: vec!["Core".to_string(), "SSL".to_string()],
            build_order: Vec::new(),
            include_paths: BTreeSet::from(["Public".to_string()]),
            frameworks: BTreeSet::new(),
            receipt_properties: Vec::new(),
        }
    }

    #[test]
    fn test_checksum_is_hex_sha256() {
        let sum = checksum(&plan()).unwrap();
        assert_eq!(sum.len(), 64);
        assert!(sum.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(sum, checksum(&plan()).unwrap());
    }

    #[test]
    fn test_parse_written_plan() {
        let file = PlanFile::new(plan()).unwrap();
        let parsed = PlanFile::from_str(&file.to_json().unwrap()).unwrap();
        assert_eq!(parsed, file);
    }

    #[test]
    fn test_edited_plan_rejected() {
        let mut file = PlanFile::new(plan()).unwrap();
        file.plan.dependencies.push("OpenSSL".to_string());

        let err = PlanFile::from_str(&file.to_json().unwrap()).unwrap_err();
        assert!(matches!(
            err,
            PlanFileError::ChecksumMismatch { module, .. } if module == "EasyEmail"
        ));
    }

    #[test]
    fn test_header_mismatch_rejected() {
        let mut file = PlanFile::new(plan()).unwrap();
        file.platform = Platform::Linux;
        assert!(matches!(
            file.validate(),
            Err(PlanFileError::ValidationError(_))
        ));
    }

    #[test]
    fn test_unsupported_version_rejected() {
        let mut file = PlanFile::new(plan()).unwrap();
        file.version = 2;
        assert!(file.validate().is_err());
    }
}
