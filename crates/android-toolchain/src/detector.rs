//! NDK Detection
//!
//! Determines the version of an installed NDK, either from its
//! `source.properties` or, for an `ndk/` directory holding side-by-side
//! installs, from the newest versioned subdirectory.

use std::cmp::Ordering;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info};

static REVISION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Pkg\.Revision = ([0-9.]+)").unwrap());

/// First NDK release that ships the unified LLVM toolchain
pub const UNIFIED_TOOLCHAIN_MAJOR: u32 = 19;

/// Toolchain detection errors
#[derive(Debug, thiserror::Error)]
pub enum DetectionError {
    #[error("Invalid NDK: {0}")]
    InvalidNdk(String),
    #[error("Invalid NDK version: {0:?}")]
    InvalidVersion(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Dotted NDK revision, compared component by component
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NdkVersion(Vec<u32>);

impl NdkVersion {
    pub fn components(&self) -> &[u32] {
        &self.0
    }

    pub fn major(&self) -> u32 {
        self.0.first().copied().unwrap_or(0)
    }

    /// NDK r19 and later ship prebuilt clang wrappers and no longer need
    /// a standalone toolchain
    pub fn has_unified_toolchain(&self) -> bool {
        self.0.as_slice() >= [UNIFIED_TOOLCHAIN_MAJOR].as_slice()
    }
}

impl FromStr for NdkVersion {
    type Err = DetectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split('.')
            .map(|part| part.parse::<u32>())
            .collect::<Result<Vec<_>, _>>()
            .map(NdkVersion)
            .map_err(|_| DetectionError::InvalidVersion(s.to_string()))
    }
}

impl fmt::Display for NdkVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(u32::to_string).collect();
        f.write_str(&parts.join("."))
    }
}

impl PartialOrd for NdkVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for NdkVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

/// Result of NDK detection
#[derive(Debug, Clone)]
pub struct NdkInfo {
    pub path: PathBuf,
    pub version: NdkVersion,
}

/// Toolchain detector
pub struct ToolchainDetector;

impl ToolchainDetector {
    /// Analyze an NDK installation
    pub async fn analyze_ndk(path: &Path) -> Result<NdkInfo, DetectionError> {
        let source_props = path.join("source.properties");

        let version = if source_props.exists() {
            let content = tokio::fs::read_to_string(&source_props).await?;
            Self::parse_source_properties(&content)?
        } else {
            debug!("No source.properties in {:?}, scanning versioned directories", path);
            Self::newest_versioned_dir(path).await?
        };

        info!("Found Android NDK {} at {:?}", version, path);

        Ok(NdkInfo {
            path: path.to_path_buf(),
            version,
        })
    }

    /// Extract `Pkg.Revision` from a `source.properties` file.
    /// The last matching line wins.
    pub fn parse_source_properties(content: &str) -> Result<NdkVersion, DetectionError> {
        let revision = content
            .lines()
            .filter_map(|line| REVISION_RE.captures(line))
            .filter_map(|caps| caps.get(1))
            .last()
            .ok_or_else(|| DetectionError::InvalidNdk("source.properties has no Pkg.Revision".into()))?;

        revision.as_str().parse()
    }

    /// Newest subdirectory whose name is a dotted version
    async fn newest_versioned_dir(path: &Path) -> Result<NdkVersion, DetectionError> {
        let mut entries = tokio::fs::read_dir(path).await?;
        let mut newest: Option<NdkVersion> = None;

        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            match name.parse::<NdkVersion>() {
                Ok(version) => {
                    if newest.as_ref().map_or(true, |n| version > *n) {
                        newest = Some(version);
                    }
                }
                Err(_) => debug!("Skipping non-version entry {:?}", name),
            }
        }

        newest.ok_or_else(|| {
            DetectionError::InvalidNdk(format!("no source.properties or versioned NDK in {}", path.display()))
        })
    }
}
