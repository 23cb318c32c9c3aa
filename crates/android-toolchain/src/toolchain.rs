//! Toolchain Selection
//!
//! Picks the compiler layout of an NDK. Releases before r19 need a
//! standalone toolchain generated by `make_standalone_toolchain.py`; later
//! releases ship a prebuilt LLVM toolchain with API-suffixed clang wrappers.

use std::path::{Path, PathBuf};

use droidenv_core::Abi;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::detector::{DetectionError, NdkInfo, NdkVersion, ToolchainDetector};

/// Toolchain errors
#[derive(Debug, thiserror::Error)]
pub enum ToolchainError {
    #[error("Toolchain not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("Sysroot not found: {}", .0.display())]
    SysrootNotFound(PathBuf),
    #[error(transparent)]
    Detection(#[from] DetectionError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Directory layout of the selected toolchain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolchainLayout {
    /// `<triplet>-<api>-toolchain` made by `make_standalone_toolchain.py`
    Standalone,
    /// `toolchains/llvm/prebuilt/<host>` inside the NDK
    Unified,
}

impl ToolchainLayout {
    pub fn for_version(version: &NdkVersion) -> Self {
        if version.has_unified_toolchain() {
            ToolchainLayout::Unified
        } else {
            ToolchainLayout::Standalone
        }
    }
}

/// `<system>-<machine>` name of the prebuilt toolchain directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostTag {
    system: String,
    machine: String,
}

impl HostTag {
    pub fn new(system: &str, machine: &str) -> Self {
        let system = match system.to_lowercase().as_str() {
            "macos" => "darwin".to_string(),
            other => other.to_string(),
        };
        let mut machine = machine.to_lowercase();
        // Apple silicon runs the x86_64 prebuilts under Rosetta
        if system == "darwin" && (machine == "arm64" || machine == "aarch64") {
            machine = "x86_64".to_string();
        }
        Self { system, machine }
    }

    /// Detect the host platform tag
    pub fn current() -> Self {
        Self::new(std::env::consts::OS, std::env::consts::ARCH)
    }

    /// Lowercase host system name, e.g. `linux` or `darwin`
    pub fn system(&self) -> &str {
        &self.system
    }

    pub fn as_string(&self) -> String {
        format!("{}-{}", self.system, self.machine)
    }
}

/// Resolved toolchain for a specific ABI and API level
#[derive(Debug, Clone)]
pub struct Toolchain {
    pub abi: Abi,
    pub api: u32,
    pub layout: ToolchainLayout,
    /// Canonical toolchain root
    pub root: PathBuf,
    pub sysroot: PathBuf,
    /// Clang target and binary prefix
    pub target: String,
    pub ar: String,
    pub as_: String,
    pub ld: String,
    pub ranlib: String,
    pub readelf: String,
}

impl Toolchain {
    pub fn cc(&self) -> String {
        format!("{}-clang", self.target)
    }

    pub fn cpp(&self) -> String {
        format!("{} -E", self.cc())
    }

    pub fn cxx(&self) -> String {
        format!("{}-clang++", self.target)
    }

    pub fn ldshared(&self) -> String {
        format!("{} -shared", self.ld)
    }

    /// Directories appended to `$PATH`
    pub fn bin_dirs(&self) -> Vec<PathBuf> {
        vec![
            self.root.join("bin"),
            self.root.join(self.abi.triplet()).join("bin"),
        ]
    }
}

/// NDK Manager
pub struct NdkManager {
    info: NdkInfo,
    host_tag: HostTag,
    work_dir: PathBuf,
}

impl NdkManager {
    /// Create a new NDK manager from a path
    pub async fn from_path(path: &Path) -> Result<Self, ToolchainError> {
        let info = ToolchainDetector::analyze_ndk(path).await?;
        let work_dir = std::env::current_dir()?;

        Ok(Self {
            info,
            host_tag: HostTag::current(),
            work_dir,
        })
    }

    /// Override the host tag
    pub fn with_host_tag(mut self, host_tag: HostTag) -> Self {
        self.host_tag = host_tag;
        self
    }

    /// Directory in which standalone toolchains are looked up and created
    pub fn with_work_dir(mut self, work_dir: PathBuf) -> Self {
        self.work_dir = work_dir;
        self
    }

    /// Get NDK info
    pub fn info(&self) -> &NdkInfo {
        &self.info
    }

    pub fn host_tag(&self) -> &HostTag {
        &self.host_tag
    }

    pub fn layout(&self) -> ToolchainLayout {
        ToolchainLayout::for_version(&self.info.version)
    }

    /// Get the toolchain for a specific ABI and API level
    pub async fn toolchain(&self, abi: Abi, api: u32) -> Result<Toolchain, ToolchainError> {
        let layout = self.layout();
        let (root, target, [ar, as_, ld, ranlib, readelf]) = match layout {
            ToolchainLayout::Standalone => {
                let root = self.standalone_toolchain(abi, api).await?;
                let t = abi.triplet();
                (
                    root,
                    t.to_string(),
                    [
                        format!("{t}-ar"),
                        format!("{t}-clang"),
                        format!("{t}-clang"),
                        format!("{t}-ranlib"),
                        format!("{t}-readelf"),
                    ],
                )
            }
            ToolchainLayout::Unified => {
                let root = self.prebuilt_toolchain()?;
                let target = abi.clang_target(api);
                let ld = format!("{target}-clang");
                (
                    root,
                    target,
                    [
                        "llvm-ar".to_string(),
                        "llvm-as".to_string(),
                        ld,
                        "llvm-ranlib".to_string(),
                        "llvm-readelf".to_string(),
                    ],
                )
            }
        };

        let root = tokio::fs::canonicalize(&root)
            .await
            .map_err(|_| ToolchainError::NotFound(root.clone()))?;
        let sysroot = root.join("sysroot");
        if !sysroot.exists() {
            return Err(ToolchainError::SysrootNotFound(sysroot));
        }

        info!("Using {:?} toolchain at {:?} for {}", layout, root, target);

        Ok(Toolchain {
            abi,
            api,
            layout,
            root,
            sysroot,
            target,
            ar,
            as_,
            ld,
            ranlib,
            readelf,
        })
    }

    /// Locate or generate `<triplet>-<api>-toolchain` in the work directory
    async fn standalone_toolchain(&self, abi: Abi, api: u32) -> Result<PathBuf, ToolchainError> {
        let dir = self
            .work_dir
            .join(format!("{}-{}-toolchain", abi.triplet(), api));

        if !dir.exists() {
            let script = self
                .info
                .path
                .join("build")
                .join("tools")
                .join("make_standalone_toolchain.py");

            info!("Creating standalone toolchain {:?}", dir);
            debug!("Running {:?} --arch {} --api {}", script, abi.arch(), api);

            let status = Command::new(&script)
                .arg("--arch")
                .arg(abi.arch())
                .arg("--api")
                .arg(api.to_string())
                .arg(format!("--install-dir={}", dir.display()))
                .status()
                .await?;

            if !status.success() {
                warn!("make_standalone_toolchain.py exited with {}", status);
            }
        }

        if !dir.exists() {
            return Err(ToolchainError::NotFound(dir));
        }
        Ok(dir)
    }

    /// `toolchains/llvm/prebuilt/<host>`, either at the NDK root or inside
    /// the versioned subdirectory of a side-by-side install
    fn prebuilt_toolchain(&self) -> Result<PathBuf, ToolchainError> {
        let prebuilt = |base: PathBuf| {
            base.join("toolchains")
                .join("llvm")
                .join("prebuilt")
                .join(self.host_tag.as_string())
        };

        let direct = prebuilt(self.info.path.clone());
        if direct.exists() {
            return Ok(direct);
        }

        let versioned = prebuilt(self.info.path.join(self.info.version.to_string()));
        if versioned.exists() {
            return Ok(versioned);
        }

        Err(ToolchainError::NotFound(versioned))
    }
}
