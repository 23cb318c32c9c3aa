//! Configuration
//!
//! Resolves the inputs of a run:
//! - the target ABI and API level
//! - the Android home, SDK and NDK roots
//! - debug or release mode
//! - inherited flags and search path
//!
//! Values come from the environment first, then from an optional
//! `droidenv.toml`, then from built-in defaults.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::abi::Abi;
use crate::error::{DroidEnvError, Result};

/// Name of the configuration file
pub const CONFIG_FILE_NAME: &str = "droidenv.toml";

/// Snapshot of environment variables
pub type Vars = HashMap<String, String>;

/// Capture the current process environment, skipping non-unicode entries
pub fn process_vars() -> Vars {
    std::env::vars_os()
        .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
        .collect()
}

/// Optional defaults read from `droidenv.toml`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// Default ABI name
    pub abi: Option<String>,
    /// Default API level
    pub api: Option<u32>,
    /// Default SDK root
    pub sdk_root: Option<PathBuf>,
    /// Default Android home
    pub android_home: Option<PathBuf>,
    /// Default NDK root
    pub ndk: Option<PathBuf>,
    /// Debug build unless set to false
    pub debug: Option<bool>,
}

impl FileConfig {
    /// Get the default configuration file path
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("org", "droidenv", "droidenv")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    /// Load configuration.
    ///
    /// An explicit path must exist. The default path is optional.
    pub async fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => match Self::default_path() {
                Some(path) if path.exists() => path,
                _ => {
                    debug!("No configuration file, using defaults");
                    return Ok(Self::default());
                }
            },
        };

        if !path.exists() {
            return Err(DroidEnvError::path_not_found("config", path));
        }

        debug!("Loading config from {:?}", path);
        let contents = tokio::fs::read_to_string(&path).await?;
        Self::parse(&contents)
    }

    /// Parse configuration from TOML text
    pub fn parse(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }
}

/// Fully resolved inputs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inputs {
    pub abi: Abi,
    pub api: u32,
    /// Parent of the SDK, or `$ANDROID_HOME`
    pub android_home: PathBuf,
    pub sdk_root: PathBuf,
    /// `ANDROID_SDK_ROOT` was not provided by the caller and must be exported
    pub export_sdk_root: bool,
    pub ndk_root: PathBuf,
    pub debug: bool,
    /// Inherited `$CPPFLAGS`
    pub cppflags: String,
    /// Inherited `$LDFLAGS`
    pub ldflags: String,
    /// Inherited `$PATH`
    pub path: String,
}

impl Inputs {
    /// Resolve inputs from a variable snapshot and file defaults.
    ///
    /// Every path must exist on disk.
    pub fn resolve(vars: &Vars, file: &FileConfig) -> Result<Self> {
        let abi: Abi = match vars.get("ABI").or(file.abi.as_ref()) {
            Some(name) => name.parse()?,
            None => Abi::default(),
        };

        let api = match vars.get("API") {
            Some(value) => parse_int::<u32>("API", value)?,
            None => file.api.unwrap_or_else(|| abi.default_api()),
        };

        let debug_build = match vars.get("DEBUG") {
            Some(value) => parse_int::<i64>("DEBUG", value)? != 0,
            None => file.debug.unwrap_or(true),
        };

        let (android_home, sdk_root, export_sdk_root) = Self::resolve_sdk(vars, file)?;
        if !android_home.exists() {
            return Err(DroidEnvError::path_not_found("ANDROID_HOME", android_home));
        }
        if !sdk_root.exists() {
            return Err(DroidEnvError::path_not_found("ANDROID_SDK_ROOT", sdk_root));
        }

        let ndk_root = Self::resolve_ndk(vars, file, &sdk_root)?;

        let mode = if debug_build { "debug" } else { "release" };
        info!("Target {} API {} ({})", abi, api, mode);
        debug!("SDK {:?}, NDK {:?}", sdk_root, ndk_root);

        let inherited = |name: &str| vars.get(name).cloned().unwrap_or_default();

        Ok(Self {
            abi,
            api,
            android_home,
            sdk_root,
            export_sdk_root,
            ndk_root,
            debug: debug_build,
            cppflags: inherited("CPPFLAGS"),
            ldflags: inherited("LDFLAGS"),
            path: inherited("PATH"),
        })
    }

    /// Returns `(android_home, sdk_root, export_sdk_root)`
    fn resolve_sdk(vars: &Vars, file: &FileConfig) -> Result<(PathBuf, PathBuf, bool)> {
        let from_sdk_root = |sdk: PathBuf, export: bool| {
            let home = sdk.parent().map(Path::to_path_buf).unwrap_or_else(|| sdk.clone());
            (home, sdk, export)
        };

        if let Some(sdk) = vars.get("ANDROID_SDK_ROOT") {
            return Ok(from_sdk_root(PathBuf::from(sdk), false));
        }
        if let Some(home) = vars.get("ANDROID_HOME") {
            let home = PathBuf::from(home);
            let sdk = home.join("sdk");
            return Ok((home, sdk, true));
        }
        if let Some(sdk) = &file.sdk_root {
            return Ok(from_sdk_root(sdk.clone(), true));
        }
        if let Some(home) = &file.android_home {
            return Ok((home.clone(), home.join("sdk"), true));
        }

        Err(DroidEnvError::MissingVariable(
            "ANDROID_SDK_ROOT or ANDROID_HOME must be set".into(),
        ))
    }

    fn resolve_ndk(vars: &Vars, file: &FileConfig, sdk_root: &Path) -> Result<PathBuf> {
        let ndk = vars
            .get("ANDROIDNDK")
            .map(PathBuf::from)
            .or_else(|| file.ndk.clone())
            .unwrap_or_else(|| sdk_root.join("ndk-bundle"));

        let ndk = if ndk.exists() { ndk } else { sdk_root.join("ndk") };
        if !ndk.exists() {
            return Err(DroidEnvError::path_not_found("ANDROIDNDK", ndk));
        }
        Ok(ndk)
    }
}

fn parse_int<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| DroidEnvError::invalid_value(name, value))
}
