//! Environment Manager
//!
//! Projects a resolved toolchain and its flags into environment variables,
//! either for the current process, for a child command or as shell
//! `export` lines.

use std::collections::HashMap;

use droidenv_core::{Inputs, Vars};
use tracing::{debug, info};

use crate::flags::Flags;
use crate::toolchain::{HostTag, Toolchain};

/// Variables printed by [`EnvManager::shell_exports`], in output order
pub const EXPORTED_VARS: &[&str] = &[
    "_PYTHON_HOST_PLATFORM",
    "ABI",
    "ANDROID_SDK_ROOT",
    "API",
    "AR",
    "AS",
    "CC",
    "CFLAGS",
    "CPP",
    "CPPFLAGS",
    "CXX",
    "CXXFLAGS",
    "LD",
    "LDFLAGS",
    "LDSHARED",
    "PATH",
    "RANLIB",
    "READELF",
    "TARGET",
];

const PATH_SEP: &str = if cfg!(windows) { ";" } else { ":" };

/// Environment Manager
pub struct EnvManager {
    /// Projected variables in insertion order
    vars: Vec<(String, String)>,
    original_env: Vars,
}

impl EnvManager {
    /// Project `toolchain` and `flags` on top of `original_env`
    pub fn new(
        inputs: &Inputs,
        toolchain: &Toolchain,
        flags: &Flags,
        host: &HostTag,
        original_env: Vars,
    ) -> Self {
        let mut env = Self {
            vars: Vec::new(),
            original_env,
        };

        if inputs.export_sdk_root {
            env.set_var("ANDROID_SDK_ROOT", inputs.sdk_root.display().to_string());
        }
        env.set_var("ABI", inputs.abi.name());
        env.set_var("API", inputs.api.to_string());
        env.set_var("TARGET", inputs.abi.triplet());
        env.set_var("AR", toolchain.ar.clone());
        env.set_var("AS", toolchain.as_.clone());
        env.set_var("CC", toolchain.cc());
        env.set_var("CPP", toolchain.cpp());
        env.set_var("CXX", toolchain.cxx());
        env.set_var("LD", toolchain.ld.clone());
        env.set_var("RANLIB", toolchain.ranlib.clone());
        env.set_var("READELF", toolchain.readelf.clone());
        env.set_var("CFLAGS", flags.cflags_string());
        env.set_var("CPPFLAGS", flags.cppflags_string());
        env.set_var("CXXFLAGS", flags.cxxflags_string());
        env.set_var("LDFLAGS", flags.ldflags_string());
        env.set_var("PATH", Self::extend_path(&inputs.path, toolchain));
        // Python setuptools
        env.set_var("LDSHARED", toolchain.ldshared());
        env.set_var("_PYTHON_HOST_PLATFORM", host.system());

        debug!("Projected {} variables", env.vars.len());
        env
    }

    /// Inherited `$PATH`, kept verbatim, followed by the toolchain bin
    /// directories. An empty inherited value adds no entry.
    fn extend_path(inherited: &str, toolchain: &Toolchain) -> String {
        let mut entries: Vec<String> = Vec::new();
        if !inherited.is_empty() {
            entries.push(inherited.to_string());
        }
        entries.extend(toolchain.bin_dirs().iter().map(|dir| dir.display().to_string()));
        entries.join(PATH_SEP)
    }

    fn set_var(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self.vars.iter_mut().find(|(k, _)| k == key) {
            Some((_, v)) => *v = value,
            None => self.vars.push((key.to_string(), value)),
        }
    }

    /// Value of `key` after projection, falling back to the inherited
    /// environment
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .or_else(|| self.original_env.get(key).map(String::as_str))
    }

    /// Apply environment to the current process (for child processes)
    pub fn apply_to_process(&self) {
        for (key, value) in &self.vars {
            std::env::set_var(key, value);
        }
        info!("Applied Android cross-compilation environment");
    }

    /// Get command environment
    pub fn command_env(&self) -> HashMap<String, String> {
        self.vars.iter().cloned().collect()
    }

    /// Get shell export commands
    pub fn shell_exports(&self) -> String {
        EXPORTED_VARS
            .iter()
            .filter_map(|key| self.get(key).map(|value| format!("export {}=\"{}\"\n", key, value)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{inputs_for, toolchain_for};
    use crate::toolchain::ToolchainLayout;
    use droidenv_core::Abi;
    use tempfile::TempDir;

    fn manager(inputs: &Inputs, toolchain: &Toolchain, original_env: Vars) -> EnvManager {
        let flags = Flags::assemble(inputs, toolchain);
        EnvManager::new(inputs, toolchain, &flags, &HostTag::new("linux", "x86_64"), original_env)
    }

    #[test]
    fn test_projected_variables() {
        let tmp = TempDir::new().unwrap();
        let toolchain = toolchain_for(tmp.path(), Abi::X86_64, 21, ToolchainLayout::Unified);
        let mut inputs = inputs_for(Abi::X86_64, 21, true);
        inputs.path = "/usr/bin:/bin".into();

        let env = manager(&inputs, &toolchain, Vars::new());

        assert_eq!(env.get("ABI"), Some("x86_64"));
        assert_eq!(env.get("API"), Some("21"));
        assert_eq!(env.get("TARGET"), Some("x86_64-linux-android"));
        assert_eq!(env.get("CC"), Some("x86_64-linux-android21-clang"));
        assert_eq!(env.get("CPP"), Some("x86_64-linux-android21-clang -E"));
        assert_eq!(env.get("LDSHARED"), Some("x86_64-linux-android21-clang -shared"));
        assert_eq!(env.get("RANLIB"), Some("llvm-ranlib"));
        assert_eq!(env.get("_PYTHON_HOST_PLATFORM"), Some("linux"));
        assert_eq!(env.get("CXXFLAGS"), env.get("CFLAGS"));
        assert_eq!(env.get("ANDROID_SDK_ROOT"), None);

        let root = toolchain.root.display();
        assert_eq!(
            env.get("PATH").unwrap(),
            format!("/usr/bin:/bin:{root}/bin:{root}/x86_64-linux-android/bin")
        );
    }

    #[test]
    fn test_empty_inherited_path() {
        let tmp = TempDir::new().unwrap();
        let toolchain = toolchain_for(tmp.path(), Abi::X86, 19, ToolchainLayout::Unified);
        let env = manager(&inputs_for(Abi::X86, 19, true), &toolchain, Vars::new());

        assert!(env.get("PATH").unwrap().starts_with(&toolchain.root.display().to_string()));
    }

    #[test]
    fn test_inherited_path_kept_verbatim() {
        let tmp = TempDir::new().unwrap();
        let toolchain = toolchain_for(tmp.path(), Abi::X86_64, 21, ToolchainLayout::Unified);
        let mut inputs = inputs_for(Abi::X86_64, 21, true);
        inputs.path = "/usr/bin::/bin".into();

        let env = manager(&inputs, &toolchain, Vars::new());

        let root = toolchain.root.display();
        assert_eq!(
            env.get("PATH").unwrap(),
            format!("/usr/bin::/bin:{root}/bin:{root}/x86_64-linux-android/bin")
        );
    }

    #[test]
    fn test_apply_to_process() {
        let tmp = TempDir::new().unwrap();
        let toolchain = toolchain_for(tmp.path(), Abi::ArmeabiV7a, 19, ToolchainLayout::Unified);
        let env = manager(&inputs_for(Abi::ArmeabiV7a, 19, true), &toolchain, Vars::new());

        env.apply_to_process();

        assert_eq!(std::env::var("TARGET").unwrap(), "arm-linux-androideabi");
        assert_eq!(
            std::env::var("LDSHARED").unwrap(),
            "armv7a-linux-androideabi19-clang -shared"
        );
        assert_eq!(std::env::var("CC").ok().as_deref(), env.get("CC"));
    }

    #[test]
    fn test_sdk_root_exported_only_when_derived() {
        let tmp = TempDir::new().unwrap();
        let toolchain = toolchain_for(tmp.path(), Abi::Arm64V8a, 21, ToolchainLayout::Unified);
        let mut inputs = inputs_for(Abi::Arm64V8a, 21, true);
        inputs.export_sdk_root = true;

        let env = manager(&inputs, &toolchain, Vars::new());
        assert_eq!(env.get("ANDROID_SDK_ROOT"), Some("/android/sdk"));
        assert!(env.command_env().contains_key("ANDROID_SDK_ROOT"));
    }

    #[test]
    fn test_shell_exports_order() {
        let tmp = TempDir::new().unwrap();
        let toolchain = toolchain_for(tmp.path(), Abi::Arm64V8a, 21, ToolchainLayout::Unified);
        let inputs = inputs_for(Abi::Arm64V8a, 21, true);
        let original: Vars = [("ANDROID_SDK_ROOT".to_string(), "/from/caller".to_string())]
            .into_iter()
            .collect();

        let exports = manager(&inputs, &toolchain, original).shell_exports();
        let lines: Vec<&str> = exports.lines().collect();

        assert_eq!(lines.len(), EXPORTED_VARS.len());
        assert_eq!(lines[0], "export _PYTHON_HOST_PLATFORM=\"linux\"");
        assert_eq!(lines[1], "export ABI=\"arm64-v8a\"");
        assert_eq!(lines[2], "export ANDROID_SDK_ROOT=\"/from/caller\"");
        assert_eq!(lines[3], "export API=\"21\"");
        assert_eq!(lines[18], "export TARGET=\"aarch64-linux-android\"");
    }

    #[test]
    fn test_shell_exports_skip_unset() {
        let tmp = TempDir::new().unwrap();
        let toolchain = toolchain_for(tmp.path(), Abi::Arm64V8a, 21, ToolchainLayout::Unified);
        let exports = manager(&inputs_for(Abi::Arm64V8a, 21, true), &toolchain, Vars::new()).shell_exports();

        assert!(!exports.contains("ANDROID_SDK_ROOT"));
        assert_eq!(exports.lines().count(), EXPORTED_VARS.len() - 1);
    }
}
