//! CLI commands for droidenv
//!
//! Resolves the cross-compilation environment once and then either prints
//! it, looks up sysroot libraries or hands it to a child command.

use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info};

use droidenv_android_toolchain::{EnvManager, Flags, HostTag, LibraryFinder, NdkManager, Toolchain};
use droidenv_core::{config, FileConfig, Inputs, Vars};

/// Fully resolved environment
pub struct Environment {
    pub inputs: Inputs,
    pub toolchain: Toolchain,
    pub flags: Flags,
    pub env: EnvManager,
}

impl Environment {
    /// Resolve from the process environment and the configuration file
    pub async fn resolve(config_path: Option<&Path>) -> Result<Self> {
        let file = FileConfig::load(config_path).await?;
        let work_dir = std::env::current_dir()?;
        Self::resolve_from(config::process_vars(), &file, HostTag::current(), work_dir).await
    }

    /// Resolve from an explicit variable snapshot
    pub async fn resolve_from(
        vars: Vars,
        file: &FileConfig,
        host: HostTag,
        work_dir: PathBuf,
    ) -> Result<Self> {
        let inputs = Inputs::resolve(&vars, file)?;

        let manager = NdkManager::from_path(&inputs.ndk_root)
            .await?
            .with_host_tag(host.clone())
            .with_work_dir(work_dir);
        let toolchain = manager.toolchain(inputs.abi, inputs.api).await?;

        let flags = Flags::assemble(&inputs, &toolchain);
        let env = EnvManager::new(&inputs, &toolchain, &flags, &host, vars);

        Ok(Self {
            inputs,
            toolchain,
            flags,
            env,
        })
    }
}

/// Print `export` lines for the computed environment
pub struct ExportCommand;

impl ExportCommand {
    pub fn execute(&self, environment: &Environment, out: &mut impl Write) -> Result<()> {
        out.write_all(environment.env.shell_exports().as_bytes())?;
        Ok(())
    }
}

/// Print the sysroot path of each named library
pub struct FindLibraryCommand {
    pub libraries: Vec<String>,
}

impl FindLibraryCommand {
    pub fn execute(&self, environment: &Environment, out: &mut impl Write) -> Result<()> {
        let finder = LibraryFinder::new(&environment.toolchain);
        for lib in &self.libraries {
            match finder.find(lib) {
                Some(path) => writeln!(out, "{}", path.display())?,
                None => debug!("Library {} not found", lib),
            }
        }
        Ok(())
    }
}

/// Run a command in the computed environment
pub struct RunCommand {
    pub argv: Vec<OsString>,
}

impl RunCommand {
    /// Program and arguments to execute. Python scripts run under the
    /// Python interpreter.
    pub fn resolve_argv(&self, vars: &Vars) -> Result<(PathBuf, Vec<OsString>)> {
        let (first, rest) = self
            .argv
            .split_first()
            .context("no command given")?;

        if is_python_script(first) {
            let python = python_interpreter(vars)?;
            Ok((python, self.argv.clone()))
        } else {
            Ok((PathBuf::from(first), rest.to_vec()))
        }
    }

    /// Replaces the current process on Unix. Elsewhere the command runs as
    /// a child and its exit code is returned.
    pub async fn execute(&self, environment: &Environment) -> Result<i32> {
        let (program, args) = self.resolve_argv(&config::process_vars())?;
        info!("Running {:?} {:?}", program, args);

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;

            let err = std::process::Command::new(&program)
                .args(&args)
                .envs(environment.env.command_env())
                .exec();
            Err(err).with_context(|| format!("failed to execute {}", program.display()))
        }

        #[cfg(not(unix))]
        {
            let status = tokio::process::Command::new(&program)
                .args(&args)
                .envs(environment.env.command_env())
                .status()
                .await
                .with_context(|| format!("failed to execute {}", program.display()))?;
            Ok(status.code().unwrap_or(1))
        }
    }
}

fn is_python_script(arg: &OsString) -> bool {
    Path::new(arg)
        .extension()
        .map_or(false, |ext| ext == "py")
}

/// `$PYTHON`, else `python3`, else `python` from `$PATH`
fn python_interpreter(vars: &Vars) -> Result<PathBuf> {
    if let Some(python) = vars.get("PYTHON") {
        return which::which(python).with_context(|| format!("PYTHON={python} not found"));
    }
    which::which("python3")
        .or_else(|_| which::which("python"))
        .context("no Python interpreter found in PATH")
}

#[cfg(test)]
mod tests {
    use super::*;
    use droidenv_android_toolchain::ToolchainLayout;
    use droidenv_core::Abi;
    use tempfile::TempDir;

    fn vars(pairs: &[(&str, &str)]) -> Vars {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    /// `<home>/sdk/ndk/<revision>/toolchains/llvm/prebuilt/linux-x86_64`
    fn side_by_side_sdk(home: &Path, revision: &str) -> PathBuf {
        let ndk = home.join("sdk").join("ndk").join(revision);
        let prebuilt = ndk.join("toolchains/llvm/prebuilt/linux-x86_64");
        std::fs::create_dir_all(prebuilt.join("sysroot/usr/lib/aarch64-linux-android/21")).unwrap();
        std::fs::write(
            prebuilt.join("sysroot/usr/lib/aarch64-linux-android/21/liblog.so"),
            "",
        )
        .unwrap();
        home.join("sdk")
    }

    async fn resolve(home: &TempDir, extra: &[(&str, &str)]) -> Environment {
        let mut v = vars(&[("ANDROID_HOME", home.path().to_str().unwrap()), ("PATH", "/usr/bin")]);
        v.extend(vars(extra));
        Environment::resolve_from(
            v,
            &FileConfig::default(),
            HostTag::new("linux", "x86_64"),
            home.path().to_path_buf(),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_resolve_side_by_side_ndk() {
        let home = TempDir::new().unwrap();
        let sdk = side_by_side_sdk(home.path(), "25.2.9519653");

        let environment = resolve(&home, &[]).await;

        assert_eq!(environment.inputs.abi, Abi::Arm64V8a);
        assert_eq!(environment.toolchain.layout, ToolchainLayout::Unified);
        assert_eq!(environment.env.get("CC"), Some("aarch64-linux-android21-clang"));
        assert_eq!(
            environment.env.get("ANDROID_SDK_ROOT"),
            Some(sdk.to_str().unwrap())
        );
        assert!(environment.env.get("LDFLAGS").unwrap().contains("-fuse-ld=lld"));
    }

    #[tokio::test]
    async fn test_export_command() {
        let home = TempDir::new().unwrap();
        side_by_side_sdk(home.path(), "21.4.7075529");
        let environment = resolve(&home, &[("DEBUG", "0")]).await;

        let mut out = Vec::new();
        ExportCommand.execute(&environment, &mut out).unwrap();
        let out = String::from_utf8(out).unwrap();

        assert!(out.starts_with("export _PYTHON_HOST_PLATFORM=\"linux\"\n"));
        assert!(out.contains("export CPPFLAGS=\"-D_FORTIFY_SOURCE=1 -DNDEBUG=1 -D__ANDROID_API__=21 "));
        assert!(out.contains("export PATH=\"/usr/bin:"));
        assert!(out.ends_with("export TARGET=\"aarch64-linux-android\"\n"));
    }

    #[tokio::test]
    async fn test_find_library_command() {
        let home = TempDir::new().unwrap();
        side_by_side_sdk(home.path(), "25.2.9519653");
        let environment = resolve(&home, &[]).await;

        let command = FindLibraryCommand {
            libraries: vec!["log".into(), "missing".into()],
        };
        let mut out = Vec::new();
        command.execute(&environment, &mut out).unwrap();
        let out = String::from_utf8(out).unwrap();

        assert_eq!(out.lines().count(), 1);
        assert!(out.trim_end().ends_with("aarch64-linux-android/21/liblog.so"));
    }

    #[tokio::test]
    async fn test_missing_sdk_is_fatal() {
        let home = TempDir::new().unwrap();
        let result = Environment::resolve_from(
            vars(&[("ANDROID_HOME", home.path().to_str().unwrap())]),
            &FileConfig::default(),
            HostTag::new("linux", "x86_64"),
            home.path().to_path_buf(),
        )
        .await;
        assert!(result.is_err());
    }

    #[test]
    fn test_resolve_argv() {
        let command = RunCommand {
            argv: vec!["make".into(), "-j4".into()],
        };
        let (program, args) = command.resolve_argv(&Vars::new()).unwrap();
        assert_eq!(program, PathBuf::from("make"));
        assert_eq!(args, vec![OsString::from("-j4")]);

        let empty = RunCommand { argv: Vec::new() };
        assert!(empty.resolve_argv(&Vars::new()).is_err());
    }

    #[test]
    fn test_python_script_detection() {
        assert!(is_python_script(&OsString::from("setup.py")));
        assert!(is_python_script(&OsString::from("tools/build.py")));
        assert!(!is_python_script(&OsString::from("python")));
        assert!(!is_python_script(&OsString::from("configure")));
    }

    #[cfg(unix)]
    #[test]
    fn test_python_script_runs_under_interpreter() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().unwrap();
        let python = tmp.path().join("python-android");
        std::fs::write(&python, "#!/bin/sh\n").unwrap();
        std::fs::set_permissions(&python, std::fs::Permissions::from_mode(0o755)).unwrap();

        let command = RunCommand {
            argv: vec!["build.py".into(), "--flag".into()],
        };
        let (program, args) = command
            .resolve_argv(&vars(&[("PYTHON", python.to_str().unwrap())]))
            .unwrap();

        assert_eq!(program, python);
        assert_eq!(args, vec![OsString::from("build.py"), OsString::from("--flag")]);
    }

    #[test]
    fn test_missing_python_override() {
        let err = python_interpreter(&vars(&[("PYTHON", "/nonexistent/python9")])).unwrap_err();
        assert!(err.to_string().contains("PYTHON=/nonexistent/python9"));
    }
}
