//! Flag Assembly
//!
//! Builds CFLAGS, CPPFLAGS and LDFLAGS for a resolved toolchain. Order is
//! significant: later flags override earlier ones on the compiler command
//! line.

use std::path::Path;

use droidenv_core::Inputs;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::toolchain::{Toolchain, ToolchainLayout};

const BASE_CFLAGS: &[&str] = &[
    "-fno-strict-aliasing",
    "-fno-strict-overflow",
    "-fpic",
    "-fwrapv",
    "-Wno-macro-redefined",
    "-Wno-unused-command-line-argument",
];

const BASE_CPPFLAGS: &[&str] = &["-D_FORTIFY_SOURCE=1"];

const BASE_LDFLAGS: &[&str] = &["-Wl,-z,noexecstack", "-Wl,-z,relro", "-pie"];

static INCLUDE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"-I(.+)").unwrap());
static LIBPYTHON_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"-l(python.*)").unwrap());
static LIBDIR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"-L(.+)").unwrap());

/// Ordered compiler and linker flags
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Flags {
    pub cflags: Vec<String>,
    pub cppflags: Vec<String>,
    pub ldflags: Vec<String>,
}

impl Flags {
    /// Assemble flags for `toolchain` from the resolved inputs
    pub fn assemble(inputs: &Inputs, toolchain: &Toolchain) -> Self {
        let mut flags = Flags {
            cflags: owned(BASE_CFLAGS),
            cppflags: owned(BASE_CPPFLAGS),
            ldflags: owned(BASE_LDFLAGS),
        };

        flags.cppflags.extend(python_include(&inputs.cppflags));
        flags.ldflags.extend(python_link(&inputs.ldflags));

        if inputs.debug {
            flags.cflags.extend(owned(&["-g", "-O0"]));
        } else {
            flags.cflags.push("-Os".into());
            flags.cppflags.push("-DNDEBUG=1".into());
            flags.ldflags.push("-Wl,-S".into());
        }

        if toolchain.layout == ToolchainLayout::Unified {
            flags.ldflags.push("-fuse-ld=lld".into());
        }

        let sysroot = &toolchain.sysroot;
        let triplet = toolchain.abi.triplet();
        let libdirs = [
            sysroot.join("usr").join("lib64"),
            sysroot.join("usr").join("lib"),
            sysroot.join("usr").join("lib").join(triplet).join(toolchain.api.to_string()),
        ];
        for dir in libdirs.iter().filter(|dir| dir.exists()) {
            flags.ldflags.push(format!("-L{}", dir.display()));
        }

        flags.cflags.push(format!("--target={}", toolchain.target));
        flags.ldflags.push(format!("--target={}", toolchain.target));
        flags.cflags.push(format!("-march={}", toolchain.abi.march()));
        flags.cflags.push("-mtune=generic".into());
        flags.cflags.extend(owned(toolchain.abi.arch_cflags()));
        flags.ldflags.extend(owned(toolchain.abi.arch_ldflags()));
        flags.cflags.push(format!("--sysroot={}", sysroot.display()));

        flags.cppflags.push(format!("-D__ANDROID_API__={}", toolchain.api));
        flags.cppflags.push(format!("-isysroot {}", sysroot.display()));
        flags.cppflags.push(format!(
            "-isystem {}",
            sysroot.join("usr").join("include").join(triplet).display()
        ));

        flags
    }

    /// C++ flags are the C flags
    pub fn cxxflags(&self) -> &[String] {
        &self.cflags
    }

    pub fn cflags_string(&self) -> String {
        self.cflags.join(" ")
    }

    pub fn cppflags_string(&self) -> String {
        self.cppflags.join(" ")
    }

    pub fn cxxflags_string(&self) -> String {
        self.cxxflags().join(" ")
    }

    pub fn ldflags_string(&self) -> String {
        self.ldflags.join(" ")
    }
}

fn owned(flags: &[&str]) -> Vec<String> {
    flags.iter().map(|f| f.to_string()).collect()
}

/// Split a flag string on spaces that are not escaped with a backslash.
/// Escapes are kept in the returned words.
pub fn split_escaped(flags: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut prev = None;

    for c in flags.chars() {
        if c == ' ' && prev != Some('\\') {
            words.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
        prev = Some(c);
    }
    words.push(current);
    words
}

fn unescape(path: &str) -> String {
    path.replace("\\ ", " ")
}

/// First `-I<dir>` in `cppflags` whose directory holds `Python.h`
fn python_include(cppflags: &str) -> Option<String> {
    split_escaped(cppflags).into_iter().find(|word| {
        INCLUDE_RE
            .captures(word)
            .and_then(|caps| caps.get(1))
            .map_or(false, |dir| Path::new(&unescape(dir.as_str())).join("Python.h").exists())
    })
}

/// First `-lpython…` in `ldflags`, followed by the first `-L<dir>` that
/// holds the matching shared library
fn python_link(ldflags: &str) -> Vec<String> {
    let words = split_escaped(ldflags);

    let Some((lib_flag, libpython)) = words.iter().find_map(|word| {
        LIBPYTHON_RE
            .captures(word)
            .and_then(|caps| caps.get(1))
            .map(|name| (word.clone(), name.as_str().to_string()))
    }) else {
        return Vec::new();
    };

    debug!("Linking against {}", libpython);
    let mut linked = vec![lib_flag];

    let so_name = format!("lib{libpython}.so");
    let libdir = words.iter().find(|word| {
        LIBDIR_RE
            .captures(word)
            .and_then(|caps| caps.get(1))
            .map_or(false, |dir| Path::new(&unescape(dir.as_str())).join(&so_name).exists())
    });
    linked.extend(libdir.cloned());
    linked
}
