//! Target ABIs
//!
//! The four Android ABIs and the per-architecture constants needed to drive
//! an NDK compiler for each of them.

use std::fmt;
use std::str::FromStr;

use crate::error::DroidEnvError;

/// Target ABI
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Abi {
    ArmeabiV7a,
    #[default]
    Arm64V8a,
    X86,
    X86_64,
}

impl Abi {
    /// ABI name as used in APK lib directories and in `$ABI`
    pub fn name(&self) -> &'static str {
        match self {
            Abi::ArmeabiV7a => "armeabi-v7a",
            Abi::Arm64V8a => "arm64-v8a",
            Abi::X86 => "x86",
            Abi::X86_64 => "x86_64",
        }
    }

    /// Architecture name understood by `make_standalone_toolchain.py --arch`
    pub fn arch(&self) -> &'static str {
        match self {
            Abi::ArmeabiV7a => "arm",
            Abi::Arm64V8a => "arm64",
            Abi::X86 => "x86",
            Abi::X86_64 => "x86_64",
        }
    }

    /// Value passed to `-march=`
    pub fn march(&self) -> &'static str {
        match self {
            Abi::ArmeabiV7a => "armv7-a",
            Abi::Arm64V8a => "armv8-a",
            Abi::X86 => "i686",
            Abi::X86_64 => "x86-64",
        }
    }

    /// GNU triplet naming the sysroot subdirectories and binutils
    pub fn triplet(&self) -> &'static str {
        match self {
            Abi::ArmeabiV7a => "arm-linux-androideabi",
            Abi::Arm64V8a => "aarch64-linux-android",
            Abi::X86 => "i686-linux-android",
            Abi::X86_64 => "x86_64-linux-android",
        }
    }

    /// Prefix of the API-suffixed clang wrappers in the LLVM toolchain.
    /// Only 32-bit ARM differs from the triplet.
    pub fn clang_prefix(&self) -> &'static str {
        match self {
            Abi::ArmeabiV7a => "armv7a-linux-androideabi",
            _ => self.triplet(),
        }
    }

    /// Clang target for a given API level, e.g. `aarch64-linux-android21`
    pub fn clang_target(&self, api: u32) -> String {
        format!("{}{}", self.clang_prefix(), api)
    }

    /// Lowest API level the NDK supports for this ABI
    pub fn default_api(&self) -> u32 {
        match self {
            Abi::Arm64V8a | Abi::X86_64 => 21,
            Abi::ArmeabiV7a | Abi::X86 => 19,
        }
    }

    /// Architecture specific compiler flags
    pub fn arch_cflags(&self) -> &'static [&'static str] {
        match self {
            Abi::ArmeabiV7a => &["-mfloat-abi=softfp", "-mfpu=vfpv3"],
            Abi::Arm64V8a => &["-mfpu=neon"],
            Abi::X86 => &["-m32", "-mfpmath=sse", "-mssse3"],
            Abi::X86_64 => &["-m64", "-mfpmath=sse", "-msse4.2"],
        }
    }

    /// Architecture specific linker flags
    pub fn arch_ldflags(&self) -> &'static [&'static str] {
        match self {
            Abi::ArmeabiV7a => &["-Wl,--fix-cortex-a8"],
            _ => &[],
        }
    }

    /// Get all supported ABIs
    pub fn all() -> &'static [Abi] {
        &[Abi::ArmeabiV7a, Abi::Arm64V8a, Abi::X86, Abi::X86_64]
    }
}

impl fmt::Display for Abi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Abi {
    type Err = DroidEnvError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Abi::all()
            .iter()
            .copied()
            .find(|abi| abi.name() == s)
            .ok_or_else(|| DroidEnvError::UnsupportedAbi(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abi_triples() {
        assert_eq!(Abi::Arm64V8a.triplet(), "aarch64-linux-android");
        assert_eq!(Abi::ArmeabiV7a.triplet(), "arm-linux-androideabi");
        assert_eq!(Abi::ArmeabiV7a.clang_target(19), "armv7a-linux-androideabi19");
        assert_eq!(Abi::X86.clang_target(24), "i686-linux-android24");
    }

    #[test]
    fn test_abi_from_str() {
        assert_eq!("arm64-v8a".parse::<Abi>().unwrap(), Abi::Arm64V8a);
        assert_eq!("x86_64".parse::<Abi>().unwrap(), Abi::X86_64);
        assert!(matches!(
            "mips".parse::<Abi>(),
            Err(DroidEnvError::UnsupportedAbi(name)) if name == "mips"
        ));
        // Rust triples are not ABI names
        assert!("aarch64-linux-android".parse::<Abi>().is_err());
    }

    #[test]
    fn test_default_abi() {
        assert_eq!(Abi::default(), Abi::Arm64V8a);
    }

    #[test]
    fn test_default_api_levels() {
        assert_eq!(Abi::Arm64V8a.default_api(), 21);
        assert_eq!(Abi::X86_64.default_api(), 21);
        assert_eq!(Abi::ArmeabiV7a.default_api(), 19);
        assert_eq!(Abi::X86.default_api(), 19);
    }

    #[test]
    fn test_arm_specific_flags() {
        assert_eq!(Abi::ArmeabiV7a.arch_ldflags(), &["-Wl,--fix-cortex-a8"]);
        assert!(Abi::Arm64V8a.arch_ldflags().is_empty());
        assert_eq!(Abi::Arm64V8a.arch_cflags(), &["-mfpu=neon"]);
    }
}
