//! Android Toolchain Resolution
//!
//! Turns resolved inputs into a cross-compilation environment:
//! - NDK version detection
//! - standalone or unified LLVM toolchain selection
//! - compiler and linker flag assembly
//! - environment projection and sysroot library lookup

pub mod detector;
pub mod env;
pub mod flags;
pub mod library;
pub mod toolchain;

pub use detector::{DetectionError, NdkInfo, NdkVersion, ToolchainDetector};
pub use env::{EnvManager, EXPORTED_VARS};
pub use flags::Flags;
pub use library::LibraryFinder;
pub use toolchain::{HostTag, NdkManager, Toolchain, ToolchainError, ToolchainLayout};
