//! droidenv - Android cross-compilation environment
//!
//! Computes the toolchain paths, compiler and linker flags and environment
//! variables needed to cross-compile native code for Android, then prints
//! them as shell exports or runs a command with them applied.
//!
//! ## Architecture
//!
//! - `droidenv-core`: ABI table, errors and input resolution
//! - `droidenv-android-toolchain`: NDK detection, toolchain selection,
//!   flag assembly and environment projection

#![warn(clippy::all)]

pub mod commands;

// Re-export main components for library usage
pub use droidenv_android_toolchain as toolchain;
pub use droidenv_core as core;
