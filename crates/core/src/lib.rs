//! droidenv core - shared types
//!
//! Holds the pieces every other crate needs: the ABI table, the error type
//! and input resolution from the environment and `droidenv.toml`.

pub mod abi;
pub mod config;
pub mod error;

pub use abi::Abi;
pub use config::{FileConfig, Inputs, Vars};
pub use error::{DroidEnvError, Result};

/// droidenv version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "droidenv";
