//! Core library for the dcontainer CLI
//!
//! This crate contains the feature definition model, generator settings and
//! the dependency installation script generator, plus logging and error
//! handling shared with the CLI.

pub mod dependencies_script;
pub mod errors;
pub mod features;
pub mod logging;
pub mod settings;
pub mod version;

// Re-export IndexMap for use by dependent crates (preserves insertion order for ordered maps)
pub use indexmap::IndexMap;

/// Get the version of the core library
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
