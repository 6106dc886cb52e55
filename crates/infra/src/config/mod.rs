//! Configuration loading
//!
//! Loads [`refsync_domain::Config`] from environment variables or from a
//! TOML/JSON file.

pub mod loader;

pub use loader::{load, load_from_env, load_from_file, locate_config_path, parse_config};
