//! Installer configuration
//!
//! Settings live in `<config_dir>/bdinstall/bdinstall.toml`; every field is
//! optional and a missing file means defaults.

pub mod parser;
pub mod paths;
pub mod schema;
pub mod store;

pub use parser::{parse_settings_toml, parse_settings_toml_str, to_toml};
pub use paths::DataLayout;
pub use schema::{FeedSettings, InstallerSettings};
pub use store::SettingsStore;
