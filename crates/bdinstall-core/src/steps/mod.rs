//! Individual pipeline steps.
//!
//! Each step is idempotent on its own: it checks the filesystem before acting,
//! so re-running after an interruption picks up where the last run stopped.

pub mod archive;
pub mod directories;
pub mod fetch;
pub mod legacy;
pub mod shim;

pub use archive::{SwapOutcome, swap_archive, swap_archives};
pub use directories::{ProvisionReport, provision_directories};
pub use fetch::{InstalledPackage, PackageFetcher, ReleaseAsset};
pub use legacy::{MigrationReport, find_legacy_install, migrate_legacy_addons, transfer_addons};
pub use shim::{ShimReport, inject_shim, inject_shims};
