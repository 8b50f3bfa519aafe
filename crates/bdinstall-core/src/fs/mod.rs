//! Filesystem primitives shared across pipeline steps.

pub mod hash;
pub mod write;

pub use hash::{existing_file_hash, hash_bytes, hash_file};
pub use write::{write_atomic_raw, write_if_changed};
