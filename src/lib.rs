//! Rollsync: rsync-style delta transfer in Rust.
//!
//! The crate provides:
//! - Rolling and strong block checksums (`hash`)
//! - The block catalog of a basis file (`catalog`)
//! - The streaming diff engine (`engine`) and its event sinks (`sink`)
//! - Wire encoding of catalogs and delta streams (`protocol`)
//! - Whole-buffer (`sync`) and file-oriented (`io`) helpers
//! - An optional CLI (`cli` feature)
//!
//! # Quick Start
//!
//! ```no_run
//! use rollsync::sync;
//!
//! let basis = b"hello old world";
//! let new = b"hello new world";
//!
//! let signature = sync::signature_all(basis, 4).unwrap();
//! let delta = sync::delta_all(&signature, new, 4).unwrap();
//! let patched = sync::patch_all(basis, &delta, 4).unwrap();
//! assert_eq!(patched, new);
//! ```

pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod hash;
pub mod io;
pub mod protocol;
pub mod sink;
pub mod sync;

#[cfg(feature = "cli")]
pub mod cli;

pub use catalog::{Block, BlockCatalog};
pub use config::{DEFAULT_BLOCK_SIZE, SyncOptions};
pub use engine::{DeltaEvents, DiffStats, diff};
pub use error::SyncError;
pub use sink::{BlockSource, DeltaEvent, DeltaSink, Reconstructor};
