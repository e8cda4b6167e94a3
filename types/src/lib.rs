//! Fundamental types for the tip-selection service.
//!
//! This crate defines the types shared across every other crate in the
//! workspace: transaction and bundle hashes, milestone indices and the
//! parameters that shape the confirmation window and the random walk.

pub mod error;
pub mod hash;
pub mod milestone;
pub mod params;

pub use error::ParamsError;
pub use hash::{BundleHash, TxHash};
pub use milestone::MilestoneIndex;
pub use params::WalkParams;
