//! Nullable infrastructure for deterministic testing.
//!
//! The two outside dependencies of the service, the node RPC and the upstream
//! frame feed, sit behind traits. This crate provides test-friendly
//! implementations that:
//! - Answer from a script instead of the network
//! - Record what they were asked
//! - Can be driven programmatically from the test
//!
//! Usage: swap real implementations for nullables in tests.

pub mod consistency;
pub mod feed;

pub use consistency::NullConsistency;
pub use feed::{FeedHandle, NullFeed};
