//! Ledger-consistency oracle.
//!
//! Answers "are these transactions jointly consistent?" by asking the
//! upstream node, remembering every positive answer. Negative answers and
//! RPC failures both mean "not consistent" and are never cached, since the
//! same transactions may prove consistent in another combination.

pub mod error;
pub mod iri;
pub mod oracle;

pub use error::OracleError;
pub use iri::{ConsistencyMethod, IriClient, NodeInfo};
pub use oracle::{ConsistencyCheck, ConsistencyOracle, OracleStats};
