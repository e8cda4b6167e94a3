//! Tip selection.
//!
//! A request picks two tips by running two independent weighted random walks
//! from a confirmed milestone toward the frontier of the tangle. The walks
//! validate the path they take in batches against the consistency oracle and
//! roll back to the last validated transaction when a batch is refused.

pub mod error;
pub mod selector;
pub mod walk;

pub use error::SelectionError;
pub use selector::{TipPair, TipSelector};
pub use walk::{rating_weights, roulette_index, Walker};
