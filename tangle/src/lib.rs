//! In-memory view of the transaction DAG.
//!
//! The tangle is fed by two kinds of upstream events:
//! - `tx` frames create transaction nodes and credit every ancestor with a new approver
//! - `sn` frames record milestone confirmations and slide the confirmation window,
//!   detaching and then deleting transactions that fall out of it
//!
//! All mutation happens through [`Tangle`], which callers share behind the
//! exclusion lock in [`SharedTangle`].

pub mod cache;
pub mod error;
pub mod frame;
pub mod node;
pub mod source;
pub mod store;

pub use cache::ConsistentCache;
pub use error::{FeedError, TangleError};
pub use frame::{parse_frame, MilestoneEvent, TangleEvent, TransactionEvent};
pub use node::TxNode;
pub use source::FrameSource;
pub use store::{
    Applied, MilestoneOutcome, ReclaimStats, SharedTangle, Tangle, TangleStatus, TxOutcome,
};
