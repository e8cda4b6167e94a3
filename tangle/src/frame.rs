//! Parsing of upstream text frames.
//!
//! Frames are whitespace-separated fields with the topic first:
//!
//! ```text
//! tx <hash> <address> <value> <obsoleteTag> <timestamp> <currentIndex> <lastIndex> <bundle> <trunk> <branch> ...
//! sn <milestoneIndex> <transactionHash> ...
//! ```
//!
//! Only the positions the tangle needs are read. Trailing fields are ignored,
//! as are frames of any other topic.

use tipsel_types::{BundleHash, MilestoneIndex, TxHash};

use crate::error::TangleError;

pub const TOPIC_TRANSACTION: &str = "tx";
pub const TOPIC_MILESTONE: &str = "sn";

const TX_HASH: usize = 1;
const TX_CURRENT_INDEX: usize = 6;
const TX_BUNDLE: usize = 8;
const TX_TRUNK: usize = 9;
const TX_BRANCH: usize = 10;

const SN_INDEX: usize = 1;
const SN_HASH: usize = 2;

/// A `tx` frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionEvent {
    pub hash: TxHash,
    pub bundle: BundleHash,
    pub trunk: TxHash,
    pub branch: TxHash,
    /// `currentIndex == 0`: this transaction is its bundle's tail.
    pub is_tail: bool,
}

/// An `sn` (solid milestone) frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MilestoneEvent {
    pub index: MilestoneIndex,
    pub hash: TxHash,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TangleEvent {
    Transaction(TransactionEvent),
    Milestone(MilestoneEvent),
}

/// Parse one frame. Returns `Ok(None)` for empty frames and topics the
/// tangle does not consume.
pub fn parse_frame(frame: &str) -> Result<Option<TangleEvent>, TangleError> {
    let fields: Vec<&str> = frame.split_whitespace().collect();
    match fields.first().copied() {
        Some(TOPIC_TRANSACTION) => parse_transaction(&fields).map(Some),
        Some(TOPIC_MILESTONE) => parse_milestone(&fields).map(Some),
        _ => Ok(None),
    }
}

fn field<'a>(fields: &[&'a str], kind: &str, idx: usize) -> Result<&'a str, TangleError> {
    fields.get(idx).copied().ok_or_else(|| {
        TangleError::malformed(
            kind,
            format!("expected field {idx}, frame has {} fields", fields.len()),
        )
    })
}

fn parse_transaction(fields: &[&str]) -> Result<TangleEvent, TangleError> {
    let kind = TOPIC_TRANSACTION;
    Ok(TangleEvent::Transaction(TransactionEvent {
        hash: TxHash::from(field(fields, kind, TX_HASH)?),
        bundle: BundleHash::from(field(fields, kind, TX_BUNDLE)?),
        trunk: TxHash::from(field(fields, kind, TX_TRUNK)?),
        branch: TxHash::from(field(fields, kind, TX_BRANCH)?),
        is_tail: field(fields, kind, TX_CURRENT_INDEX)? == "0",
    }))
}

fn parse_milestone(fields: &[&str]) -> Result<TangleEvent, TangleError> {
    let kind = TOPIC_MILESTONE;
    let raw_index = field(fields, kind, SN_INDEX)?;
    let index = raw_index
        .parse::<MilestoneIndex>()
        .map_err(|e| TangleError::malformed(kind, format!("milestone index {raw_index:?}: {e}")))?;
    if index < 0 {
        return Err(TangleError::malformed(
            kind,
            format!("milestone index {index} is negative"),
        ));
    }
    Ok(TangleEvent::Milestone(MilestoneEvent {
        index,
        hash: TxHash::from(field(fields, kind, SN_HASH)?),
    }))
}
