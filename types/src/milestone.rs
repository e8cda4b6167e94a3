//! Milestone indices.

/// Index of a milestone published by the upstream node.
///
/// Signed so that window arithmetic (`latest - depth`, `latest - max_depth - 1`)
/// can go below zero without wrapping while the service is still warming up.
pub type MilestoneIndex = i64;
