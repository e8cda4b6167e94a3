//! Nullable node RPC: scripted consistency answers.

use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;

use tipsel_oracle::{ConsistencyCheck, ConsistencyOracle, OracleError};
use tipsel_tangle::ConsistentCache;
use tipsel_types::TxHash;

/// A node RPC that never leaves the process.
///
/// By default every query is consistent. Hashes passed to [`rejecting`]
/// make any query containing them inconsistent; [`fail_always`] turns every
/// query into a transport error. Answers queued with [`then_answer`] take
/// precedence, one per query, in order.
///
/// [`rejecting`]: NullConsistency::rejecting
/// [`fail_always`]: NullConsistency::fail_always
/// [`then_answer`]: NullConsistency::then_answer
#[derive(Default)]
pub struct NullConsistency {
    bad: HashSet<TxHash>,
    fail: bool,
    scripted: Mutex<VecDeque<bool>>,
    calls: Mutex<Vec<Vec<TxHash>>>,
}

impl NullConsistency {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queries containing any of `bad` are answered with "not consistent".
    pub fn rejecting(bad: impl IntoIterator<Item = TxHash>) -> Self {
        Self {
            bad: bad.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Every query fails as if the node were unreachable.
    pub fn fail_always(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Queue fixed answers for the next queries.
    pub fn then_answer(self, answers: impl IntoIterator<Item = bool>) -> Self {
        self.scripted.lock().unwrap().extend(answers);
        self
    }

    /// Accept-everything oracle over `cache`.
    pub fn oracle(cache: ConsistentCache) -> ConsistencyOracle<Self> {
        Self::new().into_oracle(cache)
    }

    pub fn into_oracle(self, cache: ConsistentCache) -> ConsistencyOracle<Self> {
        ConsistencyOracle::new(self, cache)
    }

    /// Every query received so far, in order.
    pub fn calls(&self) -> Vec<Vec<TxHash>> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl ConsistencyCheck for NullConsistency {
    async fn check_consistency(&self, hashes: &[TxHash]) -> Result<bool, OracleError> {
        self.calls.lock().unwrap().push(hashes.to_vec());
        if let Some(answer) = self.scripted.lock().unwrap().pop_front() {
            return Ok(answer);
        }
        if self.fail {
            return Err(OracleError::Unreachable("null node is offline".into()));
        }
        Ok(!hashes.iter().any(|h| self.bad.contains(h)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_and_answers() {
        let rpc = NullConsistency::rejecting([TxHash::from("X")]);
        assert!(rpc.check_consistency(&[TxHash::from("A")]).await.unwrap());
        assert!(!rpc
            .check_consistency(&[TxHash::from("A"), TxHash::from("X")])
            .await
            .unwrap());
        assert_eq!(rpc.call_count(), 2);
    }

    #[tokio::test]
    async fn scripted_answers_come_first() {
        let rpc = NullConsistency::new().then_answer([false]);
        let a = [TxHash::from("A")];
        assert!(!rpc.check_consistency(&a).await.unwrap());
        assert!(rpc.check_consistency(&a).await.unwrap());
    }

    #[tokio::test]
    async fn offline_node_errors() {
        let rpc = NullConsistency::new().fail_always();
        assert!(rpc.check_consistency(&[TxHash::from("A")]).await.is_err());
    }
}
