//! `TxValidator` implementations for the in-memory pool.

use async_trait::async_trait;
use std::time::Duration;

use crate::domain::Tx;
use crate::ports::outbound::{CheckTxResponse, TxValidator};

/// Response code used by [`RejectMatching`].
pub const CODE_TYPE_REJECTED: u32 = 1;

/// Accepts every transaction.
#[derive(Clone, Copy, Debug, Default)]
pub struct AcceptAll;

#[async_trait]
impl TxValidator for AcceptAll {
    async fn check_tx(&self, _tx: &Tx) -> CheckTxResponse {
        CheckTxResponse::ok()
    }
}

/// Delays another validator by a fixed amount, simulating a slow
/// application.
#[derive(Clone, Debug)]
pub struct DelayedValidator<V> {
    inner: V,
    delay: Duration,
}

impl<V: TxValidator> DelayedValidator<V> {
    pub fn new(inner: V, delay: Duration) -> Self {
        Self { inner, delay }
    }
}

#[async_trait]
impl<V: TxValidator> TxValidator for DelayedValidator<V> {
    async fn check_tx(&self, tx: &Tx) -> CheckTxResponse {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.inner.check_tx(tx).await
    }
}

/// Rejects transactions matching a predicate, accepts the rest.
pub struct RejectMatching<F> {
    predicate: F,
}

impl<F> RejectMatching<F>
where
    F: Fn(&Tx) -> bool + Send + Sync + 'static,
{
    pub fn new(predicate: F) -> Self {
        Self { predicate }
    }
}

#[async_trait]
impl<F> TxValidator for RejectMatching<F>
where
    F: Fn(&Tx) -> bool + Send + Sync + 'static,
{
    async fn check_tx(&self, tx: &Tx) -> CheckTxResponse {
        if (self.predicate)(tx) {
            CheckTxResponse::rejected(CODE_TYPE_REJECTED, format!("rejected {tx}"))
        } else {
            CheckTxResponse::ok()
        }
    }
}
