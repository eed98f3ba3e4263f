// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Resilient transaction execution.
//!
//! [`execute_with_retry`] submits a transaction through a caller-supplied
//! builder, waits for its receipt, and resubmits with a larger gas limit when
//! the failure is transient. [`execute_read_with_retry`] applies the same loop
//! to idempotent reads, repeating only on network failures.
//!
//! Attempts never overlap: each one may depend on chain state (the sender's
//! nonce in particular) left behind by the previous one.

use std::future::Future;
use std::time::Duration;

use alloy::{network::Ethereum, providers::PendingTransactionBuilder};
use backon::{ConstantBuilder, Retryable};

use super::error::{ExecutionError, TxError};
use super::types::{GasMultiplier, TxReceipt};

/// Default number of retries after the first attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Default pause between attempts.
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(1);

/// Attempt budget and pacing for a retried operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            backoff: DEFAULT_BACKOFF,
        }
    }
}

impl RetryPolicy {
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    fn strategy(&self) -> ConstantBuilder {
        ConstantBuilder::default()
            .with_delay(self.backoff)
            .with_max_times(self.max_retries as usize)
    }
}

/// A transaction that has been broadcast and can be awaited to finality.
pub trait SubmittedTx: Send {
    fn tx_hash(&self) -> String;

    /// Wait until the transaction is mined and return its receipt.
    ///
    /// A mined transaction whose status is failed resolves to
    /// [`TxError::Reverted`], or [`TxError::OutOfGas`] when it used its whole
    /// gas limit.
    fn confirm(self) -> impl Future<Output = Result<TxReceipt, TxError>> + Send;
}

/// A broadcast transaction and the gas limit it was sent with.
pub struct SentTx {
    pending: PendingTransactionBuilder<Ethereum>,
    gas_limit: u64,
}

impl SentTx {
    pub fn new(pending: PendingTransactionBuilder<Ethereum>, gas_limit: u64) -> Self {
        Self { pending, gas_limit }
    }
}

impl SubmittedTx for SentTx {
    fn tx_hash(&self) -> String {
        format!("{:?}", self.pending.tx_hash())
    }

    async fn confirm(self) -> Result<TxReceipt, TxError> {
        let tx_hash = self.tx_hash();
        let gas_limit = self.gas_limit;
        let receipt = self.pending.get_receipt().await?;
        let block_number = receipt.block_number.unwrap_or(0);
        let gas_used = receipt.gas_used as u64;

        if !receipt.status() {
            return Err(failed_receipt_error(&tx_hash, block_number, gas_used, gas_limit));
        }

        Ok(TxReceipt {
            tx_hash,
            block_number,
            gas_used,
        })
    }
}

/// Error for a mined transaction with failed status.
fn failed_receipt_error(tx_hash: &str, block_number: u64, gas_used: u64, gas_limit: u64) -> TxError {
    if gas_limit > 0 && gas_used >= gas_limit {
        TxError::OutOfGas(format!(
            "transaction {tx_hash} ran out of gas in block {block_number} ({gas_used} of {gas_limit})"
        ))
    } else {
        TxError::Reverted(format!(
            "transaction {tx_hash} reverted in block {block_number}"
        ))
    }
}

/// Submit a transaction, retrying transient failures with escalating gas.
///
/// `build_and_submit` is called once per attempt with that attempt's
/// [`GasMultiplier`] and must re-estimate gas and re-submit from scratch.
/// At most `policy.max_retries + 1` attempts are made.
pub async fn execute_with_retry<F, Fut, S>(
    label: &str,
    policy: RetryPolicy,
    mut build_and_submit: F,
) -> Result<TxReceipt, ExecutionError>
where
    F: FnMut(GasMultiplier) -> Fut,
    Fut: Future<Output = Result<S, TxError>>,
    S: SubmittedTx,
{
    let mut attempts: u32 = 0;

    let outcome = (|| {
        let multiplier = GasMultiplier::for_attempt(attempts);
        tracing::info!(label, attempt = attempts, %multiplier, "Submitting transaction");
        attempts += 1;
        let submission = build_and_submit(multiplier);
        async move {
            let pending = submission.await?;
            tracing::info!(label, tx_hash = %pending.tx_hash(), "Transaction submitted");
            pending.confirm().await
        }
    })
    .retry(policy.strategy())
    .sleep(tokio::time::sleep)
    .when(TxError::is_retryable)
    .notify(|error: &TxError, backoff: Duration| {
        tracing::warn!(
            label,
            error = %error,
            backoff_ms = backoff.as_millis() as u64,
            "Transaction attempt failed, retrying with more gas"
        );
    })
    .await;

    match outcome {
        Ok(receipt) => {
            tracing::info!(
                label,
                tx_hash = %receipt.tx_hash,
                block_number = receipt.block_number,
                "Transaction confirmed"
            );
            Ok(receipt)
        }
        Err(error) => {
            tracing::error!(label, attempts, error = %error, "Transaction failed");
            Err(ExecutionError {
                label: label.to_string(),
                attempts,
                source: error,
            })
        }
    }
}

/// Run an idempotent read, repeating it only on network failures.
pub async fn execute_read_with_retry<F, Fut, T>(
    label: &str,
    policy: RetryPolicy,
    mut read: F,
) -> Result<T, ExecutionError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, TxError>>,
{
    let mut attempts: u32 = 0;

    let outcome = (|| {
        attempts += 1;
        read()
    })
    .retry(policy.strategy())
    .sleep(tokio::time::sleep)
    .when(TxError::is_retryable_read)
    .notify(|error: &TxError, _: Duration| {
        tracing::warn!(label, error = %error, "Read failed, retrying");
    })
    .await;

    outcome.map_err(|error| {
        tracing::debug!(label, attempts, error = %error, "Read failed");
        ExecutionError {
            label: label.to_string(),
            attempts,
            source: error,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Pending transaction that confirms with a canned result.
    struct FakePending {
        hash: String,
        result: Result<TxReceipt, TxError>,
    }

    impl SubmittedTx for FakePending {
        fn tx_hash(&self) -> String {
            self.hash.clone()
        }

        async fn confirm(self) -> Result<TxReceipt, TxError> {
            self.result
        }
    }

    fn receipt(n: u64) -> TxReceipt {
        TxReceipt {
            tx_hash: format!("0x{n:02x}"),
            block_number: 100 + n,
            gas_used: 21_000,
        }
    }

    fn confirmed(n: u64) -> FakePending {
        FakePending {
            hash: format!("0x{n:02x}"),
            result: Ok(receipt(n)),
        }
    }

    fn policy() -> RetryPolicy {
        RetryPolicy::default().with_backoff(Duration::ZERO)
    }

    /// Builder that replays scripted outcomes and records multipliers.
    fn scripted(
        script: Vec<Result<FakePending, TxError>>,
    ) -> (
        Arc<Mutex<Vec<GasMultiplier>>>,
        impl FnMut(GasMultiplier) -> std::future::Ready<Result<FakePending, TxError>>,
    ) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorder = seen.clone();
        let mut script = script.into_iter();
        let builder = move |m: GasMultiplier| {
            recorder.lock().unwrap().push(m);
            std::future::ready(script.next().expect("builder called too often"))
        };
        (seen, builder)
    }

    #[tokio::test]
    async fn succeeds_on_first_attempt() {
        let (seen, builder) = scripted(vec![Ok(confirmed(1))]);

        let result = execute_with_retry("storeSecret", policy(), builder).await;

        assert_eq!(result.unwrap(), receipt(1));
        assert_eq!(*seen.lock().unwrap(), vec![GasMultiplier::BASE]);
    }

    #[tokio::test]
    async fn revert_is_not_retried_and_propagates_unchanged() {
        let revert = TxError::classify("execution reverted: User already exists");
        let (seen, builder) = scripted(vec![Err(revert.clone()), Ok(confirmed(2))]);

        let err = execute_with_retry("storeSecret", policy(), builder)
            .await
            .unwrap_err();

        assert_eq!(seen.lock().unwrap().len(), 1);
        assert_eq!(err.attempts, 1);
        assert_eq!(err.label, "storeSecret");
        assert_eq!(err.cause(), &revert);
    }

    #[tokio::test]
    async fn timeouts_escalate_gas_until_success() {
        let (seen, builder) = scripted(vec![
            Err(TxError::classify("request timed out")),
            Err(TxError::classify("request timed out")),
            Ok(confirmed(3)),
        ]);

        let result = execute_with_retry("registerSubnodeRecord", policy(), builder).await;

        assert_eq!(result.unwrap(), receipt(3));
        let multipliers: Vec<f64> = seen.lock().unwrap().iter().map(|m| m.as_f64()).collect();
        assert_eq!(multipliers, vec![1.0, 1.5, 2.0]);
    }

    #[tokio::test]
    async fn persistent_nonce_conflict_exhausts_attempts() {
        let nonce = TxError::classify("nonce too low");
        let (seen, builder) = scripted(vec![
            Err(nonce.clone()),
            Err(nonce.clone()),
            Err(nonce.clone()),
        ]);

        let err = execute_with_retry("deleteSecret", policy(), builder)
            .await
            .unwrap_err();

        assert_eq!(seen.lock().unwrap().len(), 3);
        assert_eq!(err.attempts, 3);
        assert_eq!(err.into_cause(), nonce);
    }

    #[tokio::test]
    async fn unknown_error_is_fatal() {
        let (seen, builder) = scripted(vec![Err(TxError::classify(
            "insufficient funds for gas * price + value",
        ))]);

        let err = execute_with_retry("storeSecret", policy(), builder)
            .await
            .unwrap_err();

        assert_eq!(seen.lock().unwrap().len(), 1);
        assert!(matches!(err.cause(), TxError::Unknown(_)));
    }

    #[tokio::test]
    async fn reverted_receipt_during_confirmation_is_fatal() {
        let (seen, builder) = scripted(vec![Ok(FakePending {
            hash: "0xdead".into(),
            result: Err(TxError::Reverted("transaction 0xdead reverted".into())),
        })]);

        let err = execute_with_retry("executeTransaction", policy(), builder)
            .await
            .unwrap_err();

        assert_eq!(seen.lock().unwrap().len(), 1);
        assert!(matches!(err.cause(), TxError::Reverted(_)));
    }

    #[tokio::test]
    async fn confirmation_timeout_triggers_resubmission() {
        let (seen, builder) = scripted(vec![
            Ok(FakePending {
                hash: "0x01".into(),
                result: Err(TxError::NetworkTimeout("receipt poll timed out".into())),
            }),
            Ok(confirmed(2)),
        ]);

        let result = execute_with_retry("storeSecret", policy(), builder).await;

        assert_eq!(result.unwrap(), receipt(2));
        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn zero_retries_means_single_attempt() {
        let (seen, builder) = scripted(vec![Err(TxError::classify("out of gas"))]);

        let err = execute_with_retry("storeSecret", policy().with_max_retries(0), builder)
            .await
            .unwrap_err();

        assert_eq!(seen.lock().unwrap().len(), 1);
        assert!(matches!(err.cause(), TxError::OutOfGas(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn waits_backoff_between_attempts() {
        let (_, builder) = scripted(vec![Err(TxError::classify("timeout")), Ok(confirmed(1))]);
        let started = tokio::time::Instant::now();

        execute_with_retry("storeSecret", RetryPolicy::default(), builder)
            .await
            .unwrap();

        assert!(started.elapsed() >= DEFAULT_BACKOFF);
    }

    #[tokio::test(start_paused = true)]
    async fn no_wait_after_final_attempt() {
        let timeout = TxError::classify("timeout");
        let (seen, builder) = scripted(vec![
            Err(timeout.clone()),
            Err(timeout.clone()),
            Err(timeout.clone()),
        ]);
        let started = tokio::time::Instant::now();

        let err = execute_with_retry("storeSecret", RetryPolicy::default(), builder)
            .await
            .unwrap_err();

        assert_eq!(seen.lock().unwrap().len(), 3);
        assert_eq!(err.attempts, 3);
        assert!(started.elapsed() >= DEFAULT_BACKOFF * 2);
        assert!(started.elapsed() < DEFAULT_BACKOFF * 3);
    }

    #[test]
    fn failed_receipt_using_whole_gas_limit_is_out_of_gas() {
        let err = failed_receipt_error("0xab", 7, 90_000, 90_000);
        assert!(matches!(err, TxError::OutOfGas(_)));
        assert!(err.is_retryable());

        let err = failed_receipt_error("0xab", 7, 45_000, 90_000);
        assert!(matches!(err, TxError::Reverted(_)));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn gas_exhausted_receipt_is_resubmitted_with_more_gas() {
        let (seen, builder) = scripted(vec![
            Ok(FakePending {
                hash: "0x01".into(),
                result: Err(failed_receipt_error("0x01", 9, 60_000, 60_000)),
            }),
            Ok(confirmed(2)),
        ]);

        let result = execute_with_retry("registerSubnodeRecord", policy(), builder).await;

        assert_eq!(result.unwrap(), receipt(2));
        let multipliers: Vec<f64> = seen.lock().unwrap().iter().map(|m| m.as_f64()).collect();
        assert_eq!(multipliers, vec![1.0, 1.5]);
    }

    #[tokio::test]
    async fn read_retries_only_network_failures() {
        let calls = Arc::new(Mutex::new(0u32));

        let counter = calls.clone();
        let value = execute_read_with_retry("getWalletAddress", policy(), move || {
            let mut n = counter.lock().unwrap();
            *n += 1;
            let result = if *n < 3 {
                Err(TxError::classify("connection reset"))
            } else {
                Ok(42u64)
            };
            std::future::ready(result)
        })
        .await
        .unwrap();
        assert_eq!(value, 42);
        assert_eq!(*calls.lock().unwrap(), 3);

        *calls.lock().unwrap() = 0;
        let counter = calls.clone();
        let err = execute_read_with_retry("getWalletAddress", policy(), move || {
            *counter.lock().unwrap() += 1;
            std::future::ready(Err::<u64, _>(TxError::classify("nonce too low")))
        })
        .await
        .unwrap_err();
        assert_eq!(*calls.lock().unwrap(), 1);
        assert!(matches!(err.cause(), TxError::NonceConflict(_)));
    }
}
