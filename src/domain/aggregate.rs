//! Read-only sums over the payment set, split across worker threads.

use std::ops::Range;
use std::sync::Arc;
use std::thread;

use crossbeam::channel::{self, Receiver};
use parking_lot::Mutex;

use crate::domain::ledger::Ledger;
use crate::domain::payment::Payment;
use crate::domain::types::Money;
use crate::error::{LedgerError, Result};

/// Entries per chunk for the streaming sum.
pub const PROGRESS_CHUNK_SIZE: usize = 100_000;

/// One finished chunk of a streaming sum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// Number of payments in the chunk.
    pub processed: usize,
    pub partial_total: Money,
}

/// Finite, single-use sequence of chunk results, one per chunk, in
/// completion order. Ends once every worker has reported. A chunk whose
/// total does not fit in i64 is reported as [`LedgerError::AmountOverflow`].
///
/// The channel holds one slot per chunk, so workers never block on a consumer
/// that stopped reading; dropping the stream early leaks nothing.
#[derive(Debug)]
pub struct ProgressStream {
    rx: Receiver<Result<Progress>>,
    remaining: usize,
}

impl ProgressStream {
    /// Drains the stream and adds up the partial totals.
    pub fn total(self) -> Result<Money> {
        self.map(|progress| progress.map(|p| p.partial_total))
            .try_fold(Money::ZERO, |acc, partial| {
                acc.checked_add(partial?).ok_or(LedgerError::AmountOverflow)
            })
    }
}

impl Iterator for ProgressStream {
    type Item = Result<Progress>;

    fn next(&mut self) -> Option<Self::Item> {
        let progress = self.rx.recv().ok()?;
        self.remaining = self.remaining.saturating_sub(1);
        Some(progress)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

fn chunk_total(chunk: &[Payment]) -> Result<Money> {
    Money::checked_sum(chunk.iter().map(|p| p.amount)).ok_or(LedgerError::AmountOverflow)
}

/// Sums payment amounts over `workers` contiguous chunks of
/// `ceil(len / workers)` payments. A worker count of 0 is treated as 1.
/// Fails with [`LedgerError::AmountOverflow`] if the total does not fit in i64.
pub fn parallel_sum(payments: &[Payment], workers: usize) -> Result<Money> {
    if payments.is_empty() {
        return Ok(Money::ZERO);
    }

    let workers = workers.max(1);
    let chunk_size = payments.len().div_ceil(workers);
    // `None` once any addition has overflowed.
    let total = Mutex::new(Some(Money::ZERO));

    tracing::debug!(
        "Summing {} payments with {} workers, chunk size {}",
        payments.len(),
        workers,
        chunk_size
    );

    thread::scope(|scope| {
        for chunk in payments.chunks(chunk_size) {
            let total = &total;
            scope.spawn(move || {
                let partial = Money::checked_sum(chunk.iter().map(|p| p.amount));
                let mut total = total.lock();
                *total = (*total)
                    .zip(partial)
                    .and_then(|(acc, partial)| acc.checked_add(partial));
            });
        }
    });

    total.into_inner().ok_or(LedgerError::AmountOverflow)
}

/// Splits `0..len` into ranges of `chunk_size`. There is always at least one
/// range, so an empty set still gets a single `0..0` chunk.
fn chunk_ranges(len: usize, chunk_size: usize) -> Vec<Range<usize>> {
    if len == 0 {
        return vec![0..0];
    }
    (0..len)
        .step_by(chunk_size)
        .map(|start| start..(start + chunk_size).min(len))
        .collect()
}

/// Starts one worker per `chunk_size` payments and returns immediately.
/// Workers share `payments` and slice their own range, so the caller does
/// no per-payment work. An empty payment set yields a single `{0, 0}` record.
pub fn progress_sum(payments: Arc<Vec<Payment>>, chunk_size: usize) -> ProgressStream {
    let ranges = chunk_ranges(payments.len(), chunk_size.max(1));
    let remaining = ranges.len();
    let (tx, rx) = channel::bounded(remaining);

    tracing::debug!(
        "Streaming sum of {} payments over {} chunks",
        payments.len(),
        remaining
    );

    for range in ranges {
        let tx = tx.clone();
        let payments = Arc::clone(&payments);
        thread::spawn(move || {
            let chunk = &payments[range];
            let progress = chunk_total(chunk).map(|partial_total| Progress {
                processed: chunk.len(),
                partial_total,
            });
            if tx.send(progress).is_err() {
                tracing::trace!("Progress stream dropped before chunk finished");
            }
        });
    }
    drop(tx);

    ProgressStream { rx, remaining }
}

impl Ledger {
    /// Total of every payment amount, failed ones included. Blocks until all
    /// workers are done.
    pub fn sum_payments(&self, workers: usize) -> Result<Money> {
        parallel_sum(self.payments(), workers)
    }

    pub fn sum_payments_with_progress(&self) -> ProgressStream {
        progress_sum(self.shared_payments(), PROGRESS_CHUNK_SIZE)
    }

    pub fn sum_payments_in_chunks(&self, chunk_size: usize) -> ProgressStream {
        progress_sum(self.shared_payments(), chunk_size)
    }
}
