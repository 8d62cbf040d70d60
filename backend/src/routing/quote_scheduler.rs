use crate::dexes::DexError;
use crate::types::TradeDirection;
use alloy::primitives::Address;
use dashmap::{mapref::entry::Entry, DashMap};
use std::future::Future;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

const RETRY_BACKOFF: Duration = Duration::from_millis(200);

/// One logical quote stream; a newer request on the same key supersedes older ones.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QuoteKey {
    pub client: String,
    pub chain_id: u64,
    pub token_in: Address,
    pub token_out: Address,
    pub direction: TradeDirection,
}

/// Per-key sequence plus the number of requests still holding a ticket.
#[derive(Debug, Default)]
struct Sequence {
    latest: AtomicU64,
    active: AtomicUsize,
}

/// Debounces quote requests per key and discards results of superseded requests.
///
/// Every call takes the next sequence number for its key, sleeps out the
/// debounce window and only runs if it is still the newest. A result that
/// lands after a newer request was issued is dropped as [`DexError::Cancelled`].
/// A key is forgotten once no request holds a ticket for it.
pub struct QuoteScheduler {
    debounce: Duration,
    max_attempts: u32,
    sequences: DashMap<QuoteKey, Arc<Sequence>>,
}

/// Releases the ticket even when the request future is dropped mid-flight.
struct Ticket<'a> {
    scheduler: &'a QuoteScheduler,
    key: &'a QuoteKey,
    sequence: Arc<Sequence>,
    number: u64,
}

impl Ticket<'_> {
    fn is_current(&self) -> bool {
        self.sequence.latest.load(Ordering::SeqCst) == self.number
    }
}

impl Drop for Ticket<'_> {
    fn drop(&mut self) {
        self.scheduler.release(self.key, &self.sequence);
    }
}

impl QuoteScheduler {
    pub fn new(debounce: Duration, max_attempts: u32) -> Self {
        Self {
            debounce,
            max_attempts: max_attempts.max(1),
            sequences: DashMap::new(),
        }
    }

    pub async fn run<T, F, Fut>(&self, key: QuoteKey, mut operation: F) -> Result<T, DexError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, DexError>>,
    {
        let ticket = self.issue_ticket(&key);

        sleep(self.debounce).await;
        if !ticket.is_current() {
            debug!(?key, ticket = ticket.number, "Quote superseded during debounce");
            return Err(DexError::Cancelled);
        }

        let mut attempt = 1;
        loop {
            let result = operation().await;

            if !ticket.is_current() {
                debug!(?key, ticket = ticket.number, "Discarding stale quote result");
                return Err(DexError::Cancelled);
            }

            match result {
                Err(e) if e.is_transient() && attempt < self.max_attempts => {
                    warn!(?key, attempt, "Quote attempt failed, retrying: {}", e);
                    sleep(RETRY_BACKOFF * attempt).await;
                    if !ticket.is_current() {
                        debug!(?key, ticket = ticket.number, "Quote superseded during retry backoff");
                        return Err(DexError::Cancelled);
                    }
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    /// Supersede whatever is pending or in flight for `key`.
    pub fn cancel(&self, key: &QuoteKey) {
        if let Some(sequence) = self.sequences.get(key) {
            sequence.latest.fetch_add(1, Ordering::SeqCst);
        }
    }

    pub fn latest_sequence(&self, key: &QuoteKey) -> u64 {
        self.sequences
            .get(key)
            .map(|sequence| sequence.latest.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    /// Keys with a request pending or in flight.
    pub fn tracked_keys(&self) -> usize {
        self.sequences.len()
    }

    fn issue_ticket<'a>(&'a self, key: &'a QuoteKey) -> Ticket<'a> {
        // counted under the shard lock so `release` cannot interleave
        let sequence = self.sequences.entry(key.clone()).or_default();
        sequence.active.fetch_add(1, Ordering::SeqCst);
        let number = sequence.latest.fetch_add(1, Ordering::SeqCst) + 1;

        Ticket {
            scheduler: self,
            key,
            sequence: sequence.clone(),
            number,
        }
    }

    fn release(&self, key: &QuoteKey, sequence: &Arc<Sequence>) {
        if let Entry::Occupied(entry) = self.sequences.entry(key.clone()) {
            if Arc::ptr_eq(entry.get(), sequence) && sequence.active.fetch_sub(1, Ordering::SeqCst) == 1 {
                entry.remove();
            }
        }
    }
}
