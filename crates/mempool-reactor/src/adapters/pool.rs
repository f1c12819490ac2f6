//! # In-Memory Pending Pool
//!
//! Reference implementation of the [`Mempool`] port.
//!
//! ## Admission pipeline
//!
//! ```text
//! check_tx(tx)
//!   ├─ closed?             → Err(Closed)
//!   ├─ tx.len() > max      → Err(TxTooLarge)
//!   ├─ pool at capacity    → Err(MempoolIsFull)
//!   ├─ key in seen-cache   → Err(TxInCache)
//!   └─ Ok(handle) ── spawned: validator.check_tx ──┬─ OK       → insert, wake iterators
//!                                                 └─ rejected → forget from cache
//! ```
//!
//! Entries are ordered by admission sequence number, so an iterator cursor
//! is just the last sequence it yielded. Removing an entry never invalidates
//! a cursor and never causes a repeat.

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::{debug, trace};

use crate::domain::{Entry, MempoolError, Tx, TxKey, DEFAULT_MAX_TX_BYTES};
use crate::ports::outbound::{
    CheckTxHandle, CheckTxResponse, EntryIterator, Mempool, TxRemovedCallback, TxValidator,
};

/// Response code for a transaction that validated but found the pool full.
pub const CODE_TYPE_POOL_FULL: u32 = 100;

/// Pool limits.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PoolConfig {
    /// Maximum number of resident transactions.
    pub size: usize,
    /// Largest single transaction accepted.
    pub max_tx_bytes: usize,
    /// Seen-cache capacity. `0` disables the cache.
    pub cache_size: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            size: 5000,
            max_tx_bytes: DEFAULT_MAX_TX_BYTES,
            cache_size: 10_000,
        }
    }
}

// =============================================================================
// SEEN CACHE
// =============================================================================

/// Bounded set of recently seen transaction keys, oldest evicted first.
#[derive(Debug)]
pub struct TxCache {
    max_size: usize,
    inner: Mutex<CacheState>,
}

#[derive(Debug, Default)]
struct CacheState {
    keys: HashSet<TxKey>,
    order: VecDeque<TxKey>,
}

impl TxCache {
    pub fn new(max_size: usize) -> Self {
        Self {
            max_size,
            inner: Mutex::new(CacheState::default()),
        }
    }

    /// Inserts `key`. `false` if it was already present.
    pub fn push(&self, key: TxKey) -> bool {
        if self.max_size == 0 {
            return true;
        }

        let mut cache = self.inner.lock();
        if cache.keys.contains(&key) {
            return false;
        }

        if cache.keys.len() >= self.max_size {
            if let Some(oldest) = cache.order.pop_front() {
                cache.keys.remove(&oldest);
            }
        }

        cache.keys.insert(key);
        cache.order.push_back(key);
        true
    }

    pub fn remove(&self, key: &TxKey) {
        let mut cache = self.inner.lock();
        if cache.keys.remove(key) {
            cache.order.retain(|k| k != key);
        }
    }

    pub fn contains(&self, key: &TxKey) -> bool {
        self.inner.lock().keys.contains(key)
    }

    pub fn reset(&self) {
        let mut cache = self.inner.lock();
        cache.keys.clear();
        cache.order.clear();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// =============================================================================
// POOL
// =============================================================================

#[derive(Debug, Default)]
struct PoolState {
    entries: BTreeMap<u64, Entry>,
    index: HashMap<TxKey, u64>,
    next_seq: u64,
    /// Height of the last committed block; new entries are stamped with it.
    height: i64,
}

impl PoolState {
    fn insert(&mut self, tx: Tx) -> bool {
        let key = tx.key();
        if self.index.contains_key(&key) {
            return false;
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.insert(seq, Entry::new(tx, self.height));
        self.index.insert(key, seq);
        true
    }

    fn remove(&mut self, key: &TxKey) -> Option<Entry> {
        let seq = self.index.remove(key)?;
        self.entries.remove(&seq)
    }
}

struct PoolInner<V> {
    config: PoolConfig,
    validator: V,
    state: Mutex<PoolState>,
    cache: TxCache,
    notify: Notify,
    on_removed: RwLock<Option<TxRemovedCallback>>,
    closed: AtomicBool,
}

impl<V: TxValidator> PoolInner<V> {
    /// Inserts a validated transaction.
    fn admit(&self, tx: Tx, key: TxKey) -> CheckTxResponse {
        let inserted = {
            let mut state = self.state.lock();
            if state.entries.len() >= self.config.size {
                None
            } else {
                Some(state.insert(tx))
            }
        };

        match inserted {
            None => {
                self.cache.remove(&key);
                let err = MempoolError::MempoolIsFull {
                    capacity: self.config.size,
                };
                CheckTxResponse::rejected(CODE_TYPE_POOL_FULL, err.to_string())
            }
            Some(inserted) => {
                if inserted {
                    trace!(tx = %shared_types::short_hex(&key), "Added tx to pool");
                    self.notify.notify_waiters();
                }
                CheckTxResponse::ok()
            }
        }
    }

    fn fire_removed(&self, keys: &[TxKey]) {
        if keys.is_empty() {
            return;
        }
        if let Some(callback) = self.on_removed.read().as_ref() {
            for key in keys {
                callback(key);
            }
        }
    }
}

/// Insertion-ordered in-memory pool with a seen-cache.
///
/// Validation runs on a spawned tokio task, so `check_tx` must be called
/// from within a runtime.
pub struct InMemoryMempool<V: TxValidator> {
    inner: Arc<PoolInner<V>>,
}

impl<V: TxValidator> InMemoryMempool<V> {
    pub fn new(config: PoolConfig, validator: V) -> Self {
        let cache = TxCache::new(config.cache_size);
        Self {
            inner: Arc::new(PoolInner {
                config,
                validator,
                state: Mutex::new(PoolState::default()),
                cache,
                notify: Notify::new(),
                on_removed: RwLock::new(None),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Applies a committed block: removes its transactions from the pool
    /// and stamps later admissions with `height`.
    ///
    /// Committed transactions stay in the seen-cache so that late gossip of
    /// them is rejected as `TxInCache`.
    pub fn update(&self, height: i64, committed: &[Tx]) {
        let removed: Vec<TxKey> = {
            let mut state = self.inner.state.lock();
            state.height = height;
            committed
                .iter()
                .filter_map(|tx| {
                    let key = tx.key();
                    state.remove(&key).map(|_| key)
                })
                .collect()
        };

        for tx in committed {
            self.inner.cache.push(tx.key());
        }

        debug!(height, removed = removed.len(), "Pool updated");
        self.inner.fire_removed(&removed);
    }

    /// Removes one transaction. `false` if it was not resident.
    pub fn remove_tx(&self, key: &TxKey) -> bool {
        let removed = self.inner.state.lock().remove(key).is_some();
        if removed {
            self.inner.fire_removed(&[*key]);
        }
        removed
    }

    /// Drops every resident transaction and clears the seen-cache.
    pub fn flush(&self) {
        let removed: Vec<TxKey> = {
            let mut state = self.inner.state.lock();
            state.entries.clear();
            state.index.drain().map(|(key, _)| key).collect()
        };
        self.inner.cache.reset();
        self.inner.fire_removed(&removed);
    }

    /// Up to `max` resident transactions in pool order.
    pub fn reap(&self, max: usize) -> Vec<Tx> {
        self.inner
            .state
            .lock()
            .entries
            .values()
            .take(max)
            .map(|e| e.tx().clone())
            .collect()
    }

    /// Rejects all further admissions.
    pub fn close(&self) {
        self.inner.closed.store(true, Ordering::SeqCst);
    }

    pub fn size(&self) -> usize {
        self.inner.state.lock().entries.len()
    }

    pub fn height(&self) -> i64 {
        self.inner.state.lock().height
    }

    pub fn cache(&self) -> &TxCache {
        &self.inner.cache
    }
}

impl<V: TxValidator> Mempool for InMemoryMempool<V> {
    fn check_tx(&self, tx: Tx) -> Result<CheckTxHandle, MempoolError> {
        if self.inner.closed.load(Ordering::SeqCst) {
            return Err(MempoolError::Closed);
        }

        let max = self.inner.config.max_tx_bytes;
        if tx.len() > max {
            return Err(MempoolError::TxTooLarge {
                size: tx.len(),
                max,
            });
        }

        let capacity = self.inner.config.size;
        if self.inner.state.lock().entries.len() >= capacity {
            return Err(MempoolError::MempoolIsFull { capacity });
        }

        let key = tx.key();
        if !self.inner.cache.push(key) {
            return Err(MempoolError::TxInCache);
        }

        let (done, handle) = CheckTxHandle::channel();
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let response = inner.validator.check_tx(&tx).await;
            let response = if response.is_ok() {
                inner.admit(tx, key)
            } else {
                inner.cache.remove(&key);
                debug!(
                    tx = %shared_types::short_hex(&key),
                    code = response.code,
                    "Rejected tx"
                );
                response
            };
            let _ = done.send(response);
        });

        Ok(handle)
    }

    fn contains(&self, key: &TxKey) -> bool {
        self.inner.state.lock().index.contains_key(key)
    }

    fn new_iterator(&self) -> Box<dyn EntryIterator> {
        Box::new(PoolIterator {
            inner: Arc::clone(&self.inner),
            cursor: None,
        })
    }

    fn set_tx_removed_callback(&self, callback: TxRemovedCallback) {
        *self.inner.on_removed.write() = Some(callback);
    }
}

// =============================================================================
// ITERATOR
// =============================================================================

/// Cursor over pool entries by admission sequence.
pub struct PoolIterator<V> {
    inner: Arc<PoolInner<V>>,
    /// Sequence number of the last yielded entry.
    cursor: Option<u64>,
}

impl<V: TxValidator> PoolIterator<V> {
    fn start(&self) -> u64 {
        self.cursor.map_or(0, |seq| seq + 1)
    }

    fn has_next(&self) -> bool {
        self.inner
            .state
            .lock()
            .entries
            .range(self.start()..)
            .next()
            .is_some()
    }
}

#[async_trait]
impl<V: TxValidator> EntryIterator for PoolIterator<V> {
    async fn wait_next(&mut self) {
        loop {
            // Register before checking so an insert in between is not missed.
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.has_next() {
                return;
            }
            notified.await;
        }
    }

    fn next_entry(&mut self) -> Option<Entry> {
        let state = self.inner.state.lock();
        let (seq, entry) = state.entries.range(self.start()..).next()?;
        let entry = entry.clone();
        self.cursor = Some(*seq);
        Some(entry)
    }
}
