//! Prepared statement cache.
//!
//! Entries are keyed by `database-sql`. The cache owns one `Arc` per entry; every user of a
//! statement holds a [`PrepareHandle`] that counts itself in the entry's share counter.
//! A statement is closed on the server once it is out of the cache and its last handle is
//! gone. Closing is deferred: the statement id is queued and sent as COM_STMT_CLOSE before
//! the next command.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crossbeam_queue::SegQueue;
use lru::LruCache;
use parking_lot::Mutex;

use crate::col::ColumnDefinition;
use crate::protocol::command::prepared::StatementMetadata;

/// A prepared statement shared between the cache and its handles
#[derive(Debug)]
pub struct PrepareResult {
    statement_id: u32,
    params: Vec<ColumnDefinition>,
    columns: Arc<[ColumnDefinition]>,
    shares: AtomicUsize,
    cached: AtomicBool,
    closed: AtomicBool,
    pending_close: Arc<SegQueue<u32>>,
}

impl PrepareResult {
    fn new(metadata: StatementMetadata, pending_close: Arc<SegQueue<u32>>) -> Self {
        Self {
            statement_id: metadata.statement_id,
            params: metadata.params,
            columns: metadata.columns.into(),
            shares: AtomicUsize::new(0),
            cached: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            pending_close,
        }
    }

    pub fn statement_id(&self) -> u32 {
        self.statement_id
    }

    pub fn params(&self) -> &[ColumnDefinition] {
        &self.params
    }

    pub fn columns(&self) -> &Arc<[ColumnDefinition]> {
        &self.columns
    }

    /// Number of live handles
    pub fn share_count(&self) -> usize {
        self.shares.load(Ordering::SeqCst)
    }

    pub fn is_cached(&self) -> bool {
        self.cached.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn handle(self: &Arc<Self>) -> PrepareHandle {
        self.shares.fetch_add(1, Ordering::SeqCst);
        PrepareHandle {
            inner: Arc::clone(self),
        }
    }

    /// Queue the statement for COM_STMT_CLOSE. Only the first call has an effect.
    fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            tracing::debug!(statement_id = self.statement_id, "statement queued for close");
            self.pending_close.push(self.statement_id);
        }
    }

    fn evict(&self) {
        self.cached.store(false, Ordering::SeqCst);
        if self.shares.load(Ordering::SeqCst) == 0 {
            self.close();
        }
    }
}

/// A counted reference to a [`PrepareResult`]
///
/// Dropping the last handle of an entry that is no longer cached closes the statement.
#[derive(Debug)]
pub struct PrepareHandle {
    inner: Arc<PrepareResult>,
}

impl PrepareHandle {
    pub fn statement_id(&self) -> u32 {
        self.inner.statement_id
    }

    pub fn params(&self) -> &[ColumnDefinition] {
        &self.inner.params
    }

    pub fn columns(&self) -> &Arc<[ColumnDefinition]> {
        &self.inner.columns
    }

    pub fn share_count(&self) -> usize {
        self.inner.share_count()
    }

    pub fn is_cached(&self) -> bool {
        self.inner.is_cached()
    }
}

impl Clone for PrepareHandle {
    fn clone(&self) -> Self {
        self.inner.handle()
    }
}

impl Drop for PrepareHandle {
    fn drop(&mut self) {
        if self.inner.shares.fetch_sub(1, Ordering::SeqCst) == 1 && !self.inner.is_cached() {
            self.inner.close();
        }
    }
}

/// LRU cache of prepared statements for one connection
#[derive(Debug)]
pub struct PrepareCache {
    entries: Option<Mutex<LruCache<String, Arc<PrepareResult>>>>,
    pending_close: Arc<SegQueue<u32>>,
}

impl PrepareCache {
    /// A capacity of 0 disables caching: every statement is closed when its handle drops.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: NonZeroUsize::new(capacity).map(|cap| Mutex::new(LruCache::new(cap))),
            pending_close: Arc::new(SegQueue::new()),
        }
    }

    pub fn key(db: Option<&str>, sql: &str) -> String {
        format!("{}-{}", db.unwrap_or_default(), sql)
    }

    /// A handle to the cached statement for `sql` on `db`, if any.
    pub fn get(&self, db: Option<&str>, sql: &str) -> Option<PrepareHandle> {
        let entries = self.entries.as_ref()?;
        let key = Self::key(db, sql);
        let mut entries = entries.lock();
        match entries.get(&key).map(Arc::clone) {
            Some(entry) if !entry.is_closed() => {
                tracing::debug!(statement_id = entry.statement_id, "statement cache hit");
                Some(entry.handle())
            }
            Some(_) => {
                entries.pop(&key);
                tracing::debug!(sql, "statement cache hit on a closed statement");
                None
            }
            None => {
                tracing::debug!(sql, "statement cache miss");
                None
            }
        }
    }

    /// Cache a freshly prepared statement and return a handle to it.
    pub fn insert(&self, db: Option<&str>, sql: &str, metadata: StatementMetadata) -> PrepareHandle {
        let entry = Arc::new(PrepareResult::new(metadata, Arc::clone(&self.pending_close)));
        let handle = entry.handle();
        let Some(entries) = self.entries.as_ref() else {
            return handle;
        };
        entry.cached.store(true, Ordering::SeqCst);
        let key = Self::key(db, sql);
        if let Some((old_key, old)) = entries.lock().push(key, entry) {
            tracing::debug!(
                statement_id = old.statement_id,
                key = %old_key,
                "statement evicted from cache"
            );
            old.evict();
        }
        handle
    }

    /// Drop every entry. Statements without live handles are queued for close.
    pub fn clear(&self) {
        if let Some(entries) = self.entries.as_ref() {
            let mut entries = entries.lock();
            while let Some((_, entry)) = entries.pop_lru() {
                entry.evict();
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.as_ref().map_or(0, |entries| entries.lock().len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Statement ids waiting for COM_STMT_CLOSE
    pub fn take_pending_closes(&self) -> Vec<u32> {
        std::iter::from_fn(|| self.pending_close.pop()).collect()
    }

    /// Forget queued closes, e.g. after a reconnect invalidated every statement.
    pub fn discard_pending_closes(&self) {
        while self.pending_close.pop().is_some() {}
    }
}
