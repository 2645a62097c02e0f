//! In-memory audit trail of upstream attempts.
//!
//! A fixed-capacity ring, newest first. Entries are written pending when an
//! attempt starts and finalized exactly once when it ends; the oldest entry
//! is evicted on overflow.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_CAPACITY: usize = 200;
pub const DEFAULT_QUERY_COUNT: usize = 50;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(start) }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderLogEntry {
    pub id: String,
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
    pub provider: String,
    pub model: String,
    pub attempt: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub fallback_used: bool,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl ProviderLogEntry {
    pub fn is_pending(&self) -> bool {
        self.finished_at.is_none()
    }

    pub fn duration_ms(&self) -> Option<i64> {
        self.finished_at.map(|f| (f - self.timestamp).num_milliseconds())
    }
}

/// Fields known when an attempt starts.
#[derive(Debug, Clone)]
pub struct AttemptStart<'a> {
    pub request_id: &'a str,
    pub provider: &'a str,
    pub model: &'a str,
    pub attempt: u32,
    pub image_url: Option<&'a str>,
    pub fallback_used: bool,
}

pub struct ProviderLogBook {
    capacity: usize,
    clock: Arc<dyn Clock>,
    entries: Mutex<VecDeque<ProviderLogEntry>>,
    next_seq: AtomicU64,
}

impl std::fmt::Debug for ProviderLogBook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderLogBook")
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .finish()
    }
}

impl Default for ProviderLogBook {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl ProviderLogBook {
    pub fn new(capacity: usize) -> Self {
        Self::with_clock(capacity, Arc::new(SystemClock))
    }

    pub fn with_clock(capacity: usize, clock: Arc<dyn Clock>) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            clock,
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
            next_seq: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<ProviderLogEntry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `<epoch ms>-<seq>-<random>`, used for entries and for request
    /// correlation. The sequence keeps ids unique within one book even when
    /// the clock does not move.
    pub fn new_id(&self) -> String {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let n: u32 = rand::random::<u32>() % 1_000_000;
        format!("{}-{seq}-{n}", self.clock.now().timestamp_millis())
    }

    /// Record a pending attempt; returns its entry id.
    pub fn begin(&self, start: AttemptStart<'_>) -> String {
        let entry = ProviderLogEntry {
            id: self.new_id(),
            request_id: start.request_id.to_string(),
            timestamp: self.clock.now(),
            provider: start.provider.to_string(),
            model: start.model.to_string(),
            attempt: start.attempt,
            image_url: start.image_url.map(str::to_string),
            fallback_used: start.fallback_used,
            success: false,
            error: None,
            finished_at: None,
        };
        let id = entry.id.clone();
        let mut entries = self.lock();
        entries.push_front(entry);
        while entries.len() > self.capacity {
            entries.pop_back();
        }
        id
    }

    /// Finalize a pending entry. Returns false if the entry was already
    /// finalized or has been evicted.
    pub fn finish(&self, id: &str, outcome: Result<(), String>) -> bool {
        let now = self.clock.now();
        let mut entries = self.lock();
        let Some(entry) = entries.iter_mut().find(|e| e.id == id && e.is_pending()) else {
            tracing::debug!(id, "provider log entry gone before finish");
            return false;
        };
        entry.finished_at = Some(now);
        match outcome {
            Ok(()) => entry.success = true,
            Err(e) => entry.error = Some(e),
        }
        true
    }

    /// Up to `count` entries, newest first.
    pub fn recent(&self, count: usize) -> Vec<ProviderLogEntry> {
        self.lock().iter().take(count.min(self.capacity)).cloned().collect()
    }

    pub fn snapshot(&self) -> Vec<ProviderLogEntry> {
        self.lock().iter().cloned().collect()
    }

    /// Drop every entry; returns how many were removed.
    pub fn clear(&self) -> usize {
        let mut entries = self.lock();
        let n = entries.len();
        entries.clear();
        n
    }
}
