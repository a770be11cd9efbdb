//! Concurrency gate: bounded admission for network calls.
//!
//! A counting semaphore shared by every unit. A unit holds one permit for the
//! duration of a single request and drops it before sleeping, so units in
//! backoff never occupy a slot.

use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::{Semaphore, SemaphorePermit};

/// Counting semaphore that also tracks how many permits are in use and the
/// highest concurrency observed.
#[derive(Debug)]
pub struct Gate {
    sem: Semaphore,
    capacity: usize,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

/// RAII guard that releases one permit on drop.
#[derive(Debug)]
pub struct GatePermit<'a> {
    gate: &'a Gate,
    _permit: SemaphorePermit<'a>,
}

/// The gate was closed while waiting (shutdown).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateClosed;

impl std::fmt::Display for GateClosed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("concurrency gate closed")
    }
}

impl std::error::Error for GateClosed {}

impl Gate {
    /// Create a gate with `permits` slots (at least one).
    pub fn new(permits: usize) -> Self {
        let capacity = permits.max(1);
        Self {
            sem: Semaphore::new(capacity),
            capacity,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    /// Wait until a permit is available, then take it. Admission is FIFO.
    pub async fn acquire(&self) -> Result<GatePermit<'_>, GateClosed> {
        let permit = self.sem.acquire().await.map_err(|_| GateClosed)?;
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        Ok(GatePermit {
            gate: self,
            _permit: permit,
        })
    }

    /// Stop admitting: pending and future `acquire` calls fail.
    pub fn close(&self) {
        self.sem.close();
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Permits currently held
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of permits held at once since creation
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

impl Drop for GatePermit<'_> {
    fn drop(&mut self) {
        self.gate.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}
