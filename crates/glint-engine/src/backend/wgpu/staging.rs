//! Pool of host-writable staging chunks.
//!
//! A chunk moves through three states:
//!
//! - available: mapped for writing, ready to hand out;
//! - in flight: written and referenced by a recorded copy, awaiting submit;
//! - pending: submitted, remap requested, returned through the channel once
//!   the device signals completion.
//!
//! A chunk whose remap fails is reported through the same channel and
//! dropped; it stops counting as pending.
//!
//! `acquire` never waits. When no available chunk is large enough a new one is
//! allocated.

use std::sync::mpsc::{self, Receiver, Sender};

/// Something the pool can hand out and size-match.
pub trait StagingChunk {
    fn size(&self) -> u64;
}

impl StagingChunk for wgpu::Buffer {
    fn size(&self) -> u64 {
        wgpu::Buffer::size(self)
    }
}

/// Snapshot of the pool for diagnostics and tests.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct StagingStats {
    pub available: usize,
    pub in_flight: usize,
    pub pending: usize,
    pub allocated: usize,
    /// Chunks dropped after a failed remap.
    pub lost: usize,
}

/// Hands one recalled chunk back to its pool.
pub struct ChunkReturn<T> {
    tx: Sender<Option<T>>,
}

impl<T> ChunkReturn<T> {
    /// The chunk is writable again.
    pub fn ready(self, chunk: T) {
        let _ = self.tx.send(Some(chunk));
    }

    /// The remap failed and the chunk is gone.
    pub fn failed(self) {
        let _ = self.tx.send(None);
    }
}

pub struct StagingPool<T> {
    available: Vec<T>,
    in_flight: Vec<T>,
    pending: usize,
    allocated: usize,
    lost: usize,
    min_chunk: u64,
    tx: Sender<Option<T>>,
    rx: Receiver<Option<T>>,
}

impl<T: StagingChunk> StagingPool<T> {
    pub fn new(min_chunk: u64) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            available: Vec::new(),
            in_flight: Vec::new(),
            pending: 0,
            allocated: 0,
            lost: 0,
            min_chunk: min_chunk.max(4),
            tx,
            rx,
        }
    }

    /// Returns a chunk of at least `size` bytes, reusing a returned one when
    /// possible and calling `alloc` with the rounded size otherwise.
    pub fn acquire(&mut self, size: u64, alloc: impl FnOnce(u64) -> T) -> T {
        self.reclaim();
        let best = self
            .available
            .iter()
            .enumerate()
            .filter(|(_, c)| c.size() >= size)
            .min_by_key(|(_, c)| c.size())
            .map(|(i, _)| i);
        if let Some(i) = best {
            return self.available.swap_remove(i);
        }
        self.allocated += 1;
        alloc(size.max(self.min_chunk).next_power_of_two())
    }

    /// Marks a written chunk as referenced by the encoder being recorded.
    pub fn submit(&mut self, chunk: T) {
        self.in_flight.push(chunk);
    }

    /// Called after the encoder holding the in-flight chunks was submitted.
    /// `remap` receives each chunk plus the handle that reports how its remap
    /// ended.
    pub fn recall(&mut self, mut remap: impl FnMut(T, ChunkReturn<T>)) {
        for chunk in self.in_flight.drain(..) {
            self.pending += 1;
            remap(chunk, ChunkReturn { tx: self.tx.clone() });
        }
    }

    /// Moves every chunk that completed its remap back to `available`.
    pub fn reclaim(&mut self) {
        while let Ok(returned) = self.rx.try_recv() {
            self.pending = self.pending.saturating_sub(1);
            match returned {
                Some(chunk) => self.available.push(chunk),
                None => self.lost += 1,
            }
        }
    }

    pub fn stats(&self) -> StagingStats {
        StagingStats {
            available: self.available.len(),
            in_flight: self.in_flight.len(),
            pending: self.pending,
            allocated: self.allocated,
            lost: self.lost,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Chunk {
        id: u32,
        size: u64,
    }

    impl StagingChunk for Chunk {
        fn size(&self) -> u64 {
            self.size
        }
    }

    fn alloc(counter: &mut u32) -> impl FnOnce(u64) -> Chunk + '_ {
        move |size| {
            *counter += 1;
            Chunk { id: *counter, size }
        }
    }

    #[test]
    fn allocates_rounded_when_empty() {
        let mut pool = StagingPool::new(256);
        let mut n = 0;
        let c = pool.acquire(100, alloc(&mut n));
        assert_eq!(c.size, 256);
        let c = pool.acquire(1000, alloc(&mut n));
        assert_eq!(c.size, 1024);
        assert_eq!(pool.stats().allocated, 2);
    }

    #[test]
    fn in_flight_chunks_are_not_reused_until_returned() {
        let mut pool = StagingPool::new(64);
        let mut n = 0;
        let a = pool.acquire(64, alloc(&mut n));
        pool.submit(a);

        // Still in flight: a second request must allocate, not wait.
        let b = pool.acquire(64, alloc(&mut n));
        assert_eq!(b.id, 2);
        pool.submit(b);

        let mut remapped = Vec::new();
        pool.recall(|chunk, tx| remapped.push((chunk, tx)));
        assert_eq!(pool.stats().pending, 2);

        // Completion arrives for the first chunk only.
        let (chunk, ret) = remapped.remove(0);
        ret.ready(chunk);

        let c = pool.acquire(64, alloc(&mut n));
        assert_eq!(c.id, 1);
        assert_eq!(pool.stats().pending, 1);
        assert_eq!(pool.stats().allocated, 2);
    }

    #[test]
    fn smallest_fitting_chunk_is_preferred() {
        let mut pool = StagingPool::new(4);
        let mut n = 0;
        let big = pool.acquire(4096, alloc(&mut n));
        let small = pool.acquire(64, alloc(&mut n));
        pool.submit(big);
        pool.submit(small);
        pool.recall(|chunk, ret| ret.ready(chunk));

        let c = pool.acquire(32, alloc(&mut n));
        assert_eq!(c.size, 64);
        assert_eq!(pool.stats().available, 1);
    }

    #[test]
    fn failed_remap_stops_counting_as_pending() {
        let mut pool = StagingPool::new(64);
        let mut n = 0;
        let a = pool.acquire(64, alloc(&mut n));
        let b = pool.acquire(64, alloc(&mut n));
        pool.submit(a);
        pool.submit(b);
        pool.recall(|chunk, ret| if chunk.id == 1 { ret.failed() } else { ret.ready(chunk) });
        pool.reclaim();

        let stats = pool.stats();
        assert_eq!((stats.pending, stats.available, stats.lost), (0, 1, 1));
        // The survivor is reused; the lost chunk is replaced by a fresh one.
        assert_eq!(pool.acquire(64, alloc(&mut n)).id, 2);
        assert_eq!(pool.acquire(64, alloc(&mut n)).id, 3);
    }
}
