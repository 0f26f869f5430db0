//! Append-only latency sample storage.
//!
//! Samples live in fixed-capacity chunks that are allocated one at a time as
//! the previous chunk fills up. The number of chunks is capped; once the cap
//! is reached and the last chunk is full, further samples are dropped.

use log::debug;

/// Samples per chunk.
pub const DEFAULT_CHUNK_CAPACITY: usize = 8191;

/// Hard ceiling on allocated chunks. With the default chunk size this is a
/// bit over 32M samples.
pub const DEFAULT_MAX_CHUNKS: usize = 4097;

/// Aggregate statistics over every sample in a store.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Statistics {
    pub n: usize,
    pub mean: f64,
    pub stddev: f64,
    /// Lag-1 autocorrelation, seeded with the mean as the sample before the first.
    pub rho: f64,
}

/// One fixed-capacity block of samples. Its buffer is allocated once with the
/// full capacity and never grows past it.
#[derive(Debug)]
struct Chunk {
    samples: Vec<i64>,
}

impl Chunk {
    fn new(capacity: usize) -> Self {
        Chunk {
            samples: Vec::with_capacity(capacity),
        }
    }

    fn is_full(&self, capacity: usize) -> bool {
        self.samples.len() >= capacity
    }
}

#[derive(Debug)]
pub struct SampleStore {
    chunks: Vec<Chunk>,
    chunk_capacity: usize,
    max_chunks: usize,
    total: usize,
    dropped: u64,
}

impl Default for SampleStore {
    fn default() -> Self {
        SampleStore::new(DEFAULT_CHUNK_CAPACITY, DEFAULT_MAX_CHUNKS)
    }
}

impl SampleStore {
    /// Create an empty store. Zero values are bumped to 1 so the store can
    /// always hold at least one sample; `ProbeConfig::validate` rejects them
    /// earlier for user input.
    pub fn new(chunk_capacity: usize, max_chunks: usize) -> Self {
        SampleStore {
            chunks: Vec::new(),
            chunk_capacity: chunk_capacity.max(1),
            max_chunks: max_chunks.max(1),
            total: 0,
            dropped: 0,
        }
    }

    /// Append a latency sample (microseconds).
    ///
    /// Allocates a new chunk when there is none yet or the last one is full.
    /// At the chunk ceiling the sample is silently dropped.
    pub fn record(&mut self, sample: i64) {
        let needs_chunk = match self.chunks.last() {
            Some(chunk) => chunk.is_full(self.chunk_capacity),
            None => true,
        };

        if needs_chunk {
            if self.chunks.len() >= self.max_chunks {
                if self.dropped == 0 {
                    debug!(
                        "Sample store full ({} chunks x {}), dropping further samples",
                        self.max_chunks, self.chunk_capacity
                    );
                }
                self.dropped += 1;
                return;
            }
            self.chunks.push(Chunk::new(self.chunk_capacity));
        }

        if let Some(chunk) = self.chunks.last_mut() {
            chunk.samples.push(sample);
            self.total += 1;
        }
    }

    /// Number of samples held across all chunks.
    pub fn total_count(&self) -> usize {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn chunk_capacity(&self) -> usize {
        self.chunk_capacity
    }

    pub fn max_chunks(&self) -> usize {
        self.max_chunks
    }

    /// Maximum number of samples the store will ever hold.
    pub fn capacity(&self) -> usize {
        self.chunk_capacity.saturating_mul(self.max_chunks)
    }

    /// True once the ceiling is reached and the last chunk is full.
    pub fn is_full(&self) -> bool {
        self.total >= self.capacity()
    }

    /// Samples discarded because the store was full.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Per-chunk views, oldest first.
    pub fn chunks(&self) -> impl Iterator<Item = &[i64]> {
        self.chunks.iter().map(|c| c.samples.as_slice())
    }

    /// All samples in arrival order.
    pub fn iter(&self) -> impl Iterator<Item = i64> + '_ {
        self.chunks().flat_map(|c| c.iter().copied())
    }

    /// Mean, standard deviation and lag-1 autocorrelation over every sample.
    ///
    /// Returns `None` for an empty store. The standard deviation uses the
    /// sum-of-squares form with an `n - 1` denominator; it is `0.0` for a
    /// single sample, and a slightly negative variance from rounding is
    /// clamped to zero. `rho` is `0.0` when its denominator vanishes (one
    /// sample, or all samples equal).
    pub fn statistics(&self) -> Option<Statistics> {
        if self.is_empty() {
            return None;
        }

        let mut n = 0usize;
        let mut sum = 0.0f64;
        let mut sum_sq = 0.0f64;
        for x in self.iter() {
            let x = x as f64;
            n += 1;
            sum += x;
            sum_sq += x * x;
        }

        let n_f = n as f64;
        let mean = sum / n_f;
        let stddev = if n > 1 {
            ((sum_sq - n_f * mean * mean) / (n_f - 1.0)).max(0.0).sqrt()
        } else {
            0.0
        };

        // x_0 is the mean itself, so the first term adds nothing
        let mut prev = mean;
        let mut top = 0.0f64;
        let mut bottom = 0.0f64;
        for x in self.iter() {
            let x = x as f64;
            top += (x - mean) * (prev - mean);
            bottom += (prev - mean) * (prev - mean);
            prev = x;
        }
        let rho = if bottom != 0.0 { top / bottom } else { 0.0 };

        Some(Statistics { n, mean, stddev, rho })
    }
}
