//! Typed engine configuration.

use crate::filter::Quality;

/// Worker fan-out per core; oversubscribes to keep cores busy during
/// memory-bound phases.
const WORKERS_PER_CORE: usize = 4;

/// Configuration builder for a resampler.
///
/// Collects every setting before the filter is constructed, so the order
/// of `with_*` calls does not matter.
#[derive(Debug, Clone)]
pub struct ResamplerConfig {
    pub(crate) quality: Quality,
    pub(crate) memoization: bool,
    pub(crate) workers: Option<usize>,
}

impl Default for ResamplerConfig {
    fn default() -> Self {
        Self {
            quality: Quality::KaiserFast,
            memoization: true,
            workers: None,
        }
    }
}

impl ResamplerConfig {
    /// Create a configuration with the defaults: kaiser_fast quality,
    /// memoization on, worker count derived from the core count.
    pub fn new() -> Self {
        Self::default()
    }

    /// Select the filter quality preset.
    pub fn with_quality(mut self, quality: Quality) -> Self {
        self.quality = quality;
        self
    }

    /// Enable or disable the per-phase weight cache.
    ///
    /// The cache costs `phases * wing * 8` bytes; disabling it trades
    /// speed for memory, which is worthwhile only when the rate pair has
    /// a tiny greatest common divisor (e.g. 9999 and 10000). Most callers
    /// should switch to a shorter filter instead.
    pub fn with_memoization(mut self, enabled: bool) -> Self {
        self.memoization = enabled;
        self
    }

    /// Override the worker count used to partition output frames.
    ///
    /// Any worker count produces bit-identical output; this only affects
    /// scheduling.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers.max(1));
        self
    }

    /// Compute every output frame on the calling thread. Equivalent to
    /// `with_workers(1)`; useful for reproducibility testing.
    pub fn sequential(self) -> Self {
        self.with_workers(1)
    }

    /// The effective worker count.
    pub(crate) fn effective_workers(&self) -> usize {
        self.workers.unwrap_or_else(default_workers)
    }
}

/// Default worker count: four per available core.
pub(crate) fn default_workers() -> usize {
    let cores = std::thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(4);
    cores * WORKERS_PER_CORE
}
