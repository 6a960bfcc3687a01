//! Lock-free, log-scaled latency histogram.
//!
//! Buckets are powers of two: bucket `i` covers `[2^i, 2^(i+1))` nanoseconds.
//! `record` is a single relaxed `fetch_add` into the bucket for the sampled
//! value: safe to call concurrently from multiple producer threads, exactly
//! the contract requires. `stats` walks the buckets without taking a
//! lock; under concurrent `record` calls it may observe a torn snapshot
//! (one bucket updated mid-read) — accepted, since no hot-path reader
//! depends on an instantaneously-consistent total.

use std::sync::atomic::{AtomicU64, Ordering};

use hdrhistogram::Histogram as HdrHistogram;

/// Number of log2 buckets: covers 1ns.. ~2^48ns (~3257 days), comfortably
/// spanning any latency this engine will ever record.
const NUM_BUCKETS: usize = 48;

/// Summary statistics computed from a best-effort bucket snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistogramStats {
    pub count: u64,
    pub min_ns: u64,
    pub max_ns: u64,
    pub mean_ns: f64,
    pub p50_ns: u64,
    pub p95_ns: u64,
    pub p99_ns: u64,
    pub p999_ns: u64,
    pub stddev_ns: f64,
}

impl Default for HistogramStats {
    fn default() -> Self {
        Self {
            count: 0,
            min_ns: 0,
            max_ns: 0,
            mean_ns: 0.0,
            p50_ns: 0,
            p95_ns: 0,
            p99_ns: 0,
            p999_ns: 0,
            stddev_ns: 0.0,
        }
    }
}

/// Lock-free latency histogram over log2-scaled nanosecond buckets.
pub struct Histogram {
    buckets: [AtomicU64; NUM_BUCKETS],
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}

impl Histogram {
    #[must_use]
    pub fn new() -> Self {
        Self {
            buckets: std::array::from_fn(|_| AtomicU64::new(0)),
        }
    }

    #[inline]
    fn bucket_of(ns: u64) -> usize {
        let v = ns.max(1);
        let bucket = 63 - v.leading_zeros() as usize;
        bucket.min(NUM_BUCKETS - 1)
    }

    #[inline]
    fn bucket_bounds(bucket: usize) -> (u64, u64) {
        let lo = 1u64 << bucket;
        let hi = if bucket + 1 == 64 { u64::MAX } else { 1u64 << (bucket + 1) };
        (lo, hi)
    }

    #[inline]
    fn bucket_midpoint(bucket: usize) -> f64 {
        let (lo, hi) = Self::bucket_bounds(bucket);
        (lo as f64 + hi.min(lo.saturating_mul(2)) as f64) / 2.0
    }

    /// Records one observation. O(1), a single relaxed atomic increment.
    #[inline(always)]
    pub fn record(&self, ns: u64) {
        self.buckets[Self::bucket_of(ns)].fetch_add(1, Ordering::Relaxed);
    }

    /// Zeroes all buckets. Not atomic as a whole; concurrent `record` calls
    /// during a reset may be lost. Intended for telemetry-thread use between
    /// reporting windows, never on the hot path.
    pub fn reset(&self) {
        for b in &self.buckets {
            b.store(0, Ordering::Relaxed);
        }
    }

    /// Computes summary statistics from a best-effort snapshot of the
    /// buckets.
    #[must_use]
    pub fn stats(&self) -> HistogramStats {
        let counts: [u64; NUM_BUCKETS] =
        std::array::from_fn(|i| self.buckets[i].load(Ordering::Relaxed));
        let total: u64 = counts.iter().sum();
        if total == 0 {
            return HistogramStats::default();
        }

        let min_ns = counts
            .iter()
            .position(|&c| c > 0)
            .map(|b| Self::bucket_bounds(b).0)
            .unwrap_or(0);
        let max_ns = counts
            .iter()
            .rposition(|&c| c > 0)
            .map(|b| Self::bucket_bounds(b).1.saturating_sub(1))
            .unwrap_or(0);

        let mean_ns: f64 = counts
            .iter()
            .enumerate()
            .map(|(b, &c)| c as f64 * Self::bucket_midpoint(b))
            .sum::<f64>()
            / total as f64;

        let variance: f64 = counts
            .iter()
            .enumerate()
            .map(|(b, &c)| {
                let d = Self::bucket_midpoint(b) - mean_ns;
                c as f64 * d * d
            })
            .sum::<f64>()
            / total as f64;
        let stddev_ns = variance.sqrt();

        let percentile = |p: f64| -> u64 {
            let target = (p * total as f64).ceil() as u64;
            let mut cumulative = 0u64;
            for (b, &c) in counts.iter().enumerate() {
                cumulative += c;
                if cumulative >= target.max(1) {
                    return Self::bucket_bounds(b).0;
                }
            }
            max_ns
        };

        HistogramStats {
            count: total,
            min_ns,
            max_ns,
            mean_ns,
            p50_ns: percentile(0.50),
            p95_ns: percentile(0.95),
            p99_ns: percentile(0.99),
            p999_ns: percentile(0.999),
            stddev_ns,
        }
    }

    /// Folds the current best-effort bucket snapshot into a throwaway
    /// `hdrhistogram::Histogram`, purely so the telemetry thread can reuse
    /// its established percentile-formatted export for latency reports.
    /// Off the hot path; does not replace the atomic histogram above, which
    /// remains the only thing ever `record`ed into from a producer thread.
    #[must_use]
    pub fn to_hdr(&self) -> HdrHistogram<u64> {
        let mut hdr = HdrHistogram::new(3).expect("fixed significant-figures value is always valid");
        for (bucket, counter) in self.buckets.iter().enumerate() {
            let count = counter.load(Ordering::Relaxed);
            if count == 0 {
                continue;
            }
            let value = Self::bucket_midpoint(bucket) as u64;
            let _ = hdr.record_n(value.max(1), count);
        }
        hdr
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_histogram_reports_zero_count() {
        let h = Histogram::new();
        assert_eq!(h.stats().count, 0);
    }

    #[test]
    fn single_observation_bounds_contain_it() {
        let h = Histogram::new();
        h.record(1_000);
        let stats = h.stats();
        assert_eq!(stats.count, 1);
        assert!(stats.min_ns <= 1_000 && 1_000 < stats.max_ns.max(stats.min_ns + 1) + 1);
    }

    #[test]
    fn percentiles_are_non_decreasing() {
        let h = Histogram::new();
        for ns in [10, 20, 30, 100, 500, 1_000, 5_000, 50_000] {
            h.record(ns);
        }
        let s = h.stats();
        assert!(s.p50_ns <= s.p95_ns);
        assert!(s.p95_ns <= s.p99_ns);
        assert!(s.p99_ns <= s.p999_ns);
    }

    #[test]
    fn reset_clears_counts() {
        let h = Histogram::new();
        h.record(100);
        h.reset();
        assert_eq!(h.stats().count, 0);
    }

    #[test]
    fn concurrent_record_is_sound() {
        let h = std::sync::Arc::new(Histogram::new());
        let mut handles = Vec::new();
        for _ in 0..4 {
            let h = h.clone();
            handles.push(std::thread::spawn(move || {
                        for i in 0..1_000u64 {
                            h.record(i + 1);
                        }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(h.stats().count, 4_000);
    }
}
