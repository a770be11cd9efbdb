//! Exponential backoff with multiplicative jitter

use std::ops::Range;
use std::time::Duration;

use rand::Rng;

/// Upper bound on any backoff delay
pub const MAX_DELAY: Duration = Duration::from_secs(60);

/// Draw range for the jitter factor `j` in `next = min(d * 2 * j, cap)`.
///
/// A floor of 0.5 keeps every retry at least as far out as the previous one
/// and never yields a zero delay.
pub const DEFAULT_JITTER: Range<f64> = 0.5..1.0;

/// Stateless delay policy: doubles the current delay, scales it by a random
/// factor drawn from `jitter`, and caps the result.
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffPolicy {
    pub cap: Duration,
    pub jitter: Range<f64>,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            cap: MAX_DELAY,
            jitter: DEFAULT_JITTER,
        }
    }
}

impl BackoffPolicy {
    pub fn new(cap: Duration, jitter: Range<f64>) -> Self {
        Self { cap, jitter }
    }

    /// Next delay after `delay`, drawing the jitter factor from `rng`.
    pub fn next<R: Rng + ?Sized>(&self, delay: Duration, rng: &mut R) -> Duration {
        let factor = if self.jitter.is_empty() {
            self.jitter.start
        } else {
            rng.gen_range(self.jitter.clone())
        };
        self.scaled(delay, factor)
    }

    /// Deterministic core of [`next`](Self::next) for a given draw.
    pub fn scaled(&self, delay: Duration, factor: f64) -> Duration {
        let secs = delay.as_secs_f64() * 2.0 * factor;
        if !secs.is_finite() || secs >= self.cap.as_secs_f64() {
            return self.cap;
        }
        Duration::from_secs_f64(secs.max(0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn scaled_doubles_at_full_factor() {
        let p = BackoffPolicy::default();
        assert_eq!(p.scaled(Duration::from_secs(1), 1.0), Duration::from_secs(2));
        assert_eq!(p.scaled(Duration::from_secs(4), 0.5), Duration::from_secs(4));
    }

    #[test]
    fn scaled_caps_at_max_delay() {
        let p = BackoffPolicy::default();
        assert_eq!(p.scaled(Duration::from_secs(45), 0.9), MAX_DELAY);
        assert_eq!(p.scaled(Duration::from_secs(3600), 0.5), MAX_DELAY);
    }

    #[test]
    fn next_stays_within_bounds() {
        let p = BackoffPolicy::default();
        let mut rng = StdRng::seed_from_u64(7);
        for millis in [1u64, 10, 250, 1_000, 7_500, 29_000, 59_999, 60_000, 120_000] {
            let d = Duration::from_millis(millis);
            for _ in 0..200 {
                let next = p.next(d, &mut rng);
                assert!(next > Duration::ZERO, "zero delay for {d:?}");
                assert!(next <= MAX_DELAY, "{next:?} above cap for {d:?}");
                assert!(next >= d.min(MAX_DELAY), "{next:?} shrank below {d:?}");
            }
        }
    }

    #[test]
    fn next_is_deterministic_for_seed() {
        let p = BackoffPolicy::default();
        let mut a = StdRng::seed_from_u64(42);
        let mut b = StdRng::seed_from_u64(42);
        let d = Duration::from_secs(1);
        for _ in 0..10 {
            assert_eq!(p.next(d, &mut a), p.next(d, &mut b));
        }
    }

    #[test]
    fn growth_sequence_reaches_cap() {
        let p = BackoffPolicy::default();
        let mut rng = StdRng::seed_from_u64(1);
        let mut d = Duration::from_secs(1);
        for _ in 0..40 {
            d = p.next(d, &mut rng);
        }
        assert_eq!(d, MAX_DELAY);
    }

    #[test]
    fn degenerate_jitter_uses_start() {
        let p = BackoffPolicy::new(MAX_DELAY, 0.75..0.75);
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(
            p.next(Duration::from_secs(2), &mut rng),
            Duration::from_secs(3)
        );
    }
}
