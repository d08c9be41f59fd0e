use rand::Rng;
use std::time::Duration;

const JITTER_FACTOR: f64 = 0.1;

/// Retry schedule for rate-limited scanner calls, sized so every retry fits
/// inside one fetch budget.
///
/// Delay for attempt `n` is `min(max_delay, base * 2^n)` with +/- 10% jitter.
/// A retry is refused once `max_retries` is spent or when the next delay
/// would not leave time for another request.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    base: Duration,
    max_delay: Duration,
    max_retries: u32,
    attempt: u32,
}

impl ExponentialBackoff {
    pub fn new(base: Duration, max_delay: Duration, max_retries: u32) -> Self {
        Self {
            base,
            max_delay,
            max_retries,
            attempt: 0,
        }
    }

    /// All `max_retries` delays together, jitter included, take at most half
    /// of `budget`. The other half is left for the requests themselves.
    pub fn within(budget: Duration, max_retries: u32) -> Self {
        let doublings = 2u32.saturating_pow(max_retries).saturating_sub(1).max(1);
        let base = budget.div_f64(2.0 * f64::from(doublings) * (1.0 + JITTER_FACTOR));
        Self::new(base, budget / 2, max_retries)
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Delay before the next retry, or `None` if the caller should give up.
    pub fn retry_in(&mut self, remaining: Duration) -> Option<Duration> {
        self.retry_in_with(remaining, &mut rand::thread_rng())
    }

    pub fn retry_in_with<R: Rng + ?Sized>(
        &mut self,
        remaining: Duration,
        rng: &mut R,
    ) -> Option<Duration> {
        if self.attempt >= self.max_retries {
            return None;
        }

        let delay = self.delay_for(self.attempt, rng);
        if delay >= remaining {
            return None;
        }

        self.attempt += 1;
        Some(delay)
    }

    fn delay_for<R: Rng + ?Sized>(&self, attempt: u32, rng: &mut R) -> Duration {
        let capped = self
            .base
            .saturating_mul(2u32.saturating_pow(attempt))
            .min(self.max_delay);

        let spread = capped.as_secs_f64() * JITTER_FACTOR;
        if spread <= 0.0 {
            return capped;
        }
        let secs = capped.as_secs_f64() + rng.gen_range(-spread..=spread);
        Duration::from_secs_f64(secs.max(0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_delays_double_until_capped() {
        let backoff = ExponentialBackoff::new(Duration::from_secs(1), Duration::from_secs(5), 10);
        let mut rng = StdRng::seed_from_u64(1);

        let delays: Vec<f64> = (0..4).map(|n| backoff.delay_for(n, &mut rng).as_secs_f64()).collect();
        for (delay, nominal) in delays.iter().zip([1.0, 2.0, 4.0, 5.0]) {
            assert!((delay - nominal).abs() <= nominal * JITTER_FACTOR + 1e-9, "{} vs {}", delay, nominal);
        }
    }

    #[test]
    fn test_gives_up_after_max_retries() {
        let mut backoff = ExponentialBackoff::new(Duration::from_millis(10), Duration::from_secs(1), 3);
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..3 {
            assert!(backoff.retry_in_with(Duration::from_secs(60), &mut rng).is_some());
        }
        assert_eq!(backoff.retry_in_with(Duration::from_secs(60), &mut rng), None);
        assert_eq!(backoff.attempt(), 3);
    }

    #[test]
    fn test_retry_is_refused_when_budget_is_spent() {
        let mut backoff = ExponentialBackoff::new(Duration::from_secs(2), Duration::from_secs(30), 3);
        let mut rng = StdRng::seed_from_u64(7);

        assert_eq!(backoff.retry_in_with(Duration::from_secs(1), &mut rng), None);
        assert_eq!(backoff.attempt(), 0);
    }

    #[test]
    fn test_full_schedule_fits_inside_fetch_budget() {
        let budget = Duration::from_secs(10);
        for seed in 0..50 {
            let mut backoff = ExponentialBackoff::within(budget, 3);
            let mut rng = StdRng::seed_from_u64(seed);
            let mut remaining = budget;
            let mut slept = Duration::ZERO;

            while let Some(delay) = backoff.retry_in_with(remaining, &mut rng) {
                slept += delay;
                remaining = remaining.saturating_sub(delay);
            }

            assert_eq!(backoff.attempt(), backoff.max_retries());
            // float rounding only
            assert!(slept <= budget / 2 + Duration::from_millis(1), "seed {} slept {:?}", seed, slept);
        }
    }
}
