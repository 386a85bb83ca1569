//! Timing and attempt-count policy for retry, repeat and paced folds.
//!
//! A [`Schedule`] is pure data: it describes pacing behavior but never
//! executes it, so it is easy to test, clone and inspect. The combinators
//! that consume one ask [`Schedule::delay_for_step`] before each re-run or
//! emission: `Some(delay)` means wait that long and go again, `None` means
//! the schedule is exhausted.
//!
//! # Bounds
//!
//! Unbounded retries are almost always a bug, so [`Schedule::validate`]
//! requires at least one bound (`with_max_steps` or `with_max_delay`) and
//! the provided constructors set one. [`Schedule::forever`] is the explicit
//! opt-out for pacing-only uses such as fold emission.
//!
//! # Example
//!
//! ```rust
//! use millrace::Schedule;
//! use std::time::Duration;
//!
//! let schedule = Schedule::exponential(Duration::from_millis(100)).with_max_steps(3);
//!
//! assert_eq!(schedule.delay_for_step(0), Some(Duration::from_millis(100)));
//! assert_eq!(schedule.delay_for_step(1), Some(Duration::from_millis(200)));
//! assert_eq!(schedule.delay_for_step(2), Some(Duration::from_millis(400)));
//! assert_eq!(schedule.delay_for_step(3), None); // exhausted
//! ```

use std::time::Duration;

/// Pacing policy consumed by `retry`, `repeat` and the paced folds.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Schedule {
    strategy: Backoff,
    max_steps: Option<u32>,
    max_delay: Option<Duration>,
    jitter: Jitter,
}

/// The backoff strategy for inter-step delays.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Backoff {
    /// Fixed delay between steps.
    Constant(Duration),
    /// Delay grows linearly: `base * (step + 1)`.
    Linear {
        /// Base delay duration.
        base: Duration,
    },
    /// Delay doubles: `base * 2^step`.
    Exponential {
        /// Base delay duration.
        base: Duration,
    },
    /// Delay follows the Fibonacci sequence: `fib(step + 1) * base`.
    Fibonacci {
        /// Base delay duration.
        base: Duration,
    },
}

/// Strategy for adding randomness to delays.
///
/// Without the `jitter` feature every strategy degrades to the plain delay.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Jitter {
    /// No jitter applied.
    #[default]
    None,
    /// Add plus-or-minus `factor` randomness to the delay.
    Proportional(f64),
    /// Random delay between zero and the calculated delay.
    Full,
    /// Random delay between the base and three times the previous delay.
    Decorrelated,
}

impl Schedule {
    /// Constant delay between steps. Unbounded until a bound is added.
    pub fn constant(delay: Duration) -> Self {
        Schedule {
            strategy: Backoff::Constant(delay),
            max_steps: None,
            max_delay: None,
            jitter: Jitter::None,
        }
    }

    /// Linearly increasing delay: `base * (step + 1)`.
    pub fn linear(base: Duration) -> Self {
        Schedule {
            strategy: Backoff::Linear { base },
            max_steps: None,
            max_delay: None,
            jitter: Jitter::None,
        }
    }

    /// Exponentially increasing delay: `base * 2^step`.
    pub fn exponential(base: Duration) -> Self {
        Schedule {
            strategy: Backoff::Exponential { base },
            max_steps: None,
            max_delay: None,
            jitter: Jitter::None,
        }
    }

    /// Fibonacci delay: `base * fib(step + 1)`.
    pub fn fibonacci(base: Duration) -> Self {
        Schedule {
            strategy: Backoff::Fibonacci { base },
            max_steps: None,
            max_delay: None,
            jitter: Jitter::None,
        }
    }

    /// Bound by total attempts, including the first: `attempts(3)` allows
    /// one initial run and two re-runs, with no inter-step delay.
    ///
    /// The initial run is never schedule-gated, so `total` is clamped to a
    /// minimum of one: `attempts(0)` behaves as [`Schedule::once`].
    ///
    /// ```rust
    /// use millrace::Schedule;
    ///
    /// let schedule = Schedule::attempts(3);
    /// assert!(schedule.delay_for_step(0).is_some());
    /// assert!(schedule.delay_for_step(1).is_some());
    /// assert!(schedule.delay_for_step(2).is_none());
    /// ```
    pub fn attempts(total: u32) -> Self {
        Schedule::constant(Duration::ZERO).with_max_steps(total.saturating_sub(1))
    }

    /// A single attempt: never re-run.
    pub fn once() -> Self {
        Schedule::attempts(1)
    }

    /// No bounds and no delay. Intended for pacing-only consumers (fold
    /// emission); handing it to `retry` means retrying forever.
    pub fn forever() -> Self {
        Schedule::constant(Duration::ZERO)
    }

    /// Set the maximum number of re-steps (not counting the initial run).
    pub fn with_max_steps(mut self, n: u32) -> Self {
        self.max_steps = Some(n);
        self
    }

    /// Cap every delay at `d`, regardless of strategy.
    pub fn with_max_delay(mut self, d: Duration) -> Self {
        self.max_delay = Some(d);
        self
    }

    /// Add proportional jitter: the delay becomes the calculated value
    /// plus or minus `factor` (clamped to `0.0..=1.0`) of itself.
    pub fn with_jitter(mut self, factor: f64) -> Self {
        self.jitter = Jitter::Proportional(factor.clamp(0.0, 1.0));
        self
    }

    /// Full jitter: random delay between zero and the calculated value.
    pub fn with_full_jitter(mut self) -> Self {
        self.jitter = Jitter::Full;
        self
    }

    /// Decorrelated jitter: random between base and 3x the previous delay.
    pub fn with_decorrelated_jitter(mut self) -> Self {
        self.jitter = Jitter::Decorrelated;
        self
    }

    /// The configured step bound, if any.
    pub fn max_steps(&self) -> Option<u32> {
        self.max_steps
    }

    /// The configured delay cap, if any.
    pub fn max_delay(&self) -> Option<Duration> {
        self.max_delay
    }

    /// The configured jitter strategy.
    pub fn jitter(&self) -> &Jitter {
        &self.jitter
    }

    /// The configured backoff strategy.
    pub fn strategy(&self) -> &Backoff {
        &self.strategy
    }

    /// Delay before step `step` (0-indexed), or `None` once exhausted.
    pub fn delay_for_step(&self, step: u32) -> Option<Duration> {
        if let Some(max) = self.max_steps {
            if step >= max {
                return None;
            }
        }

        let base_delay = match &self.strategy {
            Backoff::Constant(d) => *d,
            Backoff::Linear { base } => base.saturating_mul(step + 1),
            Backoff::Exponential { base } => base.saturating_mul(2u32.saturating_pow(step)),
            Backoff::Fibonacci { base } => base.saturating_mul(fibonacci(step + 1)),
        };

        Some(match self.max_delay {
            Some(max) => base_delay.min(max),
            None => base_delay,
        })
    }

    /// Delay for `step` with jitter applied. `prev_delay` feeds the
    /// decorrelated strategy.
    pub fn delay_with_jitter(&self, step: u32, prev_delay: Option<Duration>) -> Option<Duration> {
        let base_delay = self.delay_for_step(step)?;
        Some(self.jitter.apply(base_delay, prev_delay, self.max_delay))
    }

    /// Check that at least one bound is set.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.max_steps.is_none() && self.max_delay.is_none() {
            Err("Schedule must have at least one bound (max_steps or max_delay)")
        } else {
            Ok(())
        }
    }
}

impl Jitter {
    /// Apply jitter to a calculated delay.
    pub fn apply(
        &self,
        base_delay: Duration,
        #[cfg_attr(not(feature = "jitter"), allow(unused_variables))] prev_delay: Option<Duration>,
        max_delay: Option<Duration>,
    ) -> Duration {
        let jittered = match self {
            Jitter::None => base_delay,
            #[cfg(feature = "jitter")]
            Jitter::Proportional(factor) => {
                use rand::Rng;
                let mut rng = rand::rng();
                let base_millis = base_delay.as_millis() as f64;
                let range = base_millis * factor;
                let min = (base_millis - range).max(0.0);
                let max = base_millis + range;
                Duration::from_millis(rng.random_range(min..=max) as u64)
            }
            #[cfg(not(feature = "jitter"))]
            Jitter::Proportional(_) => base_delay,
            #[cfg(feature = "jitter")]
            Jitter::Full => {
                use rand::Rng;
                let mut rng = rand::rng();
                let max_millis = base_delay.as_millis() as u64;
                if max_millis == 0 {
                    Duration::ZERO
                } else {
                    Duration::from_millis(rng.random_range(0..=max_millis))
                }
            }
            #[cfg(not(feature = "jitter"))]
            Jitter::Full => base_delay,
            #[cfg(feature = "jitter")]
            Jitter::Decorrelated => {
                use rand::Rng;
                let mut rng = rand::rng();
                let prev = prev_delay.unwrap_or(base_delay);
                let base_millis = base_delay.as_millis() as u64;
                let max_millis = prev.as_millis().saturating_mul(3) as u64;
                if max_millis <= base_millis {
                    base_delay
                } else {
                    Duration::from_millis(rng.random_range(base_millis..=max_millis))
                }
            }
            #[cfg(not(feature = "jitter"))]
            Jitter::Decorrelated => base_delay,
        };

        match max_delay {
            Some(max) => jittered.min(max),
            None => jittered,
        }
    }
}

fn fibonacci(n: u32) -> u32 {
    if n == 0 {
        return 0;
    }
    let mut a = 0u32;
    let mut b = 1u32;
    for _ in 1..n {
        let next = a.saturating_add(b);
        a = b;
        b = next;
    }
    b
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_delay() {
        let schedule = Schedule::constant(Duration::from_millis(100)).with_max_steps(3);
        assert_eq!(schedule.delay_for_step(0), Some(Duration::from_millis(100)));
        assert_eq!(schedule.delay_for_step(2), Some(Duration::from_millis(100)));
        assert_eq!(schedule.delay_for_step(3), None);
    }

    #[test]
    fn linear_delay() {
        let schedule = Schedule::linear(Duration::from_millis(100)).with_max_steps(5);
        assert_eq!(schedule.delay_for_step(0), Some(Duration::from_millis(100)));
        assert_eq!(schedule.delay_for_step(1), Some(Duration::from_millis(200)));
        assert_eq!(schedule.delay_for_step(2), Some(Duration::from_millis(300)));
    }

    #[test]
    fn exponential_delay() {
        let schedule = Schedule::exponential(Duration::from_millis(100)).with_max_steps(5);
        assert_eq!(schedule.delay_for_step(0), Some(Duration::from_millis(100)));
        assert_eq!(schedule.delay_for_step(1), Some(Duration::from_millis(200)));
        assert_eq!(schedule.delay_for_step(2), Some(Duration::from_millis(400)));
        assert_eq!(schedule.delay_for_step(3), Some(Duration::from_millis(800)));
    }

    #[test]
    fn fibonacci_delay() {
        let schedule = Schedule::fibonacci(Duration::from_millis(100)).with_max_steps(6);
        assert_eq!(schedule.delay_for_step(0), Some(Duration::from_millis(100)));
        assert_eq!(schedule.delay_for_step(1), Some(Duration::from_millis(100)));
        assert_eq!(schedule.delay_for_step(2), Some(Duration::from_millis(200)));
        assert_eq!(schedule.delay_for_step(3), Some(Duration::from_millis(300)));
        assert_eq!(schedule.delay_for_step(4), Some(Duration::from_millis(500)));
    }

    #[test]
    fn max_delay_caps_backoff() {
        let schedule = Schedule::exponential(Duration::from_millis(100))
            .with_max_steps(10)
            .with_max_delay(Duration::from_millis(500));
        assert_eq!(schedule.delay_for_step(2), Some(Duration::from_millis(400)));
        assert_eq!(schedule.delay_for_step(3), Some(Duration::from_millis(500)));
        assert_eq!(schedule.delay_for_step(4), Some(Duration::from_millis(500)));
    }

    #[test]
    fn attempts_counts_the_initial_run() {
        let schedule = Schedule::attempts(3);
        assert_eq!(schedule.max_steps(), Some(2));
        assert_eq!(schedule.delay_for_step(0), Some(Duration::ZERO));
        assert_eq!(schedule.delay_for_step(1), Some(Duration::ZERO));
        assert_eq!(schedule.delay_for_step(2), None);
    }

    #[test]
    fn attempts_zero_clamps_to_a_single_run() {
        let schedule = Schedule::attempts(0);
        assert_eq!(schedule.max_steps(), Some(0));
        assert_eq!(schedule.delay_for_step(0), None);
        assert_eq!(schedule, Schedule::once());
    }

    #[test]
    fn once_never_re_steps() {
        assert_eq!(Schedule::once().delay_for_step(0), None);
    }

    #[test]
    fn forever_has_no_bound() {
        let schedule = Schedule::forever();
        assert_eq!(schedule.delay_for_step(1_000_000), Some(Duration::ZERO));
        assert!(schedule.validate().is_err());
    }

    #[test]
    fn validate_requires_a_bound() {
        assert!(Schedule::constant(Duration::from_millis(1)).validate().is_err());
        assert!(Schedule::attempts(3).validate().is_ok());
        assert!(Schedule::constant(Duration::from_millis(1))
            .with_max_delay(Duration::from_secs(5))
            .validate()
            .is_ok());
    }

    #[test]
    fn jitter_none_returns_base_delay() {
        let base = Duration::from_millis(100);
        assert_eq!(Jitter::None.apply(base, None, None), base);
    }

    #[test]
    fn fibonacci_sequence() {
        assert_eq!(fibonacci(0), 0);
        assert_eq!(fibonacci(1), 1);
        assert_eq!(fibonacci(2), 1);
        assert_eq!(fibonacci(5), 5);
        assert_eq!(fibonacci(7), 13);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn schedule_serde_round_trip() {
        let schedule = Schedule::exponential(Duration::from_millis(50))
            .with_max_steps(4)
            .with_full_jitter();
        let json = serde_json::to_string(&schedule).expect("serialize");
        let back: Schedule = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, schedule);
    }
}
