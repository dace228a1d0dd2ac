use std::time::Duration;

use crate::config::MgcConfig;

/// Decision returned after a round finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Stop: either nothing is left to clone or the round budget is spent.
    NoRetry,
    /// Start another round after the given delay.
    RetryAfter(Duration),
}

/// Round budget plus exponential pause between rounds.
#[derive(Debug, Clone, Copy)]
pub struct RoundPolicy {
    /// Maximum number of rounds (including the first).
    pub max_rounds: u32,
    /// Pause before round 2; doubles for every later round.
    pub base_delay: Duration,
    /// Upper bound on the pause.
    pub max_delay: Duration,
}

impl Default for RoundPolicy {
    fn default() -> Self {
        Self {
            max_rounds: 3,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RoundPolicy {
    pub fn from_config(cfg: &MgcConfig) -> Self {
        let retry = cfg.retry.clone().unwrap_or_default();
        let max_delay = Duration::from_secs(retry.max_delay_secs);
        let base_delay = match Duration::try_from_secs_f64(retry.base_delay_secs.max(0.0)) {
            Ok(d) => d.min(max_delay),
            Err(_) => {
                tracing::warn!(
                    value = retry.base_delay_secs,
                    "ignoring unusable retry.base_delay_secs"
                );
                max_delay
            }
        };
        Self {
            max_rounds: cfg.retry_attempts.max(1),
            base_delay,
            max_delay,
        }
    }

    /// No pause between rounds. Used by tests and by callers that drive
    /// their own pacing.
    pub fn immediate(max_rounds: u32) -> Self {
        Self {
            max_rounds: max_rounds.max(1),
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Decide what happens after `round` (1-based) left `still_failed`
    /// repositories without a valid clone.
    pub fn decide(&self, round: u32, still_failed: usize) -> RetryDecision {
        if still_failed == 0 || round >= self.max_rounds {
            return RetryDecision::NoRetry;
        }
        let exp = 1u32 << round.saturating_sub(1).min(8);
        let delay = self.base_delay.saturating_mul(exp).min(self.max_delay);
        RetryDecision::RetryAfter(delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetryConfig;

    #[test]
    fn no_retry_when_nothing_failed() {
        let p = RoundPolicy::default();
        assert_eq!(p.decide(1, 0), RetryDecision::NoRetry);
    }

    #[test]
    fn exponential_delay_grows_and_is_capped() {
        let mut p = RoundPolicy::default();
        p.max_rounds = 20;
        let delay = |round| match p.decide(round, 1) {
            RetryDecision::RetryAfter(d) => d,
            RetryDecision::NoRetry => panic!("expected retry"),
        };
        assert_eq!(delay(1), Duration::from_secs(2));
        assert_eq!(delay(2), Duration::from_secs(4));
        assert_eq!(delay(3), Duration::from_secs(8));
        assert_eq!(delay(10), p.max_delay);
    }

    #[test]
    fn respects_max_rounds() {
        let p = RoundPolicy::immediate(3);
        assert_eq!(p.decide(1, 2), RetryDecision::RetryAfter(Duration::ZERO));
        assert_eq!(p.decide(2, 2), RetryDecision::RetryAfter(Duration::ZERO));
        assert_eq!(p.decide(3, 2), RetryDecision::NoRetry);
    }

    #[test]
    fn single_round_never_retries() {
        let p = RoundPolicy::immediate(1);
        assert_eq!(p.decide(1, 5), RetryDecision::NoRetry);
    }

    #[test]
    fn built_from_config() {
        let cfg = MgcConfig {
            retry_attempts: 4,
            retry: Some(RetryConfig {
                base_delay_secs: 0.5,
                max_delay_secs: 1,
            }),
            ..MgcConfig::default()
        };
        let p = RoundPolicy::from_config(&cfg);
        assert_eq!(p.max_rounds, 4);
        assert_eq!(p.base_delay, Duration::from_millis(500));
        assert_eq!(p.decide(3, 1), RetryDecision::RetryAfter(Duration::from_secs(1)));
    }

    #[test]
    fn unusable_base_delay_falls_back_to_cap() {
        for bad in [f64::INFINITY, 1e300] {
            let cfg = MgcConfig {
                retry: Some(RetryConfig {
                    base_delay_secs: bad,
                    max_delay_secs: 7,
                }),
                ..MgcConfig::default()
            };
            let p = RoundPolicy::from_config(&cfg);
            assert_eq!(p.base_delay, Duration::from_secs(7), "{bad}");
            assert_eq!(p.decide(1, 1), RetryDecision::RetryAfter(Duration::from_secs(7)));
        }
    }
}
