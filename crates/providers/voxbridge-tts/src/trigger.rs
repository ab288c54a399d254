//! Trigger arbitration for automatically-judged replies
//!
//! Only the automatic path goes through the arbiter; manual command
//! invocations always speak. Force keywords are checked before the
//! probability draw and override it.

use crate::types::{TriggerDecision, TriggerReason};
use rand::Rng;
use voxbridge_core::ProbabilityConfig;

/// Decides whether an automatic-trigger candidate is actually spoken
#[derive(Debug, Clone)]
pub struct TriggerArbiter {
    config: ProbabilityConfig,
}

impl TriggerArbiter {
    /// Create an arbiter from probability-control settings
    pub fn new(config: ProbabilityConfig) -> Self {
        Self { config }
    }

    /// Gate one automatic-trigger candidate
    pub fn decide(&self, candidate_text: &str) -> TriggerDecision {
        let sample = rand::thread_rng().gen::<f64>();
        self.decide_with_sample(candidate_text, sample)
    }

    /// Decision for a manual command invocation: gating is bypassed
    pub fn manual() -> TriggerDecision {
        TriggerDecision {
            should_speak: true,
            reason: TriggerReason::Manual,
        }
    }

    fn decide_with_sample(&self, candidate_text: &str, sample: f64) -> TriggerDecision {
        if !self.config.enabled {
            return TriggerDecision {
                should_speak: true,
                reason: TriggerReason::Disabled,
            };
        }

        if self.config.keyword_force_trigger {
            if let Some(keyword) = self
                .config
                .force_keywords
                .iter()
                .find(|k| !k.is_empty() && candidate_text.contains(k.as_str()))
            {
                tracing::debug!("force keyword '{}' matched, speaking", keyword);
                return TriggerDecision {
                    should_speak: true,
                    reason: TriggerReason::ForcedKeyword,
                };
            }
        }

        TriggerDecision {
            should_speak: sample < self.config.base_probability,
            reason: TriggerReason::Probabilistic,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(
        enabled: bool,
        base_probability: f64,
        keyword_force_trigger: bool,
        force_keywords: &[&str],
    ) -> ProbabilityConfig {
        ProbabilityConfig {
            enabled,
            base_probability,
            keyword_force_trigger,
            force_keywords: force_keywords.iter().map(|k| k.to_string()).collect(),
        }
    }

    #[test]
    fn test_disabled_always_speaks() {
        let arbiter = TriggerArbiter::new(config(false, 0.0, false, &[]));
        for _ in 0..20 {
            let decision = arbiter.decide("anything");
            assert!(decision.should_speak);
            assert_eq!(decision.reason, TriggerReason::Disabled);
        }
    }

    #[test]
    fn test_keyword_overrides_zero_probability() {
        let arbiter = TriggerArbiter::new(config(true, 0.0, true, &["X"]));
        let decision = arbiter.decide("text containing X somewhere");
        assert!(decision.should_speak);
        assert_eq!(decision.reason, TriggerReason::ForcedKeyword);
    }

    #[test]
    fn test_keyword_checked_before_draw() {
        let arbiter = TriggerArbiter::new(config(true, 0.0, true, &["语音"]));
        let decision = arbiter.decide_with_sample("用语音说一下", 0.999);
        assert_eq!(decision.reason, TriggerReason::ForcedKeyword);
        assert!(decision.should_speak);
    }

    #[test]
    fn test_zero_probability_never_speaks_without_keyword() {
        let arbiter = TriggerArbiter::new(config(true, 0.0, true, &["语音"]));
        for _ in 0..100 {
            let decision = arbiter.decide("plain candidate reply");
            assert!(!decision.should_speak);
            assert_eq!(decision.reason, TriggerReason::Probabilistic);
        }
    }

    #[test]
    fn test_certain_probability_always_speaks() {
        let arbiter = TriggerArbiter::new(config(true, 1.0, false, &[]));
        for _ in 0..100 {
            assert!(arbiter.decide("plain candidate reply").should_speak);
        }
    }

    #[test]
    fn test_draw_threshold() {
        let arbiter = TriggerArbiter::new(config(true, 0.5, false, &[]));
        assert!(arbiter.decide_with_sample("t", 0.49).should_speak);
        assert!(!arbiter.decide_with_sample("t", 0.5).should_speak);
    }

    #[test]
    fn test_keyword_disabled_falls_through_to_draw() {
        let arbiter = TriggerArbiter::new(config(true, 0.0, false, &["X"]));
        let decision = arbiter.decide("contains X");
        assert!(!decision.should_speak);
        assert_eq!(decision.reason, TriggerReason::Probabilistic);
    }

    #[test]
    fn test_manual_bypasses_gating() {
        let decision = TriggerArbiter::manual();
        assert!(decision.should_speak);
        assert_eq!(decision.reason, TriggerReason::Manual);
    }
}
