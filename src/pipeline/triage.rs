//! Triage policy: the final, fixed decision table.
//!
//! Deliberately a rule table rather than a learned policy so the disposition
//! of every candidate is auditable. The rules are evaluated in order and the
//! first match wins; reject always takes precedence over accept.

use crate::config::PipelineConfig;
use crate::models::{Candidate, TriageAction};

/// Decide the terminal action for one scored candidate.
pub fn decide(candidate: &Candidate, config: &PipelineConfig) -> TriageAction {
    if candidate.flags.failed_count() >= 2 {
        return TriageAction::Reject;
    }
    if candidate.probability >= config.accept_threshold && candidate.flags.passed_count() == 4 {
        return TriageAction::Accept;
    }
    TriageAction::HumanReview
}

/// Apply the policy to every candidate in place. Already-terminal candidates
/// are left untouched; an action is fixed once set.
pub fn apply(candidates: &mut [Candidate], config: &PipelineConfig) {
    for candidate in candidates.iter_mut() {
        if !candidate.rl_action.is_terminal() {
            candidate.rl_action = decide(candidate, config);
        }
    }
}
