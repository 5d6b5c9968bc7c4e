//! Monthly safety escalation: tiering, score storage seam, and the HTTP surface.

mod machine;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use machine::{
    evaluate_standing, settle, status_for_low_months, EscalationOutcome, EscalationPolicy,
    RecomputeTrigger, DEFAULT_LOOKBACK_MONTHS, DEFAULT_LOW_SCORE_THRESHOLD,
};
pub use repository::{OutcomeView, RepositoryError, SafetyScoreRepository, StandingView};
pub use router::escalation_router;
pub use service::{EscalationService, EscalationServiceError};
