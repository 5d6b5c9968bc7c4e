use serde::Serialize;

use super::super::domain::{
    EscalationUpdate, MonthlySafetyScore, SafetyStatus, SoldierId, YearMonth,
};
use super::machine::EscalationOutcome;

/// Storage for monthly scores and the standing materialized from them.
pub trait SafetyScoreRepository: Send + Sync {
    /// Insert or replace the score for `(soldier, month)`.
    fn upsert(&self, score: MonthlySafetyScore) -> Result<(), RepositoryError>;
    /// Returns `false` when nothing was stored for that month.
    fn delete(&self, soldier: &SoldierId, month: YearMonth) -> Result<bool, RepositoryError>;
    /// At most `limit` scores, newest month first.
    fn recent(
        &self,
        soldier: &SoldierId,
        limit: usize,
    ) -> Result<Vec<MonthlySafetyScore>, RepositoryError>;
    fn standing(&self, soldier: &SoldierId) -> Result<Option<EscalationUpdate>, RepositoryError>;
    fn save_standing(&self, update: EscalationUpdate) -> Result<(), RepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Standing as exposed over HTTP.
#[derive(Debug, Clone, Serialize)]
pub struct StandingView {
    pub soldier_id: SoldierId,
    pub safety_status: SafetyStatus,
    pub status_label: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_action: Option<&'static str>,
    pub current_safety_score: Option<u8>,
    pub consecutive_low_months: u8,
    pub held_by_suspension: bool,
}

impl From<&EscalationUpdate> for StandingView {
    fn from(update: &EscalationUpdate) -> Self {
        Self {
            soldier_id: update.soldier_id.clone(),
            safety_status: update.safety_status,
            status_label: update.safety_status.label(),
            required_action: update.safety_status.required_action(),
            current_safety_score: update.current_safety_score,
            consecutive_low_months: update.consecutive_low_months,
            held_by_suspension: update.held_by_suspension,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OutcomeView {
    #[serde(flatten)]
    pub standing: StandingView,
    pub previous_status: Option<SafetyStatus>,
    pub changed: bool,
}

impl From<&EscalationOutcome> for OutcomeView {
    fn from(outcome: &EscalationOutcome) -> Self {
        Self {
            standing: StandingView::from(&outcome.update),
            previous_status: outcome.previous_status,
            changed: outcome.changed(),
        }
    }
}
