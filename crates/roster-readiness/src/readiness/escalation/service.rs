use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, info, warn};

use super::super::domain::{
    EscalationUpdate, MonthlySafetyScore, ReadinessError, SoldierId, YearMonth,
};
use super::machine::{evaluate_standing, settle, EscalationOutcome, EscalationPolicy, RecomputeTrigger};
use super::repository::{RepositoryError, SafetyScoreRepository};

/// Serializes score writes per soldier and keeps the materialized standing in step
/// with the score history.
pub struct EscalationService<R> {
    repository: Arc<R>,
    policy: EscalationPolicy,
    locks: Mutex<HashMap<SoldierId, Arc<Mutex<()>>>>,
}

impl<R> EscalationService<R>
where
    R: SafetyScoreRepository + 'static,
{
    pub fn new(repository: Arc<R>, policy: EscalationPolicy) -> Self {
        Self {
            repository,
            policy,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn policy(&self) -> &EscalationPolicy {
        &self.policy
    }

    /// Run `operation` while holding the soldier's lock. The lock is dropped from the map
    /// once no other caller holds or awaits it.
    fn serialized<T>(&self, soldier: &SoldierId, operation: impl FnOnce() -> T) -> T {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(
                locks
                    .entry(soldier.clone())
                    .or_insert_with(|| Arc::new(Mutex::new(()))),
            )
        };

        let result = {
            let _held = lock.lock().unwrap_or_else(PoisonError::into_inner);
            operation()
        };

        // Handles are only cloned and dropped under the map lock, so the last holder sees
        // exactly two: the map entry and its own.
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        if Arc::strong_count(&lock) == 2 {
            locks.remove(soldier);
        }
        drop(lock);
        result
    }

    #[cfg(test)]
    pub(crate) fn tracked_locks(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Store a score (replacing any for the same month) and recompute the standing.
    pub fn record_score(
        &self,
        score: MonthlySafetyScore,
    ) -> Result<EscalationOutcome, EscalationServiceError> {
        score.validate()?;
        let soldier = score.soldier_id.clone();

        self.serialized(&soldier, || {
            debug!(soldier = %soldier, month = %score.month, score = score.score, "recording safety score");
            self.repository.upsert(score)?;
            self.recompute_locked(&soldier, RecomputeTrigger::ScoreRecorded)
        })
    }

    /// Remove a month's score. An emptied history clears the standing.
    pub fn remove_score(
        &self,
        soldier: &SoldierId,
        month: YearMonth,
    ) -> Result<EscalationOutcome, EscalationServiceError> {
        self.serialized(soldier, || {
            if !self.repository.delete(soldier, month)? {
                return Err(RepositoryError::NotFound.into());
            }
            debug!(soldier = %soldier, month = %month, "removed safety score");
            self.recompute_locked(soldier, RecomputeTrigger::ScoreRemoved)
        })
    }

    /// Re-derive the standing from stored history without changing it.
    pub fn recompute(
        &self,
        soldier: &SoldierId,
    ) -> Result<EscalationOutcome, EscalationServiceError> {
        self.serialized(soldier, || self.recompute_locked(soldier, RecomputeTrigger::Refresh))
    }

    /// Human review: the standing is recomputed from history alone, lifting a held
    /// suspension when the scores no longer justify it.
    pub fn reinstate(
        &self,
        soldier: &SoldierId,
    ) -> Result<EscalationOutcome, EscalationServiceError> {
        self.serialized(soldier, || self.recompute_locked(soldier, RecomputeTrigger::Review))
    }

    pub fn standing(&self, soldier: &SoldierId) -> Result<EscalationUpdate, EscalationServiceError> {
        let standing = self
            .repository
            .standing(soldier)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(standing)
    }

    fn recompute_locked(
        &self,
        soldier: &SoldierId,
        trigger: RecomputeTrigger,
    ) -> Result<EscalationOutcome, EscalationServiceError> {
        let previous = self
            .repository
            .standing(soldier)?
            .map(|standing| standing.safety_status);
        let history = self.repository.recent(soldier, self.policy.lookback_months)?;

        let computed = match evaluate_standing(soldier, &history, &self.policy) {
            Ok(update) => update,
            Err(ReadinessError::NoScoreHistory(_))
                if matches!(trigger, RecomputeTrigger::ScoreRemoved | RecomputeTrigger::Review) =>
            {
                EscalationUpdate::cleared(soldier.clone())
            }
            Err(error) => return Err(error.into()),
        };

        let outcome = settle(computed, previous, trigger, &self.policy);
        self.repository.save_standing(outcome.update.clone())?;

        if outcome.update.held_by_suspension {
            warn!(
                soldier = %soldier,
                low_months = outcome.update.consecutive_low_months,
                "suspension held until reviewed"
            );
        } else if outcome.changed() {
            info!(
                soldier = %soldier,
                from = ?previous,
                to = %outcome.update.safety_status,
                low_months = outcome.update.consecutive_low_months,
                "safety standing changed"
            );
        } else {
            debug!(soldier = %soldier, status = %outcome.update.safety_status, "safety standing unchanged");
        }

        Ok(outcome)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EscalationServiceError {
    #[error(transparent)]
    Readiness(#[from] ReadinessError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
