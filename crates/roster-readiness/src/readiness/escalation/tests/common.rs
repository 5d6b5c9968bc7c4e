use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use serde_json::Value;

use crate::readiness::domain::{EscalationUpdate, MonthlySafetyScore, SoldierId, YearMonth};
use crate::readiness::escalation::repository::{RepositoryError, SafetyScoreRepository};
use crate::readiness::escalation::{escalation_router, EscalationPolicy, EscalationService};

pub(super) fn month(raw: &str) -> YearMonth {
    raw.parse().expect("valid month")
}

pub(super) fn score(soldier: &str, raw_month: &str, value: u8) -> MonthlySafetyScore {
    MonthlySafetyScore::new(soldier, month(raw_month), value)
}

pub(super) fn build_service() -> (EscalationService<MemoryRepository>, Arc<MemoryRepository>) {
    let repository = Arc::new(MemoryRepository::default());
    let service = EscalationService::new(repository.clone(), EscalationPolicy::default());
    (service, repository)
}

#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    scores: Arc<Mutex<HashMap<SoldierId, BTreeMap<YearMonth, MonthlySafetyScore>>>>,
    standings: Arc<Mutex<HashMap<SoldierId, EscalationUpdate>>>,
}

impl SafetyScoreRepository for MemoryRepository {
    fn upsert(&self, score: MonthlySafetyScore) -> Result<(), RepositoryError> {
        let mut guard = self.scores.lock().expect("repository mutex poisoned");
        guard
            .entry(score.soldier_id.clone())
            .or_default()
            .insert(score.month, score);
        Ok(())
    }

    fn delete(&self, soldier: &SoldierId, month: YearMonth) -> Result<bool, RepositoryError> {
        let mut guard = self.scores.lock().expect("repository mutex poisoned");
        Ok(guard
            .get_mut(soldier)
            .and_then(|months| months.remove(&month))
            .is_some())
    }

    fn recent(
        &self,
        soldier: &SoldierId,
        limit: usize,
    ) -> Result<Vec<MonthlySafetyScore>, RepositoryError> {
        let guard = self.scores.lock().expect("repository mutex poisoned");
        Ok(guard
            .get(soldier)
            .map(|months| months.values().rev().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    fn standing(&self, soldier: &SoldierId) -> Result<Option<EscalationUpdate>, RepositoryError> {
        let guard = self.standings.lock().expect("standing mutex poisoned");
        Ok(guard.get(soldier).cloned())
    }

    fn save_standing(&self, update: EscalationUpdate) -> Result<(), RepositoryError> {
        let mut guard = self.standings.lock().expect("standing mutex poisoned");
        guard.insert(update.soldier_id.clone(), update);
        Ok(())
    }
}

pub(super) struct UnavailableRepository;

impl SafetyScoreRepository for UnavailableRepository {
    fn upsert(&self, _score: MonthlySafetyScore) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn delete(&self, _soldier: &SoldierId, _month: YearMonth) -> Result<bool, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn recent(
        &self,
        _soldier: &SoldierId,
        _limit: usize,
    ) -> Result<Vec<MonthlySafetyScore>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn standing(&self, _soldier: &SoldierId) -> Result<Option<EscalationUpdate>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn save_standing(&self, _update: EscalationUpdate) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) fn router_with_service(service: EscalationService<MemoryRepository>) -> axum::Router {
    escalation_router(Arc::new(service))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 4096)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
