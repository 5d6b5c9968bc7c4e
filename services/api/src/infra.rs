use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use roster_readiness::readiness::escalation::{RepositoryError, SafetyScoreRepository};
use roster_readiness::readiness::{EscalationUpdate, MonthlySafetyScore, SoldierId, YearMonth};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

type ScoreTable = HashMap<SoldierId, BTreeMap<YearMonth, MonthlySafetyScore>>;

/// Process-local score store backing the HTTP service.
#[derive(Default, Clone)]
pub(crate) struct InMemorySafetyScoreRepository {
    scores: Arc<Mutex<ScoreTable>>,
    standings: Arc<Mutex<HashMap<SoldierId, EscalationUpdate>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, RepositoryError> {
    mutex
        .lock()
        .map_err(|_| RepositoryError::Unavailable("in-memory store poisoned".to_string()))
}

impl SafetyScoreRepository for InMemorySafetyScoreRepository {
    fn upsert(&self, score: MonthlySafetyScore) -> Result<(), RepositoryError> {
        lock(&self.scores)?
            .entry(score.soldier_id.clone())
            .or_default()
            .insert(score.month, score);
        Ok(())
    }

    fn delete(&self, soldier: &SoldierId, month: YearMonth) -> Result<bool, RepositoryError> {
        Ok(lock(&self.scores)?
            .get_mut(soldier)
            .and_then(|months| months.remove(&month))
            .is_some())
    }

    fn recent(
        &self,
        soldier: &SoldierId,
        limit: usize,
    ) -> Result<Vec<MonthlySafetyScore>, RepositoryError> {
        Ok(lock(&self.scores)?
            .get(soldier)
            .map(|months| months.values().rev().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    fn standing(&self, soldier: &SoldierId) -> Result<Option<EscalationUpdate>, RepositoryError> {
        Ok(lock(&self.standings)?.get(soldier).cloned())
    }

    fn save_standing(&self, update: EscalationUpdate) -> Result<(), RepositoryError> {
        lock(&self.standings)?.insert(update.soldier_id.clone(), update);
        Ok(())
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

pub(crate) fn deserialize_optional_date<'de, D>(
    deserializer: D,
) -> Result<Option<NaiveDate>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    opt.map(|value| parse_date(&value).map_err(serde::de::Error::custom))
        .transpose()
}
