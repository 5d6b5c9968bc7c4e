use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Router,
};
use serde_json::json;

use super::super::domain::{MonthlySafetyScore, ReadinessError, SoldierId, YearMonth};
use super::repository::{OutcomeView, RepositoryError, SafetyScoreRepository, StandingView};
use super::service::{EscalationService, EscalationServiceError};

/// Score intake and standing lookups.
pub fn escalation_router<R>(service: Arc<EscalationService<R>>) -> Router
where
    R: SafetyScoreRepository + 'static,
{
    Router::new()
        .route("/api/v1/safety/scores", put(record_handler::<R>))
        .route(
            "/api/v1/safety/scores/:soldier_id/:month",
            delete(remove_handler::<R>),
        )
        .route(
            "/api/v1/safety/standing/:soldier_id",
            get(standing_handler::<R>),
        )
        .route(
            "/api/v1/safety/standing/:soldier_id/reinstate",
            post(reinstate_handler::<R>),
        )
        .with_state(service)
}

pub(crate) async fn record_handler<R>(
    State(service): State<Arc<EscalationService<R>>>,
    axum::Json(score): axum::Json<MonthlySafetyScore>,
) -> Response
where
    R: SafetyScoreRepository + 'static,
{
    match service.record_score(score) {
        Ok(outcome) => (StatusCode::OK, axum::Json(OutcomeView::from(&outcome))).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn remove_handler<R>(
    State(service): State<Arc<EscalationService<R>>>,
    Path((soldier_id, month)): Path<(String, String)>,
) -> Response
where
    R: SafetyScoreRepository + 'static,
{
    let month: YearMonth = match month.parse() {
        Ok(month) => month,
        Err(error) => return error_response(EscalationServiceError::Readiness(error)),
    };

    match service.remove_score(&SoldierId(soldier_id), month) {
        Ok(outcome) => (StatusCode::OK, axum::Json(OutcomeView::from(&outcome))).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn standing_handler<R>(
    State(service): State<Arc<EscalationService<R>>>,
    Path(soldier_id): Path<String>,
) -> Response
where
    R: SafetyScoreRepository + 'static,
{
    match service.standing(&SoldierId(soldier_id)) {
        Ok(standing) => {
            (StatusCode::OK, axum::Json(StandingView::from(&standing))).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn reinstate_handler<R>(
    State(service): State<Arc<EscalationService<R>>>,
    Path(soldier_id): Path<String>,
) -> Response
where
    R: SafetyScoreRepository + 'static,
{
    match service.reinstate(&SoldierId(soldier_id)) {
        Ok(outcome) => (StatusCode::OK, axum::Json(OutcomeView::from(&outcome))).into_response(),
        Err(error) => error_response(error),
    }
}

fn error_response(error: EscalationServiceError) -> Response {
    let status = match &error {
        EscalationServiceError::Repository(RepositoryError::NotFound)
        | EscalationServiceError::Readiness(ReadinessError::NoScoreHistory(_)) => {
            StatusCode::NOT_FOUND
        }
        EscalationServiceError::Readiness(_) => StatusCode::UNPROCESSABLE_ENTITY,
        EscalationServiceError::Repository(RepositoryError::Unavailable(_)) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    let payload = json!({
        "error": error.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}
