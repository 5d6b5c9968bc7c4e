use crate::infra::{deserialize_optional_date, AppState};
use axum::extract::Query;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use chrono::{Local, NaiveDate};
use roster_readiness::error::AppError;
use roster_readiness::readiness::escalation::{
    escalation_router, EscalationService, SafetyScoreRepository,
};
use roster_readiness::readiness::{
    ActiveRotation, EventCategory, EventFilter, ReadinessReport, ReadinessReportSummary,
    ReportSettings, RosterSnapshot, RotationCalendar,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub(crate) struct ReadinessReportRequest {
    pub(crate) snapshot: RosterSnapshot,
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    pub(crate) today: Option<NaiveDate>,
    /// Restrict compliance figures to one event category.
    #[serde(default)]
    pub(crate) category: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RotationQuery {
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    pub(crate) date: Option<NaiveDate>,
}

pub(crate) fn with_readiness_routes<R>(service: Arc<EscalationService<R>>) -> axum::Router
where
    R: SafetyScoreRepository + 'static,
{
    escalation_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route(
            "/api/v1/readiness/report",
            axum::routing::post(readiness_report_endpoint),
        )
        .route("/api/v1/rotation", axum::routing::get(rotation_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn readiness_report_endpoint(
    Extension(settings): Extension<Arc<ReportSettings>>,
    Json(payload): Json<ReadinessReportRequest>,
) -> Result<Json<ReadinessReportSummary>, AppError> {
    let ReadinessReportRequest {
        snapshot,
        today,
        category,
    } = payload;

    let today = today.unwrap_or_else(|| Local::now().date_naive());
    let mut settings = settings.as_ref().clone();
    if let Some(category) = category {
        settings.filter = EventFilter {
            category: Some(EventCategory(category)),
        };
    }

    let report = ReadinessReport::build(&snapshot, today, &settings)?;
    Ok(Json(report.summary()))
}

pub(crate) async fn rotation_endpoint(
    Extension(settings): Extension<Arc<ReportSettings>>,
    Query(query): Query<RotationQuery>,
) -> Json<ActiveRotation> {
    let date = query.date.unwrap_or_else(|| Local::now().date_naive());
    let calendar = RotationCalendar::new(settings.rotation);
    Json(calendar.active_groups(date))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::InMemorySafetyScoreRepository;
    use axum::body::Body;
    use axum::http::Request;
    use axum::response::IntoResponse;
    use roster_readiness::readiness::{
        AttendanceRecord, EscalationPolicy, Event, MonthlySafetyScore, RotationWeek,
        SafetyStatus, Soldier, YearMonth,
    };
    use tower::ServiceExt;

    fn app() -> axum::Router {
        let repository = Arc::new(InMemorySafetyScoreRepository::default());
        let service = Arc::new(EscalationService::new(
            repository,
            EscalationPolicy::default(),
        ));
        with_readiness_routes(service).layer(Extension(Arc::new(ReportSettings::default())))
    }

    async fn read_json(response: axum::response::Response) -> serde_json::Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        serde_json::from_slice(&body).expect("json payload")
    }

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
    }

    fn snapshot() -> RosterSnapshot {
        let month = |raw: &str| raw.parse::<YearMonth>().expect("valid month");
        RosterSnapshot {
            soldiers: vec![
                Soldier::new("s-1", "Noa Levi", "8812"),
                Soldier::new("s-2", "Dan Cohen", "8813"),
            ],
            events: vec![
                Event::new("e-1", "Weekly drill", "drill", date(2025, 3, 2))
                    .with_expected(["s-1", "s-2"])
                    .completed(),
                Event::new("e-2", "Safety briefing", "briefing", date(2025, 3, 3))
                    .with_expected(["s-1"])
                    .completed(),
            ],
            attendance: vec![
                AttendanceRecord::attended("e-1", "s-1"),
                AttendanceRecord::absent("e-1", "s-2", "routine_leave"),
                AttendanceRecord::absent("e-2", "s-1", "routine_leave"),
            ],
            scores: vec![
                MonthlySafetyScore::new("s-2", month("2025-01"), 60),
                MonthlySafetyScore::new("s-2", month("2025-02"), 60),
                MonthlySafetyScore::new("s-2", month("2025-03"), 80),
            ],
            ..RosterSnapshot::default()
        }
    }

    #[tokio::test]
    async fn readiness_report_endpoint_returns_summary() {
        let request = ReadinessReportRequest {
            snapshot: snapshot(),
            today: Some(date(2025, 3, 10)),
            category: None,
        };

        let Json(body) = readiness_report_endpoint(
            Extension(Arc::new(ReportSettings::default())),
            Json(request),
        )
        .await
        .expect("report builds");

        assert_eq!(body.as_of, date(2025, 3, 10));
        assert_eq!(body.compliance.events_counted, 2);
        assert!((body.compliance.percentage - 100.0 / 3.0).abs() < 1e-9);
        assert_eq!(body.standings.len(), 1);
        assert_eq!(body.standings[0].safety_status, SafetyStatus::Critical);
        assert_eq!(body.table.len(), 3);
    }

    #[tokio::test]
    async fn readiness_report_endpoint_applies_category_filter() {
        let request = ReadinessReportRequest {
            snapshot: snapshot(),
            today: Some(date(2025, 3, 10)),
            category: Some("drill".to_string()),
        };

        let Json(body) = readiness_report_endpoint(
            Extension(Arc::new(ReportSettings::default())),
            Json(request),
        )
        .await
        .expect("report builds");

        assert_eq!(body.compliance.events_counted, 1);
        assert_eq!(body.compliance.percentage, 50.0);
    }

    #[tokio::test]
    async fn readiness_report_endpoint_rejects_unknown_reasons() {
        let mut snapshot = snapshot();
        snapshot
            .attendance
            .push(AttendanceRecord::absent("e-2", "s-2", "beach_day"));
        let request = ReadinessReportRequest {
            snapshot,
            today: Some(date(2025, 3, 10)),
            category: None,
        };

        let error = readiness_report_endpoint(
            Extension(Arc::new(ReportSettings::default())),
            Json(request),
        )
        .await
        .expect_err("unknown reason rejected");

        assert_eq!(error.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn rotation_endpoint_resolves_the_requested_week() {
        let Json(rotation) = rotation_endpoint(
            Extension(Arc::new(ReportSettings::default())),
            Query(RotationQuery {
                date: Some(date(2025, 3, 10)),
            }),
        )
        .await;

        assert_eq!(rotation.week_number, 11);
        assert_eq!(rotation.week, RotationWeek::B);
    }

    #[tokio::test]
    async fn rotation_route_reads_the_date_query() {
        let response = app()
            .oneshot(
                Request::get("/api/v1/rotation?date=2025-03-10")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body["week_number"], 11);
        assert_eq!(body["week"], "b");
        assert_eq!(body["week_label"], "Week B");
    }

    #[tokio::test]
    async fn report_route_accepts_a_json_snapshot() {
        let payload = json!({
            "snapshot": serde_json::to_value(snapshot()).expect("snapshot json"),
            "today": "2025-03-10",
            "category": "drill"
        });
        let response = app()
            .oneshot(
                Request::post("/api/v1/readiness/report")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(payload.to_string()))
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body["as_of"], "2025-03-10");
        assert_eq!(body["compliance"]["events_counted"], 1);
        assert_eq!(body["compliance"]["percentage"], 50.0);
    }

    #[tokio::test]
    async fn safety_routes_are_mounted_alongside_the_report() {
        let app = app();
        let recorded = app
            .clone()
            .oneshot(
                Request::put("/api/v1/safety/scores")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        json!({ "soldier_id": "s-1", "month": "2025-03", "score": 40 })
                            .to_string(),
                    ))
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(recorded.status(), StatusCode::OK);

        let standing = app
            .oneshot(
                Request::get("/api/v1/safety/standing/s-1")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(standing.status(), StatusCode::OK);
        let body = read_json(standing).await;
        assert_eq!(body["safety_status"], "warning");
        assert_eq!(body["current_safety_score"], 40);
    }
}
