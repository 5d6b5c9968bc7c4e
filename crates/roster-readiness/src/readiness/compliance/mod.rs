//! Attendance aggregation: per-soldier percentages, unit totals and monthly trends.

mod stats;
mod trend;

pub use stats::{
    absence_breakdown, aggregate_events, aggregate_soldier, aggregate_unit, relevant_events,
    ComplianceStats, EventFilter, ReasonCount, SoldierCompliance, UnitCompliance,
};
pub use trend::{monthly_trend, soldier_trend, TrendPoint, DEFAULT_TREND_MONTHS};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::readiness::attendance::AttendanceBook;
    use crate::readiness::catalog::AbsenceCatalog;
    use crate::readiness::domain::{
        AttendanceRecord, AttendanceStatus, Event, EventStatus, ReadinessError, Soldier,
        SoldierId, YearMonth,
    };
    use crate::readiness::table::ComprehensiveTable;
    use chrono::NaiveDate;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
    }

    fn roster() -> Vec<Soldier> {
        vec![
            Soldier::new("a", "Avi Mizrahi", "1"),
            Soldier::new("b", "Bella Katz", "2"),
        ]
    }

    #[test]
    fn expected_soldier_without_record_is_not_updated_and_not_judged() {
        let events = vec![Event::new("e1", "Drill", "drill", date(2025, 3, 2))
            .with_expected(["a", "b"])
            .completed()];
        let book = AttendanceBook::from_records([AttendanceRecord::attended("e1", "a")])
            .expect("book");
        let catalog = AbsenceCatalog::standard();

        let a = aggregate_soldier(&SoldierId::from("a"), &events, &book, &catalog).expect("a");
        let b = aggregate_soldier(&SoldierId::from("b"), &events, &book, &catalog).expect("b");

        assert_eq!(a.attended, 1);
        assert_eq!(a.judged(), 1);
        assert_eq!(a.percentage(), 100.0);
        assert_eq!(b.not_updated, 1);
        assert_eq!(b.judged(), 0);
        assert_eq!(b.percentage(), 100.0);
    }

    #[test]
    fn non_countable_reasons_leave_the_denominator() {
        let events = vec![
            Event::new("e1", "Drill", "drill", date(2025, 3, 2))
                .with_expected(["a"])
                .completed(),
            Event::new("e2", "Drill", "drill", date(2025, 3, 9))
                .with_expected(["a"])
                .completed(),
            Event::new("e3", "Drill", "drill", date(2025, 3, 16))
                .with_expected(["a"])
                .completed(),
            Event::new("e4", "Drill", "drill", date(2025, 3, 23))
                .with_expected(["a"])
                .completed(),
        ];
        let book = AttendanceBook::from_records([
            AttendanceRecord::attended("e1", "a"),
            AttendanceRecord::absent("e2", "a", "course"),
            AttendanceRecord::absent("e3", "a", "unauthorized_absence"),
            AttendanceRecord::absent("e4", "a", "awol"),
        ])
        .expect("book");

        let stats = aggregate_soldier(
            &SoldierId::from("a"),
            &events,
            &book,
            &AbsenceCatalog::standard(),
        )
        .expect("stats");

        assert_eq!(stats.attended, 1);
        assert_eq!(stats.absent, 1);
        assert_eq!(stats.non_countable_absent, 2);
        assert_eq!(stats.percentage(), 50.0);
    }

    #[test]
    fn make_up_counts_as_attended() {
        let events = vec![Event::new("e1", "Drill", "drill", date(2025, 3, 2))
            .with_expected(["a"])
            .completed()];
        let mut record = AttendanceRecord::absent("e1", "a", "routine_leave");
        record.complete_make_up().expect("make-up");
        let book = AttendanceBook::from_records([record]).expect("book");

        let stats = aggregate_soldier(
            &SoldierId::from("a"),
            &events,
            &book,
            &AbsenceCatalog::standard(),
        )
        .expect("stats");
        assert_eq!(stats.attended, 1);
        assert_eq!(stats.absent, 0);
    }

    #[test]
    fn aggregation_rejects_events_that_are_not_completed() {
        let mut pending = Event::new("e1", "Drill", "drill", date(2025, 3, 2)).with_expected(["a"]);
        pending.status = EventStatus::InProgress;
        let book = AttendanceBook::default();

        match aggregate_soldier(
            &SoldierId::from("a"),
            [&pending],
            &book,
            &AbsenceCatalog::standard(),
        ) {
            Err(ReadinessError::EventNotCompleted { status, .. }) => {
                assert_eq!(status, EventStatus::InProgress)
            }
            other => panic!("expected not completed error, got {other:?}"),
        }
    }

    #[test]
    fn unknown_reason_rejects_the_aggregate() {
        let events = vec![Event::new("e1", "Drill", "drill", date(2025, 3, 2))
            .with_expected(["a"])
            .completed()];
        let book = AttendanceBook::from_records([AttendanceRecord::absent("e1", "a", "beach")])
            .expect("book");

        assert!(matches!(
            aggregate_soldier(
                &SoldierId::from("a"),
                &events,
                &book,
                &AbsenceCatalog::standard()
            ),
            Err(ReadinessError::UnknownAbsenceReason(_))
        ));
    }

    #[test]
    fn unit_aggregate_applies_category_filter() {
        let events = vec![
            Event::new("e1", "Drill", "drill", date(2025, 3, 2))
                .with_expected(["a", "b"])
                .completed(),
            Event::new("e2", "Briefing", "briefing", date(2025, 3, 3))
                .with_expected(["a", "b"])
                .completed(),
            Event::new("e3", "Drill", "drill", date(2025, 3, 9)).with_expected(["a", "b"]),
        ];
        let book = AttendanceBook::from_records([
            AttendanceRecord::attended("e1", "a"),
            AttendanceRecord::absent("e1", "b", "routine_leave"),
            AttendanceRecord::absent("e2", "a", "routine_leave"),
        ])
        .expect("book");

        let unit = aggregate_unit(
            &roster(),
            &events,
            &book,
            &AbsenceCatalog::standard(),
            &EventFilter::category("drill"),
        )
        .expect("unit");

        assert_eq!(unit.events_counted, 1);
        assert_eq!(unit.totals.attended, 1);
        assert_eq!(unit.totals.absent, 1);
        assert_eq!(unit.percentage, 50.0);
        assert_eq!(unit.soldiers.len(), 2);
    }

    #[test]
    fn unit_totals_keep_departed_and_unknown_participants() {
        let mut roster = roster();
        roster[0].deactivate();
        let events = vec![Event::new("e1", "Drill", "drill", date(2025, 3, 2))
            .with_expected(["a", "b", "ghost"])
            .completed()];
        let book = AttendanceBook::from_records([
            AttendanceRecord::absent("e1", "a", "unauthorized_absence"),
            AttendanceRecord::attended("e1", "b"),
            AttendanceRecord::absent("e1", "ghost", "routine_leave"),
        ])
        .expect("book");
        let catalog = AbsenceCatalog::standard();
        let filter = EventFilter::default();

        let unit = aggregate_unit(&roster, &events, &book, &catalog, &filter).expect("unit");
        assert_eq!(unit.totals.attended, 1);
        assert_eq!(unit.totals.absent, 2);
        assert!((unit.percentage - 100.0 / 3.0).abs() < 1e-9);
        assert_eq!(unit.soldiers.len(), 1);
        assert_eq!(unit.soldiers[0].soldier_id, SoldierId::from("b"));

        let trend = monthly_trend(&events, &book, &catalog, &filter, date(2025, 3, 20), 1)
            .expect("trend");
        assert_eq!(trend[0].stats, unit.totals);

        let table = ComprehensiveTable::build(&roster, &events, &book);
        let absent_rows = table
            .rows()
            .iter()
            .filter(|row| row.status == AttendanceStatus::Absent)
            .count();
        assert_eq!(table.len(), 3);
        assert_eq!(absent_rows, 2);
    }

    #[test]
    fn relevant_events_include_recorded_but_unexpected() {
        let events = vec![
            Event::new("e1", "Drill", "drill", date(2025, 3, 2))
                .with_expected(["b"])
                .completed(),
            Event::new("e2", "Drill", "drill", date(2025, 3, 9))
                .with_expected(["b"])
                .completed(),
        ];
        let book = AttendanceBook::from_records([AttendanceRecord::attended("e2", "a")])
            .expect("book");

        let relevant = relevant_events(&SoldierId::from("a"), &events, &book);
        assert_eq!(relevant.len(), 1);
        assert_eq!(relevant[0].id.0, "e2");
    }

    #[test]
    fn trend_recomputes_after_expected_set_edit() {
        let mut events = vec![
            Event::new("e1", "Drill", "drill", date(2025, 1, 12))
                .with_expected(["a"])
                .completed(),
            Event::new("e2", "Drill", "drill", date(2025, 3, 9))
                .with_expected(["a"])
                .completed(),
        ];
        let book = AttendanceBook::from_records([
            AttendanceRecord::attended("e1", "a"),
            AttendanceRecord::absent("e2", "a", "routine_leave"),
        ])
        .expect("book");
        let catalog = AbsenceCatalog::standard();
        let filter = EventFilter::category("drill");
        let today = date(2025, 3, 20);

        let trend = monthly_trend(&events, &book, &catalog, &filter, today, 6)
            .expect("trend");
        assert_eq!(trend.len(), 6);
        assert_eq!(trend[0].month, YearMonth::new(2024, 10).expect("valid"));
        assert_eq!(trend[5].month, YearMonth::new(2025, 3).expect("valid"));
        assert_eq!(trend[3].percentage, 100.0);
        assert_eq!(trend[3].stats.not_updated, 0);
        assert_eq!(trend[4].percentage, 100.0);
        assert_eq!(trend[4].events, 0);
        assert_eq!(trend[5].percentage, 0.0);

        events[0].expected.insert(SoldierId::from("b"));
        let trend = monthly_trend(&events, &book, &catalog, &filter, today, 6)
            .expect("trend");
        assert_eq!(trend[3].stats.not_updated, 1);
        assert_eq!(trend[3].percentage, 100.0);
    }

    #[test]
    fn absence_breakdown_counts_by_reason() {
        let events = vec![Event::new("e1", "Drill", "drill", date(2025, 3, 2))
            .with_expected(["a", "b"])
            .completed()];
        let book = AttendanceBook::from_records([
            AttendanceRecord::absent("e1", "a", "course"),
            AttendanceRecord::absent("e1", "b", "course"),
        ])
        .expect("book");

        let breakdown =
            absence_breakdown(&events, &book, &AbsenceCatalog::standard()).expect("breakdown");
        assert_eq!(breakdown.len(), 1);
        assert_eq!(breakdown[0].count, 2);
        assert!(!breakdown[0].countable);
    }
}
