use chrono::NaiveDate;
use serde::Serialize;

use super::super::attendance::AttendanceBook;
use super::super::catalog::AbsenceCatalog;
use super::super::domain::{Event, ReadinessError, SoldierId, YearMonth};
use super::stats::{aggregate_events, aggregate_soldier, ComplianceStats, EventFilter};

pub const DEFAULT_TREND_MONTHS: usize = 6;

#[derive(Debug, Clone, Serialize)]
pub struct TrendPoint {
    pub month: YearMonth,
    pub events: usize,
    pub stats: ComplianceStats,
    pub percentage: f64,
}

/// Unit attendance per calendar month over the `months` ending with `today`'s month.
///
/// Each month is recomputed from its completed events and their current participants;
/// retroactive edits to an old event's roster show up on the next call. Soldiers who
/// have since left the roster still count for the events they took part in.
pub fn monthly_trend(
    events: &[Event],
    book: &AttendanceBook,
    catalog: &AbsenceCatalog,
    filter: &EventFilter,
    today: NaiveDate,
    months: usize,
) -> Result<Vec<TrendPoint>, ReadinessError> {
    trend_for(None, events, book, catalog, filter, today, months)
}

/// Single-soldier variant of [`monthly_trend`].
pub fn soldier_trend(
    soldier: &SoldierId,
    events: &[Event],
    book: &AttendanceBook,
    catalog: &AbsenceCatalog,
    filter: &EventFilter,
    today: NaiveDate,
    months: usize,
) -> Result<Vec<TrendPoint>, ReadinessError> {
    trend_for(Some(soldier), events, book, catalog, filter, today, months)
}

fn trend_for(
    soldier: Option<&SoldierId>,
    events: &[Event],
    book: &AttendanceBook,
    catalog: &AbsenceCatalog,
    filter: &EventFilter,
    today: NaiveDate,
    months: usize,
) -> Result<Vec<TrendPoint>, ReadinessError> {
    YearMonth::of(today)
        .window(months)
        .into_iter()
        .map(|month| {
            let in_month: Vec<&Event> = events
                .iter()
                .filter(|event| event.is_completed())
                .filter(|event| month.contains(event.date) && filter.matches(event))
                .collect();

            let stats = match soldier {
                Some(soldier) => {
                    aggregate_soldier(soldier, in_month.iter().copied(), book, catalog)?
                }
                None => aggregate_events(in_month.iter().copied(), book, catalog)?,
            };

            Ok(TrendPoint {
                month,
                events: in_month.len(),
                percentage: stats.percentage(),
                stats,
            })
        })
        .collect()
}
