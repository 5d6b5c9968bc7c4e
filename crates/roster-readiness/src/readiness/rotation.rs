//! Week-parity rotation calendar.
//!
//! The rotation week of a date is the ISO-8601 week of that date after shifting it so the
//! configured first day of the unit's week lines up with Monday. With the default Sunday
//! start, Sunday through Saturday share one week number.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::Serialize;

use super::domain::{EntryDay, RotationGroup, RotationWeek, Soldier};

/// Which ISO week numbers count as week A.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeekParity {
    Even,
    Odd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParityRule {
    /// Parity of the ISO week number. Two consecutive weeks share a letter after a
    /// 53-week year.
    IsoWeek { week_a: WeekParity },
    /// Whole weeks counted from the week containing `anchor`, which is week A.
    Anchored { anchor: NaiveDate },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationSettings {
    pub week_start: Weekday,
    pub first_entry: Weekday,
    pub second_entry: Weekday,
    pub parity: ParityRule,
}

impl Default for RotationSettings {
    fn default() -> Self {
        Self {
            week_start: Weekday::Sun,
            first_entry: Weekday::Sun,
            second_entry: Weekday::Mon,
            parity: ParityRule::IsoWeek {
                week_a: WeekParity::Even,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ActiveRotation {
    pub date: NaiveDate,
    pub iso_year: i32,
    pub week_number: u32,
    pub week: RotationWeek,
    pub week_label: &'static str,
    pub groups: [RotationGroup; 2],
}

#[derive(Debug, Clone, Default)]
pub struct RotationCalendar {
    settings: RotationSettings,
}

impl RotationCalendar {
    pub fn new(settings: RotationSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &RotationSettings {
        &self.settings
    }

    /// Groups reporting during the rotation week that contains `today`.
    pub fn active_groups(&self, today: NaiveDate) -> ActiveRotation {
        let aligned = self.align(today);
        let iso = aligned.iso_week();
        let week = self.week_letter(today);

        ActiveRotation {
            date: today,
            iso_year: iso.year(),
            week_number: iso.week(),
            week,
            week_label: week.label(),
            groups: [
                RotationGroup::new(week, EntryDay::First),
                RotationGroup::new(week, EntryDay::Second),
            ],
        }
    }

    pub fn week_letter(&self, date: NaiveDate) -> RotationWeek {
        let aligned = self.align(date);
        let is_even = match self.settings.parity {
            ParityRule::IsoWeek { week_a } => {
                let even_week = aligned.iso_week().week() % 2 == 0;
                match week_a {
                    WeekParity::Even => even_week,
                    WeekParity::Odd => !even_week,
                }
            }
            ParityRule::Anchored { anchor } => {
                let start = week_monday(self.align(anchor));
                let weeks = (week_monday(aligned) - start).num_days().div_euclid(7);
                weeks.rem_euclid(2) == 0
            }
        };

        if is_even {
            RotationWeek::A
        } else {
            RotationWeek::B
        }
    }

    pub fn entry_weekday(&self, group: RotationGroup) -> Weekday {
        match group.entry {
            EntryDay::First => self.settings.first_entry,
            EntryDay::Second => self.settings.second_entry,
        }
    }

    pub fn is_entry_day(&self, group: RotationGroup, date: NaiveDate) -> bool {
        self.week_letter(date) == group.week && date.weekday() == self.entry_weekday(group)
    }

    /// Active soldiers whose group reports this week, in roster order.
    pub fn on_rotation<'a>(&self, roster: &'a [Soldier], today: NaiveDate) -> Vec<&'a Soldier> {
        let week = self.week_letter(today);
        roster
            .iter()
            .filter(|soldier| soldier.active)
            .filter(|soldier| {
                soldier
                    .rotation_group
                    .map(|group| group.week == week)
                    .unwrap_or(false)
            })
            .collect()
    }

    fn align(&self, date: NaiveDate) -> NaiveDate {
        let shift = (7 - self.settings.week_start.num_days_from_monday()) % 7;
        date + Duration::days(i64::from(shift))
    }
}

fn week_monday(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}
