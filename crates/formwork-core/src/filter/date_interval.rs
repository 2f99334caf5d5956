use super::{Between, Target, NEVER};
use crate::{BindValue, Record, Type, Value};

use chrono::{Datelike, Days, NaiveDate, NaiveDateTime, NaiveTime};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateUnit {
    Day,
    /// Monday through Sunday
    Week,
    Month,
    Year,
}

/// The calendar unit containing an anchor date, as an inclusive range
/// from midnight on the first day to the last instant of the last.
#[derive(Debug, Clone)]
pub struct DateInterval {
    pub(crate) target: Target,
    unit: DateUnit,
    anchor: Option<NaiveDate>,
}

impl DateInterval {
    pub fn new(column: impl Into<String>, unit: DateUnit) -> DateInterval {
        DateInterval {
            target: Target::new(column),
            unit,
            anchor: None,
        }
    }

    pub fn unit(&self) -> DateUnit {
        self.unit
    }

    pub fn anchor(&self) -> Option<NaiveDate> {
        self.anchor
    }

    /// Accepts dates, date-times and anything [`Value::materialize`] turns
    /// into one. Other values clear the anchor.
    pub fn set_constraint(&mut self, value: impl Into<Value>) {
        self.anchor = value.into().materialize(Some(Type::Date)).as_date();
    }

    /// First and last instant of the interval.
    pub fn range(&self) -> Option<(NaiveDateTime, NaiveDateTime)> {
        let anchor = self.anchor?;

        let (first, last) = match self.unit {
            DateUnit::Day => (anchor, anchor),
            DateUnit::Week => {
                let monday = anchor.checked_sub_days(Days::new(
                    anchor.weekday().num_days_from_monday() as u64,
                ))?;
                (monday, monday.checked_add_days(Days::new(6))?)
            }
            DateUnit::Month => {
                let first = anchor.with_day(1)?;
                let next = match anchor.month() {
                    12 => NaiveDate::from_ymd_opt(anchor.year() + 1, 1, 1)?,
                    month => NaiveDate::from_ymd_opt(anchor.year(), month + 1, 1)?,
                };
                (first, next.pred_opt()?)
            }
            DateUnit::Year => (
                NaiveDate::from_ymd_opt(anchor.year(), 1, 1)?,
                NaiveDate::from_ymd_opt(anchor.year(), 12, 31)?,
            ),
        };

        Some((first.and_time(NaiveTime::MIN), last.and_hms_nano_opt(23, 59, 59, 999_999_999)?))
    }

    fn between(&self) -> Option<Between> {
        let (first, last) = self.range()?;

        let mut between = Between::new(self.target.column());
        between.target = self.target.clone();
        between.set_range(first, last);
        Some(between)
    }

    pub fn evaluate(&self, record: &Record) -> bool {
        self.between()
            .is_some_and(|between| between.evaluate(record))
    }

    pub fn as_sql(&self) -> String {
        match self.between() {
            Some(between) => between.as_sql(),
            None => NEVER.to_string(),
        }
    }

    pub fn bind_values(&self) -> Vec<BindValue> {
        self.between()
            .map(|between| between.bind_values())
            .unwrap_or_default()
    }
}
