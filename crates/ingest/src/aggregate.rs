//! Calendar-week aggregation.
//!
//! Weeks end on Sunday and are labelled by that Sunday. Weeks between the
//! first and last observed week that have no reports are emitted with a
//! zero count, so the output is a gap-free weekly series.

use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate};

use openfda_core::{RawReport, WeeklyAggregate};

/// The Sunday closing the calendar week that contains `date`.
pub fn week_ending(date: NaiveDate) -> NaiveDate {
    let days_to_sunday = 6 - date.weekday().num_days_from_monday();
    date + Duration::days(i64::from(days_to_sunday))
}

/// Group reports by calendar week and sum their counts.
pub fn aggregate_weekly(reports: &[RawReport]) -> Vec<WeeklyAggregate> {
    let mut weeks: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    for report in reports {
        *weeks.entry(week_ending(report.time)).or_insert(0) += report.count;
    }

    let (Some(&first), Some(&last)) = (weeks.keys().next(), weeks.keys().next_back()) else {
        return Vec::new();
    };

    let mut out = Vec::with_capacity(weeks.len());
    let mut week = first;
    while week <= last {
        let count = weeks.get(&week).copied().unwrap_or(0);
        out.push(WeeklyAggregate {
            time: week.format("%Y-%m-%d").to_string(),
            count: i64::try_from(count).unwrap_or(i64::MAX),
        });
        week += Duration::days(7);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn report(y: i32, m: u32, day: u32, count: u64) -> RawReport {
        RawReport { time: d(y, m, day), count }
    }

    #[test]
    fn week_ending_is_sunday() {
        // 2021-01-01 is a Friday.
        assert_eq!(week_ending(d(2021, 1, 1)), d(2021, 1, 3));
        // Sunday maps to itself.
        assert_eq!(week_ending(d(2021, 1, 3)), d(2021, 1, 3));
        // Monday starts the next week.
        assert_eq!(week_ending(d(2021, 1, 4)), d(2021, 1, 10));
        // Crosses a month boundary.
        assert_eq!(week_ending(d(2021, 1, 29)), d(2021, 1, 31));
        assert_eq!(week_ending(d(2021, 2, 26)), d(2021, 2, 28));
        assert_eq!(week_ending(d(2020, 12, 30)), d(2021, 1, 3));
    }

    #[test]
    fn january_2021_scenario() {
        let reports = vec![
            report(2021, 1, 1, 5),
            report(2021, 1, 3, 3),
            report(2021, 1, 8, 2),
        ];
        let weeks = aggregate_weekly(&reports);
        assert_eq!(
            weeks,
            vec![
                WeeklyAggregate { time: "2021-01-03".into(), count: 8 },
                WeeklyAggregate { time: "2021-01-10".into(), count: 2 },
            ]
        );
    }

    #[test]
    fn totals_are_preserved() {
        let reports: Vec<RawReport> = (1..=31).map(|day| report(2021, 3, day, day as u64)).collect();
        let weeks = aggregate_weekly(&reports);
        let raw_total: u64 = reports.iter().map(|r| r.count).sum();
        let weekly_total: i64 = weeks.iter().map(|w| w.count).sum();
        assert_eq!(weekly_total as u64, raw_total);
        assert!(weeks.len() < reports.len());
        // 2021-03-01 is a Monday, so March spans five Sunday-ending weeks.
        assert_eq!(weeks.len(), 5);
        assert_eq!(weeks[0].time, "2021-03-07");
        assert_eq!(weeks[0].count, (1..=7).sum::<i64>());
    }

    #[test]
    fn unsorted_input_groups_the_same() {
        let reports = vec![
            report(2021, 1, 8, 2),
            report(2021, 1, 3, 3),
            report(2021, 1, 1, 5),
        ];
        let weeks = aggregate_weekly(&reports);
        assert_eq!(weeks[0].count, 8);
        assert_eq!(weeks[1].count, 2);
    }

    #[test]
    fn gap_weeks_are_zero_filled() {
        let reports = vec![report(2021, 1, 1, 4), report(2021, 1, 20, 6)];
        let weeks = aggregate_weekly(&reports);
        let labels: Vec<&str> = weeks.iter().map(|w| w.time.as_str()).collect();
        assert_eq!(labels, vec!["2021-01-03", "2021-01-10", "2021-01-17", "2021-01-24"]);
        let counts: Vec<i64> = weeks.iter().map(|w| w.count).collect();
        assert_eq!(counts, vec![4, 0, 0, 6]);
    }

    #[test]
    fn no_reports_no_weeks() {
        assert!(aggregate_weekly(&[]).is_empty());
    }
}
