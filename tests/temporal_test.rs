use chrono::NaiveDate;
use macroreg::temporal::{date_range, parse_date};
use macroreg::{Aligner, DatedSeries, Error, NA};

fn day(n: u64) -> NaiveDate {
    NaiveDate::from_ymd_opt(1999, 12, 20).unwrap() + chrono::Days::new(n)
}

#[test]
fn test_date_range_length_and_order() {
    // Spans a year and a leap day
    let start = NaiveDate::from_ymd_opt(1999, 12, 30).unwrap();
    let end = NaiveDate::from_ymd_opt(2000, 3, 2).unwrap();
    let dates = date_range(start, end).unwrap();

    assert_eq!(dates.len() as i64, (end - start).num_days() + 1);
    assert_eq!(dates.first(), Some(&start));
    assert_eq!(dates.last(), Some(&end));
    assert!(dates.windows(2).all(|w| (w[1] - w[0]).num_days() == 1));
    assert!(dates.contains(&NaiveDate::from_ymd_opt(2000, 2, 29).unwrap()));
}

#[test]
fn test_single_day_and_reversed_ranges() {
    assert_eq!(date_range(day(3), day(3)).unwrap(), vec![day(3)]);
    assert!(matches!(date_range(day(4), day(3)), Err(Error::Config(_))));
}

#[test]
fn test_parse_date_layouts() {
    let expected = NaiveDate::from_ymd_opt(2008, 9, 15);
    assert_eq!(parse_date("2008-09-15"), expected);
    assert_eq!(parse_date("09/15/2008"), expected);
    assert_eq!(parse_date("2008/09/15"), expected);
    assert_eq!(parse_date(" 2008-09-15T13:30:00-04:00 "), expected);
    assert_eq!(parse_date("15.09.2008"), None);
}

#[test]
fn test_forward_fill_is_most_recent_observation() {
    let observed = [2u64, 3, 9, 17, 18, 30];
    let a = DatedSeries::new(
        "a",
        observed
            .iter()
            .map(|&d| (day(d), NA::Value(d as f64)))
            // A missing record does not interrupt the fill
            .chain(std::iter::once((day(12), NA::NA)))
            .collect(),
    );
    let y = DatedSeries::from_observations("y", vec![(day(0), 1.0), (day(35), 1.0)]);
    let calendar = Aligner::new("y").align(&[y, a]).unwrap();

    for n in 0..=35u64 {
        let expected = observed
            .iter()
            .rev()
            .find(|&&d| d <= n)
            .map_or(NA::NA, |&d| NA::Value(d as f64));
        assert_eq!(calendar.value(day(n), "a").unwrap(), expected, "day {}", n);
    }
}

#[test]
fn test_trim_keeps_dependent_days_only() {
    let a = DatedSeries::from_observations("a", (0..20).map(|d| (day(d), 1.0)));
    let y = DatedSeries::new(
        "y",
        vec![
            (day(1), NA::Value(4.0)),
            (day(4), NA::NA),
            (day(7), NA::Value(5.0)),
            (day(19), NA::Value(6.0)),
        ],
    );
    let (calendar, table) = Aligner::new("y").align_and_trim(&[a, y]).unwrap();

    assert_eq!(calendar.len(), 19);
    assert_eq!(table.dates(), &[day(1), day(7), day(19)]);
    assert_eq!(table.dependent_values().unwrap(), vec![4.0, 5.0, 6.0]);
}

#[test]
fn test_duplicate_series_name_is_shape_error() {
    let y = DatedSeries::from_observations("y", vec![(day(0), 1.0)]);
    let a1 = DatedSeries::from_observations("a", vec![(day(0), 1.0)]);
    let a2 = DatedSeries::from_observations("a", vec![(day(0), 2.0)]);
    assert!(matches!(
        Aligner::new("y").align(&[y, a1, a2]),
        Err(Error::Shape(_))
    ));
}
