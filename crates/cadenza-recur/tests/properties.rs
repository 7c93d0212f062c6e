//! End to end behavior of rules, date sets and operators through the
//! public API.

use cadenza_recur::{
    schedule, Dates, Frequency, Instant, OccurrenceGenerator, RecurError, RecurResult, Rule,
    RuleOptions, Stream, TraversalArgs, Weekday, WeekdayNum,
};

fn utc(year: i32, month: u32, day: u32, hour: u32) -> Instant {
    Instant::utc(year, month, day, hour, 0, 0, 0).expect("valid date")
}

fn collect(stream: &Stream, args: TraversalArgs) -> Vec<Instant> {
    let mut iter = stream.occurrences(args);
    let mut values = Vec::new();
    while let Some(value) = iter.next_occurrence().expect("should iterate") {
        values.push(value);
    }
    values
}

fn dates(instants: Vec<Instant>) -> Stream {
    Stream::dates(Dates::new(instants).expect("should build"))
}

#[test_log::test]
fn test_emission_is_strictly_monotonic_in_both_directions() {
    let stream = Stream::union(vec![
        Stream::rule(
            Rule::new(RuleOptions::new(utc(2019, 1, 1, 9), Frequency::Daily).with_count(5))
                .expect("should build"),
        ),
        dates(vec![utc(2019, 1, 2, 12), utc(2019, 1, 4, 6)]),
    ]);

    let ascending = collect(&stream, TraversalArgs::new());
    assert_eq!(ascending.len(), 7);
    assert!(ascending
        .windows(2)
        .all(|pair| pair[0].timestamp_ms() < pair[1].timestamp_ms()));

    let descending = collect(
        &stream,
        TraversalArgs {
            end: Some(utc(2019, 1, 6, 0)),
            reverse: true,
            ..TraversalArgs::default()
        },
    );
    assert_eq!(descending.len(), 7);
    assert!(descending
        .windows(2)
        .all(|pair| pair[0].timestamp_ms() > pair[1].timestamp_ms()));
}

#[test_log::test]
fn test_union_cardinality_keeps_duplicates() {
    let a = vec![utc(2019, 1, 1, 0), utc(2019, 1, 3, 0)];
    let b = vec![utc(2019, 1, 1, 0), utc(2019, 1, 2, 0), utc(2019, 1, 4, 0)];
    let stream = Stream::union(vec![dates(a.clone()), dates(b.clone())]);

    let values = collect(&stream, TraversalArgs::new());
    assert_eq!(values.len(), a.len() + b.len());
    let mut expected = [a, b].concat();
    expected.sort_by_key(Instant::ordering_key);
    assert_eq!(values, expected);
}

#[test_log::test]
fn test_unique_is_idempotent() {
    let base = Stream::union(vec![
        dates(vec![utc(2019, 1, 1, 0), utc(2019, 1, 2, 0)]),
        dates(vec![utc(2019, 1, 1, 0), utc(2019, 1, 2, 0)]),
    ]);
    let once = collect(&base.clone().unique(), TraversalArgs::new());
    let twice = collect(&base.unique().unique(), TraversalArgs::new());
    assert_eq!(once, twice);
    assert_eq!(once, vec![utc(2019, 1, 1, 0), utc(2019, 1, 2, 0)]);
}

#[test_log::test]
fn test_difference_and_intersection_partition_the_base() {
    let a = vec![
        utc(2019, 1, 1, 0),
        utc(2019, 1, 2, 0),
        utc(2019, 1, 3, 0),
        utc(2019, 1, 4, 0),
    ];
    let b = vec![utc(2019, 1, 2, 0), utc(2019, 1, 4, 0), utc(2019, 1, 5, 0)];

    let reassembled = Stream::union(vec![
        dates(a.clone()).difference(vec![dates(b.clone())]),
        Stream::intersection(vec![dates(a.clone()), dates(b)], None),
    ]);
    assert_eq!(collect(&reassembled, TraversalArgs::new()), a);
}

#[test_log::test]
fn test_bounded_window_matches_filtered_unbounded_traversal() {
    let rule = Rule::new(
        RuleOptions::new(utc(2019, 1, 1, 9), Frequency::Daily).with_count(10),
    )
    .expect("should build");
    let stream = Stream::rule(rule);

    let window_start = utc(2019, 1, 3, 0);
    let window_end = utc(2019, 1, 7, 0);
    let bounded = collect(&stream, TraversalArgs::between(window_start, window_end));
    let filtered: Vec<Instant> = collect(&stream, TraversalArgs::new())
        .into_iter()
        .filter(|value| {
            value.timestamp_ms() >= window_start.timestamp_ms()
                && value.timestamp_ms() <= window_end.timestamp_ms()
        })
        .collect();
    assert_eq!(bounded, filtered);
}

#[test_log::test]
fn test_yearly_weekday_rule_validates_and_repairs() {
    let start = Instant::utc(2019, 1, 1, 2, 3, 4, 5).expect("valid date");
    let rule = Rule::new(
        RuleOptions::new(start, Frequency::Yearly)
            .with_by_day_of_week(vec![WeekdayNum::every(Weekday::Tuesday)]),
    )
    .expect("should build");

    // 2019-01-01 is a Tuesday, so the start itself is the first value.
    let mut iter = rule.occurrences(TraversalArgs::new());
    assert_eq!(
        iter.next_occurrence().expect("should iterate"),
        Some(start)
    );

    // From a Wednesday the engine repairs to the next Tuesday.
    let mut iter = rule.occurrences(TraversalArgs::new());
    iter.skip_to(&utc(2019, 1, 16, 0)).expect("should skip");
    assert_eq!(
        iter.next_occurrence().expect("should iterate"),
        Some(Instant::utc(2019, 1, 22, 2, 3, 4, 5).expect("valid date"))
    );
}

#[test_log::test]
fn test_third_monday_resolution_within_month_window() {
    let rule = Rule::new(
        RuleOptions::new(utc(2019, 1, 1, 0), Frequency::Monthly)
            .with_by_day_of_week(vec![WeekdayNum::nth(3, Weekday::Monday)]),
    )
    .expect("should build");

    let mut iter = rule.occurrences(TraversalArgs::new());
    iter.skip_to(&utc(2019, 3, 16, 0)).expect("should skip");
    // The third Monday of March 2019.
    assert_eq!(
        iter.next_occurrence().expect("should iterate"),
        Some(utc(2019, 3, 18, 0))
    );
}

#[test_log::test]
fn test_unique_collapses_duplicate_dates() {
    let duplicated = Instant::utc(2019, 1, 1, 1, 1, 1, 1).expect("valid date");
    let single = Instant::utc(2020, 3, 3, 3, 3, 3, 3).expect("valid date");
    let stream = dates(vec![duplicated, single, duplicated]).unique();
    assert_eq!(
        collect(&stream, TraversalArgs::new()),
        vec![duplicated, single]
    );
}

#[test_log::test]
fn test_impossible_rule_raises_non_convergence() {
    let rule = Rule::new(
        RuleOptions::new(utc(2019, 1, 31, 0), Frequency::Yearly)
            .with_by_month_of_year(vec![2])
            .with_by_day_of_month(vec![31]),
    )
    .expect("should build");

    let mut iter = rule.occurrences(TraversalArgs::new());
    assert!(matches!(
        iter.next_occurrence(),
        Err(RecurError::NonConvergence { iterations: _ })
    ));
}

#[test_log::test]
fn test_schedule_survives_round_trip_through_iterator_adapter() {
    let rrule = Rule::new(
        RuleOptions::new(utc(2019, 1, 1, 9), Frequency::Daily).with_count(4),
    )
    .expect("should build");
    let exdates = Dates::new(vec![utc(2019, 1, 2, 9)]).expect("should build");

    let stream = schedule(vec![rrule], Vec::new(), Dates::empty(), exdates);
    let values: Vec<Instant> = stream
        .occurrences(TraversalArgs::new())
        .collect::<RecurResult<Vec<_>>>()
        .expect("should collect");
    assert_eq!(
        values,
        vec![utc(2019, 1, 1, 9), utc(2019, 1, 3, 9), utc(2019, 1, 4, 9)]
    );
}
