use chrono::{Datelike, Duration, NaiveDate};
use fintrack_domain::{advance_date, days_in_month, Frequency};
use proptest::prelude::*;

fn any_date() -> impl Strategy<Value = NaiveDate> {
    // 1900-01-01 plus up to ~300 years.
    (0i64..110_000).prop_map(|offset| {
        NaiveDate::from_ymd_opt(1900, 1, 1).unwrap() + Duration::days(offset)
    })
}

fn any_frequency() -> impl Strategy<Value = Frequency> {
    prop::sample::select(Frequency::ALL.to_vec())
}

proptest! {
    #[test]
    fn advance_is_strictly_increasing(date in any_date(), frequency in any_frequency()) {
        let next = advance_date(date, frequency).expect("date in range");
        prop_assert!(next > date);
    }

    #[test]
    fn month_based_advance_keeps_or_clamps_day(date in any_date()) {
        for (frequency, months) in [
            (Frequency::Monthly, 1u32),
            (Frequency::Quarterly, 3),
            (Frequency::Yearly, 12),
        ] {
            let next = advance_date(date, frequency).expect("date in range");
            let elapsed = (next.year() - date.year()) * 12 + next.month() as i32
                - date.month() as i32;
            prop_assert_eq!(elapsed, months as i32);
            let last = days_in_month(next.year(), next.month()).unwrap();
            prop_assert_eq!(next.day(), date.day().min(last));
        }
    }

    #[test]
    fn day_based_advance_adds_exact_days(date in any_date()) {
        prop_assert_eq!(advance_date(date, Frequency::Daily).unwrap() - date, Duration::days(1));
        prop_assert_eq!(advance_date(date, Frequency::Weekly).unwrap() - date, Duration::days(7));
        prop_assert_eq!(advance_date(date, Frequency::Biweekly).unwrap() - date, Duration::days(14));
    }
}
