use chrono::{DateTime, Datelike, Local, Months, NaiveDate, Utc};

/// Completed years between `birth` and `today`
pub fn age_on(birth: NaiveDate, today: NaiveDate) -> u32 {
    let mut years = today.year() - birth.year();
    if (today.month(), today.day()) < (birth.month(), birth.day()) {
        years -= 1;
    }
    u32::try_from(years).unwrap_or(0)
}

/// `today` shifted back by whole years; Feb 29 clamps to Feb 28
pub fn years_before(today: NaiveDate, years: u32) -> NaiveDate {
    today
        .checked_sub_months(Months::new(years.saturating_mul(12)))
        .unwrap_or(NaiveDate::MIN)
}

/// Birth-date window for a partner age range
///
/// Returns `(min_birth_date, max_birth_date)`, both inclusive:
/// `max = today - age_from years`, `min = today - (age_to + 1) years`.
pub fn birth_date_window(
    age_from: Option<u32>,
    age_to: Option<u32>,
    today: NaiveDate,
) -> (Option<NaiveDate>, Option<NaiveDate>) {
    let max_birth_date = age_from.map(|from| years_before(today, from));
    let min_birth_date = age_to.map(|to| years_before(today, to.saturating_add(1)));
    (min_birth_date, max_birth_date)
}

/// Start of the server-local calendar day containing `now`
pub fn day_start(now: DateTime<Utc>) -> DateTime<Utc> {
    let local_midnight = now
        .with_timezone(&Local)
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .and_then(|midnight| midnight.and_local_timezone(Local).earliest());

    match local_midnight {
        Some(midnight) => midnight.with_timezone(&Utc),
        // Midnight skipped by a DST jump; fall back to UTC midnight
        None => now
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .map(|midnight| midnight.and_utc())
            .unwrap_or(now),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_age_before_and_after_birthday() {
        assert_eq!(age_on(date(1996, 6, 15), date(2024, 6, 14)), 27);
        assert_eq!(age_on(date(1996, 6, 15), date(2024, 6, 15)), 28);
        assert_eq!(age_on(date(2030, 1, 1), date(2024, 1, 1)), 0);
    }

    #[test]
    fn test_birth_date_window() {
        let today = date(2024, 3, 10);
        let (min, max) = birth_date_window(Some(25), Some(30), today);

        assert_eq!(max, Some(date(1999, 3, 10)));
        assert_eq!(min, Some(date(1993, 3, 10)));
    }

    #[test]
    fn test_open_ended_window() {
        let today = date(2024, 3, 10);
        assert_eq!(birth_date_window(None, None, today), (None, None));
        let (min, max) = birth_date_window(Some(21), None, today);
        assert_eq!(min, None);
        assert_eq!(max, Some(date(2003, 3, 10)));
    }

    #[test]
    fn test_leap_day_clamps() {
        assert_eq!(years_before(date(2024, 2, 29), 1), date(2023, 2, 28));
    }

    #[test]
    fn test_day_start_not_after_now() {
        let now = Utc::now();
        let start = day_start(now);
        assert!(start <= now);
        assert!(now - start <= chrono::Duration::hours(26));
    }
}
