use crate::types::WorkoutKind;
use chrono::{DateTime, Datelike, TimeZone};

const MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Label such as `Running on March 3`, using the calendar date of `at` in its
/// own time zone. Callers pass local time at creation.
pub fn format_description<Tz: TimeZone>(kind: WorkoutKind, at: &DateTime<Tz>) -> String {
    let month = MONTHS[at.month0() as usize];
    format!("{} on {month} {}", kind.label(), at.day())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Utc};

    #[test]
    fn test_running_on_march_3() {
        let at = Utc.with_ymd_and_hms(2024, 3, 3, 9, 30, 0).unwrap();
        assert_eq!(
            format_description(WorkoutKind::Running, &at),
            "Running on March 3"
        );
        assert_eq!(
            format_description(WorkoutKind::Cycling, &at),
            "Cycling on March 3"
        );
    }

    #[test]
    fn test_uses_the_given_zone_for_the_day() {
        // 23:30 UTC on Dec 31 is already Jan 1 at UTC+2.
        let utc = Utc.with_ymd_and_hms(2023, 12, 31, 23, 30, 0).unwrap();
        let east = utc.with_timezone(&FixedOffset::east_opt(2 * 3600).unwrap());
        assert_eq!(
            format_description(WorkoutKind::Running, &utc),
            "Running on December 31"
        );
        assert_eq!(
            format_description(WorkoutKind::Running, &east),
            "Running on January 1"
        );
    }
}
