use chrono::{DateTime, FixedOffset, Utc};

/// Whether two instants fall on different calendar days in the given timezone.
pub fn wants_date_separator(
    prev: DateTime<Utc>,
    next: DateTime<Utc>,
    offset: &FixedOffset,
) -> bool {
    prev.with_timezone(offset).date_naive() != next.with_timezone(offset).date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn same_day_needs_no_separator() {
        let offset = FixedOffset::east_opt(0).unwrap();
        assert!(!wants_date_separator(
            utc(2024, 3, 1, 0, 5),
            utc(2024, 3, 1, 23, 55),
            &offset
        ));
    }

    #[test]
    fn crossing_midnight_needs_separator() {
        let offset = FixedOffset::east_opt(0).unwrap();
        assert!(wants_date_separator(
            utc(2024, 3, 1, 23, 59),
            utc(2024, 3, 2, 0, 1),
            &offset
        ));
    }

    #[test]
    fn day_boundary_follows_local_offset() {
        // 22:30 and 23:30 UTC are the same UTC day but straddle midnight at +01:00
        let plus_one = FixedOffset::east_opt(3600).unwrap();
        let utc_offset = FixedOffset::east_opt(0).unwrap();
        let a = utc(2024, 3, 1, 22, 30);
        let b = utc(2024, 3, 1, 23, 30);
        assert!(wants_date_separator(a, b, &plus_one));
        assert!(!wants_date_separator(a, b, &utc_offset));
    }

    #[test]
    fn same_weekday_a_week_apart_needs_separator() {
        let offset = FixedOffset::east_opt(0).unwrap();
        assert!(wants_date_separator(
            utc(2024, 3, 1, 12, 0),
            utc(2024, 3, 8, 12, 0),
            &offset
        ));
    }
}
