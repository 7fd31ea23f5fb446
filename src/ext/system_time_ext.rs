use std::time::SystemTime;

use chrono::{DateTime, Local, TimeZone};

const TIMESTAMP_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

pub trait SystemTimeExt {
    /// Local date and time as `DD/MM/YYYY HH:MM:SS`.
    fn to_timestamp(&self) -> String {
        self.to_timestamp_in(&Local)
    }

    fn to_timestamp_in<Tz: TimeZone>(&self, zone: &Tz) -> String
    where
        Tz::Offset: std::fmt::Display;
}

impl SystemTimeExt for SystemTime {
    fn to_timestamp_in<Tz: TimeZone>(&self, zone: &Tz) -> String
    where
        Tz::Offset: std::fmt::Display,
    {
        DateTime::<chrono::Utc>::from(*self)
            .with_timezone(zone)
            .format(TIMESTAMP_FORMAT)
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Utc};
    use rstest::*;
    use std::time::Duration;

    #[rstest]
    #[case(0, "01/01/1970 00:00:00")]
    #[case(3_661, "01/01/1970 01:01:01")]
    #[case(12 * 3600, "01/01/1970 12:00:00")]
    #[case(400 * 86_400 + 12 * 3600, "05/02/1971 12:00:00")]
    #[case(1_700_000_000, "14/11/2023 22:13:20")]
    fn to_timestamp_formats_date_and_time(#[case] secs: u64, #[case] expected: &str) {
        let time = SystemTime::UNIX_EPOCH + Duration::from_secs(secs);
        assert_eq!(time.to_timestamp_in(&Utc), expected);
    }

    #[test]
    fn same_time_on_different_days_differs() {
        let noon = SystemTime::UNIX_EPOCH + Duration::from_secs(12 * 3600);
        let later = noon + Duration::from_secs(400 * 86_400);
        assert_ne!(noon.to_timestamp(), later.to_timestamp());
    }

    #[test]
    fn to_timestamp_follows_the_zone_offset() {
        let time = SystemTime::UNIX_EPOCH + Duration::from_secs(23 * 3600);
        let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
        assert_eq!(time.to_timestamp_in(&plus_two), "02/01/1970 01:00:00");
    }

    #[test]
    fn pre_epoch_times_are_formatted() {
        let time = SystemTime::UNIX_EPOCH - Duration::from_secs(1);
        assert_eq!(time.to_timestamp_in(&Utc), "31/12/1969 23:59:59");
    }
}
