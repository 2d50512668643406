use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::Tz;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::warn;

const DISPLAY_FORMAT: &str = "%B %-d, %Y, %-I:%M %p";

/// `None` when chrono cannot represent the instant.
pub fn localized_datetime(time: OffsetDateTime, tz: Tz) -> Option<DateTime<Tz>> {
    let datetime_utc = DateTime::<Utc>::from_timestamp(time.unix_timestamp(), time.nanosecond())?;
    Some(tz.from_utc_datetime(&datetime_utc.naive_utc()))
}

/// Human-readable timestamp in the site timezone, e.g. `March 1, 2022, 10:15 AM`.
///
/// Instants outside chrono's range are shown as their RFC 3339 text.
pub fn display_datetime(time: OffsetDateTime, tz: Tz) -> String {
    match localized_datetime(time, tz) {
        Some(local) => local.format(DISPLAY_FORMAT).to_string(),
        None => {
            warn!(
                target = "lectern::util::timezone",
                timestamp = time.unix_timestamp(),
                "timestamp out of display range"
            );
            time.format(&Rfc3339).unwrap_or_else(|_| time.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use time::PrimitiveDateTime;
    use time::macros::datetime;

    use super::*;

    #[test]
    fn formats_in_site_timezone() {
        let created = datetime!(2022-03-01 10:15 UTC);
        assert_eq!(display_datetime(created, Tz::UTC), "March 1, 2022, 10:15 AM");
        assert_eq!(
            display_datetime(created, Tz::America__New_York),
            "March 1, 2022, 5:15 AM"
        );
    }

    #[test]
    fn extreme_timestamps_keep_their_real_date() {
        let latest = PrimitiveDateTime::MAX.assume_utc();
        let earliest = PrimitiveDateTime::MIN.assume_utc();

        assert_eq!(
            display_datetime(latest, Tz::UTC),
            "December 31, 9999, 11:59 PM"
        );
        assert!(display_datetime(earliest, Tz::UTC).contains("-9999"));
        assert!(!display_datetime(earliest, Tz::UTC).contains("1970"));
        assert_eq!(
            localized_datetime(latest, Tz::UTC).map(|local| local.timestamp()),
            Some(latest.unix_timestamp())
        );
    }
}
