use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};

const KST_OFFSET_SECS: i32 = 9 * 3600;

// Report files are keyed by this calendar-date format.
const REPORT_KEY_FORMAT: &str = "%Y%m%d";

/// Asia/Seoul. Korea has no DST, so a fixed offset is exact.
pub fn kst() -> FixedOffset {
    FixedOffset::east_opt(KST_OFFSET_SECS).unwrap_or_else(|| Utc.fix())
}

pub fn today_kst(now_utc: DateTime<Utc>) -> NaiveDate {
    now_utc.with_timezone(&kst()).date_naive()
}

pub fn report_key(date: NaiveDate) -> String {
    date.format(REPORT_KEY_FORMAT).to_string()
}

/// Parses a `yyyymmdd` report key. Anything else (including path fragments)
/// is rejected.
pub fn parse_report_key(s: &str) -> Option<NaiveDate> {
    let t = s.trim();
    if t.len() != 8 || !t.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    NaiveDate::parse_from_str(t, REPORT_KEY_FORMAT).ok()
}
