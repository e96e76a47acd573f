//! Civil timezone 시간 창 유틸리티.
//!
//! 일 경계("named zone의 자정")와 표시 시각 계산을 담당하는 순수 함수 모음.
//! 서버 로케일과 무관하게 고정된 civil timezone(`chrono_tz::Tz`) 기준으로 동작한다.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;

/// 로컬 naive 시각을 해당 존의 인스턴트로 해석한다.
///
/// DST 중복(가을)은 이른 쪽, DST 공백(봄)은 한 시간 뒤로 민 시각을 택한다.
fn resolve_local(tz: Tz, naive: NaiveDateTime) -> DateTime<Utc> {
    match tz.from_local_datetime(&naive) {
        chrono::LocalResult::Single(dt) => dt.with_timezone(&Utc),
        chrono::LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
        chrono::LocalResult::None => {
            let shifted = naive + chrono::Duration::hours(1);
            match tz.from_local_datetime(&shifted) {
                chrono::LocalResult::Single(dt) => dt.with_timezone(&Utc),
                chrono::LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
                // 연속 두 시각이 모두 무효인 존은 없음 — UTC 해석으로 폴백
                chrono::LocalResult::None => Utc.from_utc_datetime(&naive),
            }
        }
    }
}

/// `now`가 속한 로컬 civil day의 시작(자정)을 UTC로 반환.
pub fn day_start(tz: Tz, now: DateTime<Utc>) -> DateTime<Utc> {
    let local_date = now.with_timezone(&tz).date_naive();
    resolve_local(tz, local_date.and_time(NaiveTime::MIN))
}

/// 직전 로컬 civil day의 반개구간 `[시작, 끝)`을 UTC로 반환.
pub fn previous_day_range(tz: Tz, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let today = now.with_timezone(&tz).date_naive();
    let end = resolve_local(tz, today.and_time(NaiveTime::MIN));
    let yesterday = today.pred_opt().unwrap_or(today);
    let start = resolve_local(tz, yesterday.and_time(NaiveTime::MIN));
    (start, end)
}

/// 인스턴트를 civil timezone의 zero-padded 24시간 `HH:MM`으로 포맷.
pub fn format_hhmm(tz: Tz, instant: DateTime<Utc>) -> String {
    instant.with_timezone(&tz).format("%H:%M").to_string()
}

/// `now`의 로컬 (시, 분) — 스케줄러의 time-of-day 트리거 판정용.
pub fn local_hour_minute(tz: Tz, now: DateTime<Utc>) -> (u32, u32) {
    let local = now.with_timezone(&tz);
    (local.hour(), local.minute())
}

/// `now`의 로컬 civil day.
pub fn local_day(tz: Tz, now: DateTime<Utc>) -> NaiveDate {
    now.with_timezone(&tz).date_naive()
}

/// 오늘(civil timezone 기준)이 생일인지 — 월/일만 비교, 연도 무시.
pub fn is_birthday(tz: Tz, birth_date: NaiveDate, now: DateTime<Utc>) -> bool {
    let today = now.with_timezone(&tz).date_naive();
    today.day() == birth_date.day() && today.month() == birth_date.month()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Europe::Amsterdam;

    fn utc(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    #[test]
    fn day_start_is_local_midnight() {
        // 2026-07-15 암스테르담은 CEST(UTC+2) — 자정은 전날 22:00Z
        let now = utc("2026-07-15T10:30:00Z");
        assert_eq!(day_start(Amsterdam, now), utc("2026-07-14T22:00:00Z"));

        // 겨울(CET, UTC+1)
        let now = utc("2026-01-15T10:30:00Z");
        assert_eq!(day_start(Amsterdam, now), utc("2026-01-14T23:00:00Z"));
    }

    #[test]
    fn day_start_respects_local_date_not_utc_date() {
        // UTC로는 아직 7/14 23:00이지만 암스테르담은 이미 7/15 01:00
        let now = utc("2026-07-14T23:00:00Z");
        assert_eq!(day_start(Amsterdam, now), utc("2026-07-14T22:00:00Z"));
    }

    #[test]
    fn previous_day_range_is_half_open() {
        let now = utc("2026-07-15T07:05:00Z");
        let (start, end) = previous_day_range(Amsterdam, now);
        assert_eq!(start, utc("2026-07-13T22:00:00Z"));
        assert_eq!(end, utc("2026-07-14T22:00:00Z"));
    }

    #[test]
    fn previous_day_range_across_dst_start() {
        // 2026-03-29 02:00 CET → 03:00 CEST 전환. 전환일 다음날 기준 어제는 23시간.
        let now = utc("2026-03-30T08:00:00Z");
        let (start, end) = previous_day_range(Amsterdam, now);
        assert_eq!(start, utc("2026-03-28T23:00:00Z"));
        assert_eq!(end, utc("2026-03-29T22:00:00Z"));
    }

    #[test]
    fn format_hhmm_zero_padded() {
        // 07:05 CEST = 05:05Z
        let instant = utc("2026-07-15T05:05:00Z");
        assert_eq!(format_hhmm(Amsterdam, instant), "07:05");

        let instant = utc("2026-07-15T21:59:00Z");
        assert_eq!(format_hhmm(Amsterdam, instant), "23:59");
    }

    #[test]
    fn local_hour_minute_in_zone() {
        let now = utc("2026-01-15T22:59:00Z"); // 23:59 CET
        assert_eq!(local_hour_minute(Amsterdam, now), (23, 59));
    }

    #[test]
    fn birthday_matches_month_and_day_only() {
        let birth = NaiveDate::from_ymd_opt(2001, 3, 15).unwrap();
        assert!(is_birthday(Amsterdam, birth, utc("2026-03-15T12:00:00Z")));
        assert!(is_birthday(Amsterdam, birth, utc("1999-03-15T12:00:00Z")));
        assert!(!is_birthday(Amsterdam, birth, utc("2026-03-16T12:00:00Z")));
        assert!(!is_birthday(Amsterdam, birth, utc("2026-04-15T12:00:00Z")));
    }

    #[test]
    fn birthday_uses_local_date() {
        let birth = NaiveDate::from_ymd_opt(1990, 7, 15).unwrap();
        // UTC 7/14 23:30 = 암스테르담 7/15 01:30 → 생일
        assert!(is_birthday(Amsterdam, birth, utc("2026-07-14T23:30:00Z")));
        // UTC 7/15 22:30 = 암스테르담 7/16 00:30 → 생일 아님
        assert!(!is_birthday(Amsterdam, birth, utc("2026-07-15T22:30:00Z")));
    }
}
