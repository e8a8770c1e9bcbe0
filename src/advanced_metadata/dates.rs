//! Interpretación de las distintas notaciones de fecha embebidas.
//!
//! Las fechas sin zona se asumen UTC. Una fecha que no se puede leer
//! devuelve `None`; nunca se sustituye por la época.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// `YYYY:MM:DD HH:MM:SS` de EXIF con fracción (`SubSecTime*`) y zona
/// (`OffsetTime*`) opcionales.
pub fn parse_exif_datetime(
    raw: &str,
    subsec: Option<&str>,
    offset: Option<&str>,
) -> Option<DateTime<Utc>> {
    let value = raw.trim_matches(|c: char| c == '\0' || c.is_whitespace());
    let mut naive = NaiveDateTime::parse_from_str(value, "%Y:%m:%d %H:%M:%S").ok()?;
    if let Some(fraction) = subsec.and_then(subsec_nanos) {
        naive += Duration::nanoseconds(fraction);
    }
    let offset_seconds = match offset.map(str::trim).filter(|value| !value.is_empty()) {
        Some(value) => parse_offset(value)?,
        None => 0,
    };
    to_utc(naive, offset_seconds)
}

fn subsec_nanos(raw: &str) -> Option<i64> {
    let digits = raw.trim_matches(|c: char| c == '\0' || c.is_whitespace());
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let mut padded: String = digits.chars().take(9).collect();
    while padded.len() < 9 {
        padded.push('0');
    }
    padded.parse().ok()
}

/// `±HH:MM` o `Z`.
fn parse_offset(raw: &str) -> Option<i32> {
    let raw = raw.trim_matches('\0');
    if raw.eq_ignore_ascii_case("z") {
        return Some(0);
    }
    let (sign, body) = match raw.split_at_checked(1)? {
        ("+", body) => (1, body),
        ("-", body) => (-1, body),
        _ => return None,
    };
    let digits: String = body.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() != 4 && digits.len() != 2 {
        return None;
    }
    let hours: i32 = digits[0..2].parse().ok()?;
    let minutes: i32 = digits.get(2..4).map_or(Some(0), |m| m.parse().ok())?;
    if hours > 23 || minutes > 59 {
        return None;
    }
    Some(sign * (hours * 3600 + minutes * 60))
}

fn to_utc(naive: NaiveDateTime, offset_seconds: i32) -> Option<DateTime<Utc>> {
    FixedOffset::east_opt(offset_seconds)?
        .from_local_datetime(&naive)
        .single()
        .map(|value| value.with_timezone(&Utc))
}

/// Fechas PDF `D:YYYYMMDDHHmmSSOHH'mm'`; todo lo posterior al año es opcional.
pub fn parse_pdf_date(raw: &str) -> Option<DateTime<Utc>> {
    let value = raw.trim_matches(|c: char| c == '\0' || c.is_whitespace());
    let value = value.strip_prefix("D:").unwrap_or(value);
    let digits_len = value.bytes().take_while(u8::is_ascii_digit).count();
    if !(4..=14).contains(&digits_len) || digits_len % 2 != 0 {
        return None;
    }
    let digits = &value[..digits_len];
    let part = |start: usize, default: u32| -> Option<u32> {
        if start + 2 <= digits_len {
            digits[start..start + 2].parse().ok()
        } else {
            Some(default)
        }
    };
    let year: i32 = digits[0..4].parse().ok()?;
    let naive = NaiveDate::from_ymd_opt(year, part(4, 1)?, part(6, 1)?)?.and_hms_opt(
        part(8, 0)?,
        part(10, 0)?,
        part(12, 0)?,
    )?;

    let zone = value[digits_len..].trim();
    let offset_seconds = match zone.chars().next() {
        None | Some('Z') | Some('z') => 0,
        Some('+') | Some('-') => parse_offset(&zone.replace('\'', ":"))
            .or_else(|| parse_offset(&zone.replace('\'', "")))?,
        _ => return None,
    };
    to_utc(naive, offset_seconds)
}

/// Fechas ISO 8601/W3C (`dcterms:created`, etiquetas de audio). Un año
/// suelto no es una marca de tiempo y devuelve `None`.
pub fn parse_iso_date(raw: &str) -> Option<DateTime<Utc>> {
    let value = raw.trim_matches(|c: char| c == '\0' || c.is_whitespace());
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    // QuickTime escribe la zona sin dos puntos: `2023-06-15T14:30:00+0200`.
    if let Ok(parsed) = DateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%z") {
        return Some(parsed.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Segundos desde 1904-01-01 (QuickTime/MP4). El cero significa "sin fecha".
pub fn mp4_timestamp(seconds: u64) -> Option<DateTime<Utc>> {
    if seconds == 0 {
        return None;
    }
    let base = NaiveDate::from_ymd_opt(1904, 1, 1)?.and_hms_opt(0, 0, 0)?;
    let seconds = i64::try_from(seconds).ok()?;
    base.checked_add_signed(Duration::try_seconds(seconds)?)
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(text: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(text).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn exif_dates_with_and_without_zone() {
        assert_eq!(
            parse_exif_datetime("2024:06:15 14:30:00", None, None),
            Some(utc("2024-06-15T14:30:00Z"))
        );
        assert_eq!(
            parse_exif_datetime("2024:06:15 14:30:00\0", Some("25"), Some("+02:00")),
            Some(utc("2024-06-15T12:30:00.25Z"))
        );
    }

    #[test]
    fn malformed_exif_dates_are_missing() {
        assert_eq!(parse_exif_datetime("0000:00:00 00:00:00", None, None), None);
        assert_eq!(parse_exif_datetime("    :  :     :  :  ", None, None), None);
        assert_eq!(parse_exif_datetime("2024:13:40 99:00:00", None, None), None);
    }

    #[test]
    fn pdf_dates_cover_partial_forms() {
        assert_eq!(
            parse_pdf_date("D:20230102030405+05'30'"),
            Some(utc("2023-01-01T21:34:05Z"))
        );
        assert_eq!(parse_pdf_date("D:2023"), Some(utc("2023-01-01T00:00:00Z")));
        assert_eq!(parse_pdf_date("D:20230102030405Z"), Some(utc("2023-01-02T03:04:05Z")));
        assert_eq!(parse_pdf_date("ayer"), None);
    }

    #[test]
    fn iso_dates_accept_w3c_and_reject_bare_years() {
        assert_eq!(parse_iso_date("2022-11-05T09:15:00Z"), Some(utc("2022-11-05T09:15:00Z")));
        assert_eq!(parse_iso_date("2022-11-05"), Some(utc("2022-11-05T00:00:00Z")));
        assert_eq!(
            parse_iso_date("2023-06-15T14:30:00+0200"),
            Some(utc("2023-06-15T12:30:00Z"))
        );
        assert_eq!(parse_iso_date("2022"), None);
    }

    #[test]
    fn mp4_zero_is_unset() {
        assert_eq!(mp4_timestamp(0), None);
        // 2020-01-01T00:00:00Z
        assert_eq!(mp4_timestamp(3_660_681_600), Some(utc("2020-01-01T00:00:00Z")));
    }
}
