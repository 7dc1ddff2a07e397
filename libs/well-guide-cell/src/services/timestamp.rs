use chrono::{DateTime, FixedOffset, Offset, TimeZone, Utc};

use crate::models::WellGuideError;

/// Resolves a submitted epoch-millisecond timestamp, read in the client's
/// UTC offset, to an absolute UTC instant.
pub fn normalize_appointment(
    epoch_millis: &str,
    utc_offset: Option<&str>,
) -> Result<DateTime<Utc>, WellGuideError> {
    let millis = epoch_millis
        .trim()
        .parse::<i64>()
        .map_err(|_| WellGuideError::InvalidTimestamp(format!(
            "'{}' is not an epoch timestamp in milliseconds",
            epoch_millis
        )))?;

    let offset = match utc_offset {
        Some(raw) => parse_utc_offset(raw)?,
        None => utc(),
    };

    offset
        .timestamp_millis_opt(millis)
        .single()
        .map(|local| local.with_timezone(&Utc))
        .ok_or_else(|| WellGuideError::InvalidTimestamp(format!(
            "{} is outside the supported date range",
            millis
        )))
}

/// Largest accepted offset magnitude, in minutes.
const MAX_OFFSET_MINUTES: u32 = 24 * 60;

/// Accepts `Z`, `±HH:MM`, `±HHMM`, `±HH`, or a bare integer. Bare integers
/// below 16 in magnitude are hours, anything larger is minutes.
pub fn parse_utc_offset(raw: &str) -> Result<FixedOffset, WellGuideError> {
    let invalid = || WellGuideError::InvalidTimestamp(format!("invalid UTC offset '{}'", raw));
    let trimmed = raw.trim();

    if trimmed.is_empty() {
        return Err(invalid());
    }
    if trimmed.eq_ignore_ascii_case("z") || trimmed.eq_ignore_ascii_case("utc") {
        return Ok(utc());
    }

    let (sign, body) = match trimmed.as_bytes()[0] {
        b'+' => (1, &trimmed[1..]),
        b'-' => (-1, &trimmed[1..]),
        _ => (1, trimmed),
    };
    let explicit_sign = body.len() != trimmed.len();

    let minutes = if let Some((hours, minutes)) = body.split_once(':') {
        clock_minutes(hours, minutes).ok_or_else(invalid)?
    } else if explicit_sign && body.len() == 4 && body.is_ascii() {
        clock_minutes(&body[..2], &body[2..]).ok_or_else(invalid)?
    } else {
        let value = digits(body).ok_or_else(invalid)?;
        if value < 16 { value * 60 } else { value }
    };

    if minutes >= MAX_OFFSET_MINUTES {
        return Err(invalid());
    }

    // Bounded above, so the conversion and multiplication cannot overflow.
    let seconds = sign * i32::try_from(minutes).map_err(|_| invalid())? * 60;
    FixedOffset::east_opt(seconds).ok_or_else(invalid)
}

fn clock_minutes(hours: &str, minutes: &str) -> Option<u32> {
    if hours.is_empty() || hours.len() > 2 || minutes.len() != 2 {
        return None;
    }
    let hours = digits(hours)?;
    let minutes = digits(minutes).filter(|m| *m < 60)?;
    Some(hours * 60 + minutes)
}

/// Unsigned decimal digits only; rejects embedded signs.
fn digits(raw: &str) -> Option<u32> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

fn utc() -> FixedOffset {
    Utc.fix()
}
