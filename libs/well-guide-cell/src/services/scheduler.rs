use chrono::{DateTime, Datelike, Duration, Month, Months, NaiveDate, Utc};

use crate::models::{GuideStatus, NextRoutine};

/// Follow-up after the "due in one month" reminder.
pub const DUE_IN_ONE_MONTH_FOLLOW_UP_DAYS: i64 = 7;
/// Follow-up after the "due for a visit" reminder.
pub const DUE_FOR_VISIT_FOLLOW_UP_DAYS: i64 = 14;

/// Next reminder date when a patient opts into reminders. `None` means the
/// status carries no reminder and the record must not be touched.
pub fn next_reminder_date(status: GuideStatus, today: NaiveDate) -> Option<NaiveDate> {
    let days = match status {
        GuideStatus::DueInOneMonth => DUE_IN_ONE_MONTH_FOLLOW_UP_DAYS,
        GuideStatus::DueForAVisit => DUE_FOR_VISIT_FOLLOW_UP_DAYS,
        GuideStatus::Scheduled | GuideStatus::UpToDate => return None,
    };

    today.checked_add_signed(Duration::days(days))
}

/// Month and year of the next required visit, in calendar months from the
/// last appointment.
pub fn next_routine(last_appointment: DateTime<Utc>, recurrence_months: u32) -> Option<NextRoutine> {
    let due = last_appointment.checked_add_months(Months::new(recurrence_months))?;
    let month = u8::try_from(due.month())
        .ok()
        .and_then(|m| Month::try_from(m).ok())?;

    Some(NextRoutine {
        month: month.name().to_string(),
        year: due.year(),
    })
}
