use chrono::{Duration, Months, NaiveDate};

use crate::models::{RecurrencePattern, ScheduleStatus, ScheduledEvent, TaskRow, TaskStatus};

/// Monthly steps clamp to the last day of shorter months (chrono's
/// `checked_add_months` behavior, accepted as-is).
pub fn expand_recurrence(base: NaiveDate, pattern: RecurrencePattern, count: u32) -> Vec<NaiveDate> {
    (0..count)
        .map(|i| match pattern {
            RecurrencePattern::Weekly => base + Duration::weeks(i as i64),
            RecurrencePattern::Monthly => base
                .checked_add_months(Months::new(i))
                .unwrap_or(NaiveDate::MAX),
        })
        .collect()
}

pub fn is_overdue(event: &ScheduledEvent, today: NaiveDate) -> bool {
    event.status() == ScheduleStatus::Scheduled && event.date() < today
}

pub fn is_today(event: &ScheduledEvent, today: NaiveDate) -> bool {
    event.date() == today
}

pub fn task_is_overdue(task: &TaskRow, today: NaiveDate) -> bool {
    task.status == TaskStatus::Open && task.due_date < today
}
