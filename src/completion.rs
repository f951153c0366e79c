use crate::error::CompletionError;
use crate::models::{
    InterviewRecord, InterviewSchedule, NewInterviewRecord, NewTeachingRecord, ScheduleStatus,
    ScheduledEvent, TeachingRecord, TeachingSchedule,
};
use crate::store::{InterviewPatch, ScheduleStore, TeachingPatch};

pub const DEFAULT_INTERVIEW_CONTENT: &str = "面談を実施しました。";
pub const DEFAULT_TEACHING_CONTENT: &str = "授業を実施しました。";

/// Two writes against a store with no cross-table transaction, record
/// first: if the status update fails the event stays `scheduled` with the
/// record already written, and a retry writes a second record. If the
/// record insert fails nothing has changed and the retry is safe.
pub async fn complete_interview<S: ScheduleStore + ?Sized>(
    store: &S,
    schedule: &InterviewSchedule,
    content: Option<&str>,
) -> Result<InterviewRecord, CompletionError> {
    if schedule.status.is_terminal() {
        return Err(CompletionError::AlreadyFinal(schedule.status));
    }

    let record = store
        .insert_interview_record(&NewInterviewRecord {
            org_id: schedule.org_id,
            student_id: schedule.student_id,
            teacher_id: schedule.teacher_id,
            date: schedule.date,
            duration_minutes: schedule.duration_minutes,
            kind: schedule.kind,
            content: content.unwrap_or(DEFAULT_INTERVIEW_CONTENT).to_string(),
            schedule_id: Some(schedule.id),
        })
        .await?;

    store
        .update_interview(
            schedule.id,
            &InterviewPatch::status(ScheduleStatus::Completed),
        )
        .await?;

    Ok(record)
}

/// Same write ordering as `complete_interview`.
pub async fn complete_teaching<S: ScheduleStore + ?Sized>(
    store: &S,
    schedule: &TeachingSchedule,
    content: Option<&str>,
) -> Result<TeachingRecord, CompletionError> {
    if schedule.status.is_terminal() {
        return Err(CompletionError::AlreadyFinal(schedule.status));
    }

    let record = store
        .insert_teaching_record(&NewTeachingRecord {
            org_id: schedule.org_id,
            student_id: schedule.student_id,
            teacher_id: schedule.teacher_id,
            date: schedule.date,
            subject: schedule.subject.clone(),
            topic: schedule.topic.clone(),
            content: content.unwrap_or(DEFAULT_TEACHING_CONTENT).to_string(),
            schedule_id: Some(schedule.id),
        })
        .await?;

    store
        .update_lesson(
            schedule.id,
            &TeachingPatch::status(ScheduleStatus::Completed),
        )
        .await?;

    Ok(record)
}

pub async fn cancel_event<S: ScheduleStore + ?Sized>(
    store: &S,
    event: &ScheduledEvent,
) -> Result<(), CompletionError> {
    transition(store, event, ScheduleStatus::Cancelled).await
}

pub async fn reschedule_event<S: ScheduleStore + ?Sized>(
    store: &S,
    event: &ScheduledEvent,
) -> Result<(), CompletionError> {
    transition(store, event, ScheduleStatus::Rescheduled).await
}

async fn transition<S: ScheduleStore + ?Sized>(
    store: &S,
    event: &ScheduledEvent,
    to: ScheduleStatus,
) -> Result<(), CompletionError> {
    if event.status().is_terminal() {
        return Err(CompletionError::AlreadyFinal(event.status()));
    }
    match event {
        ScheduledEvent::Interview(s) => {
            store
                .update_interview(s.id, &InterviewPatch::status(to))
                .await?;
        }
        ScheduledEvent::Teaching(s) => {
            store.update_lesson(s.id, &TeachingPatch::status(to)).await?;
        }
    }
    Ok(())
}
