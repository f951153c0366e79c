use uuid::Uuid;

use crate::error::{StoreError, ValidationError};
use crate::grouping::ScheduleGroup;
use crate::models::{ScheduleStatus, ScheduledEvent};
use crate::store::{InterviewPatch, ScheduleStore, TeachingPatch};

#[derive(Debug)]
pub struct BulkFailure {
    pub event_id: Uuid,
    pub student_id: Uuid,
    pub error: StoreError,
}

#[derive(Debug, Default)]
pub struct BulkReport {
    pub attempted: usize,
    pub succeeded: usize,
    pub skipped: usize,
    pub failures: Vec<BulkFailure>,
}

impl BulkReport {
    pub fn all_succeeded(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn is_partial(&self) -> bool {
        self.succeeded > 0 && !self.failures.is_empty()
    }
}

#[derive(Debug, Clone)]
pub enum GroupEdit {
    Interview(InterviewPatch),
    Teaching(TeachingPatch),
}

/// Status-only: no completion records are written here, by contrast with
/// the single-item workflow in `completion`.
pub async fn bulk_complete<S: ScheduleStore + ?Sized>(
    store: &S,
    group: &ScheduleGroup,
) -> BulkReport {
    let mut report = BulkReport::default();

    for member in &group.members {
        if member.status().is_terminal() {
            report.skipped += 1;
            continue;
        }
        report.attempted += 1;
        let result = match member {
            ScheduledEvent::Interview(s) => store
                .update_interview(s.id, &InterviewPatch::status(ScheduleStatus::Completed))
                .await
                .map(|_| ()),
            ScheduledEvent::Teaching(s) => store
                .update_lesson(s.id, &TeachingPatch::status(ScheduleStatus::Completed))
                .await
                .map(|_| ()),
        };
        match result {
            Ok(()) => report.succeeded += 1,
            Err(error) => report.failures.push(BulkFailure {
                event_id: member.id(),
                student_id: member.student_id(),
                error,
            }),
        }
    }
    report
}

pub async fn bulk_edit<S: ScheduleStore + ?Sized>(
    store: &S,
    group: &ScheduleGroup,
    edit: &GroupEdit,
) -> Result<BulkReport, ValidationError> {
    if let Some(first) = group.members.first() {
        let matches = matches!(
            (first, edit),
            (ScheduledEvent::Interview(_), GroupEdit::Interview(_))
                | (ScheduledEvent::Teaching(_), GroupEdit::Teaching(_))
        );
        if !matches {
            return Err(ValidationError::EditVariantMismatch);
        }
    }

    let mut report = BulkReport::default();
    for member in &group.members {
        let result = match (member, edit) {
            (ScheduledEvent::Interview(s), GroupEdit::Interview(patch)) => {
                store.update_interview(s.id, patch).await.map(|_| ())
            }
            (ScheduledEvent::Teaching(s), GroupEdit::Teaching(patch)) => {
                store.update_lesson(s.id, patch).await.map(|_| ())
            }
            // Unreachable for well-formed groups; the key prefix separates
            // variants and the first member was checked above.
            _ => {
                report.skipped += 1;
                continue;
            }
        };
        report.attempted += 1;
        match result {
            Ok(()) => report.succeeded += 1,
            Err(error) => report.failures.push(BulkFailure {
                event_id: member.id(),
                student_id: member.student_id(),
                error,
            }),
        }
    }
    Ok(report)
}

pub async fn bulk_delete<S: ScheduleStore + ?Sized>(
    store: &S,
    group: &ScheduleGroup,
) -> BulkReport {
    let mut report = BulkReport::default();
    for member in &group.members {
        report.attempted += 1;
        let result = match member {
            ScheduledEvent::Interview(s) => store.delete_interview(s.id).await,
            ScheduledEvent::Teaching(s) => store.delete_lesson(s.id).await,
        };
        match result {
            Ok(()) => report.succeeded += 1,
            Err(error) => report.failures.push(BulkFailure {
                event_id: member.id(),
                student_id: member.student_id(),
                error,
            }),
        }
    }
    report
}
