use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;
use uuid::Uuid;

use crate::completion::{cancel_event, complete_interview, complete_teaching, reschedule_event};
use crate::dates::task_is_overdue;
use crate::error::{CompletionError, EditError, StoreError, ValidationError};
use crate::models::{
    InterviewRecord, InterviewSchedule, ScheduleStatus, ScheduledEvent, TaskRow, TaskStatus,
    TeachingRecord, TeachingSchedule,
};
use crate::store::{InterviewPatch, ScheduleFilter, ScheduleStore, TeachingPatch};

// Tasks carry no time of day; they sort after every timed entry.
const TASK_SORT_TIME: NaiveTime = match NaiveTime::from_hms_opt(23, 59, 59) {
    Some(t) => t,
    None => unreachable!(),
};

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TimelineItem {
    Interview(InterviewSchedule),
    Teaching(TeachingSchedule),
    Task(TaskRow),
}

impl TimelineItem {
    pub fn id(&self) -> Uuid {
        match self {
            TimelineItem::Interview(s) => s.id,
            TimelineItem::Teaching(s) => s.id,
            TimelineItem::Task(t) => t.id,
        }
    }

    pub fn sort_time(&self) -> NaiveTime {
        match self {
            TimelineItem::Interview(s) => s.time,
            TimelineItem::Teaching(s) => s.start_time,
            TimelineItem::Task(_) => TASK_SORT_TIME,
        }
    }

    pub fn as_event(&self) -> Option<ScheduledEvent> {
        match self {
            TimelineItem::Interview(s) => Some(ScheduledEvent::Interview(s.clone())),
            TimelineItem::Teaching(s) => Some(ScheduledEvent::Teaching(s.clone())),
            TimelineItem::Task(_) => None,
        }
    }

    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        match self.as_event() {
            Some(event) => crate::dates::is_overdue(&event, today),
            None => match self {
                TimelineItem::Task(t) => task_is_overdue(t, today),
                _ => false,
            },
        }
    }

    pub fn label(&self) -> String {
        match self {
            TimelineItem::Interview(s) => format!("{} 面談 {}", s.time.format("%H:%M"), s.purpose),
            TimelineItem::Teaching(s) => format!(
                "{}-{} 授業 {}",
                s.start_time.format("%H:%M"),
                s.end_time.format("%H:%M"),
                s.subject
            ),
            TimelineItem::Task(t) => format!("課題 {}", t.title),
        }
    }
}

#[derive(Debug)]
pub enum ItemCompletion {
    Interview(InterviewRecord),
    Teaching(TeachingRecord),
    TaskDone(TaskRow),
}

pub async fn aggregate_day<S: ScheduleStore + ?Sized>(
    store: &S,
    org_id: Uuid,
    student_id: Uuid,
    date: NaiveDate,
) -> Result<Vec<TimelineItem>, StoreError> {
    let filter = ScheduleFilter::org(org_id).student(student_id).on(date);

    let interviews = store.fetch_interviews(&filter).await?;
    let lessons = store.fetch_lessons(&filter).await?;
    let tasks = store.fetch_tasks(&filter).await?;

    let mut items: Vec<TimelineItem> = Vec::new();
    items.extend(interviews.into_iter().map(TimelineItem::Interview));
    items.extend(lessons.into_iter().map(TimelineItem::Teaching));
    items.extend(tasks.into_iter().map(TimelineItem::Task));
    items.sort_by_key(|item| item.sort_time());
    Ok(items)
}

pub async fn complete_item<S: ScheduleStore + ?Sized>(
    store: &S,
    item: &TimelineItem,
    content: Option<&str>,
) -> Result<ItemCompletion, CompletionError> {
    match item {
        TimelineItem::Interview(s) => {
            let record = complete_interview(store, s, content).await?;
            Ok(ItemCompletion::Interview(record))
        }
        TimelineItem::Teaching(s) => {
            let record = complete_teaching(store, s, content).await?;
            Ok(ItemCompletion::Teaching(record))
        }
        TimelineItem::Task(t) => {
            let row = store.update_task_status(t.id, TaskStatus::Done).await?;
            Ok(ItemCompletion::TaskDone(row))
        }
    }
}

pub async fn delete_item<S: ScheduleStore + ?Sized>(
    store: &S,
    item: &TimelineItem,
) -> Result<(), StoreError> {
    match item {
        TimelineItem::Interview(s) => store.delete_interview(s.id).await,
        TimelineItem::Teaching(s) => store.delete_lesson(s.id).await,
        TimelineItem::Task(t) => store.delete_task(t.id).await,
    }
}

pub async fn cancel_item<S: ScheduleStore + ?Sized>(
    store: &S,
    item: &TimelineItem,
) -> Result<(), CompletionError> {
    set_item_status(store, item, ScheduleStatus::Cancelled).await
}

pub async fn set_item_status<S: ScheduleStore + ?Sized>(
    store: &S,
    item: &TimelineItem,
    to: ScheduleStatus,
) -> Result<(), CompletionError> {
    let event = item.as_event().ok_or(CompletionError::NotAnEvent)?;
    match to {
        ScheduleStatus::Cancelled => cancel_event(store, &event).await,
        ScheduleStatus::Rescheduled => reschedule_event(store, &event).await,
        other => Err(CompletionError::InvalidTarget(other)),
    }
}

pub async fn toggle_task<S: ScheduleStore + ?Sized>(
    store: &S,
    item: &TimelineItem,
) -> Result<TaskRow, CompletionError> {
    match item {
        TimelineItem::Task(t) => {
            let next = match t.status {
                TaskStatus::Open => TaskStatus::Done,
                TaskStatus::Done => TaskStatus::Open,
            };
            Ok(store.update_task_status(t.id, next).await?)
        }
        _ => Err(CompletionError::NotATask),
    }
}

#[derive(Debug, Clone)]
pub enum ItemPatch {
    Interview(InterviewPatch),
    Teaching(TeachingPatch),
}

pub async fn edit_item<S: ScheduleStore + ?Sized>(
    store: &S,
    item: &TimelineItem,
    patch: &ItemPatch,
) -> Result<TimelineItem, EditError> {
    match (item, patch) {
        (TimelineItem::Interview(s), ItemPatch::Interview(patch)) => {
            let updated = store.update_interview(s.id, patch).await?;
            Ok(TimelineItem::Interview(updated))
        }
        (TimelineItem::Teaching(s), ItemPatch::Teaching(patch)) => {
            let updated = store.update_lesson(s.id, patch).await?;
            Ok(TimelineItem::Teaching(updated))
        }
        _ => Err(ValidationError::EditVariantMismatch.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::DEFAULT_INTERVIEW_CONTENT;
    use crate::models::{
        InterviewKind, NewInterviewSchedule, NewTask, NewTeachingSchedule,
    };
    use crate::store::memory::MemoryStore;

    fn org() -> Uuid {
        Uuid::parse_str("0c22f1f1-9184-4fd4-9b21-28c68a6a89dc").unwrap()
    }

    async fn seed_day(store: &MemoryStore, student: Uuid, date: &str) {
        store
            .insert_interviews(&[NewInterviewSchedule {
                org_id: org(),
                student_id: student,
                teacher_id: Some(Uuid::new_v4()),
                date: date.parse().unwrap(),
                time: "13:00:00".parse().unwrap(),
                duration_minutes: 30,
                kind: InterviewKind::Regular,
                purpose: "定期面談".to_string(),
                location: None,
                notes: None,
            }])
            .await
            .unwrap();
        store
            .insert_lessons(&[NewTeachingSchedule {
                org_id: org(),
                student_id: student,
                teacher_id: Some(Uuid::new_v4()),
                date: date.parse().unwrap(),
                start_time: "10:00:00".parse().unwrap(),
                end_time: "11:30:00".parse().unwrap(),
                subject: "数学".to_string(),
                topic: None,
                notes: None,
            }])
            .await
            .unwrap();
        store
            .insert_task(&NewTask {
                org_id: org(),
                student_id: student,
                title: "単語テスト準備".to_string(),
                due_date: date.parse().unwrap(),
                notes: None,
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn timeline_is_time_ordered_with_tasks_last() {
        let store = MemoryStore::new();
        let student = Uuid::new_v4();
        seed_day(&store, student, "2024-05-10").await;

        let items = aggregate_day(&store, org(), student, "2024-05-10".parse().unwrap())
            .await
            .unwrap();
        assert_eq!(items.len(), 3);
        assert!(matches!(items[0], TimelineItem::Teaching(_)));
        assert!(matches!(items[1], TimelineItem::Interview(_)));
        assert!(matches!(items[2], TimelineItem::Task(_)));
    }

    #[tokio::test]
    async fn timeline_is_scoped_to_the_student_and_date() {
        let store = MemoryStore::new();
        let student = Uuid::new_v4();
        seed_day(&store, student, "2024-05-10").await;
        seed_day(&store, Uuid::new_v4(), "2024-05-10").await;
        seed_day(&store, student, "2024-05-11").await;

        let items = aggregate_day(&store, org(), student, "2024-05-10".parse().unwrap())
            .await
            .unwrap();
        assert_eq!(items.len(), 3);
    }

    #[tokio::test]
    async fn completing_an_interview_item_defaults_its_content() {
        let store = MemoryStore::new();
        let student = Uuid::new_v4();
        seed_day(&store, student, "2024-05-10").await;

        let items = aggregate_day(&store, org(), student, "2024-05-10".parse().unwrap())
            .await
            .unwrap();
        let interview = items
            .iter()
            .find(|i| matches!(i, TimelineItem::Interview(_)))
            .unwrap();

        let outcome = complete_item(&store, interview, None).await.unwrap();
        match outcome {
            ItemCompletion::Interview(record) => {
                assert_eq!(record.content, DEFAULT_INTERVIEW_CONTENT);
            }
            other => panic!("expected an interview record, got {other:?}"),
        }
        assert_eq!(store.interview_records().len(), 1);
    }

    #[tokio::test]
    async fn completing_a_task_item_writes_no_record() {
        let store = MemoryStore::new();
        let student = Uuid::new_v4();
        seed_day(&store, student, "2024-05-10").await;

        let items = aggregate_day(&store, org(), student, "2024-05-10".parse().unwrap())
            .await
            .unwrap();
        let task = items
            .iter()
            .find(|i| matches!(i, TimelineItem::Task(_)))
            .unwrap();

        let outcome = complete_item(&store, task, None).await.unwrap();
        assert!(matches!(
            outcome,
            ItemCompletion::TaskDone(TaskRow {
                status: TaskStatus::Done,
                ..
            })
        ));
        assert!(store.interview_records().is_empty());
        assert!(store.teaching_records().is_empty());
    }

    #[tokio::test]
    async fn deleting_an_item_removes_only_that_row() {
        let store = MemoryStore::new();
        let student = Uuid::new_v4();
        seed_day(&store, student, "2024-05-10").await;

        let items = aggregate_day(&store, org(), student, "2024-05-10".parse().unwrap())
            .await
            .unwrap();
        delete_item(&store, &items[0]).await.unwrap();

        let remaining = aggregate_day(&store, org(), student, "2024-05-10".parse().unwrap())
            .await
            .unwrap();
        assert_eq!(remaining.len(), 2);
        assert!(remaining.iter().all(|i| i.id() != items[0].id()));
    }

    #[tokio::test]
    async fn rescheduling_an_item_respects_the_terminal_guard() {
        let store = MemoryStore::new();
        let student = Uuid::new_v4();
        seed_day(&store, student, "2024-05-10").await;

        let items = aggregate_day(&store, org(), student, "2024-05-10".parse().unwrap())
            .await
            .unwrap();
        let interview = items
            .iter()
            .find(|i| matches!(i, TimelineItem::Interview(_)))
            .unwrap();

        set_item_status(&store, interview, ScheduleStatus::Rescheduled)
            .await
            .unwrap();
        let rescheduled = store.interview(interview.id()).unwrap();
        assert_eq!(rescheduled.status, ScheduleStatus::Rescheduled);

        // Rescheduled is terminal: no further transition through the view.
        let err = set_item_status(
            &store,
            &TimelineItem::Interview(rescheduled),
            ScheduleStatus::Cancelled,
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            CompletionError::AlreadyFinal(ScheduleStatus::Rescheduled)
        ));
    }

    #[tokio::test]
    async fn completed_cannot_be_set_directly() {
        let store = MemoryStore::new();
        let student = Uuid::new_v4();
        seed_day(&store, student, "2024-05-10").await;

        let items = aggregate_day(&store, org(), student, "2024-05-10".parse().unwrap())
            .await
            .unwrap();
        let err = set_item_status(&store, &items[0], ScheduleStatus::Completed)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CompletionError::InvalidTarget(ScheduleStatus::Completed)
        ));
        assert!(matches!(
            set_item_status(&store, &items[0], ScheduleStatus::Scheduled)
                .await
                .unwrap_err(),
            CompletionError::InvalidTarget(ScheduleStatus::Scheduled)
        ));
    }

    #[tokio::test]
    async fn task_toggle_goes_both_ways() {
        let store = MemoryStore::new();
        let student = Uuid::new_v4();
        seed_day(&store, student, "2024-05-10").await;

        let items = aggregate_day(&store, org(), student, "2024-05-10".parse().unwrap())
            .await
            .unwrap();
        let task = items
            .iter()
            .find(|i| matches!(i, TimelineItem::Task(_)))
            .unwrap();

        let done = toggle_task(&store, task).await.unwrap();
        assert_eq!(done.status, TaskStatus::Done);

        let reopened = toggle_task(&store, &TimelineItem::Task(done)).await.unwrap();
        assert_eq!(reopened.status, TaskStatus::Open);

        let not_a_task = items
            .iter()
            .find(|i| matches!(i, TimelineItem::Interview(_)))
            .unwrap();
        assert!(matches!(
            toggle_task(&store, not_a_task).await.unwrap_err(),
            CompletionError::NotATask
        ));
    }

    #[tokio::test]
    async fn editing_one_item_leaves_the_rest_of_the_day_alone() {
        let store = MemoryStore::new();
        let student = Uuid::new_v4();
        seed_day(&store, student, "2024-05-10").await;

        let items = aggregate_day(&store, org(), student, "2024-05-10".parse().unwrap())
            .await
            .unwrap();
        let lesson = items
            .iter()
            .find(|i| matches!(i, TimelineItem::Teaching(_)))
            .unwrap();

        let patch = ItemPatch::Teaching(TeachingPatch {
            subject: Some("物理".to_string()),
            start_time: Some("09:00:00".parse().unwrap()),
            ..TeachingPatch::default()
        });
        let updated = edit_item(&store, lesson, &patch).await.unwrap();
        match updated {
            TimelineItem::Teaching(s) => {
                assert_eq!(s.subject, "物理");
                assert_eq!(s.student_id, student);
            }
            other => panic!("expected a lesson, got {other:?}"),
        }

        // Variant mismatch is rejected without touching the store.
        let interview = items
            .iter()
            .find(|i| matches!(i, TimelineItem::Interview(_)))
            .unwrap();
        assert!(matches!(
            edit_item(&store, interview, &patch).await.unwrap_err(),
            EditError::Validation(ValidationError::EditVariantMismatch)
        ));
        assert_eq!(store.interview(interview.id()).unwrap().purpose, "定期面談");
    }

    #[tokio::test]
    async fn overdue_marking_follows_status() {
        let store = MemoryStore::new();
        let student = Uuid::new_v4();
        seed_day(&store, student, "2024-05-10").await;
        let today: NaiveDate = "2024-06-01".parse().unwrap();

        let items = aggregate_day(&store, org(), student, "2024-05-10".parse().unwrap())
            .await
            .unwrap();
        assert!(items.iter().all(|i| i.is_overdue(today)));

        let interview = items
            .iter()
            .find(|i| matches!(i, TimelineItem::Interview(_)))
            .unwrap();
        cancel_item(&store, interview).await.unwrap();

        let items = aggregate_day(&store, org(), student, "2024-05-10".parse().unwrap())
            .await
            .unwrap();
        let interview = items
            .iter()
            .find(|i| matches!(i, TimelineItem::Interview(_)))
            .unwrap();
        assert!(!interview.is_overdue(today));
    }
}
