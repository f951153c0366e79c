use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{
    InterviewKind, InterviewRecord, InterviewSchedule, NewInterviewRecord, NewInterviewSchedule,
    NewTask, NewTeachingRecord, NewTeachingSchedule, ScheduleStatus, TaskRow, TaskStatus,
    TeachingRecord, TeachingSchedule,
};

#[derive(Debug, Clone)]
pub struct ScheduleFilter {
    pub org_id: Uuid,
    pub student_id: Option<Uuid>,
    pub date: Option<NaiveDate>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub status: Option<ScheduleStatus>,
}

impl ScheduleFilter {
    pub fn org(org_id: Uuid) -> ScheduleFilter {
        ScheduleFilter {
            org_id,
            student_id: None,
            date: None,
            date_from: None,
            date_to: None,
            status: None,
        }
    }

    pub fn student(mut self, student_id: Uuid) -> ScheduleFilter {
        self.student_id = Some(student_id);
        self
    }

    pub fn on(mut self, date: NaiveDate) -> ScheduleFilter {
        self.date = Some(date);
        self
    }

    pub fn between(mut self, from: NaiveDate, to: NaiveDate) -> ScheduleFilter {
        self.date_from = Some(from);
        self.date_to = Some(to);
        self
    }

    pub fn with_status(mut self, status: ScheduleStatus) -> ScheduleFilter {
        self.status = Some(status);
        self
    }
}

/// `None` leaves a field unchanged; clearing a nullable field is not
/// expressible through a patch.
#[derive(Debug, Clone, Default)]
pub struct InterviewPatch {
    pub teacher_id: Option<Uuid>,
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
    pub duration_minutes: Option<i32>,
    pub kind: Option<InterviewKind>,
    pub purpose: Option<String>,
    pub location: Option<String>,
    pub status: Option<ScheduleStatus>,
    pub notes: Option<String>,
}

impl InterviewPatch {
    pub fn status(status: ScheduleStatus) -> InterviewPatch {
        InterviewPatch {
            status: Some(status),
            ..InterviewPatch::default()
        }
    }
}

/// Same `None`-means-unchanged rule as `InterviewPatch`.
#[derive(Debug, Clone, Default)]
pub struct TeachingPatch {
    pub teacher_id: Option<Uuid>,
    pub date: Option<NaiveDate>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub subject: Option<String>,
    pub topic: Option<String>,
    pub status: Option<ScheduleStatus>,
    pub notes: Option<String>,
}

impl TeachingPatch {
    pub fn status(status: ScheduleStatus) -> TeachingPatch {
        TeachingPatch {
            status: Some(status),
            ..TeachingPatch::default()
        }
    }
}

#[async_trait]
pub trait ScheduleStore: Send + Sync {
    async fn fetch_interviews(
        &self,
        filter: &ScheduleFilter,
    ) -> Result<Vec<InterviewSchedule>, StoreError>;
    async fn fetch_lessons(
        &self,
        filter: &ScheduleFilter,
    ) -> Result<Vec<TeachingSchedule>, StoreError>;
    async fn fetch_tasks(&self, filter: &ScheduleFilter) -> Result<Vec<TaskRow>, StoreError>;

    async fn insert_interviews(
        &self,
        rows: &[NewInterviewSchedule],
    ) -> Result<Vec<InterviewSchedule>, StoreError>;
    async fn insert_lessons(
        &self,
        rows: &[NewTeachingSchedule],
    ) -> Result<Vec<TeachingSchedule>, StoreError>;
    async fn insert_task(&self, row: &NewTask) -> Result<TaskRow, StoreError>;

    async fn update_interview(
        &self,
        id: Uuid,
        patch: &InterviewPatch,
    ) -> Result<InterviewSchedule, StoreError>;
    async fn update_lesson(
        &self,
        id: Uuid,
        patch: &TeachingPatch,
    ) -> Result<TeachingSchedule, StoreError>;
    async fn update_task_status(&self, id: Uuid, status: TaskStatus)
        -> Result<TaskRow, StoreError>;

    async fn delete_interview(&self, id: Uuid) -> Result<(), StoreError>;
    async fn delete_lesson(&self, id: Uuid) -> Result<(), StoreError>;
    async fn delete_task(&self, id: Uuid) -> Result<(), StoreError>;

    async fn insert_interview_record(
        &self,
        record: &NewInterviewRecord,
    ) -> Result<InterviewRecord, StoreError>;
    async fn insert_teaching_record(
        &self,
        record: &NewTeachingRecord,
    ) -> Result<TeachingRecord, StoreError>;
}

pub mod memory {
    //! In-process store used by tests and offline runs. Mirrors the remote
    //! store's observable behavior, including id assignment on insert.

    use std::collections::HashSet;
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct Inner {
        interviews: Vec<InterviewSchedule>,
        lessons: Vec<TeachingSchedule>,
        tasks: Vec<TaskRow>,
        interview_records: Vec<InterviewRecord>,
        teaching_records: Vec<TeachingRecord>,
        // Write calls touching these ids fail once, simulating a dropped
        // request mid-sequence.
        faulted: HashSet<Uuid>,
        // Record inserts back-referencing these schedule ids fail once.
        faulted_record_inserts: HashSet<Uuid>,
    }

    #[derive(Default)]
    pub struct MemoryStore {
        inner: Mutex<Inner>,
    }

    impl MemoryStore {
        pub fn new() -> MemoryStore {
            MemoryStore::default()
        }

        pub fn fail_next_write(&self, id: Uuid) {
            self.inner.lock().unwrap().faulted.insert(id);
        }

        pub fn fail_next_record_insert(&self, schedule_id: Uuid) {
            self.inner
                .lock()
                .unwrap()
                .faulted_record_inserts
                .insert(schedule_id);
        }

        pub fn interview_records(&self) -> Vec<InterviewRecord> {
            self.inner.lock().unwrap().interview_records.clone()
        }

        pub fn teaching_records(&self) -> Vec<TeachingRecord> {
            self.inner.lock().unwrap().teaching_records.clone()
        }

        pub fn interview(&self, id: Uuid) -> Option<InterviewSchedule> {
            self.inner
                .lock()
                .unwrap()
                .interviews
                .iter()
                .find(|s| s.id == id)
                .cloned()
        }

        pub fn lesson(&self, id: Uuid) -> Option<TeachingSchedule> {
            self.inner
                .lock()
                .unwrap()
                .lessons
                .iter()
                .find(|s| s.id == id)
                .cloned()
        }
    }

    fn matches_filter(
        filter: &ScheduleFilter,
        org_id: Uuid,
        student_id: Uuid,
        date: NaiveDate,
        status: Option<ScheduleStatus>,
    ) -> bool {
        if org_id != filter.org_id {
            return false;
        }
        if let Some(student) = filter.student_id {
            if student_id != student {
                return false;
            }
        }
        if let Some(exact) = filter.date {
            if date != exact {
                return false;
            }
        }
        if let Some(from) = filter.date_from {
            if date < from {
                return false;
            }
        }
        if let Some(to) = filter.date_to {
            if date > to {
                return false;
            }
        }
        if let Some(wanted) = filter.status {
            if status != Some(wanted) {
                return false;
            }
        }
        true
    }

    fn check_fault(inner: &mut Inner, id: Uuid) -> Result<(), StoreError> {
        if inner.faulted.remove(&id) {
            return Err(StoreError::Unavailable(format!(
                "simulated write failure for {id}"
            )));
        }
        Ok(())
    }

    fn check_record_fault(inner: &mut Inner, schedule_id: Option<Uuid>) -> Result<(), StoreError> {
        if let Some(id) = schedule_id {
            if inner.faulted_record_inserts.remove(&id) {
                return Err(StoreError::Unavailable(format!(
                    "simulated record insert failure for schedule {id}"
                )));
            }
        }
        Ok(())
    }

    #[async_trait]
    impl ScheduleStore for MemoryStore {
        async fn fetch_interviews(
            &self,
            filter: &ScheduleFilter,
        ) -> Result<Vec<InterviewSchedule>, StoreError> {
            let inner = self.inner.lock().unwrap();
            Ok(inner
                .interviews
                .iter()
                .filter(|s| {
                    matches_filter(filter, s.org_id, s.student_id, s.date, Some(s.status))
                })
                .cloned()
                .collect())
        }

        async fn fetch_lessons(
            &self,
            filter: &ScheduleFilter,
        ) -> Result<Vec<TeachingSchedule>, StoreError> {
            let inner = self.inner.lock().unwrap();
            Ok(inner
                .lessons
                .iter()
                .filter(|s| {
                    matches_filter(filter, s.org_id, s.student_id, s.date, Some(s.status))
                })
                .cloned()
                .collect())
        }

        async fn fetch_tasks(&self, filter: &ScheduleFilter) -> Result<Vec<TaskRow>, StoreError> {
            let inner = self.inner.lock().unwrap();
            Ok(inner
                .tasks
                .iter()
                .filter(|t| matches_filter(filter, t.org_id, t.student_id, t.due_date, None))
                .cloned()
                .collect())
        }

        async fn insert_interviews(
            &self,
            rows: &[NewInterviewSchedule],
        ) -> Result<Vec<InterviewSchedule>, StoreError> {
            let mut inner = self.inner.lock().unwrap();
            let mut inserted = Vec::with_capacity(rows.len());
            for row in rows {
                let schedule = InterviewSchedule {
                    id: Uuid::new_v4(),
                    org_id: row.org_id,
                    student_id: row.student_id,
                    teacher_id: row.teacher_id,
                    date: row.date,
                    time: row.time,
                    duration_minutes: row.duration_minutes,
                    kind: row.kind,
                    purpose: row.purpose.clone(),
                    location: row.location.clone(),
                    status: ScheduleStatus::Scheduled,
                    notes: row.notes.clone(),
                };
                inner.interviews.push(schedule.clone());
                inserted.push(schedule);
            }
            Ok(inserted)
        }

        async fn insert_lessons(
            &self,
            rows: &[NewTeachingSchedule],
        ) -> Result<Vec<TeachingSchedule>, StoreError> {
            let mut inner = self.inner.lock().unwrap();
            let mut inserted = Vec::with_capacity(rows.len());
            for row in rows {
                let schedule = TeachingSchedule {
                    id: Uuid::new_v4(),
                    org_id: row.org_id,
                    student_id: row.student_id,
                    teacher_id: row.teacher_id,
                    date: row.date,
                    start_time: row.start_time,
                    end_time: row.end_time,
                    subject: row.subject.clone(),
                    topic: row.topic.clone(),
                    status: ScheduleStatus::Scheduled,
                    notes: row.notes.clone(),
                };
                inner.lessons.push(schedule.clone());
                inserted.push(schedule);
            }
            Ok(inserted)
        }

        async fn insert_task(&self, row: &NewTask) -> Result<TaskRow, StoreError> {
            let mut inner = self.inner.lock().unwrap();
            let task = TaskRow {
                id: Uuid::new_v4(),
                org_id: row.org_id,
                student_id: row.student_id,
                title: row.title.clone(),
                due_date: row.due_date,
                status: TaskStatus::Open,
                notes: row.notes.clone(),
            };
            inner.tasks.push(task.clone());
            Ok(task)
        }

        async fn update_interview(
            &self,
            id: Uuid,
            patch: &InterviewPatch,
        ) -> Result<InterviewSchedule, StoreError> {
            let mut inner = self.inner.lock().unwrap();
            check_fault(&mut inner, id)?;
            let row = inner
                .interviews
                .iter_mut()
                .find(|s| s.id == id)
                .ok_or(StoreError::NotFound {
                    collection: "interview_schedules",
                    id,
                })?;
            if let Some(teacher_id) = patch.teacher_id {
                row.teacher_id = Some(teacher_id);
            }
            if let Some(date) = patch.date {
                row.date = date;
            }
            if let Some(time) = patch.time {
                row.time = time;
            }
            if let Some(minutes) = patch.duration_minutes {
                row.duration_minutes = minutes;
            }
            if let Some(kind) = patch.kind {
                row.kind = kind;
            }
            if let Some(purpose) = &patch.purpose {
                row.purpose = purpose.clone();
            }
            if let Some(location) = &patch.location {
                row.location = Some(location.clone());
            }
            if let Some(status) = patch.status {
                row.status = status;
            }
            if let Some(notes) = &patch.notes {
                row.notes = Some(notes.clone());
            }
            Ok(row.clone())
        }

        async fn update_lesson(
            &self,
            id: Uuid,
            patch: &TeachingPatch,
        ) -> Result<TeachingSchedule, StoreError> {
            let mut inner = self.inner.lock().unwrap();
            check_fault(&mut inner, id)?;
            let row = inner
                .lessons
                .iter_mut()
                .find(|s| s.id == id)
                .ok_or(StoreError::NotFound {
                    collection: "teaching_schedules",
                    id,
                })?;
            if let Some(teacher_id) = patch.teacher_id {
                row.teacher_id = Some(teacher_id);
            }
            if let Some(date) = patch.date {
                row.date = date;
            }
            if let Some(start_time) = patch.start_time {
                row.start_time = start_time;
            }
            if let Some(end_time) = patch.end_time {
                row.end_time = end_time;
            }
            if let Some(subject) = &patch.subject {
                row.subject = subject.clone();
            }
            if let Some(topic) = &patch.topic {
                row.topic = Some(topic.clone());
            }
            if let Some(status) = patch.status {
                row.status = status;
            }
            if let Some(notes) = &patch.notes {
                row.notes = Some(notes.clone());
            }
            Ok(row.clone())
        }

        async fn update_task_status(
            &self,
            id: Uuid,
            status: TaskStatus,
        ) -> Result<TaskRow, StoreError> {
            let mut inner = self.inner.lock().unwrap();
            check_fault(&mut inner, id)?;
            let row = inner
                .tasks
                .iter_mut()
                .find(|t| t.id == id)
                .ok_or(StoreError::NotFound {
                    collection: "tasks",
                    id,
                })?;
            row.status = status;
            Ok(row.clone())
        }

        async fn delete_interview(&self, id: Uuid) -> Result<(), StoreError> {
            let mut inner = self.inner.lock().unwrap();
            check_fault(&mut inner, id)?;
            let before = inner.interviews.len();
            inner.interviews.retain(|s| s.id != id);
            if inner.interviews.len() == before {
                return Err(StoreError::NotFound {
                    collection: "interview_schedules",
                    id,
                });
            }
            Ok(())
        }

        async fn delete_lesson(&self, id: Uuid) -> Result<(), StoreError> {
            let mut inner = self.inner.lock().unwrap();
            check_fault(&mut inner, id)?;
            let before = inner.lessons.len();
            inner.lessons.retain(|s| s.id != id);
            if inner.lessons.len() == before {
                return Err(StoreError::NotFound {
                    collection: "teaching_schedules",
                    id,
                });
            }
            Ok(())
        }

        async fn delete_task(&self, id: Uuid) -> Result<(), StoreError> {
            let mut inner = self.inner.lock().unwrap();
            check_fault(&mut inner, id)?;
            let before = inner.tasks.len();
            inner.tasks.retain(|t| t.id != id);
            if inner.tasks.len() == before {
                return Err(StoreError::NotFound {
                    collection: "tasks",
                    id,
                });
            }
            Ok(())
        }

        async fn insert_interview_record(
            &self,
            record: &NewInterviewRecord,
        ) -> Result<InterviewRecord, StoreError> {
            let mut inner = self.inner.lock().unwrap();
            check_record_fault(&mut inner, record.schedule_id)?;
            let row = InterviewRecord {
                id: Uuid::new_v4(),
                org_id: record.org_id,
                student_id: record.student_id,
                teacher_id: record.teacher_id,
                date: record.date,
                duration_minutes: record.duration_minutes,
                kind: record.kind,
                content: record.content.clone(),
                schedule_id: record.schedule_id,
            };
            inner.interview_records.push(row.clone());
            Ok(row)
        }

        async fn insert_teaching_record(
            &self,
            record: &NewTeachingRecord,
        ) -> Result<TeachingRecord, StoreError> {
            let mut inner = self.inner.lock().unwrap();
            check_record_fault(&mut inner, record.schedule_id)?;
            let row = TeachingRecord {
                id: Uuid::new_v4(),
                org_id: record.org_id,
                student_id: record.student_id,
                teacher_id: record.teacher_id,
                date: record.date,
                subject: record.subject.clone(),
                topic: record.topic.clone(),
                content: record.content.clone(),
                schedule_id: record.schedule_id,
            };
            inner.teaching_records.push(row.clone());
            Ok(row)
        }
    }
}
