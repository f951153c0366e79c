use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{
    InterviewKind, InterviewRecord, InterviewSchedule, NewInterviewRecord, NewInterviewSchedule,
    NewTask, NewTeachingRecord, NewTeachingSchedule, ScheduleStatus, TaskRow, TaskStatus,
    TeachingRecord, TeachingSchedule,
};
use crate::store::{InterviewPatch, ScheduleFilter, ScheduleStore, TeachingPatch};

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> PgStore {
        PgStore { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

fn parse_status(value: String) -> Result<ScheduleStatus, StoreError> {
    ScheduleStatus::parse(&value).ok_or(StoreError::Decode {
        column: "status",
        value,
    })
}

fn parse_kind(value: String) -> Result<InterviewKind, StoreError> {
    InterviewKind::parse(&value).ok_or(StoreError::Decode {
        column: "kind",
        value,
    })
}

fn parse_task_status(value: String) -> Result<TaskStatus, StoreError> {
    TaskStatus::parse(&value).ok_or(StoreError::Decode {
        column: "status",
        value,
    })
}

fn interview_from_row(row: &PgRow) -> Result<InterviewSchedule, StoreError> {
    Ok(InterviewSchedule {
        id: row.get("id"),
        org_id: row.get("org_id"),
        student_id: row.get("student_id"),
        teacher_id: row.get("teacher_id"),
        date: row.get("date"),
        time: row.get("time"),
        duration_minutes: row.get("duration_minutes"),
        kind: parse_kind(row.get("kind"))?,
        purpose: row.get("purpose"),
        location: row.get("location"),
        status: parse_status(row.get("status"))?,
        notes: row.get("notes"),
    })
}

fn lesson_from_row(row: &PgRow) -> Result<TeachingSchedule, StoreError> {
    Ok(TeachingSchedule {
        id: row.get("id"),
        org_id: row.get("org_id"),
        student_id: row.get("student_id"),
        teacher_id: row.get("teacher_id"),
        date: row.get("date"),
        start_time: row.get("start_time"),
        end_time: row.get("end_time"),
        subject: row.get("subject"),
        topic: row.get("topic"),
        status: parse_status(row.get("status"))?,
        notes: row.get("notes"),
    })
}

fn task_from_row(row: &PgRow) -> Result<TaskRow, StoreError> {
    Ok(TaskRow {
        id: row.get("id"),
        org_id: row.get("org_id"),
        student_id: row.get("student_id"),
        title: row.get("title"),
        due_date: row.get("due_date"),
        status: parse_task_status(row.get("status"))?,
        notes: row.get("notes"),
    })
}

#[async_trait]
impl ScheduleStore for PgStore {
    async fn fetch_interviews(
        &self,
        filter: &ScheduleFilter,
    ) -> Result<Vec<InterviewSchedule>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, org_id, student_id, teacher_id, date, time, duration_minutes,
                   kind, purpose, location, status, notes
            FROM juku_ops.interview_schedules
            WHERE org_id = $1
              AND ($2::uuid IS NULL OR student_id = $2)
              AND ($3::date IS NULL OR date = $3)
              AND ($4::date IS NULL OR date >= $4)
              AND ($5::date IS NULL OR date <= $5)
              AND ($6::text IS NULL OR status = $6)
            ORDER BY date, time
            "#,
        )
        .bind(filter.org_id)
        .bind(filter.student_id)
        .bind(filter.date)
        .bind(filter.date_from)
        .bind(filter.date_to)
        .bind(filter.status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(interview_from_row).collect()
    }

    async fn fetch_lessons(
        &self,
        filter: &ScheduleFilter,
    ) -> Result<Vec<TeachingSchedule>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, org_id, student_id, teacher_id, date, start_time, end_time,
                   subject, topic, status, notes
            FROM juku_ops.teaching_schedules
            WHERE org_id = $1
              AND ($2::uuid IS NULL OR student_id = $2)
              AND ($3::date IS NULL OR date = $3)
              AND ($4::date IS NULL OR date >= $4)
              AND ($5::date IS NULL OR date <= $5)
              AND ($6::text IS NULL OR status = $6)
            ORDER BY date, start_time
            "#,
        )
        .bind(filter.org_id)
        .bind(filter.student_id)
        .bind(filter.date)
        .bind(filter.date_from)
        .bind(filter.date_to)
        .bind(filter.status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(lesson_from_row).collect()
    }

    async fn fetch_tasks(&self, filter: &ScheduleFilter) -> Result<Vec<TaskRow>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, org_id, student_id, title, due_date, status, notes
            FROM juku_ops.tasks
            WHERE org_id = $1
              AND ($2::uuid IS NULL OR student_id = $2)
              AND ($3::date IS NULL OR due_date = $3)
              AND ($4::date IS NULL OR due_date >= $4)
              AND ($5::date IS NULL OR due_date <= $5)
            ORDER BY due_date
            "#,
        )
        .bind(filter.org_id)
        .bind(filter.student_id)
        .bind(filter.date)
        .bind(filter.date_from)
        .bind(filter.date_to)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(task_from_row).collect()
    }

    async fn insert_interviews(
        &self,
        rows: &[NewInterviewSchedule],
    ) -> Result<Vec<InterviewSchedule>, StoreError> {
        let mut inserted = Vec::with_capacity(rows.len());
        for row in rows {
            let persisted = sqlx::query(
                r#"
                INSERT INTO juku_ops.interview_schedules
                (id, org_id, student_id, teacher_id, date, time, duration_minutes,
                 kind, purpose, location, status, notes)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, 'scheduled', $11)
                RETURNING id, org_id, student_id, teacher_id, date, time,
                          duration_minutes, kind, purpose, location, status, notes
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(row.org_id)
            .bind(row.student_id)
            .bind(row.teacher_id)
            .bind(row.date)
            .bind(row.time)
            .bind(row.duration_minutes)
            .bind(row.kind.as_str())
            .bind(&row.purpose)
            .bind(&row.location)
            .bind(&row.notes)
            .fetch_one(&self.pool)
            .await?;
            inserted.push(interview_from_row(&persisted)?);
        }
        Ok(inserted)
    }

    async fn insert_lessons(
        &self,
        rows: &[NewTeachingSchedule],
    ) -> Result<Vec<TeachingSchedule>, StoreError> {
        let mut inserted = Vec::with_capacity(rows.len());
        for row in rows {
            let persisted = sqlx::query(
                r#"
                INSERT INTO juku_ops.teaching_schedules
                (id, org_id, student_id, teacher_id, date, start_time, end_time,
                 subject, topic, status, notes)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 'scheduled', $10)
                RETURNING id, org_id, student_id, teacher_id, date, start_time,
                          end_time, subject, topic, status, notes
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(row.org_id)
            .bind(row.student_id)
            .bind(row.teacher_id)
            .bind(row.date)
            .bind(row.start_time)
            .bind(row.end_time)
            .bind(&row.subject)
            .bind(&row.topic)
            .bind(&row.notes)
            .fetch_one(&self.pool)
            .await?;
            inserted.push(lesson_from_row(&persisted)?);
        }
        Ok(inserted)
    }

    async fn insert_task(&self, row: &NewTask) -> Result<TaskRow, StoreError> {
        let persisted = sqlx::query(
            r#"
            INSERT INTO juku_ops.tasks
            (id, org_id, student_id, title, due_date, status, notes)
            VALUES ($1, $2, $3, $4, $5, 'open', $6)
            RETURNING id, org_id, student_id, title, due_date, status, notes
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(row.org_id)
        .bind(row.student_id)
        .bind(&row.title)
        .bind(row.due_date)
        .bind(&row.notes)
        .fetch_one(&self.pool)
        .await?;
        task_from_row(&persisted)
    }

    async fn update_interview(
        &self,
        id: Uuid,
        patch: &InterviewPatch,
    ) -> Result<InterviewSchedule, StoreError> {
        let row = sqlx::query(
            r#"
            UPDATE juku_ops.interview_schedules SET
                teacher_id = COALESCE($2::uuid, teacher_id),
                date = COALESCE($3::date, date),
                time = COALESCE($4::time, time),
                duration_minutes = COALESCE($5::int, duration_minutes),
                kind = COALESCE($6::text, kind),
                purpose = COALESCE($7::text, purpose),
                location = COALESCE($8::text, location),
                status = COALESCE($9::text, status),
                notes = COALESCE($10::text, notes)
            WHERE id = $1
            RETURNING id, org_id, student_id, teacher_id, date, time,
                      duration_minutes, kind, purpose, location, status, notes
            "#,
        )
        .bind(id)
        .bind(patch.teacher_id)
        .bind(patch.date)
        .bind(patch.time)
        .bind(patch.duration_minutes)
        .bind(patch.kind.map(|k| k.as_str()))
        .bind(&patch.purpose)
        .bind(&patch.location)
        .bind(patch.status.map(|s| s.as_str()))
        .bind(&patch.notes)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound {
            collection: "interview_schedules",
            id,
        })?;
        interview_from_row(&row)
    }

    async fn update_lesson(
        &self,
        id: Uuid,
        patch: &TeachingPatch,
    ) -> Result<TeachingSchedule, StoreError> {
        let row = sqlx::query(
            r#"
            UPDATE juku_ops.teaching_schedules SET
                teacher_id = COALESCE($2::uuid, teacher_id),
                date = COALESCE($3::date, date),
                start_time = COALESCE($4::time, start_time),
                end_time = COALESCE($5::time, end_time),
                subject = COALESCE($6::text, subject),
                topic = COALESCE($7::text, topic),
                status = COALESCE($8::text, status),
                notes = COALESCE($9::text, notes)
            WHERE id = $1
            RETURNING id, org_id, student_id, teacher_id, date, start_time,
                      end_time, subject, topic, status, notes
            "#,
        )
        .bind(id)
        .bind(patch.teacher_id)
        .bind(patch.date)
        .bind(patch.start_time)
        .bind(patch.end_time)
        .bind(&patch.subject)
        .bind(&patch.topic)
        .bind(patch.status.map(|s| s.as_str()))
        .bind(&patch.notes)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound {
            collection: "teaching_schedules",
            id,
        })?;
        lesson_from_row(&row)
    }

    async fn update_task_status(
        &self,
        id: Uuid,
        status: TaskStatus,
    ) -> Result<TaskRow, StoreError> {
        let row = sqlx::query(
            r#"
            UPDATE juku_ops.tasks SET status = $2
            WHERE id = $1
            RETURNING id, org_id, student_id, title, due_date, status, notes
            "#,
        )
        .bind(id)
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound {
            collection: "tasks",
            id,
        })?;
        task_from_row(&row)
    }

    async fn delete_interview(&self, id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM juku_ops.interview_schedules WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                collection: "interview_schedules",
                id,
            });
        }
        Ok(())
    }

    async fn delete_lesson(&self, id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM juku_ops.teaching_schedules WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                collection: "teaching_schedules",
                id,
            });
        }
        Ok(())
    }

    async fn delete_task(&self, id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM juku_ops.tasks WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
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
        let row = sqlx::query(
            r#"
            INSERT INTO juku_ops.interview_records
            (id, org_id, student_id, teacher_id, date, duration_minutes, kind,
             content, schedule_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id, org_id, student_id, teacher_id, date, duration_minutes,
                      kind, content, schedule_id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(record.org_id)
        .bind(record.student_id)
        .bind(record.teacher_id)
        .bind(record.date)
        .bind(record.duration_minutes)
        .bind(record.kind.as_str())
        .bind(&record.content)
        .bind(record.schedule_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(InterviewRecord {
            id: row.get("id"),
            org_id: row.get("org_id"),
            student_id: row.get("student_id"),
            teacher_id: row.get("teacher_id"),
            date: row.get("date"),
            duration_minutes: row.get("duration_minutes"),
            kind: parse_kind(row.get("kind"))?,
            content: row.get("content"),
            schedule_id: row.get("schedule_id"),
        })
    }

    async fn insert_teaching_record(
        &self,
        record: &NewTeachingRecord,
    ) -> Result<TeachingRecord, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO juku_ops.teaching_records
            (id, org_id, student_id, teacher_id, date, subject, topic, content,
             schedule_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id, org_id, student_id, teacher_id, date, subject, topic,
                      content, schedule_id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(record.org_id)
        .bind(record.student_id)
        .bind(record.teacher_id)
        .bind(record.date)
        .bind(&record.subject)
        .bind(&record.topic)
        .bind(&record.content)
        .bind(record.schedule_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(TeachingRecord {
            id: row.get("id"),
            org_id: row.get("org_id"),
            student_id: row.get("student_id"),
            teacher_id: row.get("teacher_id"),
            date: row.get("date"),
            subject: row.get("subject"),
            topic: row.get("topic"),
            content: row.get("content"),
            schedule_id: row.get("schedule_id"),
        })
    }
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let org = Uuid::parse_str("a3b1b0a4-7c11-4c26-9d3e-0f1f4f4f2b10")?;
    let teacher = Uuid::parse_str("5f0b2f1c-63a4-4f2f-9a7d-4f3a2d8e1c22")?;
    let students = [
        Uuid::parse_str("8e1f7a40-1111-4d8a-9f2a-000000000001")?,
        Uuid::parse_str("8e1f7a40-1111-4d8a-9f2a-000000000002")?,
        Uuid::parse_str("8e1f7a40-1111-4d8a-9f2a-000000000003")?,
    ];

    for (i, student) in students.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO juku_ops.interview_schedules
            (id, org_id, student_id, teacher_id, date, time, duration_minutes,
             kind, purpose, location, status, notes)
            VALUES ($1, $2, $3, $4, '2024-05-01', '10:00', 30, 'parent',
                    '保護者面談', '第1面談室', 'scheduled', NULL)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(Uuid::parse_str(&format!(
            "9a2b3c4d-0000-4000-8000-00000000000{}",
            i + 1
        ))?)
        .bind(org)
        .bind(student)
        .bind(teacher)
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO juku_ops.teaching_schedules
            (id, org_id, student_id, teacher_id, date, start_time, end_time,
             subject, topic, status, notes)
            VALUES ($1, $2, $3, $4, '2024-05-01', '17:00', '18:30',
                    '数学', '二次関数', 'scheduled', NULL)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(Uuid::parse_str(&format!(
            "9a2b3c4d-0000-4000-8000-00000000001{}",
            i + 1
        ))?)
        .bind(org)
        .bind(student)
        .bind(teacher)
        .execute(pool)
        .await?;
    }

    sqlx::query(
        r#"
        INSERT INTO juku_ops.tasks
        (id, org_id, student_id, title, due_date, status, notes)
        VALUES ($1, $2, $3, '英単語テスト準備', '2024-05-01', 'open', NULL)
        ON CONFLICT (id) DO NOTHING
        "#,
    )
    .bind(Uuid::parse_str("9a2b3c4d-0000-4000-8000-000000000021")?)
    .bind(org)
    .bind(students[0])
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn import_lessons_csv<S: ScheduleStore + ?Sized>(
    store: &S,
    org_id: Uuid,
    csv_path: &std::path::Path,
) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        student_id: Uuid,
        teacher_id: Uuid,
        date: NaiveDate,
        start_time: chrono::NaiveTime,
        end_time: chrono::NaiveTime,
        subject: String,
        topic: Option<String>,
        notes: Option<String>,
    }

    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut inserted = 0usize;

    for result in reader.deserialize::<CsvRow>() {
        let row = result?;
        store
            .insert_lessons(&[NewTeachingSchedule {
                org_id,
                student_id: row.student_id,
                teacher_id: Some(row.teacher_id),
                date: row.date,
                start_time: row.start_time,
                end_time: row.end_time,
                subject: row.subject,
                topic: row.topic,
                notes: row.notes,
            }])
            .await?;
        inserted += 1;
    }

    Ok(inserted)
}
