use chrono::{NaiveDate, NaiveTime};
use uuid::Uuid;

use crate::dates::expand_recurrence;
use crate::error::ValidationError;
use crate::models::{
    InterviewKind, NewInterviewSchedule, NewTeachingSchedule, RecurrencePlan,
};

#[derive(Debug, Clone)]
pub struct InterviewDraft {
    pub teacher_id: Option<Uuid>,
    pub time: NaiveTime,
    pub duration_minutes: i32,
    pub kind: InterviewKind,
    pub purpose: Option<String>,
    pub title: Option<String>,
    pub location: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TeachingDraft {
    pub teacher_id: Option<Uuid>,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub subject: String,
    pub topic: Option<String>,
    pub notes: Option<String>,
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn plan_dates(plan: &RecurrencePlan) -> Result<Vec<NaiveDate>, ValidationError> {
    if plan.count < 1 || plan.count > 12 {
        return Err(ValidationError::RepeatCountOutOfRange(plan.count));
    }
    Ok(expand_recurrence(plan.base_date, plan.pattern, plan.count))
}

fn require_students(students: &[Uuid]) -> Result<(), ValidationError> {
    if students.is_empty() {
        return Err(ValidationError::NoStudents);
    }
    Ok(())
}

pub fn plan_interviews(
    org_id: Uuid,
    students: &[Uuid],
    draft: &InterviewDraft,
    plan: &RecurrencePlan,
) -> Result<Vec<NewInterviewSchedule>, ValidationError> {
    require_students(students)?;
    let teacher_id = draft
        .teacher_id
        .ok_or(ValidationError::MissingField("teacher"))?;
    let purpose = non_blank(draft.purpose.as_deref())
        .or_else(|| non_blank(draft.title.as_deref()))
        .ok_or(ValidationError::MissingField("purpose"))?
        .to_string();
    let dates = plan_dates(plan)?;

    let mut payloads = Vec::with_capacity(dates.len() * students.len());
    for date in &dates {
        for student_id in students {
            payloads.push(NewInterviewSchedule {
                org_id,
                student_id: *student_id,
                teacher_id: Some(teacher_id),
                date: *date,
                time: draft.time,
                duration_minutes: draft.duration_minutes,
                kind: draft.kind,
                purpose: purpose.clone(),
                location: draft.location.clone(),
                notes: draft.notes.clone(),
            });
        }
    }
    Ok(payloads)
}

pub fn plan_lessons(
    org_id: Uuid,
    students: &[Uuid],
    draft: &TeachingDraft,
    plan: &RecurrencePlan,
) -> Result<Vec<NewTeachingSchedule>, ValidationError> {
    require_students(students)?;
    let teacher_id = draft
        .teacher_id
        .ok_or(ValidationError::MissingField("teacher"))?;
    let subject = non_blank(Some(draft.subject.as_str()))
        .ok_or(ValidationError::MissingField("subject"))?
        .to_string();
    let dates = plan_dates(plan)?;

    let mut payloads = Vec::with_capacity(dates.len() * students.len());
    for date in &dates {
        for student_id in students {
            payloads.push(NewTeachingSchedule {
                org_id,
                student_id: *student_id,
                teacher_id: Some(teacher_id),
                date: *date,
                start_time: draft.start_time,
                end_time: draft.end_time,
                subject: subject.clone(),
                topic: draft.topic.clone(),
                notes: draft.notes.clone(),
            });
        }
    }
    Ok(payloads)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RecurrencePattern;
    use std::collections::HashSet;

    fn lesson_draft() -> TeachingDraft {
        TeachingDraft {
            teacher_id: Some(Uuid::new_v4()),
            start_time: "17:00:00".parse().unwrap(),
            end_time: "18:30:00".parse().unwrap(),
            subject: "数学".to_string(),
            topic: Some("二次関数".to_string()),
            notes: None,
        }
    }

    fn interview_draft() -> InterviewDraft {
        InterviewDraft {
            teacher_id: Some(Uuid::new_v4()),
            time: "10:00:00".parse().unwrap(),
            duration_minutes: 30,
            kind: InterviewKind::Parent,
            purpose: Some("保護者面談".to_string()),
            title: None,
            location: Some("第2面談室".to_string()),
            notes: None,
        }
    }

    #[test]
    fn cardinality_is_students_times_dates() {
        let students: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();
        let plan = RecurrencePlan {
            base_date: "2024-04-01".parse().unwrap(),
            pattern: RecurrencePattern::Weekly,
            count: 4,
        };

        let payloads = plan_lessons(Uuid::new_v4(), &students, &lesson_draft(), &plan).unwrap();
        assert_eq!(payloads.len(), 12);

        let pairs: HashSet<(Uuid, chrono::NaiveDate)> = payloads
            .iter()
            .map(|p| (p.student_id, p.date))
            .collect();
        assert_eq!(pairs.len(), 12, "every (student, date) pair is unique");

        let first = &payloads[0];
        assert!(payloads.iter().all(|p| {
            p.teacher_id == first.teacher_id
                && p.start_time == first.start_time
                && p.end_time == first.end_time
                && p.subject == first.subject
                && p.topic == first.topic
        }));
    }

    #[test]
    fn weekly_scenario_dates_repeat_per_student() {
        // Scenario: 3 students, weekly from 2024-04-01, 4 occurrences.
        let students: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();
        let plan = RecurrencePlan {
            base_date: "2024-04-01".parse().unwrap(),
            pattern: RecurrencePattern::Weekly,
            count: 4,
        };

        let payloads = plan_lessons(Uuid::new_v4(), &students, &lesson_draft(), &plan).unwrap();
        for expected in ["2024-04-01", "2024-04-08", "2024-04-15", "2024-04-22"] {
            let date: chrono::NaiveDate = expected.parse().unwrap();
            let per_date = payloads.iter().filter(|p| p.date == date).count();
            assert_eq!(per_date, 3, "each date appears once per student");
        }
    }

    #[test]
    fn no_students_is_rejected_before_any_io() {
        let plan = RecurrencePlan::once("2024-04-01".parse().unwrap());
        let err = plan_lessons(Uuid::new_v4(), &[], &lesson_draft(), &plan).unwrap_err();
        assert_eq!(err, ValidationError::NoStudents);
    }

    #[test]
    fn missing_teacher_and_subject_are_named() {
        let plan = RecurrencePlan::once("2024-04-01".parse().unwrap());
        let students = vec![Uuid::new_v4()];

        let mut draft = lesson_draft();
        draft.teacher_id = None;
        assert_eq!(
            plan_lessons(Uuid::new_v4(), &students, &draft, &plan).unwrap_err(),
            ValidationError::MissingField("teacher")
        );

        let mut draft = lesson_draft();
        draft.subject = "  ".to_string();
        assert_eq!(
            plan_lessons(Uuid::new_v4(), &students, &draft, &plan).unwrap_err(),
            ValidationError::MissingField("subject")
        );
    }

    #[test]
    fn interview_falls_back_to_title_when_purpose_blank() {
        let plan = RecurrencePlan::once("2024-04-01".parse().unwrap());
        let students = vec![Uuid::new_v4()];

        let mut draft = interview_draft();
        draft.purpose = None;
        draft.title = Some("新学期ガイダンス".to_string());
        let payloads = plan_interviews(Uuid::new_v4(), &students, &draft, &plan).unwrap();
        assert_eq!(payloads[0].purpose, "新学期ガイダンス");

        draft.title = None;
        assert_eq!(
            plan_interviews(Uuid::new_v4(), &students, &draft, &plan).unwrap_err(),
            ValidationError::MissingField("purpose")
        );
    }

    #[tokio::test]
    async fn planned_payloads_insert_as_one_batch() {
        use crate::store::{memory::MemoryStore, ScheduleFilter, ScheduleStore};

        let org = Uuid::new_v4();
        let students: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();
        let plan = RecurrencePlan {
            base_date: "2024-04-01".parse().unwrap(),
            pattern: RecurrencePattern::Weekly,
            count: 4,
        };
        let payloads = plan_lessons(org, &students, &lesson_draft(), &plan).unwrap();

        let store = MemoryStore::new();
        let inserted = store.insert_lessons(&payloads).await.unwrap();
        assert_eq!(inserted.len(), 12);

        let rows = store.fetch_lessons(&ScheduleFilter::org(org)).await.unwrap();
        assert_eq!(rows.len(), 12);
        for expected in ["2024-04-01", "2024-04-08", "2024-04-15", "2024-04-22"] {
            let date: chrono::NaiveDate = expected.parse().unwrap();
            assert_eq!(rows.iter().filter(|r| r.date == date).count(), 3);
        }
    }

    #[test]
    fn repeat_count_outside_window_is_rejected() {
        let students = vec![Uuid::new_v4()];
        for bad in [0u32, 13] {
            let plan = RecurrencePlan {
                base_date: "2024-04-01".parse().unwrap(),
                pattern: RecurrencePattern::Monthly,
                count: bad,
            };
            assert_eq!(
                plan_lessons(Uuid::new_v4(), &students, &lesson_draft(), &plan).unwrap_err(),
                ValidationError::RepeatCountOutOfRange(bad)
            );
        }
    }
}
