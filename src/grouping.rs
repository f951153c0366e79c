use std::collections::HashMap;

use chrono::{NaiveDate, NaiveTime};
use uuid::Uuid;

use crate::models::ScheduledEvent;

#[derive(Debug, Clone)]
pub struct ScheduleGroup {
    pub key: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub members: Vec<ScheduledEvent>,
}

impl ScheduleGroup {
    pub fn student_ids(&self) -> Vec<Uuid> {
        let mut seen = Vec::new();
        for member in &self.members {
            let id = member.student_id();
            if !seen.contains(&id) {
                seen.push(id);
            }
        }
        seen
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

pub fn group_key(event: &ScheduledEvent) -> String {
    let teacher = event
        .teacher_id()
        .map(|id| id.to_string())
        .unwrap_or_else(|| "-".to_string());

    match event {
        ScheduledEvent::Interview(s) => format!(
            "i|{}|{}|{}|{}|{}|{}",
            s.date,
            s.time,
            teacher,
            s.kind,
            s.purpose,
            s.location.as_deref().unwrap_or("-"),
        ),
        ScheduledEvent::Teaching(s) => format!(
            "t|{}|{}|{}|{}|{}|{}",
            s.date,
            s.start_time,
            s.end_time,
            teacher,
            s.subject,
            s.topic.as_deref().unwrap_or("-"),
        ),
    }
}

pub fn group_schedules(events: Vec<ScheduledEvent>) -> Vec<ScheduleGroup> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<ScheduleGroup> = Vec::new();

    for event in events {
        let key = group_key(&event);
        match index.get(&key) {
            Some(&slot) => groups[slot].members.push(event),
            None => {
                index.insert(key.clone(), groups.len());
                groups.push(ScheduleGroup {
                    key,
                    date: event.date(),
                    start_time: event.start_time(),
                    members: vec![event],
                });
            }
        }
    }

    groups.sort_by(|a, b| {
        (a.date, a.start_time, &a.key).cmp(&(b.date, b.start_time, &b.key))
    });
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{InterviewKind, InterviewSchedule, ScheduleStatus, TeachingSchedule};

    fn org() -> Uuid {
        Uuid::parse_str("0c22f1f1-9184-4fd4-9b21-28c68a6a89dc").unwrap()
    }

    fn interview(student: Uuid, teacher: Uuid, date: &str, time: &str, purpose: &str) -> ScheduledEvent {
        ScheduledEvent::Interview(InterviewSchedule {
            id: Uuid::new_v4(),
            org_id: org(),
            student_id: student,
            teacher_id: Some(teacher),
            date: date.parse().unwrap(),
            time: time.parse().unwrap(),
            duration_minutes: 30,
            kind: InterviewKind::Parent,
            purpose: purpose.to_string(),
            location: None,
            status: ScheduleStatus::Scheduled,
            notes: None,
        })
    }

    fn lesson(student: Uuid, teacher: Uuid, date: &str, start: &str, subject: &str) -> ScheduledEvent {
        ScheduledEvent::Teaching(TeachingSchedule {
            id: Uuid::new_v4(),
            org_id: org(),
            student_id: student,
            teacher_id: Some(teacher),
            date: date.parse().unwrap(),
            start_time: start.parse().unwrap(),
            end_time: "18:30:00".parse().unwrap(),
            subject: subject.to_string(),
            topic: None,
            status: ScheduleStatus::Scheduled,
            notes: None,
        })
    }

    #[test]
    fn students_sharing_a_session_land_in_one_group() {
        let teacher = Uuid::new_v4();
        let events = vec![
            interview(Uuid::new_v4(), teacher, "2024-05-01", "10:00:00", "保護者面談"),
            interview(Uuid::new_v4(), teacher, "2024-05-01", "10:00:00", "保護者面談"),
            interview(Uuid::new_v4(), teacher, "2024-05-01", "10:00:00", "保護者面談"),
        ];

        let groups = group_schedules(events);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].len(), 3);
        assert_eq!(groups[0].student_ids().len(), 3);
    }

    #[test]
    fn any_key_field_change_splits_the_group() {
        let teacher = Uuid::new_v4();
        let other_teacher = Uuid::new_v4();
        let events = vec![
            interview(Uuid::new_v4(), teacher, "2024-05-01", "10:00:00", "保護者面談"),
            interview(Uuid::new_v4(), teacher, "2024-05-01", "11:00:00", "保護者面談"),
            interview(Uuid::new_v4(), other_teacher, "2024-05-01", "10:00:00", "保護者面談"),
            interview(Uuid::new_v4(), teacher, "2024-05-01", "10:00:00", "三者面談"),
        ];

        let groups = group_schedules(events);
        assert_eq!(groups.len(), 4);
        assert!(groups.iter().all(|g| g.len() == 1));
    }

    #[test]
    fn interviews_and_lessons_never_share_a_group() {
        let teacher = Uuid::new_v4();
        let events = vec![
            interview(Uuid::new_v4(), teacher, "2024-05-01", "10:00:00", "面談"),
            lesson(Uuid::new_v4(), teacher, "2024-05-01", "10:00:00", "数学"),
        ];

        let groups = group_schedules(events);
        assert_eq!(groups.len(), 2);
    }

    #[test]
    fn groups_sort_by_date_then_start_time() {
        let teacher = Uuid::new_v4();
        let events = vec![
            lesson(Uuid::new_v4(), teacher, "2024-05-02", "09:00:00", "英語"),
            interview(Uuid::new_v4(), teacher, "2024-05-01", "15:00:00", "面談"),
            lesson(Uuid::new_v4(), teacher, "2024-05-01", "09:00:00", "数学"),
        ];

        let groups = group_schedules(events);
        let order: Vec<(NaiveDate, NaiveTime)> =
            groups.iter().map(|g| (g.date, g.start_time)).collect();
        assert_eq!(
            order,
            vec![
                ("2024-05-01".parse().unwrap(), "09:00:00".parse().unwrap()),
                ("2024-05-01".parse().unwrap(), "15:00:00".parse().unwrap()),
                ("2024-05-02".parse().unwrap(), "09:00:00".parse().unwrap()),
            ]
        );
    }

    #[test]
    fn grouping_is_idempotent() {
        let teacher = Uuid::new_v4();
        let events = vec![
            interview(Uuid::new_v4(), teacher, "2024-05-01", "10:00:00", "保護者面談"),
            interview(Uuid::new_v4(), teacher, "2024-05-01", "10:00:00", "保護者面談"),
            lesson(Uuid::new_v4(), teacher, "2024-05-01", "17:00:00", "数学"),
        ];

        let first = group_schedules(events);
        let flattened: Vec<ScheduledEvent> = first
            .iter()
            .flat_map(|g| g.members.iter().cloned())
            .collect();
        let second = group_schedules(flattened);

        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.key, b.key);
            let a_ids: Vec<Uuid> = a.members.iter().map(|m| m.id()).collect();
            let b_ids: Vec<Uuid> = b.members.iter().map(|m| m.id()).collect();
            assert_eq!(a_ids, b_ids);
        }
    }
}
