use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Transitions only go `Scheduled -> {Completed, Cancelled, Rescheduled}`;
/// terminal states never transition further through this engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleStatus {
    Scheduled,
    Completed,
    Cancelled,
    Rescheduled,
}

impl ScheduleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScheduleStatus::Scheduled => "scheduled",
            ScheduleStatus::Completed => "completed",
            ScheduleStatus::Cancelled => "cancelled",
            ScheduleStatus::Rescheduled => "rescheduled",
        }
    }

    pub fn parse(value: &str) -> Option<ScheduleStatus> {
        match value {
            "scheduled" => Some(ScheduleStatus::Scheduled),
            "completed" => Some(ScheduleStatus::Completed),
            "cancelled" => Some(ScheduleStatus::Cancelled),
            "rescheduled" => Some(ScheduleStatus::Rescheduled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ScheduleStatus::Scheduled)
    }
}

impl std::fmt::Display for ScheduleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterviewKind {
    Regular,
    Parent,
    Consultation,
    Emergency,
    Group,
}

impl InterviewKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InterviewKind::Regular => "regular",
            InterviewKind::Parent => "parent",
            InterviewKind::Consultation => "consultation",
            InterviewKind::Emergency => "emergency",
            InterviewKind::Group => "group",
        }
    }

    pub fn parse(value: &str) -> Option<InterviewKind> {
        match value {
            "regular" => Some(InterviewKind::Regular),
            "parent" => Some(InterviewKind::Parent),
            "consultation" => Some(InterviewKind::Consultation),
            "emergency" => Some(InterviewKind::Emergency),
            "group" => Some(InterviewKind::Group),
            _ => None,
        }
    }
}

impl std::fmt::Display for InterviewKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Open,
    Done,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Open => "open",
            TaskStatus::Done => "done",
        }
    }

    pub fn parse(value: &str) -> Option<TaskStatus> {
        match value {
            "open" => Some(TaskStatus::Open),
            "done" => Some(TaskStatus::Done),
            _ => None,
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterviewSchedule {
    pub id: Uuid,
    pub org_id: Uuid,
    pub student_id: Uuid,
    pub teacher_id: Option<Uuid>,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub duration_minutes: i32,
    pub kind: InterviewKind,
    pub purpose: String,
    pub location: Option<String>,
    pub status: ScheduleStatus,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeachingSchedule {
    pub id: Uuid,
    pub org_id: Uuid,
    pub student_id: Uuid,
    pub teacher_id: Option<Uuid>,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub subject: String,
    pub topic: Option<String>,
    pub status: ScheduleStatus,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRow {
    pub id: Uuid,
    pub org_id: Uuid,
    pub student_id: Uuid,
    pub title: String,
    pub due_date: NaiveDate,
    pub status: TaskStatus,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTask {
    pub org_id: Uuid,
    pub student_id: Uuid,
    pub title: String,
    pub due_date: NaiveDate,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "variant", rename_all = "snake_case")]
pub enum ScheduledEvent {
    Interview(InterviewSchedule),
    Teaching(TeachingSchedule),
}

impl ScheduledEvent {
    pub fn id(&self) -> Uuid {
        match self {
            ScheduledEvent::Interview(s) => s.id,
            ScheduledEvent::Teaching(s) => s.id,
        }
    }

    pub fn org_id(&self) -> Uuid {
        match self {
            ScheduledEvent::Interview(s) => s.org_id,
            ScheduledEvent::Teaching(s) => s.org_id,
        }
    }

    pub fn student_id(&self) -> Uuid {
        match self {
            ScheduledEvent::Interview(s) => s.student_id,
            ScheduledEvent::Teaching(s) => s.student_id,
        }
    }

    pub fn teacher_id(&self) -> Option<Uuid> {
        match self {
            ScheduledEvent::Interview(s) => s.teacher_id,
            ScheduledEvent::Teaching(s) => s.teacher_id,
        }
    }

    pub fn date(&self) -> NaiveDate {
        match self {
            ScheduledEvent::Interview(s) => s.date,
            ScheduledEvent::Teaching(s) => s.date,
        }
    }

    pub fn start_time(&self) -> NaiveTime {
        match self {
            ScheduledEvent::Interview(s) => s.time,
            ScheduledEvent::Teaching(s) => s.start_time,
        }
    }

    pub fn status(&self) -> ScheduleStatus {
        match self {
            ScheduledEvent::Interview(s) => s.status,
            ScheduledEvent::Teaching(s) => s.status,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewInterviewSchedule {
    pub org_id: Uuid,
    pub student_id: Uuid,
    pub teacher_id: Option<Uuid>,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub duration_minutes: i32,
    pub kind: InterviewKind,
    pub purpose: String,
    pub location: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTeachingSchedule {
    pub org_id: Uuid,
    pub student_id: Uuid,
    pub teacher_id: Option<Uuid>,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub subject: String,
    pub topic: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterviewRecord {
    pub id: Uuid,
    pub org_id: Uuid,
    pub student_id: Uuid,
    pub teacher_id: Option<Uuid>,
    pub date: NaiveDate,
    pub duration_minutes: i32,
    pub kind: InterviewKind,
    pub content: String,
    pub schedule_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewInterviewRecord {
    pub org_id: Uuid,
    pub student_id: Uuid,
    pub teacher_id: Option<Uuid>,
    pub date: NaiveDate,
    pub duration_minutes: i32,
    pub kind: InterviewKind,
    pub content: String,
    pub schedule_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeachingRecord {
    pub id: Uuid,
    pub org_id: Uuid,
    pub student_id: Uuid,
    pub teacher_id: Option<Uuid>,
    pub date: NaiveDate,
    pub subject: String,
    pub topic: Option<String>,
    pub content: String,
    pub schedule_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTeachingRecord {
    pub org_id: Uuid,
    pub student_id: Uuid,
    pub teacher_id: Option<Uuid>,
    pub date: NaiveDate,
    pub subject: String,
    pub topic: Option<String>,
    pub content: String,
    pub schedule_id: Option<Uuid>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecurrencePattern {
    Weekly,
    Monthly,
}

impl RecurrencePattern {
    pub fn parse(value: &str) -> Option<RecurrencePattern> {
        match value {
            "weekly" => Some(RecurrencePattern::Weekly),
            "monthly" => Some(RecurrencePattern::Monthly),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RecurrencePlan {
    pub base_date: NaiveDate,
    pub pattern: RecurrencePattern,
    pub count: u32,
}

impl RecurrencePlan {
    pub fn once(base_date: NaiveDate) -> RecurrencePlan {
        RecurrencePlan {
            base_date,
            pattern: RecurrencePattern::Weekly,
            count: 1,
        }
    }
}
