use std::path::PathBuf;

use anyhow::{bail, Context};
use chrono::{NaiveDate, NaiveTime, Utc};
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use juku_schedule_engine::bulk::{self, BulkReport, GroupEdit};
use juku_schedule_engine::day_view::{self, ItemPatch, TimelineItem};
use juku_schedule_engine::db::{self, PgStore};
use juku_schedule_engine::grouping::{group_schedules, ScheduleGroup};
use juku_schedule_engine::models::{
    InterviewKind, NewTask, RecurrencePattern, RecurrencePlan, ScheduleStatus, ScheduledEvent,
};
use juku_schedule_engine::planner::{self, InterviewDraft, TeachingDraft};
use juku_schedule_engine::store::{InterviewPatch, ScheduleFilter, ScheduleStore, TeachingPatch};

#[derive(Parser)]
#[command(name = "juku-schedule-engine")]
#[command(about = "Scheduling and completion engine for tutoring-school operations", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Create interview schedules for one or more students, optionally recurring
    CreateInterview {
        #[arg(long)]
        org: Uuid,
        #[arg(long = "student", required = true)]
        students: Vec<Uuid>,
        #[arg(long)]
        teacher: Uuid,
        #[arg(long)]
        date: NaiveDate,
        #[arg(long)]
        time: NaiveTime,
        #[arg(long, default_value_t = 30)]
        duration: i32,
        #[arg(long, default_value = "regular")]
        kind: String,
        #[arg(long)]
        purpose: Option<String>,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        notes: Option<String>,
        #[arg(long)]
        repeat: Option<String>,
        #[arg(long, default_value_t = 1)]
        count: u32,
    },
    /// Create teaching schedules for one or more students, optionally recurring
    CreateLesson {
        #[arg(long)]
        org: Uuid,
        #[arg(long = "student", required = true)]
        students: Vec<Uuid>,
        #[arg(long)]
        teacher: Uuid,
        #[arg(long)]
        date: NaiveDate,
        #[arg(long)]
        start: NaiveTime,
        #[arg(long)]
        end: NaiveTime,
        #[arg(long)]
        subject: String,
        #[arg(long)]
        topic: Option<String>,
        #[arg(long)]
        notes: Option<String>,
        #[arg(long)]
        repeat: Option<String>,
        #[arg(long, default_value_t = 1)]
        count: u32,
    },
    /// Add a dated task for a student
    AddTask {
        #[arg(long)]
        org: Uuid,
        #[arg(long)]
        student: Uuid,
        #[arg(long)]
        title: String,
        #[arg(long)]
        due: NaiveDate,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Import teaching schedules from a CSV file
    Import {
        #[arg(long)]
        org: Uuid,
        #[arg(long)]
        csv: PathBuf,
    },
    /// Show one student's day as a merged timeline
    Day {
        #[arg(long)]
        org: Uuid,
        #[arg(long)]
        student: Uuid,
        #[arg(long)]
        date: NaiveDate,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// List session groups in a date range
    Groups {
        #[arg(long)]
        org: Uuid,
        #[arg(long)]
        from: NaiveDate,
        #[arg(long)]
        to: NaiveDate,
    },
    /// Mark every member of a group completed (status only, no records)
    BulkComplete {
        #[arg(long)]
        org: Uuid,
        #[arg(long)]
        key: String,
        #[arg(long)]
        from: NaiveDate,
        #[arg(long)]
        to: NaiveDate,
        #[arg(long, default_value_t = false)]
        yes: bool,
    },
    /// Move or relabel every member of a group, keeping each student
    BulkEdit {
        #[arg(long)]
        org: Uuid,
        #[arg(long)]
        key: String,
        #[arg(long)]
        from: NaiveDate,
        #[arg(long)]
        to: NaiveDate,
        #[arg(long)]
        teacher: Option<Uuid>,
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        time: Option<NaiveTime>,
        #[arg(long)]
        start: Option<NaiveTime>,
        #[arg(long)]
        end: Option<NaiveTime>,
        #[arg(long)]
        duration: Option<i32>,
        #[arg(long)]
        purpose: Option<String>,
        #[arg(long)]
        subject: Option<String>,
        #[arg(long)]
        topic: Option<String>,
        #[arg(long)]
        location: Option<String>,
        #[arg(long, default_value_t = false)]
        yes: bool,
    },
    /// Delete every member of a group
    BulkDelete {
        #[arg(long)]
        org: Uuid,
        #[arg(long)]
        key: String,
        #[arg(long)]
        from: NaiveDate,
        #[arg(long)]
        to: NaiveDate,
        #[arg(long, default_value_t = false)]
        yes: bool,
    },
    /// Complete a single timeline item, writing its permanent record
    Complete {
        #[arg(long)]
        org: Uuid,
        #[arg(long)]
        student: Uuid,
        #[arg(long)]
        date: NaiveDate,
        #[arg(long)]
        id: Uuid,
        #[arg(long)]
        content: Option<String>,
    },
    /// Cancel a single scheduled item
    Cancel {
        #[arg(long)]
        org: Uuid,
        #[arg(long)]
        student: Uuid,
        #[arg(long)]
        date: NaiveDate,
        #[arg(long)]
        id: Uuid,
    },
    /// Mark a single scheduled item as rescheduled
    Reschedule {
        #[arg(long)]
        org: Uuid,
        #[arg(long)]
        student: Uuid,
        #[arg(long)]
        date: NaiveDate,
        #[arg(long)]
        id: Uuid,
    },
    /// Flip a task between open and done
    ToggleTask {
        #[arg(long)]
        org: Uuid,
        #[arg(long)]
        student: Uuid,
        #[arg(long)]
        date: NaiveDate,
        #[arg(long)]
        id: Uuid,
    },
    /// Edit the fields of a single scheduled item
    EditItem {
        #[arg(long)]
        org: Uuid,
        #[arg(long)]
        student: Uuid,
        #[arg(long)]
        date: NaiveDate,
        #[arg(long)]
        id: Uuid,
        #[arg(long)]
        teacher: Option<Uuid>,
        #[arg(long)]
        new_date: Option<NaiveDate>,
        #[arg(long)]
        time: Option<NaiveTime>,
        #[arg(long)]
        start: Option<NaiveTime>,
        #[arg(long)]
        end: Option<NaiveTime>,
        #[arg(long)]
        duration: Option<i32>,
        #[arg(long)]
        purpose: Option<String>,
        #[arg(long)]
        subject: Option<String>,
        #[arg(long)]
        topic: Option<String>,
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a Postgres instance")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;
    let store = PgStore::new(pool);

    match cli.command {
        Commands::InitDb => {
            db::init_db(store.pool()).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(store.pool()).await?;
            println!("Seed data inserted.");
        }
        Commands::CreateInterview {
            org,
            students,
            teacher,
            date,
            time,
            duration,
            kind,
            purpose,
            title,
            location,
            notes,
            repeat,
            count,
        } => {
            let kind = InterviewKind::parse(&kind)
                .with_context(|| format!("unknown interview kind: {kind}"))?;
            let draft = InterviewDraft {
                teacher_id: Some(teacher),
                time,
                duration_minutes: duration,
                kind,
                purpose,
                title,
                location,
                notes,
            };
            let plan = recurrence_plan(date, repeat.as_deref(), count)?;
            let payloads = planner::plan_interviews(org, &students, &draft, &plan)?;
            let inserted = store.insert_interviews(&payloads).await?;
            println!(
                "Created {} interview schedules ({} students x {} dates).",
                inserted.len(),
                students.len(),
                plan.count
            );
        }
        Commands::CreateLesson {
            org,
            students,
            teacher,
            date,
            start,
            end,
            subject,
            topic,
            notes,
            repeat,
            count,
        } => {
            let draft = TeachingDraft {
                teacher_id: Some(teacher),
                start_time: start,
                end_time: end,
                subject,
                topic,
                notes,
            };
            let plan = recurrence_plan(date, repeat.as_deref(), count)?;
            let payloads = planner::plan_lessons(org, &students, &draft, &plan)?;
            let inserted = store.insert_lessons(&payloads).await?;
            println!(
                "Created {} teaching schedules ({} students x {} dates).",
                inserted.len(),
                students.len(),
                plan.count
            );
        }
        Commands::AddTask {
            org,
            student,
            title,
            due,
            notes,
        } => {
            let task = store
                .insert_task(&NewTask {
                    org_id: org,
                    student_id: student,
                    title,
                    due_date: due,
                    notes,
                })
                .await?;
            println!("Task {} created for {}.", task.id, task.due_date);
        }
        Commands::Import { org, csv } => {
            let inserted = db::import_lessons_csv(&store, org, &csv).await?;
            println!("Inserted {inserted} teaching schedules from {}.", csv.display());
        }
        Commands::Day {
            org,
            student,
            date,
            json,
        } => {
            let items = day_view::aggregate_day(&store, org, student, date).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&items)?);
            } else if items.is_empty() {
                println!("Nothing scheduled on {date}.");
            } else {
                let today = Utc::now().date_naive();
                for item in &items {
                    let marker = if item.is_overdue(today) { " (overdue)" } else { "" };
                    println!("- [{}] {}{}", item.id(), item.label(), marker);
                }
            }
        }
        Commands::Groups { org, from, to } => {
            let groups = fetch_groups(&store, org, from, to).await?;
            if groups.is_empty() {
                println!("No schedules between {from} and {to}.");
            }
            for group in &groups {
                println!(
                    "{} {} | {} members, {} students\n  key: {}",
                    group.date,
                    group.start_time.format("%H:%M"),
                    group.len(),
                    group.student_ids().len(),
                    group.key
                );
            }
        }
        Commands::BulkComplete {
            org,
            key,
            from,
            to,
            yes,
        } => {
            let group = find_group(&store, org, from, to, &key).await?;
            if !confirm_gate("complete", &group, yes) {
                return Ok(());
            }
            let report = bulk::bulk_complete(&store, &group).await;
            print_report("bulk complete", &report);
        }
        Commands::BulkEdit {
            org,
            key,
            from,
            to,
            teacher,
            date,
            time,
            start,
            end,
            duration,
            purpose,
            subject,
            topic,
            location,
            yes,
        } => {
            let group = find_group(&store, org, from, to, &key).await?;
            if !confirm_gate("edit", &group, yes) {
                return Ok(());
            }
            let edit = match group.members.first() {
                Some(ScheduledEvent::Interview(_)) => GroupEdit::Interview(InterviewPatch {
                    teacher_id: teacher,
                    date,
                    time,
                    duration_minutes: duration,
                    purpose,
                    location,
                    ..Default::default()
                }),
                Some(ScheduledEvent::Teaching(_)) => GroupEdit::Teaching(TeachingPatch {
                    teacher_id: teacher,
                    date,
                    start_time: start,
                    end_time: end,
                    subject,
                    topic,
                    ..Default::default()
                }),
                None => bail!("group {key} is empty"),
            };
            let report = bulk::bulk_edit(&store, &group, &edit).await?;
            print_report("bulk edit", &report);
        }
        Commands::BulkDelete {
            org,
            key,
            from,
            to,
            yes,
        } => {
            let group = find_group(&store, org, from, to, &key).await?;
            if !confirm_gate("delete", &group, yes) {
                return Ok(());
            }
            let report = bulk::bulk_delete(&store, &group).await;
            print_report("bulk delete", &report);
        }
        Commands::Complete {
            org,
            student,
            date,
            id,
            content,
        } => {
            let item = find_item(&store, org, student, date, id).await?;
            day_view::complete_item(&store, &item, content.as_deref()).await?;
            println!("Completed {}.", item.label());
        }
        Commands::Cancel {
            org,
            student,
            date,
            id,
        } => {
            let item = find_item(&store, org, student, date, id).await?;
            if matches!(item, TimelineItem::Task(_)) {
                bail!("tasks cannot be cancelled, delete them instead");
            }
            day_view::cancel_item(&store, &item).await?;
            println!("Cancelled {}.", item.label());
        }
        Commands::Reschedule {
            org,
            student,
            date,
            id,
        } => {
            let item = find_item(&store, org, student, date, id).await?;
            day_view::set_item_status(&store, &item, ScheduleStatus::Rescheduled).await?;
            println!("Marked {} as rescheduled.", item.label());
        }
        Commands::ToggleTask {
            org,
            student,
            date,
            id,
        } => {
            let item = find_item(&store, org, student, date, id).await?;
            let task = day_view::toggle_task(&store, &item).await?;
            println!("Task {} is now {}.", task.title, task.status);
        }
        Commands::EditItem {
            org,
            student,
            date,
            id,
            teacher,
            new_date,
            time,
            start,
            end,
            duration,
            purpose,
            subject,
            topic,
            location,
            notes,
        } => {
            let item = find_item(&store, org, student, date, id).await?;
            let patch = match item {
                TimelineItem::Interview(_) => ItemPatch::Interview(InterviewPatch {
                    teacher_id: teacher,
                    date: new_date,
                    time,
                    duration_minutes: duration,
                    purpose,
                    location,
                    notes,
                    ..Default::default()
                }),
                TimelineItem::Teaching(_) => ItemPatch::Teaching(TeachingPatch {
                    teacher_id: teacher,
                    date: new_date,
                    start_time: start,
                    end_time: end,
                    subject,
                    topic,
                    notes,
                    ..Default::default()
                }),
                TimelineItem::Task(_) => bail!("tasks are not editable through this command"),
            };
            let updated = day_view::edit_item(&store, &item, &patch).await?;
            println!("Updated {}.", updated.label());
        }
    }

    Ok(())
}

fn recurrence_plan(
    base_date: NaiveDate,
    repeat: Option<&str>,
    count: u32,
) -> anyhow::Result<RecurrencePlan> {
    match repeat {
        None => Ok(RecurrencePlan::once(base_date)),
        Some(value) => {
            let pattern = RecurrencePattern::parse(value)
                .with_context(|| format!("unknown recurrence pattern: {value}"))?;
            Ok(RecurrencePlan {
                base_date,
                pattern,
                count,
            })
        }
    }
}

async fn fetch_groups(
    store: &PgStore,
    org: Uuid,
    from: NaiveDate,
    to: NaiveDate,
) -> anyhow::Result<Vec<ScheduleGroup>> {
    let filter = ScheduleFilter::org(org).between(from, to);
    let mut events: Vec<ScheduledEvent> = Vec::new();
    events.extend(
        store
            .fetch_interviews(&filter)
            .await?
            .into_iter()
            .map(ScheduledEvent::Interview),
    );
    events.extend(
        store
            .fetch_lessons(&filter)
            .await?
            .into_iter()
            .map(ScheduledEvent::Teaching),
    );
    Ok(group_schedules(events))
}

async fn find_group(
    store: &PgStore,
    org: Uuid,
    from: NaiveDate,
    to: NaiveDate,
    key: &str,
) -> anyhow::Result<ScheduleGroup> {
    let groups = fetch_groups(store, org, from, to).await?;
    groups
        .into_iter()
        .find(|g| g.key == key)
        .with_context(|| format!("no group with key {key} between {from} and {to}"))
}

async fn find_item(
    store: &PgStore,
    org: Uuid,
    student: Uuid,
    date: NaiveDate,
    id: Uuid,
) -> anyhow::Result<TimelineItem> {
    let items = day_view::aggregate_day(store, org, student, date).await?;
    items
        .into_iter()
        .find(|i| i.id() == id)
        .with_context(|| format!("no timeline item {id} on {date}"))
}

fn confirm_gate(action: &str, group: &ScheduleGroup, yes: bool) -> bool {
    if yes {
        return true;
    }
    println!(
        "Would {action} {} schedules on {} at {}:",
        group.len(),
        group.date,
        group.start_time.format("%H:%M")
    );
    for member in &group.members {
        println!("- {} (student {})", member.id(), member.student_id());
    }
    println!("Re-run with --yes to apply.");
    false
}

fn print_report(action: &str, report: &BulkReport) {
    if report.all_succeeded() {
        println!(
            "{action}: {} of {} members updated.",
            report.succeeded, report.attempted
        );
    } else {
        println!(
            "{action}: {} of {} members updated, {} FAILED:",
            report.succeeded, report.attempted, report.failures.len()
        );
        for failure in &report.failures {
            println!(
                "- {} (student {}): {}",
                failure.event_id, failure.student_id, failure.error
            );
        }
    }
    if report.skipped > 0 {
        println!("{} members already finalized were skipped.", report.skipped);
    }
}
