use thiserror::Error;
use uuid::Uuid;

use crate::models::ScheduleStatus;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("no students selected")]
    NoStudents,
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("repeat count must be between 1 and 12, got {0}")]
    RepeatCountOutOfRange(u32),
    #[error("edit fields do not match the group's schedule type")]
    EditVariantMismatch,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{collection} row {id} not found")]
    NotFound { collection: &'static str, id: Uuid },
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("unexpected value in column {column}: {value}")]
    Decode { column: &'static str, value: String },
    #[error("store request failed")]
    Backend(#[from] sqlx::Error),
}

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("event is {0}, only scheduled events can transition")]
    AlreadyFinal(ScheduleStatus),
    #[error("tasks have no schedule status to transition")]
    NotAnEvent,
    #[error("only tasks can be toggled")]
    NotATask,
    #[error("status {0} cannot be set directly, use the completion workflow")]
    InvalidTarget(ScheduleStatus),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum EditError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Store(#[from] StoreError),
}
