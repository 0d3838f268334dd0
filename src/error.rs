//! Error taxonomy for workout sessions.

use crate::types::WorkoutId;
use std::fmt;
use std::time::Duration;
use thiserror::Error as ThisError;

/// A numeric input that failed validation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InvalidField {
    pub field: &'static str,
    pub value: f64,
    pub rule: FieldRule,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRule {
    Finite,
    Positive,
    /// Together with the other input, yields a finite pace or speed.
    FiniteRatio,
}

impl fmt::Display for InvalidField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = match self.rule {
            FieldRule::Finite => "a finite number",
            FieldRule::Positive => "a positive number",
            FieldRule::FiniteRatio => "in a range that gives a finite pace or speed",
        };
        write!(f, "{} must be {rule} (got {})", self.field, self.value)
    }
}

#[derive(Debug, Clone, PartialEq, ThisError)]
#[error("invalid workout input: {}", join_fields(.fields))]
pub struct ValidationError {
    pub fields: Vec<InvalidField>,
}

impl ValidationError {
    pub fn names(&self) -> Vec<&'static str> {
        self.fields.iter().map(|f| f.field).collect()
    }
}

fn join_fields(fields: &[InvalidField]) -> String {
    fields
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ThisError)]
#[error("no workout with id {0}")]
pub struct NotFound(pub WorkoutId);

#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum LocationError {
    #[error("location permission denied")]
    Denied,
    #[error("location unavailable: {0}")]
    Unavailable(String),
    #[error("no location fix within {0:?}")]
    TimedOut(Duration),
}

#[derive(Debug, ThisError)]
pub enum PersistenceError {
    /// Stored blob exists but cannot be read back as workouts.
    #[error("stored workouts under {key:?} are unreadable: {message}")]
    Format { key: String, message: String },
    /// A workout holds a value the blob format cannot represent.
    #[error("workout {id} cannot be saved: {field} is {value}")]
    Serialization {
        id: WorkoutId,
        field: &'static str,
        value: f64,
    },
    #[error("storage backend failed: {0}")]
    Storage(String),
}

impl From<rusqlite::Error> for PersistenceError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Storage(e.to_string())
    }
}

#[derive(Debug, ThisError)]
pub enum SessionError {
    #[error("session has not been started")]
    NotStarted,
    #[error("map is not ready; waiting for a location fix")]
    AwaitingLocation,
    #[error("map features are disabled: {0}")]
    LocationUnavailable(LocationError),
    #[error("no map position selected for the new workout")]
    NoPendingPosition,
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    NotFound(#[from] NotFound),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}
