// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::ids::NoteId;
use crate::model::{NoteStatus, StatusChange};

/// Failure of a Note Store round-trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    NotFound(NoteId),
    Backend {
        operation: &'static str,
        message: String,
    },
}

impl StoreError {
    pub fn backend(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Backend {
            operation,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "note {id} not found -- reload the view and retry"),
            Self::Backend { operation, message } => write!(f, "{operation}: {message}"),
        }
    }
}

impl std::error::Error for StoreError {}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    EmptyTitle,
    InvalidColor(String),
    IllegalTransition {
        from: NoteStatus,
        to: StatusChange,
    },
    NoActiveNote,
    UnknownNote(NoteId),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTitle => f.write_str("note title is required -- enter a title and retry"),
            Self::InvalidColor(value) => {
                write!(f, "background color {value:?} is not a #rrggbb value")
            }
            Self::IllegalTransition { from, to } => write!(
                f,
                "cannot move note from {} to {}; move it to the trash first",
                from.as_str(),
                to.label()
            ),
            Self::NoActiveNote => f.write_str("no note is open"),
            Self::UnknownNote(id) => write!(f, "note {id} is not in the current view"),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Error type of every controller operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoteError {
    Store(StoreError),
    Validation(ValidationError),
}

impl std::fmt::Display for NoteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(error) => write!(f, "store error: {error}"),
            Self::Validation(error) => error.fmt(f),
        }
    }
}

impl std::error::Error for NoteError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Store(error) => Some(error),
            Self::Validation(error) => Some(error),
        }
    }
}

impl From<StoreError> for NoteError {
    fn from(error: StoreError) -> Self {
        Self::Store(error)
    }
}

impl From<ValidationError> for NoteError {
    fn from(error: ValidationError) -> Self {
        Self::Validation(error)
    }
}

pub type NoteResult<T> = std::result::Result<T, NoteError>;
