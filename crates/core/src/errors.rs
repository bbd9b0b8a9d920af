use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// The unit of work a persistence failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Creating,
    Updating,
    Deleting,
    Retrieving,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self {
            Operation::Creating => "creating",
            Operation::Updating => "updating",
            Operation::Deleting => "deleting",
            Operation::Retrieving => "retrieving",
        };
        f.write_str(verb)
    }
}

impl Operation {
    /// What the operation acts on: a read covers all of a patient's appointments.
    pub fn target(&self) -> &'static str {
        match self {
            Operation::Retrieving => "appointments",
            _ => "appointment",
        }
    }
}

/// Stable, serializable discriminant of a [`BookingError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    SlotUnavailable,
    AppointmentNotFound,
    NoAppointmentsFound,
    PersistenceFailure,
}

#[derive(Error, Debug)]
pub enum BookingError {
    #[error("The time slot is not available")]
    SlotUnavailable,

    #[error("Appointment not found")]
    AppointmentNotFound,

    #[error("No appointments found for this patient")]
    NoAppointmentsFound,

    /// The store failed in a way the booking protocol does not recognise.
    /// The underlying report is kept for logs only; `Display` never includes it.
    #[error("Error {} {}", .operation, .operation.target())]
    PersistenceFailure {
        operation: Operation,
        #[source]
        source: eyre::Report,
    },
}

impl BookingError {
    pub fn persistence(operation: Operation, source: eyre::Report) -> Self {
        BookingError::PersistenceFailure { operation, source }
    }

    /// Recovers a domain error carried inside a report, wrapping anything
    /// else as a persistence failure of `operation`.
    pub fn classify(report: eyre::Report, operation: Operation) -> Self {
        match report.downcast::<BookingError>() {
            Ok(domain) => domain,
            Err(source) => BookingError::persistence(operation, source),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            BookingError::SlotUnavailable => ErrorKind::SlotUnavailable,
            BookingError::AppointmentNotFound => ErrorKind::AppointmentNotFound,
            BookingError::NoAppointmentsFound => ErrorKind::NoAppointmentsFound,
            BookingError::PersistenceFailure { .. } => ErrorKind::PersistenceFailure,
        }
    }

    pub fn http_status(&self) -> u16 {
        match self.kind() {
            ErrorKind::SlotUnavailable => 400,
            ErrorKind::AppointmentNotFound | ErrorKind::NoAppointmentsFound => 404,
            ErrorKind::PersistenceFailure => 500,
        }
    }
}

pub type BookingResult<T> = Result<T, BookingError>;
