//! Error kinds surfaced by the calculator and the coordinator.
//!
//! Configuration problems are fatal and reach the caller of
//! [`Coordinator::configure`](crate::coordinator::Coordinator::configure)
//! synchronously. Calculator problems are transient: the coordinator keeps the
//! previous snapshot, schedules a retry and reports the [`ErrorKind`] through
//! the host listener instead of returning an error.

use std::fmt;

use thiserror::Error;

/// Errors produced while validating configuration or computing prayer times.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PrayerError {
    /// Malformed coordinates, timezone or calculation parameters.
    #[error("invalid configuration: {0}")]
    ConfigurationInvalid(String),

    /// The calculator could not be reached or did not answer in time.
    #[error("calculator unavailable: {0}")]
    CalculatorUnavailable(String),

    /// The calculator answered, but the result violates the snapshot shape.
    #[error("calculator returned a malformed result: {0}")]
    CalculatorMalformedResult(String),
}

/// Discriminant of [`PrayerError`] without the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    ConfigurationInvalid,
    CalculatorUnavailable,
    CalculatorMalformedResult,
}

impl PrayerError {
    pub fn invalid(message: impl Into<String>) -> Self {
        PrayerError::ConfigurationInvalid(message.into())
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        PrayerError::CalculatorUnavailable(message.into())
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        PrayerError::CalculatorMalformedResult(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            PrayerError::ConfigurationInvalid(_) => ErrorKind::ConfigurationInvalid,
            PrayerError::CalculatorUnavailable(_) => ErrorKind::CalculatorUnavailable,
            PrayerError::CalculatorMalformedResult(_) => ErrorKind::CalculatorMalformedResult,
        }
    }
}

impl ErrorKind {
    /// Whether a refresh that failed with this kind should be retried.
    pub fn is_transient(&self) -> bool {
        !matches!(self, ErrorKind::ConfigurationInvalid)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ConfigurationInvalid => "configuration invalid",
            ErrorKind::CalculatorUnavailable => "calculator unavailable",
            ErrorKind::CalculatorMalformedResult => "malformed calculator result",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
