//! Error types for conversion and invocation.

use std::time::Duration;

use thiserror::Error;

use crate::event::AmbientKind;
use crate::marker::{DecoratorKind, MarkerKind};

// =============================================================================
// Conversion errors
// =============================================================================

/// Error returned by a converter that could not produce a value.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConversionError {
    /// The cursor had no text left for this parameter.
    #[error("Expected {expected} but there was nothing left to read")]
    Exhausted { expected: String },

    /// The text did not have the required shape.
    #[error("'{found}' is not a valid {expected}")]
    InvalidFormat { expected: String, found: String },

    /// A number did not fit the declared parameter type.
    #[error("{value} is out of range for {target}")]
    OutOfRange { value: String, target: &'static str },

    /// A value of the wrong variant reached a typed handler parameter.
    #[error("Expected a {expected} value but found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    /// The ambient context could not provide the requested value.
    #[error("No {0} is available in this context")]
    MissingAmbient(AmbientKind),

    /// Custom converter failure.
    #[error("{0}")]
    Custom(String),
}

impl ConversionError {
    pub fn exhausted(expected: impl Into<String>) -> Self {
        Self::Exhausted {
            expected: expected.into(),
        }
    }

    pub fn invalid(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::InvalidFormat {
            expected: expected.into(),
            found: found.into(),
        }
    }

    pub fn mismatch(expected: &'static str, found: &'static str) -> Self {
        Self::TypeMismatch { expected, found }
    }

    pub fn out_of_range(value: impl ToString, target: &'static str) -> Self {
        Self::OutOfRange {
            value: value.to_string(),
            target,
        }
    }

    /// Wraps any error raised by a custom converter or its collaborators.
    pub fn custom(message: impl ToString) -> Self {
        Self::Custom(message.to_string())
    }
}

/// Result type for converters.
pub type ConversionResult<T> = Result<T, ConversionError>;

// =============================================================================
// Invocation errors
// =============================================================================

/// Error returned by an invokable chain.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InvocationError {
    /// The text supplied more or fewer arguments than the action takes.
    #[error("{message}")]
    TooManyOrTooFewParameters { message: String },

    /// A required literal placeholder was absent.
    #[error("Expected the text '{expected}'")]
    LiteralMismatch { expected: String },

    /// No converter exists for a parameter type and marker set.
    #[error("No converter found for {target} (markers: {markers:?})")]
    NoConverterFound {
        target: String,
        markers: Vec<MarkerKind>,
    },

    /// A converter rejected its input.
    #[error(transparent)]
    ConversionFailed(#[from] ConversionError),

    /// A decorator could not be built from its marker.
    #[error("Could not construct the {marker} decorator: {reason}")]
    DecoratorConstructionFailed {
        marker: DecoratorKind,
        reason: String,
    },

    /// The action is cooling down for this subject.
    ///
    /// `notify` is false for repeated attempts inside the notice throttle
    /// window; such errors should not be shown to the user.
    #[error("Please wait {:.1} more seconds before using this again", .remaining.as_secs_f64())]
    CooldownActive { remaining: Duration, notify: bool },

    /// The permission check rejected the invoking member.
    #[error("{0}")]
    PermissionDenied(String),

    /// The handler itself reported a failure.
    #[error("{0}")]
    Handler(String),
}

impl InvocationError {
    pub fn too_many() -> Self {
        Self::TooManyOrTooFewParameters {
            message: "There appears to be too many parameters for this command".into(),
        }
    }

    pub fn too_few() -> Self {
        Self::TooManyOrTooFewParameters {
            message: "There appears to be too few parameters for this command".into(),
        }
    }

    pub fn literal(expected: impl Into<String>) -> Self {
        Self::LiteralMismatch {
            expected: expected.into(),
        }
    }

    pub fn handler(message: impl ToString) -> Self {
        Self::Handler(message.to_string())
    }

    /// Whether this error describes a user mistake or a normal refusal,
    /// rather than a defect in the application.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Self::TooManyOrTooFewParameters { .. }
                | Self::LiteralMismatch { .. }
                | Self::ConversionFailed(_)
                | Self::CooldownActive { .. }
                | Self::PermissionDenied(_)
        )
    }

    /// Whether a display sink should render this error at all.
    pub fn should_display(&self) -> bool {
        !matches!(self, Self::CooldownActive { notify: false, .. })
    }
}

/// Result type for invocations.
pub type InvocationResult<T = crate::value::Value> = Result<T, InvocationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cooldown_display() {
        let err = InvocationError::CooldownActive {
            remaining: Duration::from_millis(2500),
            notify: true,
        };
        assert_eq!(
            err.to_string(),
            "Please wait 2.5 more seconds before using this again"
        );
        assert!(err.should_display());
        assert!(err.is_user_facing());
    }

    #[test]
    fn test_silent_cooldown() {
        let err = InvocationError::CooldownActive {
            remaining: Duration::from_secs(1),
            notify: false,
        };
        assert!(!err.should_display());
    }

    #[test]
    fn test_conversion_into_invocation() {
        let err: InvocationError = ConversionError::invalid("int", "abc").into();
        assert_eq!(err.to_string(), "'abc' is not a valid int");
        assert!(err.is_user_facing());
        assert!(!InvocationError::handler("boom").is_user_facing());
    }
}
