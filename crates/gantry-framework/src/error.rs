//! Registration error types.
//!
//! Invocation-time failures use [`gantry_core::InvocationError`]; the errors
//! here are raised while commands and triggers are being registered, before
//! any message is handled.

use gantry_core::{InvocationError, MarkerKind};
use thiserror::Error;

/// Errors raised while building tokens and decorator chains for an action.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistrationError {
    /// A marker was placed on a parameter type it does not support.
    #[error("The '{marker}' marker cannot be used on parameters of type {target}")]
    MarkerNotAllowed { marker: MarkerKind, target: String },

    /// Two markers that may not co-occur were placed on one parameter.
    #[error("The '{first}' and '{second}' markers cannot be used together")]
    ConflictingMarkers {
        first: MarkerKind,
        second: MarkerKind,
    },

    /// The after-relation between the markers of one parameter has a cycle.
    #[error("The markers {0:?} must each be resolved after another")]
    MarkerCycle(Vec<MarkerKind>),

    /// No converter exists for a parameter.
    #[error(transparent)]
    Unresolved(#[from] InvocationError),

    /// The default text of an optional parameter could not be converted.
    #[error("Invalid default '{default}' for parameter {index}: {reason}")]
    InvalidDefault {
        index: usize,
        default: String,
        reason: String,
    },

    /// A command parameter was not named in the usage grammar.
    #[error("Parameter {index} of type {target} is missing from the usage '{usage}'")]
    MissingParameter {
        index: usize,
        target: String,
        usage: String,
    },

    /// A usage placeholder was not wrapped in `[...]` or `<...>`.
    #[error("Placeholders must be surrounded by either '[...]' or '<...>', found '{0}'")]
    MalformedPlaceholder(String),

    /// The number of marker lists does not match the handler arity.
    #[error("Markers were declared for {declared} parameters but the handler takes {expected}")]
    MarkerCountMismatch { declared: usize, expected: usize },

    /// A command was registered without any alias.
    #[error("Commands must have at least one alias")]
    MissingAlias,

    /// Another command already uses this alias.
    #[error("The alias '{0}' is already registered")]
    DuplicateAlias(String),

    /// A trigger was registered without phrases.
    #[error("Triggers must have at least one phrase")]
    MissingPhrases,

    /// A trigger handler asked for a value that must be parsed from text.
    #[error("Trigger parameter {index} of type {target} cannot be read from the message text")]
    TextualTriggerParameter { index: usize, target: String },
}

/// Result type for registration.
pub type RegistrationResult<T> = Result<T, RegistrationError>;
