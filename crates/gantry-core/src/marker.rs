//! Declarative markers attached to parameters and actions.
//!
//! Markers form two closed sets:
//!
//! - [`ParamMarker`] tags a handler parameter and influences which converter
//!   is used to produce its value.
//! - [`DecoratorMarker`] tags an action (or a whole group of actions) and
//!   selects the middleware that wraps the handler.
//!
//! # Example
//!
//! ```rust,ignore
//! use gantry_core::{DecoratorMarker, ParamMarker, CooldownScope};
//! use std::time::Duration;
//!
//! let markers = vec![ParamMarker::unrequired("world")];
//! let decorators = vec![
//!     DecoratorMarker::permission(["moderate"]),
//!     DecoratorMarker::cooldown(Duration::from_secs(30), CooldownScope::User),
//! ];
//! ```

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

// =============================================================================
// Parameter markers
// =============================================================================

/// A marker on a single handler parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParamMarker {
    /// The parameter is optional. The payload is the textual default, parsed
    /// with the parameter's converter at registration time. An empty default
    /// means the type's zero value.
    Unrequired(String),
    /// The value is read from the ambient context instead of the message text.
    Source,
    /// The parameter consumes all of the remaining text.
    Remaining,
    /// A list that may be written without surrounding brackets.
    Implicit,
    /// A list with duplicate elements removed.
    Unique,
    /// An application defined marker, matched by name.
    Custom(&'static str),
}

impl ParamMarker {
    /// Creates an [`ParamMarker::Unrequired`] marker with the given default text.
    pub fn unrequired(default: impl Into<String>) -> Self {
        Self::Unrequired(default.into())
    }

    /// Returns the payload-free kind of this marker.
    pub fn kind(&self) -> MarkerKind {
        match self {
            Self::Unrequired(_) => MarkerKind::Unrequired,
            Self::Source => MarkerKind::Source,
            Self::Remaining => MarkerKind::Remaining,
            Self::Implicit => MarkerKind::Implicit,
            Self::Unique => MarkerKind::Unique,
            Self::Custom(name) => MarkerKind::Custom(name),
        }
    }
}

/// The kind of a [`ParamMarker`], used for ordering and converter lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MarkerKind {
    Unrequired,
    Source,
    Remaining,
    Implicit,
    Unique,
    Custom(&'static str),
}

impl MarkerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unrequired => "unrequired",
            Self::Source => "source",
            Self::Remaining => "remaining",
            Self::Implicit => "implicit",
            Self::Unique => "unique",
            Self::Custom(name) => name,
        }
    }
}

impl fmt::Display for MarkerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Shared enums
// =============================================================================

/// Ordering priority for converters and decorators.
///
/// For decorators, `First` wraps outermost and `Last` innermost. For
/// converters, a higher priority wins when several entries match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Priority {
    First,
    Early,
    #[default]
    Normal,
    Late,
    Last,
}

/// How a decorator declared on both a group and an action is combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergePolicy {
    /// The action's declaration replaces the group's.
    PreferAction,
    /// Both declarations are kept, each producing its own decorator.
    KeepAll,
}

/// Whether all or any of a set of conditions must hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Require {
    #[default]
    All,
    Any,
}

/// The subject a cooldown is keyed against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CooldownScope {
    /// One timer per user, shared across guilds.
    #[default]
    User,
    /// One timer per user within each guild.
    Member,
    /// One timer for the whole guild.
    Guild,
}

/// Log level used by logging decorators and the runtime configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    /// Converts to the equivalent [`tracing::Level`].
    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Decorator markers
// =============================================================================

/// The kind of a [`DecoratorMarker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecoratorKind {
    Permission,
    Cooldown,
    Log,
    Time,
}

impl DecoratorKind {
    /// The wrapping priority of this decorator kind.
    pub fn priority(self) -> Priority {
        match self {
            Self::Permission => Priority::First,
            Self::Cooldown => Priority::Early,
            Self::Log => Priority::Normal,
            Self::Time => Priority::Late,
        }
    }

    /// How group and action declarations of this kind are merged.
    pub fn merge_policy(self) -> MergePolicy {
        match self {
            Self::Permission => MergePolicy::KeepAll,
            Self::Cooldown | Self::Log | Self::Time => MergePolicy::PreferAction,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Permission => "permission",
            Self::Cooldown => "cooldown",
            Self::Log => "log",
            Self::Time => "time",
        }
    }
}

impl fmt::Display for DecoratorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A marker selecting a decorator around an action.
#[derive(Debug, Clone, PartialEq)]
pub enum DecoratorMarker {
    /// Requires the invoking member to hold the listed permissions.
    Permission {
        permissions: Vec<String>,
        require: Require,
    },
    /// Rate limits the action per subject.
    Cooldown {
        duration: Duration,
        scope: CooldownScope,
    },
    /// Logs every invocation of the action.
    Log { level: LogLevel },
    /// Logs how long every invocation took.
    Time { level: LogLevel },
}

impl DecoratorMarker {
    /// Requires all of the given permissions.
    pub fn permission<I, S>(permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Permission {
            permissions: permissions.into_iter().map(Into::into).collect(),
            require: Require::All,
        }
    }

    /// Requires at least one of the given permissions.
    pub fn permission_any<I, S>(permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Permission {
            permissions: permissions.into_iter().map(Into::into).collect(),
            require: Require::Any,
        }
    }

    pub fn cooldown(duration: Duration, scope: CooldownScope) -> Self {
        Self::Cooldown { duration, scope }
    }

    pub fn log(level: LogLevel) -> Self {
        Self::Log { level }
    }

    pub fn time(level: LogLevel) -> Self {
        Self::Time { level }
    }

    pub fn kind(&self) -> DecoratorKind {
        match self {
            Self::Permission { .. } => DecoratorKind::Permission,
            Self::Cooldown { .. } => DecoratorKind::Cooldown,
            Self::Log { .. } => DecoratorKind::Log,
            Self::Time { .. } => DecoratorKind::Time,
        }
    }

    pub fn priority(&self) -> Priority {
        self.kind().priority()
    }
}
