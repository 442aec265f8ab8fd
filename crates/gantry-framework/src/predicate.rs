//! Predicates over parameter types.

use std::fmt;
use std::sync::Arc;

use gantry_core::ParamType;

/// Selects the parameter types a converter or marker applies to.
#[derive(Clone)]
pub enum TypePredicate {
    /// Exactly this type.
    Exact(ParamType),
    /// Any list, whatever its element type.
    AnyList,
    /// Every type.
    Any,
    /// An application supplied test.
    Matches(Arc<dyn Fn(&ParamType) -> bool + Send + Sync>),
}

impl TypePredicate {
    pub fn exact(target: ParamType) -> Self {
        Self::Exact(target)
    }

    pub fn matches_fn<F>(f: F) -> Self
    where
        F: Fn(&ParamType) -> bool + Send + Sync + 'static,
    {
        Self::Matches(Arc::new(f))
    }

    pub fn matches(&self, target: &ParamType) -> bool {
        match self {
            Self::Exact(expected) => expected == target,
            Self::AnyList => target.is_list(),
            Self::Any => true,
            Self::Matches(f) => f(target),
        }
    }

    /// How narrowly this predicate selects; exact matches rank highest.
    pub(crate) fn specificity(&self) -> u8 {
        match self {
            Self::Exact(_) => 2,
            Self::AnyList | Self::Matches(_) => 1,
            Self::Any => 0,
        }
    }
}

impl fmt::Debug for TypePredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(target) => write!(f, "Exact({target})"),
            Self::AnyList => f.write_str("AnyList"),
            Self::Any => f.write_str("Any"),
            Self::Matches(_) => f.write_str("Matches(..)"),
        }
    }
}
