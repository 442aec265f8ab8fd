//! Ordering rules for parameter markers.
//!
//! When a parameter carries several markers, the converter is chosen from
//! the first marker (in a computed order) that has a registered converter.
//! The order comes from a "must be resolved after" relation declared per
//! marker kind.
//!
//! The comparator is a heuristic rather than a topological sort: a marker
//! sorts after another when its after-set names the other; otherwise the
//! marker with the larger after-set sorts later; otherwise declaration
//! order is kept. With chains of three or more markers that only partially
//! name each other, the result depends on declaration order.
//!
//! # Example
//!
//! ```rust,ignore
//! let rules = MarkerRules::default();
//! let order = rules.sort(&[MarkerKind::Implicit, MarkerKind::Unique]);
//! assert_eq!(order, [MarkerKind::Unique, MarkerKind::Implicit]);
//! ```

use std::cmp::Ordering;
use std::collections::HashMap;

use gantry_core::{MarkerKind, ParamType};

use crate::error::{RegistrationError, RegistrationResult};
use crate::predicate::TypePredicate;

/// Ordering, conflict and type rules for one marker kind.
#[derive(Debug, Clone)]
pub struct MarkerRule {
    after: Vec<MarkerKind>,
    conflicts: Vec<MarkerKind>,
    conflicts_with_any: bool,
    allowed: TypePredicate,
}

impl Default for MarkerRule {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkerRule {
    /// A rule allowing every type, with no ordering constraints.
    pub fn new() -> Self {
        Self {
            after: Vec::new(),
            conflicts: Vec::new(),
            conflicts_with_any: false,
            allowed: TypePredicate::Any,
        }
    }

    /// This marker must be resolved after `kind`.
    pub fn after(mut self, kind: MarkerKind) -> Self {
        self.after.push(kind);
        self
    }

    pub fn conflicts_with(mut self, kind: MarkerKind) -> Self {
        self.conflicts.push(kind);
        self
    }

    /// This marker must be the only marker on its parameter.
    pub fn conflicts_with_any(mut self) -> Self {
        self.conflicts_with_any = true;
        self
    }

    pub fn allowed(mut self, predicate: TypePredicate) -> Self {
        self.allowed = predicate;
        self
    }

    pub fn after_set(&self) -> &[MarkerKind] {
        &self.after
    }
}

/// The set of registered marker rules.
///
/// Markers without a rule (such as [`MarkerKind::Unrequired`]) are dropped
/// from the conversion order but still take part in conflict checks.
#[derive(Debug, Clone)]
pub struct MarkerRules {
    rules: HashMap<MarkerKind, MarkerRule>,
}

impl Default for MarkerRules {
    fn default() -> Self {
        let mut rules = Self::empty();
        rules
            .register(
                MarkerKind::Source,
                MarkerRule::new().conflicts_with_any(),
            )
            .register(
                MarkerKind::Remaining,
                MarkerRule::new().allowed(TypePredicate::exact(ParamType::Text)),
            )
            .register(
                MarkerKind::Unique,
                MarkerRule::new().allowed(TypePredicate::AnyList),
            )
            .register(
                MarkerKind::Implicit,
                MarkerRule::new()
                    .after(MarkerKind::Unique)
                    .allowed(TypePredicate::AnyList),
            );
        rules
    }
}

impl MarkerRules {
    /// A rule set with no registered markers.
    pub fn empty() -> Self {
        Self {
            rules: HashMap::new(),
        }
    }

    pub fn register(&mut self, kind: MarkerKind, rule: MarkerRule) -> &mut Self {
        self.rules.insert(kind, rule);
        self
    }

    pub fn get(&self, kind: MarkerKind) -> Option<&MarkerRule> {
        self.rules.get(&kind)
    }

    pub fn is_registered(&self, kind: MarkerKind) -> bool {
        self.rules.contains_key(&kind)
    }

    /// Compares two registered markers; `Greater` means `a` sorts after `b`.
    pub fn compare(&self, a: MarkerKind, b: MarkerKind) -> Ordering {
        let (Some(rule_a), Some(rule_b)) = (self.get(a), self.get(b)) else {
            return Ordering::Equal;
        };
        let a_after_b = rule_a.after.contains(&b);
        let b_after_a = rule_b.after.contains(&a);
        match (a_after_b, b_after_a) {
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            _ => rule_a.after.len().cmp(&rule_b.after.len()),
        }
    }

    /// Orders the registered markers of one parameter for converter lookup.
    ///
    /// Unregistered and duplicate markers are dropped. The sort is a stable
    /// insertion sort, so equal markers keep their declaration order and a
    /// non-transitive comparator cannot cause a panic.
    pub fn sort(&self, markers: &[MarkerKind]) -> Vec<MarkerKind> {
        let mut sorted: Vec<MarkerKind> = Vec::with_capacity(markers.len());
        for &marker in markers {
            if !self.is_registered(marker) || sorted.contains(&marker) {
                continue;
            }
            let mut position = sorted.len();
            while position > 0 && self.compare(sorted[position - 1], marker) == Ordering::Greater {
                position -= 1;
            }
            sorted.insert(position, marker);
        }
        sorted
    }

    /// Checks type restrictions, conflicts and cycles for one parameter.
    pub fn validate(&self, target: &ParamType, markers: &[MarkerKind]) -> RegistrationResult<()> {
        for &marker in markers {
            let Some(rule) = self.get(marker) else {
                continue;
            };

            if !rule.allowed.matches(target) {
                return Err(RegistrationError::MarkerNotAllowed {
                    marker,
                    target: target.alias(),
                });
            }

            let conflict = markers.iter().copied().find(|other| {
                *other != marker && (rule.conflicts_with_any || rule.conflicts.contains(other))
            });
            if let Some(other) = conflict {
                return Err(RegistrationError::ConflictingMarkers {
                    first: marker,
                    second: other,
                });
            }
        }

        self.check_cycles(markers)
    }

    fn check_cycles(&self, markers: &[MarkerKind]) -> RegistrationResult<()> {
        #[derive(Clone, Copy, PartialEq)]
        enum Visit {
            Fresh,
            Active,
            Done,
        }

        fn visit(
            rules: &MarkerRules,
            markers: &[MarkerKind],
            state: &mut HashMap<MarkerKind, Visit>,
            path: &mut Vec<MarkerKind>,
            marker: MarkerKind,
        ) -> RegistrationResult<()> {
            match state.get(&marker).copied().unwrap_or(Visit::Fresh) {
                Visit::Done => return Ok(()),
                Visit::Active => {
                    let start = path.iter().position(|m| *m == marker).unwrap_or(0);
                    return Err(RegistrationError::MarkerCycle(path[start..].to_vec()));
                }
                Visit::Fresh => {}
            }

            state.insert(marker, Visit::Active);
            path.push(marker);
            if let Some(rule) = rules.get(marker) {
                for next in rule.after.iter().filter(|m| markers.contains(m)) {
                    visit(rules, markers, state, path, *next)?;
                }
            }
            path.pop();
            state.insert(marker, Visit::Done);
            Ok(())
        }

        let mut state = HashMap::new();
        let mut path = Vec::new();
        for &marker in markers.iter().filter(|m| self.is_registered(**m)) {
            visit(self, markers, &mut state, &mut path, marker)?;
        }
        Ok(())
    }
}
