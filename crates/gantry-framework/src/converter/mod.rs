//! Converter registry.
//!
//! A converter turns part of the message text (or the ambient context) into
//! a [`Value`] of some [`ParamType`]. Converters are registered against a
//! [`TypePredicate`] and optionally a [`MarkerKind`]; lookups walk a
//! parameter's ordered markers and fall back to the unmarked ("generic")
//! converter for the type.
//!
//! # Example
//!
//! ```rust,ignore
//! let mut registry = ConverterRegistry::new();
//! registry.register(
//!     TypePredicate::exact(ParamType::Text),
//!     Some(MarkerKind::Custom("lower")),
//!     Converter::textual(|ctx| {
//!         let word = ctx.cursor().next_word().ok_or_else(|| ConversionError::exhausted("word"))?;
//!         Ok(Value::Text(word.to_lowercase()))
//!     }),
//! );
//! let registry = Arc::new(registry);
//! ```

mod builtin;

use std::fmt;
use std::sync::Arc;

use gantry_core::{
    Ambient, AmbientKind, ConversionError, ConversionResult, InvocationError, InvocationResult,
    MarkerKind, ParamType, Priority, Value,
};

use crate::cursor::Cursor;
use crate::ordering::MarkerRules;
use crate::predicate::TypePredicate;

// =============================================================================
// Converter
// =============================================================================

/// Where a converter reads its input from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConverterKind {
    /// Consumes text from the cursor.
    Textual,
    /// Reads the ambient context only and never moves the cursor.
    Ambient,
}

type ConvertFn = dyn Fn(&mut ConversionContext<'_>) -> ConversionResult<Value> + Send + Sync;

/// A shareable conversion function.
#[derive(Clone)]
pub struct Converter {
    name: &'static str,
    kind: ConverterKind,
    func: Arc<ConvertFn>,
}

impl Converter {
    /// A converter that reads from the message text.
    pub fn textual<F>(f: F) -> Self
    where
        F: Fn(&mut ConversionContext<'_>) -> ConversionResult<Value> + Send + Sync + 'static,
    {
        Self {
            name: "custom",
            kind: ConverterKind::Textual,
            func: Arc::new(f),
        }
    }

    /// A converter that reads from the ambient context.
    pub fn ambient<F>(f: F) -> Self
    where
        F: Fn(&mut ConversionContext<'_>) -> ConversionResult<Value> + Send + Sync + 'static,
    {
        Self {
            name: "custom",
            kind: ConverterKind::Ambient,
            func: Arc::new(f),
        }
    }

    /// A converter that returns one ambient value as-is.
    pub fn from_ambient(kind: AmbientKind) -> Self {
        Self::ambient(move |ctx| ctx.require_ambient(kind))
    }

    /// Names the converter for diagnostics.
    pub fn named(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn kind(&self) -> ConverterKind {
        self.kind
    }

    pub fn is_ambient(&self) -> bool {
        self.kind == ConverterKind::Ambient
    }

    pub fn convert(&self, ctx: &mut ConversionContext<'_>) -> ConversionResult<Value> {
        (self.func)(ctx)
    }

    /// Whether both handles refer to the same registered function.
    pub fn same_as(&self, other: &Converter) -> bool {
        Arc::ptr_eq(&self.func, &other.func)
    }
}

impl fmt::Debug for Converter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Converter")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish()
    }
}

// =============================================================================
// ConversionContext
// =============================================================================

/// Everything a converter may read while producing a value.
pub struct ConversionContext<'a> {
    cursor: &'a mut Cursor,
    ambient: &'a dyn Ambient,
    registry: &'a ConverterRegistry,
    target: &'a ParamType,
    remaining_markers: &'a [MarkerKind],
}

impl<'a> ConversionContext<'a> {
    /// Creates a context. `remaining_markers` are the ordered markers after
    /// the one whose converter is running.
    pub fn new(
        cursor: &'a mut Cursor,
        ambient: &'a dyn Ambient,
        registry: &'a ConverterRegistry,
        target: &'a ParamType,
        remaining_markers: &'a [MarkerKind],
    ) -> Self {
        Self {
            cursor,
            ambient,
            registry,
            target,
            remaining_markers,
        }
    }

    pub fn cursor(&mut self) -> &mut Cursor {
        self.cursor
    }

    pub fn ambient(&self) -> &dyn Ambient {
        self.ambient
    }

    pub fn target(&self) -> &ParamType {
        self.target
    }

    pub fn registry(&self) -> &ConverterRegistry {
        self.registry
    }

    /// Fetches an ambient value or reports it as missing.
    pub fn require_ambient(&self, kind: AmbientKind) -> ConversionResult<Value> {
        self.ambient
            .get_ambient(kind)
            .ok_or(ConversionError::MissingAmbient(kind))
    }

    /// Runs the converter the lookup would pick if the current marker were absent.
    pub fn convert_next(&mut self) -> ConversionResult<Value> {
        let (converter, consumed) = self
            .registry
            .resolve_indexed(self.target, self.remaining_markers)
            .map_err(ConversionError::custom)?;
        let markers = self.remaining_markers;
        let rest = &markers[consumed..];
        let mut ctx = ConversionContext::new(
            &mut *self.cursor,
            self.ambient,
            self.registry,
            self.target,
            rest,
        );
        converter.convert(&mut ctx)
    }

    /// Converts a value of another type from this context's cursor.
    pub fn convert_as(&mut self, target: &ParamType) -> ConversionResult<Value> {
        let (ambient, registry) = (self.ambient, self.registry);
        convert_generic(&mut *self.cursor, ambient, registry, target)
    }

    /// Converts a value of another type from a separate cursor.
    pub fn convert_in(&self, cursor: &mut Cursor, target: &ParamType) -> ConversionResult<Value> {
        convert_generic(cursor, self.ambient, self.registry, target)
    }
}

fn convert_generic(
    cursor: &mut Cursor,
    ambient: &dyn Ambient,
    registry: &ConverterRegistry,
    target: &ParamType,
) -> ConversionResult<Value> {
    let converter = registry
        .resolve(target, &[])
        .map_err(ConversionError::custom)?;
    let mut ctx = ConversionContext::new(cursor, ambient, registry, target, &[]);
    converter.convert(&mut ctx)
}

// =============================================================================
// ConverterRegistry
// =============================================================================

#[derive(Debug, Clone)]
struct ConverterEntry {
    predicate: TypePredicate,
    marker: Option<MarkerKind>,
    priority: Priority,
    converter: Converter,
}

/// Maps `(type, marker)` pairs to converters.
///
/// Built mutably at startup, then shared behind an `Arc` and only read.
#[derive(Debug, Clone)]
pub struct ConverterRegistry {
    entries: Vec<ConverterEntry>,
    rules: MarkerRules,
}

impl Default for ConverterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ConverterRegistry {
    /// A registry with the default marker rules and built-in converters.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        builtin::register_builtins(&mut registry);
        registry
    }

    /// A registry with default marker rules and no converters.
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
            rules: MarkerRules::default(),
        }
    }

    /// Registers a converter with [`Priority::Normal`].
    pub fn register(
        &mut self,
        predicate: TypePredicate,
        marker: Option<MarkerKind>,
        converter: Converter,
    ) -> &mut Self {
        self.register_with_priority(predicate, marker, Priority::Normal, converter)
    }

    /// Registers a converter. Among matching entries the highest priority
    /// wins, and later registrations win ties.
    pub fn register_with_priority(
        &mut self,
        predicate: TypePredicate,
        marker: Option<MarkerKind>,
        priority: Priority,
        converter: Converter,
    ) -> &mut Self {
        self.entries.push(ConverterEntry {
            predicate,
            marker,
            priority,
            converter,
        });
        self
    }

    pub fn rules(&self) -> &MarkerRules {
        &self.rules
    }

    pub fn rules_mut(&mut self) -> &mut MarkerRules {
        &mut self.rules
    }

    /// Resolves the converter for a type and its ordered markers.
    pub fn resolve(
        &self,
        target: &ParamType,
        markers: &[MarkerKind],
    ) -> InvocationResult<Converter> {
        self.resolve_indexed(target, markers)
            .map(|(converter, _)| converter)
    }

    /// Like [`resolve`](Self::resolve), also returning how many markers were
    /// passed over, including the one that matched.
    pub(crate) fn resolve_indexed(
        &self,
        target: &ParamType,
        markers: &[MarkerKind],
    ) -> InvocationResult<(Converter, usize)> {
        for (index, marker) in markers.iter().enumerate() {
            if let Some(converter) = self.find_marked(target, *marker) {
                return Ok((converter, index + 1));
            }
        }
        self.find_generic(target)
            .map(|converter| (converter, markers.len()))
            .ok_or_else(|| InvocationError::NoConverterFound {
                target: target.alias(),
                markers: markers.to_vec(),
            })
    }

    /// Whether parameters of this type are read from the message text.
    ///
    /// Types whose generic converter is ambient (guilds, events) are not.
    pub fn is_command_type(&self, target: &ParamType) -> bool {
        self.find_generic(target)
            .is_none_or(|converter| !converter.is_ambient())
    }

    fn find_marked(&self, target: &ParamType, marker: MarkerKind) -> Option<Converter> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.marker == Some(marker) && e.predicate.matches(target))
            .max_by_key(|(seq, e)| (std::cmp::Reverse(e.priority), e.predicate.specificity(), *seq))
            .map(|(_, e)| e.converter.clone())
    }

    fn find_generic(&self, target: &ParamType) -> Option<Converter> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.marker.is_none() && e.predicate.matches(target))
            .max_by_key(|(seq, e)| (e.predicate.specificity(), std::cmp::Reverse(e.priority), *seq))
            .map(|(_, e)| e.converter.clone())
    }
}
