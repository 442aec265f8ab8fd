//! The invokable contract and the action at the root of every chain.
//!
//! An [`Invokable`] takes an [`InvocationContext`] (the text to bind and the
//! ambient context) and returns an [`InvocationResult`]. Decorators are
//! invokables that wrap exactly one inner invokable; the innermost link is
//! always an [`ActionInvokable`], which binds parameters and calls the
//! handler.

use std::fmt;
use std::sync::Arc;

use gantry_core::{
    Ambient, DecoratorKind, InvocationError, InvocationResult, ParamMarker, Value,
};
use tracing::error;

use crate::converter::ConverterRegistry;
use crate::cursor::Cursor;
use crate::error::{RegistrationError, RegistrationResult};
use crate::handler::ErasedHandler;
use crate::token::{ParamDecl, Token, render_usage, tokenize};

/// The input of one invocation.
#[derive(Clone, Copy)]
pub struct InvocationContext<'a> {
    text: &'a str,
    ambient: &'a dyn Ambient,
}

impl<'a> InvocationContext<'a> {
    pub fn new(text: &'a str, ambient: &'a dyn Ambient) -> Self {
        Self { text, ambient }
    }

    /// The text left for parameter binding (without prefix and alias).
    pub fn text(&self) -> &'a str {
        self.text
    }

    pub fn ambient(&self) -> &'a dyn Ambient {
        self.ambient
    }
}

impl fmt::Debug for InvocationContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvocationContext")
            .field("text", &self.text)
            .finish_non_exhaustive()
    }
}

/// A link in an invocation chain.
pub trait Invokable: Send + Sync {
    fn invoke(&self, ctx: &InvocationContext<'_>) -> InvocationResult;

    /// The action at the root of the chain.
    fn descriptor(&self) -> &ActionDescriptor;

    /// The wrapped invokable, for decorators.
    fn inner(&self) -> Option<&BoxedInvokable> {
        None
    }

    /// The decorator kind, for decorators.
    fn decorator(&self) -> Option<DecoratorKind> {
        None
    }
}

/// A shared, type-erased invokable.
pub type BoxedInvokable = Arc<dyn Invokable>;

/// Number of decorators wrapping the root action.
pub fn depth(invokable: &BoxedInvokable) -> usize {
    let mut depth = 0;
    let mut current = invokable;
    while let Some(inner) = current.inner() {
        depth += 1;
        current = inner;
    }
    depth
}

/// The innermost link of a chain.
pub fn root(invokable: &BoxedInvokable) -> &BoxedInvokable {
    let mut current = invokable;
    while let Some(inner) = current.inner() {
        current = inner;
    }
    current
}

/// The decorator kinds of a chain, outermost first.
pub fn decorator_kinds(invokable: &BoxedInvokable) -> Vec<DecoratorKind> {
    let mut kinds = Vec::new();
    let mut current = invokable;
    while let Some(kind) = current.decorator() {
        kinds.push(kind);
        match current.inner() {
            Some(inner) => current = inner,
            None => break,
        }
    }
    kinds
}

// =============================================================================
// ActionInvokable
// =============================================================================

/// Metadata describing one registered action.
#[derive(Debug, Clone)]
pub struct ActionDescriptor {
    pub name: String,
    pub tokens: Vec<Token>,
    pub may_have_leftover: bool,
}

impl ActionDescriptor {
    /// The usage line derived from the tokens.
    pub fn usage(&self) -> String {
        render_usage(&self.tokens)
    }
}

/// Binds parameters, then calls the handler.
pub struct ActionInvokable {
    descriptor: ActionDescriptor,
    registry: Arc<ConverterRegistry>,
    handler: ErasedHandler,
}

impl ActionInvokable {
    /// Builds the tokens for `handler` and wraps it.
    ///
    /// `markers[i]` holds the markers of parameter `i`; missing entries mean
    /// no markers.
    pub fn build(
        name: impl Into<String>,
        handler: ErasedHandler,
        markers: &[Vec<ParamMarker>],
        usage: Option<&str>,
        may_have_leftover: bool,
        registry: Arc<ConverterRegistry>,
    ) -> RegistrationResult<Self> {
        let params = handler.params();
        if markers.len() > params.len() {
            return Err(RegistrationError::MarkerCountMismatch {
                declared: markers.len(),
                expected: params.len(),
            });
        }

        let decls: Vec<ParamDecl> = params
            .iter()
            .zip(handler.checks())
            .enumerate()
            .map(|(i, (target, check))| {
                ParamDecl::new(target.clone())
                    .with_markers(markers.get(i).into_iter().flatten().cloned())
                    .with_check(*check)
            })
            .collect();
        let tokens = tokenize(&decls, usage, &registry)?;

        Ok(Self {
            descriptor: ActionDescriptor {
                name: name.into(),
                tokens,
                may_have_leftover,
            },
            registry,
            handler,
        })
    }

    /// Binds the context's text against this action's tokens.
    pub fn bind(&self, ctx: &InvocationContext<'_>) -> InvocationResult<Vec<Value>> {
        let mut cursor = Cursor::new(ctx.text());
        crate::binder::bind(
            &self.descriptor.tokens,
            &mut cursor,
            ctx.ambient(),
            &self.registry,
            self.descriptor.may_have_leftover,
        )
    }
}

impl Invokable for ActionInvokable {
    fn invoke(&self, ctx: &InvocationContext<'_>) -> InvocationResult {
        let args = self.bind(ctx)?;
        let result = self.handler.call(args);
        if let Err(e @ InvocationError::Handler(_)) = &result {
            error!(action = %self.descriptor.name, error = %e, "Handler failed");
        }
        result
    }

    fn descriptor(&self) -> &ActionDescriptor {
        &self.descriptor
    }
}
