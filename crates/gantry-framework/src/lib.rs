//! # Gantry Framework
//!
//! The command invocation pipeline.
//!
//! This layer provides:
//! - A forward-only [`Cursor`] with checkpoint/restore over command text
//! - The token model and usage grammar tokenizer
//! - Marker ordering rules and the [`ConverterRegistry`]
//! - The parameter binder and typed [`Handler`] functions
//! - Decorators (permission, cooldown, log, time) built as tower layers
//! - Prefixed commands, phrase triggers and the tower [`Dispatcher`]
//!
//! Everything in this crate is synchronous; the runtime crate wraps it in
//! an async application context.

pub mod binder;
pub mod command;
pub mod converter;
pub mod cooldown;
pub mod cursor;
pub mod decorator;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod invokable;
pub mod ordering;
pub mod predicate;
pub mod token;
pub mod trigger;

pub use command::{
    CommandAdapter, CommandBuilder, CommandContext, CommandGroup, DEFAULT_PREFIX, command,
};
pub use converter::{ConversionContext, Converter, ConverterKind, ConverterRegistry};
pub use cooldown::{
    Acquire, CooldownKey, CooldownState, CooldownStrategy, CooldownTimer, CooldownTracker,
};
pub use cursor::{Cursor, Mark};
pub use decorator::{
    DEFAULT_NOTICE_THROTTLE, DecoratorEnv, DecoratorLayer, PermissionEvaluator, decorate,
    merge_markers,
};
pub use dispatcher::{ActionKind, Dispatched, Dispatcher};
pub use error::{RegistrationError, RegistrationResult};
pub use handler::{ErasedHandler, Handler, IntoOutcome};
pub use invokable::{
    ActionDescriptor, ActionInvokable, BoxedInvokable, InvocationContext, Invokable,
};
pub use ordering::{MarkerRule, MarkerRules};
pub use predicate::TypePredicate;
pub use token::{ParamDecl, ParsingToken, PlaceholderToken, Token};
pub use trigger::{TriggerAdapter, TriggerBuilder, TriggerContext, TriggerStrategy, trigger};
