//! Gantry Core - the value model shared by every Gantry crate.
//!
//! This crate holds the pieces that the command pipeline passes around but
//! never interprets on its own:
//!
//! - [`Value`] and [`ParamType`]: the dynamically typed argument model
//! - [`Parameter`] / [`IntoValue`]: the bridge between Rust types and values
//! - [`Ambient`] and [`MessageEvent`]: invocation-time context
//! - [`ParamMarker`] / [`DecoratorMarker`]: declarative tags on parameters and actions
//! - [`InvocationError`] / [`ConversionError`]: the failure vocabulary
//!
//! Higher level functionality (binding, decorators, triggers) lives in
//! `gantry-framework`.

pub mod error;
pub mod event;
pub mod ids;
pub mod marker;
pub mod value;

pub use error::{ConversionError, ConversionResult, InvocationError, InvocationResult};
pub use event::{Ambient, AmbientKind, EmptyAmbient, MessageEvent};
pub use ids::{ChannelId, GuildId, UserId};
pub use marker::{
    CooldownScope, DecoratorKind, DecoratorMarker, LogLevel, MarkerKind, MergePolicy, ParamMarker,
    Priority, Require,
};
pub use value::{Custom, IntoValue, ObjectValue, ParamType, Parameter, Value, ValueCheck};
