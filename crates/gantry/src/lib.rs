//! # Gantry
//!
//! A typed command and trigger framework for chat bots.
//!
//! ## Overview
//!
//! Handlers are plain Rust functions. Their parameter types, plus a few
//! markers, decide how the text of a message is parsed into arguments:
//!
//! ```text
//! "!add 2 plus 3"
//!    │
//!    ▼
//! ┌────────────┐     ┌────────────────┐     ┌────────────┐     ┌────────────┐
//! │ Dispatcher │────▶│ CommandAdapter │────▶│ Decorators │────▶│  Handler   │──▶ Value
//! │            │────▶│ TriggerAdapter │     │ perm/cd/log│     │ fn(i64,i64)│
//! └────────────┘     └────────────────┘     └────────────┘     └────────────┘
//! ```
//!
//! - **Core** (`gantry-core`): values, markers, ids and error types
//! - **Framework** (`gantry-framework`): converters, tokens, decorators and adapters
//! - **Runtime** (`gantry-runtime`): configuration, logging and the runtime itself
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use gantry::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = GantryRuntime::builder()
//!         .command(
//!             command(["add"], |a: i64, b: i64| a + b)
//!                 .usage("int <plus> int")
//!                 .description("Adds two numbers"),
//!         )
//!         .trigger(trigger("thanks", || "You're welcome").phrase("thank you"))
//!         .build()?;
//!
//!     runtime.start();
//!     runtime.handle(MessageEvent::new(UserId(1), ChannelId(2), "!add 2 plus 3")).await;
//!     runtime.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config`: TOML configuration files (default)
//! - `yaml-config`: YAML configuration files
//! - `json-log`: JSON log output

pub use gantry_core as core;
pub use gantry_framework as framework;
pub use gantry_runtime as runtime;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use gantry::prelude::*;
/// ```
pub mod prelude {
    // Runtime - main entry point
    pub use gantry_runtime::{GantryRuntime, LogSink, ResultSink};

    // Action registration
    pub use gantry_framework::{
        CommandGroup, Converter, PermissionEvaluator, TriggerStrategy, TypePredicate, command,
        trigger,
    };

    // Results of dispatching
    pub use gantry_framework::{ActionKind, Dispatched};

    // Markers and values
    pub use gantry_core::{
        Ambient, ChannelId, CooldownScope, Custom, DecoratorMarker, GuildId, InvocationError,
        InvocationResult, LogLevel, MessageEvent, ParamMarker, Require, UserId, Value,
    };
}
