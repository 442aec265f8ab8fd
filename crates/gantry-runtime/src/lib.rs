//! Gantry Runtime - Orchestration layer for the Gantry bot framework.
//!
//! This crate provides:
//! - Layered configuration (`config`): defaults, files, environment
//! - Logging setup driven by that configuration (`logging`)
//! - The [`GantryRuntime`], which owns the dispatcher and cooldown housekeeping
//! - Result delivery through a [`ResultSink`]
//!
//! ```ignore
//! use gantry_runtime::GantryRuntime;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = GantryRuntime::builder()
//!         .command(command(["ping"], || "pong"))
//!         .build()?;
//!
//!     runtime.start();
//!     while let Some(event) = platform.next_message().await {
//!         runtime.handle(event).await;
//!     }
//!     runtime.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;
pub mod sink;

// Re-exports
pub use config::{
    BotConfig, ConfigError, ConfigLoader, ConfigResult, CooldownConfig, GantryConfig,
    LoggingConfig,
};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, SpanEvents};
pub use runtime::{GantryRuntime, OwnerPermissions, RuntimeBuilder};
pub use sink::{LogSink, ResultSink};

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
