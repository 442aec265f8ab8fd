use std::time::Instant;

use gantry_core::{DecoratorKind, InvocationResult, LogLevel};
use tower_layer::Layer;

use crate::invokable::{ActionDescriptor, BoxedInvokable, InvocationContext, Invokable};

// tracing needs a constant level per callsite.
macro_rules! log_at {
    ($level:expr, $($arg:tt)+) => {
        match $level {
            LogLevel::Trace => tracing::trace!($($arg)+),
            LogLevel::Debug => tracing::debug!($($arg)+),
            LogLevel::Info => tracing::info!($($arg)+),
            LogLevel::Warn => tracing::warn!($($arg)+),
            LogLevel::Error => tracing::error!($($arg)+),
        }
    };
}

// =============================================================================
// Log
// =============================================================================

#[derive(Debug, Clone, Copy)]
pub struct LogLayer {
    level: LogLevel,
}

impl LogLayer {
    pub fn new(level: LogLevel) -> Self {
        Self { level }
    }
}

impl Layer<BoxedInvokable> for LogLayer {
    type Service = LogDecorator;

    fn layer(&self, inner: BoxedInvokable) -> LogDecorator {
        LogDecorator {
            level: self.level,
            inner,
        }
    }
}

/// Logs who invoked the action, before invoking it.
pub struct LogDecorator {
    level: LogLevel,
    inner: BoxedInvokable,
}

impl Invokable for LogDecorator {
    fn invoke(&self, ctx: &InvocationContext<'_>) -> InvocationResult {
        let ambient = ctx.ambient();
        let guild = ambient
            .guild_id()
            .map_or_else(|| "private".to_string(), |g| g.to_string());
        let channel = ambient
            .channel_id()
            .map_or_else(|| "-".to_string(), |c| c.to_string());
        let user = ambient
            .user_id()
            .map_or_else(|| "unknown".to_string(), |u| u.to_string());

        log_at!(
            self.level,
            "[{}][{}] {} has invoked the action {}",
            guild,
            channel,
            user,
            self.descriptor().name
        );
        self.inner.invoke(ctx)
    }

    fn descriptor(&self) -> &ActionDescriptor {
        self.inner.descriptor()
    }

    fn inner(&self) -> Option<&BoxedInvokable> {
        Some(&self.inner)
    }

    fn decorator(&self) -> Option<DecoratorKind> {
        Some(DecoratorKind::Log)
    }
}

// =============================================================================
// Time
// =============================================================================

#[derive(Debug, Clone, Copy)]
pub struct TimeLayer {
    level: LogLevel,
}

impl TimeLayer {
    pub fn new(level: LogLevel) -> Self {
        Self { level }
    }
}

impl Layer<BoxedInvokable> for TimeLayer {
    type Service = TimeDecorator;

    fn layer(&self, inner: BoxedInvokable) -> TimeDecorator {
        TimeDecorator {
            level: self.level,
            inner,
        }
    }
}

/// Logs how long the inner invokable took and whether it succeeded.
pub struct TimeDecorator {
    level: LogLevel,
    inner: BoxedInvokable,
}

impl Invokable for TimeDecorator {
    fn invoke(&self, ctx: &InvocationContext<'_>) -> InvocationResult {
        let start = Instant::now();
        let result = self.inner.invoke(ctx);
        let millis = start.elapsed().as_secs_f64() * 1000.0;

        let outcome = if result.is_ok() {
            "successfully"
        } else {
            "unsuccessfully"
        };
        log_at!(
            self.level,
            "Invoked {} {} in {:.5}ms",
            self.descriptor().name,
            outcome,
            millis
        );
        result
    }

    fn descriptor(&self) -> &ActionDescriptor {
        self.inner.descriptor()
    }

    fn inner(&self) -> Option<&BoxedInvokable> {
        Some(&self.inner)
    }

    fn decorator(&self) -> Option<DecoratorKind> {
        Some(DecoratorKind::Time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use gantry_core::{ChannelId, InvocationError, MessageEvent, UserId, Value};

    use crate::converter::ConverterRegistry;
    use crate::handler::ErasedHandler;
    use crate::invokable::{ActionInvokable, decorator_kinds};

    fn action() -> BoxedInvokable {
        let action = ActionInvokable::build(
            "parse",
            ErasedHandler::new(|n: u8| u32::from(n)),
            &[],
            None,
            false,
            Arc::new(ConverterRegistry::new()),
        )
        .unwrap();
        Arc::new(action)
    }

    #[test]
    fn test_results_pass_through() {
        let timed: BoxedInvokable = Arc::new(TimeLayer::new(LogLevel::Debug).layer(action()));
        let logged: BoxedInvokable = Arc::new(LogLayer::new(LogLevel::Info).layer(timed));
        assert_eq!(
            decorator_kinds(&logged),
            [DecoratorKind::Log, DecoratorKind::Time]
        );

        let event = MessageEvent::new(UserId(1), ChannelId(1), "7");
        assert_eq!(
            logged.invoke(&InvocationContext::new("7", &event)),
            Ok(Value::Int(7))
        );
        assert!(matches!(
            logged.invoke(&InvocationContext::new("300", &event)),
            Err(InvocationError::ConversionFailed(_))
        ));
    }
}
