//! Delivery of invocation results.
//!
//! The framework only returns values; what happens to them is up to the
//! application. A [`ResultSink`] receives every [`Dispatched`] result along
//! with the message that produced it, for example to send a reply back to the
//! channel.
//!
//! ```rust,ignore
//! struct Reply { client: ChatClient }
//!
//! #[async_trait]
//! impl ResultSink for Reply {
//!     async fn deliver(&self, event: &MessageEvent, dispatched: &Dispatched) {
//!         if let Ok(value) = &dispatched.result && !value.is_unit() {
//!             self.client.send(event.channel, value.to_string()).await;
//!         }
//!     }
//! }
//! ```

use async_trait::async_trait;
use tracing::{error, info};

use gantry_core::MessageEvent;
use gantry_framework::Dispatched;

/// Receives the results of dispatched actions.
#[async_trait]
pub trait ResultSink: Send + Sync {
    async fn deliver(&self, event: &MessageEvent, dispatched: &Dispatched);
}

/// The default sink: writes every result to the log.
///
/// Successes and user-facing errors are logged at info, anything else at
/// error. Throttled cooldown notices are dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

#[async_trait]
impl ResultSink for LogSink {
    async fn deliver(&self, event: &MessageEvent, dispatched: &Dispatched) {
        match &dispatched.result {
            Ok(value) => info!(
                action = %dispatched.action,
                kind = ?dispatched.kind,
                channel = %event.channel,
                "{value}"
            ),
            Err(e) if !e.should_display() => {}
            Err(e) if e.is_user_facing() => info!(
                action = %dispatched.action,
                kind = ?dispatched.kind,
                channel = %event.channel,
                "{e}"
            ),
            Err(e) => error!(
                action = %dispatched.action,
                kind = ?dispatched.kind,
                channel = %event.channel,
                error = %e,
                "Action failed"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gantry_core::{ChannelId, InvocationError, UserId, Value};
    use gantry_framework::ActionKind;
    use parking_lot::Mutex;
    use std::io;
    use std::sync::Arc;
    use std::time::Duration;

    /// Collects formatted log output.
    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Captured {
        fn lines(&self) -> Vec<String> {
            String::from_utf8_lossy(&self.0.lock())
                .lines()
                .map(str::to_string)
                .collect()
        }
    }

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn dispatched(result: gantry_core::InvocationResult) -> Dispatched {
        Dispatched {
            action: "echo".into(),
            kind: ActionKind::Command,
            result,
        }
    }

    #[test]
    fn test_log_sink_levels() {
        let event = MessageEvent::new(UserId(1), ChannelId(2), "!echo hi");
        let results = [
            dispatched(Ok(Value::Text("hi there".into()))),
            dispatched(Err(InvocationError::too_few())),
            dispatched(Err(InvocationError::CooldownActive {
                remaining: Duration::from_secs(3),
                notify: false,
            })),
            dispatched(Err(InvocationError::handler("boom"))),
        ];

        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .without_time()
            .finish();
        tracing::subscriber::with_default(subscriber, || {
            tokio_test::block_on(async {
                for result in &results {
                    LogSink.deliver(&event, result).await;
                }
            });
        });

        let lines = captured.lines();
        assert_eq!(lines.len(), 3, "suppressed notices are not logged: {lines:?}");

        assert!(lines[0].contains("INFO"));
        assert!(lines[0].contains("hi there"));
        assert!(lines[0].contains("action=echo"));

        assert!(lines[1].contains("INFO"));
        assert!(lines[1].contains(&InvocationError::too_few().to_string()));

        assert!(lines[2].contains("ERROR"));
        assert!(lines[2].contains("Action failed"));
        assert!(lines[2].contains("boom"));
    }
}
