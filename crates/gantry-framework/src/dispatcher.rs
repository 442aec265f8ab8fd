//! Message dispatcher.
//!
//! The [`Dispatcher`] routes one inbound [`MessageEvent`] through the
//! command adapter and, when the message is not a known command, through the
//! trigger adapter. It is a [`tower::Service`], so it composes with any tower
//! middleware:
//!
//! ```rust,ignore
//! use tower::ServiceExt;
//!
//! let dispatcher = Dispatcher::new(commands, triggers);
//! let results = dispatcher.oneshot(Arc::new(event)).await?;
//! for dispatched in results {
//!     println!("{} -> {:?}", dispatched.action, dispatched.result);
//! }
//! ```

use std::convert::Infallible;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::future::{Ready, ready};
use gantry_core::{InvocationResult, MessageEvent};
use tower::Service;
use tracing::{Level, span, trace};

use crate::command::CommandAdapter;
use crate::trigger::TriggerAdapter;

/// What kind of action produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Command,
    Trigger,
}

/// The outcome of one action run for a message.
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatched {
    pub action: String,
    pub kind: ActionKind,
    pub result: InvocationResult,
}

/// Routes messages to commands and triggers.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    commands: Arc<CommandAdapter>,
    triggers: Arc<TriggerAdapter>,
    ignore_bots: bool,
}

impl Dispatcher {
    /// Creates a dispatcher that ignores messages from bots.
    pub fn new(commands: CommandAdapter, triggers: TriggerAdapter) -> Self {
        Self {
            commands: Arc::new(commands),
            triggers: Arc::new(triggers),
            ignore_bots: true,
        }
    }

    pub fn ignore_bots(mut self, ignore: bool) -> Self {
        self.ignore_bots = ignore;
        self
    }

    pub fn commands(&self) -> &CommandAdapter {
        &self.commands
    }

    pub fn triggers(&self) -> &TriggerAdapter {
        &self.triggers
    }

    /// Runs every action matching `event`.
    pub fn dispatch(&self, event: &MessageEvent) -> Vec<Dispatched> {
        let span = span!(
            Level::DEBUG,
            "dispatch",
            author = %event.author,
            channel = %event.channel
        );
        let _enter = span.enter();

        if self.ignore_bots && event.author_is_bot {
            trace!("Ignoring message from a bot");
            return Vec::new();
        }

        if let Some((command, result)) = self.commands.handle(&event.content, event) {
            return vec![Dispatched {
                action: command.name().to_string(),
                kind: ActionKind::Command,
                result,
            }];
        }

        self.triggers
            .handle(&event.content, event)
            .into_iter()
            .map(|(trigger, result)| Dispatched {
                action: trigger.name().to_string(),
                kind: ActionKind::Trigger,
                result,
            })
            .collect()
    }
}

impl Service<Arc<MessageEvent>> for Dispatcher {
    type Response = Vec<Dispatched>;
    type Error = Infallible;
    type Future = Ready<Result<Vec<Dispatched>, Infallible>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, event: Arc<MessageEvent>) -> Self::Future {
        ready(Ok(self.dispatch(&event)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gantry_core::{ChannelId, GuildId, ParamMarker, Require, UserId, Value};
    use tower::ServiceExt;

    use crate::command::{DEFAULT_PREFIX, command};
    use crate::converter::ConverterRegistry;
    use crate::decorator::DecoratorEnv;
    use crate::trigger::trigger;

    fn dispatcher() -> Dispatcher {
        let registry = Arc::new(ConverterRegistry::new());
        let env = DecoratorEnv::new();

        let mut commands = CommandAdapter::new(DEFAULT_PREFIX, registry.clone(), env.clone());
        commands
            .register(command(["echo"], |text: String| text).param(0, [ParamMarker::Remaining]))
            .unwrap();

        let mut triggers = TriggerAdapter::new(registry, env);
        triggers
            .register(
                trigger("bug", |user: UserId| format!("Thanks {user}"))
                    .phrases(["found", "bug"])
                    .require(Require::All)
                    .param(0, [ParamMarker::Source]),
            )
            .unwrap();
        triggers
            .register(trigger("hello", || "hi").phrase("hello"))
            .unwrap();

        Dispatcher::new(commands, triggers)
    }

    fn event(content: &str) -> Arc<MessageEvent> {
        Arc::new(MessageEvent::new(UserId(4), ChannelId(5), content).in_guild(GuildId(6)))
    }

    #[test]
    fn test_command_dispatch() {
        let results =
            tokio_test::block_on(dispatcher().oneshot(event("!echo found a bug"))).unwrap();
        assert_eq!(
            results,
            [Dispatched {
                action: "echo".into(),
                kind: ActionKind::Command,
                result: Ok(Value::Text("found a bug".into())),
            }]
        );
    }

    #[test]
    fn test_trigger_dispatch() {
        let results =
            tokio_test::block_on(dispatcher().oneshot(event("hello, I found a bug"))).unwrap();
        let actions: Vec<_> = results.iter().map(|d| d.action.as_str()).collect();
        assert_eq!(actions, ["bug", "hello"]);
        assert!(results.iter().all(|d| d.kind == ActionKind::Trigger));
    }

    #[test]
    fn test_unknown_command_falls_through_to_triggers() {
        let results = dispatcher().dispatch(&event("!unknown hello"));
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].action, "hello");
    }

    #[test]
    fn test_bots_ignored() {
        let bot = MessageEvent::new(UserId(4), ChannelId(5), "!echo hi").from_bot();
        assert!(dispatcher().dispatch(&bot).is_empty());
        assert_eq!(dispatcher().ignore_bots(false).dispatch(&bot).len(), 1);
    }
}
