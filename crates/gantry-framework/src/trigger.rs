//! Phrase triggers.
//!
//! A trigger fires when a message contains its phrases, independent of any
//! command prefix:
//!
//! ```rust,ignore
//! let found_bug = trigger("found_bug", |user: UserId| format!("Thanks {user}, please report it"))
//!     .phrases(["found", "bug"])
//!     .require(Require::All)
//!     .param(0, [ParamMarker::Source]);
//!
//! adapter.register(found_bug)?;
//! ```
//!
//! Trigger handlers only take parameters read from the ambient context.

use std::fmt;
use std::sync::Arc;

use gantry_core::{Ambient, DecoratorMarker, InvocationResult, ParamMarker, Require};
use tracing::{debug, trace};

use crate::converter::ConverterRegistry;
use crate::decorator::{DecoratorEnv, decorate};
use crate::error::{RegistrationError, RegistrationResult};
use crate::handler::{ErasedHandler, Handler};
use crate::invokable::{ActionInvokable, BoxedInvokable, InvocationContext, Invokable};
use crate::token::Token;

/// Where a phrase has to appear in the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TriggerStrategy {
    /// Anywhere in the message.
    #[default]
    Anywhere,
    /// At the very start of the message; leading whitespace counts.
    Start,
}

impl TriggerStrategy {
    fn holds(self, text: &str, phrase: &str) -> bool {
        match self {
            Self::Anywhere => text.contains(phrase),
            Self::Start => text.starts_with(phrase),
        }
    }
}

/// A registered trigger.
pub struct TriggerContext {
    name: String,
    phrases: Vec<String>,
    require: Require,
    strategy: TriggerStrategy,
    invokable: BoxedInvokable,
}

impl TriggerContext {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn phrases(&self) -> &[String] {
        &self.phrases
    }

    pub fn require(&self) -> Require {
        self.require
    }

    pub fn strategy(&self) -> TriggerStrategy {
        self.strategy
    }

    pub fn invokable(&self) -> &BoxedInvokable {
        &self.invokable
    }

    /// Case-insensitive phrase matching.
    pub fn matches(&self, text: &str) -> bool {
        let text = text.to_lowercase();
        let mut phrases = self.phrases.iter();
        match self.require {
            Require::All => phrases.all(|p| self.strategy.holds(&text, p)),
            Require::Any => phrases.any(|p| self.strategy.holds(&text, p)),
        }
    }

    pub fn invoke(&self, ambient: &dyn Ambient) -> InvocationResult {
        self.invokable.invoke(&InvocationContext::new("", ambient))
    }
}

impl fmt::Debug for TriggerContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TriggerContext")
            .field("name", &self.name)
            .field("phrases", &self.phrases)
            .field("require", &self.require)
            .field("strategy", &self.strategy)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Starts a trigger declaration.
pub fn trigger<H, Args>(name: impl Into<String>, handler: H) -> TriggerBuilder
where
    H: Handler<Args>,
    Args: 'static,
{
    TriggerBuilder {
        name: name.into(),
        phrases: Vec::new(),
        require: Require::Any,
        strategy: TriggerStrategy::Anywhere,
        markers: Vec::new(),
        decorators: Vec::new(),
        handler: ErasedHandler::new(handler),
    }
}

/// A trigger declaration, see [`trigger`].
#[derive(Debug, Clone)]
pub struct TriggerBuilder {
    name: String,
    phrases: Vec<String>,
    require: Require,
    strategy: TriggerStrategy,
    markers: Vec<Vec<ParamMarker>>,
    decorators: Vec<DecoratorMarker>,
    handler: ErasedHandler,
}

impl TriggerBuilder {
    pub fn phrase(mut self, phrase: impl Into<String>) -> Self {
        self.phrases.push(phrase.into());
        self
    }

    pub fn phrases<I, S>(mut self, phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.phrases.extend(phrases.into_iter().map(Into::into));
        self
    }

    pub fn require(mut self, require: Require) -> Self {
        self.require = require;
        self
    }

    /// Ignored for [`Require::All`], which always matches anywhere.
    pub fn strategy(mut self, strategy: TriggerStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Attaches markers to the parameter at `index`.
    pub fn param(mut self, index: usize, markers: impl IntoIterator<Item = ParamMarker>) -> Self {
        if self.markers.len() <= index {
            self.markers.resize_with(index + 1, Vec::new);
        }
        self.markers[index].extend(markers);
        self
    }

    pub fn decorate(mut self, marker: DecoratorMarker) -> Self {
        self.decorators.push(marker);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

// =============================================================================
// Adapter
// =============================================================================

/// Holds every registered trigger.
#[derive(Debug)]
pub struct TriggerAdapter {
    triggers: Vec<Arc<TriggerContext>>,
    registry: Arc<ConverterRegistry>,
    env: DecoratorEnv,
}

impl TriggerAdapter {
    pub fn new(registry: Arc<ConverterRegistry>, env: DecoratorEnv) -> Self {
        Self {
            triggers: Vec::new(),
            registry,
            env,
        }
    }

    pub fn triggers(&self) -> &[Arc<TriggerContext>] {
        &self.triggers
    }

    pub fn len(&self) -> usize {
        self.triggers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triggers.is_empty()
    }

    pub fn register(&mut self, builder: TriggerBuilder) -> RegistrationResult<Arc<TriggerContext>> {
        let phrases: Vec<String> = builder
            .phrases
            .iter()
            .map(|p| p.trim().to_lowercase())
            .filter(|p| !p.is_empty())
            .collect();
        if phrases.is_empty() {
            return Err(RegistrationError::MissingPhrases);
        }

        let action = ActionInvokable::build(
            builder.name.clone(),
            builder.handler,
            &builder.markers,
            None,
            true,
            self.registry.clone(),
        )?;
        let textual = action
            .descriptor()
            .tokens
            .iter()
            .filter_map(Token::as_parsing)
            .find(|token| token.is_command_parameter);
        if let Some(token) = textual {
            return Err(RegistrationError::TextualTriggerParameter {
                index: token.index,
                target: token.alias(),
            });
        }

        let strategy = match builder.require {
            Require::All => TriggerStrategy::Anywhere,
            Require::Any => builder.strategy,
        };
        let context = Arc::new(TriggerContext {
            name: builder.name,
            phrases,
            require: builder.require,
            strategy,
            invokable: decorate(Arc::new(action), &builder.decorators, &self.env),
        });
        debug!(trigger = %context.name, phrases = ?context.phrases, "Registered trigger");
        self.triggers.push(context.clone());
        Ok(context)
    }

    /// Invokes every trigger matching `content`.
    pub fn handle(
        &self,
        content: &str,
        ambient: &dyn Ambient,
    ) -> Vec<(Arc<TriggerContext>, InvocationResult)> {
        if ambient.is_bot_author() {
            return Vec::new();
        }
        self.triggers
            .iter()
            .filter(|trigger| trigger.matches(content))
            .map(|trigger| {
                trace!(trigger = %trigger.name, "Trigger matched");
                (trigger.clone(), trigger.invoke(ambient))
            })
            .collect()
    }
}
