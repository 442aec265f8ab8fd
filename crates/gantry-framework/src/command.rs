//! Prefixed commands.
//!
//! Commands are declared with [`command`] and registered either on their
//! own or inside a [`CommandGroup`], whose decorators are merged into every
//! command it holds:
//!
//! ```rust,ignore
//! fn add(a: i64, b: i64) -> i64 {
//!     a + b
//! }
//!
//! let math = CommandGroup::new("math")
//!     .decorate(DecoratorMarker::log(LogLevel::Info))
//!     .command(
//!         command(["add", "plus"], add)
//!             .description("Adds two numbers")
//!             .usage("int <plus> int"),
//!     );
//!
//! adapter.register_group(math)?;
//! ```
//!
//! A message `!add 1 plus 2` then resolves the `add` alias, binds the rest of
//! the text and runs the decorated chain.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use gantry_core::{Ambient, DecoratorMarker, InvocationResult, ParamMarker};
use tracing::debug;

use crate::converter::ConverterRegistry;
use crate::decorator::{DecoratorEnv, decorate, merge_markers};
use crate::error::{RegistrationError, RegistrationResult};
use crate::handler::{ErasedHandler, Handler};
use crate::invokable::{ActionInvokable, BoxedInvokable, InvocationContext, Invokable};

/// Default command prefix.
pub const DEFAULT_PREFIX: &str = "!";

/// Starts a command declaration.
pub fn command<I, S, H, Args>(aliases: I, handler: H) -> CommandBuilder
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
    H: Handler<Args>,
    Args: 'static,
{
    CommandBuilder {
        aliases: aliases.into_iter().map(Into::into).collect(),
        description: String::new(),
        usage: None,
        markers: Vec::new(),
        decorators: Vec::new(),
        may_have_leftover: false,
        handler: ErasedHandler::new(handler),
    }
}

/// A command declaration, see [`command`].
#[derive(Debug, Clone)]
pub struct CommandBuilder {
    aliases: Vec<String>,
    description: String,
    usage: Option<String>,
    markers: Vec<Vec<ParamMarker>>,
    decorators: Vec<DecoratorMarker>,
    may_have_leftover: bool,
    handler: ErasedHandler,
}

impl CommandBuilder {
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the usage grammar, e.g. `"int <plus> int"`.
    pub fn usage(mut self, usage: impl Into<String>) -> Self {
        self.usage = Some(usage.into());
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

    /// Accepts text left over after the last parameter.
    pub fn allow_leftover(mut self) -> Self {
        self.may_have_leftover = true;
        self
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }
}

/// Commands sharing group-level decorators.
#[derive(Debug, Clone)]
pub struct CommandGroup {
    name: String,
    decorators: Vec<DecoratorMarker>,
    commands: Vec<CommandBuilder>,
}

impl CommandGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            decorators: Vec::new(),
            commands: Vec::new(),
        }
    }

    pub fn decorate(mut self, marker: DecoratorMarker) -> Self {
        self.decorators.push(marker);
        self
    }

    pub fn command(mut self, command: CommandBuilder) -> Self {
        self.commands.push(command);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

/// A registered command.
pub struct CommandContext {
    aliases: Vec<String>,
    description: String,
    group: Option<String>,
    invokable: BoxedInvokable,
}

impl CommandContext {
    /// Lowercased aliases; the first one names the command.
    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    pub fn name(&self) -> &str {
        &self.invokable.descriptor().name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    pub fn invokable(&self) -> &BoxedInvokable {
        &self.invokable
    }

    pub fn usage(&self) -> String {
        self.invokable.descriptor().usage()
    }

    /// Renders `<prefix><alias> <usage>` followed by the description.
    pub fn help(&self, prefix: &str) -> String {
        let usage = self.usage();
        let mut help = format!("{prefix}{}", self.name());
        if !usage.is_empty() {
            help.push(' ');
            help.push_str(&usage);
        }
        if !self.description.is_empty() {
            help.push('\n');
            help.push_str(&self.description);
        }
        help
    }

    pub fn invoke(&self, text: &str, ambient: &dyn Ambient) -> InvocationResult {
        self.invokable.invoke(&InvocationContext::new(text, ambient))
    }
}

impl fmt::Debug for CommandContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandContext")
            .field("aliases", &self.aliases)
            .field("group", &self.group)
            .field("usage", &self.usage())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Adapter
// =============================================================================

/// Parses prefixed messages and routes them to commands.
#[derive(Debug)]
pub struct CommandAdapter {
    prefix: String,
    commands: HashMap<String, Arc<CommandContext>>,
    ordered: Vec<Arc<CommandContext>>,
    registry: Arc<ConverterRegistry>,
    env: DecoratorEnv,
}

impl CommandAdapter {
    pub fn new(
        prefix: impl Into<String>,
        registry: Arc<ConverterRegistry>,
        env: DecoratorEnv,
    ) -> Self {
        Self {
            prefix: prefix.into(),
            commands: HashMap::new(),
            ordered: Vec::new(),
            registry,
            env,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Registered commands in registration order.
    pub fn commands(&self) -> &[Arc<CommandContext>] {
        &self.ordered
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    pub fn register(&mut self, builder: CommandBuilder) -> RegistrationResult<Arc<CommandContext>> {
        self.register_in(None, &[], builder)
    }

    pub fn register_group(
        &mut self,
        group: CommandGroup,
    ) -> RegistrationResult<Vec<Arc<CommandContext>>> {
        let CommandGroup {
            name,
            decorators,
            commands,
        } = group;
        commands
            .into_iter()
            .map(|builder| self.register_in(Some(&name), &decorators, builder))
            .collect()
    }

    fn register_in(
        &mut self,
        group: Option<&str>,
        group_markers: &[DecoratorMarker],
        builder: CommandBuilder,
    ) -> RegistrationResult<Arc<CommandContext>> {
        let aliases = self.check_aliases(&builder.aliases)?;

        let action = ActionInvokable::build(
            aliases[0].clone(),
            builder.handler,
            &builder.markers,
            builder.usage.as_deref(),
            builder.may_have_leftover,
            self.registry.clone(),
        )?;
        let markers = merge_markers(group_markers, &builder.decorators);
        let context = Arc::new(CommandContext {
            aliases,
            description: builder.description,
            group: group.map(str::to_string),
            invokable: decorate(Arc::new(action), &markers, &self.env),
        });

        for alias in &context.aliases {
            self.commands.insert(alias.clone(), context.clone());
        }
        self.ordered.push(context.clone());
        debug!(
            command = %context.name(),
            group = ?context.group,
            usage = %context.usage(),
            "Registered command"
        );
        Ok(context)
    }

    fn check_aliases(&self, aliases: &[String]) -> RegistrationResult<Vec<String>> {
        let mut checked: Vec<String> = Vec::with_capacity(aliases.len());
        for alias in aliases {
            let alias = alias.trim().to_lowercase();
            if alias.is_empty() {
                continue;
            }
            if self.commands.contains_key(&alias) || checked.contains(&alias) {
                return Err(RegistrationError::DuplicateAlias(alias));
            }
            checked.push(alias);
        }
        if checked.is_empty() {
            return Err(RegistrationError::MissingAlias);
        }
        Ok(checked)
    }

    /// Splits `content` into a lowercased alias and the text after it.
    pub fn parse<'a>(&self, content: &'a str) -> Option<(String, &'a str)> {
        let rest = content.trim_start().strip_prefix(self.prefix.as_str())?;
        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        let (alias, text) = rest.split_at(end);
        if alias.is_empty() {
            return None;
        }
        Some((alias.to_lowercase(), text.trim_start()))
    }

    pub fn find(&self, alias: &str) -> Option<&Arc<CommandContext>> {
        self.commands.get(&alias.to_lowercase())
    }

    /// Runs the command named by `content`, if any.
    pub fn handle(
        &self,
        content: &str,
        ambient: &dyn Ambient,
    ) -> Option<(Arc<CommandContext>, InvocationResult)> {
        let (alias, text) = self.parse(content)?;
        let Some(command) = self.commands.get(&alias) else {
            debug!(alias = %alias, "Ignoring unknown command");
            return None;
        };
        Some((command.clone(), command.invoke(text, ambient)))
    }

    /// The help text for `alias`.
    pub fn help(&self, alias: &str) -> Option<String> {
        self.find(alias).map(|command| command.help(&self.prefix))
    }
}
