//! Runtime orchestration.
//!
//! [`GantryRuntime`] ties configuration, logging, the command and trigger
//! adapters and cooldown housekeeping together. The platform integration
//! feeds it messages through [`GantryRuntime::handle`]; results go to the
//! configured [`ResultSink`].
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use gantry_runtime::GantryRuntime;
//!
//! let runtime = GantryRuntime::builder()
//!     .config_file("gantry.toml")
//!     .command(command(["ping"], || "pong"))
//!     .trigger(trigger("greet", || "hello").phrase("hi"))
//!     .build()?;
//!
//! runtime.start();
//! runtime.handle(event).await;
//! runtime.shutdown().await;
//! ```

use std::collections::HashSet;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::signal;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;
use tracing::{debug, error, info, trace, warn};

use crate::config::{ConfigLoader, GantryConfig, validate_config};
use crate::error::RuntimeResult;
use crate::logging;
use crate::sink::{LogSink, ResultSink};
use gantry_core::{Ambient, MarkerKind, MessageEvent, UserId};
use gantry_framework::{
    CommandAdapter, CommandBuilder, CommandGroup, Converter, ConverterRegistry, CooldownTracker,
    DecoratorEnv, Dispatched, Dispatcher, MarkerRule, PermissionEvaluator, TriggerAdapter,
    TriggerBuilder, TypePredicate,
};

// =============================================================================
// Permissions
// =============================================================================

/// Permission evaluator that lets configured owners bypass every check.
///
/// Non-owners are delegated to the application's evaluator, or denied when
/// none was supplied.
pub struct OwnerPermissions {
    owners: HashSet<UserId>,
    inner: Option<Arc<dyn PermissionEvaluator>>,
}

impl OwnerPermissions {
    pub fn new(
        owners: impl IntoIterator<Item = UserId>,
        inner: Option<Arc<dyn PermissionEvaluator>>,
    ) -> Self {
        Self {
            owners: owners.into_iter().collect(),
            inner,
        }
    }
}

impl PermissionEvaluator for OwnerPermissions {
    fn is_owner(&self, ambient: &dyn Ambient) -> bool {
        ambient
            .user_id()
            .is_some_and(|user| self.owners.contains(&user))
            || self.inner.as_ref().is_some_and(|inner| inner.is_owner(ambient))
    }

    fn has_permission(&self, ambient: &dyn Ambient, permission: &str) -> bool {
        self.inner
            .as_ref()
            .is_some_and(|inner| inner.has_permission(ambient, permission))
    }
}

// =============================================================================
// GantryRuntime
// =============================================================================

/// The Gantry runtime.
pub struct GantryRuntime {
    config: GantryConfig,
    dispatcher: Dispatcher,
    sink: Arc<dyn ResultSink>,
    cooldowns: Arc<CooldownTracker>,
    sweeper: Mutex<Option<Sweeper>>,
}

/// A running sweeper task. Every start gets its own token, so the runtime
/// can be started again after a shutdown.
struct Sweeper {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl GantryRuntime {
    /// Creates a runtime builder.
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    pub fn config(&self) -> &GantryConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn cooldowns(&self) -> &Arc<CooldownTracker> {
        &self.cooldowns
    }

    /// Dispatches one message and delivers every result to the sink.
    ///
    /// The results are also returned, in the order they were produced.
    pub async fn handle(&self, event: MessageEvent) -> Vec<Dispatched> {
        let event = Arc::new(event);
        let Ok(results) = self.dispatcher.clone().oneshot(Arc::clone(&event)).await;

        for dispatched in &results {
            self.sink.deliver(&event, dispatched).await;
        }
        results
    }

    /// Whether the cooldown sweeper is running.
    pub fn is_running(&self) -> bool {
        self.sweeper
            .lock()
            .as_ref()
            .is_some_and(|sweeper| !sweeper.handle.is_finished())
    }

    /// Spawns the cooldown sweeper on the current tokio runtime.
    ///
    /// Expired timers are purged twice per configured sweep interval.
    pub fn start(&self) {
        let mut sweeper = self.sweeper.lock();
        if sweeper.is_some() {
            warn!("Runtime is already running");
            return;
        }

        let period = self.config.cooldown.sweep_interval() / 2;
        let tracker = Arc::clone(&self.cooldowns);
        let token = CancellationToken::new();
        let cancelled = token.clone();

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                tokio::select! {
                    _ = cancelled.cancelled() => break,
                    _ = interval.tick() => {
                        let purged = tracker.purge_expired();
                        if purged > 0 {
                            trace!(purged, "Purged expired cooldown timers");
                        }
                    }
                }
            }
            debug!("Cooldown sweeper stopped");
        });
        *sweeper = Some(Sweeper { token, handle });

        info!(
            sweep_interval = ?self.config.cooldown.sweep_interval(),
            "Runtime started"
        );
    }

    /// Stops the cooldown sweeper and waits for it to finish.
    pub async fn shutdown(&self) {
        let Some(sweeper) = self.sweeper.lock().take() else {
            return;
        };

        sweeper.token.cancel();
        if let Err(e) = sweeper.handle.await {
            error!(error = %e, "Cooldown sweeper terminated abnormally");
        }
        info!("Runtime stopped");
    }

    /// Starts the runtime and runs until a shutdown signal is received.
    pub async fn run(&self) {
        self.start();
        info!("Gantry runtime is now running. Press Ctrl+C to stop.");
        wait_for_shutdown().await;
        self.shutdown().await;
    }

    /// Starts the runtime and runs until `shutdown` completes.
    pub async fn run_until<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        self.start();
        shutdown.await;
        self.shutdown().await;
    }
}

/// Waits for Ctrl+C or, on unix, SIGTERM.
async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = signal::ctrl_c() => info!("Received Ctrl+C, shutting down"),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down"),
                }
                return;
            }
            Err(e) => warn!(error = %e, "Failed to register SIGTERM handler"),
        }
    }

    match signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, shutting down"),
        Err(e) => error!(error = %e, "Failed to listen for Ctrl+C"),
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for a [`GantryRuntime`].
///
/// Commands, groups and triggers are registered in the order they are
/// added; groups before loose commands.
pub struct RuntimeBuilder {
    config_loader: ConfigLoader,
    config: Option<GantryConfig>,
    registry: ConverterRegistry,
    groups: Vec<CommandGroup>,
    commands: Vec<CommandBuilder>,
    triggers: Vec<TriggerBuilder>,
    permissions: Option<Arc<dyn PermissionEvaluator>>,
    sink: Option<Arc<dyn ResultSink>>,
    init_logging: bool,
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RuntimeBuilder {
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new(),
            config: None,
            registry: ConverterRegistry::new(),
            groups: Vec::new(),
            commands: Vec::new(),
            triggers: Vec::new(),
            permissions: None,
            sink: None,
            init_logging: true,
        }
    }

    /// Sets a specific configuration file to load.
    pub fn config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    /// Merges configuration above the defaults, below files and environment.
    pub fn merge(mut self, config: GantryConfig) -> Self {
        self.config_loader = self.config_loader.merge(config);
        self
    }

    /// Uses this configuration as is, skipping files and environment.
    pub fn config(mut self, config: GantryConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Whether `build` installs the global tracing subscriber.
    pub fn init_logging(mut self, enabled: bool) -> Self {
        self.init_logging = enabled;
        self
    }

    /// Registers an application converter.
    pub fn converter(
        mut self,
        predicate: TypePredicate,
        marker: Option<MarkerKind>,
        converter: Converter,
    ) -> Self {
        self.registry.register(predicate, marker, converter);
        self
    }

    /// Registers or replaces the rule for a marker kind.
    pub fn marker_rule(mut self, kind: MarkerKind, rule: MarkerRule) -> Self {
        self.registry.rules_mut().register(kind, rule);
        self
    }

    pub fn group(mut self, group: CommandGroup) -> Self {
        self.groups.push(group);
        self
    }

    pub fn command(mut self, command: CommandBuilder) -> Self {
        self.commands.push(command);
        self
    }

    pub fn trigger(mut self, trigger: TriggerBuilder) -> Self {
        self.triggers.push(trigger);
        self
    }

    /// Sets the evaluator consulted for non-owner permission checks.
    pub fn permissions(mut self, evaluator: impl PermissionEvaluator + 'static) -> Self {
        self.permissions = Some(Arc::new(evaluator));
        self
    }

    /// Sets the result sink. Defaults to [`LogSink`].
    pub fn sink(mut self, sink: impl ResultSink + 'static) -> Self {
        self.sink = Some(Arc::new(sink));
        self
    }

    /// Loads configuration and registers every action.
    pub fn build(self) -> RuntimeResult<GantryRuntime> {
        let config = match self.config {
            Some(config) => {
                validate_config(&config)?;
                config
            }
            None => self.config_loader.load()?,
        };

        if self.init_logging {
            logging::init_from_config(&config.logging);
        }

        let cooldowns = Arc::new(CooldownTracker::new());
        let permissions =
            OwnerPermissions::new(config.bot.owners.iter().copied(), self.permissions);
        let env = DecoratorEnv::new()
            .with_permissions(permissions)
            .with_cooldowns(Arc::clone(&cooldowns))
            .with_notice_throttle(config.cooldown.notice_throttle());
        let registry = Arc::new(self.registry);

        let mut commands =
            CommandAdapter::new(config.bot.prefix.clone(), Arc::clone(&registry), env.clone());
        for group in self.groups {
            commands.register_group(group)?;
        }
        for command in self.commands {
            commands.register(command)?;
        }

        let mut triggers = TriggerAdapter::new(registry, env);
        for trigger in self.triggers {
            triggers.register(trigger)?;
        }

        info!(
            prefix = %config.bot.prefix,
            commands = commands.len(),
            triggers = triggers.len(),
            "Runtime initialized"
        );

        let dispatcher = Dispatcher::new(commands, triggers).ignore_bots(config.bot.ignore_bots);
        Ok(GantryRuntime {
            config,
            dispatcher,
            sink: self.sink.unwrap_or_else(|| Arc::new(LogSink)),
            cooldowns,
            sweeper: Mutex::new(None),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use gantry_core::{
        ChannelId, CooldownScope, DecoratorMarker, GuildId, InvocationError, ParamMarker, Require,
        Value,
    };
    use gantry_framework::{ActionKind, RegistrationError, command, trigger};

    use crate::config::BotConfig;
    use crate::error::RuntimeError;

    #[derive(Default)]
    struct Recorder {
        delivered: Arc<Mutex<Vec<(u64, String)>>>,
    }

    #[async_trait::async_trait]
    impl ResultSink for Recorder {
        async fn deliver(&self, event: &MessageEvent, dispatched: &Dispatched) {
            self.delivered
                .lock()
                .push((event.channel.get(), dispatched.action.clone()));
        }
    }

    fn config_with_owner(owner: u64) -> GantryConfig {
        GantryConfig {
            bot: BotConfig {
                owners: vec![UserId(owner)],
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn builder() -> RuntimeBuilder {
        GantryRuntime::builder()
            .config(config_with_owner(1))
            .init_logging(false)
    }

    fn event(author: u64, content: &str) -> MessageEvent {
        MessageEvent::new(UserId(author), ChannelId(10), content).in_guild(GuildId(20))
    }

    #[tokio::test]
    async fn test_handle_delivers_to_sink() {
        let recorder = Recorder::default();
        let delivered = Arc::clone(&recorder.delivered);
        let runtime = builder()
            .command(command(["echo"], |text: String| text).param(0, [ParamMarker::Remaining]))
            .trigger(trigger("bug", || "thanks").phrases(["found", "bug"]).require(Require::All))
            .sink(recorder)
            .build()
            .unwrap();

        let results = runtime.handle(event(2, "!echo hello there")).await;
        assert_eq!(results[0].result, Ok(Value::Text("hello there".into())));

        let results = runtime.handle(event(2, "I found a bug")).await;
        assert_eq!(results[0].kind, ActionKind::Trigger);

        assert_eq!(
            *delivered.lock(),
            [(10, "echo".to_string()), (10, "bug".to_string())]
        );
    }

    #[tokio::test]
    async fn test_owners_bypass_permissions() {
        let runtime = builder()
            .command(command(["ban"], || "banned").decorate(DecoratorMarker::permission(["ban"])))
            .build()
            .unwrap();

        let owner = runtime.handle(event(1, "!ban")).await;
        assert_eq!(owner[0].result, Ok(Value::Text("banned".into())));

        let other = runtime.handle(event(2, "!ban")).await;
        assert!(matches!(
            other[0].result,
            Err(InvocationError::PermissionDenied(_))
        ));
    }

    #[tokio::test]
    async fn test_application_permissions() {
        let runtime = builder()
            .permissions(|ambient: &dyn Ambient, permission: &str| {
                permission == "kick" && ambient.user_id() == Some(UserId(3))
            })
            .command(command(["kick"], || "kicked").decorate(DecoratorMarker::permission(["kick"])))
            .build()
            .unwrap();

        assert!(runtime.handle(event(3, "!kick")).await[0].result.is_ok());
        assert!(runtime.handle(event(4, "!kick")).await[0].result.is_err());
    }

    #[tokio::test]
    async fn test_cooldowns_are_tracked() {
        let runtime = builder()
            .command(
                command(["roll"], || 4i64).decorate(DecoratorMarker::cooldown(
                    Duration::from_secs(60),
                    CooldownScope::User,
                )),
            )
            .build()
            .unwrap();

        assert!(runtime.handle(event(2, "!roll")).await[0].result.is_ok());
        assert!(matches!(
            runtime.handle(event(2, "!roll")).await[0].result,
            Err(InvocationError::CooldownActive { notify: true, .. })
        ));
        assert_eq!(runtime.cooldowns().len(), 1);
    }

    #[tokio::test]
    async fn test_start_and_shutdown() {
        let runtime = builder().build().unwrap();
        assert!(!runtime.is_running());

        runtime.start();
        assert!(runtime.is_running());

        runtime.shutdown().await;
        assert!(!runtime.is_running());
    }

    #[tokio::test]
    async fn test_restart_after_shutdown() {
        let runtime = builder().build().unwrap();
        runtime.start();
        runtime.shutdown().await;

        runtime.start();
        tokio::task::yield_now().await;
        assert!(runtime.is_running());

        runtime.shutdown().await;
        assert!(!runtime.is_running());
        runtime.shutdown().await;
    }

    #[test]
    fn test_duplicate_alias_fails_build() {
        let result = builder()
            .command(command(["ping"], || "pong"))
            .command(command(["PING"], || "pong"))
            .build();
        assert!(matches!(
            result,
            Err(RuntimeError::Registration(RegistrationError::DuplicateAlias(_)))
        ));
    }

    #[test]
    fn test_invalid_config_fails_build() {
        let mut config = GantryConfig::default();
        config.bot.prefix = String::new();
        let result = GantryRuntime::builder()
            .config(config)
            .init_logging(false)
            .build();
        assert!(matches!(result, Err(RuntimeError::Config(_))));
    }
}
