//! Decorator chain construction.
//!
//! Decorators are [`Invokable`]s that wrap exactly one inner invokable.
//! Each [`DecoratorMarker`] is turned into a [`DecoratorLayer`], a
//! [`tower_layer::Layer`] over [`BoxedInvokable`], and the layers are folded
//! around the action from innermost to outermost:
//!
//! ```rust,ignore
//! let markers = merge_markers(&group_markers, &action_markers);
//! let chain = decorate(Arc::new(action), &markers, &env);
//! ```
//!
//! [`Priority::First`](gantry_core::Priority::First) decorators end up
//! outermost and run first; `Late` decorators sit right next to the handler.

mod cooldown;
mod log;
mod permission;

pub use cooldown::{CooldownDecorator, CooldownLayer};
pub use log::{LogDecorator, LogLayer, TimeDecorator, TimeLayer};
pub use permission::{
    NO_PERMISSION, PRIVATE_MESSAGE, PermissionDecorator, PermissionEvaluator, PermissionLayer,
};

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use gantry_core::{DecoratorMarker, InvocationError, InvocationResult, MergePolicy};
use tower_layer::Layer;
use tracing::warn;

use crate::cooldown::CooldownTracker;
use crate::invokable::BoxedInvokable;

/// Default window during which repeated cooldown notices are suppressed.
pub const DEFAULT_NOTICE_THROTTLE: Duration = Duration::from_secs(15);

/// Collaborators needed to construct decorators.
#[derive(Clone)]
pub struct DecoratorEnv {
    permissions: Option<Arc<dyn PermissionEvaluator>>,
    cooldowns: Arc<CooldownTracker>,
    notice_throttle: Duration,
}

impl DecoratorEnv {
    pub fn new() -> Self {
        Self {
            permissions: None,
            cooldowns: Arc::new(CooldownTracker::new()),
            notice_throttle: DEFAULT_NOTICE_THROTTLE,
        }
    }

    pub fn with_permissions(mut self, evaluator: impl PermissionEvaluator + 'static) -> Self {
        self.permissions = Some(Arc::new(evaluator));
        self
    }

    pub fn with_shared_permissions(mut self, evaluator: Arc<dyn PermissionEvaluator>) -> Self {
        self.permissions = Some(evaluator);
        self
    }

    pub fn with_cooldowns(mut self, tracker: Arc<CooldownTracker>) -> Self {
        self.cooldowns = tracker;
        self
    }

    pub fn with_notice_throttle(mut self, throttle: Duration) -> Self {
        self.notice_throttle = throttle;
        self
    }

    pub fn permissions(&self) -> Option<&Arc<dyn PermissionEvaluator>> {
        self.permissions.as_ref()
    }

    pub fn cooldowns(&self) -> &Arc<CooldownTracker> {
        &self.cooldowns
    }

    pub fn notice_throttle(&self) -> Duration {
        self.notice_throttle
    }
}

impl Default for DecoratorEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DecoratorEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecoratorEnv")
            .field("permissions", &self.permissions.is_some())
            .field("cooldowns", &self.cooldowns.len())
            .field("notice_throttle", &self.notice_throttle)
            .finish()
    }
}

// =============================================================================
// Layers
// =============================================================================

/// A decorator factory built from one marker.
#[derive(Debug, Clone)]
pub enum DecoratorLayer {
    Permission(PermissionLayer),
    Cooldown(CooldownLayer),
    Log(LogLayer),
    Time(TimeLayer),
}

impl DecoratorLayer {
    /// Parses the marker's configuration once.
    pub fn from_marker(marker: &DecoratorMarker, env: &DecoratorEnv) -> InvocationResult<Self> {
        let kind = marker.kind();
        let failed = |reason: &str| InvocationError::DecoratorConstructionFailed {
            marker: kind,
            reason: reason.to_string(),
        };

        match marker {
            DecoratorMarker::Permission {
                permissions,
                require,
            } => {
                let evaluator = env
                    .permissions
                    .clone()
                    .ok_or_else(|| failed("no permission evaluator is configured"))?;
                Ok(Self::Permission(PermissionLayer::new(
                    evaluator,
                    permissions.clone(),
                    *require,
                )))
            }
            DecoratorMarker::Cooldown { duration, scope } => {
                if duration.is_zero() {
                    return Err(failed("the cooldown duration must be greater than zero"));
                }
                let strategy = env.cooldowns.create(*scope);
                Ok(Self::Cooldown(CooldownLayer::new(
                    strategy,
                    *duration,
                    env.notice_throttle,
                )))
            }
            DecoratorMarker::Log { level } => Ok(Self::Log(LogLayer::new(*level))),
            DecoratorMarker::Time { level } => Ok(Self::Time(TimeLayer::new(*level))),
        }
    }
}

impl Layer<BoxedInvokable> for DecoratorLayer {
    type Service = BoxedInvokable;

    fn layer(&self, inner: BoxedInvokable) -> BoxedInvokable {
        match self {
            Self::Permission(layer) => Arc::new(layer.layer(inner)),
            Self::Cooldown(layer) => Arc::new(layer.layer(inner)),
            Self::Log(layer) => Arc::new(layer.layer(inner)),
            Self::Time(layer) => Arc::new(layer.layer(inner)),
        }
    }
}

// =============================================================================
// Chain construction
// =============================================================================

/// Merges group-level markers into an action's own markers.
///
/// A group marker survives when its kind keeps every declaration or when the
/// action does not declare the same kind. Group markers come first.
pub fn merge_markers(
    group: &[DecoratorMarker],
    action: &[DecoratorMarker],
) -> Vec<DecoratorMarker> {
    group
        .iter()
        .filter(|marker| {
            let kind = marker.kind();
            kind.merge_policy() == MergePolicy::KeepAll
                || !action.iter().any(|own| own.kind() == kind)
        })
        .chain(action)
        .cloned()
        .collect()
}

/// Wraps `root` in one decorator per marker, ordered by priority.
///
/// A marker whose decorator cannot be built is skipped with a warning.
pub fn decorate(
    root: BoxedInvokable,
    markers: &[DecoratorMarker],
    env: &DecoratorEnv,
) -> BoxedInvokable {
    let mut ordered: Vec<&DecoratorMarker> = markers.iter().collect();
    ordered.sort_by_key(|marker| marker.priority());

    ordered.into_iter().rev().fold(root, |inner, marker| {
        match DecoratorLayer::from_marker(marker, env) {
            Ok(layer) => layer.layer(inner),
            Err(e) => {
                warn!(
                    action = %inner.descriptor().name,
                    decorator = %marker.kind(),
                    error = %e,
                    "Skipping decorator"
                );
                inner
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use gantry_core::{
        Ambient, ChannelId, CooldownScope, DecoratorKind, GuildId, LogLevel, MessageEvent, UserId,
        Value,
    };
    use parking_lot::Mutex;

    use crate::converter::ConverterRegistry;
    use crate::handler::ErasedHandler;
    use crate::invokable::{ActionInvokable, InvocationContext, decorator_kinds, depth, root};

    fn counting_action(counter: Arc<AtomicUsize>) -> BoxedInvokable {
        let handler = ErasedHandler::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            "done"
        });
        let action = ActionInvokable::build(
            "count",
            handler,
            &[],
            None,
            false,
            Arc::new(ConverterRegistry::new()),
        )
        .unwrap();
        Arc::new(action)
    }

    fn deny_all() -> DecoratorEnv {
        DecoratorEnv::new().with_permissions(|_: &dyn Ambient, _: &str| false)
    }

    fn guild_event() -> MessageEvent {
        MessageEvent::new(UserId(1), ChannelId(2), "").in_guild(GuildId(3))
    }

    /// Steps taken during an invocation, fed by the handler, the permission
    /// evaluator and the log lines of the log and time decorators.
    #[derive(Clone, Default)]
    struct Trail(Arc<Mutex<Vec<&'static str>>>);

    impl Trail {
        fn push(&self, step: &'static str) {
            self.0.lock().push(step);
        }

        fn steps(&self) -> Vec<&'static str> {
            self.0.lock().clone()
        }
    }

    impl io::Write for Trail {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let line = String::from_utf8_lossy(buf);
            if line.contains("has invoked the action") {
                self.push("log");
            } else if line.contains("Invoked ordered") {
                self.push("time");
            }
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_priority_order() {
        let markers = [
            DecoratorMarker::time(LogLevel::Debug),
            DecoratorMarker::permission(["admin"]),
            DecoratorMarker::log(LogLevel::Info),
        ];
        let chain = decorate(counting_action(Arc::default()), &markers, &deny_all());
        assert_eq!(
            decorator_kinds(&chain),
            [DecoratorKind::Permission, DecoratorKind::Log, DecoratorKind::Time]
        );
        assert_eq!(root(&chain).descriptor().name, "count");
    }

    #[test]
    fn test_execution_order() {
        let trail = Trail::default();

        let checked = trail.clone();
        let env = DecoratorEnv::new().with_permissions(move |_: &dyn Ambient, _: &str| {
            checked.push("permission");
            true
        });
        let called = trail.clone();
        let handler = ErasedHandler::new(move || {
            called.push("handler");
            "done"
        });
        let action = ActionInvokable::build(
            "ordered",
            handler,
            &[],
            None,
            false,
            Arc::new(ConverterRegistry::new()),
        )
        .unwrap();

        let markers = [
            DecoratorMarker::time(LogLevel::Info),
            DecoratorMarker::log(LogLevel::Info),
            DecoratorMarker::cooldown(Duration::from_secs(60), CooldownScope::User),
            DecoratorMarker::permission(["admin"]),
        ];
        let chain = decorate(Arc::new(action), &markers, &env);

        let writer = trail.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_writer(move || writer.clone())
            .finish();
        let event = guild_event();
        tracing::subscriber::with_default(subscriber, || {
            let ctx = InvocationContext::new("", &event);
            assert_eq!(chain.invoke(&ctx), Ok(Value::Text("done".into())));
            assert!(matches!(
                chain.invoke(&ctx),
                Err(InvocationError::CooldownActive { .. })
            ));
        });

        // The second call is stopped by the cooldown after the permission check.
        assert_eq!(
            trail.steps(),
            ["permission", "log", "handler", "time", "permission"]
        );
    }

    #[test]
    fn test_permission_denial_blocks_handler() {
        let counter = Arc::new(AtomicUsize::new(0));
        let markers = [
            DecoratorMarker::time(LogLevel::Debug),
            DecoratorMarker::permission(["admin"]),
            DecoratorMarker::log(LogLevel::Info),
        ];
        let chain = decorate(counting_action(counter.clone()), &markers, &deny_all());

        let event = guild_event();
        let result = chain.invoke(&InvocationContext::new("", &event));
        assert_eq!(result, Err(InvocationError::PermissionDenied(NO_PERMISSION.into())));
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_undecorated_success() {
        let counter = Arc::new(AtomicUsize::new(0));
        let chain = decorate(counting_action(counter.clone()), &[], &DecoratorEnv::new());
        let event = guild_event();
        assert_eq!(
            chain.invoke(&InvocationContext::new("", &event)),
            Ok(Value::Text("done".into()))
        );
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_merge_markers() {
        let group = [
            DecoratorMarker::permission(["mod"]),
            DecoratorMarker::cooldown(Duration::from_secs(60), CooldownScope::User),
            DecoratorMarker::log(LogLevel::Info),
        ];
        let action = [
            DecoratorMarker::permission(["ban"]),
            DecoratorMarker::cooldown(Duration::from_secs(5), CooldownScope::Guild),
        ];

        let merged = merge_markers(&group, &action);
        assert_eq!(
            merged,
            [
                DecoratorMarker::permission(["mod"]),
                DecoratorMarker::log(LogLevel::Info),
                DecoratorMarker::permission(["ban"]),
                DecoratorMarker::cooldown(Duration::from_secs(5), CooldownScope::Guild),
            ]
        );

        let chain = decorate(counting_action(Arc::default()), &merged, &deny_all());
        assert_eq!(depth(&chain), 4);
        assert_eq!(
            decorator_kinds(&chain),
            [
                DecoratorKind::Permission,
                DecoratorKind::Permission,
                DecoratorKind::Cooldown,
                DecoratorKind::Log,
            ]
        );
    }

    #[test]
    fn test_construction_failure_falls_back() {
        let counter = Arc::new(AtomicUsize::new(0));
        let markers = [
            DecoratorMarker::permission(["admin"]),
            DecoratorMarker::cooldown(Duration::ZERO, CooldownScope::User),
            DecoratorMarker::log(LogLevel::Info),
        ];
        let chain = decorate(counting_action(counter.clone()), &markers, &DecoratorEnv::new());

        assert_eq!(decorator_kinds(&chain), [DecoratorKind::Log]);
        let event = guild_event();
        assert!(chain.invoke(&InvocationContext::new("", &event)).is_ok());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_construction_errors() {
        let err = DecoratorLayer::from_marker(
            &DecoratorMarker::permission(["admin"]),
            &DecoratorEnv::new(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            InvocationError::DecoratorConstructionFailed {
                marker: DecoratorKind::Permission,
                ..
            }
        ));
    }
}
