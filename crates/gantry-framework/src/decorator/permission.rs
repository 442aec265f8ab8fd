use std::sync::Arc;

use gantry_core::{Ambient, DecoratorKind, InvocationError, InvocationResult, Require};
use tower_layer::Layer;
use tracing::debug;

use crate::invokable::{ActionDescriptor, BoxedInvokable, InvocationContext, Invokable};

/// Denial message outside of a guild.
pub const PRIVATE_MESSAGE: &str = "This command cannot be used in a private message";
/// Denial message for members lacking the permissions.
pub const NO_PERMISSION: &str = "You do not have permission to use this command";

/// The application's permission check.
///
/// Any `Fn(&dyn Ambient, &str) -> bool` is an evaluator that knows no owners.
pub trait PermissionEvaluator: Send + Sync {
    /// Owners bypass every permission check.
    fn is_owner(&self, _ambient: &dyn Ambient) -> bool {
        false
    }

    fn has_permission(&self, ambient: &dyn Ambient, permission: &str) -> bool;
}

impl<F> PermissionEvaluator for F
where
    F: Fn(&dyn Ambient, &str) -> bool + Send + Sync,
{
    fn has_permission(&self, ambient: &dyn Ambient, permission: &str) -> bool {
        self(ambient, permission)
    }
}

#[derive(Clone)]
pub struct PermissionLayer {
    evaluator: Arc<dyn PermissionEvaluator>,
    permissions: Arc<[String]>,
    require: Require,
}

impl PermissionLayer {
    pub fn new(
        evaluator: Arc<dyn PermissionEvaluator>,
        permissions: Vec<String>,
        require: Require,
    ) -> Self {
        Self {
            evaluator,
            permissions: permissions.into(),
            require,
        }
    }
}

impl std::fmt::Debug for PermissionLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionLayer")
            .field("permissions", &self.permissions)
            .field("require", &self.require)
            .finish_non_exhaustive()
    }
}

impl Layer<BoxedInvokable> for PermissionLayer {
    type Service = PermissionDecorator;

    fn layer(&self, inner: BoxedInvokable) -> PermissionDecorator {
        PermissionDecorator {
            layer: self.clone(),
            inner,
        }
    }
}

/// Short-circuits with [`InvocationError::PermissionDenied`] unless the
/// invoking member holds the required permissions.
pub struct PermissionDecorator {
    layer: PermissionLayer,
    inner: BoxedInvokable,
}

impl PermissionDecorator {
    fn is_granted(&self, ambient: &dyn Ambient) -> bool {
        let evaluator = &self.layer.evaluator;
        let mut permissions = self.layer.permissions.iter();
        match self.layer.require {
            Require::All => permissions.all(|p| evaluator.has_permission(ambient, p)),
            Require::Any => {
                self.layer.permissions.is_empty()
                    || permissions.any(|p| evaluator.has_permission(ambient, p))
            }
        }
    }
}

impl Invokable for PermissionDecorator {
    fn invoke(&self, ctx: &InvocationContext<'_>) -> InvocationResult {
        let ambient = ctx.ambient();
        if self.layer.evaluator.is_owner(ambient) {
            return self.inner.invoke(ctx);
        }

        if ambient.guild_id().is_none() {
            return Err(InvocationError::PermissionDenied(PRIVATE_MESSAGE.into()));
        }
        if !self.is_granted(ambient) {
            debug!(
                action = %self.descriptor().name,
                permissions = ?self.layer.permissions,
                "Permission denied"
            );
            return Err(InvocationError::PermissionDenied(NO_PERMISSION.into()));
        }
        self.inner.invoke(ctx)
    }

    fn descriptor(&self) -> &ActionDescriptor {
        self.inner.descriptor()
    }

    fn inner(&self) -> Option<&BoxedInvokable> {
        Some(&self.inner)
    }

    fn decorator(&self) -> Option<DecoratorKind> {
        Some(DecoratorKind::Permission)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gantry_core::{ChannelId, GuildId, MessageEvent, UserId, Value};

    use crate::converter::ConverterRegistry;
    use crate::handler::ErasedHandler;
    use crate::invokable::ActionInvokable;

    struct Roles;

    impl PermissionEvaluator for Roles {
        fn is_owner(&self, ambient: &dyn Ambient) -> bool {
            ambient.user_id() == Some(UserId(1))
        }

        // User 2 may kick, user 3 may kick and ban.
        fn has_permission(&self, ambient: &dyn Ambient, permission: &str) -> bool {
            match ambient.user_id().map(UserId::get) {
                Some(2) => permission == "kick",
                Some(3) => matches!(permission, "kick" | "ban"),
                _ => false,
            }
        }
    }

    fn guarded(permissions: &[&str], require: Require) -> PermissionDecorator {
        let action = ActionInvokable::build(
            "moderate",
            ErasedHandler::new(|| "ok"),
            &[],
            None,
            false,
            Arc::new(ConverterRegistry::new()),
        )
        .unwrap();
        PermissionLayer::new(
            Arc::new(Roles),
            permissions.iter().map(|p| p.to_string()).collect(),
            require,
        )
        .layer(Arc::new(action))
    }

    fn invoke(decorator: &PermissionDecorator, event: MessageEvent) -> InvocationResult {
        decorator.invoke(&InvocationContext::new("", &event))
    }

    fn from(user: u64) -> MessageEvent {
        MessageEvent::new(UserId(user), ChannelId(10), "").in_guild(GuildId(20))
    }

    #[test]
    fn test_require_all() {
        let decorator = guarded(&["kick", "ban"], Require::All);
        assert_eq!(
            invoke(&decorator, from(2)),
            Err(InvocationError::PermissionDenied(NO_PERMISSION.into()))
        );
        assert_eq!(invoke(&decorator, from(3)), Ok(Value::Text("ok".into())));
    }

    #[test]
    fn test_require_any() {
        let decorator = guarded(&["kick", "ban"], Require::Any);
        assert!(invoke(&decorator, from(2)).is_ok());
        assert!(invoke(&decorator, from(4)).is_err());
    }

    #[test]
    fn test_private_message_denied() {
        let decorator = guarded(&["kick"], Require::All);
        let event = MessageEvent::new(UserId(3), ChannelId(10), "");
        assert_eq!(
            invoke(&decorator, event),
            Err(InvocationError::PermissionDenied(PRIVATE_MESSAGE.into()))
        );
    }

    #[test]
    fn test_owner_bypass() {
        let decorator = guarded(&["kick", "ban"], Require::All);
        assert!(invoke(&decorator, from(1)).is_ok());
        assert!(invoke(&decorator, MessageEvent::new(UserId(1), ChannelId(10), "")).is_ok());
    }
}
