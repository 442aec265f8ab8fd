use std::sync::Arc;
use std::time::Duration;

use gantry_core::{DecoratorKind, InvocationError, InvocationResult};
use tower_layer::Layer;

use crate::cooldown::{Acquire, CooldownStrategy};
use crate::invokable::{ActionDescriptor, BoxedInvokable, InvocationContext, Invokable};

#[derive(Debug, Clone)]
pub struct CooldownLayer {
    strategy: Arc<CooldownStrategy>,
    duration: Duration,
    notice_throttle: Duration,
}

impl CooldownLayer {
    pub fn new(
        strategy: Arc<CooldownStrategy>,
        duration: Duration,
        notice_throttle: Duration,
    ) -> Self {
        Self {
            strategy,
            duration,
            notice_throttle,
        }
    }
}

impl Layer<BoxedInvokable> for CooldownLayer {
    type Service = CooldownDecorator;

    fn layer(&self, inner: BoxedInvokable) -> CooldownDecorator {
        CooldownDecorator {
            layer: self.clone(),
            inner,
        }
    }
}

/// Rate limits the inner invokable per subject.
///
/// The subject's slot is reserved before the inner invokable runs and given
/// back if it fails, so failed parses do not put the subject on cooldown and
/// concurrent messages cannot both get through.
pub struct CooldownDecorator {
    layer: CooldownLayer,
    inner: BoxedInvokable,
}

impl CooldownDecorator {
    pub fn strategy(&self) -> &Arc<CooldownStrategy> {
        &self.layer.strategy
    }
}

impl Invokable for CooldownDecorator {
    fn invoke(&self, ctx: &InvocationContext<'_>) -> InvocationResult {
        let strategy = &self.layer.strategy;
        let Some(key) = strategy.key(ctx.ambient()) else {
            return self.inner.invoke(ctx);
        };

        let layer = &self.layer;
        let timer = match strategy.try_acquire(key, layer.duration, layer.notice_throttle) {
            Acquire::Reserved(timer) => timer,
            Acquire::Cooling { remaining, notify } => {
                return Err(InvocationError::CooldownActive { remaining, notify });
            }
        };

        let result = self.inner.invoke(ctx);
        if result.is_err() {
            strategy.release(key, timer);
        }
        result
    }

    fn descriptor(&self) -> &ActionDescriptor {
        self.inner.descriptor()
    }

    fn inner(&self) -> Option<&BoxedInvokable> {
        Some(&self.inner)
    }

    fn decorator(&self) -> Option<DecoratorKind> {
        Some(DecoratorKind::Cooldown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;

    use gantry_core::{Ambient, ChannelId, CooldownScope, MessageEvent, UserId, Value};

    use crate::converter::ConverterRegistry;
    use crate::handler::ErasedHandler;
    use crate::invokable::ActionInvokable;

    fn limited(duration: Duration) -> CooldownDecorator {
        limited_with(duration, ErasedHandler::new(|n: i64| n * 2))
    }

    fn limited_with(duration: Duration, handler: ErasedHandler) -> CooldownDecorator {
        let action = ActionInvokable::build(
            "double",
            handler,
            &[],
            None,
            false,
            Arc::new(ConverterRegistry::new()),
        )
        .unwrap();
        let strategy = Arc::new(CooldownStrategy::new(CooldownScope::User));
        CooldownLayer::new(strategy, duration, Duration::from_secs(15)).layer(Arc::new(action))
    }

    fn invoke(decorator: &CooldownDecorator, user: u64, text: &str) -> InvocationResult {
        let event = MessageEvent::new(UserId(user), ChannelId(1), text);
        decorator.invoke(&InvocationContext::new(text, &event))
    }

    #[test]
    fn test_second_call_is_rejected() {
        let decorator = limited(Duration::from_secs(60));
        assert_eq!(invoke(&decorator, 1, "2"), Ok(Value::Int(4)));

        let second = invoke(&decorator, 1, "2");
        assert!(matches!(
            second,
            Err(InvocationError::CooldownActive { notify: true, .. })
        ));
        let third = invoke(&decorator, 1, "2");
        assert!(matches!(
            third,
            Err(InvocationError::CooldownActive { notify: false, .. })
        ));
        assert!(!third.unwrap_err().should_display());
    }

    #[test]
    fn test_failure_does_not_start_cooldown() {
        let decorator = limited(Duration::from_secs(60));
        assert!(matches!(
            invoke(&decorator, 1, "two"),
            Err(InvocationError::ConversionFailed(_))
        ));
        assert_eq!(invoke(&decorator, 1, "2"), Ok(Value::Int(4)));
    }

    #[test]
    fn test_concurrent_calls_pass_once() {
        let decorator = limited_with(
            Duration::from_secs(60),
            ErasedHandler::new(|n: i64| {
                std::thread::sleep(Duration::from_millis(20));
                n * 2
            }),
        );
        let barrier = Barrier::new(4);

        let results: Vec<InvocationResult> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    scope.spawn(|| {
                        barrier.wait();
                        invoke(&decorator, 1, "2")
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().unwrap())
                .collect()
        });

        assert_eq!(results.iter().filter(|result| result.is_ok()).count(), 1);
        assert!(results.iter().all(|result| {
            matches!(result, Ok(_) | Err(InvocationError::CooldownActive { .. }))
        }));
    }

    #[test]
    fn test_subjects_do_not_interfere() {
        let decorator = limited(Duration::from_secs(60));
        assert!(invoke(&decorator, 1, "1").is_ok());
        assert!(invoke(&decorator, 2, "1").is_ok());
        assert!(invoke(&decorator, 1, "1").is_err());
    }

    #[test]
    fn test_expired_timer_resets() {
        let decorator = limited(Duration::from_millis(20));
        assert!(invoke(&decorator, 1, "1").is_ok());
        std::thread::sleep(Duration::from_millis(40));
        assert!(invoke(&decorator, 1, "1").is_ok());

        let event = MessageEvent::new(UserId(1), ChannelId(1), "");
        let key = decorator.strategy().key(&event as &dyn Ambient).unwrap();
        assert!(decorator.strategy().timer(key).is_some());
        assert!(invoke(&decorator, 1, "1").is_err());
    }
}
