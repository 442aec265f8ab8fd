//! Typed handler functions.
//!
//! Any `Fn` whose arguments implement [`Parameter`] and whose return type
//! implements [`IntoOutcome`] can be registered as a handler:
//!
//! ```rust,ignore
//! fn add(a: i64, b: i64) -> i64 {
//!     a + b
//! }
//!
//! fn greet(user: UserId, name: Option<String>) -> String {
//!     format!("Hello {}, I am {}", user, name.unwrap_or_default())
//! }
//! ```
//!
//! The parameter types are read once at registration to build the token
//! list; at invocation the bound values are converted back into the
//! argument types.

use std::fmt;
use std::sync::Arc;

use gantry_core::{
    IntoValue, InvocationError, InvocationResult, ParamType, Parameter, Value, ValueCheck,
};

// =============================================================================
// Handler results
// =============================================================================

/// Conversion of a handler's return value into an invocation result.
pub trait IntoOutcome {
    fn into_outcome(self) -> InvocationResult;
}

macro_rules! impl_into_outcome {
    ($($ty:ty),*) => {
        $(
            impl IntoOutcome for $ty {
                fn into_outcome(self) -> InvocationResult {
                    Ok(self.into_value())
                }
            }
        )*
    };
}

impl_into_outcome!((), Value, String, &'static str, i32, i64, u32, u64, usize, f64, bool, char);

impl<T: IntoValue> IntoOutcome for Option<T> {
    fn into_outcome(self) -> InvocationResult {
        Ok(self.map_or(Value::Unit, IntoValue::into_value))
    }
}

impl<T: IntoValue> IntoOutcome for Vec<T> {
    fn into_outcome(self) -> InvocationResult {
        Ok(self.into_value())
    }
}

impl<T: IntoValue, E: fmt::Display> IntoOutcome for Result<T, E> {
    fn into_outcome(self) -> InvocationResult {
        self.map(IntoValue::into_value)
            .map_err(InvocationError::handler)
    }
}

// =============================================================================
// Handler trait
// =============================================================================

/// A function usable as an action handler.
///
/// `Args` is a tuple of the parameter types; it only exists to keep the
/// implementations for different arities apart.
pub trait Handler<Args>: Send + Sync + 'static {
    /// The declared parameter types, in order.
    fn param_types(&self) -> Vec<ParamType>;

    /// The range checks of the parameter types, in order.
    fn param_checks(&self) -> Vec<ValueCheck>;

    /// Calls the handler with bound values.
    fn call(&self, args: Vec<Value>) -> InvocationResult;
}

macro_rules! impl_handler {
    ($($ty:ident),*) => {
        #[allow(non_snake_case, unused_mut, unused_variables)]
        impl<F, R, $($ty,)*> Handler<($($ty,)*)> for F
        where
            F: Fn($($ty),*) -> R + Send + Sync + 'static,
            R: IntoOutcome,
            $($ty: Parameter,)*
        {
            fn param_types(&self) -> Vec<ParamType> {
                vec![$($ty::param_type()),*]
            }

            fn param_checks(&self) -> Vec<ValueCheck> {
                vec![$($ty::check as ValueCheck),*]
            }

            fn call(&self, args: Vec<Value>) -> InvocationResult {
                let mut args = args.into_iter();
                $(
                    let $ty = $ty::from_value(args.next().unwrap_or_default())?;
                )*
                (self)($($ty),*).into_outcome()
            }
        }
    };
}

impl_handler!();
impl_handler!(T1);
impl_handler!(T1, T2);
impl_handler!(T1, T2, T3);
impl_handler!(T1, T2, T3, T4);
impl_handler!(T1, T2, T3, T4, T5);
impl_handler!(T1, T2, T3, T4, T5, T6);
impl_handler!(T1, T2, T3, T4, T5, T6, T7);
impl_handler!(T1, T2, T3, T4, T5, T6, T7, T8);
impl_handler!(T1, T2, T3, T4, T5, T6, T7, T8, T9);
impl_handler!(T1, T2, T3, T4, T5, T6, T7, T8, T9, T10);
impl_handler!(T1, T2, T3, T4, T5, T6, T7, T8, T9, T10, T11);
impl_handler!(T1, T2, T3, T4, T5, T6, T7, T8, T9, T10, T11, T12);

// =============================================================================
// Type erasure
// =============================================================================

type CallFn = dyn Fn(Vec<Value>) -> InvocationResult + Send + Sync;

/// A handler with its argument types erased.
#[derive(Clone)]
pub struct ErasedHandler {
    params: Vec<ParamType>,
    checks: Vec<ValueCheck>,
    call: Arc<CallFn>,
}

impl ErasedHandler {
    pub fn new<H, Args>(handler: H) -> Self
    where
        H: Handler<Args>,
        Args: 'static,
    {
        Self {
            params: handler.param_types(),
            checks: handler.param_checks(),
            call: Arc::new(move |args| handler.call(args)),
        }
    }

    pub fn params(&self) -> &[ParamType] {
        &self.params
    }

    pub fn checks(&self) -> &[ValueCheck] {
        &self.checks
    }

    pub fn call(&self, args: Vec<Value>) -> InvocationResult {
        (self.call)(args)
    }
}

impl fmt::Debug for ErasedHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErasedHandler")
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gantry_core::UserId;

    fn add(a: i64, b: i64) -> i64 {
        a + b
    }

    fn fallible(n: u8) -> Result<String, String> {
        if n == 0 {
            Err("zero is not allowed".into())
        } else {
            Ok(n.to_string())
        }
    }

    #[test]
    fn test_param_types() {
        let handler = ErasedHandler::new(add);
        assert_eq!(handler.params(), [ParamType::Int, ParamType::Int]);

        let handler = ErasedHandler::new(|_: UserId, _: Vec<String>| ());
        assert_eq!(
            handler.params(),
            [ParamType::User, ParamType::list_of(ParamType::Text)]
        );

        let handler = ErasedHandler::new(|| "pong");
        assert!(handler.params().is_empty());
    }

    #[test]
    fn test_call() {
        let handler = ErasedHandler::new(add);
        assert_eq!(handler.call(vec![Value::Int(2), Value::Int(3)]), Ok(Value::Int(5)));
    }

    #[test]
    fn test_call_type_mismatch() {
        let handler = ErasedHandler::new(add);
        let result = handler.call(vec![Value::Int(2), Value::Text("x".into())]);
        assert!(matches!(result, Err(InvocationError::ConversionFailed(_))));
    }

    #[test]
    fn test_handler_error() {
        let handler = ErasedHandler::new(fallible);
        assert_eq!(handler.call(vec![Value::Int(4)]), Ok(Value::Text("4".into())));
        assert_eq!(
            handler.call(vec![Value::Int(0)]),
            Err(InvocationError::Handler("zero is not allowed".into()))
        );
    }

    #[test]
    fn test_optional_result() {
        let handler = ErasedHandler::new(|flag: bool| flag.then_some("yes"));
        assert_eq!(handler.call(vec![Value::Bool(false)]), Ok(Value::Unit));
    }
}
