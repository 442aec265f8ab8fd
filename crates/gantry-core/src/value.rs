//! Dynamic values and parameter types.
//!
//! Converters produce [`Value`]s; typed handlers receive them back as Rust
//! types through the [`Parameter`] trait. [`ParamType`] describes the target
//! of a conversion and drives converter lookup.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use crate::error::{ConversionError, ConversionResult};
use crate::event::MessageEvent;
use crate::ids::{ChannelId, GuildId, UserId};

// =============================================================================
// ParamType
// =============================================================================

/// The target type of a handler parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParamType {
    Int,
    Float,
    Bool,
    Char,
    Text,
    List(Box<ParamType>),
    User,
    Channel,
    Guild,
    Event,
    /// An application type carried in [`Value::Object`].
    Object { id: TypeId, name: &'static str },
}

impl ParamType {
    pub fn list_of(element: ParamType) -> Self {
        Self::List(Box::new(element))
    }

    /// The object type for `T`.
    pub fn object<T: 'static>() -> Self {
        Self::Object {
            id: TypeId::of::<T>(),
            name: short_type_name::<T>(),
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Self::List(_))
    }

    /// The element type of a list type.
    pub fn element(&self) -> Option<&ParamType> {
        match self {
            Self::List(element) => Some(element),
            _ => None,
        }
    }

    /// The keyword naming this type inside a usage grammar.
    pub fn alias(&self) -> String {
        match self {
            Self::Int => "int".into(),
            Self::Float => "num".into(),
            Self::Bool => "bool".into(),
            Self::Char => "char".into(),
            Self::Text => "word".into(),
            Self::List(element) => format!("{}[]", element.alias()),
            Self::User => "user".into(),
            Self::Channel => "channel".into(),
            Self::Guild => "guild".into(),
            Self::Event => "event".into(),
            Self::Object { name, .. } => name.to_lowercase(),
        }
    }

    /// The value used for an optional parameter declared without a default.
    pub fn zero_value(&self) -> Option<Value> {
        match self {
            Self::Int => Some(Value::Int(0)),
            Self::Float => Some(Value::Float(0.0)),
            Self::Bool => Some(Value::Bool(false)),
            Self::Text => Some(Value::Text(String::new())),
            Self::List(_) => Some(Value::List(Vec::new())),
            _ => None,
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.alias())
    }
}

fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

// =============================================================================
// Value
// =============================================================================

/// A type-erased application value, compared by identity.
#[derive(Clone)]
pub struct ObjectValue {
    value: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl ObjectValue {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            value: Arc::new(value),
            type_name: short_type_name::<T>(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }
}

impl fmt::Debug for ObjectValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectValue({})", self.type_name)
    }
}

impl PartialEq for ObjectValue {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.value, &other.value)
    }
}

/// A converted argument or a handler result.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Unit,
    Int(i64),
    Float(f64),
    Bool(bool),
    Char(char),
    Text(String),
    List(Vec<Value>),
    User(UserId),
    Channel(ChannelId),
    Guild(GuildId),
    Event(Arc<MessageEvent>),
    Object(ObjectValue),
}

impl Value {
    /// Short name of the variant, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Unit => "unit",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Bool(_) => "bool",
            Self::Char(_) => "char",
            Self::Text(_) => "text",
            Self::List(_) => "list",
            Self::User(_) => "user",
            Self::Channel(_) => "channel",
            Self::Guild(_) => "guild",
            Self::Event(_) => "event",
            Self::Object(object) => object.type_name(),
        }
    }

    pub fn is_unit(&self) -> bool {
        matches!(self, Self::Unit)
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unit => Ok(()),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Char(v) => write!(f, "{v}"),
            Self::Text(v) => f.write_str(v),
            Self::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Self::User(id) => write!(f, "<@{id}>"),
            Self::Channel(id) => write!(f, "<#{id}>"),
            Self::Guild(id) => write!(f, "{id}"),
            Self::Event(event) => f.write_str(&event.content),
            Self::Object(object) => write!(f, "<{}>", object.type_name()),
        }
    }
}

impl From<&Value> for serde_json::Value {
    fn from(value: &Value) -> Self {
        use serde_json::Value as Json;
        match value {
            Value::Unit => Json::Null,
            Value::Int(v) => Json::from(*v),
            Value::Float(v) => Json::from(*v),
            Value::Bool(v) => Json::Bool(*v),
            Value::Char(v) => Json::String(v.to_string()),
            Value::Text(v) => Json::String(v.clone()),
            Value::List(items) => Json::Array(items.iter().map(Json::from).collect()),
            Value::User(id) => Json::from(id.get()),
            Value::Channel(id) => Json::from(id.get()),
            Value::Guild(id) => Json::from(id.get()),
            Value::Event(event) => serde_json::to_value(event.as_ref()).unwrap_or(Json::Null),
            Value::Object(object) => Json::String(format!("<{}>", object.type_name())),
        }
    }
}

// =============================================================================
// Parameter / IntoValue
// =============================================================================

/// A Rust type usable as a handler parameter.
pub trait Parameter: Sized + Send + 'static {
    /// The type converters must produce for this parameter.
    fn param_type() -> ParamType;

    /// Extracts the Rust value from a converted [`Value`].
    fn from_value(value: Value) -> ConversionResult<Self>;

    /// Rejects converted values the Rust type cannot hold, such as an
    /// integer outside its range. Runs during binding, before the handler.
    fn check(_value: &Value) -> ConversionResult<()> {
        Ok(())
    }
}

/// A [`Parameter::check`] function, erased from its type.
pub type ValueCheck = fn(&Value) -> ConversionResult<()>;

/// Conversion of a Rust value into a [`Value`].
pub trait IntoValue {
    fn into_value(self) -> Value;
}

impl IntoValue for Value {
    fn into_value(self) -> Value {
        self
    }
}

impl IntoValue for () {
    fn into_value(self) -> Value {
        Value::Unit
    }
}

impl IntoValue for &str {
    fn into_value(self) -> Value {
        Value::Text(self.to_string())
    }
}

impl<T: IntoValue> IntoValue for Vec<T> {
    fn into_value(self) -> Value {
        Value::List(self.into_iter().map(IntoValue::into_value).collect())
    }
}

macro_rules! impl_int_parameter {
    ($($ty:ty),*) => {
        $(
            impl Parameter for $ty {
                fn param_type() -> ParamType {
                    ParamType::Int
                }

                fn from_value(value: Value) -> ConversionResult<Self> {
                    match value {
                        Value::Int(v) => <$ty>::try_from(v)
                            .map_err(|_| ConversionError::out_of_range(v, stringify!($ty))),
                        other => Err(ConversionError::mismatch("int", other.type_name())),
                    }
                }

                fn check(value: &Value) -> ConversionResult<()> {
                    match value {
                        Value::Int(v) => <$ty>::try_from(*v)
                            .map(drop)
                            .map_err(|_| ConversionError::out_of_range(v, stringify!($ty))),
                        _ => Ok(()),
                    }
                }
            }

            impl IntoValue for $ty {
                fn into_value(self) -> Value {
                    Value::Int(i64::try_from(self).unwrap_or(i64::MAX))
                }
            }
        )*
    };
}

impl_int_parameter!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

macro_rules! impl_simple_parameter {
    ($ty:ty, $param:ident, $variant:ident, $name:literal) => {
        impl Parameter for $ty {
            fn param_type() -> ParamType {
                ParamType::$param
            }

            fn from_value(value: Value) -> ConversionResult<Self> {
                match value {
                    Value::$variant(v) => Ok(v),
                    other => Err(ConversionError::mismatch($name, other.type_name())),
                }
            }
        }

        impl IntoValue for $ty {
            fn into_value(self) -> Value {
                Value::$variant(self)
            }
        }
    };
}

impl_simple_parameter!(f64, Float, Float, "float");
impl_simple_parameter!(bool, Bool, Bool, "bool");
impl_simple_parameter!(char, Char, Char, "char");
impl_simple_parameter!(String, Text, Text, "text");
impl_simple_parameter!(UserId, User, User, "user");
impl_simple_parameter!(ChannelId, Channel, Channel, "channel");
impl_simple_parameter!(GuildId, Guild, Guild, "guild");
impl_simple_parameter!(Arc<MessageEvent>, Event, Event, "event");

impl Parameter for f32 {
    fn param_type() -> ParamType {
        ParamType::Float
    }

    fn from_value(value: Value) -> ConversionResult<Self> {
        f64::from_value(value).map(|v| v as f32)
    }

    fn check(value: &Value) -> ConversionResult<()> {
        match value {
            Value::Float(v) if v.is_finite() && v.abs() > f64::from(f32::MAX) => {
                Err(ConversionError::out_of_range(v, "f32"))
            }
            _ => Ok(()),
        }
    }
}

impl IntoValue for f32 {
    fn into_value(self) -> Value {
        Value::Float(f64::from(self))
    }
}

impl<T: Parameter> Parameter for Vec<T> {
    fn param_type() -> ParamType {
        ParamType::list_of(T::param_type())
    }

    fn from_value(value: Value) -> ConversionResult<Self> {
        match value {
            Value::List(items) => items.into_iter().map(T::from_value).collect(),
            other => Err(ConversionError::mismatch("list", other.type_name())),
        }
    }

    fn check(value: &Value) -> ConversionResult<()> {
        match value {
            Value::List(items) => items.iter().try_for_each(T::check),
            _ => Ok(()),
        }
    }
}

/// Optional parameters: [`Value::Unit`] (an absent default) maps to `None`.
impl<T: Parameter> Parameter for Option<T> {
    fn param_type() -> ParamType {
        T::param_type()
    }

    fn from_value(value: Value) -> ConversionResult<Self> {
        match value {
            Value::Unit => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }

    fn check(value: &Value) -> ConversionResult<()> {
        match value {
            Value::Unit => Ok(()),
            other => T::check(other),
        }
    }
}

/// Wrapper for application types produced by custom converters.
///
/// # Example
///
/// ```rust,ignore
/// fn show(Custom(color): Custom<Color>) -> String {
///     format!("{color:?}")
/// }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Custom<T>(pub T);

impl<T: Clone + Send + Sync + 'static> Parameter for Custom<T> {
    fn param_type() -> ParamType {
        ParamType::object::<T>()
    }

    fn from_value(value: Value) -> ConversionResult<Self> {
        match value {
            Value::Object(object) => object
                .downcast_ref::<T>()
                .cloned()
                .map(Custom)
                .ok_or_else(|| {
                    ConversionError::mismatch(short_type_name::<T>(), object.type_name())
                }),
            other => Err(ConversionError::mismatch(
                short_type_name::<T>(),
                other.type_name(),
            )),
        }
    }
}

impl<T: Send + Sync + 'static> IntoValue for Custom<T> {
    fn into_value(self) -> Value {
        Value::Object(ObjectValue::new(self.0))
    }
}
