//! Built-in converters for primitive, list, mention and ambient types.

use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use gantry_core::{
    AmbientKind, ChannelId, ConversionError, ConversionResult, MarkerKind, ParamType, Priority,
    UserId, Value,
};

use super::{ConversionContext, Converter, ConverterRegistry};
use crate::cursor::Cursor;
use crate::predicate::TypePredicate;

static USER_MENTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:<@!?\d+>|\d+\b)").expect("user mention pattern is valid"));
static CHANNEL_MENTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:<#\d+>|\d+\b)").expect("channel mention pattern is valid"));

const TRUE_WORDS: [&str; 5] = ["true", "yes", "t", "y", "1"];

pub(super) fn register_builtins(registry: &mut ConverterRegistry) {
    let exact = TypePredicate::exact;

    // Textual primitives
    registry
        .register(
            exact(ParamType::Int),
            None,
            Converter::textual(|ctx| parse_word::<i64>(ctx.cursor(), "int").map(Value::Int))
                .named("int"),
        )
        .register(
            exact(ParamType::Float),
            None,
            Converter::textual(|ctx| parse_word::<f64>(ctx.cursor(), "number").map(Value::Float))
                .named("float"),
        )
        .register(
            exact(ParamType::Bool),
            None,
            Converter::textual(convert_bool).named("bool"),
        )
        .register(
            exact(ParamType::Char),
            None,
            Converter::textual(convert_char).named("char"),
        )
        .register(
            exact(ParamType::Text),
            None,
            Converter::textual(convert_text).named("text"),
        )
        .register(
            exact(ParamType::Text),
            Some(MarkerKind::Remaining),
            Converter::textual(|ctx| {
                ctx.cursor()
                    .take_remaining()
                    .map(Value::Text)
                    .ok_or_else(|| ConversionError::exhausted("text"))
            })
            .named("remaining"),
        );

    // Lists
    registry
        .register(
            TypePredicate::AnyList,
            None,
            Converter::textual(bracketed_list).named("list"),
        )
        .register(
            TypePredicate::AnyList,
            Some(MarkerKind::Implicit),
            Converter::textual(implicit_list).named("implicit"),
        )
        .register(
            TypePredicate::AnyList,
            Some(MarkerKind::Unique),
            Converter::textual(unique_list).named("unique"),
        );

    // Mentions, with the ambient variants under the source marker
    registry
        .register(
            exact(ParamType::User),
            None,
            Converter::textual(|ctx| {
                mention(ctx.cursor(), &USER_MENTION, "user").map(|id| Value::User(UserId(id)))
            })
            .named("user"),
        )
        .register(
            exact(ParamType::Channel),
            None,
            Converter::textual(|ctx| {
                mention(ctx.cursor(), &CHANNEL_MENTION, "channel")
                    .map(|id| Value::Channel(ChannelId(id)))
            })
            .named("channel"),
        )
        .register(
            exact(ParamType::User),
            Some(MarkerKind::Source),
            Converter::from_ambient(AmbientKind::User).named("source-user"),
        )
        .register(
            exact(ParamType::Channel),
            Some(MarkerKind::Source),
            Converter::from_ambient(AmbientKind::Channel).named("source-channel"),
        )
        .register(
            exact(ParamType::Text),
            Some(MarkerKind::Source),
            Converter::from_ambient(AmbientKind::Content).named("source-content"),
        );

    // Always ambient
    registry
        .register_with_priority(
            exact(ParamType::Guild),
            None,
            Priority::First,
            Converter::from_ambient(AmbientKind::Guild).named("guild"),
        )
        .register_with_priority(
            exact(ParamType::Event),
            None,
            Priority::First,
            Converter::from_ambient(AmbientKind::Event).named("event"),
        );
}

// =============================================================================
// Primitive helpers
// =============================================================================

fn parse_word<T: FromStr>(cursor: &mut Cursor, expected: &str) -> ConversionResult<T> {
    let mark = cursor.checkpoint();
    let word = cursor
        .next_word()
        .ok_or_else(|| ConversionError::exhausted(expected))?;
    match word.parse() {
        Ok(value) => Ok(value),
        Err(_) => {
            cursor.restore(mark);
            Err(ConversionError::invalid(expected, word))
        }
    }
}

fn convert_bool(ctx: &mut ConversionContext<'_>) -> ConversionResult<Value> {
    let word = ctx
        .cursor()
        .next_word()
        .ok_or_else(|| ConversionError::exhausted("bool"))?;
    let word = word.to_lowercase();
    Ok(Value::Bool(TRUE_WORDS.contains(&word.as_str())))
}

fn convert_char(ctx: &mut ConversionContext<'_>) -> ConversionResult<Value> {
    let cursor = ctx.cursor();
    let mark = cursor.checkpoint();
    let word = cursor
        .next_word()
        .ok_or_else(|| ConversionError::exhausted("char"))?;
    let mut chars = word.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(Value::Char(c)),
        _ => {
            cursor.restore(mark);
            Err(ConversionError::invalid("char", word))
        }
    }
}

/// A single word, or a double-quoted phrase.
fn convert_text(ctx: &mut ConversionContext<'_>) -> ConversionResult<Value> {
    let cursor = ctx.cursor();
    if cursor.is_next('"')
        && let Some(quoted) = cursor.next_surrounded('"', '"')
    {
        return Ok(Value::Text(quoted));
    }
    cursor
        .next_word()
        .map(Value::Text)
        .ok_or_else(|| ConversionError::exhausted("word"))
}

fn mention(cursor: &mut Cursor, pattern: &Regex, expected: &str) -> ConversionResult<u64> {
    if !cursor.has_next() {
        return Err(ConversionError::exhausted(expected));
    }
    let mark = cursor.checkpoint();
    let Some(found) = cursor.next_matching(pattern) else {
        let found = cursor.peek(32).split_whitespace().next().unwrap_or("").to_string();
        return Err(ConversionError::invalid(expected, found));
    };
    let digits: String = found.chars().filter(char::is_ascii_digit).collect();
    digits.parse().map_err(|_| {
        cursor.restore(mark);
        ConversionError::invalid(expected, found)
    })
}

// =============================================================================
// List helpers
// =============================================================================

fn element_type(ctx: &ConversionContext<'_>) -> ConversionResult<ParamType> {
    ctx.target()
        .element()
        .cloned()
        .ok_or_else(|| ConversionError::mismatch("list", "scalar"))
}

/// `[a b c]`, with each element converted by its generic converter.
fn bracketed_list(ctx: &mut ConversionContext<'_>) -> ConversionResult<Value> {
    let element = element_type(ctx)?;
    let cursor = ctx.cursor();
    if !cursor.has_next() {
        return Err(ConversionError::exhausted("list"));
    }
    let mark = cursor.checkpoint();
    let Some(inner) = cursor.next_surrounded('[', ']') else {
        return Err(ConversionError::invalid("list", cursor.remaining().trim()));
    };

    let mut items = Cursor::new(inner);
    let mut values = Vec::new();
    while items.has_next() {
        match ctx.convert_in(&mut items, &element) {
            Ok(value) => values.push(value),
            Err(e) => {
                ctx.cursor().restore(mark);
                return Err(e);
            }
        }
    }
    Ok(Value::List(values))
}

/// The bracketed form, or else one or more bare elements up to the first
/// element that fails to convert.
fn implicit_list(ctx: &mut ConversionContext<'_>) -> ConversionResult<Value> {
    if ctx.cursor().is_next('[') {
        return bracketed_list(ctx);
    }

    let element = element_type(ctx)?;
    let mut values = Vec::new();
    while ctx.cursor().has_next() {
        let mark = ctx.cursor().checkpoint();
        match ctx.convert_as(&element) {
            Ok(value) => values.push(value),
            Err(e) => {
                ctx.cursor().restore(mark);
                if values.is_empty() {
                    return Err(e);
                }
                break;
            }
        }
    }

    if values.is_empty() {
        return Err(ConversionError::exhausted("list"));
    }
    Ok(Value::List(values))
}

/// Delegates to the next converter, then drops repeated elements.
fn unique_list(ctx: &mut ConversionContext<'_>) -> ConversionResult<Value> {
    match ctx.convert_next()? {
        Value::List(items) => {
            let mut unique: Vec<Value> = Vec::with_capacity(items.len());
            for item in items {
                if !unique.contains(&item) {
                    unique.push(item);
                }
            }
            Ok(Value::List(unique))
        }
        other => Err(ConversionError::mismatch("list", other.type_name())),
    }
}
