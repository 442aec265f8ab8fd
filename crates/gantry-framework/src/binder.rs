//! Parameter binding.
//!
//! Drives a [`Cursor`] across an action's tokens and produces one value per
//! [`ParsingToken`]. The first hard failure aborts the whole binding; an
//! optional token absorbs its own failure by using its default value.

use gantry_core::{Ambient, InvocationError, InvocationResult, Value};

use crate::converter::{ConversionContext, ConverterRegistry};
use crate::cursor::Cursor;
use crate::token::{ParsingToken, PlaceholderToken, Token};

/// Binds `tokens` against the cursor.
///
/// When `may_have_leftover` is false, text left over after the last token
/// is reported as too many parameters.
pub fn bind(
    tokens: &[Token],
    cursor: &mut Cursor,
    ambient: &dyn Ambient,
    registry: &ConverterRegistry,
    may_have_leftover: bool,
) -> InvocationResult<Vec<Value>> {
    let mut args = Vec::with_capacity(tokens.len());

    for token in tokens {
        match token {
            Token::Parsing(token) => {
                args.push(bind_parameter(token, cursor, ambient, registry)?);
            }
            Token::Placeholder(token) => bind_placeholder(token, cursor)?,
        }
    }

    if cursor.has_next() && !may_have_leftover {
        return Err(InvocationError::too_many());
    }
    Ok(args)
}

fn bind_parameter(
    token: &ParsingToken,
    cursor: &mut Cursor,
    ambient: &dyn Ambient,
    registry: &ConverterRegistry,
) -> InvocationResult<Value> {
    let fallback = || token.default_value.clone().unwrap_or_default();

    if token.is_command_parameter && !cursor.has_next() {
        return if token.optional {
            Ok(fallback())
        } else {
            Err(InvocationError::too_few())
        };
    }

    let mark = cursor.checkpoint();
    let mut ctx = ConversionContext::new(
        cursor,
        ambient,
        registry,
        &token.target,
        token.remaining_markers(),
    );
    match token.convert(&mut ctx) {
        Ok(value) => Ok(value),
        Err(_) if token.optional => {
            cursor.restore(mark);
            Ok(fallback())
        }
        Err(e) => {
            cursor.restore(mark);
            Err(e.into())
        }
    }
}

fn bind_placeholder(token: &PlaceholderToken, cursor: &mut Cursor) -> InvocationResult<()> {
    let mark = cursor.checkpoint();
    cursor.skip_whitespace();
    if cursor.consume_literal(&token.literal) {
        return Ok(());
    }
    cursor.restore(mark);
    if token.optional {
        Ok(())
    } else {
        Err(InvocationError::literal(&token.literal))
    }
}
