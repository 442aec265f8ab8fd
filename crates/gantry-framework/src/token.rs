//! Token model and usage grammar.
//!
//! Every action is described by an immutable list of [`Token`]s built once
//! at registration:
//!
//! - [`ParsingToken`]: one per handler parameter, in declaration order
//! - [`PlaceholderToken`]: literal flavor text from the usage grammar
//!
//! A usage grammar is a string of type aliases and placeholders:
//!
//! ```text
//! int <plus> int       two integers separated by the word "plus"
//! user [please]        a user, optionally followed by "please"
//! word[]               a list of words
//! ```
//!
//! Parameters read from the ambient context never appear in the grammar.

use gantry_core::{
    ConversionResult, EmptyAmbient, MarkerKind, ParamMarker, ParamType, Value, ValueCheck,
};

use crate::converter::{ConversionContext, Converter, ConverterRegistry};
use crate::cursor::Cursor;
use crate::error::{RegistrationError, RegistrationResult};

/// A declared handler parameter.
#[derive(Debug, Clone)]
pub struct ParamDecl {
    pub target: ParamType,
    pub markers: Vec<ParamMarker>,
    /// Range check of the Rust type the handler takes.
    pub check: Option<ValueCheck>,
}

impl ParamDecl {
    pub fn new(target: ParamType) -> Self {
        Self {
            target,
            markers: Vec::new(),
            check: None,
        }
    }

    pub fn with_check(mut self, check: ValueCheck) -> Self {
        self.check = Some(check);
        self
    }

    pub fn with_markers(mut self, markers: impl IntoIterator<Item = ParamMarker>) -> Self {
        self.markers.extend(markers);
        self
    }
}

/// A token bound to a handler parameter.
#[derive(Debug, Clone)]
pub struct ParsingToken {
    /// Position of the parameter in the handler signature.
    pub index: usize,
    pub target: ParamType,
    /// Conversion markers in resolution order.
    pub markers: Vec<MarkerKind>,
    pub optional: bool,
    pub default_value: Option<Value>,
    pub converter: Converter,
    /// False for parameters filled from the ambient context.
    pub is_command_parameter: bool,
    /// Number of leading `markers` passed over when resolving `converter`.
    resolved_through: usize,
    check: Option<ValueCheck>,
}

impl ParsingToken {
    /// Runs the converter, then rejects values the handler type cannot hold.
    ///
    /// A rejected value is a conversion failure like any other, so optional
    /// parameters fall back to their default.
    pub fn convert(&self, ctx: &mut ConversionContext<'_>) -> ConversionResult<Value> {
        let value = self.converter.convert(ctx)?;
        if let Some(check) = self.check {
            check(&value)?;
        }
        Ok(value)
    }

    /// Markers after the one whose converter was selected.
    pub fn remaining_markers(&self) -> &[MarkerKind] {
        &self.markers[self.resolved_through..]
    }

    /// The grammar keyword for this parameter.
    pub fn alias(&self) -> String {
        self.target.alias()
    }
}

/// Literal text expected between parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderToken {
    pub literal: String,
    pub optional: bool,
}

/// One grammar element.
#[derive(Debug, Clone)]
pub enum Token {
    Parsing(ParsingToken),
    Placeholder(PlaceholderToken),
}

impl Token {
    pub fn as_parsing(&self) -> Option<&ParsingToken> {
        match self {
            Self::Parsing(token) => Some(token),
            Self::Placeholder(_) => None,
        }
    }
}

// =============================================================================
// Construction
// =============================================================================

/// Builds the token for one parameter: validates and orders its markers,
/// resolves the converter and parses the default value.
pub fn parsing_token(
    index: usize,
    decl: &ParamDecl,
    registry: &ConverterRegistry,
) -> RegistrationResult<ParsingToken> {
    let kinds: Vec<MarkerKind> = decl.markers.iter().map(ParamMarker::kind).collect();
    registry.rules().validate(&decl.target, &kinds)?;

    let markers = registry.rules().sort(&kinds);
    let (converter, resolved_through) = registry.resolve_indexed(&decl.target, &markers)?;
    let is_command_parameter = !converter.is_ambient();

    let mut token = ParsingToken {
        index,
        target: decl.target.clone(),
        markers,
        optional: false,
        default_value: None,
        converter,
        is_command_parameter,
        resolved_through,
        check: decl.check,
    };

    let unrequired = decl.markers.iter().find_map(|marker| match marker {
        ParamMarker::Unrequired(default) => Some(default.as_str()),
        _ => None,
    });
    if let Some(default) = unrequired {
        token.optional = true;
        token.default_value = Some(parse_default(&token, default, registry)?);
    }

    Ok(token)
}

fn parse_default(
    token: &ParsingToken,
    default: &str,
    registry: &ConverterRegistry,
) -> RegistrationResult<Value> {
    if default.trim().is_empty() {
        return Ok(token.target.zero_value().unwrap_or_default());
    }

    let mut cursor = Cursor::new(default);
    let mut ctx = ConversionContext::new(
        &mut cursor,
        &EmptyAmbient,
        registry,
        &token.target,
        token.remaining_markers(),
    );
    token
        .convert(&mut ctx)
        .map_err(|e| RegistrationError::InvalidDefault {
            index: token.index,
            default: default.to_string(),
            reason: e.to_string(),
        })
}

/// Builds the token list for a handler from its parameters and usage grammar.
///
/// Without a grammar, every parameter is bound in declaration order.
pub fn tokenize(
    params: &[ParamDecl],
    usage: Option<&str>,
    registry: &ConverterRegistry,
) -> RegistrationResult<Vec<Token>> {
    let parsing = params
        .iter()
        .enumerate()
        .map(|(index, decl)| parsing_token(index, decl, registry))
        .collect::<RegistrationResult<Vec<_>>>()?;

    let Some(usage) = usage.filter(|u| !u.trim().is_empty()) else {
        return Ok(parsing.into_iter().map(Token::Parsing).collect());
    };

    let mut pending = parsing.into_iter().peekable();
    let mut tokens = Vec::new();
    let mut grammar = Cursor::new(usage);

    while grammar.has_next() {
        while let Some(token) = pending.next_if(|t| !t.is_command_parameter) {
            tokens.push(Token::Parsing(token));
        }

        if let Some(next) = pending.peek() {
            let mark = grammar.checkpoint();
            let alias = next.alias();
            if grammar
                .next_word()
                .is_some_and(|word| word.eq_ignore_ascii_case(&alias))
                && let Some(token) = pending.next()
            {
                tokens.push(Token::Parsing(token));
                continue;
            }
            grammar.restore(mark);
        }

        if let Some(literal) = grammar.next_surrounded('<', '>') {
            tokens.push(Token::Placeholder(PlaceholderToken {
                literal,
                optional: false,
            }));
        } else if let Some(literal) = grammar.next_surrounded('[', ']') {
            tokens.push(Token::Placeholder(PlaceholderToken {
                literal,
                optional: true,
            }));
        } else {
            let found = grammar.next_word().unwrap_or_default();
            return Err(RegistrationError::MalformedPlaceholder(found));
        }
    }

    for token in pending {
        if token.is_command_parameter {
            return Err(RegistrationError::MissingParameter {
                index: token.index,
                target: token.alias(),
                usage: usage.to_string(),
            });
        }
        tokens.push(Token::Parsing(token));
    }

    Ok(tokens)
}

/// Renders tokens as a help line, e.g. `<int> plus [int]`.
pub fn render_usage(tokens: &[Token]) -> String {
    tokens
        .iter()
        .filter_map(|token| match token {
            Token::Parsing(t) if !t.is_command_parameter => None,
            Token::Parsing(t) if t.optional => Some(format!("[{}]", t.alias())),
            Token::Parsing(t) => Some(format!("<{}>", t.alias())),
            Token::Placeholder(p) if p.optional => Some(format!("[{}]", p.literal)),
            Token::Placeholder(p) => Some(p.literal.clone()),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decl(target: ParamType) -> ParamDecl {
        ParamDecl::new(target)
    }

    fn shape(tokens: &[Token]) -> Vec<String> {
        tokens
            .iter()
            .map(|t| match t {
                Token::Parsing(p) => format!("#{}", p.index),
                Token::Placeholder(p) => p.literal.clone(),
            })
            .collect()
    }

    #[test]
    fn test_no_grammar_binds_in_order() {
        let registry = ConverterRegistry::new();
        let params = [decl(ParamType::Int), decl(ParamType::Text)];
        let tokens = tokenize(&params, None, &registry).unwrap();
        assert_eq!(shape(&tokens), ["#0", "#1"]);
    }

    #[test]
    fn test_grammar_with_placeholders() {
        let registry = ConverterRegistry::new();
        let params = [decl(ParamType::Int), decl(ParamType::Int)];
        let tokens = tokenize(&params, Some("int <plus> INT [please]"), &registry).unwrap();
        assert_eq!(shape(&tokens), ["#0", "plus", "#1", "please"]);
        assert_eq!(render_usage(&tokens), "<int> plus <int> [please]");
    }

    #[test]
    fn test_ambient_parameters_bound_without_grammar() {
        let registry = ConverterRegistry::new();
        let params = [
            decl(ParamType::Guild),
            decl(ParamType::Text),
            decl(ParamType::User).with_markers([ParamMarker::Source]),
        ];
        let tokens = tokenize(&params, Some("<say> word"), &registry).unwrap();
        assert_eq!(shape(&tokens), ["#0", "say", "#1", "#2"]);
        assert!(!tokens[0].as_parsing().unwrap().is_command_parameter);
        assert!(!tokens[3].as_parsing().unwrap().is_command_parameter);
        assert_eq!(render_usage(&tokens), "say <word>");
    }

    #[test]
    fn test_missing_parameter_in_grammar() {
        let registry = ConverterRegistry::new();
        let params = [decl(ParamType::Int), decl(ParamType::Text)];
        let err = tokenize(&params, Some("int"), &registry).unwrap_err();
        assert!(matches!(err, RegistrationError::MissingParameter { index: 1, .. }));
    }

    #[test]
    fn test_malformed_placeholder() {
        let registry = ConverterRegistry::new();
        let err = tokenize(&[decl(ParamType::Int)], Some("int plus"), &registry).unwrap_err();
        assert_eq!(err, RegistrationError::MalformedPlaceholder("plus".into()));
    }

    #[test]
    fn test_list_alias() {
        let registry = ConverterRegistry::new();
        let params = [decl(ParamType::list_of(ParamType::Text))];
        let tokens = tokenize(&params, Some("word[]"), &registry).unwrap();
        assert_eq!(shape(&tokens), ["#0"]);
    }

    #[test]
    fn test_default_values() {
        let registry = ConverterRegistry::new();
        let word = parsing_token(
            0,
            &decl(ParamType::Text).with_markers([ParamMarker::unrequired("world")]),
            &registry,
        )
        .unwrap();
        assert!(word.optional);
        assert_eq!(word.default_value, Some(Value::Text("world".into())));

        let zero = parsing_token(
            0,
            &decl(ParamType::Int).with_markers([ParamMarker::unrequired("")]),
            &registry,
        )
        .unwrap();
        assert_eq!(zero.default_value, Some(Value::Int(0)));

        let guild = parsing_token(
            0,
            &decl(ParamType::Guild).with_markers([ParamMarker::unrequired("")]),
            &registry,
        )
        .unwrap();
        assert_eq!(guild.default_value, Some(Value::Unit));
    }

    #[test]
    fn test_invalid_default() {
        let registry = ConverterRegistry::new();
        let err = parsing_token(
            2,
            &decl(ParamType::Int).with_markers([ParamMarker::unrequired("many")]),
            &registry,
        )
        .unwrap_err();
        assert!(matches!(err, RegistrationError::InvalidDefault { index: 2, .. }));
    }

    #[test]
    fn test_default_outside_type_range() {
        let registry = ConverterRegistry::new();
        let err = parsing_token(
            0,
            &decl(ParamType::Int)
                .with_markers([ParamMarker::unrequired("300")])
                .with_check(<u8 as gantry_core::Parameter>::check),
            &registry,
        )
        .unwrap_err();
        assert!(matches!(err, RegistrationError::InvalidDefault { index: 0, .. }));
    }

    #[test]
    fn test_marker_validation_applies() {
        let registry = ConverterRegistry::new();
        let err = parsing_token(
            0,
            &decl(ParamType::Int).with_markers([ParamMarker::Remaining]),
            &registry,
        )
        .unwrap_err();
        assert!(matches!(err, RegistrationError::MarkerNotAllowed { .. }));
    }

    #[test]
    fn test_list_default_uses_marker_chain() {
        let registry = ConverterRegistry::new();
        let token = parsing_token(
            0,
            &decl(ParamType::list_of(ParamType::Int)).with_markers([
                ParamMarker::unrequired("1 1 2"),
                ParamMarker::Implicit,
                ParamMarker::Unique,
            ]),
            &registry,
        )
        .unwrap();
        assert_eq!(token.markers, [MarkerKind::Unique, MarkerKind::Implicit]);
        assert_eq!(
            token.default_value,
            Some(Value::List(vec![Value::Int(1), Value::Int(2)]))
        );
    }
}
