//! Precedence-climbing parser.
//!
//! The input is split on `;`. Every segment but the last must read `name = expr` and
//! defines a named subexpression; later segments that mention `name` reuse the very same
//! node. The last segment is the expression itself.
//!
//! Binary operators and their precedence levels:
//!
//! | operator | level | associativity |
//! |----------|-------|---------------|
//! | `+ -`    | 0     | left          |
//! | `* /`    | 1     | left          |
//! | unary `-`| 2     |               |
//! | `^`      | 3     | right         |
//!
//! so `-2^2` is `-(2^2)` and `2^3^2` is `2^(3^2)`.
//!
//! `sigma`, `prod` and `fnInt` take a bound variable as their third argument:
//! `sigma(1, 10, k, k^2)`. Inside the body (the fourth argument) the name refers to the
//! bound variable, including `i`, which otherwise denotes the imaginary unit.

use std::collections::HashMap;
use std::fmt;

use itertools::Itertools;
use log::debug;

use crate::config::ParserConfig;
use crate::custom::CustomFunction;
use crate::errors::ParseError;
use crate::expression::ParsedExpression;
use crate::lexer::{tokenize, Token, TokenKind};
use crate::node::{ExpressionNode, NodeRef};
use crate::operation::{CustomOp, Operation, QUANTIFIERS};
use num_complex::Complex64;

/// Precedence of unary minus, between multiplicative and exponent levels.
const UNARY_MINUS_PRECEDENCE: u8 = 2;

/// Parses `text` using the process-wide angle unit and disabled-feature set.
///
/// # Example
/// ```
/// use lepton_calc::context::Bindings;
///
/// let expr = lepton_calc::parse("2 + 3 * 4").unwrap();
/// assert_eq!(expr.evaluate(&Bindings::new()).unwrap().re(), 14.0);
/// ```
pub fn parse(text: &str) -> Result<ParsedExpression, ParseError> {
    Parser::from_process().parse(text)
}

/// Turns expression strings into [`ParsedExpression`]s.
///
/// A parser holds a [`ParserConfig`] and a table of custom functions. Custom functions
/// shadow built-in functions with the same name.
#[derive(Clone, Default)]
pub struct Parser {
    config: ParserConfig,
    functions: HashMap<String, Box<dyn CustomFunction>>,
}

impl fmt::Debug for Parser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parser")
            .field("config", &self.config)
            .field("functions", &self.functions.keys().sorted().collect::<Vec<_>>())
            .finish()
    }
}

/// Names visible while parsing one segment.
struct Scope<'a> {
    named: &'a HashMap<String, NodeRef>,
    /// Variables bound by enclosing quantifiers, innermost last
    bound: Vec<String>,
}

impl Scope<'_> {
    fn is_bound(&self, name: &str) -> bool {
        self.bound.iter().any(|b| b == name)
    }
}

/// Cursor over the tokens of one segment.
struct TokenStream {
    tokens: Vec<Token>,
    pos: usize,
}

impl TokenStream {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self, offset: usize) -> Option<TokenKind> {
        self.tokens.get(self.pos + offset).map(|t| t.kind)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn next_or_end(&mut self) -> Result<Token, ParseError> {
        self.next().ok_or(ParseError::UnexpectedEnd)
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token, ParseError> {
        let token = self.next_or_end()?;
        if token.kind != kind {
            return Err(unexpected(&token));
        }
        Ok(token)
    }
}

fn unexpected(token: &Token) -> ParseError {
    ParseError::UnexpectedToken {
        token: token.text.clone(),
        position: token.position,
    }
}

/// Precedence, left associativity and operation of a binary operator.
fn binary_operator(text: &str) -> Option<(u8, bool, Operation)> {
    match text {
        "+" => Some((0, true, Operation::Add)),
        "-" => Some((0, true, Operation::Subtract)),
        "*" => Some((1, true, Operation::Multiply)),
        "/" => Some((1, true, Operation::Divide)),
        "^" => Some((3, false, Operation::Power)),
        _ => None,
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_')
}

impl Parser {
    /// Parser with every feature enabled and angles in radians.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ParserConfig) -> Self {
        Self {
            config,
            functions: HashMap::new(),
        }
    }

    /// Parser reading the process-wide angle unit and disabled-feature set.
    pub fn from_process() -> Self {
        Self::with_config(ParserConfig::from_process())
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut ParserConfig {
        &mut self.config
    }

    /// Registers a custom function under `name`.
    pub fn with_function(mut self, name: impl Into<String>, function: impl CustomFunction + 'static) -> Self {
        self.add_function(name, Box::new(function));
        self
    }

    pub fn add_function(&mut self, name: impl Into<String>, function: Box<dyn CustomFunction>) {
        self.functions.insert(name.into(), function);
    }

    pub fn remove_function(&mut self, name: &str) -> bool {
        self.functions.remove(name).is_some()
    }

    /// Parses `text` into an expression tree.
    ///
    /// # Errors
    /// Returns a [`ParseError`] naming the offending token and its byte position, or
    /// [`ParseError::Disabled`] when the input uses a disabled feature.
    pub fn parse(&self, text: &str) -> Result<ParsedExpression, ParseError> {
        let mut named: HashMap<String, NodeRef> = HashMap::new();
        let mut offset = 0;
        let segments: Vec<&str> = text.split(';').collect();
        let (last, definitions) = segments
            .split_last()
            .ok_or(ParseError::UnexpectedEnd)?;

        for segment in definitions {
            let Some((name, body)) = segment.split_once('=') else {
                return Err(ParseError::UnnamedSubexpression {
                    segment: segment.trim().to_string(),
                });
            };
            let name = name.trim();
            if !is_identifier(name) {
                return Err(ParseError::UnnamedSubexpression {
                    segment: segment.trim().to_string(),
                });
            }
            let body_offset = offset + segment.len() - body.len();
            let node = self.parse_segment(body, body_offset, &named)?;
            debug!("named subexpression {name} = {node}");
            named.insert(name.to_string(), node);
            offset += segment.len() + 1;
        }

        let root = self.parse_segment(last, offset, &named)?;
        debug!("parsed {text:?} as {root}");
        Ok(ParsedExpression::new(root))
    }

    fn parse_segment(
        &self,
        text: &str,
        offset: usize,
        named: &HashMap<String, NodeRef>,
    ) -> Result<NodeRef, ParseError> {
        let mut tokens = tokenize(text, &self.config.disabled)?;
        for token in &mut tokens {
            token.position += offset;
        }
        check_balance(&tokens)?;

        let mut stream = TokenStream { tokens, pos: 0 };
        let mut scope = Scope {
            named,
            bound: Vec::new(),
        };
        let node = self.parse_precedence(&mut stream, 0, &mut scope)?;
        if let Some(token) = stream.peek() {
            return Err(ParseError::TrailingText {
                text: stream.tokens[stream.pos..].iter().join(" "),
                position: token.position,
            });
        }
        Ok(node)
    }

    fn parse_precedence(
        &self,
        stream: &mut TokenStream,
        min_precedence: u8,
        scope: &mut Scope,
    ) -> Result<NodeRef, ParseError> {
        let mut left = self.parse_primary(stream, scope)?;
        while let Some(token) = stream.peek() {
            if token.kind != TokenKind::Operator {
                break;
            }
            let Some((precedence, left_assoc, operation)) = binary_operator(&token.text) else {
                return Err(unexpected(token));
            };
            if precedence < min_precedence {
                break;
            }
            stream.next();
            let next_min = if left_assoc { precedence + 1 } else { precedence };
            let right = self.parse_precedence(stream, next_min, scope)?;
            left = ExpressionNode::binary(operation, left, right);
        }
        Ok(left)
    }

    fn parse_primary(
        &self,
        stream: &mut TokenStream,
        scope: &mut Scope,
    ) -> Result<NodeRef, ParseError> {
        let token = stream.next_or_end()?;
        match token.kind {
            TokenKind::ComplexUnit if scope.is_bound(&token.text) => {
                Ok(ExpressionNode::variable(token.text))
            }
            TokenKind::ComplexUnit => Ok(ExpressionNode::leaf(Operation::ComplexNumber(
                Complex64::new(0.0, 1.0),
            ))),
            TokenKind::Number => {
                let value: f64 = token.text.parse().map_err(|_| ParseError::MalformedNumber {
                    text: token.text.clone(),
                    position: token.position,
                })?;
                Ok(ExpressionNode::constant(value))
            }
            TokenKind::MatrixRef => Ok(ExpressionNode::leaf(Operation::Matrix(token.text))),
            TokenKind::Variable => {
                if !scope.is_bound(&token.text) {
                    if let Some(node) = scope.named.get(&token.text) {
                        return Ok(node.clone());
                    }
                }
                Ok(ExpressionNode::variable(token.text))
            }
            TokenKind::LeftParen => {
                let node = self.parse_precedence(stream, 0, scope)?;
                stream.expect(TokenKind::RightParen)?;
                Ok(node)
            }
            TokenKind::FunctionName => self.parse_call(token, stream, scope),
            TokenKind::Operator if token.text == "-" => {
                let operand = self.parse_precedence(stream, UNARY_MINUS_PRECEDENCE, scope)?;
                Ok(ExpressionNode::unary(Operation::Negate, operand))
            }
            _ => Err(unexpected(&token)),
        }
    }

    fn parse_call(
        &self,
        name: Token,
        stream: &mut TokenStream,
        scope: &mut Scope,
    ) -> Result<NodeRef, ParseError> {
        stream.expect(TokenKind::LeftParen)?;

        if let Some(custom) = self.functions.get(&name.text) {
            let operation = Operation::Custom(CustomOp::new(name.text.clone(), custom.clone()));
            let args = self.parse_arguments(stream, scope)?;
            return build_call(&name, operation, args);
        }
        if QUANTIFIERS.contains(&name.text.as_str()) {
            return self.parse_quantifier(&name, stream, scope);
        }
        let operation = Operation::from_function_name(&name.text, self.config.angle_unit)
            .ok_or_else(|| ParseError::UnknownFunction {
                name: name.text.clone(),
                position: name.position,
            })?;
        let args = self.parse_arguments(stream, scope)?;
        build_call(&name, operation, args)
    }

    /// Parses a comma separated argument list up to and including the closing `)`.
    fn parse_arguments(
        &self,
        stream: &mut TokenStream,
        scope: &mut Scope,
    ) -> Result<Vec<NodeRef>, ParseError> {
        let mut args = Vec::new();
        if stream.peek_kind(0) == Some(TokenKind::RightParen) {
            stream.next();
            return Ok(args);
        }
        loop {
            args.push(self.parse_precedence(stream, 0, scope)?);
            let token = stream.next_or_end()?;
            match token.kind {
                TokenKind::Comma => continue,
                TokenKind::RightParen => return Ok(args),
                _ => return Err(unexpected(&token)),
            }
        }
    }

    /// `name(lower, upper, variable, body)`
    fn parse_quantifier(
        &self,
        name: &Token,
        stream: &mut TokenStream,
        scope: &mut Scope,
    ) -> Result<NodeRef, ParseError> {
        let wrong_count = |got: usize| ParseError::WrongArgumentCount {
            name: name.text.clone(),
            expected: "4".to_string(),
            got,
        };
        let separator = |stream: &mut TokenStream, got: usize| -> Result<(), ParseError> {
            let token = stream.next_or_end()?;
            match token.kind {
                TokenKind::Comma => Ok(()),
                TokenKind::RightParen => Err(wrong_count(got)),
                _ => Err(unexpected(&token)),
            }
        };

        let lower = self.parse_precedence(stream, 0, scope)?;
        separator(stream, 1)?;
        let upper = self.parse_precedence(stream, 0, scope)?;
        separator(stream, 2)?;

        let is_name = matches!(
            stream.peek_kind(0),
            Some(TokenKind::Variable | TokenKind::ComplexUnit)
        ) && matches!(
            stream.peek_kind(1),
            Some(TokenKind::Comma | TokenKind::RightParen)
        );
        if !is_name {
            return Err(ParseError::InvalidBoundVariable {
                function: name.text.clone(),
            });
        }
        let variable = stream.next_or_end()?.text;
        separator(stream, 3)?;

        scope.bound.push(variable.clone());
        let body = self.parse_precedence(stream, 0, scope);
        scope.bound.pop();
        let body = body?;

        let token = stream.next_or_end()?;
        match token.kind {
            TokenKind::RightParen => {}
            TokenKind::Comma => return Err(wrong_count(5)),
            _ => return Err(unexpected(&token)),
        }

        let operation = Operation::quantifier(&name.text, variable).ok_or_else(|| {
            ParseError::UnknownFunction {
                name: name.text.clone(),
                position: name.position,
            }
        })?;
        Ok(ExpressionNode::new(operation, vec![lower, upper, body]))
    }
}

fn build_call(
    name: &Token,
    operation: Operation,
    args: Vec<NodeRef>,
) -> Result<NodeRef, ParseError> {
    let arity = operation.arity();
    if !arity.accepts(args.len()) {
        return Err(ParseError::WrongArgumentCount {
            name: name.text.clone(),
            expected: arity.to_string(),
            got: args.len(),
        });
    }
    Ok(ExpressionNode::new(operation, args))
}

fn check_balance(tokens: &[Token]) -> Result<(), ParseError> {
    let mut depth: usize = 0;
    for token in tokens {
        match token.kind {
            TokenKind::LeftParen => depth += 1,
            TokenKind::RightParen => {
                depth = depth
                    .checked_sub(1)
                    .ok_or(ParseError::UnbalancedParentheses)?;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(ParseError::UnbalancedParentheses);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AngleUnit;
    use crate::context::Bindings;
    use crate::custom::ClosureFunction;
    use crate::errors::DisabledFeature;
    use crate::features::{FeatureCategory, FeatureSet};
    use crate::value::Value;

    fn eval(parser: &Parser, text: &str) -> Value {
        parser.parse(text).unwrap().evaluate(&Bindings::new()).unwrap()
    }

    #[test]
    fn test_parse_errors() {
        let parser = Parser::new();
        assert_eq!(parser.parse("(1 + 2"), Err(ParseError::UnbalancedParentheses));
        assert_eq!(parser.parse("1 + 2)"), Err(ParseError::UnbalancedParentheses));
        assert_eq!(parser.parse("1 +"), Err(ParseError::UnexpectedEnd));
        assert_eq!(parser.parse(""), Err(ParseError::UnexpectedEnd));
        assert_eq!(
            parser.parse("1 * * 2"),
            Err(ParseError::UnexpectedToken {
                token: "*".to_string(),
                position: 4
            })
        );
        assert_eq!(
            parser.parse("2 x"),
            Err(ParseError::TrailingText {
                text: "x".to_string(),
                position: 2
            })
        );
        assert_eq!(
            parser.parse("foo(1)"),
            Err(ParseError::UnknownFunction {
                name: "foo".to_string(),
                position: 0
            })
        );
    }

    #[test]
    fn test_argument_counts() {
        let parser = Parser::new();
        assert_eq!(
            parser.parse("sin(1, 2)"),
            Err(ParseError::WrongArgumentCount {
                name: "sin".to_string(),
                expected: "1".to_string(),
                got: 2
            })
        );
        assert!(matches!(
            parser.parse("GCD()"),
            Err(ParseError::WrongArgumentCount { got: 0, .. })
        ));
        assert!(matches!(
            parser.parse("sigma(1, 2, k)"),
            Err(ParseError::WrongArgumentCount { got: 3, .. })
        ));
        assert_eq!(
            parser.parse("sigma(1, 2, 3, 4)"),
            Err(ParseError::InvalidBoundVariable {
                function: "sigma".to_string()
            })
        );
    }

    #[test]
    fn test_named_subexpressions() {
        let parser = Parser::new();
        let bindings = Bindings::from([("x".to_string(), 2.0)]);
        let expr = parser.parse("a = x + 1; b = a * a; b - a").unwrap();
        assert_eq!(expr.evaluate(&bindings), Ok(Value::real(6.0)));
        assert_eq!(
            parser.parse("x + 1; x"),
            Err(ParseError::UnnamedSubexpression {
                segment: "x + 1".to_string()
            })
        );
        assert!(matches!(
            parser.parse("y = 2;"),
            Err(ParseError::UnexpectedEnd)
        ));
    }

    #[test]
    fn test_error_positions_span_segments() {
        let err = Parser::new().parse("y = 1; y + )").unwrap_err();
        assert_eq!(err, ParseError::UnbalancedParentheses);
        let err = Parser::new().parse("y = 1; y * * 2").unwrap_err();
        assert_eq!(
            err,
            ParseError::UnexpectedToken {
                token: "*".to_string(),
                position: 11
            }
        );
    }

    #[test]
    fn test_degrees_captured_at_parse_time() {
        let degrees = Parser::with_config(ParserConfig::new().with_angle_unit(AngleUnit::Degrees));
        let v = eval(&degrees, "sin(30)").re();
        assert!((v - 0.5).abs() < 1e-12);
        let v = eval(&degrees, "acos(0)").re();
        assert!((v - 90.0).abs() < 1e-12);
        let v = eval(&Parser::new(), "sin(30)").re();
        assert!((v - 30f64.sin()).abs() < 1e-12);
    }

    #[test]
    fn test_disabled_features() {
        let mut disabled = FeatureSet::new();
        disabled.disable("sin");
        disabled.disable(FeatureSet::COMPLEX);
        let parser = Parser::with_config(ParserConfig::new().with_disabled(disabled));

        let err = parser.parse("1 + sin(x)").unwrap_err();
        assert_eq!(
            err.disabled(),
            Some(&DisabledFeature::new("sin", FeatureCategory::Function))
        );
        assert!(parser.parse("cos(x)").is_ok());
        assert!(parser.parse("2 + 3i").unwrap_err().is_disabled());
    }

    #[test]
    fn test_custom_functions_shadow_builtins() {
        let parser = Parser::new()
            .with_function("sin", ClosureFunction::new(1, |x| x[0] * 10.0, |_, _| 10.0));
        assert_eq!(eval(&parser, "sin(2)"), Value::real(20.0));
        let mut parser = parser;
        assert!(parser.remove_function("sin"));
        assert!((eval(&parser, "sin(2)").re() - 2f64.sin()).abs() < 1e-15);
    }

    #[test]
    fn test_bound_i_inside_quantifier() {
        let parser = Parser::new();
        assert_eq!(eval(&parser, "sigma(1, 3, i, i^2)"), Value::real(14.0));
        assert_eq!(eval(&parser, "prod(1, 3, k, 2)"), Value::real(8.0));
        // Nested quantifiers with distinct variables
        assert_eq!(eval(&parser, "sigma(1, 2, j, sigma(1, j, k, k))"), Value::real(4.0));
    }

    #[test]
    fn test_functions_of_each_group() {
        let parser = Parser::new();
        assert_eq!(eval(&parser, "factorial(5)"), Value::real(120.0));
        assert_eq!(eval(&parser, "GCD(12, 18, 8)"), Value::real(2.0));
        assert_eq!(eval(&parser, "LCM(4, 6)"), Value::real(12.0));
        assert_eq!(eval(&parser, "nPr(5, 2)"), Value::real(20.0));
        assert_eq!(eval(&parser, "nCr(5, 2)"), Value::real(10.0));
        assert_eq!(eval(&parser, "MOD(7, 3)"), Value::real(1.0));
        assert_eq!(eval(&parser, "and(12, 10)"), Value::real(8.0));
        assert_eq!(eval(&parser, "lls(1, 4)"), Value::real(16.0));
        assert_eq!(eval(&parser, "abs(3 + 4i)"), Value::real(5.0));
        assert_eq!(eval(&parser, "max(2, 7)"), Value::real(7.0));
        assert_eq!(eval(&parser, "step(0) + delta(1)"), Value::real(1.0));
        assert_eq!(eval(&parser, "sqrt(16) + exp(0) + ln(1)"), Value::real(5.0));
    }
}
