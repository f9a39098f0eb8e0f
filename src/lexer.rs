//! Tokenizer for calculator expressions.
//!
//! [`tokenize`] turns an input string into a flat, order-preserving list of [`Token`]s.
//! Whitespace is dropped. Numeric literals are expanded by a small sub-lexer so that the
//! parser never has to understand imaginary units or scientific notation:
//!
//! - `3i` becomes `( 3 * i )`
//! - `2.5e-3` becomes `( 2.5 * 10 ^ ( - 3 ) )`
//! - `1e3i` becomes `( 1 * 10 ^ ( 3 ) * i )`
//!
//! Disabled features are rejected while tokenizing: the imaginary unit, matrix references,
//! disabled function names and, if variables are disabled, any bare identifier.

use std::fmt;

use log::trace;

use crate::errors::ParseError;
use crate::features::{FeatureCategory, FeatureSet};

/// Classification of a [`Token`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Number,
    ComplexUnit,
    MatrixRef,
    Operator,
    Variable,
    FunctionName,
    LeftParen,
    RightParen,
    Comma,
}

/// A classified slice of the input.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub text: String,
    pub kind: TokenKind,
    /// Byte offset of the token (or of the literal it was expanded from) in the input.
    pub position: usize,
}

impl Token {
    pub fn new(text: impl Into<String>, kind: TokenKind, position: usize) -> Self {
        Self {
            text: text.into(),
            kind,
            position,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Binary and unary operator characters.
pub const OPERATORS: &str = "+-*/^";

fn ends_identifier(c: char) -> bool {
    OPERATORS.contains(c) || matches!(c, ',' | '(' | ')' | '[') || c.is_whitespace()
}

/// Splits `text` into tokens.
///
/// # Arguments
/// * `text` - The expression source
/// * `disabled` - Features the tokenizer must refuse
///
/// # Errors
/// Returns `ParseError::Disabled` when a disabled feature is encountered, and
/// `ParseError::MalformedNumber` / `ParseError::UnexpectedToken` for literals that cannot
/// be read.
///
/// # Example
/// ```
/// use lepton_calc::features::FeatureSet;
/// use lepton_calc::lexer::{tokenize, TokenKind};
///
/// let tokens = tokenize("sin(x) + 3i", &FeatureSet::new()).unwrap();
/// let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
/// assert_eq!(kinds[0], TokenKind::FunctionName);
/// assert_eq!(kinds[2], TokenKind::Variable);
/// assert!(kinds.contains(&TokenKind::ComplexUnit));
/// ```
pub fn tokenize(text: &str, disabled: &FeatureSet) -> Result<Vec<Token>, ParseError> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < chars.len() {
        let (offset, c) = chars[pos];
        match c {
            '(' => {
                tokens.push(Token::new("(", TokenKind::LeftParen, offset));
                pos += 1;
            }
            ')' => {
                tokens.push(Token::new(")", TokenKind::RightParen, offset));
                pos += 1;
            }
            ',' => {
                tokens.push(Token::new(",", TokenKind::Comma, offset));
                pos += 1;
            }
            c if OPERATORS.contains(c) => {
                tokens.push(Token::new(c.to_string(), TokenKind::Operator, offset));
                pos += 1;
            }
            c if c.is_whitespace() => {
                pos += 1;
            }
            '[' => {
                disabled.check(FeatureCategory::Matrix)?;
                match (chars.get(pos + 1), chars.get(pos + 2)) {
                    (Some(&(_, name)), Some(&(_, ']'))) if name.is_alphabetic() => {
                        tokens.push(Token::new(
                            format!("[{name}]"),
                            TokenKind::MatrixRef,
                            offset,
                        ));
                        pos += 3;
                    }
                    _ => {
                        return Err(ParseError::UnexpectedToken {
                            token: "[".to_string(),
                            position: offset,
                        })
                    }
                }
            }
            c if c.is_ascii_digit() || c == '.' => {
                let end = scan_number(&chars, pos);
                let literal: String = chars[pos..end].iter().map(|(_, c)| c).collect();
                expand_number(&literal, offset, disabled, &mut tokens)?;
                pos = end;
            }
            _ => {
                let mut end = pos;
                while end < chars.len() && !ends_identifier(chars[end].1) {
                    end += 1;
                }
                let name: String = chars[pos..end].iter().map(|(_, c)| c).collect();
                let is_call = matches!(chars.get(end), Some((_, '(')));
                tokens.push(classify_identifier(name, is_call, offset, disabled)?);
                pos = end;
            }
        }
    }

    trace!("tokenized {text:?} into {} tokens", tokens.len());
    Ok(tokens)
}

fn classify_identifier(
    name: String,
    is_call: bool,
    position: usize,
    disabled: &FeatureSet,
) -> Result<Token, ParseError> {
    if is_call {
        disabled.check_function(&name)?;
        return Ok(Token::new(name, TokenKind::FunctionName, position));
    }
    if name == "i" {
        disabled.check(FeatureCategory::ComplexNumber)?;
        return Ok(Token::new(name, TokenKind::ComplexUnit, position));
    }
    disabled.check(FeatureCategory::Variable)?;
    Ok(Token::new(name, TokenKind::Variable, position))
}

/// Returns the end index of the numeric run starting at `start`.
///
/// The run covers digits, `.`, `i`, and one exponent marker `e`/`E` when it is followed by
/// a digit or by a sign and a digit.
fn scan_number(chars: &[(usize, char)], start: usize) -> usize {
    let digit_at = |i: usize| chars.get(i).is_some_and(|(_, c)| c.is_ascii_digit());
    let mut end = start;
    let mut seen_exponent = false;

    while let Some(&(_, c)) = chars.get(end) {
        match c {
            '0'..='9' | '.' | 'i' => end += 1,
            'e' | 'E' if !seen_exponent => {
                let signed = matches!(chars.get(end + 1), Some((_, '+' | '-')));
                if digit_at(end + 1) || (signed && digit_at(end + 2)) {
                    seen_exponent = true;
                    end += if signed { 2 } else { 1 };
                } else {
                    break;
                }
            }
            _ => break,
        }
    }
    end
}

/// Expands one numeric literal into tokens.
fn expand_number(
    literal: &str,
    position: usize,
    disabled: &FeatureSet,
    out: &mut Vec<Token>,
) -> Result<(), ParseError> {
    let malformed = || ParseError::MalformedNumber {
        text: literal.to_string(),
        position,
    };

    let (mantissa, exponent) = match literal.find(|c| c == 'e' || c == 'E') {
        Some(idx) => (&literal[..idx], Some(&literal[idx + 1..])),
        None => (literal, None),
    };

    if literal.contains('i') {
        disabled.check(FeatureCategory::ComplexNumber)?;
    }

    let mut parts = Vec::new();
    let mut first = true;
    for piece in mantissa.split('i') {
        if !first {
            parts.push(Token::new("i", TokenKind::ComplexUnit, position));
        }
        first = false;
        if piece.is_empty() {
            continue;
        }
        if piece.matches('.').count() > 1 || piece == "." {
            return Err(malformed());
        }
        parts.push(Token::new(piece, TokenKind::Number, position));
    }
    if parts.is_empty() {
        return Err(malformed());
    }

    let mut tokens = join_with_multiply(parts, position);

    if let Some(exponent) = exponent {
        let units = exponent.matches('i').count();
        let digits: String = exponent.chars().filter(|c| *c != 'i').collect();
        let (negative, digits) = match digits.strip_prefix('-') {
            Some(rest) => (true, rest.to_string()),
            None => (false, digits.trim_start_matches('+').to_string()),
        };
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(malformed());
        }

        let op = |text: &str| Token::new(text, TokenKind::Operator, position);
        tokens.push(op("*"));
        tokens.push(Token::new("10", TokenKind::Number, position));
        tokens.push(op("^"));
        tokens.push(Token::new("(", TokenKind::LeftParen, position));
        if negative {
            tokens.push(op("-"));
        }
        tokens.push(Token::new(digits, TokenKind::Number, position));
        tokens.push(Token::new(")", TokenKind::RightParen, position));
        for _ in 0..units {
            tokens.push(op("*"));
            tokens.push(Token::new("i", TokenKind::ComplexUnit, position));
        }
    }

    if tokens.len() == 1 {
        out.extend(tokens);
    } else {
        out.push(Token::new("(", TokenKind::LeftParen, position));
        out.extend(tokens);
        out.push(Token::new(")", TokenKind::RightParen, position));
    }
    Ok(())
}

fn join_with_multiply(parts: Vec<Token>, position: usize) -> Vec<Token> {
    let mut tokens = Vec::with_capacity(parts.len() * 2);
    for (idx, token) in parts.into_iter().enumerate() {
        if idx > 0 {
            tokens.push(Token::new("*", TokenKind::Operator, position));
        }
        tokens.push(token);
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(input: &str) -> Vec<String> {
        tokenize(input, &FeatureSet::new())
            .unwrap()
            .into_iter()
            .map(|t| t.text)
            .collect()
    }

    #[test]
    fn test_simple_tokens() {
        assert_eq!(texts("2 + 3*4"), vec!["2", "+", "3", "*", "4"]);
        assert_eq!(texts("(a,b)"), vec!["(", "a", ",", "b", ")"]);
    }

    #[test]
    fn test_function_and_variable() {
        let tokens = tokenize("sin(theta)", &FeatureSet::new()).unwrap();
        assert_eq!(tokens[0].kind, TokenKind::FunctionName);
        assert_eq!(tokens[0].text, "sin");
        assert_eq!(tokens[2].kind, TokenKind::Variable);
        assert_eq!(tokens[2].position, 4);
    }

    #[test]
    fn test_imaginary_literal() {
        assert_eq!(texts("3i"), vec!["(", "3", "*", "i", ")"]);
        assert_eq!(texts("i"), vec!["i"]);
        assert_eq!(texts("2.5"), vec!["2.5"]);
    }

    #[test]
    fn test_scientific_notation() {
        assert_eq!(
            texts("2e-3"),
            vec!["(", "2", "*", "10", "^", "(", "-", "3", ")", ")"]
        );
        assert_eq!(
            texts("1e3i"),
            vec!["(", "1", "*", "10", "^", "(", "3", ")", "*", "i", ")"]
        );
    }

    #[test]
    fn test_trailing_e_is_not_an_exponent() {
        let tokens = tokenize("2e", &FeatureSet::new()).unwrap();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[1].kind, TokenKind::Variable);
    }

    #[test]
    fn test_malformed_number() {
        let err = tokenize("1.2.3", &FeatureSet::new()).unwrap_err();
        assert!(matches!(err, ParseError::MalformedNumber { .. }));
    }

    #[test]
    fn test_matrix_reference() {
        let tokens = tokenize("det([A])", &FeatureSet::new()).unwrap();
        assert_eq!(tokens[2].kind, TokenKind::MatrixRef);
        assert_eq!(tokens[2].text, "[A]");
        assert!(tokenize("[AB]", &FeatureSet::new()).is_err());
    }

    #[test]
    fn test_disabled_features() {
        let mut disabled = FeatureSet::new();
        disabled.disable("sin");
        disabled.disable(FeatureSet::COMPLEX);
        disabled.disable(FeatureSet::MATRICES);

        let err = tokenize("sin(1)", &disabled).unwrap_err();
        assert_eq!(
            err.disabled().map(|f| (f.name.as_str(), f.category)),
            Some(("sin", FeatureCategory::Function))
        );
        assert!(tokenize("2i", &disabled).unwrap_err().is_disabled());
        assert!(tokenize("i", &disabled).unwrap_err().is_disabled());
        assert!(tokenize("[A]", &disabled).unwrap_err().is_disabled());
        assert!(tokenize("cos(1)", &disabled).is_ok());
    }

    #[test]
    fn test_disabled_variables() {
        let mut disabled = FeatureSet::new();
        disabled.disable(FeatureSet::VARIABLES);
        let err = tokenize("x + 1", &disabled).unwrap_err();
        assert_eq!(
            err.disabled().map(|f| f.category),
            Some(FeatureCategory::Variable)
        );
        assert!(tokenize("sqrt(4)", &disabled).is_ok());
    }
}
