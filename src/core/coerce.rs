// src/core/coerce.rs

//! # Value Coercion Engine
//!
//! Turns a literal string into a [`Value`] shaped like an example value. The
//! example's variant is the schema: an `I32` example yields an `I32`, a slice
//! of maps yields a slice of maps, and so on.
//!
//! Composite literal grammar:
//! - lists: `[a,b,c]`, or bare `a,b,c` at the top level;
//! - maps: `{k:v,k2:v2}`, or bare `k:v,k2=v2` at the top level;
//! - strings may be quoted with `"` or `'`, with `\` escaping the next char;
//! - nesting is detected by looking ahead for an opening bracket.
//!
//! Element failures inside a composite are logged and the element is skipped
//! ([`Strictness::Lenient`]); [`Strictness::Strict`] propagates them instead.

use crate::constants::TRUTHY_WORDS;
use crate::core::timefmt;
use crate::core::value::{self, Complex64, Value};
use std::num::{ParseFloatError, ParseIntError};
use thiserror::Error;

/// Errors produced while coercing a literal.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoerceError {
    /// The text is not an integer.
    #[error("'{literal}' is not a valid integer: {source}")]
    InvalidInt {
        /// The offending text.
        literal: String,
        /// Underlying parse failure.
        #[source]
        source: ParseIntError,
    },
    /// The integer does not fit the target width.
    #[error("'{literal}' is out of range for {kind}")]
    IntOutOfRange {
        /// The offending text.
        literal: String,
        /// The target kind, e.g. `u8`.
        kind: &'static str,
    },
    /// The text is not a float.
    #[error("'{literal}' is not a valid number: {source}")]
    InvalidFloat {
        /// The offending text.
        literal: String,
        /// Underlying parse failure.
        #[source]
        source: ParseFloatError,
    },
    /// The text is not a complex number.
    #[error("'{literal}' is not a valid complex number")]
    InvalidComplex {
        /// The offending text.
        literal: String,
    },
    /// No known time layout matched.
    #[error("'{literal}' does not match any known time layout")]
    InvalidTime {
        /// The offending text.
        literal: String,
    },
    /// No known duration form matched.
    #[error("'{literal}' is not a valid duration")]
    InvalidDuration {
        /// The offending text.
        literal: String,
    },
    /// A user type rejected the text.
    #[error("'{literal}' is not a valid {type_name}: {message}")]
    Text {
        /// The offending text.
        literal: String,
        /// The target type.
        type_name: &'static str,
        /// The type's own message.
        message: String,
    },
    /// A bracket, brace or quote was never closed.
    #[error("expected '{expected}' before end of input (opened at offset {at})")]
    Unclosed {
        /// The missing closer.
        expected: char,
        /// Offset of the opener.
        at: usize,
    },
    /// A map entry lacks its `:`/`=` separator.
    #[error("expected ':' or '=' after map key at offset {at}")]
    MissingSeparator {
        /// Offset where the separator was expected.
        at: usize,
    },
    /// A character that cannot start or follow an element.
    #[error("unexpected '{found}' at offset {at}")]
    UnexpectedChar {
        /// The character seen.
        found: char,
        /// Its offset.
        at: usize,
    },
}

type CoerceResult<T> = Result<T, CoerceError>;

/// How element-level failures inside composites are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strictness {
    /// Log a warning and skip the malformed element.
    #[default]
    Lenient,
    /// Fail the whole literal.
    Strict,
}

/// Parses `literal` into a value shaped like `example`, skipping malformed
/// composite elements.
pub fn parse(literal: &str, example: &Value) -> CoerceResult<Value> {
    parse_with(literal, example, Strictness::Lenient)
}

/// Parses `literal` into a value shaped like `example` with the given policy.
pub fn parse_with(literal: &str, example: &Value, strictness: Strictness) -> CoerceResult<Value> {
    let mut parser = LiteralParser::new(literal, strictness);
    let value = parser.parse_top(example)?;
    parser.skip_ws();
    if !parser.at_end() {
        log::warn!(
            "Ignoring trailing input '{}' after {} value parsed from '{}'.",
            parser.rest(),
            example.kind_name(),
            literal
        );
    }
    Ok(value)
}

/// Reads a truthy word; empty text yields `default`.
pub fn parse_bool(text: &str, default: bool) -> bool {
    let text = text.trim();
    if text.is_empty() {
        return default;
    }
    let lowered = text.to_ascii_lowercase();
    TRUTHY_WORDS.contains(&lowered.as_str())
}

/// Removes one pair of matching surrounding quotes.
pub fn strip_quotes(text: &str) -> &str {
    for q in ['"', '\''] {
        if let Some(inner) = text.strip_prefix(q).and_then(|t| t.strip_suffix(q)) {
            return inner;
        }
    }
    text
}

/// Characters that end a bare element inside a composite.
const ELEMENT_STOPS: &[char] = &[',', ']', '}'];
/// Characters that end a bare map key.
const KEY_STOPS: &[char] = &[',', ']', '}', ':', '='];
/// Characters the lookahead treats as structural.
const STRUCTURAL: &[char] = &['[', ']', '{', '}', '(', ','];

/// A cursor over the literal's characters.
#[derive(Debug)]
struct LiteralParser {
    chars: Vec<char>,
    pos: usize,
    strictness: Strictness,
}

impl LiteralParser {
    fn new(literal: &str, strictness: Strictness) -> Self {
        Self {
            chars: literal.chars().collect(),
            pos: 0,
            strictness,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn rest(&self) -> String {
        self.chars.get(self.pos..).unwrap_or_default().iter().collect()
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    /// Scans forward from the cursor, skipping whitespace, for the next
    /// structural character. Returns it with its offset.
    fn lookahead(&self) -> Option<(usize, char)> {
        self.chars
            .iter()
            .enumerate()
            .skip(self.pos)
            .find(|(_, c)| STRUCTURAL.contains(c))
            .map(|(i, c)| (i, *c))
    }

    /// True when the next non-blank character opens `opener`.
    fn opens(&self, opener: char) -> bool {
        let next_non_blank = self
            .chars
            .iter()
            .skip(self.pos)
            .find(|c| !c.is_whitespace())
            .copied();
        next_non_blank == Some(opener)
            && self
                .lookahead()
                .is_some_and(|(_, c)| c == opener)
    }

    // --- Entry points ---

    fn parse_top(&mut self, example: &Value) -> CoerceResult<Value> {
        match example {
            Value::Slice { .. }
            | Value::Array { .. }
            | Value::Map { .. }
            | Value::Struct(_) => self.parse_composite(example, true),
            scalar => {
                let text = self.rest();
                self.pos = self.chars.len();
                let trimmed = text.trim();
                coerce_scalar(strip_quotes(trimmed), scalar)
            }
        }
    }

    fn parse_nested(&mut self, example: &Value) -> CoerceResult<Value> {
        match example {
            Value::Slice { .. }
            | Value::Array { .. }
            | Value::Map { .. }
            | Value::Struct(_) => self.parse_composite(example, false),
            scalar => {
                let token = self.read_token(ELEMENT_STOPS)?;
                coerce_scalar(&token, scalar)
            }
        }
    }

    fn parse_composite(&mut self, example: &Value, top: bool) -> CoerceResult<Value> {
        match example {
            Value::Slice { elem, .. } => {
                let items = self.parse_list(&|_| Some(elem.as_ref()), top)?;
                Ok(Value::Slice {
                    elem: elem.clone(),
                    items,
                })
            }
            Value::Array { elem, items: declared } => {
                let len = declared.len();
                let mut items =
                    self.parse_list(&|i| if i < len { Some(elem.as_ref()) } else { None }, top)?;
                items.resize(len, elem.zeroed());
                Ok(Value::Array {
                    elem: elem.clone(),
                    items,
                })
            }
            Value::Struct(fields) => {
                let parsed = self.parse_list(&|i| fields.get(i).map(|(_, v)| v), top)?;
                let mut parsed = parsed.into_iter();
                let decoded = fields
                    .iter()
                    .map(|(name, default)| {
                        (name.clone(), parsed.next().unwrap_or_else(|| default.clone()))
                    })
                    .collect();
                Ok(Value::Struct(decoded))
            }
            Value::Map { key, value, .. } => {
                let entries = self.parse_map(key, value, top)?;
                Ok(Value::Map {
                    key: key.clone(),
                    value: value.clone(),
                    entries,
                })
            }
            scalar => self.parse_nested(scalar),
        }
    }

    // --- Composites ---

    /// Parses a list. `example_for(i)` returns the example for the i-th
    /// element, or `None` when the element is beyond the declared length.
    fn parse_list<'e>(
        &mut self,
        example_for: &dyn Fn(usize) -> Option<&'e Value>,
        top: bool,
    ) -> CoerceResult<Vec<Value>> {
        self.skip_ws();
        let open_at = self.pos;
        let closer = if self.opens('[') {
            self.skip_ws();
            self.bump();
            Some(']')
        } else {
            None
        };

        let mut items = Vec::new();
        let mut index = 0;
        loop {
            self.skip_ws();
            match (self.peek(), closer) {
                (None, Some(expected)) => {
                    return Err(CoerceError::Unclosed {
                        expected,
                        at: open_at,
                    });
                }
                (None, None) => break,
                (Some(c), Some(expected)) if c == expected => {
                    self.bump();
                    break;
                }
                (Some(']' | '}'), None) => break,
                (Some(','), _) => {
                    self.bump();
                    continue;
                }
                _ => {}
            }

            let start = self.pos;
            match example_for(index) {
                Some(example) => match self.parse_nested(example) {
                    Ok(v) => items.push(v),
                    Err(e) => self.recover(start, e)?,
                },
                None => {
                    log::debug!("Dropping list element #{} beyond declared length.", index);
                    self.skip_element();
                }
            }
            index += 1;

            // A bare list nested inside another composite holds one element;
            // the comma that follows belongs to the enclosing literal.
            if closer.is_none() && !top {
                break;
            }
            self.expect_element_end(closer)?;
        }
        Ok(items)
    }

    fn parse_map(
        &mut self,
        key_example: &Value,
        value_example: &Value,
        top: bool,
    ) -> CoerceResult<Vec<(Value, Value)>> {
        self.skip_ws();
        let open_at = self.pos;
        let closer = if self.opens('{') {
            self.skip_ws();
            self.bump();
            Some('}')
        } else {
            None
        };

        let mut entries = Vec::new();
        loop {
            self.skip_ws();
            match (self.peek(), closer) {
                (None, Some(expected)) => {
                    return Err(CoerceError::Unclosed {
                        expected,
                        at: open_at,
                    });
                }
                (None, None) => break,
                (Some(c), Some(expected)) if c == expected => {
                    self.bump();
                    break;
                }
                (Some(']' | '}'), None) => break,
                (Some(','), _) => {
                    self.bump();
                    continue;
                }
                _ => {}
            }

            let start = self.pos;
            match self.parse_entry(key_example, value_example) {
                Ok((k, v)) => value::upsert(&mut entries, k, v),
                Err(e) => self.recover(start, e)?,
            }

            if closer.is_none() && !top {
                break;
            }
            self.expect_element_end(closer)?;
        }
        Ok(entries)
    }

    fn parse_entry(
        &mut self,
        key_example: &Value,
        value_example: &Value,
    ) -> CoerceResult<(Value, Value)> {
        let key_text = self.read_token(KEY_STOPS)?;
        self.skip_ws();
        match self.peek() {
            Some(':' | '=') => {
                self.bump();
            }
            _ => return Err(CoerceError::MissingSeparator { at: self.pos }),
        }
        let key = coerce_scalar(&key_text, key_example)?;
        let value = self.parse_nested(value_example)?;
        Ok((key, value))
    }

    /// After an element: accept a separator, the closer, or the end.
    fn expect_element_end(&mut self, closer: Option<char>) -> CoerceResult<()> {
        self.skip_ws();
        match self.peek() {
            None | Some(',') => Ok(()),
            Some(c) if Some(c) == closer => Ok(()),
            Some(']' | '}') if closer.is_none() => Ok(()),
            Some(found) => {
                let err = CoerceError::UnexpectedChar {
                    found,
                    at: self.pos,
                };
                let start = self.pos;
                self.recover(start, err)
            }
        }
    }

    /// Applies the strictness policy to a failed element starting at `start`.
    fn recover(&mut self, start: usize, err: CoerceError) -> CoerceResult<()> {
        match self.strictness {
            Strictness::Strict => Err(err),
            Strictness::Lenient => {
                log::warn!("Skipping malformed literal element: {}", err);
                self.pos = start;
                self.skip_element();
                Ok(())
            }
        }
    }

    /// Advances past one element, honoring nesting and quotes, stopping before
    /// a separator or a closer at depth zero.
    fn skip_element(&mut self) {
        let mut depth: usize = 0;
        let mut quote: Option<char> = None;
        while let Some(c) = self.peek() {
            if let Some(q) = quote {
                self.pos += 1;
                if c == '\\' {
                    self.pos += 1;
                } else if c == q {
                    quote = None;
                }
                continue;
            }
            match c {
                '"' | '\'' => quote = Some(c),
                '[' | '{' | '(' => depth += 1,
                ']' | '}' | ')' if depth == 0 => return,
                ']' | '}' | ')' => depth -= 1,
                ',' if depth == 0 => return,
                _ => {}
            }
            self.pos += 1;
        }
    }

    // --- Tokens ---

    /// Reads one scalar token: a quoted string, a parenthesized group, or the
    /// bare text up to one of `stops`. Bare tokens are trimmed.
    fn read_token(&mut self, stops: &[char]) -> CoerceResult<String> {
        self.skip_ws();
        match self.peek() {
            Some(q @ ('"' | '\'')) => self.read_quoted(q),
            Some('(') => self.read_group(),
            _ => {
                let mut out = String::new();
                while let Some(c) = self.peek() {
                    if stops.contains(&c) {
                        break;
                    }
                    out.push(c);
                    self.pos += 1;
                }
                Ok(out.trim().to_string())
            }
        }
    }

    fn read_quoted(&mut self, quote: char) -> CoerceResult<String> {
        let open_at = self.pos;
        self.bump();
        let mut out = String::new();
        while let Some(c) = self.bump() {
            if c == '\\' {
                if let Some(escaped) = self.bump() {
                    out.push(escaped);
                }
            } else if c == quote {
                return Ok(out);
            } else {
                out.push(c);
            }
        }
        Err(CoerceError::Unclosed {
            expected: quote,
            at: open_at,
        })
    }

    fn read_group(&mut self) -> CoerceResult<String> {
        let open_at = self.pos;
        let mut out = String::new();
        while let Some(c) = self.bump() {
            out.push(c);
            if c == ')' {
                return Ok(out);
            }
        }
        Err(CoerceError::Unclosed {
            expected: ')',
            at: open_at,
        })
    }
}

// --- Scalars ---

/// Coerces a single scalar token against a scalar example.
pub(crate) fn coerce_scalar(text: &str, example: &Value) -> CoerceResult<Value> {
    Ok(match example {
        Value::Bool(default) => Value::Bool(parse_bool(text, *default)),
        Value::I8(_) => Value::I8(narrow_signed(text, "i8")?),
        Value::I16(_) => Value::I16(narrow_signed(text, "i16")?),
        Value::I32(_) => Value::I32(narrow_signed(text, "i32")?),
        Value::I64(_) => Value::I64(narrow_signed(text, "i64")?),
        Value::U8(_) => Value::U8(narrow_unsigned(text, "u8")?),
        Value::U16(_) => Value::U16(narrow_unsigned(text, "u16")?),
        Value::U32(_) => Value::U32(narrow_unsigned(text, "u32")?),
        Value::U64(_) => Value::U64(narrow_unsigned(text, "u64")?),
        Value::F32(_) => Value::F32(parse_float(text)?),
        Value::F64(_) => Value::F64(parse_float(text)?),
        Value::Complex(_) => Value::Complex(parse_complex(text)?),
        Value::String(_) => Value::String(text.to_string()),
        Value::Time(_) => {
            Value::Time(
                timefmt::parse_time(text).ok_or_else(|| CoerceError::InvalidTime {
                    literal: text.to_string(),
                })?,
            )
        }
        Value::Duration(_) => Value::Duration(timefmt::parse_duration(text).ok_or_else(|| {
            CoerceError::InvalidDuration {
                literal: text.to_string(),
            }
        })?),
        Value::Text(proto) => {
            Value::Text(
                proto
                    .unmarshal_text(text)
                    .map_err(|message| CoerceError::Text {
                        literal: text.to_string(),
                        type_name: proto.type_name(),
                        message,
                    })?,
            )
        }
        composite => parse_with(text, composite, Strictness::Lenient)?,
    })
}

/// Splits sign and radix prefix off an integer literal.
fn split_radix(text: &str) -> (bool, u32, String) {
    let cleaned: String = text.trim().chars().filter(|c| *c != '_').collect();
    let (negative, body) = match cleaned.strip_prefix('-') {
        Some(rest) => (true, rest.to_string()),
        None => (false, cleaned.strip_prefix('+').unwrap_or(&cleaned).to_string()),
    };
    let lowered = body.to_ascii_lowercase();
    for (prefix, radix) in [("0x", 16), ("0o", 8), ("0b", 2)] {
        if let Some(digits) = lowered.strip_prefix(prefix) {
            return (negative, radix, digits.to_string());
        }
    }
    (negative, 10, body)
}

fn parse_wide_signed(text: &str) -> CoerceResult<i128> {
    let (negative, radix, digits) = split_radix(text);
    // One sign only; `from_str_radix` would accept a second one.
    if let Some(found) = digits.chars().next().filter(|c| matches!(c, '+' | '-')) {
        return Err(CoerceError::UnexpectedChar {
            found,
            at: text.rfind(found).unwrap_or_default(),
        });
    }
    let magnitude =
        i128::from_str_radix(&digits, radix).map_err(|source| CoerceError::InvalidInt {
            literal: text.to_string(),
            source,
        })?;
    if !negative {
        return Ok(magnitude);
    }
    magnitude.checked_neg().ok_or_else(|| CoerceError::IntOutOfRange {
        literal: text.to_string(),
        kind: "i128",
    })
}

fn narrow_signed<T: TryFrom<i128>>(text: &str, kind: &'static str) -> CoerceResult<T> {
    let wide = parse_wide_signed(text)?;
    T::try_from(wide).map_err(|_| CoerceError::IntOutOfRange {
        literal: text.to_string(),
        kind,
    })
}

fn narrow_unsigned<T: TryFrom<i128>>(text: &str, kind: &'static str) -> CoerceResult<T> {
    let wide = parse_wide_signed(text)?;
    if wide < 0 {
        return Err(CoerceError::IntOutOfRange {
            literal: text.to_string(),
            kind,
        });
    }
    narrow_signed(text, kind)
}

fn parse_float<T: std::str::FromStr<Err = ParseFloatError>>(text: &str) -> CoerceResult<T> {
    let cleaned: String = text.trim().chars().filter(|c| *c != '_').collect();
    cleaned
        .parse::<T>()
        .map_err(|source| CoerceError::InvalidFloat {
            literal: text.to_string(),
            source,
        })
}

/// Accepts `(re+imi)`, `re+imi`, `imi` and `re`.
fn parse_complex(text: &str) -> CoerceResult<Complex64> {
    let invalid = || CoerceError::InvalidComplex {
        literal: text.to_string(),
    };
    let trimmed = text.trim();
    let body = trimmed
        .strip_prefix('(')
        .and_then(|t| t.strip_suffix(')'))
        .unwrap_or(trimmed)
        .trim();
    let part = |s: &str| -> CoerceResult<f64> {
        match s {
            "" | "+" => Ok(1.0),
            "-" => Ok(-1.0),
            other => other.parse::<f64>().map_err(|_| invalid()),
        }
    };

    let Some(imag_body) = body.strip_suffix('i') else {
        return Ok(Complex64::new(body.parse::<f64>().map_err(|_| invalid())?, 0.0));
    };

    // The split point is the last sign that is not leading and not an exponent sign.
    let chars: Vec<(usize, char)> = imag_body.char_indices().collect();
    let split = chars
        .iter()
        .enumerate()
        .rev()
        .find(|(n, (i, c))| {
            (*c == '+' || *c == '-')
                && *i > 0
                && !chars
                    .get(n.wrapping_sub(1))
                    .is_some_and(|(_, p)| *p == 'e' || *p == 'E')
        })
        .map(|(_, (i, _))| *i);

    match split {
        Some(at) => {
            let (re, im) = imag_body.split_at(at);
            Ok(Complex64::new(
                re.trim().parse::<f64>().map_err(|_| invalid())?,
                part(im.trim())?,
            ))
        }
        None => Ok(Complex64::new(0.0, part(imag_body)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    fn ints(items: &[i64]) -> Value {
        Value::slice_with(Value::I64(0), items.iter().map(|v| Value::I64(*v)).collect())
    }

    fn str_int_map(pairs: &[(&str, i64)]) -> Value {
        Value::Map {
            key: Box::new(Value::from("")),
            value: Box::new(Value::I64(0)),
            entries: pairs
                .iter()
                .map(|(k, v)| (Value::from(*k), Value::I64(*v)))
                .collect(),
        }
    }

    #[test]
    fn test_parse_bool_truthy_words() {
        for word in ["1", "y", "YES", "true", "on", "t"] {
            assert!(parse_bool(word, false), "{word} should be truthy");
        }
        assert!(!parse_bool("nope", true));
        assert!(parse_bool("", true));
        assert!(!parse_bool("  ", false));
    }

    #[test]
    fn test_parse_integers_with_radix_and_narrowing() {
        assert_eq!(parse("0x1F", &Value::I32(0)).unwrap(), Value::I32(31));
        assert_eq!(parse("0o17", &Value::I64(0)).unwrap(), Value::I64(15));
        assert_eq!(parse("-0b101", &Value::I8(0)).unwrap(), Value::I8(-5));
        assert_eq!(parse("1_000", &Value::U16(0)).unwrap(), Value::U16(1000));
        assert!(matches!(
            parse("300", &Value::U8(0)),
            Err(CoerceError::IntOutOfRange { kind: "u8", .. })
        ));
        assert!(matches!(
            parse("-1", &Value::U32(0)),
            Err(CoerceError::IntOutOfRange { .. })
        ));
        assert!(matches!(
            parse("abc", &Value::I64(0)),
            Err(CoerceError::InvalidInt { .. })
        ));
    }

    #[test]
    fn test_parse_integers_reject_a_second_sign() {
        assert!(matches!(
            parse("--5", &Value::I64(0)),
            Err(CoerceError::UnexpectedChar { found: '-', at: 1 })
        ));
        assert!(matches!(
            parse("+-5", &Value::I32(0)),
            Err(CoerceError::UnexpectedChar { found: '-', at: 1 })
        ));
        assert!(parse("--170141183460469231731687303715884105728", &Value::I64(0)).is_err());
        assert!(parse("-0x-80", &Value::I64(0)).is_err());
        assert_eq!(
            parse("-9223372036854775808", &Value::I64(0)).unwrap(),
            Value::I64(i64::MIN)
        );
    }

    #[test]
    fn test_parse_floats_and_complex() {
        assert_eq!(parse("2.5", &Value::F64(0.0)).unwrap(), Value::F64(2.5));
        assert_eq!(parse("1e3", &Value::F32(0.0)).unwrap(), Value::F32(1000.0));
        let c = Value::Complex(Complex64::default());
        assert_eq!(parse("(1+2i)", &c).unwrap(), Value::Complex(Complex64::new(1.0, 2.0)));
        assert_eq!(parse("3-4.5i", &c).unwrap(), Value::Complex(Complex64::new(3.0, -4.5)));
        assert_eq!(parse("2i", &c).unwrap(), Value::Complex(Complex64::new(0.0, 2.0)));
        assert_eq!(parse("1e2+1i", &c).unwrap(), Value::Complex(Complex64::new(100.0, 1.0)));
        assert_eq!(parse("7", &c).unwrap(), Value::Complex(Complex64::new(7.0, 0.0)));
    }

    #[test]
    fn test_parse_string_strips_quotes() {
        let ex = Value::from("");
        assert_eq!(parse("\"hello world\"", &ex).unwrap(), Value::from("hello world"));
        assert_eq!(parse("'x'", &ex).unwrap(), Value::from("x"));
        assert_eq!(parse("plain", &ex).unwrap(), Value::from("plain"));
    }

    #[test]
    fn test_parse_slices() {
        let ex = Value::slice_of(Value::I64(0));
        assert_eq!(parse("8,9,7", &ex).unwrap(), ints(&[8, 9, 7]));
        assert_eq!(parse("[8,9,7]", &ex).unwrap(), ints(&[8, 9, 7]));
        assert_eq!(parse(" [ 8 , 9 , 7 ] ", &ex).unwrap(), ints(&[8, 9, 7]));
        assert_eq!(parse("[]", &ex).unwrap(), ints(&[]));
        assert_eq!(parse("5", &ex).unwrap(), ints(&[5]));
    }

    #[test]
    fn test_parse_array_truncates_to_declared_length() {
        let ex = Value::array_of(Value::I64(0), 2);
        let parsed = parse("[8,9,7]", &ex).unwrap();
        assert_eq!(parsed.as_items().unwrap(), &[Value::I64(8), Value::I64(9)]);

        let padded = parse("[4]", &ex).unwrap();
        assert_eq!(padded.as_items().unwrap(), &[Value::I64(4), Value::I64(0)]);
    }

    #[test]
    fn test_parse_nested_slices() {
        let ex = Value::slice_of(Value::slice_of(Value::I64(0)));
        let parsed = parse("[[8,9],[9,2]]", &ex).unwrap();
        assert_eq!(
            parsed,
            Value::slice_with(Value::slice_of(Value::I64(0)), vec![ints(&[8, 9]), ints(&[9, 2])])
        );
    }

    #[test]
    fn test_parse_maps_with_either_separator() {
        let ex = Value::map_of(Value::from(""), Value::I64(0));
        let expected = str_int_map(&[("apple", 1), ("banana", 2), ("orange", 3)]);
        assert_eq!(parse("apple=1, banana=2, orange=3", &ex).unwrap(), expected);
        assert_eq!(parse("apple:1, banana:2, orange:3", &ex).unwrap(), expected);
        assert_eq!(parse("{apple:1,banana=2,orange:3}", &ex).unwrap(), expected);
        assert_eq!(parse("{'apple':1,\"banana\":2,orange:3}", &ex).unwrap(), expected);
    }

    #[test]
    fn test_parse_slice_of_maps_of_slices() {
        let inner = Value::map_of(Value::from(""), Value::slice_of(Value::I64(0)));
        let ex = Value::slice_of(inner.clone());
        let compact = parse("[{a:[8,9],b:[9,2]},{e:[1,3]}]", &ex).unwrap();
        let spaced = parse(" [ { a : [ 8, 9 ] , b: [9,2] } , { e:[1, 3] } ] ", &ex).unwrap();
        let expected = Value::slice_with(
            inner,
            vec![
                Value::Map {
                    key: Box::new(Value::from("")),
                    value: Box::new(Value::slice_of(Value::I64(0))),
                    entries: vec![
                        (Value::from("a"), ints(&[8, 9])),
                        (Value::from("b"), ints(&[9, 2])),
                    ],
                },
                Value::Map {
                    key: Box::new(Value::from("")),
                    value: Box::new(Value::slice_of(Value::I64(0))),
                    entries: vec![(Value::from("e"), ints(&[1, 3]))],
                },
            ],
        );
        assert_eq!(compact, expected);
        assert_eq!(spaced, expected);
    }

    #[test]
    fn test_lenient_skips_bad_elements_and_strict_fails() {
        let ex = Value::slice_of(Value::I64(0));
        assert_eq!(parse("[1,x,3]", &ex).unwrap(), ints(&[1, 3]));
        assert!(parse_with("[1,x,3]", &ex, Strictness::Strict).is_err());

        let map_ex = Value::map_of(Value::from(""), Value::I64(0));
        assert_eq!(
            parse("{a:1,broken,c:3}", &map_ex).unwrap(),
            str_int_map(&[("a", 1), ("c", 3)])
        );
    }

    #[test]
    fn test_unclosed_bracket_is_an_error() {
        let ex = Value::slice_of(Value::I64(0));
        assert!(matches!(
            parse("[1,2", &ex),
            Err(CoerceError::Unclosed { expected: ']', .. })
        ));
    }

    #[test]
    fn test_trailing_input_is_tolerated() {
        let ex = Value::slice_of(Value::I64(0));
        assert_eq!(parse("[1,2] extra", &ex).unwrap(), ints(&[1, 2]));
    }

    #[test]
    fn test_struct_fields_decode_positionally() {
        let ex = Value::Struct(vec![
            ("host".to_string(), Value::from("")),
            ("port".to_string(), Value::U16(0)),
            ("tls".to_string(), Value::Bool(false)),
        ]);
        let parsed = parse("[localhost,8080]", &ex).unwrap();
        assert_eq!(
            parsed,
            Value::Struct(vec![
                ("host".to_string(), Value::from("localhost")),
                ("port".to_string(), Value::U16(8080)),
                ("tls".to_string(), Value::Bool(false)),
            ])
        );
    }

    #[test]
    fn test_time_and_duration_elements() {
        let ex = Value::slice_of(Value::Duration(TimeDelta::zero()));
        let parsed = parse("[1h,90s,PT2M]", &ex).unwrap();
        let expected: Vec<Value> = [3600, 90, 120]
            .iter()
            .map(|s| Value::Duration(TimeDelta::try_seconds(*s).unwrap()))
            .collect();
        assert_eq!(parsed.as_items().unwrap(), expected.as_slice());

        let map_ex = Value::map_of(
            Value::from(""),
            Value::Time(chrono::DateTime::parse_from_rfc3339("2000-01-01T00:00:00Z").unwrap()),
        );
        let parsed = parse("{start:2024-01-02T10:00:00Z}", &map_ex).unwrap();
        assert!(parsed.map_get("start").is_some());
    }

    #[test]
    fn test_text_values_delegate_to_from_str() {
        let ex = Value::text("0.0.0.0".parse::<std::net::IpAddr>().unwrap());
        let parsed = parse("10.0.0.1", &ex).unwrap();
        assert_eq!(parsed.to_string(), "10.0.0.1");
        assert!(matches!(parse("nope", &ex), Err(CoerceError::Text { .. })));
    }

    #[test]
    fn test_display_output_round_trips() {
        let inner = Value::map_of(Value::from(""), Value::slice_of(Value::I64(0)));
        let samples = vec![
            Value::I64(-42),
            Value::U64(u64::MAX),
            Value::F64(3.25),
            Value::Bool(true),
            Value::from("hello"),
            ints(&[1, 2, 3]),
            str_int_map(&[("a", 1), ("b", 2)]),
            Value::slice_with(
                inner.clone(),
                vec![Value::Map {
                    key: Box::new(Value::from("")),
                    value: Box::new(Value::slice_of(Value::I64(0))),
                    entries: vec![(Value::from("k k"), ints(&[4, 5]))],
                }],
            ),
            Value::strings(["x,y", "plain", ""]),
        ];
        for value in samples {
            let text = value.to_string();
            let back = parse(&text, &value.zeroed()).unwrap();
            assert_eq!(back, value, "round trip of {text}");
        }
    }
}
