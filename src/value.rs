//! Literal values carried in URIs, and the restricted reader that decodes them.
//!
//! The reader is deliberately small and side-effect free. It understands:
//!
//! | Text | Value |
//! |---|---|
//! | `42`, `-7`, `+3` | [`Value::Integer`] |
//! | `3.5`, `-1e3`, `.5` | [`Value::Float`] |
//! | `:red` | [`Value::Keyword`] (lower-cased) |
//! | `"a \"quoted\" string"` | [`Value::Text`] |
//! | anything else | [`Value::Text`], unless it holds a reserved character |
//!
//! Reserved characters (parentheses, quote, backquote, `#`, `,`, `|`, `;`,
//! backslash) and a stray `"` make the literal unreadable; the caller turns
//! that into a 400.
//!
//! [`Value`]'s `Display` is the inverse: it writes a literal that reads back
//! as the same value, quoting text that would otherwise read as a number or
//! keyword.

use std::fmt;

/// Why a literal could not be read.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[error("{0}")]
pub struct LiteralError(&'static str);

/// A decoded literal.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Integer(i64),
    Float(f64),
    Keyword(String),
    Text(String),
}

const RESERVED: &[char] = &['(', ')', '\'', '`', '#', ',', '|', ';', '\\', '"'];

impl Value {
    /// Reads one literal. The whole input must be consumed.
    pub fn read(input: &str) -> Result<Self, LiteralError> {
        if let Some(rest) = input.strip_prefix('"') {
            return read_quoted(rest);
        }
        if let Some(token) = input.strip_prefix(':') {
            if token.is_empty() || !token.chars().all(is_token_char) {
                return Err(LiteralError("malformed keyword"));
            }
            return Ok(Self::Keyword(token.to_ascii_lowercase()));
        }
        if looks_numeric(input) {
            return read_number(input);
        }
        if input.contains(RESERVED) {
            return Err(LiteralError("reserved character in literal"));
        }
        Ok(Self::Text(input.to_owned()))
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Integers widen to floats.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_keyword(&self) -> Option<&str> {
        match self {
            Self::Keyword(k) => Some(k),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

fn is_token_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '*' | '+' | '!' | '?' | '/')
}

fn read_quoted(rest: &str) -> Result<Value, LiteralError> {
    let mut out = String::with_capacity(rest.len());
    let mut chars = rest.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some(escaped) => out.push(escaped),
                None => return Err(LiteralError("unterminated string")),
            },
            '"' => {
                return if chars.as_str().is_empty() {
                    Ok(Value::Text(out))
                } else {
                    Err(LiteralError("trailing characters after string"))
                };
            }
            c => out.push(c),
        }
    }
    Err(LiteralError("unterminated string"))
}

/// `[+-]digits[.digits][(e|E)[+-]digits]`, with at least one mantissa digit.
fn looks_numeric(input: &str) -> bool {
    let body = input.strip_prefix(['+', '-']).unwrap_or(input);
    let (mantissa, exponent) = match body.find(['e', 'E']) {
        Some(i) => (&body[..i], Some(&body[i + 1..])),
        None => (body, None),
    };
    let (int, frac) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    let digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    let mantissa_ok = !(int.is_empty() && frac.is_empty()) && digits(int) && digits(frac);
    let exponent_ok = exponent.is_none_or(|e| {
        let e = e.strip_prefix(['+', '-']).unwrap_or(e);
        !e.is_empty() && digits(e)
    });
    mantissa_ok && exponent_ok
}

fn read_number(input: &str) -> Result<Value, LiteralError> {
    if !input.contains(['.', 'e', 'E']) {
        return input
            .parse::<i64>()
            .map(Value::Integer)
            .map_err(|_| LiteralError("integer out of range"));
    }
    match input.parse::<f64>() {
        Ok(f) if f.is_finite() => Ok(Value::Float(f)),
        _ => Err(LiteralError("number out of range")),
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(i) => write!(f, "{i}"),
            // `{:?}` always keeps a `.` or an exponent, so it reads back as a float.
            Self::Float(x) => write!(f, "{x:?}"),
            Self::Keyword(k) => write!(f, ":{k}"),
            Self::Text(s) => {
                let bare = !s.is_empty()
                    && matches!(Self::read(s), Ok(Self::Text(ref t)) if t == s);
                if bare {
                    return f.write_str(s);
                }
                f.write_str("\"")?;
                for c in s.chars() {
                    if matches!(c, '"' | '\\') {
                        f.write_str("\\")?;
                    }
                    write!(f, "{c}")?;
                }
                f.write_str("\"")
            }
        }
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self { Self::Integer(i) }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self { Self::Integer(i.into()) }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self { Self::Float(x) }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self { Self::Text(s.to_owned()) }
}

impl From<String> for Value {
    fn from(s: String) -> Self { Self::Text(s) }
}

// ── ArgKind ──────────────────────────────────────────────────────────────────

/// A positional type specializer.
///
/// ```text
/// Any
/// ├── Number
/// │   ├── Integer
/// │   └── Float
/// ├── Keyword
/// └── Text
/// ```
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum ArgKind {
    #[default]
    Any,
    Number,
    Integer,
    Float,
    Keyword,
    Text,
}

impl ArgKind {
    pub fn parent(self) -> Option<Self> {
        match self {
            Self::Any => None,
            Self::Number | Self::Keyword | Self::Text => Some(Self::Any),
            Self::Integer | Self::Float => Some(Self::Number),
        }
    }

    pub fn depth(self) -> usize {
        match self.parent() {
            None => 0,
            Some(parent) => parent.depth() + 1,
        }
    }

    pub fn of(value: &Value) -> Self {
        match value {
            Value::Integer(_) => Self::Integer,
            Value::Float(_) => Self::Float,
            Value::Keyword(_) => Self::Keyword,
            Value::Text(_) => Self::Text,
        }
    }

    /// True when `ancestor` is this kind or lies on its chain to `Any`.
    pub fn is_a(self, ancestor: Self) -> bool {
        let mut kind = Some(self);
        while let Some(k) = kind {
            if k == ancestor {
                return true;
            }
            kind = k.parent();
        }
        false
    }

    /// True when `value`'s own kind is this kind or a descendant of it.
    pub fn accepts(self, value: &Value) -> bool {
        Self::of(value).is_a(self)
    }
}

impl fmt::Display for ArgKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Any     => "any value",
            Self::Number  => "a number",
            Self::Integer => "an integer",
            Self::Float   => "a float",
            Self::Keyword => "a keyword",
            Self::Text    => "a string",
        };
        f.write_str(name)
    }
}
