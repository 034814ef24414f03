/*!
The type coercion layer: turning literal strings from the command line (or
from declared defaults) into typed field values.

Most types should implement [`Scalar`], or [`ParsedValue`] if they already
implement [`FromStr`]; both get [`Value`] for free, as does a [`Vec`] of
them. [`Value`] is the object-safe view the rest of the crate works with.
 */

use core::{
    fmt::{self, Display},
    str::FromStr,
    time::Duration,
};
use std::{net, path::PathBuf};

/// Errors produced by user code: validation, command entry points
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The closed set of value kinds a field can have. Help text and backends
/// dispatch on this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Bool,
    I8,
    I16,
    I32,
    I64,
    Isize,
    U8,
    U16,
    U32,
    U64,
    Usize,
    F32,
    F64,
    Str,
    Path,
    Duration,

    /// A self-parsing user type, with the label it shows in help text
    Custom(&'static str),
}

impl ScalarKind {
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match *self {
            ScalarKind::Bool => "bool",
            ScalarKind::I8 => "int8",
            ScalarKind::I16 => "int16",
            ScalarKind::I32 => "int32",
            ScalarKind::I64 => "int64",
            ScalarKind::Isize => "int",
            ScalarKind::U8 => "uint8",
            ScalarKind::U16 => "uint16",
            ScalarKind::U32 => "uint32",
            ScalarKind::U64 => "uint64",
            ScalarKind::Usize => "uint",
            ScalarKind::F32 => "float32",
            ScalarKind::F64 => "float64",
            ScalarKind::Str => "string",
            ScalarKind::Path => "path",
            ScalarKind::Duration => "duration",
            ScalarKind::Custom(label) => label,
        }
    }
}

/// The kind of a whole field: a single value, or a repeated one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Scalar(ScalarKind),
    Sequence(ScalarKind),
}

impl Kind {
    #[inline]
    #[must_use]
    pub const fn element(&self) -> ScalarKind {
        match *self {
            Kind::Scalar(kind) | Kind::Sequence(kind) => kind,
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_sequence(&self) -> bool {
        matches!(*self, Kind::Sequence(_))
    }

    /// Booleans are flags: they take no argument on the command line
    #[inline]
    #[must_use]
    pub const fn is_flag(&self) -> bool {
        matches!(*self, Kind::Scalar(ScalarKind::Bool))
    }
}

impl Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Kind::Scalar(kind) => f.write_str(kind.label()),
            Kind::Sequence(kind) => write!(f, "{}s", kind.label()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoercionError {
    #[error("invalid {kind} value {literal:?}")]
    InvalidLiteral { kind: Kind, literal: String },

    #[error("unsupported field kind: {0}")]
    UnsupportedKind(Kind),
}

impl CoercionError {
    #[inline]
    #[must_use]
    pub fn invalid(kind: ScalarKind, literal: &str) -> Self {
        Self::InvalidLiteral {
            kind: Kind::Scalar(kind),
            literal: literal.to_owned(),
        }
    }
}

/**
A single value that can be parsed from one literal.

`parse_literal` handles values given on the command line; `parse_default`
handles the literal in a `default` tag, and usually needn't be overridden.
*/
pub trait Scalar: Sized {
    const KIND: ScalarKind;

    fn parse_literal(literal: &str) -> Result<Self, CoercionError>;

    #[inline]
    fn parse_default(literal: &str) -> Result<Self, CoercionError> {
        Self::parse_literal(literal)
    }

    /// Field-level validation, run after all values are resolved when the
    /// owning command has no `Validate` of its own.
    #[inline]
    fn validate(&self) -> Result<(), BoxError> {
        Ok(())
    }
}

/**
Marker trait for types that parse themselves with [`FromStr`]. Implementing it
gives the type a [`Scalar`] implementation, labeled with `KIND`.
 */
pub trait ParsedValue: FromStr<Err: Display> {
    const KIND: ScalarKind = ScalarKind::Custom("value");
}

impl<T: ParsedValue> Scalar for T {
    const KIND: ScalarKind = <T as ParsedValue>::KIND;

    fn parse_literal(literal: &str) -> Result<Self, CoercionError> {
        literal.parse().map_err(|err| {
            tracing::trace!(literal, %err, "literal rejected");
            CoercionError::invalid(<T as ParsedValue>::KIND, literal)
        })
    }
}

/**
Object-safe access to a single field, as the dispatcher and backends see it.
Writes happen in place; nothing returns the new value.
 */
pub trait Value {
    fn kind(&self) -> Kind;

    /// Replace the value with one parsed from a command-line literal
    fn coerce(&mut self, literal: &str) -> Result<(), CoercionError>;

    /// Replace the value with one parsed from a `default` tag
    fn coerce_default(&mut self, literal: &str) -> Result<(), CoercionError>;

    /// Add one element to a repeated value
    fn append(&mut self, literal: &str) -> Result<(), CoercionError>;

    /// Empty a repeated value. Does nothing to single values.
    fn clear(&mut self);

    fn validate(&self) -> Result<(), BoxError>;
}

impl<T: Scalar> Value for T {
    #[inline]
    fn kind(&self) -> Kind {
        Kind::Scalar(T::KIND)
    }

    fn coerce(&mut self, literal: &str) -> Result<(), CoercionError> {
        *self = T::parse_literal(literal)?;
        Ok(())
    }

    fn coerce_default(&mut self, literal: &str) -> Result<(), CoercionError> {
        *self = T::parse_default(literal)?;
        Ok(())
    }

    fn append(&mut self, _literal: &str) -> Result<(), CoercionError> {
        Err(CoercionError::UnsupportedKind(self.kind()))
    }

    #[inline]
    fn clear(&mut self) {}

    #[inline]
    fn validate(&self) -> Result<(), BoxError> {
        Scalar::validate(self)
    }
}

/// Sequence literals are comma separated: `a,b,c`
impl<T: Scalar> Value for Vec<T> {
    #[inline]
    fn kind(&self) -> Kind {
        Kind::Sequence(T::KIND)
    }

    fn coerce(&mut self, literal: &str) -> Result<(), CoercionError> {
        let parsed = literal
            .split(',')
            .map(T::parse_literal)
            .collect::<Result<Vec<T>, _>>()?;

        *self = parsed;
        Ok(())
    }

    fn coerce_default(&mut self, literal: &str) -> Result<(), CoercionError> {
        let parsed = literal
            .split(',')
            .map(T::parse_default)
            .collect::<Result<Vec<T>, _>>()?;

        *self = parsed;
        Ok(())
    }

    fn append(&mut self, literal: &str) -> Result<(), CoercionError> {
        self.push(T::parse_literal(literal)?);
        Ok(())
    }

    #[inline]
    fn clear(&mut self) {
        Vec::clear(self)
    }

    fn validate(&self) -> Result<(), BoxError> {
        self.iter().try_for_each(Scalar::validate)
    }
}

/// Accepts the explicit spellings `1 t T TRUE true True` and
/// `0 f F FALSE false False`. As a default, only `true` is true.
impl Scalar for bool {
    const KIND: ScalarKind = ScalarKind::Bool;

    fn parse_literal(literal: &str) -> Result<Self, CoercionError> {
        match literal {
            "1" | "t" | "T" | "TRUE" | "true" | "True" => Ok(true),
            "0" | "f" | "F" | "FALSE" | "false" | "False" => Ok(false),
            _ => Err(CoercionError::invalid(Self::KIND, literal)),
        }
    }

    #[inline]
    fn parse_default(literal: &str) -> Result<Self, CoercionError> {
        Ok(literal == "true")
    }
}

/// Integers accept an optional sign and a `0x`, `0o`, or `0b` radix prefix,
/// and must fit the field's width.
fn parse_integer(literal: &str) -> Option<i128> {
    let (negative, digits) = match literal.as_bytes().first()? {
        b'-' => (true, &literal[1..]),
        b'+' => (false, &literal[1..]),
        _ => (false, literal),
    };

    let (radix, digits) = match digits.get(..2) {
        Some("0x" | "0X") => (16, &digits[2..]),
        Some("0o" | "0O") => (8, &digits[2..]),
        Some("0b" | "0B") => (2, &digits[2..]),
        _ => (10, digits),
    };

    // from_str_radix tolerates a sign of its own
    if digits.is_empty() || digits.starts_with(['+', '-']) {
        return None;
    }

    let magnitude = i128::try_from(u128::from_str_radix(digits, radix).ok()?).ok()?;

    Some(match negative {
        true => -magnitude,
        false => magnitude,
    })
}

macro_rules! integers {
    ($($type:ident => $kind:ident,)*) => {
        $(
            impl Scalar for $type {
                const KIND: ScalarKind = ScalarKind::$kind;

                fn parse_literal(literal: &str) -> Result<Self, CoercionError> {
                    parse_integer(literal)
                        .and_then(|value| $type::try_from(value).ok())
                        .ok_or_else(|| CoercionError::invalid(Self::KIND, literal))
                }
            }
        )*
    };
}

integers! {
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    isize => Isize,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    usize => Usize,
}

macro_rules! from_str {
    ($($type:ty => $kind:expr,)*) => {
        $(
            impl ParsedValue for $type {
                const KIND: ScalarKind = $kind;
            }
        )*
    };
}

from_str! {
    f32 => ScalarKind::F32,
    f64 => ScalarKind::F64,
    String => ScalarKind::Str,
    PathBuf => ScalarKind::Path,
    char => ScalarKind::Custom("char"),
    net::IpAddr => ScalarKind::Custom("ip"),
    net::Ipv4Addr => ScalarKind::Custom("ipv4"),
    net::Ipv6Addr => ScalarKind::Custom("ipv6"),
    net::SocketAddr => ScalarKind::Custom("address"),
}

/// Durations are written as a sequence of decimal numbers with units, like
/// `300ms`, `1.5h` or `2h45m`. Valid units are `ns`, `us` (or `µs`), `ms`,
/// `s`, `m`, `h`. A bare `0` is also accepted.
impl Scalar for Duration {
    const KIND: ScalarKind = ScalarKind::Duration;

    fn parse_literal(literal: &str) -> Result<Self, CoercionError> {
        parse_duration(literal).ok_or_else(|| CoercionError::invalid(Self::KIND, literal))
    }
}

fn parse_duration(literal: &str) -> Option<Duration> {
    const NANOS_PER_SEC: u128 = 1_000_000_000;

    let mut rest = literal.strip_prefix('+').unwrap_or(literal);

    match rest {
        "" => return None,
        "0" => return Some(Duration::ZERO),
        _ => {}
    }

    let mut total: u128 = 0;

    while !rest.is_empty() {
        let number_end = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        let (number, tail) = rest.split_at(number_end);

        let unit_end = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let (unit, tail) = tail.split_at(unit_end);

        let scale: u128 = match unit {
            "ns" => 1,
            "us" | "µs" | "μs" => 1_000,
            "ms" => 1_000_000,
            "s" => NANOS_PER_SEC,
            "m" => 60 * NANOS_PER_SEC,
            "h" => 3600 * NANOS_PER_SEC,
            _ => return None,
        };

        let (whole, fraction) = number.split_once('.').unwrap_or((number, ""));
        if whole.is_empty() && fraction.is_empty() {
            return None;
        }

        let whole: u128 = match whole {
            "" => 0,
            whole => whole.parse().ok()?,
        };

        let mut nanos = whole.checked_mul(scale)?;

        if !fraction.is_empty() {
            // Digits past nanosecond precision can't change the result
            let fraction = &fraction[..fraction.len().min(18)];
            let digits: u128 = fraction.parse().ok()?;
            let fraction_len = u32::try_from(fraction.len()).ok()?;
            nanos = nanos.checked_add(digits * scale / 10u128.pow(fraction_len))?;
        }

        total = total.checked_add(nanos)?;
        rest = tail;
    }

    let secs = u64::try_from(total / NANOS_PER_SEC).ok()?;
    let nanos = u32::try_from(total % NANOS_PER_SEC).ok()?;

    Some(Duration::new(secs, nanos))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn integer_prefixes() {
        assert_eq!(i32::parse_literal("0x1f"), Ok(31));
        assert_eq!(i32::parse_literal("-0b101"), Ok(-5));
        assert_eq!(u16::parse_literal("0o17"), Ok(15));
        assert_eq!(i64::parse_literal("+42"), Ok(42));
    }

    #[test]
    fn integer_range_is_checked() {
        assert_eq!(
            u8::parse_literal("999"),
            Err(CoercionError::InvalidLiteral {
                kind: Kind::Scalar(ScalarKind::U8),
                literal: "999".to_owned(),
            })
        );
        assert!(i8::parse_literal("-129").is_err());
        assert_eq!(i8::parse_literal("-128"), Ok(-128));
        assert!(u32::parse_literal("-1").is_err());
        assert!(u32::parse_literal("--1").is_err());
        assert!(u32::parse_literal("0x").is_err());
    }

    #[test]
    fn booleans() {
        assert_eq!(bool::parse_literal("T"), Ok(true));
        assert_eq!(bool::parse_literal("0"), Ok(false));
        assert!(bool::parse_literal("yes").is_err());

        assert_eq!(bool::parse_default("true"), Ok(true));
        assert_eq!(bool::parse_default("True"), Ok(false));
        assert_eq!(bool::parse_default(""), Ok(false));
    }

    #[test]
    fn durations() {
        assert_eq!(parse_duration("4h"), Some(Duration::from_secs(4 * 3600)));
        assert_eq!(parse_duration("1h30m"), Some(Duration::from_secs(5400)));
        assert_eq!(parse_duration("300ms"), Some(Duration::from_millis(300)));
        assert_eq!(parse_duration("1.5s"), Some(Duration::from_millis(1500)));
        assert_eq!(parse_duration("2us"), Some(Duration::from_micros(2)));
        assert_eq!(parse_duration("0"), Some(Duration::ZERO));
        assert_eq!(parse_duration(".5m"), Some(Duration::from_secs(30)));
    }

    #[test]
    fn bad_durations() {
        for literal in ["", "4", "h", "1x", "-1s", "1..5s", "."] {
            assert_eq!(parse_duration(literal), None, "{literal:?}");
        }
    }

    #[test]
    fn sequences_split_and_replace() {
        let mut values = vec![9, 9];
        values.coerce("1,2,3").unwrap();
        assert_eq!(values, [1, 2, 3]);

        Value::append(&mut values, "4").unwrap();
        assert_eq!(values, [1, 2, 3, 4]);

        Value::clear(&mut values);
        assert_eq!(values, Vec::<i32>::new());
    }

    #[test]
    fn scalar_cannot_append() {
        let mut value = 5u8;
        assert_eq!(
            Value::append(&mut value, "6"),
            Err(CoercionError::UnsupportedKind(Kind::Scalar(ScalarKind::U8)))
        );
    }

    #[test]
    fn kind_labels() {
        assert_eq!(Kind::Scalar(ScalarKind::Isize).to_string(), "int");
        assert_eq!(Kind::Sequence(ScalarKind::Str).to_string(), "strings");
        assert_eq!(String::new().kind(), Kind::Scalar(ScalarKind::Str));
    }

    #[test]
    fn parsed_values() {
        let mut path = PathBuf::new();
        path.coerce("/tmp/x").unwrap();
        assert_eq!(path, PathBuf::from("/tmp/x"));

        let mut ratio = 0.0f64;
        assert!(ratio.coerce("abc").is_err());
        ratio.coerce("2.5").unwrap();
        assert_eq!(ratio, 2.5);
    }
}
