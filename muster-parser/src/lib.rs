#![no_std]

/*!
Low-level tokenizing of command-line arguments. Distinguishes long options,
short clusters, positionals, and the `--` terminator; it has no idea what any
of the options mean. Whether an option consumes an argument is decided by the
[`Visitor`], which can request one through [`ArgAccess`].
*/

use ::core::fmt::{self, Debug};

/**
A single raw token from the command line, or a piece of one. Given
`--target foo --path=bar input.txt`, the parser hands `target`, `foo`, `path`,
`bar`, and `input.txt` to the visitor as [`Arg`] values.
*/
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Arg<'arg>(&'arg str);

impl<'arg> Arg<'arg> {
    #[inline]
    #[must_use]
    pub const fn new(arg: &'arg str) -> Self {
        Self(arg)
    }

    #[inline]
    #[must_use]
    pub const fn as_str(&self) -> &'arg str {
        self.0
    }
}

impl Debug for Arg<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Debug::fmt(self.0, f)
    }
}

/**
The [`ArgumentsParser`] operates by passing the arguments it finds into a
[`Visitor`], to be handled.
 */
pub trait Visitor<'arg> {
    type Value;

    /// A positional parameter.
    fn visit_positional(self, argument: Arg<'arg>) -> Self::Value;

    /// A long option that definitely has an argument, because it was given
    /// as `--option=argument`
    fn visit_long_option(self, option: Arg<'arg>, argument: Arg<'arg>) -> Self::Value;

    /// A long option or flag, such as `--option`
    fn visit_long(self, option: Arg<'arg>, arg: impl ArgAccess<'arg>) -> Self::Value;

    /// A short option or flag, such as `-o`
    fn visit_short(self, option: char, arg: impl ArgAccess<'arg>) -> Self::Value;
}

/**
[`ArgAccess`] lets a visitor decide whether a given option needs an argument.

`--foo bar` could be the flag `--foo` followed by the positional `bar`, or the
option `--foo` with the argument `bar`. Likewise `-ab foo` could be `-a b`,
`foo`; or `-a`, `-b foo`; or `-a`, `-b`, `foo`. The parser can't tell, so a
visitor requests an argument only for options that need one, and the parser
works out where that argument comes from.
*/
pub trait ArgAccess<'arg>: Sized {
    /**
    Get an argument from the parser. Flags should simply not call this, so
    that the next token is parsed independently.

    Returns [`None`] if the arguments are exhausted, or if the next token is a
    `--` terminator (which is consumed, switching the parser to positionals).
    */
    fn take(self) -> Option<Arg<'arg>>;
}

#[derive(Debug, Clone, Copy)]
enum State<'arg> {
    Ready,
    PositionalOnly,

    // Always non-empty: the rest of a short cluster like `-abc`
    ShortInProgress(&'arg str),
}

/**
An `ArgumentsParser` is the main entry point into `muster_parser`. Each call
to [`next_arg`][Self::next_arg] consumes one logical argument and sends it to
the given [`Visitor`].

The parser works entirely on borrowed data; the `'arg` lifetime refers to the
loaded command line.
*/
#[derive(Debug, Clone)]
pub struct ArgumentsParser<'arg, I> {
    state: State<'arg>,
    args: I,
}

impl<'arg, I> ArgumentsParser<'arg, I>
where
    I: Iterator<Item = &'arg str>,
{
    /**
    Create a new [`ArgumentsParser`] from the argument tokens. This list should
    *exclude* the program name.
     */
    #[inline]
    #[must_use]
    pub fn new(args: impl IntoIterator<IntoIter = I>) -> Self {
        Self {
            state: State::Ready,
            args: args.into_iter(),
        }
    }

    /// True if a `--` has been seen and everything left is positional
    #[inline]
    #[must_use]
    pub fn positional_only(&self) -> bool {
        matches!(self.state, State::PositionalOnly)
    }

    #[inline]
    fn positional_only_arg<V>(&mut self, visitor: V) -> Option<V::Value>
    where
        V: Visitor<'arg>,
    {
        debug_assert!(!matches!(self.state, State::ShortInProgress(_)));

        self.state = State::PositionalOnly;
        self.args
            .next()
            .map(Arg)
            .map(|arg| visitor.visit_positional(arg))
    }

    #[inline]
    fn standard_arg(&mut self) -> StandardArgAccess<'_, 'arg, I> {
        debug_assert!(!matches!(self.state, State::PositionalOnly));

        self.state = State::Ready;
        StandardArgAccess { parent: self }
    }

    #[inline]
    fn short_arg(&mut self, rest: &'arg str) -> ShortArgAccess<'_, 'arg> {
        debug_assert!(!rest.is_empty());

        self.state = State::ShortInProgress(rest);
        ShortArgAccess {
            rest,
            state: &mut self.state,
        }
    }

    /// `short` is non-empty. Anything after its first character is a
    /// candidate argument; otherwise the next token is.
    #[inline]
    fn handle_short_argument<V>(&mut self, short: &'arg str, visitor: V) -> Option<V::Value>
    where
        V: Visitor<'arg>,
    {
        let mut chars = short.chars();
        let option = chars.next()?;

        Some(match chars.as_str() {
            "" => visitor.visit_short(option, self.standard_arg()),
            rest => visitor.visit_short(option, self.short_arg(rest)),
        })
    }

    pub fn next_arg<V>(&mut self, visitor: V) -> Option<V::Value>
    where
        V: Visitor<'arg>,
    {
        match self.state {
            State::Ready => match self.args.next()? {
                "--" => self.positional_only_arg(visitor),
                "-" => Some(visitor.visit_positional(Arg("-"))),
                argument => match argument.strip_prefix("--") {
                    Some(option) => Some(match split_once(option, b'=') {
                        Some((option, argument)) => {
                            visitor.visit_long_option(Arg(option), Arg(argument))
                        }
                        None => visitor.visit_long(Arg(option), self.standard_arg()),
                    }),
                    None => match argument.strip_prefix('-') {
                        Some(short) => self.handle_short_argument(short, visitor),
                        None => Some(visitor.visit_positional(Arg(argument))),
                    },
                },
            },
            State::PositionalOnly => self.positional_only_arg(visitor),
            State::ShortInProgress(short) => self.handle_short_argument(short, visitor),
        }
    }

    /// Consume the parser, yielding every token it hasn't looked at yet. A
    /// half-finished short cluster is dropped.
    pub fn into_remaining(self) -> I {
        self.args
    }
}

/// Gets the argument from the next token. Handles `--`.
struct StandardArgAccess<'a, 'arg, I> {
    parent: &'a mut ArgumentsParser<'arg, I>,
}

impl<'arg, I> ArgAccess<'arg> for StandardArgAccess<'_, 'arg, I>
where
    I: Iterator<Item = &'arg str>,
{
    fn take(self) -> Option<Arg<'arg>> {
        match self.parent.args.next()? {
            "--" => {
                self.parent.state = State::PositionalOnly;
                None
            }
            arg => Some(Arg(arg)),
        }
    }
}

/// Gets the argument from the rest of a short cluster, so `-ovalue` is
/// equivalent to `-o value`.
struct ShortArgAccess<'a, 'arg> {
    rest: &'arg str,
    state: &'a mut State<'arg>,
}

impl<'arg> ArgAccess<'arg> for ShortArgAccess<'_, 'arg> {
    fn take(self) -> Option<Arg<'arg>> {
        debug_assert!(matches!(*self.state, State::ShortInProgress(rest) if rest == self.rest));

        *self.state = State::Ready;
        Some(Arg(self.rest))
    }
}

fn split_once(input: &str, delimiter: u8) -> Option<(&str, &str)> {
    // The delimiter is ASCII, so both halves stay on char boundaries
    memchr::memchr(delimiter, input.as_bytes()).map(|i| (&input[..i], &input[i + 1..]))
}
