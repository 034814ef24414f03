/*!
The native dispatcher: route arguments down a [`CommandNode`] tree, write
option and positional values into the selected leaf, validate it, and run it.
 */

use muster_parser::{Arg, ArgAccess, ArgumentsParser, Visitor};
use tracing::{debug, trace};

use crate::{
    descriptor::{Fields, OptionDescriptor},
    errors::Error,
    help::render_help,
    tree::{self, CommandNode, RunBinding},
    unit::{GroupFields, Unit},
    value::Value,
};

/// What happened during a successful dispatch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A leaf command ran to completion
    Ran,

    /// Help was requested (or a group was given nothing to do); here's the
    /// text to show.
    Help(String),
}

/// Build the tree for `unit` and dispatch `args` (excluding the program
/// name) through it.
pub fn run(name: &str, unit: &mut dyn Unit, args: &[&str]) -> Result<Outcome, Error> {
    let mut root = tree::build(name, unit)?;
    dispatch(name, &mut root, args)
}

/**
Dispatch `args` through an already-built tree. `path` is the name the node was
invoked as, for help text; it grows by one child name per level.
 */
pub fn dispatch(
    path: &str,
    node: &mut CommandNode<'_>,
    args: &[&str],
) -> Result<Outcome, Error> {
    match node.binding {
        RunBinding::Group => dispatch_group(path, node, args),

        #[cfg(feature = "clap")]
        RunBinding::Clap => {
            debug!(path, "handing leaf to clap");
            crate::backend::clap::bind_clap(path, node)?.execute(args.iter().copied())
        }

        RunBinding::Argv | RunBinding::NoArg => dispatch_leaf(path, node, args),
    }
}

/**
True if these arguments ask for help. Only applies if the first argument is a
flag: then any `--help` (up to a `--` terminator) counts, and so does `-h`
if `short_h` is set (that is, when no option has claimed `-h` for itself).
 */
#[must_use]
pub fn wants_help(args: &[&str], short_h: bool) -> bool {
    match args.first() {
        Some(first) if first.starts_with('-') => args
            .iter()
            .take_while(|&&arg| arg != "--")
            .any(|&arg| arg == "--help" || (short_h && arg == "-h")),
        _ => false,
    }
}

fn short_h_free(node: &CommandNode<'_>) -> bool {
    node.find_short('h').is_none()
}

fn dispatch_group(
    path: &str,
    node: &mut CommandNode<'_>,
    args: &[&str],
) -> Result<Outcome, Error> {
    if args.is_empty() || wants_help(args, short_h_free(node)) {
        return Ok(Outcome::Help(render_help(path, node)));
    }

    let Some((name, rest)) = scan_group_options(node, args)? else {
        return Ok(Outcome::Help(render_help(path, node)));
    };

    // Help is rendered before the mutable lookup so the error can carry it
    if node.child(name).is_none() {
        return Err(Error::UnknownSubcommand {
            name: name.to_owned(),
            help: render_help(path, node),
        });
    }

    let child = node
        .child_mut(name)
        .ok_or_else(|| Error::NotACommand(name.to_owned()))?;

    let path = format!("{path} {name}");
    trace!(path = %path, "descending into subcommand");
    dispatch(&path, child, &rest)
}

/**
Apply a group's declared defaults, then the options written in front of the
subcommand name. Returns that name and every argument after it, or [`None`]
if there were only options.
 */
fn scan_group_options<'arg>(
    node: &mut CommandNode<'_>,
    args: &[&'arg str],
) -> Result<Option<(&'arg str, Vec<&'arg str>)>, Error> {
    let options = node.options.clone();
    let fields = group_fields(node)?;
    apply_tag_defaults(fields, &options)?;

    let mut scan = Scan::new(&options, fields);
    let mut parser = ArgumentsParser::new(args.iter().copied());

    while scan.positionals.is_empty() {
        match parser.next_arg(&mut scan) {
            Some(result) => result?,
            None => break,
        }
    }

    let Scan {
        fields,
        positionals,
        ..
    } = scan;

    validate_fields(&*fields, &options)?;

    Ok(positionals
        .first()
        .map(|&name| (name, parser.into_remaining().collect())))
}

fn dispatch_leaf(
    path: &str,
    node: &mut CommandNode<'_>,
    args: &[&str],
) -> Result<Outcome, Error> {
    if wants_help(args, short_h_free(node)) {
        return Ok(Outcome::Help(render_help(path, node)));
    }

    let tokens = scan_options(node, args)?;
    debug!(path, positionals = tokens.len(), "options written; running leaf");
    finish_leaf(node, &tokens, |unit, binding| match binding {
        RunBinding::Argv => match unit.as_command() {
            Some(command) => command.run(args).map_err(Error::Command),
            None => Err(Error::NotACommand(path.to_owned())),
        },
        _ => invoke_simple(path, unit),
    })?;

    Ok(Outcome::Ran)
}

/// Run a leaf that doesn't care about its arguments
pub(crate) fn invoke_simple(path: &str, unit: &mut dyn Unit) -> Result<(), Error> {
    match unit.as_simple_command() {
        Some(command) => command.run().map_err(Error::Command),
        None => Err(Error::NotACommand(path.to_owned())),
    }
}

/**
Apply defaults, then the named options in `args`. Returns every positional
token, in order.
 */
fn scan_options<'arg>(
    node: &mut CommandNode<'_>,
    args: &[&'arg str],
) -> Result<Vec<&'arg str>, Error> {
    let options = node.options.clone();
    let unit = leaf_unit(node)?;
    apply_defaults(unit, &options)?;

    let mut scan = Scan::new(&options, unit);

    let mut parser = ArgumentsParser::new(args.iter().copied());
    while let Some(result) = parser.next_arg(&mut scan) {
        result?;
    }

    Ok(scan.positionals)
}

/**
Everything after named options: positionals, validation, then the leaf's own
entry point, which `invoke` selects by binding.
 */
pub(crate) fn finish_leaf(
    node: &mut CommandNode<'_>,
    tokens: &[&str],
    invoke: impl FnOnce(&mut dyn Unit, RunBinding) -> Result<(), Error>,
) -> Result<(), Error> {
    let positionals = node.positionals.clone();
    let bound: Vec<OptionDescriptor> = node.bound().cloned().collect();
    let binding = node.binding;
    let unit = leaf_unit(node)?;

    resolve_positionals(unit, &positionals, tokens)?;
    validate(unit, &bound)?;
    invoke(unit, binding)
}

pub(crate) fn leaf_unit<'n>(node: &'n mut CommandNode<'_>) -> Result<&'n mut dyn Unit, Error> {
    let name = node.name.clone();
    match node.unit_mut() {
        Some(unit) => Ok(unit),
        None => Err(Error::NotACommand(name)),
    }
}

pub(crate) fn group_fields<'n, 'a>(
    node: &'n mut CommandNode<'a>,
) -> Result<&'n mut GroupFields<'a>, Error> {
    let name = node.name.clone();
    match node.group_fields_mut() {
        Some(fields) => Ok(fields),
        None => Err(Error::NotACommand(name)),
    }
}

pub(crate) fn target<'u, F: Fields + ?Sized>(
    fields: &'u mut F,
    descriptor: &OptionDescriptor,
) -> Result<&'u mut dyn Value, Error> {
    descriptor.target.get_mut(fields).ok_or_else(|| {
        Error::configuration(&descriptor.name, "field has no value binding")
    })
}

/// Run the `Defaults` hook, then apply the declared defaults of named options.
pub(crate) fn apply_defaults(
    unit: &mut dyn Unit,
    options: &[OptionDescriptor],
) -> Result<(), Error> {
    if let Some(defaults) = unit.as_defaults() {
        defaults.defaults();
    }

    apply_tag_defaults(unit, options)
}

pub(crate) fn apply_tag_defaults<F: Fields + ?Sized>(
    fields: &mut F,
    options: &[OptionDescriptor],
) -> Result<(), Error> {
    options
        .iter()
        .filter(|option| !option.ignored)
        .filter_map(|option| option.default_literal().map(|default| (option, default)))
        .try_for_each(|(option, default)| {
            target(fields, option)?
                .coerce_default(default)
                .map_err(|source| Error::coercion(&option.name, source))
        })
}

/**
Write a single explicit value. A repeated option is emptied the first time
it's seen, then each occurrence appends (splitting on commas); a single
option keeps the last value given.
 */
pub(crate) fn write_option<F: Fields + ?Sized>(
    fields: &mut F,
    option: &OptionDescriptor,
    first: bool,
    literal: &str,
) -> Result<(), Error> {
    let value = target(fields, option)?;

    let result = match option.repeated {
        true => {
            if first {
                value.clear();
            }

            literal.split(',').try_for_each(|piece| value.append(piece))
        }
        false => value.coerce(literal),
    };

    result.map_err(|source| Error::coercion(&option.name, source))
}

/**
Hand positional tokens to the positional options in index order. A repeated
positional takes every remaining token; a missing one falls back to its
default or is an error. Leftover tokens are ignored.
 */
pub(crate) fn resolve_positionals(
    unit: &mut dyn Unit,
    positionals: &[OptionDescriptor],
    tokens: &[&str],
) -> Result<(), Error> {
    let mut tokens = tokens.iter().copied().peekable();

    for positional in positionals.iter().filter(|positional| !positional.ignored) {
        let value = target(unit, positional)?;

        let coerced = if tokens.peek().is_none() {
            match positional.default_literal() {
                Some(default) => value.coerce_default(default),
                None => return Err(Error::MissingPositional(positional.name.clone())),
            }
        } else if positional.repeated {
            value.clear();
            tokens.by_ref().try_for_each(|token| value.append(token))
        } else {
            tokens.next().map_or(Ok(()), |token| value.coerce(token))
        };

        coerced.map_err(|source| Error::coercion(&positional.name, source))?;
    }

    let extra = tokens.count();
    if extra > 0 {
        trace!(extra, "unclaimed positional arguments");
    }

    Ok(())
}

/// A command's own `Validate` replaces the per-field validation of its values
pub(crate) fn validate(unit: &mut dyn Unit, bound: &[OptionDescriptor]) -> Result<(), Error> {
    if let Some(validator) = unit.as_validate() {
        return validator
            .validate()
            .map_err(|source| Error::Validation { field: None, source });
    }

    validate_fields(&*unit, bound)
}

/// Let each bound value validate itself
pub(crate) fn validate_fields<F: Fields + ?Sized>(
    fields: &F,
    bound: &[OptionDescriptor],
) -> Result<(), Error> {
    bound.iter().filter(|option| !option.ignored).try_for_each(|option| {
        let result = match option.target.get(fields) {
            Some(value) => value.validate(),
            None => Ok(()),
        };

        result.map_err(|source| Error::Validation {
            field: Some(option.name.clone()),
            source,
        })
    })
}

/// The visitor that writes named options as the parser finds them
struct Scan<'s, 'arg, F: ?Sized> {
    options: &'s [OptionDescriptor],
    fields: &'s mut F,
    seen: Vec<bool>,
    positionals: Vec<&'arg str>,
}

impl<'s, F: Fields + ?Sized> Scan<'s, '_, F> {
    fn new(options: &'s [OptionDescriptor], fields: &'s mut F) -> Self {
        Self {
            options,
            fields,
            seen: vec![false; options.len()],
            positionals: Vec::new(),
        }
    }

    fn write(&mut self, index: usize, literal: &str) -> Result<(), Error> {
        let option = &self.options[index];
        let first = !std::mem::replace(&mut self.seen[index], true);

        trace!(option = %option.name, literal, "option value");
        write_option(&mut *self.fields, option, first, literal)
    }

    fn long(&self, name: &str) -> Result<usize, Error> {
        self.options
            .iter()
            .position(|option| !option.ignored && option.matches_long(name))
            .ok_or_else(|| Error::Parse(format!("unknown flag: --{name}")))
    }

    fn short(&self, short: char) -> Result<usize, Error> {
        self.options
            .iter()
            .position(|option| !option.ignored && option.short == Some(short))
            .ok_or_else(|| {
                Error::Parse(format!("unknown shorthand flag: '{short}' in -{short}"))
            })
    }

    fn present<'arg>(
        &mut self,
        index: usize,
        display: impl FnOnce() -> String,
        arg: impl ArgAccess<'arg>,
    ) -> Result<(), Error> {
        if self.options[index].is_flag() {
            return self.write(index, "true");
        }

        match arg.take() {
            Some(argument) => self.write(index, argument.as_str()),
            None => Err(Error::Parse(format!("flag needs an argument: {}", display()))),
        }
    }
}

impl<'arg, F: Fields + ?Sized> Visitor<'arg> for &mut Scan<'_, 'arg, F> {
    type Value = Result<(), Error>;

    fn visit_positional(self, argument: Arg<'arg>) -> Self::Value {
        self.positionals.push(argument.as_str());
        Ok(())
    }

    fn visit_long_option(self, option: Arg<'arg>, argument: Arg<'arg>) -> Self::Value {
        let index = self.long(option.as_str())?;
        self.write(index, argument.as_str())
    }

    fn visit_long(self, option: Arg<'arg>, arg: impl ArgAccess<'arg>) -> Self::Value {
        let name = option.as_str();
        let index = self.long(name)?;
        self.present(index, || format!("--{name}"), arg)
    }

    fn visit_short(self, option: char, arg: impl ArgAccess<'arg>) -> Self::Value {
        let index = self.short(option)?;
        self.present(index, || format!("-{option}"), arg)
    }
}
