/*!
The [`clap`] backend. Every node becomes a [`clap::Command`] and every named
option a [`clap::Arg`]; clap does the parsing, then the values it matched are
written back through the same paths the native dispatcher uses, so defaults,
positionals and validation behave identically.

Leaves get a single catch-all positional, whose tokens are resolved against
the node's positionals afterwards.
 */

use std::ffi::OsStr;

use clap::{
    Arg, ArgAction, ArgMatches,
    builder::TypedValueParser,
    error::ErrorKind,
};
use joinery::JoinableIterator as _;
use tracing::debug;

use super::{Backend, project};
use crate::{
    descriptor::{Fields, OptionDescriptor},
    dispatch::{
        Outcome, apply_defaults, apply_tag_defaults, finish_leaf, group_fields, invoke_simple,
        leaf_unit, validate_fields, write_option,
    },
    errors::Error,
    help::render_help,
    tree::{CommandNode, RunBinding},
    value::{CoercionError, Kind, Scalar, ScalarKind},
};

/// The id of the catch-all positional on every leaf
const ARGS: &str = "@args";

/// Projects nodes onto [`clap::Command`]s
#[derive(Debug, Default, Clone, Copy)]
pub struct ClapBackend;

impl Backend for ClapBackend {
    type Flag = Arg;
    type Command = clap::Command;

    fn flag(&mut self, option: &OptionDescriptor) -> Result<Arg, Error> {
        let kind = option
            .kind
            .ok_or_else(|| Error::configuration(&option.name, "field has no value binding"))?;

        let help = match option.default_literal() {
            Some(default) => format!("{} [default: {default}]", option.help),
            None => option.help.to_owned(),
        };

        let mut arg = Arg::new(option.name.clone())
            .long(option.name.clone())
            .help(help)
            .value_parser(KindParser {
                kind,
                repeated: option.repeated,
            });

        if let Some(short) = option.short {
            arg = arg.short(short);
        }

        if let Some(long) = option.long {
            arg = arg.visible_alias(long);
        }

        Ok(match (option.is_flag(), option.repeated) {
            (true, _) => arg
                .action(ArgAction::Set)
                .num_args(0..=1)
                .require_equals(true)
                .default_missing_value("true"),
            (false, true) => arg.action(ArgAction::Append).value_name(kind.element().label()),
            (false, false) => arg.action(ArgAction::Set).value_name(kind.element().label()),
        })
    }

    fn command(
        &mut self,
        node: &CommandNode<'_>,
        flags: Vec<Arg>,
        children: Vec<clap::Command>,
    ) -> Result<clap::Command, Error> {
        let mut command = clap::Command::new(node.name.clone())
            .disable_help_subcommand(true)
            .args_override_self(true)
            .args(flags);

        if !node.short_help.is_empty() {
            command = command.about(node.short_help.clone());
        }

        if !node.long_help.is_empty() {
            command = command.long_about(node.long_help.clone());
        }

        if node.is_group() {
            command = command.subcommands(children);
        } else {
            let positionals = node
                .positionals
                .iter()
                .filter(|positional| !positional.ignored)
                .map(|positional| positional.name.as_str())
                .join_with(" ")
                .to_string();

            command = command.arg(
                Arg::new(ARGS)
                    .num_args(0..)
                    .action(ArgAction::Append)
                    .value_name("ARGS")
                    .help(positionals),
            );
        }

        // An option that claims -h keeps it; help is then only --help
        if node.find_short('h').is_some() {
            command = command
                .disable_help_flag(true)
                .arg(Arg::new("help").long("help").action(ArgAction::Help));
        }

        Ok(command)
    }
}

/// Check a literal against a kind without keeping the parsed value
fn check(kind: ScalarKind, literal: &str) -> Result<(), CoercionError> {
    fn parse<T: Scalar>(literal: &str) -> Result<(), CoercionError> {
        T::parse_literal(literal).map(drop)
    }

    let parse: fn(&str) -> Result<(), CoercionError> = match kind {
        ScalarKind::Bool => parse::<bool>,
        ScalarKind::I8 => parse::<i8>,
        ScalarKind::I16 => parse::<i16>,
        ScalarKind::I32 => parse::<i32>,
        ScalarKind::I64 => parse::<i64>,
        ScalarKind::Isize => parse::<isize>,
        ScalarKind::U8 => parse::<u8>,
        ScalarKind::U16 => parse::<u16>,
        ScalarKind::U32 => parse::<u32>,
        ScalarKind::U64 => parse::<u64>,
        ScalarKind::Usize => parse::<usize>,
        ScalarKind::F32 => parse::<f32>,
        ScalarKind::F64 => parse::<f64>,
        ScalarKind::Duration => parse::<core::time::Duration>,

        // Anything is a valid string; custom types check themselves on write
        ScalarKind::Str | ScalarKind::Path | ScalarKind::Custom(_) => return Ok(()),
    };

    parse(literal)
}

/// Validates values as clap sees them, but hands back the raw literal. The
/// typed write happens later, through the unit's own fields.
#[derive(Debug, Clone, Copy)]
struct KindParser {
    kind: Kind,
    repeated: bool,
}

impl TypedValueParser for KindParser {
    type Value = String;

    fn parse_ref(
        &self,
        cmd: &clap::Command,
        _arg: Option<&Arg>,
        value: &OsStr,
    ) -> Result<String, clap::Error> {
        let literal = value
            .to_str()
            .ok_or_else(|| clap::Error::new(ErrorKind::InvalidUtf8).with_cmd(cmd))?;

        let result = match self.repeated {
            true => literal
                .split(',')
                .try_for_each(|piece| check(self.kind.element(), piece)),
            false => check(self.kind.element(), literal),
        };

        result.map_err(|err| clap::Error::raw(ErrorKind::ValueValidation, err).with_cmd(cmd))?;
        Ok(literal.to_owned())
    }
}

/**
Build the clap side of `node`. `path` is the name the node was invoked as;
it's used as the binary name in clap's usage lines.
 */
pub fn bind_clap<'n, 'a>(
    path: &str,
    node: &'n mut CommandNode<'a>,
) -> Result<ClapApp<'n, 'a>, Error> {
    let command = project(&mut ClapBackend, node)?.bin_name(path.to_owned());

    Ok(ClapApp {
        path: path.to_owned(),
        node,
        command,
    })
}

/// A command tree paired with its clap projection, ready to parse
pub struct ClapApp<'n, 'a> {
    path: String,
    node: &'n mut CommandNode<'a>,
    command: clap::Command,
}

impl<'n, 'a> ClapApp<'n, 'a> {
    /// The projected command, for callers that want to tweak or inspect it
    #[must_use]
    pub fn command(&self) -> &clap::Command {
        &self.command
    }

    pub fn command_mut(&mut self) -> &mut clap::Command {
        &mut self.command
    }

    /// Parse `args` (excluding the program name) with clap, then write the
    /// results into the tree and run the selected leaf.
    pub fn execute<'t>(self, args: impl IntoIterator<Item = &'t str>) -> Result<Outcome, Error> {
        let ClapApp {
            path,
            node,
            command,
        } = self;

        let argv = core::iter::once(path.clone()).chain(args.into_iter().map(str::to_owned));

        let matches = match command.try_get_matches_from(argv) {
            Ok(matches) => matches,
            Err(err) => {
                return match err.kind() {
                    ErrorKind::DisplayHelp
                    | ErrorKind::DisplayVersion
                    | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                        Ok(Outcome::Help(err.render().to_string()))
                    }
                    _ => Err(err.into()),
                };
            }
        };

        apply_matches(&path, node, &matches)
    }
}

fn apply_matches(
    path: &str,
    node: &mut CommandNode<'_>,
    matches: &ArgMatches,
) -> Result<Outcome, Error> {
    if node.is_group() {
        let options = node.options.clone();
        let fields = group_fields(node)?;
        apply_tag_defaults(fields, &options)?;
        write_matches(fields, &options, matches)?;
        validate_fields(&*fields, &options)?;

        return match matches.subcommand() {
            None => Ok(Outcome::Help(render_help(path, node))),
            Some((name, matches)) => {
                let child = node
                    .child_mut(name)
                    .ok_or_else(|| Error::NotACommand(name.to_owned()))?;

                apply_matches(&format!("{path} {name}"), child, matches)
            }
        };
    }

    debug!(path, "writing clap matches");

    let options = node.options.clone();
    let unit = leaf_unit(node)?;
    apply_defaults(unit, &options)?;
    write_matches(unit, &options, matches)?;

    let tokens: Vec<&str> = matches
        .get_many::<String>(ARGS)
        .into_iter()
        .flatten()
        .map(String::as_str)
        .collect();

    finish_leaf(node, &tokens, |unit, binding| match binding {
        RunBinding::Clap => match unit.as_clap_command() {
            Some(command) => command.run(matches).map_err(Error::Command),
            None => Err(Error::NotACommand(path.to_owned())),
        },
        RunBinding::Argv => match unit.as_command() {
            Some(command) => command.run(&tokens).map_err(Error::Command),
            None => Err(Error::NotACommand(path.to_owned())),
        },
        _ => invoke_simple(path, unit),
    })?;

    Ok(Outcome::Ran)
}

/// Write every value clap matched for `options`, in command-line order
fn write_matches<F: Fields + ?Sized>(
    fields: &mut F,
    options: &[OptionDescriptor],
    matches: &ArgMatches,
) -> Result<(), Error> {
    for option in options.iter().filter(|option| !option.ignored) {
        let Some(values) = matches.get_many::<String>(&option.name) else {
            continue;
        };

        for (index, literal) in values.enumerate() {
            write_option(fields, option, index == 0, literal)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checks_by_kind() {
        assert!(check(ScalarKind::U8, "255").is_ok());
        assert!(check(ScalarKind::U8, "256").is_err());
        assert!(check(ScalarKind::Bool, "maybe").is_err());
        assert!(check(ScalarKind::Duration, "1h30m").is_ok());
        assert!(check(ScalarKind::Str, "anything").is_ok());
        assert!(check(ScalarKind::Custom("color"), "anything").is_ok());
    }
}
