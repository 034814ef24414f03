/*!
Error types for building and dispatching a command tree.

Build errors (everything raised by [`tree::build`][crate::tree::build]) abort
construction of the whole tree. Dispatch errors abort only the current
invocation.
 */

use core::fmt::Display;

use lazy_format::lazy_format;

use crate::value::{BoxError, CoercionError};

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The unit was an empty wrapper, so there was no structure to describe
    #[error("{name}: only structures can be commands, got an empty {type_name}")]
    InvalidType {
        name: String,
        type_name: &'static str,
    },

    /// The unit implements none of the callable shapes
    #[error(
        "{0}: not a command; it must implement Command, SimpleCommand, Group, or a backend command"
    )]
    NotACommand(String),

    /// A literal couldn't be written into a field, or a field's kind can't be
    /// represented
    #[error("parsing error: {field}: {source}")]
    Coercion {
        field: String,
        #[source]
        source: CoercionError,
    },

    #[error("missing required positional argument: {0}")]
    MissingPositional(String),

    /// The first argument given to a group didn't name any of its children.
    /// Carries the group's rendered help text.
    #[error("unable to find subcommand {name}\n{help}")]
    UnknownSubcommand { name: String, help: String },

    /// Rejected by a command's `Validate` implementation (`field` is
    /// [`None`]) or by a single field's own validation.
    #[error("validation error: {}{source}", field_prefix(.field))]
    Validation {
        field: Option<String>,
        #[source]
        source: BoxError,
    },

    /// Malformed tags on a field
    #[error("invalid declaration for field {field}: {message}")]
    Configuration { field: String, message: String },

    /// The command line didn't match the option table
    #[error("parsing error: {0}")]
    Parse(String),

    /// The command's own entry point failed
    #[error("{0}")]
    Command(#[source] BoxError),

    #[cfg(feature = "clap")]
    #[error(transparent)]
    Clap(#[from] clap::Error),
}

fn field_prefix(field: &Option<String>) -> impl Display + '_ {
    lazy_format!(match (field) {
        Some(field) => "{field}: ",
        None => "",
    })
}

impl Error {
    pub(crate) fn coercion(field: &str, source: CoercionError) -> Self {
        Self::Coercion {
            field: field.to_owned(),
            source,
        }
    }

    pub(crate) fn configuration(field: &str, message: impl Display) -> Self {
        Self::Configuration {
            field: field.to_owned(),
            message: message.to_string(),
        }
    }
}
