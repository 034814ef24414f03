/*!
Field metadata: what `#[derive(Unit)]` records about each field, and the
[`OptionDescriptor`]s extracted from it.

The derive records tags verbatim. All interpretation (name derivation,
position parsing, alias checks) happens here, at build time, so malformed tags
surface as [`Error::Configuration`].
 */

use core::num::NonZeroUsize;

use heck::ToKebabCase as _;

use crate::{
    errors::Error,
    value::{CoercionError, Kind, Value},
};

/// The raw `#[muster(...)]` tags on a single field
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tags {
    pub name: Option<&'static str>,
    pub help: Option<&'static str>,
    pub default: Option<&'static str>,
    pub short: Option<&'static str>,
    pub long: Option<&'static str>,
    pub position: Option<&'static str>,
    pub ignore: bool,
    pub repeated: bool,
}

/// Everything known about a field before it's interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldMeta {
    pub ident: &'static str,
    pub docs: &'static str,
    pub tags: Tags,
}

/**
Access to the option fields of a structure, in declaration order. Flattened
fields contribute their own fields in place, so an index counts through the
whole flattened walk. Ignored fields are described but have no [`Value`].

This trait is normally implemented by `#[derive(Unit)]`.
*/
pub trait Fields {
    fn describe(&self, fields: &mut Vec<FieldMeta>);

    fn field_count(&self) -> usize;

    fn field(&self, index: usize) -> Option<&dyn Value>;

    fn field_mut(&mut self, index: usize) -> Option<&mut dyn Value>;
}

/// Where an option's value comes from on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// `--name value`, `-n value`
    Named,

    /// The n-th positional argument, starting from 1
    Positional(NonZeroUsize),
}

/// A field's position in its owning structure's flattened field walk; the
/// write-through target of a descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FieldRef(usize);

impl FieldRef {
    #[inline]
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    #[inline]
    #[must_use]
    pub const fn index(&self) -> usize {
        self.0
    }

    pub fn get<'a>(&self, fields: &'a (impl Fields + ?Sized)) -> Option<&'a dyn Value> {
        fields.field(self.0)
    }

    pub fn get_mut<'a>(
        &self,
        fields: &'a mut (impl Fields + ?Sized),
    ) -> Option<&'a mut dyn Value> {
        fields.field_mut(self.0)
    }
}

/// The interpreted metadata of one declared field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionDescriptor {
    pub name: String,
    pub ident: &'static str,
    pub help: &'static str,
    pub default: Option<&'static str>,
    pub short: Option<char>,
    pub long: Option<&'static str>,
    pub ignored: bool,
    pub repeated: bool,
    pub placement: Placement,

    /// [`None`] only for ignored fields
    pub kind: Option<Kind>,
    pub target: FieldRef,
}

impl OptionDescriptor {
    /// The 1-based positional index, or 0 for named options
    #[inline]
    #[must_use]
    pub fn positional_index(&self) -> usize {
        match self.placement {
            Placement::Named => 0,
            Placement::Positional(index) => index.get(),
        }
    }

    #[inline]
    #[must_use]
    pub fn is_positional(&self) -> bool {
        matches!(self.placement, Placement::Positional(_))
    }

    /// Booleans take no argument on the command line
    #[inline]
    #[must_use]
    pub fn is_flag(&self) -> bool {
        self.kind.is_some_and(|kind| kind.is_flag())
    }

    /// The declared default, treating an empty literal as absent
    #[inline]
    #[must_use]
    pub fn default_literal(&self) -> Option<&'static str> {
        self.default.filter(|default| !default.is_empty())
    }

    /// True if `--{option}` refers to this descriptor
    #[must_use]
    pub fn matches_long(&self, option: &str) -> bool {
        self.name == option || self.long == Some(option)
    }
}

/// Interpret a single field's tags. `kind` is the kind of the field's value,
/// or [`None`] if it has no value binding.
pub fn extract(
    meta: &FieldMeta,
    target: FieldRef,
    kind: Option<Kind>,
) -> Result<OptionDescriptor, Error> {
    let tags = &meta.tags;

    let name = match tags.name {
        Some(name) => {
            check_name(name).map_err(|message| Error::configuration(meta.ident, message))?;
            name.to_owned()
        }
        None => meta.ident.trim_start_matches("r#").to_kebab_case(),
    };

    let help = tags.help.unwrap_or(meta.docs);

    let short = tags
        .short
        .map(|short| compute_short(short).map_err(|message| Error::configuration(&name, message)))
        .transpose()?;

    if let Some(long) = tags.long {
        check_name(long).map_err(|message| Error::configuration(&name, message))?;
    }

    let placement = match tags.position {
        None => Placement::Named,
        Some(position) => position
            .trim()
            .parse()
            .ok()
            .and_then(NonZeroUsize::new)
            .map(Placement::Positional)
            .ok_or_else(|| {
                Error::configuration(
                    &name,
                    format_args!("invalid position {position:?}: must be a positive integer"),
                )
            })?,
    };

    let repeated = match kind {
        Some(kind) if tags.repeated && !kind.is_sequence() && !tags.ignore => {
            return Err(Error::coercion(&name, CoercionError::UnsupportedKind(kind)));
        }
        Some(kind) => tags.repeated || kind.is_sequence(),
        None => tags.repeated,
    };

    if kind.is_none() && !tags.ignore {
        return Err(Error::configuration(&name, "field has no value binding"));
    }

    Ok(OptionDescriptor {
        name,
        ident: meta.ident,
        help,
        default: tags.default,
        short,
        long: tags.long,
        ignored: tags.ignore,
        repeated,
        placement,
        kind,
        target,
    })
}

fn check_name(name: &str) -> Result<(), &'static str> {
    if name.starts_with('-') {
        Err("names don't start with '-'; dashes are added automatically")
    } else if !name.starts_with(|c: char| c.is_alphabetic()) {
        Err("names should start with something alphabetic")
    } else if name.contains('=') {
        Err("names must not include an '=', as it is the argument separator")
    } else if name.contains(|c: char| c.is_whitespace()) {
        Err("names shouldn't include whitespace")
    } else {
        Ok(())
    }
}

fn compute_short(short: &str) -> Result<char, &'static str> {
    let mut chars = short.chars();

    match (chars.next(), chars.next()) {
        (Some('-'), None) => Err("short alias must not be '-'"),
        (Some(c), None) if c.is_ascii_graphic() => Ok(c),
        (Some(_), None) => Err("short alias should be an ascii printable"),
        _ => Err("short alias must be exactly one character"),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::value::ScalarKind;

    const STRING: Option<Kind> = Some(Kind::Scalar(ScalarKind::Str));

    fn meta(ident: &'static str, tags: Tags) -> FieldMeta {
        FieldMeta {
            ident,
            docs: "",
            tags,
        }
    }

    #[test]
    fn name_is_kebab_cased() {
        let descriptor =
            extract(&meta("max_retries", Tags::default()), FieldRef::new(0), STRING).unwrap();
        assert_eq!(descriptor.name, "max-retries");
        assert_eq!(descriptor.placement, Placement::Named);
        assert_eq!(descriptor.positional_index(), 0);
    }

    #[test]
    fn explicit_tags() {
        let tags = Tags {
            name: Some("target"),
            help: Some("who to greet"),
            default: Some("World"),
            short: Some("t"),
            long: Some("to"),
            ..Tags::default()
        };

        let descriptor = extract(&meta("name", tags), FieldRef::new(3), STRING).unwrap();
        assert_eq!(descriptor.name, "target");
        assert_eq!(descriptor.help, "who to greet");
        assert_eq!(descriptor.short, Some('t'));
        assert_eq!(descriptor.long, Some("to"));
        assert_eq!(descriptor.default_literal(), Some("World"));
        assert_eq!(descriptor.target.index(), 3);
        assert!(descriptor.matches_long("to"));
        assert!(descriptor.matches_long("target"));
        assert!(!descriptor.matches_long("name"));
    }

    #[test]
    fn help_falls_back_to_docs() {
        let field = FieldMeta {
            ident: "count",
            docs: "How many times",
            tags: Tags::default(),
        };

        let descriptor = extract(&field, FieldRef::new(0), STRING).unwrap();
        assert_eq!(descriptor.help, "How many times");
    }

    #[test]
    fn positions() {
        let tags = Tags {
            position: Some("2"),
            ..Tags::default()
        };

        let descriptor = extract(&meta("output", tags), FieldRef::new(0), STRING).unwrap();
        assert_eq!(descriptor.positional_index(), 2);
        assert!(descriptor.is_positional());
    }

    #[test]
    fn bad_positions_are_rejected() {
        for position in ["0", "-1", "first", ""] {
            let tags = Tags {
                position: Some(position),
                ..Tags::default()
            };

            let err = extract(&meta("output", tags), FieldRef::new(0), STRING).unwrap_err();
            assert!(matches!(err, Error::Configuration { .. }), "{position:?}: {err}");
        }
    }

    #[test]
    fn bad_shorts_are_rejected() {
        for short in ["", "ab", "-", " "] {
            let tags = Tags {
                short: Some(short),
                ..Tags::default()
            };

            let err = extract(&meta("output", tags), FieldRef::new(0), STRING).unwrap_err();
            assert!(matches!(err, Error::Configuration { .. }), "{short:?}: {err}");
        }
    }

    #[test]
    fn repeated_needs_a_sequence() {
        let tags = Tags {
            repeated: true,
            ..Tags::default()
        };

        let err = extract(&meta("files", tags), FieldRef::new(0), STRING).unwrap_err();
        assert!(matches!(
            err,
            Error::Coercion {
                source: CoercionError::UnsupportedKind(_),
                ..
            }
        ));

        let sequence = Some(Kind::Sequence(ScalarKind::Str));
        let descriptor = extract(&meta("files", tags), FieldRef::new(0), sequence).unwrap();
        assert!(descriptor.repeated);

        let implied = extract(&meta("files", Tags::default()), FieldRef::new(0), sequence).unwrap();
        assert!(implied.repeated);
    }

    #[test]
    fn ignored_fields_need_no_value() {
        let tags = Tags {
            ignore: true,
            ..Tags::default()
        };

        let descriptor = extract(&meta("handle", tags), FieldRef::new(0), None).unwrap();
        assert!(descriptor.ignored);
        assert_eq!(descriptor.kind, None);

        let err = extract(&meta("handle", Tags::default()), FieldRef::new(0), None).unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }
}
