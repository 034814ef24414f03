/*!
Capability contracts. A [`Unit`] is anything that can sit in a command tree;
what it can *do* is reported through the `as_*` methods, which
`#[derive(Unit)]` fills in from the struct's `#[muster(...)]` attribute.

The callable shapes are [`Command`], [`SimpleCommand`], [`Group`] and (with the
`clap` feature) [`ClapCommand`]. The rest ([`Validate`], [`Defaults`],
[`Help`], [`ShortHelp`]) are optional hooks.
 */

use std::borrow::Cow;

use crate::{
    descriptor::{FieldMeta, Fields},
    value::{BoxError, Value},
};

/// A runnable leaf that receives the raw arguments it was invoked with
pub trait Command {
    fn run(&mut self, args: &[&str]) -> Result<(), BoxError>;
}

/// A runnable leaf that doesn't care about the raw arguments
pub trait SimpleCommand {
    fn run(&mut self) -> Result<(), BoxError>;
}

/// A leaf that wants direct access to clap's parse results
#[cfg(feature = "clap")]
pub trait ClapCommand {
    fn run(&mut self, matches: &clap::ArgMatches) -> Result<(), BoxError>;
}

/// A set of named children, each a command or another group
pub trait Group {
    fn subcommands(&mut self) -> Subcommands<'_>;
}

/// Whole-command validation, run after every value is resolved. A command
/// with its own `Validate` skips the per-field validation of its values.
pub trait Validate {
    fn validate(&self) -> Result<(), BoxError>;
}

/// Set up defaults programmatically, before any declared `default` tags are
/// applied
pub trait Defaults {
    fn defaults(&mut self);
}

/// The long description shown in help text. Also used as the short help
/// unless [`ShortHelp`] is implemented.
pub trait Help {
    fn help(&self) -> &str;
}

/// The one-line description shown in a parent group's command listing
pub trait ShortHelp {
    fn short_help(&self) -> &str;
}

/// What sort of thing a unit is, before classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Structure,

    /// A wrapper with nothing inside it. Contains the wrapper's type name.
    Empty(&'static str),
}

/**
Anything that can be placed in a command tree.

Every method has a default that reports the capability as missing; the derive
overrides the ones named in `#[muster(...)]`.
*/
pub trait Unit: Fields {
    #[inline]
    fn shape(&self) -> Shape {
        Shape::Structure
    }

    #[inline]
    fn as_group(&mut self) -> Option<&mut dyn Group> {
        None
    }

    #[inline]
    fn as_command(&mut self) -> Option<&mut dyn Command> {
        None
    }

    #[inline]
    fn as_simple_command(&mut self) -> Option<&mut dyn SimpleCommand> {
        None
    }

    #[cfg(feature = "clap")]
    #[inline]
    fn as_clap_command(&mut self) -> Option<&mut dyn ClapCommand> {
        None
    }

    #[inline]
    fn as_validate(&self) -> Option<&dyn Validate> {
        None
    }

    #[inline]
    fn as_defaults(&mut self) -> Option<&mut dyn Defaults> {
        None
    }

    #[inline]
    fn as_help(&self) -> Option<&dyn Help> {
        None
    }

    #[inline]
    fn as_short_help(&self) -> Option<&dyn ShortHelp> {
        None
    }
}

macro_rules! forward_unit {
    ($($ptr:ty),*) => {
        $(
            impl<T: Fields + ?Sized> Fields for $ptr {
                #[inline]
                fn describe(&self, fields: &mut Vec<FieldMeta>) {
                    T::describe(self, fields)
                }

                #[inline]
                fn field_count(&self) -> usize {
                    T::field_count(self)
                }

                #[inline]
                fn field(&self, index: usize) -> Option<&dyn Value> {
                    T::field(self, index)
                }

                #[inline]
                fn field_mut(&mut self, index: usize) -> Option<&mut dyn Value> {
                    T::field_mut(self, index)
                }
            }

            impl<T: Unit + ?Sized> Unit for $ptr {
                #[inline]
                fn shape(&self) -> Shape {
                    T::shape(self)
                }

                #[inline]
                fn as_group(&mut self) -> Option<&mut dyn Group> {
                    T::as_group(self)
                }

                #[inline]
                fn as_command(&mut self) -> Option<&mut dyn Command> {
                    T::as_command(self)
                }

                #[inline]
                fn as_simple_command(&mut self) -> Option<&mut dyn SimpleCommand> {
                    T::as_simple_command(self)
                }

                #[cfg(feature = "clap")]
                #[inline]
                fn as_clap_command(&mut self) -> Option<&mut dyn ClapCommand> {
                    T::as_clap_command(self)
                }

                #[inline]
                fn as_validate(&self) -> Option<&dyn Validate> {
                    T::as_validate(self)
                }

                #[inline]
                fn as_defaults(&mut self) -> Option<&mut dyn Defaults> {
                    T::as_defaults(self)
                }

                #[inline]
                fn as_help(&self) -> Option<&dyn Help> {
                    T::as_help(self)
                }

                #[inline]
                fn as_short_help(&self) -> Option<&dyn ShortHelp> {
                    T::as_short_help(self)
                }
            }
        )*
    };
}

forward_unit!(Box<T>, &mut T);

impl<T: Fields> Fields for Option<T> {
    fn describe(&self, fields: &mut Vec<FieldMeta>) {
        if let Some(inner) = self {
            inner.describe(fields)
        }
    }

    fn field_count(&self) -> usize {
        self.as_ref().map_or(0, Fields::field_count)
    }

    fn field(&self, index: usize) -> Option<&dyn Value> {
        self.as_ref()?.field(index)
    }

    fn field_mut(&mut self, index: usize) -> Option<&mut dyn Value> {
        self.as_mut()?.field_mut(index)
    }
}

/// An empty `Option` is an invalid unit; a populated one is its contents.
impl<T: Unit> Unit for Option<T> {
    fn shape(&self) -> Shape {
        match self {
            Some(inner) => inner.shape(),
            None => Shape::Empty(core::any::type_name::<Self>()),
        }
    }

    fn as_group(&mut self) -> Option<&mut dyn Group> {
        self.as_mut()?.as_group()
    }

    fn as_command(&mut self) -> Option<&mut dyn Command> {
        self.as_mut()?.as_command()
    }

    fn as_simple_command(&mut self) -> Option<&mut dyn SimpleCommand> {
        self.as_mut()?.as_simple_command()
    }

    #[cfg(feature = "clap")]
    fn as_clap_command(&mut self) -> Option<&mut dyn ClapCommand> {
        self.as_mut()?.as_clap_command()
    }

    fn as_validate(&self) -> Option<&dyn Validate> {
        self.as_ref()?.as_validate()
    }

    fn as_defaults(&mut self) -> Option<&mut dyn Defaults> {
        self.as_mut()?.as_defaults()
    }

    fn as_help(&self) -> Option<&dyn Help> {
        self.as_ref()?.as_help()
    }

    fn as_short_help(&self) -> Option<&dyn ShortHelp> {
        self.as_ref()?.as_short_help()
    }
}

enum Slot<'a> {
    Value(&'a mut dyn Value),
    Ignored,
    Nested(&'a mut dyn Fields),
}

impl Slot<'_> {
    fn width(&self) -> usize {
        match *self {
            Slot::Value(_) | Slot::Ignored => 1,
            Slot::Nested(ref fields) => fields.field_count(),
        }
    }
}

/**
A group's own option fields, borrowed apart from its children. The slots must
follow the group's [`Fields`] walk exactly: one per option field (ignored or
not), and one per flattened structure.

`#[derive(Unit)]` builds this automatically; a hand-written [`Group`] only
needs one if the group declares options of its own.
*/
#[derive(Default)]
pub struct GroupFields<'a> {
    slots: Vec<Slot<'a>>,
}

impl<'a> GroupFields<'a> {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self { slots: Vec::new() }
    }

    #[must_use]
    pub fn value(mut self, value: &'a mut dyn Value) -> Self {
        self.slots.push(Slot::Value(value));
        self
    }

    /// An ignored field: it takes up an index but is never written
    #[must_use]
    pub fn ignored(mut self) -> Self {
        self.slots.push(Slot::Ignored);
        self
    }

    /// A flattened structure, contributing all of its own fields
    #[must_use]
    pub fn nested(mut self, fields: &'a mut dyn Fields) -> Self {
        self.slots.push(Slot::Nested(fields));
        self
    }
}

/// Descriptions come from the group itself, before it's split
impl Fields for GroupFields<'_> {
    #[inline]
    fn describe(&self, _fields: &mut Vec<FieldMeta>) {}

    fn field_count(&self) -> usize {
        self.slots.iter().map(Slot::width).sum()
    }

    fn field(&self, mut index: usize) -> Option<&dyn Value> {
        for slot in &self.slots {
            let width = slot.width();
            if index < width {
                return match *slot {
                    Slot::Value(ref value) => Some(&**value),
                    Slot::Ignored => None,
                    Slot::Nested(ref fields) => fields.field(index),
                };
            }
            index -= width;
        }

        None
    }

    fn field_mut(&mut self, mut index: usize) -> Option<&mut dyn Value> {
        for slot in &mut self.slots {
            let width = slot.width();
            if index < width {
                return match *slot {
                    Slot::Value(ref mut value) => Some(&mut **value),
                    Slot::Ignored => None,
                    Slot::Nested(ref mut fields) => fields.field_mut(index),
                };
            }
            index -= width;
        }

        None
    }
}

/**
The children of a [`Group`], in the order they were added, along with the
group's own option fields. Adding a child with a name that's already present
replaces the earlier one in place.

`Subcommands` is itself a group, so a bare set of commands can be run without
a wrapper struct:

```ignore
let mut root = Subcommands::new().add("list", &mut list).add("show", &mut show);
muster::dispatch::run("app", &mut root, &args)?;
```
*/
#[derive(Default)]
pub struct Subcommands<'a> {
    entries: Vec<(Cow<'a, str>, &'a mut dyn Unit)>,
    fields: GroupFields<'a>,
}

impl<'a> Subcommands<'a> {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            fields: GroupFields::new(),
        }
    }

    /// Where the group's own options are written
    #[must_use]
    pub fn fields(mut self, fields: GroupFields<'a>) -> Self {
        self.fields = fields;
        self
    }

    #[must_use]
    pub fn add(mut self, name: impl Into<Cow<'a, str>>, unit: &'a mut dyn Unit) -> Self {
        self.insert(name, unit);
        self
    }

    pub fn insert(&mut self, name: impl Into<Cow<'a, str>>, unit: &'a mut dyn Unit) {
        let name = name.into();

        match self.entries.iter_mut().find(|(existing, _)| *existing == name) {
            Some(entry) => entry.1 = unit,
            None => self.entries.push((name, unit)),
        }
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| &**name)
    }

    pub(crate) fn into_parts(self) -> (Vec<(Cow<'a, str>, &'a mut dyn Unit)>, GroupFields<'a>) {
        (self.entries, self.fields)
    }
}

impl core::fmt::Debug for Subcommands<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

impl Group for Subcommands<'_> {
    fn subcommands(&mut self) -> Subcommands<'_> {
        Subcommands {
            entries: self
                .entries
                .iter_mut()
                .map(|(name, unit)| {
                    let unit: &mut dyn Unit = &mut **unit;
                    (Cow::Borrowed(&**name), unit)
                })
                .collect(),
            fields: GroupFields::new(),
        }
    }
}

impl Fields for Subcommands<'_> {
    #[inline]
    fn describe(&self, _fields: &mut Vec<FieldMeta>) {}

    #[inline]
    fn field_count(&self) -> usize {
        0
    }

    #[inline]
    fn field(&self, _index: usize) -> Option<&dyn Value> {
        None
    }

    #[inline]
    fn field_mut(&mut self, _index: usize) -> Option<&mut dyn Value> {
        None
    }
}

impl Unit for Subcommands<'_> {
    #[inline]
    fn as_group(&mut self) -> Option<&mut dyn Group> {
        Some(self)
    }
}

/**
A closure as a command. It has no options of its own; it receives the raw
arguments, like a [`Command`].
 */
pub struct CommandFn<F>(pub F);

impl<F> Command for CommandFn<F>
where
    F: FnMut(&[&str]) -> Result<(), BoxError>,
{
    #[inline]
    fn run(&mut self, args: &[&str]) -> Result<(), BoxError> {
        (self.0)(args)
    }
}

impl<F> Fields for CommandFn<F> {
    #[inline]
    fn describe(&self, _fields: &mut Vec<FieldMeta>) {}

    #[inline]
    fn field_count(&self) -> usize {
        0
    }

    #[inline]
    fn field(&self, _index: usize) -> Option<&dyn Value> {
        None
    }

    #[inline]
    fn field_mut(&mut self, _index: usize) -> Option<&mut dyn Value> {
        None
    }
}

impl<F> Unit for CommandFn<F>
where
    F: FnMut(&[&str]) -> Result<(), BoxError>,
{
    #[inline]
    fn as_command(&mut self) -> Option<&mut dyn Command> {
        Some(self)
    }
}
