/*!
The command tree: one [`CommandNode`] per unit, built once from the caller's
value and then handed to a dispatcher or a backend.
 */

use core::fmt;

use tracing::debug;

use crate::{
    descriptor::{self, FieldMeta, FieldRef, OptionDescriptor, Placement},
    errors::Error,
    unit::{GroupFields, Shape, Unit},
};

/// How a node is run. Decided once, by [`classify`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunBinding {
    /// Route to a child; shows help when no child is named
    Group,

    /// [`Command`][crate::unit::Command]: gets the raw argument list
    Argv,

    /// [`SimpleCommand`][crate::unit::SimpleCommand]
    NoArg,

    /// [`ClapCommand`][crate::unit::ClapCommand]: gets clap's matches
    #[cfg(feature = "clap")]
    Clap,
}

/**
Classify a unit by the callable shapes it implements. When more than one
applies, the first in this order wins: group, argv command, no-argument
command, backend-native command.
 */
pub fn classify(unit: &mut dyn Unit) -> Option<RunBinding> {
    if unit.as_group().is_some() {
        return Some(RunBinding::Group);
    }

    if unit.as_command().is_some() {
        return Some(RunBinding::Argv);
    }

    if unit.as_simple_command().is_some() {
        return Some(RunBinding::NoArg);
    }

    #[cfg(feature = "clap")]
    if unit.as_clap_command().is_some() {
        return Some(RunBinding::Clap);
    }

    None
}

/**
A single command or group. Leaves hold the exclusive borrow of the unit they
were built from; descriptors write through it by [`FieldRef`].

A group's unit is split when it's built: its children take their own
borrows, and the group keeps a [`GroupFields`] for its own options.
 */
pub struct CommandNode<'a> {
    pub name: String,
    pub short_help: String,
    pub long_help: String,

    /// Named options, in declaration order
    pub options: Vec<OptionDescriptor>,

    /// Positional options, sorted by index
    pub positionals: Vec<OptionDescriptor>,

    pub children: Vec<CommandNode<'a>>,
    pub binding: RunBinding,
    leaf: Option<&'a mut dyn Unit>,
    group: Option<GroupFields<'a>>,
}

impl<'a> CommandNode<'a> {
    #[inline]
    #[must_use]
    pub fn is_group(&self) -> bool {
        self.binding == RunBinding::Group
    }

    #[must_use]
    pub fn child(&self, name: &str) -> Option<&CommandNode<'a>> {
        self.children.iter().find(|child| child.name == name)
    }

    pub fn child_mut(&mut self, name: &str) -> Option<&mut CommandNode<'a>> {
        self.children.iter_mut().find(|child| child.name == name)
    }

    /// The option that `--{name}` refers to. Ignored options are invisible.
    #[must_use]
    pub fn find_long(&self, name: &str) -> Option<&OptionDescriptor> {
        self.options
            .iter()
            .filter(|option| !option.ignored)
            .find(|option| option.matches_long(name))
    }

    /// The option that `-{short}` refers to. Ignored options are invisible.
    #[must_use]
    pub fn find_short(&self, short: char) -> Option<&OptionDescriptor> {
        self.options
            .iter()
            .filter(|option| !option.ignored)
            .find(|option| option.short == Some(short))
    }

    /// Every option and positional this node actually binds
    pub fn bound(&self) -> impl Iterator<Item = &OptionDescriptor> {
        self.options
            .iter()
            .chain(&self.positionals)
            .filter(|option| !option.ignored)
    }

    /// The unit behind a leaf. Groups have none.
    pub fn unit_mut(&mut self) -> Option<&mut (dyn Unit + 'a)> {
        self.leaf.as_deref_mut()
    }

    /// The option fields of a group. Leaves have none.
    pub fn group_fields_mut(&mut self) -> Option<&mut GroupFields<'a>> {
        self.group.as_mut()
    }
}

/// Tree dump: each node with its options, children indented beneath it
impl fmt::Debug for CommandNode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandNode")
            .field("name", &self.name)
            .field("binding", &self.binding)
            .field("short_help", &self.short_help)
            .field("options", &self.options)
            .field("positionals", &self.positionals)
            .field("children", &self.children)
            .finish_non_exhaustive()
    }
}

/**
Build the tree rooted at `unit`. Fails on the first unit that isn't a
structure ([`Error::InvalidType`]), implements no callable shape
([`Error::NotACommand`]), or has malformed tags.
 */
pub fn build<'a>(
    name: impl Into<String>,
    unit: &'a mut dyn Unit,
) -> Result<CommandNode<'a>, Error> {
    let name = name.into();

    if let Shape::Empty(type_name) = unit.shape() {
        return Err(Error::InvalidType { name, type_name });
    }

    let binding = classify(unit).ok_or_else(|| Error::NotACommand(name.clone()))?;
    let (short_help, long_help) = resolve_help(unit);
    let (options, positionals) = walk_fields(unit)?;
    check_conflicts(&options)?;

    debug!(
        name = %name,
        ?binding,
        options = options.len(),
        positionals = positionals.len(),
        "built command node"
    );

    let (children, leaf, group) = match binding {
        RunBinding::Group => {
            // After the split below, nothing can reach the group as a whole
            if let Some(defaults) = unit.as_defaults() {
                defaults.defaults();
            }

            let Some(group) = unit.as_group() else {
                return Err(Error::NotACommand(name));
            };

            let (entries, fields) = group.subcommands().into_parts();
            check_group_fields(&name, &options, &positionals, &fields)?;

            let children = entries
                .into_iter()
                .map(|(child_name, child)| build(child_name.into_owned(), child))
                .collect::<Result<Vec<_>, _>>()?;

            (children, None, Some(fields))
        }
        _ => (Vec::new(), Some(unit), None),
    };

    Ok(CommandNode {
        name,
        short_help,
        long_help,
        options,
        positionals,
        children,
        binding,
        leaf,
        group,
    })
}

/**
Named options must be reachable unambiguously: no two share a short flag, no
long alias shadows another option, and `--help` stays free for help text.
 */
fn check_conflicts(options: &[OptionDescriptor]) -> Result<(), Error> {
    let bound: Vec<&OptionDescriptor> = options.iter().filter(|option| !option.ignored).collect();

    if let Some(option) = bound.iter().find(|option| option.matches_long("help")) {
        return Err(Error::configuration(
            &option.name,
            "--help is reserved for help text",
        ));
    }

    for (index, later) in bound.iter().enumerate() {
        for earlier in &bound[..index] {
            if let Some(short) = later.short.filter(|&short| earlier.short == Some(short)) {
                return Err(Error::configuration(
                    &later.name,
                    format_args!("-{short} is already taken by {}", earlier.name),
                ));
            }

            let mut names = core::iter::once(later.name.as_str()).chain(later.long);
            if let Some(long) = names.find(|&long| earlier.matches_long(long)) {
                return Err(Error::configuration(
                    &later.name,
                    format_args!("--{long} is already taken by {}", earlier.name),
                ));
            }
        }
    }

    Ok(())
}

/// Every option a group declares must have somewhere to be written, and the
/// first positional always names a child.
fn check_group_fields(
    name: &str,
    options: &[OptionDescriptor],
    positionals: &[OptionDescriptor],
    fields: &GroupFields<'_>,
) -> Result<(), Error> {
    if let Some(positional) = positionals.iter().find(|positional| !positional.ignored) {
        return Err(Error::configuration(
            &positional.name,
            format_args!("group {name} can't take positional arguments; they name subcommands"),
        ));
    }

    match options
        .iter()
        .filter(|option| !option.ignored)
        .find(|option| option.target.get(fields).is_none())
    {
        Some(option) => Err(Error::configuration(
            &option.name,
            format_args!("option of group {name} has no binding; add it to `Subcommands::fields`"),
        )),
        None => Ok(()),
    }
}

/// Long help from `Help`, which is also the short help unless `ShortHelp`
/// overrides it.
fn resolve_help(unit: &dyn Unit) -> (String, String) {
    let long = unit
        .as_help()
        .map(|help| help.help().trim().to_owned())
        .unwrap_or_default();

    let short = match unit.as_short_help() {
        Some(short) => short.short_help().trim().to_owned(),
        None => long.clone(),
    };

    (short, long)
}

type Partitioned = (Vec<OptionDescriptor>, Vec<OptionDescriptor>);

fn walk_fields(unit: &dyn Unit) -> Result<Partitioned, Error> {
    let mut fields: Vec<FieldMeta> = Vec::with_capacity(unit.field_count());
    unit.describe(&mut fields);

    let mut options: Vec<OptionDescriptor> = Vec::new();
    let mut positionals: Vec<OptionDescriptor> = Vec::new();

    for (index, meta) in fields.iter().enumerate() {
        let kind = unit.field(index).map(|value| value.kind());
        let descriptor = descriptor::extract(meta, FieldRef::new(index), kind)?;

        match descriptor.placement {
            Placement::Positional(_) => positionals.push(descriptor),
            Placement::Named => {
                match options.iter_mut().find(|option| option.name == descriptor.name) {
                    Some(existing) => {
                        debug!(
                            name = %descriptor.name,
                            replaced = existing.ident,
                            by = descriptor.ident,
                            "duplicate option name; the later field wins"
                        );
                        *existing = descriptor;
                    }
                    None => options.push(descriptor),
                }
            }
        }
    }

    positionals.sort_by_key(|positional| positional.positional_index());

    if let Some(pair) = positionals
        .windows(2)
        .find(|pair| pair[0].positional_index() == pair[1].positional_index())
    {
        return Err(Error::configuration(
            &pair[1].name,
            format_args!(
                "position {} is already taken by {}",
                pair[1].positional_index(),
                pair[0].name
            ),
        ));
    }

    Ok((options, positionals))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{Command, SimpleCommand, Unit, unit::Subcommands, value::BoxError};

    #[derive(Unit, Default)]
    #[muster(command, simple)]
    struct Both {
        #[muster(position = 2)]
        pub second: String,

        pub level: u8,

        #[muster(position = 1)]
        pub first: String,

        #[muster(short = "q")]
        pub quiet: bool,
    }

    impl Command for Both {
        fn run(&mut self, _args: &[&str]) -> Result<(), BoxError> {
            Ok(())
        }
    }

    impl SimpleCommand for Both {
        fn run(&mut self) -> Result<(), BoxError> {
            Ok(())
        }
    }

    #[derive(Unit, Default)]
    struct Inert {
        pub level: u8,
    }

    #[test]
    fn argv_beats_no_arg() {
        let mut both = Both::default();
        assert_eq!(classify(&mut both), Some(RunBinding::Argv));

        let mut inert = Inert::default();
        assert_eq!(classify(&mut inert), None);
    }

    #[test]
    fn fields_are_partitioned_and_sorted() {
        let mut both = Both::default();
        let node = build("both", &mut both).unwrap();

        let options: Vec<&str> = node.options.iter().map(|option| option.name.as_str()).collect();
        let positionals: Vec<&str> = node
            .positionals
            .iter()
            .map(|positional| positional.name.as_str())
            .collect();

        assert_eq!(options, ["level", "quiet"]);
        assert_eq!(positionals, ["first", "second"]);
        assert_eq!(node.find_short('q').map(|option| option.name.as_str()), Some("quiet"));
        assert!(node.children.is_empty());
    }

    #[test]
    fn groups_nest_and_leaves_do_not() {
        let mut both = Both::default();
        let mut root = Subcommands::new().add("both", &mut both);
        let mut node = build("app", &mut root).unwrap();

        assert!(node.is_group());
        assert!(node.unit_mut().is_none());

        let child = node.child_mut("both").unwrap();
        assert_eq!(child.binding, RunBinding::Argv);
        assert!(child.unit_mut().is_some());
    }

    #[test]
    fn units_without_a_callable_shape_are_rejected() {
        let mut inert = Inert::default();
        let err = build("inert", &mut inert).unwrap_err();
        assert!(matches!(err, Error::NotACommand(ref name) if name == "inert"), "{err:?}");
    }

    #[test]
    fn dump_shows_the_tree() {
        let mut both = Both::default();
        let mut root = Subcommands::new().add("both", &mut both);
        let node = build("app", &mut root).unwrap();

        let dump = format!("{node:?}");
        assert!(dump.contains("name: \"app\""), "{dump}");
        assert!(dump.contains("name: \"both\""), "{dump}");
    }
}
