/*!
Projecting a built [`CommandNode`] tree onto another argument-parsing
library. A [`Backend`] turns each named option into its own flag type and
each node into its own command type; [`project`] walks the tree bottom-up and
hands it the pieces.

Positionals aren't projected one by one; a backend that wants them reads
[`CommandNode::positionals`] when it builds the command.
 */

use tracing::trace;

use crate::{descriptor::OptionDescriptor, errors::Error, tree::CommandNode};

#[cfg(feature = "clap")]
pub mod clap;

pub trait Backend {
    type Flag;
    type Command;

    /// Register a single named option. Ignored options are never passed here.
    fn flag(&mut self, option: &OptionDescriptor) -> Result<Self::Flag, Error>;

    /// Assemble a node from its already-projected flags and children
    fn command(
        &mut self,
        node: &CommandNode<'_>,
        flags: Vec<Self::Flag>,
        children: Vec<Self::Command>,
    ) -> Result<Self::Command, Error>;
}

/// Project `node` and everything beneath it onto `backend`.
pub fn project<B: Backend + ?Sized>(
    backend: &mut B,
    node: &CommandNode<'_>,
) -> Result<B::Command, Error> {
    let flags = node
        .options
        .iter()
        .filter(|option| !option.ignored)
        .map(|option| backend.flag(option))
        .collect::<Result<Vec<_>, _>>()?;

    let children = node
        .children
        .iter()
        .map(|child| project(backend, child))
        .collect::<Result<Vec<_>, _>>()?;

    trace!(
        node = %node.name,
        flags = flags.len(),
        children = children.len(),
        "projected node"
    );

    backend.command(node, flags, children)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        descriptor::{FieldMeta, Fields, Tags},
        tree,
        unit::{CommandFn, SimpleCommand, Subcommands, Unit},
        value::{BoxError, Value},
    };

    /// Records the shape of the tree as nested strings
    struct Outline;

    impl Backend for Outline {
        type Flag = String;
        type Command = String;

        fn flag(&mut self, option: &OptionDescriptor) -> Result<String, Error> {
            Ok(format!("--{}", option.name))
        }

        fn command(
            &mut self,
            node: &CommandNode<'_>,
            flags: Vec<String>,
            children: Vec<String>,
        ) -> Result<String, Error> {
            let mut parts = vec![node.name.clone()];
            parts.extend(flags);
            if !children.is_empty() {
                parts.push(format!("[{}]", children.join(" ")));
            }

            Ok(parts.join(" "))
        }
    }

    struct Verbose {
        verbose: bool,
    }

    impl Fields for Verbose {
        fn describe(&self, fields: &mut Vec<FieldMeta>) {
            fields.push(FieldMeta {
                ident: "verbose",
                docs: "",
                tags: Tags::default(),
            });
            fields.push(FieldMeta {
                ident: "hidden",
                docs: "",
                tags: Tags {
                    ignore: true,
                    ..Tags::default()
                },
            });
        }

        fn field_count(&self) -> usize {
            2
        }

        fn field(&self, index: usize) -> Option<&dyn Value> {
            match index {
                0 => Some(&self.verbose),
                _ => None,
            }
        }

        fn field_mut(&mut self, index: usize) -> Option<&mut dyn Value> {
            match index {
                0 => Some(&mut self.verbose),
                _ => None,
            }
        }
    }

    impl SimpleCommand for Verbose {
        fn run(&mut self) -> Result<(), BoxError> {
            Ok(())
        }
    }

    impl Unit for Verbose {
        fn as_simple_command(&mut self) -> Option<&mut dyn SimpleCommand> {
            Some(self)
        }
    }

    #[test]
    fn projects_bottom_up() {
        let mut status = Verbose { verbose: false };
        let mut noop = CommandFn(|_: &[&str]| -> Result<(), BoxError> { Ok(()) });
        let mut root = Subcommands::new()
            .add("status", &mut status)
            .add("noop", &mut noop);

        let node = tree::build("app", &mut root).unwrap();
        let outline = project(&mut Outline, &node).unwrap();

        assert_eq!(outline, "app [status --verbose noop]");
    }
}
