/*!
Help text for a [`CommandNode`].

Overall structure, for a leaf:

```text
Usage:    greet [args] <target>
Say hello to someone.

Arguments:
  <target>  string  who to greet

Flags:
  -v,  --verbose                             print more

Options:
  -n,  --name     string  (default='World')  what to call yourself
```

and for a group:

```text
Usage:    app <cmd> [args]
An example application.

Commands:
  greet  Say hello to someone.
  list   List things.
```

Flags (booleans) and options share a single aligned table, so their columns
line up across both sections. Rows are sorted by name within each section.
 */

use core::fmt::{self, Display};

use indent_write::fmt::IndentWriter;
use joinery::JoinableIterator as _;
use lazy_format::lazy_format;
use textwrap::core::display_width;

use crate::{
    descriptor::OptionDescriptor,
    tree::CommandNode,
    value::{Kind, ScalarKind},
};

/// Render the help text for `node`, invoked as `name` (for subcommands,
/// usually the whole path, like `app greet`).
#[must_use]
pub fn render_help(name: &str, node: &CommandNode<'_>) -> String {
    HelpText { name, node }.to_string()
}

/// Lazily rendered help text; [`render_help`] is the usual way to get one.
pub struct HelpText<'n, 'a> {
    pub name: &'n str,
    pub node: &'n CommandNode<'a>,
}

impl Display for HelpText<'_, '_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let node = self.node;

        match node.is_group() {
            true => writeln!(f, "Usage:    {} <cmd> [args]", self.name)?,
            false => writeln!(
                f,
                "Usage:    {} [args]{}",
                self.name,
                node.positionals
                    .iter()
                    .filter(|positional| !positional.ignored)
                    .map(|positional| lazy_format!(" {}", placeholder(positional)))
                    .join_concat()
            )?,
        }

        if !node.long_help.is_empty() {
            writeln!(f, "{}", node.long_help)?;
        }

        if node.is_group() {
            let mut children: Vec<_> = node
                .children
                .iter()
                .map(|child| [child.name.clone(), child.short_help.clone()])
                .collect();
            children.sort();

            maybe_section(f, "Commands", &children)?;
        } else {
            let arguments: Vec<_> = node
                .positionals
                .iter()
                .filter(|positional| !positional.ignored)
                .map(|positional| {
                    [
                        placeholder(positional).to_string(),
                        kind_label(positional.kind),
                        default_label(positional),
                        positional.help.to_owned(),
                    ]
                })
                .collect();

            maybe_section(f, "Arguments", &arguments)?;
        }

        let mut named: Vec<&OptionDescriptor> =
            node.options.iter().filter(|option| !option.ignored).collect();
        named.sort_by(|a, b| a.name.cmp(&b.name));

        let (flags, options): (Vec<_>, Vec<_>) =
            named.into_iter().partition(|option| option.is_flag());

        let flags: Vec<_> = flags.into_iter().map(option_row).collect();
        let options: Vec<_> = options.into_iter().map(option_row).collect();
        let widths = column_widths(flags.iter().chain(&options));

        for (header, rows) in [("Flags", &flags), ("Options", &options)] {
            if !rows.is_empty() {
                section(f, header, |out| {
                    rows.iter().try_for_each(|row| write_row(out, &widths, row))
                })?;
            }
        }

        Ok(())
    }
}

/// `<name>` when required, `[name]` when defaulted, with `...` if repeated
fn placeholder(positional: &OptionDescriptor) -> impl Display + '_ {
    let name = positional.name.as_str();
    let repeat = if positional.repeated { "..." } else { "" };

    lazy_format!(match (positional.default_literal()) {
        Some(_) => "[{name}{repeat}]",
        None => "<{name}>{repeat}",
    })
}

fn option_row(option: &OptionDescriptor) -> [String; 5] {
    [
        option
            .short
            .map(|short| format!("-{short},"))
            .unwrap_or_default(),
        format!("--{}", option.name),
        kind_label(option.kind),
        default_label(option),
        option.help.to_owned(),
    ]
}

/// Flags take no argument, so they show no kind
fn kind_label(kind: Option<Kind>) -> String {
    match kind {
        None | Some(Kind::Scalar(ScalarKind::Bool)) => String::new(),
        Some(kind) => kind.to_string(),
    }
}

fn default_label(option: &OptionDescriptor) -> String {
    let Some(default) = option.default_literal() else {
        return String::new();
    };

    match option.kind.map(|kind| kind.element()) {
        Some(ScalarKind::Bool) if !option.repeated => {
            format!("(default={})", default == "true")
        }
        Some(ScalarKind::Str) => format!("(default='{default}')"),
        _ => format!("(default={default})"),
    }
}

fn column_widths<'r, const N: usize>(
    rows: impl IntoIterator<Item = &'r [String; N]>,
) -> [usize; N] {
    rows.into_iter().fold([0; N], |mut widths, row| {
        widths
            .iter_mut()
            .zip(row)
            .for_each(|(width, cell)| *width = (*width).max(display_width(cell)));
        widths
    })
}

/// Write one table row. Columns that are empty in every row are skipped
/// entirely; trailing padding is trimmed.
fn write_row<const N: usize>(
    out: &mut impl fmt::Write,
    widths: &[usize; N],
    row: &[String; N],
) -> fmt::Result {
    let line = row
        .iter()
        .zip(widths)
        .filter(|&(_, &width)| width > 0)
        .map(|(cell, &width)| {
            let pad = width - display_width(cell);
            lazy_format!("{cell}{:pad$}", "")
        })
        .join_with("  ")
        .to_string();

    writeln!(out, "{}", line.trim_end())
}

fn section<O: fmt::Write + ?Sized, T>(
    out: &mut O,
    header: &str,
    body: impl FnOnce(&mut IndentWriter<'static, &mut O>) -> Result<T, fmt::Error>,
) -> Result<T, fmt::Error> {
    writeln!(out, "\n{header}:")?;
    body(&mut IndentWriter::new("  ", out))
}

/// A section of aligned rows, written only if there are any
fn maybe_section<O: fmt::Write + ?Sized, const N: usize>(
    out: &mut O,
    header: &str,
    rows: &[[String; N]],
) -> fmt::Result {
    if rows.is_empty() {
        return Ok(());
    }

    let widths = column_widths(rows);
    section(out, header, |out| {
        rows.iter().try_for_each(|row| write_row(out, &widths, row))
    })
}
