use muster::{Outcome, SimpleCommand, Unit, value::BoxError};
use pretty_assertions::assert_eq;

/// An example application.
#[derive(Unit, Default)]
struct App {
    #[muster(subcommand)]
    greet: Greet,

    #[muster(subcommand)]
    list: List,
}

/// Say hello to someone.
#[derive(Unit, Default)]
#[muster(simple)]
struct Greet {
    /// who to greet
    #[muster(position = 1)]
    pub target: String,

    /// print more
    #[muster(short = "v")]
    pub verbose: bool,

    #[muster(short = "n", default = "World", help = "what to call yourself")]
    pub name: String,
}

impl SimpleCommand for Greet {
    fn run(&mut self) -> Result<(), BoxError> {
        Ok(())
    }
}

/// List things.
#[derive(Unit, Default)]
#[muster(simple)]
struct List {
    /// where to look
    #[muster(position = 1, default = ".")]
    pub dir: String,

    #[muster(ignore)]
    pub hidden: bool,
}

impl SimpleCommand for List {
    fn run(&mut self) -> Result<(), BoxError> {
        Ok(())
    }
}

fn help_for(args: &[&str]) -> String {
    let mut app = App::default();

    match muster::run("app", &mut app, args).unwrap() {
        Outcome::Help(help) => help,
        Outcome::Ran => panic!("expected help for {args:?}"),
    }
}

#[test]
fn group_help() {
    let expected = "\
Usage:    app <cmd> [args]
An example application.

Commands:
  greet  Say hello to someone.
  list   List things.
";

    assert_eq!(help_for(&[]), expected);
    assert_eq!(help_for(&["--help"]), expected);
    assert_eq!(help_for(&["-h"]), expected);
}

#[test]
fn leaf_help() {
    let expected = "\
Usage:    app greet [args] <target>
Say hello to someone.

Arguments:
  <target>  string  who to greet

Flags:
  -v,  --verbose                             print more

Options:
  -n,  --name     string  (default='World')  what to call yourself
";

    assert_eq!(help_for(&["greet", "--help"]), expected);
    assert_eq!(help_for(&["greet", "-v", "-h"]), expected);
}

#[test]
fn defaulted_positionals_and_ignored_options() {
    let expected = "\
Usage:    app list [args] [dir]
List things.

Arguments:
  [dir]  string  (default='.')  where to look
";

    assert_eq!(help_for(&["list", "--help"]), expected);
}

/// Things on a shelf.
#[derive(Unit, Default)]
struct Shelf {
    #[muster(subcommand)]
    story: Story,

    #[muster(subcommand)]
    toggles: Toggles,

    #[muster(subcommand)]
    jumbled: Jumbled,
}

/// A short story, told at length.
///
/// It has a second paragraph.
#[derive(Unit, Default)]
#[muster(simple, short_help)]
struct Story {}

impl muster::ShortHelp for Story {
    fn short_help(&self) -> &str {
        "A short story."
    }
}

impl SimpleCommand for Story {
    fn run(&mut self) -> Result<(), BoxError> {
        Ok(())
    }
}

/// Switches with defaults.
#[derive(Unit, Default)]
#[muster(simple)]
struct Toggles {
    /// use color
    #[muster(default = "true")]
    pub color: bool,

    /// say less
    #[muster(default = "false")]
    pub quiet: bool,
}

impl SimpleCommand for Toggles {
    fn run(&mut self) -> Result<(), BoxError> {
        Ok(())
    }
}

/// Rows out of order.
#[derive(Unit, Default)]
#[muster(simple)]
struct Jumbled {
    pub zoom: bool,
    pub width: u32,
    pub all: bool,
    pub depth: u32,
}

impl SimpleCommand for Jumbled {
    fn run(&mut self) -> Result<(), BoxError> {
        Ok(())
    }
}

fn shelf_help(args: &[&str]) -> String {
    let mut shelf = Shelf::default();

    match muster::run("shelf", &mut shelf, args).unwrap() {
        Outcome::Help(help) => help,
        Outcome::Ran => panic!("expected help for {args:?}"),
    }
}

#[test]
fn groups_list_the_short_help() {
    let expected = "\
Usage:    shelf <cmd> [args]
Things on a shelf.

Commands:
  jumbled  Rows out of order.
  story    A short story.
  toggles  Switches with defaults.
";

    assert_eq!(shelf_help(&[]), expected);
}

#[test]
fn leaves_show_the_long_help() {
    let expected = "\
Usage:    shelf story [args]
A short story, told at length.

It has a second paragraph.
";

    assert_eq!(shelf_help(&["story", "--help"]), expected);
}

#[test]
fn boolean_defaults() {
    let expected = "\
Usage:    shelf toggles [args]
Switches with defaults.

Flags:
  --color  (default=true)   use color
  --quiet  (default=false)  say less
";

    assert_eq!(shelf_help(&["toggles", "--help"]), expected);
}

#[test]
fn rows_are_sorted_by_name() {
    let expected = "\
Usage:    shelf jumbled [args]
Rows out of order.

Flags:
  --all
  --zoom

Options:
  --depth  uint32
  --width  uint32
";

    assert_eq!(shelf_help(&["jumbled", "--help"]), expected);
}
