use std::time::Duration;

use muster::{
    CommandFn, Defaults, Error, Group, Outcome, SimpleCommand, Subcommands, Unit, Validate, Value,
    tree,
    unit::GroupFields,
    value::{BoxError, CoercionError},
};
use pretty_assertions::assert_eq;

/// A leaf that remembers whether it ran
#[derive(Unit, Default, Debug)]
#[muster(simple)]
struct Leaf {
    #[muster(default = "World")]
    pub name: String,

    #[muster(short = "v")]
    pub verbose: bool,

    #[muster(short = "c")]
    pub count: u8,

    #[muster(default = "x")]
    pub tags: Vec<String>,

    ran: bool,
}

impl SimpleCommand for Leaf {
    fn run(&mut self) -> Result<(), BoxError> {
        self.ran = true;
        Ok(())
    }
}

#[derive(Unit, Default)]
struct Root {
    #[muster(subcommand)]
    sub: Leaf,
}

#[test]
fn default_then_override() {
    let mut root = Root::default();
    let outcome = muster::run("app", &mut root, &["sub"]).unwrap();
    assert_eq!(outcome, Outcome::Ran);
    assert_eq!(root.sub.name, "World");
    assert!(root.sub.ran);

    let mut root = Root::default();
    muster::run("app", &mut root, &["sub", "--name", "X"]).unwrap();
    assert_eq!(root.sub.name, "X");
}

#[test]
fn empty_group_args_show_help() {
    let mut root = Root::default();
    let outcome = muster::run("app", &mut root, &[]).unwrap();

    match outcome {
        Outcome::Help(help) => assert!(help.starts_with("Usage:    app <cmd> [args]\n"), "{help}"),
        Outcome::Ran => panic!("an empty group invocation shouldn't run anything"),
    }

    assert!(!root.sub.ran);
}

#[test]
fn unknown_subcommand() {
    let mut root = Root::default();
    let err = muster::run("app", &mut root, &["nope"]).unwrap_err();

    match err {
        Error::UnknownSubcommand { name, help } => {
            assert_eq!(name, "nope");
            assert!(help.contains("Commands:"), "{help}");
        }
        err => panic!("unexpected error: {err}"),
    }
}

#[test]
fn out_of_range_literal() {
    let mut leaf = Leaf::default();
    let err = muster::run("leaf", &mut leaf, &["--count", "999"]).unwrap_err();

    assert!(
        matches!(
            err,
            Error::Coercion {
                ref field,
                source: CoercionError::InvalidLiteral { .. },
            } if field == "count"
        ),
        "{err}"
    );
    assert!(!leaf.ran);
}

#[test]
fn flags_and_clusters() {
    let mut leaf = Leaf::default();
    muster::run("leaf", &mut leaf, &["-vc7"]).unwrap();
    assert!(leaf.verbose);
    assert_eq!(leaf.count, 7);

    let mut leaf = Leaf::default();
    muster::run("leaf", &mut leaf, &["--verbose=false", "--count=0x10"]).unwrap();
    assert!(!leaf.verbose);
    assert_eq!(leaf.count, 16);
}

#[test]
fn scalars_keep_the_last_value() {
    let mut leaf = Leaf::default();
    muster::run("leaf", &mut leaf, &["--name", "a", "--name", "b"]).unwrap();
    assert_eq!(leaf.name, "b");
}

#[test]
fn repeated_options_replace_their_default() {
    let mut leaf = Leaf::default();
    muster::run("leaf", &mut leaf, &[]).unwrap();
    assert_eq!(leaf.tags, ["x"]);

    let mut leaf = Leaf::default();
    muster::run("leaf", &mut leaf, &["--tags", "a", "--tags", "b,c"]).unwrap();
    assert_eq!(leaf.tags, ["a", "b", "c"]);
}

#[test]
fn parse_errors() {
    let mut leaf = Leaf::default();
    let err = muster::run("leaf", &mut leaf, &["--nope"]).unwrap_err();
    assert_eq!(err.to_string(), "parsing error: unknown flag: --nope");

    let err = muster::run("leaf", &mut leaf, &["-z"]).unwrap_err();
    assert_eq!(err.to_string(), "parsing error: unknown shorthand flag: 'z' in -z");

    let err = muster::run("leaf", &mut leaf, &["--name"]).unwrap_err();
    assert_eq!(err.to_string(), "parsing error: flag needs an argument: --name");
}

#[test]
fn help_requests() {
    for args in [&["--help"][..], &["-h"][..], &["-v", "--help"][..]] {
        let mut leaf = Leaf::default();
        let outcome = muster::run("leaf", &mut leaf, args).unwrap();
        assert!(matches!(outcome, Outcome::Help(_)), "{args:?}");
        assert!(!leaf.ran);
    }

    // Help only counts when the first argument is a flag, and not after `--`
    let mut leaf = Leaf::default();
    let err = muster::run("leaf", &mut leaf, &["x", "--help"]).unwrap_err();
    assert!(matches!(err, Error::Parse(_)), "{err}");

    let mut leaf = Leaf::default();
    let outcome = muster::run("leaf", &mut leaf, &["-v", "--", "--help"]).unwrap();
    assert_eq!(outcome, Outcome::Ran);
}

#[derive(Unit, Default)]
#[muster(simple)]
struct Hosts {
    #[muster(short = "h")]
    pub host: String,
}

impl SimpleCommand for Hosts {
    fn run(&mut self) -> Result<(), BoxError> {
        Ok(())
    }
}

#[test]
fn claimed_short_h_is_not_help() {
    let mut hosts = Hosts::default();
    let outcome = muster::run("hosts", &mut hosts, &["-h", "example.com"]).unwrap();
    assert_eq!(outcome, Outcome::Ran);
    assert_eq!(hosts.host, "example.com");

    let outcome = muster::run("hosts", &mut hosts, &["--help"]).unwrap();
    assert!(matches!(outcome, Outcome::Help(_)));
}

#[derive(Unit, Default)]
#[muster(simple)]
struct CopyFiles {
    #[muster(position = 2)]
    pub destination: String,

    #[muster(arg = 1)]
    pub source: String,

    #[muster(position = 3, default = "0644")]
    pub mode: String,
}

impl SimpleCommand for CopyFiles {
    fn run(&mut self) -> Result<(), BoxError> {
        Ok(())
    }
}

#[test]
fn positional_order_ignores_declaration_order() {
    let mut copy = CopyFiles::default();
    muster::run("cp", &mut copy, &["a", "b"]).unwrap();
    assert_eq!(copy.source, "a");
    assert_eq!(copy.destination, "b");
    assert_eq!(copy.mode, "0644");

    let mut copy = CopyFiles::default();
    let err = muster::run("cp", &mut copy, &["a"]).unwrap_err();
    assert!(matches!(err, Error::MissingPositional(ref name) if name == "destination"), "{err}");
}

#[derive(Unit, Default)]
#[muster(simple)]
struct Echo {
    #[muster(position = 1)]
    pub first: String,

    #[muster(position = 2)]
    pub rest: Vec<String>,

    #[muster(short = "n")]
    pub no_newline: bool,
}

impl SimpleCommand for Echo {
    fn run(&mut self) -> Result<(), BoxError> {
        Ok(())
    }
}

#[test]
fn repeated_positional_takes_the_rest() {
    let mut echo = Echo::default();
    muster::run("echo", &mut echo, &["a", "-n", "b", "c"]).unwrap();
    assert_eq!(echo.first, "a");
    assert_eq!(echo.rest, ["b", "c"]);
    assert!(echo.no_newline);

    let mut echo = Echo::default();
    muster::run("echo", &mut echo, &["--", "-a", "-b"]).unwrap();
    assert_eq!(echo.first, "-a");
    assert_eq!(echo.rest, ["-b"]);

    let mut echo = Echo::default();
    let err = muster::run("echo", &mut echo, &["a"]).unwrap_err();
    assert!(matches!(err, Error::MissingPositional(ref name) if name == "rest"), "{err}");
}

#[derive(Unit, Default)]
#[muster(simple, validate)]
struct Checked {
    pub value: String,
}

impl Validate for Checked {
    fn validate(&self) -> Result<(), BoxError> {
        match self.value.as_str() {
            "invalid" => Err("value must not be 'invalid'".into()),
            _ => Ok(()),
        }
    }
}

impl SimpleCommand for Checked {
    fn run(&mut self) -> Result<(), BoxError> {
        Ok(())
    }
}

#[test]
fn command_validation() {
    let mut checked = Checked::default();
    let err = muster::run("check", &mut checked, &["--value", "invalid"]).unwrap_err();
    assert!(matches!(err, Error::Validation { field: None, .. }), "{err}");
    assert_eq!(
        err.to_string(),
        "validation error: value must not be 'invalid'"
    );

    let mut checked = Checked::default();
    let outcome = muster::run("check", &mut checked, &["--value", "fine"]).unwrap();
    assert_eq!(outcome, Outcome::Ran);
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Value)]
#[muster(validate)]
struct Even(u32);

impl Validate for Even {
    fn validate(&self) -> Result<(), BoxError> {
        match self.0 % 2 {
            0 => Ok(()),
            _ => Err(format!("{} is odd", self.0).into()),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Value)]
enum Level {
    #[default]
    Low,
    High,

    #[muster(name = "max")]
    Maximum,
}

#[derive(Unit, Default)]
#[muster(simple)]
struct Tuned {
    pub step: Even,
    pub level: Level,

    #[muster(default = "1m30s")]
    pub timeout: Duration,
}

impl SimpleCommand for Tuned {
    fn run(&mut self) -> Result<(), BoxError> {
        Ok(())
    }
}

#[test]
fn self_parsing_values() {
    let mut tuned = Tuned::default();
    muster::run("tune", &mut tuned, &["--step", "4", "--level", "max"]).unwrap();
    assert_eq!(tuned.step, Even(4));
    assert_eq!(tuned.level, Level::Maximum);
    assert_eq!(tuned.timeout, Duration::from_secs(90));

    let mut tuned = Tuned::default();
    let err = muster::run("tune", &mut tuned, &["--step", "3"]).unwrap_err();
    assert!(
        matches!(err, Error::Validation { field: Some(ref field), .. } if field == "step"),
        "{err}"
    );

    let mut tuned = Tuned::default();
    let err = muster::run("tune", &mut tuned, &["--level", "medium"]).unwrap_err();
    assert!(matches!(err, Error::Coercion { .. }), "{err}");
}

#[derive(Unit, Default)]
#[muster(simple, defaults)]
struct Hooked {
    #[muster(default = "World")]
    pub name: String,
    pub count: u32,
}

impl Defaults for Hooked {
    fn defaults(&mut self) {
        self.name = "hook".to_owned();
        self.count = 5;
    }
}

impl SimpleCommand for Hooked {
    fn run(&mut self) -> Result<(), BoxError> {
        Ok(())
    }
}

#[test]
fn tag_defaults_apply_after_the_hook() {
    let mut hooked = Hooked::default();
    muster::run("hooked", &mut hooked, &[]).unwrap();
    assert_eq!(hooked.name, "World");
    assert_eq!(hooked.count, 5);
}

#[derive(Unit, Default)]
struct Common {
    pub name: String,
    pub dry_run: bool,
}

#[derive(Unit, Default)]
#[muster(simple)]
struct Deploy {
    pub name: String,

    #[muster(flatten)]
    pub common: Common,

    #[muster(ignore)]
    pub cache: Vec<String>,
}

impl SimpleCommand for Deploy {
    fn run(&mut self) -> Result<(), BoxError> {
        Ok(())
    }
}

#[test]
fn flattened_fields_and_last_writer_wins() {
    let mut deploy = Deploy::default();
    muster::run("deploy", &mut deploy, &["--dry-run", "--name", "prod"]).unwrap();

    assert!(deploy.common.dry_run);
    assert_eq!(deploy.common.name, "prod");
    assert_eq!(deploy.name, "");

    let mut deploy = Deploy::default();
    let err = muster::run("deploy", &mut deploy, &["--cache", "x"]).unwrap_err();
    assert!(matches!(err, Error::Parse(_)), "{err}");
}

#[test]
fn argv_commands_see_every_argument() {
    let mut seen: Vec<String> = Vec::new();

    {
        let mut record = CommandFn(|args: &[&str]| -> Result<(), BoxError> {
            seen.extend(args.iter().map(|&arg| arg.to_owned()));
            Ok(())
        });

        let mut root = Subcommands::new().add("record", &mut record);
        let outcome = muster::run("app", &mut root, &["record", "a", "b"]).unwrap();
        assert_eq!(outcome, Outcome::Ran);
    }

    assert_eq!(seen, ["a", "b"]);
}

#[test]
fn command_errors_are_reported() {
    let mut fail = CommandFn(|_: &[&str]| -> Result<(), BoxError> { Err("boom".into()) });
    let err = muster::run("fail", &mut fail, &[]).unwrap_err();
    assert!(matches!(err, Error::Command(_)));
    assert_eq!(err.to_string(), "boom");
}

#[test]
fn later_subcommands_replace_earlier_ones() {
    let mut first = Leaf::default();
    let mut second = Leaf::default();

    {
        let mut root = Subcommands::new()
            .add("run", &mut first)
            .add("run", &mut second);
        assert_eq!(root.len(), 1);

        muster::run("app", &mut root, &["run"]).unwrap();
    }

    assert!(!first.ran);
    assert!(second.ran);
}

#[derive(Unit, Default)]
struct Inert {
    pub value: String,
}

#[test]
fn build_errors() {
    let mut inert = Inert::default();
    let err = muster::run("inert", &mut inert, &[]).unwrap_err();
    assert!(matches!(err, Error::NotACommand(ref name) if name == "inert"), "{err}");

    let mut missing: Option<Leaf> = None;
    let err = muster::run("missing", &mut missing, &[]).unwrap_err();
    assert!(matches!(err, Error::InvalidType { .. }), "{err}");

    let mut present = Some(Leaf::default());
    muster::run("present", &mut present, &[]).unwrap();
    assert!(present.is_some_and(|leaf| leaf.ran));
}

#[derive(Unit, Default)]
#[muster(simple)]
struct Clash {
    #[muster(position = 1)]
    pub a: String,

    #[muster(position = 1)]
    pub b: String,
}

impl SimpleCommand for Clash {
    fn run(&mut self) -> Result<(), BoxError> {
        Ok(())
    }
}

#[test]
fn duplicate_positions_are_rejected() {
    let mut clash = Clash::default();
    let err = muster::run("clash", &mut clash, &["x"]).unwrap_err();
    assert!(matches!(err, Error::Configuration { ref field, .. } if field == "b"), "{err}");
}

/// A group with options of its own
#[derive(Unit, Default)]
struct Tool {
    #[muster(short = "v")]
    pub verbose: bool,

    #[muster(default = "prod")]
    pub profile: String,

    #[muster(flatten)]
    pub common: Common,

    #[muster(subcommand)]
    sub: Leaf,
}

#[test]
fn group_options_are_written() {
    let mut tool = Tool::default();
    let outcome = muster::run(
        "tool",
        &mut tool,
        &["-v", "--profile", "dev", "--dry-run", "sub", "--name", "Bob"],
    )
    .unwrap();

    assert_eq!(outcome, Outcome::Ran);
    assert!(tool.verbose);
    assert_eq!(tool.profile, "dev");
    assert!(tool.common.dry_run);
    assert!(tool.sub.ran);
    assert_eq!(tool.sub.name, "Bob");
    assert!(!tool.sub.verbose);
}

#[test]
fn group_options_take_defaults() {
    let mut tool = Tool::default();
    muster::run("tool", &mut tool, &["sub"]).unwrap();

    assert_eq!(tool.profile, "prod");
    assert!(!tool.verbose);
    assert!(tool.sub.ran);
}

#[test]
fn options_after_the_subcommand_belong_to_it() {
    let mut tool = Tool::default();
    muster::run("tool", &mut tool, &["sub", "-v"]).unwrap();

    assert!(!tool.verbose);
    assert!(tool.sub.verbose);
}

#[test]
fn group_options_alone_show_help() {
    let mut tool = Tool::default();
    let outcome = muster::run("tool", &mut tool, &["-v"]).unwrap();

    assert!(matches!(outcome, Outcome::Help(ref help) if help.starts_with("Usage:    tool <cmd>")));
    assert!(!tool.sub.ran);
}

#[test]
fn unknown_group_options_are_rejected() {
    let mut tool = Tool::default();
    let err = muster::run("tool", &mut tool, &["--nope", "sub"]).unwrap_err();

    assert!(matches!(err, Error::Parse(_)), "{err}");
    assert!(!tool.sub.ran);
}

#[derive(Unit, Default)]
struct Misplaced {
    #[muster(position = 1)]
    pub target: String,

    #[muster(subcommand)]
    sub: Leaf,
}

/// A hand-written group that forgot to bind its option
#[derive(Unit, Default)]
#[muster(group)]
struct Unbound {
    pub level: u8,

    leaf: Leaf,
}

impl Group for Unbound {
    fn subcommands(&mut self) -> Subcommands<'_> {
        Subcommands::new().add("leaf", &mut self.leaf)
    }
}

#[derive(Unit, Default)]
#[muster(group)]
struct Bound {
    pub level: u8,

    leaf: Leaf,
}

impl Group for Bound {
    fn subcommands(&mut self) -> Subcommands<'_> {
        Subcommands::new()
            .fields(GroupFields::new().value(&mut self.level))
            .add("leaf", &mut self.leaf)
    }
}

#[test]
fn groups_must_bind_their_fields() {
    let mut misplaced = Misplaced::default();
    let err = muster::run("misplaced", &mut misplaced, &["sub"]).unwrap_err();
    assert!(matches!(err, Error::Configuration { ref field, .. } if field == "target"), "{err}");

    let mut unbound = Unbound::default();
    let err = muster::run("unbound", &mut unbound, &["leaf"]).unwrap_err();
    assert!(matches!(err, Error::Configuration { ref field, .. } if field == "level"), "{err}");

    let mut bound = Bound::default();
    muster::run("bound", &mut bound, &["--level", "3", "leaf"]).unwrap();
    assert_eq!(bound.level, 3);
    assert!(bound.leaf.ran);
}

#[derive(Unit, Default)]
#[muster(simple)]
struct SharedShort {
    #[muster(short = "x")]
    pub first: bool,

    #[muster(short = "x")]
    pub second: bool,
}

impl SimpleCommand for SharedShort {
    fn run(&mut self) -> Result<(), BoxError> {
        Ok(())
    }
}

#[derive(Unit, Default)]
#[muster(simple)]
struct SharedLong {
    pub output: String,

    #[muster(long = "output")]
    pub out_file: String,
}

impl SimpleCommand for SharedLong {
    fn run(&mut self) -> Result<(), BoxError> {
        Ok(())
    }
}

#[derive(Unit, Default)]
#[muster(simple)]
struct NamedHelp {
    pub help: bool,

    #[muster(ignore)]
    pub also: bool,
}

impl SimpleCommand for NamedHelp {
    fn run(&mut self) -> Result<(), BoxError> {
        Ok(())
    }
}

#[test]
fn option_names_must_not_collide() {
    let err = muster::run("shared", &mut SharedShort::default(), &[]).unwrap_err();
    assert_eq!(
        err.to_string(),
        "invalid declaration for field second: -x is already taken by first"
    );

    let err = muster::run("shared", &mut SharedLong::default(), &[]).unwrap_err();
    assert_eq!(
        err.to_string(),
        "invalid declaration for field out-file: --output is already taken by output"
    );

    let err = muster::run("named", &mut NamedHelp::default(), &[]).unwrap_err();
    assert_eq!(
        err.to_string(),
        "invalid declaration for field help: --help is reserved for help text"
    );
}

#[derive(Unit, Default)]
#[muster(simple)]
struct Loose {
    #[muster(ignore = "false")]
    pub hidden: String,

    #[muster(ignore = false)]
    pub also_hidden: u8,

    #[muster(repeated = "no")]
    pub items: Vec<String>,
}

impl SimpleCommand for Loose {
    fn run(&mut self) -> Result<(), BoxError> {
        Ok(())
    }
}

#[derive(Unit, Default)]
#[muster(simple)]
struct RepeatedScalar {
    #[muster(repeated = false)]
    pub count: u8,
}

impl SimpleCommand for RepeatedScalar {
    fn run(&mut self) -> Result<(), BoxError> {
        Ok(())
    }
}

#[test]
fn presence_tags_ignore_their_values() {
    let mut loose = Loose::default();

    {
        let root = tree::build("loose", &mut loose).unwrap();
        let option = |name: &str| {
            root.options
                .iter()
                .find(|option| option.name == name)
                .unwrap()
                .clone()
        };

        assert!(option("hidden").ignored);
        assert!(option("also-hidden").ignored);
        assert!(option("items").repeated);
    }

    let err = muster::run("loose", &mut loose, &["--hidden", "x"]).unwrap_err();
    assert!(matches!(err, Error::Parse(_)), "{err}");

    let err = muster::run("scalar", &mut RepeatedScalar::default(), &[]).unwrap_err();
    assert!(matches!(err, Error::Coercion { ref field, .. } if field == "count"), "{err}");
}
