/*!
muster turns plain annotated structs into a runnable tree of commands, flags,
and positional arguments.

Derive [`Unit`] on a struct, tag its fields with `#[muster(...)]`, and say
which capability traits it implements; [`tree::build`] turns it (and any
subcommands beneath it) into a [`tree::CommandNode`] tree, which
[`dispatch::dispatch`] (or, with the `clap` feature, the [`backend::clap`]
projection) runs against a command line.

```ignore
use muster::{SimpleCommand, Unit, value::BoxError};

/// Say hello to someone.
#[derive(Unit, Default)]
#[muster(simple)]
struct Greet {
    /// Who to greet
    #[muster(short = "n", default = "World")]
    pub name: String,

    #[muster(short = "v")]
    pub verbose: bool,
}

impl SimpleCommand for Greet {
    fn run(&mut self) -> Result<(), BoxError> {
        println!("Hello, {}!", self.name);
        Ok(())
    }
}

fn main() {
    muster::Runner::new("greet").run(&mut Greet::default());
}
```

Field tags: `help`, `default`, `short`, `long`, `name`, `ignore`, `position`
(or `arg`), `repeated`, `flatten`, and `subcommand`. Only `pub` fields are
options. Type-level tags (`group`, `command`, `simple`, `clap`, `validate`,
`defaults`, `help`, `short_help`) declare which capability traits the type
implements by hand.
*/

extern crate self as muster;

pub mod arguments;
pub mod backend;
pub mod descriptor;
pub mod dispatch;
pub mod errors;
pub mod help;
pub mod tree;
pub mod unit;
pub mod value;

pub use arguments::{LoadedArguments, Runner};
pub use dispatch::{Outcome, run};
pub use errors::Error;
pub use muster_derive::{Unit, Value};
pub use unit::{
    Command, CommandFn, Defaults, Group, Help, ShortHelp, SimpleCommand, Subcommands, Unit,
    Validate,
};
pub use value::{ParsedValue, Scalar};

#[cfg(feature = "clap")]
pub use unit::ClapCommand;

/// The clap version that [`ClapCommand`] and [`backend::clap`] are built on
#[cfg(feature = "clap")]
pub use clap;
