use std::{
    ffi::OsString,
    io::{self, Write},
    process,
};

use tracing::debug;

use crate::{
    dispatch::{self, Outcome},
    errors::Error,
    tree,
    unit::Unit,
};

/// Helper type for loading arguments from the environment.
///
/// Arguments that aren't valid UTF-8 are converted lossily, since every
/// literal eventually has to become a `&str` anyway.
#[derive(Debug, Clone)]
pub struct LoadedArguments {
    arguments: Vec<String>,
}

impl LoadedArguments {
    pub fn from_env() -> Self {
        Self::new(std::env::args_os())
    }

    /// Load an explicit argument list, program name first
    pub fn new(arguments: impl IntoIterator<Item = impl Into<OsString>>) -> Self {
        Self {
            arguments: arguments
                .into_iter()
                .map(|arg| arg.into().to_string_lossy().into_owned())
                .collect(),
        }
    }

    /// The program name, or an empty string if there wasn't one
    pub fn argv0(&self) -> &str {
        self.arguments.first().map_or("", String::as_str)
    }

    /// Every argument after the program name
    pub fn args(&self) -> Vec<&str> {
        self.arguments
            .get(1..)
            .unwrap_or(&[])
            .iter()
            .map(String::as_str)
            .collect()
    }
}

/**
Builds the tree for a unit, dispatches a command line through it, and reports
the result: help and errors both go to stderr, and errors exit nonzero.

```ignore
fn main() {
    let mut app = App::default();
    muster::Runner::new("app").run(&mut app);
}
```
 */
#[derive(Debug, Clone)]
pub struct Runner {
    name: String,
    arguments: Option<LoadedArguments>,

    #[cfg(feature = "clap")]
    clap: bool,
}

impl Runner {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: None,

            #[cfg(feature = "clap")]
            clap: false,
        }
    }

    /// Use these arguments (excluding the program name) instead of the ones
    /// from the environment
    #[must_use]
    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<OsString>>) -> Self {
        let name = OsString::from(self.name.as_str());
        self.arguments = Some(LoadedArguments::new(
            core::iter::once(name).chain(args.into_iter().map(Into::into)),
        ));
        self
    }

    /// Parse with clap instead of the native dispatcher
    #[cfg(feature = "clap")]
    #[must_use]
    pub fn clap(mut self, enabled: bool) -> Self {
        self.clap = enabled;
        self
    }

    pub fn try_run(&self, unit: &mut dyn Unit) -> Result<Outcome, Error> {
        let loaded;
        let arguments = match self.arguments {
            Some(ref arguments) => arguments,
            None => {
                loaded = LoadedArguments::from_env();
                &loaded
            }
        };

        let args = arguments.args();
        let mut root = tree::build(self.name.as_str(), unit)?;

        #[cfg(feature = "clap")]
        if self.clap {
            debug!(name = %self.name, "dispatching with clap");
            return crate::backend::clap::bind_clap(&self.name, &mut root)?
                .execute(args.iter().copied());
        }

        debug!(name = %self.name, args = args.len(), "dispatching");
        dispatch::dispatch(&self.name, &mut root, &args)
    }

    /// Like [`try_run`][Self::try_run], but writes help to stderr and exits
    /// the process with status 1 on error.
    pub fn run(&self, unit: &mut dyn Unit) {
        match self.try_run(unit) {
            Ok(Outcome::Ran) => {}
            Ok(Outcome::Help(help)) => {
                if let Err(err) = write_help(&mut io::stderr().lock(), &help) {
                    debug!(%err, "couldn't write help text");
                    process::exit(1);
                }
            }
            Err(err) => {
                eprintln!("{err}");
                process::exit(1);
            }
        }
    }
}

fn write_help(out: &mut impl Write, help: &str) -> io::Result<()> {
    out.write_all(help.as_bytes())?;
    out.flush()
}
