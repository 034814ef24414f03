mod error;

use std::{
    fs,
    io::{self, BufRead as _, BufReader},
    path::PathBuf,
    thread,
    time::Duration,
};

use anyhow::Context as _;
use muster::{
    Command, Defaults, Outcome, Runner, SimpleCommand, Unit, Validate, Value, value::BoxError,
};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::error::DemoError;

/// A tiny toolbox, to show off muster.
///
/// Set RUST_LOG=muster=debug to watch the tree being built and dispatched.
#[derive(Unit, Default)]
struct App {
    #[muster(subcommand = "ls")]
    list: List,

    #[muster(subcommand)]
    cat: Cat,

    #[muster(subcommand)]
    wait: Wait,

    #[muster(subcommand)]
    serve: Serve,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Value)]
enum SortKey {
    #[default]
    Name,
    Size,
    None,
}

/// Options that control how entries are shown
#[derive(Unit, Default)]
struct Display {
    /// Include entries starting with '.'
    #[muster(short = "a")]
    pub all: bool,

    /// Show sizes too
    #[muster(short = "l")]
    pub long: bool,
}

/// List the entries of a directory.
#[derive(Unit, Default)]
#[muster(simple, validate)]
struct List {
    #[muster(flatten)]
    pub display: Display,

    /// The directory to list
    #[muster(position = 1, default = ".")]
    pub dir: PathBuf,

    /// How to order entries
    #[muster(short = "s", default = "name")]
    pub sort: SortKey,

    /// Reverse the order
    #[muster(short = "r")]
    pub reverse: bool,

    /// Show at most this many entries; 0 means all of them
    #[muster(short = "n", default = 0)]
    pub limit: usize,
}

impl Validate for List {
    fn validate(&self) -> Result<(), BoxError> {
        match (self.reverse, self.sort) {
            (true, SortKey::None) => Err(DemoError::ReverseUnsorted.into()),
            _ => Ok(()),
        }
    }
}

impl SimpleCommand for List {
    fn run(&mut self) -> Result<(), BoxError> {
        let mut entries = Vec::new();

        for entry in fs::read_dir(&self.dir).map_err(DemoError::io(&self.dir))? {
            let entry = entry.map_err(DemoError::io(&self.dir))?;
            let name = entry.file_name().to_string_lossy().into_owned();

            if !self.display.all && name.starts_with('.') {
                continue;
            }

            let size = entry.metadata().map_err(DemoError::io(entry.path()))?.len();
            entries.push((name, size));
        }

        match self.sort {
            SortKey::Name => entries.sort(),
            SortKey::Size => entries.sort_by_key(|&(_, size)| size),
            SortKey::None => {}
        }

        if self.reverse {
            entries.reverse();
        }

        if self.limit > 0 {
            entries.truncate(self.limit);
        }

        debug!(dir = %self.dir.display(), count = entries.len(), "listing");

        for (name, size) in entries {
            match self.display.long {
                true => println!("{size:>10}  {name}"),
                false => println!("{name}"),
            }
        }

        Ok(())
    }
}

/// Print the contents of files.
#[derive(Unit, Default)]
#[muster(simple)]
struct Cat {
    /// The files to print
    #[muster(position = 1)]
    pub files: Vec<PathBuf>,

    /// Number the output lines
    #[muster(short = "n")]
    pub number: bool,
}

impl SimpleCommand for Cat {
    fn run(&mut self) -> Result<(), BoxError> {
        let mut line_number = 0;

        for path in &self.files {
            let file = fs::File::open(path).map_err(DemoError::io(path))?;

            for line in BufReader::new(file).lines() {
                let line = line.map_err(DemoError::io(path))?;
                line_number += 1;

                match self.number {
                    true => println!("{line_number:>6}  {line}"),
                    false => println!("{line}"),
                }
            }
        }

        Ok(())
    }
}

/// Sleep for a while.
#[derive(Unit, Default)]
#[muster(simple, validate, defaults, short_help)]
struct Wait {
    /// How long to wait, like 250ms or 1m30s
    #[muster(position = 1, default = "1s")]
    pub duration: Duration,

    /// The longest wait that will be accepted
    #[muster(long = "max", default = "10s")]
    pub limit: Duration,

    /// Don't announce the wait
    #[muster(short = "q")]
    pub quiet: bool,
}

impl Defaults for Wait {
    fn defaults(&mut self) {
        self.quiet = std::env::var_os("MUSTER_DEMO_QUIET").is_some();
    }
}

impl Validate for Wait {
    fn validate(&self) -> Result<(), BoxError> {
        match self.duration > self.limit {
            true => Err(DemoError::TooLong {
                limit: self.limit,
                requested: self.duration,
            }
            .into()),
            false => Ok(()),
        }
    }
}

impl muster::ShortHelp for Wait {
    fn short_help(&self) -> &str {
        "Sleep for a while"
    }
}

impl SimpleCommand for Wait {
    fn run(&mut self) -> Result<(), BoxError> {
        if !self.quiet {
            println!("waiting {:?}", self.duration);
        }

        thread::sleep(self.duration);
        Ok(())
    }
}

/// A port number outside the reserved range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Value)]
#[muster(name = "port", validate)]
struct Port(u16);

impl Default for Port {
    fn default() -> Self {
        Self(8080)
    }
}

impl Validate for Port {
    fn validate(&self) -> Result<(), BoxError> {
        match self.0 {
            0..1024 => Err(DemoError::ReservedPort(self.0).into()),
            _ => Ok(()),
        }
    }
}

/// Pretend to serve. Everything after the options is echoed back.
#[derive(Unit, Default)]
#[muster(command)]
struct Serve {
    #[muster(short = "p", default = 8080)]
    pub port: Port,

    #[muster(default = "127.0.0.1")]
    pub host: String,

    pub connections: Vec<String>,
}

impl Command for Serve {
    fn run(&mut self, args: &[&str]) -> Result<(), BoxError> {
        info!(host = %self.host, port = self.port.0, "serving");
        println!("would serve on {}:{}", self.host, self.port.0);

        for connection in &self.connections {
            println!("  allowing {connection}");
        }

        println!("invoked with {args:?}");
        Ok(())
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let runner = Runner::new("muster-demo");

    #[cfg(feature = "clap")]
    let runner = runner.clap(true);

    let mut app = App::default();
    match runner.try_run(&mut app).context("muster-demo failed")? {
        Outcome::Ran => {}
        Outcome::Help(help) => eprint!("{help}"),
    }

    Ok(())
}
