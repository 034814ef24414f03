use std::{io, path::PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum DemoError {
    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,

        #[source]
        source: io::Error,
    },

    #[error("--reverse needs a sort order; it can't reverse `--sort none`")]
    ReverseUnsorted,

    #[error("refusing to wait longer than {limit:?} (asked for {requested:?})")]
    TooLong {
        limit: std::time::Duration,
        requested: std::time::Duration,
    },

    #[error("port {0} is reserved")]
    ReservedPort(u16),
}

impl DemoError {
    pub fn io(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }
}
