use crate::config::Backend;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// things that stop the simulator
#[derive(Debug, Error)]
pub enum Error {
    /// the terminal couldn't be set up for a back end; fatal at startup
    #[error("failed to initialise the {backend} display: {source}")]
    DisplayInit {
        backend: Backend,
        #[source]
        source: io::Error,
    },

    #[error("failed to open trace file {}: {source}", path.display())]
    TraceOpen {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
