//! Viewer error type.
//!
//! Every variant is fatal to a session. The binary restores the terminal,
//! prints the error, and exits with status 1.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that end a viewing session.
#[derive(Error, Debug)]
pub enum Error {
    /// The file named on the command line could not be opened.
    #[error("{}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The file opened but reading it failed partway through.
    #[error("{}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Terminal I/O failed.
    #[error(transparent)]
    Terminal(#[from] n_term::Error),
}

/// Result alias for viewer operations.
pub type Result<T> = std::result::Result<T, Error>;
