use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// The configuration document could not be used.
///
/// This is the only error a registry ever surfaces to its caller; problems
/// with individual entries are logged and skipped instead.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The path does not point to an existing file.
    #[error("configuration file `{}` does not exist", .0.display())]
    NotFound(PathBuf),
    /// The path does not name a JSON file.
    #[error("configuration file `{}` is not a JSON file", .0.display())]
    NotJson(PathBuf),
    /// The file exists but could not be read.
    #[error("failed to read configuration file `{}`", .path.display())]
    Read {
        /// The configuration path.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// The file is not valid JSON.
    #[error("failed to parse configuration file `{}`", .path.display())]
    Parse {
        /// The configuration path.
        path: PathBuf,
        /// The underlying parse error.
        #[source]
        source: serde_json::Error,
    },
    /// The document is valid JSON but not an object.
    #[error("configuration document must be a JSON object")]
    NotAnObject,
}

/// A timeout value that cannot be turned into a duration.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("invalid timeout `{value}`: {reason}")]
pub struct TimeoutError {
    pub(crate) value: String,
    pub(crate) reason: String,
}

/// One entry of the tool-provider table is unusable.
#[derive(Debug, Error)]
pub enum EntryError {
    /// The entry is not a JSON object.
    #[error("entry is not an object")]
    NotAnObject,
    /// A mandatory field is absent.
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    /// A field has the wrong shape.
    #[error("malformed entry: {0}")]
    Malformed(#[source] serde_json::Error),
    /// The timeout could not be normalized.
    #[error(transparent)]
    Timeout(#[from] TimeoutError),
}
