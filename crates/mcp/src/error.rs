use std::borrow::Cow;
use std::error::Error as StdError;
use std::fmt::{self, Display};

/// The kind of session error that occurred.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The provider process could not be started.
    Spawn,
    /// Reading from or writing to the provider failed.
    Io,
    /// The provider sent something that is not valid protocol traffic.
    Protocol,
    /// The provider answered a request with an error object.
    Rpc,
    /// The provider closed its output before answering.
    Closed,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Spawn => write!(f, "Spawn failure"),
            ErrorKind::Io => write!(f, "I/O error"),
            ErrorKind::Protocol => write!(f, "Protocol error"),
            ErrorKind::Rpc => write!(f, "Remote error"),
            ErrorKind::Closed => write!(f, "Connection closed"),
        }
    }
}

/// Describes a session error.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Error {
    kind: ErrorKind,
    reason: Option<String>,
}

impl Error {
    #[inline]
    fn new(kind: ErrorKind) -> Self {
        Self { kind, reason: None }
    }

    /// Creates a new error with the `Spawn` kind.
    #[inline]
    pub fn spawn() -> Self {
        Self::new(ErrorKind::Spawn)
    }

    /// Creates a new error with the `Io` kind.
    #[inline]
    pub fn io() -> Self {
        Self::new(ErrorKind::Io)
    }

    /// Creates a new error with the `Protocol` kind.
    #[inline]
    pub fn protocol() -> Self {
        Self::new(ErrorKind::Protocol)
    }

    /// Creates a new error with the `Rpc` kind.
    #[inline]
    pub fn rpc() -> Self {
        Self::new(ErrorKind::Rpc)
    }

    /// Creates a new error with the `Closed` kind.
    #[inline]
    pub fn closed() -> Self {
        Self::new(ErrorKind::Closed)
    }

    /// Attaches a reason to the error.
    #[inline]
    pub fn with_reason<S: Into<String>>(self, reason: S) -> Self {
        Self {
            kind: self.kind,
            reason: Some(reason.into()),
        }
    }

    /// Returns the kind of this error.
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the reason for the error.
    #[inline]
    pub fn reason(&self) -> Cow<'_, str> {
        match self.reason.as_deref() {
            Some(reason) => Cow::Borrowed(reason),
            None => Cow::Owned(format!("{}", self.kind)),
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            Some(reason) => write!(f, "{}: {reason}", self.kind),
            None => Display::fmt(&self.kind, f),
        }
    }
}

impl StdError for Error {}
