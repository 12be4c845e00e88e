use std::borrow::Cow;
use std::error::Error as StdError;
use std::fmt::{self, Display};

/// The kind of error that occurred.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// No connected server provides the requested tool.
    UnknownTool,
    /// The tool ran but reported a failure.
    ToolFailed,
    /// The session with the tool provider failed.
    Session,
    /// The agent runtime failed.
    Runtime,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::UnknownTool => write!(f, "Unknown tool"),
            ErrorKind::ToolFailed => write!(f, "Tool failed"),
            ErrorKind::Session => write!(f, "Session error"),
            ErrorKind::Runtime => write!(f, "Runtime error"),
        }
    }
}

/// An error raised while running a chat turn or calling a tool.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Error {
    kind: ErrorKind,
    reason: Option<String>,
}

impl Error {
    /// Creates a new error with the `UnknownTool` kind.
    #[inline]
    pub fn unknown_tool() -> Self {
        Self::new(ErrorKind::UnknownTool)
    }

    /// Creates a new error with the `ToolFailed` kind.
    #[inline]
    pub fn tool_failed() -> Self {
        Self::new(ErrorKind::ToolFailed)
    }

    /// Creates a new error with the `Session` kind.
    #[inline]
    pub fn session() -> Self {
        Self::new(ErrorKind::Session)
    }

    /// Creates a new error with the `Runtime` kind.
    #[inline]
    pub fn runtime() -> Self {
        Self::new(ErrorKind::Runtime)
    }

    #[inline]
    fn new(kind: ErrorKind) -> Self {
        Self { kind, reason: None }
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

impl From<mcpdock_mcp::Error> for Error {
    fn from(err: mcpdock_mcp::Error) -> Self {
        Error::session().with_reason(format!("{err}"))
    }
}
