use thiserror::Error;

/// A type alias for handling `Result`s with [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// The sub-kind of a [`Error::Syntax`] failure, matching the taxonomy in
/// the error-handling design: the start line and framing are fatal for a
/// message, a bad header is recoverable and skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntaxKind {
    StartLine,
    Header,
    Framing,
    MissingRequired,
}

impl std::fmt::Display for SyntaxKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SyntaxKind::StartLine => "start_line",
            SyntaxKind::Header => "header",
            SyntaxKind::Framing => "framing",
            SyntaxKind::MissingRequired => "missing_required",
        };
        f.write_str(s)
    }
}

/// A single recoverable parse diagnostic: a header whose value failed to
/// parse. The message is still delivered; the header is skipped and the
/// diagnostic recorded here rather than aborting the parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseDiagnostic {
    pub line: usize,
    pub col: usize,
    pub header_name: String,
    pub kind: SyntaxKind,
    pub message: String,
}

/// Errors produced by the SIP message model, parser, and printer.
#[derive(Error, Debug, Clone)]
pub enum Error {
    #[error("syntax error ({kind}): {message}")]
    Syntax { kind: SyntaxKind, message: String },

    #[error("invalid SIP method: {0}")]
    InvalidMethod(String),

    #[error("invalid SIP URI: {0}")]
    InvalidUri(String),

    #[error("invalid status code: {0}")]
    InvalidStatusCode(u16),

    #[error("header not found: {0}")]
    HeaderNotFound(String),

    #[error("buffer too small to print message ({needed} bytes needed, {available} available)")]
    NotEnoughSpace { needed: usize, available: usize },

    #[error("need more bytes to complete the message")]
    NeedMoreData,

    #[error("message framing error: {0}")]
    Framing(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    pub fn syntax(kind: SyntaxKind, message: impl Into<String>) -> Self {
        Error::Syntax { kind, message: message.into() }
    }
}
