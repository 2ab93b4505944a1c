//! Failure taxonomy for the bot.

use std::fmt;
use std::path::PathBuf;

#[derive(Debug)]
pub enum Error {
    /// Word page unreachable or missing an expected section.
    SourceUnavailable(String),
    /// Comment stream unreachable.
    StreamUnavailable(String),
    /// A single reply submission failed.
    ReplyTransport { comment_id: String, reason: String },
    /// Login or token refresh failed.
    Auth(String),
    /// Ledger exists but cannot be read back.
    LedgerCorrupt { path: PathBuf, source: std::io::Error },
    /// Ledger append failed after a reply went out.
    LedgerWrite { path: PathBuf, source: std::io::Error },
}

impl Error {
    /// Fatal errors halt the bot; everything else costs at most one cycle.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::LedgerCorrupt { .. } | Self::LedgerWrite { .. })
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SourceUnavailable(e) => write!(f, "word source unavailable: {e}"),
            Self::StreamUnavailable(e) => write!(f, "comment stream unavailable: {e}"),
            Self::ReplyTransport { comment_id, reason } => {
                write!(f, "failed to reply to comment {comment_id}: {reason}")
            }
            Self::Auth(e) => write!(f, "authentication failed: {e}"),
            Self::LedgerCorrupt { path, source } => {
                write!(f, "ledger '{}' is unreadable: {}", path.display(), source)
            }
            Self::LedgerWrite { path, source } => {
                write!(f, "failed to append to ledger '{}': {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::LedgerCorrupt { source, .. } | Self::LedgerWrite { source, .. } => Some(source),
            _ => None,
        }
    }
}
