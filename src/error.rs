use std::io;

use thiserror::Error;

use crate::sequence::SequenceSet;

/// Failures of the transport underneath a single IMAP connection.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("cannot reach {host}:{port}")]
    Connect {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },
    #[error("tls handshake with {host} failed")]
    Tls {
        host: String,
        #[source]
        source: tokio_native_tls::native_tls::Error,
    },
    #[error("server rejected the connection: {0}")]
    Rejected(String),
    #[error("server closed the connection: {0}")]
    Bye(String),
    #[error("connection closed before command {tag} completed")]
    Closed { tag: String },
    #[error("response tag {received} does not belong to command {sent}")]
    TagMismatch { sent: String, received: String },
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Outcome of a single command that did not complete with a tagged `OK`.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Tagged `NO` or `BAD`, carrying the server's human readable text.
    #[error("server refused command: {0}")]
    Rejected(String),
    #[error("server reply is malformed: {0}")]
    Malformed(String),
    #[cfg(test)]
    #[error("not authenticated: {0}")]
    Unauthenticated(String),
    #[error(transparent)]
    Connection(#[from] ConnectionError),
}

/// Every way pruning a folder can fail.
///
/// The first error aborts the operation for the folder and is returned unchanged. Whether to carry
/// on with the next folder is up to the caller.
#[derive(Debug, Error)]
pub enum Error {
    #[error("mail store connection failed")]
    Connection(#[from] ConnectionError),
    #[error("authentication rejected: {0}")]
    Auth(String),
    #[error("cannot select folder {folder}: {reason}")]
    FolderSelect { folder: String, reason: String },
    #[error("fetching envelopes failed: {0}")]
    Fetch(String),
    #[error("flagging messages {set} as deleted failed: {reason}")]
    DeleteFlag { set: SequenceSet, reason: String },
    /// Raised after a successful STORE, so the messages are still present but carry `\Deleted`.
    /// Issuing EXPUNGE again is enough to finish the job.
    #[error("expunge failed, messages {set} remain flagged as deleted: {reason}")]
    Expunge { set: SequenceSet, reason: String },
    #[error("logout failed: {0}")]
    Logout(String),
    #[error("operation cancelled")]
    Cancelled,
}

impl Error {
    /// Lifts a command failure into the stage it happened in. Transport and authentication
    /// failures keep their own variants regardless of stage.
    pub(crate) fn at_stage(error: StoreError, stage: impl FnOnce(String) -> Self) -> Self {
        match error {
            StoreError::Connection(error) => Self::Connection(error),
            #[cfg(test)]
            StoreError::Unauthenticated(reason) => Self::Auth(reason),
            StoreError::Rejected(reason) => stage(reason),
            malformed @ StoreError::Malformed(_) => stage(malformed.to_string()),
        }
    }

    /// Whether the connection is still in step with the server after this error, so the next
    /// folder can be worked on with it.
    pub fn leaves_connection_usable(&self) -> bool {
        matches!(
            self,
            Self::FolderSelect { .. } | Self::DeleteFlag { .. } | Self::Expunge { .. }
        )
    }
}
