use futures::Stream;
use imap_proto::Response;

use crate::error::ConnectionError;

/// Issues one command and yields every response up to and including its tagged completion.
///
/// The stream must be driven to its end before the next command is sent.
pub trait SendCommand {
    type Responses<'a>: Stream<Item = Result<Response<'static>, ConnectionError>> + Unpin
    where
        Self: 'a;

    fn send(&mut self, command: String) -> Self::Responses<'_>;
}
