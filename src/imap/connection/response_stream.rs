use std::{
    borrow::Cow,
    mem,
    pin::Pin,
    task::{Context, Poll, ready},
};

use futures::{Sink, Stream, StreamExt as _};
use imap_proto::{Request, Response};
use log::trace;
use tokio::io::{AsyncRead, AsyncWrite};

use super::{connection::ImapStream, tag_generator::TagGenerator};
use crate::error::ConnectionError;

enum ResponseStreamState {
    Start,
    Sending,
    Receiving,
    Done,
}

/// Sends one command on first poll and then yields the server's responses until the tagged
/// completion of that command.
pub struct ResponseStream<'a, T> {
    imap_stream: &'a mut ImapStream<T>,
    state: ResponseStreamState,
    tag_generator: &'a mut TagGenerator,
    tag: String,
    command: String,
}

impl<'a, T: AsyncRead + AsyncWrite + Unpin> ResponseStream<'a, T> {
    pub fn new(
        imap_stream: &'a mut ImapStream<T>,
        tag_generator: &'a mut TagGenerator,
        command: String,
    ) -> Self {
        Self {
            imap_stream,
            state: ResponseStreamState::Start,
            tag_generator,
            tag: String::with_capacity(0),
            command,
        }
    }

    fn start_sending(&mut self) -> Result<(), ConnectionError> {
        let tag = self.tag_generator.next();
        let request = Request(
            Cow::Borrowed(tag.as_bytes()),
            Cow::Borrowed(self.command.as_bytes()),
        );
        Pin::new(&mut *self.imap_stream).start_send(&request)?;
        self.tag = tag;
        self.state = ResponseStreamState::Sending;
        Ok(())
    }

    /// Ends the stream after handing out `error`. The connection is unusable from here on.
    fn fail(
        &mut self,
        error: ConnectionError,
    ) -> Poll<Option<Result<Response<'static>, ConnectionError>>> {
        self.state = ResponseStreamState::Done;
        Poll::Ready(Some(Err(error)))
    }
}

impl<T: AsyncRead + AsyncWrite + Unpin> Stream for ResponseStream<'_, T> {
    type Item = Result<Response<'static>, ConnectionError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            match self.state {
                ResponseStreamState::Start => {
                    let ready = ready!(Sink::<&Request<'_>>::poll_ready(
                        Pin::new(&mut *self.imap_stream),
                        cx
                    ));
                    if let Err(error) = ready {
                        return self.fail(error.into());
                    }
                    if let Err(error) = self.start_sending() {
                        return self.fail(error);
                    }
                }
                ResponseStreamState::Sending => {
                    let flushed = ready!(Sink::<&Request<'_>>::poll_flush(
                        Pin::new(&mut *self.imap_stream),
                        cx
                    ));
                    if let Err(error) = flushed {
                        return self.fail(error.into());
                    }
                    self.state = ResponseStreamState::Receiving;
                }
                ResponseStreamState::Receiving => {
                    match ready!(self.imap_stream.poll_next_unpin(cx)) {
                        None => {
                            let tag = mem::take(&mut self.tag);
                            return self.fail(ConnectionError::Closed { tag });
                        }
                        Some(Err(error)) => return self.fail(error.into()),
                        Some(Ok(response)) => {
                            trace!("{response:?}");
                            if let Response::Done { tag, .. } = &response {
                                self.state = ResponseStreamState::Done;
                                if tag.0 != self.tag {
                                    return Poll::Ready(Some(Err(ConnectionError::TagMismatch {
                                        sent: self.tag.clone(),
                                        received: tag.0.clone(),
                                    })));
                                }
                            }
                            return Poll::Ready(Some(Ok(response)));
                        }
                    }
                }
                ResponseStreamState::Done => return Poll::Ready(None),
            }
        }
    }
}
