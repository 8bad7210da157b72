use std::{collections::VecDeque, vec};

use bytes::BytesMut;
use futures::stream;
use imap_proto::Response;
use tokio_util::codec::Decoder as _;

use super::{SendCommand, codec::ImapCodec, tag_generator::TagGenerator};
use crate::error::ConnectionError;

/// Plays back one scripted server reply per command and remembers what was sent.
///
/// `{tag}` in a reply is replaced with the tag of the command it answers. A reply without tagged
/// completion behaves like a connection closed in the middle of the command.
#[derive(Debug, Default)]
pub struct MockConnection {
    replies: VecDeque<String>,
    commands: Vec<String>,
    tag_generator: TagGenerator,
}

impl MockConnection {
    pub fn new<'r>(replies: impl IntoIterator<Item = &'r str>) -> Self {
        Self {
            replies: replies.into_iter().map(str::to_owned).collect(),
            ..Self::default()
        }
    }

    pub fn commands(&self) -> &[String] {
        &self.commands
    }
}

impl SendCommand for MockConnection {
    type Responses<'a> = stream::Iter<vec::IntoIter<Result<Response<'static>, ConnectionError>>>;

    fn send(&mut self, command: String) -> Self::Responses<'_> {
        let tag = self.tag_generator.next();
        self.commands.push(command);
        let reply = self
            .replies
            .pop_front()
            .unwrap_or_default()
            .replace("{tag}", &tag);

        let mut buf = BytesMut::from(reply.as_bytes());
        let mut codec = ImapCodec;
        let mut responses = Vec::new();
        loop {
            match codec.decode(&mut buf) {
                Ok(Some(response)) => {
                    let done = matches!(response, Response::Done { .. });
                    responses.push(Ok(response));
                    if done {
                        break;
                    }
                }
                Ok(None) => {
                    responses.push(Err(ConnectionError::Closed { tag }));
                    break;
                }
                Err(error) => {
                    responses.push(Err(error.into()));
                    break;
                }
            }
        }

        stream::iter(responses)
    }
}
