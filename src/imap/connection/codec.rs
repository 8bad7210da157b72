use std::io;

use bytes::{Buf as _, BufMut as _, BytesMut};
use imap_proto::{Request, Response};
use tokio_util::codec::{Decoder, Encoder};

/// Frames the byte stream of a connection into whole server responses.
#[derive(Debug, Default)]
pub struct ImapCodec;

impl Decoder for ImapCodec {
    type Item = Response<'static>;
    type Error = io::Error;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if buf.is_empty() {
            return Ok(None);
        }
        let (consumed, response) = match Response::from_bytes(buf) {
            Ok((remaining, response)) => (buf.len() - remaining.len(), response.into_owned()),
            Err(nom::Err::Incomplete(_)) => return Ok(None),
            Err(error) => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("unparsable response: {error:?}"),
                ));
            }
        };
        buf.advance(consumed);

        Ok(Some(response))
    }
}

impl<'a> Encoder<&'a Request<'a>> for ImapCodec {
    type Error = io::Error;

    fn encode(&mut self, request: &'a Request<'a>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let Request(tag, command) = request;
        dst.reserve(tag.len() + command.len() + 3);
        if !tag.is_empty() {
            dst.put_slice(tag);
            dst.put_u8(b' ');
        }
        dst.put_slice(command);
        dst.put_slice(b"\r\n");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::borrow::Cow;

    use assertables::*;
    use imap_proto::{MailboxDatum, RequestId, Status};
    use rstest::*;

    use super::*;

    #[rstest]
    fn test_decode_waits_for_complete_line() {
        let mut codec = ImapCodec;
        let mut buf = BytesMut::from(&b"* 3 EXISTS"[..]);

        assert_none!(assert_ok!(codec.decode(&mut buf)));

        buf.put_slice(b"\r\n* 1 RECENT\r\n");
        let response = assert_some!(assert_ok!(codec.decode(&mut buf)));
        assert_eq!(Response::MailboxData(MailboxDatum::Exists(3)), response);
        assert_eq!(b"* 1 RECENT\r\n", &buf[..]);
    }

    #[rstest]
    fn test_decode_tagged_completion() {
        let mut codec = ImapCodec;
        let mut buf = BytesMut::from(&b"0001 NO Mailbox doesn't exist\r\n"[..]);

        let response = assert_some!(assert_ok!(codec.decode(&mut buf)));

        assert_matches!(
            response,
            Response::Done { tag: RequestId(tag), status: Status::No, .. } if tag == "0001"
        );
        assert!(buf.is_empty());
    }

    #[rstest]
    fn test_decode_rejects_garbage() {
        let mut codec = ImapCodec;
        let mut buf = BytesMut::from(&b"\x00\x01 what is this\r\n"[..]);

        let error = assert_err!(codec.decode(&mut buf));

        assert_eq!(io::ErrorKind::InvalidData, error.kind());
    }

    #[rstest]
    #[case(b"0003", b"SELECT \"INBOX\"", b"0003 SELECT \"INBOX\"\r\n")]
    #[case(b"", b"DONE", b"DONE\r\n")]
    fn test_encode_request(#[case] tag: &[u8], #[case] command: &[u8], #[case] expected: &[u8]) {
        let mut codec = ImapCodec;
        let mut dst = BytesMut::new();
        let request = Request(Cow::Borrowed(tag), Cow::Borrowed(command));

        assert_ok!(codec.encode(&request, &mut dst));

        assert_eq!(expected, &dst[..]);
    }
}
