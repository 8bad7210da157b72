use std::io;

use futures::StreamExt as _;
use imap_proto::Response;
use log::{debug, trace};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::TcpStream,
};
use tokio_native_tls::{TlsConnector, TlsStream, native_tls};
use tokio_util::codec::Framed;

use super::{
    SendCommand, codec::ImapCodec, response_stream::ResponseStream, tag_generator::TagGenerator,
};
use crate::error::ConnectionError;

pub type ImapStream<T> = Framed<T, ImapCodec>;

/// One IMAP connection. Commands go out one at a time, each tagged by the connection.
#[derive(Debug)]
pub struct Connection<T = TlsStream<TcpStream>> {
    stream: ImapStream<T>,
    tag_generator: TagGenerator,
}

impl Connection {
    /// Opens a TLS connection and returns it together with the server greeting.
    pub async fn connect_to(
        host: &str,
        port: u16,
    ) -> Result<(Self, Response<'static>), ConnectionError> {
        debug!("Connecting to {host}:{port}");
        let tls = native_tls::TlsConnector::new().map_err(|source| ConnectionError::Tls {
            host: host.to_owned(),
            source,
        })?;
        let tls = TlsConnector::from(tls);
        let stream = TcpStream::connect((host, port))
            .await
            .map_err(|source| ConnectionError::Connect {
                host: host.to_owned(),
                port,
                source,
            })?;
        let stream = tls
            .connect(host, stream)
            .await
            .map_err(|source| ConnectionError::Tls {
                host: host.to_owned(),
                source,
            })?;

        Connection::new(stream).greeting().await
    }
}

impl<T: AsyncRead + AsyncWrite + Unpin> Connection<T> {
    pub fn new(io: T) -> Self {
        Self {
            stream: Framed::new(io, ImapCodec),
            tag_generator: TagGenerator::default(),
        }
    }

    /// Reads the untagged response the server opens every connection with.
    pub async fn greeting(mut self) -> Result<(Self, Response<'static>), ConnectionError> {
        let greeting = self
            .stream
            .next()
            .await
            .ok_or_else(|| io::Error::from(io::ErrorKind::UnexpectedEof))??;
        trace!("greeting = {greeting:?}");

        Ok((self, greeting))
    }
}

impl<T: AsyncRead + AsyncWrite + Unpin> SendCommand for Connection<T> {
    type Responses<'a>
        = ResponseStream<'a, T>
    where
        Self: 'a;

    fn send(&mut self, command: String) -> Self::Responses<'_> {
        ResponseStream::new(&mut self.stream, &mut self.tag_generator, command)
    }
}
