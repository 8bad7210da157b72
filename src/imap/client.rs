use std::borrow::Cow;

use imap_proto::{Response, Status};
use log::{debug, info};

use super::{
    command::{execute, quoted, untagged},
    connection::{Connection, SendCommand},
    session::Session,
};
use crate::error::{ConnectionError, Error};

/// A connection that has been greeted but not yet logged in.
#[derive(Debug)]
pub struct Client<C: SendCommand> {
    connection: C,
}

impl Client<Connection> {
    pub async fn connect(host: &str, port: u16) -> Result<Self, ConnectionError> {
        let (connection, greeting) = Connection::connect_to(host, port).await?;
        Self::greeted(connection, greeting)
    }
}

impl<C: SendCommand> Client<C> {
    /// Accepts `connection` if `greeting` welcomes the client.
    pub fn greeted(connection: C, greeting: Response<'_>) -> Result<Self, ConnectionError> {
        match greeting {
            Response::Data {
                status: Status::Ok | Status::PreAuth,
                information,
                ..
            } => {
                debug!("greeting: {}", information.unwrap_or_default());
                Ok(Self { connection })
            }
            Response::Data {
                status: Status::Bye,
                information,
                ..
            } => Err(ConnectionError::Bye(
                information.map_or_else(String::new, Cow::into_owned),
            )),
            other => Err(ConnectionError::Rejected(format!("{other:?}"))),
        }
    }

    pub async fn login(mut self, user: &str, password: &str) -> Result<Session<C>, Error> {
        debug!("LOGIN {user} <password>");
        let command = format!("LOGIN {} {}", quoted(user), quoted(password));
        execute(&mut self.connection, command, untagged)
            .await
            .map_err(|e| Error::at_stage(e, Error::Auth))?;
        info!("Logged in as {user}");

        Ok(Session::new(self.connection))
    }
}
