use std::borrow::Cow;

use futures::StreamExt as _;
use imap_proto::{Response, ResponseCode, Status};
use log::trace;

use crate::{
    error::{ConnectionError, StoreError},
    imap::connection::SendCommand,
};

/// Runs `command` to completion, handing every untagged response to `on_data`.
///
/// The responses are always read up to the tagged completion, even after `on_data` failed, so the
/// connection stays usable for the next command. Returns the response code of a tagged `OK`.
pub async fn execute<C: SendCommand>(
    connection: &mut C,
    command: String,
    mut on_data: impl FnMut(Response<'static>) -> Result<(), StoreError>,
) -> Result<Option<ResponseCode<'static>>, StoreError> {
    let mut responses = connection.send(command);
    let mut failure = None;

    while let Some(response) = responses.next().await {
        let response = match response {
            Ok(response) => response,
            Err(error) => return Err(failure.unwrap_or(error.into())),
        };
        match response {
            Response::Done {
                status: Status::Ok,
                code,
                ..
            } => return failure.map_or(Ok(code), Err),
            Response::Done {
                status,
                information,
                ..
            } => return Err(rejected(status, information)),
            data => {
                if let Err(error) = on_data(data) {
                    failure.get_or_insert(error);
                }
            }
        }
    }

    Err(failure.unwrap_or_else(|| {
        StoreError::Malformed("reply ended without tagged completion".to_owned())
    }))
}

/// Fallback for untagged responses a command has no use for. Only `BYE` is an error.
pub fn untagged(response: Response<'static>) -> Result<(), StoreError> {
    match response {
        Response::Data {
            status: Status::Bye,
            information,
            ..
        } => Err(ConnectionError::Bye(information.map_or_else(String::new, Cow::into_owned)).into()),
        other => {
            trace!("ignoring {other:?}");
            Ok(())
        }
    }
}

pub fn rejected(status: Status, information: Option<Cow<'_, str>>) -> StoreError {
    StoreError::Rejected(information.map_or_else(|| format!("{status:?}"), Cow::into_owned))
}

/// Quotes `value` as an IMAP quoted string.
pub fn quoted(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        if matches!(c, '"' | '\\') {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}
