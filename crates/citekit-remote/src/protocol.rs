//! Wire protocol for the single-instance channel.
//!
//! Exactly one message per frame: a kind byte, a payload line, and a single
//! reserved terminator byte.
//!
//! ```text
//! [kind: u8][payload line, UTF-8, ends with '\n'][0x00]
//! ```
//!
//! Argument strings are percent-encoded before framing, so an encoded
//! element can contain neither the terminator, the line delimiter, nor a
//! literal space; each element is written with one trailing `' '`, which
//! keeps an empty list and a list of one empty string distinct on the wire.
//! A ping carries an empty payload line.
//!
//! The layout is stable: any two builds of this crate interoperate as long
//! as the kind tags match.

use crate::config::ProtocolConfig;
use crate::error::{RemoteError, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt};

/// Kind tag for a liveness probe.
const KIND_PING: u8 = 0x01;
/// Kind tag for a forwarded argument list.
const KIND_SEND_ARGUMENTS: u8 = 0x02;
/// Reserved frame terminator. Never appears inside an encoded payload.
const TERMINATOR: u8 = 0x00;
/// Ends the payload line within a frame.
const PAYLOAD_END: u8 = b'\n';
/// Written after every percent-encoded argument.
const ARGUMENT_END: char = ' ';

/// One request on the single-instance channel.
///
/// One variant per message kind, each carrying only the payload valid for
/// that kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Liveness probe; a completed exchange is the answer.
    Ping,
    /// Command-line arguments forwarded to the primary instance, in order.
    SendArguments(Vec<String>),
}

/// Encode one message onto `writer` and flush it.
///
/// Percent-encoding applies to the argument-list payload and to nothing
/// else; a ping is written as an empty payload line.
pub async fn write_message<W: AsyncWriteExt + Unpin>(
    writer: &mut W,
    message: &Message,
) -> Result<()> {
    let mut frame: Vec<u8> = Vec::new();
    match message {
        Message::Ping => frame.push(KIND_PING),
        Message::SendArguments(args) => {
            frame.push(KIND_SEND_ARGUMENTS);
            for arg in args {
                frame.extend_from_slice(urlencoding::encode(arg).as_bytes());
                frame.push(ARGUMENT_END as u8);
            }
        }
    }
    frame.push(PAYLOAD_END);
    frame.push(TERMINATOR);

    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}

/// Decode one message from `reader`.
///
/// Reads the kind byte, the payload line, then exactly one terminator byte.
/// A wrong or missing terminator fails with
/// [`RemoteError::ProtocolFraming`] — there is no resync. A stream that
/// closes mid-frame fails with [`RemoteError::ConnectionClosed`], and a tag
/// this build does not know fails with [`RemoteError::UnknownMessageKind`].
pub async fn read_message<R: AsyncBufRead + Unpin>(reader: &mut R) -> Result<Message> {
    let mut kind = [0u8; 1];
    if let Err(e) = reader.read_exact(&mut kind).await {
        return Err(match e.kind() {
            std::io::ErrorKind::UnexpectedEof => RemoteError::ConnectionClosed,
            _ => e.into(),
        });
    }

    let payload = read_payload_line(reader).await?;

    let mut terminator = [0u8; 1];
    match reader.read_exact(&mut terminator).await {
        Ok(_) if terminator[0] == TERMINATOR => {}
        Ok(_) => {
            return Err(RemoteError::framing(format!(
                "expected terminator {TERMINATOR:#04x}, got {:#04x}",
                terminator[0]
            )));
        }
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(RemoteError::framing("frame ended without a terminator"));
        }
        Err(e) => return Err(e.into()),
    }

    match kind[0] {
        KIND_PING if payload.is_empty() => Ok(Message::Ping),
        KIND_PING => Err(RemoteError::framing("ping carries no payload")),
        KIND_SEND_ARGUMENTS => decode_arguments(&payload).map(Message::SendArguments),
        tag => Err(RemoteError::UnknownMessageKind { tag }),
    }
}

/// Read the payload line up to, not including, its `'\n'`.
async fn read_payload_line<R: AsyncBufRead + Unpin>(reader: &mut R) -> Result<Vec<u8>> {
    let mut line = Vec::new();
    let mut limited = reader.take(ProtocolConfig::MAX_PAYLOAD_BYTES + 1);
    let n = limited.read_until(PAYLOAD_END, &mut line).await?;
    if n == 0 {
        return Err(RemoteError::ConnectionClosed);
    }
    if line.last() != Some(&PAYLOAD_END) {
        if line.len() as u64 > ProtocolConfig::MAX_PAYLOAD_BYTES {
            return Err(RemoteError::framing("payload exceeds maximum size"));
        }
        return Err(RemoteError::ConnectionClosed);
    }
    line.pop();
    Ok(line)
}

/// Percent-decode a `send-arguments` payload into its ordered elements.
fn decode_arguments(payload: &[u8]) -> Result<Vec<String>> {
    let text = std::str::from_utf8(payload)
        .map_err(|_| RemoteError::framing("payload is not valid UTF-8"))?;

    let mut args = Vec::new();
    for encoded in text.split_terminator(ARGUMENT_END) {
        let decoded = urlencoding::decode(encoded)
            .map_err(|_| RemoteError::framing("argument decodes to invalid UTF-8"))?;
        args.push(decoded.into_owned());
    }
    Ok(args)
}
