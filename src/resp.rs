use bytes::{Bytes, BytesMut};
use std::io;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

/// A decoded RESP value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// +OK\r\n — a line of text with no embedded CRLF.
    SimpleString(Bytes),
    /// $6\r\nfoobar\r\n — length-prefixed, binary-safe.
    BulkString(Bytes),
    /// *2\r\n... — count-prefixed sequence of values.
    Array(Vec<Value>),
}

impl Value {
    /// The raw bytes of either string variant.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::SimpleString(data) | Value::BulkString(data) => Some(data),
            Value::Array(_) => None,
        }
    }

    /// The elements of an array value.
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Convert either string variant to a UTF-8 string, if possible.
    pub fn to_string_lossy(&self) -> Option<String> {
        self.as_bytes()
            .map(|b| String::from_utf8_lossy(b).into_owned())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("unknown RESP type byte: '{}'", *.0 as char)]
    UnknownType(u8),

    #[error("malformed length field: {0:?}")]
    MalformedLength(String),

    #[error("stream ended before a complete value")]
    IncompleteStream,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Decode exactly one RESP value from the stream.
///
/// Awaits until one complete value has been consumed or an error occurs.
/// Nothing beyond the decoded value is read, so the next call picks up at
/// the following byte. On [`DecodeError::UnknownType`] the stream is left
/// just past the offending tag byte; there is no resynchronization.
pub async fn decode<R>(stream: &mut R) -> Result<Value, DecodeError>
where
    R: AsyncBufRead + Unpin,
{
    let tag = stream.read_u8().await.map_err(classify_read_error)?;

    match tag {
        b'+' => decode_simple_string(stream).await,
        b'$' => decode_bulk_string(stream).await,
        b'*' => decode_array(stream).await,
        other => Err(DecodeError::UnknownType(other)),
    }
}

async fn decode_simple_string<R>(stream: &mut R) -> Result<Value, DecodeError>
where
    R: AsyncBufRead + Unpin,
{
    let line = read_line(stream).await?;
    Ok(Value::SimpleString(Bytes::from(line)))
}

async fn decode_bulk_string<R>(stream: &mut R) -> Result<Value, DecodeError>
where
    R: AsyncBufRead + Unpin,
{
    let len = parse_length(&read_line(stream).await?)?;

    // Payload plus its trailing CRLF, as one fixed-size read.
    let mut payload = BytesMut::zeroed(len + 2);
    stream
        .read_exact(&mut payload)
        .await
        .map_err(classify_read_error)?;

    // The last two bytes are consumed but not re-validated against CRLF.
    payload.truncate(len);
    Ok(Value::BulkString(payload.freeze()))
}

async fn decode_array<R>(stream: &mut R) -> Result<Value, DecodeError>
where
    R: AsyncBufRead + Unpin,
{
    let count = parse_length(&read_line(stream).await?)?;

    // Capacity hint only: the count comes off the wire untrusted.
    let mut items = Vec::with_capacity(count.min(64));
    for _ in 0..count {
        let item = Box::pin(decode(stream)).await?;
        items.push(item);
    }

    Ok(Value::Array(items))
}

/// Read one CRLF-terminated line, returning it with the terminator stripped.
///
/// The terminator is matched as a suffix of everything accumulated so far,
/// so a line may span any number of underlying reads and may contain bare
/// LF bytes. An immediate CRLF yields an empty line.
pub async fn read_line<R>(stream: &mut R) -> Result<Vec<u8>, DecodeError>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = Vec::new();
    loop {
        let n = stream
            .read_until(b'\n', &mut line)
            .await
            .map_err(classify_read_error)?;
        if n == 0 {
            return Err(DecodeError::IncompleteStream);
        }
        if line.ends_with(b"\r\n") {
            line.truncate(line.len() - 2);
            return Ok(line);
        }
    }
}

/// Parse a length/count field: ASCII digits only, no sign, no separators.
/// Null semantics ($-1, *-1) are not supported, so a leading '-' is
/// malformed like anything else non-numeric.
fn parse_length(line: &[u8]) -> Result<usize, DecodeError> {
    let malformed = || DecodeError::MalformedLength(String::from_utf8_lossy(line).into_owned());

    if line.is_empty() || !line.iter().all(u8::is_ascii_digit) {
        return Err(malformed());
    }

    // All-digit input can still overflow, and the bulk path needs room
    // for the two terminator bytes on top of the declared length.
    let len: usize = std::str::from_utf8(line)
        .map_err(|_| malformed())?
        .parse()
        .map_err(|_| malformed())?;
    if len > usize::MAX - 2 {
        return Err(malformed());
    }
    Ok(len)
}

/// A clean end-of-stream mid-value means the caller may simply need more
/// data; every other fault is a transport error, passed through intact.
fn classify_read_error(e: io::Error) -> DecodeError {
    if e.kind() == io::ErrorKind::UnexpectedEof {
        DecodeError::IncompleteStream
    } else {
        DecodeError::Io(e)
    }
}
