//! Framed TCP transport: big-endian u32 length prefix, bincode body.

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::time::{timeout, Duration};

use crate::protocol::{self, Message};
use crate::transport::{MessageReader, MessageWriter};

/// Maximum frame size. Messages are small; anything larger is a corrupt or
/// hostile frame.
const MAX_FRAME_LEN: u32 = 64 * 1024;

/// Split a connected stream into framed reader/writer halves.
///
/// No timeout is applied by default: waiting for the peer's next move may
/// legitimately take minutes.
pub fn split(stream: TcpStream) -> (TcpMessageReader, TcpMessageWriter) {
    split_with_timeout(stream, None)
}

/// Like [`split`], with a timeout applied to every read and write so a
/// silent peer cannot hang the session indefinitely.
pub fn split_with_timeout(
    stream: TcpStream,
    io_timeout: Option<Duration>,
) -> (TcpMessageReader, TcpMessageWriter) {
    let (read_half, write_half) = stream.into_split();
    (
        TcpMessageReader {
            half: read_half,
            timeout: io_timeout,
        },
        TcpMessageWriter {
            half: write_half,
            timeout: io_timeout,
        },
    )
}

pub struct TcpMessageReader {
    half: OwnedReadHalf,
    timeout: Option<Duration>,
}

pub struct TcpMessageWriter {
    half: OwnedWriteHalf,
    timeout: Option<Duration>,
}

fn map_read_err(e: std::io::Error) -> anyhow::Error {
    match e.kind() {
        std::io::ErrorKind::UnexpectedEof => anyhow::anyhow!("connection closed by peer"),
        std::io::ErrorKind::ConnectionReset => anyhow::anyhow!("connection reset by peer"),
        _ => anyhow::anyhow!("read error: {}", e),
    }
}

fn map_write_err(e: std::io::Error) -> anyhow::Error {
    match e.kind() {
        std::io::ErrorKind::BrokenPipe | std::io::ErrorKind::ConnectionReset => {
            anyhow::anyhow!("connection closed by peer")
        }
        _ => anyhow::anyhow!("write error: {}", e),
    }
}

async fn read_frame(half: &mut OwnedReadHalf) -> anyhow::Result<Message> {
    let mut len_buf = [0u8; 4];
    half.read_exact(&mut len_buf).await.map_err(map_read_err)?;
    let len = u32::from_be_bytes(len_buf);
    if len == 0 {
        return Err(protocol::ProtocolError::Malformed("frame length is 0".into()).into());
    }
    if len > MAX_FRAME_LEN {
        return Err(protocol::ProtocolError::Malformed(format!(
            "frame too large: {} bytes (max: {})",
            len, MAX_FRAME_LEN
        ))
        .into());
    }
    let mut buf = vec![0u8; len as usize];
    half.read_exact(&mut buf).await.map_err(map_read_err)?;
    Ok(protocol::decode(&buf)?)
}

async fn write_frame(half: &mut OwnedWriteHalf, msg: Message) -> anyhow::Result<()> {
    let data = protocol::encode(&msg)?;
    if data.len() as u32 > MAX_FRAME_LEN {
        return Err(protocol::ProtocolError::Encode(format!(
            "frame too large: {} bytes (max: {})",
            data.len(),
            MAX_FRAME_LEN
        ))
        .into());
    }
    let len = (data.len() as u32).to_be_bytes();
    half.write_all(&len).await.map_err(map_write_err)?;
    half.write_all(&data).await.map_err(map_write_err)?;
    Ok(())
}

#[async_trait::async_trait]
impl MessageReader for TcpMessageReader {
    async fn recv(&mut self) -> anyhow::Result<Message> {
        match self.timeout {
            Some(limit) => match timeout(limit, read_frame(&mut self.half)).await {
                Ok(result) => result,
                Err(_) => Err(anyhow::anyhow!("read timed out after {:?}", limit)),
            },
            None => read_frame(&mut self.half).await,
        }
    }
}

#[async_trait::async_trait]
impl MessageWriter for TcpMessageWriter {
    async fn send(&mut self, msg: Message) -> anyhow::Result<()> {
        match self.timeout {
            Some(limit) => match timeout(limit, write_frame(&mut self.half, msg)).await {
                Ok(result) => result,
                Err(_) => Err(anyhow::anyhow!("write timed out after {:?}", limit)),
            },
            None => write_frame(&mut self.half, msg).await,
        }
    }
}
