//! Trait abstraction for datagram and stream channels to enable testing

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpStream, UdpSocket};
use tokio::sync::Mutex;

/// Largest UDP datagram accepted from the device
pub const MAX_DATAGRAM_SIZE: usize = 65_535;

/// Read size for stream channels
pub const STREAM_READ_SIZE: usize = 0x1000;

/// Trait for channel I/O operations
///
/// Both methods take `&self` so one task can receive while another sends.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Send one datagram, or write all bytes to the stream
    async fn send(&self, data: &[u8]) -> io::Result<()>;

    /// Receive one datagram, or the next chunk of the stream
    ///
    /// A closed stream yields `UnexpectedEof`.
    async fn recv(&self) -> io::Result<Bytes>;
}

/// Connected UDP socket
pub struct UdpChannel {
    socket: UdpSocket,
}

impl UdpChannel {
    /// Bind an ephemeral local port and connect it to `host:port`
    pub async fn connect(host: &str, port: u16) -> io::Result<Self> {
        let socket = UdpSocket::bind(("0.0.0.0", 0)).await?;
        socket.connect((host, port)).await?;
        Ok(Self { socket })
    }
}

#[async_trait]
impl Channel for UdpChannel {
    async fn send(&self, data: &[u8]) -> io::Result<()> {
        self.socket.send(data).await.map(|_| ())
    }

    async fn recv(&self) -> io::Result<Bytes> {
        let mut buffer = BytesMut::zeroed(MAX_DATAGRAM_SIZE);
        let len = self.socket.recv(&mut buffer).await?;
        buffer.truncate(len);
        Ok(buffer.freeze())
    }
}

/// Byte stream split into independently locked halves
pub struct StreamChannel<R, W> {
    reader: Mutex<R>,
    writer: Mutex<W>,
}

/// TCP stream channel
pub type TcpChannel = StreamChannel<OwnedReadHalf, OwnedWriteHalf>;

impl<R, W> StreamChannel<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader: Mutex::new(reader),
            writer: Mutex::new(writer),
        }
    }
}

impl StreamChannel<OwnedReadHalf, OwnedWriteHalf> {
    pub async fn connect(host: &str, port: u16) -> io::Result<Self> {
        let stream = TcpStream::connect((host, port)).await?;
        stream.set_nodelay(true)?;
        let (reader, writer) = stream.into_split();
        Ok(Self::new(reader, writer))
    }
}

#[async_trait]
impl<R, W> Channel for StreamChannel<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn send(&self, data: &[u8]) -> io::Result<()> {
        let mut writer = self.writer.lock().await;
        writer.write_all(data).await?;
        writer.flush().await
    }

    async fn recv(&self) -> io::Result<Bytes> {
        let mut buffer = BytesMut::zeroed(STREAM_READ_SIZE);
        let len = self.reader.lock().await.read(&mut buffer).await?;
        if len == 0 {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "Stream closed by peer"));
        }
        buffer.truncate(len);
        Ok(buffer.freeze())
    }
}
