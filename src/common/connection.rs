//! # TCP Connection Abstraction
//!
//! Provides a wrapper around a byte stream with message framing, used on both
//! the worker port and the client port.
//!
//! ## Wire Protocol
//!
//! Messages are sent with a 4-byte length prefix (little-endian) followed by JSON data:
//! ```text
//! [4 bytes: message length] [N bytes: JSON message data]
//! ```
//!
//! A stream socket makes no promise about read boundaries, so the payload is
//! read until exactly `length` bytes have arrived.

use std::net::SocketAddr;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

use super::error::FrameError;
use super::messages::WireMessage;

/// Maximum allowed payload size (64MB) to prevent memory exhaustion.
pub const MAX_FRAME_SIZE: usize = 64 * 1024 * 1024;

const HEADER_LEN: usize = 4;

/// Stream wrapper with length-prefixed message framing.
///
/// Holds no buffered state between calls; every read consumes exactly one frame.
pub struct Connection<S = TcpStream> {
    /// Underlying byte stream
    stream: S,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Create a new Connection from an established stream.
    ///
    /// # Example
    /// ```ignore
    /// let stream = TcpStream::connect("127.0.0.1:9000").await?;
    /// let mut conn = Connection::new(stream);
    /// ```
    pub fn new(stream: S) -> Self {
        Self { stream }
    }

    /// Read one message from the connection.
    ///
    /// # Returns
    /// - `Ok(Some(T))`: A complete frame was read and decoded
    /// - `Ok(None)`: The peer closed the connection before sending any header byte
    /// - `Err(FrameError::TruncatedHeader)`: The peer closed mid-header
    /// - `Err(FrameError::TooLarge)`: The declared length exceeds [`MAX_FRAME_SIZE`]
    /// - `Err(FrameError::Io)`: I/O failure, including EOF mid-payload
    /// - `Err(FrameError::Format)`: The payload is not a valid `T`
    pub async fn read_message<T: WireMessage>(&mut self) -> Result<Option<T>, FrameError> {
        let mut length_buf = [0u8; HEADER_LEN];
        let mut filled = 0;

        while filled < HEADER_LEN {
            let read = self.stream.read(&mut length_buf[filled..]).await?;
            if read == 0 {
                if filled == 0 {
                    return Ok(None);
                }
                return Err(FrameError::TruncatedHeader(filled));
            }
            filled += read;
        }

        let length = u32::from_le_bytes(length_buf) as usize;
        if length > MAX_FRAME_SIZE {
            return Err(FrameError::TooLarge {
                length,
                limit: MAX_FRAME_SIZE,
            });
        }

        let mut data = vec![0u8; length];
        self.stream.read_exact(&mut data).await?;

        Ok(Some(T::from_bytes(&data)?))
    }

    /// Write one message to the connection: header, then payload, then flush.
    pub async fn write_message<T: WireMessage>(&mut self, message: &T) -> Result<(), FrameError> {
        let data = message.to_bytes()?;
        if data.len() > MAX_FRAME_SIZE {
            return Err(FrameError::TooLarge {
                length: data.len(),
                limit: MAX_FRAME_SIZE,
            });
        }
        let length = data.len() as u32;

        self.stream.write_all(&length.to_le_bytes()).await?;
        self.stream.write_all(&data).await?;
        self.stream.flush().await?;

        Ok(())
    }

    /// Shut down the write half so the peer observes a clean close.
    pub async fn shutdown(&mut self) -> Result<(), FrameError> {
        self.stream.shutdown().await?;
        Ok(())
    }
}

impl Connection<TcpStream> {
    pub fn peer_addr(&self) -> std::io::Result<SocketAddr> {
        self.stream.peer_addr()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::messages::{CalculationRequest, Cell, Matrix, PartialResult, Task};
    use std::sync::Arc;
    use tokio::io::duplex;

    #[tokio::test]
    async fn test_frame_round_trip() {
        let (a, b) = duplex(64);
        let mut writer = Connection::new(a);
        let mut reader = Connection::new(b);

        let matrix = Arc::new(Matrix::from_rows(vec![vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap());
        let task = Task::new(Cell::new(1, 0), matrix);

        // The duplex buffer is smaller than the payload, so the reader sees
        // the frame in several partial reads.
        let sent = task.clone();
        let write = tokio::spawn(async move { writer.write_message(&sent).await });

        let received: Task = reader.read_message().await.unwrap().unwrap();
        write.await.unwrap().unwrap();
        assert_eq!(received, task);
    }

    #[tokio::test]
    async fn test_header_is_little_endian() {
        let (a, mut b) = duplex(1024);
        let mut writer = Connection::new(a);
        let result = PartialResult {
            row: 0,
            column: 1,
            cofactor: Some(2.0),
        };
        writer.write_message(&result).await.unwrap();

        let expected = result.to_bytes().unwrap();
        let mut header = [0u8; 4];
        b.read_exact(&mut header).await.unwrap();
        assert_eq!(u32::from_le_bytes(header) as usize, expected.len());
    }

    #[tokio::test]
    async fn test_clean_close_yields_none() {
        let (a, b) = duplex(64);
        drop(a);
        let mut reader = Connection::new(b);
        let message: Option<PartialResult> = reader.read_message().await.unwrap();
        assert!(message.is_none());
    }

    #[tokio::test]
    async fn test_close_mid_header_is_transport_error() {
        let (mut a, b) = duplex(64);
        a.write_all(&[7, 0]).await.unwrap();
        drop(a);
        let mut reader = Connection::new(b);
        let err = reader.read_message::<PartialResult>().await.unwrap_err();
        assert!(matches!(err, FrameError::TruncatedHeader(2)));
    }

    #[tokio::test]
    async fn test_close_mid_payload_is_transport_error() {
        let (mut a, b) = duplex(64);
        a.write_all(&10u32.to_le_bytes()).await.unwrap();
        a.write_all(b"{\"ro").await.unwrap();
        drop(a);
        let mut reader = Connection::new(b);
        let err = reader.read_message::<PartialResult>().await.unwrap_err();
        assert!(matches!(err, FrameError::Io(_)));
    }

    #[tokio::test]
    async fn test_oversized_header_rejected() {
        let (mut a, b) = duplex(64);
        a.write_all(&u32::MAX.to_le_bytes()).await.unwrap();
        let mut reader = Connection::new(b);
        let err = reader.read_message::<PartialResult>().await.unwrap_err();
        assert!(matches!(err, FrameError::TooLarge { .. }));
    }

    #[tokio::test]
    async fn test_empty_matrix_request_rejected() {
        let (mut a, b) = duplex(64);
        let payload = br#"{"matrix":[]}"#;
        a.write_all(&(payload.len() as u32).to_le_bytes()).await.unwrap();
        a.write_all(payload).await.unwrap();
        let mut reader = Connection::new(b);
        let err = reader.read_message::<CalculationRequest>().await.unwrap_err();
        assert!(matches!(err, FrameError::Format(_)));
    }
}
