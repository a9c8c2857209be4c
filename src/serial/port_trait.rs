//! Trait abstraction for serial port operations to enable testing

use async_trait::async_trait;
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Receive half of a transport
///
/// `read_byte` may block indefinitely. The reader task races it against its
/// cancellation token and drops the pending future on stop, so implementations
/// must tolerate being dropped mid-read.
#[async_trait]
pub trait PortReader: Send {
    /// Read a single byte
    async fn read_byte(&mut self) -> io::Result<u8>;
}

/// Send half of a transport
#[async_trait]
pub trait PortWriter: Send {
    /// Write all data to the port
    async fn write_all(&mut self, data: &[u8]) -> io::Result<()>;

    /// Flush the output buffer
    async fn flush(&mut self) -> io::Result<()>;
}

/// Adapter turning any async byte stream half into a [`PortReader`]
pub struct StreamReader<R> {
    inner: R,
}

impl<R> StreamReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<R> PortReader for StreamReader<R>
where
    R: AsyncRead + Unpin + Send,
{
    async fn read_byte(&mut self) -> io::Result<u8> {
        self.inner.read_u8().await
    }
}

/// Adapter turning any async byte sink into a [`PortWriter`]
pub struct StreamWriter<W> {
    inner: W,
}

impl<W> StreamWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<W> PortWriter for StreamWriter<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        self.inner.write_all(data).await
    }

    async fn flush(&mut self) -> io::Result<()> {
        self.inner.flush().await
    }
}

#[cfg(test)]
pub mod mocks {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Mock serial port for testing the send path
    #[derive(Clone)]
    pub struct MockSerialPort {
        pub written_data: Arc<Mutex<Vec<Vec<u8>>>>,
        pub write_error: Arc<Mutex<Option<io::ErrorKind>>>,
        pub flush_error: Arc<Mutex<Option<io::ErrorKind>>>,
    }

    impl MockSerialPort {
        pub fn new() -> Self {
            Self {
                written_data: Arc::new(Mutex::new(Vec::new())),
                write_error: Arc::new(Mutex::new(None)),
                flush_error: Arc::new(Mutex::new(None)),
            }
        }

        pub fn get_written_data(&self) -> Vec<Vec<u8>> {
            self.written_data.lock().unwrap().clone()
        }

        pub fn set_write_error(&self, error: io::ErrorKind) {
            *self.write_error.lock().unwrap() = Some(error);
        }

        pub fn set_flush_error(&self, error: io::ErrorKind) {
            *self.flush_error.lock().unwrap() = Some(error);
        }
    }

    #[async_trait]
    impl PortWriter for MockSerialPort {
        async fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
            if let Some(error) = *self.write_error.lock().unwrap() {
                return Err(io::Error::new(error, "Mock write error"));
            }
            self.written_data.lock().unwrap().push(data.to_vec());
            Ok(())
        }

        async fn flush(&mut self) -> io::Result<()> {
            if let Some(error) = *self.flush_error.lock().unwrap() {
                return Err(io::Error::new(error, "Mock flush error"));
            }
            Ok(())
        }
    }

    /// Reader that replays a script, then either fails or blocks forever
    pub struct ScriptedReader {
        data: VecDeque<u8>,
        fail_when_empty: bool,
    }

    impl ScriptedReader {
        /// Replay `data`, then block like an idle serial line
        pub fn blocking(data: &[u8]) -> Self {
            Self {
                data: data.iter().copied().collect(),
                fail_when_empty: false,
            }
        }

        /// Replay `data`, then report a broken transport
        pub fn failing(data: &[u8]) -> Self {
            Self {
                data: data.iter().copied().collect(),
                fail_when_empty: true,
            }
        }
    }

    #[async_trait]
    impl PortReader for ScriptedReader {
        async fn read_byte(&mut self) -> io::Result<u8> {
            match self.data.pop_front() {
                Some(b) => Ok(b),
                None if self.fail_when_empty => {
                    Err(io::Error::new(io::ErrorKind::BrokenPipe, "Mock read error"))
                }
                None => std::future::pending().await,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stream_adapters_over_duplex() {
        let (a, b) = tokio::io::duplex(64);
        let mut writer = StreamWriter::new(a);
        let mut reader = StreamReader::new(b);

        writer.write_all(b"hi").await.unwrap();
        writer.flush().await.unwrap();

        assert_eq!(reader.read_byte().await.unwrap(), b'h');
        assert_eq!(reader.read_byte().await.unwrap(), b'i');
    }

    #[tokio::test]
    async fn test_stream_reader_reports_eof() {
        let (a, b) = tokio::io::duplex(8);
        drop(a);
        let mut reader = StreamReader::new(b);
        let err = reader.read_byte().await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[tokio::test]
    async fn test_mock_write_error() {
        let mut port = mocks::MockSerialPort::new();
        port.set_write_error(io::ErrorKind::TimedOut);
        assert!(port.write_all(b"x").await.is_err());
        assert!(port.get_written_data().is_empty());
    }
}
