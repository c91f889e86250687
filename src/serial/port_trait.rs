//! Trait abstraction for serial port operations to enable testing

use async_trait::async_trait;
use std::io;
use tokio_serial::SerialPortBuilderExt;

use super::SerialEndpoint;

/// Trait for serial port I/O operations
#[async_trait]
pub trait SerialPortIO: Send {
    /// Read available bytes into `buf`, returning how many were read (0 = end of stream)
    async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Write all data to the port
    async fn write_all(&mut self, data: &[u8]) -> io::Result<()>;

    /// Flush the output buffer
    async fn flush(&mut self) -> io::Result<()>;
}

/// Opens a transport for an endpoint
#[cfg_attr(test, mockall::automock)]
pub trait PortOpener {
    fn open(&self, endpoint: &SerialEndpoint) -> io::Result<Box<dyn SerialPortIO>>;
}

/// Wrapper around tokio_serial::SerialStream that implements SerialPortIO
pub struct TokioSerialPort {
    port: tokio_serial::SerialStream,
}

impl TokioSerialPort {
    pub fn new(port: tokio_serial::SerialStream) -> Self {
        Self { port }
    }
}

#[async_trait]
impl SerialPortIO for TokioSerialPort {
    async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        use tokio::io::AsyncReadExt;
        self.port.read(buf).await
    }

    async fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        use tokio::io::AsyncWriteExt;
        self.port.write_all(data).await
    }

    async fn flush(&mut self) -> io::Result<()> {
        use tokio::io::AsyncWriteExt;
        self.port.flush().await
    }
}

/// Opens real serial devices through `tokio-serial` (8N1, no flow control)
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSerialOpener;

impl PortOpener for TokioSerialOpener {
    fn open(&self, endpoint: &SerialEndpoint) -> io::Result<Box<dyn SerialPortIO>> {
        let port = tokio_serial::new(endpoint.path(), endpoint.baud_rate())
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .timeout(endpoint.read_timeout())
            .open_native_async()
            .map_err(io::Error::from)?;

        Ok(Box::new(TokioSerialPort::new(port)))
    }
}

#[cfg(test)]
pub mod mocks {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// One scripted result for `MockSerialPort::read`
    #[derive(Debug, Clone)]
    pub enum MockRead {
        /// Bytes arrive (delivered over several reads if `buf` is smaller)
        Data(Vec<u8>),
        /// Line stays quiet until the caller's timeout fires
        Silent,
        /// I/O error from the device
        Error(io::ErrorKind),
        /// Device disappeared
        Eof,
    }

    /// Mock serial port for testing
    ///
    /// Reads follow the script in `reads`; once it runs out the line stays silent.
    #[derive(Clone)]
    pub struct MockSerialPort {
        pub reads: Arc<Mutex<VecDeque<MockRead>>>,
        pub written_data: Arc<Mutex<Vec<Vec<u8>>>>,
        pub write_error: Arc<Mutex<Option<io::ErrorKind>>>,
        pub flush_error: Arc<Mutex<Option<io::ErrorKind>>>,
    }

    impl MockSerialPort {
        pub fn new() -> Self {
            Self {
                reads: Arc::new(Mutex::new(VecDeque::new())),
                written_data: Arc::new(Mutex::new(Vec::new())),
                write_error: Arc::new(Mutex::new(None)),
                flush_error: Arc::new(Mutex::new(None)),
            }
        }

        pub fn push_read(&self, read: MockRead) {
            self.reads.lock().unwrap().push_back(read);
        }

        pub fn push_line(&self, line: &str) {
            self.push_read(MockRead::Data(line.as_bytes().to_vec()));
        }

        pub fn get_written_data(&self) -> Vec<Vec<u8>> {
            self.written_data.lock().unwrap().clone()
        }

        pub fn set_write_error(&self, error: io::ErrorKind) {
            *self.write_error.lock().unwrap() = Some(error);
        }

        pub fn clear_write_error(&self) {
            *self.write_error.lock().unwrap() = None;
        }

        pub fn set_flush_error(&self, error: io::ErrorKind) {
            *self.flush_error.lock().unwrap() = Some(error);
        }
    }

    #[async_trait]
    impl SerialPortIO for MockSerialPort {
        async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let next = self.reads.lock().unwrap().pop_front();
            match next {
                Some(MockRead::Data(bytes)) => {
                    let n = buf.len().min(bytes.len());
                    buf[..n].copy_from_slice(&bytes[..n]);
                    if n < bytes.len() {
                        self.reads
                            .lock()
                            .unwrap()
                            .push_front(MockRead::Data(bytes[n..].to_vec()));
                    }
                    Ok(n)
                }
                Some(MockRead::Error(kind)) => Err(io::Error::new(kind, "Mock read error")),
                Some(MockRead::Eof) => Ok(0),
                Some(MockRead::Silent) | None => std::future::pending().await,
            }
        }

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

    /// Opener that always hands out clones of `port`
    pub fn opener_for(port: &MockSerialPort) -> MockPortOpener {
        let port = port.clone();
        let mut opener = MockPortOpener::new();
        opener
            .expect_open()
            .returning(move |_| Ok(Box::new(port.clone()) as Box<dyn SerialPortIO>));
        opener
    }

    /// Opener that always fails with `kind`
    pub fn failing_opener(kind: io::ErrorKind) -> MockPortOpener {
        let mut opener = MockPortOpener::new();
        opener
            .expect_open()
            .returning(move |_| Err(io::Error::new(kind, "Mock open error")));
        opener
    }
}
