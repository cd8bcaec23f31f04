//! Serial port abstraction with dependency injection.
//!
//! The driver is generic over a `SerialPort` trait so it can run against a
//! real `tokio_serial::SerialStream` or the mock implementation, without
//! requiring actual hardware in tests.

use crate::error::WiSunError;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_serial::SerialPortBuilderExt;

/// Trait for serial port operations
#[async_trait::async_trait]
pub trait SerialPort: AsyncReadExt + AsyncWriteExt + Unpin + Send {
    async fn flush(&mut self) -> Result<(), std::io::Error>;
}

// Implement SerialPort for tokio_serial::SerialStream
#[async_trait::async_trait]
impl SerialPort for tokio_serial::SerialStream {
    async fn flush(&mut self) -> Result<(), std::io::Error> {
        AsyncWriteExt::flush(self).await
    }
}

// Implement SerialPort for our MockSerialPort
#[async_trait::async_trait]
impl SerialPort for crate::modem::serial_mock::MockSerialPort {
    async fn flush(&mut self) -> Result<(), std::io::Error> {
        Ok(())
    }
}

/// Opens the modem serial port (8N1, no flow control).
pub fn open_port(path: &str, baudrate: u32) -> Result<tokio_serial::SerialStream, WiSunError> {
    tokio_serial::new(path, baudrate)
        .data_bits(tokio_serial::DataBits::Eight)
        .stop_bits(tokio_serial::StopBits::One)
        .parity(tokio_serial::Parity::None)
        .timeout(Duration::from_secs(2))
        .open_native_async()
        .map_err(|e| WiSunError::SerialPortError(e.to_string()))
}
