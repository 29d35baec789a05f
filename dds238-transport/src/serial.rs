//! Serial line transport

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_serial::{SerialPort, SerialPortBuilderExt, SerialStream};
use tracing::{debug, info, trace, warn};

use dds238_core::constants::DEFAULT_BAUD_RATE;

use crate::{error::*, Channel};

/// Serial channel to a DDS238 meter (8N1, no flow control)
pub struct SerialChannel {
    path: String,
    baud_rate: u32,
    timeout: Duration,
    port: Option<SerialStream>,
}

impl SerialChannel {
    /// Create a serial channel at the default 9600 baud
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            baud_rate: DEFAULT_BAUD_RATE,
            timeout: Duration::from_millis(100),
            port: None,
        }
    }

    /// Set baud rate
    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    /// Set the driver level I/O timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn baud_rate(&self) -> u32 {
        self.baud_rate
    }

    fn port(&mut self) -> Result<&mut SerialStream> {
        self.port.as_mut().ok_or(Error::NotOpen)
    }
}

#[async_trait]
impl Channel for SerialChannel {
    async fn open(&mut self) -> Result<()> {
        if self.is_open() {
            return Err(Error::AlreadyOpen);
        }

        debug!("Opening {} at {} baud...", self.path, self.baud_rate);

        let port = tokio_serial::new(&self.path, self.baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .stop_bits(tokio_serial::StopBits::One)
            .parity(tokio_serial::Parity::None)
            .flow_control(tokio_serial::FlowControl::None)
            .timeout(self.timeout)
            .open_native_async()
            .map_err(|e| Error::InvalidPort(format!("{}: {}", self.path, e)))?;

        info!("Opened serial port {}", self.path);

        self.port = Some(port);
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        // Dropping the stream releases the port
        if self.port.take().is_some() {
            info!("Closed serial port {}", self.path);
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.port.is_some()
    }

    async fn write(&mut self, data: &[u8]) -> Result<()> {
        let port = self.port()?;

        trace!("Sending {} bytes: {:02X?}", data.len(), data);

        port.write_all(data).await?;
        Ok(())
    }

    async fn flush(&mut self) -> Result<()> {
        self.port()?.flush().await?;
        Ok(())
    }

    async fn bytes_available(&mut self) -> Result<usize> {
        let pending = self.port()?.bytes_to_read()?;
        Ok(pending as usize)
    }

    async fn read_byte(&mut self) -> Result<u8> {
        let byte = self.port()?.read_u8().await?;
        Ok(byte)
    }

    fn name(&self) -> String {
        self.path.clone()
    }
}

impl Drop for SerialChannel {
    fn drop(&mut self) {
        if self.is_open() {
            warn!("Serial channel {} dropped while still open", self.path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serial_channel_create() {
        let channel = SerialChannel::new("/dev/ttyUSB0")
            .with_baud_rate(4800)
            .with_timeout(Duration::from_millis(50));

        assert!(!channel.is_open());
        assert_eq!(channel.baud_rate(), 4800);
        assert_eq!(channel.name(), "/dev/ttyUSB0");
    }

    #[tokio::test]
    async fn test_serial_channel_not_open() {
        let mut channel = SerialChannel::new("/dev/ttyUSB0");

        assert!(matches!(channel.write(&[0x48]).await, Err(Error::NotOpen)));
        assert!(matches!(channel.bytes_available().await, Err(Error::NotOpen)));
        assert!(matches!(channel.read_byte().await, Err(Error::NotOpen)));
        channel.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_serial_channel_invalid_port() {
        let mut channel = SerialChannel::new("/dev/this-port-does-not-exist");

        let result = channel.open().await;
        assert!(matches!(result, Err(Error::InvalidPort(_))));
        assert!(!channel.is_open());
    }

    // Requires a meter on /dev/ttyUSB0
    #[tokio::test]
    #[ignore]
    async fn test_serial_channel_open() {
        let mut channel = SerialChannel::new("/dev/ttyUSB0");
        channel.open().await.unwrap();
        assert!(channel.is_open());
        channel.close().await.unwrap();
        assert!(!channel.is_open());
    }
}
