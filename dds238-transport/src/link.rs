//! Request/response discipline over a [`Channel`]
//!
//! The meter answers every frame twice: first an echo of the frame it
//! received, then the data reply. Reads are length driven. The link waits
//! until the expected number of bytes is pending, refuses to read when more
//! than expected arrived, and always drains leftovers so the next exchange
//! starts clean.

use std::time::Duration;

use bytes::{Bytes, BytesMut};
use tokio::time::{sleep, Instant};
use tracing::{trace, warn};

use dds238_core::{
    constants::{INTER_READ_DELAY, POLL_INTERVAL},
    Expectation,
};

use crate::{error::*, Channel};

/// Runtime timing of a [`Link`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkConfig {
    /// Pause between byte reads and around each receive
    pub inter_read_delay: Duration,

    /// Sleep between polls of the pending byte count
    pub poll_interval: Duration,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            inter_read_delay: INTER_READ_DELAY,
            poll_interval: POLL_INTERVAL,
        }
    }
}

/// A channel plus the exchange rules of the meter protocol
pub struct Link {
    channel: Box<dyn Channel>,
    config: LinkConfig,
}

impl Link {
    pub fn new(channel: Box<dyn Channel>) -> Self {
        Self {
            channel,
            config: LinkConfig::default(),
        }
    }

    pub fn with_config(mut self, config: LinkConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut LinkConfig {
        &mut self.config
    }

    pub async fn open(&mut self) -> Result<()> {
        self.channel.open().await
    }

    pub async fn close(&mut self) -> Result<()> {
        self.channel.close().await
    }

    pub fn is_open(&self) -> bool {
        self.channel.is_open()
    }

    pub fn name(&self) -> String {
        self.channel.name()
    }

    /// Send a frame and wait for the meter to echo it back
    ///
    /// Stale input is discarded first so the echo cannot be confused with
    /// leftovers of an earlier exchange.
    pub async fn send_and_confirm(&mut self, frame: &[u8], timeout: Duration) -> Result<Bytes> {
        let expect = Expectation::echo_of(frame)?;

        self.drain().await?;

        trace!("TX {:02X?}", frame);
        self.channel.write(frame).await?;
        self.channel.flush().await?;

        self.receive(&expect, timeout).await
    }

    /// Receive one frame matching `expect`
    ///
    /// Residual input is drained afterwards whether or not the frame was
    /// accepted.
    pub async fn receive(&mut self, expect: &Expectation, timeout: Duration) -> Result<Bytes> {
        let result = self.receive_frame(expect, timeout).await;

        sleep(self.config.inter_read_delay).await;
        if let Err(e) = self.drain().await {
            warn!("Failed to drain input after receive: {}", e);
        }

        result
    }

    async fn receive_frame(&mut self, expect: &Expectation, timeout: Duration) -> Result<Bytes> {
        let pending = self.wait_for(expect.len, timeout).await?;

        if pending == 0 {
            return Err(Error::Timeout {
                waited_ms: timeout.as_millis() as u64,
            });
        }
        if pending < expect.len {
            return Err(Error::NotEnoughBytes {
                expected: expect.len,
                received: pending,
            });
        }

        // Give a longer frame the chance to show itself before reading
        sleep(self.config.inter_read_delay).await;
        let available = self.channel.bytes_available().await?;
        if available > expect.len {
            return Err(Error::ExceedsBytes {
                expected: expect.len,
                available,
            });
        }

        let mut buf = BytesMut::with_capacity(expect.len);
        for _ in 0..expect.len {
            let byte = self.channel.read_byte().await?;
            buf.extend_from_slice(&[byte]);
        }

        trace!("RX {:02X?}", &buf[..]);

        expect.check(&buf)?;

        Ok(buf.freeze())
    }

    /// Poll until `count` bytes are pending or `timeout` elapses
    ///
    /// Returns the pending count seen last. A timeout too large to form a
    /// deadline waits without limit.
    async fn wait_for(&mut self, count: usize, timeout: Duration) -> Result<usize> {
        let deadline = Instant::now().checked_add(timeout);

        loop {
            let pending = self.channel.bytes_available().await?;
            let expired = deadline.is_some_and(|deadline| Instant::now() >= deadline);
            if pending >= count || expired {
                return Ok(pending);
            }
            sleep(self.config.poll_interval).await;
        }
    }

    /// Wait until at least one byte is pending
    pub async fn wait_for_any(&mut self, timeout: Duration) -> Result<usize> {
        match self.wait_for(1, timeout).await? {
            0 => Err(Error::Timeout {
                waited_ms: timeout.as_millis() as u64,
            }),
            pending => Ok(pending),
        }
    }

    /// Read whatever is pending, up to `max` bytes
    pub async fn read_pending(&mut self, max: usize) -> Result<Bytes> {
        let mut buf = BytesMut::with_capacity(max);

        while buf.len() < max && self.channel.bytes_available().await? > 0 {
            let byte = self.channel.read_byte().await?;
            buf.extend_from_slice(&[byte]);
            sleep(self.config.inter_read_delay).await;
        }

        Ok(buf.freeze())
    }

    /// Discard all pending input, returning the number of bytes dropped
    pub async fn drain(&mut self) -> Result<usize> {
        let mut dropped = 0;

        while self.channel.bytes_available().await? > 0 {
            self.channel.read_byte().await?;
            dropped += 1;
            sleep(self.config.inter_read_delay).await;
        }

        if dropped > 0 {
            warn!("Discarded {} unexpected bytes from {}", dropped, self.channel.name());
        }

        Ok(dropped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryChannel, Script};
    use dds238_core::{
        checksum, Command, ErrorCode, MessageType, Response, ResponseKind,
    };
    use pretty_assertions::assert_eq;

    const TIMEOUT: Duration = Duration::from_millis(1000);

    fn reply(kind: ResponseKind) -> Vec<u8> {
        let mut buf = vec![0u8; kind.frame_len()];
        buf[..5].copy_from_slice(&[
            0x48,
            kind.code(),
            MessageType::Response.into(),
            0x01,
            kind.sub_code(),
        ]);
        checksum::seal(&mut buf);
        buf
    }

    async fn open_link() -> (MemoryChannel, Link) {
        let handle = MemoryChannel::new();
        let mut link = Link::new(Box::new(handle.clone()));
        link.open().await.unwrap();
        (handle, link)
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_exchange() {
        let (handle, mut link) = open_link().await;
        let frame = Command::GetPowerCut.to_frame();
        handle.push_script(Script::echo_then(reply(ResponseKind::PowerCut)));

        let echo = link.send_and_confirm(frame.as_bytes(), TIMEOUT).await.unwrap();
        assert_eq!(&echo[..], frame.as_bytes());

        let expect = Expectation::response(ResponseKind::PowerCut);
        let bytes = link.receive(&expect, TIMEOUT).await.unwrap();
        Response::new(ResponseKind::PowerCut, bytes).unwrap();

        assert_eq!(handle.written(), vec![frame.to_bytes()]);
        assert_eq!(handle.unread(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_silence_times_out() {
        let (_handle, mut link) = open_link().await;
        let frame = Command::GetMeasurement.to_frame();

        let start = Instant::now();
        let err = link.send_and_confirm(frame.as_bytes(), TIMEOUT).await.unwrap_err();

        assert!(matches!(err, Error::Timeout { waited_ms: 1000 }));
        assert_eq!(err.kind().code, ErrorCode::Timeout);
        assert!(start.elapsed() >= TIMEOUT);
    }

    #[tokio::test(start_paused = true)]
    async fn test_partial_frame() {
        let (handle, mut link) = open_link().await;
        handle.inject(&reply(ResponseKind::Measurement)[..30]);

        let expect = Expectation::response(ResponseKind::Measurement);
        let err = link.receive(&expect, TIMEOUT).await.unwrap_err();

        assert!(matches!(
            err,
            Error::NotEnoughBytes {
                expected: 67,
                received: 30
            }
        ));
        // leftovers are drained
        assert_eq!(handle.unread(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_extra_bytes() {
        let (handle, mut link) = open_link().await;
        let mut bytes = reply(ResponseKind::PowerCut);
        bytes.push(0x00);
        handle.inject(&bytes);

        let expect = Expectation::response(ResponseKind::PowerCut);
        let err = link.receive(&expect, TIMEOUT).await.unwrap_err();

        assert!(matches!(
            err,
            Error::ExceedsBytes {
                expected: 21,
                available: 22
            }
        ));
        assert_eq!(err.kind().code, ErrorCode::ExceedsBytes);
        assert_eq!(handle.unread(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_bad_checksum() {
        let (handle, mut link) = open_link().await;
        let mut bytes = reply(ResponseKind::LimitPurchase);
        bytes[24] = bytes[24].wrapping_add(1);
        handle.inject(&bytes);

        let expect = Expectation::response(ResponseKind::LimitPurchase);
        let err = link.receive(&expect, TIMEOUT).await.unwrap_err();

        assert_eq!(err.kind().code, ErrorCode::CrcError);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_input_discarded_before_send() {
        let (handle, mut link) = open_link().await;
        handle.inject(&[0x01, 0x02, 0x03]);
        handle.push_script(Script::echo());

        let frame = Command::SetPowerCut { cut: true }.to_frame();
        link.send_and_confirm(frame.as_bytes(), TIMEOUT).await.unwrap();

        assert_eq!(handle.unread(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reply_in_wrong_order() {
        let (handle, mut link) = open_link().await;
        // data reply where the echo belongs
        handle.push_script(Script::Timed(vec![(
            Duration::ZERO,
            Bytes::from(reply(ResponseKind::PowerCut)),
        )]));

        let frame = Command::SetDelay {
            minutes: 10,
            enabled: true,
        }
        .to_frame();
        let err = link.send_and_confirm(frame.as_bytes(), TIMEOUT).await.unwrap_err();

        assert_eq!(err.kind().code, ErrorCode::ExceedsBytes);
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_pending() {
        let (handle, mut link) = open_link().await;
        handle.inject(&[0xAA; 120]);

        let bytes = link.read_pending(96).await.unwrap();
        assert_eq!(bytes.len(), 96);
        assert_eq!(handle.unread(), 24);

        assert_eq!(link.drain().await.unwrap(), 24);
        assert_eq!(link.read_pending(96).await.unwrap().len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_any() {
        let (handle, mut link) = open_link().await;

        let err = link.wait_for_any(Duration::from_millis(50)).await.unwrap_err();
        assert!(matches!(err, Error::Timeout { waited_ms: 50 }));

        handle.inject(&[0x48]);
        assert_eq!(link.wait_for_any(Duration::from_millis(50)).await.unwrap(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unbounded_timeout() {
        let (handle, mut link) = open_link().await;
        let frame = Command::GetPowerCut.to_frame();
        handle.push_script(Script::echo_then(reply(ResponseKind::PowerCut)));

        link.send_and_confirm(frame.as_bytes(), Duration::MAX).await.unwrap();

        let expect = Expectation::response(ResponseKind::PowerCut);
        let bytes = link.receive(&expect, Duration::MAX).await.unwrap();
        assert_eq!(bytes.len(), ResponseKind::PowerCut.frame_len());
    }

    #[tokio::test]
    async fn test_closed_link() {
        let mut link = Link::new(Box::new(MemoryChannel::new()));
        let frame = Command::GetPowerCut.to_frame();

        let err = link.send_and_confirm(frame.as_bytes(), TIMEOUT).await.unwrap_err();
        assert!(matches!(err, Error::NotOpen));
        assert_eq!(err.kind().code, ErrorCode::Timeout);
    }
}
