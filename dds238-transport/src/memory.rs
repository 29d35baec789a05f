//! In-memory channel
//!
//! Stands in for a meter in tests and demos. Each flush consumes the next
//! queued [`Script`], which decides what the "device" sends back and when.
//! Replies become visible to the reader once their scheduled time has passed,
//! measured on the tokio clock so paused-time tests run instantly.

use std::collections::VecDeque;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::trace;

use crate::{error::*, Channel};

/// Delay between the echo and the data reply in [`Script::echo_then`]
pub const DEFAULT_REPLY_DELAY: Duration = Duration::from_millis(20);

/// Device behavior for one flushed frame
#[derive(Debug, Clone)]
pub enum Script {
    /// Send nothing
    Silent,

    /// Echo the flushed bytes at once, then send `reply` after `delay`
    Echo {
        reply: Option<Bytes>,
        delay: Duration,
    },

    /// Send each chunk at its offset from the flush
    Timed(Vec<(Duration, Bytes)>),
}

impl Script {
    /// Echo only
    pub fn echo() -> Self {
        Self::Echo {
            reply: None,
            delay: Duration::ZERO,
        }
    }

    /// Echo, then `reply` after [`DEFAULT_REPLY_DELAY`]
    pub fn echo_then(reply: impl Into<Bytes>) -> Self {
        Self::Echo {
            reply: Some(reply.into()),
            delay: DEFAULT_REPLY_DELAY,
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    open: bool,
    rx: VecDeque<u8>,
    tx: BytesMut,
    written: Vec<Bytes>,
    scripts: VecDeque<Script>,
    scheduled: Vec<(Instant, Bytes)>,
}

impl Inner {
    fn release_due(&mut self) {
        if self.scheduled.is_empty() {
            return;
        }

        let now = Instant::now();
        let (mut due, later): (Vec<_>, Vec<_>) = std::mem::take(&mut self.scheduled)
            .into_iter()
            .partition(|(at, _)| *at <= now);
        self.scheduled = later;

        due.sort_by_key(|(at, _)| *at);
        for (_, bytes) in due {
            self.rx.extend(bytes.iter().copied());
        }
    }

    /// Bytes scheduled beyond the clock's range never arrive
    fn schedule(&mut self, after: Duration, bytes: Bytes) {
        if let Some(at) = Instant::now().checked_add(after) {
            self.scheduled.push((at, bytes));
        }
    }
}

/// Scripted in-process channel
///
/// Clones share state: keep one handle to queue scripts and inspect what was
/// written while another is owned by the meter.
#[derive(Debug, Clone, Default)]
pub struct MemoryChannel {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the device behavior for the next unscripted flush
    pub fn push_script(&self, script: Script) {
        self.inner.lock().scripts.push_back(script);
    }

    /// Make bytes readable right away, as if sent unsolicited
    pub fn inject(&self, bytes: &[u8]) {
        self.inner.lock().rx.extend(bytes.iter().copied());
    }

    /// Frames flushed so far
    pub fn written(&self) -> Vec<Bytes> {
        self.inner.lock().written.clone()
    }

    /// Number of frames flushed so far
    pub fn write_count(&self) -> usize {
        self.inner.lock().written.len()
    }

    /// Scripts not yet consumed
    pub fn pending_scripts(&self) -> usize {
        self.inner.lock().scripts.len()
    }

    /// Bytes received but not read, scheduled bytes not included
    pub fn unread(&self) -> usize {
        self.inner.lock().rx.len()
    }
}

#[async_trait]
impl Channel for MemoryChannel {
    async fn open(&mut self) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.open {
            return Err(Error::AlreadyOpen);
        }
        inner.open = true;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.inner.lock().open = false;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.inner.lock().open
    }

    async fn write(&mut self, data: &[u8]) -> Result<()> {
        let mut inner = self.inner.lock();
        if !inner.open {
            return Err(Error::NotOpen);
        }
        inner.tx.extend_from_slice(data);
        Ok(())
    }

    async fn flush(&mut self) -> Result<()> {
        let mut inner = self.inner.lock();
        if !inner.open {
            return Err(Error::NotOpen);
        }
        if inner.tx.is_empty() {
            return Ok(());
        }

        let frame = inner.tx.split().freeze();
        trace!("Memory channel received {:02X?}", &frame[..]);
        inner.written.push(frame.clone());

        match inner.scripts.pop_front().unwrap_or(Script::Silent) {
            Script::Silent => {}
            Script::Echo { reply, delay } => {
                inner.schedule(Duration::ZERO, frame);
                if let Some(reply) = reply {
                    inner.schedule(delay, reply);
                }
            }
            Script::Timed(chunks) => {
                for (after, bytes) in chunks {
                    inner.schedule(after, bytes);
                }
            }
        }

        Ok(())
    }

    async fn bytes_available(&mut self) -> Result<usize> {
        let mut inner = self.inner.lock();
        if !inner.open {
            return Err(Error::NotOpen);
        }
        inner.release_due();
        Ok(inner.rx.len())
    }

    async fn read_byte(&mut self) -> Result<u8> {
        let mut inner = self.inner.lock();
        if !inner.open {
            return Err(Error::NotOpen);
        }
        inner.release_due();
        inner.rx.pop_front().ok_or_else(|| {
            Error::Io(io::Error::new(io::ErrorKind::UnexpectedEof, "no pending byte"))
        })
    }

    fn name(&self) -> String {
        "memory".to_string()
    }
}
