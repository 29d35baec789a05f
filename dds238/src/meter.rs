//! High-level meter interface

use std::fmt::Display;
use std::ops::RangeInclusive;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use dds238_core::{
    checksum,
    constants::{
        limits, CONFIRM_TIMEOUT, MAX_INCOMING_BYTES, MIN_QUERY_INTERVAL, RESPONSE_TIMEOUT,
        START_MARKER,
    },
    decode,
    error::HeaderField,
    raw, Command, Decoded, Expectation, Response, Session,
};
use dds238_transport::{Channel, Link, SerialChannel};
use dds238_types::MeterSnapshot;

use crate::error::{Error, Result};

/// DDS238 energy meter
///
/// Drives one meter over one channel. Every operation works on a
/// caller-owned [`MeterSnapshot`] and only touches the record it services.
/// Outcomes are tallied in the [`Session`].
///
/// # Examples
///
/// ```no_run
/// use dds238::{Meter, MeterSnapshot};
///
/// #[tokio::main]
/// async fn main() -> dds238::Result<()> {
///     let mut meter = Meter::new("/dev/ttyUSB0");
///     let mut snapshot = MeterSnapshot::new();
///
///     meter.open().await?;
///
///     meter.get_measurement(&mut snapshot, false).await?;
///     println!("{}", snapshot.measurement.data);
///
///     meter.close().await?;
///     Ok(())
/// }
/// ```
pub struct Meter {
    link: Link,
    session: Session,
    response_timeout: Duration,
    confirm_timeout: Duration,
    min_interval: Duration,
    incoming: String,
}

impl Meter {
    /// Create a meter on a serial port (9600 8N1)
    pub fn new(path: impl Into<String>) -> Self {
        Self::with_channel(Box::new(SerialChannel::new(path)))
    }

    /// Create a meter on any channel
    pub fn with_channel(channel: Box<dyn Channel>) -> Self {
        Self {
            link: Link::new(channel),
            session: Session::new(),
            response_timeout: RESPONSE_TIMEOUT,
            confirm_timeout: CONFIRM_TIMEOUT,
            min_interval: MIN_QUERY_INTERVAL,
            incoming: String::new(),
        }
    }

    /// Set how long to wait for a data response
    pub fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    /// Set how long to wait for the echo of a sent frame
    pub fn with_confirm_timeout(mut self, timeout: Duration) -> Self {
        self.confirm_timeout = timeout;
        self
    }

    /// Set the minimum age of a record before it is read again
    pub fn with_min_interval(mut self, interval: Duration) -> Self {
        self.min_interval = interval;
        self
    }

    pub fn with_inter_read_delay(mut self, delay: Duration) -> Self {
        self.link.config_mut().inter_read_delay = delay;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.link.config_mut().poll_interval = interval;
        self
    }

    /// Open the channel
    pub async fn open(&mut self) -> Result<()> {
        info!("Opening meter on {}...", self.link.name());
        self.link.open().await?;
        info!("Meter ready");
        Ok(())
    }

    /// Close the channel
    pub async fn close(&mut self) -> Result<()> {
        if !self.is_open() {
            return Ok(());
        }

        info!("Closing meter on {}...", self.link.name());
        self.link.close().await?;
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.link.is_open()
    }

    /// Error and success bookkeeping
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Last frame picked up by [`Meter::process_incoming_messages`]
    pub fn incoming_hex_message(&self) -> &str {
        &self.incoming
    }

    // Queries

    /// Read relay state, cut reason and delay settings
    pub async fn get_power_cut(
        &mut self,
        snapshot: &mut MeterSnapshot,
        force_update: bool,
    ) -> Result<()> {
        if !force_update && self.is_fresh(snapshot.power_cut.updated_at) {
            debug!("Power cut data is fresh, not reading");
            return Ok(());
        }

        self.run(Ok(Command::GetPowerCut), snapshot).await
    }

    /// Read instantaneous values and interval energy
    pub async fn get_measurement(
        &mut self,
        snapshot: &mut MeterSnapshot,
        force_update: bool,
    ) -> Result<()> {
        if !force_update && self.is_fresh(snapshot.measurement.updated_at) {
            debug!("Measurement data is fresh, not reading");
            return Ok(());
        }

        self.run(Ok(Command::GetMeasurement), snapshot).await
    }

    /// Read configured limits and prepaid energy state
    pub async fn get_limit_purchase(
        &mut self,
        snapshot: &mut MeterSnapshot,
        force_update: bool,
    ) -> Result<()> {
        if !force_update && self.is_fresh(snapshot.limit_purchase.updated_at) {
            debug!("Limit and purchase data is fresh, not reading");
            return Ok(());
        }

        self.run(Ok(Command::GetLimitPurchase), snapshot).await
    }

    /// Refresh the power company record
    ///
    /// The tariff lives on the host, so this only stamps the record.
    pub async fn get_power_company(
        &mut self,
        snapshot: &mut MeterSnapshot,
        force_update: bool,
    ) -> Result<()> {
        if !force_update && self.is_fresh(snapshot.power_company.updated_at) {
            debug!("Power company data is fresh, not updating");
            return Ok(());
        }

        self.session.clear_last_error();
        snapshot.power_company.updated_at = Some(Instant::now());
        self.session.record_success();

        Ok(())
    }

    // Writes

    /// Set the current limit (A) and the voltage window (V)
    pub async fn set_limits(
        &mut self,
        max_current: f64,
        max_voltage: u16,
        min_voltage: u16,
        snapshot: &mut MeterSnapshot,
    ) -> Result<()> {
        debug!(max_current, max_voltage, min_voltage, "Setting limits");

        let command = check_range(1, "max current", max_current, &limits::CURRENT)
            .and_then(|_| check_range(2, "max voltage", max_voltage, &limits::VOLTAGE))
            .and_then(|_| check_range(3, "min voltage", min_voltage, &limits::VOLTAGE))
            .map(|_| Command::SetLimits {
                max_current: scale(max_current, 100.0) as u16,
                max_voltage,
                min_voltage,
            });

        self.run(command, snapshot).await
    }

    /// Set purchased energy and alarm threshold (kWh)
    pub async fn set_purchase(
        &mut self,
        purchase: f64,
        alarm: f64,
        enabled: bool,
        snapshot: &mut MeterSnapshot,
    ) -> Result<()> {
        debug!(purchase, alarm, enabled, "Setting purchase");

        let command = check_range(1, "purchase", purchase, &limits::ENERGY)
            .and_then(|_| check_range(2, "alarm", alarm, &limits::ENERGY))
            .map(|_| Command::SetPurchase {
                purchase: scale(purchase, 100.0) as u32,
                alarm: scale(alarm, 100.0) as u32,
                enabled,
            });

        self.run(command, snapshot).await
    }

    /// Open (`true`) or close (`false`) the relay
    pub async fn set_power_cut(&mut self, cut: bool, snapshot: &mut MeterSnapshot) -> Result<()> {
        debug!(cut, "Setting power cut");

        self.run(Ok(Command::SetPowerCut { cut }), snapshot).await
    }

    /// Configure the delayed cut
    pub async fn set_delay(
        &mut self,
        enabled: bool,
        minutes: u16,
        snapshot: &mut MeterSnapshot,
    ) -> Result<()> {
        debug!(enabled, minutes, "Setting delay");

        let command = check_range(2, "delay", minutes, &limits::DELAY)
            .map(|_| Command::SetDelay { minutes, enabled });

        self.run(command, snapshot).await
    }

    /// Reset the interval energy counters
    ///
    /// On success the interval energy read before the reset is added to the
    /// starting baseline, so `total_kwh` carries on from where it was.
    pub async fn set_reset(&mut self, snapshot: &mut MeterSnapshot) -> Result<()> {
        debug!("Resetting interval counters");

        let carried = snapshot.measurement.data.interval_total_energy;
        self.run(Ok(Command::Reset), snapshot).await?;

        snapshot.power_company.data.starting_kwh += carried;
        snapshot.recompute_totals();

        info!(
            carried,
            starting_kwh = snapshot.power_company.data.starting_kwh,
            "Interval counters reset"
        );

        Ok(())
    }

    /// Set the starting energy baseline (kWh) and the price per kWh
    ///
    /// Host side only, nothing is sent to the meter.
    pub async fn set_power_company(
        &mut self,
        starting_kwh: f64,
        price_per_kwh: f64,
        snapshot: &mut MeterSnapshot,
    ) -> Result<()> {
        debug!(starting_kwh, price_per_kwh, "Setting power company data");

        self.session.clear_last_error();

        let result = check_range(1, "starting energy", starting_kwh, &limits::STARTING_ENERGY)
            .and_then(|_| check_range(2, "price", price_per_kwh, &limits::PRICE))
            .map(|_| {
                snapshot.power_company.data.starting_kwh = starting_kwh;
                snapshot.power_company.data.price_per_kwh = price_per_kwh;
                snapshot.recompute_totals();
            });

        self.record("set power company", result)
    }

    // Raw passthrough

    /// Send a raw frame written as colon separated hex
    ///
    /// The last pair is replaced by the checksum. After the echo, waits for
    /// the meter to say anything and returns it as hex.
    pub async fn send_hex_message(&mut self, msg: &str) -> Result<String> {
        debug!(msg, "Sending hex message");

        self.session.clear_last_error();
        let result = self.hex_exchange(msg).await;
        self.record("send hex message", result)
    }

    /// Pick up a frame the meter sent on its own
    ///
    /// Returns an empty string when nothing is pending.
    pub async fn process_incoming_messages(&mut self) -> Result<String> {
        self.session.clear_last_error();
        let result = self.read_incoming().await;
        self.record("process incoming messages", result)
    }

    // Helper methods

    fn is_fresh(&self, updated_at: Option<Instant>) -> bool {
        updated_at.is_some_and(|at| at.elapsed() < self.min_interval)
    }

    /// Run one command through the full exchange and store its reply
    async fn run(&mut self, command: Result<Command>, snapshot: &mut MeterSnapshot) -> Result<()> {
        self.session.clear_last_error();

        let (name, result) = match command {
            Ok(command) => {
                let result = self.exchange(command).await.map(|decoded| apply(snapshot, decoded));
                (command.kind().name(), result)
            }
            Err(e) => ("validate parameters", Err(e)),
        };

        self.record(name, result)
    }

    async fn exchange(&mut self, command: Command) -> Result<Decoded> {
        let frame = command.to_frame();
        debug!("Exchanging {}", frame);

        self.link
            .send_and_confirm(frame.as_bytes(), self.confirm_timeout)
            .await?;

        let reply = command.kind().reply();
        let bytes = self
            .link
            .receive(&Expectation::response(reply), self.response_timeout)
            .await?;

        let response = Response::new(reply, bytes)?;
        Ok(decode(&response))
    }

    async fn hex_exchange(&mut self, msg: &str) -> Result<String> {
        let frame = raw::parse_message(msg)?;

        self.link.send_and_confirm(&frame, self.confirm_timeout).await?;
        self.link.wait_for_any(self.response_timeout).await?;

        self.read_incoming().await
    }

    async fn read_incoming(&mut self) -> Result<String> {
        self.incoming.clear();

        let bytes = self.link.read_pending(MAX_INCOMING_BYTES).await?;
        if bytes.is_empty() {
            return Ok(String::new());
        }

        if bytes[0] != START_MARKER {
            return Err(dds238_core::Error::WrongBytes {
                field: HeaderField::Start,
                expected: START_MARKER,
                actual: bytes[0],
            }
            .into());
        }

        let expected = checksum::calculate(&bytes);
        let received = bytes[bytes.len() - 1];
        if expected != received {
            return Err(dds238_core::Error::ChecksumMismatch { expected, received }.into());
        }

        self.incoming = raw::format_message(&bytes);
        debug!(hex = %self.incoming, "Incoming message");

        Ok(self.incoming.clone())
    }

    /// Tally the outcome of one operation
    fn record<T>(&self, operation: &str, result: Result<T>) -> Result<T> {
        match &result {
            Ok(_) => {
                self.session.record_success();
                debug!("{} succeeded", operation);
            }
            Err(e) => {
                let kind = e.kind();
                self.session.record_failure(kind);
                warn!("{} failed: {} ({})", operation, e, kind);
            }
        }

        result
    }
}

fn apply(snapshot: &mut MeterSnapshot, decoded: Decoded) {
    let now = Instant::now();

    match decoded {
        Decoded::PowerCut(data) => snapshot.power_cut.update(data, now),
        Decoded::Measurement(data) => {
            snapshot.measurement.update(data, now);
            snapshot.recompute_totals();
        }
        Decoded::LimitPurchase(data) => snapshot.limit_purchase.update(data, now),
    }
}

fn check_range<T>(
    position: u8,
    name: &'static str,
    value: T,
    range: &RangeInclusive<T>,
) -> Result<()>
where
    T: PartialOrd + Display,
{
    if range.contains(&value) {
        return Ok(());
    }

    Err(Error::OutOfRange {
        position,
        name,
        value: value.to_string(),
        range: format!("{}..={}", range.start(), range.end()),
    })
}

/// Scale to the meter's fixed point, rounding to the nearest step
fn scale(value: f64, factor: f64) -> f64 {
    (value * factor).round()
}
