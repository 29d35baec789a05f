//! Meter snapshot structures
//!
//! A [`MeterSnapshot`] is owned by the caller and handed to every meter
//! operation. Each record carries the instant of its last successful update.

use std::fmt;

use tokio::time::Instant;

/// A record plus the instant it was last refreshed from the device
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Timestamped<T> {
    /// `None` until the first successful update
    pub updated_at: Option<Instant>,

    pub data: T,
}

impl<T> Timestamped<T> {
    /// Replace the data and stamp it with `now`
    pub fn update(&mut self, data: T, now: Instant) {
        self.data = data;
        self.updated_at = Some(now);
    }

    /// Check if the record has ever been updated
    pub fn is_set(&self) -> bool {
        self.updated_at.is_some()
    }
}

/// Reason the relay opened
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum CutReason {
    OverVoltage,
    UnderVoltage,
    OverCurrent,
    PurchaseExhausted,
    Unknown,
    #[default]
    None,
}

impl CutReason {
    pub fn description(self) -> &'static str {
        match self {
            Self::OverVoltage => "Off by over voltage",
            Self::UnderVoltage => "Off by under voltage",
            Self::OverCurrent => "Off by over current",
            Self::PurchaseExhausted => "Off by end of purchase",
            Self::Unknown => "Off by unknown cause",
            Self::None => "No power cut",
        }
    }
}

impl fmt::Display for CutReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Relay state and delayed-cut settings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PowerCutData {
    /// Relay is open (no power delivered)
    pub power_cut: bool,

    pub reason: CutReason,

    /// Delay before the relay acts (minutes)
    pub delay_minutes: u16,

    pub delay_enabled: bool,
}

/// Live electrical measurements
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MeasurementData {
    /// Current (A)
    pub current: f64,

    /// Voltage (V)
    pub voltage: f64,

    /// Line frequency (Hz)
    pub frequency: f64,

    pub reactive_power: f64,

    pub active_power: f64,

    pub power_factor: f64,

    /// Energy counted since the last reset (kWh)
    pub interval_total_energy: f64,

    pub interval_import_energy: f64,

    pub interval_export_energy: f64,

    /// `interval_total_energy * price`, derived locally
    pub interval_price: f64,

    /// `interval_total_energy + starting_kwh`, derived locally
    pub total_kwh: f64,
}

impl MeasurementData {
    /// Recompute the locally derived totals from the power company settings
    pub fn recompute_totals(&mut self, company: &PowerCompanyData) {
        self.interval_price = self.interval_total_energy * company.price_per_kwh;
        self.total_kwh = self.interval_total_energy + company.starting_kwh;
    }
}

/// Configured limits and prepaid energy state
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LimitPurchaseData {
    /// Purchased energy (kWh)
    pub energy_purchase: f64,

    /// Remaining purchased energy (kWh)
    pub energy_balance: f64,

    /// Balance that triggers the purchase alarm (kWh)
    pub energy_alarm: f64,

    pub purchase_enabled: bool,

    /// Current limit (A)
    pub max_current: f64,

    /// Upper voltage limit (V)
    pub max_voltage: u16,

    /// Lower voltage limit (V)
    pub min_voltage: u16,
}

/// Tariff data kept on the host, never read from the meter
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PowerCompanyData {
    /// Cumulative energy before the current interval (kWh)
    pub starting_kwh: f64,

    pub price_per_kwh: f64,
}

/// Everything known about one meter
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeterSnapshot {
    pub power_company: Timestamped<PowerCompanyData>,

    pub power_cut: Timestamped<PowerCutData>,

    pub measurement: Timestamped<MeasurementData>,

    pub limit_purchase: Timestamped<LimitPurchaseData>,
}

impl MeterSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recompute derived measurement totals after a tariff or baseline change
    pub fn recompute_totals(&mut self) {
        let company = self.power_company.data;
        self.measurement.data.recompute_totals(&company);
    }
}

impl fmt::Display for MeasurementData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.3} A, {:.1} V, {:.2} Hz, P={:.4}, Q={:.4}, PF={:.3}, E={:.2} kWh (total {:.2} kWh)",
            self.current,
            self.voltage,
            self.frequency,
            self.active_power,
            self.reactive_power,
            self.power_factor,
            self.interval_total_energy,
            self.total_kwh
        )
    }
}
