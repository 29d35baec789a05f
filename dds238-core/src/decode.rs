//! Response field decoding
//!
//! Each response kind is described by a table of [`FieldSpec`]s (offset,
//! encoding, scale) that one generic routine, [`extract`], reads from a
//! validated [`Response`].

use byteorder::{BigEndian, ByteOrder};
use tracing::trace;

use dds238_types::{CutReason, LimitPurchaseData, MeasurementData, PowerCutData};

use crate::command::ResponseKind;
use crate::validate::Response;

/// How a field is stored in the frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// Big-endian unsigned integer of 1 to 4 bytes
    Unsigned { width: usize },

    /// One byte integer part followed by a 2 byte fraction in 1/10000 units
    IntFrac,
}

/// Location and scaling of one field
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSpec {
    pub offset: usize,
    pub encoding: Encoding,
    pub scale: f64,
}

impl FieldSpec {
    pub const fn unsigned(offset: usize, width: usize, scale: f64) -> Self {
        Self {
            offset,
            encoding: Encoding::Unsigned { width },
            scale,
        }
    }

    pub const fn int_frac(offset: usize) -> Self {
        Self {
            offset,
            encoding: Encoding::IntFrac,
            scale: 0.0001,
        }
    }

    /// One past the last byte used by this field
    pub const fn end(&self) -> usize {
        match self.encoding {
            Encoding::Unsigned { width } => self.offset + width,
            Encoding::IntFrac => self.offset + 3,
        }
    }
}

/// Read the raw unsigned value of a field
///
/// An [`Encoding::IntFrac`] field reads as ten-thousandths.
pub fn raw(bytes: &[u8], spec: &FieldSpec) -> u32 {
    let field = &bytes[spec.offset..spec.end()];
    match spec.encoding {
        Encoding::Unsigned { width } => BigEndian::read_uint(field, width) as u32,
        Encoding::IntFrac => field[0] as u32 * 10_000 + BigEndian::read_u16(&field[1..]) as u32,
    }
}

/// Read a field and apply its scale
pub fn extract(bytes: &[u8], spec: &FieldSpec) -> f64 {
    raw(bytes, spec) as f64 * spec.scale
}

/// Measurement response layout
pub mod measurement {
    use super::FieldSpec;

    pub const CURRENT: FieldSpec = FieldSpec::unsigned(5, 3, 0.001);
    pub const VOLTAGE: FieldSpec = FieldSpec::unsigned(14, 2, 0.1);
    pub const REACTIVE_POWER: FieldSpec = FieldSpec::int_frac(20);
    pub const ACTIVE_POWER: FieldSpec = FieldSpec::int_frac(32);
    pub const POWER_FACTOR: FieldSpec = FieldSpec::unsigned(44, 2, 0.001);
    pub const FREQUENCY: FieldSpec = FieldSpec::unsigned(52, 2, 0.01);
    pub const TOTAL_ENERGY: FieldSpec = FieldSpec::unsigned(54, 4, 0.01);
    pub const IMPORT_ENERGY: FieldSpec = FieldSpec::unsigned(58, 4, 0.01);
    pub const EXPORT_ENERGY: FieldSpec = FieldSpec::unsigned(62, 4, 0.01);
}

/// Limit and purchase response layout
pub mod limit_purchase {
    use super::FieldSpec;

    pub const MAX_VOLTAGE: FieldSpec = FieldSpec::unsigned(5, 2, 1.0);
    pub const MIN_VOLTAGE: FieldSpec = FieldSpec::unsigned(7, 2, 1.0);
    pub const MAX_CURRENT: FieldSpec = FieldSpec::unsigned(9, 2, 0.01);
    pub const PURCHASE: FieldSpec = FieldSpec::unsigned(11, 4, 0.01);
    pub const BALANCE: FieldSpec = FieldSpec::unsigned(15, 4, 0.01);
    pub const ALARM: FieldSpec = FieldSpec::unsigned(19, 4, 0.01);

    // Overlaps the third byte of PURCHASE; this is where the meter reports it.
    pub const STATUS: usize = 13;
}

/// Power-cut response layout
pub mod power_cut {
    use super::FieldSpec;

    /// Zero while the relay is open
    pub const RELAY: usize = 6;
    /// 1 = over-voltage, 2 = under-voltage
    pub const VOLTAGE_FLAG: usize = 11;
    pub const OVER_CURRENT_FLAG: usize = 15;
    pub const DELAY: FieldSpec = FieldSpec::unsigned(16, 2, 1.0);
    pub const DELAY_ENABLED: usize = 18;
    pub const PURCHASE_FLAG: usize = 19;
}

/// Fields decoded from one response
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Decoded {
    PowerCut(PowerCutData),
    Measurement(MeasurementData),
    LimitPurchase(LimitPurchaseData),
}

impl Decoded {
    pub fn kind(&self) -> ResponseKind {
        match self {
            Self::PowerCut(_) => ResponseKind::PowerCut,
            Self::Measurement(_) => ResponseKind::Measurement,
            Self::LimitPurchase(_) => ResponseKind::LimitPurchase,
        }
    }
}

/// Decode a validated response
pub fn decode(response: &Response) -> Decoded {
    let bytes = response.as_bytes();

    let decoded = match response.kind() {
        ResponseKind::PowerCut => Decoded::PowerCut(decode_power_cut(bytes)),
        ResponseKind::Measurement => Decoded::Measurement(decode_measurement(bytes)),
        ResponseKind::LimitPurchase => Decoded::LimitPurchase(decode_limit_purchase(bytes)),
    };

    trace!(?decoded, "Decoded response");

    decoded
}

fn decode_power_cut(bytes: &[u8]) -> PowerCutData {
    use power_cut::*;

    let cut = bytes[RELAY] == 0;
    let reason = if !cut {
        CutReason::None
    } else if bytes[VOLTAGE_FLAG] == 1 {
        CutReason::OverVoltage
    } else if bytes[VOLTAGE_FLAG] == 2 {
        CutReason::UnderVoltage
    } else if bytes[OVER_CURRENT_FLAG] == 1 {
        CutReason::OverCurrent
    } else if bytes[PURCHASE_FLAG] == 1 {
        CutReason::PurchaseExhausted
    } else {
        CutReason::Unknown
    };

    PowerCutData {
        power_cut: cut,
        reason,
        delay_minutes: raw(bytes, &DELAY) as u16,
        delay_enabled: bytes[DELAY_ENABLED] != 0,
    }
}

/// Derived totals are left at zero, they depend on host-side tariff data
fn decode_measurement(bytes: &[u8]) -> MeasurementData {
    use measurement::*;

    MeasurementData {
        current: extract(bytes, &CURRENT),
        voltage: extract(bytes, &VOLTAGE),
        frequency: extract(bytes, &FREQUENCY),
        reactive_power: extract(bytes, &REACTIVE_POWER),
        active_power: extract(bytes, &ACTIVE_POWER),
        power_factor: extract(bytes, &POWER_FACTOR),
        interval_total_energy: extract(bytes, &TOTAL_ENERGY),
        interval_import_energy: extract(bytes, &IMPORT_ENERGY),
        interval_export_energy: extract(bytes, &EXPORT_ENERGY),
        interval_price: 0.0,
        total_kwh: 0.0,
    }
}

fn decode_limit_purchase(bytes: &[u8]) -> LimitPurchaseData {
    use limit_purchase::*;

    LimitPurchaseData {
        energy_purchase: extract(bytes, &PURCHASE),
        energy_balance: extract(bytes, &BALANCE),
        energy_alarm: extract(bytes, &ALARM),
        purchase_enabled: bytes[STATUS] != 0,
        max_current: extract(bytes, &MAX_CURRENT),
        max_voltage: raw(bytes, &MAX_VOLTAGE) as u16,
        min_voltage: raw(bytes, &MIN_VOLTAGE) as u16,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum;
    use crate::command::MessageType;
    use crate::constants::START_MARKER;

    fn response(kind: ResponseKind, fill: impl FnOnce(&mut [u8])) -> Response {
        let mut buf = vec![0u8; kind.frame_len()];
        buf[0] = START_MARKER;
        buf[1] = kind.code();
        buf[2] = MessageType::Response.into();
        buf[3] = 0x01;
        buf[4] = kind.sub_code();
        fill(&mut buf);
        checksum::seal(&mut buf);
        Response::new(kind, buf).unwrap()
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_tables_fit_in_frames() {
        let measurement = [
            measurement::CURRENT,
            measurement::VOLTAGE,
            measurement::REACTIVE_POWER,
            measurement::ACTIVE_POWER,
            measurement::POWER_FACTOR,
            measurement::FREQUENCY,
            measurement::TOTAL_ENERGY,
            measurement::IMPORT_ENERGY,
            measurement::EXPORT_ENERGY,
        ];
        for spec in measurement {
            assert!(spec.end() < ResponseKind::Measurement.frame_len());
        }

        let limits = [
            limit_purchase::MAX_VOLTAGE,
            limit_purchase::MIN_VOLTAGE,
            limit_purchase::MAX_CURRENT,
            limit_purchase::PURCHASE,
            limit_purchase::BALANCE,
            limit_purchase::ALARM,
        ];
        for spec in limits {
            assert!(spec.end() < ResponseKind::LimitPurchase.frame_len());
        }

        assert!(power_cut::PURCHASE_FLAG < ResponseKind::PowerCut.frame_len() - 1);
    }

    #[test]
    fn test_decode_current_and_voltage() {
        let response = response(ResponseKind::Measurement, |buf| {
            buf[5..8].copy_from_slice(&[0x00, 0x00, 0x64]);
            buf[14..16].copy_from_slice(&[0x08, 0xC2]);
        });

        let Decoded::Measurement(data) = decode(&response) else {
            panic!("Expected measurement data");
        };

        assert_close(data.current, 0.100);
        assert_close(data.voltage, 224.2);
    }

    #[test]
    fn test_decode_measurement_fields() {
        let response = response(ResponseKind::Measurement, |buf| {
            // 2 + 0x1388/10000 = 2.5
            buf[20..23].copy_from_slice(&[0x02, 0x13, 0x88]);
            // 0 + 0x04D2/10000 = 0.1234
            buf[32..35].copy_from_slice(&[0x00, 0x04, 0xD2]);
            buf[44..46].copy_from_slice(&[0x03, 0xDE]);
            buf[52..54].copy_from_slice(&[0x13, 0x88]);
            buf[54..58].copy_from_slice(&[0x00, 0x01, 0x86, 0xA0]);
            buf[58..62].copy_from_slice(&[0x00, 0x00, 0x27, 0x10]);
            buf[62..66].copy_from_slice(&[0x00, 0x00, 0x00, 0x0A]);
        });

        let Decoded::Measurement(data) = decode(&response) else {
            panic!("Expected measurement data");
        };

        assert_close(data.reactive_power, 2.5);
        assert_close(data.active_power, 0.1234);
        assert_close(data.power_factor, 0.99);
        assert_close(data.frequency, 50.0);
        assert_close(data.interval_total_energy, 1000.0);
        assert_close(data.interval_import_energy, 100.0);
        assert_close(data.interval_export_energy, 0.1);
        assert_eq!(data.total_kwh, 0.0);
        assert_eq!(data.interval_price, 0.0);
    }

    #[test]
    fn test_decode_limit_purchase() {
        let response = response(ResponseKind::LimitPurchase, |buf| {
            buf[5..7].copy_from_slice(&260u16.to_be_bytes());
            buf[7..9].copy_from_slice(&180u16.to_be_bytes());
            buf[9..11].copy_from_slice(&4000u16.to_be_bytes());
            buf[11..15].copy_from_slice(&12_345u32.to_be_bytes());
            buf[15..19].copy_from_slice(&5_000u32.to_be_bytes());
            buf[19..23].copy_from_slice(&1_000u32.to_be_bytes());
        });

        let Decoded::LimitPurchase(data) = decode(&response) else {
            panic!("Expected limit/purchase data");
        };

        assert_eq!(data.max_voltage, 260);
        assert_eq!(data.min_voltage, 180);
        assert_close(data.max_current, 40.0);
        assert_close(data.energy_purchase, 123.45);
        assert_close(data.energy_balance, 50.0);
        assert_close(data.energy_alarm, 10.0);
        // byte 13 of 12_345 (0x00003039) is 0x30
        assert!(data.purchase_enabled);
    }

    #[test]
    fn test_decode_power_cut_not_cut() {
        let response = response(ResponseKind::PowerCut, |buf| {
            buf[6] = 0x01;
            buf[11] = 0x01;
            buf[16..18].copy_from_slice(&90u16.to_be_bytes());
            buf[18] = 0x01;
        });

        assert_eq!(
            decode(&response),
            Decoded::PowerCut(PowerCutData {
                power_cut: false,
                reason: CutReason::None,
                delay_minutes: 90,
                delay_enabled: true,
            })
        );
    }

    #[test]
    fn test_decode_cut_reason_priority() {
        let cases: [(&[(usize, u8)], CutReason); 6] = [
            (&[(11, 1), (15, 1), (19, 1)], CutReason::OverVoltage),
            (&[(11, 2), (15, 1)], CutReason::UnderVoltage),
            (&[(15, 1), (19, 1)], CutReason::OverCurrent),
            (&[(19, 1)], CutReason::PurchaseExhausted),
            (&[(11, 3), (15, 2)], CutReason::Unknown),
            (&[], CutReason::Unknown),
        ];

        for (flags, expected) in cases {
            let response = response(ResponseKind::PowerCut, |buf| {
                for (offset, value) in flags {
                    buf[*offset] = *value;
                }
            });

            let Decoded::PowerCut(data) = decode(&response) else {
                panic!("Expected power cut data");
            };
            assert!(data.power_cut);
            assert_eq!(data.reason, expected, "flags {:?}", flags);
        }
    }

    #[test]
    fn test_raw_int_frac() {
        let bytes = [0x03, 0x00, 0x05];
        assert_eq!(raw(&bytes, &FieldSpec::int_frac(0)), 30_005);
        assert_close(extract(&bytes, &FieldSpec::int_frac(0)), 3.0005);
    }
}
