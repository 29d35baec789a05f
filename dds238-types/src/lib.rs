//! Type definitions for dds238

pub mod snapshot;

pub use snapshot::{
    CutReason, LimitPurchaseData, MeasurementData, MeterSnapshot, PowerCompanyData, PowerCutData,
    Timestamped,
};
