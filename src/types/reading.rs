//! Decoded meter readings

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// One decoded measurement set from the meter.
///
/// Decoders fill in whatever fields the frame carries and leave the rest at
/// their defaults. The timestamp is not wire data: dispatch stamps it when the
/// decode is accepted, so consumers see when the pipeline obtained the reading
/// rather than whatever clock the meter embeds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Equipment identifier reported by the meter.
    pub meter_id: String,

    /// Cumulative energy imported from the grid, tariff 1, in watt-hours.
    pub energy_import_t1_wh: u64,

    /// Cumulative energy imported from the grid, tariff 2, in watt-hours.
    pub energy_import_t2_wh: u64,

    /// Cumulative energy exported to the grid, tariff 1, in watt-hours.
    pub energy_export_t1_wh: u64,

    /// Cumulative energy exported to the grid, tariff 2, in watt-hours.
    pub energy_export_t2_wh: u64,

    /// Instantaneous power in watts, negative when exporting.
    pub power_w: i32,

    /// Cumulative gas volume from an attached sub-meter, in cubic decimetres.
    pub gas_dm3: Option<u64>,

    /// Unix time in milliseconds at which the decode was accepted.
    pub timestamp_ms: u64,
}

/// Current Unix time in milliseconds.
///
/// Clamps to zero when the system clock reads before the Unix epoch.
pub fn unix_time_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}
