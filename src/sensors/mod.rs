//! Temperature sensing.
//!
//! The real sensor driver (a BMP280 on I2C on the bench rig) lives outside
//! this crate behind [`SensorPort`](crate::app::ports::SensorPort).  What
//! stays here is the driver contract and the plant model the host
//! simulation reads from.

pub mod thermal_model;

/// Value a driver returns when a read fails.  Anything at or below
/// `SystemConfig::sensor_fault_threshold_c` is treated the same way.
pub const FAULT_SENTINEL_C: f32 = -99.0;
