//! Sensor reading model

use serde::{Deserialize, Serialize};

/// One complete set of environmental fields reported by the sensor board.
///
/// Field names on the wire are the ones the board firmware and the HTTP
/// clients already use (`soilType`, `soilPH`, ...).
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct SensorReading {
    /// Degrees Celsius
    pub temperature: f64,
    /// Relative humidity, percent
    pub humidity: f64,
    /// Raw soil moisture sensor units
    pub moisture: i64,
    #[serde(rename = "soilType")]
    pub soil_type: String,
    /// 0-14
    #[serde(rename = "soilPH")]
    pub soil_ph: f64,
    pub rainfall: String,
    pub season: String,
}
